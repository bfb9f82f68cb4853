use crate::bidding::Bid;
use crate::card::{Card, CardId};
use crate::config::GameConfig;
use crate::declaration::{self, Declaration};
use crate::scoring::ScoreLedger;
use crate::trick::Trick;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type RoomId = Uuid;
pub type PlayerId = Uuid;

/// 牌局的完整快照 (Game State Aggregate)
///
/// 任何一张牌在任何时刻只属于以下之一：未发的牌堆、某位玩家的手牌、
/// 当前墩、某位玩家的赢墩堆。`version` 是逻辑时钟，每次被接受的变更都会加一，
/// 冲突解决器据此给乱序到达的网络快照排序。
///
/// 字段只在 crate 内可写，外部只能读取，修改必须经过 [`GameState::apply`]。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub(crate) room_id: RoomId,
    pub(crate) config: GameConfig,
    // 按座位顺序排列的玩家，发牌也按这个顺序
    pub(crate) players: Vec<Player>,
    pub(crate) phase: GamePhase,
    // 第几局，从 1 开始；尚未发过牌时为 0
    pub(crate) round: u32,
    pub(crate) version: u64,

    // 发牌后除不尽、没有发出去的牌
    pub(crate) deck: Vec<Card>,
    pub(crate) hands: HashMap<PlayerId, Vec<Card>>,
    pub(crate) trick: Trick,
    // 每位玩家本局赢下的牌
    pub(crate) won_cards: HashMap<PlayerId, Vec<Card>>,
    // 每位玩家本局赢下的墩数
    pub(crate) tricks_won: HashMap<PlayerId, u32>,
    pub(crate) bids: HashMap<PlayerId, Bid>,
    pub(crate) declarations: HashMap<PlayerId, Declaration>,
    pub(crate) scores: ScoreLedger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub nickname: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GamePhase {
    WaitingForPlayers,
    InRound,
    RoundSettled, // 一局结束，结算完成
}

// --- GameState 的实现方法 ---

impl GameState {
    pub fn new(room_id: RoomId, config: GameConfig) -> Self {
        Self {
            room_id,
            config,
            players: Vec::new(),
            phase: GamePhase::WaitingForPlayers,
            round: 0,
            version: 0,
            deck: Vec::new(),
            hands: HashMap::new(),
            trick: Trick::new(),
            won_cards: HashMap::new(),
            tricks_won: HashMap::new(),
            bids: HashMap::new(),
            declarations: HashMap::new(),
            scores: ScoreLedger::new(),
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// 按座位顺序排列的玩家
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// 未发出的牌
    pub fn undealt(&self) -> &[Card] {
        &self.deck
    }

    pub fn trick(&self) -> &Trick {
        &self.trick
    }

    pub fn won_cards(&self, player_id: &PlayerId) -> &[Card] {
        self.won_cards.get(player_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tricks_won(&self, player_id: &PlayerId) -> u32 {
        self.tricks_won.get(player_id).copied().unwrap_or(0)
    }

    pub fn bid(&self, player_id: &PlayerId) -> Option<&Bid> {
        self.bids.get(player_id)
    }

    pub fn declaration(&self, player_id: &PlayerId) -> Option<&Declaration> {
        self.declarations.get(player_id)
    }

    pub fn scores(&self) -> &ScoreLedger {
        &self.scores
    }

    pub fn player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == player_id)
    }

    pub fn is_seated(&self, player_id: &PlayerId) -> bool {
        self.player(player_id).is_some()
    }

    pub fn hand(&self, player_id: &PlayerId) -> &[Card] {
        self.hands.get(player_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 手牌中除去叫牌预留的牌，即本局还能正常打出的牌
    pub fn playable_cards(&self, player_id: &PlayerId) -> Vec<Card> {
        let bid = self.bids.get(player_id);
        self.hand(player_id)
            .iter()
            .filter(|c| !bid.is_some_and(|b| b.reserves(&c.id)))
            .copied()
            .collect()
    }

    pub fn find_in_hand(&self, player_id: &PlayerId, card_id: &CardId) -> Option<Card> {
        self.hand(player_id).iter().find(|c| &c.id == card_id).copied()
    }

    pub fn has_declared(&self, player_id: &PlayerId) -> bool {
        self.declarations.contains_key(player_id)
    }

    pub fn can_declare(&self, player_id: &PlayerId) -> bool {
        declaration::can_declare(self.bids.get(player_id), self.has_declared(player_id))
    }

    /// 为某个客户端生成的视图：隐藏未发的牌堆和其他玩家的手牌
    pub fn for_client(&self, client_id: &PlayerId) -> Self {
        let mut client_state = self.clone();
        client_state.deck.clear();

        for (player_id, hand) in client_state.hands.iter_mut() {
            if player_id != client_id {
                hand.clear();
            }
        }

        client_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Rank, Suit};

    fn state_with_hands() -> (GameState, PlayerId, PlayerId) {
        let mut state = GameState::new(RoomId::new_v4(), GameConfig::default());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        state.players.push(Player { id: a, nickname: "a".into() });
        state.players.push(Player { id: b, nickname: "b".into() });
        state.hands.insert(a, vec![Card::new(Rank::Ace, Suit::Spade), Card::new(Rank::Two, Suit::Club)]);
        state.hands.insert(b, vec![Card::new(Rank::King, Suit::Heart)]);
        state.deck.push(Card::new(Rank::Three, Suit::Diamond));
        (state, a, b)
    }

    #[test]
    fn test_for_client_hides_other_hands_and_deck() {
        let (state, a, b) = state_with_hands();
        let view = state.for_client(&a);
        assert!(view.deck.is_empty());
        assert_eq!(view.hand(&a).len(), 2);
        assert!(view.hand(&b).is_empty());
        // 原状态不受影响
        assert_eq!(state.hand(&b).len(), 1);
    }

    #[test]
    fn test_playable_cards_exclude_bid_cards() {
        let (mut state, a, _) = state_with_hands();
        let reserved = state.hand(&a)[1];
        state.bids.insert(a, Bid { player_id: a, cards: vec![reserved], value: 3 });
        let playable = state.playable_cards(&a);
        assert_eq!(playable.len(), 1);
        assert!(!playable.contains(&reserved));
    }

    #[test]
    fn test_read_accessors_default_to_empty() {
        let (state, a, _) = state_with_hands();
        let stranger = Uuid::new_v4();
        assert_eq!(state.players().len(), 2);
        assert_eq!(state.undealt().len(), 1);
        assert!(state.won_cards(&a).is_empty());
        assert_eq!(state.tricks_won(&stranger), 0);
        assert!(state.bid(&a).is_none());
        assert!(state.declaration(&a).is_none());
        assert_eq!(state.scores().score(&a), 0);
        assert_eq!(state.phase(), GamePhase::WaitingForPlayers);
        assert_eq!(state.version(), 0);
    }

    #[test]
    fn test_serde_round_trip_keeps_card_ids() {
        let (state, a, _) = state_with_hands();
        let json = serde_json::to_string(&state).unwrap();
        let back: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
        assert_eq!(back.hand(&a)[0].id, state.hand(&a)[0].id);
    }
}
