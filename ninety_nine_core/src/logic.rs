use crate::bidding;
use crate::card::{self, Card, CardId};
use crate::declaration::{self, DeclarationKind};
use crate::error::Rejection;
use crate::state::*;
use crate::trick::Trick;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 对牌局状态的一次意图。所有变更都经由 [`GameState::apply`] 这一个入口。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameCommand {
    Join { player_id: PlayerId, nickname: String },
    Leave { player_id: PlayerId },
    /// 开始新的一局，给定种子时洗牌结果可复现
    Deal { seed: Option<u64> },
    PlayCard { player_id: PlayerId, card_id: CardId },
    SubmitBid { player_id: PlayerId, card_ids: Vec<CardId> },
    Declare { player_id: PlayerId, kind: DeclarationKind },
    SettleRound,
}

/// 一次状态转换中发生的事情，供服务器广播
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    PlayerJoined { player_id: PlayerId },
    PlayerLeft { player_id: PlayerId },
    RoundDealt { round: u32 },
    CardPlayed { player_id: PlayerId, card: Card },
    TrickWon { player_id: PlayerId, points: u32 },
    BidPlaced { player_id: PlayerId, value: u32 },
    Declared { player_id: PlayerId, kind: DeclarationKind },
    RoundSettled { round: u32, scores: HashMap<PlayerId, i64> },
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: GameState,
    pub events: Vec<GameEvent>,
}

impl GameState {
    /// 唯一的状态转换函数。
    ///
    /// 在副本上执行命令：成功返回新状态和事件，被拒绝时 `self` 保持原样。
    pub fn apply(&self, command: GameCommand) -> Result<Transition, Rejection> {
        let mut next = self.clone();
        let events = match command {
            GameCommand::Join { player_id, nickname } => join(&mut next, player_id, nickname)?,
            GameCommand::Leave { player_id } => leave(&mut next, player_id)?,
            GameCommand::Deal { seed } => start_new_round(&mut next, seed)?,
            GameCommand::PlayCard { player_id, card_id } => play_card(&mut next, player_id, card_id)?,
            GameCommand::SubmitBid { player_id, card_ids } => submit_bid(&mut next, player_id, card_ids)?,
            GameCommand::Declare { player_id, kind } => declare(&mut next, player_id, kind)?,
            GameCommand::SettleRound => settle_round(&mut next)?,
        };
        Ok(Transition { state: next, events })
    }

    fn bump_version(&mut self) {
        self.version += 1;
    }
}

// --- 辅助校验 ---

fn require_phase(state: &GameState, allowed: &[GamePhase]) -> Result<(), Rejection> {
    if allowed.contains(&state.phase) {
        Ok(())
    } else {
        Err(Rejection::PhaseMismatch { phase: state.phase })
    }
}

fn require_seated(state: &GameState, player_id: &PlayerId) -> Result<(), Rejection> {
    if state.is_seated(player_id) {
        Ok(())
    } else {
        Err(Rejection::UnknownPlayer(*player_id))
    }
}

// --- 核心游戏流程函数 ---

fn join(state: &mut GameState, player_id: PlayerId, nickname: String) -> Result<Vec<GameEvent>, Rejection> {
    require_phase(state, &[GamePhase::WaitingForPlayers, GamePhase::RoundSettled])?;
    if state.is_seated(&player_id) {
        return Err(Rejection::PlayerAlreadyJoined(player_id));
    }

    state.players.push(Player { id: player_id, nickname });
    state.bump_version();
    Ok(vec![GameEvent::PlayerJoined { player_id }])
}

fn leave(state: &mut GameState, player_id: PlayerId) -> Result<Vec<GameEvent>, Rejection> {
    require_phase(state, &[GamePhase::WaitingForPlayers, GamePhase::RoundSettled])?;
    require_seated(state, &player_id)?;

    state.players.retain(|p| p.id != player_id);
    // 离开玩家手里剩下的牌回到牌堆，分数保留
    if let Some(hand) = state.hands.remove(&player_id) {
        state.deck.extend(hand);
    }
    if let Some(won) = state.won_cards.remove(&player_id) {
        state.deck.extend(won);
    }
    state.tricks_won.remove(&player_id);
    state.bids.remove(&player_id);
    state.declarations.remove(&player_id);

    state.bump_version();
    Ok(vec![GameEvent::PlayerLeft { player_id }])
}

/// 开始新的一局
///
/// - 创建一副新牌并洗牌，按座位顺序发成等长的手牌，余下的牌留在牌堆。
/// - 清空当前墩、叫牌、宣告、赢墩记录；计分表跨局保留。
fn start_new_round(state: &mut GameState, seed: Option<u64>) -> Result<Vec<GameEvent>, Rejection> {
    require_phase(state, &[GamePhase::WaitingForPlayers, GamePhase::RoundSettled])?;

    let active_player_count = state.players.len();
    if active_player_count < state.config.min_players {
        return Err(Rejection::NotEnoughPlayers { min: state.config.min_players, actual: active_player_count });
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let deck = card::shuffle(card::create_deck(), &mut rng);
    let dealt = card::deal(deck, active_player_count)?;

    state.hands = state.players.iter().map(|p| p.id).zip(dealt.hands).collect();
    state.deck = dealt.undealt;
    state.trick = Trick::new();
    state.won_cards = state.players.iter().map(|p| (p.id, Vec::new())).collect();
    state.tricks_won = state.players.iter().map(|p| (p.id, 0)).collect();
    state.bids.clear();
    state.declarations.clear();

    state.round += 1;
    state.phase = GamePhase::InRound;
    state.bump_version();

    Ok(vec![GameEvent::RoundDealt { round: state.round }])
}

/// 处理出牌
///
/// 依次校验：牌在手中、没有被叫牌预留、本墩尚未出过牌、跟花规则。
/// 所有人都出过牌后判定赢家、记分、把牌收进赢家的赢墩堆并清空本墩。
fn play_card(state: &mut GameState, player_id: PlayerId, card_id: CardId) -> Result<Vec<GameEvent>, Rejection> {
    require_phase(state, &[GamePhase::InRound])?;
    require_seated(state, &player_id)?;

    let card = state.find_in_hand(&player_id, &card_id).ok_or(Rejection::CardNotInHand { card_id })?;
    if state.bids.get(&player_id).is_some_and(|b| b.reserves(&card_id)) {
        return Err(Rejection::CardReservedForBid { card_id });
    }
    if state.trick.has_played(&player_id) {
        return Err(Rejection::AlreadyPlayedThisTrick);
    }
    if !state.trick.play_card(card, player_id) {
        // 只有在已经有首引花色时才会被拒绝
        let lead = state.trick.leading_suit().unwrap_or(card.suit);
        return Err(Rejection::MustFollowSuit { lead });
    }

    if let Some(hand) = state.hands.get_mut(&player_id) {
        hand.retain(|c| c.id != card_id);
    }
    state.bump_version();

    let mut events = vec![GameEvent::CardPlayed { player_id, card }];
    if state.trick.is_complete(state.players.len()) {
        events.extend(resolve_trick(state));
    }
    Ok(events)
}

/// 结算满员的一墩：先记分，再清空
fn resolve_trick(state: &mut GameState) -> Option<GameEvent> {
    let winner = state.trick.winner()?;
    let points = state.config.trick_points;

    state.scores.credit_trick(winner, points);
    *state.tricks_won.entry(winner).or_insert(0) += 1;
    state.bump_version();

    let cards = state.trick.clear();
    state.won_cards.entry(winner).or_default().extend(cards);
    state.bump_version();

    Some(GameEvent::TrickWon { player_id: winner, points })
}

/// 提交叫牌，替换该玩家之前的叫牌。之前预留的牌重新可以打出。
fn submit_bid(state: &mut GameState, player_id: PlayerId, card_ids: Vec<CardId>) -> Result<Vec<GameEvent>, Rejection> {
    require_phase(state, &[GamePhase::InRound])?;
    require_seated(state, &player_id)?;

    let mut selection: Vec<Card> = Vec::with_capacity(card_ids.len());
    for card_id in card_ids {
        if selection.iter().any(|c| c.id == card_id) {
            continue;
        }
        let card = state.find_in_hand(&player_id, &card_id).ok_or(Rejection::CardNotInHand { card_id })?;
        selection.push(card);
    }

    let bid = bidding::submit_bid(player_id, selection, state.hand(&player_id), state.config.max_bid_cards)?;
    let value = bid.value;
    state.bids.insert(player_id, bid);
    state.bump_version();

    Ok(vec![GameEvent::BidPlaced { player_id, value }])
}

fn declare(state: &mut GameState, player_id: PlayerId, kind: DeclarationKind) -> Result<Vec<GameEvent>, Rejection> {
    require_phase(state, &[GamePhase::InRound])?;
    require_seated(state, &player_id)?;

    let declaration = declaration::declare(player_id, kind, state.bids.get(&player_id), state.has_declared(&player_id))?;
    state.declarations.insert(player_id, declaration);
    state.bump_version();

    Ok(vec![GameEvent::Declared { player_id, kind }])
}

/// 回合结算
///
/// - 每个宣告按配置发放奖励。
/// - 赢墩数恰好等于叫牌值的玩家获得命中奖励。
fn settle_round(state: &mut GameState) -> Result<Vec<GameEvent>, Rejection> {
    require_phase(state, &[GamePhase::InRound])?;

    for player_id in state.players.iter().map(|p| p.id) {
        if let Some(declaration) = state.declarations.get(&player_id) {
            state.scores.credit_declaration(player_id, declaration.kind, &state.config.declaration_bonus);
        }
        if let Some(bid) = state.bids.get(&player_id) {
            let won = state.tricks_won.get(&player_id).copied().unwrap_or(0);
            if won == bid.value {
                state.scores.credit_exact_bid(player_id, state.config.exact_bid_bonus);
            }
        }
    }

    state.phase = GamePhase::RoundSettled;
    state.bump_version();

    Ok(vec![GameEvent::RoundSettled { round: state.round, scores: state.scores.snapshot() }])
}

// --- 单元测试 ---
