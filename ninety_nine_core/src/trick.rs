use crate::card::{Card, Suit};
use crate::state::PlayerId;
use serde::{Deserialize, Serialize};

/// 一墩中的一次出牌
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Play {
    pub card: Card,
    pub player_id: PlayerId,
}

/// 当前墩 (Trick)
///
/// 按出牌顺序保存 (牌, 玩家)。第一张牌的花色就是首引花色。
/// 状态流转：空 -> 进行中 -> 满员 -> 判定赢家 -> 清空。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trick {
    plays: Vec<Play>,
}

impl Trick {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接用已有的出牌记录构造一墩，不做跟花校验 (例如从远端快照恢复)
    pub fn from_plays(plays: Vec<Play>) -> Self {
        Self { plays }
    }

    pub fn plays(&self) -> &[Play] {
        &self.plays
    }

    pub fn len(&self) -> usize {
        self.plays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plays.is_empty()
    }

    /// 每位玩家都出过一张牌后本墩满员
    pub fn is_complete(&self, num_players: usize) -> bool {
        num_players > 0 && self.plays.len() >= num_players
    }

    pub fn leading_suit(&self) -> Option<Suit> {
        self.plays.first().map(|p| p.card.suit)
    }

    pub fn has_played(&self, player_id: &PlayerId) -> bool {
        self.plays.iter().any(|p| &p.player_id == player_id)
    }

    /// 出一张牌。
    ///
    /// 本墩非空且花色与首引花色不同则拒绝，返回 `false` 且本墩不变。
    /// 这里不检查玩家手里是否还有首引花色的牌：只持有其他花色的玩家
    /// 同样会被拒绝，是否放行由调用方决定。
    pub fn play_card(&mut self, card: Card, player_id: PlayerId) -> bool {
        if let Some(lead) = self.leading_suit() {
            if card.suit != lead {
                return false;
            }
        }
        self.plays.push(Play { card, player_id });
        true
    }

    /// 找出赢家在出牌顺序中的下标。
    ///
    /// 只比较首引花色的牌，点数 2 < 3 < ... < K < A。点数相同 (多副牌)
    /// 时先出的赢。王牌只在首引就是王牌时参与比较，彼此之间也按先后。
    /// 空墩返回 `None`。
    pub fn determine_winner(&self) -> Option<usize> {
        let lead = self.leading_suit()?;
        let mut best = 0;
        for (idx, play) in self.plays.iter().enumerate().skip(1) {
            if play.card.suit == lead && play.card.rank > self.plays[best].card.rank {
                best = idx;
            }
        }
        Some(best)
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.determine_winner().map(|idx| self.plays[idx].player_id)
    }

    /// 清空本墩，返回其中的牌 (交给赢家的赢墩堆)
    pub fn clear(&mut self) -> Vec<Card> {
        self.plays.drain(..).map(|p| p.card).collect()
    }
}
