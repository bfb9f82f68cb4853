use crate::config::DeclarationBonus;
use crate::declaration::DeclarationKind;
use crate::state::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 计分表 (ScoreLedger)
///
/// 只有加分路径：赢墩、宣告奖励、叫牌命中奖励。未出现过的玩家按 0 分起算。
/// 跨回合累计，新一局不会清零。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreLedger {
    scores: HashMap<PlayerId, i64>,
}

impl ScoreLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credit_trick(&mut self, player_id: PlayerId, points: u32) {
        self.credit(player_id, points);
    }

    /// 按配置发放宣告奖励，返回实际加的分
    pub fn credit_declaration(&mut self, player_id: PlayerId, kind: DeclarationKind, bonus: &DeclarationBonus) -> u32 {
        let amount = bonus.for_kind(kind);
        self.credit(player_id, amount);
        amount
    }

    pub fn credit_exact_bid(&mut self, player_id: PlayerId, bonus: u32) {
        self.credit(player_id, bonus);
    }

    pub fn score(&self, player_id: &PlayerId) -> i64 {
        self.scores.get(player_id).copied().unwrap_or(0)
    }

    /// 只读副本，调用方修改它不会影响计分表
    pub fn snapshot(&self) -> HashMap<PlayerId, i64> {
        self.scores.clone()
    }

    fn credit(&mut self, player_id: PlayerId, amount: u32) {
        *self.scores.entry(player_id).or_insert(0) += i64::from(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_unseen_player_starts_at_zero() {
        let mut ledger = ScoreLedger::new();
        let p = Uuid::new_v4();
        assert_eq!(ledger.score(&p), 0);
        ledger.credit_trick(p, 1);
        ledger.credit_trick(p, 1);
        assert_eq!(ledger.score(&p), 2);
    }

    #[test]
    fn test_declaration_bonus_from_config() {
        let mut ledger = ScoreLedger::new();
        let p = Uuid::new_v4();
        let bonus = DeclarationBonus { flush: 30, sequence: 20, marriage: 10 };
        assert_eq!(ledger.credit_declaration(p, DeclarationKind::Sequence, &bonus), 20);
        assert_eq!(ledger.score(&p), 20);
    }

    #[test]
    fn test_snapshot_is_isolated() {
        let mut ledger = ScoreLedger::new();
        let p = Uuid::new_v4();
        ledger.credit_trick(p, 5);

        let mut snapshot = ledger.snapshot();
        snapshot.insert(p, -100);
        assert_eq!(ledger.score(&p), 5);
    }
}
