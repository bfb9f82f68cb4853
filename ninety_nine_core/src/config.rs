use crate::declaration::DeclarationKind;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_BID_CARDS: usize = 3;
pub const DEFAULT_MIN_PLAYERS: usize = 2;

/// 牌局规则配置
///
/// 宣告奖励和叫牌命中奖励的分值属于部署配置，默认都是 0。
/// 所有字段都有默认值，配置文件里只需写要覆盖的项。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// 叫牌时最多可选的牌数
    pub max_bid_cards: usize,
    /// 每赢一墩得分
    pub trick_points: u32,
    /// 各类宣告在结算时的奖励
    pub declaration_bonus: DeclarationBonus,
    /// 赢墩数恰好等于叫牌值时的奖励
    pub exact_bid_bonus: u32,
    /// 开局所需的最少玩家数
    pub min_players: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_bid_cards: DEFAULT_MAX_BID_CARDS,
            trick_points: 1,
            declaration_bonus: DeclarationBonus::default(),
            exact_bid_bonus: 0,
            min_players: DEFAULT_MIN_PLAYERS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeclarationBonus {
    pub flush: u32,
    pub sequence: u32,
    pub marriage: u32,
}

impl DeclarationBonus {
    pub fn for_kind(&self, kind: DeclarationKind) -> u32 {
        match kind {
            DeclarationKind::Flush => self.flush,
            DeclarationKind::Sequence => self.sequence,
            DeclarationKind::Marriage => self.marriage,
        }
    }
}
