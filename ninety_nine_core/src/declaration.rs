use crate::bidding::Bid;
use crate::error::Rejection;
use crate::state::PlayerId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 宣告类型，封闭集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclarationKind {
    Flush,    // 同花
    Sequence, // 顺子
    Marriage, // 同花 K+Q
}

impl DeclarationKind {
    pub const ALL: [DeclarationKind; 3] = [DeclarationKind::Flush, DeclarationKind::Sequence, DeclarationKind::Marriage];
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            DeclarationKind::Flush => "flush",
            DeclarationKind::Sequence => "sequence",
            DeclarationKind::Marriage => "marriage",
        })
    }
}

/// 在边界处把用户输入解析为宣告类型，集合之外的一律拒绝
impl FromStr for DeclarationKind {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flush" => Ok(DeclarationKind::Flush),
            "sequence" => Ok(DeclarationKind::Sequence),
            "marriage" => Ok(DeclarationKind::Marriage),
            _ => Err(Rejection::UnknownDeclaration(s.to_string())),
        }
    }
}

/// 宣告 (Declaration)，每位玩家每局最多一次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub player_id: PlayerId,
    pub kind: DeclarationKind,
}

/// 有至少一张叫牌的有效叫牌、且本局尚未宣告过
pub fn can_declare(bid: Option<&Bid>, already_declared: bool) -> bool {
    !already_declared && bid.is_some_and(|b| !b.cards.is_empty())
}

/// 记录一次宣告。奖励分在回合结算时由计分表按配置发放。
pub fn declare(player_id: PlayerId, kind: DeclarationKind, bid: Option<&Bid>, already_declared: bool) -> Result<Declaration, Rejection> {
    if already_declared {
        return Err(Rejection::AlreadyDeclared);
    }
    if !can_declare(bid, already_declared) {
        return Err(Rejection::NoActiveBid);
    }
    Ok(Declaration { player_id, kind })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Card, Rank, Suit};
    use uuid::Uuid;

    fn bid_for(player_id: PlayerId) -> Bid {
        Bid { player_id, cards: vec![Card::new(Rank::Two, Suit::Club)], value: 3 }
    }

    #[test]
    fn test_no_bid_cannot_declare() {
        assert!(!can_declare(None, false));
        assert_eq!(declare(Uuid::new_v4(), DeclarationKind::Flush, None, false), Err(Rejection::NoActiveBid));
    }

    #[test]
    fn test_bid_without_cards_cannot_declare() {
        let player_id = Uuid::new_v4();
        let bid = Bid { player_id, cards: vec![], value: 0 };
        assert!(!can_declare(Some(&bid), false));
    }

    #[test]
    fn test_declare_after_bid() {
        let player_id = Uuid::new_v4();
        let bid = bid_for(player_id);
        assert!(can_declare(Some(&bid), false));
        let declaration = declare(player_id, DeclarationKind::Marriage, Some(&bid), false).unwrap();
        assert_eq!(declaration.kind, DeclarationKind::Marriage);
    }

    #[test]
    fn test_second_declaration_rejected_for_any_kind() {
        let player_id = Uuid::new_v4();
        let bid = bid_for(player_id);
        for kind in DeclarationKind::ALL {
            assert_eq!(declare(player_id, kind, Some(&bid), true), Err(Rejection::AlreadyDeclared));
        }
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("Flush".parse::<DeclarationKind>(), Ok(DeclarationKind::Flush));
        assert_eq!(" sequence ".parse::<DeclarationKind>(), Ok(DeclarationKind::Sequence));
        assert_eq!(
            "straight".parse::<DeclarationKind>(),
            Err(Rejection::UnknownDeclaration("straight".to_string()))
        );
    }
}
