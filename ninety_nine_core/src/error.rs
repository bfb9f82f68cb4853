use crate::card::{CardId, Suit};
use crate::state::{GamePhase, PlayerId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 被拒绝的意图 (Rejected intent)
///
/// 这些都是可预期、可恢复的结果：规则引擎用返回值表达拒绝，
/// 不会 panic，也不会修改任何状态。调用方决定如何提示用户。
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Rejection {
    #[error("必须跟出首引花色 {lead}")]
    MustFollowSuit { lead: Suit },
    #[error("手牌中没有这张牌 ({card_id})")]
    CardNotInHand { card_id: CardId },
    #[error("这张牌已用于叫牌，本局不能打出 ({card_id})")]
    CardReservedForBid { card_id: CardId },
    #[error("本墩已经出过牌了")]
    AlreadyPlayedThisTrick,
    #[error("叫牌至少需要选择一张牌")]
    EmptyBid,
    #[error("叫牌最多只能选择 {max} 张牌")]
    BidTooLarge { max: usize },
    #[error("尚未叫牌，不能宣告")]
    NoActiveBid,
    #[error("本局已经宣告过了")]
    AlreadyDeclared,
    #[error("未知的宣告类型: {0}")]
    UnknownDeclaration(String),
    #[error("玩家不存在 ({0})")]
    UnknownPlayer(PlayerId),
    #[error("玩家已经在牌局中 ({0})")]
    PlayerAlreadyJoined(PlayerId),
    #[error("至少需要 {min} 名玩家，当前只有 {actual} 名")]
    NotEnoughPlayers { min: usize, actual: usize },
    #[error("无效的玩家人数: {0}")]
    InvalidPlayerCount(usize),
    #[error("当前阶段 {phase:?} 不允许该操作")]
    PhaseMismatch { phase: GamePhase },
}
