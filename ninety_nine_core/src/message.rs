use crate::card::CardId;
use crate::declaration::DeclarationKind;
use crate::error::Rejection;
use crate::logic::GameCommand;
use crate::state::{GameState, Player, PlayerId, RoomId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type PlayerSecret = Uuid;

// --- 客户端 -> 服务器 的消息 ---
// 这些是客户端可以发送给服务器的指令或意图。

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    // --- 房间管理消息 ---
    /// 客户端请求创建一个新房间
    CreateRoom { nickname: String },
    /// 客户端请求加入一个已存在的房间
    JoinRoom { room_id: RoomId, nickname: String },

    // --- 游戏内消息 ---
    /// 房主发牌，开始新的一局
    Deal,
    /// 打出一张牌
    PlayCard { card_id: CardId },
    /// 用选中的牌叫牌
    SubmitBid { card_ids: Vec<CardId> },
    /// 叫牌后宣告特殊牌型
    Declare { kind: DeclarationKind },
    /// 房主结算本局
    SettleRound,
    /// 请求一份最新的快照
    GetSnapshot,
}

impl ClientMessage {
    /// 把游戏内消息转换成针对该玩家的命令，房间管理消息返回 `None`
    pub fn into_command(self, player_id: PlayerId) -> Option<GameCommand> {
        match self {
            ClientMessage::Deal => Some(GameCommand::Deal { seed: None }),
            ClientMessage::PlayCard { card_id } => Some(GameCommand::PlayCard { player_id, card_id }),
            ClientMessage::SubmitBid { card_ids } => Some(GameCommand::SubmitBid { player_id, card_ids }),
            ClientMessage::Declare { kind } => Some(GameCommand::Declare { player_id, kind }),
            ClientMessage::SettleRound => Some(GameCommand::SettleRound),
            ClientMessage::CreateRoom { .. } | ClientMessage::JoinRoom { .. } | ClientMessage::GetSnapshot => None,
        }
    }

    /// 只有房主可以发送的消息
    pub fn requires_host(&self) -> bool {
        matches!(self, ClientMessage::Deal | ClientMessage::SettleRound)
    }
}

// --- 服务器 -> 客户端 的消息 ---
// 这些是服务器在游戏状态改变后，广播给客户端的事件通知。

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum ServerMessage {
    // --- 房间管理消息 ---
    /// 成功加入或创建房间后，服务器私密地发给该玩家
    RoomJoined {
        your_id: PlayerId,
        your_secret: PlayerSecret,
        game_state: GameState, // 净化后的初始游戏状态
        host_id: PlayerId,
    },
    /// 请求的房间不存在
    RoomNotFound { room_id: RoomId },

    // --- 游戏状态更新消息 ---
    /// 完整游戏状态的快照。
    /// 每次状态变更后发送，发送时会调用 state.for_client(client_id) 来隐藏其他玩家的手牌。
    GameStateSnapshot(GameState),

    /// 一个新玩家加入了房间
    PlayerJoined { player: Player },

    /// 一个玩家离开了房间
    PlayerLeft { player_id: PlayerId },

    /// 一墩结束
    TrickWon { player_id: PlayerId, points: u32 },

    /// 一局结算完成
    RoundSettled { round: u32, scores: HashMap<PlayerId, i64> },

    /// 意图被规则引擎拒绝，只发给发起者
    IntentRejected { reason: Rejection },

    Info { message: String },
    Error { message: String },
}
