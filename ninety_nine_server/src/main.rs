mod config;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use dashmap::DashMap;
use futures_util::{stream::StreamExt, SinkExt};
use parking_lot::{Mutex as P_Mutex, RwLock as P_RwLock};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use ninety_nine_core::{
    ClientMessage, GameCommand, GameConfig, GameEvent, GamePhase, GameState, PlayerId, Rejection, RoomId,
    ServerMessage,
};

use crate::config::ServerConfig;

// 服务器全局状态
struct AppState {
    rooms: DashMap<RoomId, Arc<Room>>,
    rules: GameConfig,
}

// 单个房间的状态，game_state 是这个房间唯一的权威状态
// 重要‼️：严格规定使用锁的顺序，避免死锁：
// players -> host_id -> game_state -> departed
struct Room {
    game_state: P_Mutex<GameState>,
    host_id: P_RwLock<PlayerId>,
    // 牌局进行中断线的玩家，等本局结算后再离座
    departed: P_Mutex<HashSet<PlayerId>>,
    // 将 PlayerId 映射到具体的网络连接
    players: RwLock<HashMap<PlayerId, PlayerConnection>>,
}

// 玩家的网络连接信息
struct PlayerConnection {
    // 用于向该玩家的 WebSocket 任务发送消息的通道
    sender: mpsc::Sender<ServerMessage>,
}

type SharedState = Arc<AppState>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::load()?;
    info!(?config.rules, "规则已加载");

    let state = SharedState::new(AppState {
        rooms: DashMap::new(),
        rules: config.rules,
    });

    let app = Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(state);

    info!("服务器正在监听 {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// 处理 WebSocket 连接请求
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// 处理单个 WebSocket 连接的生命周期
async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (mut sender, mut receiver) = socket.split();

    // 创建一个 MPSC 通道，用于从其他任务接收要发送的消息
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(32);

    // 启动一个新任务，专门负责将 MPSC 通道中的消息发送到 WebSocket
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let payload = match serde_json::to_string(&msg) {
                Ok(p) => p,
                Err(e) => {
                    warn!("序列化消息失败: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                // 发送失败，说明客户端已断开，退出任务
                break;
            }
        }
    });

    // 当前连接的上下文信息，在加入房间后填充
    let mut player_context: Option<(RoomId, PlayerId)> = None;

    // 主循环，处理从客户端接收到的消息
    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Text(text) = msg {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    handle_client_message(client_msg, state.clone(), &tx, &mut player_context).await;
                }
                Err(e) => {
                    warn!("解析消息失败: {}", e);
                }
            }
        }
    }

    // 客户端断开连接，执行清理工作
    if let Some((room_id, player_id)) = player_context {
        handle_disconnect(state, room_id, player_id).await;
    }
    info!("客户端连接关闭");
}

/// 核心消息处理逻辑
async fn handle_client_message(
    msg: ClientMessage,
    state: SharedState,
    tx: &mpsc::Sender<ServerMessage>,
    context: &mut Option<(RoomId, PlayerId)>,
) {
    match msg {
        ClientMessage::CreateRoom { nickname } => {
            if context.is_some() {
                let _ = tx.send(ServerMessage::Error { message: "你已经在一个房间里了".to_string() }).await;
                return;
            }

            let room_id = Uuid::new_v4();
            let player_id = Uuid::new_v4();
            let player_secret = Uuid::new_v4();

            let game_state = match GameState::new(room_id, state.rules.clone())
                .apply(GameCommand::Join { player_id, nickname })
            {
                Ok(transition) => transition.state,
                Err(reason) => {
                    let _ = tx.send(ServerMessage::IntentRejected { reason }).await;
                    return;
                }
            };
            let gs_for_client = game_state.for_client(&player_id);

            let mut room = Room {
                game_state: P_Mutex::new(game_state),
                host_id: P_RwLock::new(player_id),
                departed: P_Mutex::new(HashSet::new()),
                players: RwLock::new(HashMap::new()),
            };
            room.players.get_mut().insert(player_id, PlayerConnection { sender: tx.clone() });

            state.rooms.insert(room_id, Arc::new(room));

            info!("玩家 {} 创建了新房间 {}", player_id, room_id);
            *context = Some((room_id, player_id));
            let _ = tx.send(ServerMessage::RoomJoined {
                your_id: player_id,
                your_secret: player_secret,
                game_state: gs_for_client,
                host_id: player_id,
            }).await;
        }
        ClientMessage::JoinRoom { room_id, nickname } => {
            if context.is_some() {
                let _ = tx.send(ServerMessage::Error { message: "你已经在一个房间里了".to_string() }).await;
                return;
            }

            let Some(room) = find_room(&state, &room_id) else {
                let _ = tx.send(ServerMessage::RoomNotFound { room_id }).await;
                return;
            };

            let player_id = Uuid::new_v4();
            let player_secret = Uuid::new_v4();

            let joined = {  // r_players write lock
                let mut r_players = room.players.write().await;

                let joined = {  // r_game_state lock
                    let mut game_state = room.game_state.lock();
                    match game_state.apply(GameCommand::Join { player_id, nickname }) {
                        Ok(transition) => {
                            *game_state = transition.state;
                            let player = game_state.player(&player_id).cloned();
                            Ok((player, game_state.for_client(&player_id)))
                        }
                        Err(reason) => Err(reason),
                    }
                };

                if joined.is_ok() {
                    r_players.insert(player_id, PlayerConnection { sender: tx.clone() });
                }
                joined
            };

            let (player, gs_for_client) = match joined {
                Ok(j) => j,
                Err(reason) => {
                    info!("玩家加入房间 {} 被拒绝: {}", room_id, reason);
                    let _ = tx.send(ServerMessage::IntentRejected { reason }).await;
                    return;
                }
            };

            info!("玩家 {} 加入了房间 {}", player_id, room_id);
            *context = Some((room_id, player_id));
            if let Some(player) = player {
                // 广播给房间内其他玩家
                let join_msg = ServerMessage::PlayerJoined { player };
                broadcast(room.players.read().await.iter(), &join_msg, Some(player_id)).await;
            }
            let host_id = *room.host_id.read();
            let _ = tx.send(ServerMessage::RoomJoined {
                your_id: player_id,
                your_secret: player_secret,
                game_state: gs_for_client,
                host_id,
            }).await;
        }
        // ... 其他需要先加入房间才能执行的消息
        _ => {
            let Some((room_id, player_id)) = *context else {
                let _ = tx.send(ServerMessage::Error { message: "请先加入或创建房间".to_string() }).await;
                return;
            };
            let Some(room) = find_room(&state, &room_id) else {
                let _ = tx.send(ServerMessage::RoomNotFound { room_id }).await;
                return;
            };

            if let ClientMessage::GetSnapshot = msg {
                let snapshot = room.game_state.lock().for_client(&player_id);
                let _ = tx.send(ServerMessage::GameStateSnapshot(snapshot)).await;
                return;
            }

            let host_id = *room.host_id.read();
            if msg.requires_host() && player_id != host_id {
                let _ = tx.send(ServerMessage::Error { message: "只有房主可以发牌和结算".to_string() }).await;
                return;
            }

            let Some(command) = msg.into_command(player_id) else {
                return;
            };
            debug!(?command, "处理玩家命令");

            // 游戏逻辑处理，锁只在同步代码块中持有
            let outcome = {
                let mut game_state = room.game_state.lock();
                let mut departed = room.departed.lock();
                apply_command(&mut game_state, &mut departed, command)
            };

            match outcome {
                Ok(messages) => {
                    // 广播事件，再给每个人发送各自的快照
                    for msg in messages {
                        broadcast(room.players.read().await.iter(), &msg, None).await;
                    }
                    broadcast_snapshot(&room).await;
                }
                Err(reason) => {
                    info!("玩家 {} 的意图被拒绝: {}", player_id, reason);
                    // 拒绝消息只发给当前玩家
                    let _ = tx.send(ServerMessage::IntentRejected { reason }).await;
                }
            }
        }
    }
}

/// 应用一条命令并生成要广播的消息。
///
/// 命令执行后如果已经没有进行中的牌局 (例如刚结算完)，
/// 之前断线的玩家在这里离座。
fn apply_command(
    game_state: &mut GameState,
    departed: &mut HashSet<PlayerId>,
    command: GameCommand,
) -> Result<Vec<ServerMessage>, Rejection> {
    let transition = game_state.apply(command)?;
    let mut messages: Vec<ServerMessage> = transition
        .events
        .iter()
        .filter_map(|event| event_message(event, &transition.state))
        .collect();
    *game_state = transition.state;
    messages.extend(release_departed(game_state, departed));
    Ok(messages)
}

/// 让断线的玩家离座，牌局进行中时什么也不做
fn release_departed(game_state: &mut GameState, departed: &mut HashSet<PlayerId>) -> Vec<ServerMessage> {
    if game_state.phase() == GamePhase::InRound || departed.is_empty() {
        return Vec::new();
    }

    let mut messages = Vec::new();
    for player_id in departed.drain() {
        match game_state.apply(GameCommand::Leave { player_id }) {
            Ok(transition) => {
                *game_state = transition.state;
                messages.push(ServerMessage::PlayerLeft { player_id });
            }
            Err(reason) => debug!("玩家 {} 无法离座: {}", player_id, reason),
        }
    }
    messages
}

fn find_room(state: &SharedState, room_id: &RoomId) -> Option<Arc<Room>> {
    state.rooms.get(room_id).map(|r| r.value().clone())
}

/// 把需要单独广播的事件转换成消息，其余事件由快照体现
fn event_message(event: &GameEvent, game_state: &GameState) -> Option<ServerMessage> {
    match event {
        GameEvent::TrickWon { player_id, points } => {
            Some(ServerMessage::TrickWon { player_id: *player_id, points: *points })
        }
        GameEvent::RoundSettled { round, scores } => {
            Some(ServerMessage::RoundSettled { round: *round, scores: scores.clone() })
        }
        GameEvent::PlayerJoined { player_id } => {
            game_state.player(player_id).cloned().map(|player| ServerMessage::PlayerJoined { player })
        }
        GameEvent::PlayerLeft { player_id } => Some(ServerMessage::PlayerLeft { player_id: *player_id }),
        GameEvent::RoundDealt { .. }
        | GameEvent::CardPlayed { .. }
        | GameEvent::BidPlaced { .. }
        | GameEvent::Declared { .. } => None,
    }
}

/// 快照需要为每个玩家单独生成
async fn broadcast_snapshot(room: &Room) {
    let r_players = room.players.read().await;
    let snapshots: Vec<_> = {
        let game_state = room.game_state.lock();
        r_players
            .iter()
            .map(|(pid, conn)| (conn.sender.clone(), game_state.for_client(pid)))
            .collect()
    };
    for (sender, snapshot) in snapshots {
        let _ = sender.send(ServerMessage::GameStateSnapshot(snapshot)).await;
    }
}

/// 玩家断开连接后的处理
async fn handle_disconnect(state: SharedState, room_id: RoomId, player_id: PlayerId) {
    info!("玩家 {} 从房间 {} 断开连接", player_id, room_id);
    let Some(room) = find_room(&state, &room_id) else {
        return;
    };

    {  // r_players write lock
        let mut r_players = room.players.write().await;
        // 从连接映射中移除
        r_players.remove(&player_id);

        // 牌局进行中不能离开，座位保留到本局结算之后
        let messages = {  // r_game_state lock
            let mut game_state = room.game_state.lock();
            let mut departed = room.departed.lock();
            departed.insert(player_id);
            release_departed(&mut game_state, &mut departed)
        };
        if messages.is_empty() {
            info!("玩家 {} 在牌局中断开，本局结算后离座", player_id);
        }
        for msg in &messages {
            broadcast(r_players.iter(), msg, None).await;
        }
    }

    {  // r_players read lock
        let r_players = room.players.read().await;

        // 如果房主断开，转移房主权限
        let host_id = *room.host_id.read();
        if player_id == host_id {
            if let Some(new_host_id) = r_players.keys().next().cloned() {
                *room.host_id.write() = new_host_id;
                let nickname = room.game_state.lock().player(&new_host_id)
                    .map_or("未知玩家".to_string(), |p| p.nickname.clone());
                let info_msg = ServerMessage::Info {
                    message: format!("房主已断开，新房主是 {}", nickname),
                };
                broadcast(r_players.iter(), &info_msg, None).await;
                info!("房间 {} 的房主已转移给 {}", room_id, new_host_id);
            }
        }

        // 判断是否清空房间
        if r_players.is_empty() {
            state.rooms.remove(&room_id);
            info!("房间 {} 已空，已被移除", room_id);
        }
    }

    broadcast_snapshot(&room).await;
}

/// 向房间内所有玩家广播消息
async fn broadcast(
    players: impl Iterator<Item=(&PlayerId, &PlayerConnection)>,
    message: &ServerMessage,
    exclude: Option<PlayerId>,
) {
    for (player_id, conn) in players {
        if Some(*player_id) == exclude {
            continue;
        }
        if conn.sender.send(message.clone()).await.is_err() {
            // 发送失败，说明该玩家也断开了，后续由其自己的 handle_socket 任务处理
            warn!("向玩家 {} 发送消息失败（可能已断开）", player_id);
        }
    }
}
