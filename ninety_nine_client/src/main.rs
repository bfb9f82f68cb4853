mod session;

use std::env;
use std::io::Write;
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use url::Url;

use ninety_nine_core::{
    ClientMessage, ConflictResolver, DeclarationKind, DiscardStaleRemote, GameState, PlayerId, RoomId, ServerMessage,
};

use crate::session::ClientSession;

const DEFAULT_SERVER: &str = "ws://127.0.0.1:25917/ws";
const DEFAULT_RESOLVE_TIMEOUT_MS: u64 = 5000;

/// 用户输入解析出的动作
#[derive(Debug, PartialEq)]
enum Input {
    Send(ClientMessage),
    Show(String),
    Exit,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let url = Url::parse(&env::var("NINETY_NINE_SERVER").unwrap_or_else(|_| DEFAULT_SERVER.to_string()))
        .context("无效的服务器地址")?;
    let timeout_ms = match env::var("NINETY_NINE_RESOLVE_TIMEOUT_MS") {
        Ok(v) => v.parse().context("NINETY_NINE_RESOLVE_TIMEOUT_MS 必须是整数")?,
        Err(_) => DEFAULT_RESOLVE_TIMEOUT_MS,
    };

    let mut resolver = ConflictResolver::new();
    resolver.install(DiscardStaleRemote::new());
    let mut session = ClientSession::new(resolver, Duration::from_millis(timeout_ms));

    println!("正在连接到: {}", url);
    let (ws_stream, _) = connect_async(url.as_str()).await.context("无法连接")?;
    println!("连接成功!");

    let (mut write, mut read) = ws_stream.split();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    print_help();
    prompt()?;

    loop {
        tokio::select! {
            line = stdin.next_line() => {
                let Some(line) = line? else { break };
                match parse_line(&line, &mut session) {
                    Input::Send(msg) => {
                        // 先在本地乐观应用，规则拒绝的意图不再发送
                        match session.apply_local(&msg) {
                            Ok(()) => {
                                let payload = serde_json::to_string(&msg)?;
                                write.send(Message::Text(payload.into())).await?;
                            }
                            Err(reason) => println!("本地拒绝: {}", reason),
                        }
                    }
                    Input::Show(text) => println!("{}", text),
                    Input::Exit => {
                        println!("正在断开连接...");
                        break;
                    }
                }
                prompt()?;
            }
            msg = read.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        eprintln!("接收消息时出错: {}", e);
                        break;
                    }
                    None => {
                        println!("服务器关闭了连接");
                        break;
                    }
                };
                let server_msg = match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(m) => m,
                    Err(e) => {
                        eprintln!("解析服务器消息失败: {}", e);
                        continue;
                    }
                };
                if let Some(reply) = handle_server_message(server_msg, &mut session).await {
                    let payload = serde_json::to_string(&reply)?;
                    write.send(Message::Text(payload.into())).await?;
                }
                prompt()?;
            }
        }
    }

    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("> ");
    std::io::stdout().flush()
}

fn print_help() {
    println!("--- 九十九客户端 ---");
    println!("可用命令:");
    println!("  create <昵称>             - 创建一个新房间");
    println!("  join <房间ID> <昵称>      - 加入一个房间");
    println!("  deal                      - 发牌开始新的一局 (仅房主)");
    println!("  hand                      - 查看手牌");
    println!("  play <序号>               - 打出一张牌");
    println!("  select <序号>             - 选中/取消选中一张叫牌");
    println!("  bid                       - 用选中的牌叫牌");
    println!("  declare <flush|sequence|marriage> - 宣告牌型");
    println!("  settle                    - 结算本局 (仅房主)");
    println!("  sync                      - 向服务器请求最新状态");
    println!("  status                    - 查看本地状态");
    println!("  exit                      - 退出");
}

fn parse_line(line: &str, session: &mut ClientSession) -> Input {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(&command) = parts.first() else {
        return Input::Show(String::new());
    };

    match command {
        "create" => {
            let nickname = parts.get(1).unwrap_or(&"新玩家").to_string();
            Input::Send(ClientMessage::CreateRoom { nickname })
        }
        "join" => {
            if parts.len() < 3 {
                return Input::Show("用法: join <房间ID> <昵称>".into());
            }
            match parts[1].parse::<RoomId>() {
                Ok(room_id) => Input::Send(ClientMessage::JoinRoom { room_id, nickname: parts[2].to_string() }),
                Err(_) => Input::Show(format!("无效的房间ID格式: {}", parts[1])),
            }
        }
        "deal" => Input::Send(ClientMessage::Deal),
        "settle" => Input::Send(ClientMessage::SettleRound),
        "sync" => Input::Send(ClientMessage::GetSnapshot),
        "hand" => Input::Show(render_hand(session)),
        "status" => Input::Show(match &session.local {
            Some(local) => render_status(local),
            None => "尚未加入房间".into(),
        }),
        "play" => match parse_index(&parts) {
            Some(i) => match session.my_hand().get(i) {
                Some(card) => Input::Send(ClientMessage::PlayCard { card_id: card.id }),
                None => Input::Show(format!("没有序号为 {} 的牌", i)),
            },
            None => Input::Show("用法: play <序号>".into()),
        },
        "select" => match parse_index(&parts) {
            Some(i) => match session.toggle_bid_card(i) {
                Some(n) => Input::Show(format!("已选择 {} 张叫牌", n)),
                None => Input::Show(format!("没有序号为 {} 的牌", i)),
            },
            None => Input::Show("用法: select <序号>".into()),
        },
        "bid" => {
            let card_ids = session.bid_selection.iter().map(|c| c.id).collect();
            Input::Send(ClientMessage::SubmitBid { card_ids })
        }
        "declare" => match parts.get(1).map(|s| s.parse::<DeclarationKind>()) {
            Some(Ok(kind)) => Input::Send(ClientMessage::Declare { kind }),
            Some(Err(e)) => Input::Show(e.to_string()),
            None => Input::Show("用法: declare <flush|sequence|marriage>".into()),
        },
        "help" => {
            print_help();
            Input::Show(String::new())
        }
        "exit" => Input::Exit,
        _ => Input::Show(format!("未知命令: {}", line.trim())),
    }
}

fn parse_index(parts: &[&str]) -> Option<usize> {
    parts.get(1)?.parse().ok()
}

/// 处理服务器消息，需要回复时返回要发送的消息
async fn handle_server_message(msg: ServerMessage, session: &mut ClientSession) -> Option<ClientMessage> {
    match msg {
        ServerMessage::RoomJoined { your_id, your_secret: _, game_state, host_id } => {
            let host = if host_id == your_id { "你".to_string() } else { host_id.to_string() };
            println!("\n已加入房间 {}，房主: {}", game_state.room_id(), host);
            session.on_joined(your_id, game_state);
            None
        }
        ServerMessage::RoomNotFound { room_id } => {
            println!("\n房间 {} 不存在，可以用 create 创建新房间，或 join 其他房间", room_id);
            None
        }
        ServerMessage::GameStateSnapshot(remote) => {
            if let Err(e) = session.reconcile(remote).await {
                warn!("冲突解决超时，保留本地状态: {}", e);
            }
            if let Some(local) = &session.local {
                println!("\n{}", render_status(local));
            }
            None
        }
        ServerMessage::PlayerJoined { player } => {
            println!("\n{} 加入了房间", player.nickname);
            None
        }
        ServerMessage::PlayerLeft { player_id } => {
            println!("\n玩家 {} 离开了房间", player_id);
            None
        }
        ServerMessage::TrickWon { player_id, points } => {
            println!("\n{} 赢得这一墩 (+{})", nickname(session, &player_id), points);
            None
        }
        ServerMessage::RoundSettled { round, scores } => {
            println!("\n第 {} 局结算:", round);
            for (player_id, score) in &scores {
                println!("  {}: {}", nickname(session, player_id), score);
            }
            None
        }
        ServerMessage::IntentRejected { reason } => {
            println!("\n服务器拒绝: {}", reason);
            // 本地可能已经乐观地应用了这个意图，重新同步
            Some(ClientMessage::GetSnapshot)
        }
        ServerMessage::Info { message } => {
            println!("\n{}", message);
            None
        }
        ServerMessage::Error { message } => {
            println!("\n错误: {}", message);
            None
        }
    }
}

fn nickname(session: &ClientSession, player_id: &PlayerId) -> String {
    session
        .local
        .as_ref()
        .and_then(|s| s.player(player_id))
        .map_or_else(|| player_id.to_string(), |p| p.nickname.clone())
}

fn render_hand(session: &ClientSession) -> String {
    let hand = session.my_hand();
    if hand.is_empty() {
        return "手牌为空".into();
    }
    hand.iter()
        .enumerate()
        .map(|(i, card)| {
            let mark = if session.bid_selection.contains(card) { " *" } else { "" };
            format!("[{}] {}{}", i, card, mark)
        })
        .collect::<Vec<_>>()
        .join("  ")
}

fn render_status(state: &GameState) -> String {
    let mut out = format!("第 {} 局 {:?} (v{})", state.round(), state.phase(), state.version());
    if !state.trick().is_empty() {
        let plays: Vec<String> = state.trick().plays().iter().map(|p| p.card.to_string()).collect();
        out.push_str(&format!("\n  本墩: {}", plays.join(" ")));
    }
    for player in state.players() {
        let bid = state.bid(&player.id).map_or(String::from("-"), |b| b.value.to_string());
        out.push_str(&format!(
            "\n  {}: 分数 {} 墩数 {} 叫牌 {}",
            player.nickname,
            state.scores().score(&player.id),
            state.tricks_won(&player.id),
            bid,
        ));
    }
    out
}
