//! # Ninety-Nine 核心逻辑库
//!
//! 这个 `core` crate 包含了 Ninety-Nine 吃墩游戏的规则引擎：
//! 牌组与发牌、出牌跟花与赢墩判定、叫牌、宣告、计分，
//! 以及把本地乐观状态与远端权威状态合并的冲突解决器。
//! 它与网络服务器、客户端 UI 解耦，所有状态变更都是纯函数
//! (旧状态 -> 新状态)，可以被任何上层应用复用。

mod bidding;
mod card;
mod config;
mod declaration;
mod error;
mod logic;
mod message;
mod resolver;
mod scoring;
mod state;
mod trick;

pub use bidding::*;
pub use card::*;
pub use config::*;
pub use declaration::*;
pub use error::*;
pub use logic::*;
pub use message::*;
pub use resolver::*;
pub use scoring::*;
pub use state::*;
pub use trick::*;
