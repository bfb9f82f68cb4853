use crate::state::{GameState, RoomId};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// 把本地乐观状态和远端权威状态合并为一个状态的策略
#[async_trait]
pub trait ResolutionStrategy: Send + Sync {
    async fn resolve(&self, local: GameState, remote: GameState) -> GameState;
}

/// 把异步闭包包装成策略
pub struct FnStrategy<F>(pub F);

#[async_trait]
impl<F, Fut> ResolutionStrategy for FnStrategy<F>
where
    F: Fn(GameState, GameState) -> Fut + Send + Sync,
    Fut: Future<Output = GameState> + Send,
{
    async fn resolve(&self, local: GameState, remote: GameState) -> GameState {
        (self.0)(local, remote).await
    }
}

/// 冲突解决器 (Conflict Resolver)
///
/// 没有安装策略时远端永远获胜：直接返回 `remote`，丢弃本地尚未确认的乐观变更。
/// 同一时刻最多只有一个策略，再次安装会静默替换掉之前的。
/// 不做任何逐字段的合并，需要更细的合并必须由自定义策略完成。
#[derive(Clone, Default)]
pub struct ConflictResolver {
    strategy: Option<Arc<dyn ResolutionStrategy>>,
}

impl ConflictResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install<S: ResolutionStrategy + 'static>(&mut self, strategy: S) {
        self.strategy = Some(Arc::new(strategy));
    }

    pub fn install_fn<F, Fut>(&mut self, f: F)
    where
        F: Fn(GameState, GameState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GameState> + Send + 'static,
    {
        self.install(FnStrategy(f));
    }

    /// 卸载自定义策略，恢复远端获胜的默认行为
    pub fn uninstall(&mut self) {
        self.strategy = None;
    }

    pub fn has_strategy(&self) -> bool {
        self.strategy.is_some()
    }

    /// 解决一次冲突。调用方必须等待这一个结果再应用到自己的视图上。
    ///
    /// 这里不设超时：策略如果永不返回，调用方的本地状态就停在最后一次应用的状态。
    pub async fn resolve(&self, local: &GameState, remote: GameState) -> GameState {
        match &self.strategy {
            None => {
                debug!(remote_version = remote.version, "未安装策略，采用远端状态");
                remote
            }
            Some(strategy) => {
                debug!(local_version = local.version, remote_version = remote.version, "使用自定义策略解决冲突");
                strategy.resolve(local.clone(), remote).await
            }
        }
    }
}

impl fmt::Debug for ConflictResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConflictResolver")
            .field("has_strategy", &self.has_strategy())
            .finish()
    }
}

/// 丢弃乱序到达的旧快照
///
/// 记住同一房间里已经接受过的最新远端版本号。版本号更小的远端快照
/// 视为过期，保留本地状态；其余情况一律采用远端状态。
#[derive(Debug, Default)]
pub struct DiscardStaleRemote {
    newest: Mutex<Option<(RoomId, u64)>>,
}

impl DiscardStaleRemote {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResolutionStrategy for DiscardStaleRemote {
    async fn resolve(&self, local: GameState, remote: GameState) -> GameState {
        let mut newest = self.newest.lock();
        match *newest {
            Some((room_id, version)) if room_id == remote.room_id && remote.version < version => {
                warn!(stale = remote.version, newest = version, "丢弃过期的远端快照");
                local
            }
            _ => {
                *newest = Some((remote.room_id, remote.version));
                remote
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::logic::GameCommand;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn two_states() -> (GameState, GameState) {
        let room_id = RoomId::new_v4();
        let base = GameState::new(room_id, GameConfig::default());
        let local = base
            .apply(GameCommand::Join { player_id: Uuid::new_v4(), nickname: "local".into() })
            .unwrap()
            .state;
        let remote = base
            .apply(GameCommand::Join { player_id: Uuid::new_v4(), nickname: "remote".into() })
            .unwrap()
            .state;
        (local, remote)
    }

    #[tokio::test]
    async fn test_default_remote_wins() {
        let (local, remote) = two_states();
        let resolver = ConflictResolver::new();
        assert!(!resolver.has_strategy());
        assert_eq!(resolver.resolve(&local, remote.clone()).await, remote);
    }

    #[tokio::test]
    async fn test_default_ignores_local_contents() {
        let (local, remote) = two_states();
        let mut other_local = local.clone();
        other_local.version = 999;
        other_local.players.clear();

        let resolver = ConflictResolver::new();
        let a = resolver.resolve(&local, remote.clone()).await;
        let b = resolver.resolve(&other_local, remote.clone()).await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_custom_strategy_is_used() {
        let (local, remote) = two_states();
        let mut resolver = ConflictResolver::new();
        resolver.install_fn(|local, _remote| async move { local });
        assert_eq!(resolver.resolve(&local, remote).await, local);
    }

    #[tokio::test]
    async fn test_installing_replaces_previous_strategy() {
        let (local, remote) = two_states();
        let a_calls = Arc::new(AtomicUsize::new(0));
        let b_calls = Arc::new(AtomicUsize::new(0));

        let mut resolver = ConflictResolver::new();
        let counter = a_calls.clone();
        resolver.install_fn(move |_local, remote| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { remote }
        });
        let counter = b_calls.clone();
        resolver.install_fn(move |_local, remote| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { remote }
        });

        resolver.resolve(&local, remote.clone()).await;
        resolver.resolve(&local, remote).await;
        assert_eq!(a_calls.load(Ordering::SeqCst), 0);
        assert_eq!(b_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_uninstall_restores_default() {
        let (local, remote) = two_states();
        let mut resolver = ConflictResolver::new();
        resolver.install_fn(|local, _remote| async move { local });
        resolver.uninstall();
        assert_eq!(resolver.resolve(&local, remote.clone()).await, remote);
    }

    #[tokio::test]
    async fn test_discard_stale_remote() {
        let (local, remote) = two_states();
        let mut newer = remote.clone();
        newer.version += 5;

        let mut resolver = ConflictResolver::new();
        resolver.install(DiscardStaleRemote::new());

        assert_eq!(resolver.resolve(&local, newer.clone()).await, newer);
        // 更旧的快照晚到，保留本地
        assert_eq!(resolver.resolve(&local, remote.clone()).await, local);
        // 版本相同的重复快照仍然接受
        assert_eq!(resolver.resolve(&local, newer.clone()).await, newer);
    }

    #[tokio::test]
    async fn test_discard_stale_remote_resets_on_new_room() {
        let (local, remote) = two_states();
        let mut newer = remote.clone();
        newer.version += 5;
        let other_room = GameState::new(RoomId::new_v4(), GameConfig::default());

        let strategy = DiscardStaleRemote::new();
        strategy.resolve(local.clone(), newer).await;
        assert_eq!(strategy.resolve(local, other_room.clone()).await, other_room);
    }
}
