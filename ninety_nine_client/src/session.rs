use std::time::Duration;

use ninety_nine_core::{
    Card, ClientMessage, ConflictResolver, GameCommand, GameState, PlayerId, Rejection, select_bid_card,
};
use tokio::time::error::Elapsed;

/// 客户端会话
///
/// 持有一份本地乐观状态：自己的意图先在本地应用，再发给服务器；
/// 服务器的快照到达时交给冲突解决器，与本地状态合并。
pub struct ClientSession {
    pub me: Option<PlayerId>,
    pub local: Option<GameState>,
    /// 正在挑选的叫牌
    pub bid_selection: Vec<Card>,
    resolver: ConflictResolver,
    resolve_timeout: Duration,
}

impl ClientSession {
    pub fn new(resolver: ConflictResolver, resolve_timeout: Duration) -> Self {
        Self {
            me: None,
            local: None,
            bid_selection: Vec::new(),
            resolver,
            resolve_timeout,
        }
    }

    pub fn on_joined(&mut self, your_id: PlayerId, game_state: GameState) {
        self.me = Some(your_id);
        self.local = Some(game_state);
        self.bid_selection.clear();
    }

    pub fn my_hand(&self) -> Vec<Card> {
        match (&self.local, &self.me) {
            (Some(local), Some(me)) => local.hand(me).to_vec(),
            _ => Vec::new(),
        }
    }

    /// 在本地乐观地应用一条消息。
    ///
    /// 被规则拒绝时返回 `Err`，本地状态不变，调用方不应再发送给服务器。
    /// 发牌依赖服务器才有的牌堆，不做乐观应用。
    pub fn apply_local(&mut self, msg: &ClientMessage) -> Result<(), Rejection> {
        let (Some(me), Some(local)) = (self.me, &self.local) else {
            return Ok(());
        };
        let Some(command) = msg.clone().into_command(me) else {
            return Ok(());
        };
        if let GameCommand::Deal { .. } = command {
            return Ok(());
        }

        let transition = local.apply(command)?;
        self.local = Some(transition.state);
        self.prune_selection();
        Ok(())
    }

    /// 选中或取消选中手牌中第 `index` 张牌，返回当前选择的牌数
    pub fn toggle_bid_card(&mut self, index: usize) -> Option<usize> {
        let hand = self.my_hand();
        let card = hand.get(index)?;
        let max = self.local.as_ref().map_or(0, |s| s.config().max_bid_cards);
        self.bid_selection = select_bid_card(&hand, card, &self.bid_selection, max);
        Some(self.bid_selection.len())
    }

    /// 用冲突解决器合并服务器快照。
    ///
    /// 解决器超时后本地状态保持不变。
    pub async fn reconcile(&mut self, remote: GameState) -> Result<(), Elapsed> {
        let Some(local) = &self.local else {
            self.local = Some(remote);
            return Ok(());
        };

        let resolved = tokio::time::timeout(self.resolve_timeout, self.resolver.resolve(local, remote)).await?;
        self.local = Some(resolved);
        self.prune_selection();
        Ok(())
    }

    // 已经打出或不在手中的牌从叫牌选择中去掉
    fn prune_selection(&mut self) {
        let hand = self.my_hand();
        self.bid_selection.retain(|c| hand.contains(c));
    }
}
