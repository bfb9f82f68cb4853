use crate::card::{Card, CardId};
use crate::error::Rejection;
use crate::state::PlayerId;
use serde::{Deserialize, Serialize};

/// 叫牌 (Bid)
///
/// 玩家选出若干张牌，按花色权重折算成承诺恰好赢下的墩数。
/// 这些牌在本局结束前被预留，不能作为普通牌打出。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub player_id: PlayerId,
    pub cards: Vec<Card>,
    pub value: u32,
}

impl Bid {
    pub fn reserves(&self, card_id: &CardId) -> bool {
        self.cards.iter().any(|c| &c.id == card_id)
    }
}

/// 选中或取消选中一张叫牌用的牌，返回新的选择。
///
/// 已选中则移除；未选中时，不在手牌中或已达到 `max_bid_cards`
/// 都原样返回当前选择，不报错。
pub fn select_bid_card(hand: &[Card], card: &Card, selection: &[Card], max_bid_cards: usize) -> Vec<Card> {
    if selection.iter().any(|c| c.id == card.id) {
        return selection.iter().filter(|c| c.id != card.id).copied().collect();
    }
    if selection.len() >= max_bid_cards || !hand.iter().any(|c| c.id == card.id) {
        return selection.to_vec();
    }
    let mut next = selection.to_vec();
    next.push(*card);
    next
}

/// 各张牌花色权重之和：梅花 3，红心 2，黑桃 1，方块和王牌 0。
pub fn compute_bid_value(selection: &[Card]) -> u32 {
    selection.iter().map(|c| c.suit.bid_weight()).sum()
}

/// 校验选择并生成叫牌。
///
/// 空选择、超过上限、或包含不在手牌中的牌都会被拒绝。
pub fn submit_bid(player_id: PlayerId, selection: Vec<Card>, hand: &[Card], max_bid_cards: usize) -> Result<Bid, Rejection> {
    if selection.is_empty() {
        return Err(Rejection::EmptyBid);
    }
    if selection.len() > max_bid_cards {
        return Err(Rejection::BidTooLarge { max: max_bid_cards });
    }
    if let Some(missing) = selection.iter().find(|c| !hand.contains(c)) {
        return Err(Rejection::CardNotInHand { card_id: missing.id });
    }

    let value = compute_bid_value(&selection);
    Ok(Bid { player_id, cards: selection, value })
}
