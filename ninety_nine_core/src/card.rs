use crate::error::Rejection;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 每张牌在整个会话中唯一的标识，用来区分外观相同的牌 (大小王、多副牌)
pub type CardId = Uuid;

/// 一副标准牌的张数
pub const DECK_SIZE: usize = 52;

// --- 核心数据结构定义 ---

/// 花色 (Suit)
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Suit {
    Spade,   // 黑桃 ♠️
    Heart,   // 红心 ♥️
    Club,    // 梅花 ♣️
    Diamond, // 方块 ♦️
    Joker,   // 王牌，没有点数
}

impl Suit {
    /// 标准牌组中的四种花色
    pub const STANDARD: [Suit; 4] = [Suit::Spade, Suit::Heart, Suit::Club, Suit::Diamond];

    /// 叫牌时每张牌按花色折算的墩数
    pub fn bid_weight(self) -> u32 {
        match self {
            Suit::Club => 3,
            Suit::Heart => 2,
            Suit::Spade => 1,
            Suit::Diamond | Suit::Joker => 0,
        }
    }
}

/// 点数 (Rank)
/// Ord 的派生让 2 最小、A 最大
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two, Rank::Three, Rank::Four, Rank::Five, Rank::Six, Rank::Seven,
        Rank::Eight, Rank::Nine, Rank::Ten, Rank::Jack, Rank::Queen, Rank::King, Rank::Ace,
    ];
}

/// 单张扑克牌 (Card)
///
/// 牌创建后不再修改，只会在牌堆、手牌、当前墩和赢墩堆之间转移。
/// 王牌的 `rank` 为 `None`，不参与点数比较。
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub suit: Suit,
    pub rank: Option<Rank>,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Card {
        debug_assert_ne!(suit, Suit::Joker, "王牌请使用 Card::joker()");
        Card { id: Uuid::new_v4(), suit, rank: Some(rank) }
    }

    pub fn joker() -> Card {
        Card { id: Uuid::new_v4(), suit: Suit::Joker, rank: None }
    }

    pub fn is_joker(&self) -> bool {
        self.suit == Suit::Joker
    }

    /// 花色和点数相同即视为同一张牌面 (忽略 id)
    pub fn same_face(&self, other: &Card) -> bool {
        self.suit == other.suit && self.rank == other.rank
    }
}

// --- 实现辅助功能 ---

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Suit::Spade => "♠️",
            Suit::Heart => "♥️",
            Suit::Club => "♣️",
            Suit::Diamond => "♦️",
            Suit::Joker => "🃏",
        })
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        })
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.rank {
            Some(rank) => write!(f, "{}{}", self.suit, rank),
            None => write!(f, "{}", self.suit),
        }
    }
}

// --- 牌组：创建、洗牌、发牌 ---

/// 创建一副完整的 52 张扑克牌，每张牌分配新的唯一 id
pub fn create_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(DECK_SIZE);
    for &suit in &Suit::STANDARD {
        for &rank in &Rank::ALL {
            deck.push(Card::new(rank, suit));
        }
    }
    deck
}

/// Fisher–Yates 洗牌。
///
/// 从最后一张开始，把第 i 张和 [0, i] 中均匀选出的第 j 张交换。
/// 传入带种子的随机源即可复现同一结果。
pub fn shuffle<R: Rng + ?Sized>(mut deck: Vec<Card>, rng: &mut R) -> Vec<Card> {
    for i in (1..deck.len()).rev() {
        let j = rng.random_range(0..=i);
        deck.swap(i, j);
    }
    deck
}

/// 一次发牌的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deal {
    /// 每位玩家的手牌，顺序与座位顺序一致
    pub hands: Vec<Vec<Card>>,
    /// 除不尽剩下的牌，不发给任何人
    pub undealt: Vec<Card>,
}

/// 把牌组按座位切成 `num_players` 段连续、等长的手牌。
///
/// 每段长度为 `floor(牌数 / 人数)`，余下的牌留在 `undealt` 中，不会补发。
pub fn deal(deck: Vec<Card>, num_players: usize) -> Result<Deal, Rejection> {
    if num_players == 0 {
        return Err(Rejection::InvalidPlayerCount(num_players));
    }

    let hand_size = deck.len() / num_players;
    let mut cards = deck.into_iter();
    let hands = (0..num_players)
        .map(|_| cards.by_ref().take(hand_size).collect())
        .collect();
    let undealt = cards.collect();

    Ok(Deal { hands, undealt })
}

// --- 单元测试 ---

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn faces(cards: &[Card]) -> HashSet<(Suit, Option<Rank>)> {
        cards.iter().map(|c| (c.suit, c.rank)).collect()
    }

    #[test]
    fn test_create_deck_has_52_unique_faces() {
        let deck = create_deck();
        assert_eq!(deck.len(), DECK_SIZE);
        assert_eq!(faces(&deck).len(), DECK_SIZE);
        assert!(deck.iter().all(|c| !c.is_joker()));
    }

    #[test]
    fn test_card_ids_are_unique() {
        let deck = create_deck();
        let ids: HashSet<CardId> = deck.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), DECK_SIZE);
    }

    #[test]
    fn test_shuffle_is_reproducible_with_seed() {
        let deck = create_deck();
        let a = shuffle(deck.clone(), &mut StdRng::seed_from_u64(99));
        let b = shuffle(deck.clone(), &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
        assert_ne!(a, deck, "洗牌后的顺序几乎不可能与原顺序相同");
    }

    #[test]
    fn test_shuffle_empty_and_single() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(shuffle(Vec::new(), &mut rng).is_empty());
        let one = vec![Card::joker()];
        assert_eq!(shuffle(one.clone(), &mut rng), one);
    }

    #[test]
    fn test_deal_four_players() {
        let deal = deal(create_deck(), 4).unwrap();
        assert_eq!(deal.hands.len(), 4);
        assert!(deal.hands.iter().all(|h| h.len() == 13));
        assert!(deal.undealt.is_empty());
    }

    #[test]
    fn test_deal_leaves_remainder_undealt() {
        let deck = create_deck();
        let tail: Vec<Card> = deck[50..].to_vec();
        let deal = deal(deck, 5).unwrap();
        assert!(deal.hands.iter().all(|h| h.len() == 10));
        // 余下的两张正是牌组末尾的两张
        assert_eq!(deal.undealt, tail);
    }

    #[test]
    fn test_deal_chunks_are_contiguous() {
        let deck = create_deck();
        let deal = deal(deck.clone(), 3).unwrap();
        assert_eq!(deal.hands[0], deck[0..17]);
        assert_eq!(deal.hands[1], deck[17..34]);
        assert_eq!(deal.hands[2], deck[34..51]);
        assert_eq!(deal.undealt, deck[51..]);
    }

    #[test]
    fn test_deal_zero_players_rejected() {
        assert_eq!(deal(create_deck(), 0), Err(Rejection::InvalidPlayerCount(0)));
    }

    #[test]
    fn test_bid_weights() {
        assert_eq!(Suit::Club.bid_weight(), 3);
        assert_eq!(Suit::Heart.bid_weight(), 2);
        assert_eq!(Suit::Spade.bid_weight(), 1);
        assert_eq!(Suit::Diamond.bid_weight(), 0);
        assert_eq!(Suit::Joker.bid_weight(), 0);
    }

    #[test]
    fn test_display() {
        let card = Card::new(Rank::Ten, Suit::Heart);
        assert_eq!(card.to_string(), "♥️10");
        assert_eq!(Card::joker().to_string(), "🃏");
    }

    proptest! {
        #[test]
        fn prop_shuffle_is_permutation(seed in any::<u64>()) {
            let deck = create_deck();
            let shuffled = shuffle(deck.clone(), &mut StdRng::seed_from_u64(seed));
            prop_assert_eq!(shuffled.len(), DECK_SIZE);
            let before: HashSet<CardId> = deck.iter().map(|c| c.id).collect();
            let after: HashSet<CardId> = shuffled.iter().map(|c| c.id).collect();
            prop_assert_eq!(before, after);
        }

        #[test]
        fn prop_deal_completeness_bound(num_players in 1usize..=52, seed in any::<u64>()) {
            let deck = shuffle(create_deck(), &mut StdRng::seed_from_u64(seed));
            let deal = deal(deck, num_players).unwrap();
            prop_assert_eq!(deal.hands.len(), num_players);
            for hand in &deal.hands {
                prop_assert_eq!(hand.len(), DECK_SIZE / num_players);
            }
            prop_assert_eq!(deal.undealt.len(), DECK_SIZE % num_players);

            let mut ids = HashSet::new();
            for card in deal.hands.iter().flatten().chain(deal.undealt.iter()) {
                prop_assert!(ids.insert(card.id), "同一张牌不能出现两次");
            }
            prop_assert_eq!(ids.len(), DECK_SIZE);
        }
    }
}
