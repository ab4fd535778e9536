//! Chance and Community Chest decks.

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Deck {
    Chance,
    CommunityChest,
}

/// Closed set of effects a drawn card can apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CardEffect {
    AdvanceTo { target: u8 },
    AdvanceToNearestRailroad { double_rent: bool },
    AdvanceToNearestUtility { ten_x: bool },
    AdvanceBy { delta: i32 },
    GoToJail,
    Collect { amount: i64 },
    Pay { amount: i64 },
    CollectFromEachPlayer { amount: i64 },
    PayEachPlayer { amount: i64 },
    Repairs { per_house: i64, per_hotel: i64 },
    JailFree,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub text: &'static str,
    pub effect: CardEffect,
}

pub static CHANCE: &[Card] = &[
    Card { text: "Advance to Go. Collect $200.", effect: CardEffect::AdvanceTo { target: 0 } },
    Card { text: "Advance to Jerusalem.", effect: CardEffect::AdvanceTo { target: 9 } },
    Card { text: "Advance to San Francisco. If you pass Go, collect $200.", effect: CardEffect::AdvanceTo { target: 37 } },
    Card { text: "Advance to the nearest Railroad. Pay owner twice the rent due.", effect: CardEffect::AdvanceToNearestRailroad { double_rent: true } },
    Card { text: "Advance to the nearest Railroad. Pay owner twice the rent due.", effect: CardEffect::AdvanceToNearestRailroad { double_rent: true } },
    Card { text: "Advance to the nearest Utility. If unowned, you may buy it. If owned, pay owner ten times dice roll.", effect: CardEffect::AdvanceToNearestUtility { ten_x: true } },
    Card { text: "Bank pays you a dividend of $50.", effect: CardEffect::Collect { amount: 50 } },
    Card { text: "Get out of Jail Free. Keep this card until needed.", effect: CardEffect::JailFree },
    Card { text: "Go back three spaces.", effect: CardEffect::AdvanceBy { delta: -3 } },
    Card { text: "Go directly to Jail. Do not pass Go, do not collect $200.", effect: CardEffect::GoToJail },
    Card { text: "Make general repairs on all your property. For each house pay $25, for each hotel pay $100.", effect: CardEffect::Repairs { per_house: 25, per_hotel: 100 } },
    Card { text: "You have been elected Chairman of the Board. Pay each player $50.", effect: CardEffect::PayEachPlayer { amount: 50 } },
];

pub static COMMUNITY_CHEST: &[Card] = &[
    Card { text: "Advance to Go. Collect $200.", effect: CardEffect::AdvanceTo { target: 0 } },
    Card { text: "Bank error in your favor. Collect $200.", effect: CardEffect::Collect { amount: 200 } },
    Card { text: "Doctor's fee. Pay $50.", effect: CardEffect::Pay { amount: 50 } },
    Card { text: "From sale of stock you get $50.", effect: CardEffect::Collect { amount: 50 } },
    Card { text: "Get out of Jail Free. Keep this card until needed.", effect: CardEffect::JailFree },
    Card { text: "Go directly to Jail. Do not pass Go, do not collect $200.", effect: CardEffect::GoToJail },
    Card { text: "Holiday fund matures. Receive $100.", effect: CardEffect::Collect { amount: 100 } },
    Card { text: "Income tax refund. Collect $20.", effect: CardEffect::Collect { amount: 20 } },
    Card { text: "It is your birthday. Collect $10 from every player.", effect: CardEffect::CollectFromEachPlayer { amount: 10 } },
    Card { text: "Life insurance matures. Collect $100.", effect: CardEffect::Collect { amount: 100 } },
    Card { text: "Pay hospital fees of $100.", effect: CardEffect::Pay { amount: 100 } },
    Card { text: "Pay school fees of $150.", effect: CardEffect::Pay { amount: 150 } },
    Card { text: "Receive $25 consultancy fee.", effect: CardEffect::Collect { amount: 25 } },
    Card { text: "You are assessed for street repairs. $40 per house, $115 per hotel.", effect: CardEffect::Repairs { per_house: 40, per_hotel: 115 } },
    Card { text: "You have won second prize in a beauty contest. Collect $10.", effect: CardEffect::Collect { amount: 10 } },
    Card { text: "You inherit $100.", effect: CardEffect::Collect { amount: 100 } },
];

pub fn deck_cards(deck: Deck) -> &'static [Card] {
    match deck {
        Deck::Chance => CHANCE,
        Deck::CommunityChest => COMMUNITY_CHEST,
    }
}

/// Draw a uniformly random card from the given deck.
pub fn draw(deck: Deck) -> &'static Card {
    let cards = deck_cards(deck);
    let idx = rand::thread_rng().gen_range(0..cards.len());
    &cards[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chance_has_twelve_cards_and_chest_has_sixteen() {
        assert_eq!(CHANCE.len(), 12);
        assert_eq!(COMMUNITY_CHEST.len(), 16);
    }

    #[test]
    fn draw_always_returns_a_card_in_the_deck() {
        for _ in 0..50 {
            let card = draw(Deck::Chance);
            assert!(CHANCE.iter().any(|c| c.text == card.text));
            let card = draw(Deck::CommunityChest);
            assert!(COMMUNITY_CHEST.iter().any(|c| c.text == card.text));
        }
    }
}
