//! Development cards and the draw pile.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Development card types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DevelopmentCard {
    /// Move robber and steal, counts toward Largest Army
    Knight,
    /// Worth 1 VP from the moment it is bought
    VictoryPoint,
    /// Build 2 roads for free
    RoadBuilding,
    /// Take any 2 resources from the bank
    YearOfPlenty,
    /// All other players give you all of one resource type
    Monopoly,
}

impl DevelopmentCard {
    /// Whether this card can be played (VP cards are never "played")
    pub fn is_playable(&self) -> bool {
        !matches!(self, DevelopmentCard::VictoryPoint)
    }
}

/// Cards in a fresh deck, by kind
const COMPOSITION: [(DevelopmentCard, usize); 5] = [
    (DevelopmentCard::Knight, 14),
    (DevelopmentCard::VictoryPoint, 5),
    (DevelopmentCard::RoadBuilding, 2),
    (DevelopmentCard::YearOfPlenty, 2),
    (DevelopmentCard::Monopoly, 2),
];

/// The remaining development cards; the last element is drawn next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevCardDeck {
    cards: Vec<DevelopmentCard>,
}

impl DevCardDeck {
    /// The standard 25 cards in a fixed order
    pub fn standard() -> Self {
        let cards = COMPOSITION
            .iter()
            .flat_map(|&(card, count)| std::iter::repeat(card).take(count))
            .collect();
        Self { cards }
    }

    /// The standard deck shuffled with the caller's rng
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut deck = Self::standard();
        deck.cards.shuffle(rng);
        deck
    }

    pub fn from_cards(cards: Vec<DevelopmentCard>) -> Self {
        Self { cards }
    }

    pub fn draw(&mut self) -> Option<DevelopmentCard> {
        self.cards.pop()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Remaining cards in draw order (next card last)
    pub fn cards(&self) -> &[DevelopmentCard] {
        &self.cards
    }
}

impl Default for DevCardDeck {
    fn default() -> Self {
        Self::standard()
    }
}
