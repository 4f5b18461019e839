//! Player state and resource management.
//!
//! This module contains:
//! - ResourceHand, the bounded per-resource counter shared by hands and the bank
//! - Development card counts and the "bought this turn" pool
//! - Player struct with inventory, awards and port boosts
//! - Building costs

use crate::board::{PlayerId, PortKind, Resource};
use crate::deck::DevelopmentCard;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Every resource type has exactly this many cards in circulation
pub const RESOURCE_CAP: u32 = 19;

pub const STARTING_SETTLEMENTS: u32 = 5;
pub const STARTING_CITIES: u32 = 4;
pub const STARTING_ROADS: u32 = 15;

/// Failures of bounded resource arithmetic
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("amount {0} outside 1..=19")]
    InvalidAmount(u32),

    #[error("insufficient {resource:?}: have {available}, need {requested}")]
    Insufficient {
        resource: Resource,
        available: u32,
        requested: u32,
    },

    #[error("{resource:?} would exceed {RESOURCE_CAP}: have {available}, adding {added}")]
    Overflow {
        resource: Resource,
        available: u32,
        added: u32,
    },
}

/// A count of each resource, kept within `0..=RESOURCE_CAP`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHand {
    pub brick: u32,
    pub lumber: u32,
    pub ore: u32,
    pub grain: u32,
    pub wool: u32,
}

impl ResourceHand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_amounts(brick: u32, lumber: u32, ore: u32, grain: u32, wool: u32) -> Self {
        Self {
            brick,
            lumber,
            ore,
            grain,
            wool,
        }
    }

    /// A hand holding `amount` of one resource
    pub fn single(resource: Resource, amount: u32) -> Self {
        let mut hand = Self::new();
        *hand.slot(resource) = amount;
        hand
    }

    /// Count each occurrence in a list of resources
    pub fn from_resources(resources: &[Resource]) -> Self {
        let mut hand = Self::new();
        for &r in resources {
            *hand.slot(r) += 1;
        }
        hand
    }

    pub fn total(&self) -> u32 {
        self.brick + self.lumber + self.ore + self.grain + self.wool
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn get(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Brick => self.brick,
            Resource::Lumber => self.lumber,
            Resource::Ore => self.ore,
            Resource::Grain => self.grain,
            Resource::Wool => self.wool,
        }
    }

    fn slot(&mut self, resource: Resource) -> &mut u32 {
        match resource {
            Resource::Brick => &mut self.brick,
            Resource::Lumber => &mut self.lumber,
            Resource::Ore => &mut self.ore,
            Resource::Grain => &mut self.grain,
            Resource::Wool => &mut self.wool,
        }
    }

    /// Empty one resource slot, returning what it held
    pub fn take_all(&mut self, resource: Resource) -> u32 {
        std::mem::take(self.slot(resource))
    }

    /// Resource/count pairs, including zeros
    pub fn iter(&self) -> impl Iterator<Item = (Resource, u32)> + '_ {
        Resource::ALL.into_iter().map(|r| (r, self.get(r)))
    }

    pub fn can_afford(&self, cost: &ResourceHand) -> bool {
        cost.iter().all(|(r, n)| self.get(r) >= n)
    }

    pub fn add_resource(&mut self, resource: Resource, amount: u32) -> Result<(), ResourceError> {
        if !(1..=RESOURCE_CAP).contains(&amount) {
            return Err(ResourceError::InvalidAmount(amount));
        }
        let available = self.get(resource);
        if available + amount > RESOURCE_CAP {
            return Err(ResourceError::Overflow {
                resource,
                available,
                added: amount,
            });
        }
        *self.slot(resource) += amount;
        Ok(())
    }

    pub fn remove_resource(
        &mut self,
        resource: Resource,
        amount: u32,
    ) -> Result<(), ResourceError> {
        if !(1..=RESOURCE_CAP).contains(&amount) {
            return Err(ResourceError::InvalidAmount(amount));
        }
        let available = self.get(resource);
        if available < amount {
            return Err(ResourceError::Insufficient {
                resource,
                available,
                requested: amount,
            });
        }
        *self.slot(resource) -= amount;
        Ok(())
    }

    /// Add a whole batch, or nothing if any type would overflow
    pub fn add_resources(&mut self, batch: &ResourceHand) -> Result<(), ResourceError> {
        let mut updated = self.clone();
        for (resource, amount) in batch.iter().filter(|(_, n)| *n > 0) {
            updated.add_resource(resource, amount)?;
        }
        *self = updated;
        Ok(())
    }

    /// Remove a whole batch, or nothing if any type is short
    pub fn remove_resources(&mut self, batch: &ResourceHand) -> Result<(), ResourceError> {
        let mut updated = self.clone();
        for (resource, amount) in batch.iter().filter(|(_, n)| *n > 0) {
            updated.remove_resource(resource, amount)?;
        }
        *self = updated;
        Ok(())
    }

    /// Move `batch` from one hand to another; both change or neither does
    pub fn transfer(
        from: &mut ResourceHand,
        to: &mut ResourceHand,
        batch: &ResourceHand,
    ) -> Result<(), ResourceError> {
        let mut source = from.clone();
        let mut target = to.clone();
        source.remove_resources(batch)?;
        target.add_resources(batch)?;
        *from = source;
        *to = target;
        Ok(())
    }
}

/// Building costs
pub mod costs {
    use super::ResourceHand;

    /// 1 brick, 1 lumber
    pub fn road() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 0, 0, 0)
    }

    /// 1 brick, 1 lumber, 1 grain, 1 wool
    pub fn settlement() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 0, 1, 1)
    }

    /// 3 ore, 2 grain
    pub fn city() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 3, 2, 0)
    }

    /// 1 ore, 1 grain, 1 wool
    pub fn development_card() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 1, 1, 1)
    }
}

/// Count of each development card kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevCardCounts {
    pub knight: u32,
    pub victory_point: u32,
    pub road_building: u32,
    pub year_of_plenty: u32,
    pub monopoly: u32,
}

impl DevCardCounts {
    pub fn get(&self, card: DevelopmentCard) -> u32 {
        match card {
            DevelopmentCard::Knight => self.knight,
            DevelopmentCard::VictoryPoint => self.victory_point,
            DevelopmentCard::RoadBuilding => self.road_building,
            DevelopmentCard::YearOfPlenty => self.year_of_plenty,
            DevelopmentCard::Monopoly => self.monopoly,
        }
    }

    fn slot(&mut self, card: DevelopmentCard) -> &mut u32 {
        match card {
            DevelopmentCard::Knight => &mut self.knight,
            DevelopmentCard::VictoryPoint => &mut self.victory_point,
            DevelopmentCard::RoadBuilding => &mut self.road_building,
            DevelopmentCard::YearOfPlenty => &mut self.year_of_plenty,
            DevelopmentCard::Monopoly => &mut self.monopoly,
        }
    }

    pub fn add(&mut self, card: DevelopmentCard) {
        *self.slot(card) += 1;
    }

    /// Take one card of a kind; false if there is none
    pub fn take(&mut self, card: DevelopmentCard) -> bool {
        let slot = self.slot(card);
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }

    pub fn total(&self) -> u32 {
        self.knight + self.victory_point + self.road_building + self.year_of_plenty + self.monopoly
    }

    fn merge(&mut self, other: &DevCardCounts) {
        self.knight += other.knight;
        self.victory_point += other.victory_point;
        self.road_building += other.road_building;
        self.year_of_plenty += other.year_of_plenty;
        self.monopoly += other.monopoly;
    }
}

/// Cards a player holds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    pub resources: ResourceHand,
    /// Playable development cards
    pub dev_cards: DevCardCounts,
    /// Development cards bought this turn (can't be played until next turn)
    pub bought_this_turn: DevCardCounts,
}

/// A single player's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub hand: Hand,
    /// Points from settlements and cities on the board
    pub building_points: u32,
    pub settlements_remaining: u32,
    pub cities_remaining: u32,
    pub roads_remaining: u32,
    /// Knights played (for Largest Army)
    pub knights_played: u32,
    pub has_longest_road: bool,
    pub has_largest_army: bool,
    /// Ports this player has settled on
    pub trade_boosts: BTreeSet<PortKind>,
}

impl Player {
    pub fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            hand: Hand::default(),
            building_points: 0,
            settlements_remaining: STARTING_SETTLEMENTS,
            cities_remaining: STARTING_CITIES,
            roads_remaining: STARTING_ROADS,
            knights_played: 0,
            has_longest_road: false,
            has_largest_army: false,
            trade_boosts: BTreeSet::new(),
        }
    }

    /// Victory point cards count as soon as they are bought
    pub fn hidden_vp(&self) -> u32 {
        self.hand.dev_cards.victory_point + self.hand.bought_this_turn.victory_point
    }

    pub fn victory_points(&self) -> u32 {
        let mut vp = self.building_points + self.hidden_vp();
        if self.has_longest_road {
            vp += 2;
        }
        if self.has_largest_army {
            vp += 2;
        }
        vp
    }

    pub fn can_afford(&self, cost: &ResourceHand) -> bool {
        self.hand.resources.can_afford(cost)
    }

    /// Best bank rate for giving away `resource`
    pub fn bank_rate(&self, resource: Resource) -> u32 {
        self.trade_boosts
            .iter()
            .filter(|kind| match kind {
                PortKind::Any => true,
                PortKind::Specific(r) => *r == resource,
            })
            .map(PortKind::rate)
            .min()
            .unwrap_or(4)
    }

    /// Whether a card of this kind could be played now, ignoring the
    /// one-card-per-turn limit
    pub fn has_playable_dev_card(&self, card: DevelopmentCard) -> bool {
        card.is_playable() && self.hand.dev_cards.get(card) > 0
    }

    /// At end of turn, bought cards become playable
    pub fn end_turn(&mut self) {
        let bought = std::mem::take(&mut self.hand.bought_this_turn);
        self.hand.dev_cards.merge(&bought);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_hand_total() {
        let hand = ResourceHand::with_amounts(1, 2, 3, 4, 5);
        assert_eq!(hand.total(), 15);
    }

    #[test]
    fn test_resource_hand_can_afford() {
        let hand = ResourceHand::with_amounts(2, 2, 2, 2, 2);
        assert!(hand.can_afford(&ResourceHand::with_amounts(1, 1, 1, 1, 1)));
        assert!(!hand.can_afford(&ResourceHand::with_amounts(3, 0, 0, 0, 0)));
    }

    #[test]
    fn test_add_resource_bounds() {
        let mut hand = ResourceHand::single(Resource::Ore, 18);
        assert_eq!(
            hand.add_resource(Resource::Ore, 0),
            Err(ResourceError::InvalidAmount(0))
        );
        assert_eq!(
            hand.add_resource(Resource::Ore, 2),
            Err(ResourceError::Overflow {
                resource: Resource::Ore,
                available: 18,
                added: 2
            })
        );
        assert_eq!(hand.get(Resource::Ore), 18);
        hand.add_resource(Resource::Ore, 1).unwrap();
        assert_eq!(hand.get(Resource::Ore), 19);
    }

    #[test]
    fn test_remove_resource_bounds() {
        let mut hand = ResourceHand::single(Resource::Wool, 1);
        assert!(hand.remove_resource(Resource::Wool, 2).is_err());
        assert_eq!(hand.get(Resource::Wool), 1);
        assert_eq!(
            hand.remove_resource(Resource::Wool, 20),
            Err(ResourceError::InvalidAmount(20))
        );
        hand.remove_resource(Resource::Wool, 1).unwrap();
        assert!(hand.is_empty());
    }

    #[test]
    fn test_batch_removal_is_all_or_nothing() {
        let mut hand = ResourceHand::with_amounts(1, 1, 0, 0, 0);
        let before = hand.clone();
        assert!(hand.remove_resources(&costs::settlement()).is_err());
        assert_eq!(hand, before);
        hand.remove_resources(&costs::road()).unwrap();
        assert!(hand.is_empty());
    }

    #[test]
    fn test_take_all_empties_one_slot() {
        let mut hand = ResourceHand::with_amounts(0, 0, 25, 2, 0);
        assert_eq!(hand.take_all(Resource::Ore), 25);
        assert_eq!(hand, ResourceHand::single(Resource::Grain, 2));
        assert_eq!(hand.take_all(Resource::Ore), 0);
    }

    #[test]
    fn test_transfer_moves_exact_batch() {
        let mut bank = ResourceHand::with_amounts(19, 19, 19, 19, 19);
        let mut hand = ResourceHand::new();
        ResourceHand::transfer(&mut bank, &mut hand, &costs::city()).unwrap();
        assert_eq!(hand, costs::city());
        assert_eq!(bank.ore, 16);
        assert_eq!(bank.grain, 17);

        let mut full = ResourceHand::single(Resource::Ore, 19);
        let before = hand.clone();
        assert!(ResourceHand::transfer(&mut hand, &mut full, &costs::city()).is_err());
        assert_eq!(hand, before, "failed transfer leaves the source untouched");
    }

    #[test]
    fn test_building_costs() {
        assert_eq!(costs::road().total(), 2);
        assert_eq!(costs::settlement().total(), 4);
        assert_eq!(costs::city().total(), 5);
        assert_eq!(costs::development_card().total(), 3);
    }

    #[test]
    fn test_player_victory_points() {
        let mut player = Player::new(0, "Test".to_string());
        assert_eq!(player.victory_points(), 0);

        player.building_points = 2;
        player.has_longest_road = true;
        assert_eq!(player.victory_points(), 4);

        player.has_largest_army = true;
        player.hand.bought_this_turn.add(DevelopmentCard::VictoryPoint);
        assert_eq!(player.victory_points(), 7);
    }

    #[test]
    fn test_bank_rate_uses_best_boost() {
        let mut player = Player::new(0, "Test".to_string());
        assert_eq!(player.bank_rate(Resource::Brick), 4);
        player.trade_boosts.insert(PortKind::Any);
        assert_eq!(player.bank_rate(Resource::Brick), 3);
        player.trade_boosts.insert(PortKind::Specific(Resource::Brick));
        assert_eq!(player.bank_rate(Resource::Brick), 2);
        assert_eq!(player.bank_rate(Resource::Wool), 3);
    }

    #[test]
    fn test_dev_card_bought_this_turn() {
        let mut player = Player::new(0, "Test".to_string());
        player.hand.bought_this_turn.add(DevelopmentCard::Knight);
        assert!(!player.has_playable_dev_card(DevelopmentCard::Knight));

        player.end_turn();
        assert!(player.has_playable_dev_card(DevelopmentCard::Knight));
        assert_eq!(player.hand.bought_this_turn.total(), 0);
    }

    #[test]
    fn test_victory_point_card_never_playable() {
        let mut player = Player::new(0, "Test".to_string());
        player.hand.dev_cards.add(DevelopmentCard::VictoryPoint);
        assert!(!player.has_playable_dev_card(DevelopmentCard::VictoryPoint));
    }
}
