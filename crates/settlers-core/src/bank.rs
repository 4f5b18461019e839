//! The shared resource supply.
//!
//! The bank starts with every card in circulation. Resources only ever move
//! between the bank and player hands, so for each type the bank's count plus
//! the sum of all hands stays at [`RESOURCE_CAP`].

use crate::board::Resource;
use crate::player::{ResourceError, ResourceHand, RESOURCE_CAP};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bank {
    supply: ResourceHand,
}

impl Bank {
    /// A full bank: 19 of each resource
    pub fn new() -> Self {
        Self {
            supply: ResourceHand::with_amounts(
                RESOURCE_CAP,
                RESOURCE_CAP,
                RESOURCE_CAP,
                RESOURCE_CAP,
                RESOURCE_CAP,
            ),
        }
    }

    pub fn from_supply(supply: ResourceHand) -> Self {
        Self { supply }
    }

    pub fn get(&self, resource: Resource) -> u32 {
        self.supply.get(resource)
    }

    pub fn has(&self, batch: &ResourceHand) -> bool {
        self.supply.can_afford(batch)
    }

    /// Pay `batch` out of the bank into `hand`
    pub fn pay_out(
        &mut self,
        hand: &mut ResourceHand,
        batch: &ResourceHand,
    ) -> Result<(), ResourceError> {
        ResourceHand::transfer(&mut self.supply, hand, batch)
    }

    /// Take `batch` from `hand` back into the bank
    pub fn collect(
        &mut self,
        hand: &mut ResourceHand,
        batch: &ResourceHand,
    ) -> Result<(), ResourceError> {
        ResourceHand::transfer(hand, &mut self.supply, batch)
    }
}

impl Default for Bank {
    fn default() -> Self {
        Self::new()
    }
}
