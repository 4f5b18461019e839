//! Commands a front end can issue and the result codes it gets back.

use crate::board::{PlayerId, Resource, RoadId, TileId, VertexId};
use crate::game::RuleError;
use crate::player::ResourceHand;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Every player action the turn controller understands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    // ==================== Building ====================
    /// Place a settlement (setup, or after `BeginBuildSettlement`)
    PlaceSettlement(VertexId),
    /// Place a road (setup, after `BeginBuildRoad`, or from Road Building)
    PlaceRoad(RoadId),
    /// Upgrade a settlement to a city (after `BeginUpgrade`)
    UpgradeSettlement(VertexId),
    BeginBuildSettlement,
    BeginBuildRoad,
    BeginUpgrade,
    /// Leave a build mode, or stop placing Road Building roads early
    CancelBuild,

    // ==================== Dice & Robber ====================
    /// Roll result (2-12) supplied by the caller
    RollDie(u8),
    /// Cards each player returns after a 7
    DropCards(BTreeMap<PlayerId, ResourceHand>),
    MoveRobber(TileId),
    /// Steal one card from this player
    Steal(PlayerId),

    // ==================== Trading ====================
    /// Trade at the best available rate for one `get`
    TradeWithBank { give: Resource, get: Resource },
    /// Swap cards with another player
    TradeWithPlayer {
        partner: PlayerId,
        give: ResourceHand,
        get: ResourceHand,
    },

    // ==================== Development Cards ====================
    BuyDevCard,
    PlayKnight,
    PlayRoadBuilding,
    PlayYearOfPlenty(Resource, Resource),
    PlayMonopoly(Resource),

    // ==================== Turn Management ====================
    EndTurn,
}

/// Outcome of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    Success,
    InvalidPlacement,
    InsufficientResources,
    CannotPlayCard,
    EmptyDevCardDeck,
    GameWin,
    /// Not legal in the current state; nothing changed
    Undefined,
}

impl ResultCode {
    /// Code for an expected rule failure. Fatal errors have none.
    pub fn for_error(err: &RuleError) -> Option<Self> {
        match err {
            RuleError::InvalidPlacement => Some(ResultCode::InvalidPlacement),
            RuleError::InsufficientResources | RuleError::NoPiecesRemaining => {
                Some(ResultCode::InsufficientResources)
            }
            RuleError::CardNotPlayable => Some(ResultCode::CannotPlayCard),
            RuleError::EmptyDeck => Some(ResultCode::EmptyDevCardDeck),
            RuleError::InvalidTrade => Some(ResultCode::Undefined),
            RuleError::OutOfRange { .. } | RuleError::IllegalArgument(_) => None,
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResultCode::Success => "SUCCESS",
            ResultCode::InvalidPlacement => "INVALID_PLACEMENT",
            ResultCode::InsufficientResources => "INSUFFICIENT_RESOURCES",
            ResultCode::CannotPlayCard => "CANNOT_PLAY_CARD",
            ResultCode::EmptyDevCardDeck => "EMPTY_DEV_CARD_DECK",
            ResultCode::GameWin => "GAME_WIN",
            ResultCode::Undefined => "UNDEFINED",
        };
        f.write_str(name)
    }
}
