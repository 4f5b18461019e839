//! Settlers - rules engine for a 2-4 player settlement and trading board game
//!
//! This crate provides the core game logic, including:
//! - Board topology with placement legality and the longest-road search
//! - The bank, player hands and the development card deck
//! - A rules engine covering building, production, the robber, cards and trading
//! - A turn state machine that gates which command is legal at any moment
//!
//! # Architecture
//!
//! The engine is single-threaded and deterministic. Randomness (dice, deck
//! order, stolen card) is supplied by the caller, so a host can replay or
//! serialize a match exactly.
//!
//! # Modules
//!
//! - [`hex`]: Axial hex coordinates used to derive board layouts
//! - [`layout`]: Board configuration data and the standard beginner board
//! - [`board`]: Id-indexed board graph and placement rules
//! - [`bank`], [`deck`], [`player`]: Resource supply, cards and player state
//! - [`game`]: Rule operations
//! - [`actions`]: Commands and result codes
//! - [`turn`]: Turn and phase state machine

pub mod actions;
pub mod bank;
pub mod board;
pub mod deck;
pub mod game;
pub mod hex;
pub mod layout;
pub mod player;
pub mod turn;

// Re-export commonly used types
pub use actions::{Command, ResultCode};
pub use bank::Bank;
pub use board::{
    Board, District, PlayerId, PortId, PortKind, Resource, RoadId, TileId, TileType, VertexBuilding,
    VertexId,
};
pub use deck::{DevCardDeck, DevelopmentCard};
pub use game::{Game, RoadPlacement, RuleError};
pub use layout::{BoardConfig, BoardLoader, ConfigError, StandardBoard};
pub use player::{costs, Player, ResourceError, ResourceHand};
pub use turn::{
    EngineFault, MatchState, Phase, RegularState, SetupState, SnapshotError, TurnController,
};
