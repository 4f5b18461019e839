//! Turn and phase state machine.
//!
//! This module contains:
//! - `Phase` with its setup and regular-play states
//! - `MatchState`, the serialisable snapshot of a whole match
//! - `TurnController`, which decides which [`Command`] is legal right now,
//!   forwards it to the [`Game`] rules and maps the outcome to a [`ResultCode`]

use crate::actions::{Command, ResultCode};
use crate::board::{Board, PlayerId, Resource, RoadId, TileId, VertexId};
use crate::deck::DevCardDeck;
use crate::game::{Game, RoadPlacement, RuleError};
use crate::layout::{BoardConfig, BoardLoader, ConfigError, StandardBoard};
use crate::player::{Player, ResourceHand, RESOURCE_CAP};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Hands above this size lose half on a 7
const DROP_THRESHOLD: u32 = 7;

/// Initial placement, in snake order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetupState {
    FirstSettlement,
    FirstRoad,
    SecondSettlement,
    SecondRoad,
}

/// States within a regular turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegularState {
    /// Before rolling; a knight may be played
    TurnStart,
    /// Rolled; can build, trade, buy and play cards, end turn
    Default,
    BuildSettlement,
    BuildRoad,
    UpgradeSettlement,
    /// First free road of a Road Building card
    RoadBuilding1,
    /// Second free road of a Road Building card
    RoadBuilding2,
    /// A 7 was rolled and some players hold too many cards
    DropCards,
    MoveRobber,
    /// Robber moved next to opponents holding cards
    ChooseVictim,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Setup(SetupState),
    Regular(RegularState),
}

/// Failures of the command surface that are not game outcomes
#[derive(Debug, Error)]
pub enum EngineFault {
    /// A fatal rule error (out-of-range id, desynced drop)
    #[error(transparent)]
    Rule(#[from] RuleError),

    /// The controller's own bookkeeping is inconsistent with its phase
    #[error("cannot handle {command} in {phase:?}")]
    WrongState { command: &'static str, phase: Phase },
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid snapshot: {0}")]
    Invalid(String),
}

/// Everything needed to resume a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchState {
    pub game: Game,
    pub phase: Phase,
    pub current_player: PlayerId,
    /// Settlement placed during setup that the next road must touch
    pub last_settlement: Option<VertexId>,
    /// State to return to once the robber has been dealt with
    pub robber_resume: Option<RegularState>,
    /// Cards each player still owes after a 7
    pub pending_drops: BTreeMap<PlayerId, u32>,
    /// Players that may be stolen from
    pub victims: Vec<PlayerId>,
    pub last_roll: Option<u8>,
    pub winner: Option<PlayerId>,
}

/// Drives one match; randomness for shuffling and stealing comes from `R`
#[derive(Debug, Clone)]
pub struct TurnController<R: Rng = StdRng> {
    state: MatchState,
    rng: R,
}

impl<R: Rng> TurnController<R> {
    /// Start a match on the given layout with 2-4 named players
    pub fn new(
        config: BoardConfig,
        player_names: Vec<String>,
        mut rng: R,
    ) -> Result<Self, ConfigError> {
        if !(2..=4).contains(&player_names.len()) {
            return Err(ConfigError::PlayerCount(player_names.len()));
        }
        let board = Board::from_config(config)?;
        let deck = DevCardDeck::shuffled(&mut rng);
        let game = Game::new(board, deck, player_names);

        Ok(Self {
            state: MatchState {
                game,
                phase: Phase::Setup(SetupState::FirstSettlement),
                current_player: 0,
                last_settlement: None,
                robber_resume: None,
                pending_drops: BTreeMap::new(),
                victims: Vec::new(),
                last_roll: None,
                winner: None,
            },
            rng,
        })
    }

    /// Start a match on the beginner board
    pub fn standard(player_names: Vec<String>, rng: R) -> Result<Self, ConfigError> {
        Self::new(StandardBoard.load()?, player_names, rng)
    }

    // ==================== Queries ====================

    pub fn game(&self) -> &Game {
        &self.state.game
    }

    pub fn board(&self) -> &Board {
        &self.state.game.board
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.state.game.players.get(id as usize)
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn current_player(&self) -> PlayerId {
        self.state.current_player
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.state.winner
    }

    pub fn last_roll(&self) -> Option<u8> {
        self.state.last_roll
    }

    pub fn pending_drops(&self) -> &BTreeMap<PlayerId, u32> {
        &self.state.pending_drops
    }

    pub fn victims(&self) -> &[PlayerId] {
        &self.state.victims
    }

    /// Roll two six-sided dice with the controller's rng. Apply the result
    /// with [`Command::RollDie`].
    pub fn roll_dice(&mut self) -> u8 {
        self.rng.gen_range(1..=6) + self.rng.gen_range(1..=6)
    }

    // ==================== Persistence ====================

    pub fn snapshot(&self) -> MatchState {
        self.state.clone()
    }

    /// Resume a match from a snapshot
    pub fn restore(state: MatchState, rng: R) -> Result<Self, SnapshotError> {
        let players = state.game.players.len();
        if !(2..=4).contains(&players) {
            return Err(SnapshotError::Invalid(format!("{players} players")));
        }
        if state.current_player as usize >= players {
            return Err(SnapshotError::Invalid(format!(
                "current player {} of {players}",
                state.current_player
            )));
        }
        for resource in Resource::ALL {
            let total = state.game.resource_total(resource);
            if total != RESOURCE_CAP {
                return Err(SnapshotError::Invalid(format!(
                    "{total} {resource:?} in circulation"
                )));
            }
        }
        Ok(Self { state, rng })
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(&self.state)?)
    }

    pub fn from_json(json: &str, rng: R) -> Result<Self, SnapshotError> {
        Self::restore(serde_json::from_str(json)?, rng)
    }

    // ==================== Command Dispatch ====================

    /// Apply one command for the current player.
    ///
    /// Expected rule failures come back as result codes and leave the state
    /// unchanged. `Err` means caller and engine are out of sync.
    pub fn apply(&mut self, command: Command) -> Result<ResultCode, EngineFault> {
        let code = match self.dispatch(command)? {
            Ok(code) => code,
            Err(err) => match ResultCode::for_error(&err) {
                Some(code) => code,
                None => {
                    warn!(%err, phase = ?self.state.phase, "fatal rule error");
                    return Err(EngineFault::Rule(err));
                }
            },
        };

        if code == ResultCode::Success && self.state.winner.is_none() {
            let player = self.state.current_player;
            if self.state.game.has_reached_victory(player) {
                self.state.winner = Some(player);
                info!(
                    player,
                    victory_points = self.state.game.victory_points(player),
                    "game won"
                );
                return Ok(ResultCode::GameWin);
            }
        }
        Ok(code)
    }

    fn dispatch(&mut self, command: Command) -> Result<Result<ResultCode, RuleError>, EngineFault> {
        use RegularState as S;

        let result = match (self.state.phase, command) {
            // ==================== Setup ====================
            (Phase::Setup(SetupState::FirstSettlement), Command::PlaceSettlement(v)) => {
                self.setup_settlement(v, false)
            }
            (Phase::Setup(SetupState::SecondSettlement), Command::PlaceSettlement(v)) => {
                self.setup_settlement(v, true)
            }
            (
                Phase::Setup(setup @ (SetupState::FirstRoad | SetupState::SecondRoad)),
                Command::PlaceRoad(r),
            ) => {
                let Some(settlement) = self.state.last_settlement else {
                    return Err(EngineFault::WrongState {
                        command: "PlaceRoad",
                        phase: self.state.phase,
                    });
                };
                self.setup_road(r, settlement, setup == SetupState::SecondRoad)
            }

            // ==================== Dice & Robber ====================
            (Phase::Regular(S::TurnStart), Command::RollDie(die)) => self.roll(die),
            (Phase::Regular(S::DropCards), Command::DropCards(drops)) => self.drop_cards(drops),
            (Phase::Regular(S::MoveRobber), Command::MoveRobber(tile)) => self.move_robber(tile),
            (Phase::Regular(S::ChooseVictim), Command::Steal(victim)) => self.steal(victim),
            (Phase::Regular(from @ (S::TurnStart | S::Default)), Command::PlayKnight) => {
                self.play_knight(from)
            }

            // ==================== Build Modes ====================
            (Phase::Regular(S::Default), Command::BeginBuildSettlement) => {
                Ok(self.enter(S::BuildSettlement))
            }
            (Phase::Regular(S::Default), Command::BeginBuildRoad) => Ok(self.enter(S::BuildRoad)),
            (Phase::Regular(S::Default), Command::BeginUpgrade) => {
                Ok(self.enter(S::UpgradeSettlement))
            }
            (
                Phase::Regular(
                    S::BuildSettlement
                    | S::BuildRoad
                    | S::UpgradeSettlement
                    | S::RoadBuilding1
                    | S::RoadBuilding2,
                ),
                Command::CancelBuild,
            ) => Ok(self.enter(S::Default)),
            (Phase::Regular(S::BuildSettlement), Command::PlaceSettlement(v)) => {
                self.build_settlement(v)
            }
            (Phase::Regular(S::BuildRoad), Command::PlaceRoad(r)) => self.build_road(r),
            (Phase::Regular(S::UpgradeSettlement), Command::UpgradeSettlement(v)) => {
                self.build_city(v)
            }
            (Phase::Regular(S::RoadBuilding1), Command::PlaceRoad(r)) => self.free_road(r, true),
            (Phase::Regular(S::RoadBuilding2), Command::PlaceRoad(r)) => self.free_road(r, false),

            // ==================== Main Actions ====================
            (Phase::Regular(S::Default), Command::BuyDevCard) => self.buy_dev_card(),
            (Phase::Regular(S::Default), Command::PlayRoadBuilding) => self.play_road_building(),
            (Phase::Regular(S::Default), Command::PlayYearOfPlenty(first, second)) => {
                let player = self.state.current_player;
                self.state
                    .game
                    .play_year_of_plenty(player, first, second)
                    .map(|()| ResultCode::Success)
            }
            (Phase::Regular(S::Default), Command::PlayMonopoly(resource)) => {
                let player = self.state.current_player;
                self.state
                    .game
                    .play_monopoly(player, resource)
                    .map(|_| ResultCode::Success)
            }
            (Phase::Regular(S::Default), Command::TradeWithBank { give, get }) => {
                let player = self.state.current_player;
                self.state
                    .game
                    .trade_with_bank(player, give, get)
                    .map(|()| ResultCode::Success)
            }
            (Phase::Regular(S::Default), Command::TradeWithPlayer { partner, give, get }) => {
                let player = self.state.current_player;
                self.state
                    .game
                    .trade_resources(player, partner, &give, &get)
                    .map(|()| ResultCode::Success)
            }
            (Phase::Regular(S::Default), Command::EndTurn) => self.end_turn(),

            (phase, command) => {
                debug!(?phase, ?command, "command not legal in this state");
                Ok(ResultCode::Undefined)
            }
        };
        Ok(result)
    }

    fn enter(&mut self, state: RegularState) -> ResultCode {
        self.set_phase(Phase::Regular(state));
        ResultCode::Success
    }

    fn set_phase(&mut self, phase: Phase) {
        debug!(
            from = ?self.state.phase,
            to = ?phase,
            player = self.state.current_player,
            "phase change"
        );
        self.state.phase = phase;
    }

    // ==================== Setup Handlers ====================

    fn setup_settlement(
        &mut self,
        vertex: VertexId,
        second: bool,
    ) -> Result<ResultCode, RuleError> {
        let player = self.state.current_player;
        self.state.game.place_settlement(vertex, player, true)?;
        if second {
            let resources = self.state.game.resources_from_vertex(player, vertex)?;
            self.state.game.grant_from_bank(player, &resources)?;
        }
        self.state.last_settlement = Some(vertex);
        let next = if second {
            SetupState::SecondRoad
        } else {
            SetupState::FirstRoad
        };
        self.set_phase(Phase::Setup(next));
        Ok(ResultCode::Success)
    }

    fn setup_road(
        &mut self,
        road: RoadId,
        settlement: VertexId,
        second: bool,
    ) -> Result<ResultCode, RuleError> {
        let player = self.state.current_player;
        self.state
            .game
            .place_road(road, player, RoadPlacement::Setup(settlement))?;
        self.state.last_settlement = None;

        let last = (self.state.game.player_count() - 1) as PlayerId;
        let next = match (second, player) {
            // Forward pass; the last player places twice in a row
            (false, p) if p == last => Phase::Setup(SetupState::SecondSettlement),
            (false, p) => {
                self.state.current_player = p + 1;
                Phase::Setup(SetupState::FirstSettlement)
            }
            // Backward pass ends with the first player starting regular play
            (true, 0) => Phase::Regular(RegularState::TurnStart),
            (true, p) => {
                self.state.current_player = p - 1;
                Phase::Setup(SetupState::SecondSettlement)
            }
        };
        self.set_phase(next);
        Ok(ResultCode::Success)
    }

    // ==================== Dice & Robber Handlers ====================

    fn roll(&mut self, die: u8) -> Result<ResultCode, RuleError> {
        if !(2..=12).contains(&die) {
            return Err(RuleError::OutOfRange {
                kind: "die",
                id: die as usize,
            });
        }
        debug!(player = self.state.current_player, die, "dice rolled");

        if die == 7 {
            self.state.last_roll = Some(die);
            self.state.pending_drops = self
                .state
                .game
                .players
                .iter()
                .map(|p| (p.id, p.hand.resources.total()))
                .filter(|&(_, total)| total > DROP_THRESHOLD)
                .map(|(id, total)| (id, total / 2))
                .collect();
            self.state.robber_resume = Some(RegularState::Default);
            let next = if self.state.pending_drops.is_empty() {
                RegularState::MoveRobber
            } else {
                RegularState::DropCards
            };
            return Ok(self.enter(next));
        }

        self.state.game.distribute_resources(die)?;
        self.state.last_roll = Some(die);
        Ok(self.enter(RegularState::Default))
    }

    fn drop_cards(
        &mut self,
        drops: BTreeMap<PlayerId, ResourceHand>,
    ) -> Result<ResultCode, RuleError> {
        let matches_owed = drops.len() == self.state.pending_drops.len()
            && drops
                .iter()
                .all(|(p, hand)| self.state.pending_drops.get(p) == Some(&hand.total()));
        if !matches_owed {
            debug!(?drops, owed = ?self.state.pending_drops, "drop does not match what is owed");
            return Ok(ResultCode::Undefined);
        }
        self.state.game.drop_cards(&drops)?;
        self.state.pending_drops.clear();
        Ok(self.enter(RegularState::MoveRobber))
    }

    fn move_robber(&mut self, tile: TileId) -> Result<ResultCode, RuleError> {
        self.state.game.move_robber(tile)?;
        let player = self.state.current_player;
        let game = &self.state.game;
        self.state.victims = game
            .board
            .players_adjacent_to_tile(tile)
            .into_iter()
            .filter(|&p| p != player && !game.players[p as usize].hand.resources.is_empty())
            .collect();

        if self.state.victims.is_empty() {
            Ok(self.resume())
        } else {
            Ok(self.enter(RegularState::ChooseVictim))
        }
    }

    fn steal(&mut self, victim: PlayerId) -> Result<ResultCode, RuleError> {
        if !self.state.victims.contains(&victim) {
            return Err(RuleError::InvalidPlacement);
        }
        let player = self.state.current_player;
        self.state.game.steal_from_player(player, victim, &mut self.rng)?;
        self.state.victims.clear();
        Ok(self.resume())
    }

    /// Leave the robber flow for the state it interrupted
    fn resume(&mut self) -> ResultCode {
        let state = self.state.robber_resume.take().unwrap_or(RegularState::Default);
        self.enter(state)
    }

    fn play_knight(&mut self, from: RegularState) -> Result<ResultCode, RuleError> {
        let player = self.state.current_player;
        self.state.game.play_knight(player)?;
        self.state.robber_resume = Some(from);
        Ok(self.enter(RegularState::MoveRobber))
    }

    // ==================== Build Handlers ====================
    //
    // A failed placement keeps the build mode so the player can pick again.

    fn build_settlement(&mut self, vertex: VertexId) -> Result<ResultCode, RuleError> {
        let player = self.state.current_player;
        self.state.game.place_settlement(vertex, player, false)?;
        Ok(self.enter(RegularState::Default))
    }

    fn build_road(&mut self, road: RoadId) -> Result<ResultCode, RuleError> {
        let player = self.state.current_player;
        self.state.game.place_road(road, player, RoadPlacement::Regular)?;
        Ok(self.enter(RegularState::Default))
    }

    fn build_city(&mut self, vertex: VertexId) -> Result<ResultCode, RuleError> {
        let player = self.state.current_player;
        self.state.game.upgrade_settlement(player, vertex)?;
        Ok(self.enter(RegularState::Default))
    }

    fn free_road(&mut self, road: RoadId, first: bool) -> Result<ResultCode, RuleError> {
        let player = self.state.current_player;
        self.state.game.place_road(road, player, RoadPlacement::Free)?;
        let out_of_roads = self.state.game.players[player as usize].roads_remaining == 0;
        let next = if first && !out_of_roads {
            RegularState::RoadBuilding2
        } else {
            RegularState::Default
        };
        Ok(self.enter(next))
    }

    // ==================== Main Action Handlers ====================

    fn buy_dev_card(&mut self) -> Result<ResultCode, RuleError> {
        let player = self.state.current_player;
        self.state.game.buy_dev_card(player)?;
        Ok(ResultCode::Success)
    }

    fn play_road_building(&mut self) -> Result<ResultCode, RuleError> {
        let player = self.state.current_player;
        if self.state.game.player(player)?.roads_remaining == 0 {
            return Err(RuleError::NoPiecesRemaining);
        }
        self.state.game.play_road_building(player)?;
        Ok(self.enter(RegularState::RoadBuilding1))
    }

    fn end_turn(&mut self) -> Result<ResultCode, RuleError> {
        let player = self.state.current_player;
        self.state.game.end_turn(player)?;
        self.state.current_player = (player + 1) % self.state.game.player_count() as PlayerId;
        self.state.last_roll = None;
        Ok(self.enter(RegularState::TurnStart))
    }
}
