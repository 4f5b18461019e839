//! Rules engine.
//!
//! `Game` owns the board, bank, deck and players and implements every rule
//! that changes them: placement, production, the robber, development cards,
//! trading and the Longest Road / Largest Army awards. It does not know whose
//! turn it is; that is the job of [`TurnController`](crate::turn::TurnController).

use crate::bank::Bank;
use crate::board::{Board, PlayerId, Resource, RoadId, TileId, VertexId};
use crate::deck::{DevCardDeck, DevelopmentCard};
use crate::player::{costs, Player, ResourceError, ResourceHand};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

/// Victory points needed to win
pub const VICTORY_POINTS_TO_WIN: u32 = 10;

/// Minimum road length for Longest Road
pub const MIN_LONGEST_ROAD: u32 = 5;

/// Minimum knights for Largest Army
pub const MIN_LARGEST_ARMY: u32 = 3;

/// Errors returned by rule operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("Invalid placement location")]
    InvalidPlacement,

    #[error("Cannot afford this")]
    InsufficientResources,

    #[error("No pieces remaining")]
    NoPiecesRemaining,

    #[error("Card cannot be played")]
    CardNotPlayable,

    #[error("No development cards left in deck")]
    EmptyDeck,

    #[error("Invalid trade")]
    InvalidTrade,

    #[error("{kind} id {id} out of range")]
    OutOfRange { kind: &'static str, id: usize },

    #[error("Illegal argument: {0}")]
    IllegalArgument(String),
}

impl RuleError {
    /// Fatal errors mean the caller and the engine disagree about the game
    /// state; they are never a legal game outcome.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RuleError::OutOfRange { .. } | RuleError::IllegalArgument(_))
    }
}

impl From<ResourceError> for RuleError {
    fn from(_: ResourceError) -> Self {
        RuleError::InsufficientResources
    }
}

/// How a road is being placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoadPlacement {
    /// Setup road; must touch the settlement just placed
    Setup(VertexId),
    /// Bought road
    Regular,
    /// Free road from a Road Building card
    Free,
}

/// Board, bank, deck and players of one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub board: Board,
    pub bank: Bank,
    pub deck: DevCardDeck,
    pub players: Vec<Player>,
    /// Whether a dev card has been played this turn
    pub dev_card_played_this_turn: bool,
}

impl Game {
    pub fn new(board: Board, deck: DevCardDeck, player_names: Vec<String>) -> Self {
        let players = player_names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Player::new(i as PlayerId, name))
            .collect();

        Self {
            board,
            bank: Bank::new(),
            deck,
            players,
            dev_card_played_this_turn: false,
        }
    }

    // ==================== Queries ====================

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player, RuleError> {
        self.players.get(id as usize).ok_or(RuleError::OutOfRange {
            kind: "player",
            id: id as usize,
        })
    }

    fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player, RuleError> {
        self.players.get_mut(id as usize).ok_or(RuleError::OutOfRange {
            kind: "player",
            id: id as usize,
        })
    }

    /// Two distinct players, both borrowed mutably
    fn pair_mut(&mut self, a: PlayerId, b: PlayerId) -> (&mut Player, &mut Player) {
        let (a, b) = (a as usize, b as usize);
        if a < b {
            let (low, high) = self.players.split_at_mut(b);
            (&mut low[a], &mut high[0])
        } else {
            let (low, high) = self.players.split_at_mut(a);
            (&mut high[0], &mut low[b])
        }
    }

    fn check_vertex(&self, id: VertexId) -> Result<(), RuleError> {
        match self.board.vertex(id) {
            Some(_) => Ok(()),
            None => Err(RuleError::OutOfRange { kind: "vertex", id }),
        }
    }

    fn check_road(&self, id: RoadId) -> Result<(), RuleError> {
        match self.board.road(id) {
            Some(_) => Ok(()),
            None => Err(RuleError::OutOfRange { kind: "road", id }),
        }
    }

    fn check_tile(&self, id: TileId) -> Result<(), RuleError> {
        match self.board.tile(id) {
            Some(_) => Ok(()),
            None => Err(RuleError::OutOfRange { kind: "tile", id }),
        }
    }

    pub fn victory_points(&self, player: PlayerId) -> u32 {
        self.players
            .get(player as usize)
            .map_or(0, Player::victory_points)
    }

    /// Bank stock plus every hand's count of `resource`
    pub fn resource_total(&self, resource: Resource) -> u32 {
        self.bank.get(resource)
            + self
                .players
                .iter()
                .map(|p| p.hand.resources.get(resource))
                .sum::<u32>()
    }

    // ==================== Building ====================

    /// Place a settlement. During setup only the distance rule applies and
    /// the settlement is free.
    pub fn place_settlement(
        &mut self,
        vertex: VertexId,
        player: PlayerId,
        setup: bool,
    ) -> Result<(), RuleError> {
        self.check_vertex(vertex)?;
        self.player(player)?;

        let legal = if setup {
            self.board.is_buildable(vertex)
        } else {
            self.board.is_buildable_by(vertex, player)
        };
        if !legal {
            return Err(RuleError::InvalidPlacement);
        }
        if self.players[player as usize].settlements_remaining == 0 {
            return Err(RuleError::NoPiecesRemaining);
        }
        if !setup {
            let p = &mut self.players[player as usize];
            self.bank.collect(&mut p.hand.resources, &costs::settlement())?;
        }

        self.board.place_settlement(vertex, player);
        let port = self
            .board
            .vertex(vertex)
            .and_then(|v| v.port)
            .and_then(|id| self.board.port(id))
            .map(|port| port.kind);
        let p = &mut self.players[player as usize];
        p.settlements_remaining -= 1;
        p.building_points += 1;
        if let Some(kind) = port {
            p.trade_boosts.insert(kind);
        }
        debug!(player, vertex, setup, "settlement placed");

        // A new settlement can cut an opponent's road
        self.update_longest_road();
        Ok(())
    }

    /// Upgrade one of the player's settlements to a city
    pub fn upgrade_settlement(
        &mut self,
        player: PlayerId,
        vertex: VertexId,
    ) -> Result<(), RuleError> {
        self.check_vertex(vertex)?;
        self.player(player)?;

        if !self.board.is_upgradable_by(vertex, player) {
            return Err(RuleError::InvalidPlacement);
        }
        let p = &mut self.players[player as usize];
        if p.cities_remaining == 0 {
            return Err(RuleError::NoPiecesRemaining);
        }
        self.bank.collect(&mut p.hand.resources, &costs::city())?;

        p.cities_remaining -= 1;
        p.settlements_remaining += 1;
        p.building_points += 1;
        self.board.upgrade_to_city(vertex, player);
        debug!(player, vertex, "settlement upgraded to city");
        Ok(())
    }

    pub fn place_road(
        &mut self,
        road: RoadId,
        player: PlayerId,
        placement: RoadPlacement,
    ) -> Result<(), RuleError> {
        self.check_road(road)?;
        self.player(player)?;

        let legal = match placement {
            RoadPlacement::Setup(vertex) => self
                .board
                .road(road)
                .is_some_and(|r| r.owner.is_none() && r.vertices.contains(&vertex)),
            RoadPlacement::Regular | RoadPlacement::Free => {
                self.board.is_road_buildable_by(road, player)
            }
        };
        if !legal {
            return Err(RuleError::InvalidPlacement);
        }
        let p = &mut self.players[player as usize];
        if p.roads_remaining == 0 {
            return Err(RuleError::NoPiecesRemaining);
        }
        if placement == RoadPlacement::Regular {
            self.bank.collect(&mut p.hand.resources, &costs::road())?;
        }

        p.roads_remaining -= 1;
        self.board.place_road(road, player);
        debug!(player, road, ?placement, "road placed");

        self.update_longest_road();
        Ok(())
    }

    // ==================== Production ====================

    /// What `player` earns on a roll of `die`, ordered by vertex id
    pub fn resources_from_die(&self, player: PlayerId, die: u8) -> Vec<Resource> {
        self.board
            .owned_vertices(player)
            .flat_map(|v| self.board.yield_at(v.id, die))
            .collect()
    }

    /// One round of production from `vertex`, which `player` must own
    pub fn resources_from_vertex(
        &self,
        player: PlayerId,
        vertex: VertexId,
    ) -> Result<Vec<Resource>, RuleError> {
        self.check_vertex(vertex)?;
        if self.board.vertex(vertex).and_then(|v| v.owner()) != Some(player) {
            return Err(RuleError::InvalidPlacement);
        }
        Ok(self.board.yield_of(vertex))
    }

    /// Pay a list of resources out of the bank to `player`.
    ///
    /// A resource the bank cannot cover in full is withheld, the same as in
    /// production. Returns what was paid.
    pub fn grant_from_bank(
        &mut self,
        player: PlayerId,
        resources: &[Resource],
    ) -> Result<ResourceHand, RuleError> {
        self.player(player)?;
        let mut batch = ResourceHand::from_resources(resources);
        for resource in Resource::ALL {
            let stock = self.bank.get(resource);
            if batch.get(resource) > stock {
                let wanted = batch.take_all(resource);
                debug!(player, ?resource, wanted, stock, "bank short, not paid");
            }
        }
        if !batch.is_empty() {
            let p = &mut self.players[player as usize];
            self.bank.pay_out(&mut p.hand.resources, &batch)?;
        }
        Ok(batch)
    }

    /// Pay every player's production for `die`.
    ///
    /// If the bank cannot cover the total demand for a resource, nobody
    /// receives that resource. Returns what each player received.
    pub fn distribute_resources(
        &mut self,
        die: u8,
    ) -> Result<Vec<(PlayerId, ResourceHand)>, RuleError> {
        let mut demand: Vec<(PlayerId, ResourceHand)> = self
            .players
            .iter()
            .map(|p| {
                (
                    p.id,
                    ResourceHand::from_resources(&self.resources_from_die(p.id, die)),
                )
            })
            .collect();

        for resource in Resource::ALL {
            let wanted: u32 = demand.iter().map(|(_, hand)| hand.get(resource)).sum();
            if wanted > self.bank.get(resource) {
                debug!(?resource, wanted, stock = self.bank.get(resource), "bank short, not paid");
                for (_, hand) in &mut demand {
                    hand.take_all(resource);
                }
            }
        }

        for (player, batch) in &demand {
            if !batch.is_empty() {
                let p = &mut self.players[*player as usize];
                self.bank.pay_out(&mut p.hand.resources, batch)?;
            }
        }
        demand.retain(|(_, hand)| !hand.is_empty());
        Ok(demand)
    }

    // ==================== Robber ====================

    pub fn move_robber(&mut self, tile: TileId) -> Result<(), RuleError> {
        self.check_tile(tile)?;
        if tile == self.board.robber_tile() {
            return Err(RuleError::InvalidPlacement);
        }
        self.board.move_robber(tile);
        debug!(tile, "robber moved");
        Ok(())
    }

    /// Move one card from `victim` to `robber`, picked with probability
    /// proportional to the victim's holdings
    pub fn steal_from_player<R: Rng + ?Sized>(
        &mut self,
        robber: PlayerId,
        victim: PlayerId,
        rng: &mut R,
    ) -> Result<Resource, RuleError> {
        self.player(robber)?;
        let held = self.player(victim)?.hand.resources.clone();
        if robber == victim {
            return Err(RuleError::IllegalArgument(format!(
                "player {robber} cannot steal from themselves"
            )));
        }
        let total = held.total();
        if total == 0 {
            return Err(RuleError::InsufficientResources);
        }

        let mut pick = rng.gen_range(0..total);
        let mut stolen = Resource::Brick;
        for (resource, count) in held.iter() {
            if pick < count {
                stolen = resource;
                break;
            }
            pick -= count;
        }

        let (thief, target) = self.pair_mut(robber, victim);
        ResourceHand::transfer(
            &mut target.hand.resources,
            &mut thief.hand.resources,
            &ResourceHand::single(stolen, 1),
        )?;
        debug!(robber, victim, ?stolen, "resource stolen");
        Ok(stolen)
    }

    /// Return the listed cards of each player to the bank.
    ///
    /// Either every drop happens or none does; a player who cannot afford
    /// their drop is a desync between caller and engine.
    pub fn drop_cards(
        &mut self,
        drops: &BTreeMap<PlayerId, ResourceHand>,
    ) -> Result<(), RuleError> {
        for (&player, batch) in drops {
            if !self.player(player)?.can_afford(batch) {
                return Err(RuleError::IllegalArgument(format!(
                    "player {player} cannot drop {batch:?}"
                )));
            }
        }
        let mut bank = self.bank.clone();
        let mut hands: Vec<ResourceHand> =
            self.players.iter().map(|p| p.hand.resources.clone()).collect();
        for (&player, batch) in drops {
            bank.collect(&mut hands[player as usize], batch)?;
        }
        self.bank = bank;
        for (p, hand) in self.players.iter_mut().zip(hands) {
            p.hand.resources = hand;
        }
        Ok(())
    }

    // ==================== Development Cards ====================

    pub fn buy_dev_card(&mut self, player: PlayerId) -> Result<DevelopmentCard, RuleError> {
        self.player(player)?;
        if self.deck.is_empty() {
            return Err(RuleError::EmptyDeck);
        }
        if !self.players[player as usize].can_afford(&costs::development_card()) {
            return Err(RuleError::InsufficientResources);
        }
        let Some(card) = self.deck.draw() else {
            return Err(RuleError::EmptyDeck);
        };
        let p = &mut self.players[player as usize];
        self.bank.collect(&mut p.hand.resources, &costs::development_card())?;
        p.hand.bought_this_turn.add(card);
        debug!(player, ?card, remaining = self.deck.len(), "development card bought");
        Ok(card)
    }

    /// Spend one playable card of `kind`, enforcing one card per turn
    pub fn use_dev_card(
        &mut self,
        player: PlayerId,
        kind: DevelopmentCard,
    ) -> Result<(), RuleError> {
        let played = self.dev_card_played_this_turn;
        let p = self.player_mut(player)?;
        if played || !p.has_playable_dev_card(kind) {
            return Err(RuleError::CardNotPlayable);
        }
        p.hand.dev_cards.take(kind);
        self.dev_card_played_this_turn = true;
        debug!(player, ?kind, "development card played");
        Ok(())
    }

    pub fn play_knight(&mut self, player: PlayerId) -> Result<(), RuleError> {
        self.use_dev_card(player, DevelopmentCard::Knight)?;
        self.players[player as usize].knights_played += 1;
        self.update_largest_army();
        Ok(())
    }

    /// Spend the card; the two free roads are placed with [`RoadPlacement::Free`]
    pub fn play_road_building(&mut self, player: PlayerId) -> Result<(), RuleError> {
        self.use_dev_card(player, DevelopmentCard::RoadBuilding)
    }

    /// Take every `resource` card from all other players. Returns the amount taken.
    pub fn play_monopoly(
        &mut self,
        player: PlayerId,
        resource: Resource,
    ) -> Result<u32, RuleError> {
        self.use_dev_card(player, DevelopmentCard::Monopoly)?;
        let mut taken = 0;
        for other in 0..self.players.len() as PlayerId {
            if other == player {
                continue;
            }
            let amount = self.players[other as usize].hand.resources.get(resource);
            if amount == 0 {
                continue;
            }
            let (winner, loser) = self.pair_mut(player, other);
            ResourceHand::transfer(
                &mut loser.hand.resources,
                &mut winner.hand.resources,
                &ResourceHand::single(resource, amount),
            )?;
            taken += amount;
        }
        debug!(player, ?resource, taken, "monopoly");
        Ok(taken)
    }

    /// Take two resources from the bank.
    ///
    /// The card is spent before the bank is checked, so a bank that cannot
    /// cover the request still costs the player their card.
    pub fn play_year_of_plenty(
        &mut self,
        player: PlayerId,
        first: Resource,
        second: Resource,
    ) -> Result<(), RuleError> {
        self.use_dev_card(player, DevelopmentCard::YearOfPlenty)?;
        let wanted = ResourceHand::from_resources(&[first, second]);
        if !self.bank.has(&wanted) {
            return Err(RuleError::InsufficientResources);
        }
        let p = &mut self.players[player as usize];
        self.bank.pay_out(&mut p.hand.resources, &wanted)?;
        Ok(())
    }

    // ==================== Trading ====================

    /// Swap `give` from `from` for `get` from `to`
    pub fn trade_resources(
        &mut self,
        from: PlayerId,
        to: PlayerId,
        give: &ResourceHand,
        get: &ResourceHand,
    ) -> Result<(), RuleError> {
        self.player(from)?;
        if to == from || self.player(to).is_err() || give.is_empty() || get.is_empty() {
            return Err(RuleError::InvalidTrade);
        }
        if !self.players[from as usize].can_afford(give)
            || !self.players[to as usize].can_afford(get)
        {
            return Err(RuleError::InsufficientResources);
        }

        let (a, b) = self.pair_mut(from, to);
        let mut hand_a = a.hand.resources.clone();
        let mut hand_b = b.hand.resources.clone();
        ResourceHand::transfer(&mut hand_a, &mut hand_b, give)?;
        ResourceHand::transfer(&mut hand_b, &mut hand_a, get)?;
        a.hand.resources = hand_a;
        b.hand.resources = hand_b;
        debug!(from, to, "players traded");
        Ok(())
    }

    /// Trade at the player's best rate for `give` for one `get`
    pub fn trade_with_bank(
        &mut self,
        player: PlayerId,
        give: Resource,
        get: Resource,
    ) -> Result<(), RuleError> {
        let p = self.player(player)?;
        if give == get {
            return Err(RuleError::InvalidTrade);
        }
        let rate = p.bank_rate(give);
        if p.hand.resources.get(give) < rate || self.bank.get(get) == 0 {
            return Err(RuleError::InsufficientResources);
        }

        let mut bank = self.bank.clone();
        let mut hand = p.hand.resources.clone();
        bank.collect(&mut hand, &ResourceHand::single(give, rate))?;
        bank.pay_out(&mut hand, &ResourceHand::single(get, 1))?;
        self.bank = bank;
        self.players[player as usize].hand.resources = hand;
        debug!(player, ?give, ?get, rate, "traded with bank");
        Ok(())
    }

    // ==================== Turn Bookkeeping ====================

    /// Bought cards become playable and the per-turn card limit resets
    pub fn end_turn(&mut self, player: PlayerId) -> Result<(), RuleError> {
        self.player_mut(player)?.end_turn();
        self.dev_card_played_this_turn = false;
        Ok(())
    }

    // ==================== Awards ====================

    /// Re-evaluate Longest Road. Returns the new holder if it changed.
    pub fn update_longest_road(&mut self) -> Option<PlayerId> {
        let lengths: Vec<u32> = self
            .players
            .iter()
            .map(|p| self.board.longest_road(p.id))
            .collect();
        let holder = self.players.iter().position(|p| p.has_longest_road);
        let challenger = award_challenger(&lengths, holder, MIN_LONGEST_ROAD)?;

        for (i, p) in self.players.iter_mut().enumerate() {
            p.has_longest_road = i == challenger;
        }
        info!(
            player = challenger,
            length = lengths[challenger],
            "longest road awarded"
        );
        Some(challenger as PlayerId)
    }

    /// Re-evaluate Largest Army. Returns the new holder if it changed.
    pub fn update_largest_army(&mut self) -> Option<PlayerId> {
        let knights: Vec<u32> = self.players.iter().map(|p| p.knights_played).collect();
        let holder = self.players.iter().position(|p| p.has_largest_army);
        let challenger = award_challenger(&knights, holder, MIN_LARGEST_ARMY)?;

        for (i, p) in self.players.iter_mut().enumerate() {
            p.has_largest_army = i == challenger;
        }
        info!(
            player = challenger,
            knights = knights[challenger],
            "largest army awarded"
        );
        Some(challenger as PlayerId)
    }

    pub fn has_reached_victory(&self, player: PlayerId) -> bool {
        self.victory_points(player) >= VICTORY_POINTS_TO_WIN
    }
}

/// The player who should take an award away from `holder`, if anyone.
///
/// A challenger needs at least `minimum` and strictly more than the holder.
/// When several players share the top score nobody new is awarded.
fn award_challenger(scores: &[u32], holder: Option<usize>, minimum: u32) -> Option<usize> {
    let floor = match holder {
        Some(h) => scores[h].max(minimum.saturating_sub(1)),
        None => minimum.saturating_sub(1),
    };
    let best = scores
        .iter()
        .enumerate()
        .filter(|&(i, &s)| Some(i) != holder && s > floor)
        .map(|(_, &s)| s)
        .max()?;
    let mut leaders = scores
        .iter()
        .enumerate()
        .filter(|&(i, &s)| Some(i) != holder && s == best);
    let (first, _) = leaders.next()?;
    if leaders.next().is_some() {
        return None;
    }
    Some(first)
}
