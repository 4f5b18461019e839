//! Integration tests for the settlers rules engine.
//!
//! These tests drive whole matches through the command surface and check the
//! invariants that must hold after every command.

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use settlers_core::*;
use std::collections::BTreeMap;

fn new_match(players: usize, seed: u64) -> TurnController {
    let names = (1..=players).map(|i| format!("Player {i}")).collect();
    TurnController::standard(names, StdRng::seed_from_u64(seed)).unwrap()
}

/// Lowest-numbered vertex satisfying `pred`
fn first_vertex(ctl: &TurnController, pred: impl Fn(VertexId) -> bool) -> Option<VertexId> {
    (0..ctl.board().vertices().len()).find(|&v| pred(v))
}

fn first_road(ctl: &TurnController, pred: impl Fn(RoadId) -> bool) -> Option<RoadId> {
    (0..ctl.board().roads().len()).find(|&r| pred(r))
}

/// Run through the complete setup phase with valid placements
fn complete_setup(ctl: &mut TurnController) {
    let mut placed = None;
    while let Phase::Setup(state) = ctl.phase() {
        let command = match state {
            SetupState::FirstSettlement | SetupState::SecondSettlement => {
                let v = first_vertex(ctl, |v| ctl.board().is_buildable(v)).unwrap();
                placed = Some(v);
                Command::PlaceSettlement(v)
            }
            SetupState::FirstRoad | SetupState::SecondRoad => {
                let v = placed.unwrap();
                let r = first_road(ctl, |r| {
                    let road = ctl.board().road(r).unwrap();
                    road.owner.is_none() && road.vertices.contains(&v)
                })
                .unwrap();
                Command::PlaceRoad(r)
            }
        };
        assert_eq!(ctl.apply(command).unwrap(), ResultCode::Success);
    }
}

/// Cards to give up for each player that owes some
fn drops_for(ctl: &TurnController) -> BTreeMap<PlayerId, ResourceHand> {
    ctl.pending_drops()
        .iter()
        .map(|(&player, &owed)| {
            let held = &ctl.player(player).unwrap().hand.resources;
            let mut drop = ResourceHand::new();
            let mut remaining = owed;
            for (resource, count) in held.iter() {
                let take = count.min(remaining);
                if take > 0 {
                    drop.add_resource(resource, take).unwrap();
                    remaining -= take;
                }
            }
            (player, drop)
        })
        .collect()
}

/// A simple greedy policy: build whatever is affordable, otherwise end the turn
fn next_command(ctl: &mut TurnController) -> Command {
    let me = ctl.current_player();
    let player = ctl.player(me).unwrap().clone();
    let board = ctl.board();

    let settlement_spot = first_vertex(ctl, |v| board.is_buildable_by(v, me));
    let city_spot = first_vertex(ctl, |v| board.is_upgradable_by(v, me));
    let road_spot = first_road(ctl, |r| board.is_road_buildable_by(r, me));

    match ctl.phase() {
        Phase::Setup(_) => unreachable!("setup is completed first"),
        Phase::Regular(state) => match state {
            RegularState::TurnStart => Command::RollDie(ctl.roll_dice()),
            RegularState::DropCards => Command::DropCards(drops_for(ctl)),
            RegularState::MoveRobber => {
                let tiles = ctl.board().tiles().len();
                Command::MoveRobber((ctl.board().robber_tile() + 1) % tiles)
            }
            RegularState::ChooseVictim => Command::Steal(ctl.victims()[0]),
            RegularState::BuildSettlement => Command::PlaceSettlement(settlement_spot.unwrap()),
            RegularState::UpgradeSettlement => Command::UpgradeSettlement(city_spot.unwrap()),
            RegularState::BuildRoad => Command::PlaceRoad(road_spot.unwrap()),
            RegularState::RoadBuilding1 | RegularState::RoadBuilding2 => Command::CancelBuild,
            RegularState::Default => {
                if player.cities_remaining > 0
                    && city_spot.is_some()
                    && player.can_afford(&costs::city())
                {
                    Command::BeginUpgrade
                } else if player.settlements_remaining > 0
                    && settlement_spot.is_some()
                    && player.can_afford(&costs::settlement())
                {
                    Command::BeginBuildSettlement
                } else if player.roads_remaining > 0
                    && road_spot.is_some()
                    && player.can_afford(&costs::road())
                    // Keep brick and lumber for settlements once roads are plentiful
                    && player.roads_remaining > 9
                {
                    Command::BeginBuildRoad
                } else if !ctl.game().deck.is_empty()
                    && player.can_afford(&costs::development_card())
                {
                    Command::BuyDevCard
                } else {
                    Command::EndTurn
                }
            }
        },
    }
}

fn assert_invariants(ctl: &TurnController) {
    for r in Resource::ALL {
        assert_eq!(ctl.game().resource_total(r), 19, "{r:?} not conserved");
    }
    for vertex in ctl.board().vertices() {
        if vertex.owner().is_some() {
            for &adj in &vertex.vertices {
                assert!(
                    ctl.board().vertex(adj).unwrap().owner().is_none(),
                    "vertices {} and {adj} are both built on",
                    vertex.id
                );
            }
        }
    }
    assert_eq!(ctl.board().tiles().iter().filter(|t| t.has_robber).count(), 1);
    let longest = ctl.game().players.iter().filter(|p| p.has_longest_road).count();
    let largest = ctl.game().players.iter().filter(|p| p.has_largest_army).count();
    assert!(longest <= 1 && largest <= 1);
}

#[test]
fn test_two_player_setup() {
    let mut ctl = new_match(2, 1);
    complete_setup(&mut ctl);

    let settlements = ctl.board().vertices().iter().filter(|v| v.owner().is_some()).count();
    let roads = ctl.board().roads().iter().filter(|r| r.owner.is_some()).count();
    assert_eq!(settlements, 4);
    assert_eq!(roads, 4);
    assert_eq!(ctl.phase(), Phase::Regular(RegularState::TurnStart));
    assert_eq!(ctl.current_player(), 0);
    for id in 0..2 {
        let player = ctl.player(id).unwrap();
        assert_eq!(player.settlements_remaining, 3);
        assert_eq!(player.roads_remaining, 13);
        assert_eq!(player.victory_points(), 2);
    }
    assert_invariants(&ctl);
}

#[test]
fn test_seeded_play_preserves_invariants() {
    for seed in [1, 2, 3] {
        let mut ctl = new_match(4, seed);
        complete_setup(&mut ctl);

        for _ in 0..3000 {
            let command = next_command(&mut ctl);
            let code = ctl.apply(command.clone()).unwrap();
            assert!(
                matches!(code, ResultCode::Success | ResultCode::GameWin),
                "{command:?} returned {code} in {:?}",
                ctl.phase()
            );
            assert_invariants(&ctl);
            if ctl.winner().is_some() {
                break;
            }
        }
    }
}

#[test]
fn test_same_seed_same_match() {
    let play = |seed| {
        let mut ctl = new_match(3, seed);
        complete_setup(&mut ctl);
        for _ in 0..500 {
            let command = next_command(&mut ctl);
            ctl.apply(command).unwrap();
        }
        ctl.snapshot()
    };
    assert_eq!(play(11), play(11));
}

#[test]
fn test_snapshot_restore_midgame() {
    let mut ctl = new_match(3, 5);
    complete_setup(&mut ctl);
    for _ in 0..200 {
        let command = next_command(&mut ctl);
        ctl.apply(command).unwrap();
    }

    let json = ctl.to_json().unwrap();
    let mut restored = TurnController::from_json(&json, StdRng::seed_from_u64(99)).unwrap();
    assert_eq!(restored.snapshot(), ctl.snapshot());

    // Both copies keep accepting the same deterministic commands
    if restored.phase() == Phase::Regular(RegularState::Default) {
        assert_eq!(
            restored.apply(Command::EndTurn).unwrap(),
            ctl.apply(Command::EndTurn).unwrap()
        );
        assert_eq!(restored.current_player(), ctl.current_player());
    }
}

#[test]
fn test_end_turn_outside_default_is_undefined() {
    let mut ctl = new_match(2, 4);
    let before = ctl.snapshot();
    assert_eq!(ctl.apply(Command::EndTurn).unwrap(), ResultCode::Undefined);
    assert_eq!(ctl.snapshot(), before);

    complete_setup(&mut ctl);
    let before = ctl.snapshot();
    assert_eq!(ctl.apply(Command::EndTurn).unwrap(), ResultCode::Undefined);
    assert_eq!(ctl.snapshot(), before);
}

#[test]
fn test_out_of_range_ids_are_faults() {
    let mut ctl = new_match(2, 4);
    let err = ctl.apply(Command::PlaceSettlement(54)).unwrap_err();
    assert!(matches!(err, EngineFault::Rule(RuleError::OutOfRange { kind: "vertex", .. })));
}

fn game(players: usize) -> Game {
    let names = (1..=players).map(|i| format!("Player {i}")).collect();
    Game::new(Board::standard(), DevCardDeck::shuffled(&mut StdRng::seed_from_u64(0)), names)
}

fn give(game: &mut Game, player: PlayerId, batch: &ResourceHand) {
    let hand = &mut game.players[player as usize].hand.resources;
    game.bank.pay_out(hand, batch).unwrap();
}

#[test]
fn test_deck_empties_after_25_purchases() {
    let mut game = game(2);
    for _ in 0..25 {
        give(&mut game, 0, &costs::development_card());
        game.buy_dev_card(0).unwrap();
    }
    give(&mut game, 0, &costs::development_card());
    assert_eq!(game.buy_dev_card(0), Err(RuleError::EmptyDeck));
    assert_eq!(game.players[0].hand.bought_this_turn.total(), 25);
    assert_eq!(game.players[0].hand.resources, costs::development_card());
}

#[test]
fn test_resources_from_die_on_vertex_zero() {
    let mut game = game(2);
    game.place_settlement(0, 0, true).unwrap();
    assert_eq!(game.resources_from_die(0, 10), vec![Resource::Ore]);
}

#[test]
fn test_steal_from_empty_victim() {
    let mut game = game(2);
    let before = game.clone();
    assert_eq!(
        game.steal_from_player(0, 1, &mut StdRng::seed_from_u64(0)),
        Err(RuleError::InsufficientResources)
    );
    assert_eq!(game, before);
}

#[test]
fn test_bank_trade_with_brick_port() {
    let mut game = game(2);
    let port = game
        .board
        .ports()
        .iter()
        .find(|p| p.kind == PortKind::Specific(Resource::Brick))
        .unwrap()
        .clone();
    game.place_settlement(port.vertices[0], 0, true).unwrap();
    give(&mut game, 0, &ResourceHand::single(Resource::Brick, 2));
    give(&mut game, 1, &ResourceHand::single(Resource::Brick, 2));

    game.trade_with_bank(0, Resource::Brick, Resource::Wool).unwrap();
    assert_eq!(game.players[0].hand.resources, ResourceHand::single(Resource::Wool, 1));

    assert_eq!(
        game.trade_with_bank(1, Resource::Brick, Resource::Wool),
        Err(RuleError::InsufficientResources)
    );
    assert_eq!(game.players[1].hand.resources, ResourceHand::single(Resource::Brick, 2));
}

#[test]
fn test_year_of_plenty_consumes_card_when_bank_short() {
    let mut game = game(2);
    game.players[0].hand.dev_cards.add(DevelopmentCard::YearOfPlenty);
    give(&mut game, 1, &ResourceHand::single(Resource::Grain, 19));

    assert_eq!(
        game.play_year_of_plenty(0, Resource::Grain, Resource::Ore),
        Err(RuleError::InsufficientResources)
    );
    // Card is spent even though the bank could not pay
    assert_eq!(game.players[0].hand.dev_cards.total(), 0);
    assert!(game.dev_card_played_this_turn);
}

#[test]
fn test_custom_layout_with_district() {
    let config = StandardBoard::config().with_district(0, District::Mine);
    let json = config.to_json().unwrap();
    let loaded = BoardConfig::from_json(&json).unwrap();
    assert_eq!(loaded, config);

    let names = vec!["A".to_string(), "B".to_string()];
    let mut ctl = TurnController::new(loaded, names, StdRng::seed_from_u64(0)).unwrap();
    // Player 1 then player 2 take their first spots away from vertex 0
    for v in [8, 20] {
        assert_eq!(ctl.apply(Command::PlaceSettlement(v)).unwrap(), ResultCode::Success);
        let road = ctl.board().vertex(v).unwrap().roads[0];
        assert_eq!(ctl.apply(Command::PlaceRoad(road)).unwrap(), ResultCode::Success);
    }
    assert_eq!(ctl.apply(Command::PlaceSettlement(0)).unwrap(), ResultCode::Success);
    // Second settlement of player 2 on the mine: three ore
    assert_eq!(ctl.player(1).unwrap().hand.resources, ResourceHand::single(Resource::Ore, 3));
}

#[test]
fn test_malformed_layout_rejected() {
    assert!(matches!(BoardConfig::from_json("{"), Err(ConfigError::Json(_))));

    let mut config = StandardBoard::config();
    config.vertex_vertices[0].push(53);
    assert!(Board::from_config(config).is_err());
}
