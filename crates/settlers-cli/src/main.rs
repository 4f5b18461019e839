//! Settlers command replay.
//!
//! Reads a script with one JSON-encoded `Command` per line and applies it to a
//! fresh game on the standard board. A bare `roll` line rolls two dice with the
//! seeded rng and applies the result.

use anyhow::{bail, Context};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use settlers_core::{Command, TurnController};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "settlers")]
#[command(about = "Replay a JSON-lines command script against the standard board")]
struct Args {
    /// Script to replay ("-" reads stdin)
    script: PathBuf,

    /// Number of players (2-4)
    #[arg(long, default_value_t = 2)]
    players: usize,

    /// Seed for deck order, dice and steals
    #[arg(long, env = "SETTLERS_SEED", default_value_t = 42)]
    seed: u64,

    /// Write the final match state here as JSON
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

/// One line of a script
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Apply(Command),
    Roll,
}

/// Parse a script, skipping blank lines and `#` comments. Returns steps with
/// their 1-based line numbers.
fn parse_script(text: &str) -> anyhow::Result<Vec<(usize, Step)>> {
    let mut steps = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let step = if line == "roll" {
            Step::Roll
        } else {
            let command = serde_json::from_str(line)
                .with_context(|| format!("line {line_no}: not a command: {line}"))?;
            Step::Apply(command)
        };
        steps.push((line_no, step));
    }
    Ok(steps)
}

fn read_script(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        return std::io::read_to_string(std::io::stdin()).context("reading script from stdin");
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    if !(2..=4).contains(&args.players) {
        bail!("--players must be between 2 and 4, got {}", args.players);
    }

    let steps = parse_script(&read_script(&args.script)?)?;
    let names = (1..=args.players).map(|i| format!("Player {i}")).collect();
    let mut ctl = TurnController::standard(names, StdRng::seed_from_u64(args.seed))?;
    info!(players = args.players, seed = args.seed, steps = steps.len(), "replaying script");

    for (line_no, step) in steps {
        let command = match step {
            Step::Apply(command) => command,
            Step::Roll => Command::RollDie(ctl.roll_dice()),
        };
        let player = ctl.current_player();
        let code = ctl
            .apply(command.clone())
            .with_context(|| format!("line {line_no}: {command:?}"))?;
        println!("{line_no}: player {} {command:?} -> {code}", player + 1);
    }

    println!("phase: {:?}, current player: {}", ctl.phase(), ctl.current_player() + 1);
    for player in &ctl.game().players {
        println!(
            "  {}: {} VP, {} cards",
            player.name,
            player.victory_points(),
            player.hand.resources.total()
        );
    }
    if let Some(winner) = ctl.winner() {
        println!("winner: player {}", winner + 1);
    }

    if let Some(path) = &args.snapshot {
        std::fs::write(path, ctl.to_json()?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "snapshot written");
    }
    Ok(())
}
