#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a scripted vehicle voyage.

mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use harbor_core::{Command, Event, ObjectId};
use harbor_system_pathing::{ChartedPath, SeaChart};
use harbor_world::{self as world, query, World};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::scenario::Scenario;

/// Runs a vehicle voyage described by a TOML scenario.
#[derive(Debug, Parser)]
#[command(name = "harbor", version, about)]
struct Cli {
    /// Scenario file to load.
    scenario: PathBuf,
    /// Overrides the number of animation ticks from the scenario.
    #[arg(long)]
    ticks: Option<u32>,
    /// Plans the voyage with A* over a chart of the scenario's sea.
    #[arg(long)]
    charted: bool,
    /// Prints the vehicle's save record once the voyage ends.
    #[arg(long)]
    ireg: bool,
}

/// Entry point for the Harbor command-line interface.
fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let scenario = Scenario::load(&cli.scenario)?;
    let mut world = World::with_config(scenario.world);
    let mut log = Vec::new();
    let barge = scenario.build(&mut world, &mut log)?;
    report(&log);

    if cli.charted {
        let chart = SeaChart::of_barge(&world, barge, scenario.sea)
            .context("vehicle vanished before charting")?;
        let _ = world::install_pathfinder(&mut world, barge, Box::new(ChartedPath::new(chart)));
        debug!(%barge, "charted pathfinder installed");
    }

    let ticks = cli.ticks.unwrap_or(scenario.voyage.ticks);
    let arrived = sail(&mut world, barge, &scenario, ticks);

    let mut events = Vec::new();
    world::apply(&mut world, Command::SetMovingBarge { barge: None }, &mut events);
    report(&events);

    let snapshot = query::barge(&world, barge).context("vehicle vanished during the voyage")?;
    if arrived {
        info!(tile = ?snapshot.tile, facing = ?snapshot.facing, "voyage complete");
    } else {
        warn!(
            tile = ?snapshot.tile,
            destination = ?scenario.voyage.destination,
            "voyage ended short of its destination"
        );
    }

    if cli.ireg {
        let record = query::ireg_record(&world, barge).context("vehicle has no save record")?;
        let hex: Vec<String> = record
            .encode()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect();
        println!("{}", hex.join(" "));
    }

    Ok(())
}

/// Issues the travel order and pumps ticks until the vehicle halts or the
/// tick budget runs out. Returns whether it reached the destination.
fn sail(world: &mut World, barge: ObjectId, scenario: &Scenario, ticks: u32) -> bool {
    let speed = scenario.voyage.speed();
    let destination = scenario.voyage.destination;

    let mut events = Vec::new();
    world::apply(
        world,
        Command::TravelTo {
            barge,
            destination,
            speed,
        },
        &mut events,
    );
    report(&events);
    if events
        .iter()
        .any(|event| matches!(event, Event::TravelRejected { .. }))
    {
        return false;
    }

    let start = query::now(world);
    for tick in 0..ticks {
        events.clear();
        world::apply(
            world,
            Command::Tick {
                now: start + speed * tick,
            },
            &mut events,
        );
        report(&events);
        if !query::in_queue(world, barge) {
            break;
        }
    }

    query::barge(world, barge).is_some_and(|snapshot| {
        snapshot.tile.x() == destination.x() && snapshot.tile.y() == destination.y()
    })
}

fn report(events: &[Event]) {
    for event in events {
        match event {
            Event::StepBlocked { .. } | Event::TurnRejected { .. } | Event::TravelRejected { .. } => {
                warn!(?event)
            }
            Event::RegionInvalidated { .. } | Event::TimeAdvanced { .. } => debug!(?event),
            _ => info!(?event),
        }
    }
}
