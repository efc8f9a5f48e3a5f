//! doomsim demo
//!
//! Loads the built-in demo map, plays a short scripted run through it,
//! then checks the run replays and restores to the same state hash.

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use doomsim::{
    core::angle::ANG180,
    map::demo,
    world::WorldEventData,
    DefinitionRegistry, TickCommand, World, WorldConfig, WorldSnapshot, TICK_RATE, VERSION,
};

/// Ticks the scripted run lasts.
const DEMO_TICKS: u32 = 10 * TICK_RATE;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("doomsim v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let config = WorldConfig::from_env();
    info!("Skill: {:?}, Seed: {}", config.skill, config.seed);

    demo_run(config)
}

/// Command for tick `t` of the scripted run: turn to the switch, press it,
/// turn back and walk east through the opening door.
fn script(t: u32) -> TickCommand {
    match t {
        0 => TickCommand { angle_turn: ANG180 as i32, ..TickCommand::default() },
        1 => TickCommand::use_press(),
        2 => TickCommand { angle_turn: ANG180 as i32, ..TickCommand::default() },
        _ => TickCommand::forward(50),
    }
}

fn load(config: &WorldConfig) -> Result<World> {
    World::load(&demo::door_room(), DefinitionRegistry::doom_defaults(), config.clone())
        .context("loading demo map")
}

fn demo_run(config: WorldConfig) -> Result<()> {
    info!("=== Starting Demo Run ===");

    let mut world = load(&config)?;
    info!(
        "Map {}: {} sectors, {} lines, {} entities",
        world.geometry().name,
        world.geometry().sectors.len(),
        world.geometry().lines.len(),
        world.entities().len()
    );

    let mut total_events = 0;
    let mut snapshot = None;

    for t in 0..DEMO_TICKS {
        world.set_command(0, script(t));
        world.tick();

        for event in world.take_events() {
            total_events += 1;
            match &event.data {
                WorldEventData::LineActivated { line, special, .. } => {
                    info!("Tick {}: line {} activated {:?}", event.tick, line, special);
                }
                WorldEventData::ItemPickedUp { player, item } => {
                    info!("Tick {}: player {} picked up {}", event.tick, player, item);
                }
                WorldEventData::EntityDied { entity } => {
                    info!("Tick {}: entity {} died", event.tick, entity);
                }
                WorldEventData::SectorMoveFinished { sector } => {
                    info!("Tick {}: sector {} stopped moving", event.tick, sector);
                }
                _ => {}
            }
        }

        // Save halfway through
        if t + 1 == DEMO_TICKS / 2 {
            snapshot = Some(world.snapshot().to_bytes()?);
        }
    }

    if let Some(camera) = world.camera(0, 0) {
        let (x, y, z) = camera.position.to_floats();
        info!("Player 0 camera at ({:.1}, {:.1}, {:.1})", x, y, z);
    }

    info!("=== Run Results ===");
    let hash = world.compute_hash();
    info!("Final State Hash: {}", hex::encode(hash));
    info!("Total events: {}", total_events);

    // Verify determinism by replaying
    info!("=== Verifying Determinism ===");
    let mut replay = load(&config)?;
    for t in 0..DEMO_TICKS {
        replay.set_command(0, script(t));
        replay.tick();
    }
    let replay_hash = replay.compute_hash();
    info!("Replay State Hash: {}", hex::encode(replay_hash));
    if hash != replay_hash {
        bail!("determinism failure: replay hash differs");
    }
    info!("DETERMINISM VERIFIED: Hashes match!");

    // Resume from the midpoint snapshot
    let Some(bytes) = snapshot else {
        warn!("No snapshot taken, skipping restore check");
        return Ok(());
    };
    info!("Snapshot size: {} bytes", bytes.len());
    let mut restored = World::restore(
        &demo::door_room(),
        DefinitionRegistry::doom_defaults(),
        config,
        WorldSnapshot::from_bytes(&bytes)?,
    )?;
    for t in restored.gametick()..DEMO_TICKS {
        restored.set_command(0, script(t));
        restored.tick();
    }
    let restored_hash = restored.compute_hash();
    info!("Restored State Hash: {}", hex::encode(restored_hash));
    if hash != restored_hash {
        bail!("snapshot failure: restored hash differs");
    }
    info!("SNAPSHOT VERIFIED: Hashes match!");

    Ok(())
}
