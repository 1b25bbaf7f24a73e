//! Bastion Siege headless runner
//!
//! Plays one seeded run with a simple scripted player: aim at whatever is
//! closest to the structure, take the first upgrade offered. Prints the
//! final snapshot as JSON. Set `RUST_LOG=info` (or `debug`) to follow along.
//!
//! Usage: `bastion-siege [seed] [tuning.json]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use bastion_siege::sim::{GameEvent, Phase, Simulation};
    use bastion_siege::{Leaderboard, ScoreSink, Tuning};

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let seed = args.get(1).and_then(|s| s.parse::<u64>().ok()).unwrap_or(42);
    log::info!("Bastion Siege (headless) starting with seed {}", seed);

    let tuning = match args.get(2) {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(json) => match Tuning::from_json(&json) {
                Ok(t) => t,
                Err(e) => {
                    log::error!("Invalid tuning file {}: {}", path, e);
                    return;
                }
            },
            Err(e) => {
                log::error!("Failed to read {}: {}", path, e);
                return;
            }
        },
        None => Tuning::default(),
    };

    let mut sim = Simulation::with_tuning(seed, tuning);
    sim.subscribe(|event: &GameEvent| match event {
        GameEvent::WaveChanged { wave } => log::info!("-> wave {}", wave),
        GameEvent::GameOver { score, wave } => log::info!("Run lost on wave {} with {}", wave, score),
        GameEvent::GameWon { score, .. } => log::info!("Run won with {}", score),
        _ => {}
    });

    if let Err(e) = sim.start() {
        log::error!("Failed to start: {}", e);
        return;
    }

    const FRAME_MS: f32 = 1000.0 / 60.0;
    const SHOT_EVERY: u32 = 15;
    // One simulated hour is plenty
    const MAX_FRAMES: u32 = 60 * 60 * 60;

    let mut frame = 0;
    while frame < MAX_FRAMES {
        match sim.phase() {
            Phase::Running => {
                if frame % SHOT_EVERY == 0 {
                    let state = sim.state();
                    let origin = state.structure.pos;
                    let target = state
                        .actors
                        .iter()
                        .filter(|a| a.active && !a.friendly)
                        .min_by(|a, b| {
                            a.pos
                                .distance(origin)
                                .partial_cmp(&b.pos.distance(origin))
                                .unwrap_or(std::cmp::Ordering::Equal)
                        })
                        .map(|a| a.pos);
                    if let Some(t) = target {
                        if let Err(e) = sim.shoot_at(t.x, t.y) {
                            log::warn!("Shot rejected: {}", e);
                        }
                    }
                }
                sim.step(FRAME_MS);
                frame += 1;
            }
            Phase::AwaitingUpgradeChoice => {
                let pick = sim.state().offered.first().map(|o| o.id);
                let result = match pick {
                    Some(id) => {
                        log::info!("Taking {}", id.as_str());
                        sim.select_upgrade(id.as_str())
                    }
                    None => sim.skip_upgrade(),
                };
                if let Err(e) = result {
                    log::error!("Upgrade choice failed: {}", e);
                    break;
                }
            }
            phase if phase.is_terminal() => break,
            other => {
                log::error!("Unexpected phase {:?}", other);
                break;
            }
        }
    }

    let snapshot = sim.snapshot();
    let mut board = Leaderboard::new();
    if let Some(rank) = board.submit("headless", snapshot.score, snapshot.wave) {
        log::info!("Leaderboard rank #{}", rank);
    }
    sim.destroy();

    match serde_json::to_string_pretty(&snapshot) {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("Failed to serialize snapshot: {}", e),
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is embedded by the host on wasm; nothing to run here
}
