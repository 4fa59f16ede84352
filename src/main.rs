//! Ascent headless runner
//!
//! Lets the autopilot climb for a while and logs how it went.
//!
//! Usage: `ascent [seed] [tuning.json]`

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use ascent::consts::{MAX_SUBSTEPS, SIM_DT};
    use ascent::sim::{ClimbEvent, ClimbState, TickInput, tick};
    use ascent::{Result, Tuning};

    /// Simulated wall-clock length of a run
    const RUN_SECONDS: u32 = 120;
    /// Frame rate of the simulated render loop
    const FRAME_RATE: u32 = 30;

    pub fn run() -> Result<()> {
        let mut args = std::env::args().skip(1);
        let seed = args.next().and_then(|s| s.parse::<u64>().ok());
        let tuning = match args.next() {
            Some(path) => {
                let tuning = Tuning::from_json(&std::fs::read_to_string(&path)?)?;
                log::info!("Loaded tuning from {}", path);
                tuning
            }
            None => Tuning::default(),
        };

        let mut state = match seed {
            Some(seed) => ClimbState::new(seed, tuning),
            None => ClimbState::new_random(tuning),
        };

        let input = TickInput {
            idle_mode: true,
            ..Default::default()
        };
        let frame_dt = 1.0 / FRAME_RATE as f32;
        let mut accumulator = 0.0;
        let mut camps = 0;

        for frame in 0..RUN_SECONDS * FRAME_RATE {
            accumulator += frame_dt;
            let mut substeps = 0;
            while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                tick(&mut state, &input, SIM_DT);
                accumulator -= SIM_DT;
                substeps += 1;
                for event in &state.events {
                    if matches!(event, ClimbEvent::ReachedCamp { .. }) {
                        camps += 1;
                    }
                    log::debug!("{:?}", event);
                }
            }

            if frame % (FRAME_RATE * 10) == 0 {
                let p = state.player_snapshot();
                let next_camp = state
                    .terrain()
                    .next_camp(p.altitude)
                    .map_or(-1.0, |camp| camp.altitude - p.altitude);
                log::info!(
                    "t={:>4}s alt={:>7.1} best={:>7.1} hp={:>5.1} {:?} rope={:?} chunks={} \
                     next camp in {:.0}",
                    frame / FRAME_RATE,
                    p.altitude,
                    state.player.best_altitude,
                    p.health,
                    p.state,
                    state.rope_snapshot().phase,
                    state.cache.len(),
                    next_camp
                );
            }
            if state.is_over() {
                break;
            }
        }

        let record = state.save_record();
        log::info!(
            "Finished seed {}: altitude {:.1}, best {:.1}, {} camps, {} chunks generated",
            record.seed,
            record.player_altitude,
            record.best_altitude,
            camps,
            state.cache.generated_total()
        );
        println!("{}", record.to_json()?);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Ascent (native, headless) starting...");

    if let Err(e) = native::run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is the WASM deliverable; this is just to satisfy the compiler
}
