use std::time::{Duration, Instant};

use clap::Parser;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gamut_domain::Preferences;
use gamut_engine::{NullAnnouncer, NullRenderer, NullSurface, Phase, RoundEngine};
use gamut_tutor::Session;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run unattended ear-training rounds against a silent renderer", long_about = None)]
struct Cli {
    /// Exercise level (1-3)
    #[arg(short, long, default_value_t = 1)]
    exercise: u8,
    /// Target cycle length in milliseconds
    #[arg(short, long, default_value_t = 5000)]
    interval: u32,
    /// Number of rounds to run before exiting
    #[arg(short, long, default_value_t = 3)]
    rounds: u32,
    /// Announce the answer label
    #[arg(long)]
    speak: bool,
    /// Keep the answer hidden instead of revealing it
    #[arg(long)]
    hide_answer: bool,
    /// Seed for a reproducible target sequence
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let prefs = Preferences {
        auto_mode: true,
        auto_interval_ms: cli.interval,
        reveal_answer: !cli.hide_answer,
        speak_answer: cli.speak,
        ..Default::default()
    }
    .sanitized();

    let rng = match cli.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };
    let engine = RoundEngine::with_rng(
        NullRenderer::ready(),
        NullAnnouncer::default(),
        NullSurface::default(),
        rng,
    );
    let mut session = Session::new(engine, &prefs);
    session.engine_mut().set_exercise(cli.exercise);

    let started = Instant::now();
    session.engine_mut().start_auto(0);
    info!(
        exercise = cli.exercise,
        interval_ms = prefs.auto_interval_ms,
        "auto drill started"
    );

    let mut last_status = session.status().clone();
    let mut last_phase = session.engine().phase();
    let mut cadences = 1u32;
    loop {
        let now_ms = started.elapsed().as_millis() as u64;
        session.tick(now_ms);

        if *session.status() != last_status {
            last_status = session.status().clone();
            info!(%last_status, "status");
        }
        let phase = session.engine().phase();
        if phase == Phase::PlayingCadence && last_phase != Phase::PlayingCadence {
            cadences += 1;
            if cadences > cli.rounds {
                break;
            }
        }
        last_phase = phase;
        std::thread::sleep(Duration::from_millis(20));
    }

    session.engine_mut().stop_auto();
    info!(rounds = cli.rounds, "auto drill finished");
    Ok(())
}
