use std::collections::HashMap;
use std::env;

use crossway::control::{AcclnController, ConstantController};
use crossway::envs::{EnvConfig, RoadIntersectionEnv, Scenario, SplineEnv, TrackStrategy};
use crossway::infra::EpisodeMetrics;
use crossway::state::IntersectionLayout;
use dotenv::dotenv;
use rand::SeedableRng;
use rand::rngs::StdRng;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn get_env_var_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|val| val.parse::<usize>().ok())
}

fn get_env_var_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|val| val.parse::<u64>().ok())
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("crossway=debug,info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

/// Fallback acceleration index: +0.5 m/s^2.
const DEFAULT_ACCLN_INDEX: usize = 8;

#[cfg(feature = "rl")]
fn build_controller() -> Box<dyn AcclnController> {
    use std::path::Path;

    use burn::backend::NdArray;
    use crossway::control::AcclnPolicy;

    if let Ok(dir) = env::var("CROSSWAY_CHECKPOINT") {
        match AcclnPolicy::<NdArray>::load(Default::default(), Path::new(&dir)) {
            Ok(policy) => {
                tracing::info!("using {}", policy.name());
                return Box::new(policy);
            }
            Err(e) => tracing::warn!("falling back to constant controller: {e}"),
        }
    }
    Box::new(ConstantController::new(DEFAULT_ACCLN_INDEX))
}

#[cfg(not(feature = "rl"))]
fn build_controller() -> Box<dyn AcclnController> {
    Box::new(ConstantController::new(DEFAULT_ACCLN_INDEX))
}

fn main() {
    dotenv().ok();
    init_logging();

    let started = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string());

    let n_agents = get_env_var_usize("CROSSWAY_AGENTS").unwrap_or(4);
    let episodes = get_env_var_usize("CROSSWAY_EPISODES").unwrap_or(10);
    let goals = get_env_var_usize("CROSSWAY_GOALS").unwrap_or(3);
    let seed = get_env_var_u64("CROSSWAY_SEED").unwrap_or(7);
    let variant = env::var("CROSSWAY_VARIANT").unwrap_or_else(|_| "full".to_string());
    let strategy = match variant.as_str() {
        "full" => TrackStrategy::FullOffset,
        "leftright" | "axis" => TrackStrategy::AxisOffset,
        other => {
            tracing::warn!("unknown variant '{other}', using 'full'");
            TrackStrategy::FullOffset
        }
    };

    tracing::info!(
        "run started {started}: {n_agents} agents, {episodes} episodes, {variant} variant, seed {seed}"
    );

    let layout = IntersectionLayout::default();
    let scenario = Scenario::crossing(&layout, n_agents, goals, seed);
    let config = EnvConfig::default();
    let horizon = config.horizon;
    let base = RoadIntersectionEnv::new(layout, config, scenario);
    let mut env = SplineEnv::new(base, build_controller(), strategy);

    let action_space = env.action_space();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut metrics = EpisodeMetrics::new(100);

    for episode in 0..episodes {
        let mut obs = env.reset();
        loop {
            let actions: HashMap<String, usize> = obs
                .keys()
                .map(|id| (id.clone(), action_space.sample(&mut rng)))
                .collect();
            let result = env.step(&actions);
            if result.done {
                let mean_return = result.rewards.values().sum::<f32>()
                    / result.rewards.len().max(1) as f32;
                let completed = result.info.inner_ticks < horizon;
                metrics.record_episode(mean_return, result.info.inner_ticks, completed);
                tracing::info!(
                    "episode {episode}: {} inner ticks, mean return {mean_return:.3}",
                    result.info.inner_ticks
                );
                break;
            }
            obs = result.observations.unwrap_or_default();
        }
    }

    metrics.log_summary();
}
