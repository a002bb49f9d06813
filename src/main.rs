//! mmo-shaping CLI
//!
//! Resolves run configurations and drives shaped rollouts on the synthetic
//! realm.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mmo_shaping::config::{EnvConfig, RunArgs};
use mmo_shaping::shaping::PostprocessorFactory;
use mmo_shaping::synthetic::{RolloutReport, SyntheticRealm};

#[derive(Parser)]
#[command(name = "mmo-shaping")]
#[command(version, about = "Reward shaping for multi-agent survival environments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the simulation and shaping configuration for a set of arguments
    Config {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Run shaped episodes on the synthetic realm with a random policy
    Rollout {
        #[command(flatten)]
        run: RunArgs,

        /// Number of episodes
        #[arg(long, default_value = "1")]
        episodes: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { run } => {
            let (env, factory) = resolve(&run)?;
            println!("{:#?}", env);
            println!("{:#?}", factory.shaping());
        }
        Commands::Rollout { run, episodes } => {
            let (env, factory) = resolve(&run)?;
            let mut realm = SyntheticRealm::new(&env, run.seed);
            info!(
                agents = env.player_n,
                map_size = env.map_size(),
                horizon = env.horizon,
                episodes,
                "starting rollout"
            );
            let report = RolloutReport::collect(&mut realm, &factory, episodes, run.seed)
                .context("rollout failed")?;
            println!("{}", report);
        }
    }

    Ok(())
}

fn resolve(run: &RunArgs) -> Result<(EnvConfig, PostprocessorFactory)> {
    let env = EnvConfig::from_args(run).context("invalid run arguments")?;
    let shaping = run.shaping().context("invalid shaping arguments")?;
    info!(
        map_size = env.map_size(),
        players = env.player_n,
        npcs = env.npc_n,
        horizon = env.horizon,
        path_maps = %env.path_maps,
        "resolved environment config"
    );
    for (name, weight) in shaping.weights() {
        info!(term = name, weight, "shaping weight");
    }
    let factory = PostprocessorFactory::new(env.clone(), shaping, run.seed)?;
    Ok((env, factory))
}
