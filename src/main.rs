//! Ceteris - Main Entry Point
//!
//! Computes what-if profiles from the command line.

use ceteris::cli::{cmd_info, cmd_profile, Cli, Commands, ProfileArgs};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ceteris=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Profile {
            data,
            model,
            target,
            label,
            observations,
            sample,
            seed,
            variables,
            grid_points,
            strategy,
            threads,
            aggregate,
            group_by,
            hide_profiles,
            output,
            config,
        } => {
            cmd_profile(ProfileArgs {
                data,
                model,
                target,
                label,
                observations,
                sample,
                seed,
                variables,
                grid_points,
                strategy,
                threads,
                aggregate,
                group_by,
                hide_profiles,
                output,
                config,
            })?;
        }
        Commands::Info { data } => {
            cmd_info(&data)?;
        }
    }

    Ok(())
}
