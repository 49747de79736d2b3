//! Contingency bot CLI
//!
//! Usage:
//!   contingency auth       - Obtain and cache Google Drive credentials
//!   contingency download   - Download the contingency base from Drive
//!   contingency transform  - Mask and sort the extract into the bot sample
//!   contingency upload     - Upload the sample as a new Drive file
//!   contingency overwrite  - Replace an existing Drive file
//!   contingency lookup     - Show a customer's obligations

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{commands, Cli, Commands, ConfigCommands};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("contingency={}", log_level).parse()?)
                .add_directive(format!("contingency_core={}", log_level).parse()?),
        )
        .with_target(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config_path = commands::config_path(cli.config);

    // init must work even when the current file is invalid
    if let Commands::Config(ConfigCommands::Init { force }) = cli.command {
        return commands::config_init(&config_path, force);
    }

    let config = commands::load_config(&config_path)?;

    match cli.command {
        Commands::Auth => commands::auth(&config),
        Commands::Download {
            file_id,
            destination,
        } => commands::download(&config, file_id, destination),
        Commands::Upload {
            local_path,
            name,
            parent,
            shared_drive,
        } => commands::upload(&config, local_path, name, parent, shared_drive),
        Commands::Overwrite {
            local_path,
            file_id,
        } => commands::overwrite(&config, local_path, file_id),
        Commands::Transform { input, output } => commands::transform(&config, input, output),
        Commands::Lookup { id, file } => commands::lookup(&config, &id, file),
        Commands::Suggest {
            fragment,
            limit,
            file,
        } => commands::suggest(&config, &fragment, limit, file),
        Commands::Config(ConfigCommands::Show) => commands::config_show(&config, &config_path),
        Commands::Config(ConfigCommands::Init { .. }) => Ok(()),
    }
}
