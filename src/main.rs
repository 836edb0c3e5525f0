//! NAADSM Event Decoder

use clap::Parser;
use naadsm_events::{Config, Result, VERSION, cli, init_logging};

fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let config = if let Some(config_path) = &args.config {
        Config::from_file(config_path)?
    } else {
        Config::load()?
    };

    init_logging(args.log_level.as_deref().unwrap_or(&config.logging.level));

    tracing::info!("NAADSM Event Decoder v{}", VERSION);
    tracing::debug!("Parsed arguments: {:?}", args);
    tracing::debug!("Loaded configuration: {:?}", config);

    cli::execute(args, config)?;

    Ok(())
}
