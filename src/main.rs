mod cli;

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use mc_codec::ToolRegistry;
use mc_core::config::Config;

fn load_config(path: Option<&Path>) -> Config {
    let mut config = Config::load_or_default(path);
    config.apply_env();
    config
}

fn debug_requested(verbose: bool) -> bool {
    verbose
        || std::env::var("DEBUG")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise --verbose or DEBUG=true selects debug.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if debug_requested(cli.verbose) {
            "medcord=debug,mc_=debug,tower_http=debug".to_string()
        } else {
            "medcord=info,mc_=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = load_config(cli.config.as_deref());
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            tracing::info!("Starting medcord {}", env!("CARGO_PKG_VERSION"));
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(mc_server::start(config))?;
            Ok(())
        }
        Commands::CheckConfig => check_config(cli.config.as_deref()),
        Commands::Tools => list_tools(cli.config.as_deref()),
    }
}

fn check_config(path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        let contents = std::fs::read_to_string(path)?;
        Config::from_json(&contents)?;
        println!("Config file {} parsed", path.display());
    }

    let config = load_config(path);
    let warnings = config.validate();
    println!("Listen:   {}:{}", config.server.host, config.server.port);
    println!("Database: {}", config.server.db_path.display());
    println!("Images:   {}", config.storage.image_dir().display());
    println!("Videos:   {}", config.storage.video_dir().display());
    println!("Temp:     {}", config.storage.temp_dir().display());
    println!(
        "Workers:  {} image, {} video",
        config.processing.image_workers, config.processing.video_workers
    );

    if warnings.is_empty() {
        println!("\nNo warnings.");
    } else {
        println!("\nWarnings:");
        for warning in warnings {
            println!("  - {warning}");
        }
    }
    Ok(())
}

fn list_tools(path: Option<&Path>) -> Result<()> {
    let config = load_config(path);
    let registry = ToolRegistry::discover(&config.tools);
    let infos = registry.check_all();
    println!("{}", serde_json::to_string_pretty(&infos)?);

    if infos.iter().any(|t| !t.available) {
        anyhow::bail!("some required tools are missing");
    }
    Ok(())
}
