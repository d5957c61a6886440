use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::broadcast;

use rcpad::config::path::{get_devices_paths, get_multidir_sorted_files};
use rcpad::config::DeviceRulesConfig;
use rcpad::manager::Manager;
use rcpad::rules::RuleSet;

/// Name of the bundled rules file; already compiled in, so it is skipped
/// when loading rule documents from the filesystem.
const BUILTIN_RULES_FILE: &str = "supported_devices.json";

#[derive(Parser)]
#[command(name = "rcpad", author, version, about, long_about = None)]
struct Args {
    /// Path to an extra device rules document. Its rules take priority
    /// over the built-in ones.
    #[arg(short, long)]
    devices: Option<PathBuf>,
    /// Seconds to wait between scans while no supported device is connected
    #[arg(long, default_value_t = 2)]
    scan_interval: u64,
    /// Print decoded channel values to stdout
    #[arg(long)]
    print_channels: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let log_level = match env::var("LOG_LEVEL") {
        Ok(value) => value,
        Err(_) => "info".to_string(),
    };
    env::set_var("RUST_LOG", log_level);
    env_logger::init();
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    log::info!("Starting rcpad v{}", VERSION);

    let args = Args::parse();

    // Setup CTRL+C handler
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.unwrap();
        log::info!("Shutting down");
        process::exit(0);
    });

    let rules = load_rules(args.devices.as_ref())?;
    log::debug!("Loaded {} device rules", rules.len());

    let mut manager = Manager::new(
        Arc::new(rules),
        Duration::from_secs(args.scan_interval.max(1)),
    );

    // Forward decoded channel arrays to the log or stdout
    let mut channels_rx = manager.subscribe();
    let print_channels = args.print_channels;
    tokio::spawn(async move {
        loop {
            match channels_rx.recv().await {
                Ok(channels) => {
                    if print_channels {
                        println!("{channels:?}");
                    } else {
                        log::trace!("Decoded channels: {channels:?}");
                    }
                }
                // Skipping stale snapshots is fine; only the newest matters
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    manager.run().await?;

    log::info!("rcpad stopped");

    Ok(())
}

/// Builds the rule set: bundled rules first, then drop-in documents from
/// the config directories, then the document given on the command line.
/// Later sources are prepended so they override earlier ones.
fn load_rules(extra: Option<&PathBuf>) -> Result<RuleSet, Box<dyn Error + Send + Sync>> {
    let mut rules = RuleSet::with_builtins()?;

    let paths = get_devices_paths();
    let files = get_multidir_sorted_files(paths.as_slice(), |entry| {
        let path = entry.path();
        let supported = path
            .extension()
            .map(|ext| ext == "json" || ext == "yaml" || ext == "yml")
            .unwrap_or(false);
        supported && entry.file_name().to_string_lossy() != BUILTIN_RULES_FILE
    });
    for file in files {
        let config = match DeviceRulesConfig::from_file(&file) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to parse device rules from {}: {e}", file.display());
                continue;
            }
        };
        match rules.extend_from_config(&config, true) {
            Ok(count) => {
                log::info!("Loaded {count} device rules from {}", file.display());
            }
            Err(e) => {
                log::warn!("Failed to load device rules from {}: {e}", file.display());
            }
        }
    }

    // Rules given on the command line beat everything else; a broken
    // document here is a startup error rather than a warning
    if let Some(path) = extra {
        let config = DeviceRulesConfig::from_file(path)?;
        let count = rules.extend_from_config(&config, true)?;
        log::info!("Loaded {count} custom device rules from {}", path.display());
    }

    Ok(rules)
}
