use clap::Parser;
use package_tracker::utils::{logger, validation::{validate_tracking_number, Validate}};
use package_tracker::{
    CliConfig, Command, PackageApiClient, SqliteStore, TrackerConfig, TrackerError,
    TrackingOrchestrator, WeatherApiClient,
};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let config = match TrackerConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    logger::init_logger(config.logging.level(), cli.verbose, config.logging.json());
    tracing::info!("Starting package-tracker");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    if let Some(number) = cli.command.tracking_number() {
        if let Err(e) = validate_tracking_number(number) {
            eprintln!("❌ {}", e);
            std::process::exit(e.exit_code());
        }
    }

    if let Err(e) = run(&cli.command, &config).await {
        tracing::error!("❌ {} (Severity: {:?})", e, e.severity());
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }
}

async fn run(command: &Command, config: &TrackerConfig) -> Result<(), TrackerError> {
    let store = SqliteStore::open(config.storage.database_path())?;
    let tracker = TrackingOrchestrator::new(
        PackageApiClient::new(&config.package_source)?,
        WeatherApiClient::new(&config.weather)?,
        store.clone(),
        store,
        config.statistics.policy(),
        config.weather.rule(),
    );

    match command {
        Command::Track { tracking_number } => {
            let details = tracker.track_package(tracking_number).await?;
            println!("{}", details);
        }
        Command::Details { tracking_number } => {
            let stored = tracker.stored_details(tracking_number).await?;
            println!("{}", serde_json::to_string_pretty(&stored)?);
        }
        Command::Stats {
            origin,
            destination,
        } => {
            let statistics = tracker.route_statistics(origin, destination).await?;
            if statistics.is_empty() {
                println!("No statistics available for {} -> {}.", origin, destination);
            }
            for stat in statistics {
                println!(
                    "{:<12} {:>6.2} days over {:>4} shipments (updated {})",
                    stat.key.carrier,
                    stat.average_days,
                    stat.shipment_count,
                    stat.last_updated.format("%Y-%m-%d %H:%M")
                );
            }
        }
    }

    Ok(())
}
