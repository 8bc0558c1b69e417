//! placelink command line.
//!
//! Thin wrapper over the library: every command prints JSON on stdout and
//! logs to stderr (`RUST_LOG=info` for stage-by-stage output).
//!
//! ```bash
//! placelink resolve "Hoxton Amsterdam"
//! placelink near "Central Station" --lat 52.3728 --lng 4.8936
//! placelink link "Hoxton Amsterdam" "Dam Square" --priority 1
//! placelink pickups "Hoxton Amsterdam" --top 3
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use placelink::config::{db_path, load_config, load_config_from};
use placelink::{
    Collection, Config, Coordinates, NominatimProvider, PlaceDb, PlaceEngine, PlaceProvider,
    PlaceRef,
};

#[derive(Parser)]
#[command(name = "placelink")]
#[command(version)]
#[command(about = "Resolve lodging and meeting-point names to canonical places and manage pickup links")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.placelink/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Knowledge store path, overriding the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a free-text place description
    Resolve {
        query: String,
        /// lodging or meetingPoint
        #[arg(short, long, default_value = "lodging")]
        collection: Collection,
        /// Only consult the local store
        #[arg(long)]
        local: bool,
    },

    /// Resolve using distance to a reference point to break ties
    Near {
        query: String,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        #[arg(short, long, default_value = "meetingPoint")]
        collection: Collection,
    },

    /// Link a lodging to a meeting point (resolving both)
    Link {
        lodging: String,
        meeting_point: String,
        /// Lower is preferred
        #[arg(short, long, default_value_t = 1)]
        priority: i64,
        #[arg(short, long, default_value = "")]
        notes: String,
        /// Fail instead of asking the provider for unknown places
        #[arg(long)]
        no_create: bool,
    },

    /// Meeting points linked to a lodging (name or id)
    Pickups {
        lodging: String,
        #[arg(long)]
        top: Option<usize>,
    },

    /// Lodgings linked to a meeting point (name or id)
    Lodgings { meeting_point: String },

    /// Remove a link
    Unlink {
        lodging: String,
        meeting_point: String,
    },

    /// Merge a legacy hotels.db / pickup_location.db pair into the store
    ImportLegacy {
        #[arg(long)]
        hotels: PathBuf,
        #[arg(long)]
        pickups: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config = match &cli.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    }
    .map_err(|e| e.to_string())?;

    let path = match cli.db {
        Some(path) => path,
        None => db_path(&config).map_err(|e| e.to_string())?,
    };
    let db = PlaceDb::open_at(path).map_err(|e| e.to_string())?;

    if let Commands::ImportLegacy { hotels, pickups } = &cli.command {
        let report = db.import_legacy(hotels, pickups).map_err(|e| e.to_string())?;
        return print_json(&report);
    }

    let mut provider = NominatimProvider::new(&config.provider, &config.city);
    provider.open().map_err(|e| e.to_string())?;
    let result = dispatch(cli.command, db, &mut provider, &config);
    provider.close();
    result
}

fn dispatch(
    command: Commands,
    db: PlaceDb,
    provider: &mut NominatimProvider,
    config: &Config,
) -> Result<(), String> {
    let mut engine = PlaceEngine::new(db, provider, config).map_err(|e| e.to_string())?;

    match command {
        Commands::Resolve {
            query,
            collection,
            local,
        } => {
            let record = if local {
                engine.find_local(&query, collection)
            } else {
                engine.resolve(&query, collection)
            }
            .map_err(|e| e.to_string())?;
            print_json(&record)
        }
        Commands::Near {
            query,
            lat,
            lng,
            collection,
        } => {
            let record = engine
                .resolve_near(&query, Coordinates::new(lat, lng), collection)
                .map_err(|e| e.to_string())?;
            print_json(&record)
        }
        Commands::Link {
            lodging,
            meeting_point,
            priority,
            notes,
            no_create,
        } => {
            let result = engine
                .link(&lodging, &meeting_point, priority, &notes, !no_create)
                .map_err(|e| e.to_string())?;
            print_json(&result)
        }
        Commands::Pickups { lodging, top } => {
            let places = engine
                .pickups_for(place_ref(&lodging), top)
                .map_err(|e| e.to_string())?;
            print_json(&places)
        }
        Commands::Lodgings { meeting_point } => {
            let places = engine
                .lodgings_for(place_ref(&meeting_point))
                .map_err(|e| e.to_string())?;
            print_json(&places)
        }
        Commands::Unlink {
            lodging,
            meeting_point,
        } => {
            let removed = engine
                .unlink(place_ref(&lodging), place_ref(&meeting_point))
                .map_err(|e| e.to_string())?;
            print_json(&serde_json::json!({ "removed": removed }))
        }
        Commands::ImportLegacy { .. } => Ok(()),
    }
}

/// A bare integer is a store id; anything else is a query.
fn place_ref(arg: &str) -> PlaceRef {
    match arg.trim().parse::<i64>() {
        Ok(id) => PlaceRef::Id(id),
        Err(_) => PlaceRef::Query(arg.to_string()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let out = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", out);
    Ok(())
}
