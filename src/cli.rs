//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::{self, CsvPriceHistory};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::band::classify;
use crate::domain::bounds::BoundsSource;
use crate::domain::config_validation::build_engine_config;
use crate::domain::engine::RiskEngine;
use crate::domain::error::RiskError;
use crate::domain::governance::Actor;
use crate::domain::occupancy::tally_occupancy;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_history_port::PriceHistoryPort;

#[derive(Parser, Debug)]
#[command(name = "riskmetric", about = "Logarithmic risk metric engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the schema and seed bounds from [seed] bounds_csv
    Init {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Risk, band, zone and signal for a price
    Risk {
        #[arg(long)]
        asset: String,
        #[arg(long)]
        price: f64,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Rarity-weighted risk for a price
    Weighted {
        #[arg(long)]
        asset: String,
        #[arg(long)]
        price: f64,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print or export the risk grid
    Grid {
        #[arg(long)]
        asset: String,
        #[arg(long)]
        steps: Option<usize>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Classify a raw risk value
    Classify {
        #[arg(long)]
        risk: f64,
    },
    /// Write bounds for an asset
    SetBounds {
        #[arg(long)]
        asset: String,
        #[arg(long)]
        min: f64,
        #[arg(long)]
        max: f64,
        #[arg(long, default_value = "fixed")]
        source: BoundsSource,
        #[arg(long, default_value = "cli")]
        actor: String,
        #[arg(long)]
        admin: bool,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Derive bounds from the reference asset by ratio
    DeriveBounds {
        #[arg(long)]
        asset: String,
        #[arg(long)]
        ratio_bottom: f64,
        #[arg(long)]
        ratio_top: f64,
        #[arg(long, default_value = "cli")]
        actor: String,
        #[arg(long)]
        admin: bool,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Regenerate and store the grid for an asset
    RecomputeGrid {
        #[arg(long)]
        asset: String,
        #[arg(long, default_value = "cli")]
        actor: String,
        #[arg(long)]
        admin: bool,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Replace occupancy profiles from a CSV file
    IngestOccupancy {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Build an occupancy profile from daily closes and store it
    Tally {
        #[arg(long)]
        asset: String,
        #[arg(long)]
        history_dir: PathBuf,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show rarity coefficients and the lifetime score
    Coefficients {
        #[arg(long)]
        asset: String,
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Logs go to stderr; `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,riskmetric=info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Init { config } => run_init(&config),
        Command::Risk {
            asset,
            price,
            config,
        } => run_risk(&asset, price, &config),
        Command::Weighted {
            asset,
            price,
            config,
        } => run_weighted(&asset, price, &config),
        Command::Grid {
            asset,
            steps,
            output,
            config,
        } => run_grid(&asset, steps, output.as_deref(), &config),
        Command::Classify { risk } => run_classify(risk),
        Command::SetBounds {
            asset,
            min,
            max,
            source,
            actor,
            admin,
            config,
        } => open_engine(&config).and_then(|engine| {
            let b = engine.set_bounds(&asset, min, max, source, &make_actor(&actor, admin))?;
            println!(
                "{}: {} .. {} ({})",
                b.asset_id, b.min_price, b.max_price, b.source
            );
            Ok(())
        }),
        Command::DeriveBounds {
            asset,
            ratio_bottom,
            ratio_top,
            actor,
            admin,
            config,
        } => open_engine(&config).and_then(|engine| {
            let b = engine.derive_bounds(
                &asset,
                ratio_bottom,
                ratio_top,
                &make_actor(&actor, admin),
            )?;
            println!(
                "{}: {} .. {} ({})",
                b.asset_id, b.min_price, b.max_price, b.source
            );
            Ok(())
        }),
        Command::RecomputeGrid {
            asset,
            actor,
            admin,
            config,
        } => open_engine(&config).and_then(|engine| {
            let grid = engine.recompute_grid(&asset, &make_actor(&actor, admin))?;
            println!("{}: {} grid points", grid.asset_id, grid.len());
            Ok(())
        }),
        Command::IngestOccupancy { file, config } => run_ingest(&file, &config),
        Command::Tally {
            asset,
            history_dir,
            config,
        } => run_tally(&asset, &history_dir, &config),
        Command::Coefficients { asset, config } => run_coefficients(&asset, &config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn make_actor(name: &str, admin: bool) -> Actor {
    if admin {
        Actor::admin(name)
    } else {
        Actor::writer(name)
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, RiskError> {
    FileConfigAdapter::from_file(path)
}

/// Engine backed by the SQLite store named in `[sqlite] path`.
pub fn open_engine(config_path: &Path) -> Result<RiskEngine, RiskError> {
    let config = load_config(config_path)?;
    open_engine_with(&config)
}

#[cfg(feature = "sqlite")]
pub fn open_engine_with(config: &dyn ConfigPort) -> Result<RiskEngine, RiskError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;
    use std::sync::Arc;

    let engine_config = build_engine_config(config)?;
    let store = Arc::new(SqliteAdapter::from_config(config)?);
    store.initialize_schema()?;
    Ok(RiskEngine::new(store.clone(), store, &engine_config))
}

#[cfg(not(feature = "sqlite"))]
pub fn open_engine_with(config: &dyn ConfigPort) -> Result<RiskEngine, RiskError> {
    let _ = build_engine_config(config)?;
    Err(RiskError::Database {
        reason: "sqlite feature is required for persistent storage".into(),
    })
}

fn run_init(config_path: &Path) -> Result<(), RiskError> {
    let config = load_config(config_path)?;
    let engine = open_engine_with(&config)?;
    eprintln!("Schema ready");

    let Some(seed_path) = config.get_string("seed", "bounds_csv") else {
        eprintln!("No [seed] bounds_csv configured; nothing to seed");
        return Ok(());
    };

    let seeds = csv_adapter::read_bounds_seed(Path::new(&seed_path))?;
    let actor = Actor::admin("init");
    for b in &seeds {
        engine.set_bounds(&b.asset_id, b.min_price, b.max_price, b.source, &actor)?;
        println!("{}: {} .. {} ({})", b.asset_id, b.min_price, b.max_price, b.source);
    }
    eprintln!("{} assets seeded", seeds.len());
    Ok(())
}

fn run_risk(asset: &str, price: f64, config_path: &Path) -> Result<(), RiskError> {
    let engine = open_engine(config_path)?;
    let r = engine.get_risk(asset, price)?;
    println!("asset:  {}", r.asset_id);
    println!("price:  {}", r.price);
    println!("risk:   {:.4}", r.risk);
    println!("band:   {}", r.band.label());
    println!("zone:   {}", r.zone);
    println!("signal: {}", r.signal);
    Ok(())
}

fn run_weighted(asset: &str, price: f64, config_path: &Path) -> Result<(), RiskError> {
    let engine = open_engine(config_path)?;
    let w = engine.get_weighted_risk(asset, price)?;
    println!("raw_risk:      {:.4}", w.raw_risk);
    println!("coefficient:   {:.2}", w.coefficient);
    println!("adjusted_risk: {:.4}", w.adjusted_risk);
    println!("band:          {}", w.band.label());
    Ok(())
}

fn run_grid(
    asset: &str,
    steps: Option<usize>,
    output: Option<&Path>,
    config_path: &Path,
) -> Result<(), RiskError> {
    let engine = open_engine(config_path)?;
    let points = match steps {
        Some(n) => engine.get_grid_with_steps(asset, n)?,
        None => engine.get_grid(asset)?,
    };

    match output {
        Some(path) => {
            csv_adapter::write_grid(path, &points)?;
            eprintln!("{} grid points written to {}", points.len(), path.display());
        }
        None => {
            for p in &points {
                println!("{:.3}\t{:.2}", p.risk, p.price);
            }
        }
    }
    Ok(())
}

fn run_classify(risk: f64) -> Result<(), RiskError> {
    let c = classify(risk)?;
    println!("{}\t{}\t{}", c.band_label(), c.zone, c.signal);
    Ok(())
}

fn run_ingest(file: &Path, config_path: &Path) -> Result<(), RiskError> {
    let engine = open_engine(config_path)?;
    let profiles = csv_adapter::read_occupancy(file)?;
    for profile in &profiles {
        engine.store_profile(profile)?;
        println!(
            "{}: {} of {} days classified",
            profile.asset_id,
            profile.classified_days(),
            profile.total_days
        );
    }
    eprintln!("{} profiles ingested", profiles.len());
    Ok(())
}

fn run_tally(asset: &str, history_dir: &Path, config_path: &Path) -> Result<(), RiskError> {
    let engine = open_engine(config_path)?;
    let bounds = engine.get_bounds(asset)?;
    let history = CsvPriceHistory::new(history_dir.to_path_buf());
    let closes: Vec<f64> = history
        .fetch_closes(asset)?
        .into_iter()
        .map(|c| c.close)
        .collect();

    let profile = tally_occupancy(&bounds, &closes)?;
    engine.store_profile(&profile)?;
    for (band, days) in profile.occupied_bands() {
        println!("{}\t{}", band.label(), days);
    }
    eprintln!(
        "{}: {} of {} days classified",
        profile.asset_id,
        profile.classified_days(),
        profile.total_days
    );
    Ok(())
}

fn run_coefficients(asset: &str, config_path: &Path) -> Result<(), RiskError> {
    let engine = open_engine(config_path)?;
    let coefficients = engine.band_coefficients(asset)?;
    if coefficients.coefficients.is_empty() {
        eprintln!("{}: no occupancy profile; all bands weigh 1.00", coefficients.asset_id);
    }
    for (band, c) in &coefficients.coefficients {
        println!("{}\t{:.2}", band.label(), c);
    }
    if let Some(score) = engine.lifetime_score(asset)? {
        println!("lifetime_score\t{:.4}", score);
    }
    Ok(())
}
