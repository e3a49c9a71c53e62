//! CLI integration tests.
//!
//! Tests cover:
//! - Argument parsing for each subcommand
//! - `init` seeding from a bounds CSV into a SQLite file
//! - Governance through the CLI actor flags
//! - Occupancy ingestion and tally from CSV files
//! - Grid export

#![cfg(feature = "sqlite")]

mod common;

use clap::Parser;
use common::*;
use riskmetric::cli::{self, Cli, Command};
use riskmetric::domain::bounds::BoundsSource;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tempfile::TempDir;

fn is_success(code: ExitCode) -> bool {
    // ExitCode has no PartialEq; compare through Debug.
    format!("{:?}", code) == format!("{:?}", ExitCode::SUCCESS)
}

fn run_args(args: &[&str]) -> ExitCode {
    cli::run(Cli::try_parse_from(args).unwrap())
}

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let seed = dir.path().join("bounds.csv");
        fs::write(
            &seed,
            "asset_id,min_price,max_price,source\nBTC,30000,299720,fixed\nETH,1500,11988.8,derived\n",
        )
        .unwrap();
        let config = dir.path().join("riskmetric.ini");
        fs::write(
            &config,
            format!(
                "[engine]\nreference_asset = BTC\ngrid_steps = 41\n\n[sqlite]\npath = {}\n\n[seed]\nbounds_csv = {}\n",
                dir.path().join("risk.db").display(),
                seed.display()
            ),
        )
        .unwrap();
        Self { dir, config }
    }

    fn config(&self) -> &str {
        self.config.to_str().unwrap()
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn init(&self) {
        assert!(is_success(run_args(&["riskmetric", "init", "-c", self.config()])));
    }
}

mod parsing {
    use super::*;

    #[test]
    fn parses_set_bounds_with_defaults() {
        let cli = Cli::try_parse_from([
            "riskmetric", "set-bounds", "--asset", "ETH", "--min", "100", "--max", "5000", "-c",
            "x.ini",
        ])
        .unwrap();
        match cli.command {
            Command::SetBounds {
                asset,
                source,
                actor,
                admin,
                ..
            } => {
                assert_eq!(asset, "ETH");
                assert_eq!(source, BoundsSource::Fixed);
                assert_eq!(actor, "cli");
                assert!(!admin);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_derived_source() {
        let cli = Cli::try_parse_from([
            "riskmetric", "set-bounds", "--asset", "ETH", "--min", "100", "--max", "5000",
            "--source", "derived", "--admin", "-c", "x.ini",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::SetBounds {
                source: BoundsSource::Derived,
                admin: true,
                ..
            }
        ));
    }

    #[test]
    fn rejects_unknown_source() {
        assert!(Cli::try_parse_from([
            "riskmetric", "set-bounds", "--asset", "ETH", "--min", "1", "--max", "2", "--source",
            "guess", "-c", "x.ini",
        ])
        .is_err());
    }

    #[test]
    fn classify_needs_no_config() {
        assert!(is_success(run_args(&["riskmetric", "classify", "--risk", "0.475"])));
        assert!(!is_success(run_args(&["riskmetric", "classify", "--risk", "1.5"])));
    }
}

mod commands {
    use super::*;

    #[test]
    fn init_seeds_bounds() {
        let ws = Workspace::new();
        ws.init();

        let engine = cli::open_engine(Path::new(ws.config())).unwrap();
        assert_eq!(engine.list_assets().unwrap(), vec!["BTC", "ETH"]);
        assert_eq!(engine.get_bounds("ETH").unwrap().source, BoundsSource::Derived);
        assert!(is_success(run_args(&[
            "riskmetric", "risk", "--asset", "btc", "--price", "95509", "-c", ws.config(),
        ])));
    }

    #[test]
    fn unknown_asset_fails() {
        let ws = Workspace::new();
        ws.init();
        assert!(!is_success(run_args(&[
            "riskmetric", "risk", "--asset", "DOGE", "--price", "1", "-c", ws.config(),
        ])));
    }

    #[test]
    fn reference_write_requires_admin_flag() {
        let ws = Workspace::new();
        ws.init();

        let refused = run_args(&[
            "riskmetric", "set-bounds", "--asset", "BTC", "--min", "1", "--max", "2", "-c",
            ws.config(),
        ]);
        assert!(!is_success(refused));
        let engine = cli::open_engine(Path::new(ws.config())).unwrap();
        assert_eq!(engine.get_bounds("BTC").unwrap().min_price, 30_000.0);

        assert!(is_success(run_args(&[
            "riskmetric", "set-bounds", "--asset", "BTC", "--min", "20000", "--max", "300000",
            "--admin", "-c", ws.config(),
        ])));
        let engine = cli::open_engine(Path::new(ws.config())).unwrap();
        assert_eq!(engine.get_bounds("BTC").unwrap().min_price, 20_000.0);
    }

    #[test]
    fn derive_and_recompute() {
        let ws = Workspace::new();
        ws.init();
        assert!(is_success(run_args(&[
            "riskmetric", "derive-bounds", "--asset", "SOL", "--ratio-bottom", "0.0003",
            "--ratio-top", "0.001", "-c", ws.config(),
        ])));
        assert!(is_success(run_args(&[
            "riskmetric", "recompute-grid", "--asset", "SOL", "-c", ws.config(),
        ])));
        assert!(!is_success(run_args(&[
            "riskmetric", "recompute-grid", "--asset", "BTC", "-c", ws.config(),
        ])));
    }

    #[test]
    fn ingest_occupancy_then_weighted() {
        let ws = Workspace::new();
        ws.init();
        let occupancy = write_temp(
            "asset_id,total_days,band_label,days\nBTC,730,band_0_10,50\nBTC,730,band_50_60,400\n",
        );
        assert!(is_success(run_args(&[
            "riskmetric",
            "ingest-occupancy",
            "-f",
            occupancy.path().to_str().unwrap(),
            "-c",
            ws.config(),
        ])));

        let engine = cli::open_engine(Path::new(ws.config())).unwrap();
        let w = engine.get_weighted_risk("BTC", 31_000.0).unwrap();
        assert_eq!(w.coefficient, 1.60);
        assert!(is_success(run_args(&[
            "riskmetric", "coefficients", "--asset", "BTC", "-c", ws.config(),
        ])));
    }

    #[test]
    fn tally_from_price_history() {
        let ws = Workspace::new();
        ws.init();
        let history = ws.path("history");
        fs::create_dir(&history).unwrap();
        fs::write(
            history.join("BTC.csv"),
            "date,close\n2024-01-01,31000\n2024-01-02,32000\n2024-01-03,95509\n",
        )
        .unwrap();

        assert!(is_success(run_args(&[
            "riskmetric",
            "tally",
            "--asset",
            "BTC",
            "--history-dir",
            history.to_str().unwrap(),
            "-c",
            ws.config(),
        ])));

        let engine = cli::open_engine(Path::new(ws.config())).unwrap();
        let profile = engine.occupancy_profile("BTC").unwrap().unwrap();
        assert_eq!(profile.total_days, 3);
        assert_eq!(profile.days_in("band_0_10".parse().unwrap()), 2);
        assert_eq!(profile.days_in("band_50_60".parse().unwrap()), 1);
    }

    #[test]
    fn grid_export_to_csv() {
        let ws = Workspace::new();
        ws.init();
        let out = ws.path("grid.csv");
        assert!(is_success(run_args(&[
            "riskmetric",
            "grid",
            "--asset",
            "BTC",
            "-o",
            out.to_str().unwrap(),
            "-c",
            ws.config(),
        ])));
        let content = fs::read_to_string(&out).unwrap();
        // header + 41 points
        assert_eq!(content.lines().count(), 42);
        assert!(content.lines().nth(1).unwrap().starts_with("BTC,0.000,30000"));
    }
}
