use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::SeedConfig;
use crate::data::CatalogKind;
use crate::import::{
    BroadcastVariant, CatalogSelection, ImportRequest, Importer, RunSummary, TracingSink,
};
use crate::store::JsonStore;

/// Exit code of a refused or failed catalog step.
pub const STEP_FAILED: i32 = -1;
pub const USAGE_ERROR: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RepoArg {
    Tag,
    Broadcast,
    Role,
    Permissionprofile,
    All,
}

impl RepoArg {
    pub fn selection(&self) -> CatalogSelection {
        match self {
            Self::Tag => CatalogSelection::One(CatalogKind::Tag),
            Self::Broadcast => CatalogSelection::One(CatalogKind::Broadcast),
            Self::Role => CatalogSelection::One(CatalogKind::Role),
            Self::Permissionprofile => CatalogSelection::One(CatalogKind::PermissionProfile),
            Self::All => CatalogSelection::All,
        }
    }
}

/// Load reference data fixtures into the store. Existing records of each loaded catalog are
/// removed first.
#[derive(Debug, Parser)]
#[command(name = "seedbank", version)]
pub struct Cli {
    /// Catalog to initialise
    #[arg(value_enum)]
    pub repo: RepoArg,

    /// Input CSV path; the catalog's default directory is scanned when omitted
    pub file: Option<PathBuf>,

    /// Broadcast file variant to pick from the default directory
    #[arg(short = 'o', long = "option", value_enum, default_value_t = BroadcastVariant::Default)]
    pub option: BroadcastVariant,

    /// Actually run; without it nothing is written
    #[arg(long)]
    pub force: bool,

    /// YAML configuration file
    #[arg(long, env = "SEEDBANK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root of the default input directories
    #[arg(long, env = "SEEDBANK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Store directory
    #[arg(long, env = "SEEDBANK_STORE")]
    pub store: Option<PathBuf>,

    /// Print the catalog reports as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run_with_args(args: &[String]) -> i32 {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return err.exit_code();
        }
    };

    if !cli.force {
        print_force_warning();
        return STEP_FAILED;
    }
    if cli.repo == RepoArg::All && cli.file.is_some() {
        eprintln!("usage: an input file can only be given for a single catalog, not 'all'");
        eprintln!(
            "run each catalog separately instead: seedbank <tag|broadcast|role|permissionprofile> <FILE> --force"
        );
        return USAGE_ERROR;
    }

    let config = match SeedConfig::load(cli.config.as_deref()) {
        Ok(config) => config
            .with_data_dir(cli.data_dir.clone())
            .with_store_dir(cli.store.clone()),
        Err(err) => {
            eprintln!("{err}");
            return STEP_FAILED;
        }
    };

    let mut store = match JsonStore::open(&config.store_dir) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("failed to open store '{}': {err}", config.store_dir.display());
            return STEP_FAILED;
        }
    };

    let request = ImportRequest {
        file: cli.file.clone(),
        broadcast_variant: cli.option,
    };
    let mut sink = TracingSink;
    let summary =
        Importer::new(&config, &mut store, &mut sink).run(cli.repo.selection(), &request);

    print_summary(&summary, &config, cli.json)
}

fn print_force_warning() {
    eprintln!("ATTENTION: This operation should not be executed in a production environment.");
    eprintln!();
    eprintln!("Would drop the selected catalogs");
    eprintln!("Please run the operation with --force to execute and with <repo> to choose the catalog to initialize.");
    eprintln!("All data will be lost!");
}

fn print_summary(summary: &RunSummary, config: &SeedConfig, as_json: bool) -> i32 {
    if as_json {
        match serde_json::to_string_pretty(&summary.completed) {
            Ok(payload) => println!("{payload}"),
            Err(err) => {
                eprintln!("failed to serialize import reports: {err}");
                return STEP_FAILED;
            }
        }
    } else {
        for report in &summary.completed {
            println!(
                "{} import complete: records={}, skipped={}, store='{}'",
                report.kind,
                report.persisted,
                report.skipped_rows(),
                config.store_dir.display()
            );
        }
    }

    match &summary.failure {
        Some(failure) => {
            eprintln!("{} import failed: {}", failure.kind, failure.error);
            STEP_FAILED
        }
        None => 0,
    }
}
