//! Shipyard CLI
//!
//! Entry point for the `shipyard` command-line tool.

use clap::{Args, Parser, Subcommand};
use serde_json::{json, Map, Value};
use shipyard::config::{self, ConfigError, EffectiveConfig, StagerConfig};
use shipyard::logging::{logger_init, LoggerError, LoggerFormat};
use shipyard::staging::ManifestError;
use shipyard::{
    ApplicationFileUploader, ApplicationId, SharedLibraryIndex, ShippedArtifacts, StagingError,
    StagingManifest,
};
use shipyard_storage::{LocalStorage, StorageError, StoragePath};
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;

#[derive(Parser)]
#[command(name = "shipyard")]
#[command(about = "Stage application artifacts into shared storage", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// Path to config file (layered over ~/.config/shipyard/shipyard.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Storage home directory (local path or URI)
    #[arg(long)]
    home_dir: Option<String>,

    /// Shared library directories (comma-separated or repeated)
    #[arg(long = "shared-lib-dir", value_delimiter = ',')]
    shared_lib_dirs: Option<Vec<String>>,

    /// Local directory backing remote paths
    #[arg(long)]
    local_root: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "shipyard=debug,warn"
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (text, json)
    #[arg(long)]
    log_format: Option<LoggerFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage ship files for one application and print its manifest
    Stage {
        #[command(flatten)]
        common: CommonArgs,

        /// Application identifier (default: generated)
        #[arg(long)]
        app_id: Option<String>,

        /// Replication factor of uploaded files
        #[arg(long)]
        replication: Option<u16>,

        /// Logical directory for shipped files
        #[arg(long)]
        resources_dir: Option<String>,

        /// Distribution bundle, staged directly under the application directory
        #[arg(long)]
        dist_bundle: Option<String>,

        /// Write the manifest here instead of stdout
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Files and directories to ship (local paths or URIs)
        ship: Vec<String>,
    },

    /// List the shared-library index
    SharedLibs {
        #[command(flatten)]
        common: CommonArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logger(#[from] LoggerError),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Usage(String),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Stage {
            common,
            app_id,
            replication,
            resources_dir,
            dist_bundle,
            out,
            ship,
        } => {
            let mut overrides = common.overrides();
            if let Some(replication) = replication {
                overrides.insert("replication".to_string(), json!(replication));
            }
            if let Some(dir) = resources_dir {
                overrides.insert("resources_dir".to_string(), json!(dir));
            }
            run_stage(&common, overrides, app_id, dist_bundle, out, ship)
        }
        Commands::SharedLibs { common, json } => {
            let overrides = common.overrides();
            run_shared_libs(&common, overrides, json)
        }
        Commands::Config { common } => {
            let overrides = common.overrides();
            run_config(&common, overrides)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

impl CommonArgs {
    fn overrides(&self) -> Map<String, Value> {
        let mut overrides = Map::new();
        if let Some(home) = &self.home_dir {
            overrides.insert("home_dir".to_string(), json!(home));
        }
        if let Some(dirs) = &self.shared_lib_dirs {
            overrides.insert("shared_lib_dirs".to_string(), json!(dirs));
        }
        if let Some(root) = &self.local_root {
            overrides.insert("local_root".to_string(), json!(root));
        }

        let mut log = Map::new();
        if let Some(level) = &self.log_level {
            log.insert("level".to_string(), json!(level));
        }
        if let Some(format) = self.log_format {
            log.insert("format".to_string(), json!(format));
        }
        if !log.is_empty() {
            overrides.insert("log".to_string(), Value::Object(log));
        }
        overrides
    }

    fn load(&self, overrides: Map<String, Value>) -> Result<EffectiveConfig, ConfigError> {
        let host = config::host_config_path();
        EffectiveConfig::build(
            host.as_deref(),
            self.config.as_deref(),
            Some(Value::Object(overrides)),
        )
    }
}

/// Load config, install logging and open the storage backend.
fn setup(
    common: &CommonArgs,
    overrides: Map<String, Value>,
) -> Result<(StagerConfig, LocalStorage), CliError> {
    let cfg = common.load(overrides)?.stager_config()?;
    logger_init(&cfg.logger_config())?;

    let root = match &cfg.local_root {
        Some(root) => root.clone(),
        None => std::env::temp_dir().join("shipyard-storage"),
    };
    info!(local_root = %root.display(), "using local storage backend");
    Ok((cfg, LocalStorage::new(root)))
}

fn run_stage(
    common: &CommonArgs,
    overrides: Map<String, Value>,
    app_id: Option<String>,
    dist_bundle: Option<String>,
    out: Option<PathBuf>,
    ship: Vec<String>,
) -> Result<(), CliError> {
    let (cfg, storage) = setup(common, overrides)?;

    let home = match cfg.home_dir_path()? {
        Some(home) => home,
        None => {
            let home = std::env::var_os("HOME").ok_or_else(|| {
                CliError::Usage("no home_dir configured and $HOME is unset".to_string())
            })?;
            StoragePath::from_local(Path::new(&home))?
        }
    };
    let application_id = match app_id {
        Some(id) => ApplicationId::new(id)?,
        None => ApplicationId::generate(),
    };

    let mut uploader = ApplicationFileUploader::new(
        storage,
        home,
        &cfg.shared_lib_paths()?,
        application_id,
        cfg.staging_options()?,
    )?;
    let provided_classpath = uploader.register_provided();

    let mut shipped = ShippedArtifacts::new();
    if let Some(bundle) = dist_bundle {
        let bundle = parse_input(&bundle)?;
        let key = bundle.name().to_string();
        let registration = uploader.register_single(&key, &bundle, "", cfg.replication)?;
        shipped.push(registration.into_descriptor());
    }

    let inputs = ship
        .iter()
        .map(|raw| parse_input(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let classpath = if inputs.is_empty() {
        Vec::new()
    } else {
        uploader.register_many(&inputs, &cfg.resources_dir, cfg.replication, &mut shipped)?
    };

    let manifest =
        StagingManifest::new(uploader.into_outcome(provided_classpath, classpath, shipped))?;
    info!(
        application_id = %manifest.outcome.application_id,
        resources = manifest.outcome.resources.len(),
        manifest_sha256 = %manifest.manifest_sha256,
        "staging complete"
    );

    match out {
        Some(path) => manifest.write_to_file(&path)?,
        None => println!("{}", manifest.to_json()?),
    }
    Ok(())
}

fn run_shared_libs(
    common: &CommonArgs,
    overrides: Map<String, Value>,
    as_json: bool,
) -> Result<(), CliError> {
    let (cfg, storage) = setup(common, overrides)?;
    let index = SharedLibraryIndex::build(&storage, &cfg.shared_lib_paths()?)
        .map_err(StagingError::from)?;

    if as_json {
        let entries: Vec<Value> = index
            .iter()
            .map(|entry| {
                json!({
                    "name": entry.file_name,
                    "path": entry.status.path,
                    "root": entry.root_index,
                    "size": entry.status.size,
                    "modification_time": entry.status.modification_time,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if index.is_empty() {
        println!("No shared libraries found.");
    } else {
        for entry in index.iter() {
            println!(
                "{:<40} {:>10}  {}",
                entry.file_name, entry.status.size, entry.status.path
            );
        }
    }
    Ok(())
}

fn run_config(common: &CommonArgs, overrides: Map<String, Value>) -> Result<(), CliError> {
    let effective = common.load(overrides)?;
    println!("{}", effective.to_json()?);
    Ok(())
}

/// URIs are taken as-is; local paths are made absolute.
fn parse_input(raw: &str) -> Result<StoragePath, CliError> {
    let parsed = StoragePath::parse(raw)?;
    if parsed.scheme().is_some() {
        return Ok(parsed);
    }
    let path = Path::new(raw);
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| CliError::Usage(format!("cannot resolve {}: {}", raw, e)))?
            .join(path)
    };
    Ok(StoragePath::from_local(&path)?)
}
