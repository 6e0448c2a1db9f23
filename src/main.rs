// ============================================
// voxel-region - Обслуживание миров на регионах
// ============================================

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

use voxel_region::region::REGION_DIR;
use voxel_region::{generate, BincodeChunkCodec, RegionFormat, RegionLevelProvider, StorageConfig};

#[derive(Parser)]
#[command(name = "voxel-region")]
#[command(about = "Inspect and bootstrap region-based voxel worlds", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON storage config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Region format (overrides the config)
    #[arg(long, global = true, value_parser = ["mcregion", "anvil"])]
    format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new empty world
    Generate {
        path: PathBuf,
        #[arg(long, default_value = "world")]
        name: String,
        #[arg(long, default_value_t = 0)]
        seed: i64,
        #[arg(long, default_value = "normal")]
        generator: String,
        #[arg(long)]
        hardcore: bool,
        #[arg(long)]
        difficulty: Option<String>,
        #[arg(long)]
        preset: Option<String>,
    },
    /// Report which region formats a directory qualifies as
    Probe { path: PathBuf },
    /// Print level data as JSON
    Info { path: PathBuf },
    /// Walk every stored chunk and report decode failures
    Chunks { path: PathBuf },
}

fn load_config(cli: &Cli) -> anyhow::Result<StorageConfig> {
    let mut config = match &cli.config {
        Some(path) => StorageConfig::load(path)?,
        None => StorageConfig::default(),
    };
    match cli.format.as_deref() {
        Some("mcregion") => config.format = RegionFormat::McRegion,
        Some("anvil") => config.format = RegionFormat::Anvil,
        _ => {}
    }
    Ok(config)
}

fn open_world(
    path: &Path,
    config: StorageConfig,
) -> anyhow::Result<RegionLevelProvider<BincodeChunkCodec>> {
    RegionLevelProvider::open(path, BincodeChunkCodec, config)
        .with_context(|| format!("cannot open world at {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Command::Generate {
            path,
            name,
            seed,
            generator,
            hardcore,
            difficulty,
            preset,
        } => {
            let mut options = Map::new();
            options.insert("hardcore".to_string(), Value::Bool(hardcore));
            if let Some(difficulty) = difficulty {
                options.insert("difficulty".to_string(), Value::String(difficulty));
            }
            if let Some(preset) = preset {
                options.insert("preset".to_string(), Value::String(preset));
            }
            generate(&path, &name, seed, &generator, &options, &config)?;
            println!("Created {} world '{}' at {}", config.format.extension(), name, path.display());
        }

        Command::Probe { path } => {
            let mut matched = false;
            for format in RegionFormat::ALL {
                match format.probe(&path) {
                    Ok(()) => {
                        matched = true;
                        println!("{}: yes", format.extension());
                    }
                    Err(reason) => println!("{}: no ({})", format.extension(), reason),
                }
            }
            if !matched {
                anyhow::bail!("{} is not a region world", path.display());
            }
        }

        Command::Info { path } => {
            let world = open_world(&path, config)?;
            println!("{}", serde_json::to_string_pretty(world.level_data())?);
        }

        Command::Chunks { path } => {
            let mut world = open_world(&path, config)?;
            let mut chunks = 0usize;
            let mut failures = 0usize;
            for item in world.all_chunks() {
                match item {
                    Ok(_) => chunks += 1,
                    Err(e) if e.is_chunk_scoped() => {
                        failures += 1;
                        log::warn!("{}", e);
                    }
                    Err(e) => return Err(e).context(format!("failed walking {}", path.join(REGION_DIR).display())),
                }
            }
            world.close()?;
            println!("{} chunks, {} failed to decode", chunks, failures);
        }
    }

    Ok(())
}
