//! Terrasim CLI - procedural terrain simulation.
//!
//! Generates a wrapping world from tectonics, river erosion and climate, and
//! exports height and biome previews.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use terrasim::erosion::ErosionConfig;
use terrasim::export::{
    export_biome_map_png, export_height_png, BiomeMapOptions, PngExportOptions, RasterSize,
};
use terrasim::geometry::Bounds;
use terrasim::pipeline::{GenerationEvent, Generator, WorldConfig};
use terrasim::tectonics::TectonicConfig;

/// Procedural terrain simulation.
#[derive(Parser)]
#[command(name = "terrasim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a world and export previews.
    Generate {
        /// TOML configuration file. Flags below override its values.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Random seed for reproducible generation.
        #[arg(short, long)]
        seed: Option<u64>,

        /// World width (wrap period) in world units.
        #[arg(long)]
        width: Option<f64>,

        /// World height in world units.
        #[arg(long)]
        height: Option<f64>,

        /// Minimum distance between sample points.
        #[arg(long)]
        min_cell_distance: Option<f64>,

        /// Probability that a plate is continental (0.0-1.0).
        #[arg(long)]
        continent_ratio: Option<f64>,

        /// Tectonic preset.
        #[arg(long)]
        tectonics: Option<TectonicPreset>,

        /// Erosion preset.
        #[arg(long)]
        erosion: Option<ErosionPreset>,

        /// Maximum hydrology/erosion iterations.
        #[arg(long)]
        erosion_iterations: Option<u32>,

        /// Output directory for generated files.
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Base name for output files.
        #[arg(short, long, default_value = "world")]
        name: String,

        /// Width of the exported rasters in pixels.
        #[arg(short, long, default_value = "1024")]
        resolution: u32,

        /// Skip the biome preview map.
        #[arg(long)]
        skip_biome_map: bool,
    },

    /// Display information about a world configuration.
    Info {
        /// TOML configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TectonicPreset {
    EarthLike,
    /// Many small, fast plates.
    Active,
    /// Few large, slow plates.
    Stable,
}

#[derive(Clone, Copy, ValueEnum)]
enum ErosionPreset {
    /// Fewer iterations, looser threshold.
    Fast,
    /// More iterations, tighter threshold.
    Detailed,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            config,
            seed,
            width,
            height,
            min_cell_distance,
            continent_ratio,
            tectonics,
            erosion,
            erosion_iterations,
            output,
            name,
            resolution,
            skip_biome_map,
        } => {
            let mut world_config = load_config(config.as_deref());
            if let Some(preset) = tectonics {
                world_config.tectonics = match preset {
                    TectonicPreset::EarthLike => TectonicConfig::earth_like(),
                    TectonicPreset::Active => TectonicConfig::active(),
                    TectonicPreset::Stable => TectonicConfig::stable(),
                };
            }
            if let Some(preset) = erosion {
                world_config.erosion = match preset {
                    ErosionPreset::Fast => ErosionConfig::fast(),
                    ErosionPreset::Detailed => ErosionConfig::detailed(),
                };
            }
            if let Some(seed) = seed {
                world_config.seed = seed;
            }
            world_config.bounds = Bounds::new(
                width.unwrap_or(world_config.bounds.width),
                height.unwrap_or(world_config.bounds.height),
            );
            if let Some(d) = min_cell_distance {
                world_config.min_cell_distance = d;
            }
            if let Some(ratio) = continent_ratio {
                world_config.tectonics.continent_ratio = ratio;
            }
            if let Some(iterations) = erosion_iterations {
                world_config.erosion.max_iterations = iterations;
            }

            run_generate(world_config, &output, &name, resolution, skip_biome_map);
        }
        Commands::Info { config } => {
            run_info(&load_config(config.as_deref()));
        }
    }
}

fn load_config(path: Option<&Path>) -> WorldConfig {
    match path {
        Some(path) => WorldConfig::load(path).unwrap_or_else(|e| {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }),
        None => WorldConfig::default(),
    }
}

fn run_generate(
    config: WorldConfig,
    output: &Path,
    name: &str,
    resolution: u32,
    skip_biome_map: bool,
) {
    let start = Instant::now();
    let bounds = config.bounds;

    println!("Generating world...");
    println!("  Seed: {}", config.seed);
    println!("  Bounds: {} x {}", bounds.width, bounds.height);
    println!("  Min cell distance: {}", config.min_cell_distance);
    println!("  Continent ratio: {}", config.tectonics.continent_ratio);
    println!();

    let handle = Generator::new(config).spawn();
    for event in handle.events().iter() {
        match event {
            GenerationEvent::Started => println!("Started"),
            GenerationEvent::Progress { message, elapsed } => {
                println!("  [{:>9.2?}] {}", elapsed, message)
            }
            GenerationEvent::Completed { elapsed } => {
                println!("Generation completed in {:.2?}", elapsed);
                break;
            }
            GenerationEvent::Failed { error } => {
                eprintln!("Generation failed: {}", error);
                break;
            }
        }
    }

    let generator = match handle.join() {
        Ok((generator, Ok(()))) => generator,
        Ok((_, Err(e))) | Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    for warning in generator.warnings() {
        println!("  Warning: {}", warning);
    }
    if let Some(world) = generator.world() {
        let (min, max) = world.height_range();
        println!("  Cells: {}", world.len());
        println!("  Continental fraction: {:.2}", world.continental_fraction());
        println!("  Height range: [{:.2}, {:.2}]", min, max);
        println!("  Erosion iterations: {}", generator.erosion_iterations());
    }
    println!();

    if let Err(e) = std::fs::create_dir_all(output) {
        eprintln!("Error creating output directory: {}", e);
        std::process::exit(1);
    }

    let export_start = Instant::now();
    let size = RasterSize::fit_width(bounds, resolution);

    let height_path = output.join(format!("{}_height.png", name));
    let options = PngExportOptions {
        size,
        ..Default::default()
    };
    export_height_png(&generator, &height_path, &options).unwrap_or_else(|e| {
        eprintln!("Error exporting heightmap: {}", e);
        std::process::exit(1);
    });
    println!("Exported {}", height_path.display());

    if !skip_biome_map {
        let biome_path = output.join(format!("{}_biomes.png", name));
        let options = BiomeMapOptions {
            size,
            ..Default::default()
        };
        export_biome_map_png(&generator, &biome_path, &options).unwrap_or_else(|e| {
            eprintln!("Error exporting biome map: {}", e);
            std::process::exit(1);
        });
        println!("Exported {}", biome_path.display());
    }

    println!("Export completed in {:.2?}", export_start.elapsed());
    println!("\nTotal time: {:.2?}", start.elapsed());
    println!("Done!");
}

fn run_info(config: &WorldConfig) {
    let bounds = config.bounds;
    let d = config.min_cell_distance;
    // Bridson sampling settles near 0.7 points per d^2.
    let estimated_cells = (bounds.area() * 0.7 / (d * d)).round() as u64;
    let biome_spacing = config.biome_grid_spacing();
    let biome_nodes = ((bounds.width / biome_spacing).round() * ((bounds.height / biome_spacing).ceil() + 1.0)) as u64;

    println!("Terrasim - World Configuration Info");
    println!("===================================");
    println!();
    println!("Seed: {}", config.seed);
    println!("Bounds: {} x {} (wraps horizontally)", bounds.width, bounds.height);
    println!("Min cell distance: {}", d);
    println!();
    println!("Estimated cells:      {:>10}", estimated_cells);
    println!("Biome grid nodes:     {:>10}", biome_nodes);
    println!("Max erosion rounds:   {:>10}", config.erosion.max_iterations);
    println!();
    match config.validate() {
        Ok(()) => println!("Configuration: OK"),
        Err(e) => println!("Configuration: {}", e),
    }
}
