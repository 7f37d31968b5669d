//! Paleomap CLI - plate reconstruction maps.
//!
//! Reconstruct coastlines, plate boundaries and subduction zones to a
//! geological time and render them as a Plate Carree PNG.

use clap::{Parser, Subcommand};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Instant;

use paleomap::config::PlotConfig;
use paleomap::feature::FeatureCollection;
use paleomap::grid::JsonGridReader;
use paleomap::plot::{
    export_reconstructed_layers, load_reconstructed_layer, LayerCategory, PlotError, PlotReport,
    PlotTopologies, PngCanvas,
};
use paleomap::reconstruct::{ReconstructionEngine, RotationModel, RotationReconstructor};
use paleomap::teeth::{tessellate_features, TeethArrays, TeethParams};
use paleomap::thermal::{plate_isotherm_depth, PlateModel};
use paleomap::topology::{BoundaryClass, LayerSources, TopologyCache};

/// Plate reconstruction map renderer.
#[derive(Parser)]
#[command(name = "paleomap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a reconstruction map to PNG.
    Render {
        /// Plot configuration (JSON).
        #[arg(short, long)]
        config: PathBuf,

        /// Reconstruction time in Ma; overrides the configuration.
        #[arg(short, long)]
        time: Option<f64>,

        /// Output PNG file.
        #[arg(short, long, default_value = "map.png")]
        output: PathBuf,

        /// Tooth spacing threshold in radians.
        #[arg(long)]
        teeth_spacing: Option<f64>,

        /// Tooth base length in degrees.
        #[arg(long)]
        teeth_size: Option<f64>,

        /// Tooth height-to-base ratio.
        #[arg(long)]
        teeth_aspect: Option<f64>,
    },
    /// Reconstruct subduction zones and count their teeth.
    Teeth {
        /// Subduction zone features (JSON).
        #[arg(short, long, required_unless_present = "layers", conflicts_with = "layers")]
        features: Option<PathBuf>,

        /// Directory of exported boundary layers; reads the left and right
        /// subduction layers for the given time instead of reconstructing.
        #[arg(short, long)]
        layers: Option<PathBuf>,

        /// Rotation model (JSON); without one features stay at present day.
        #[arg(short, long)]
        rotations: Option<PathBuf>,

        /// Reconstruction time in Ma.
        #[arg(short, long, default_value = "0.0")]
        time: f64,

        /// Tooth spacing threshold in radians.
        #[arg(long, default_value = "0.1")]
        spacing: f64,

        /// Tooth base length in degrees.
        #[arg(long, default_value = "2.0")]
        size: f64,

        /// Tooth height-to-base ratio; negative flips the side.
        #[arg(long, default_value = "1.0")]
        aspect: f64,
    },
    /// Write resolved boundary layers for one time to a directory.
    Export {
        /// Plot configuration (JSON).
        #[arg(short, long)]
        config: PathBuf,

        /// Reconstruction time in Ma; overrides the configuration.
        #[arg(short, long)]
        time: Option<f64>,

        /// Output directory.
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
    /// Depth of an isotherm in cooling oceanic lithosphere.
    Isotherm {
        /// Seafloor age in Ma.
        #[arg(short, long)]
        age: f64,

        /// Isotherm temperature in degrees C.
        #[arg(long, default_value = "600")]
        temp: f64,

        /// Plate thickness in km.
        #[arg(long, default_value = "125")]
        thickness_km: f64,
    },
    /// Show what a plot configuration will load.
    Info {
        /// Plot configuration (JSON).
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            config,
            time,
            output,
            teeth_spacing,
            teeth_size,
            teeth_aspect,
        } => {
            let mut config = or_exit(PlotConfig::from_json_file(&config), "reading configuration");
            if let Some(time) = time {
                config.time = time;
            }
            if let Some(spacing) = teeth_spacing {
                config.teeth.spacing = spacing;
            }
            if let Some(size) = teeth_size {
                config.teeth.size = size;
            }
            if let Some(aspect) = teeth_aspect {
                config.teeth.aspect = aspect;
            }
            run_render(&config, &output);
        }
        Commands::Teeth {
            features,
            layers,
            rotations,
            time,
            spacing,
            size,
            aspect,
        } => {
            let params = TeethParams { spacing, size, aspect };
            match (features, layers) {
                (_, Some(dir)) => run_layer_teeth(&dir, time, &params),
                (Some(features), None) => run_teeth(&features, rotations.as_deref(), time, &params),
                (None, None) => {
                    eprintln!("Error: give --features or --layers");
                    std::process::exit(2);
                }
            }
        }
        Commands::Export { config, time, dir } => {
            let mut config = or_exit(PlotConfig::from_json_file(&config), "reading configuration");
            if let Some(time) = time {
                config.time = time;
            }
            run_export(&config, &dir);
        }
        Commands::Isotherm { age, temp, thickness_km } => {
            run_isotherm(age, temp, thickness_km);
        }
        Commands::Info { config } => {
            run_info(&config);
        }
    }
}

fn or_exit<T, E: Display>(result: Result<T, E>, context: &str) -> T {
    result.unwrap_or_else(|e| {
        eprintln!("Error {}: {}", context, e);
        std::process::exit(1);
    })
}

fn load_rotations(path: Option<&Path>) -> RotationReconstructor {
    let model = match path {
        Some(path) => or_exit(RotationModel::from_json_file(path), "reading rotation model"),
        None => or_exit(RotationModel::new(Vec::new()), "building rotation model"),
    };
    RotationReconstructor::new(model)
}

/// Plots an optional layer: a missing source is reported and skipped.
fn plot_layer(name: &str, result: Result<PlotReport, PlotError>) {
    match result {
        Ok(report) if report.dropped > 0 => {
            println!("  {:<22} {:>6} drawn, {} skipped", name, report.drawn, report.dropped)
        }
        Ok(report) => println!("  {:<22} {:>6} drawn", name, report.drawn),
        Err(PlotError::MissingSource(_)) => println!("  {:<22} not configured", name),
        Err(e) => {
            eprintln!("Error plotting {}: {}", name, e);
            std::process::exit(1);
        }
    }
}

fn run_render(config: &PlotConfig, output: &Path) {
    println!("Paleomap - Reconstruction Renderer");
    println!("==================================");
    println!("Time: {} Ma", config.time);
    println!("Anchor plate: {}", config.anchor_plate_id);
    println!("Output: {}", output.display());

    let start = Instant::now();
    let engine = load_rotations(config.rotation_model.as_deref());
    let sources = or_exit(LayerSources::from_config(config), "reading features");
    println!(
        "Loaded {} topology features, {} rotation plates",
        sources.topology_features.len(),
        engine.model().plate_ids().count()
    );

    let cache = or_exit(
        TopologyCache::with_time(&engine, &engine, sources, config.time),
        "resolving topologies",
    );
    let plot = PlotTopologies::new(cache);
    println!("Resolved in {:.2?}", start.elapsed());

    let mut canvas = or_exit(PngCanvas::from_config(&config.canvas), "creating canvas");
    let styles = &config.styles;

    println!("\nDrawing layers...");
    if let Some(path) = &config.grid_filename {
        let result =
            plot.plot_grid_from_file(&mut canvas, &JsonGridReader, path, &Default::default());
        plot_layer("grid", result);
    }
    plot_layer("plate polygons", plot.plot_plate_polygons(&mut canvas, &styles.plate_polygons));
    plot_layer("continents", plot.plot_continents(&mut canvas, &styles.continents));
    plot_layer("coastlines", plot.plot_coastlines(&mut canvas, &styles.coastlines));
    plot_layer("COBs", plot.plot_continent_ocean_boundaries(&mut canvas, &styles.cobs));
    plot_layer("ridges", plot.plot_ridges(&mut canvas, &styles.ridges));
    plot_layer("transforms", plot.plot_transforms(&mut canvas, &styles.transforms));
    plot_layer("trenches", plot.plot_trenches(&mut canvas, &styles.trenches));
    plot_layer(
        "subduction teeth",
        plot.plot_subduction_teeth(&mut canvas, &config.teeth, &styles.teeth),
    );
    if let Some(spacing) = config.velocity_spacing {
        let result = plot.plot_plate_motion_vectors(
            &mut canvas,
            spacing,
            spacing,
            config.normalise_vectors,
            &styles.vectors,
        );
        plot_layer("motion vectors", result);
    }

    or_exit(canvas.save(output), "writing PNG");
    println!("\nRendered {}x{} map in {:.2?}", canvas.width(), canvas.height(), start.elapsed());
}

fn run_teeth(features: &Path, rotations: Option<&Path>, time: f64, params: &TeethParams) {
    let collection = or_exit(FeatureCollection::from_json_file(features), "reading features");
    let engine = load_rotations(rotations);
    let reconstructed = or_exit(
        engine.reconstruct(&collection.features, time, 0, true),
        "reconstructing features",
    );

    let teeth = tessellate_features(&reconstructed, params.spacing, params.size, params.aspect);
    println!("Features: {}", reconstructed.len());
    print_teeth(&teeth);
}

/// Teeth from exported left/right subduction layers; left-polarity teeth
/// point the other way.
fn run_layer_teeth(dir: &Path, time: f64, params: &TeethParams) {
    let load = |category| {
        or_exit(load_reconstructed_layer(dir, category, time), "reading boundary layer")
    };
    let left = load(LayerCategory::SubductionBoundariesLeft);
    let right = load(LayerCategory::SubductionBoundariesRight);

    println!("Features: {} left, {} right", left.len(), right.len());
    print_teeth(&tessellate_features(&left, params.spacing, params.size, -params.aspect));
    print_teeth(&tessellate_features(&right, params.spacing, params.size, params.aspect));
}

fn print_teeth(teeth: &TeethArrays) {
    println!("Teeth:    {}", teeth.len());
    for (i, t) in teeth.triangles().enumerate() {
        println!(
            "  {:>4}: ({:.3}, {:.3}) ({:.3}, {:.3}) ({:.3}, {:.3})",
            i, t.a.x, t.a.y, t.c.x, t.c.y, t.d.x, t.d.y
        );
    }
}

fn run_export(config: &PlotConfig, dir: &Path) {
    let engine = load_rotations(config.rotation_model.as_deref());
    let sources = or_exit(LayerSources::from_config(config), "reading features");
    let cache = or_exit(
        TopologyCache::with_time(&engine, &engine, sources, config.time),
        "resolving topologies",
    );

    let written = or_exit(export_reconstructed_layers(&cache, dir), "exporting layers");
    println!("Boundary layers at {} Ma:", config.time);
    for (category, path) in LayerCategory::ALL.iter().zip(&written) {
        println!("  {:<28} {}", category.file_stem(), path.display());
    }
}

fn run_isotherm(age: f64, temp: f64, thickness_km: f64) {
    let model = PlateModel::with_thickness(thickness_km * 1e3);
    let depth = or_exit(plate_isotherm_depth(age, temp, &model, 20, 1e-3), "computing isotherm");
    println!("{} C isotherm at {} Ma: {:.2} km", temp, age, depth / 1e3);
}

fn run_info(path: &Path) {
    let config = or_exit(PlotConfig::from_json_file(path), "reading configuration");
    let show = |label: &str, p: &Option<PathBuf>| match p {
        Some(p) => println!("  {:<18} {}", label, p.display()),
        None => println!("  {:<18} -", label),
    };

    println!("Paleomap - Plot Configuration");
    println!("=============================");
    println!("Time: {} Ma, anchor plate {}", config.time, config.anchor_plate_id);
    println!();
    println!("Sources:");
    show("rotations", &config.rotation_model);
    show("topologies", &config.topology_features);
    show("coastlines", &config.coastline_filename);
    show("continents", &config.continent_filename);
    show("COBs", &config.cob_filename);
    show("grid", &config.grid_filename);
    println!();
    let c = &config.canvas;
    println!("Canvas: {}x{} over {:?}", c.width, c.height, <[f64; 4]>::from(c.extent));
    println!(
        "Teeth: spacing {} rad, size {} deg, aspect {}",
        config.teeth.spacing, config.teeth.size, config.teeth.aspect
    );
    match config.velocity_spacing {
        Some(s) => println!("Motion vectors: every {} deg", s),
        None => println!("Motion vectors: off"),
    }

    if config.topology_features.is_none() {
        return;
    }
    let engine = load_rotations(config.rotation_model.as_deref());
    let sources = or_exit(LayerSources::from_config(&config), "reading features");
    let cache = or_exit(
        TopologyCache::with_time(&engine, &engine, sources, config.time),
        "resolving topologies",
    );
    println!();
    println!("Resolved at {} Ma:", config.time);
    for class in BoundaryClass::ALL {
        let count = or_exit(cache.get_bucket(class), "reading bucket").len();
        println!("  {:<18} {:>6}", class.label(), count);
    }
}
