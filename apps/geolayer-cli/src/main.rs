use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use geolayer_assets::IfcLoader;
use geolayer_common::SceneConfig;
use geolayer_geo::{GeoreferenceTransform, MercatorCoordinate};
use geolayer_layer::{LAYER_ID, ModelLayer, ModelLayerConfig, ModelLoadState};
use geolayer_map::{
    HeadlessMap, LayerSpec, LayerType, MapEvent, MapOptions, MapView, Style, StyleLayer,
    building_extrusion_layer,
};

/// Layer the model is drawn beneath, when the style has it.
const MODEL_BEFORE: &str = "waterway-label";

#[derive(Parser)]
#[command(name = "geolayer-cli", about = "Georeferenced 3D models on a map")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Scene configuration (YAML). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Print the model's Mercator placement and local matrix
    Transform,
    /// Report where the model and buildings would go in a style
    Style {
        /// Style JSON file
        file: PathBuf,
    },
    /// Render the scene headlessly
    Run {
        /// Maximum number of frames to draw
        #[arg(short, long, default_value = "3")]
        frames: u64,
        /// Style JSON file; the bundled light style when omitted
        #[arg(short, long)]
        style: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = match &cli.config {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => {
            let mut config = SceneConfig::default();
            config.apply_env();
            config
        }
    };

    match cli.command {
        Commands::Info => {
            println!("geolayer-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", geolayer_common::crate_info());
            println!("geo: {}", geolayer_geo::crate_info());
            println!("render: {}", geolayer_render::crate_info());
            println!("assets: {}", geolayer_assets::crate_info());
            println!("map: {}", geolayer_map::crate_info());
            println!("layer: {}", geolayer_layer::crate_info());
        }
        Commands::Transform => print_transform(&config)?,
        Commands::Style { file } => {
            let style = Style::load(&file)?;
            print_style_plan(&style)?;
        }
        Commands::Run { frames, style } => {
            let style = match style {
                Some(path) => Style::load(path)?,
                None => Style::bundled_light()?,
            };
            run_scene(&config, style, frames)?;
        }
    }

    Ok(())
}

fn print_transform(config: &SceneConfig) -> anyhow::Result<()> {
    let anchor = config.anchor;
    let transform = GeoreferenceTransform::new(anchor, config.rotation)?;
    let params = transform.params();
    println!(
        "Anchor: lng={} lat={} alt={}",
        anchor.longitude, anchor.latitude, anchor.altitude
    );
    println!(
        "Mercator: x={:.12} y={:.12} z={:.12}",
        params.translate.x, params.translate.y, params.translate.z
    );
    println!("Scale: {:.6e} mercator units per meter", params.scale);
    let [rx, ry, rz] = params.rotate.to_array();
    println!("Rotation: x={rx:.6} y={ry:.6} z={rz:.6} rad");

    let back = MercatorCoordinate::from_anchor(&anchor).to_anchor();
    println!(
        "Round trip: lng={:.9} lat={:.9}",
        back.longitude, back.latitude
    );

    println!("Local matrix (columns):");
    for col in transform.local_matrix().to_cols_array_2d() {
        println!(
            "  [{:>14.6e}, {:>14.6e}, {:>14.6e}, {:>14.6e}]",
            col[0], col[1], col[2], col[3]
        );
    }

    // Where the model origin lands on screen with the configured view.
    let options = MapOptions::from_config(config);
    let view = MapView {
        center_lng: options.center_lng,
        center_lat: options.center_lat,
        zoom: options.zoom,
        pitch: options.pitch,
        bearing: options.bearing,
        canvas: options.canvas,
    };
    let ndc = transform
        .compose(&view.projection_array())
        .project_point3(glam::DVec3::ZERO);
    println!("Origin in clip space: ({:.4}, {:.4}, {:.4})", ndc.x, ndc.y, ndc.z);
    Ok(())
}

fn print_style_plan(style: &Style) -> anyhow::Result<()> {
    println!(
        "Style: {} ({} layers)",
        style.name.as_deref().unwrap_or("unnamed"),
        style.layers.len()
    );

    let mut planned = style.clone();
    let model_before = planned.layer(MODEL_BEFORE).map(|l| l.id.clone());
    planned.add_layer(
        StyleLayer::new(LAYER_ID, LayerType::Custom),
        model_before.as_deref(),
    )?;

    match planned.first_label_layer_id().map(str::to_string) {
        Ok(label) => {
            println!("First label layer: {label}");
            planned.add_layer(building_extrusion_layer(), Some(&label))?;
        }
        Err(e) => println!("3D buildings unavailable: {e}"),
    }

    println!("Draw order:");
    for (i, id) in planned.layer_ids().enumerate() {
        let marker = if style.layer(id).is_none() { " +" } else { "" };
        println!("  {i:>3} {id}{marker}");
    }
    Ok(())
}

fn run_scene(config: &SceneConfig, style: Style, frames: u64) -> anyhow::Result<()> {
    let mut map = HeadlessMap::new(MapOptions::from_config(config))
        .context("set access_token in the config file or GEOLAYER_ACCESS_TOKEN")?;

    let layer = ModelLayer::with_debug_renderer(ModelLayerConfig::from(config), IfcLoader::new())?;
    let status = layer.load_status();
    let mut pending = Some(layer);
    map.on(MapEvent::StyleLoad, move |map| {
        let Some(layer) = pending.take() else {
            return Ok(());
        };
        let before = map.style().layer(MODEL_BEFORE).map(|l| l.id.clone());
        map.add_layer(LayerSpec::custom(layer), before.as_deref())
    });
    map.on(MapEvent::Load, |map| {
        let label = map.style().first_label_layer_id()?.to_string();
        map.add_layer(building_extrusion_layer(), Some(&label))
    });

    map.set_style(style);
    for e in map.take_errors() {
        tracing::warn!(error = %e, "scene setup incomplete");
    }

    let drawn = map.run(frames);
    match status.wait() {
        ModelLoadState::Loaded { name } => println!("Model: {name}"),
        ModelLoadState::Failed { reason } => println!("Model: not loaded ({reason})"),
        ModelLoadState::NotStarted => println!("Model: layer was not added"),
        ModelLoadState::Pending => println!("Model: still loading"),
    }

    let report = map.render_frame();
    println!(
        "Frames: {} (+1 after load), repaint requests: {}",
        drawn,
        map.repaint_requests()
    );
    println!("Last frame {} draws:", report.frame);
    for draw in map.context().draws() {
        let program = draw
            .state
            .program
            .map_or_else(|| "-".to_string(), |p| format!("{p:#x}"));
        println!("  {:<20} program={program}", draw.source);
    }
    Ok(())
}
