//! Headless runner for the tissue simulation.
//!
//! Builds a starting tissue from a settings file (or defaults), steps a
//! cell model for a number of steps, and writes the final mesh as JSON.
//! Log verbosity follows `RUST_LOG`.

mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use settings::{CambiumSettings, ModelKind, RunSettings};
use std::{fs::File, io::BufWriter, path::PathBuf};
use tissue_core::{
    CellBehavior, Mesh, Tissue,
    mechanics::UniformExpansion,
    models::{BARK, CAMBIUM, CambiumModel, VerticalDivisionModel},
    snapshot::TissueSnapshot,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Grows a 2-D plant tissue and writes the result.
#[derive(Parser, Debug)]
#[command(name = "tissue-run")]
#[command(about = "Runs a vertex-based tissue growth simulation")]
struct Args {
    /// Path to a settings TOML file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of steps (overrides the settings file).
    #[arg(short, long)]
    steps: Option<u64>,

    /// Cell model (overrides the settings file).
    #[arg(short, long, value_enum)]
    model: Option<ModelKind>,

    /// Random seed (overrides the settings file).
    #[arg(long)]
    seed: Option<u64>,

    /// Where to write the final mesh as JSON.
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut settings = match &args.config {
        Some(path) => RunSettings::load(path)?,
        None => RunSettings::default(),
    };
    if let Some(steps) = args.steps {
        settings.steps = steps;
    }
    if let Some(model) = args.model {
        settings.model = model;
    }
    if let Some(seed) = args.seed {
        settings.tissue.rng_seed = seed;
    }

    let mesh = settings.layout.build(settings.tissue.wall_stiffness)?;
    info!(
        cells = mesh.n_cells(),
        walls = mesh.n_walls(),
        nodes = mesh.n_nodes(),
        model = ?settings.model,
        steps = settings.steps,
        "starting run"
    );

    let snapshot = match settings.model {
        ModelKind::Vertical => run(mesh, VerticalDivisionModel::default(), &settings)?,
        ModelKind::Cambium => {
            let (mesh, model) = prepare_cambium(mesh, &settings.cambium)?;
            run(mesh, model, &settings)?
        }
    };

    println!(
        "Finished {} steps: {} cells, {} walls, {} nodes",
        settings.steps,
        snapshot.cells.len(),
        snapshot.walls.len(),
        snapshot.nodes.len()
    );

    if let Some(out) = &args.out {
        let file = File::create(out)
            .with_context(|| format!("Failed to create output file: {}", out.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &snapshot)
            .with_context(|| format!("Failed to write snapshot: {}", out.display()))?;
        println!("Wrote {}", out.display());
    }
    Ok(())
}

fn run<B: CellBehavior>(mesh: Mesh, model: B, settings: &RunSettings) -> Result<TissueSnapshot> {
    let mut tissue = Tissue::new(mesh, model, settings.tissue.clone()).with_relaxer(
        UniformExpansion {
            max_rate: settings.relax.max_rate,
        },
    );
    for _ in 0..settings.steps {
        let report = tissue
            .step_once()
            .with_context(|| format!("Step {} failed", tissue.steps() + 1))?;
        if report.skipped > 0 {
            info!(step = report.step, skipped = report.skipped, "divisions skipped");
        }
    }
    Ok(tissue.snapshot())
}

/// Types the starting cells and builds the cambium model's bark set.
fn prepare_cambium(mut mesh: Mesh, cfg: &CambiumSettings) -> Result<(Mesh, CambiumModel)> {
    let mut model = CambiumModel::default();
    if let Some(bark) = &cfg.bark_cells {
        model.bark_cells = bark.iter().copied().collect();
    }
    if let Some(marker) = cfg.marker_cell {
        model.marker_cell = marker;
    }

    let cambium: Vec<_> = if cfg.cambium_cells.is_empty() {
        mesh.cell_ids()
            .into_iter()
            .filter(|id| !model.bark_cells.contains(id))
            .collect()
    } else {
        cfg.cambium_cells.clone()
    };
    for id in cambium {
        mesh.cell_mut(id)
            .with_context(|| format!("Cambium cell {id} is not in the layout"))?
            .cell_type = CAMBIUM;
    }
    for &id in &model.bark_cells {
        if let Ok(cell) = mesh.cell_mut(id) {
            cell.cell_type = BARK;
        }
    }
    Ok((mesh, model))
}
