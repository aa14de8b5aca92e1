//! Run settings read from a TOML file.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;
use tissue_core::{Config, Mesh, generator, types::CellId};

/// Root of the settings file. Every section is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub model: ModelKind,
    pub steps: u64,
    pub layout: Layout,
    /// Core simulation parameters.
    pub tissue: Config,
    pub relax: RelaxSettings,
    pub cambium: CambiumSettings,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            model: ModelKind::default(),
            steps: 50,
            layout: Layout::default(),
            tissue: Config::default(),
            relax: RelaxSettings::default(),
            cambium: CambiumSettings::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    Vertical,
    Cambium,
}

/// Starting tissue.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layout {
    Grid { nx: usize, ny: usize, size: f64 },
    Hex { rings: u32, radius: f64 },
}

impl Default for Layout {
    fn default() -> Self {
        Self::Grid {
            nx: 4,
            ny: 4,
            size: 1.0,
        }
    }
}

impl Layout {
    pub fn build(&self, wall_stiffness: f64) -> Result<Mesh> {
        let mesh = match *self {
            Self::Grid { nx, ny, size } => {
                if nx == 0 || ny == 0 || !(size > 0.0) {
                    bail!("grid layout needs positive nx, ny and size");
                }
                generator::square_grid(nx, ny, size, wall_stiffness)?
            }
            Self::Hex { rings, radius } => {
                if !(radius > 0.0) {
                    bail!("hex layout needs a positive radius");
                }
                generator::hex_cluster(rings, radius, wall_stiffness)?
            }
        };
        Ok(mesh)
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct RelaxSettings {
    /// Largest change in linear scale per step; zero keeps nodes still.
    pub max_rate: f64,
}

impl Default for RelaxSettings {
    fn default() -> Self {
        Self { max_rate: 0.05 }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CambiumSettings {
    /// Initial bark set; the model's built-in set when absent.
    pub bark_cells: Option<Vec<CellId>>,
    pub marker_cell: Option<CellId>,
    /// Cells that start as dividing cambium; all non-bark cells when empty.
    pub cambium_cells: Vec<CellId>,
}

impl RunSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))
    }
}
