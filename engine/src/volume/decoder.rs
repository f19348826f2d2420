//! Grid Container Decoding
//!
//! `GridDecoder` is the seam between a volumetric-data file and the baker.
//! `JsonGridDecoder` reads the crate's JSON grid container:
//!
//! ```json
//! {
//!   "grids": [{
//!     "name": "density",
//!     "type": "float",
//!     "transform": { "voxel_size": [0.1, 0.1, 0.1] },
//!     "background": 0.0,
//!     "voxels": [[[0, 0, 0], 0.8], [[1, 0, 0], 0.4]],
//!     "boxes": [{ "min": [2, 2, 2], "max": [9, 9, 9], "value": 0.5 }]
//!   }]
//! }
//! ```
//!
//! `transform` takes either `voxel_size` or a column-major `matrix`.

use std::path::Path;

use glam::{IVec3, Mat3, Vec3};
use serde::Deserialize;

use super::grid::{SparseGrid, SparseVoxelGrid};
use super::transform::GridTransform;
use crate::error::DecodeError;

/// Grid value types the decoder can turn into scalar density.
pub const SUPPORTED_GRID_TYPES: [&str; 3] = ["float", "half", "double"];

/// Largest number of voxels a single `boxes` entry may activate.
pub const MAX_BOX_VOXELS: i64 = 1 << 26;

/// Decodes a volumetric-data file into zero or more grids.
pub trait GridDecoder {
    fn decode(&self, path: &Path) -> Result<Vec<Box<dyn SparseGrid>>, DecodeError>;
}

#[derive(Deserialize)]
struct ContainerRecord {
    grids: Vec<GridRecord>,
}

#[derive(Deserialize)]
struct GridRecord {
    name: String,
    #[serde(rename = "type", default = "default_grid_type")]
    grid_type: String,
    #[serde(default)]
    transform: TransformRecord,
    #[serde(default)]
    background: f32,
    #[serde(default)]
    voxels: Vec<(IVec3, f32)>,
    #[serde(default)]
    boxes: Vec<BoxRecord>,
}

#[derive(Deserialize, Default)]
struct TransformRecord {
    voxel_size: Option<Vec3>,
    matrix: Option<[[f32; 3]; 3]>,
}

#[derive(Deserialize)]
struct BoxRecord {
    min: IVec3,
    max: IVec3,
    value: f32,
}

fn default_grid_type() -> String {
    "float".to_string()
}

/// Decoder for the JSON grid container format.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonGridDecoder;

impl JsonGridDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decodes a container held in memory.
    pub fn decode_str(&self, source: &str) -> Result<Vec<SparseVoxelGrid>, DecodeError> {
        let container: ContainerRecord = serde_json::from_str(source)?;
        container.grids.into_iter().map(build_grid).collect()
    }
}

impl GridDecoder for JsonGridDecoder {
    fn decode(&self, path: &Path) -> Result<Vec<Box<dyn SparseGrid>>, DecodeError> {
        let source = std::fs::read_to_string(path)?;
        let grids = self.decode_str(&source)?;
        log::info!(
            "[JsonGridDecoder] Decoded {} grid(s) from {}",
            grids.len(),
            path.display()
        );
        Ok(grids
            .into_iter()
            .map(|grid| Box::new(grid) as Box<dyn SparseGrid>)
            .collect())
    }
}

fn build_grid(record: GridRecord) -> Result<SparseVoxelGrid, DecodeError> {
    if !SUPPORTED_GRID_TYPES.contains(&record.grid_type.as_str()) {
        return Err(DecodeError::UnsupportedGridType {
            grid: record.name,
            grid_type: record.grid_type,
        });
    }

    let invalid = |reason: String| DecodeError::InvalidGrid {
        grid: record.name.clone(),
        reason,
    };

    let transform = match (record.transform.matrix, record.transform.voxel_size) {
        (Some(_), Some(_)) => {
            return Err(invalid("transform sets both 'matrix' and 'voxel_size'".into()));
        }
        (Some(columns), None) => GridTransform::from_matrix(&record.name, Mat3::from_cols_array_2d(&columns))?,
        (None, Some(voxel_size)) => {
            GridTransform::from_matrix(&record.name, Mat3::from_diagonal(voxel_size))?
        }
        (None, None) => GridTransform::default(),
    };

    if !record.background.is_finite() {
        return Err(invalid("background value is not finite".into()));
    }

    let mut grid = SparseVoxelGrid::new(record.name.clone(), transform, record.background);

    for fill in &record.boxes {
        if fill.min.cmpgt(fill.max).any() {
            return Err(invalid(format!("box min {} exceeds max {}", fill.min, fill.max)));
        }
        let extent = fill.max.as_i64vec3() - fill.min.as_i64vec3() + 1;
        let voxels = extent
            .x
            .checked_mul(extent.y)
            .and_then(|area| area.checked_mul(extent.z));
        if voxels.is_none_or(|count| count > MAX_BOX_VOXELS) {
            return Err(invalid(format!(
                "box {} .. {} activates more than {MAX_BOX_VOXELS} voxels",
                fill.min, fill.max
            )));
        }
        grid.fill_box(fill.min, fill.max, fill.value);
    }

    for &(coord, value) in &record.voxels {
        grid.set_value(coord, value);
    }

    log::debug!(
        "[JsonGridDecoder] Grid '{}': {} active voxels in {} leaves",
        record.name,
        grid.active_voxel_count(),
        grid.leaf_count()
    );

    Ok(grid)
}
