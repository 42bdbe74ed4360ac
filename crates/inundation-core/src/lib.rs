//! Coastal inundation risk estimation.
//!
//! Turns sparse ground-motion time series, a sea-level trend and a DEM into a
//! per-cell risk percentage raster.
//!
//! Pipeline:
//!   trend fit → displacement projection → RSLR → IDW onto the DEM grid →
//!   risk ratio, negative-cell repair, 0–100 scaling.

pub mod config;
pub mod coords;
pub mod epochs;
pub mod error;
pub mod export;
pub mod idw;
pub mod kdtree;
pub mod pipeline;
pub mod projection;
pub mod raster;
pub mod risk;
pub mod sea_level;
pub mod trend;

pub use config::{IdwParams, PipelineConfig, ProjectionParams, RepairParams, TrendParams};
pub use coords::LatLon;
pub use epochs::{EpochSet, MeasurementPoint};
pub use error::{Error, Result};
pub use pipeline::{run_pipeline, PipelineReport, PipelineResult, PointEstimate};
pub use raster::{ElevationGrid, GeoTransform, Grid, RiskGrid, RslrGrid};
