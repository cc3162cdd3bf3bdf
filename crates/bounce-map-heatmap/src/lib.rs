//! Bounce heatmap: a fixed-shape 2-D histogram over the table rectangle and
//! its raster rendering.
//!
//! Bins are indexed `(ix, iy)` with `ix` along the TL→TR calibration edge and
//! `iy` along TL→BL. The rendered image keeps that orientation: image columns
//! follow table `x`, image rows follow table `y` downward.

mod grid;
mod render;

pub use grid::{aggregate, HeatmapBins, HeatmapParams};
pub use render::{render_heatmap, save_heatmap_png, HeatmapError, RenderParams};
