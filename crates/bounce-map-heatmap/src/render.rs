use std::path::Path;

use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::HeatmapBins;

/// Errors produced while rendering or writing a heatmap image.
#[derive(thiserror::Error, Debug)]
pub enum HeatmapError {
    #[error("heatmap image would be empty ({width}x{height} px)")]
    EmptyImage { width: u32, height: u32 },
    #[error("failed to write heatmap to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// Raster layout of the rendered heatmap.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    /// Side of one histogram bin in output pixels.
    pub px_per_bin: u32,
    /// Draw the table outline, net and center line.
    pub table_lines: bool,
    /// Width of the color scale strip on the right; 0 disables it.
    pub legend_width: u32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            px_per_bin: 20,
            table_lines: true,
            legend_width: 16,
        }
    }
}

const LINE: Rgb<u8> = Rgb([235, 235, 235]);
const GAP: u32 = 6;

// Viridis control points, evenly spaced on [0, 1].
const VIRIDIS: [[f32; 3]; 9] = [
    [68.0, 1.0, 84.0],
    [71.0, 44.0, 122.0],
    [59.0, 81.0, 139.0],
    [44.0, 113.0, 142.0],
    [33.0, 144.0, 141.0],
    [39.0, 173.0, 129.0],
    [92.0, 200.0, 99.0],
    [170.0, 220.0, 50.0],
    [253.0, 231.0, 37.0],
];

fn colormap(t: f32) -> Rgb<u8> {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let pos = t * (VIRIDIS.len() - 1) as f32;
    let i = (pos.floor() as usize).min(VIRIDIS.len() - 2);
    let f = pos - i as f32;
    let (a, b) = (VIRIDIS[i], VIRIDIS[i + 1]);
    Rgb([0, 1, 2].map(|c| (a[c] + f * (b[c] - a[c])).round() as u8))
}

/// Render the histogram as an RGB image.
///
/// Columns follow table `x` (TL→TR), rows follow table `y` (TL→BL). Colors
/// are normalized by the peak count; an all-zero grid renders uniformly in
/// the lowest color.
pub fn render_heatmap(bins: &HeatmapBins, params: &RenderParams) -> Result<RgbImage, HeatmapError> {
    let px = params.px_per_bin.max(1);
    let grid_w = bins.bins_x as u32 * px;
    let grid_h = bins.bins_y as u32 * px;
    let legend = if params.legend_width > 0 {
        GAP + params.legend_width
    } else {
        0
    };
    let (width, height) = (grid_w + legend, grid_h);
    if width == 0 || height == 0 {
        return Err(HeatmapError::EmptyImage { width, height });
    }

    let peak = bins.max_count();
    let scale = if peak > 0 { 1.0 / peak as f32 } else { 0.0 };

    let mut img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    for iy in 0..bins.bins_y {
        for ix in 0..bins.bins_x {
            let c = bins.count(ix, iy).unwrap_or(0);
            let color = colormap(c as f32 * scale);
            for y in iy as u32 * px..(iy as u32 + 1) * px {
                for x in ix as u32 * px..(ix as u32 + 1) * px {
                    img.put_pixel(x, y, color);
                }
            }
        }
    }

    if params.table_lines {
        draw_table_lines(&mut img, grid_w, grid_h);
    }

    if params.legend_width > 0 {
        let x0 = grid_w + GAP;
        for y in 0..height {
            let t = 1.0 - y as f32 / (height.max(2) - 1) as f32;
            let color = if peak > 0 { colormap(t) } else { colormap(0.0) };
            for x in x0..width {
                img.put_pixel(x, y, color);
            }
        }
    }

    Ok(img)
}

fn draw_table_lines(img: &mut RgbImage, grid_w: u32, grid_h: u32) {
    let (last_x, last_y) = (grid_w - 1, grid_h - 1);
    for x in 0..grid_w {
        img.put_pixel(x, 0, LINE);
        img.put_pixel(x, last_y, LINE);
        // Center line along the table length.
        img.put_pixel(x, grid_h / 2, LINE);
    }
    for y in 0..grid_h {
        img.put_pixel(0, y, LINE);
        img.put_pixel(last_x, y, LINE);
        // Net, across the table at half length.
        img.put_pixel(grid_w / 2, y, LINE);
        if grid_w / 2 > 0 {
            img.put_pixel(grid_w / 2 - 1, y, LINE);
        }
    }
}

/// Render and write the heatmap as PNG (format chosen from the extension).
pub fn save_heatmap_png(
    bins: &HeatmapBins,
    params: &RenderParams,
    path: impl AsRef<Path>,
) -> Result<(), HeatmapError> {
    let path = path.as_ref();
    let img = render_heatmap(bins, params)?;
    img.save(path).map_err(|source| HeatmapError::Write {
        path: path.display().to_string(),
        source,
    })?;
    log::info!(
        "wrote heatmap {}x{} ({} bounce(s)) to {}",
        img.width(),
        img.height(),
        bins.total(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{aggregate, HeatmapParams};
    use bounce_map_core::TableSpec;
    use bounce_map_track::BounceEvent;

    fn no_decorations() -> RenderParams {
        RenderParams {
            px_per_bin: 4,
            table_lines: false,
            legend_width: 0,
        }
    }

    #[test]
    fn empty_grid_renders_uniform_image() {
        let bins = aggregate(&[], TableSpec::default(), HeatmapParams::default());
        let img = render_heatmap(&bins, &no_decorations()).expect("render");
        assert_eq!((img.width(), img.height()), (30 * 4, 17 * 4));
        let first = *img.get_pixel(0, 0);
        assert!(img.pixels().all(|p| *p == first));
        assert_eq!(first, colormap(0.0));
    }

    #[test]
    fn hottest_bin_gets_top_color() {
        let ev = BounceEvent {
            frame_index: 12,
            time_seconds: 0.4,
            table_x: 0.01,
            table_y: 0.01,
            confidence: 0.8,
        };
        let bins = aggregate(&[ev], TableSpec::default(), HeatmapParams::default());
        let img = render_heatmap(&bins, &no_decorations()).expect("render");
        assert_eq!(*img.get_pixel(1, 1), colormap(1.0));
        assert_eq!(*img.get_pixel(10, 10), colormap(0.0));
    }

    #[test]
    fn legend_widens_image() {
        let bins = aggregate(&[], TableSpec::default(), HeatmapParams::default());
        let img = render_heatmap(&bins, &RenderParams::default()).expect("render");
        assert_eq!(img.width(), 30 * 20 + GAP + 16);
        assert_eq!(img.height(), 17 * 20);
    }

    #[test]
    fn colormap_endpoints() {
        assert_eq!(colormap(0.0), Rgb([68, 1, 84]));
        assert_eq!(colormap(1.0), Rgb([253, 231, 37]));
        assert_eq!(colormap(f32::NAN), colormap(0.0));
    }

    #[test]
    fn saves_png_for_zero_events() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("heatmap.png");
        let bins = aggregate(&[], TableSpec::default(), HeatmapParams::default());
        save_heatmap_png(&bins, &RenderParams::default(), &path).expect("save");
        let decoded = image::open(&path).expect("decode").to_rgb8();
        assert_eq!(decoded.height(), 17 * 20);
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("heatmap.png");
        let bins = aggregate(&[], TableSpec::default(), HeatmapParams::default());
        let err = save_heatmap_png(&bins, &RenderParams::default(), &path).unwrap_err();
        assert!(matches!(err, HeatmapError::Write { .. }));
    }
}
