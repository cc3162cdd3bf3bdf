//! Annotated preview frames.
//!
//! Each frame gets the table outline and net, the winning detection box with
//! a confidence bar, markers for the bounces seen so far, and a red banner
//! shortly after each bounce. Frames are written as `frame_000000.png`, ...

use std::{fs, path::Path};

use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{
        draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut,
    },
    rect::Rect,
};
use nalgebra::Point2;

use crate::{
    core::{Homography, TableSpec},
    error::AnalysisError,
    pipeline::Analysis,
    source::FrameSource,
    track::{BounceEvent, Detection},
};

const GREEN: Rgb<u8> = Rgb([0, 220, 0]);
const CYAN: Rgb<u8> = Rgb([0, 220, 220]);
const RED: Rgb<u8> = Rgb([230, 20, 20]);
const BANNER_SECONDS: f64 = 0.5;
const MARKER_RADIUS: i32 = 5;

/// Table outline and bounce positions in image pixels.
#[derive(Clone, Debug)]
pub struct TableOverlay {
    outline: [Point2<f64>; 4],
    net: [Point2<f64>; 2],
    to_image: Homography,
}

impl TableOverlay {
    /// `None` if the image-to-table homography cannot be inverted.
    pub fn new(image_to_table: &Homography, table: &TableSpec) -> Option<Self> {
        let to_image = image_to_table.inverse()?;
        let half = table.width_m * 0.5;
        Some(Self {
            outline: table.corners().map(|c| to_image.apply(c)),
            net: [
                to_image.apply(Point2::new(half, 0.0)),
                to_image.apply(Point2::new(half, table.height_m)),
            ],
            to_image,
        })
    }

    pub fn outline(&self) -> &[Point2<f64>; 4] {
        &self.outline
    }

    pub fn to_image(&self, table_x: f64, table_y: f64) -> Point2<f64> {
        self.to_image.apply(Point2::new(table_x, table_y))
    }
}

fn segment(img: &mut RgbImage, a: Point2<f64>, b: Point2<f64>, color: Rgb<u8>) {
    draw_line_segment_mut(img, (a.x as f32, a.y as f32), (b.x as f32, b.y as f32), color);
}

/// Draw overlays for one frame in place.
///
/// `bounces` are the events at or before this frame; `banner` marks a frame
/// right after a bounce.
pub fn annotate_frame(
    img: &mut RgbImage,
    overlay: &TableOverlay,
    best: Option<&Detection>,
    bounces: &[BounceEvent],
    banner: bool,
) {
    for i in 0..4 {
        segment(img, overlay.outline[i], overlay.outline[(i + 1) % 4], CYAN);
    }
    segment(img, overlay.net[0], overlay.net[1], CYAN);

    if let Some(det) = best {
        let b = det.bbox;
        let (x, y) = (b.x1.round() as i32, b.y1.round() as i32);
        let w = (b.x2 - b.x1).round().max(1.0) as u32;
        let h = (b.y2 - b.y1).round().max(1.0) as u32;
        draw_hollow_rect_mut(img, Rect::at(x, y).of_size(w, h), GREEN);

        let bar = ((w as f32) * det.confidence.clamp(0.0, 1.0)).round().max(1.0) as u32;
        draw_filled_rect_mut(img, Rect::at(x, (y - 5).max(0)).of_size(bar, 3), GREEN);
    }

    for e in bounces {
        let p = overlay.to_image(e.table_x, e.table_y);
        draw_filled_circle_mut(img, (p.x.round() as i32, p.y.round() as i32), MARKER_RADIUS, RED);
    }

    if banner {
        let w = (img.width() / 4).max(1);
        let h = (img.height() / 16).max(1);
        draw_filled_rect_mut(img, Rect::at(10, 10).of_size(w, h), RED);
    }
}

/// Re-read `source` and write one annotated PNG per frame into `dir`.
///
/// Returns the number of frames written.
pub fn write_preview<S: FrameSource + ?Sized>(
    source: &mut S,
    analysis: &Analysis,
    image_to_table: &Homography,
    table: &TableSpec,
    dir: &Path,
) -> Result<usize, AnalysisError> {
    fs::create_dir_all(dir).map_err(|e| AnalysisError::output(dir, e))?;
    let Some(overlay) = TableOverlay::new(image_to_table, table) else {
        log::warn!("table homography is not invertible; skipping preview");
        return Ok(0);
    };

    let events = analysis.events();
    let banner_frames = (BANNER_SECONDS * analysis.frame_rate()).ceil() as u64;
    let mut boxes = analysis.boxes.iter().peekable();
    let mut written = 0usize;

    while let Some(mut frame) = source.next_frame()? {
        while boxes.next_if(|(f, _)| *f < frame.index).is_some() {}
        let best = boxes.next_if(|(f, _)| *f == frame.index).map(|(_, d)| d);

        let seen = events.partition_point(|e| e.frame_index <= frame.index);
        let banner = seen > 0 && frame.index - events[seen - 1].frame_index < banner_frames;

        annotate_frame(&mut frame.image, &overlay, best, &events[..seen], banner);

        let path = dir.join(format!("frame_{:06}.png", frame.index));
        frame
            .image
            .save(&path)
            .map_err(|source| AnalysisError::Preview {
                path: path.display().to_string(),
                source,
            })?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{compute_homography, CalibrationPoints},
        track::BallBox,
    };

    fn overlay() -> TableOverlay {
        let calib =
            CalibrationPoints::from_pairs(&[[20.0, 10.0], [294.0, 10.0], [294.0, 162.5], [20.0, 162.5]])
                .unwrap();
        let table = TableSpec::default();
        TableOverlay::new(&compute_homography(&calib, &table).unwrap(), &table).unwrap()
    }

    #[test]
    fn outline_lands_on_calibration_corners() {
        let o = overlay();
        let tr = o.outline()[1];
        assert!((tr.x - 294.0).abs() < 1e-6 && (tr.y - 10.0).abs() < 1e-6);
    }

    #[test]
    fn draws_box_marker_and_banner() {
        let mut img = RgbImage::new(320, 180);
        let det = Detection {
            bbox: BallBox::new(100.0, 100.0, 110.0, 110.0),
            confidence: 0.8,
        };
        let ev = BounceEvent {
            frame_index: 3,
            time_seconds: 0.1,
            table_x: 2.0,
            table_y: 0.5,
            confidence: 0.8,
        };
        annotate_frame(&mut img, &overlay(), Some(&det), &[ev], true);

        assert_eq!(*img.get_pixel(100, 105), GREEN);
        // Bounce at table (2.0, 0.5) sits at pixel (220, 60).
        assert_eq!(*img.get_pixel(220, 60), RED);
        assert_eq!(*img.get_pixel(12, 12), RED);
        assert_eq!(*img.get_pixel(20, 100), CYAN);
    }
}
