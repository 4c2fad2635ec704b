//! Export module for PNG previews of a completed world.
//!
//! Rasters cover the world rectangle and are sampled through the
//! generator's query surface at pixel centres.

mod biome_map;
mod png;

use glam::DVec2;
use thiserror::Error;

use crate::geometry::Bounds;
use crate::pipeline::GenerationError;

pub use biome_map::{export_biome_map_png, sample_dominant_biomes, BiomeMapOptions};
pub use png::{export_height_png, sample_heights, PngExportOptions};

/// Errors that can occur during export.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid height range: min ({0}) >= max ({1})")]
    InvalidHeightRange(f64, f64),
    #[error("World query failed: {0}")]
    Generation(#[from] GenerationError),
}

/// Output raster dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterSize {
    pub width: u32,
    pub height: u32,
}

impl Default for RasterSize {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
        }
    }
}

impl RasterSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Keeps the world's aspect ratio with the given pixel width.
    pub fn fit_width(bounds: Bounds, width: u32) -> Self {
        let height = (width as f64 * bounds.height / bounds.width).round().max(1.0) as u32;
        Self {
            width: width.max(1),
            height,
        }
    }
}

fn pixel_center(bounds: Bounds, size: RasterSize, x: u32, y: u32) -> DVec2 {
    DVec2::new(
        (x as f64 + 0.5) * bounds.width / size.width as f64,
        (y as f64 + 0.5) * bounds.height / size.height as f64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_width_keeps_aspect() {
        let size = RasterSize::fit_width(Bounds::new(2000.0, 1000.0), 512);
        assert_eq!(size, RasterSize::new(512, 256));
    }

    #[test]
    fn pixel_centers_stay_inside_bounds() {
        let bounds = Bounds::new(100.0, 50.0);
        let size = RasterSize::new(10, 5);
        assert_eq!(pixel_center(bounds, size, 0, 0), DVec2::new(5.0, 5.0));
        let last = pixel_center(bounds, size, 9, 4);
        assert!(bounds.contains(last));
    }
}
