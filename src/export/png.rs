//! 16-bit PNG heightmap export.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use glam::DVec2;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::ImageEncoder;
use rayon::prelude::*;

use super::{pixel_center, ExportError, RasterSize};
use crate::pipeline::Generator;

/// Options for height export.
#[derive(Debug, Clone)]
pub struct PngExportOptions {
    pub size: RasterSize,
    /// Height mapped to 0. `None` uses the world's lowest height minus the overlay amplitude.
    pub min_height: Option<f64>,
    /// Height mapped to 65535. `None` uses the world's highest height plus the overlay amplitude.
    pub max_height: Option<f64>,
    pub compression: CompressionType,
    pub filter: FilterType,
}

impl Default for PngExportOptions {
    fn default() -> Self {
        Self {
            size: RasterSize::default(),
            min_height: None,
            max_height: None,
            compression: CompressionType::Default,
            filter: FilterType::Adaptive,
        }
    }
}

/// Samples `height_at` at every pixel centre of the world rectangle.
pub fn sample_heights(generator: &Generator, size: RasterSize) -> Result<Vec<f64>, ExportError> {
    let bounds = generator.config().bounds;
    let rows: Result<Vec<Vec<f64>>, ExportError> = (0..size.height)
        .into_par_iter()
        .map(|y| {
            (0..size.width)
                .map(|x| -> Result<f64, ExportError> {
                    let p: DVec2 = pixel_center(bounds, size, x, y);
                    Ok(generator.height_at(p)?)
                })
                .collect()
        })
        .collect();
    Ok(rows?.into_iter().flatten().collect())
}

/// Exports the world as a 16-bit grayscale PNG heightmap.
///
/// # Arguments
/// * `generator` - A completed generator
/// * `path` - Output file path
/// * `options` - Raster size and height range for normalization
pub fn export_height_png(
    generator: &Generator,
    path: &Path,
    options: &PngExportOptions,
) -> Result<(), ExportError> {
    let heights = sample_heights(generator, options.size)?;

    let amplitude = generator.config().noise.height_overlay_amplitude.abs();
    let (world_min, world_max) = generator
        .world()
        .map(|w| w.height_range())
        .unwrap_or((0.0, 0.0));
    let min = options.min_height.unwrap_or(world_min - amplitude);
    let max = options.max_height.unwrap_or(world_max + amplitude);
    if min >= max {
        return Err(ExportError::InvalidHeightRange(min, max));
    }

    let range = max - min;
    let pixels: Vec<u16> = heights
        .iter()
        .map(|h| (((h - min) / range).clamp(0.0, 1.0) * 65535.0) as u16)
        .collect();

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder = PngEncoder::new_with_quality(writer, options.compression, options.filter);
    let bytes: &[u8] = bytemuck::cast_slice(&pixels);
    encoder.write_image(
        bytes,
        options.size.width,
        options.size.height,
        image::ExtendedColorType::L16,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Bounds;
    use crate::pipeline::{GenerationError, WorldConfig};
    use tempfile::tempdir;

    fn small_generator() -> Generator {
        let mut config = WorldConfig::new(5, Bounds::new(400.0, 300.0));
        config.min_cell_distance = 20.0;
        config.erosion.max_iterations = 5;
        Generator::new(config)
    }

    #[test]
    fn export_height_png_smoke() {
        let mut generator = small_generator();
        generator.run().unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("height.png");
        let options = PngExportOptions {
            size: RasterSize::new(40, 30),
            ..Default::default()
        };
        export_height_png(&generator, &path, &options).unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (40, 30));
    }

    #[test]
    fn export_requires_completed_world() {
        let generator = small_generator();
        let dir = tempdir().unwrap();
        let err = export_height_png(&generator, &dir.path().join("h.png"), &PngExportOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ExportError::Generation(GenerationError::InvalidState { .. })
        ));
    }

    #[test]
    fn explicit_range_must_be_ordered() {
        let mut generator = small_generator();
        generator.run().unwrap();
        let dir = tempdir().unwrap();
        let options = PngExportOptions {
            size: RasterSize::new(8, 8),
            min_height: Some(10.0),
            max_height: Some(10.0),
            ..Default::default()
        };
        let err = export_height_png(&generator, &dir.path().join("h.png"), &options).unwrap_err();
        assert!(matches!(err, ExportError::InvalidHeightRange(_, _)));
    }
}
