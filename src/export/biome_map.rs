//! Biome preview map export.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::ImageEncoder;
use rayon::prelude::*;

use super::{pixel_center, ExportError, RasterSize};
use crate::biomes::Biome;
use crate::pipeline::Generator;

/// Options for biome map export.
#[derive(Debug, Clone)]
pub struct BiomeMapOptions {
    pub size: RasterSize,
    pub compression: CompressionType,
    pub filter: FilterType,
    /// RGB color used for ocean.
    pub ocean_color: [u8; 3],
}

impl Default for BiomeMapOptions {
    fn default() -> Self {
        Self {
            size: RasterSize::default(),
            compression: CompressionType::Default,
            filter: FilterType::Adaptive,
            ocean_color: [15, 40, 90],
        }
    }
}

/// Biome with the largest blend weight at every pixel centre.
pub fn sample_dominant_biomes(
    generator: &Generator,
    size: RasterSize,
) -> Result<Vec<Biome>, ExportError> {
    let bounds = generator.config().bounds;
    let rows: Result<Vec<Vec<Biome>>, ExportError> = (0..size.height)
        .into_par_iter()
        .map(|y| {
            (0..size.width)
                .map(|x| -> Result<Biome, ExportError> {
                    Ok(generator.dominant_biome(pixel_center(bounds, size, x, y))?)
                })
                .collect()
        })
        .collect();
    Ok(rows?.into_iter().flatten().collect())
}

/// Exports the dominant biome of every pixel as an RGB PNG.
pub fn export_biome_map_png(
    generator: &Generator,
    path: &Path,
    options: &BiomeMapOptions,
) -> Result<(), ExportError> {
    let biomes = sample_dominant_biomes(generator, options.size)?;

    let mut rgb = Vec::with_capacity(biomes.len() * 3);
    for biome in biomes {
        let c = if biome.is_land() {
            biome.preview_rgb()
        } else {
            options.ocean_color
        };
        rgb.extend_from_slice(&c);
    }

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder = PngEncoder::new_with_quality(writer, options.compression, options.filter);
    encoder.write_image(
        &rgb,
        options.size.width,
        options.size.height,
        image::ExtendedColorType::Rgb8,
    )?;

    Ok(())
}
