//! Procedural terrain simulation over a horizontally wrapping world.
//!
//! Irregular sample points are triangulated into a Voronoi cell graph. Plate
//! tectonics drive uplift, a drainage network and implicit stream-power
//! erosion shape the terrain, and latitude-driven climate sets biomes. A
//! [`pipeline::Generator`] runs the stages and answers height and biome
//! queries at arbitrary positions.

pub mod biomes;
pub mod climate;
pub mod erosion;
pub mod export;
pub mod geometry;
pub mod noise;
pub mod pipeline;
pub mod tectonics;
pub mod terrain;

pub use biomes::{Biome, BiomeClassifier, BiomeConfig, WhittakerClassifier};
pub use climate::ClimateConfig;
pub use erosion::ErosionConfig;
pub use geometry::{Bounds, PlanarGraph};
pub use noise::{NoiseConfig, NoiseField, NoiseFields};
pub use pipeline::{GenerationError, GenerationEvent, GenerationState, Generator, WorldConfig};
pub use tectonics::TectonicConfig;
pub use terrain::{Cell, World};
