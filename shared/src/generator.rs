//! Seeded procedural generation of a world's static environment.
//!
//! [`generate`] is a pure function: the seed string is folded into a `u64`
//! that seeds a `Pcg32` stream, and every value is drawn from that stream in a
//! fixed order. Two calls with the same seed and config produce identical
//! sets, down to the bit pattern of every coordinate.

use crate::environment::{EnvironmentObject, EnvironmentSet, Rect};
use crate::{OBJECT_COUNT, TREE_VARIANTS, WORLD_HEIGHT, WORLD_WIDTH};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Tunables for one generation pass.
///
/// Sizes are fractions of the world height, ranges are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub width: f32,
    pub height: f32,
    /// Target number of rocks, trees and grass combined.
    pub object_count: usize,
    pub region_count: (u32, u32),
    pub region_width: (f32, f32),
    pub region_height: (f32, f32),
    pub rock_share: f64,
    pub tree_share: f64,
    pub rock_size: (f32, f32),
    pub grass_size: (f32, f32),
    pub tree_size: (f32, f32),
    pub tree_variants: u8,
    /// Rejection-sampling budget per tree before it is placed unconstrained.
    pub max_placement_attempts: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            width: WORLD_WIDTH,
            height: WORLD_HEIGHT,
            object_count: OBJECT_COUNT,
            region_count: (6, 10),
            region_width: (1000.0, 2000.0),
            region_height: (1500.0, 3000.0),
            rock_share: 0.1,
            tree_share: 0.4,
            rock_size: (0.005, 0.010),
            grass_size: (0.003, 0.006),
            tree_size: (0.026, 0.038),
            tree_variants: TREE_VARIANTS,
            max_placement_attempts: 100,
        }
    }
}

impl GeneratorConfig {
    pub fn with_dimensions(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Splits `object_count` into (rocks, trees, grass); grass takes the remainder.
    pub fn partition(&self) -> (usize, usize, usize) {
        let total = self.object_count as f64;
        let rocks = ((total * self.rock_share).round() as usize).min(self.object_count);
        let trees = ((total * self.tree_share).round() as usize).min(self.object_count - rocks);
        (rocks, trees, self.object_count - rocks - trees)
    }
}

/// Result of placing one point with rejection sampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub attempts: u32,
    /// False when the retry budget ran out and the last draw was kept as is.
    pub constrained: bool,
}

/// 64-bit FNV-1a over the UTF-8 bytes of the seed.
pub fn seed_to_u64(seed: &str) -> u64 {
    seed.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Generates the environment for `seed`.
pub fn generate(seed: &str, config: &GeneratorConfig) -> EnvironmentSet {
    let mut rng = Pcg32::seed_from_u64(seed_to_u64(seed));

    let regions = generate_regions(&mut rng, config);
    let (rock_count, tree_count, grass_count) = config.partition();

    let mut objects = Vec::with_capacity(regions.len() + config.object_count);
    objects.extend(regions.iter().copied().map(EnvironmentObject::from_region));

    for _ in 0..rock_count {
        let (x, y) = random_point(&mut rng, config);
        let size = random_size(&mut rng, config.rock_size, config.height);
        objects.push(EnvironmentObject::Rock { x, y, size });
    }

    for _ in 0..tree_count {
        let placement = place_outside_regions(
            &mut rng,
            &regions,
            config.width,
            config.height,
            config.max_placement_attempts,
        );
        let image_index = if config.tree_variants > 0 {
            rng.gen_range(0..config.tree_variants)
        } else {
            0
        };
        let size = random_size(&mut rng, config.tree_size, config.height);
        objects.push(EnvironmentObject::Tree {
            x: placement.x,
            y: placement.y,
            size,
            image_index,
        });
    }

    for _ in 0..grass_count {
        let (x, y) = random_point(&mut rng, config);
        let size = random_size(&mut rng, config.grass_size, config.height);
        objects.push(EnvironmentObject::Grass { x, y, size });
    }

    EnvironmentSet { objects, regions }
}

fn generate_regions<R: Rng + ?Sized>(rng: &mut R, config: &GeneratorConfig) -> Vec<Rect> {
    let (min_count, max_count) = config.region_count;
    let count = rng.gen_range(min_count..=max_count.max(min_count));

    (0..count)
        .map(|_| {
            let width = rng
                .gen_range(config.region_width.0..=config.region_width.1)
                .min(config.width);
            let height = rng
                .gen_range(config.region_height.0..=config.region_height.1)
                .min(config.height);
            let x = rng.gen::<f32>() * (config.width - width);
            let y = rng.gen::<f32>() * (config.height - height);
            Rect::new(x, y, width, height)
        })
        .collect()
}

fn random_point<R: Rng + ?Sized>(rng: &mut R, config: &GeneratorConfig) -> (f32, f32) {
    (rng.gen::<f32>() * config.width, rng.gen::<f32>() * config.height)
}

fn random_size<R: Rng + ?Sized>(rng: &mut R, range: (f32, f32), height: f32) -> f32 {
    rng.gen_range(range.0..=range.1) * height
}

/// Draws points until one falls outside every region, giving up after
/// `max_attempts` draws and keeping the last one.
pub fn place_outside_regions<R: Rng + ?Sized>(
    rng: &mut R,
    regions: &[Rect],
    width: f32,
    height: f32,
    max_attempts: u32,
) -> Placement {
    let mut attempts = 0;

    loop {
        let x = rng.gen::<f32>() * width;
        let y = rng.gen::<f32>() * height;
        attempts += 1;

        if !regions.iter().any(|rect| rect.contains(x, y)) {
            return Placement {
                x,
                y,
                attempts,
                constrained: true,
            };
        }

        if attempts >= max_attempts {
            return Placement {
                x,
                y,
                attempts,
                constrained: false,
            };
        }
    }
}
