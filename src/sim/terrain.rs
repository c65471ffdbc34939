//! Height-field terrain
//!
//! The terrain is a capability, not a concrete type: everything that needs
//! the ground (ball, collisions, NPCs, level placement) takes a [`Terrain`]
//! and only ever asks for `height`, `normal` or `query`. Swapping the rolling
//! Gaussian hills for a flat floor or a field with platforms on it changes
//! no consumer.

use glam::{DVec2, DVec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::NORMAL_EPSILON;
use crate::tuning::TerrainParams;

/// Smallest bump radius; keeps the exponent finite
const MIN_BUMP_RADIUS: f64 = 1e-3;

/// Height and unit surface normal at a point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundSample {
    pub height: f64,
    pub normal: DVec3,
}

/// Ground query capability
pub trait Terrain {
    /// Elevation at (x, z)
    fn height(&self, x: f64, z: f64) -> f64;

    /// Unit surface normal at (x, z), never pointing below the horizon
    fn normal(&self, x: f64, z: f64) -> DVec3 {
        finite_difference_normal(|x, z| self.height(x, z), x, z)
    }

    /// Height and normal together
    fn query(&self, x: f64, z: f64) -> GroundSample {
        GroundSample {
            height: self.height(x, z),
            normal: self.normal(x, z),
        }
    }
}

/// Surface normal from central differences over `height`
///
/// Uses [`NORMAL_EPSILON`] for every caller so neighbouring systems agree on
/// slope direction exactly.
pub fn finite_difference_normal<F>(height: F, x: f64, z: f64) -> DVec3
where
    F: Fn(f64, f64) -> f64,
{
    let eps = NORMAL_EPSILON;
    let dx = height(x + eps, z) - height(x - eps, z);
    let dz = height(x, z + eps) - height(x, z - eps);
    let n = DVec3::new(-dx, 2.0 * eps, -dz).normalize_or_zero();
    if n.is_finite() && n != DVec3::ZERO {
        n
    } else {
        DVec3::Y
    }
}

impl<T: Terrain + ?Sized> Terrain for &T {
    fn height(&self, x: f64, z: f64) -> f64 {
        (**self).height(x, z)
    }

    fn normal(&self, x: f64, z: f64) -> DVec3 {
        (**self).normal(x, z)
    }
}

impl<T: Terrain + ?Sized> Terrain for Box<T> {
    fn height(&self, x: f64, z: f64) -> f64 {
        (**self).height(x, z)
    }

    fn normal(&self, x: f64, z: f64) -> DVec3 {
        (**self).normal(x, z)
    }
}

/// Adapts a plain `(x, z) -> height` function into a [`Terrain`]
#[derive(Debug, Clone, Copy)]
pub struct HeightFn<F>(pub F);

impl<F> Terrain for HeightFn<F>
where
    F: Fn(f64, f64) -> f64,
{
    fn height(&self, x: f64, z: f64) -> f64 {
        (self.0)(x, z)
    }
}

/// Level floor with no relief
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatGround {
    pub height: f64,
}

impl FlatGround {
    pub fn new(height: f64) -> Self {
        Self { height }
    }
}

impl Terrain for FlatGround {
    fn height(&self, _x: f64, _z: f64) -> f64 {
        self.height
    }

    fn normal(&self, _x: f64, _z: f64) -> DVec3 {
        DVec3::Y
    }
}

/// One elliptical Gaussian hill (or dip, with negative amplitude)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianBump {
    pub center: DVec2,
    pub radii: DVec2,
    pub amplitude: f64,
}

impl GaussianBump {
    #[inline]
    pub fn height_at(&self, x: f64, z: f64) -> f64 {
        let u = (x - self.center.x) / self.radii.x;
        let v = (z - self.center.y) / self.radii.y;
        self.amplitude * (-u * u - v * v).exp()
    }
}

/// Sum of Gaussian bumps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GaussianField {
    bumps: Vec<GaussianBump>,
}

impl GaussianField {
    /// Build a field, dropping non-finite bumps and clamping radii positive
    pub fn new(bumps: Vec<GaussianBump>) -> Self {
        let bumps = bumps
            .into_iter()
            .filter(|b| b.center.is_finite() && b.radii.is_finite() && b.amplitude.is_finite())
            .map(|mut b| {
                b.radii = b.radii.abs().max(DVec2::splat(MIN_BUMP_RADIUS));
                b
            })
            .collect();
        Self { bumps }
    }

    /// Procedural hills from a seeded RNG
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, params: &TerrainParams) -> Self {
        let extent = params.extent.abs();
        let (a_lo, a_hi) = ordered(params.min_amplitude, params.max_amplitude);
        let (r_lo, r_hi) = ordered(
            params.min_radius.max(MIN_BUMP_RADIUS),
            params.max_radius.max(MIN_BUMP_RADIUS),
        );

        let bumps = (0..params.bump_count)
            .map(|_| GaussianBump {
                center: DVec2::new(
                    sample(rng, -extent, extent),
                    sample(rng, -extent, extent),
                ),
                radii: DVec2::new(sample(rng, r_lo, r_hi), sample(rng, r_lo, r_hi)),
                amplitude: sample(rng, a_lo, a_hi),
            })
            .collect();

        Self::new(bumps)
    }

    pub fn bumps(&self) -> &[GaussianBump] {
        &self.bumps
    }
}

impl Terrain for GaussianField {
    fn height(&self, x: f64, z: f64) -> f64 {
        self.bumps.iter().map(|b| b.height_at(x, z)).sum()
    }
}

/// Axis-aligned raised footprint (platform or elevator top)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub center: DVec2,
    pub half_extents: DVec2,
    pub top: f64,
}

impl Platform {
    pub fn contains(&self, x: f64, z: f64) -> bool {
        (x - self.center.x).abs() <= self.half_extents.x
            && (z - self.center.y).abs() <= self.half_extents.y
    }
}

/// A base terrain with static platforms standing on it
#[derive(Debug, Clone)]
pub struct PlatformOverlay<T> {
    pub base: T,
    pub platforms: Vec<Platform>,
}

impl<T: Terrain> PlatformOverlay<T> {
    pub fn new(base: T, platforms: Vec<Platform>) -> Self {
        Self { base, platforms }
    }
}

impl<T: Terrain> Terrain for PlatformOverlay<T> {
    fn height(&self, x: f64, z: f64) -> f64 {
        self.platforms
            .iter()
            .filter(|p| p.contains(x, z))
            .fold(self.base.height(x, z), |h, p| h.max(p.top))
    }
}

#[inline]
fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

#[inline]
fn sample<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi > lo { rng.random_range(lo..hi) } else { lo }
}
