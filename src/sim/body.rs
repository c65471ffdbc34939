//! Kinematic rolling ball
//!
//! The ball is either Grounded (y pinned to the terrain surface every step)
//! or Airborne (y integrated under gravity until it meets the ground). A
//! separate wobble only tilts the rendered ball and never moves it.

use glam::{DQuat, DVec2, DVec3};
use serde::{Deserialize, Serialize};

use super::terrain::Terrain;
use crate::from_planar;
use crate::tuning::PhysicsTuning;

/// Direction inputs shorter than this are treated as no input
const MIN_INPUT: f64 = 1e-6;
/// Below this planar speed the ball does not spin
const MIN_ROLL_SPEED: f64 = 1e-9;

/// Visual tilt left behind by a stumble
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Wobble {
    /// Peak tilt (radians), decays to zero
    pub amplitude: f64,
    pub phase: f64,
}

impl Wobble {
    /// Start a wobble; a weaker hit never cuts short a stronger one
    pub fn trigger(&mut self, amplitude: f64, phase: f64) {
        if amplitude.is_finite() && amplitude > self.amplitude {
            self.amplitude = amplitude;
            self.phase = phase;
        }
    }

    pub fn update(&mut self, dt: f64, decay: f64, frequency: f64) {
        if self.amplitude <= 0.0 {
            return;
        }
        self.amplitude *= (-decay * dt).exp();
        self.phase = (self.phase + frequency * dt) % std::f64::consts::TAU;
        if self.amplitude < 1e-4 {
            self.amplitude = 0.0;
        }
    }

    /// Current tilt angle
    pub fn tilt(&self) -> f64 {
        self.amplitude * self.phase.sin()
    }

    pub fn is_active(&self) -> bool {
        self.amplitude > 0.0
    }
}

/// One rolling sphere
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorBody {
    pub position: DVec3,
    /// Planar velocity (x, z)
    pub velocity: DVec2,
    pub vertical_velocity: f64,
    pub radius: f64,
    /// Radius at spawn; input response is scaled against it
    pub start_radius: f64,
    pub grounded: bool,
    pub orientation: DQuat,
    pub wobble: Wobble,
}

impl ActorBody {
    /// Spawn a grounded ball resting on the terrain at `spawn` (x, z)
    pub fn new<T: Terrain + ?Sized>(terrain: &T, spawn: DVec2, radius: f64) -> Self {
        let radius = if radius.is_finite() && radius > 0.0 {
            radius
        } else {
            crate::consts::ACTOR_START_RADIUS
        };
        let mut body = Self {
            position: from_planar(spawn, 0.0),
            velocity: DVec2::ZERO,
            vertical_velocity: 0.0,
            radius,
            start_radius: radius,
            grounded: true,
            orientation: DQuat::IDENTITY,
            wobble: Wobble::default(),
        };
        body.settle(terrain);
        body
    }

    /// Planar speed
    pub fn speed(&self) -> f64 {
        self.velocity.length()
    }

    /// Multiplier on player acceleration: `(r₀ / r)^0.5`
    pub fn input_scale(&self) -> f64 {
        (self.start_radius / self.radius).sqrt()
    }

    /// Advance one frame
    pub fn step<T: Terrain + ?Sized>(
        &mut self,
        terrain: &T,
        direction: DVec2,
        dt: f64,
        tuning: &PhysicsTuning,
    ) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }

        // Player input, weaker for bigger balls
        let direction = sanitize_direction(direction);
        self.velocity += direction * tuning.input_accel * self.input_scale() * dt;

        // Downhill pull: gravity minus its component along the normal
        if self.grounded {
            let normal = terrain.normal(self.position.x, self.position.z);
            let gravity = DVec3::new(0.0, -tuning.gravity, 0.0);
            let tangential = gravity - normal * gravity.dot(normal);
            self.velocity += DVec2::new(tangential.x, tangential.z) * tuning.slope_multiplier * dt;
        }

        self.velocity *= (-tuning.damping_rate * dt).exp();

        self.position.x += self.velocity.x * dt;
        self.position.z += self.velocity.y * dt;
        self.clamp_to_bounds(tuning.world_half_extent);

        self.resolve_vertical(terrain, dt, tuning);
        self.roll(dt);
        self.wobble
            .update(dt, tuning.wobble_decay, tuning.wobble_frequency);
    }

    /// Hard square wall: stop at the edge, drop the velocity pushing outward
    fn clamp_to_bounds(&mut self, half_extent: f64) {
        let limit = half_extent.abs();
        if self.position.x.abs() > limit {
            self.position.x = self.position.x.clamp(-limit, limit);
            if self.velocity.x * self.position.x > 0.0 {
                self.velocity.x = 0.0;
            }
        }
        if self.position.z.abs() > limit {
            self.position.z = self.position.z.clamp(-limit, limit);
            if self.velocity.y * self.position.z > 0.0 {
                self.velocity.y = 0.0;
            }
        }
    }

    fn resolve_vertical<T: Terrain + ?Sized>(&mut self, terrain: &T, dt: f64, tuning: &PhysicsTuning) {
        let floor = terrain.height(self.position.x, self.position.z) + self.radius;

        if self.grounded {
            self.position.y = floor;
            self.vertical_velocity = 0.0;
            return;
        }

        self.vertical_velocity -= tuning.gravity * dt;
        self.position.y += self.vertical_velocity * dt;

        if self.position.y <= floor {
            self.position.y = floor;
            if -self.vertical_velocity > tuning.bounce_threshold {
                self.vertical_velocity = -self.vertical_velocity * tuning.bounce_damping;
            } else {
                self.vertical_velocity = 0.0;
                self.grounded = true;
            }
        }
    }

    /// Spin about the horizontal axis perpendicular to travel, matching arc length
    fn roll(&mut self, dt: f64) {
        let speed = self.speed();
        if speed < MIN_ROLL_SPEED {
            return;
        }
        let axis = DVec3::new(self.velocity.y, 0.0, -self.velocity.x) / speed;
        let angle = speed * dt / self.radius;
        self.orientation = (DQuat::from_axis_angle(axis, angle) * self.orientation).normalize();
    }

    /// Absorb an item: the radius only ever grows
    pub fn grow(&mut self, item_size: f64, growth_factor: f64) {
        let delta = item_size * growth_factor;
        if !delta.is_finite() || delta <= 0.0 {
            return;
        }
        self.radius += delta;
        if self.grounded {
            self.position.y += delta;
        } else {
            self.position.y = self.position.y.max(self.radius);
        }
    }

    /// Leave the ground with at least `speed` upward
    pub fn hop(&mut self, speed: f64) {
        if !speed.is_finite() || speed <= 0.0 {
            return;
        }
        self.vertical_velocity = self.vertical_velocity.max(speed);
        self.grounded = false;
    }

    /// Re-pin a grounded ball after its x/z were moved outside `step`
    pub fn settle<T: Terrain + ?Sized>(&mut self, terrain: &T) {
        if self.grounded {
            self.position.y = terrain.height(self.position.x, self.position.z) + self.radius;
            self.vertical_velocity = 0.0;
        }
    }

    pub fn pose(&self) -> Pose {
        Pose {
            position: self.position,
            orientation: self.orientation,
        }
    }
}

/// Where an actor is and how it is turned
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: DVec3,
    pub orientation: DQuat,
}

impl Pose {
    /// A world point expressed in this frame
    pub fn to_local(&self, world_point: DVec3) -> DVec3 {
        self.orientation.inverse() * (world_point - self.position)
    }
}

/// Unit direction, or zero for missing/degenerate input
pub fn sanitize_direction(direction: DVec2) -> DVec2 {
    if !direction.is_finite() {
        return DVec2::ZERO;
    }
    let len = direction.length();
    if len < MIN_INPUT {
        DVec2::ZERO
    } else if len > 1.0 {
        direction / len
    } else {
        direction
    }
}
