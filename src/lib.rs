//! Rollout - a growing rolling ball on procedural terrain, replicated between two peers
//!
//! Core modules:
//! - `sim`: Simulation (terrain, ball kinematics, collisions, world state)
//! - `net`: Peer-to-peer replication (transport, wire protocol, remote proxy)
//! - `tuning`: Data-driven game balance
//! - `settings`: Session and interpolation preferences

pub mod net;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use settings::Settings;
pub use tuning::Tuning;

use glam::{DVec2, DVec3};

/// Game configuration constants
pub mod consts {
    /// Nominal simulation timestep (one step per rendered frame at 60 Hz)
    pub const SIM_DT: f64 = 1.0 / 60.0;

    /// Ball defaults
    pub const ACTOR_START_RADIUS: f64 = 0.5;
    /// Player acceleration at the starting radius (units/s²)
    pub const INPUT_ACCEL: f64 = 14.0;
    pub const GRAVITY: f64 = 18.0;
    /// Scale on the tangential part of gravity while grounded
    pub const SLOPE_MULTIPLIER: f64 = 1.0;
    /// Exponential planar damping rate (1/s)
    pub const DAMPING_RATE: f64 = 1.2;
    /// Landing speed above which the ball bounces instead of settling
    pub const BOUNCE_THRESHOLD: f64 = 3.0;
    pub const BOUNCE_DAMPING: f64 = 0.2;
    /// Play area is the square [-HALF_EXTENT, HALF_EXTENT]²
    pub const WORLD_HALF_EXTENT: f64 = 60.0;
    /// Radius gained per unit of collected item size
    pub const GROWTH_FACTOR: f64 = 0.15;

    /// Wobble (visual tilt only)
    pub const WOBBLE_DECAY: f64 = 3.0;
    pub const WOBBLE_FREQUENCY: f64 = 14.0;

    /// Collision tiers
    pub const COLLECT_THRESHOLD: f64 = 0.75;
    pub const TOUCH_FACTOR: f64 = 0.5;
    pub const HARD_STOP_RATIO: f64 = 1.0;
    pub const HARD_RESTITUTION: f64 = 1.3;
    pub const HARD_MIN_REPEL: f64 = 1.5;
    pub const HARD_HOP_SPEED: f64 = 2.0;
    pub const HARD_HOP_MIN_SPEED: f64 = 0.5;
    pub const HARD_WOBBLE: f64 = 1.0;
    pub const SOFT_HOP_SPEED: f64 = 4.0;
    pub const SOFT_SPEED_SCALE: f64 = 0.55;
    pub const SOFT_NUDGE: f64 = 2.5;
    pub const SOFT_WOBBLE: f64 = 0.45;
    pub const SOFT_CORRECTION: f64 = 0.5;

    /// Finite-difference step shared by every terrain normal query
    pub const NORMAL_EPSILON: f64 = 0.05;

    /// Replication
    pub const NPC_RATE_HZ: f64 = 10.0;
    pub const START_RESEND_DELAYS: [f64; 5] = [0.0, 0.25, 0.5, 1.0, 2.0];
    pub const PROXY_POSITION_RATE: f64 = 12.0;
    pub const PROXY_RADIUS_RATE: f64 = 4.0;
    /// Longest stretch the proxy keeps dead-reckoning without a fresh snapshot
    pub const MAX_EXTRAPOLATION: f64 = 0.25;
    /// Proxy error beyond which it jumps instead of gliding
    pub const PROXY_TELEPORT_DISTANCE: f64 = 10.0;
    /// Sanity bounds on incoming snapshots
    pub const MAX_WIRE_COORD: f64 = 1.0e4;
    pub const MAX_WIRE_SPEED: f64 = 500.0;
    pub const MAX_WIRE_RADIUS: f64 = 1.0e3;
}

/// Fraction of the remaining distance covered in `dt` by an exponential approach
#[inline]
pub fn approach_factor(rate: f64, dt: f64) -> f64 {
    1.0 - (-rate * dt).exp()
}

/// Horizontal (x, z) part of a world vector
#[inline]
pub fn planar(v: DVec3) -> DVec2 {
    DVec2::new(v.x, v.z)
}

/// Lift a horizontal (x, z) vector back into world space at height `y`
#[inline]
pub fn from_planar(v: DVec2, y: f64) -> DVec3 {
    DVec3::new(v.x, y, v.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approach_factor_bounds() {
        assert_eq!(approach_factor(10.0, 0.0), 0.0);
        let a = approach_factor(10.0, 1.0 / 60.0);
        assert!(a > 0.0 && a < 1.0);
        assert!(approach_factor(10.0, 100.0) > 0.999);
    }

    #[test]
    fn test_planar_round_trip_keeps_height() {
        let v = DVec3::new(1.0, 2.0, 3.0);
        assert_eq!(planar(v), DVec2::new(1.0, 3.0));
        assert_eq!(from_planar(planar(v), 2.0), v);
    }
}
