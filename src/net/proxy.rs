//! Display-only stand-in for the other peer's ball
//!
//! Snapshots arrive at network cadence; the proxy chases a predicted point
//! (last position plus last velocity times the time since that snapshot, with
//! the lookahead capped) using a frame-rate independent exponential approach.

use glam::{DQuat, DVec2, DVec3};

use super::protocol::BallSnapshot;
use crate::approach_factor;
use crate::settings::InterpolationSettings;
use crate::sim::Pose;

#[derive(Debug, Clone, PartialEq)]
pub struct ProxyActor {
    pub position: DVec3,
    pub orientation: DQuat,
    pub radius: f64,
    target: BallSnapshot,
    /// Seconds since `target` arrived, capped at the extrapolation limit
    elapsed: f64,
}

impl ProxyActor {
    /// First snapshot: snap straight to it
    pub fn new(snapshot: BallSnapshot) -> Self {
        Self {
            position: snapshot.position(),
            orientation: snapshot.orientation(),
            radius: snapshot.r,
            target: snapshot,
            elapsed: 0.0,
        }
    }

    /// Newest snapshot wins; nothing older is kept
    pub fn set_target(&mut self, snapshot: BallSnapshot) {
        self.target = snapshot;
        self.elapsed = 0.0;
    }

    pub fn target(&self) -> &BallSnapshot {
        &self.target
    }

    pub fn velocity(&self) -> DVec2 {
        self.target.velocity()
    }

    /// Where the remote ball probably is now
    pub fn predicted(&self) -> DVec3 {
        let v = self.target.velocity();
        self.target.position() + DVec3::new(v.x, 0.0, v.y) * self.elapsed
    }

    pub fn update(&mut self, dt: f64, settings: &InterpolationSettings) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        if settings.extrapolate {
            self.elapsed = (self.elapsed + dt).min(settings.max_extrapolation.max(0.0));
        }

        let predicted = self.predicted();
        if self.position.distance(predicted) > settings.teleport_distance {
            log::debug!("Proxy too far off, snapping to snapshot");
            self.position = predicted;
            self.orientation = self.target.orientation();
            self.radius = self.target.r;
            return;
        }

        let alpha = approach_factor(settings.position_rate, dt);
        self.position = self.position.lerp(predicted, alpha);
        self.orientation = self
            .orientation
            .slerp(self.target.orientation(), alpha)
            .normalize();

        let radius_alpha = approach_factor(settings.radius_rate, dt);
        self.radius += (self.target.r - self.radius) * radius_alpha;
    }

    pub fn pose(&self) -> Pose {
        Pose {
            position: self.position,
            orientation: self.orientation,
        }
    }

    /// Distance from the displayed position to the newest reported one
    pub fn error(&self) -> f64 {
        self.position.distance(self.target.position())
    }
}
