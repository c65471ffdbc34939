//! Data-driven game balance
//!
//! Every knob the simulation reads lives here so a level or a playtest build
//! can override it from JSON. Defaults come from [`crate::consts`].

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Ball kinematics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    pub start_radius: f64,
    pub input_accel: f64,
    pub gravity: f64,
    pub slope_multiplier: f64,
    pub damping_rate: f64,
    pub bounce_threshold: f64,
    pub bounce_damping: f64,
    pub world_half_extent: f64,
    pub growth_factor: f64,
    pub wobble_decay: f64,
    pub wobble_frequency: f64,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            start_radius: ACTOR_START_RADIUS,
            input_accel: INPUT_ACCEL,
            gravity: GRAVITY,
            slope_multiplier: SLOPE_MULTIPLIER,
            damping_rate: DAMPING_RATE,
            bounce_threshold: BOUNCE_THRESHOLD,
            bounce_damping: BOUNCE_DAMPING,
            world_half_extent: WORLD_HALF_EXTENT,
            growth_factor: GROWTH_FACTOR,
            wobble_decay: WOBBLE_DECAY,
            wobble_frequency: WOBBLE_FREQUENCY,
        }
    }
}

/// Collect / stumble tiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionTuning {
    /// Items smaller than `radius * collect_threshold` are absorbed
    pub collect_threshold: f64,
    /// Share of an item's size that counts toward the contact distance
    pub touch_factor: f64,
    /// `size / (2 * radius)` above this is a wall, below it a bump to hop over
    pub hard_stop_ratio: f64,
    pub hard_restitution: f64,
    pub hard_min_repel: f64,
    pub hard_hop_speed: f64,
    pub hard_hop_min_speed: f64,
    pub hard_wobble: f64,
    pub soft_hop_speed: f64,
    pub soft_speed_scale: f64,
    pub soft_nudge: f64,
    pub soft_wobble: f64,
    pub soft_correction: f64,
}

impl Default for CollisionTuning {
    fn default() -> Self {
        Self {
            collect_threshold: COLLECT_THRESHOLD,
            touch_factor: TOUCH_FACTOR,
            hard_stop_ratio: HARD_STOP_RATIO,
            hard_restitution: HARD_RESTITUTION,
            hard_min_repel: HARD_MIN_REPEL,
            hard_hop_speed: HARD_HOP_SPEED,
            hard_hop_min_speed: HARD_HOP_MIN_SPEED,
            hard_wobble: HARD_WOBBLE,
            soft_hop_speed: SOFT_HOP_SPEED,
            soft_speed_scale: SOFT_SPEED_SCALE,
            soft_nudge: SOFT_NUDGE,
            soft_wobble: SOFT_WOBBLE,
            soft_correction: SOFT_CORRECTION,
        }
    }
}

/// Procedural terrain and level population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    pub bump_count: usize,
    /// Bumps are centered inside [-extent, extent]²
    pub extent: f64,
    pub min_amplitude: f64,
    pub max_amplitude: f64,
    pub min_radius: f64,
    pub max_radius: f64,
    pub collectible_count: usize,
    pub min_item_size: f64,
    pub max_item_size: f64,
    pub npc_count: usize,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            bump_count: 24,
            extent: WORLD_HALF_EXTENT * 0.9,
            min_amplitude: -1.5,
            max_amplitude: 4.0,
            min_radius: 4.0,
            max_radius: 14.0,
            collectible_count: 120,
            min_item_size: 0.1,
            max_item_size: 3.0,
            npc_count: 4,
        }
    }
}

/// All balance knobs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub physics: PhysicsTuning,
    pub collision: CollisionTuning,
    pub terrain: TerrainParams,
}
