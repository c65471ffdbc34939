//! Collision detection and response against collectibles
//!
//! Every item the ball touches falls into one of three tiers, decided only by
//! the item's size against the ball's radius at contact time:
//! - small enough: the ball collects it and grows,
//! - much bigger: a hard stumble, the ball is repelled like off a wall,
//! - in between: a soft stumble, the ball hops and deflects around it.

use glam::{DVec2, DVec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::body::ActorBody;
use crate::planar;
use crate::tuning::Tuning;

/// Which actor an item ended up on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    /// Our own ball
    Local,
    /// The other peer's ball (the replicated proxy)
    Remote,
}

/// Where a collected item sits on its owner, in the owner's local frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub owner: Owner,
    pub offset: DVec3,
}

/// A static item placed at level load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collectible {
    pub id: u32,
    pub position: DVec3,
    pub size: f64,
    pub collected_by: Option<Owner>,
    pub attachment: Option<Attachment>,
}

impl Collectible {
    pub fn new(id: u32, position: DVec3, size: f64) -> Self {
        Self {
            id,
            position,
            size,
            collected_by: None,
            attachment: None,
        }
    }

    pub fn is_collected(&self) -> bool {
        self.collected_by.is_some()
    }

    /// Flip to collected; returns false if it already was
    pub fn mark_collected(&mut self, owner: Owner, offset: DVec3) -> bool {
        if self.is_collected() {
            return false;
        }
        self.collected_by = Some(owner);
        self.attachment = Some(Attachment { owner, offset });
        true
    }
}

/// Response tier for a touched item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactKind {
    Collect,
    HardStumble,
    SoftStumble,
}

/// Pick the response tier for an item of `item_size` against a ball of `actor_radius`
pub fn classify(item_size: f64, actor_radius: f64, tuning: &Tuning) -> ContactKind {
    let collision = &tuning.collision;
    if item_size < actor_radius * collision.collect_threshold {
        return ContactKind::Collect;
    }
    let size_ratio = item_size / (2.0 * actor_radius);
    if size_ratio > collision.hard_stop_ratio {
        ContactKind::HardStumble
    } else {
        ContactKind::SoftStumble
    }
}

/// Overlap between the ball and an item
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    /// Planar unit vector from the item toward the ball
    pub normal: DVec2,
    /// Planar distance at which the spheres just touch, given their height difference
    pub clear_distance: f64,
    /// Current planar distance between centers
    pub planar_distance: f64,
}

impl Contact {
    /// Planar distance still needed to separate
    pub fn penetration(&self) -> f64 {
        (self.clear_distance - self.planar_distance).max(0.0)
    }
}

/// Sphere-vs-sphere overlap test in 3D, resolved along the ground plane
pub fn sphere_contact(body: &ActorBody, item_position: DVec3, touch: f64) -> Option<Contact> {
    let offset = body.position - item_position;
    if offset.length_squared() >= touch * touch {
        return None;
    }

    let flat = planar(offset);
    let planar_distance = flat.length();
    let normal = if planar_distance > 1e-9 {
        flat / planar_distance
    } else {
        // Dead center: back out the way we came
        (-body.velocity).try_normalize().unwrap_or(DVec2::X)
    };
    let clear_distance = (touch * touch - offset.y * offset.y).max(0.0).sqrt();

    Some(Contact {
        normal,
        clear_distance,
        planar_distance,
    })
}

/// A resolved touch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionOutcome {
    pub item_id: u32,
    pub kind: ContactKind,
    pub size: f64,
}

/// Test the ball against every uncollected item and apply the responses
///
/// `rng` drives the soft-stumble deflection side and wobble phase; pass a
/// seeded generator to make outcomes reproducible.
pub fn resolve_collisions<R: Rng + ?Sized>(
    body: &mut ActorBody,
    items: &mut [Collectible],
    tuning: &Tuning,
    rng: &mut R,
) -> Vec<CollisionOutcome> {
    let mut outcomes = Vec::new();

    for item in items.iter_mut().filter(|i| !i.is_collected()) {
        let touch = body.radius + item.size * tuning.collision.touch_factor;
        let Some(contact) = sphere_contact(body, item.position, touch) else {
            continue;
        };

        let kind = classify(item.size, body.radius, tuning);
        let resolved = match kind {
            ContactKind::Collect => {
                item.mark_collected(Owner::Local, body.pose().to_local(item.position));
                body.grow(item.size, tuning.physics.growth_factor);
                true
            }
            ContactKind::HardStumble => {
                hard_stumble(body, item, &contact, tuning);
                true
            }
            ContactKind::SoftStumble => soft_stumble(body, item, &contact, tuning, rng),
        };

        if resolved {
            outcomes.push(CollisionOutcome {
                item_id: item.id,
                kind,
                size: item.size,
            });
        }
    }

    outcomes
}

/// Bounce off an obstacle too big to climb
fn hard_stumble(body: &mut ActorBody, item: &Collectible, contact: &Contact, tuning: &Tuning) {
    let collision = &tuning.collision;
    let speed_before = body.speed();

    // Reverse the part of the velocity heading into the item, always leaving
    // at least `hard_min_repel` outward
    let along = body.velocity.dot(contact.normal);
    let outward = if along < 0.0 {
        -along * collision.hard_restitution
    } else {
        along
    };
    let outward = outward.max(collision.hard_min_repel);
    body.velocity += contact.normal * (outward - along);

    push_out(body, item, contact, 1.0);
    body.wobble.trigger(collision.hard_wobble, 0.0);

    if body.grounded && speed_before > collision.hard_hop_min_speed {
        body.hop(collision.hard_hop_speed);
    }
}

/// Hop over a moderate obstacle, deflecting to a random side
///
/// Only a grounded ball reacts; once airborne over the item it just gets
/// nudged out of overlap.
fn soft_stumble<R: Rng + ?Sized>(
    body: &mut ActorBody,
    item: &Collectible,
    contact: &Contact,
    tuning: &Tuning,
    rng: &mut R,
) -> bool {
    let collision = &tuning.collision;
    push_out(body, item, contact, collision.soft_correction);

    if !body.grounded {
        return false;
    }

    body.hop(collision.soft_hop_speed);
    body.velocity *= collision.soft_speed_scale;

    let side = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
    body.velocity += contact.normal.perp() * side * collision.soft_nudge;
    body.wobble.trigger(
        collision.soft_wobble,
        rng.random_range(0.0..std::f64::consts::TAU),
    );
    true
}

/// Move the ball out of overlap by `fraction` of the planar penetration
fn push_out(body: &mut ActorBody, item: &Collectible, contact: &Contact, fraction: f64) {
    let target = planar(item.position) + contact.normal * contact.clear_distance;
    let current = planar(body.position);
    let corrected = current + (target - current) * fraction.clamp(0.0, 1.0);
    body.position.x = corrected.x;
    body.position.z = corrected.y;
}
