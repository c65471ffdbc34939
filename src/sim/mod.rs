//! Simulation module
//!
//! All gameplay logic lives here. This module stays free of networking and
//! platform concerns:
//! - One variable-delta step per rendered frame
//! - Seeded RNG only
//! - Stable iteration order (by item/NPC id)
//! - Terrain reached only through the `Terrain` capability

pub mod body;
pub mod collision;
pub mod state;
pub mod terrain;
pub mod tick;

pub use body::{ActorBody, Pose, Wobble, sanitize_direction};
pub use collision::{
    Attachment, Collectible, CollisionOutcome, ContactKind, Owner, classify, resolve_collisions,
};
pub use state::{
    GameEvent, GroundLayout, ItemPlacement, LevelLayout, Npc, NpcState, RemoteCollect, World,
};
pub use terrain::{
    FlatGround, GaussianBump, GaussianField, GroundSample, HeightFn, Platform, PlatformOverlay,
    Terrain,
};
pub use tick::{TickInput, tick};
