//! World state and level layout
//!
//! A level is static placement data (terrain, platforms, items, NPC spawns)
//! that both peers build from the same seed so item ids line up. The
//! [`World`] is the live simulation built from it.

use glam::{DVec2, DVec3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::body::{ActorBody, Pose};
use super::collision::{Collectible, ContactKind, Owner};
use super::terrain::{FlatGround, GaussianBump, GaussianField, Platform, PlatformOverlay, Terrain};
use crate::tuning::{TerrainParams, Tuning};

/// Discrete things that happened during a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    /// We absorbed an item; forward to replication and audio
    Collected { item_id: u32, size: f64, radius: f64 },
    HardStumble { item_id: u32 },
    SoftStumble { item_id: u32 },
}

impl GameEvent {
    pub fn from_contact(item_id: u32, kind: ContactKind, size: f64, radius: f64) -> Self {
        match kind {
            ContactKind::Collect => GameEvent::Collected {
                item_id,
                size,
                radius,
            },
            ContactKind::HardStumble => GameEvent::HardStumble { item_id },
            ContactKind::SoftStumble => GameEvent::SoftStumble { item_id },
        }
    }
}

/// Ground description in a level file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroundLayout {
    Hills { bumps: Vec<GaussianBump> },
    Flat { height: f64 },
}

/// One item placement; y is derived from the terrain at load
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemPlacement {
    pub x: f64,
    pub z: f64,
    pub size: f64,
}

/// Static level data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelLayout {
    pub ground: GroundLayout,
    #[serde(default)]
    pub platforms: Vec<Platform>,
    pub host_spawn: DVec2,
    pub guest_spawn: DVec2,
    pub items: Vec<ItemPlacement>,
    #[serde(default)]
    pub npc_spawns: Vec<DVec2>,
}

impl LevelLayout {
    /// Procedural level: hills, scattered items, NPC spawns
    pub fn generate(seed: u64, params: &TerrainParams) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let field = GaussianField::generate(&mut rng, params);
        let extent = params.extent.abs().max(1.0);

        let (size_lo, size_hi) = if params.min_item_size <= params.max_item_size {
            (params.min_item_size, params.max_item_size)
        } else {
            (params.max_item_size, params.min_item_size)
        };

        let items = (0..params.collectible_count)
            .map(|_| {
                // Bias toward small items so there is always something to grow on
                let t: f64 = rng.random::<f64>().powi(2);
                ItemPlacement {
                    x: rng.random_range(-extent..extent),
                    z: rng.random_range(-extent..extent),
                    size: size_lo + (size_hi - size_lo) * t,
                }
            })
            .collect();

        let npc_spawns = (0..params.npc_count)
            .map(|_| {
                DVec2::new(
                    rng.random_range(-extent..extent),
                    rng.random_range(-extent..extent),
                )
            })
            .collect();

        Self {
            ground: GroundLayout::Hills {
                bumps: field.bumps().to_vec(),
            },
            platforms: Vec::new(),
            host_spawn: DVec2::new(-2.0, 0.0),
            guest_spawn: DVec2::new(2.0, 0.0),
            items,
            npc_spawns,
        }
    }

    /// Flat secondary level with the same items
    pub fn flattened(&self) -> Self {
        Self {
            ground: GroundLayout::Flat { height: 0.0 },
            ..self.clone()
        }
    }

    pub fn build_terrain(&self) -> Box<dyn Terrain> {
        match (&self.ground, self.platforms.is_empty()) {
            (GroundLayout::Hills { bumps }, true) => Box::new(GaussianField::new(bumps.clone())),
            (GroundLayout::Hills { bumps }, false) => Box::new(PlatformOverlay::new(
                GaussianField::new(bumps.clone()),
                self.platforms.clone(),
            )),
            (GroundLayout::Flat { height }, true) => Box::new(FlatGround::new(*height)),
            (GroundLayout::Flat { height }, false) => Box::new(PlatformOverlay::new(
                FlatGround::new(*height),
                self.platforms.clone(),
            )),
        }
    }
}

/// Replicated NPC pose
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NpcState {
    pub position: DVec3,
    pub yaw: f64,
}

/// A wandering critter, simulated by the host only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    pub id: u32,
    pub position: DVec3,
    pub yaw: f64,
    pub speed: f64,
    /// Seconds until the next heading change
    pub turn_timer: f64,
}

impl Npc {
    pub fn new<T: Terrain + ?Sized>(id: u32, terrain: &T, spawn: DVec2) -> Self {
        Self {
            id,
            position: DVec3::new(spawn.x, terrain.height(spawn.x, spawn.y), spawn.y),
            yaw: 0.0,
            speed: 1.5,
            turn_timer: 0.0,
        }
    }

    /// Walk forward, occasionally picking a new heading, turning around at the wall
    pub fn wander<T: Terrain + ?Sized, R: Rng + ?Sized>(
        &mut self,
        terrain: &T,
        rng: &mut R,
        dt: f64,
        half_extent: f64,
    ) {
        self.turn_timer -= dt;
        if self.turn_timer <= 0.0 {
            self.yaw += rng.random_range(-1.2..1.2);
            self.turn_timer = rng.random_range(1.0..3.0);
        }

        self.position.x += self.yaw.sin() * self.speed * dt;
        self.position.z += self.yaw.cos() * self.speed * dt;

        let limit = half_extent.abs();
        if self.position.x.abs() > limit || self.position.z.abs() > limit {
            self.position.x = self.position.x.clamp(-limit, limit);
            self.position.z = self.position.z.clamp(-limit, limit);
            self.yaw += std::f64::consts::PI;
        }
        self.yaw = self.yaw.rem_euclid(std::f64::consts::TAU);
        self.position.y = terrain.height(self.position.x, self.position.z);
    }

    pub fn state(&self) -> NpcState {
        NpcState {
            position: self.position,
            yaw: self.yaw,
        }
    }
}

/// What a `collect` message from the other peer did locally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCollect {
    /// Newly marked collected and attached to the proxy
    Applied,
    /// We collected it ourselves; the message is an acknowledgement
    AlreadyOurs,
    /// Already applied from an earlier message
    Duplicate,
    /// No item with that id in this level
    Unknown,
}

/// Live simulation for one peer
pub struct World {
    pub seed: u64,
    pub(crate) rng: Pcg32,
    pub(crate) terrain: Box<dyn Terrain>,
    pub tuning: Tuning,
    pub body: ActorBody,
    pub collectibles: Vec<Collectible>,
    pub npcs: Vec<Npc>,
    /// Simulated seconds
    pub time: f64,
}

impl World {
    /// Build a world from a layout, spawning our ball at `spawn`
    pub fn new(layout: &LevelLayout, spawn: DVec2, tuning: Tuning, seed: u64) -> Self {
        let terrain = layout.build_terrain();
        Self::with_terrain(terrain, layout, spawn, tuning, seed)
    }

    /// Same as [`World::new`] but on a caller-provided terrain
    pub fn with_terrain(
        terrain: Box<dyn Terrain>,
        layout: &LevelLayout,
        spawn: DVec2,
        tuning: Tuning,
        seed: u64,
    ) -> Self {
        let body = ActorBody::new(terrain.as_ref(), spawn, tuning.physics.start_radius);

        let collectibles = layout
            .items
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let y = terrain.height(p.x, p.z) + p.size * 0.5;
                Collectible::new(i as u32, DVec3::new(p.x, y, p.z), p.size)
            })
            .collect();

        let npcs = layout
            .npc_spawns
            .iter()
            .enumerate()
            .map(|(i, &spawn)| Npc::new(i as u32, terrain.as_ref(), spawn))
            .collect();

        log::info!(
            "World ready: seed={}, {} items, {} npcs",
            seed,
            layout.items.len(),
            layout.npc_spawns.len()
        );

        Self {
            seed,
            // Separate stream from level generation so stumbles don't echo the layout
            rng: Pcg32::new(seed, 0xa02b_dbf7_bb3c_0a7),
            terrain,
            tuning,
            body,
            collectibles,
            npcs,
            time: 0.0,
        }
    }

    pub fn terrain(&self) -> &dyn Terrain {
        self.terrain.as_ref()
    }

    /// Swap the ground under the same items and ball (e.g. a flat secondary level)
    pub fn set_terrain(&mut self, terrain: Box<dyn Terrain>) {
        self.terrain = terrain;
        self.body.settle(self.terrain.as_ref());
    }

    pub fn collectible(&self, id: u32) -> Option<&Collectible> {
        self.collectibles.iter().find(|c| c.id == id)
    }

    pub fn collected_count(&self, owner: Owner) -> usize {
        self.collectibles
            .iter()
            .filter(|c| c.collected_by == Some(owner))
            .count()
    }

    /// Apply a `collect` from the other peer, attaching the item to `proxy` if known
    pub fn apply_remote_collect(&mut self, id: u32, proxy: Option<Pose>) -> RemoteCollect {
        let Some(item) = self.collectibles.iter_mut().find(|c| c.id == id) else {
            log::warn!("Remote collect for unknown item {}", id);
            return RemoteCollect::Unknown;
        };

        match item.collected_by {
            Some(Owner::Local) => RemoteCollect::AlreadyOurs,
            Some(Owner::Remote) => RemoteCollect::Duplicate,
            None => {
                let offset = proxy.map(|p| p.to_local(item.position)).unwrap_or(DVec3::ZERO);
                item.mark_collected(Owner::Remote, offset);
                RemoteCollect::Applied
            }
        }
    }

    /// NPC poses for broadcasting
    pub fn npc_states(&self) -> Vec<NpcState> {
        self.npcs.iter().map(Npc::state).collect()
    }

    /// Overwrite NPC poses from the host; extra entries are ignored
    pub fn apply_npc_states(&mut self, states: &[NpcState]) {
        for (npc, state) in self.npcs.iter_mut().zip(states) {
            npc.position = state.position;
            npc.yaw = state.yaw;
        }
    }
}
