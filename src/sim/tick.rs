//! Per-frame simulation step
//!
//! One call per rendered frame: move the ball, walk the NPCs (when we are
//! the authority), resolve collisions, re-pin the ball to the ground.

use glam::DVec2;

use super::collision::{ContactKind, resolve_collisions};
use super::state::{GameEvent, World};

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Camera-relative planar direction, unit length or zero
    pub direction: DVec2,
    /// Run NPC wandering locally (host or solo); guests receive NPCs instead
    pub simulate_npcs: bool,
}

/// Advance the world by `dt` seconds
pub fn tick(world: &mut World, input: &TickInput, dt: f64) -> Vec<GameEvent> {
    if !dt.is_finite() || dt <= 0.0 {
        return Vec::new();
    }
    world.time += dt;

    let terrain = world.terrain.as_ref();
    let tuning = &world.tuning;
    let body = &mut world.body;
    let rng = &mut world.rng;

    body.step(terrain, input.direction, dt, &tuning.physics);

    if input.simulate_npcs {
        for npc in world.npcs.iter_mut() {
            npc.wander(terrain, rng, dt, tuning.physics.world_half_extent);
        }
    }

    let outcomes = resolve_collisions(body, &mut world.collectibles, tuning, rng);
    body.settle(terrain);

    outcomes
        .into_iter()
        .map(|o| {
            if o.kind == ContactKind::Collect {
                log::debug!(
                    "Collected item {} (size {:.2}) -> radius {:.3}",
                    o.item_id,
                    o.size,
                    body.radius
                );
            }
            GameEvent::from_contact(o.item_id, o.kind, o.size, body.radius)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::collision::Owner;
    use crate::sim::state::{GroundLayout, ItemPlacement, LevelLayout};
    use crate::tuning::{TerrainParams, Tuning};

    fn lane_layout() -> LevelLayout {
        LevelLayout {
            ground: GroundLayout::Flat { height: 0.0 },
            platforms: Vec::new(),
            host_spawn: DVec2::ZERO,
            guest_spawn: DVec2::new(0.0, 5.0),
            items: (1..=10)
                .map(|i| ItemPlacement {
                    x: i as f64 * 1.5,
                    z: 0.0,
                    size: 0.2,
                })
                .collect(),
            npc_spawns: vec![DVec2::new(-10.0, -10.0)],
        }
    }

    #[test]
    fn test_rolling_through_items_collects_and_grows() {
        let layout = lane_layout();
        let mut world = World::new(&layout, layout.host_spawn, Tuning::default(), 1);
        let input = TickInput {
            direction: DVec2::X,
            simulate_npcs: false,
        };

        let mut collected = 0;
        let mut last_radius = world.body.radius;
        for _ in 0..600 {
            for event in tick(&mut world, &input, SIM_DT) {
                if let GameEvent::Collected { radius, .. } = event {
                    collected += 1;
                    assert!(radius >= last_radius);
                    last_radius = radius;
                }
            }
            assert!(world.body.grounded);
            assert_eq!(world.body.position.y, world.body.radius);
        }
        assert_eq!(collected, 10);
        assert_eq!(world.collected_count(Owner::Local), 10);
        let expected = 0.5 + 10.0 * 0.2 * world.tuning.physics.growth_factor;
        assert!((world.body.radius - expected).abs() < 1e-9);
    }

    #[test]
    fn test_npcs_only_move_with_authority() {
        let layout = lane_layout();
        let mut world = World::new(&layout, layout.host_spawn, Tuning::default(), 1);
        let before = world.npc_states();

        tick(&mut world, &TickInput::default(), SIM_DT);
        assert_eq!(world.npc_states(), before);

        let host = TickInput {
            simulate_npcs: true,
            ..Default::default()
        };
        tick(&mut world, &host, SIM_DT);
        assert_ne!(world.npc_states(), before);
    }

    #[test]
    fn test_bad_dt_is_ignored() {
        let layout = lane_layout();
        let mut world = World::new(&layout, layout.host_spawn, Tuning::default(), 1);
        let body = world.body.clone();
        assert!(tick(&mut world, &TickInput::default(), f64::NAN).is_empty());
        assert!(tick(&mut world, &TickInput::default(), -1.0).is_empty());
        assert_eq!(world.body, body);
        assert_eq!(world.time, 0.0);
    }

    #[test]
    fn test_determinism() {
        let layout = LevelLayout::generate(99, &TerrainParams::default());
        let mut a = World::new(&layout, layout.host_spawn, Tuning::default(), 99);
        let mut b = World::new(&layout, layout.host_spawn, Tuning::default(), 99);

        for i in 0..900 {
            let angle = i as f64 * 0.01;
            let input = TickInput {
                direction: DVec2::new(angle.cos(), angle.sin()),
                simulate_npcs: true,
            };
            let ea = tick(&mut a, &input, SIM_DT);
            let eb = tick(&mut b, &input, SIM_DT);
            assert_eq!(ea, eb);
        }
        assert_eq!(a.body, b.body);
        assert_eq!(a.npc_states(), b.npc_states());
    }

    #[test]
    fn test_grounded_invariant_on_hills() {
        let layout = LevelLayout::generate(21, &TerrainParams::default());
        let mut world = World::new(&layout, layout.host_spawn, Tuning::default(), 21);
        let input = TickInput {
            direction: DVec2::new(0.6, 0.8),
            simulate_npcs: true,
        };
        for _ in 0..1200 {
            tick(&mut world, &input, SIM_DT);
            if world.body.grounded {
                let p = world.body.position;
                assert_eq!(p.y, world.terrain().height(p.x, p.z) + world.body.radius);
            }
        }
    }
}
