//! One player's side of a match: a local world plus its replication session

use glam::DVec2;

use super::channel::{Role, Room, Transport};
use super::session::{ReplicationSession, SessionEvent};
use crate::settings::Settings;
use crate::sim::{GameEvent, LevelLayout, RemoteCollect, TickInput, World, tick};

/// What happened during one [`Peer::frame`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Local simulation events
    pub events: Vec<GameEvent>,
    /// Remote collections and how they landed locally
    pub remote_collects: Vec<(u32, RemoteCollect)>,
    pub started: bool,
    pub disconnected: bool,
}

pub struct Peer<T: Transport> {
    pub world: World,
    pub session: ReplicationSession<T>,
}

impl<T: Transport> Peer<T> {
    pub fn new(
        room: &Room,
        layout: &LevelLayout,
        transport: T,
        settings: &Settings,
        seed: u64,
    ) -> Self {
        let spawn = match room.role {
            Role::Host => layout.host_spawn,
            Role::Guest => layout.guest_spawn,
        };
        log::info!("Peer {} joining {}", room.role, room.channel_name());
        Self {
            world: World::new(layout, spawn, settings.tuning.clone(), seed),
            session: ReplicationSession::new(room.role, transport, settings),
        }
    }

    pub fn begin_match(&mut self) {
        self.session.begin_match();
    }

    /// Gameplay runs once started, or whenever there is nobody to wait for
    pub fn is_playing(&self) -> bool {
        self.session.is_started() || !self.session.is_connected()
    }

    /// Receive, simulate, broadcast, smooth
    pub fn frame(&mut self, direction: DVec2, dt: f64) -> FrameReport {
        let mut report = FrameReport::default();

        for event in self.session.poll() {
            match event {
                SessionEvent::Started => report.started = true,
                SessionEvent::RemoteCollect { id, .. } => {
                    let proxy = self.session.proxy().map(|p| p.pose());
                    let outcome = self.world.apply_remote_collect(id, proxy);
                    report.remote_collects.push((id, outcome));
                }
                SessionEvent::NpcUpdate(states) => self.world.apply_npc_states(&states),
                SessionEvent::Disconnected => report.disconnected = true,
            }
        }

        if self.is_playing() {
            let connected = self.session.is_connected();
            let input = TickInput {
                direction,
                // Without a host to listen to, NPCs are ours to run
                simulate_npcs: self.session.role().is_authority() || !connected,
            };
            report.events = tick(&mut self.world, &input, dt);

            for event in &report.events {
                if let GameEvent::Collected { item_id, .. } = event {
                    self.session.broadcast_collect(*item_id);
                }
            }
            self.session.broadcast_ball(&self.world.body);
            if self.session.role().is_authority() {
                let npcs = self.world.npc_states();
                self.session.maybe_broadcast_npcs(dt, &npcs);
            }
        }

        self.session.update(dt);
        report
    }

    pub fn leave(&mut self) {
        self.session.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::net::channel::LoopbackTransport;
    use crate::sim::{GroundLayout, ItemPlacement, Owner};
    use glam::DVec3;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn layout() -> LevelLayout {
        LevelLayout {
            ground: GroundLayout::Flat { height: 0.0 },
            platforms: Vec::new(),
            host_spawn: DVec2::new(0.0, 0.0),
            guest_spawn: DVec2::new(0.0, 20.0),
            items: (0..10)
                .map(|i| ItemPlacement {
                    x: 3.0 + i as f64 * 1.5,
                    z: 0.0,
                    size: 0.2,
                })
                .collect(),
            npc_spawns: vec![DVec2::new(-8.0, -8.0), DVec2::new(8.0, -8.0)],
        }
    }

    fn pair(
        host_transport: LoopbackTransport,
        guest_transport: LoopbackTransport,
    ) -> (Peer<LoopbackTransport>, Peer<LoopbackTransport>) {
        let mut rng = Pcg32::seed_from_u64(5);
        let hosted = Room::create(&mut rng);
        let joined = Room::join(hosted.code.as_str()).unwrap();
        let settings = Settings::default();
        let layout = layout();
        (
            Peer::new(&hosted, &layout, host_transport, &settings, 11),
            Peer::new(&joined, &layout, guest_transport, &settings, 11),
        )
    }

    #[test]
    fn test_guest_applies_host_collect() {
        let (a, b) = LoopbackTransport::pair();
        let (mut host, mut guest) = pair(a, b);
        host.begin_match();

        let mut applied = Vec::new();
        for _ in 0..300 {
            host.frame(DVec2::X, SIM_DT);
            let report = guest.frame(DVec2::ZERO, SIM_DT);
            applied.extend(report.remote_collects);
        }

        let host_items = host.world.collected_count(Owner::Local);
        assert!(host_items > 0);
        assert_eq!(guest.world.collected_count(Owner::Remote), host_items);
        assert_eq!(guest.world.collected_count(Owner::Local), 0);
        assert!(applied.iter().all(|(_, r)| *r == RemoteCollect::Applied));
        assert_eq!(applied.len(), host_items);
    }

    #[test]
    fn test_remote_collect_attaches_to_proxy() {
        let (a, b) = LoopbackTransport::pair();
        let (mut host, mut guest) = pair(a, b);
        host.begin_match();
        host.frame(DVec2::ZERO, SIM_DT);
        guest.frame(DVec2::ZERO, SIM_DT);

        // Guest has not touched item 7; the host reports it
        assert!(!guest.world.collectible(7).unwrap().is_collected());
        host.session.broadcast_collect(7);
        let report = guest.frame(DVec2::ZERO, SIM_DT);
        assert_eq!(report.remote_collects, vec![(7, RemoteCollect::Applied)]);

        let item = guest.world.collectible(7).unwrap();
        assert_eq!(item.collected_by, Some(Owner::Remote));
        let attachment = item.attachment.expect("attached");
        assert_eq!(attachment.owner, Owner::Remote);
        let proxy = guest.session.proxy().unwrap().pose();
        assert!(attachment.offset.distance(proxy.to_local(item.position)) < 1e-9);

        // Redelivery changes nothing
        host.session.broadcast_collect(7);
        let report = guest.frame(DVec2::ZERO, SIM_DT);
        assert_eq!(report.remote_collects, vec![(7, RemoteCollect::Duplicate)]);
    }

    #[test]
    fn test_guest_follows_host_npcs() {
        let (a, b) = LoopbackTransport::pair();
        let (mut host, mut guest) = pair(a, b);
        host.begin_match();
        for _ in 0..120 {
            host.frame(DVec2::ZERO, SIM_DT);
            guest.frame(DVec2::ZERO, SIM_DT);
        }
        // Guest runs no NPC logic of its own, it only mirrors the last broadcast
        let guest_npcs = guest.world.npc_states();
        let host_npcs = host.world.npc_states();
        for (g, h) in guest_npcs.iter().zip(&host_npcs) {
            assert!(g.position.distance(h.position) < 1.0);
        }
        assert_ne!(guest_npcs[0].position, DVec3::new(-8.0, 0.0, -8.0));
    }

    #[test]
    fn test_match_survives_lossy_start() {
        let (a, b) = LoopbackTransport::pair();
        let (mut host, mut guest) = pair(a.with_loss(0.5, 42), b);
        host.begin_match();

        let mut started = false;
        for _ in 0..240 {
            host.frame(DVec2::ZERO, SIM_DT);
            started |= guest.frame(DVec2::ZERO, SIM_DT).started;
        }
        assert!(started);
        assert!(guest.is_playing());
    }

    #[test]
    fn test_guest_waits_for_start() {
        let (a, b) = LoopbackTransport::pair();
        let (_host, mut guest) = pair(a, b);
        let spawn = guest.world.body.position;
        for _ in 0..30 {
            guest.frame(DVec2::X, SIM_DT);
        }
        assert!(!guest.is_playing());
        assert_eq!(guest.world.body.position, spawn);
    }

    #[test]
    fn test_play_continues_after_peer_leaves() {
        let (a, b) = LoopbackTransport::pair();
        let (mut host, mut guest) = pair(a, b);
        host.begin_match();
        host.frame(DVec2::ZERO, SIM_DT);
        guest.frame(DVec2::ZERO, SIM_DT);

        guest.leave();
        let report = host.frame(DVec2::X, SIM_DT);
        assert!(report.disconnected);

        let x = host.world.body.position.x;
        for _ in 0..30 {
            host.frame(DVec2::X, SIM_DT);
        }
        assert!(host.world.body.position.x > x);
    }
}
