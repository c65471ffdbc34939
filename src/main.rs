//! Rollout headless demo
//!
//! Hosts a room, joins it from a second in-process peer over a lossy
//! loopback channel, drives both balls with scripted input and logs how the
//! match went. Set `RUST_LOG=info` (or `debug`) to see it.
//!
//! Usage: `rollout [settings.json]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::path::Path;

    use glam::DVec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use rollout::consts::SIM_DT;
    use rollout::net::{LoopbackTransport, Peer, Room, Transport};
    use rollout::sim::{GameEvent, LevelLayout, Owner};
    use rollout::Settings;

    const FRAMES: usize = 60 * 30;
    const PACKET_LOSS: f64 = 0.1;

    env_logger::init();
    log::info!("Rollout (native, headless) starting...");

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load_from(Path::new(&path)),
        None => Settings::default(),
    };
    let seed = settings.seed.unwrap_or_else(rand::random);
    log::info!("Level seed: {}", seed);

    let layout = LevelLayout::generate(seed, &settings.tuning.terrain);
    let mut room_rng = Pcg32::seed_from_u64(seed);
    let hosted = Room::create(&mut room_rng);
    let joined = match Room::join(hosted.code.as_str()) {
        Ok(room) => room,
        Err(e) => {
            log::error!("Could not join room {}: {}", hosted.code, e);
            return;
        }
    };

    let (a, b) = LoopbackTransport::pair();
    let mut host = Peer::new(
        &hosted,
        &layout,
        a.with_loss(PACKET_LOSS, seed ^ 1),
        &settings,
        seed,
    );
    let mut guest = Peer::new(
        &joined,
        &layout,
        b.with_loss(PACKET_LOSS, seed ^ 2),
        &settings,
        seed,
    );

    host.begin_match();

    let mut stumbles = [0usize; 2];
    let mut worst_proxy_error: f64 = 0.0;
    for frame in 0..FRAMES {
        let t = frame as f64 * SIM_DT;
        // Host circles, guest weaves
        let host_dir = DVec2::new((t * 0.4).cos(), (t * 0.4).sin());
        let guest_dir = DVec2::new((t * 0.7).sin(), (t * 0.35).cos()).normalize_or_zero();

        let host_report = host.frame(host_dir, SIM_DT);
        let guest_report = guest.frame(guest_dir, SIM_DT);

        if guest_report.started {
            log::info!("Guest started at frame {}", frame);
        }
        for (i, report) in [&host_report, &guest_report].into_iter().enumerate() {
            stumbles[i] += report
                .events
                .iter()
                .filter(|e| !matches!(e, GameEvent::Collected { .. }))
                .count();
        }

        if let Some(proxy) = guest.session.proxy() {
            let error = proxy.position.distance(host.world.body.position);
            worst_proxy_error = worst_proxy_error.max(error);
        }

        if frame % 300 == 0 {
            log::info!(
                "t={:5.1}s host r={:.2} ({}), guest r={:.2} ({})",
                t,
                host.world.body.radius,
                host.session.status_message(),
                guest.world.body.radius,
                guest.session.status_message(),
            );
        }
    }

    let final_error = guest
        .session
        .proxy()
        .map(|p| p.position.distance(host.world.body.position));

    log::info!("=== Match summary (room {}) ===", hosted.code);
    for (name, peer, stumbled) in [("host", &host, stumbles[0]), ("guest", &guest, stumbles[1])] {
        log_peer(name, peer, stumbled);
    }
    log::info!("Guest proxy error: worst {:.3}, final {:?}", worst_proxy_error, final_error);

    guest.leave();
    host.leave();

    fn log_peer<T: Transport>(name: &str, peer: &Peer<T>, stumbles: usize) {
        let stats = peer.session.stats();
        log::info!(
            "{}: radius {:.3}, collected {} (other peer: {}), {} stumbles, sent {} received {} rejected {}",
            name,
            peer.world.body.radius,
            peer.world.collected_count(Owner::Local),
            peer.world.collected_count(Owner::Remote),
            stumbles,
            stats.sent,
            stats.received,
            stats.rejected,
        );
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is the product on wasm; embedders drive `Peer::frame` themselves
}
