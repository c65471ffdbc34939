//! Replication session for one peer
//!
//! Decides what goes on the wire and when, and turns arrivals into
//! [`SessionEvent`]s for the game loop. Per frame the driver calls, in order:
//! [`poll`](ReplicationSession::poll), the local simulation step, the
//! `broadcast_*` methods, then [`update`](ReplicationSession::update).
//!
//! Delivery is best-effort. Snapshots overwrite, `start` is re-sent on a
//! schedule and applied idempotently, and a guest that sees a ball before any
//! `start` begins anyway.

use super::channel::{Packet, Role, Transport};
use super::protocol::{BallSnapshot, CollectMsg, Message, NpcMsg};
use super::proxy::ProxyActor;
use crate::settings::{InterpolationSettings, ReplicationSettings, Settings};
use crate::sim::{ActorBody, NpcState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    /// Channel failed or the peer hung up; the game carries on solo
    Disconnected { reason: String },
    /// We left on purpose
    Left,
}

/// Something the game loop should react to
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Gameplay begins (guest side)
    Started,
    /// The other peer collected an item
    RemoteCollect { id: u32, by: Role },
    /// Fresh host NPC poses (guest side)
    NpcUpdate(Vec<NpcState>),
    /// Connection lost this frame
    Disconnected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub sent: u64,
    pub received: u64,
    pub rejected: u64,
}

pub struct ReplicationSession<T: Transport> {
    role: Role,
    transport: T,
    status: ConnectionStatus,
    started: bool,
    proxy: Option<ProxyActor>,
    replication: ReplicationSettings,
    interpolation: InterpolationSettings,
    /// Session clock, seconds
    clock: f64,
    /// Pending `start` send times on `clock`, ascending
    start_due: Vec<f64>,
    npc_timer: f64,
    stats: SessionStats,
}

impl<T: Transport> ReplicationSession<T> {
    pub fn new(role: Role, transport: T, settings: &Settings) -> Self {
        let status = if transport.is_open() {
            log::info!("Session connected as {}", role);
            ConnectionStatus::Connected
        } else {
            log::warn!("Session could not reach the other peer, playing solo");
            ConnectionStatus::Disconnected {
                reason: "could not reach the other peer".into(),
            }
        };

        let npc_interval = settings.replication.npc_interval();
        Self {
            role,
            transport,
            status,
            started: false,
            proxy: None,
            replication: settings.replication.clone(),
            interpolation: settings.interpolation.clone(),
            clock: 0.0,
            start_due: Vec::new(),
            // First broadcast goes out immediately
            npc_timer: npc_interval,
            stats: SessionStats::default(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn proxy(&self) -> Option<&ProxyActor> {
        self.proxy.as_ref()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// One line for the HUD
    pub fn status_message(&self) -> String {
        match &self.status {
            ConnectionStatus::Connected if self.started => format!("Playing as {}", self.role),
            ConnectionStatus::Connected => match self.role {
                Role::Host => "Waiting to start".to_string(),
                Role::Guest => "Waiting for host to start".to_string(),
            },
            ConnectionStatus::Disconnected { reason } => {
                format!("Connection lost ({reason}), playing solo")
            }
            ConnectionStatus::Left => "Left the room".to_string(),
        }
    }

    /// Host: begin gameplay and queue the redundant `start` sends
    pub fn begin_match(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        log::info!("Match started by {}", self.role);

        if self.role == Role::Host {
            let mut due: Vec<f64> = self
                .replication
                .start_resend_delays
                .iter()
                .filter(|d| d.is_finite())
                .map(|d| self.clock + d.max(0.0))
                .collect();
            due.sort_by(f64::total_cmp);
            self.start_due = due;
            self.flush_starts();
        }
    }

    /// Drain arrivals and apply them to session state
    pub fn poll(&mut self) -> Vec<SessionEvent> {
        if self.status == ConnectionStatus::Left {
            return Vec::new();
        }

        let mut events = Vec::new();
        for packet in self.transport.drain() {
            self.stats.received += 1;
            match Message::decode(&packet) {
                Ok(message) => self.apply(message, &mut events),
                Err(e) => {
                    self.stats.rejected += 1;
                    log::warn!("Dropping {} message: {}", packet.topic.as_str(), e);
                }
            }
        }

        if self.is_connected() && !self.transport.is_open() {
            self.disconnect("the other peer left".to_string());
            events.push(SessionEvent::Disconnected);
        }
        events
    }

    fn apply(&mut self, message: Message, events: &mut Vec<SessionEvent>) {
        match message {
            Message::Ball(snapshot) => {
                match &mut self.proxy {
                    Some(proxy) => proxy.set_target(snapshot),
                    None => {
                        log::debug!("First remote snapshot, spawning proxy");
                        self.proxy = Some(ProxyActor::new(snapshot));
                    }
                }
                if self.role == Role::Guest && !self.started {
                    log::info!("Ball arrived before start, starting anyway");
                    self.started = true;
                    events.push(SessionEvent::Started);
                }
            }
            Message::Collect(CollectMsg { id, by }) => {
                if by == self.role {
                    self.stats.rejected += 1;
                    log::warn!("Ignoring collect {} claiming to be from us ({})", id, by);
                    return;
                }
                log::debug!("Remote collect {} by {}", id, by);
                events.push(SessionEvent::RemoteCollect { id, by });
            }
            Message::Npc(msg) => {
                if self.role.is_authority() {
                    log::warn!("Host ignoring npc message from guest");
                    return;
                }
                events.push(SessionEvent::NpcUpdate(msg.states()));
            }
            Message::Start => {
                if self.role == Role::Guest && !self.started {
                    log::info!("Start received");
                    self.started = true;
                    events.push(SessionEvent::Started);
                } else {
                    log::debug!("Duplicate start ignored");
                }
            }
        }
    }

    /// Send our ball; call once per local tick
    pub fn broadcast_ball(&mut self, body: &ActorBody) {
        self.send(Message::Ball(BallSnapshot::from_body(body)));
    }

    /// Announce a local collection
    pub fn broadcast_collect(&mut self, item_id: u32) {
        self.send(Message::Collect(CollectMsg {
            id: item_id,
            by: self.role,
        }));
    }

    /// Host only: send NPC poses if the throttle allows. Returns whether it sent.
    pub fn maybe_broadcast_npcs(&mut self, dt: f64, npcs: &[NpcState]) -> bool {
        if !self.role.is_authority() || !dt.is_finite() || dt < 0.0 {
            return false;
        }
        let interval = self.replication.npc_interval();
        self.npc_timer += dt;
        if self.npc_timer < interval {
            return false;
        }
        // No catch-up bursts after a long frame
        self.npc_timer = (self.npc_timer - interval).min(interval);

        self.send(Message::Npc(NpcMsg {
            npcs: npcs.iter().copied().map(Into::into).collect(),
        }))
    }

    /// Advance the session clock: due `start` resends and proxy smoothing
    pub fn update(&mut self, dt: f64) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.clock += dt;
        self.flush_starts();
        if let Some(proxy) = &mut self.proxy {
            proxy.update(dt, &self.interpolation);
        }
    }

    /// Stop applying snapshots, drop the proxy and hang up
    pub fn leave(&mut self) {
        if self.status == ConnectionStatus::Left {
            return;
        }
        log::info!("Leaving session ({})", self.role);
        self.status = ConnectionStatus::Left;
        self.proxy = None;
        self.start_due.clear();
        self.transport.close();
    }

    fn flush_starts(&mut self) {
        let clock = self.clock;
        let due = self.start_due.iter().filter(|&&t| t <= clock).count();
        self.start_due.retain(|&t| t > clock);
        for _ in 0..due {
            self.send(Message::Start);
        }
    }

    fn send(&mut self, message: Message) -> bool {
        if !self.is_connected() {
            return false;
        }
        let packet: Packet = match message.encode() {
            Ok(packet) => packet,
            Err(e) => {
                log::warn!("Could not encode {} message: {}", message.topic().as_str(), e);
                return false;
            }
        };
        match self.transport.send(packet) {
            Ok(()) => {
                self.stats.sent += 1;
                true
            }
            Err(e) => {
                log::warn!("Send failed: {}", e);
                self.disconnect(e.to_string());
                false
            }
        }
    }

    fn disconnect(&mut self, reason: String) {
        log::warn!("Disconnected: {}, continuing solo", reason);
        self.status = ConnectionStatus::Disconnected { reason };
        self.start_due.clear();
    }
}
