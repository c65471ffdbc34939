//! Message channel between the two peers
//!
//! The actual rendezvous/signaling transport is an external collaborator;
//! the core only needs something that can send a [`Packet`] on a topic and
//! hand back whatever has arrived since the last frame. Arrivals are
//! buffered in an [`Inbox`] so a transport callback running on another
//! thread never touches simulation state mid-step.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Independent message streams; no ordering is promised across topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    /// Full ball snapshot, every tick, both directions
    Ball,
    /// One-off item collection
    Collect,
    /// Host NPC poses, throttled
    Npc,
    /// Host's "gameplay begins" marker, sent redundantly
    Start,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Ball => "ball",
            Topic::Collect => "collect",
            Topic::Npc => "npc",
            Topic::Start => "start",
        }
    }
}

/// Which side of the room this peer is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Created the room; authoritative for NPCs and world simulation
    Host,
    /// Joined with the room code
    Guest,
}

impl Role {
    pub fn is_authority(&self) -> bool {
        *self == Role::Host
    }

    pub fn other(&self) -> Role {
        match self {
            Role::Host => Role::Guest,
            Role::Guest => Role::Host,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Guest => "guest",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message on the wire: a topic plus its JSON body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub topic: Topic,
    pub body: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("channel closed")]
    Closed,
    #[error("could not establish channel: {0}")]
    Unreachable(String),
}

/// Best-effort, per-topic message channel to the other peer
pub trait Transport {
    /// Fire-and-forget send; an `Ok` does not mean the peer received it
    fn send(&mut self, packet: Packet) -> Result<(), TransportError>;

    /// Everything that arrived since the last call, oldest first
    fn drain(&mut self) -> Vec<Packet>;

    fn is_open(&self) -> bool;

    /// Hang up; later sends fail
    fn close(&mut self) {}
}

/// Sending half of an [`Inbox`]; hand it to the transport's receive callback
#[derive(Debug, Clone)]
pub struct InboxSender {
    tx: Sender<Packet>,
}

impl InboxSender {
    pub fn deliver(&self, packet: Packet) -> Result<(), TransportError> {
        self.tx.send(packet).map_err(|_| TransportError::Closed)
    }
}

/// Arrival buffer drained once per simulation step
#[derive(Debug)]
pub struct Inbox {
    rx: Receiver<Packet>,
    disconnected: bool,
}

impl Inbox {
    pub fn drain(&mut self) -> Vec<Packet> {
        let mut packets = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(packet) => packets.push(packet),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    break;
                }
            }
        }
        packets
    }

    /// True once every sender is gone and the buffer has been emptied
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

pub fn inbox() -> (InboxSender, Inbox) {
    let (tx, rx) = mpsc::channel();
    (
        InboxSender { tx },
        Inbox {
            rx,
            disconnected: false,
        },
    )
}

/// Seeded packet loss for exercising the loss-tolerant paths
#[derive(Debug, Clone)]
struct Loss {
    rng: Pcg32,
    probability: f64,
}

/// In-process transport: two ends wired to each other's inbox
#[derive(Debug)]
pub struct LoopbackTransport {
    outbound: Option<InboxSender>,
    inbound: Option<Inbox>,
    loss: Option<Loss>,
}

impl LoopbackTransport {
    /// Two connected ends
    pub fn pair() -> (Self, Self) {
        let (to_a, a_inbox) = inbox();
        let (to_b, b_inbox) = inbox();
        (
            Self {
                outbound: Some(to_b),
                inbound: Some(a_inbox),
                loss: None,
            },
            Self {
                outbound: Some(to_a),
                inbound: Some(b_inbox),
                loss: None,
            },
        )
    }

    /// Drop each outgoing packet with `probability`
    pub fn with_loss(mut self, probability: f64, seed: u64) -> Self {
        self.loss = Some(Loss {
            rng: Pcg32::seed_from_u64(seed),
            probability: probability.clamp(0.0, 1.0),
        });
        self
    }
}

impl Transport for LoopbackTransport {
    fn send(&mut self, packet: Packet) -> Result<(), TransportError> {
        let Some(outbound) = &self.outbound else {
            return Err(TransportError::Closed);
        };
        if let Some(loss) = &mut self.loss {
            if loss.rng.random_bool(loss.probability) {
                return Ok(());
            }
        }
        outbound.deliver(packet)
    }

    fn drain(&mut self) -> Vec<Packet> {
        self.inbound.as_mut().map(Inbox::drain).unwrap_or_default()
    }

    fn is_open(&self) -> bool {
        self.outbound.is_some()
            && self
                .inbound
                .as_ref()
                .is_some_and(|inbox| !inbox.is_disconnected())
    }

    /// The other end sees the channel close on its next drain
    fn close(&mut self) {
        self.outbound = None;
        self.inbound = None;
    }
}

/// A transport that never connected (rendezvous failed); the game runs solo
#[derive(Debug, Clone, Default)]
pub struct OfflineTransport;

impl Transport for OfflineTransport {
    fn send(&mut self, _packet: Packet) -> Result<(), TransportError> {
        Err(TransportError::Unreachable("offline".into()))
    }

    fn drain(&mut self) -> Vec<Packet> {
        Vec::new()
    }

    fn is_open(&self) -> bool {
        false
    }
}

/// Characters a room code may contain; no I, O, 0 or 1
pub const ROOM_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const ROOM_CODE_LEN: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomCodeError {
    #[error("room code must be {ROOM_CODE_LEN} characters, got {0}")]
    Length(usize),
    #[error("room code contains invalid character {0:?}")]
    InvalidChar(char),
}

/// Short human-typable code that names a rendezvous channel
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomCode(String);

impl RoomCode {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..ROOM_CODE_LEN)
            .map(|_| ROOM_ALPHABET[rng.random_range(0..ROOM_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Trim and uppercase user input, then check it against the alphabet
    pub fn parse(input: &str) -> Result<Self, RoomCodeError> {
        let code = input.trim().to_ascii_uppercase();
        let len = code.chars().count();
        if len != ROOM_CODE_LEN {
            return Err(RoomCodeError::Length(len));
        }
        if let Some(bad) = code
            .chars()
            .find(|c| !c.is_ascii() || !ROOM_ALPHABET.contains(&(*c as u8)))
        {
            return Err(RoomCodeError::InvalidChar(bad));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name the external transport rendezvous on
    pub fn channel_name(&self) -> String {
        format!("rollout-{}", self.0)
    }
}

impl std::fmt::Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RoomCode {
    type Err = RoomCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A room as seen by one peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub code: RoomCode,
    pub role: Role,
}

impl Room {
    /// New room with a fresh code; the creator hosts
    pub fn create<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let room = Self {
            code: RoomCode::generate(rng),
            role: Role::Host,
        };
        log::info!("Created room {} ({})", room.code, room.code.channel_name());
        room
    }

    /// Join an existing room by its typed code
    pub fn join(input: &str) -> Result<Self, RoomCodeError> {
        let code = RoomCode::parse(input)?;
        log::info!("Joining room {}", code);
        Ok(Self {
            code,
            role: Role::Guest,
        })
    }

    pub fn channel_name(&self) -> String {
        self.code.channel_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(topic: Topic, body: &str) -> Packet {
        Packet {
            topic,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_loopback_delivers_in_order() {
        let (mut a, mut b) = LoopbackTransport::pair();
        a.send(packet(Topic::Ball, "1")).unwrap();
        a.send(packet(Topic::Ball, "2")).unwrap();
        b.send(packet(Topic::Start, "{}")).unwrap();

        let got = b.drain();
        assert_eq!(got, vec![packet(Topic::Ball, "1"), packet(Topic::Ball, "2")]);
        assert!(b.drain().is_empty());
        assert_eq!(a.drain(), vec![packet(Topic::Start, "{}")]);
    }

    #[test]
    fn test_close_is_seen_by_other_end() {
        let (mut a, mut b) = LoopbackTransport::pair();
        assert!(a.is_open() && b.is_open());

        a.close();
        assert!(!a.is_open());
        assert_eq!(a.send(packet(Topic::Ball, "x")), Err(TransportError::Closed));
        assert_eq!(b.send(packet(Topic::Ball, "x")), Err(TransportError::Closed));

        b.drain();
        assert!(!b.is_open());
    }

    #[test]
    fn test_full_loss_drops_everything() {
        let (a, mut b) = LoopbackTransport::pair();
        let mut a = a.with_loss(1.0, 1);
        for _ in 0..10 {
            a.send(packet(Topic::Start, "{}")).unwrap();
        }
        assert!(b.drain().is_empty());
    }

    #[test]
    fn test_inbox_accepts_from_other_thread() {
        let (sender, mut inbox) = inbox();
        let handle = std::thread::spawn(move || {
            sender.deliver(packet(Topic::Npc, "{}")).unwrap();
        });
        handle.join().unwrap();
        assert_eq!(inbox.drain().len(), 1);
        // Sender dropped with the thread
        inbox.drain();
        assert!(inbox.is_disconnected());
    }

    #[test]
    fn test_topic_and_role_names() {
        assert_eq!(serde_json::to_string(&Role::Host).unwrap(), r#""host""#);
        assert_eq!(Topic::Collect.as_str(), "collect");
        assert_eq!(Role::Guest.other(), Role::Host);
        assert!(Role::Host.is_authority());
    }

    #[test]
    fn test_room_code_generation_uses_alphabet() {
        let mut rng = Pcg32::seed_from_u64(3);
        for _ in 0..50 {
            let code = RoomCode::generate(&mut rng);
            assert_eq!(code.as_str().len(), ROOM_CODE_LEN);
            assert!(code.as_str().bytes().all(|b| ROOM_ALPHABET.contains(&b)));
            assert_eq!(RoomCode::parse(code.as_str()), Ok(code));
        }
    }

    #[test]
    fn test_room_code_parse_normalizes() {
        let code = RoomCode::parse("  ab3z \n").unwrap();
        assert_eq!(code.as_str(), "AB3Z");
        assert_eq!(code.channel_name(), "rollout-AB3Z");
    }

    #[test]
    fn test_room_code_parse_rejects_bad_input() {
        assert_eq!(RoomCode::parse("ABC"), Err(RoomCodeError::Length(3)));
        assert_eq!(RoomCode::parse("ABCDE"), Err(RoomCodeError::Length(5)));
        assert_eq!(RoomCode::parse("AB0D"), Err(RoomCodeError::InvalidChar('0')));
        assert_eq!(RoomCode::parse("abio"), Err(RoomCodeError::InvalidChar('I')));
        assert_eq!(RoomCode::parse("AB-D"), Err(RoomCodeError::InvalidChar('-')));
    }

    #[test]
    fn test_room_roles() {
        let mut rng = Pcg32::seed_from_u64(9);
        let hosted = Room::create(&mut rng);
        assert_eq!(hosted.role, Role::Host);

        let joined = Room::join(&hosted.code.as_str().to_lowercase()).unwrap();
        assert_eq!(joined.role, Role::Guest);
        assert_eq!(joined.channel_name(), hosted.channel_name());
    }
}
