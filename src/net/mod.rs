//! Two-peer replication
//!
//! Everything between the local simulation and an opaque message transport:
//! the channel abstraction and room codes, the wire format, the session that
//! decides what to send, and the proxy that displays the other ball.

pub mod channel;
pub mod peer;
pub mod protocol;
pub mod proxy;
pub mod session;

pub use channel::{
    Inbox, InboxSender, LoopbackTransport, OfflineTransport, Packet, Role, Room, RoomCode,
    RoomCodeError, Topic, Transport, TransportError, inbox,
};
pub use peer::{FrameReport, Peer};
pub use protocol::{BallSnapshot, CollectMsg, Message, NpcMsg, NpcWire, ProtocolError};
pub use proxy::ProxyActor;
pub use session::{ConnectionStatus, ReplicationSession, SessionEvent, SessionStats};
