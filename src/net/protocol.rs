//! Wire messages
//!
//! Bodies are JSON; the topic travels on the [`Packet`]. Everything coming in
//! is validated before it can touch simulation state.

use glam::{DQuat, DVec2, DVec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::channel::{Packet, Role, Topic};
use crate::consts::{MAX_WIRE_COORD, MAX_WIRE_RADIUS, MAX_WIRE_SPEED};
use crate::sim::{ActorBody, NpcState};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed {topic} message: {source}")]
    Json {
        topic: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("non-finite value in field {0}")]
    NonFinite(&'static str),
    #[error("radius must be positive, got {0}")]
    BadRadius(f64),
    #[error("implausible {0}: {1}")]
    OutOfRange(&'static str, f64),
    #[error("degenerate orientation quaternion")]
    DegenerateQuaternion,
}

/// Full state of one peer's ball, sent every tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallSnapshot {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub r: f64,
    pub qx: f64,
    pub qy: f64,
    pub qz: f64,
    pub qw: f64,
    pub vx: f64,
    pub vz: f64,
}

impl BallSnapshot {
    pub fn from_body(body: &ActorBody) -> Self {
        let p = body.position;
        let q = body.orientation;
        Self {
            x: p.x,
            y: p.y,
            z: p.z,
            r: body.radius,
            qx: q.x,
            qy: q.y,
            qz: q.z,
            qw: q.w,
            vx: body.velocity.x,
            vz: body.velocity.y,
        }
    }

    pub fn position(&self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }

    pub fn orientation(&self) -> DQuat {
        DQuat::from_xyzw(self.qx, self.qy, self.qz, self.qw)
    }

    /// Planar velocity (x, z)
    pub fn velocity(&self) -> DVec2 {
        DVec2::new(self.vx, self.vz)
    }

    /// Reject unusable snapshots and return one with a unit quaternion
    pub fn validated(mut self) -> Result<Self, ProtocolError> {
        let fields = [
            ("x", self.x),
            ("y", self.y),
            ("z", self.z),
            ("r", self.r),
            ("qx", self.qx),
            ("qy", self.qy),
            ("qz", self.qz),
            ("qw", self.qw),
            ("vx", self.vx),
            ("vz", self.vz),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ProtocolError::NonFinite(*name));
        }
        if self.r <= 0.0 {
            return Err(ProtocolError::BadRadius(self.r));
        }
        if self.r > MAX_WIRE_RADIUS {
            return Err(ProtocolError::OutOfRange("r", self.r));
        }
        if let Some((name, v)) = fields[..3].iter().find(|(_, v)| v.abs() > MAX_WIRE_COORD) {
            return Err(ProtocolError::OutOfRange(*name, *v));
        }
        let speed = self.velocity().length();
        if speed > MAX_WIRE_SPEED {
            return Err(ProtocolError::OutOfRange("speed", speed));
        }

        let q = self.orientation();
        let len = q.length();
        if len < 1e-6 {
            return Err(ProtocolError::DegenerateQuaternion);
        }
        let q = q / len;
        self.qx = q.x;
        self.qy = q.y;
        self.qz = q.z;
        self.qw = q.w;
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectMsg {
    pub id: u32,
    pub by: Role,
}

/// One NPC on the wire; `ry` is yaw about +Y
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NpcWire {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub ry: f64,
}

impl From<NpcState> for NpcWire {
    fn from(state: NpcState) -> Self {
        Self {
            x: state.position.x,
            y: state.position.y,
            z: state.position.z,
            ry: state.yaw,
        }
    }
}

impl From<NpcWire> for NpcState {
    fn from(wire: NpcWire) -> Self {
        Self {
            position: DVec3::new(wire.x, wire.y, wire.z),
            yaw: wire.ry,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NpcMsg {
    pub npcs: Vec<NpcWire>,
}

impl NpcMsg {
    pub fn states(&self) -> Vec<NpcState> {
        self.npcs.iter().copied().map(NpcState::from).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StartMsg {}

/// A decoded, validated message
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Ball(BallSnapshot),
    Collect(CollectMsg),
    Npc(NpcMsg),
    Start,
}

impl Message {
    pub fn topic(&self) -> Topic {
        match self {
            Message::Ball(_) => Topic::Ball,
            Message::Collect(_) => Topic::Collect,
            Message::Npc(_) => Topic::Npc,
            Message::Start => Topic::Start,
        }
    }

    pub fn encode(&self) -> Result<Packet, ProtocolError> {
        let topic = self.topic();
        let body = match self {
            Message::Ball(snapshot) => serde_json::to_string(snapshot),
            Message::Collect(msg) => serde_json::to_string(msg),
            Message::Npc(msg) => serde_json::to_string(msg),
            Message::Start => serde_json::to_string(&StartMsg {}),
        }
        .map_err(|source| ProtocolError::Json {
            topic: topic.as_str(),
            source,
        })?;
        Ok(Packet { topic, body })
    }

    pub fn decode(packet: &Packet) -> Result<Self, ProtocolError> {
        let topic = packet.topic.as_str();
        let json = |source: serde_json::Error| ProtocolError::Json { topic, source };
        match packet.topic {
            Topic::Ball => {
                let snapshot: BallSnapshot = serde_json::from_str(&packet.body).map_err(json)?;
                Ok(Message::Ball(snapshot.validated()?))
            }
            Topic::Collect => Ok(Message::Collect(
                serde_json::from_str(&packet.body).map_err(json)?,
            )),
            Topic::Npc => {
                let msg: NpcMsg = serde_json::from_str(&packet.body).map_err(json)?;
                for npc in &msg.npcs {
                    if ![npc.x, npc.y, npc.z, npc.ry].iter().all(|v| v.is_finite()) {
                        return Err(ProtocolError::NonFinite("npcs"));
                    }
                }
                Ok(Message::Npc(msg))
            }
            Topic::Start => {
                let _: StartMsg = serde_json::from_str(&packet.body).map_err(json)?;
                Ok(Message::Start)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball_packet(body: &str) -> Packet {
        Packet {
            topic: Topic::Ball,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_ball_snapshot_from_body() {
        let ground = crate::sim::FlatGround { height: 0.0 };
        let mut body = ActorBody::new(&ground, DVec2::new(2.0, 3.0), 0.8);
        body.velocity = DVec2::new(1.5, -0.5);

        let snap = BallSnapshot::from_body(&body);
        assert_eq!(snap.position(), DVec3::new(2.0, 0.8, 3.0));
        assert_eq!(snap.r, 0.8);
        assert_eq!(snap.velocity(), DVec2::new(1.5, -0.5));
        assert_eq!(snap.orientation(), DQuat::IDENTITY);
    }

    #[test]
    fn test_wire_field_names() {
        let packet = Message::Collect(CollectMsg {
            id: 7,
            by: Role::Host,
        })
        .encode()
        .unwrap();
        assert_eq!(packet.topic, Topic::Collect);
        assert_eq!(packet.body, r#"{"id":7,"by":"host"}"#);

        let start = Message::Start.encode().unwrap();
        assert_eq!(start.body, "{}");

        let npc = Message::Npc(NpcMsg {
            npcs: vec![NpcWire {
                x: 1.0,
                y: 2.0,
                z: 3.0,
                ry: 0.5,
            }],
        })
        .encode()
        .unwrap();
        assert_eq!(npc.body, r#"{"npcs":[{"x":1.0,"y":2.0,"z":3.0,"ry":0.5}]}"#);
    }

    #[test]
    fn test_decode_ball_normalizes_quaternion() {
        let packet = ball_packet(
            r#"{"x":0,"y":1,"z":0,"r":1,"qx":0,"qy":0,"qz":0,"qw":2,"vx":1,"vz":0}"#,
        );
        let Message::Ball(snap) = Message::decode(&packet).unwrap() else {
            panic!("expected ball");
        };
        assert!((snap.qw - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_decode_rejects_malformed_ball() {
        let bad = [
            "not json",
            r#"{"x":0,"y":1,"z":0}"#,
            r#"{"x":0,"y":1,"z":0,"r":0,"qx":0,"qy":0,"qz":0,"qw":1,"vx":0,"vz":0}"#,
            r#"{"x":0,"y":1,"z":0,"r":-2,"qx":0,"qy":0,"qz":0,"qw":1,"vx":0,"vz":0}"#,
            r#"{"x":0,"y":1,"z":0,"r":1,"qx":0,"qy":0,"qz":0,"qw":0,"vx":0,"vz":0}"#,
        ];
        for body in bad {
            assert!(Message::decode(&ball_packet(body)).is_err(), "accepted {body}");
        }
    }

    #[test]
    fn test_validated_rejects_non_finite() {
        let snap = BallSnapshot {
            x: f64::NAN,
            y: 0.0,
            z: 0.0,
            r: 1.0,
            qx: 0.0,
            qy: 0.0,
            qz: 0.0,
            qw: 1.0,
            vx: 0.0,
            vz: 0.0,
        };
        assert!(matches!(snap.validated(), Err(ProtocolError::NonFinite("x"))));
    }

    #[test]
    fn test_decode_rejects_implausible_ball() {
        let bad = [
            r#"{"x":1e308,"y":1,"z":0,"r":1,"qx":0,"qy":0,"qz":0,"qw":1,"vx":0,"vz":0}"#,
            r#"{"x":0,"y":-2e4,"z":0,"r":1,"qx":0,"qy":0,"qz":0,"qw":1,"vx":0,"vz":0}"#,
            r#"{"x":0,"y":1,"z":0,"r":1,"qx":0,"qy":0,"qz":0,"qw":1,"vx":1e308,"vz":0}"#,
            r#"{"x":0,"y":1,"z":0,"r":5e3,"qx":0,"qy":0,"qz":0,"qw":1,"vx":0,"vz":0}"#,
        ];
        for body in bad {
            let err = Message::decode(&ball_packet(body)).unwrap_err();
            assert!(matches!(err, ProtocolError::OutOfRange(..)), "{body}: {err}");
        }
    }

    #[test]
    fn test_decode_rejects_unknown_role() {
        let packet = Packet {
            topic: Topic::Collect,
            body: r#"{"id":1,"by":"spectator"}"#.to_string(),
        };
        assert!(Message::decode(&packet).is_err());
    }

    #[test]
    fn test_npc_round_trip_through_state() {
        let state = NpcState {
            position: DVec3::new(4.0, 0.5, -2.0),
            yaw: 1.25,
        };
        let msg = NpcMsg {
            npcs: vec![state.into()],
        };
        let packet = Message::Npc(msg).encode().unwrap();
        let Message::Npc(decoded) = Message::decode(&packet).unwrap() else {
            panic!("expected npc");
        };
        assert_eq!(decoded.states(), vec![state]);
    }
}
