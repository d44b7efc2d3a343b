//! Room trait: the abstraction over the real-time communication platform.
//!
//! A room client joins and closes rooms and lists who is in them. Participant
//! join/leave notifications are pushed into the session controller by the
//! platform integration; this trait only covers the calls the controller
//! makes outward.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RoomError;

/// What kind of endpoint a participant is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantKind {
    Standard,
    Sip,
    Agent,
    Egress,
    Ingress,
}

/// A participant as reported by the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub identity: String,

    pub kind: ParticipantKind,

    /// Identity this participant publishes on behalf of, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_on_behalf: Option<String>,
}

impl Participant {
    /// A regular human participant.
    pub fn standard(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            kind: ParticipantKind::Standard,
            publish_on_behalf: None,
        }
    }

    /// Whether this participant counts as an occupant for an agent with the
    /// given identity: someone other than the agent or its helpers, dialled
    /// in or connected as a normal client.
    pub fn is_occupant(&self, agent_identity: &str) -> bool {
        if self.identity == agent_identity {
            return false;
        }
        if self.publish_on_behalf.as_deref() == Some(agent_identity) {
            return false;
        }
        matches!(self.kind, ParticipantKind::Standard | ParticipantKind::Sip)
    }
}

/// Outbound calls to the room platform.
#[async_trait]
pub trait RoomClient: Send + Sync {
    /// The room this client is bound to.
    fn room_name(&self) -> &str;

    /// Current remote participants. `NotFound` means the room does not exist yet.
    async fn list_participants(&self) -> Result<Vec<Participant>, RoomError>;

    /// Join the room as the agent.
    async fn join(&self) -> Result<(), RoomError>;

    /// Ask the platform to close the room for everyone.
    async fn close_room(&self) -> Result<(), RoomError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_and_sip_participants_are_occupants() {
        assert!(Participant::standard("alice").is_occupant("agent"));
        let caller = Participant {
            identity: "+380441234567".into(),
            kind: ParticipantKind::Sip,
            publish_on_behalf: None,
        };
        assert!(caller.is_occupant("agent"));
    }

    #[test]
    fn agent_and_helpers_are_not_occupants() {
        assert!(!Participant::standard("agent").is_occupant("agent"));

        let avatar = Participant {
            identity: "avatar-worker".into(),
            kind: ParticipantKind::Standard,
            publish_on_behalf: Some("agent".into()),
        };
        assert!(!avatar.is_occupant("agent"));

        let recorder = Participant {
            identity: "egress-1".into(),
            kind: ParticipantKind::Egress,
            publish_on_behalf: None,
        };
        assert!(!recorder.is_occupant("agent"));
    }

    #[test]
    fn participant_serialization() {
        let json = serde_json::to_string(&Participant::standard("bob")).unwrap();
        assert!(json.contains("\"standard\""));
        assert!(!json.contains("publish_on_behalf"));
    }
}
