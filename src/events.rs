// Events that flow between the dashboard server and this client
//
// Outbound: small tagged subscribe/unsubscribe frames.
// Inbound: JSON envelopes. `type == "EVENT"` envelopes wrap a domain event
// whose own `type` names the mutation (TICKET_UPDATED, ...).
// Socket listeners see both inbound envelopes and the client's own
// connection status changes as a single `SocketEvent` stream.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Domain events that mean "data changed, re-read it"
pub const DATA_EVENTS: &[&str] = &[
    "THREAD_CREATED",
    "THREAD_RENAMED",
    "THREAD_MERGED",
    "TICKET_CREATED",
    "TICKET_UPDATED",
    "BLINDSPOT_CREATED",
    "BLINDSPOT_ACKNOWLEDGED",
    "BLINDSPOT_RESOLVED",
    "OBJECTIVE_UPDATED",
    "OBJECTIVE_COVERAGE_COMPUTED",
    "PHASE_CREATED",
    "PHASE_UPDATED",
    "MILESTONE_CREATED",
    "MILESTONE_UPDATED",
    "CHECKLIST_CREATED",
    "CHECKLIST_UPDATED",
    "CHECKLIST_COMPLETED",
    "RESOURCE_ASSIGNED",
    "RESOURCE_OVERLOADED",
    "LINK_CREATED",
    "LINK_UPDATED",
    "OBJECTIVE_CREATED",
    "OBJECTIVE_DELETED",
    "REMINDER_CREATED",
    "DELTA_PACK_CREATED",
    "INTAKE_PIPELINE_COMPLETED",
    "MEMORY_STORED",
    "MEMORY_DISTILLED",
    "SCHEDULE_CREATED",
    "SCHEDULE_UPDATED",
    "PROJECT_CREATED",
];

/// Whether `event_type` is one of the refresh-worthy mutation events
pub fn is_data_event(event_type: &str) -> bool {
    DATA_EVENTS.contains(&event_type)
}

/// Envelope type carrying a domain event
pub const EVENT_ENVELOPE: &str = "EVENT";

// ─────────────────────────────────────────────────────────────────────────────
// Outbound
// ─────────────────────────────────────────────────────────────────────────────

/// Frames the client sends to the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    SubscribeProject {
        #[serde(rename = "projectId")]
        project_id: String,
    },
    SubscribeSession {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Unsubscribe {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
}

impl ClientMessage {
    /// Serialize with a `ts` field set to the current UTC time (RFC 3339)
    pub fn to_frame(&self) -> serde_json::Result<String> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.insert(
                "ts".to_string(),
                Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
        }
        serde_json::to_string(&value)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inbound
// ─────────────────────────────────────────────────────────────────────────────

/// Any JSON object the server pushes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(rename = "projectId", default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ServerMessage {
    /// Parse a text frame. Anything that isn't a JSON object is an error.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// The wrapped domain event, for `EVENT` envelopes with an object payload
    pub fn domain_event(&self) -> Option<DomainEvent<'_>> {
        if self.kind != EVENT_ENVELOPE {
            return None;
        }
        let payload = self.payload.as_ref()?.as_object()?;
        Some(DomainEvent { payload })
    }
}

/// Borrowed view over an `EVENT` envelope's payload
#[derive(Debug, Clone, Copy)]
pub struct DomainEvent<'a> {
    payload: &'a serde_json::Map<String, Value>,
}

impl<'a> DomainEvent<'a> {
    pub fn event_type(&self) -> &'a str {
        self.payload
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn event_id(&self) -> Option<&'a str> {
        self.payload.get("eventId").and_then(Value::as_str)
    }

    pub fn seq(&self) -> Option<i64> {
        self.payload.get("seq").and_then(Value::as_i64)
    }

    /// Event-specific body (may be an empty string on the wire)
    pub fn body(&self) -> Option<&'a Value> {
        self.payload.get("payload")
    }

    /// Agent that produced the event: `payload.payload.agentId`, else `payload.agentId`
    pub fn agent_id(&self) -> Option<&'a str> {
        self.body()
            .and_then(|body| body.get("agentId"))
            .and_then(Value::as_str)
            .or_else(|| self.payload.get("agentId").and_then(Value::as_str))
    }

    pub fn is_data_event(&self) -> bool {
        is_data_event(self.event_type())
    }
}

/// What socket listeners receive
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    /// Internal connection status change
    Status { connected: bool },
    /// Parsed inbound frame
    Message(ServerMessage),
}

impl SocketEvent {
    pub fn domain_event(&self) -> Option<DomainEvent<'_>> {
        match self {
            SocketEvent::Message(msg) => msg.domain_event(),
            SocketEvent::Status { .. } => None,
        }
    }
}

#[cfg(test)]
pub(crate) fn domain_event_message(event_type: &str, body: Value) -> ServerMessage {
    ServerMessage {
        kind: EVENT_ENVELOPE.to_string(),
        session_id: Some("s-1".to_string()),
        project_id: None,
        payload: Some(serde_json::json!({
            "eventId": "e-1",
            "type": event_type,
            "payload": body,
            "timestamp": "2026-01-01T00:00:00Z",
            "seq": 7,
        })),
    }
}
