//! Sync messages and the in-process SyncBus
//!
//! Every client must hear the same mix, so event changes and crossfade
//! triggers are distributed as [`SyncMessage`]s. A message that changes the
//! current event always carries its crossfade trigger with it, so receivers
//! apply the state update before crossfading.
//!
//! The network transport belongs to the host and is reached through the
//! [`Transport`] trait. [`SyncBus`] implements it over a tokio broadcast
//! channel for single-process sessions and tests.

use crate::events::EventLabel;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Crossblade sync message kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncMessage {
    /// Crossfade the named playlists with the current event
    CrossfadePlaylists {
        /// Playlist ids to resolve on the receiving side
        playlist_ids: Vec<String>,
    },

    /// Crossfade the named tracks of one playlist with the current event
    CrossfadeSounds {
        /// Parent playlist id
        playlist_id: String,
        /// Track ids within the playlist
        sound_ids: Vec<String>,
    },

    /// Ask the authoritative participant to classify the session
    EventQuery {
        /// Correlates the reply with the pending query
        request_id: Uuid,
    },

    /// Answer to an `EventQuery`
    EventReply {
        /// Id from the query being answered
        request_id: Uuid,
        /// Classified event
        event: EventLabel,
    },

    /// Set the current event, then crossfade every playing playlist
    UpdateEvent {
        /// New current event
        event: EventLabel,
    },

    /// Set the current event, then crossfade the named playlists
    UpdatePlaylists {
        /// New current event
        event: EventLabel,
        /// Playlist ids to resolve on the receiving side
        playlist_ids: Vec<String>,
    },

    /// Set the current event, then crossfade the named tracks
    UpdateSounds {
        /// New current event
        event: EventLabel,
        /// Track uuids to resolve on the receiving side
        sound_uuids: Vec<String>,
    },
}

impl SyncMessage {
    /// Message type name (matches the serde tag)
    pub fn message_type(&self) -> &'static str {
        match self {
            SyncMessage::CrossfadePlaylists { .. } => "CrossfadePlaylists",
            SyncMessage::CrossfadeSounds { .. } => "CrossfadeSounds",
            SyncMessage::EventQuery { .. } => "EventQuery",
            SyncMessage::EventReply { .. } => "EventReply",
            SyncMessage::UpdateEvent { .. } => "UpdateEvent",
            SyncMessage::UpdatePlaylists { .. } => "UpdatePlaylists",
            SyncMessage::UpdateSounds { .. } => "UpdateSounds",
        }
    }

    /// Event carried by the message, if it updates the current event
    pub fn event_update(&self) -> Option<&EventLabel> {
        match self {
            SyncMessage::UpdateEvent { event }
            | SyncMessage::UpdatePlaylists { event, .. }
            | SyncMessage::UpdateSounds { event, .. } => Some(event),
            _ => None,
        }
    }
}

/// A message in flight between participants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Participant that sent the message
    pub sender: String,
    /// Recipient; `None` means every participant, sender included
    pub target: Option<String>,
    pub message: SyncMessage,
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    pub fn broadcast(sender: &str, message: SyncMessage) -> Self {
        Self {
            sender: sender.to_string(),
            target: None,
            message,
            timestamp: Utc::now(),
        }
    }

    pub fn directed(sender: &str, target: &str, message: SyncMessage) -> Self {
        Self {
            sender: sender.to_string(),
            target: Some(target.to_string()),
            message,
            timestamp: Utc::now(),
        }
    }

    /// Whether `participant_id` should process this envelope
    pub fn is_for(&self, participant_id: &str) -> bool {
        self.target
            .as_deref()
            .map_or(true, |target| target == participant_id)
    }
}

/// Delivery seam to the host's network channel
///
/// Delivery is fire-and-forget: implementations report failures but never
/// retry.
pub trait Transport: Send + Sync {
    /// Deliver to every participant, the sender included
    fn broadcast(&self, sender: &str, message: SyncMessage) -> Result<()>;

    /// Deliver to a single participant
    fn send_to(&self, sender: &str, target: &str, message: SyncMessage) -> Result<()>;
}

/// In-process sync channel
///
/// Uses tokio::broadcast internally: every subscriber sees every envelope
/// and filters directed ones with [`Envelope::is_for`]. Slow subscribers
/// lag instead of blocking senders.
///
/// # Examples
///
/// ```
/// use crossblade_common::sync::{SyncBus, SyncMessage, Transport};
/// use crossblade_common::events::EventLabel;
///
/// let bus = SyncBus::new(16);
/// let mut rx = bus.subscribe();
///
/// bus.broadcast("gm-1", SyncMessage::UpdateEvent { event: EventLabel::game_paused() })
///     .unwrap();
///
/// let envelope = rx.try_recv().unwrap();
/// assert!(envelope.is_for("player-7"));
/// assert_eq!(envelope.message.message_type(), "UpdateEvent");
/// ```
#[derive(Clone)]
pub struct SyncBus {
    tx: broadcast::Sender<Envelope>,
    capacity: usize,
}

impl SyncBus {
    /// Creates a new SyncBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future envelopes
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    /// Send an envelope to all subscribers
    ///
    /// Returns the number of subscribers reached.
    pub fn emit(&self, envelope: Envelope) -> Result<usize> {
        let message_type = envelope.message.message_type();
        self.tx.send(envelope).map_err(|_| {
            Error::Transport(format!("no participants listening for {}", message_type))
        })
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Transport for SyncBus {
    fn broadcast(&self, sender: &str, message: SyncMessage) -> Result<()> {
        self.emit(Envelope::broadcast(sender, message)).map(|_| ())
    }

    fn send_to(&self, sender: &str, target: &str, message: SyncMessage) -> Result<()> {
        self.emit(Envelope::directed(sender, target, message)).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syncbus_new() {
        let bus = SyncBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_emit_without_subscribers_is_transport_error() {
        let bus = SyncBus::new(4);
        let result = bus.broadcast("gm", SyncMessage::UpdateEvent { event: EventLabel::default() });
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[test]
    fn test_directed_envelope_filtering() {
        let bus = SyncBus::new(4);
        let mut rx = bus.subscribe();

        bus.send_to("player", "gm", SyncMessage::EventQuery { request_id: Uuid::new_v4() })
            .unwrap();

        let envelope = rx.try_recv().unwrap();
        assert!(envelope.is_for("gm"));
        assert!(!envelope.is_for("player"));
        assert_eq!(envelope.sender, "player");
    }

    #[test]
    fn test_multiple_subscribers_receive_same_message() {
        let bus = SyncBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let message = SyncMessage::CrossfadePlaylists {
            playlist_ids: vec!["p1".to_string()],
        };
        bus.broadcast("gm", message.clone()).unwrap();

        assert_eq!(rx1.try_recv().unwrap().message, message);
        assert_eq!(rx2.try_recv().unwrap().message, message);
    }

    #[test]
    fn test_message_serialization_uses_type_tag() {
        let message = SyncMessage::UpdateSounds {
            event: EventLabel::new("COMBATANT: FRIENDLY"),
            sound_uuids: vec!["Playlist.p1.PlaylistSound.s1".to_string()],
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "UpdateSounds");
        assert_eq!(json["event"], "COMBATANT: FRIENDLY");

        let parsed: SyncMessage = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, message);
    }

    #[test]
    fn test_event_update_accessor() {
        let update = SyncMessage::UpdatePlaylists {
            event: EventLabel::game_paused(),
            playlist_ids: vec![],
        };
        assert_eq!(update.event_update(), Some(&EventLabel::game_paused()));

        let trigger = SyncMessage::CrossfadeSounds {
            playlist_id: "p".to_string(),
            sound_ids: vec![],
        };
        assert!(trigger.event_update().is_none());
    }
}
