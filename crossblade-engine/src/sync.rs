//! Distributed synchronization
//!
//! Every participant runs a [`Synchronizer`] on top of its [`Controller`].
//! Outbound operations wrap crossfade triggers and event updates in
//! [`SyncMessage`]s; [`Synchronizer::run`] consumes envelopes one at a time,
//! so an update message always sets the event before its crossfade runs.
//!
//! Event classification is authoritative: only the elected leader classifies
//! the session, everyone else asks it with an `EventQuery`.

use crate::error::{Error, Result};
use crate::playback::controller::{Controller, CrossfadePass};
use crate::playlist::TrackRef;
use crossblade_common::authority::{self, elect_leader, Participant};
use crossblade_common::events::EventLabel;
use crossblade_common::sync::{Envelope, SyncMessage, Transport};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, oneshot, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

type Waiters = HashMap<Uuid, oneshot::Sender<EventLabel>>;
type PendingQueries = Mutex<Waiters>;

fn lock_pending(pending: &PendingQueries) -> MutexGuard<'_, Waiters> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Outstanding event query, forgotten when its waiter goes away
struct PendingQuery<'a> {
    pending: &'a PendingQueries,
    request_id: Uuid,
}

impl Drop for PendingQuery<'_> {
    fn drop(&mut self) {
        lock_pending(self.pending).remove(&self.request_id);
    }
}

/// Sync endpoint of one participant
pub struct Synchronizer {
    participant_id: String,
    controller: Arc<Controller>,
    transport: Arc<dyn Transport>,
    roster: RwLock<Vec<Participant>>,
    pending: PendingQueries,
}

impl Synchronizer {
    pub fn new(
        participant_id: impl Into<String>,
        controller: Arc<Controller>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            participant_id: participant_id.into(),
            controller,
            transport,
            roster: RwLock::new(Vec::new()),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn controller(&self) -> &Arc<Controller> {
        &self.controller
    }

    /// Replace the list of connected participants
    pub async fn set_roster(&self, participants: Vec<Participant>) {
        *self.roster.write().await = participants;
    }

    /// Currently elected leader
    pub async fn leader(&self) -> Option<String> {
        elect_leader(&self.roster.read().await).map(|leader| leader.id.clone())
    }

    pub async fn is_leader(&self) -> bool {
        authority::is_leader(&self.participant_id, &self.roster.read().await)
    }

    /// Event queries still waiting for a reply
    pub fn pending_queries(&self) -> usize {
        lock_pending(&self.pending).len()
    }

    // ========================================================================
    // Outbound
    // ========================================================================

    /// Ask every participant to crossfade the given playlists
    ///
    /// Receivers ignore ids they do not know; an empty list does nothing.
    pub fn crossfade_playlists(&self, playlist_ids: Vec<String>) -> Result<()> {
        self.broadcast(SyncMessage::CrossfadePlaylists { playlist_ids })
    }

    /// Ask every participant to crossfade the currently playing playlists
    pub async fn crossfade_playing(&self) -> Result<()> {
        let playlist_ids = self.controller.playing_playlist_ids().await;
        if playlist_ids.is_empty() {
            debug!("No playlist playing, nothing to crossfade");
            return Ok(());
        }
        self.crossfade_playlists(playlist_ids)
    }

    /// Ask every participant to crossfade tracks of one playlist
    pub fn crossfade_sounds(&self, playlist_id: &str, sound_ids: Vec<String>) -> Result<()> {
        self.broadcast(SyncMessage::CrossfadeSounds {
            playlist_id: playlist_id.to_string(),
            sound_ids,
        })
    }

    /// Set the event everywhere, then crossfade every playing playlist
    pub fn update_event(&self, event: EventLabel) -> Result<()> {
        self.broadcast(SyncMessage::UpdateEvent { event })
    }

    /// Set the event everywhere, then crossfade the given playlists
    pub fn update_playlists(&self, event: EventLabel, playlist_ids: Vec<String>) -> Result<()> {
        self.broadcast(SyncMessage::UpdatePlaylists {
            event,
            playlist_ids,
        })
    }

    /// Set the event everywhere, then crossfade the given tracks
    pub fn update_sounds(&self, event: EventLabel, tracks: &[TrackRef]) -> Result<()> {
        self.broadcast(SyncMessage::UpdateSounds {
            event,
            sound_uuids: tracks.iter().map(TrackRef::uuid).collect(),
        })
    }

    /// Reclassify the session and publish the event if it changed
    ///
    /// Only the leader classifies; other participants return `None`.
    pub async fn refresh_event(&self) -> Result<Option<EventLabel>> {
        if !self.is_leader().await {
            return Ok(None);
        }
        let event = self.controller.classify_event().await;
        if event == self.controller.current_event().await {
            return Ok(None);
        }
        info!("Session event changed to {}", event);
        self.update_event(event.clone())?;
        Ok(Some(event))
    }

    /// Classified event from the leader
    ///
    /// The leader answers locally. Other participants send an `EventQuery`
    /// and wait up to `query_timeout_ms` for the reply, which arrives through
    /// [`run`](Self::run).
    pub async fn query_event(&self) -> Result<EventLabel> {
        let leader = self.leader().await.ok_or(Error::NoLeader)?;
        if leader == self.participant_id {
            return Ok(self.controller.classify_event().await);
        }

        let request_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        lock_pending(&self.pending).insert(request_id, tx);
        // Cleared on every exit, including when the caller drops this future
        let _pending = PendingQuery {
            pending: &self.pending,
            request_id,
        };

        self.send_to(&leader, SyncMessage::EventQuery { request_id })?;

        let timeout_ms = self.controller.settings().await.query_timeout_ms;
        match tokio::time::timeout(Duration::from_millis(timeout_ms), rx).await {
            Ok(Ok(event)) => Ok(event),
            Ok(Err(_)) => Err(Error::Sync(format!("event query {} was dropped", request_id))),
            Err(_) => {
                warn!("Event query {} to {} timed out", request_id, leader);
                Err(Error::QueryTimeout(timeout_ms))
            }
        }
    }

    fn broadcast(&self, message: SyncMessage) -> Result<()> {
        let message_type = message.message_type();
        debug!("Broadcasting {}", message_type);
        self.transport
            .broadcast(&self.participant_id, message)
            .map_err(|e| {
                warn!("Failed to send {}: {}", message_type, e);
                Error::from(e)
            })
    }

    fn send_to(&self, target: &str, message: SyncMessage) -> Result<()> {
        let message_type = message.message_type();
        debug!("Sending {} to {}", message_type, target);
        self.transport
            .send_to(&self.participant_id, target, message)
            .map_err(|e| {
                warn!("Failed to send {} to {}: {}", message_type, target, e);
                Error::from(e)
            })
    }

    // ========================================================================
    // Inbound
    // ========================================================================

    /// Process one envelope
    ///
    /// Returns the crossfade pass the message triggered, if any. Envelopes
    /// directed at other participants are ignored.
    pub async fn handle(&self, envelope: Envelope) -> Result<Option<CrossfadePass>> {
        if !envelope.is_for(&self.participant_id) {
            return Ok(None);
        }
        debug!(
            "Handling {} from {}",
            envelope.message.message_type(),
            envelope.sender
        );

        match envelope.message {
            SyncMessage::CrossfadePlaylists { playlist_ids } => {
                Ok(Some(self.crossfade_resolved_playlists(&playlist_ids).await))
            }

            SyncMessage::CrossfadeSounds {
                playlist_id,
                sound_ids,
            } => {
                let tracks: Vec<TrackRef> = sound_ids
                    .iter()
                    .map(|sound_id| TrackRef::new(&playlist_id, sound_id))
                    .collect();
                Ok(Some(self.controller.crossfade_sounds(&tracks).await))
            }

            SyncMessage::EventQuery { request_id } => {
                if !self.is_leader().await {
                    debug!("Ignoring event query {}, not the leader", request_id);
                    return Ok(None);
                }
                let event = self.controller.classify_event().await;
                self.send_to(
                    &envelope.sender,
                    SyncMessage::EventReply { request_id, event },
                )?;
                Ok(None)
            }

            SyncMessage::EventReply { request_id, event } => {
                let waiter = lock_pending(&self.pending).remove(&request_id);
                match waiter {
                    Some(waiter) => {
                        if waiter.send(event).is_err() {
                            debug!("Event query {} no longer awaited", request_id);
                        }
                    }
                    None => debug!("Ignoring reply to unknown event query {}", request_id),
                }
                Ok(None)
            }

            SyncMessage::UpdateEvent { event } => {
                self.controller.set_current_event(event).await;
                Ok(Some(self.controller.crossfade_playlists(&[]).await))
            }

            SyncMessage::UpdatePlaylists {
                event,
                playlist_ids,
            } => {
                self.controller.set_current_event(event).await;
                Ok(Some(self.crossfade_resolved_playlists(&playlist_ids).await))
            }

            SyncMessage::UpdateSounds { event, sound_uuids } => {
                self.controller.set_current_event(event).await;
                let mut tracks = Vec::with_capacity(sound_uuids.len());
                for uuid in &sound_uuids {
                    match self.controller.resolve_uuid(uuid).await {
                        Some(track_ref) => tracks.push(track_ref),
                        None => debug!("Dropping unresolved sound {}", uuid),
                    }
                }
                Ok(Some(self.controller.crossfade_sounds(&tracks).await))
            }
        }
    }

    /// Crossfade named playlists; an empty list is a no-op
    async fn crossfade_resolved_playlists(&self, playlist_ids: &[String]) -> CrossfadePass {
        if playlist_ids.is_empty() {
            return CrossfadePass::default();
        }
        self.controller.crossfade_playlists(playlist_ids).await
    }

    /// Receive loop
    ///
    /// Processes envelopes in arrival order until the channel closes. Fades
    /// started by a message are left running.
    pub async fn run(self: Arc<Self>, mut rx: broadcast::Receiver<Envelope>) {
        info!("Sync loop started for {}", self.participant_id);
        loop {
            match rx.recv().await {
                Ok(envelope) => {
                    let message_type = envelope.message.message_type();
                    if let Err(e) = self.handle(envelope).await {
                        warn!("Failed to handle {}: {}", message_type, e);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Sync loop lagged, {} message(s) skipped", skipped);
                }
                Err(RecvError::Closed) => {
                    info!("Sync channel closed, stopping loop for {}", self.participant_id);
                    break;
                }
            }
        }
    }
}
