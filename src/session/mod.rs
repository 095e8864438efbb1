//! Session: one explicit connection to the game peer plus the reconciled
//! view of its game.
//!
//! - [`sync`]: Pure reconciliation and intent vetting.
//! - [`reconnect`]: Backoff policy applied above the channel.
//! - [`errors`]: Local rejection reasons.

pub mod errors;
pub mod reconnect;
pub mod sync;

pub use errors::SessionError;
pub use reconnect::ReconnectPolicy;
pub use sync::{SessionEvent, SessionPhase, Synchronizer};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::game::GameState;
use crate::ws::{Channel, ChannelError, ChannelEvent, ConnectionStatus};

/// A client session: owns the channel and the reconciled state.
///
/// All mutation goes through `&mut self`, so whichever task owns the session
/// serializes intents and inbound messages without locks.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    channel: Channel,
    sync: Synchronizer,
    policy: ReconnectPolicy,
}

impl Session {
    pub fn new(config: &ClientConfig) -> Self {
        let channel = Channel::new(config.server_url.clone(), config.connect_timeout)
            .with_event_capacity(config.event_capacity);
        Self {
            id: Uuid::new_v4(),
            channel,
            sync: Synchronizer::new(),
            policy: config.reconnect,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn url(&self) -> &str {
        self.channel.url()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.channel.status()
    }

    pub fn phase(&self) -> SessionPhase {
        self.sync.phase()
    }

    /// Latest peer-confirmed state.
    pub fn state(&self) -> Option<&GameState> {
        self.sync.state()
    }

    pub fn is_game_over(&self) -> bool {
        self.sync.is_game_over()
    }

    pub fn reconnect_policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Begin connecting. Returns immediately; watch for
    /// [`SessionEvent::Connected`].
    pub fn open(&mut self) {
        if self.channel.status() == ConnectionStatus::Disconnected {
            self.sync.on_connecting();
            info!(session_id = %self.id, url = self.channel.url(), "opening session");
        }
        self.channel.open();
    }

    pub async fn close(&mut self) {
        self.channel.close().await;
        self.sync.on_disconnected();
        info!(session_id = %self.id, "session closed");
    }

    /// Re-open the channel using the configured backoff.
    ///
    /// Attempt `n` waits [`ReconnectPolicy::delay_for`]`(n)` first. Returns
    /// once the channel is open; play resumes when the peer sends the next
    /// `start` or `reset`.
    pub async fn reconnect(&mut self) -> Result<(), SessionError> {
        if self.channel.status() == ConnectionStatus::Open {
            return Ok(());
        }
        let policy = self.policy;
        for (attempt, delay) in (1u32..).zip(policy.schedule()) {
            info!(session_id = %self.id, attempt, ?delay, "reconnecting");
            tokio::time::sleep(delay).await;

            self.open();
            match self.await_open().await {
                Ok(()) => {
                    info!(session_id = %self.id, attempt, "reconnected");
                    return Ok(());
                }
                Err(error) => warn!(session_id = %self.id, attempt, %error, "reconnect failed"),
            }
        }
        Err(SessionError::ReconnectExhausted(policy.max_attempts))
    }

    async fn await_open(&mut self) -> Result<(), ChannelError> {
        loop {
            match self.channel.next_event().await {
                Some(ChannelEvent::Opened) => {
                    self.sync.on_opened();
                    return Ok(());
                }
                Some(ChannelEvent::Message(text)) => {
                    warn!(session_id = %self.id, len = text.len(), "dropping frame received before open");
                }
                Some(ChannelEvent::Error(error)) => {
                    self.sync.on_disconnected();
                    return Err(error);
                }
                Some(ChannelEvent::Closed { .. }) | None => {
                    self.sync.on_disconnected();
                    return Err(ChannelError::NotConnected);
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // Intents
    // -----------------------------------------------------------------

    /// Claim a cell. Rejected locally, with nothing sent, when the channel
    /// is not open, the game is over, no game is running, or the cell is
    /// taken.
    pub fn submit_choice(&mut self, cell: usize) -> Result<(), SessionError> {
        let intent = self
            .sync
            .prepare_choice(cell, self.channel.status())
            .inspect_err(|e| debug!(session_id = %self.id, cell, code = e.code(), "choice rejected"))?;
        self.channel.send(intent.to_json())?;
        debug!(session_id = %self.id, cell, "choice sent");
        Ok(())
    }

    /// Ask the peer for a new game and lift the game-over gate right away.
    pub fn submit_reset(&mut self) -> Result<(), SessionError> {
        let intent = self.sync.prepare_reset(self.channel.status())?;
        self.channel.send(intent.to_json())?;
        self.sync.mark_reset_sent();
        debug!(session_id = %self.id, "reset sent");
        Ok(())
    }

    // -----------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------

    /// Wait for the next event. `None` means no connection is live and
    /// nothing more will arrive until [`open`](Self::open) is called.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let event = self.channel.next_event().await?;
        Some(self.handle(event))
    }

    fn handle(&mut self, event: ChannelEvent) -> SessionEvent {
        match event {
            ChannelEvent::Opened => {
                self.sync.on_opened();
                SessionEvent::Connected
            }
            ChannelEvent::Message(text) => self.sync.apply(&text),
            ChannelEvent::Closed { reason } => {
                self.sync.on_disconnected();
                SessionEvent::Disconnected { reason }
            }
            ChannelEvent::Error(error) => {
                self.sync.on_disconnected();
                SessionEvent::TransportError(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn unreachable_config() -> ClientConfig {
        ClientConfig {
            server_url: "ws://127.0.0.1:1".into(),
            connect_timeout: Duration::from_millis(200),
            reconnect: ReconnectPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
            },
            event_capacity: 8,
        }
    }

    #[tokio::test]
    async fn new_session_is_idle() {
        let session = Session::new(&unreachable_config());
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert!(session.state().is_none());
        assert_eq!(session.url(), "ws://127.0.0.1:1");
    }

    #[tokio::test]
    async fn intents_fail_when_not_connected() {
        let mut session = Session::new(&unreachable_config());
        assert_eq!(session.submit_choice(0), Err(SessionError::NotConnected));
        assert_eq!(session.submit_reset(), Err(SessionError::NotConnected));
    }

    #[tokio::test]
    async fn failed_open_surfaces_transport_error() {
        let mut session = Session::new(&unreachable_config());
        session.open();
        assert_eq!(session.phase(), SessionPhase::Connecting);

        let event = tokio::time::timeout(Duration::from_secs(5), session.next_event())
            .await
            .unwrap();
        assert!(matches!(event, Some(SessionEvent::TransportError(_))));
        assert_eq!(session.phase(), SessionPhase::Disconnected);
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn reconnect_gives_up_after_policy_attempts() {
        let mut session = Session::new(&unreachable_config());
        let result = tokio::time::timeout(Duration::from_secs(10), session.reconnect())
            .await
            .unwrap();
        assert_eq!(result, Err(SessionError::ReconnectExhausted(2)));
        assert_eq!(session.phase(), SessionPhase::Disconnected);
    }

    #[tokio::test]
    async fn reconnect_disabled_fails_immediately() {
        let mut config = unreachable_config();
        config.reconnect = ReconnectPolicy::disabled();
        let mut session = Session::new(&config);
        assert_eq!(
            session.reconnect().await,
            Err(SessionError::ReconnectExhausted(0))
        );
    }
}
