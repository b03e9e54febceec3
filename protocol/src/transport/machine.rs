//! The contactless transport state machine.
//!
//! ```text
//!   Receiving ──set_mode(Sending(p))──▶ Sending
//!   Sending   ──set_mode(Receiving)───▶ Receiving
//!   any       ──reset_with_error──────▶ Error
//!   Error     ──set_mode(..)──────────▶ Receiving | Sending
//! ```
//!
//! Every transition happens under one lock and publishes its event before
//! the lock is released, so subscribers see events in transition order and
//! a reader of [`ContactlessTransport::session`] never sees half an update.
//!
//! The reader role drops the lock for the radio round-trip. When the answer
//! comes back it re-checks the session id; if the mode changed meanwhile,
//! the answer belongs to a dead session and is thrown away.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::apdu::{CommandApdu, ResponseApdu};
use super::error::TransportError;
use crate::config::{AID, EVENT_CHANNEL_CAPACITY, TRANSCEIVE_TIMEOUT};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for a [`ContactlessTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// How long the reader waits for the card's answer.
    pub transceive_timeout: Duration,

    /// Event channel capacity. Slow subscribers past this lag and skip ahead.
    pub event_channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            transceive_timeout: TRANSCEIVE_TIMEOUT,
            event_channel_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }
}

// ---------------------------------------------------------------------------
// States, sessions and events
// ---------------------------------------------------------------------------

/// What the application asks the transport to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMode {
    /// Poll for a peer card and read its payload.
    Receiving,
    /// Emulate a card that hands out this payload.
    Sending(String),
}

/// Observable state of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    Receiving,
    Sending,
    /// Halted by [`ContactlessTransport::reset_with_error`]. Never entered
    /// on its own; left by the next `set_mode`.
    Error,
}

/// Which side of the exchange a session plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Card emulation: answers SELECT with the staged payload.
    Emitter,
    /// Reader: sends SELECT and consumes the answer.
    Receiver,
}

/// The single live session. A new mode replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSession {
    pub id: Uuid,
    pub role: Role,
    pub payload_to_send: Option<String>,
    pub last_error: Option<TransportError>,
}

impl TransportSession {
    fn new(role: Role, payload_to_send: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            payload_to_send,
            last_error: None,
        }
    }
}

/// Published on the transport's broadcast channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    ModeChanged(TransportState),
    MessageReceived(String),
    TransportError(TransportError),
}

/// Why the emulated card lost its reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeactivationReason {
    /// The field dropped: phones moved apart.
    LinkLost,
    /// The reader selected another application.
    Deselected,
}

/// Result of one contact, from either role's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactOutcome {
    /// The reader received this payload.
    Delivered(String),
    /// The exchange failed; the reader keeps polling.
    Failed(TransportError),
    /// Nothing happened: roles did not complement each other, or the
    /// session changed mid-exchange.
    NoExchange,
}

// ---------------------------------------------------------------------------
// Radio seam
// ---------------------------------------------------------------------------

/// A connected card, seen from the reader. Platform radio stacks implement
/// this; so does [`EmulatedCard`](super::field::EmulatedCard) for tests.
#[async_trait]
pub trait TagLink: Send + Sync {
    /// Send one command APDU and return the raw response APDU.
    async fn transceive(&self, command: &[u8]) -> Result<Vec<u8>, TransportError>;
}

// ---------------------------------------------------------------------------
// ContactlessTransport
// ---------------------------------------------------------------------------

struct Inner {
    state: TransportState,
    session: TransportSession,
}

/// One device's contactless endpoint. Share it behind an `Arc`; radio
/// callbacks may arrive on any thread.
pub struct ContactlessTransport {
    inner: Mutex<Inner>,
    events: broadcast::Sender<TransportEvent>,
    config: TransportConfig,
}

impl ContactlessTransport {
    /// A transport in `Receiving`, the default.
    pub fn new(config: TransportConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity.max(1));
        Self {
            inner: Mutex::new(Inner {
                state: TransportState::Receiving,
                session: TransportSession::new(Role::Receiver, None),
            }),
            events,
            config,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> TransportState {
        self.inner.lock().state
    }

    /// Snapshot of the live session.
    pub fn session(&self) -> TransportSession {
        self.inner.lock().session.clone()
    }

    /// Switch mode. Always accepted, never waits: the previous session is
    /// dropped on the spot and any exchange still in flight for it will be
    /// discarded when it returns.
    pub fn set_mode(&self, mode: TransportMode) {
        let mut inner = self.inner.lock();
        let (state, session) = match mode {
            TransportMode::Receiving => (
                TransportState::Receiving,
                TransportSession::new(Role::Receiver, None),
            ),
            TransportMode::Sending(payload) => (
                TransportState::Sending,
                TransportSession::new(Role::Emitter, Some(payload)),
            ),
        };
        info!(
            from = ?inner.state,
            to = ?state,
            session = %session.id,
            payload_len = session.payload_to_send.as_ref().map_or(0, String::len),
            "transport mode changed"
        );
        inner.state = state;
        inner.session = session;
        self.emit(TransportEvent::ModeChanged(state));
    }

    /// Halt the transport. The staged payload is dropped and both roles
    /// stop answering until the next `set_mode`.
    pub fn reset_with_error(&self, reason: impl Into<String>) {
        let error = TransportError::Halted(reason.into());
        let mut inner = self.inner.lock();
        warn!(session = %inner.session.id, error = %error, "transport halted");
        inner.state = TransportState::Error;
        inner.session.payload_to_send = None;
        inner.session.last_error = Some(error.clone());
        self.emit(TransportEvent::TransportError(error));
        self.emit(TransportEvent::ModeChanged(TransportState::Error));
    }

    // -- Emitter side -------------------------------------------------------

    /// Answer a command from a reader. SELECT of our AID while `Sending`
    /// gets the payload and `90 00`; everything else gets `6F 00`.
    ///
    /// The payload stays staged afterwards, so a reader that lost the first
    /// answer can simply tap again.
    pub fn process_command_apdu(&self, command: &[u8]) -> Vec<u8> {
        let inner = self.inner.lock();
        let selected = CommandApdu::parse(command).is_some_and(|c| c.is_select_of(&AID));

        let response = match (&inner.state, &inner.session.payload_to_send) {
            (TransportState::Sending, Some(payload)) if selected => {
                debug!(
                    session = %inner.session.id,
                    payload_len = payload.len(),
                    "answering SELECT with staged payload"
                );
                ResponseApdu::success(payload.as_bytes().to_vec())
            }
            _ => {
                debug!(
                    session = %inner.session.id,
                    state = ?inner.state,
                    selected,
                    command_len = command.len(),
                    "refusing command"
                );
                ResponseApdu::failure()
            }
        };
        response.encode()
    }

    /// The reader went away.
    pub fn on_deactivated(&self, reason: DeactivationReason) {
        let inner = self.inner.lock();
        debug!(session = %inner.session.id, ?reason, "card emulation deactivated");
    }

    // -- Receiver side ------------------------------------------------------

    /// A card entered the field. Sends SELECT through `link` and publishes
    /// either `MessageReceived` or `TransportError`. Either way the state
    /// stays `Receiving`.
    pub async fn on_tag_discovered<L>(&self, link: &L) -> ContactOutcome
    where
        L: TagLink + ?Sized,
    {
        let session_id = {
            let inner = self.inner.lock();
            if inner.state != TransportState::Receiving {
                debug!(state = ?inner.state, "tag discovered while not polling, ignoring");
                return ContactOutcome::NoExchange;
            }
            inner.session.id
        };

        let result = self.read_card(link).await;

        let mut inner = self.inner.lock();
        if inner.session.id != session_id || inner.state != TransportState::Receiving {
            debug!(
                stale = %session_id,
                current = %inner.session.id,
                "session superseded during exchange, discarding result"
            );
            return ContactOutcome::NoExchange;
        }

        match result {
            Ok(payload) => {
                debug!(session = %session_id, payload_len = payload.len(), "payload received");
                inner.session.last_error = None;
                self.emit(TransportEvent::MessageReceived(payload.clone()));
                ContactOutcome::Delivered(payload)
            }
            Err(error) => {
                warn!(session = %session_id, error = %error, "contactless exchange failed");
                inner.session.last_error = Some(error.clone());
                self.emit(TransportEvent::TransportError(error.clone()));
                ContactOutcome::Failed(error)
            }
        }
    }

    /// One SELECT round-trip, lock not held.
    async fn read_card<L>(&self, link: &L) -> Result<String, TransportError>
    where
        L: TagLink + ?Sized,
    {
        let command = CommandApdu::select_payment().encode()?;
        let timeout = self.config.transceive_timeout;
        match tokio::time::timeout(timeout, link.transceive(&command)).await {
            Err(_) => Err(TransportError::Timeout {
                millis: timeout.as_millis() as u64,
            }),
            Ok(Err(e)) => Err(e),
            Ok(Ok(bytes)) => ResponseApdu::parse(&bytes).and_then(ResponseApdu::into_payload),
        }
    }

    fn emit(&self, event: TransportEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for ContactlessTransport {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SW_FAILURE, SW_SUCCESS};
    use crate::transport::apdu::StatusWord;
    use std::sync::Arc;
    use tokio::sync::broadcast::error::TryRecvError;

    /// A card that always answers with fixed bytes.
    struct FixedCard(Vec<u8>);

    #[async_trait]
    impl TagLink for FixedCard {
        async fn transceive(&self, _command: &[u8]) -> Result<Vec<u8>, TransportError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenLink;

    #[async_trait]
    impl TagLink for BrokenLink {
        async fn transceive(&self, _command: &[u8]) -> Result<Vec<u8>, TransportError> {
            Err(TransportError::Link("tag lost".into()))
        }
    }

    struct SilentCard;

    #[async_trait]
    impl TagLink for SilentCard {
        async fn transceive(&self, _command: &[u8]) -> Result<Vec<u8>, TransportError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(SW_SUCCESS.to_vec())
        }
    }

    /// Flips its own reader into `Sending` mid-exchange, like a user
    /// tapping "send" while a card is in the field.
    struct SwitchingCard(Arc<ContactlessTransport>);

    #[async_trait]
    impl TagLink for SwitchingCard {
        async fn transceive(&self, _command: &[u8]) -> Result<Vec<u8>, TransportError> {
            self.0.set_mode(TransportMode::Sending("mine".into()));
            Ok(ResponseApdu::success(b"late".to_vec()).encode())
        }
    }

    fn select() -> Vec<u8> {
        CommandApdu::select_payment().encode().unwrap()
    }

    #[test]
    fn starts_receiving() {
        let t = ContactlessTransport::default();
        assert_eq!(t.state(), TransportState::Receiving);
        let session = t.session();
        assert_eq!(session.role, Role::Receiver);
        assert_eq!(session.payload_to_send, None);
    }

    #[test]
    fn set_mode_emits_and_replaces_session() {
        let t = ContactlessTransport::default();
        let mut events = t.subscribe();
        let first = t.session().id;

        t.set_mode(TransportMode::Sending("solana:x".into()));
        assert_eq!(t.state(), TransportState::Sending);
        let sending = t.session();
        assert_ne!(sending.id, first);
        assert_eq!(sending.role, Role::Emitter);
        assert_eq!(sending.payload_to_send.as_deref(), Some("solana:x"));

        t.set_mode(TransportMode::Receiving);
        assert_eq!(t.session().payload_to_send, None);

        assert_eq!(
            events.try_recv().unwrap(),
            TransportEvent::ModeChanged(TransportState::Sending)
        );
        assert_eq!(
            events.try_recv().unwrap(),
            TransportEvent::ModeChanged(TransportState::Receiving)
        );
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn emitter_answers_select_and_keeps_payload() {
        let t = ContactlessTransport::default();
        t.set_mode(TransportMode::Sending("pay".into()));

        let resp = t.process_command_apdu(&select());
        assert_eq!(resp, vec![b'p', b'a', b'y', 0x90, 0x00]);

        t.on_deactivated(DeactivationReason::LinkLost);
        assert_eq!(t.process_command_apdu(&select()), resp);
        assert_eq!(t.state(), TransportState::Sending);
    }

    #[test]
    fn emitter_refuses_everything_else() {
        let t = ContactlessTransport::default();
        // Receiving: nothing staged.
        assert_eq!(t.process_command_apdu(&select()), SW_FAILURE.to_vec());

        t.set_mode(TransportMode::Sending("pay".into()));
        let foreign = CommandApdu::select(&[0xA0, 0x00, 0x00, 0x00, 0x04]).encode().unwrap();
        assert_eq!(t.process_command_apdu(&foreign), SW_FAILURE.to_vec());
        assert_eq!(t.process_command_apdu(&[0x00]), SW_FAILURE.to_vec());
    }

    #[tokio::test]
    async fn reader_delivers_payload() {
        let t = ContactlessTransport::default();
        let mut events = t.subscribe();
        let card = FixedCard(ResponseApdu::success(b"solana:abc".to_vec()).encode());

        let outcome = t.on_tag_discovered(&card).await;
        assert_eq!(outcome, ContactOutcome::Delivered("solana:abc".into()));
        assert_eq!(
            events.try_recv().unwrap(),
            TransportEvent::MessageReceived("solana:abc".into())
        );
        assert_eq!(t.state(), TransportState::Receiving);
    }

    #[tokio::test]
    async fn failure_status_is_reported_and_reader_keeps_polling() {
        let t = ContactlessTransport::default();
        let mut events = t.subscribe();

        let outcome = t.on_tag_discovered(&FixedCard(SW_FAILURE.to_vec())).await;
        let expected = TransportError::StatusWord(StatusWord::FAILURE);
        assert_eq!(outcome, ContactOutcome::Failed(expected.clone()));
        assert_eq!(events.try_recv().unwrap(), TransportEvent::TransportError(expected.clone()));
        assert_eq!(t.state(), TransportState::Receiving);
        assert_eq!(t.session().last_error, Some(expected));
    }

    #[tokio::test]
    async fn malformed_and_broken_links_are_transport_errors() {
        let t = ContactlessTransport::default();

        let bad_utf8 = FixedCard(vec![0xC3, 0x28, 0x90, 0x00]);
        assert_eq!(
            t.on_tag_discovered(&bad_utf8).await,
            ContactOutcome::Failed(TransportError::MalformedPayload)
        );
        assert_eq!(
            t.on_tag_discovered(&FixedCard(vec![0x90])).await,
            ContactOutcome::Failed(TransportError::MalformedResponse(1))
        );
        assert_eq!(
            t.on_tag_discovered(&BrokenLink).await,
            ContactOutcome::Failed(TransportError::Link("tag lost".into()))
        );
        assert_eq!(t.state(), TransportState::Receiving);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_card_times_out() {
        let t = ContactlessTransport::new(TransportConfig {
            transceive_timeout: Duration::from_millis(250),
            ..TransportConfig::default()
        });
        assert_eq!(
            t.on_tag_discovered(&SilentCard).await,
            ContactOutcome::Failed(TransportError::Timeout { millis: 250 })
        );
        assert_eq!(t.state(), TransportState::Receiving);
    }

    #[tokio::test]
    async fn superseded_session_result_is_discarded() {
        let t = Arc::new(ContactlessTransport::default());
        let mut events = t.subscribe();

        let outcome = t.on_tag_discovered(&SwitchingCard(Arc::clone(&t))).await;
        assert_eq!(outcome, ContactOutcome::NoExchange);
        assert_eq!(
            events.try_recv().unwrap(),
            TransportEvent::ModeChanged(TransportState::Sending)
        );
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
        assert_eq!(t.session().payload_to_send.as_deref(), Some("mine"));
    }

    #[tokio::test]
    async fn reader_ignores_tags_while_sending() {
        let t = ContactlessTransport::default();
        t.set_mode(TransportMode::Sending("x".into()));
        let mut events = t.subscribe();
        let card = FixedCard(ResponseApdu::success(b"y".to_vec()).encode());
        assert_eq!(t.on_tag_discovered(&card).await, ContactOutcome::NoExchange);
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn reset_with_error_halts_until_next_mode() {
        let t = ContactlessTransport::default();
        t.set_mode(TransportMode::Sending("x".into()));
        let mut events = t.subscribe();

        t.reset_with_error("nfc disabled");
        assert_eq!(t.state(), TransportState::Error);
        assert_eq!(t.session().payload_to_send, None);
        let halted = TransportError::Halted("nfc disabled".into());
        assert_eq!(events.try_recv().unwrap(), TransportEvent::TransportError(halted.clone()));
        assert_eq!(
            events.try_recv().unwrap(),
            TransportEvent::ModeChanged(TransportState::Error)
        );

        assert_eq!(t.process_command_apdu(&select()), SW_FAILURE.to_vec());
        let card = FixedCard(ResponseApdu::success(b"y".to_vec()).encode());
        assert_eq!(t.on_tag_discovered(&card).await, ContactOutcome::NoExchange);

        t.set_mode(TransportMode::Receiving);
        assert_eq!(t.state(), TransportState::Receiving);
        assert_eq!(t.session().last_error, None);
    }
}
