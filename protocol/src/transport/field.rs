//! An in-memory radio field joining two transports.
//!
//! Real phones meet through the platform's NFC stack. Here the reader's
//! [`TagLink`] is an [`EmulatedCard`] that hands each command straight to the
//! peer's [`ContactlessTransport::process_command_apdu`], so the whole
//! exchange (framing, status words, events, session checks) runs in tests
//! and in the CLI's `simulate` command without hardware.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::error::TransportError;
use super::machine::{
    ContactOutcome, ContactlessTransport, DeactivationReason, TagLink, TransportState,
};

/// The reader's view of a peer in card-emulation mode.
pub struct EmulatedCard {
    peer: Arc<ContactlessTransport>,
}

impl EmulatedCard {
    pub fn new(peer: Arc<ContactlessTransport>) -> Self {
        Self { peer }
    }
}

#[async_trait]
impl TagLink for EmulatedCard {
    async fn transceive(&self, command: &[u8]) -> Result<Vec<u8>, TransportError> {
        Ok(self.peer.process_command_apdu(command))
    }
}

/// Two devices held close together.
pub struct ProximityField {
    a: Arc<ContactlessTransport>,
    b: Arc<ContactlessTransport>,
}

impl ProximityField {
    pub fn between(a: Arc<ContactlessTransport>, b: Arc<ContactlessTransport>) -> Self {
        Self { a, b }
    }

    /// One contact. The device in `Receiving` reads the device in
    /// `Sending`; any other pairing exchanges nothing and changes nothing.
    pub async fn tap(&self) -> ContactOutcome {
        let (reader, card) = match (self.a.state(), self.b.state()) {
            (TransportState::Receiving, TransportState::Sending) => (&self.a, &self.b),
            (TransportState::Sending, TransportState::Receiving) => (&self.b, &self.a),
            (left, right) => {
                debug!(?left, ?right, "roles do not complement each other, no exchange");
                return ContactOutcome::NoExchange;
            }
        };

        let outcome = reader
            .on_tag_discovered(&EmulatedCard::new(Arc::clone(card)))
            .await;
        card.on_deactivated(DeactivationReason::LinkLost);
        outcome
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
