//! # Contactless Transport
//!
//! Carries a payment URI from one phone to another over a host-card-emulation
//! link. One side emulates a card (the Emitter), the other reads it (the
//! Receiver). The exchange is a single SELECT and its answer.
//!
//! ## Architecture
//!
//! ```text
//! apdu.rs    : CommandApdu / ResponseApdu / StatusWord framing
//! machine.rs : ContactlessTransport state machine, TagLink seam, events
//! field.rs   : ProximityField + EmulatedCard: in-memory radio for tests
//! error.rs   : TransportError
//! ```
//!
//! ## Design Decisions
//!
//! - Platform radio callbacks never leak into the API. The reader talks to
//!   a card through [`TagLink`]; state changes and received payloads come
//!   out of a `tokio::sync::broadcast` channel.
//! - Contactless faults are routine. They surface as
//!   [`TransportEvent::TransportError`] and the reader goes on polling.
//!   Only the application can put the transport in `Error`.
//! - Both phones run the same code, so two readers or two emitters can
//!   touch. That is not an error: nothing is exchanged and nothing changes.

pub mod apdu;
pub mod error;
pub mod field;
pub mod machine;

pub use apdu::{CommandApdu, ResponseApdu, StatusWord};
pub use error::TransportError;
pub use field::{EmulatedCard, ProximityField};
pub use machine::{
    ContactOutcome, ContactlessTransport, DeactivationReason, Role, TagLink, TransportConfig,
    TransportEvent, TransportMode, TransportSession, TransportState,
};
