//! Error types for the contactless transport.

use thiserror::Error;

use super::apdu::StatusWord;

/// Contactless faults. All of them are routine (phones pulled apart early,
/// misaligned antennas) and none is terminal: the reader reports the error
/// and keeps polling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The peer answered with something other than `90 00`.
    #[error("peer answered with status {0}")]
    StatusWord(StatusWord),

    /// The response is too short to carry a status word.
    #[error("malformed response: {0} bytes")]
    MalformedResponse(usize),

    /// The payload is not valid UTF-8.
    #[error("payload is not valid UTF-8")]
    MalformedPayload,

    /// Command data does not fit the short form's one-byte `Lc`.
    #[error("command data is {0} bytes, short form allows 255")]
    CommandTooLong(usize),

    /// The radio link failed mid-exchange.
    #[error("link failure: {0}")]
    Link(String),

    /// The peer did not answer in time.
    #[error("no response within {millis} ms")]
    Timeout { millis: u64 },

    /// The transport was halted by the application.
    #[error("transport halted: {0}")]
    Halted(String),
}
