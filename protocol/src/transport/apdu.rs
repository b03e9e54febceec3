//! APDU framing for the SELECT exchange.
//!
//! Only the short form is used: a single-byte `Lc` and no `Le`. The AID is
//! seven bytes and the response is the raw payload followed by a two-byte
//! status word.
//!
//! ```text
//! command:  00 A4 04 00 | Lc | AID
//! response: payload     | SW1 SW2
//! ```

use std::fmt;

use super::error::TransportError;
use crate::config::{AID, SELECT_HEADER, SW_FAILURE, SW_SUCCESS};

/// Two-byte trailer of every response.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord(pub [u8; 2]);

impl StatusWord {
    pub const SUCCESS: Self = Self(SW_SUCCESS);
    pub const FAILURE: Self = Self(SW_FAILURE);

    pub fn is_success(&self) -> bool {
        *self == Self::SUCCESS
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.0[0], self.0[1])
    }
}

impl fmt::Debug for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatusWord({self})")
    }
}

/// A short-form command APDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandApdu {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

impl CommandApdu {
    /// SELECT by application name.
    pub fn select(aid: &[u8]) -> Self {
        Self {
            cla: SELECT_HEADER[0],
            ins: SELECT_HEADER[1],
            p1: SELECT_HEADER[2],
            p2: SELECT_HEADER[3],
            data: aid.to_vec(),
        }
    }

    /// SELECT for this protocol's AID.
    pub fn select_payment() -> Self {
        Self::select(&AID)
    }

    pub fn header(&self) -> [u8; 4] {
        [self.cla, self.ins, self.p1, self.p2]
    }

    /// Short-form wire bytes. Data longer than 255 bytes has no short-form
    /// `Lc` and is refused.
    pub fn encode(&self) -> Result<Vec<u8>, TransportError> {
        let lc = u8::try_from(self.data.len())
            .map_err(|_| TransportError::CommandTooLong(self.data.len()))?;
        let mut out = Vec::with_capacity(5 + self.data.len());
        out.extend_from_slice(&self.header());
        if lc > 0 {
            out.push(lc);
            out.extend_from_slice(&self.data);
        }
        Ok(out)
    }

    /// Parse a short-form command. A trailing `Le` byte is tolerated.
    /// Returns `None` for anything that is not a well-formed command.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }
        let (header, body) = bytes.split_at(4);
        let data = match body {
            [] => Vec::new(),
            [lc, rest @ ..] => {
                let lc = *lc as usize;
                match rest.len().checked_sub(lc)? {
                    0 | 1 => rest[..lc].to_vec(),
                    _ => return None,
                }
            }
        };
        Some(Self {
            cla: header[0],
            ins: header[1],
            p1: header[2],
            p2: header[3],
            data,
        })
    }

    /// True for a SELECT-by-name carrying exactly `aid`.
    pub fn is_select_of(&self, aid: &[u8]) -> bool {
        self.header() == SELECT_HEADER && self.data == aid
    }
}

/// A response APDU: body plus status word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseApdu {
    pub data: Vec<u8>,
    pub status: StatusWord,
}

impl ResponseApdu {
    pub fn success(data: Vec<u8>) -> Self {
        Self {
            data,
            status: StatusWord::SUCCESS,
        }
    }

    pub fn failure() -> Self {
        Self {
            data: Vec::new(),
            status: StatusWord::FAILURE,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() + 2);
        out.extend_from_slice(&self.data);
        out.extend_from_slice(&self.status.0);
        out
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, TransportError> {
        if bytes.len() < 2 {
            return Err(TransportError::MalformedResponse(bytes.len()));
        }
        let (data, status) = bytes.split_at(bytes.len() - 2);
        Ok(Self {
            data: data.to_vec(),
            status: StatusWord([status[0], status[1]]),
        })
    }

    /// The body as UTF-8, if the status is success.
    pub fn into_payload(self) -> Result<String, TransportError> {
        if !self.status.is_success() {
            return Err(TransportError::StatusWord(self.status));
        }
        String::from_utf8(self.data).map_err(|_| TransportError::MalformedPayload)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_wire_bytes() {
        assert_eq!(
            CommandApdu::select_payment().encode().unwrap(),
            vec![0x00, 0xA4, 0x04, 0x00, 0x07, 0xF0, 0x54, 0x41, 0x50, 0x41, 0x59, 0x01]
        );
    }

    #[test]
    fn oversized_command_data_is_refused() {
        let max = CommandApdu::select(&[0xAB; 255]).encode().unwrap();
        assert_eq!(max.len(), 4 + 1 + 255);
        assert_eq!(max[4], 0xFF);

        assert_eq!(
            CommandApdu::select(&[0xAB; 256]).encode(),
            Err(TransportError::CommandTooLong(256))
        );
    }

    #[test]
    fn command_without_data_has_no_lc() {
        let mut cmd = CommandApdu::select(&[]);
        cmd.ins = 0xB0;
        assert_eq!(cmd.encode().unwrap(), vec![0x00, 0xB0, 0x04, 0x00]);
    }

    #[test]
    fn parse_select_with_and_without_le() {
        let mut bytes = CommandApdu::select_payment().encode().unwrap();
        let cmd = CommandApdu::parse(&bytes).unwrap();
        assert!(cmd.is_select_of(&AID));

        bytes.push(0x00);
        let cmd = CommandApdu::parse(&bytes).unwrap();
        assert!(cmd.is_select_of(&AID));
    }

    #[test]
    fn parse_rejects_bad_lengths() {
        assert_eq!(CommandApdu::parse(&[0x00, 0xA4, 0x04]), None);
        // Lc says 7, only 3 bytes follow.
        assert_eq!(CommandApdu::parse(&[0x00, 0xA4, 0x04, 0x00, 0x07, 1, 2, 3]), None);
        // Two extra bytes after the data.
        let mut bytes = CommandApdu::select_payment().encode().unwrap();
        bytes.extend_from_slice(&[0, 0]);
        assert_eq!(CommandApdu::parse(&bytes), None);
    }

    #[test]
    fn other_aid_is_not_ours() {
        let cmd = CommandApdu::select(&[0xA0, 0x00, 0x00, 0x00, 0x03]);
        assert!(!cmd.is_select_of(&AID));
        let mut wrong_ins = CommandApdu::select_payment();
        wrong_ins.ins = 0xB0;
        assert!(!wrong_ins.is_select_of(&AID));
    }

    #[test]
    fn response_framing() {
        let resp = ResponseApdu::success(b"hi".to_vec());
        assert_eq!(resp.encode(), vec![b'h', b'i', 0x90, 0x00]);
        assert_eq!(ResponseApdu::failure().encode(), vec![0x6F, 0x00]);

        let parsed = ResponseApdu::parse(&[b'o', b'k', 0x90, 0x00]).unwrap();
        assert_eq!(parsed.into_payload().unwrap(), "ok");
    }

    #[test]
    fn response_errors() {
        assert_eq!(
            ResponseApdu::parse(&[0x90]),
            Err(TransportError::MalformedResponse(1))
        );
        assert_eq!(
            ResponseApdu::parse(&[0x6F, 0x00]).unwrap().into_payload(),
            Err(TransportError::StatusWord(StatusWord::FAILURE))
        );
        assert_eq!(
            ResponseApdu::parse(&[0xFF, 0xFE, 0x90, 0x00]).unwrap().into_payload(),
            Err(TransportError::MalformedPayload)
        );
    }

    #[test]
    fn status_word_display() {
        assert_eq!(StatusWord::FAILURE.to_string(), "6F00");
        assert_eq!(StatusWord([0x6A, 0x82]).to_string(), "6A82");
    }
}
