//! Transaction envelopes
//!
//! Envelopes use the ledger's protobuf layout: an [`Envelope`] carries a
//! marshaled [`Payload`], whose [`Header`] carries a marshaled
//! [`ChannelHeader`]. The adapter only checks that this nesting is
//! well-formed; signatures and creator identities are verified elsewhere.

use crate::{Error, Result};
use prost::Message;

/// Channel header type for endorser transactions
pub const HEADER_TYPE_ENDORSER_TRANSACTION: i32 = 3;

/// Signed transaction wrapper submitted for ordering
#[derive(Clone, PartialEq, Message)]
pub struct Envelope {
    /// Marshaled [`Payload`]
    #[prost(bytes = "vec", tag = "1")]
    pub payload: Vec<u8>,

    /// Creator signature over `payload`
    #[prost(bytes = "vec", tag = "2")]
    pub signature: Vec<u8>,
}

/// Envelope payload
#[derive(Clone, PartialEq, Message)]
pub struct Payload {
    /// Transaction header
    #[prost(message, optional, tag = "1")]
    pub header: Option<Header>,

    /// Opaque transaction body
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
}

/// Payload header
#[derive(Clone, PartialEq, Message)]
pub struct Header {
    /// Marshaled [`ChannelHeader`]
    #[prost(bytes = "vec", tag = "1")]
    pub channel_header: Vec<u8>,

    /// Marshaled signature header (creator + nonce)
    #[prost(bytes = "vec", tag = "2")]
    pub signature_header: Vec<u8>,
}

/// Channel-scoped part of the header
#[derive(Clone, PartialEq, Message)]
pub struct ChannelHeader {
    /// Header type
    #[prost(int32, tag = "1")]
    pub r#type: i32,

    /// Message protocol version
    #[prost(int32, tag = "2")]
    pub version: i32,

    /// Creation time at the sender
    #[prost(message, optional, tag = "3")]
    pub timestamp: Option<prost_types::Timestamp>,

    /// Ledger channel this message is bound for
    #[prost(string, tag = "4")]
    pub channel_id: String,

    /// Transaction id
    #[prost(string, tag = "5")]
    pub tx_id: String,

    /// Epoch in which the header was generated
    #[prost(uint64, tag = "6")]
    pub epoch: u64,

    /// Type-specific extension
    #[prost(bytes = "vec", tag = "7")]
    pub extension: Vec<u8>,
}

impl Envelope {
    /// Build an unsigned endorser-transaction envelope for `channel_id`
    pub fn for_channel(channel_id: &str, tx_id: &str, data: Vec<u8>) -> Self {
        let channel_header = ChannelHeader {
            r#type: HEADER_TYPE_ENDORSER_TRANSACTION,
            version: 0,
            timestamp: None,
            channel_id: channel_id.to_string(),
            tx_id: tx_id.to_string(),
            epoch: 0,
            extension: Vec::new(),
        };

        let payload = Payload {
            header: Some(Header {
                channel_header: channel_header.encode_to_vec(),
                signature_header: Vec::new(),
            }),
            data,
        };

        Self {
            payload: payload.encode_to_vec(),
            signature: Vec::new(),
        }
    }
}

/// Status codes returned by the transaction handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Status {
    /// Accepted
    Success = 200,
    /// Malformed transaction
    BadRequest = 400,
    /// Rejected for a reason unrelated to the transaction itself
    InternalServerError = 500,
}

impl Status {
    /// Wire code
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Parse a wire code
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            200 => Some(Status::Success),
            400 => Some(Status::BadRequest),
            500 => Some(Status::InternalServerError),
            _ => None,
        }
    }
}

/// Structural validation failures
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Bytes are not an envelope
    #[error("malformed envelope: {0}")]
    Envelope(prost::DecodeError),

    /// Envelope payload is not a payload
    #[error("malformed payload: {0}")]
    Payload(prost::DecodeError),

    /// Payload has no header
    #[error("missing header")]
    MissingHeader,

    /// Header has no channel header
    #[error("missing channel header")]
    MissingChannelHeader,

    /// Channel header bytes do not decode
    #[error("bad channel header: {0}")]
    ChannelHeader(prost::DecodeError),
}

/// Encode an envelope for submission to the engine
pub fn marshal_envelope(envelope: &Envelope) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(envelope.encoded_len());
    envelope
        .encode(&mut buf)
        .map_err(|e| Error::Marshal(e.to_string()))?;
    Ok(buf)
}

/// Decode envelope bytes without looking inside the payload
pub fn unmarshal_envelope(bytes: &[u8]) -> std::result::Result<Envelope, ValidationError> {
    Envelope::decode(bytes).map_err(ValidationError::Envelope)
}

/// Check that `bytes` is an envelope with a header and a channel header
///
/// Returns the decoded channel header on success.
pub fn validate_structure(bytes: &[u8]) -> std::result::Result<ChannelHeader, ValidationError> {
    let envelope = unmarshal_envelope(bytes)?;

    let payload =
        Payload::decode(envelope.payload.as_slice()).map_err(ValidationError::Payload)?;

    let header = payload.header.ok_or(ValidationError::MissingHeader)?;

    if header.channel_header.is_empty() {
        return Err(ValidationError::MissingChannelHeader);
    }

    ChannelHeader::decode(header.channel_header.as_slice()).map_err(ValidationError::ChannelHeader)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headerless_envelope() -> Envelope {
        let payload = Payload {
            header: None,
            data: b"body".to_vec(),
        };
        Envelope {
            payload: payload.encode_to_vec(),
            signature: Vec::new(),
        }
    }

    #[test]
    fn test_well_formed_envelope_passes() {
        let envelope = Envelope::for_channel("mychannel", "tx-1", b"hello".to_vec());
        let bytes = marshal_envelope(&envelope).unwrap();

        let channel_header = validate_structure(&bytes).unwrap();
        assert_eq!(channel_header.channel_id, "mychannel");
        assert_eq!(channel_header.tx_id, "tx-1");
        assert_eq!(channel_header.r#type, HEADER_TYPE_ENDORSER_TRANSACTION);
    }

    #[test]
    fn test_marshal_then_unmarshal_preserves_envelope() {
        let envelope = Envelope::for_channel("mychannel", "tx-2", vec![1, 2, 3]);
        let bytes = marshal_envelope(&envelope).unwrap();
        assert_eq!(unmarshal_envelope(&bytes).unwrap(), envelope);
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        // Truncated varint
        let err = validate_structure(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, ValidationError::Envelope(_)));
    }

    #[test]
    fn test_bad_payload_rejected() {
        // Length-delimited field claims 5 bytes, carries 1
        let envelope = Envelope {
            payload: vec![0x0a, 0x05, 0x01],
            signature: Vec::new(),
        };
        let bytes = marshal_envelope(&envelope).unwrap();

        let err = validate_structure(&bytes).unwrap_err();
        assert!(matches!(err, ValidationError::Payload(_)));
    }

    #[test]
    fn test_missing_header_rejected() {
        let bytes = marshal_envelope(&headerless_envelope()).unwrap();
        assert_eq!(
            validate_structure(&bytes).unwrap_err(),
            ValidationError::MissingHeader
        );
    }

    #[test]
    fn test_empty_envelope_has_no_header() {
        let bytes = marshal_envelope(&Envelope::default()).unwrap();
        assert_eq!(
            validate_structure(&bytes).unwrap_err(),
            ValidationError::MissingHeader
        );
    }

    #[test]
    fn test_missing_channel_header_rejected() {
        let payload = Payload {
            header: Some(Header::default()),
            data: Vec::new(),
        };
        let envelope = Envelope {
            payload: payload.encode_to_vec(),
            signature: Vec::new(),
        };
        let bytes = marshal_envelope(&envelope).unwrap();

        assert_eq!(
            validate_structure(&bytes).unwrap_err(),
            ValidationError::MissingChannelHeader
        );
    }

    #[test]
    fn test_bad_channel_header_rejected() {
        let payload = Payload {
            header: Some(Header {
                channel_header: vec![0x22, 0x10],
                signature_header: Vec::new(),
            }),
            data: Vec::new(),
        };
        let envelope = Envelope {
            payload: payload.encode_to_vec(),
            signature: Vec::new(),
        };
        let bytes = marshal_envelope(&envelope).unwrap();

        assert!(matches!(
            validate_structure(&bytes).unwrap_err(),
            ValidationError::ChannelHeader(_)
        ));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Status::Success.code(), 200);
        assert_eq!(Status::BadRequest.code(), 400);
        assert_eq!(Status::InternalServerError.code(), 500);
        assert_eq!(Status::from_code(400), Some(Status::BadRequest));
        assert_eq!(Status::from_code(0), None);
    }
}
