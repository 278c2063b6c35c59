//! # Peer Protocol Messages
//!
//! The closed set of messages peers exchange, plus the wire codec.
//!
//! ## Wire Format
//!
//! One JSON object per frame, `{"type": <u8>, "data"?: <string>}`:
//!
//! | type | variant       | data                                   |
//! |------|---------------|----------------------------------------|
//! | 0    | `QueryLatest` | absent                                 |
//! | 1    | `QueryAll`    | absent                                 |
//! | 2    | `ChainData`   | JSON **string** holding a block array  |
//!
//! The block array is double-encoded (a JSON string inside the envelope),
//! matching the envelope layout used by compatible peers.
//!
//! Decoding happens once, at the boundary. Everything past
//! [`Message::decode`] works with the typed enum and matches it
//! exhaustively.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::block::Block;

/// Wire tag for [`Message::QueryLatest`].
pub const QUERY_LATEST: u8 = 0;
/// Wire tag for [`Message::QueryAll`].
pub const QUERY_ALL: u8 = 1;
/// Wire tag for [`Message::ChainData`].
pub const RESPONSE_BLOCKCHAIN: u8 = 2;

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A decoded peer protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// "Send me your latest block."
    QueryLatest,
    /// "Send me your whole chain."
    QueryAll,
    /// A response carrying blocks: either the single latest block or a full
    /// chain, depending on what was asked.
    ChainData { blocks: Vec<Block> },
}

impl Message {
    /// Convenience constructor for a single-block `ChainData`.
    pub fn latest(block: Block) -> Self {
        Message::ChainData {
            blocks: vec![block],
        }
    }

    /// The numeric wire tag of this message.
    pub fn tag(&self) -> u8 {
        match self {
            Message::QueryLatest => QUERY_LATEST,
            Message::QueryAll => QUERY_ALL,
            Message::ChainData { .. } => RESPONSE_BLOCKCHAIN,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::QueryLatest => "query_latest",
            Message::QueryAll => "query_all",
            Message::ChainData { .. } => "chain_data",
        }
    }

    /// Encode into a single JSON frame (without the trailing newline).
    pub fn encode(&self) -> Result<String, ProtocolError> {
        let data = match self {
            Message::QueryLatest | Message::QueryAll => None,
            Message::ChainData { blocks } => {
                Some(serde_json::to_string(blocks).map_err(ProtocolError::Encode)?)
            }
        };

        let wire = WireMessage {
            kind: self.tag(),
            data,
        };
        serde_json::to_string(&wire).map_err(ProtocolError::Encode)
    }

    /// Decode one JSON frame received from a peer.
    ///
    /// Everything about the frame is untrusted: unknown tags, a missing
    /// payload, or a payload that is not a block array are all reported as
    /// [`ProtocolError`]s rather than panics.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let wire: WireMessage = serde_json::from_str(frame).map_err(ProtocolError::Envelope)?;

        match wire.kind {
            QUERY_LATEST => Ok(Message::QueryLatest),
            QUERY_ALL => Ok(Message::QueryAll),
            RESPONSE_BLOCKCHAIN => {
                let data = wire.data.ok_or(ProtocolError::MissingData)?;
                let blocks: Vec<Block> =
                    serde_json::from_str(&data).map_err(ProtocolError::MalformedBlocks)?;
                Ok(Message::ChainData { blocks })
            }
            other => Err(ProtocolError::UnknownType(other)),
        }
    }
}

/// On-the-wire envelope. Only the codec ever sees this type.
#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<String>,
}

// ---------------------------------------------------------------------------
// ProtocolError
// ---------------------------------------------------------------------------

/// Failures while encoding or decoding a peer message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame is not a valid JSON envelope.
    #[error("malformed envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    /// The envelope's `type` is not one we know.
    #[error("unknown message type: {0}")]
    UnknownType(u8),

    /// A `ChainData` envelope arrived without its `data` field.
    #[error("chain data message without payload")]
    MissingData,

    /// The `data` field is not a JSON array of blocks.
    #[error("malformed block payload: {0}")]
    MalformedBlocks(#[source] serde_json::Error),

    /// Serialization of an outbound message failed.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries_encode_without_data() {
        assert_eq!(Message::QueryLatest.encode().unwrap(), r#"{"type":0}"#);
        assert_eq!(Message::QueryAll.encode().unwrap(), r#"{"type":1}"#);
    }

    #[test]
    fn chain_data_carries_a_json_string() {
        let frame = Message::latest(Block::genesis()).encode().unwrap();
        let envelope: serde_json::Value = serde_json::from_str(&frame).unwrap();

        assert_eq!(envelope["type"], 2);
        let inner = envelope["data"].as_str().expect("data is a string");
        let blocks: Vec<Block> = serde_json::from_str(inner).unwrap();
        assert_eq!(blocks, vec![Block::genesis()]);
    }

    #[test]
    fn decode_accepts_encoded_chain() {
        let genesis = Block::genesis();
        let next = Block::next(&genesis, 1_700_000_000, "x");
        let msg = Message::ChainData {
            blocks: vec![genesis, next],
        };

        let decoded = Message::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn decode_accepts_hand_written_query() {
        assert_eq!(Message::decode(r#"{"type": 1}"#).unwrap(), Message::QueryAll);
    }

    #[test]
    fn decode_rejects_unknown_type() {
        let err = Message::decode(r#"{"type":9}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownType(9)));
    }

    #[test]
    fn decode_rejects_missing_data() {
        let err = Message::decode(r#"{"type":2}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingData));
    }

    #[test]
    fn decode_rejects_non_block_payload() {
        let err = Message::decode(r#"{"type":2,"data":"[{\"index\":\"one\"}]"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedBlocks(_)));
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = Message::decode("not json at all").unwrap_err();
        assert!(matches!(err, ProtocolError::Envelope(_)));
    }

    #[test]
    fn decode_accepts_empty_block_array() {
        // Well-formed on the wire; the synchronizer decides what to do with it.
        let decoded = Message::decode(r#"{"type":2,"data":"[]"}"#).unwrap();
        assert_eq!(decoded, Message::ChainData { blocks: vec![] });
    }

    #[test]
    fn tags_match_wire_constants() {
        assert_eq!(Message::QueryLatest.tag(), QUERY_LATEST);
        assert_eq!(Message::QueryAll.tag(), QUERY_ALL);
        assert_eq!(Message::latest(Block::genesis()).tag(), RESPONSE_BLOCKCHAIN);
    }
}
