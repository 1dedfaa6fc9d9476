//! Action/receipt message layer.
//!
//! Hand-encoded protobuf messages for the venue's `/action` endpoint.
//! Field numbers are part of the wire contract:
//!
//! ```text
//! Action {
//!     current_timestamp = 1   // server-reported epoch seconds
//!     nonce             = 2
//!     oneof kind {
//!         create_session     = 3
//!         place_order        = 4
//!         cancel_order_by_id = 5
//!     }
//! }
//! CreateSession { user_pubkey = 1, session_pubkey = 2, expiry_timestamp = 3 }
//! PlaceOrder    { session_id = 1, market_id = 2, side = 3, fill_mode = 4,
//!                 is_reduce_only = 5, price = 6, size = 7 }
//! CancelOrderById { session_id = 1, order_id = 2 }
//! Receipt {
//!     err                   = 1
//!     create_session_result = 2 { session_id = 1 }
//!     place_order_result    = 3 { posted = 1 { order_id = 1 } }
//! }
//! ```

use thiserror::Error;

use grid_core::{FillMode, OrderSide};

use crate::codec::{CodecError, Decoder, Encoder, FieldValue};

/// Venue-reported rejection codes, mapped at the boundary into a closed
/// enum. Codes this client does not recognize are preserved as
/// `Unknown` and never retried.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VenueError {
    #[error("session expired")]
    SessionExpired,
    #[error("session not found")]
    SessionNotFound,
    #[error("duplicate session key")]
    SessionDuplicate,
    #[error("order not found")]
    OrderNotFound,
    #[error("post-only order would cross")]
    PostOnlyWouldCross,
    #[error("insufficient margin")]
    InsufficientMargin,
    #[error("invalid price")]
    InvalidPrice,
    #[error("invalid size")]
    InvalidSize,
    #[error("reduce-only violation")]
    ReduceOnlyViolation,
    #[error("rate limited")]
    RateLimited,
    #[error("unknown venue error code {0}")]
    Unknown(u64),
}

impl VenueError {
    #[must_use]
    pub fn from_code(code: u64) -> Self {
        match code {
            1 => Self::SessionExpired,
            2 => Self::SessionNotFound,
            3 => Self::SessionDuplicate,
            4 => Self::OrderNotFound,
            5 => Self::PostOnlyWouldCross,
            6 => Self::InsufficientMargin,
            7 => Self::InvalidPrice,
            8 => Self::InvalidSize,
            9 => Self::ReduceOnlyViolation,
            10 => Self::RateLimited,
            other => Self::Unknown(other),
        }
    }

    /// Session-class errors invalidate the session and permit exactly
    /// one recreate-and-retry.
    #[must_use]
    pub fn is_session_error(&self) -> bool {
        matches!(
            self,
            Self::SessionExpired | Self::SessionNotFound | Self::SessionDuplicate
        )
    }

    /// A cancel hitting this means the order already matched: it is a
    /// fill, not a failure.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::OrderNotFound)
    }
}

/// The payload variants an [`Action`] can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    CreateSession {
        user_pubkey: [u8; 32],
        session_pubkey: [u8; 32],
        expiry_timestamp: u64,
    },
    PlaceOrder {
        session_id: u64,
        market_id: u32,
        side: OrderSide,
        fill_mode: FillMode,
        is_reduce_only: bool,
        raw_price: u64,
        raw_size: u64,
    },
    CancelOrderById {
        session_id: u64,
        order_id: u64,
    },
}

/// One outbound intent, timestamped and nonced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Server-reported epoch seconds.
    pub current_timestamp: u64,
    pub nonce: u64,
    pub kind: ActionKind,
}

const SIDE_BID: u64 = 0;
const SIDE_ASK: u64 = 1;

const FILL_MODE_LIMIT: u64 = 0;
const FILL_MODE_POST_ONLY: u64 = 1;
const FILL_MODE_IOC: u64 = 2;

fn side_code(side: OrderSide) -> u64 {
    match side {
        OrderSide::Buy => SIDE_BID,
        OrderSide::Sell => SIDE_ASK,
    }
}

fn fill_mode_code(mode: FillMode) -> u64 {
    match mode {
        FillMode::Limit => FILL_MODE_LIMIT,
        FillMode::PostOnly => FILL_MODE_POST_ONLY,
        FillMode::Immediate => FILL_MODE_IOC,
    }
}

impl Action {
    /// Serialize to protobuf bytes (unframed, unsigned).
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.uint(1, self.current_timestamp).uint(2, self.nonce);

        match &self.kind {
            ActionKind::CreateSession {
                user_pubkey,
                session_pubkey,
                expiry_timestamp,
            } => {
                let mut inner = Encoder::new();
                inner
                    .bytes(1, user_pubkey)
                    .bytes(2, session_pubkey)
                    .uint(3, *expiry_timestamp);
                enc.message(3, &inner.into_bytes());
            }
            ActionKind::PlaceOrder {
                session_id,
                market_id,
                side,
                fill_mode,
                is_reduce_only,
                raw_price,
                raw_size,
            } => {
                let mut inner = Encoder::new();
                inner
                    .uint(1, *session_id)
                    .uint(2, u64::from(*market_id))
                    .uint(3, side_code(*side))
                    .uint(4, fill_mode_code(*fill_mode))
                    .boolean(5, *is_reduce_only)
                    .uint(6, *raw_price)
                    .uint(7, *raw_size);
                enc.message(4, &inner.into_bytes());
            }
            ActionKind::CancelOrderById {
                session_id,
                order_id,
            } => {
                let mut inner = Encoder::new();
                inner.uint(1, *session_id).uint(2, *order_id);
                enc.message(5, &inner.into_bytes());
            }
        }

        enc.into_bytes()
    }
}

/// Decoded response to an action. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Receipt {
    pub err: Option<u64>,
    pub session_id: Option<u64>,
    pub order_id: Option<u64>,
}

impl Receipt {
    /// Parse from protobuf bytes, skipping unknown fields.
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let mut receipt = Receipt::default();

        let mut dec = Decoder::new(data);
        while let Some(field) = dec.next_field() {
            match field? {
                (1, FieldValue::Varint(code)) => receipt.err = Some(code),
                (2, FieldValue::Bytes(inner)) => {
                    receipt.session_id = Self::decode_session_result(inner)?;
                }
                (3, FieldValue::Bytes(inner)) => {
                    receipt.order_id = Self::decode_place_result(inner)?;
                }
                _ => {}
            }
        }

        Ok(receipt)
    }

    fn decode_session_result(data: &[u8]) -> Result<Option<u64>, CodecError> {
        let mut dec = Decoder::new(data);
        while let Some(field) = dec.next_field() {
            if let (1, FieldValue::Varint(id)) = field? {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    fn decode_place_result(data: &[u8]) -> Result<Option<u64>, CodecError> {
        let mut dec = Decoder::new(data);
        while let Some(field) = dec.next_field() {
            if let (1, FieldValue::Bytes(posted)) = field? {
                let mut inner = Decoder::new(posted);
                while let Some(field) = inner.next_field() {
                    if let (1, FieldValue::Varint(id)) = field? {
                        return Ok(Some(id));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Venue rejection, if any.
    #[must_use]
    pub fn error(&self) -> Option<VenueError> {
        self.err.map(VenueError::from_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_varint;

    #[test]
    fn test_place_order_byte_layout() {
        let action = Action {
            current_timestamp: 100,
            nonce: 7,
            kind: ActionKind::PlaceOrder {
                session_id: 5,
                market_id: 0,
                side: OrderSide::Sell,
                fill_mode: FillMode::PostOnly,
                is_reduce_only: false,
                raw_price: 300,
                raw_size: 10,
            },
        };

        // Hand-assembled expectation. market_id 0 and reduce_only false
        // are omitted as proto3 defaults.
        let expected = vec![
            0x08, 100, // field 1 varint 100
            0x10, 7, // field 2 varint 7
            0x22, 11, // field 4, length 11
            0x08, 5, // session_id = 5
            0x18, 1, // side = ASK
            0x20, 1, // fill_mode = POST_ONLY
            0x30, 0xac, 0x02, // price = 300
            0x38, 10, // size = 10
        ];
        assert_eq!(action.encode(), expected);
    }

    #[test]
    fn test_create_session_encodes_both_pubkeys() {
        let action = Action {
            current_timestamp: 1_700_000_000,
            nonce: 1,
            kind: ActionKind::CreateSession {
                user_pubkey: [0xaa; 32],
                session_pubkey: [0xbb; 32],
                expiry_timestamp: 1_700_003_600,
            },
        };

        let bytes = action.encode();
        let mut dec = Decoder::new(&bytes);
        assert!(matches!(
            dec.next_field().unwrap().unwrap(),
            (1, FieldValue::Varint(1_700_000_000))
        ));
        assert!(matches!(
            dec.next_field().unwrap().unwrap(),
            (2, FieldValue::Varint(1))
        ));
        let (field, FieldValue::Bytes(inner)) = dec.next_field().unwrap().unwrap() else {
            panic!("expected embedded create_session message");
        };
        assert_eq!(field, 3);

        let mut inner_dec = Decoder::new(inner);
        assert_eq!(
            inner_dec.next_field().unwrap().unwrap(),
            (1, FieldValue::Bytes(&[0xaa; 32][..]))
        );
        assert_eq!(
            inner_dec.next_field().unwrap().unwrap(),
            (2, FieldValue::Bytes(&[0xbb; 32][..]))
        );
    }

    #[test]
    fn test_receipt_decodes_error_code() {
        // err = 4 (order not found)
        let receipt = Receipt::decode(&[0x08, 0x04]).unwrap();
        assert_eq!(receipt.err, Some(4));
        assert_eq!(receipt.error(), Some(VenueError::OrderNotFound));
        assert!(receipt.error().unwrap().is_not_found());
    }

    #[test]
    fn test_receipt_decodes_session_result() {
        let mut inner = Vec::new();
        inner.push(0x08);
        encode_varint(9_000, &mut inner);

        let mut body = vec![0x12, inner.len() as u8];
        body.extend_from_slice(&inner);

        let receipt = Receipt::decode(&body).unwrap();
        assert_eq!(receipt.session_id, Some(9_000));
        assert!(receipt.error().is_none());
    }

    #[test]
    fn test_receipt_decodes_posted_order_id() {
        // place_order_result { posted { order_id = 123456 } }
        let mut posted = Vec::new();
        posted.push(0x08);
        encode_varint(123_456, &mut posted);

        let mut result = vec![0x0a, posted.len() as u8];
        result.extend_from_slice(&posted);

        let mut body = vec![0x1a, result.len() as u8];
        body.extend_from_slice(&result);

        let receipt = Receipt::decode(&body).unwrap();
        assert_eq!(receipt.order_id, Some(123_456));
    }

    #[test]
    fn test_receipt_skips_unknown_fields() {
        // field 9 varint, then err = 1
        let receipt = Receipt::decode(&[0x48, 0x2a, 0x08, 0x01]).unwrap();
        assert_eq!(receipt.error(), Some(VenueError::SessionExpired));
    }

    #[test]
    fn test_error_classification() {
        assert!(VenueError::from_code(1).is_session_error());
        assert!(VenueError::from_code(2).is_session_error());
        assert!(VenueError::from_code(3).is_session_error());
        assert!(!VenueError::from_code(4).is_session_error());
        assert!(!VenueError::from_code(99).is_session_error());
        assert_eq!(VenueError::from_code(99), VenueError::Unknown(99));
    }
}
