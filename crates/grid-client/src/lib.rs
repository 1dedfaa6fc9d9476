//! Signed session protocol client.
//!
//! Turns typed trading intents into signed binary requests against the
//! remote venue and decodes the results, hiding session lifecycle from
//! callers. The wire protocol is length-prefixed protobuf over
//! `POST /action`: a request body is `varint(len(payload)) || payload ||
//! signature`, where the signature covers the length-prefixed payload.
//!
//! Two signing keys exist: the operator's long-lived ed25519 user key
//! signs only `CreateSession`; a fresh ephemeral session key signs every
//! subsequent action.

pub mod api;
pub mod client;
pub mod codec;
pub mod error;
pub mod keys;
pub mod nonce;
pub mod session;
pub mod wire;

pub use api::{CancelOutcome, DynVenue, MockVenue, PlaceRequest, Venue};
pub use client::{ClientConfig, VenueClient};
pub use codec::{decode_varint, encode_varint, CodecError};
pub use error::{ClientError, ClientResult};
pub use keys::{KeyError, KeyManager, KeySource};
pub use nonce::NonceManager;
pub use session::Session;
pub use wire::VenueError;
