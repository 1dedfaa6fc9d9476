//! HTTP venue client.
//!
//! Market data comes from plain JSON GET endpoints. Trading actions go
//! through `POST /action` as `varint(len(payload)) || payload ||
//! signature`, where the 64-byte ed25519 signature covers the
//! length-prefixed payload. Responses are `varint(len) || receipt`,
//! unsigned.
//!
//! Session handling is internal: the first action after construction
//! creates a session, actions near the 55-minute mark renew it, and a
//! session-class rejection triggers exactly one recreate-and-retry.

use std::sync::Arc;
use std::time::Duration;

use ed25519_dalek::Signature;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use grid_core::{BookTop, BoxFuture, Clock, MarketPrecision, Price};

use crate::api::{CancelOutcome, PlaceRequest, Venue};
use crate::codec::{decode_varint, encode_varint};
use crate::error::{ClientError, ClientResult};
use crate::keys::{KeyManager, KeySource};
use crate::nonce::NonceManager;
use crate::session::{Session, SESSION_TTL_SECS};
use crate::wire::{Action, ActionKind, Receipt};

/// Per-request timeout. The trading loop runs on a seconds cadence, so
/// a slow venue call is better abandoned than awaited.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay between cancels in a batch, to stay under venue rate limits.
const CANCEL_PACING_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub market_id: u32,
    pub key_source: KeySource,
}

pub struct VenueClient {
    http: reqwest::Client,
    base_url: String,
    market_id: u32,
    user_keys: KeyManager,
    precision: MarketPrecision,
    session: tokio::sync::Mutex<Option<Session>>,
    nonce: NonceManager<Arc<dyn Clock>>,
    clock: Arc<dyn Clock>,
}

impl VenueClient {
    /// Build the client, read market precision, and establish the
    /// initial session. Fails fast on bad keys or an unreachable venue.
    pub async fn connect(config: ClientConfig, clock: Arc<dyn Clock>) -> ClientResult<Self> {
        let user_keys = KeyManager::load(&config.key_source)?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let base_url = config.base_url.trim_end_matches('/').to_string();

        let precision = Self::fetch_precision(&http, &base_url, config.market_id).await?;
        info!(
            base_url = %base_url,
            market_id = config.market_id,
            price_decimals = precision.price_decimals,
            size_decimals = precision.size_decimals,
            user_key = %user_keys.fingerprint(),
            "connecting to venue"
        );

        let client = Self {
            http,
            base_url,
            market_id: config.market_id,
            user_keys,
            precision,
            session: tokio::sync::Mutex::new(None),
            nonce: NonceManager::new(Arc::clone(&clock)),
            clock,
        };

        let session = client.create_session().await?;
        *client.session.lock().await = Some(session);
        Ok(client)
    }

    #[must_use]
    pub fn precision(&self) -> MarketPrecision {
        self.precision
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn fetch_precision(
        http: &reqwest::Client,
        base_url: &str,
        market_id: u32,
    ) -> ClientResult<MarketPrecision> {
        let resp = http.get(format!("{base_url}/info")).send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::Http(resp.status().as_u16()));
        }
        let info: Value = resp.json().await?;
        Ok(precision_from_info(&info, market_id))
    }

    /// Venue wall clock in epoch seconds, falling back to the local
    /// clock when the endpoint is unavailable.
    async fn server_time_secs(&self) -> u64 {
        match self.fetch_server_time().await {
            Ok(secs) => secs,
            Err(err) => {
                warn!(error = %err, "server time unavailable, using local clock");
                self.clock.now_secs()
            }
        }
    }

    async fn fetch_server_time(&self) -> ClientResult<u64> {
        let resp = self.http.get(self.url("/timestamp")).send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::Http(resp.status().as_u16()));
        }
        let text = resp.text().await?;
        text.trim()
            .parse()
            .map_err(|_| ClientError::Protocol(format!("non-numeric timestamp: {text:?}")))
    }

    /// Register a fresh ephemeral session key, signed by the user key.
    async fn create_session(&self) -> ClientResult<Session> {
        let keypair = Session::generate_keypair();
        let created_at_ms = self.clock.now_ms();
        let server_secs = self.server_time_secs().await;

        let action = create_session_action(
            server_secs,
            self.nonce.next(),
            self.user_keys.pubkey_bytes(),
            keypair.verifying_key().to_bytes(),
        );

        let payload = action.encode();
        let receipt = self
            .execute_signed(&payload, |frame| self.user_keys.sign(frame))
            .await?;
        let session_id = receipt
            .session_id
            .ok_or_else(|| ClientError::Protocol("create-session receipt missing session id".into()))?;

        info!(session_id, "session established");
        Ok(Session::new(session_id, keypair, created_at_ms))
    }

    /// Run one session-signed action, renewing proactively and retrying
    /// at most once after a session-class rejection.
    async fn send_session_action<F>(&self, build: F) -> ClientResult<Receipt>
    where
        F: Fn(u64) -> ActionKind,
    {
        let mut slot = self.session.lock().await;
        let mut retried = false;

        loop {
            if slot
                .as_ref()
                .map_or(true, |s| s.should_renew(self.clock.now_ms()))
            {
                if slot.is_some() {
                    debug!("session nearing expiry, renewing");
                }
                *slot = Some(self.create_session().await?);
            }
            let session = match slot.as_ref() {
                Some(session) => session,
                None => continue,
            };

            let action = Action {
                current_timestamp: self.server_time_secs().await,
                nonce: self.nonce.next(),
                kind: build(session.id()),
            };
            let payload = action.encode();

            let result = self
                .execute_signed(&payload, |frame| session.sign(frame))
                .await;
            match result {
                Err(ClientError::Venue(err)) if err.is_session_error() && !retried => {
                    warn!(error = %err, "session rejected by venue, recreating");
                    *slot = None;
                    retried = true;
                }
                other => return other,
            }
        }
    }

    /// Frame, sign, POST, and decode one action round trip.
    async fn execute_signed<F>(&self, payload: &[u8], sign: F) -> ClientResult<Receipt>
    where
        F: FnOnce(&[u8]) -> Signature,
    {
        let mut body = frame_payload(payload);
        let signature = sign(&body);
        body.extend_from_slice(&signature.to_bytes());

        let resp = self
            .http
            .post(self.url("/action"))
            .header("content-type", "application/octet-stream")
            .body(body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ClientError::Http(resp.status().as_u16()));
        }

        let bytes = resp.bytes().await?;
        decode_receipt_body(&bytes)
    }

    pub async fn place_order(&self, request: PlaceRequest) -> ClientResult<u64> {
        let raw_price = request
            .price
            .to_raw(self.precision.price_decimals)
            .ok_or_else(|| {
                ClientError::InvalidRequest(format!("price {} not representable", request.price))
            })?;
        let raw_size = request
            .size
            .to_raw(self.precision.size_decimals)
            .ok_or_else(|| {
                ClientError::InvalidRequest(format!("size {} not representable", request.size))
            })?;

        let receipt = self
            .send_session_action(|session_id| ActionKind::PlaceOrder {
                session_id,
                market_id: self.market_id,
                side: request.side,
                fill_mode: request.fill_mode,
                is_reduce_only: request.reduce_only,
                raw_price,
                raw_size,
            })
            .await?;
        receipt
            .order_id
            .ok_or_else(|| ClientError::Protocol("place receipt missing order id".into()))
    }

    /// Cancel one order. An order the venue no longer knows filled
    /// before the cancel arrived, which is a success for the caller.
    pub async fn cancel_order_by_id(&self, order_id: u64) -> ClientResult<CancelOutcome> {
        let result = self
            .send_session_action(|session_id| ActionKind::CancelOrderById {
                session_id,
                order_id,
            })
            .await;
        match result {
            Ok(_) => Ok(CancelOutcome::Cancelled),
            Err(ClientError::Venue(err)) if err.is_not_found() => Ok(CancelOutcome::Filled),
            Err(err) => Err(err),
        }
    }

    pub async fn fetch_mid_price(&self) -> ClientResult<Price> {
        let resp = self
            .http
            .get(self.url(&format!("/market/{}/stats", self.market_id)))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ClientError::Http(resp.status().as_u16()));
        }
        let stats: Value = resp.json().await?;

        stats
            .get("perpStats")
            .and_then(|p| p.get("mark_price"))
            .and_then(decimal_from_value)
            .map(Price::new)
            .ok_or_else(|| ClientError::Protocol("stats response missing mark price".into()))
    }

    pub async fn fetch_book_top(&self) -> ClientResult<BookTop> {
        let resp = self
            .http
            .get(self.url(&format!("/market/{}/orderbook", self.market_id)))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ClientError::Http(resp.status().as_u16()));
        }
        let book: Value = resp.json().await?;

        let level_price = |side: &str| {
            book.get(side)
                .and_then(|levels| levels.get(0))
                .and_then(|level| level.get(0))
                .and_then(decimal_from_value)
                .map(Price::new)
        };
        match (level_price("asks"), level_price("bids")) {
            (Some(best_ask), Some(best_bid)) => Ok(BookTop { best_ask, best_bid }),
            _ => Err(ClientError::Protocol("orderbook missing top of book".into())),
        }
    }
}

impl Venue for VenueClient {
    fn market_id(&self) -> u32 {
        self.market_id
    }

    fn mid_price(&self) -> BoxFuture<'_, Option<Price>> {
        Box::pin(async move {
            match self.fetch_mid_price().await {
                Ok(price) => Some(price),
                Err(err) => {
                    error!(error = %err, "failed to fetch mid price");
                    None
                }
            }
        })
    }

    fn book_top(&self) -> BoxFuture<'_, Option<BookTop>> {
        Box::pin(async move {
            match self.fetch_book_top().await {
                Ok(top) => Some(top),
                Err(err) => {
                    error!(error = %err, "failed to fetch order book");
                    None
                }
            }
        })
    }

    fn place_order(&self, request: PlaceRequest) -> BoxFuture<'_, Option<u64>> {
        Box::pin(async move {
            match self.place_order(request).await {
                Ok(order_id) => {
                    debug!(
                        order_id,
                        side = %request.side,
                        price = %request.price,
                        size = %request.size,
                        "order placed"
                    );
                    Some(order_id)
                }
                Err(err) => {
                    error!(
                        side = %request.side,
                        price = %request.price,
                        error = %err,
                        "order placement failed"
                    );
                    None
                }
            }
        })
    }

    fn cancel_order(&self, order_id: u64) -> BoxFuture<'_, CancelOutcome> {
        Box::pin(async move {
            match self.cancel_order_by_id(order_id).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(order_id, error = %err, "cancel failed");
                    CancelOutcome::Failed
                }
            }
        })
    }

    fn cancel_all(&self, order_ids: Vec<u64>) -> BoxFuture<'_, Vec<(u64, CancelOutcome)>> {
        Box::pin(async move {
            let mut outcomes = Vec::with_capacity(order_ids.len());
            for (i, order_id) in order_ids.into_iter().enumerate() {
                if i > 0 {
                    tokio::time::sleep(Duration::from_millis(CANCEL_PACING_MS)).await;
                }
                let outcome = self.cancel_order(order_id).await;
                outcomes.push((order_id, outcome));
            }
            outcomes
        })
    }
}

/// Pull price/size precision for `market_id` out of the `/info` market
/// list, falling back to the first listed market and then to defaults.
fn precision_from_info(info: &Value, market_id: u32) -> MarketPrecision {
    let defaults = MarketPrecision::default();
    let markets = info.get("markets").and_then(Value::as_array);
    let Some(market) = markets.and_then(|list| {
        list.iter()
            .find(|m| m.get("marketId").and_then(Value::as_u64) == Some(u64::from(market_id)))
            .or_else(|| list.first())
    }) else {
        return defaults;
    };

    MarketPrecision {
        price_decimals: market
            .get("priceDecimals")
            .and_then(Value::as_u64)
            .map_or(defaults.price_decimals, |v| v as u32),
        size_decimals: market
            .get("sizeDecimals")
            .and_then(Value::as_u64)
            .map_or(defaults.size_decimals, |v| v as u32),
    }
}

/// Both the action timestamp and the requested expiry derive from the
/// venue clock, so host clock skew cannot shorten the session.
fn create_session_action(
    server_time_secs: u64,
    nonce: u64,
    user_pubkey: [u8; 32],
    session_pubkey: [u8; 32],
) -> Action {
    Action {
        current_timestamp: server_time_secs,
        nonce,
        kind: ActionKind::CreateSession {
            user_pubkey,
            session_pubkey,
            expiry_timestamp: server_time_secs + SESSION_TTL_SECS,
        },
    }
}

/// `varint(len(payload)) || payload`; this is also what gets signed.
fn frame_payload(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 10);
    encode_varint(payload.len() as u64, &mut buf);
    buf.extend_from_slice(payload);
    buf
}

/// Strip the varint length prefix and decode the receipt. A venue error
/// code in the receipt surfaces as `ClientError::Venue`.
fn decode_receipt_body(bytes: &[u8]) -> ClientResult<Receipt> {
    if bytes.is_empty() {
        return Err(ClientError::Protocol("empty response body".into()));
    }
    let (len, offset) = decode_varint(bytes, 0)?;
    let len = usize::try_from(len)
        .map_err(|_| ClientError::Protocol("receipt length exceeds address space".into()))?;
    let end = offset
        .checked_add(len)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| ClientError::Protocol("receipt length overruns body".into()))?;

    let receipt = Receipt::decode(&bytes[offset..end])?;
    if let Some(err) = receipt.error() {
        return Err(ClientError::Venue(err));
    }
    Ok(receipt)
}

fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::VenueError;
    use rust_decimal_macros::dec;

    #[test]
    fn test_frame_prefixes_payload_length() {
        let payload = vec![0x55; 300];
        let framed = frame_payload(&payload);
        assert_eq!(&framed[..2], &[0xac, 0x02]);
        assert_eq!(&framed[2..], &payload[..]);
    }

    #[test]
    fn test_frame_empty_payload() {
        assert_eq!(frame_payload(&[]), vec![0x00]);
    }

    #[test]
    fn test_signature_covers_framed_payload() {
        use ed25519_dalek::{Signer, Verifier};

        let keypair = crate::session::Session::generate_keypair();
        let payload = vec![0x08, 0x01, 0x10, 0x02];

        let mut body = frame_payload(&payload);
        let signature = keypair.sign(&body);
        body.extend_from_slice(&signature.to_bytes());

        // Last 64 bytes are the signature; it verifies over everything
        // before it, i.e. the length-prefixed payload.
        let (frame, sig_bytes) = body.split_at(body.len() - 64);
        let sig = ed25519_dalek::Signature::from_slice(sig_bytes).unwrap();
        assert!(keypair.verifying_key().verify(frame, &sig).is_ok());
        // Signing the unframed payload would not match.
        assert!(keypair.verifying_key().verify(&payload, &sig).is_err());
    }

    #[test]
    fn test_decode_receipt_body_ok() {
        // Receipt { place_order_result { posted { order_id = 7 } } }
        let mut posted = vec![0x08, 0x07];
        let mut result = vec![0x0a, posted.len() as u8];
        result.append(&mut posted);
        let mut receipt_bytes = vec![0x1a, result.len() as u8];
        receipt_bytes.append(&mut result);

        let mut body = Vec::new();
        encode_varint(receipt_bytes.len() as u64, &mut body);
        body.extend_from_slice(&receipt_bytes);

        let receipt = decode_receipt_body(&body).unwrap();
        assert_eq!(receipt.order_id, Some(7));
    }

    #[test]
    fn test_decode_receipt_body_surfaces_venue_error() {
        // Receipt { err = 10 }
        let body = vec![0x02, 0x08, 0x0a];
        assert!(matches!(
            decode_receipt_body(&body),
            Err(ClientError::Venue(VenueError::RateLimited))
        ));
    }

    #[test]
    fn test_decode_receipt_body_rejects_empty() {
        assert!(matches!(
            decode_receipt_body(&[]),
            Err(ClientError::Protocol(_))
        ));
    }

    #[test]
    fn test_decode_receipt_body_rejects_overrun_length() {
        // Claims 100 bytes, provides 2.
        let body = vec![100, 0x08, 0x01];
        assert!(matches!(
            decode_receipt_body(&body),
            Err(ClientError::Protocol(_))
        ));
    }

    #[test]
    fn test_precision_from_market_list() {
        let info = serde_json::json!({
            "markets": [
                { "marketId": 0, "priceDecimals": 1, "sizeDecimals": 4 },
                { "marketId": 3, "priceDecimals": 2, "sizeDecimals": 6 },
            ]
        });

        let precision = precision_from_info(&info, 3);
        assert_eq!(precision.price_decimals, 2);
        assert_eq!(precision.size_decimals, 6);
    }

    #[test]
    fn test_precision_falls_back_to_first_market() {
        let info = serde_json::json!({
            "markets": [{ "priceDecimals": 3, "sizeDecimals": 5 }]
        });

        let precision = precision_from_info(&info, 9);
        assert_eq!(precision.price_decimals, 3);
        assert_eq!(precision.size_decimals, 5);
    }

    #[test]
    fn test_precision_defaults_without_market_list() {
        let precision = precision_from_info(&serde_json::json!({}), 0);
        assert_eq!(precision, MarketPrecision::default());
    }

    #[test]
    fn test_session_request_times_share_the_venue_clock() {
        let server_secs = 5_000_000;
        let action = create_session_action(server_secs, 1, [1; 32], [2; 32]);

        assert_eq!(action.current_timestamp, server_secs);
        match action.kind {
            ActionKind::CreateSession {
                expiry_timestamp, ..
            } => assert_eq!(expiry_timestamp, server_secs + SESSION_TTL_SECS),
            _ => panic!("wrong action kind"),
        }
    }

    #[test]
    fn test_decimal_from_string_or_number() {
        assert_eq!(
            decimal_from_value(&serde_json::json!("100000.5")),
            Some(dec!(100000.5))
        );
        assert_eq!(
            decimal_from_value(&serde_json::json!(99995)),
            Some(dec!(99995))
        );
        assert_eq!(decimal_from_value(&serde_json::json!(null)), None);
    }
}
