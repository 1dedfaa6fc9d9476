//! Session lifecycle.
//!
//! A session binds a fresh ephemeral ed25519 keypair to the user's
//! account for one hour. The client renews proactively at 55 minutes so
//! in-flight orders never race the hard expiry.

use ed25519_dalek::{Signature, Signer, SigningKey};
use rand::rngs::OsRng;

/// Requested session lifetime.
pub const SESSION_TTL_SECS: u64 = 3600;
/// Elapsed age at which the client renews ahead of expiry.
pub const RENEW_AFTER_SECS: u64 = 55 * 60;

pub struct Session {
    id: u64,
    keypair: SigningKey,
    created_at_ms: u64,
}

impl Session {
    /// Fresh ephemeral keypair, not yet registered with the venue.
    #[must_use]
    pub fn generate_keypair() -> SigningKey {
        SigningKey::generate(&mut OsRng)
    }

    pub fn new(id: u64, keypair: SigningKey, created_at_ms: u64) -> Self {
        Self {
            id,
            keypair,
            created_at_ms,
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.keypair.sign(message)
    }

    /// True once the session is old enough that the next action should
    /// re-establish before sending.
    #[must_use]
    pub fn should_renew(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_at_ms) >= RENEW_AFTER_SECS * 1000
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at_ms", &self.created_at_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREATED_MS: u64 = 1_700_000_000_000;

    fn session() -> Session {
        Session::new(42, Session::generate_keypair(), CREATED_MS)
    }

    #[test]
    fn test_fresh_session_does_not_renew() {
        assert!(!session().should_renew(CREATED_MS));
        assert!(!session().should_renew(CREATED_MS + 10 * 60 * 1000));
    }

    #[test]
    fn test_renewal_boundary() {
        let s = session();
        let boundary = CREATED_MS + RENEW_AFTER_SECS * 1000;
        assert!(!s.should_renew(boundary - 1));
        assert!(s.should_renew(boundary));
        assert!(s.should_renew(boundary + 1));
    }

    #[test]
    fn test_clock_before_creation_does_not_renew() {
        assert!(!session().should_renew(CREATED_MS - 5_000));
    }

    #[test]
    fn test_each_keypair_is_distinct() {
        let a = Session::generate_keypair();
        let b = Session::generate_keypair();
        assert_ne!(
            a.verifying_key().to_bytes(),
            b.verifying_key().to_bytes()
        );
    }
}
