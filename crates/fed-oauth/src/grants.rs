//! Authorization grants and flow correlation.
//!
//! The grant store owns the two single-use maps of the protocol: pending
//! authorization codes (code → ticket) and pending flow state (state id →
//! subject + fingerprint). Both enforce atomic take-once semantics; a
//! losing concurrent redemption observes failure, never a duplicated
//! success.

use fed_cache::SingleUseStore;
use serde::{Deserialize, Serialize};

use crate::error::{OAuthError, OAuthResult};
use crate::ticket::Ticket;

/// Token creation/redemption strategy.
///
/// One implementation per token kind: the grant store itself implements it
/// for authorization codes (create stores, receive consumes), and
/// [`RefreshTokenCodec`] implements it for refresh tokens (the token *is*
/// the ticket).
pub trait TokenProvider: Send + Sync {
    /// Produces a token for the ticket.
    fn create(&self, ticket: &Ticket) -> String;

    /// Resolves a token back to its ticket, consuming it where the token
    /// kind is single-use.
    fn receive(&self, token: &str) -> Option<Ticket>;
}

/// Pending cross-hop flow state.
///
/// Written when the relying party relays an assertion onward; consumed
/// exactly once when the downstream redirect returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingFlow {
    /// The federated subject of the login attempt.
    pub subject: String,

    /// Fingerprint of the relayed assertion.
    pub fingerprint: String,
}

/// Owner of pending authorization codes and flow correlations.
///
/// Entries have no expiry; they live until consumed or until the process
/// exits.
#[derive(Debug, Default)]
pub struct GrantStore {
    codes: SingleUseStore<String>,
    flows: SingleUseStore<PendingFlow>,
}

impl GrantStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            codes: SingleUseStore::new(),
            flows: SingleUseStore::new(),
        }
    }

    /// Issues a single-use authorization code for a ticket.
    ///
    /// The code is two concatenated UUIDs (64 hex characters), unguessable
    /// and collision-free for the store's lifetime.
    #[must_use]
    pub fn issue_code(&self, ticket: &Ticket) -> String {
        let code = format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        );
        self.codes.put(code.clone(), ticket.serialize());
        tracing::debug!(subject = %ticket.subject, "issued authorization code");
        code
    }

    /// Atomically redeems an authorization code.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` when the code is unknown or already used.
    pub fn redeem_code(&self, code: &str) -> OAuthResult<Ticket> {
        let serialized = self
            .codes
            .take(code)
            .ok_or_else(|| OAuthError::InvalidGrant("unknown or used code".to_string()))?;

        Ticket::deserialize(&serialized)
    }

    /// Records flow state for a login attempt.
    pub fn begin_flow(
        &self,
        state_id: impl Into<String>,
        subject: impl Into<String>,
        fingerprint: impl Into<String>,
    ) {
        self.flows.put(
            state_id.into(),
            PendingFlow {
                subject: subject.into(),
                fingerprint: fingerprint.into(),
            },
        );
    }

    /// Atomically consumes flow state.
    ///
    /// # Errors
    ///
    /// Returns `UnknownState` when the state id is unknown or already used.
    pub fn end_flow(&self, state_id: &str) -> OAuthResult<PendingFlow> {
        self.flows
            .take(state_id)
            .ok_or_else(|| OAuthError::UnknownState(state_id.to_string()))
    }

    /// Number of unredeemed codes.
    #[must_use]
    pub fn pending_codes(&self) -> usize {
        self.codes.len()
    }
}

impl TokenProvider for GrantStore {
    fn create(&self, ticket: &Ticket) -> String {
        self.issue_code(ticket)
    }

    fn receive(&self, token: &str) -> Option<Ticket> {
        self.redeem_code(token).ok()
    }
}

/// Refresh-token strategy: the token is the serialized ticket itself.
///
/// Receiving performs no store lookup, so a refresh token stays valid
/// indefinitely and is fully equivalent to re-presenting the original
/// ticket.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshTokenCodec;

impl TokenProvider for RefreshTokenCodec {
    fn create(&self, ticket: &Ticket) -> String {
        ticket.serialize()
    }

    fn receive(&self, token: &str) -> Option<Ticket> {
        Ticket::deserialize(token).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn code_redeems_exactly_once() {
        let store = GrantStore::new();
        let ticket = Ticket::new("federatedusername");
        let code = store.issue_code(&ticket);

        assert_eq!(code.len(), 64);
        assert_eq!(store.redeem_code(&code).unwrap(), ticket);
        assert!(matches!(
            store.redeem_code(&code),
            Err(OAuthError::InvalidGrant(_))
        ));
    }

    #[test]
    fn unknown_code_is_invalid_grant() {
        let store = GrantStore::new();
        assert!(matches!(
            store.redeem_code("no-such-code"),
            Err(OAuthError::InvalidGrant(_))
        ));
    }

    #[test]
    fn flow_state_consumed_exactly_once() {
        let store = GrantStore::new();
        store.begin_flow("state-1", "federatedusername", "fp-1");

        let flow = store.end_flow("state-1").unwrap();
        assert_eq!(flow.subject, "federatedusername");
        assert_eq!(flow.fingerprint, "fp-1");

        assert!(matches!(
            store.end_flow("state-1"),
            Err(OAuthError::UnknownState(_))
        ));
    }

    #[test]
    fn concurrent_redemption_single_winner() {
        let store = Arc::new(GrantStore::new());
        let code = store.issue_code(&Ticket::new("federatedusername"));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let code = code.clone();
                std::thread::spawn(move || store.redeem_code(&code).is_ok())
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().expect("thread panicked"))
            .filter(|won| *won)
            .count();

        assert_eq!(wins, 1);
        assert_eq!(store.pending_codes(), 0);
    }

    #[test]
    fn token_provider_strategies() {
        let store = GrantStore::new();
        let ticket = Ticket::new("federatedusername").with_scopes(["photos"]);

        // Code strategy: create stores, receive consumes.
        let code = TokenProvider::create(&store, &ticket);
        assert_eq!(TokenProvider::receive(&store, &code), Some(ticket.clone()));
        assert_eq!(TokenProvider::receive(&store, &code), None);

        // Refresh strategy: stateless, replayable.
        let codec = RefreshTokenCodec;
        let refresh = codec.create(&ticket);
        assert_eq!(codec.receive(&refresh), Some(ticket.clone()));
        assert_eq!(codec.receive(&refresh), Some(ticket));
    }
}
