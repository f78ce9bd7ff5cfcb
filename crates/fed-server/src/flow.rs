//! Client-side login flow state machine.
//!
//! One logical login stitches three HTTP round trips together. The phases
//! and their legal transitions:
//!
//! ```text
//! Idle → AuthnRequested → AssertionReceived → GrantRequested
//!      → CodeReceived → TokenReceived → ResourceAccessAttempted → Idle
//! ```
//!
//! `Failed(reason)` is reachable from any phase; there is no automatic
//! retry, so a failed flow re-enters `Idle` on the next resource access.

use std::fmt;

/// Why a flow ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowFailure {
    /// The returned `state` matched no pending flow.
    UnknownState,
    /// The code-for-token exchange was rejected.
    ExchangeFailed,
    /// The resource rejected the bearer token.
    Unauthorized,
    /// A transition was attempted out of order.
    IllegalTransition,
}

/// Phase of a logical login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    /// No login in progress.
    Idle,
    /// AuthnRequest sent toward the identity provider.
    AuthnRequested,
    /// Signed assertion received; flow state persisted.
    AssertionReceived,
    /// Assertion relayed; waiting on user consent.
    GrantRequested,
    /// Authorization code and state received back.
    CodeReceived,
    /// Bearer token stored.
    TokenReceived,
    /// Bearer token attached to a resource request.
    ResourceAccessAttempted,
    /// Terminal failure.
    Failed(FlowFailure),
}

impl FlowPhase {
    /// Returns whether `next` is a legal successor of this phase.
    #[must_use]
    pub fn permits(&self, next: &Self) -> bool {
        // Failure is terminal but reachable from anywhere; a completed or
        // failed flow restarts at Idle.
        if matches!(next, Self::Failed(_)) {
            return !matches!(self, Self::Failed(_));
        }

        matches!(
            (self, next),
            (Self::Idle, Self::AuthnRequested)
                | (Self::AuthnRequested, Self::AssertionReceived)
                | (Self::AssertionReceived, Self::GrantRequested)
                | (Self::GrantRequested, Self::CodeReceived)
                | (Self::CodeReceived, Self::TokenReceived)
                | (Self::TokenReceived, Self::ResourceAccessAttempted)
                | (Self::ResourceAccessAttempted, Self::Idle)
                | (Self::Failed(_), Self::Idle)
        )
    }

    /// Advances to the next phase, collapsing illegal transitions into
    /// `Failed(IllegalTransition)`.
    #[must_use]
    pub fn advance(self, next: Self) -> Self {
        if self.permits(&next) {
            tracing::trace!(from = %self, to = %next, "flow transition");
            next
        } else {
            tracing::warn!(from = %self, to = %next, "illegal flow transition");
            Self::Failed(FlowFailure::IllegalTransition)
        }
    }
}

impl fmt::Display for FlowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::AuthnRequested => "AuthnRequested",
            Self::AssertionReceived => "AssertionReceived",
            Self::GrantRequested => "GrantRequested",
            Self::CodeReceived => "CodeReceived",
            Self::TokenReceived => "TokenReceived",
            Self::ResourceAccessAttempted => "ResourceAccessAttempted",
            Self::Failed(_) => "Failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HAPPY_PATH: [FlowPhase; 7] = [
        FlowPhase::Idle,
        FlowPhase::AuthnRequested,
        FlowPhase::AssertionReceived,
        FlowPhase::GrantRequested,
        FlowPhase::CodeReceived,
        FlowPhase::TokenReceived,
        FlowPhase::ResourceAccessAttempted,
    ];

    #[test]
    fn happy_path_is_permitted() {
        for pair in HAPPY_PATH.windows(2) {
            assert!(pair[0].permits(&pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        // and the flow restarts
        assert!(FlowPhase::ResourceAccessAttempted.permits(&FlowPhase::Idle));
    }

    #[test]
    fn phases_cannot_be_skipped() {
        assert!(!FlowPhase::Idle.permits(&FlowPhase::CodeReceived));
        assert!(!FlowPhase::AuthnRequested.permits(&FlowPhase::TokenReceived));
        assert!(!FlowPhase::CodeReceived.permits(&FlowPhase::ResourceAccessAttempted));
    }

    #[test]
    fn failure_reachable_from_any_live_phase() {
        for phase in HAPPY_PATH {
            assert!(phase.permits(&FlowPhase::Failed(FlowFailure::UnknownState)));
        }
    }

    #[test]
    fn failed_flow_restarts_at_idle() {
        let failed = FlowPhase::Failed(FlowFailure::ExchangeFailed);
        assert!(failed.permits(&FlowPhase::Idle));
        assert!(!failed.permits(&FlowPhase::CodeReceived));
        // failure is terminal; it cannot fail again
        assert!(!failed.permits(&FlowPhase::Failed(FlowFailure::Unauthorized)));
    }

    #[test]
    fn advance_collapses_illegal_transitions() {
        let phase = FlowPhase::Idle.advance(FlowPhase::TokenReceived);
        assert_eq!(phase, FlowPhase::Failed(FlowFailure::IllegalTransition));

        let phase = FlowPhase::Idle.advance(FlowPhase::AuthnRequested);
        assert_eq!(phase, FlowPhase::AuthnRequested);
    }
}
