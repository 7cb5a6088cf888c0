//! Connection lifecycle state.
//!
//! Unlike a compile-time type-state machine, this tracks connection phase
//! at runtime: the same [`SqlConnection`](crate::SqlConnection) value moves
//! through these states as it's used, and callers observe the current one
//! with [`SqlConnection::state`](crate::SqlConnection::state) rather than
//! having the type system pick which methods are callable.
//!
//! ```text
//! Connecting -> Authenticating -> Ready -> Busy -> Ready -> ... -> Closed
//! ```

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// TCP/TLS transport is being established.
    Connecting,
    /// Transport is up; the login/startup/handshake exchange is running.
    Authenticating,
    /// Idle and available to run a request.
    Ready,
    /// A request is in flight; no other request can be issued until it
    /// completes (the wire protocols are half-duplex per connection).
    Busy,
    /// The connection failed in a way that poisons it — a protocol error,
    /// TLS failure, or I/O error mid-request. No further requests will be
    /// attempted; the connection must be closed and, in a pool, replaced.
    Poisoned,
    /// The connection has been closed and cannot be reused.
    Closed,
}

impl ConnectionState {
    /// True if a request can be issued from this state.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// True if the connection is unusable and should not be returned to a
    /// pool.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Poisoned | Self::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_is_ready_and_not_terminal() {
        assert!(ConnectionState::Ready.is_ready());
        assert!(!ConnectionState::Ready.is_terminal());
    }

    #[test]
    fn poisoned_and_closed_are_terminal() {
        assert!(ConnectionState::Poisoned.is_terminal());
        assert!(ConnectionState::Closed.is_terminal());
        assert!(!ConnectionState::Poisoned.is_ready());
    }

    #[test]
    fn busy_is_neither_ready_nor_terminal() {
        assert!(!ConnectionState::Busy.is_ready());
        assert!(!ConnectionState::Busy.is_terminal());
    }
}
