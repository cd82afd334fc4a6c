//! Connection state machine

use crate::{Error, Result};

/// Lifecycle of a single connection attempt and the handle it produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Attempt created, nothing done yet
    Created,

    /// Validating and normalizing parameters
    ResolvingConfig,

    /// Socket opened, handshake in progress
    Handshaking,

    /// Handshake complete, connection usable
    Established,

    /// Attempt failed (terminal)
    Failed,

    /// Established connection was closed (terminal)
    Closed,
}

impl ConnectionState {
    /// Check if transition is valid
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        matches!(
            (self, next),
            (Created, ResolvingConfig)
                | (ResolvingConfig, Handshaking)
                | (ResolvingConfig, Failed)
                | (Handshaking, Established)
                | (Handshaking, Failed)
                | (Established, Closed)
        )
    }

    /// Transition to new state
    pub fn transition(&mut self, next: ConnectionState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(Error::InvalidState {
                expected: format!("valid transition from {}", self),
                actual: next.to_string(),
            });
        }
        *self = next;
        Ok(())
    }

    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Closed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::ResolvingConfig => write!(f, "resolving_config"),
            Self::Handshaking => write!(f, "handshaking"),
            Self::Established => write!(f, "established"),
            Self::Failed => write!(f, "failed"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
