//! Connection mode discriminators
//!
//! A mode is a zero-sized marker type. The handle type a connect call returns is the
//! mode's associated [`Mode::Handle`], so the choice is checked at compile time.

use super::pending::PendingConnection;
use crate::config::ConnectionConfig;
use crate::connection::BlockingConnection;
use crate::metrics::{labels, AttemptRecorder};
use crate::Result;

mod sealed {
    pub trait Sealed {}
}

/// Concurrency mode selecting the connection flavor.
///
/// Sealed: [`Blocking`] and [`NonBlocking`] are the only implementations.
pub trait Mode: sealed::Sealed {
    /// Handle produced in this mode
    type Handle;

    #[doc(hidden)]
    const LABEL: &'static str;

    #[doc(hidden)]
    fn open(self, config: ConnectionConfig) -> Result<Self::Handle>;
}

/// Handshake completes before the call returns. The default mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Blocking;

/// The call returns a [`PendingConnection`] immediately; the handshake runs when the
/// caller's executor polls it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NonBlocking;

impl sealed::Sealed for Blocking {}
impl sealed::Sealed for NonBlocking {}

impl Mode for Blocking {
    type Handle = BlockingConnection;

    const LABEL: &'static str = labels::MODE_BLOCKING;

    fn open(self, config: ConnectionConfig) -> Result<BlockingConnection> {
        let mut recorder = AttemptRecorder::start(Self::LABEL);
        recorder.finish(BlockingConnection::establish(config))
    }
}

impl Mode for NonBlocking {
    type Handle = PendingConnection;

    const LABEL: &'static str = labels::MODE_NON_BLOCKING;

    fn open(self, config: ConnectionConfig) -> Result<PendingConnection> {
        Ok(PendingConnection::new(config))
    }
}
