//! Deferred connection value

use crate::config::ConnectionConfig;
use crate::connection::{AsyncConnection, ConnectionState};
use crate::metrics::{labels, AttemptRecorder};
use crate::{Error, Result};
use futures::future::{BoxFuture, FusedFuture};
use futures::task::AtomicWaker;
use futures::FutureExt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    waker: AtomicWaker,
}

/// Cancels a [`PendingConnection`] from another task or thread.
///
/// The in-flight attempt is dropped on the pending value's next poll, or when it is
/// dropped. Has no effect once the connection has resolved.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    inner: Arc<CancelInner>,
}

impl CancelHandle {
    /// Request cancellation
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.waker.wake();
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    Cancelled,
    Done,
}

/// A connection whose handshake has not completed yet.
///
/// Lazy: nothing happens until it is polled. Resolves to an [`AsyncConnection`] or to
/// the error that ended the attempt. Dropping it, or calling [`cancel`](Self::cancel),
/// releases any socket the attempt had opened.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> reql_wire::Result<()> {
/// let pending = reql_wire::connect_async(
///     reql_wire::ConnectParams::new().url("rethinkdb://admin@db1:28015/app"),
/// )?;
/// let conn = pending.await?;
/// assert_eq!(conn.db(), "app");
/// # Ok(())
/// # }
/// ```
#[must_use = "a pending connection does nothing unless polled"]
pub struct PendingConnection {
    attempt: Option<BoxFuture<'static, Result<AsyncConnection>>>,
    cancel: CancelHandle,
    phase: Phase,
    state: ConnectionState,
    recorder: AttemptRecorder,
    host: String,
    port: u16,
}

impl std::fmt::Debug for PendingConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingConnection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("state", &self.state)
            .field("cancelled", &(self.phase == Phase::Cancelled))
            .finish()
    }
}

impl PendingConnection {
    pub(crate) fn new(config: ConnectionConfig) -> Self {
        let host = config.host().to_string();
        let port = config.port();
        Self {
            attempt: Some(AsyncConnection::establish(config).boxed()),
            cancel: CancelHandle::default(),
            phase: Phase::Pending,
            state: ConnectionState::Created,
            recorder: AttemptRecorder::start(labels::MODE_NON_BLOCKING),
            host,
            port,
        }
    }

    /// Handle that can cancel this attempt from elsewhere
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Cancel the attempt, releasing its socket immediately.
    ///
    /// Returns `false` if the connection had already resolved, in which case nothing
    /// changes.
    pub fn cancel(&mut self) -> bool {
        if self.phase != Phase::Pending {
            return false;
        }
        self.abort();
        true
    }

    /// Whether the attempt was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.phase == Phase::Cancelled
    }

    /// Progress of the attempt
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    fn abort(&mut self) {
        self.attempt = None;
        self.phase = Phase::Cancelled;
        if let Err(e) = self.fail() {
            tracing::debug!(error = %e, "cancelled attempt already settled");
        }
        self.recorder.failed(&Error::Cancelled);
        tracing::debug!(host = %self.host, port = self.port, "pending connection cancelled");
    }

    /// Move to `Failed` through the checked transitions
    fn fail(&mut self) -> Result<()> {
        if self.state == ConnectionState::Created {
            self.state.transition(ConnectionState::ResolvingConfig)?;
        }
        self.state.transition(ConnectionState::Failed)
    }

    fn start(&mut self) -> Result<()> {
        if self.state == ConnectionState::Created {
            self.state.transition(ConnectionState::ResolvingConfig)?;
            self.state.transition(ConnectionState::Handshaking)?;
        }
        Ok(())
    }
}

impl Future for PendingConnection {
    type Output = Result<AsyncConnection>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;

        match this.phase {
            Phase::Cancelled => return Poll::Ready(Err(Error::Cancelled)),
            Phase::Done => {
                return Poll::Ready(Err(Error::InvalidState {
                    expected: "unresolved pending connection".to_string(),
                    actual: this.state.to_string(),
                }))
            }
            Phase::Pending => {}
        }

        this.cancel.inner.waker.register(cx.waker());
        if this.cancel.is_cancelled() {
            this.abort();
            return Poll::Ready(Err(Error::Cancelled));
        }

        this.start()?;

        let Some(attempt) = this.attempt.as_mut() else {
            return Poll::Ready(Err(Error::Cancelled));
        };

        match attempt.poll_unpin(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(result) => {
                this.attempt = None;
                this.phase = Phase::Done;
                if result.is_ok() {
                    this.state.transition(ConnectionState::Established)?;
                } else {
                    this.fail()?;
                }
                Poll::Ready(this.recorder.finish(result))
            }
        }
    }
}

impl FusedFuture for PendingConnection {
    fn is_terminated(&self) -> bool {
        self.phase != Phase::Pending
    }
}
