//! Connection factory
//!
//! One logical operation, "connect", returning a blocking handle or a deferred one
//! depending on the mode. Three equivalent surfaces:
//! * [`connect`] and [`connect_async`]
//! * [`connect_with`] taking a [`Mode`] marker
//! * [`Connector`] and the [`AsyncConnector`] trait

mod connector;
mod mode;
mod pending;

pub use connector::{connect, connect_async, connect_with, AsyncConnector, Connector};
pub use mode::{Blocking, Mode, NonBlocking};
pub use pending::{CancelHandle, PendingConnection};
