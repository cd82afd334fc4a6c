//! Authentication

mod scram;

pub use scram::{ScramClient, ScramError, ScramState};
