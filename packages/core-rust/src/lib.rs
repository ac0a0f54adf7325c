//! `Hookline` Core — argument vectors, dynamic values, chain errors, and
//! ordered interceptor chains.

pub mod callback;
pub mod chain;
pub mod error;
pub mod types;

pub use callback::{Callback, Outcome};
pub use chain::{Identified, InterceptorChain, InterceptorId, Stage};
pub use error::ChainError;
pub use types::{Args, Value};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
