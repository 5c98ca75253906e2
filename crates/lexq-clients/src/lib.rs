//! Remote service clients for the lexq bridge.
//!
//! Implements the capability traits from `lexq-core` against their real
//! backends: parameter files or the environment for secrets, a token
//! vending endpoint for delegated credentials, the hosted QA service, and
//! the run tracing endpoint.

pub mod credentials;
pub mod http;
pub mod qa;
pub mod secrets;
pub mod tracer;

#[cfg(test)]
mod test_support;

pub use credentials::TokenVendingClient;
pub use qa::{HttpQaClient, HttpQaClientFactory};
pub use secrets::{EnvSecretStore, FileSecretStore};
pub use tracer::{HttpRunTracer, HttpRunTracerFactory};
