pub mod config;
pub mod error;
pub mod services;
pub mod types;

pub use config::LexqConfig;
pub use error::{LexqError, Result};
pub use services::{
    CredentialProvider, HistoryStore, NoopTracer, NoopTracerFactory, QaClientFactory,
    QaServiceClient, RunTracer, RunTracerFactory, SecretStore,
};
pub use types::*;
