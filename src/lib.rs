pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod envelope;
pub mod errors;
pub mod handlers;
pub mod transport;

use std::sync::Arc;

use crate::config::MetabaseConfig;
use crate::dispatcher::{Dispatcher, UuidRequestIds};
use crate::errors::MetabaseResult;
use crate::transport::HttpTransport;

pub use crate::dispatcher::ToolCall;
pub use crate::envelope::{ContentBlock, ResultEnvelope};
pub use crate::errors::{ErrorCode, MetabaseError, ValidationError};

/// Installs the global tracing subscriber. Logs go to stderr so stdout stays
/// free for protocol output. `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Wires the reqwest transport, session manager and UUID request ids into a
/// dispatcher.
pub fn build_dispatcher(config: &MetabaseConfig) -> MetabaseResult<Dispatcher> {
    let (transport, session) = HttpTransport::from_config(config)?;
    tracing::info!(url = %config.url, "Metabase dispatcher ready");
    Ok(Dispatcher::new(
        Arc::new(transport),
        session,
        Arc::new(UuidRequestIds),
    ))
}
