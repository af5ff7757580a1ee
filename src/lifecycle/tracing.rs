//! # Observability & Tracing
//!
//! The [`setup_tracing`] function initializes structured logging with the `tracing` crate.
//!
//! ## Configuration
//!
//! Log lines use the compact format without the crate/module prefix (`with_target(false)`).
//! Levels come from the `RUST_LOG` environment variable.
//!
//! ## What Gets Traced
//!
//! - **Store Lifecycle**: `Store started`, per-request `debug!` lines, `Shutdown` with the final size
//! - **Adapter Operations**: every typed entry point runs inside an `#[instrument]` span named
//!   after the operation, carrying `resource` and the id or id count
//! - **Connection**: credential warnings, watches opened and released, live `create` events
//! - **Errors**: unsupported operations and failed backend requests
//!
//! ## Usage Examples
//!
//! ```bash
//! # Compact logs (default)
//! RUST_LOG=info cargo run
//!
//! # Show counts, page sizes and dispatch routing
//! RUST_LOG=debug cargo run
//!
//! # Only the adapter
//! RUST_LOG=query_adapter::adapter=debug cargo run
//! ```
//!
//! A list call at debug level reads like:
//!
//! ```text
//! DEBUG get_list{resource="posts"}: Page fetched total=25 returned=10
//! ```

/// Initializes the global subscriber. Call once, at the top of `main`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
