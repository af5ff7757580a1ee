//! # Query Adapter
//!
//! > **Admin-UI data operations on top of an object-query backend.**
//!
//! An admin UI speaks nine generic operations (`GET_LIST`, `GET_ONE`, `CREATE`, ...). An
//! object store speaks queries: count, find, get, save, destroy. This crate translates the
//! former into the latter and answers with one uniform `{data, total}` envelope.
//!
//! ## 🏗️ Design
//!
//! ### Stateless translation
//! The adapter keeps no state between calls. Every call builds a fresh [`Query`](backend::Query),
//! runs it, and maps each returned object to a flat record with its backend `id`.
//!
//! ### Backends behind a trait
//! [`Backend`](backend::Backend) is the only seam. Two implementations ship with the crate:
//! - **[`StoreActor`](backend::StoreActor)**: an in-memory store running as an actor in its own
//!   Tokio task, driven through a cloneable [`BackendClient`](backend::BackendClient).
//! - **[`RestBackend`](backend::RestBackend)**: a remote Parse Server reached over HTTP.
//!
//! ### Fail-fast batches
//! Multi-id operations fan out in parallel and fail as a whole as soon as one request fails.
//! The coarse error keeps the backend cause as its `source`.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Translator ([`adapter`])
//! - **Role**: Routes an operation name to its handler, validates parameters, shapes results.
//! - **Key items**: [`QueryAdapter`](adapter::QueryAdapter), [`Envelope`](adapter::Envelope),
//!   [`AdapterError`](adapter::AdapterError).
//!
//! ### 2. The Stores ([`backend`])
//! - **Role**: Query model and concrete backends.
//! - **Key items**: [`Backend`](backend::Backend), [`Query`](backend::Query),
//!   [`mock`](backend::mock) for tests.
//!
//! ### 3. The Orchestrator ([`lifecycle`])
//! - **Role**: Establishes the connection once, owns live watches, sets up logging.
//! - **Key items**: [`Bootstrap`](lifecycle::Bootstrap), [`Connection`](lifecycle::Connection),
//!   [`setup_tracing`](lifecycle::setup_tracing).
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # In-memory store
//! RUST_LOG=info cargo run
//!
//! # Against a Parse Server
//! PARSE_SERVER_URL=http://localhost:1337/parse PARSE_APP_ID=app PARSE_CLIENT_KEY=key cargo run
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod adapter;
pub mod backend;
pub mod lifecycle;
