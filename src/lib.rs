//! # cozi-mcp - Cozi Family Organizer tools for MCP
//!
//! Exposes a Cozi account (family members, shopping and to-do lists,
//! calendar appointments) as a catalog of Model Context Protocol tools.
//!
//! ## Architecture
//!
//! 1. **`CoziApi`** is the remote service contract; `CoziClient` implements it
//!    over the Cozi REST API.
//! 2. **`ClientFactory`** creates authenticated clients and **`ClientHandle`**
//!    caches the first one for its owner.
//! 3. **`CoziTools`** validates arguments, issues exactly one remote call per
//!    tool and flattens the result to JSON.
//! 4. **`CoziServer`** publishes the tools over MCP, either standalone
//!    (credentials from the environment) or per hosted session
//!    (credentials from the endpoint query string).
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use cozi_mcp::rmcp::ServiceExt;
//! use cozi_mcp::{Config, CoziServer, Credentials, RestClientFactory};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let factory = Arc::new(RestClientFactory::new(Config::from_env()?));
//!     let server = CoziServer::standalone(factory, Credentials::from_env().ok());
//!     server.serve(cozi_mcp::rmcp::transport::stdio()).await?.waiting().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod args;
pub mod client;
pub mod config;
pub mod handle;
pub mod http;
pub mod model;
pub mod options;
pub mod server;
pub mod tools;

pub use api::CoziClient;
pub use client::{CoziApi, CoziError, ErrorKind};
pub use config::{Config, CredentialSource, Credentials, SessionConfig};
pub use handle::{ClientFactory, ClientHandle, RestClientFactory};
pub use options::TransportOptions;
pub use server::CoziServer;
pub use tools::CoziTools;

// Re-export rmcp for convenience
pub use rmcp;
