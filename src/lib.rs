//! # glpi
//!
//! An async client for the GLPI IT asset management REST API.
//!
//! It opens a session lazily, searches items with structured criteria, and
//! exposes results as [`Record`]s that fetch missing fields on demand and
//! save local changes as partial updates.
//!
//! ## Architecture
//!
//! - [`config`] - Configuration loading from environment variables
//! - [`error`] - Error type with token sanitization
//! - [`criteria`] - Search criteria and their query-string form
//! - [`session`] - Authenticated HTTP session (`initSession` handshake)
//! - [`registry`] - Resource types, field maps and the field catalog
//! - [`resource`] - The [`Glpi`] handle and per-type [`ResourceClient`]s
//! - [`record`] - Lazily hydrated records and relation resolution
//!
//! ## Configuration
//!
//! - `GLPI_URL`: REST API base URL (e.g., `https://glpi.example.com/apirest.php`)
//! - `GLPI_USER_TOKEN`: personal API token
//! - `GLPI_APP_TOKEN`: API client application token
//!
//! Optional:
//! - `GLPI_TIMEOUT_SECS`: request timeout (default 30)
//! - `GLPI_ACCEPT_INVALID_CERTS`: skip TLS verification
//! - `RUST_LOG`: log level for the binary (e.g., `glpi=debug`)
//!
//! ## Example
//!
//! ```ignore
//! use glpi::{Config, Glpi};
//!
//! async fn example() -> Result<(), glpi::GlpiError> {
//!     let glpi = Glpi::new(&Config::from_env()?)?;
//!
//!     let mut computer = glpi.computers()?.get(12).await?;
//!     if let glpi::Field::Record(location) = computer.read("locations").await? {
//!         println!("{} is in {}", computer.id().unwrap_or_default(), location);
//!     }
//!
//!     computer.write("comment", "audited");
//!     computer.save().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod criteria;
pub mod error;
pub mod record;
pub mod registry;
pub mod resource;
pub mod session;

pub use config::Config;
pub use criteria::{Criteria, Criterion, Link, SearchType};
pub use error::GlpiError;
pub use record::{Field, Hydration, Record};
pub use registry::{FieldMap, Registry, ResourceSpec};
pub use resource::{Glpi, GlpiBuilder, ResourceClient};
pub use session::{Body, SessionGateway};
