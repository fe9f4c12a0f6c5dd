//! Core types, configuration and field mapping.
//!
//! This module holds the typed order model, the record types the import
//! reads and writes, the immutable batch configuration and the
//! declarative mapper that turns feed documents into
//! [`ExternalOrderDocument`]s.

mod builder;
mod config;
pub mod countries;
mod error;
pub mod mapping;
mod node;
mod types;

pub use builder::*;
pub use self::config::*;
pub use countries::{DEFAULT_COUNTRY, resolve_country};
pub use error::*;
pub use mapping::{map_document, map_fields, map_line};
pub use node::*;
pub use types::*;
