//! Elasticsearch API client and authentication.
//!
//! This module provides the [`IndexStore`] abstraction the loaders write through, its
//! [`ElasticClient`] implementation, connection settings ([`ElasticConfig`]) and
//! authentication ([`Auth`]).

mod auth;
mod config;
mod elastic;
mod store;

pub use auth::Auth;
pub use config::ElasticConfig;
pub use elastic::ElasticClient;
pub use store::{IndexStore, WriteAction};
