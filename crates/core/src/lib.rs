//! byoc-core - Core library for the BYOC catalog CLI
//!
//! This library provides an authenticated client for the Bring Your Own
//! Collection service: OAuth2 token handling with an on-disk cache, region
//! resolution for collections, and collection and tile operations with
//! lazy pagination.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod location;
pub mod models;
pub mod pager;
pub mod region;
pub mod token;

// Re-export commonly used types
pub use auth::Authenticator;
pub use client::CatalogClient;
pub use config::{
    config_exists, get_config_path, load_config, load_config_or_default, save_config,
    validate_config,
};
pub use config::{ClientConfig, ConfigFile, Credentials};
pub use error::{Error, Result};
pub use location::LocationResolver;
pub use models::{Collection, NewCollection, NewTile, Page, Tile};
pub use pager::TilePager;
pub use region::{EndpointRegistry, Region};
pub use token::{Token, TokenStore};
