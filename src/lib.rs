pub mod card;
pub mod config;
pub mod editor;
pub mod error;
pub mod host;
pub mod registry;

#[cfg(feature = "server-banner")]
pub mod banner;
