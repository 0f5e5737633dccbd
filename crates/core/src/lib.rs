#![warn(clippy::all, missing_docs)]

//! Core logic for the Ludex game catalog client.
//!
//! This crate hosts the data models, configuration handling, catalog
//! access, review moderation and the document-backed user services used
//! by the terminal UI and any future frontends.

pub mod account;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod error;
pub mod favorites;
pub mod feed;
pub mod models;
pub mod moderation;
pub mod reviews;
pub mod search;
pub mod services;
pub mod store;

pub use classify::{classify, Classification, Severity};
pub use config::AppConfig;
pub use error::FetchError;
pub use feed::FeedCell;
pub use models::{FavoriteGame, Game, Genre, Review, UserProfile, GENRES};
pub use services::Services;
