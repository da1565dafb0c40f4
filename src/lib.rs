//! MoodLens data access: an identity gateway and a mood entry store over
//! pluggable identity/document collaborators, plus the `moodlens-api`
//! server that provides those collaborators over HTTP.

pub mod auth;
pub mod backend;
pub mod client;
pub mod config;
pub mod db;
pub mod dto;
pub mod entries;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod server;

pub use client::MoodLens;
pub use entries::EntryStore;
pub use error::{AppError, AppResult};
pub use gateway::IdentityGateway;
