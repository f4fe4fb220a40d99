//! # Local Store
//!
//! Owns the SQLite database that caches the recitation catalog on the device.
//!
//! ## Overview
//!
//! This crate manages:
//! - Schema creation and additive column migrations
//! - Repositories for reciters, surahs, download markers and metadata
//! - The bundled surah list and its traditional divisions

pub mod bundled;
pub mod db;
pub mod divisions;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};
pub use models::{metadata_keys, Download, Reciter, Surah, SURAH_COUNT};
