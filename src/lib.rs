//! Place resolution and linking.
//!
//! Free-text lodging and meeting-point descriptions are resolved to canonical
//! place records: a local SQLite knowledge store is consulted first, an
//! external geocoding provider only on a miss, and every answer is written
//! back so the next lookup stays local. Lodgings and meeting points are
//! linked many-to-many with a priority order.

pub mod address;
pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod linking;
mod migrations;
pub mod provider;
pub mod resolver;
pub mod text;
pub mod types;

pub use db::{Collection, DbError, LinkRecord, PlaceDb, PlaceRecord, PlaceUpsert};
pub use error::{ConfigError, ProviderError};
pub use geo::Coordinates;
pub use linking::{LinkResult, LinkedPlace, PlaceRef};
pub use provider::{NominatimProvider, PlaceCandidate, PlaceProvider};
pub use resolver::PlaceEngine;
pub use types::Config;
