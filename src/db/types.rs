//! Shared type definitions for the knowledge store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),

    #[error("Failed to encode keywords: {0}")]
    Keywords(#[from] serde_json::Error),
}

/// One of the two independent place collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Lodging,
    MeetingPoint,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Lodging => "lodging",
            Collection::MeetingPoint => "meetingPoint",
        }
    }

    /// Backing table. Only ever interpolated from this fixed set.
    pub(crate) fn table(&self) -> &'static str {
        match self {
            Collection::Lodging => "lodgings",
            Collection::MeetingPoint => "meeting_points",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "lodging" | "lodgings" | "hotel" | "hotels" => Ok(Collection::Lodging),
            "meetingpoint" | "meetingpoints" | "pickup" | "pickups" => Ok(Collection::MeetingPoint),
            other => Err(format!("Unknown collection: {}", other)),
        }
    }
}

/// A row from `lodgings` or `meeting_points`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRecord {
    pub id: i64,
    pub name: String,
    /// Normalized fingerprints of every query that reached this place, first-seen order.
    pub keywords: Vec<String>,
    pub street: String,
    pub city: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// External identifier, kept as an enrichment hint only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_place_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub notes: String,
}

/// Input to `upsert_by_name`: the merge key plus whatever the caller learned.
#[derive(Debug, Clone, Default)]
pub struct PlaceUpsert {
    pub name: String,
    /// Query text to remember; normalized before storing.
    pub keyword: String,
    /// Raw address (country suffix already stripped). Empty keeps the stored one.
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub provider_place_id: Option<String>,
    /// Empty keeps the stored notes.
    pub notes: String,
}

/// A row from `lodging_meeting_point_links`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub id: i64,
    pub lodging_id: i64,
    pub lodging_name: String,
    pub meeting_point_id: i64,
    pub meeting_point_name: String,
    /// Lower = preferred.
    pub priority: i64,
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
}
