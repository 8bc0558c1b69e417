//! Import from the legacy two-file layout.
//!
//! Older installs kept lodgings in `hotels.db` (table `hotels`) and meeting
//! points plus their links in `pickup_location.db` (tables `pickup_locations`
//! and `hotel_pickup_links`). Keywords were `;`-separated and missing
//! coordinates were stored as `0.0`. Import is a merge: running it twice, or
//! against a store that already knows some places, never duplicates anything.

use std::collections::HashSet;
use std::path::Path;

use rusqlite::Connection;
use serde::Serialize;

use super::*;

const LEGACY_LODGING_TABLE: &str = "hotels";
const LEGACY_MEETING_POINT_TABLE: &str = "pickup_locations";
const LEGACY_LINK_TABLE: &str = "hotel_pickup_links";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyImportReport {
    pub lodgings: usize,
    pub meeting_points: usize,
    pub links: usize,
    /// Links whose lodging or meeting point name could not be found.
    pub skipped_links: usize,
}

struct LegacyPlace {
    name: String,
    keywords: String,
    address: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    place_id: String,
    notes: String,
}

impl PlaceDb {
    /// Merge a legacy `hotels.db` / `pickup_location.db` pair into this store.
    /// Missing files or tables are skipped.
    pub fn import_legacy(
        &self,
        hotels_db: &Path,
        pickup_db: &Path,
    ) -> Result<LegacyImportReport, DbError> {
        let mut report = LegacyImportReport::default();

        if let Some(legacy) = open_legacy(hotels_db)? {
            report.lodgings =
                self.import_legacy_places(legacy.conn_ref(), LEGACY_LODGING_TABLE, Collection::Lodging)?;
        }
        if let Some(legacy) = open_legacy(pickup_db)? {
            report.meeting_points = self.import_legacy_places(
                legacy.conn_ref(),
                LEGACY_MEETING_POINT_TABLE,
                Collection::MeetingPoint,
            )?;
            let (linked, skipped) = self.import_legacy_links(legacy.conn_ref())?;
            report.links = linked;
            report.skipped_links = skipped;
        }

        log::info!(
            "Legacy import: {} lodgings, {} meeting points, {} links ({} skipped)",
            report.lodgings,
            report.meeting_points,
            report.links,
            report.skipped_links
        );
        Ok(report)
    }

    fn import_legacy_places(
        &self,
        legacy: &Connection,
        table: &'static str,
        collection: Collection,
    ) -> Result<usize, DbError> {
        let columns = table_columns(legacy, table)?;
        if columns.is_empty() {
            log::warn!("Legacy table {} not found, skipping", table);
            return Ok(0);
        }
        let text = |col: &str| {
            if columns.contains(col) {
                format!("COALESCE({}, '')", col)
            } else {
                "''".to_string()
            }
        };
        let real = |col: &str| {
            if columns.contains(col) {
                col.to_string()
            } else {
                "NULL".to_string()
            }
        };
        let sql = format!(
            "SELECT {}, {}, {}, {}, {}, {}, {} FROM {} ORDER BY id",
            text("name"),
            text("keywords"),
            text("address"),
            real("latitude"),
            real("longitude"),
            text("place_id"),
            text("notes"),
            table
        );

        let rows: Vec<LegacyPlace> = {
            let mut stmt = legacy.prepare(&sql)?;
            let mapped = stmt.query_map([], |row| {
                Ok(LegacyPlace {
                    name: row.get(0)?,
                    keywords: row.get(1)?,
                    address: row.get(2)?,
                    latitude: row.get(3)?,
                    longitude: row.get(4)?,
                    place_id: row.get(5)?,
                    notes: row.get(6)?,
                })
            })?;
            let mut items = Vec::new();
            for row in mapped {
                items.push(row?);
            }
            items
        };

        let mut imported = 0;
        for legacy_place in rows {
            let name = legacy_place.name.trim();
            if name.is_empty() {
                continue;
            }
            let keywords: Vec<&str> = legacy_place
                .keywords
                .split(';')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .collect();
            let record = self.upsert_by_name(
                collection,
                &PlaceUpsert {
                    name: name.to_string(),
                    keyword: keywords.first().copied().unwrap_or_default().to_string(),
                    address: legacy_place.address,
                    latitude: legacy_place.latitude.filter(|v| *v != 0.0),
                    longitude: legacy_place.longitude.filter(|v| *v != 0.0),
                    provider_place_id: Some(legacy_place.place_id),
                    notes: legacy_place.notes,
                },
            )?;
            for keyword in keywords.iter().skip(1) {
                self.append_keyword(collection, record.id, keyword)?;
            }
            imported += 1;
        }
        Ok(imported)
    }

    fn import_legacy_links(&self, legacy: &Connection) -> Result<(usize, usize), DbError> {
        if table_columns(legacy, LEGACY_LINK_TABLE)?.is_empty() {
            return Ok((0, 0));
        }
        let rows: Vec<(String, String, Option<i64>, Option<String>)> = {
            let mut stmt = legacy.prepare(&format!(
                "SELECT COALESCE(hotel_name, ''), COALESCE(pickup_name, ''), priority, notes
                   FROM {} ORDER BY id",
                LEGACY_LINK_TABLE
            ))?;
            let mapped = stmt.query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?;
            let mut items = Vec::new();
            for row in mapped {
                items.push(row?);
            }
            items
        };

        let (mut linked, mut skipped) = (0, 0);
        for (hotel_name, pickup_name, priority, notes) in rows {
            let lodging = self.find_by_exact_name(Collection::Lodging, hotel_name.trim())?;
            let meeting_point = self.find_by_exact_name(Collection::MeetingPoint, pickup_name.trim())?;
            match (lodging, meeting_point) {
                (Some(lodging), Some(meeting_point)) => {
                    self.upsert_link(
                        &lodging,
                        &meeting_point,
                        priority.unwrap_or(1),
                        notes.as_deref().unwrap_or_default(),
                    )?;
                    linked += 1;
                }
                _ => {
                    log::warn!(
                        "Legacy link {} <-> {} skipped: place not found",
                        hotel_name,
                        pickup_name
                    );
                    skipped += 1;
                }
            }
        }
        Ok((linked, skipped))
    }
}

fn open_legacy(path: &Path) -> Result<Option<PlaceDb>, DbError> {
    if !path.exists() {
        log::warn!("Legacy database {} not found, skipping", path.display());
        return Ok(None);
    }
    PlaceDb::open_readonly_at(path).map(Some)
}

/// Column names of a table; empty if the table does not exist.
fn table_columns(conn: &Connection, table: &str) -> Result<HashSet<String>, DbError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    let mut columns = HashSet::new();
    for row in rows {
        columns.insert(row?);
    }
    Ok(columns)
}
