use rusqlite::types::Type;
use rusqlite::{params, Row};

use super::*;
use crate::address::split_address;
use crate::geo::Coordinates;
use crate::text::normalize;

const PLACE_COLUMNS: &str = "id, name, keywords, street, city, address, latitude, longitude,
     provider_place_id, created_at, updated_at, notes";

impl PlaceDb {
    // =========================================================================
    // Places (lodgings / meeting points)
    // =========================================================================

    /// Every record in a collection, in insertion order.
    pub fn all_records(&self, collection: Collection) -> Result<Vec<PlaceRecord>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY id",
            PLACE_COLUMNS,
            collection.table()
        ))?;
        let rows = stmt.query_map([], Self::map_place_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    pub fn get_place(&self, collection: Collection, id: i64) -> Result<Option<PlaceRecord>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} WHERE id = ?1",
            PLACE_COLUMNS,
            collection.table()
        ))?;
        let mut rows = stmt.query_map(params![id], Self::map_place_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Look up a record by its canonical name (the merge key, case-sensitive).
    pub fn find_by_exact_name(
        &self,
        collection: Collection,
        name: &str,
    ) -> Result<Option<PlaceRecord>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} WHERE name = ?1",
            PLACE_COLUMNS,
            collection.table()
        ))?;
        let mut rows = stmt.query_map(params![name], Self::map_place_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Insert or merge a place by name.
    ///
    /// On merge: the keyword is appended if new, address fields and
    /// coordinates are replaced only when the incoming values are present,
    /// and `updated_at` is refreshed. The id never changes.
    pub fn upsert_by_name(
        &self,
        collection: Collection,
        place: &PlaceUpsert,
    ) -> Result<PlaceRecord, DbError> {
        let name = place.name.trim();
        self.with_transaction(|db| match db.find_by_exact_name(collection, name)? {
            Some(existing) => db.merge_place(collection, existing, place),
            None => db.insert_place(collection, name, place),
        })
    }

    /// Merge a keyword into an existing record without touching its other
    /// fields. Returns true if the keyword list changed.
    pub fn append_keyword(
        &self,
        collection: Collection,
        id: i64,
        keyword: &str,
    ) -> Result<bool, DbError> {
        self.with_transaction(|db| {
            let Some(existing) = db.get_place(collection, id)? else {
                return Ok(false);
            };
            let Some(keywords) = merge_keyword(&existing.keywords, keyword) else {
                return Ok(false);
            };
            db.conn.execute(
                &format!(
                    "UPDATE {} SET keywords = ?1, updated_at = ?2 WHERE id = ?3",
                    collection.table()
                ),
                params![serde_json::to_string(&keywords)?, now(), id],
            )?;
            log::debug!("[{}] keyword appended to id={}", collection, id);
            Ok(true)
        })
    }

    fn merge_place(
        &self,
        collection: Collection,
        existing: PlaceRecord,
        place: &PlaceUpsert,
    ) -> Result<PlaceRecord, DbError> {
        let keywords = merge_keyword(&existing.keywords, &place.keyword)
            .unwrap_or_else(|| existing.keywords.clone());

        let incoming_address = place.address.trim();
        let (address, street, city) = if incoming_address.is_empty() {
            (existing.address, existing.street, existing.city)
        } else {
            let (street, city) = split_address(incoming_address);
            (incoming_address.to_string(), street, city)
        };

        let (latitude, longitude) = match Coordinates::from_parts(place.latitude, place.longitude) {
            Some(c) => (Some(c.lat), Some(c.lng)),
            None => (existing.latitude, existing.longitude),
        };
        let provider_place_id = non_empty(place.provider_place_id.as_deref())
            .map(str::to_string)
            .or(existing.provider_place_id);
        let notes = if place.notes.trim().is_empty() {
            existing.notes
        } else {
            place.notes.clone()
        };
        let updated_at = now();

        self.conn.execute(
            &format!(
                "UPDATE {}
                    SET keywords = ?1, street = ?2, city = ?3, address = ?4,
                        latitude = ?5, longitude = ?6, provider_place_id = ?7,
                        notes = ?8, updated_at = ?9
                  WHERE id = ?10",
                collection.table()
            ),
            params![
                serde_json::to_string(&keywords)?,
                street,
                city,
                address,
                latitude,
                longitude,
                provider_place_id,
                notes,
                updated_at,
                existing.id,
            ],
        )?;
        log::info!("[{}] Updated: {}", collection, existing.name);

        Ok(PlaceRecord {
            id: existing.id,
            name: existing.name,
            keywords,
            street,
            city,
            address,
            latitude,
            longitude,
            provider_place_id,
            created_at: existing.created_at,
            updated_at,
            notes,
        })
    }

    fn insert_place(
        &self,
        collection: Collection,
        name: &str,
        place: &PlaceUpsert,
    ) -> Result<PlaceRecord, DbError> {
        let keywords = merge_keyword(&[], &place.keyword).unwrap_or_default();
        let address = place.address.trim().to_string();
        let (street, city) = split_address(&address);
        let coordinates = Coordinates::from_parts(place.latitude, place.longitude);
        let provider_place_id = non_empty(place.provider_place_id.as_deref()).map(str::to_string);
        let created_at = now();

        self.conn.execute(
            &format!(
                "INSERT INTO {} (
                    name, keywords, street, city, address, latitude, longitude,
                    provider_place_id, created_at, updated_at, notes
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?10)",
                collection.table()
            ),
            params![
                name,
                serde_json::to_string(&keywords)?,
                street,
                city,
                address,
                coordinates.map(|c| c.lat),
                coordinates.map(|c| c.lng),
                provider_place_id,
                created_at,
                place.notes.trim(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        log::info!("[{}] Saved new: {} (id={})", collection, name, id);

        Ok(PlaceRecord {
            id,
            name: name.to_string(),
            keywords,
            street,
            city,
            address,
            latitude: coordinates.map(|c| c.lat),
            longitude: coordinates.map(|c| c.lng),
            provider_place_id,
            created_at: created_at.clone(),
            updated_at: created_at,
            notes: place.notes.trim().to_string(),
        })
    }

    fn map_place_row(row: &Row) -> rusqlite::Result<PlaceRecord> {
        let raw_keywords: String = row.get(2)?;
        // An undecodable column must fail the read; a later merge would overwrite it.
        let keywords: Vec<String> = serde_json::from_str(&raw_keywords).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e))
        })?;
        Ok(PlaceRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            keywords,
            street: row.get(3)?,
            city: row.get(4)?,
            address: row.get(5)?,
            latitude: row.get(6)?,
            longitude: row.get(7)?,
            provider_place_id: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
            notes: row.get(11)?,
        })
    }
}

/// Add a keyword's normalized form to a keyword list.
///
/// Returns `None` when the keyword normalizes to nothing or is already
/// present (comparison is case- and diacritic-insensitive).
pub(crate) fn merge_keyword(existing: &[String], keyword: &str) -> Option<Vec<String>> {
    let fingerprint = normalize(keyword);
    if fingerprint.is_empty() || existing.iter().any(|k| normalize(k) == fingerprint) {
        return None;
    }
    let mut merged = existing.to_vec();
    merged.push(fingerprint);
    Some(merged)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;

    fn hoxton(keyword: &str) -> PlaceUpsert {
        PlaceUpsert {
            name: "The Hoxton, Amsterdam".to_string(),
            keyword: keyword.to_string(),
            address: "Herengracht 255, 1016 BJ Amsterdam".to_string(),
            latitude: Some(52.372),
            longitude: Some(4.895),
            ..PlaceUpsert::default()
        }
    }

    #[test]
    fn test_insert_new_place() {
        let db = test_db();
        let rec = db
            .upsert_by_name(Collection::Lodging, &hoxton("Hoxton Amsterdam"))
            .expect("insert");
        assert_eq!(rec.keywords, vec!["hoxton amsterdam".to_string()]);
        assert_eq!(rec.street, "Herengracht 255");
        assert_eq!(rec.city, "Amsterdam");
        assert_eq!(rec.latitude, Some(52.372));
        assert_eq!(rec.created_at, rec.updated_at);

        let stored = db
            .get_place(Collection::Lodging, rec.id)
            .expect("query")
            .expect("stored");
        assert_eq!(stored, rec);
    }

    #[test]
    fn test_merge_by_name_keeps_id_and_appends_keyword() {
        let db = test_db();
        let first = db
            .upsert_by_name(Collection::Lodging, &hoxton("Hoxton Amsterdam"))
            .expect("insert");
        let second = db
            .upsert_by_name(Collection::Lodging, &hoxton("The Hoxton"))
            .expect("merge");
        assert_eq!(first.id, second.id);
        assert_eq!(
            second.keywords,
            vec!["hoxton amsterdam".to_string(), "the hoxton".to_string()]
        );
        assert_eq!(db.all_records(Collection::Lodging).expect("scan").len(), 1);
    }

    #[test]
    fn test_merge_does_not_duplicate_keywords() {
        let db = test_db();
        db.upsert_by_name(Collection::Lodging, &hoxton("Hoxton Amsterdam"))
            .expect("insert");
        let rec = db
            .upsert_by_name(Collection::Lodging, &hoxton("  HOXTON, amsterdam "))
            .expect("merge");
        assert_eq!(rec.keywords, vec!["hoxton amsterdam".to_string()]);
    }

    #[test]
    fn test_merge_keeps_old_values_when_new_ones_absent() {
        let db = test_db();
        db.upsert_by_name(Collection::Lodging, &hoxton("Hoxton Amsterdam"))
            .expect("insert");
        let rec = db
            .upsert_by_name(
                Collection::Lodging,
                &PlaceUpsert {
                    name: "The Hoxton, Amsterdam".to_string(),
                    keyword: "hoxton herengracht".to_string(),
                    ..PlaceUpsert::default()
                },
            )
            .expect("merge");
        assert_eq!(rec.address, "Herengracht 255, 1016 BJ Amsterdam");
        assert_eq!(rec.street, "Herengracht 255");
        assert_eq!(rec.latitude, Some(52.372));
        assert_eq!(rec.longitude, Some(4.895));
        assert_eq!(rec.keywords.len(), 2);
    }

    #[test]
    fn test_merge_overwrites_with_present_values() {
        let db = test_db();
        db.upsert_by_name(Collection::Lodging, &hoxton("Hoxton Amsterdam"))
            .expect("insert");
        let rec = db
            .upsert_by_name(
                Collection::Lodging,
                &PlaceUpsert {
                    name: "The Hoxton, Amsterdam".to_string(),
                    keyword: "Hoxton Amsterdam".to_string(),
                    address: "Herengracht 257, 1016 BJ Amsterdam".to_string(),
                    latitude: Some(52.3725),
                    longitude: Some(4.8951),
                    provider_place_id: Some("osm:123".to_string()),
                    notes: "checked".to_string(),
                },
            )
            .expect("merge");
        assert_eq!(rec.street, "Herengracht 257");
        assert_eq!(rec.latitude, Some(52.3725));
        assert_eq!(rec.provider_place_id.as_deref(), Some("osm:123"));
        assert_eq!(rec.notes, "checked");
    }

    #[test]
    fn test_missing_coordinates_stored_as_null() {
        let db = test_db();
        let rec = db
            .upsert_by_name(
                Collection::MeetingPoint,
                &PlaceUpsert {
                    name: "Dam Square".to_string(),
                    keyword: "dam".to_string(),
                    latitude: Some(52.373),
                    ..PlaceUpsert::default()
                },
            )
            .expect("insert");
        assert_eq!(rec.latitude, None);
        assert_eq!(rec.longitude, None);
    }

    #[test]
    fn test_collections_are_independent() {
        let db = test_db();
        db.upsert_by_name(Collection::Lodging, &hoxton("hoxton"))
            .expect("lodging");
        assert!(db
            .find_by_exact_name(Collection::MeetingPoint, "The Hoxton, Amsterdam")
            .expect("query")
            .is_none());
        assert!(db
            .find_by_exact_name(Collection::Lodging, "The Hoxton, Amsterdam")
            .expect("query")
            .is_some());
    }

    #[test]
    fn test_append_keyword() {
        let db = test_db();
        let rec = db
            .upsert_by_name(Collection::Lodging, &hoxton("Hoxton Amsterdam"))
            .expect("insert");
        assert!(db
            .append_keyword(Collection::Lodging, rec.id, "Hoxton Herengracht")
            .expect("append"));
        assert!(!db
            .append_keyword(Collection::Lodging, rec.id, "hoxton herengracht")
            .expect("append again"));
        assert!(!db
            .append_keyword(Collection::Lodging, 9999, "anything")
            .expect("missing id"));

        let stored = db
            .get_place(Collection::Lodging, rec.id)
            .expect("query")
            .expect("stored");
        assert_eq!(
            stored.keywords,
            vec!["hoxton amsterdam".to_string(), "hoxton herengracht".to_string()]
        );
        assert_eq!(stored.address, rec.address);
        assert_eq!(stored.latitude, rec.latitude);
    }

    #[test]
    fn test_undecodable_keywords_are_an_error_not_data_loss() {
        let db = test_db();
        let rec = db
            .upsert_by_name(Collection::Lodging, &hoxton("Hoxton Amsterdam"))
            .expect("insert");
        db.append_keyword(Collection::Lodging, rec.id, "Hoxton Herengracht")
            .expect("append");
        let damaged = "hoxton amsterdam;hoxton herengracht";
        db.conn_ref()
            .execute(
                "UPDATE lodgings SET keywords = ?1 WHERE id = ?2",
                params![damaged, rec.id],
            )
            .expect("damage column");

        assert!(matches!(
            db.all_records(Collection::Lodging),
            Err(DbError::Sqlite(_))
        ));
        assert!(db.get_place(Collection::Lodging, rec.id).is_err());
        assert!(db
            .upsert_by_name(Collection::Lodging, &hoxton("Hoxton Amsterdam"))
            .is_err());
        assert!(db
            .append_keyword(Collection::Lodging, rec.id, "hoxton centrum")
            .is_err());

        let stored: String = db
            .conn_ref()
            .query_row(
                "SELECT keywords FROM lodgings WHERE id = ?1",
                params![rec.id],
                |row| row.get(0),
            )
            .expect("raw column");
        assert_eq!(stored, damaged);
    }

    #[test]
    fn test_merge_keyword_helper() {
        let existing = vec!["cafe de jaren".to_string()];
        assert_eq!(merge_keyword(&existing, "Café de Jaren"), None);
        assert_eq!(merge_keyword(&existing, "!!!"), None);
        assert_eq!(
            merge_keyword(&existing, "De Jaren"),
            Some(vec!["cafe de jaren".to_string(), "de jaren".to_string()])
        );
    }
}
