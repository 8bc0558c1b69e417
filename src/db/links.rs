use rusqlite::{params, Row};

use super::*;

const LINK_COLUMNS: &str = "id, lodging_id, lodging_name, meeting_point_id, meeting_point_name,
     priority, notes, created_at, updated_at";

impl PlaceDb {
    // =========================================================================
    // Lodging <-> meeting point links
    // =========================================================================

    /// Create a link, or update `priority`/`notes` of the existing link for the
    /// same pair. Name snapshots and `created_at` are kept from the first write.
    pub fn upsert_link(
        &self,
        lodging: &PlaceRecord,
        meeting_point: &PlaceRecord,
        priority: i64,
        notes: &str,
    ) -> Result<LinkRecord, DbError> {
        let now = now();
        self.conn.execute(
            "INSERT INTO lodging_meeting_point_links (
                lodging_id, lodging_name, meeting_point_id, meeting_point_name,
                priority, notes, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             ON CONFLICT(lodging_id, meeting_point_id) DO UPDATE SET
                priority = excluded.priority,
                notes = excluded.notes,
                updated_at = excluded.updated_at",
            params![
                lodging.id,
                lodging.name,
                meeting_point.id,
                meeting_point.name,
                priority,
                notes,
                now,
            ],
        )?;

        let link = self.conn.query_row(
            &format!(
                "SELECT {} FROM lodging_meeting_point_links
                  WHERE lodging_id = ?1 AND meeting_point_id = ?2",
                LINK_COLUMNS
            ),
            params![lodging.id, meeting_point.id],
            Self::map_link_row,
        )?;
        log::info!(
            "[link] {} <-> {} (priority={})",
            link.lodging_name,
            link.meeting_point_name,
            link.priority
        );
        Ok(link)
    }

    /// Links of a lodging, preferred first (priority, then insertion order).
    pub fn links_for_lodging(&self, lodging_id: i64) -> Result<Vec<LinkRecord>, DbError> {
        self.query_links("lodging_id", lodging_id)
    }

    /// Links of a meeting point, preferred first (priority, then insertion order).
    pub fn links_for_meeting_point(&self, meeting_point_id: i64) -> Result<Vec<LinkRecord>, DbError> {
        self.query_links("meeting_point_id", meeting_point_id)
    }

    /// Remove the link for a pair. Returns the number of rows removed (0 or 1).
    pub fn delete_link(&self, lodging_id: i64, meeting_point_id: i64) -> Result<usize, DbError> {
        let removed = self.conn.execute(
            "DELETE FROM lodging_meeting_point_links
              WHERE lodging_id = ?1 AND meeting_point_id = ?2",
            params![lodging_id, meeting_point_id],
        )?;
        if removed > 0 {
            log::info!(
                "[unlink] removed link lodging={} meeting_point={}",
                lodging_id,
                meeting_point_id
            );
        }
        Ok(removed)
    }

    fn query_links(&self, key_column: &'static str, id: i64) -> Result<Vec<LinkRecord>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM lodging_meeting_point_links
              WHERE {} = ?1
              ORDER BY priority ASC, id ASC",
            LINK_COLUMNS, key_column
        ))?;
        let rows = stmt.query_map(params![id], Self::map_link_row)?;
        let mut links = Vec::new();
        for row in rows {
            links.push(row?);
        }
        Ok(links)
    }

    fn map_link_row(row: &Row) -> rusqlite::Result<LinkRecord> {
        Ok(LinkRecord {
            id: row.get(0)?,
            lodging_id: row.get(1)?,
            lodging_name: row.get(2)?,
            meeting_point_id: row.get(3)?,
            meeting_point_name: row.get(4)?,
            priority: row.get(5)?,
            notes: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;

    fn place(db: &PlaceDb, collection: Collection, name: &str) -> PlaceRecord {
        db.upsert_by_name(
            collection,
            &PlaceUpsert {
                name: name.to_string(),
                keyword: name.to_string(),
                ..PlaceUpsert::default()
            },
        )
        .expect("place")
    }

    #[test]
    fn test_relink_updates_in_place() {
        let db = test_db();
        let hotel = place(&db, Collection::Lodging, "Hotel V Nesplein");
        let dam = place(&db, Collection::MeetingPoint, "Dam Square");

        let first = db.upsert_link(&hotel, &dam, 1, "").expect("link");
        let second = db.upsert_link(&hotel, &dam, 2, "side entrance").expect("relink");

        assert_eq!(first.id, second.id);
        assert_eq!(second.priority, 2);
        assert_eq!(second.notes, "side entrance");
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(db.links_for_lodging(hotel.id).expect("links").len(), 1);
    }

    #[test]
    fn test_relink_keeps_name_snapshots() {
        let db = test_db();
        let hotel = place(&db, Collection::Lodging, "Hotel V Nesplein");
        let dam = place(&db, Collection::MeetingPoint, "Dam Square");
        db.upsert_link(&hotel, &dam, 1, "").expect("link");

        let renamed = PlaceRecord {
            name: "Dam".to_string(),
            ..dam.clone()
        };
        let link = db.upsert_link(&hotel, &renamed, 3, "").expect("relink");
        assert_eq!(link.meeting_point_name, "Dam Square");
    }

    #[test]
    fn test_links_ordered_by_priority_then_insertion() {
        let db = test_db();
        let hotel = place(&db, Collection::Lodging, "Hotel V Nesplein");
        let dam = place(&db, Collection::MeetingPoint, "Dam Square");
        let central = place(&db, Collection::MeetingPoint, "Central Station");
        let spui = place(&db, Collection::MeetingPoint, "Spui");

        db.upsert_link(&hotel, &dam, 2, "").expect("dam");
        db.upsert_link(&hotel, &central, 1, "").expect("central");
        db.upsert_link(&hotel, &spui, 2, "").expect("spui");

        let order: Vec<String> = db
            .links_for_lodging(hotel.id)
            .expect("links")
            .into_iter()
            .map(|l| l.meeting_point_name)
            .collect();
        assert_eq!(order, vec!["Central Station", "Dam Square", "Spui"]);
    }

    #[test]
    fn test_reverse_lookup() {
        let db = test_db();
        let a = place(&db, Collection::Lodging, "Hotel A");
        let b = place(&db, Collection::Lodging, "Hotel B");
        let dam = place(&db, Collection::MeetingPoint, "Dam Square");
        db.upsert_link(&a, &dam, 3, "").expect("a");
        db.upsert_link(&b, &dam, 1, "").expect("b");

        let lodgings: Vec<i64> = db
            .links_for_meeting_point(dam.id)
            .expect("links")
            .into_iter()
            .map(|l| l.lodging_id)
            .collect();
        assert_eq!(lodgings, vec![b.id, a.id]);
    }

    #[test]
    fn test_delete_link() {
        let db = test_db();
        let hotel = place(&db, Collection::Lodging, "Hotel V Nesplein");
        let dam = place(&db, Collection::MeetingPoint, "Dam Square");
        db.upsert_link(&hotel, &dam, 1, "").expect("link");

        assert_eq!(db.delete_link(hotel.id, dam.id).expect("delete"), 1);
        assert_eq!(db.delete_link(hotel.id, dam.id).expect("delete again"), 0);
        assert!(db.links_for_lodging(hotel.id).expect("links").is_empty());
    }
}
