//! Lodging <-> meeting point links.
//!
//! Both sides of a link are resolved before anything is written, so a link
//! never points at a place that failed to resolve. Lookups by id or by
//! free text are read-only: an unknown place yields an empty result.

use serde::Serialize;

use crate::db::{Collection, DbError, LinkRecord, PlaceRecord};
use crate::provider::PlaceProvider;
use crate::resolver::PlaceEngine;

/// A place given either by store id or by free text.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceRef {
    Id(i64),
    Query(String),
}

impl From<i64> for PlaceRef {
    fn from(id: i64) -> Self {
        PlaceRef::Id(id)
    }
}

impl From<&str> for PlaceRef {
    fn from(query: &str) -> Self {
        PlaceRef::Query(query.to_string())
    }
}

impl From<String> for PlaceRef {
    fn from(query: String) -> Self {
        PlaceRef::Query(query)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResult {
    pub link: LinkRecord,
    pub lodging: PlaceRecord,
    pub meeting_point: PlaceRecord,
}

/// A place reached through a link, with that link's ordering data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedPlace {
    #[serde(flatten)]
    pub place: PlaceRecord,
    pub priority: i64,
    pub link_notes: String,
}

impl<P: PlaceProvider> PlaceEngine<P> {
    /// Resolve both sides and create or update their link.
    ///
    /// Each side is looked up locally first; a local hit is used as-is. With
    /// `create_if_missing`, a side with no local match goes through the full
    /// resolution (provider included).
    /// Returns `None` when either side stays unresolved.
    pub fn link(
        &mut self,
        lodging_query: &str,
        meeting_point_query: &str,
        priority: i64,
        notes: &str,
        create_if_missing: bool,
    ) -> Result<Option<LinkResult>, DbError> {
        let Some(lodging) = self.resolve_side(lodging_query, Collection::Lodging, create_if_missing)?
        else {
            log::warn!("[link] lodging not resolved: {}", lodging_query);
            return Ok(None);
        };
        let Some(meeting_point) =
            self.resolve_side(meeting_point_query, Collection::MeetingPoint, create_if_missing)?
        else {
            log::warn!("[link] meeting point not resolved: {}", meeting_point_query);
            return Ok(None);
        };

        let link = self
            .db()
            .upsert_link(&lodging, &meeting_point, priority, notes)?;
        Ok(Some(LinkResult {
            link,
            lodging,
            meeting_point,
        }))
    }

    /// Meeting points linked to a lodging, preferred first. `top_n` caps the list.
    pub fn pickups_for(
        &self,
        lodging: impl Into<PlaceRef>,
        top_n: Option<usize>,
    ) -> Result<Vec<LinkedPlace>, DbError> {
        let Some(lodging) = self.lookup_ref(&lodging.into(), Collection::Lodging)? else {
            return Ok(Vec::new());
        };
        let links = self.db().links_for_lodging(lodging.id)?;
        let limit = top_n.unwrap_or(usize::MAX);

        let mut places = Vec::new();
        for link in links.into_iter().take(limit) {
            if let Some(place) = self
                .db()
                .get_place(Collection::MeetingPoint, link.meeting_point_id)?
            {
                places.push(LinkedPlace {
                    place,
                    priority: link.priority,
                    link_notes: link.notes,
                });
            }
        }
        Ok(places)
    }

    /// Lodgings linked to a meeting point, preferred first.
    pub fn lodgings_for(
        &self,
        meeting_point: impl Into<PlaceRef>,
    ) -> Result<Vec<LinkedPlace>, DbError> {
        let Some(meeting_point) = self.lookup_ref(&meeting_point.into(), Collection::MeetingPoint)?
        else {
            return Ok(Vec::new());
        };

        let mut places = Vec::new();
        for link in self.db().links_for_meeting_point(meeting_point.id)? {
            if let Some(place) = self.db().get_place(Collection::Lodging, link.lodging_id)? {
                places.push(LinkedPlace {
                    place,
                    priority: link.priority,
                    link_notes: link.notes,
                });
            }
        }
        Ok(places)
    }

    /// Remove the link between two places. Returns 0 when either side is unknown.
    pub fn unlink(
        &self,
        lodging: impl Into<PlaceRef>,
        meeting_point: impl Into<PlaceRef>,
    ) -> Result<usize, DbError> {
        let lodging = self.lookup_ref(&lodging.into(), Collection::Lodging)?;
        let meeting_point = self.lookup_ref(&meeting_point.into(), Collection::MeetingPoint)?;
        match (lodging, meeting_point) {
            (Some(l), Some(m)) => self.db().delete_link(l.id, m.id),
            _ => Ok(0),
        }
    }

    fn resolve_side(
        &mut self,
        query: &str,
        collection: Collection,
        create_if_missing: bool,
    ) -> Result<Option<PlaceRecord>, DbError> {
        if let Some(record) = self.find_local(query, collection)? {
            return Ok(Some(record));
        }
        if create_if_missing {
            self.resolve(query, collection)
        } else {
            Ok(None)
        }
    }

    fn lookup_ref(
        &self,
        place: &PlaceRef,
        collection: Collection,
    ) -> Result<Option<PlaceRecord>, DbError> {
        match place {
            PlaceRef::Id(id) => self.db().get_place(collection, *id),
            PlaceRef::Query(query) => self.find_local(query, collection),
        }
    }
}
