//! Staged place resolution.
//!
//! `resolve` short-circuits through three stages:
//! 1. Exact keyword: the normalized query is already a stored fingerprint
//! 2. Scored precise: best keyword score clears the thresholds and beats the
//!    runner-up by the configured margin
//! 3. Provider: look the query up externally and persist what comes back
//!
//! `resolve_near` replaces stage 2 with a relaxed candidate pool ranked by
//! distance to a reference point, and asks the provider for several
//! candidates when no local candidate has coordinates.
//!
//! Store failures propagate. Provider failures are logged and resolve to `None`.

use std::cmp::Ordering;

use crate::address::CountrySuffix;
use crate::db::{Collection, DbError, PlaceDb, PlaceRecord, PlaceUpsert};
use crate::error::ConfigError;
use crate::geo::{distance_or_infinite, Coordinates};
use crate::provider::{PlaceCandidate, PlaceProvider};
use crate::text::{normalize, MatchScore, TextMatcher};
use crate::types::{Config, MatchConfig};

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct PlaceEngine<P: PlaceProvider> {
    db: PlaceDb,
    provider: P,
    matcher: TextMatcher,
    matching: MatchConfig,
    countries: CountrySuffix,
}

impl<P: PlaceProvider> PlaceEngine<P> {
    pub fn new(db: PlaceDb, provider: P, config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            db,
            provider,
            matcher: TextMatcher::new(&config.stopwords, &config.city),
            matching: config.matching.clone(),
            countries: CountrySuffix::new(&config.country_suffixes)?,
        })
    }

    pub fn db(&self) -> &PlaceDb {
        &self.db
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    // -----------------------------------------------------------------------
    // Local stages (read-only)
    // -----------------------------------------------------------------------

    /// Record whose keyword list contains the normalized query.
    pub fn find_exact(
        &self,
        query: &str,
        collection: Collection,
    ) -> Result<Option<PlaceRecord>, DbError> {
        let fingerprint = normalize(query);
        if fingerprint.is_empty() {
            return Ok(None);
        }
        let hit = self
            .db
            .all_records(collection)?
            .into_iter()
            .find(|r| r.keywords.iter().any(|k| normalize(k) == fingerprint));
        if let Some(record) = &hit {
            log::info!("[{}] Exact keyword hit: {}", collection, record.name);
        }
        Ok(hit)
    }

    /// Best-scored record, if it is an unambiguous match.
    pub fn find_precise(
        &self,
        query: &str,
        collection: Collection,
    ) -> Result<Option<PlaceRecord>, DbError> {
        let mut scored: Vec<(MatchScore, PlaceRecord)> = self
            .db
            .all_records(collection)?
            .into_iter()
            .map(|r| (self.matcher.best_keyword_score(query, &r.keywords), r))
            .collect();
        scored.sort_by(|a, b| b.0.score.partial_cmp(&a.0.score).unwrap_or(Ordering::Equal));

        let runner_up = scored.get(1).map(|(s, _)| s.score).unwrap_or(0.0);
        let Some((top, record)) = scored.into_iter().next() else {
            return Ok(None);
        };

        let accepted = self.matching.accepts_precise(&top, runner_up);
        log::debug!(
            "[{}] \"{}\" best={} score={:.3} j={:.3} e={:.3} margin={:.3} accepted={}",
            collection,
            query,
            record.name,
            top.score,
            top.jaccard,
            top.edit,
            top.score - runner_up,
            accepted
        );
        if accepted {
            log::info!("[{}] Precise hit: {} (score={:.3})", collection, record.name, top.score);
            Ok(Some(record))
        } else {
            Ok(None)
        }
    }

    /// Exact, then scored-precise. Never writes, never calls the provider.
    pub fn find_local(
        &self,
        query: &str,
        collection: Collection,
    ) -> Result<Option<PlaceRecord>, DbError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }
        match self.find_exact(query, collection)? {
            Some(record) => Ok(Some(record)),
            None => self.find_precise(query, collection),
        }
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Resolve a free-text query to a canonical record, learning from misses.
    pub fn resolve(
        &mut self,
        query: &str,
        collection: Collection,
    ) -> Result<Option<PlaceRecord>, DbError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }
        if let Some(record) = self.find_local(query, collection)? {
            return self.remember(collection, record, query).map(Some);
        }

        log::info!("[{}] Local miss, asking provider: {}", collection, query);
        let candidate = match self.provider.lookup(query) {
            Ok(Some(candidate)) if !candidate.is_empty() => candidate,
            Ok(_) => {
                log::info!("[{}] Provider has no match for: {}", collection, query);
                return Ok(None);
            }
            Err(e) => {
                log::warn!(
                    "[{}] Provider lookup failed for \"{}\" (retryable={}): {}",
                    collection,
                    query,
                    e.is_retryable(),
                    e
                );
                return Ok(None);
            }
        };
        self.save_candidate(collection, query, candidate, String::new())
            .map(Some)
    }

    /// Resolve a query using distance to `reference` to break text ties.
    pub fn resolve_near(
        &mut self,
        query: &str,
        reference: Coordinates,
        collection: Collection,
    ) -> Result<Option<PlaceRecord>, DbError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }

        let mut pool: Vec<(f64, MatchScore, PlaceRecord)> = self
            .db
            .all_records(collection)?
            .into_iter()
            .filter_map(|r| {
                let score = self.matcher.best_keyword_score(query, &r.keywords);
                self.matching.admits_near(&score).then(|| {
                    let distance = distance_or_infinite(reference, r.latitude, r.longitude);
                    (distance, score, r)
                })
            })
            .collect();
        pool.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.1.score.partial_cmp(&a.1.score).unwrap_or(Ordering::Equal))
        });

        if let Some((distance, score, record)) = pool.into_iter().next() {
            if distance.is_finite() {
                log::info!(
                    "[{}] Nearest local hit: {} ({:.0} m, score={:.3})",
                    collection,
                    record.name,
                    distance,
                    score.score
                );
                return self.remember(collection, record, query).map(Some);
            }
        }

        let k = self.matching.near_top_k;
        log::info!(
            "[{}] No located local candidate, asking provider for {}: {}",
            collection,
            k,
            query
        );
        let candidates = match self.provider.lookup_top_k(query, k) {
            Ok(list) => list,
            Err(e) => {
                log::warn!("[{}] Provider lookup failed for \"{}\": {}", collection, query, e);
                return Ok(None);
            }
        };
        let candidates: Vec<PlaceCandidate> =
            candidates.into_iter().filter(|c| !c.is_empty()).collect();

        let Some(chosen) = nearest_candidate(reference, candidates) else {
            log::info!("[{}] Provider has no match for: {}", collection, query);
            return Ok(None);
        };
        let notes = format!("nearest to ({:.6},{:.6})", reference.lat, reference.lng);
        self.save_candidate(collection, query, chosen, notes).map(Some)
    }

    /// Merge the query into a locally matched record's keywords.
    fn remember(
        &self,
        collection: Collection,
        record: PlaceRecord,
        query: &str,
    ) -> Result<PlaceRecord, DbError> {
        if !self.db.append_keyword(collection, record.id, query)? {
            return Ok(record);
        }
        Ok(self.db.get_place(collection, record.id)?.unwrap_or(record))
    }

    fn save_candidate(
        &self,
        collection: Collection,
        query: &str,
        candidate: PlaceCandidate,
        notes: String,
    ) -> Result<PlaceRecord, DbError> {
        let name = match candidate.name.trim() {
            "" => query.to_string(),
            name => name.to_string(),
        };
        self.db.upsert_by_name(
            collection,
            &PlaceUpsert {
                name,
                keyword: query.to_string(),
                address: self.countries.strip(&candidate.address),
                latitude: candidate.latitude,
                longitude: candidate.longitude,
                provider_place_id: candidate.provider_place_id,
                notes,
            },
        )
    }
}

/// Nearest candidate with coordinates, else the first one.
fn nearest_candidate(
    reference: Coordinates,
    candidates: Vec<PlaceCandidate>,
) -> Option<PlaceCandidate> {
    let nearest = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (i, distance_or_infinite(reference, c.latitude, c.longitude)))
        .filter(|(_, d)| d.is_finite())
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);
    candidates.into_iter().nth(nearest)
}
