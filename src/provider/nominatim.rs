//! HTTP geocoder backed by a Nominatim-compatible `/search` endpoint.
//!
//! Queries are biased toward the configured city: the city is appended when
//! the query doesn't mention it, and results are weighted to a viewbox
//! around the city centre. Consecutive requests are spaced by `throttleMs`
//! to respect public usage policies.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use super::{PlaceCandidate, PlaceProvider};
use crate::error::ProviderError;
use crate::text::normalize;
use crate::types::ProviderConfig;

/// Half-width of the bias box around the city centre, in degrees.
const VIEWBOX_HALF_DEG: f64 = 0.12;
/// Upper bound the public API accepts for `limit`.
const MAX_LIMIT: usize = 40;

pub struct NominatimProvider {
    config: ProviderConfig,
    city: String,
    client: Option<Client>,
    last_request: Option<Instant>,
}

impl NominatimProvider {
    pub fn new(config: &ProviderConfig, city: &str) -> Self {
        Self {
            config: config.clone(),
            city: city.trim().to_string(),
            client: None,
            last_request: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }

    /// Query text as sent to the provider.
    pub fn shape_query(&self, query: &str) -> String {
        let query = query.trim();
        if !self.config.append_city_to_query || self.city.is_empty() {
            return query.to_string();
        }
        let haystack = format!(" {} ", normalize(query));
        let needle = format!(" {} ", normalize(&self.city));
        if haystack.contains(&needle) {
            query.to_string()
        } else {
            format!("{} near {}", query, self.city)
        }
    }

    fn search_url(&self, query: &str, limit: usize) -> Result<Url, ProviderError> {
        let base = Url::parse(&self.config.base_url)
            .map_err(|e| ProviderError::Configuration(format!("baseUrl: {}", e)))?;
        let mut url = base
            .join("search")
            .map_err(|e| ProviderError::Configuration(format!("baseUrl: {}", e)))?;

        let viewbox = format!(
            "{},{},{},{}",
            self.config.center_lng - VIEWBOX_HALF_DEG,
            self.config.center_lat + VIEWBOX_HALF_DEG,
            self.config.center_lng + VIEWBOX_HALF_DEG,
            self.config.center_lat - VIEWBOX_HALF_DEG
        );
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", &self.shape_query(query))
                .append_pair("format", "jsonv2")
                .append_pair("addressdetails", "1")
                .append_pair("limit", &limit.to_string())
                .append_pair("accept-language", "en")
                .append_pair("viewbox", &viewbox);
            if let Some(codes) = self.config.country_codes.as_deref() {
                if !codes.trim().is_empty() {
                    pairs.append_pair("countrycodes", codes.trim());
                }
            }
        }
        Ok(url)
    }

    fn throttle(&mut self) {
        let spacing = Duration::from_millis(self.config.throttle_ms);
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < spacing {
                std::thread::sleep(spacing - elapsed);
            }
        }
        self.last_request = Some(Instant::now());
    }

    fn search(&mut self, query: &str, limit: usize) -> Result<Vec<PlaceCandidate>, ProviderError> {
        if self.client.is_none() {
            return Err(ProviderError::Closed);
        }
        let url = self.search_url(query, limit)?;
        self.throttle();
        let client = self.client.as_ref().ok_or(ProviderError::Closed)?;
        log::debug!("[provider] GET {}", url);

        let timeout_secs = self.config.timeout_secs;
        let resp = client
            .get(url)
            .send()
            .map_err(|e| transport_error(e, timeout_secs))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }
        let body = resp.text().map_err(|e| transport_error(e, timeout_secs))?;
        parse_search_response(&body)
    }
}

/// Map a transport failure to a provider error. A stalled body read reports
/// both timeout and decode, so timeout is checked first.
fn transport_error(err: reqwest::Error, timeout_secs: u64) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout_secs)
    } else if err.is_decode() {
        ProviderError::Parse(err.to_string())
    } else {
        ProviderError::Network(err.to_string())
    }
}

impl PlaceProvider for NominatimProvider {
    fn open(&mut self) -> Result<(), ProviderError> {
        if self.client.is_some() {
            return Ok(());
        }
        let client = Client::builder()
            .user_agent(self.config.user_agent.clone())
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;
        self.client = Some(client);
        log::info!("[provider] opened {}", self.config.base_url);
        Ok(())
    }

    fn lookup(&mut self, query: &str) -> Result<Option<PlaceCandidate>, ProviderError> {
        Ok(self.lookup_top_k(query, 1)?.into_iter().next())
    }

    fn lookup_top_k(&mut self, query: &str, k: usize) -> Result<Vec<PlaceCandidate>, ProviderError> {
        if k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let mut candidates = self.search(query, k.min(MAX_LIMIT))?;
        candidates.truncate(k);
        log::info!(
            "[provider] {} candidate(s) for \"{}\"",
            candidates.len(),
            query.trim()
        );
        Ok(candidates)
    }

    fn close(&mut self) {
        if self.client.take().is_some() {
            log::info!("[provider] closed");
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    place_id: Option<i64>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    lat: Option<String>,
    #[serde(default)]
    lon: Option<String>,
    #[serde(default)]
    address: Option<HitAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct HitAddress {
    road: Option<String>,
    pedestrian: Option<String>,
    house_number: Option<String>,
    postcode: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
}

/// Parse a `format=jsonv2` search body into distinct, non-empty candidates.
fn parse_search_response(body: &str) -> Result<Vec<PlaceCandidate>, ProviderError> {
    let hits: Vec<SearchHit> =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for hit in hits {
        let candidate = candidate_from_hit(hit);
        if candidate.is_empty() {
            continue;
        }
        let key = (normalize(&candidate.name), normalize(&candidate.address));
        if seen.insert(key) {
            candidates.push(candidate);
        }
    }
    Ok(candidates)
}

fn candidate_from_hit(hit: SearchHit) -> PlaceCandidate {
    let name = hit
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| first_segment(&hit.display_name));

    let address = hit
        .address
        .as_ref()
        .map(format_address)
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| hit.display_name.trim().to_string());

    PlaceCandidate {
        name,
        address,
        latitude: parse_coordinate(hit.lat.as_deref()),
        longitude: parse_coordinate(hit.lon.as_deref()),
        provider_place_id: hit.place_id.map(|id| id.to_string()),
    }
}

/// "Road 12, 1016 BJ City", skipping whatever parts are missing.
fn format_address(addr: &HitAddress) -> String {
    let road = addr.road.as_deref().or(addr.pedestrian.as_deref()).unwrap_or_default();
    let street = match addr.house_number.as_deref() {
        Some(number) if !road.is_empty() => format!("{} {}", road, number),
        _ => road.to_string(),
    };
    let locality = addr
        .city
        .as_deref()
        .or(addr.town.as_deref())
        .or(addr.village.as_deref())
        .unwrap_or_default();
    let place = [addr.postcode.as_deref().unwrap_or_default(), locality]
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    [street.trim(), place.as_str()]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
}

fn first_segment(display_name: &str) -> String {
    display_name
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn parse_coordinate(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
