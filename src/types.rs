//! Configuration model.
//!
//! Every field has a serde default so a partial (or empty) `config.json`
//! is valid. Matching thresholds were tuned empirically against Amsterdam
//! hotel and pickup data; retune them here rather than in code.

use serde::{Deserialize, Serialize};

use crate::text::MatchScore;

/// Root configuration (`~/.placelink/config.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Knowledge store location. Defaults to `~/.placelink/places.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
    /// Primary city. Always a stop-word; also used to shape provider queries.
    #[serde(default = "default_city")]
    pub city: String,
    #[serde(default = "default_stopwords")]
    pub stopwords: Vec<String>,
    /// Country names stripped from the end of provider addresses.
    #[serde(default = "default_country_suffixes")]
    pub country_suffixes: Vec<String>,
    #[serde(default)]
    pub matching: MatchConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            city: default_city(),
            stopwords: default_stopwords(),
            country_suffixes: default_country_suffixes(),
            matching: MatchConfig::default(),
            provider: ProviderConfig::default(),
        }
    }
}

/// Acceptance thresholds for local matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchConfig {
    /// Scored-precise stage: minimum Jaccard of the top candidate.
    #[serde(default = "default_jaccard_min")]
    pub jaccard_min: f64,
    /// Scored-precise stage: minimum edit similarity of the top candidate.
    #[serde(default = "default_edit_min")]
    pub edit_min: f64,
    /// Scored-precise stage: minimum gap between the top two scores.
    #[serde(default = "default_margin_min")]
    pub margin_min: f64,
    /// Nearest-candidate pool: a combined score at or above this admits.
    #[serde(default = "default_near_score_min")]
    pub near_score_min: f64,
    #[serde(default = "default_near_jaccard_min")]
    pub near_jaccard_min: f64,
    #[serde(default = "default_near_edit_min")]
    pub near_edit_min: f64,
    /// How many provider candidates to rank by distance.
    #[serde(default = "default_near_top_k")]
    pub near_top_k: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            jaccard_min: default_jaccard_min(),
            edit_min: default_edit_min(),
            margin_min: default_margin_min(),
            near_score_min: default_near_score_min(),
            near_jaccard_min: default_near_jaccard_min(),
            near_edit_min: default_near_edit_min(),
            near_top_k: default_near_top_k(),
        }
    }
}

impl MatchConfig {
    /// Whether the best-scored candidate is an unambiguous match.
    pub fn accepts_precise(&self, top: &MatchScore, runner_up_score: f64) -> bool {
        top.jaccard >= self.jaccard_min
            && top.edit >= self.edit_min
            && top.score - runner_up_score >= self.margin_min
    }

    /// Relaxed bar for candidates that distance will later disambiguate.
    pub fn admits_near(&self, s: &MatchScore) -> bool {
        s.score >= self.near_score_min
            || (s.jaccard >= self.near_jaccard_min && s.edit >= self.near_edit_min)
    }
}

/// Settings for the HTTP geocoding provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_center_lat")]
    pub center_lat: f64,
    #[serde(default = "default_center_lng")]
    pub center_lng: f64,
    /// Append "near <city>" to queries that don't mention the city.
    #[serde(default = "default_true")]
    pub append_city_to_query: bool,
    /// ISO 3166-1 alpha-2 codes, comma separated (e.g. "nl").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_codes: Option<String>,
    /// Minimum spacing between consecutive requests.
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            center_lat: default_center_lat(),
            center_lng: default_center_lng(),
            append_city_to_query: true,
            country_codes: None,
            throttle_ms: default_throttle_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_city() -> String {
    "Amsterdam".to_string()
}

fn default_stopwords() -> Vec<String> {
    [
        "amsterdam",
        "hotel",
        "hotels",
        "the",
        "by",
        "hostel",
        "inn",
        "apartment",
        "apartments",
        "residence",
        "collection",
        "city",
        "center",
        "centre",
        "netherlands",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_country_suffixes() -> Vec<String> {
    vec!["netherlands".to_string()]
}

fn default_jaccard_min() -> f64 {
    0.80
}

fn default_edit_min() -> f64 {
    0.92
}

fn default_margin_min() -> f64 {
    0.05
}

fn default_near_score_min() -> f64 {
    0.55
}

fn default_near_jaccard_min() -> f64 {
    0.50
}

fn default_near_edit_min() -> f64 {
    0.75
}

fn default_near_top_k() -> usize {
    6
}

fn default_base_url() -> String {
    "https://nominatim.openstreetmap.org/".to_string()
}

fn default_user_agent() -> String {
    concat!("placelink/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_center_lat() -> f64 {
    52.3728
}

fn default_center_lng() -> f64 {
    4.8936
}

fn default_true() -> bool {
    true
}

fn default_throttle_ms() -> u64 {
    600
}

fn default_timeout_secs() -> u64 {
    12
}
