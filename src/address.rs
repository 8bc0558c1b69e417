//! Address clean-up: country suffix stripping and street/city extraction.

use regex::{Regex, RegexBuilder};

/// Strips a trailing country name (optionally preceded by a comma and "the")
/// from provider-supplied addresses.
#[derive(Debug, Clone)]
pub struct CountrySuffix {
    pattern: Option<Regex>,
}

impl CountrySuffix {
    pub fn new(countries: &[String]) -> Result<Self, regex::Error> {
        let alternatives: Vec<String> = countries
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(regex::escape)
            .collect();
        if alternatives.is_empty() {
            return Ok(Self { pattern: None });
        }
        let pattern = RegexBuilder::new(&format!(
            r",?\s*(the\s+)?({})\s*$",
            alternatives.join("|")
        ))
        .case_insensitive(true)
        .build()?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    pub fn strip(&self, address: &str) -> String {
        let trimmed = address.trim();
        let stripped = match &self.pattern {
            Some(re) => re.replace(trimmed, "").trim().to_string(),
            None => trimmed.to_string(),
        };
        stripped.trim_end_matches(',').trim_end().to_string()
    }
}

/// Split an address into `(street, city)`: the first comma segment, and the
/// last word of the last segment. Empty strings when nothing can be derived.
pub fn split_address(address: &str) -> (String, String) {
    let parts: Vec<&str> = address
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let street = parts.first().map(|s| s.to_string()).unwrap_or_default();
    let city = parts
        .last()
        .and_then(|p| p.split_whitespace().last())
        .map(str::to_string)
        .unwrap_or_default();
    (street, city)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn netherlands() -> CountrySuffix {
        CountrySuffix::new(&["netherlands".to_string()]).expect("valid pattern")
    }

    #[test]
    fn test_strip_country_suffix() {
        let c = netherlands();
        assert_eq!(
            c.strip("Herengracht 255, 1016 BJ Amsterdam, Netherlands"),
            "Herengracht 255, 1016 BJ Amsterdam"
        );
        assert_eq!(
            c.strip("Dam 9, 1012 JS Amsterdam, the Netherlands "),
            "Dam 9, 1012 JS Amsterdam"
        );
        assert_eq!(c.strip("Stationsplein, Amsterdam,"), "Stationsplein, Amsterdam");
        assert_eq!(c.strip(""), "");
    }

    #[test]
    fn test_strip_leaves_inner_country_mentions() {
        let c = netherlands();
        assert_eq!(
            c.strip("Netherlands Maritime Museum, Kattenburgerplein 1"),
            "Netherlands Maritime Museum, Kattenburgerplein 1"
        );
    }

    #[test]
    fn test_no_countries_only_trims() {
        let c = CountrySuffix::new(&[]).expect("empty list");
        assert_eq!(c.strip(" Dam 1, Netherlands "), "Dam 1, Netherlands");
    }

    #[test]
    fn test_split_address() {
        assert_eq!(
            split_address("Herengracht 255, 1016 BJ Amsterdam"),
            ("Herengracht 255".to_string(), "Amsterdam".to_string())
        );
        assert_eq!(
            split_address("Dam"),
            ("Dam".to_string(), "Dam".to_string())
        );
        assert_eq!(split_address(" , "), (String::new(), String::new()));
    }
}
