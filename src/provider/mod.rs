//! External place provider.
//!
//! The engine only needs two lookup shapes: a single best candidate and a
//! list of up to `k` candidates. A provider is a stateful resource owned by
//! the caller: open it once, hand it to the engine, close it when done.

pub mod nominatim;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

pub use nominatim::NominatimProvider;

/// One place as reported by a provider. Any field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceCandidate {
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_place_id: Option<String>,
}

impl PlaceCandidate {
    /// A candidate with neither a name nor an address carries no match.
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty() && self.address.trim().is_empty()
    }
}

pub trait PlaceProvider {
    /// Acquire whatever the provider needs (sessions, clients).
    fn open(&mut self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Best single candidate for a query, `None` when nothing matched.
    fn lookup(&mut self, query: &str) -> Result<Option<PlaceCandidate>, ProviderError>;

    /// Up to `k` distinct candidates, provider order.
    fn lookup_top_k(&mut self, query: &str, k: usize) -> Result<Vec<PlaceCandidate>, ProviderError>;

    fn close(&mut self) {}
}

impl<T: PlaceProvider + ?Sized> PlaceProvider for &mut T {
    fn open(&mut self) -> Result<(), ProviderError> {
        (**self).open()
    }

    fn lookup(&mut self, query: &str) -> Result<Option<PlaceCandidate>, ProviderError> {
        (**self).lookup(query)
    }

    fn lookup_top_k(&mut self, query: &str, k: usize) -> Result<Vec<PlaceCandidate>, ProviderError> {
        (**self).lookup_top_k(query, k)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

impl<T: PlaceProvider + ?Sized> PlaceProvider for Box<T> {
    fn open(&mut self) -> Result<(), ProviderError> {
        (**self).open()
    }

    fn lookup(&mut self, query: &str) -> Result<Option<PlaceCandidate>, ProviderError> {
        (**self).lookup(query)
    }

    fn lookup_top_k(&mut self, query: &str, k: usize) -> Result<Vec<PlaceCandidate>, ProviderError> {
        (**self).lookup_top_k(query, k)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;

    /// Scripted provider for engine tests.
    #[derive(Debug, Default)]
    pub struct StubProvider {
        pub single: Option<PlaceCandidate>,
        pub many: Vec<PlaceCandidate>,
        pub fail: bool,
        pub lookups: usize,
        pub top_k_lookups: usize,
        pub last_k: Option<usize>,
    }

    impl StubProvider {
        pub fn returning(candidate: PlaceCandidate) -> Self {
            Self {
                single: Some(candidate),
                ..Self::default()
            }
        }

        pub fn listing(candidates: Vec<PlaceCandidate>) -> Self {
            Self {
                many: candidates,
                ..Self::default()
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn calls(&self) -> usize {
            self.lookups + self.top_k_lookups
        }
    }

    impl PlaceProvider for StubProvider {
        fn lookup(&mut self, _query: &str) -> Result<Option<PlaceCandidate>, ProviderError> {
            self.lookups += 1;
            if self.fail {
                return Err(ProviderError::Network("stub failure".to_string()));
            }
            Ok(self.single.clone())
        }

        fn lookup_top_k(
            &mut self,
            _query: &str,
            k: usize,
        ) -> Result<Vec<PlaceCandidate>, ProviderError> {
            self.top_k_lookups += 1;
            self.last_k = Some(k);
            if self.fail {
                return Err(ProviderError::Network("stub failure".to_string()));
            }
            Ok(self.many.iter().take(k).cloned().collect())
        }
    }

    pub fn candidate(name: &str, address: &str, coords: Option<(f64, f64)>) -> PlaceCandidate {
        PlaceCandidate {
            name: name.to_string(),
            address: address.to_string(),
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
            provider_place_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use super::*;

    #[test]
    fn test_empty_candidate() {
        assert!(candidate("", "  ", None).is_empty());
        assert!(!candidate("Dam Square", "", None).is_empty());
        assert!(!candidate("", "Dam, Amsterdam", None).is_empty());
    }

    #[test]
    fn test_borrowed_provider_delegates() {
        let mut stub = StubProvider::returning(candidate("Dam Square", "", None));
        {
            let mut borrowed: &mut StubProvider = &mut stub;
            let found = PlaceProvider::lookup(&mut borrowed, "dam").expect("lookup");
            assert_eq!(found.map(|c| c.name), Some("Dam Square".to_string()));
        }
        assert_eq!(stub.lookups, 1);
    }

    #[test]
    fn test_stub_caps_top_k() {
        let mut stub = StubProvider::listing(vec![
            candidate("A", "", None),
            candidate("B", "", None),
            candidate("C", "", None),
        ]);
        assert_eq!(stub.lookup_top_k("x", 2).expect("top k").len(), 2);
        assert_eq!(stub.last_k, Some(2));
    }
}
