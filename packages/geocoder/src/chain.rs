//! Priority-ordered fallback across geocoding providers.

use std::time::Duration;

use crate::service_registry::enabled_services;
use crate::{GeocodeError, GeocodedLocation, Geocoder, GeocodingProvider, http_client};

/// Tries each provider in order and returns the first match.
pub struct ChainGeocoder {
    providers: Vec<Box<dyn Geocoder>>,
}

impl ChainGeocoder {
    /// Chains the given providers, first to last.
    #[must_use]
    pub const fn new(providers: Vec<Box<dyn Geocoder>>) -> Self {
        Self { providers }
    }

    /// Builds the chain from the enabled services in the embedded registry.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the HTTP client cannot be built.
    pub fn from_registry(timeout: Duration) -> Result<Self, GeocodeError> {
        let client = http_client(timeout)?;
        let providers = enabled_services()
            .iter()
            .map(|svc| {
                log::debug!("Geocoding provider '{}' (priority {})", svc.id, svc.priority);
                svc.build(client.clone())
            })
            .collect();

        Ok(Self::new(providers))
    }

    /// Number of providers in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the chain has no providers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait::async_trait]
impl Geocoder for ChainGeocoder {
    fn provider(&self) -> GeocodingProvider {
        self.providers
            .first()
            .map_or(GeocodingProvider::Nominatim, |p| p.provider())
    }

    /// Returns the first provider's match. Provider errors are logged and
    /// the next provider is tried; if every provider errored, the last
    /// error is returned.
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedLocation>, GeocodeError> {
        let mut last_error = None;
        let mut any_answered = false;

        for provider in &self.providers {
            match provider.geocode(address).await {
                Ok(Some(location)) => {
                    log::info!(
                        "Geocoded '{address}' via {} -> ({:.5}, {:.5})",
                        location.provider,
                        location.point.latitude,
                        location.point.longitude
                    );
                    return Ok(Some(location));
                }
                Ok(None) => {
                    log::debug!("{}: no match for '{address}'", provider.provider());
                    any_answered = true;
                }
                Err(e) => {
                    log::warn!("{}: geocoding '{address}' failed: {e}", provider.provider());
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !any_answered => Err(e),
            _ if self.providers.is_empty() => Err(GeocodeError::NoProviders),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use site_engine_geography_models::GeoPoint;

    use super::*;

    enum Outcome {
        Hit,
        Miss,
        Fail,
    }

    struct Fake {
        provider: GeocodingProvider,
        outcome: Outcome,
    }

    #[async_trait::async_trait]
    impl Geocoder for Fake {
        fn provider(&self) -> GeocodingProvider {
            self.provider
        }

        async fn geocode(&self, address: &str) -> Result<Option<GeocodedLocation>, GeocodeError> {
            match self.outcome {
                Outcome::Hit => Ok(Some(GeocodedLocation {
                    point: GeoPoint::new(38.9, -77.0),
                    label: format!("{address} ({})", self.provider),
                    provider: self.provider,
                })),
                Outcome::Miss => Ok(None),
                Outcome::Fail => Err(GeocodeError::RateLimited),
            }
        }
    }

    fn fake(provider: GeocodingProvider, outcome: Outcome) -> Box<dyn Geocoder> {
        Box::new(Fake { provider, outcome })
    }

    #[tokio::test]
    async fn first_match_wins() {
        let chain = ChainGeocoder::new(vec![
            fake(GeocodingProvider::Nominatim, Outcome::Hit),
            fake(GeocodingProvider::Census, Outcome::Hit),
        ]);
        let location = chain.geocode("1 Main St").await.unwrap().unwrap();
        assert_eq!(location.provider, GeocodingProvider::Nominatim);
    }

    #[tokio::test]
    async fn falls_through_misses_and_errors() {
        let chain = ChainGeocoder::new(vec![
            fake(GeocodingProvider::Nominatim, Outcome::Fail),
            fake(GeocodingProvider::Census, Outcome::Hit),
        ]);
        let location = chain.geocode("1 Main St").await.unwrap().unwrap();
        assert_eq!(location.provider, GeocodingProvider::Census);
    }

    #[tokio::test]
    async fn all_failed_returns_error() {
        let chain = ChainGeocoder::new(vec![
            fake(GeocodingProvider::Nominatim, Outcome::Fail),
            fake(GeocodingProvider::Census, Outcome::Fail),
        ]);
        assert!(matches!(
            chain.geocode("1 Main St").await,
            Err(GeocodeError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn miss_and_error_is_no_match() {
        let chain = ChainGeocoder::new(vec![
            fake(GeocodingProvider::Nominatim, Outcome::Miss),
            fake(GeocodingProvider::Census, Outcome::Fail),
        ]);
        assert!(chain.geocode("1 Main St").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_chain_errors() {
        let chain = ChainGeocoder::new(Vec::new());
        assert!(chain.is_empty());
        assert!(matches!(
            chain.geocode("1 Main St").await,
            Err(GeocodeError::NoProviders)
        ));
    }

    #[test]
    fn registry_chain_has_every_enabled_service() {
        let chain = ChainGeocoder::from_registry(Duration::from_secs(5)).unwrap();
        assert_eq!(chain.len(), enabled_services().len());
        assert_eq!(chain.provider(), GeocodingProvider::Nominatim);
    }
}
