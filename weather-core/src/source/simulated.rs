use anyhow::{Result, ensure};
use async_trait::async_trait;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{FetchError, WeatherData};

use super::WeatherSource;

/// In-process stand-in for the mock weather API.
///
/// Each city gets random conditions on first request which then stay fixed.
/// Independently of the city, every call fails with `failure_rate` probability
/// as an HTTP 500.
#[derive(Debug)]
pub struct SimulatedWeatherSource {
    failure_rate: f64,
    state: Mutex<SimState>,
}

#[derive(Debug)]
struct SimState {
    rng: StdRng,
    cities: HashMap<String, WeatherData>,
}

impl SimulatedWeatherSource {
    pub fn new(failure_rate: f64) -> Result<Self> {
        Self::build(failure_rate, StdRng::from_entropy())
    }

    /// Deterministic variant for reproducible runs.
    pub fn with_seed(failure_rate: f64, seed: u64) -> Result<Self> {
        Self::build(failure_rate, StdRng::seed_from_u64(seed))
    }

    fn build(failure_rate: f64, rng: StdRng) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&failure_rate),
            "Simulated failure rate must be between 0 and 1, got {failure_rate}"
        );

        Ok(Self {
            failure_rate,
            state: Mutex::new(SimState {
                rng,
                cities: HashMap::new(),
            }),
        })
    }

    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }
}

#[async_trait]
impl WeatherSource for SimulatedWeatherSource {
    async fn fetch_one(&self, city: &str) -> Result<WeatherData, FetchError> {
        let mut state = self.state.lock().await;

        if state.rng.gen_bool(self.failure_rate) {
            debug!(city, "simulated source injecting failure");
            return Err(FetchError::api(500, "Internal Server Error"));
        }

        if city.is_empty() {
            return Err(FetchError::api(400, "Please provide a city parameter"));
        }

        let SimState { rng, cities } = &mut *state;
        let data = *cities.entry(city.to_string()).or_insert_with(|| {
            WeatherData::new(rng.gen_range(-10..=30), rng.gen_range(0..=100), rng.gen_range(0..=50))
        });

        Ok(data)
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_are_stable_per_city() {
        let source = SimulatedWeatherSource::with_seed(0.0, 7).expect("source");

        let first = source.fetch_one("London").await.expect("no failures configured");
        let second = source.fetch_one("London").await.expect("no failures configured");

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn values_stay_in_documented_ranges() {
        let source = SimulatedWeatherSource::with_seed(0.0, 42).expect("source");

        for i in 0..50 {
            let data = source.fetch_one(&format!("city-{i}")).await.expect("success");
            assert!((-10..=30).contains(&data.temperature));
            assert!(data.humidity <= 100);
            assert!(data.wind_speed <= 50);
        }
    }

    #[tokio::test]
    async fn full_failure_rate_always_returns_server_error() {
        let source = SimulatedWeatherSource::with_seed(1.0, 1).expect("source");

        for _ in 0..5 {
            let err = source.fetch_one("Sydney").await.unwrap_err();
            assert_eq!(err, FetchError::api(500, "Internal Server Error"));
        }
    }

    #[tokio::test]
    async fn empty_city_is_a_bad_request() {
        let source = SimulatedWeatherSource::with_seed(0.0, 3).expect("source");

        let err = source.fetch_one("").await.unwrap_err();
        assert_eq!(err.status_code(), Some(400));
    }

    #[test]
    fn rejects_out_of_range_failure_rate() {
        let err = SimulatedWeatherSource::new(-0.1).unwrap_err();
        assert!(err.to_string().contains("between 0 and 1"));
    }
}
