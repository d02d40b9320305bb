//! Human-readable reports built on top of the cache.
//!
//! This is the only layer that turns a [`FetchError`] into text: a report is
//! always produced, whatever individual lookups do.

use futures::future::join_all;

use crate::{FetchError, WeatherCache, WeatherData};

pub const DEFAULT_CITIES: &[&str] = &["London", "New York", "Tokyo", "Sydney", "Paris"];

/// Looks up every city concurrently and joins `"<city>: <t>°C"` lines with
/// `", "`, in input order. A failed city reads `"<city>: Error fetching data"`.
pub async fn multi_city_report<S: AsRef<str>>(cache: &WeatherCache, cities: &[S]) -> String {
    let lookups = cities.iter().map(|city| async move {
        let city = city.as_ref();
        summary_line(city, cache.get(city).await)
    });

    join_all(lookups).await.join(", ")
}

/// Full sentence for a single city.
pub async fn city_report(cache: &WeatherCache, city: &str) -> String {
    match cache.get(city).await {
        Ok(data) => describe(city, &data),
        Err(err) => failure_sentence(&err),
    }
}

fn summary_line(city: &str, result: Result<WeatherData, FetchError>) -> String {
    match result {
        Ok(data) => format!("{city}: {}°C", data.temperature),
        Err(FetchError::Network { .. } | FetchError::Api { .. } | FetchError::Timeout { .. }) => {
            format!("{city}: Error fetching data")
        }
    }
}

fn describe(city: &str, data: &WeatherData) -> String {
    format!(
        "The temperature in {city} is {}°C with {}% humidity and {}m/s wind speed.",
        data.temperature, data.humidity, data.wind_speed
    )
}

fn failure_sentence(err: &FetchError) -> String {
    let reason = match err {
        FetchError::Network { message } => format!("network error: {message}"),
        FetchError::Api { status_code, message } => format!("{message} (status {status_code})"),
        FetchError::Timeout { .. } => "Request timed out".to_string(),
    };
    format!("Failed to fetch weather data: {reason}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Behavior, ScriptedSource};
    use crate::{CacheSettings, ResilientFetcher, RetryPolicy};
    use std::{sync::Arc, time::Duration};

    fn cache_for(source: Arc<ScriptedSource>) -> WeatherCache {
        let policy = RetryPolicy::new(Duration::from_millis(10), 2, Duration::from_secs(5))
            .expect("valid policy");
        WeatherCache::new(CacheSettings::default(), ResilientFetcher::new(source, policy))
    }

    #[tokio::test(start_paused = true)]
    async fn one_failing_city_does_not_spoil_the_batch() {
        let source = Arc::new(
            ScriptedSource::new()
                .on("A", Behavior::Succeed(WeatherData::new(12, 50, 3)))
                .on("B", Behavior::Fail(FetchError::api(500, "Internal Server Error")))
                .on("C", Behavior::Succeed(WeatherData::new(-3, 90, 20))),
        );
        let cache = cache_for(source);

        let report = multi_city_report(&cache, &["A", "B", "C"]).await;

        assert_eq!(report, "A: 12°C, B: Error fetching data, C: -3°C");
    }

    #[tokio::test(start_paused = true)]
    async fn output_follows_input_order_not_completion_order() {
        // Tokyo answers much faster than London.
        let source = Arc::new(
            ScriptedSource::new()
                .with_latency(Duration::from_millis(50))
                .on("Tokyo", Behavior::Succeed(WeatherData::new(28, 70, 6)))
                .on(
                    "London",
                    Behavior::Sequence(vec![
                        Err(FetchError::network("reset")),
                        Ok(WeatherData::new(9, 80, 11)),
                    ]),
                ),
        );
        let cache = cache_for(source);

        let forward = multi_city_report(&cache, &["London", "Tokyo"]).await;
        let reverse = multi_city_report(&cache, &["Tokyo", "London"]).await;

        assert_eq!(forward, "London: 9°C, Tokyo: 28°C");
        assert_eq!(reverse, "Tokyo: 28°C, London: 9°C");
    }

    #[tokio::test(start_paused = true)]
    async fn cities_are_fetched_concurrently() {
        let source = Arc::new(
            ScriptedSource::new()
                .with_latency(Duration::from_secs(1))
                .on("A", Behavior::Succeed(WeatherData::new(1, 1, 1)))
                .on("B", Behavior::Succeed(WeatherData::new(2, 2, 2)))
                .on("C", Behavior::Succeed(WeatherData::new(3, 3, 3))),
        );
        let cache = cache_for(source);

        let started = tokio::time::Instant::now();
        multi_city_report(&cache, &["A", "B", "C"]).await;

        assert!(started.elapsed() < Duration::from_millis(1_500));
    }

    #[tokio::test]
    async fn empty_batch_yields_empty_report() {
        let cache = cache_for(Arc::new(ScriptedSource::new()));
        let cities: [&str; 0] = [];

        assert_eq!(multi_city_report(&cache, &cities).await, "");
    }

    #[tokio::test(start_paused = true)]
    async fn city_report_describes_conditions() {
        let source = Arc::new(
            ScriptedSource::new().on("Paris", Behavior::Succeed(WeatherData::new(18, 55, 7))),
        );
        let cache = cache_for(source);

        assert_eq!(
            city_report(&cache, "Paris").await,
            "The temperature in Paris is 18°C with 55% humidity and 7m/s wind speed."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn city_report_explains_failure() {
        let source = Arc::new(
            ScriptedSource::new().on("Paris", Behavior::Fail(FetchError::api(503, "Unavailable"))),
        );
        let cache = cache_for(source);

        assert_eq!(
            city_report(&cache, "Paris").await,
            "Failed to fetch weather data: Unavailable (status 503)"
        );
    }
}
