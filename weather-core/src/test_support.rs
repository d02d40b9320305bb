//! Scripted weather source used by the unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::{FetchError, WeatherData, WeatherSource};

#[derive(Debug, Clone)]
pub enum Behavior {
    Succeed(WeatherData),
    Fail(FetchError),
    /// Plays the listed outcomes in order, repeating the last one forever.
    Sequence(Vec<Result<WeatherData, FetchError>>),
}

#[derive(Debug, Default)]
pub struct ScriptedSource {
    latency: Duration,
    latencies: Mutex<HashMap<String, Duration>>,
    behaviors: Mutex<HashMap<String, Behavior>>,
    sequences: Mutex<HashMap<String, VecDeque<Result<WeatherData, FetchError>>>>,
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Overrides the default latency for one city.
    pub fn with_latency_for(self, city: &str, latency: Duration) -> Self {
        self.latencies.lock().unwrap().insert(city.to_string(), latency);
        self
    }

    pub fn on(self, city: &str, behavior: Behavior) -> Self {
        if let Behavior::Sequence(outcomes) = &behavior {
            self.sequences.lock().unwrap().insert(city.to_string(), outcomes.clone().into());
        }
        self.behaviors.lock().unwrap().insert(city.to_string(), behavior);
        self
    }

    pub fn calls_for(&self, city: &str) -> usize {
        self.calls.lock().unwrap().get(city).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    fn next_outcome(&self, city: &str) -> Result<WeatherData, FetchError> {
        let behavior = self.behaviors.lock().unwrap().get(city).cloned();
        match behavior {
            Some(Behavior::Succeed(data)) => Ok(data),
            Some(Behavior::Fail(err)) => Err(err),
            Some(Behavior::Sequence(_)) => {
                let mut sequences = self.sequences.lock().unwrap();
                let queue = sequences.get_mut(city).expect("sequence registered");
                if queue.len() > 1 {
                    queue.pop_front().expect("non-empty queue")
                } else {
                    queue.front().cloned().unwrap_or_else(|| Err(FetchError::unknown()))
                }
            }
            None => Err(FetchError::api(404, format!("no script for {city}"))),
        }
    }
}

#[async_trait]
impl WeatherSource for ScriptedSource {
    async fn fetch_one(&self, city: &str) -> Result<WeatherData, FetchError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self.calls.lock().unwrap().entry(city.to_string()).or_default() += 1;

        let latency = self
            .latencies
            .lock()
            .unwrap()
            .get(city)
            .copied()
            .unwrap_or(self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        self.next_outcome(city)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
