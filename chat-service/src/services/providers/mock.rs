//! Scripted provider for testing.

use super::{ModelProvider, ProviderError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// In-memory provider with per-model scripted outcomes.
///
/// Each `generate` call pops the next queued outcome for that model; a model
/// with nothing queued answers with a fixed echo. Every call is recorded.
pub struct MockProvider {
    models: Result<Vec<String>, ProviderError>,
    outcomes: Mutex<HashMap<String, VecDeque<Result<String, ProviderError>>>>,
    list_calls: Mutex<usize>,
    generate_calls: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            models: Ok(Vec::new()),
            outcomes: Mutex::new(HashMap::new()),
            list_calls: Mutex::new(0),
            generate_calls: Mutex::new(Vec::new()),
        }
    }

    /// Models returned by `list_models`.
    pub fn with_models(mut self, models: &[&str]) -> Self {
        self.models = Ok(models.iter().map(|m| m.to_string()).collect());
        self
    }

    /// Make `list_models` fail.
    pub fn with_list_error(mut self, err: ProviderError) -> Self {
        self.models = Err(err);
        self
    }

    pub fn succeed(self, model: &str, text: &str) -> Self {
        self.push(model, Ok(text.to_string()))
    }

    pub fn fail(self, model: &str, err: ProviderError) -> Self {
        self.push(model, Err(err))
    }

    fn push(self, model: &str, outcome: Result<String, ProviderError>) -> Self {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes
                .entry(model.to_string())
                .or_default()
                .push_back(outcome);
        }
        self
    }

    /// Models passed to `generate`, in call order.
    pub fn generate_calls(&self) -> Vec<String> {
        self.generate_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.lock().map(|calls| *calls).unwrap_or_default()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        if let Ok(mut calls) = self.list_calls.lock() {
            *calls += 1;
        }
        self.models.clone()
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        if let Ok(mut calls) = self.generate_calls.lock() {
            calls.push(model.to_string());
        }

        let scripted = self
            .outcomes
            .lock()
            .ok()
            .and_then(|mut outcomes| outcomes.get_mut(model).and_then(VecDeque::pop_front));

        scripted.unwrap_or_else(|| Ok(format!("Mock response from {} for: {}", model, prompt)))
    }
}
