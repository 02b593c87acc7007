//! Ordered model fallback.
//!
//! Candidates are tried one at a time; the first success is returned and no
//! further model is called. Nothing is remembered between requests.

use super::classify::{classify, truncate, FailureKind, ATTEMPT_ERROR_CHARS, LAST_ERROR_CHARS};
use super::metrics;
use super::providers::ModelProvider;
use crate::config::ModelSettings;
use crate::error::ChatError;
use std::sync::Arc;
use std::time::Instant;

/// Text produced by the first candidate that succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub model: String,
    pub text: String,
    /// Candidates called, including the successful one.
    pub attempts: usize,
}

#[derive(Clone)]
pub struct ModelResolver {
    provider: Arc<dyn ModelProvider>,
    settings: ModelSettings,
}

impl ModelResolver {
    pub fn new(provider: Arc<dyn ModelProvider>, settings: ModelSettings) -> Self {
        Self { provider, settings }
    }

    /// Ordered candidate list for one request.
    ///
    /// With discovery on, the provider's generation-capable models are ranked
    /// fast tier first; a failed or empty listing falls back to the fixed list.
    pub async fn candidates(&self) -> Vec<String> {
        if !self.settings.discovery {
            return self.settings.fallback_models.clone();
        }

        match self.provider.list_models().await {
            Ok(available) if !available.is_empty() => rank_candidates(
                available,
                &self.settings.fast_tier_marker,
                self.settings.max_candidates,
            ),
            Ok(_) => {
                tracing::warn!("Provider listed no generation models, using fixed list");
                self.settings.fallback_models.clone()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Model discovery failed, using fixed list");
                self.settings.fallback_models.clone()
            }
        }
    }

    pub async fn resolve(&self, message: &str) -> Result<Generated, ChatError> {
        let candidates = self.candidates().await;
        self.try_candidates(&candidates, message).await
    }

    #[tracing::instrument(skip(self, candidates, message), fields(candidate_count = candidates.len()))]
    pub async fn try_candidates(
        &self,
        candidates: &[String],
        message: &str,
    ) -> Result<Generated, ChatError> {
        let mut errors = Vec::with_capacity(candidates.len());
        let mut last_failure: Option<(FailureKind, String)> = None;

        for (index, model) in candidates.iter().enumerate() {
            let started = Instant::now();

            match self.provider.generate(model, message).await {
                Ok(text) => {
                    metrics::record_model_attempt(model, "success", started.elapsed());
                    return Ok(Generated {
                        model: model.clone(),
                        text,
                        attempts: index + 1,
                    });
                }
                Err(e) => {
                    let kind = classify(&e);
                    let error_text = e.to_string();
                    metrics::record_model_attempt(model, kind.as_str(), started.elapsed());

                    tracing::warn!(
                        model = %model,
                        kind = kind.as_str(),
                        error = %truncate(&error_text, ATTEMPT_ERROR_CHARS),
                        "Candidate model failed, trying next"
                    );

                    errors.push(format!(
                        "{}: {}",
                        model,
                        truncate(&error_text, ATTEMPT_ERROR_CHARS)
                    ));
                    last_failure = Some((kind, error_text));
                }
            }
        }

        let tried = candidates.to_vec();
        match last_failure {
            Some((kind, last_error)) if kind.is_quota_related() => Err(ChatError::QuotaExhausted {
                tried,
                last_error: truncate(&last_error, LAST_ERROR_CHARS).to_string(),
            }),
            _ => Err(ChatError::AllModelsFailed { tried, errors }),
        }
    }
}

/// Fast-tier models first, then the rest, each tier in provider order.
/// `max_candidates` caps the list when set.
pub fn rank_candidates(
    available: Vec<String>,
    fast_marker: &str,
    max_candidates: Option<usize>,
) -> Vec<String> {
    let marker = fast_marker.to_lowercase();
    let (fast, other): (Vec<String>, Vec<String>) = available
        .into_iter()
        .partition(|model| !marker.is_empty() && model.to_lowercase().contains(&marker));

    fast.into_iter().chain(other).take(max_candidates.unwrap_or(usize::MAX)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::mock::MockProvider;
    use crate::services::providers::ProviderError;

    fn settings(discovery: bool) -> ModelSettings {
        ModelSettings {
            discovery,
            fallback_models: vec!["fixed-flash".into(), "fixed-pro".into()],
            max_candidates: Some(3),
            fast_tier_marker: "flash".into(),
        }
    }

    fn quota() -> ProviderError {
        ProviderError::Api {
            status: 429,
            message: "Resource has been exhausted (e.g. check quota).".into(),
        }
    }

    fn names(models: &[&str]) -> Vec<String> {
        models.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn test_rank_fast_tier_first_and_caps() {
        let ranked = rank_candidates(
            names(&["gemini-1.5-pro", "gemini-2.0-Flash", "gemma-3", "gemini-1.5-flash-8b"]),
            "flash",
            Some(3),
        );
        assert_eq!(ranked, vec!["gemini-2.0-Flash", "gemini-1.5-flash-8b", "gemini-1.5-pro"]);
    }

    #[test]
    fn test_rank_without_cap_keeps_every_model() {
        let ranked = rank_candidates(names(&["a-pro", "b-flash", "c", "d", "e", "f", "g"]), "flash", None);
        assert_eq!(ranked.len(), 7);
        assert_eq!(ranked[0], "b-flash");
        assert_eq!(ranked[6], "g");
    }

    #[tokio::test]
    async fn test_default_settings_reach_models_past_the_fifth() {
        let provider = Arc::new(
            MockProvider::new()
                .with_models(&["f1-flash", "f2-flash", "f3-flash", "f4-flash", "f5-flash", "x-pro"])
                .fail("f1-flash", quota())
                .fail("f2-flash", quota())
                .fail("f3-flash", quota())
                .fail("f4-flash", quota())
                .fail("f5-flash", quota())
                .succeed("x-pro", "from pro"),
        );
        let resolver = ModelResolver::new(provider.clone(), ModelSettings::default());

        let generated = resolver.resolve("hello").await.unwrap();

        assert_eq!(generated.model, "x-pro");
        assert_eq!(generated.text, "from pro");
        assert_eq!(generated.attempts, 6);
        assert_eq!(provider.generate_calls().len(), 6);
    }

    #[tokio::test]
    async fn test_discovery_ranks_provider_models() {
        let provider = Arc::new(MockProvider::new().with_models(&["a-pro", "b-flash"]));
        let resolver = ModelResolver::new(provider.clone(), settings(true));

        assert_eq!(resolver.candidates().await, vec!["b-flash", "a-pro"]);
        assert_eq!(provider.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_discovery_failure_uses_fixed_list() {
        let provider = Arc::new(MockProvider::new().with_list_error(ProviderError::Network("dns".into())));
        let resolver = ModelResolver::new(provider, settings(true));

        assert_eq!(resolver.candidates().await, vec!["fixed-flash", "fixed-pro"]);
    }

    #[tokio::test]
    async fn test_discovery_empty_uses_fixed_list() {
        let provider = Arc::new(MockProvider::new());
        let resolver = ModelResolver::new(provider, settings(true));

        assert_eq!(resolver.candidates().await, vec!["fixed-flash", "fixed-pro"]);
    }

    #[tokio::test]
    async fn test_fixed_policy_skips_listing() {
        let provider = Arc::new(MockProvider::new().with_models(&["other"]));
        let resolver = ModelResolver::new(provider.clone(), settings(false));

        assert_eq!(resolver.candidates().await, vec!["fixed-flash", "fixed-pro"]);
        assert_eq!(provider.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let provider = Arc::new(
            MockProvider::new()
                .fail("a", quota())
                .succeed("b", "from b")
                .succeed("c", "from c"),
        );
        let resolver = ModelResolver::new(provider.clone(), settings(false));

        let generated = resolver
            .try_candidates(&names(&["a", "b", "c"]), "hello")
            .await
            .unwrap();

        assert_eq!(generated.model, "b");
        assert_eq!(generated.text, "from b");
        assert_eq!(generated.attempts, 2);
        assert_eq!(provider.generate_calls(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_last_quota_error_gives_quota_exhausted() {
        let provider = Arc::new(
            MockProvider::new()
                .fail("a", ProviderError::Network("reset".into()))
                .fail("b", quota()),
        );
        let resolver = ModelResolver::new(provider, settings(false));

        let err = resolver
            .try_candidates(&names(&["a", "b"]), "hello")
            .await
            .unwrap_err();

        match err {
            ChatError::QuotaExhausted { tried, last_error } => {
                assert_eq!(tried, vec!["a", "b"]);
                assert!(last_error.starts_with("Gemini API error 429"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_quota_exhausted_last_error_is_cut_to_limit() {
        let provider = Arc::new(MockProvider::new().fail(
            "a",
            ProviderError::Api {
                status: 429,
                message: "q".repeat(400),
            },
        ));
        let resolver = ModelResolver::new(provider, settings(false));

        let err = resolver.try_candidates(&names(&["a"]), "hi").await.unwrap_err();

        let ChatError::QuotaExhausted { ref last_error, .. } = err else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(last_error.chars().count(), LAST_ERROR_CHARS);
        assert!(last_error.starts_with("Gemini API error 429: qqq"));

        let rendered = err.to_string();
        let (_, quoted) = rendered.split_once("Last error: ").unwrap();
        assert_eq!(quoted.chars().count(), LAST_ERROR_CHARS);
    }

    #[tokio::test]
    async fn test_zero_allocation_last_counts_as_quota() {
        let provider = Arc::new(MockProvider::new().fail(
            "a",
            ProviderError::Api {
                status: 429,
                message: "Quota exceeded, limit: 0".into(),
            },
        ));
        let resolver = ModelResolver::new(provider, settings(false));

        let err = resolver.try_candidates(&names(&["a"]), "hi").await.unwrap_err();
        assert!(matches!(err, ChatError::QuotaExhausted { .. }));
    }

    #[tokio::test]
    async fn test_non_quota_last_error_lists_truncated_errors() {
        let long = "x".repeat(500);
        let provider = Arc::new(
            MockProvider::new()
                .fail("a", quota())
                .fail("b", ProviderError::InvalidResponse(long)),
        );
        let resolver = ModelResolver::new(provider, settings(false));

        let err = resolver
            .try_candidates(&names(&["a", "b"]), "hello")
            .await
            .unwrap_err();

        match err {
            ChatError::AllModelsFailed { tried, errors } => {
                assert_eq!(tried, vec!["a", "b"]);
                assert_eq!(errors.len(), 2);
                assert!(errors[0].starts_with("a: Gemini API error 429"));
                assert!(errors[1].starts_with("b: Invalid response: "));
                assert_eq!(errors[1].chars().count(), "b: ".len() + ATTEMPT_ERROR_CHARS);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_candidates_is_failure() {
        let resolver = ModelResolver::new(Arc::new(MockProvider::new()), settings(false));

        let err = resolver.try_candidates(&[], "hello").await.unwrap_err();
        assert!(matches!(err, ChatError::AllModelsFailed { ref tried, .. } if tried.is_empty()));
    }
}
