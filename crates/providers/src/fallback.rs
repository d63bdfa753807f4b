//! Ordered provider chain for the companion's generation calls.
//!
//! Each entry gets one attempt under its own timeout. A failed, timed-out, or
//! blank completion moves on to the next entry; nothing is retried on the
//! same provider. The chain is composed by the operator through
//! `fallback_providers`; the engine itself never retries.

use std::sync::Arc;
use std::time::Duration;

use affinity_core::error::ProviderError;
use affinity_core::provider::{Provider, ProviderRequest, ProviderResponse};
use async_trait::async_trait;
use tracing::{debug, warn};

pub struct FallbackProvider {
    name: String,
    chain: Vec<(Arc<dyn Provider>, Duration)>,
}

impl FallbackProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: Vec::new(),
        }
    }

    /// Append `provider`, giving it `timeout` per attempt.
    pub fn add(mut self, provider: Arc<dyn Provider>, timeout: Duration) -> Self {
        self.chain.push((provider, timeout));
        self
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

/// One attempt against one entry. Blank text counts as a failure.
async fn attempt(
    provider: &dyn Provider,
    timeout: Duration,
    request: ProviderRequest,
) -> Result<ProviderResponse, ProviderError> {
    let response = tokio::time::timeout(timeout, provider.complete(request))
        .await
        .map_err(|_| {
            ProviderError::Timeout(format!("{} gave no answer within {}s", provider.name(), timeout.as_secs()))
        })??;
    if response.message.content.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(response)
}

#[async_trait]
impl Provider for FallbackProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut last_error = ProviderError::NotConfigured(format!("fallback chain '{}' is empty", self.name));

        for (position, (provider, timeout)) in self.chain.iter().enumerate() {
            debug!(chain = %self.name, provider = provider.name(), position, "Trying provider");
            match attempt(provider.as_ref(), *timeout, request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    let remaining = self.chain.len() - position - 1;
                    warn!(chain = %self.name, provider = provider.name(), error = %e, remaining, "Provider failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use affinity_core::message::Message;
    use std::sync::Mutex;

    enum Behaviour {
        Reply(&'static str),
        Fail(ProviderError),
        Hang,
    }

    /// Behaves the same way on every call and counts them.
    struct StubProvider {
        name: &'static str,
        behaviour: Behaviour,
        calls: Mutex<usize>,
    }

    impl StubProvider {
        fn new(name: &'static str, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                name,
                behaviour,
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            match &self.behaviour {
                Behaviour::Reply(text) => Ok(ProviderResponse {
                    message: Message::assistant(*text),
                    usage: None,
                    model: format!("{}-model", self.name),
                }),
                Behaviour::Fail(e) => Err(e.clone()),
                Behaviour::Hang => std::future::pending().await,
            }
        }
    }

    const PATIENT: Duration = Duration::from_secs(120);

    fn request() -> ProviderRequest {
        ProviderRequest::new("any", vec![Message::user("good morning")])
    }

    #[tokio::test]
    async fn primary_answers_alone() {
        let primary = StubProvider::new("primary", Behaviour::Reply("Morning!"));
        let backup = StubProvider::new("backup", Behaviour::Reply("Hello"));
        let chain = FallbackProvider::new("chat").add(primary.clone(), PATIENT).add(backup.clone(), PATIENT);

        let response = chain.complete(request()).await.unwrap();
        assert_eq!(response.message.content, "Morning!");
        assert_eq!((primary.calls(), backup.calls()), (1, 0));
    }

    #[tokio::test]
    async fn errors_move_down_the_chain() {
        for error in [
            ProviderError::ApiError {
                status_code: 502,
                message: "bad gateway".into(),
            },
            ProviderError::RateLimited { retry_after_secs: 30 },
        ] {
            let primary = StubProvider::new("primary", Behaviour::Fail(error));
            let backup = StubProvider::new("backup", Behaviour::Reply("Hello"));
            let chain = FallbackProvider::new("chat").add(primary.clone(), PATIENT).add(backup.clone(), PATIENT);

            assert_eq!(chain.complete(request()).await.unwrap().model, "backup-model");
            assert_eq!((primary.calls(), backup.calls()), (1, 1));
        }
    }

    #[tokio::test]
    async fn exhausted_chain_reports_last_error() {
        let chain = FallbackProvider::new("chat")
            .add(StubProvider::new("a", Behaviour::Fail(ProviderError::Network("reset".into()))), PATIENT)
            .add(
                StubProvider::new("b", Behaviour::Fail(ProviderError::AuthenticationFailed("revoked".into()))),
                PATIENT,
            );

        assert!(matches!(
            chain.complete(request()).await,
            Err(ProviderError::AuthenticationFailed(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_entry_times_out() {
        let backup = StubProvider::new("backup", Behaviour::Reply("Hello"));
        let chain = FallbackProvider::new("chat")
            .add(StubProvider::new("slow", Behaviour::Hang), Duration::from_secs(5))
            .add(backup.clone(), PATIENT);

        assert!(chain.complete(request()).await.is_ok());
        assert_eq!(backup.calls(), 1);

        let only_slow = FallbackProvider::new("chat").add(StubProvider::new("slow", Behaviour::Hang), Duration::from_secs(5));
        assert!(matches!(only_slow.complete(request()).await, Err(ProviderError::Timeout(_))));
    }

    #[tokio::test]
    async fn blank_completion_is_a_failure() {
        let backup = StubProvider::new("backup", Behaviour::Reply("Hello"));
        let chain = FallbackProvider::new("chat")
            .add(StubProvider::new("blank", Behaviour::Reply(" \n ")), PATIENT)
            .add(backup.clone(), PATIENT);
        assert_eq!(chain.complete(request()).await.unwrap().message.content, "Hello");

        let only_blank = FallbackProvider::new("chat").add(StubProvider::new("blank", Behaviour::Reply("")), PATIENT);
        assert!(matches!(only_blank.complete(request()).await, Err(ProviderError::EmptyResponse)));
    }

    #[tokio::test]
    async fn empty_chain_is_not_configured() {
        let chain = FallbackProvider::new("chat");
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 0);
        assert!(matches!(chain.complete(request()).await, Err(ProviderError::NotConfigured(_))));
    }
}
