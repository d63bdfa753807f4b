//! Gathers long-term memory (L2 episodic, L3 facts) for one turn.
//!
//! Both tiers are queried concurrently, each under its own timeout. A tier
//! that errors or stalls is simply absent from the result; the turn goes on.

use std::sync::Arc;
use std::time::Duration;

use affinity_core::error::MemoryError;
use affinity_core::memory::{EpisodicStore, FactMap, FactStore, MemoryFilter, MemoryRecord};
use affinity_core::relationship::RelationshipKey;
use serde::Serialize;
use tracing::{debug, warn};

/// Long-term memory available to a turn.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryContext {
    /// `None` when the tier failed or timed out.
    pub episodic: Option<Vec<String>>,
    pub facts: Option<FactMap>,
}

/// Counts shown by `affinity memory`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemorySummary {
    pub episodic_count: usize,
    pub fact_count: usize,
    pub facts: FactMap,
}

pub struct MemoryAggregator {
    episodic: Arc<dyn EpisodicStore>,
    facts: Arc<dyn FactStore>,
    tier_timeout: Duration,
    top_k: usize,
}

impl MemoryAggregator {
    pub fn new(episodic: Arc<dyn EpisodicStore>, facts: Arc<dyn FactStore>) -> Self {
        Self {
            episodic,
            facts,
            tier_timeout: Duration::from_millis(1500),
            top_k: 5,
        }
    }

    pub fn with_tier_timeout(mut self, timeout: Duration) -> Self {
        self.tier_timeout = timeout;
        self
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// Query both tiers for `key`, using `query` for episodic relevance.
    pub async fn aggregate(&self, key: &RelationshipKey, query: &str) -> MemoryContext {
        let filter = MemoryFilter::for_key(key);

        let episodic_fut = tokio::time::timeout(self.tier_timeout, self.episodic.query(query, self.top_k, &filter));
        let facts_fut = tokio::time::timeout(self.tier_timeout, self.facts.get_facts(key));
        let (episodic, facts) = tokio::join!(episodic_fut, facts_fut);

        let episodic = settle(episodic, "episodic", self.episodic.name(), key);
        let facts = settle(facts, "facts", self.facts.name(), key);

        debug!(
            key = %key,
            episodic = episodic.as_ref().map(Vec::len),
            facts = facts.as_ref().map(FactMap::len),
            "Memory aggregated"
        );

        MemoryContext { episodic, facts }
    }

    /// Store one exchange as an episodic memory.
    pub async fn remember(&self, record: MemoryRecord) -> Result<String, MemoryError> {
        self.episodic.store(record).await
    }

    /// Merge newly learned facts.
    pub async fn learn(&self, key: &RelationshipKey, facts: FactMap) -> Result<(), MemoryError> {
        self.facts.merge_facts(key, facts).await
    }

    pub async fn summary(&self, key: &RelationshipKey) -> Result<MemorySummary, MemoryError> {
        let episodic_count = self.episodic.count(&MemoryFilter::for_key(key)).await?;
        let facts = self.facts.get_facts(key).await?;
        Ok(MemorySummary {
            episodic_count,
            fact_count: facts.len(),
            facts,
        })
    }
}

fn settle<T>(
    outcome: Result<Result<T, MemoryError>, tokio::time::error::Elapsed>,
    tier: &str,
    backend: &str,
    key: &RelationshipKey,
) -> Option<T> {
    match outcome {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!(tier, backend, key = %key, error = %e, "Memory tier failed");
            None
        }
        Err(_) => {
            warn!(tier, backend, key = %key, "Memory tier timed out");
            None
        }
    }
}
