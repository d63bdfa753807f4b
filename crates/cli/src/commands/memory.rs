//! `affinity memory`: what the companion remembers about a user.

use std::time::Duration;

use affinity_core::relationship::RelationshipKey;
use affinity_engine::MemoryAggregator;

use super::stores;

pub async fn run(user: String, companion: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = stores::load_config()?;
    let companion = companion.unwrap_or_else(|| config.companion.id.clone());
    let key = RelationshipKey::new(user, companion);

    let stores = stores::open(&config).await?;
    let aggregator = MemoryAggregator::new(stores.episodic, stores.facts)
        .with_tier_timeout(Duration::from_millis(config.memory.tier_timeout_ms));
    let summary = aggregator.summary(&key).await?;

    println!("Memory for {key}");
    println!("===========");
    println!("  Backend:    {:?}", config.memory.backend);
    println!("  Episodes:   {}", summary.episodic_count);
    println!("  Facts:      {}", summary.fact_count);

    if let Some(state) = stores.durable.load_relationship(&key).await? {
        if !state.memories.is_empty() {
            println!("\n  Notes:");
            for note in state.memories.iter().rev() {
                println!("    - {note}");
            }
        }
    }

    if !summary.facts.is_empty() {
        println!("\n  Known facts:");
        for (name, value) in &summary.facts {
            println!("    {name}: {value}");
        }
    }

    Ok(())
}
