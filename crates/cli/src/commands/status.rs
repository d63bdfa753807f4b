//! `affinity status`: show the stored relationship.

use affinity_core::relationship::RelationshipKey;

use super::stores;

pub async fn run(user: String, companion: Option<String>, limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = stores::load_config()?;
    let companion = companion.unwrap_or_else(|| config.companion.id.clone());
    let key = RelationshipKey::new(user, companion);

    println!("Affinity Status");
    println!("===============");
    println!("  Relationship: {key}");
    println!("  Provider:     {}", config.default_provider);
    println!("  Model:        {}", config.default_model);
    println!("  Pipeline:     {:?}", config.engine.pipeline);

    let stores = stores::open(&config).await?;
    if !stores.persistent {
        println!("\n  In-memory backend: nothing is kept between runs.");
        return Ok(());
    }

    let Some(state) = stores.durable.load_relationship(&key).await? else {
        println!("\n  No conversations yet. Run `affinity chat` to start one.");
        return Ok(());
    };

    let level = state.level();
    println!();
    println!("  Level:        {} ({})", level.display_name(), level.profile().description);
    println!("  Affinity:     {}/1000", state.affinity_score);
    println!("  Trust:        {}/100", state.trust_score);
    println!("  Tension:      {}/100", state.tension_score);
    println!("  Mood:         {}", state.mood);
    println!(
        "  Interactions: {} ({} positive, {} negative)",
        state.total_interactions, state.positive_interactions, state.negative_interactions
    );
    if level != level.next() {
        let needed = level.next().band().min - state.affinity_score;
        println!("  Next level:   {} in {needed} points", level.next().display_name());
    }

    let history = stores.durable.recent_history(&key, limit).await?;
    if !history.is_empty() {
        println!("\n  Recent changes:");
        for row in history {
            println!(
                "    {}  {:<15} {} -> {} ({:+}) {}",
                row.created_at.format("%Y-%m-%d %H:%M"),
                row.change_type.as_str(),
                row.old_value,
                row.new_value,
                row.delta,
                row.reason,
            );
        }
    }

    Ok(())
}
