//! `affinity chat`: interactive or single-message chat.

use std::sync::Arc;
use std::time::Duration;

use affinity_config::AppConfig;
use affinity_core::event::AffinityEvent;
use affinity_core::message::SessionId;
use affinity_core::relationship::RelationshipKey;
use affinity_core::store::StateStore;
use affinity_engine::{MemoryAggregator, ResponseCoordinator, TurnRequest, TurnResponse};
use affinity_memory::{InMemoryStateStore, SessionStore};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast;

use super::stores;

pub async fn run(
    user: String,
    companion: Option<String>,
    message: Option<String>,
    debug: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = stores::load_config()?;
    config.engine.debug |= debug;

    if !config.has_api_key() && config.default_provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENROUTER_API_KEY=sk-or-v1-...   (recommended)");
        eprintln!("    OPENAI_API_KEY=sk-...             (for OpenAI direct)");
        eprintln!("    AFFINITY_API_KEY=sk-...           (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = affinity_providers::router::primary_from_config(&config).ok_or("No default provider configured")?;
    let companion_id = companion.unwrap_or_else(|| config.companion.id.clone());
    let key = RelationshipKey::new(&user, &companion_id);

    let stores = stores::open(&config).await?;

    // The fast store starts empty each run; seed it from the mirror.
    let states = Arc::new(InMemoryStateStore::new());
    match stores.durable.load_relationship(&key).await {
        Ok(Some(state)) => states.set_state(&state).await?,
        Ok(None) => {}
        Err(e) => tracing::warn!(key = %key, error = %e, "Could not load stored relationship"),
    }

    let sessions = SessionStore::new(config.memory.working_capacity);
    let sweeper = sessions.spawn_sweeper(
        Duration::from_secs(config.memory.sweep_interval_secs),
        Duration::from_secs(config.memory.idle_ttl_secs),
    );

    let memory = MemoryAggregator::new(stores.episodic, stores.facts)
        .with_tier_timeout(Duration::from_millis(config.memory.tier_timeout_ms))
        .with_top_k(config.memory.episodic_top_k);
    let coordinator = ResponseCoordinator::new(provider, &config, states, stores.durable, sessions.clone(), memory);
    let mut events = coordinator.event_bus().subscribe();
    let session = SessionId::new();

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let response = coordinator
            .respond(TurnRequest::new(&user, &companion_id, session.clone(), msg))
            .await;
        eprint!("\r              \r");
        println!("{}", response.reply);
        print_debug(&response)?;
        print_level_changes(&mut events);
    } else {
        println!();
        println!("  Affinity: Interactive Mode");
        println!("  ==========================");
        println!();
        println!("  Companion: {} ({companion_id})", coordinator.companion_name());
        println!("  You:       {user}");
        println!("  Provider:  {}", config.default_provider);
        println!("  Model:     {}", config.default_model);
        println!("  Pipeline:  {:?}", config.engine.pipeline);
        println!();
        println!("  Type your message and press Enter.");
        println!("  Type 'exit' or Ctrl+C to quit.");
        println!();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        loop {
            stdout.write_all(b"  You > ").await?;
            stdout.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if matches!(line, "exit" | "quit") {
                break;
            }

            eprint!("  ...");
            let response = coordinator
                .respond(TurnRequest::new(&user, &companion_id, session.clone(), line))
                .await;
            eprint!("\r     \r");

            println!();
            for (i, text) in response.reply.lines().enumerate() {
                if i == 0 {
                    println!("  {} > {text}", response.companion_name);
                } else {
                    println!("  {}   {text}", " ".repeat(response.companion_name.chars().count()));
                }
            }
            println!();
            print_debug(&response)?;
            print_level_changes(&mut events);
        }
        println!("  Goodbye!");
    }

    sessions.end(&session).await;
    sweeper.abort();
    Ok(())
}

fn print_debug(response: &TurnResponse) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(debug) = &response.debug {
        eprintln!("{}", serde_json::to_string_pretty(debug)?);
    }
    Ok(())
}

fn print_level_changes(events: &mut broadcast::Receiver<Arc<AffinityEvent>>) {
    while let Ok(event) = events.try_recv() {
        if let AffinityEvent::LevelChanged { old_level, new_level, .. } = &*event {
            let arrow = if new_level > old_level { "up" } else { "down" };
            println!(
                "  [level {arrow}: {} -> {}]\n",
                old_level.display_name(),
                new_level.display_name()
            );
        }
    }
}
