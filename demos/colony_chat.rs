//! Colony narrator demo.
//!
//! Loads `rimagent.toml` if present, picks a provider through the factory and
//! falls back to a canned offline provider when none is reachable.
//!
//! ```sh
//! DEEPSEEK_API_KEY=... cargo run --example colony_chat -- "how is the colony doing?"
//! ```

use std::sync::Arc;

use futures::{FutureExt, future::BoxFuture};
use parking_lot::Mutex;
use rimagent::prelude::*;
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Default, Serialize)]
struct ColonySnapshot {
    tick: u64,
    colonists: Vec<Colonist>,
    food: u32,
}

#[derive(Debug, Clone, Serialize)]
struct Colonist {
    name: String,
    mood: f32,
    job: String,
}

#[rimagent::tool(
    name = "roll_event",
    description = "Roll a d20 storyteller event against a difficulty",
    params(difficulty = "Target number, default 10")
)]
fn roll_event(difficulty: Option<u32>) -> String {
    let roll = 14;
    if roll >= difficulty.unwrap_or(10) {
        format!("rolled {}: a trader caravan arrives", roll)
    } else {
        format!("rolled {}: a cold snap hits", roll)
    }
}

/// Stand-in used when no real backend is reachable.
struct Offline {
    replies: Mutex<Vec<&'static str>>,
}

impl Provider for Offline {
    fn name(&self) -> &str {
        "offline"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn send<'a>(&'a self, _request: &'a SendRequest) -> BoxFuture<'a, LLMResult<String>> {
        let reply = self.replies.lock().pop().unwrap_or("[ANSWER]: The colony endures.");
        async move { Ok(reply.to_string()) }.boxed()
    }

    fn test_connection(&self) -> BoxFuture<'_, bool> {
        async { true }.boxed()
    }
}

fn offline_provider() -> Arc<dyn Provider> {
    // popped from the back
    Arc::new(Offline {
        replies: Mutex::new(vec![
            "[ANSWER]: Ava and Bram are holding up. Food will last about a week, and a caravan is on its way.",
            "[THOUGHT]: Let me see what the storyteller has planned.\n[ACTION]: roll_event(difficulty=12)",
            "[THOUGHT]: I should look at the colonists first.\n[ACTION]: colony_status()",
        ]),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match RuntimeConfig::load("rimagent.toml") {
        Ok(config) => config,
        Err(rimagent::config::ConfigError::MissingConfig(_)) => RuntimeConfig::default(),
        Err(err) => return Err(err.into()),
    };
    rimagent::logging::init_from_config(&config.logging)?;

    let factory = ProviderFactory::from_settings(&config.providers);
    let provider = match factory.selected() {
        Ok(provider) => provider,
        Err(err) => {
            tracing::warn!(%err, "no provider reachable, using the offline narrator");
            offline_provider()
        }
    };

    // the simulation thread would publish a fresh snapshot every tick
    let colony = Arc::new(SnapshotCell::new(ColonySnapshot::default()));
    colony.publish(ColonySnapshot {
        tick: 36_000,
        colonists: vec![
            Colonist { name: "Ava".into(), mood: 0.72, job: "cooking".into() },
            Colonist { name: "Bram".into(), mood: 0.41, job: "mining".into() },
        ],
        food: 140,
    });

    let tools = Arc::new(ToolRegistry::new());
    tools.register_tool(SnapshotTool::new(
        "colony_status",
        "Colonists, their mood and jobs, and food stores",
        colony.clone(),
        |snapshot: &ColonySnapshot, _| Ok(serde_json::to_value(snapshot)?),
    ));
    tools.register_tool(
        FnTool::new("weather", "Current weather over the colony map", Vec::new(), |params| async move {
            let zone = params.get_str("zone").unwrap_or("home").to_string();
            Ok(json!({ "zone": zone, "weather": "light snow", "temperature_c": -4 }))
        })
        .with_param(ArgSchema::new("zone", "string", "Map zone, default home").optional()),
    );
    tools.register_tool(RollEventTool);

    let gate = Arc::new(ConcurrencyManager::from_config(&config.concurrency));
    let agent = Agent::new("narrator", provider, tools)
        .with_config(config.agent.clone())
        .with_gate(gate.clone());

    let question = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let question = if question.trim().is_empty() {
        "How is the colony doing?".to_string()
    } else {
        question
    };

    match agent.execute(&question).await {
        Ok(result) => {
            println!("{}", result.answer);
            for action in &result.actions {
                println!("  {} -> {} (ok: {})", action.tool_name, action.result, action.success);
            }
            println!("iterations: {}", result.iterations);
        }
        Err(err) => eprintln!("narrator failed [{}]: {}", err.code(), err),
    }

    println!("{}", agent.debug_info());
    println!("{}", gate.stats());
    Ok(())
}
