//! Scripted coordinator replay against in-memory adapters.
//!
//! The script file is a JSON array of runtime messages in their wire shape
//! (the same `type`-tagged objects the extension sends), e.g.:
//!
//! ```json
//! [
//!   {"type": "openPrBuild", "pr": "200", "mainJs": "main.bb22.js"},
//!   {"type": "getPrForTab", "tabId": 1},
//!   {"type": "clearPrBuild", "tabId": 1}
//! ]
//! ```

use std::fs;

use pp_coordinator::{
    dispatch, Coordinator, MemoryRuleEngine, MemoryStore, MemoryTabHost, Request, StateStore,
};

pub fn run(script_path: &str) -> Result<(), String> {
    let text = fs::read_to_string(script_path)
        .map_err(|e| format!("Failed to read '{}': {}", script_path, e))?;
    let steps: Vec<Request> = serde_json::from_str(&text)
        .map_err(|e| format!("Invalid script in '{}': {}", script_path, e))?;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;
    runtime.block_on(run_async(steps))
}

async fn run_async(steps: Vec<Request>) -> Result<(), String> {
    let coordinator = Coordinator::new(MemoryStore::new(), MemoryRuleEngine::new(), MemoryTabHost::new());
    coordinator
        .startup()
        .await
        .map_err(|e| format!("Startup failed: {}", e))?;

    for (index, step) in steps.into_iter().enumerate() {
        let label = serde_json::to_string(&step)
            .map_err(|e| format!("Failed to serialize step {}: {}", index + 1, e))?;
        let response = dispatch(&coordinator, step).await;
        let outcome = serde_json::to_string(&response)
            .map_err(|e| format!("Failed to serialize response {}: {}", index + 1, e))?;
        println!("[{}] {} -> {}", index + 1, label, outcome);
    }

    let rules = coordinator.engine().active_rules();
    println!();
    println!("Active rules after script: {}", rules.len());
    for rule in &rules {
        println!(
            "  #{} tab {} {} -> {}",
            rule.id,
            rule.tab_id,
            rule.resource_kind.as_str(),
            rule.redirect_url
        );
    }

    let table = coordinator
        .store()
        .load_associations()
        .await
        .map_err(|e| format!("Failed to read final table: {}", e))?;
    println!("Tracked tabs: {}", table.len());
    for (tab_id, build) in table.iter() {
        println!("  tab {} -> PR {}", tab_id, build.pr_id);
    }

    Ok(())
}
