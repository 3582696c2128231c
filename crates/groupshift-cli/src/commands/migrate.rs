use serde_json::json;

use super::{print_json, Env};

pub async fn run(env: &Env, from: &str, to: &str) -> anyhow::Result<()> {
    let lifecycle = &env.lifecycle;
    let policies = lifecycle.export_policies(from).await?;
    let actions = lifecycle.export_scheduled_actions(from).await?;

    lifecycle.clear_policies(to).await?;
    lifecycle.clear_scheduled_actions(to).await?;

    let policies = lifecycle.import_policies(to, &policies).await?;
    let actions = lifecycle.import_scheduled_actions(to, &actions).await?;
    print_json(&json!({
        "policies": serde_json::to_value(&policies)?,
        "scheduled_actions": serde_json::to_value(&actions)?,
    }))
}
