use tracing::warn;

use super::{print_json, Env};

pub async fn run(env: &Env, names: &[String]) -> anyhow::Result<()> {
    let mut groups = Vec::with_capacity(names.len());
    for name in names {
        match env.lifecycle.get_group(name).await? {
            Some(group) => groups.push(group),
            None => warn!(group = %name, "group not found, skipping"),
        }
    }
    let report = env.lifecycle.delete_groups(&groups).await?;
    print_json(&serde_json::to_value(&report)?)
}
