use groupshift_lifecycle::Located;
use serde_json::json;

use super::{print_json, Env};

pub async fn run(env: &Env, identifier: &str) -> anyhow::Result<()> {
    let located = env.lifecycle.find_owned_group(identifier).await?;
    let capacity = located.capacity();
    print_json(&json!({
        "owned": matches!(located, Located::Owned(_)),
        "name": capacity.name,
        "min": capacity.min,
        "max": capacity.max,
        "desired": capacity.desired,
    }))
}
