use super::Env;

pub async fn run(env: &Env, group: &str, key: &str, value: &str) -> anyhow::Result<()> {
    env.lifecycle.tag_group(group, key, value).await?;
    println!("tagged {group}: {key}={value}");
    Ok(())
}
