//! Owned-group lookup.
//!
//! A deployment unit owns every group tagged with its identifier. Of those,
//! the newest group that still has desired capacity is the one currently
//! serving; its bounds seed the next group's sizing.

use groupshift_client::{drain, DescribeGroups};
use groupshift_core::{GroupCapacity, GroupResult, ManagedGroup};
use tracing::{debug, info};

use crate::context::OpContext;

/// Result of an owned-group lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Located {
    /// The newest owned group with desired capacity above zero.
    Owned(ManagedGroup),
    /// Nothing owned is serving; the configured defaults apply.
    Defaults(GroupCapacity),
}

impl Located {
    pub fn capacity(&self) -> GroupCapacity {
        match self {
            Self::Owned(group) => group.capacity(),
            Self::Defaults(defaults) => defaults.clone(),
        }
    }

    pub fn group(&self) -> Option<&ManagedGroup> {
        match self {
            Self::Owned(group) => Some(group),
            Self::Defaults(_) => None,
        }
    }
}

/// The newest owned group with desired capacity above zero.
///
/// Ties on `created_time` resolve to the group listed last by the provider.
pub fn select_owned<'a>(
    groups: &'a [ManagedGroup],
    tag_key: &str,
    identifier: &str,
) -> Option<&'a ManagedGroup> {
    groups
        .iter()
        .filter(|g| g.is_owned_by(tag_key, identifier))
        .filter(|g| g.desired_capacity > 0)
        .max_by_key(|g| g.created_time)
}

/// Every group in the region, across all pages.
pub async fn list_all_groups(ctx: &OpContext<'_>) -> GroupResult<Vec<ManagedGroup>> {
    let page_size = ctx.config.describe_page_size;
    let groups = drain(|next_token| {
        ctx.track("Describe Groups");
        let request = DescribeGroups {
            names: Vec::new(),
            next_token,
            max_records: Some(page_size),
        };
        async move { ctx.client.describe_groups(&request).await }
    })
    .await?;
    debug!(count = groups.len(), "listed groups");
    Ok(groups)
}

/// Snapshot of a single group, or `None` when the provider does not know it.
pub async fn describe_group(ctx: &OpContext<'_>, name: &str) -> GroupResult<Option<ManagedGroup>> {
    ctx.track("Describe Groups");
    let page = ctx.client.describe_groups(&DescribeGroups::named(name)).await?;
    Ok(page.items.into_iter().find(|g| g.name == name))
}

pub async fn find_owned_group(ctx: &OpContext<'_>, identifier: &str) -> GroupResult<Located> {
    let groups = list_all_groups(ctx).await?;
    match select_owned(&groups, &ctx.config.ownership_tag_key, identifier) {
        Some(group) => {
            info!(
                identifier,
                group = %group.name,
                desired = group.desired_capacity,
                "found owned group"
            );
            Ok(Located::Owned(group.clone()))
        }
        None => {
            info!(identifier, "no owned group with capacity, using defaults");
            Ok(Located::Defaults(ctx.config.defaults.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    const KEY: &str = "groupshift:owner";

    fn group(name: &str, owner: Option<&str>, desired: u32, created: u64) -> ManagedGroup {
        let mut tags = BTreeMap::new();
        if let Some(owner) = owner {
            tags.insert(KEY.to_string(), owner.to_string());
        }
        ManagedGroup {
            name: name.to_string(),
            min_size: 0,
            max_size: 10,
            desired_capacity: desired,
            launch_configuration_name: None,
            created_time: created,
            tags,
            instances: Vec::new(),
            load_balancer_names: Vec::new(),
            target_group_arns: Vec::new(),
        }
    }

    #[test]
    fn newest_owned_group_with_capacity_wins() {
        let groups = vec![
            group("web__1", Some("app-1/env-1/infra-1"), 3, 100),
            group("web__2", Some("app-1/env-1/infra-1"), 2, 300),
            group("web__3", Some("app-1/env-1/infra-1"), 0, 500),
            group("other", Some("app-2/env-1/infra-1"), 5, 900),
            group("untagged", None, 5, 1000),
        ];
        let found = select_owned(&groups, KEY, "app-1/env-1/infra-1").unwrap();
        assert_eq!(found.name, "web__2");
    }

    #[test]
    fn identifier_matches_as_prefix() {
        let groups = vec![group("web__1", Some("app-1/env-1/infra-1/extra"), 1, 1)];
        assert!(select_owned(&groups, KEY, "app-1/env-1").is_some());
        assert!(select_owned(&groups, KEY, "app-1/env-2").is_none());
    }

    #[test]
    fn equal_created_time_prefers_last_listed() {
        let groups = vec![
            group("first", Some("unit"), 1, 7),
            group("second", Some("unit"), 1, 7),
        ];
        assert_eq!(select_owned(&groups, KEY, "unit").unwrap().name, "second");
    }

    #[test]
    fn defaults_expose_capacity() {
        let defaults = GroupCapacity {
            name: String::new(),
            min: 0,
            max: 10,
            desired: 6,
        };
        let located = Located::Defaults(defaults.clone());
        assert!(located.group().is_none());
        assert_eq!(located.capacity(), defaults);
    }
}
