//! Continuation-token draining.

use std::future::Future;

use tracing::debug;

use crate::client::{Page, ProviderResult};

/// Upper bound on pages fetched by a single drain.
pub const MAX_PAGES: usize = 10_000;

/// Fetch pages until the provider stops returning a continuation token.
///
/// `fetch` receives the token of the previous page (`None` for the first
/// call). Any page error aborts the drain.
pub async fn drain<T, F, Fut>(mut fetch: F) -> ProviderResult<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = ProviderResult<Page<T>>>,
{
    let mut items = Vec::new();
    let mut token = None;
    for page_no in 0..MAX_PAGES {
        let page = fetch(token.take()).await?;
        items.extend(page.items);
        match page.next_token {
            Some(next) => token = Some(next),
            None => {
                debug!(pages = page_no + 1, items = items.len(), "pagination drained");
                return Ok(items);
            }
        }
    }
    Err(groupshift_core::ProviderError::client(format!(
        "pagination did not terminate after {MAX_PAGES} pages"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupshift_core::{ProviderError, Service};

    #[tokio::test]
    async fn drains_every_page_in_order() {
        let pages = vec![
            Page { items: vec![1, 2], next_token: Some("a".to_string()) },
            Page { items: vec![3], next_token: Some("b".to_string()) },
            Page { items: vec![4, 5], next_token: None },
        ];
        let mut seen_tokens = Vec::new();
        let mut iter = pages.into_iter();
        let items = drain(|token| {
            seen_tokens.push(token);
            let page = iter.next().unwrap();
            async move { Ok(page) }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            seen_tokens,
            vec![None, Some("a".to_string()), Some("b".to_string())]
        );
    }

    #[tokio::test]
    async fn page_error_aborts_drain() {
        let mut calls = 0;
        let result: ProviderResult<Vec<u32>> = drain(|_| {
            calls += 1;
            let call = calls;
            async move {
                if call == 2 {
                    Err(ProviderError::service(Service::AutoScaling, "Throttling", "slow down"))
                } else {
                    Ok(Page { items: vec![call], next_token: Some("more".to_string()) })
                }
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 2);
    }
}
