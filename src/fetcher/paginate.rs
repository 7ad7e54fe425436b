//! NextToken pagination

use super::collections::Listing;
use crate::aws::{AwsError, BackupClient};
use serde_json::Value;
use std::collections::HashSet;

/// Result of paginated fetch
#[derive(Debug, Default)]
pub struct Page {
    pub items: Vec<Value>,
    pub next_token: Option<String>,
}

/// Fetch one page of a listing
pub async fn fetch_page(
    client: &BackupClient,
    listing: &Listing,
    page_token: Option<&str>,
) -> Result<Page, AwsError> {
    let mut query: Vec<(&str, &str)> = listing.query();
    if let Some(token) = page_token {
        query.push(("nextToken", token));
    }

    let url = client.url(&listing.segments(), listing.trailing_slash(), &query);
    let response = client.get(&url).await?;

    let items = extract_items(&response, listing.response_path());
    let next_token = response
        .get("NextToken")
        .and_then(|v| v.as_str())
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    Ok(Page { items, next_token })
}

/// Fetch every page of a listing.
///
/// Stops if the service hands back a token it already gave us.
pub async fn fetch_all(client: &BackupClient, listing: &Listing) -> Result<Vec<Value>, AwsError> {
    let mut all_items = Vec::new();
    let mut page_token: Option<String> = None;
    let mut seen_tokens: HashSet<String> = HashSet::new();
    let mut pages = 0;

    loop {
        let page = fetch_page(client, listing, page_token.as_deref()).await?;
        pages += 1;
        all_items.extend(page.items);

        match page.next_token {
            Some(token) if seen_tokens.insert(token.clone()) => page_token = Some(token),
            Some(_) => {
                tracing::warn!("{} repeated a page token; stopping pagination", listing);
                break;
            }
            None => break,
        }
    }

    tracing::debug!("{}: {} items in {} pages", listing, all_items.len(), pages);
    Ok(all_items)
}

/// Fetch a single-object response such as one selection
pub async fn fetch_one(client: &BackupClient, listing: &Listing) -> Result<Option<Value>, AwsError> {
    let page = fetch_page(client, listing, None).await?;
    Ok(page.items.into_iter().next())
}

/// Extract items from response using a dot-separated path.
///
/// An array yields its elements, an object yields itself, anything else
/// (including a missing or null field) yields nothing.
pub fn extract_items(response: &Value, path: &str) -> Vec<Value> {
    let mut current = response;
    if !path.is_empty() {
        for part in path.split('.') {
            current = match current.get(part) {
                Some(v) => v,
                None => return vec![],
            };
        }
    }

    match current {
        Value::Array(items) => items.clone(),
        Value::Object(_) => vec![current.clone()],
        _ => vec![],
    }
}
