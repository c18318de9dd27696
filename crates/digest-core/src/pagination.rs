use std::collections::HashSet;
use std::hash::Hash;

/// Position of the next page, in whichever form the API exposes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    /// Zero-based index of the first item of the next page
    Offset(usize),
    /// Opaque continuation token
    Token(String),
}

/// One page of results plus the cursor of the following page, if any
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<PageCursor>,
}

/// Fetch successive pages until `max_results` unique items are collected or the
/// API reports no further pages.
///
/// `fetch_page` receives the cursor of the requested page (`None` for the first)
/// and the number of items still wanted, capped at `page_size`. Items whose key
/// was already seen on an earlier page are dropped and do not count toward the
/// cap. Order is preserved.
pub fn collect_pages<T, K, E, F, G>(
    max_results: usize,
    page_size: usize,
    key_of: G,
    mut fetch_page: F,
) -> Result<Vec<T>, E>
where
    K: Eq + Hash,
    F: FnMut(Option<&PageCursor>, usize) -> Result<Page<T>, E>,
    G: Fn(&T) -> K,
{
    let page_size = page_size.max(1);
    let mut all_results = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor: Option<PageCursor> = None;

    loop {
        let remaining = max_results.saturating_sub(all_results.len());
        if remaining == 0 {
            break;
        }

        let limit = std::cmp::min(page_size, remaining);
        let page = fetch_page(cursor.as_ref(), limit)?;

        if page.items.is_empty() {
            break;
        }

        let mut added = 0;
        for item in page.items {
            if all_results.len() >= max_results {
                break;
            }
            if seen.insert(key_of(&item)) {
                all_results.push(item);
                added += 1;
            }
        }

        match page.next {
            // A page that adds nothing while pointing back at itself would loop forever
            Some(next) if added > 0 || cursor.as_ref() != Some(&next) => cursor = Some(next),
            _ => break,
        }
    }

    Ok(all_results)
}
