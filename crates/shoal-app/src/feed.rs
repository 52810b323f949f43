//! Paginated record-feed plumbing. The feed itself (HTTP, database, cache)
//! is an external collaborator; this module only defines the page shape and
//! pumps batches into the simulation worker.

use anyhow::Result;
use shoal_core::TroutRecord;
use tracing::debug;

use crate::bus::SimRequest;
use crate::worker::SimHandle;

/// One page of agent records from the external feed.
#[derive(Debug, Clone, PartialEq)]
pub struct TroutPage {
    pub records: Vec<TroutRecord>,
    /// Cursor for the next page, or `None` on the last page.
    pub next_cursor: Option<String>,
    /// Total records the feed will eventually deliver.
    pub total: usize,
}

/// Source of paginated agent records.
pub trait TroutFeed {
    /// Fetch the page at `cursor` (`None` for the first page).
    fn page(&mut self, cursor: Option<&str>) -> Result<TroutPage>;
}

/// Deterministic in-memory feed backing the demo binary and tests.
pub struct InMemoryFeed {
    records: Vec<TroutRecord>,
    page_size: usize,
}

impl InMemoryFeed {
    /// Wrap a record list, serving it `page_size` records at a time.
    #[must_use]
    pub fn new(records: Vec<TroutRecord>, page_size: usize) -> Self {
        Self {
            records,
            page_size: page_size.max(1),
        }
    }
}

impl TroutFeed for InMemoryFeed {
    fn page(&mut self, cursor: Option<&str>) -> Result<TroutPage> {
        let offset: usize = match cursor {
            Some(cursor) => cursor.parse()?,
            None => 0,
        };
        let end = (offset + self.page_size).min(self.records.len());
        let records = self.records.get(offset..end).unwrap_or_default().to_vec();
        let next_cursor = (end < self.records.len()).then(|| end.to_string());
        Ok(TroutPage {
            records,
            next_cursor,
            total: self.records.len(),
        })
    }
}

/// Drain every page of the feed into the worker as idempotent `Load`
/// batches. Returns the number of records pumped.
pub fn load_all(feed: &mut dyn TroutFeed, handle: &SimHandle) -> Result<usize> {
    let mut cursor: Option<String> = None;
    let mut pumped = 0_usize;
    loop {
        let page = feed.page(cursor.as_deref())?;
        pumped += page.records.len();
        debug!(
            batch = page.records.len(),
            total = page.total,
            "pumping feed page into simulation"
        );
        if !page.records.is_empty() {
            handle.send(SimRequest::Load(page.records));
        }
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    Ok(pumped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_core::Tier;

    fn records(count: usize) -> Vec<TroutRecord> {
        (0..count)
            .map(|i| TroutRecord::new(format!("feed-{i}"), Tier::Fry, 1.0))
            .collect()
    }

    #[test]
    fn pages_cover_every_record_exactly_once() {
        let mut feed = InMemoryFeed::new(records(25), 10);

        let first = feed.page(None).expect("first page");
        assert_eq!(first.records.len(), 10);
        assert_eq!(first.total, 25);
        let second = feed
            .page(first.next_cursor.as_deref())
            .expect("second page");
        assert_eq!(second.records.len(), 10);
        let third = feed
            .page(second.next_cursor.as_deref())
            .expect("third page");
        assert_eq!(third.records.len(), 5);
        assert!(third.next_cursor.is_none());

        let mut ids: Vec<String> = [first.records, second.records, third.records]
            .concat()
            .into_iter()
            .map(|r| r.id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 25);
    }

    #[test]
    fn empty_feed_yields_one_terminal_page() {
        let mut feed = InMemoryFeed::new(Vec::new(), 10);
        let page = feed.page(None).expect("page");
        assert!(page.records.is_empty());
        assert!(page.next_cursor.is_none());
        assert_eq!(page.total, 0);
    }

    #[test]
    fn malformed_cursor_is_an_error() {
        let mut feed = InMemoryFeed::new(records(3), 10);
        assert!(feed.page(Some("not-a-number")).is_err());
    }
}
