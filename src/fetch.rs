use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiError;

/// One upstream page after normalization. `raw_count` is the number of
/// entries the upstream returned before undisplayable records were dropped;
/// the short-page termination check must see the raw figure.
#[derive(Debug)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub raw_count: usize,
    pub total_pages: Option<u32>,
    pub has_more: Option<bool>,
}

/// A paginated upstream API. Pages are numbered from 1 and fetched strictly
/// one at a time; implementations do not retry.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Record: Send;

    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<Page<Self::Record>, ApiError>;

    /// Raw first-page payload for the debug passthrough. Only the JSON
    /// sources (Finding, Browse) implement this.
    async fn raw_page(&self, _per_page: u32) -> Result<Option<Value>, ApiError> {
        Ok(None)
    }

    /// Largest page the upstream accepts.
    fn page_size(&self) -> u32 {
        200
    }

    /// Hard ceiling on page number, independent of upstream metadata.
    fn max_pages(&self) -> u32 {
        50
    }
}

/// Accumulates records across sequential pages until `target` admitted
/// records are collected or the upstream runs out. The three eBay API
/// families signal "no more pages" differently (explicit total, has-more
/// flag, or nothing), so every signal is honored and a hard page ceiling
/// guarantees termination even when the upstream metadata lies.
///
/// `admit` decides whether a record counts toward the target (feedback
/// dedup happens here); rejected records are discarded.
pub async fn collect_pages<S, F>(
    source: &S,
    target: usize,
    per_page: u32,
    max_pages: u32,
    mut admit: F,
) -> Result<Vec<S::Record>, ApiError>
where
    S: PageSource + ?Sized,
    F: FnMut(&S::Record) -> bool,
{
    let mut out = Vec::new();
    let mut page = 1u32;

    loop {
        let fetched = source.fetch_page(page, per_page).await?;
        let raw_count = fetched.raw_count;
        tracing::debug!(page, raw_count, "fetched upstream page");

        for record in fetched.records {
            if admit(&record) {
                out.push(record);
                if out.len() >= target {
                    return Ok(out);
                }
            }
        }

        if raw_count < per_page as usize {
            break;
        }
        if let Some(total) = fetched.total_pages {
            if page >= total {
                break;
            }
        }
        if fetched.has_more == Some(false) {
            break;
        }
        if page >= max_pages {
            tracing::warn!(max_pages, "page ceiling reached, stopping pagination");
            break;
        }
        page += 1;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedSource {
        pages: Vec<Page<u32>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(pages: Vec<Page<u32>>) -> Self {
            Self {
                pages,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        type Record = u32;

        async fn fetch_page(&self, page: u32, _per_page: u32) -> Result<Page<u32>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let idx = (page - 1) as usize;
            let scripted = self
                .pages
                .get(idx)
                .ok_or_else(|| ApiError::Parse(format!("unexpected request for page {page}")))?;
            Ok(Page {
                records: scripted.records.clone(),
                raw_count: scripted.raw_count,
                total_pages: scripted.total_pages,
                has_more: scripted.has_more,
            })
        }
    }

    fn page(records: Vec<u32>, total_pages: Option<u32>) -> Page<u32> {
        Page {
            raw_count: records.len(),
            records,
            total_pages,
            has_more: None,
        }
    }

    #[tokio::test]
    async fn stops_once_target_is_met_without_extra_pages() {
        let source = ScriptedSource::new(vec![
            page(vec![1, 2], Some(3)),
            page(vec![3, 4], Some(3)),
            page(vec![5, 6], Some(3)),
        ]);
        let out = collect_pages(&source, 5, 2, 10, |_| true).await.unwrap();
        assert_eq!(out, vec![1, 2, 3, 4, 5]);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn short_page_stops_pagination() {
        let source = ScriptedSource::new(vec![page(vec![1, 2], None), page(vec![3], None)]);
        let out = collect_pages(&source, 100, 2, 10, |_| true).await.unwrap();
        assert_eq!(out, vec![1, 2, 3]);
        // A third request would error; the short second page must end the loop.
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn declared_total_pages_is_honored() {
        let source = ScriptedSource::new(vec![page(vec![1, 2], Some(1))]);
        let out = collect_pages(&source, 100, 2, 10, |_| true).await.unwrap();
        assert_eq!(out, vec![1, 2]);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn has_more_false_stops_pagination() {
        let source = ScriptedSource::new(vec![Page {
            records: vec![1, 2],
            raw_count: 2,
            total_pages: None,
            has_more: Some(false),
        }]);
        let out = collect_pages(&source, 100, 2, 10, |_| true).await.unwrap();
        assert_eq!(out, vec![1, 2]);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn page_ceiling_guarantees_termination() {
        // Upstream claims more pages forever; the ceiling must cut it off.
        let pages: Vec<Page<u32>> = (0..20).map(|i| page(vec![i, i + 100], Some(999))).collect();
        let source = ScriptedSource::new(pages);
        let out = collect_pages(&source, 1000, 2, 3, |_| true).await.unwrap();
        assert_eq!(out.len(), 6);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn rejected_records_do_not_count_toward_target() {
        let source = ScriptedSource::new(vec![
            page(vec![1, 1], Some(2)),
            page(vec![1, 2], Some(2)),
        ]);
        let mut seen = HashSet::new();
        let out = collect_pages(&source, 2, 2, 10, |r| seen.insert(*r))
            .await
            .unwrap();
        assert_eq!(out, vec![1, 2]);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn raw_count_drives_short_page_check_not_survivors() {
        // Full raw page, but normalization dropped one record. Pagination
        // must continue to the declared second page.
        let source = ScriptedSource::new(vec![
            Page {
                records: vec![1],
                raw_count: 2,
                total_pages: Some(2),
                has_more: None,
            },
            page(vec![2], Some(2)),
        ]);
        let out = collect_pages(&source, 100, 2, 10, |_| true).await.unwrap();
        assert_eq!(out, vec![1, 2]);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn first_page_failure_aborts() {
        let source = ScriptedSource::new(vec![]);
        let err = collect_pages(&source, 5, 2, 10, |_| true).await.unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
    }
}
