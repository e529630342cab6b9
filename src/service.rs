use std::collections::HashSet;

use crate::cache::ListingCache;
use crate::error::ApiError;
use crate::fetch::{PageSource, collect_pages};
use crate::model::{FeedbackEntry, ListingItem};

pub const LISTINGS_MAX: usize = 600;
pub const LISTINGS_DEFAULT: usize = 24;
pub const FEEDBACK_MAX: usize = 50;
pub const FEEDBACK_DEFAULT: usize = 30;

#[derive(Debug, Clone, Default)]
pub struct ListingRequest {
    pub limit: usize,
    pub force: bool,
    /// Set when the request overrides the configured keywords or seller;
    /// such requests bypass the single-slot cache entirely.
    pub custom_query: bool,
}

/// How a listings response was produced, in decreasing order of freshness.
#[derive(Debug, PartialEq)]
pub enum ListingOutcome {
    Fresh(Vec<ListingItem>),
    Cached(Vec<ListingItem>),
    Stale(Vec<ListingItem>),
}

impl ListingOutcome {
    pub fn products(&self) -> &[ListingItem] {
        match self {
            ListingOutcome::Fresh(p) | ListingOutcome::Cached(p) | ListingOutcome::Stale(p) => p,
        }
    }
}

/// Read-through listings fetch with unconditional stale-on-error fallback.
/// The source is passed per call so each strategy (and each test) can supply
/// its own.
pub async fn fetch_listings<S>(
    source: &S,
    cache: &ListingCache,
    req: &ListingRequest,
) -> Result<ListingOutcome, ApiError>
where
    S: PageSource<Record = ListingItem> + ?Sized,
{
    let use_cache = !req.custom_query;

    if use_cache && !req.force {
        if let Some(payload) = cache.load_fresh() {
            // A payload that stopped at a smaller limit cannot satisfy a
            // larger request; treat it as a miss so the slot refills.
            if payload.complete || payload.products.len() >= req.limit {
                tracing::info!(count = payload.products.len(), "serving cached listings");
                let mut products = payload.products;
                products.truncate(req.limit);
                return Ok(ListingOutcome::Cached(products));
            }
        }
    }

    let per_page = source.page_size().min(req.limit.max(1) as u32);
    match collect_pages(source, req.limit, per_page, source.max_pages(), |_| true).await {
        Ok(products) => {
            if use_cache {
                // Fewer products than asked for means the upstream ran dry.
                cache.store(&products, products.len() < req.limit);
            }
            Ok(ListingOutcome::Fresh(products))
        }
        Err(err) if use_cache => match cache.load_any() {
            Some(payload) => {
                tracing::warn!(%err, "live fetch failed, serving stale cache");
                let mut products = payload.products;
                products.truncate(req.limit);
                Ok(ListingOutcome::Stale(products))
            }
            None => Err(err),
        },
        Err(err) => Err(err),
    }
}

/// Accumulates distinct feedback entries in page order. Duplicates (by the
/// (comment, user, date) triple) do not count toward the limit.
pub async fn fetch_feedback<S>(source: &S, limit: usize) -> Result<Vec<FeedbackEntry>, ApiError>
where
    S: PageSource<Record = FeedbackEntry> + ?Sized,
{
    let per_page = source.page_size().min(limit.max(1) as u32);
    let mut seen = HashSet::new();
    collect_pages(source, limit, per_page, source.max_pages(), |entry| {
        seen.insert(entry.dedup_key())
    })
    .await
}

pub fn clamp_limit(raw: Option<&str>, default: usize, max: usize) -> usize {
    match raw {
        None | Some("") => default,
        Some(s) if s.eq_ignore_ascii_case("all") => max,
        Some(s) => s.parse::<usize>().map_or(default, |n| n.clamp(1, max)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_parses_clamps_and_defaults() {
        assert_eq!(clamp_limit(None, 24, 600), 24);
        assert_eq!(clamp_limit(Some(""), 24, 600), 24);
        assert_eq!(clamp_limit(Some("10"), 24, 600), 10);
        assert_eq!(clamp_limit(Some("9999"), 24, 600), 600);
        assert_eq!(clamp_limit(Some("0"), 24, 600), 1);
        assert_eq!(clamp_limit(Some("all"), 24, 600), 600);
        assert_eq!(clamp_limit(Some("junk"), 24, 600), 24);
    }
}
