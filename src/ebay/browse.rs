use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::ebay::token::TokenManager;
use crate::error::ApiError;
use crate::fetch::{Page, PageSource};
use crate::model::ListingItem;

const PAGE_SIZE: u32 = 200;
const MAX_PAGES: u32 = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrowsePrice {
    value: Option<String>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrowseImage {
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrowseLocation {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemSummary {
    item_id: Option<String>,
    title: Option<String>,
    price: Option<BrowsePrice>,
    item_web_url: Option<String>,
    image: Option<BrowseImage>,
    condition: Option<String>,
    item_location: Option<BrowseLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    item_summaries: Vec<ItemSummary>,
    total: Option<u64>,
    next: Option<String>,
}

fn normalize_summary(raw: ItemSummary) -> Option<ListingItem> {
    let id = raw.item_id.unwrap_or_default();
    let (price, currency) = raw
        .price
        .map(|p| (p.value.unwrap_or_default(), p.currency))
        .unwrap_or_default();
    let item = ListingItem {
        url: raw
            .item_web_url
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| ListingItem::item_url(&id)),
        id,
        title: raw.title.unwrap_or_default(),
        price,
        currency: currency.unwrap_or_else(|| "USD".to_string()),
        image: raw.image.and_then(|i| i.image_url),
        condition: raw.condition,
        location: raw.item_location.and_then(|l| l.country),
    };
    item.is_displayable().then_some(item)
}

fn parse_page(body: Value, page: u32, per_page: u32) -> Result<Page<ListingItem>, ApiError> {
    let resp: SearchResponse =
        serde_json::from_value(body).map_err(|e| ApiError::Parse(e.to_string()))?;
    let raw_count = resp.item_summaries.len();
    let offset = (page - 1) as u64 * per_page as u64;
    let has_more = match (resp.next.as_ref(), resp.total) {
        (Some(_), _) => Some(true),
        (None, Some(total)) => Some((offset + raw_count as u64) < total),
        (None, None) => None,
    };
    Ok(Page {
        records: resp
            .item_summaries
            .into_iter()
            .filter_map(normalize_summary)
            .collect(),
        raw_count,
        total_pages: None,
        has_more,
    })
}

/// Listings via the Browse API's item summary search, paginated with
/// limit/offset and authenticated per request with a cached bearer token.
/// Seller scoping uses the `sellers` filter; keywords use `q`.
pub struct BrowseListings {
    http: Client,
    endpoint: String,
    tokens: Arc<TokenManager>,
    marketplace: String,
    query: Option<String>,
    seller: Option<String>,
}

impl BrowseListings {
    pub fn new(
        http: Client,
        endpoint: String,
        tokens: Arc<TokenManager>,
        marketplace: String,
        query: Option<String>,
        seller: Option<String>,
    ) -> Self {
        Self {
            http,
            endpoint,
            tokens,
            marketplace,
            query,
            seller,
        }
    }

    fn search_params(&self, page: u32, per_page: u32) -> Vec<(&'static str, String)> {
        let offset = (page - 1) * per_page;
        let mut params = vec![
            ("limit", per_page.to_string()),
            ("offset", offset.to_string()),
        ];
        if let Some(q) = self.query.as_deref().filter(|q| !q.is_empty()) {
            params.push(("q", q.to_string()));
        }
        if let Some(seller) = self.seller.as_deref().filter(|s| !s.is_empty()) {
            params.push(("filter", format!("sellers:{{{seller}}}")));
        }
        params
    }

    async fn get_page(&self, page: u32, per_page: u32) -> Result<Value, ApiError> {
        let token = self.tokens.access_token().await?;
        let resp = self
            .http
            .get(&self.endpoint)
            .bearer_auth(token)
            .header("X-EBAY-C-MARKETPLACE-ID", &self.marketplace)
            .query(&self.search_params(page, per_page))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::upstream_status(status.as_u16(), &body));
        }
        resp.json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}

#[async_trait]
impl PageSource for BrowseListings {
    type Record = ListingItem;

    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<Page<ListingItem>, ApiError> {
        let body = self.get_page(page, per_page).await?;
        parse_page(body, page, per_page)
    }

    async fn raw_page(&self, per_page: u32) -> Result<Option<Value>, ApiError> {
        Ok(Some(self.get_page(1, per_page).await?))
    }

    fn page_size(&self) -> u32 {
        PAGE_SIZE
    }

    fn max_pages(&self) -> u32 {
        MAX_PAGES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summaries_normalize_into_listing_items() {
        let body = json!({
            "itemSummaries": [
                {
                    "itemId": "v1|2001|0",
                    "title": "Victorian inkwell",
                    "price": { "value": "45.00", "currency": "USD" },
                    "itemWebUrl": "https://www.ebay.com/itm/2001",
                    "image": { "imageUrl": "https://i.ebayimg.com/2001.jpg" },
                    "condition": "Used",
                    "itemLocation": { "country": "GB" }
                },
                { "itemId": "v1|2002|0", "title": "" }
            ],
            "total": 2,
            "offset": 0,
            "limit": 200
        });
        let page = parse_page(body, 1, 200).unwrap();
        assert_eq!(page.raw_count, 2);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.has_more, Some(false));

        let inkwell = &page.records[0];
        assert_eq!(inkwell.price, "45.00");
        assert_eq!(inkwell.condition.as_deref(), Some("Used"));
        assert_eq!(inkwell.location.as_deref(), Some("GB"));
    }

    #[test]
    fn next_link_signals_more_pages() {
        let body = json!({
            "itemSummaries": [
                { "itemId": "v1|2001|0", "title": "Inkwell" }
            ],
            "total": 500,
            "next": "https://api.ebay.com/buy/browse/v1/item_summary/search?offset=200"
        });
        let page = parse_page(body, 1, 200).unwrap();
        assert_eq!(page.has_more, Some(true));
    }

    #[test]
    fn search_params_carry_keywords_and_seller_filter() {
        let tokens = Arc::new(TokenManager::new(
            Client::new(),
            "http://127.0.0.1:9/token".to_string(),
            "client".to_string(),
            "secret".to_string(),
        ));
        let source = BrowseListings::new(
            Client::new(),
            "http://127.0.0.1:9/search".to_string(),
            tokens,
            "EBAY_US".to_string(),
            Some("vintage compass".to_string()),
            Some("curio_shop".to_string()),
        );
        let params = source.search_params(2, 200);
        assert!(params.contains(&("offset", "200".to_string())));
        assert!(params.contains(&("q", "vintage compass".to_string())));
        assert!(params.contains(&("filter", "sellers:{curio_shop}".to_string())));

        let unscoped = BrowseListings::new(
            Client::new(),
            String::new(),
            source.tokens.clone(),
            "EBAY_US".to_string(),
            None,
            None,
        );
        let params = unscoped.search_params(1, 200);
        assert!(!params.iter().any(|(k, _)| *k == "q" || *k == "filter"));
    }

    #[test]
    fn missing_summaries_is_an_empty_page() {
        let page = parse_page(json!({ "total": 0 }), 1, 200).unwrap();
        assert_eq!(page.raw_count, 0);
        assert!(page.records.is_empty());
        assert_eq!(page.has_more, Some(false));
    }
}
