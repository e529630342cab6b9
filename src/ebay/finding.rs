use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::ebay::{first, path_str};
use crate::error::ApiError;
use crate::fetch::{Page, PageSource};
use crate::model::ListingItem;

const PAGE_SIZE: u32 = 100;
const MAX_PAGES: u32 = 50;
const OPERATION: &str = "findItemsAdvanced";
const SERVICE_VERSION: &str = "1.13.0";

/// Listings via the Finding API: GET with app-id auth in the query string,
/// JSON response with every field wrapped in a one-element array.
pub struct FindingListings {
    http: Client,
    endpoint: String,
    app_id: String,
    keywords: Option<String>,
    seller: Option<String>,
}

impl FindingListings {
    pub fn new(
        http: Client,
        endpoint: String,
        app_id: String,
        keywords: Option<String>,
        seller: Option<String>,
    ) -> Self {
        Self {
            http,
            endpoint,
            app_id,
            keywords,
            seller,
        }
    }

    async fn get_page(&self, page: u32, per_page: u32) -> Result<Value, ApiError> {
        let mut params: Vec<(&str, String)> = vec![
            ("OPERATION-NAME", OPERATION.to_string()),
            ("SERVICE-VERSION", SERVICE_VERSION.to_string()),
            ("SECURITY-APPNAME", self.app_id.clone()),
            ("RESPONSE-DATA-FORMAT", "JSON".to_string()),
            ("REST-PAYLOAD", String::new()),
            ("paginationInput.entriesPerPage", per_page.to_string()),
            ("paginationInput.pageNumber", page.to_string()),
        ];
        if let Some(keywords) = &self.keywords {
            params.push(("keywords", keywords.clone()));
        }
        if let Some(seller) = &self.seller {
            params.push(("itemFilter(0).name", "Seller".to_string()));
            params.push(("itemFilter(0).value", seller.clone()));
        }

        let resp = self
            .http
            .get(&self.endpoint)
            .query(&params)
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

fn normalize_item(raw: &Value) -> Option<ListingItem> {
    let id = path_str(raw, &["itemId"]);
    let null = Value::Null;
    let price_node = first(
        first(raw.get("sellingStatus").unwrap_or(&null))
            .get("currentPrice")
            .unwrap_or(&null),
    );
    let price = price_node
        .get("__value__")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let currency = price_node
        .get("@currencyId")
        .and_then(|v| v.as_str())
        .unwrap_or("USD")
        .to_string();
    let url = {
        let u = path_str(raw, &["viewItemURL"]);
        if u.is_empty() { ListingItem::item_url(&id) } else { u }
    };
    let image = {
        let g = path_str(raw, &["galleryURL"]);
        if g.is_empty() { None } else { Some(g) }
    };
    let condition = {
        let c = path_str(raw, &["condition", "conditionDisplayName"]);
        if c.is_empty() { None } else { Some(c) }
    };
    let location = {
        let l = path_str(raw, &["location"]);
        if l.is_empty() { None } else { Some(l) }
    };

    let item = ListingItem {
        id,
        title: path_str(raw, &["title"]),
        price,
        currency,
        url,
        image,
        condition,
        location,
    };
    item.is_displayable().then_some(item)
}

fn parse_page(body: &Value) -> Result<Page<ListingItem>, ApiError> {
    // API-level failures come back inside a 200 response.
    if let Some(err) = body.get("errorMessage") {
        let msg = path_str(err, &["error", "message"]);
        return Err(ApiError::UpstreamAck(if msg.is_empty() {
            "Finding API returned an error block".to_string()
        } else {
            msg
        }));
    }

    let resp = first(
        body.get(&format!("{OPERATION}Response"))
            .ok_or_else(|| ApiError::Parse("missing findItemsAdvancedResponse".to_string()))?,
    );

    let ack = path_str(resp, &["ack"]);
    if !ack.is_empty() && ack != "Success" && ack != "Warning" {
        let msg = path_str(resp, &["errorMessage", "error", "message"]);
        return Err(ApiError::UpstreamAck(if msg.is_empty() { ack } else { msg }));
    }

    let items: Vec<Value> = first(resp.get("searchResult").unwrap_or(&Value::Null))
        .get("item")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    let raw_count = items.len();

    let total_pages = path_str(resp, &["paginationOutput", "totalPages"])
        .parse::<u32>()
        .ok();

    Ok(Page {
        records: items.iter().filter_map(normalize_item).collect(),
        raw_count,
        total_pages,
        has_more: None,
    })
}

#[async_trait]
impl PageSource for FindingListings {
    type Record = ListingItem;

    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<Page<ListingItem>, ApiError> {
        let body = self.get_page(page, per_page).await?;
        parse_page(&body)
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
