use async_trait::async_trait;
use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;

use crate::config::{Config, TRADING_API_VERSION};
use crate::ebay::escape_xml;
use crate::error::ApiError;
use crate::fetch::{Page, PageSource};
use crate::model::{FeedbackEntry, ListingItem, Rating};

const LISTINGS_PAGE_SIZE: u32 = 200;
const LISTINGS_MAX_PAGES: u32 = 50;
const FEEDBACK_PAGE_SIZE: u32 = 25;
const FEEDBACK_MAX_PAGES: u32 = 10;

/// Thin transport for the Trading API's XML-over-POST calls. The user token
/// travels in the request body (Auth'n'Auth), not a header.
#[derive(Clone)]
pub struct TradingClient {
    http: Client,
    endpoint: String,
    auth_token: String,
    site_id: String,
}

impl TradingClient {
    pub fn new(http: Client, config: &Config, auth_token: String) -> Self {
        Self {
            http,
            endpoint: config.environment.trading_url().to_string(),
            auth_token,
            site_id: config.site_id.clone(),
        }
    }

    async fn call(&self, call_name: &str, body: &str) -> Result<String, ApiError> {
        let envelope = format!(
            r#"<?xml version="1.0" encoding="utf-8"?><{call}Request xmlns="urn:ebay:apis:eBLBaseComponents"><RequesterCredentials><eBayAuthToken>{token}</eBayAuthToken></RequesterCredentials><Version>{ver}</Version>{body}</{call}Request>"#,
            call = call_name,
            token = escape_xml(&self.auth_token),
            ver = TRADING_API_VERSION,
            body = body
        );

        let resp = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "text/xml")
            .header("X-EBAY-API-CALL-NAME", call_name)
            .header("X-EBAY-API-SITEID", &self.site_id)
            .header("X-EBAY-API-COMPATIBILITY-LEVEL", TRADING_API_VERSION)
            .body(envelope)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ApiError::upstream_status(status.as_u16(), &text));
        }
        Ok(text)
    }
}

// ---- response shapes ----

#[derive(Debug, Deserialize)]
struct ErrorBlock {
    #[serde(rename = "ShortMessage")]
    short_message: Option<String>,
    #[serde(rename = "LongMessage")]
    long_message: Option<String>,
}

impl ErrorBlock {
    fn message(&self) -> String {
        self.long_message
            .clone()
            .or_else(|| self.short_message.clone())
            .unwrap_or_else(|| "unknown eBay error".to_string())
    }
}

fn check_ack(ack: Option<&str>, errors: &[ErrorBlock]) -> Result<(), ApiError> {
    match ack {
        Some("Failure") | Some("PartialFailure") => {
            let msg = errors
                .first()
                .map(|e| e.message())
                .unwrap_or_else(|| "Ack=Failure with no error detail".to_string());
            Err(ApiError::UpstreamAck(msg))
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize)]
struct Amount {
    #[serde(rename = "@currencyID")]
    currency_id: Option<String>,
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SellingStatus {
    #[serde(rename = "CurrentPrice")]
    current_price: Option<Amount>,
}

#[derive(Debug, Deserialize)]
struct ListingDetails {
    #[serde(rename = "ViewItemURL")]
    view_item_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PictureDetails {
    #[serde(rename = "GalleryURL")]
    gallery_url: Option<String>,
    #[serde(rename = "PictureURL", default)]
    picture_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(rename = "ItemID")]
    item_id: Option<String>,
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "SellingStatus")]
    selling_status: Option<SellingStatus>,
    #[serde(rename = "ListingDetails")]
    listing_details: Option<ListingDetails>,
    #[serde(rename = "PictureDetails")]
    picture_details: Option<PictureDetails>,
    #[serde(rename = "ConditionDisplayName")]
    condition: Option<String>,
    #[serde(rename = "Location")]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemArray {
    #[serde(rename = "Item", default)]
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct PaginationResult {
    #[serde(rename = "TotalNumberOfPages")]
    total_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ActiveList {
    #[serde(rename = "ItemArray")]
    item_array: Option<ItemArray>,
    #[serde(rename = "PaginationResult")]
    pagination_result: Option<PaginationResult>,
    #[serde(rename = "HasMoreItems")]
    has_more_items: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct GetMyeBaySellingResponse {
    #[serde(rename = "Ack")]
    ack: Option<String>,
    #[serde(rename = "Errors", default)]
    errors: Vec<ErrorBlock>,
    #[serde(rename = "ActiveList")]
    active_list: Option<ActiveList>,
}

#[derive(Debug, Deserialize)]
struct FeedbackDetail {
    #[serde(rename = "CommentText")]
    comment_text: Option<String>,
    #[serde(rename = "CommentingUser")]
    commenting_user: Option<String>,
    #[serde(rename = "CommentTime")]
    comment_time: Option<String>,
    #[serde(rename = "CommentType")]
    comment_type: Option<String>,
    #[serde(rename = "ItemTitle")]
    item_title: Option<String>,
    #[serde(rename = "ItemID")]
    item_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeedbackDetailArray {
    #[serde(rename = "FeedbackDetail", default)]
    details: Vec<FeedbackDetail>,
}

#[derive(Debug, Deserialize)]
struct GetFeedbackResponse {
    #[serde(rename = "Ack")]
    ack: Option<String>,
    #[serde(rename = "Errors", default)]
    errors: Vec<ErrorBlock>,
    #[serde(rename = "FeedbackDetailArray")]
    detail_array: Option<FeedbackDetailArray>,
    #[serde(rename = "PaginationResult")]
    pagination_result: Option<PaginationResult>,
}

// ---- normalization ----

fn normalize_item(raw: RawItem) -> Option<ListingItem> {
    let id = raw.item_id.unwrap_or_default();
    let price = raw.selling_status.as_ref().and_then(|s| {
        s.current_price
            .as_ref()
            .and_then(|p| p.value.clone())
    });
    let currency = raw
        .selling_status
        .as_ref()
        .and_then(|s| s.current_price.as_ref().and_then(|p| p.currency_id.clone()));
    let url = raw
        .listing_details
        .and_then(|d| d.view_item_url)
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| ListingItem::item_url(&id));
    let image = raw.picture_details.and_then(|p| {
        p.gallery_url
            .filter(|u| !u.is_empty())
            .or_else(|| p.picture_urls.into_iter().next())
    });

    let item = ListingItem {
        id,
        title: raw.title.unwrap_or_default(),
        price: price.unwrap_or_default(),
        currency: currency.unwrap_or_else(|| "USD".to_string()),
        url,
        image,
        condition: raw.condition,
        location: raw.location,
    };
    item.is_displayable().then_some(item)
}

fn normalize_feedback(raw: FeedbackDetail) -> Option<FeedbackEntry> {
    let comment = raw.comment_text.unwrap_or_default();
    if comment.trim().is_empty() {
        return None;
    }
    let rating = Rating::from_comment_type(raw.comment_type.as_deref().unwrap_or(""))?;
    Some(FeedbackEntry {
        comment,
        user: raw.commenting_user.unwrap_or_default(),
        date: raw.comment_time.unwrap_or_default(),
        rating,
        item_title: raw.item_title.unwrap_or_default(),
        item_id: raw.item_id.unwrap_or_default(),
    })
}

fn parse_selling_page(xml: &str) -> Result<Page<ListingItem>, ApiError> {
    let resp: GetMyeBaySellingResponse =
        from_str(xml).map_err(|e| ApiError::Parse(e.to_string()))?;
    check_ack(resp.ack.as_deref(), &resp.errors)?;

    let active = resp.active_list;
    let (items, total_pages, has_more) = match active {
        Some(a) => (
            a.item_array.map(|ia| ia.items).unwrap_or_default(),
            a.pagination_result.and_then(|p| p.total_pages),
            a.has_more_items,
        ),
        None => (Vec::new(), None, None),
    };
    let raw_count = items.len();

    Ok(Page {
        records: items.into_iter().filter_map(normalize_item).collect(),
        raw_count,
        total_pages,
        has_more,
    })
}

fn parse_feedback_page(xml: &str) -> Result<Page<FeedbackEntry>, ApiError> {
    let resp: GetFeedbackResponse = from_str(xml).map_err(|e| ApiError::Parse(e.to_string()))?;
    check_ack(resp.ack.as_deref(), &resp.errors)?;

    let details = resp.detail_array.map(|d| d.details).unwrap_or_default();
    let raw_count = details.len();
    Ok(Page {
        records: details.into_iter().filter_map(normalize_feedback).collect(),
        raw_count,
        total_pages: resp.pagination_result.and_then(|p| p.total_pages),
        has_more: None,
    })
}

// ---- sources ----

/// Active listings via `GetMyeBaySelling` (the seller is whoever the user
/// token belongs to; keyword and seller overrides do not apply here).
pub struct TradingListings {
    client: TradingClient,
}

impl TradingListings {
    pub fn new(client: TradingClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for TradingListings {
    type Record = ListingItem;

    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<Page<ListingItem>, ApiError> {
        let body = format!(
            "<ActiveList><Include>true</Include><Pagination><EntriesPerPage>{per_page}</EntriesPerPage><PageNumber>{page}</PageNumber></Pagination></ActiveList><DetailLevel>ReturnAll</DetailLevel>"
        );
        let xml = self.client.call("GetMyeBaySelling", &body).await?;
        parse_selling_page(&xml)
    }

    fn page_size(&self) -> u32 {
        LISTINGS_PAGE_SIZE
    }

    fn max_pages(&self) -> u32 {
        LISTINGS_MAX_PAGES
    }
}

/// Seller feedback via `GetFeedback`, filtered to feedback received as
/// seller.
pub struct TradingFeedback {
    client: TradingClient,
}

impl TradingFeedback {
    pub fn new(client: TradingClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for TradingFeedback {
    type Record = FeedbackEntry;

    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<Page<FeedbackEntry>, ApiError> {
        let body = format!(
            "<Pagination><EntriesPerPage>{per_page}</EntriesPerPage><PageNumber>{page}</PageNumber></Pagination><DetailLevel>ReturnAll</DetailLevel><FeedbackType>FeedbackReceivedAsSeller</FeedbackType>"
        );
        let xml = self.client.call("GetFeedback", &body).await?;
        parse_feedback_page(&xml)
    }

    fn page_size(&self) -> u32 {
        FEEDBACK_PAGE_SIZE
    }

    fn max_pages(&self) -> u32 {
        FEEDBACK_MAX_PAGES
    }
}
