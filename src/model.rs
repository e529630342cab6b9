use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One active listing, shaped for the storefront carousel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingItem {
    pub id: String,
    pub title: String,
    pub price: String,
    pub currency: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ListingItem {
    /// eBay listings without a title are not displayable; callers drop them.
    pub fn is_displayable(&self) -> bool {
        !self.title.trim().is_empty()
    }

    pub fn item_url(id: &str) -> String {
        format!("https://www.ebay.com/itm/{id}")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Rating {
    Positive,
    Neutral,
    Negative,
}

impl Rating {
    /// Maps the Trading API `CommentType` tag. Withdrawn and mutually
    /// withdrawn feedback has no displayable rating and yields `None`.
    pub fn from_comment_type(tag: &str) -> Option<Self> {
        match tag {
            "Positive" => Some(Rating::Positive),
            "Neutral" => Some(Rating::Neutral),
            "Negative" => Some(Rating::Negative),
            _ => None,
        }
    }
}

/// One piece of seller feedback. Field names on the wire match what the
/// storefront front-end expects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackEntry {
    pub comment: String,
    pub user: String,
    pub date: String,
    pub rating: Rating,
    #[serde(rename = "itemTitle")]
    pub item_title: String,
    #[serde(rename = "itemID")]
    pub item_id: String,
}

impl FeedbackEntry {
    /// The upstream API exposes no stable feedback id, so the
    /// (comment, user, date) triple serves as the dedup identity.
    pub fn dedup_key(&self) -> (String, String, String) {
        (self.comment.clone(), self.user.clone(), self.date.clone())
    }
}

/// The single persisted listings payload written by successful fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachePayload {
    pub products: Vec<ListingItem>,
    #[serde(rename = "cachedAt")]
    pub cached_at: DateTime<Utc>,
    /// True when the stored fetch exhausted the upstream rather than
    /// stopping at its requested limit. An incomplete payload cannot
    /// satisfy a request for more products than it holds.
    #[serde(default)]
    pub complete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_maps_known_comment_types() {
        assert_eq!(Rating::from_comment_type("Positive"), Some(Rating::Positive));
        assert_eq!(Rating::from_comment_type("Neutral"), Some(Rating::Neutral));
        assert_eq!(Rating::from_comment_type("Negative"), Some(Rating::Negative));
        assert_eq!(Rating::from_comment_type("Withdrawn"), None);
        assert_eq!(Rating::from_comment_type(""), None);
    }

    #[test]
    fn blank_title_is_not_displayable() {
        let mut item = ListingItem {
            id: "123".into(),
            title: "  ".into(),
            price: "1.00".into(),
            currency: "USD".into(),
            url: ListingItem::item_url("123"),
            image: None,
            condition: None,
            location: None,
        };
        assert!(!item.is_displayable());
        item.title = "Vintage camera".into();
        assert!(item.is_displayable());
    }

    #[test]
    fn feedback_serializes_front_end_field_names() {
        let entry = FeedbackEntry {
            comment: "Great seller".into(),
            user: "buyer1".into(),
            date: "2025-06-01T12:00:00.000Z".into(),
            rating: Rating::Positive,
            item_title: "Old map".into(),
            item_id: "456".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["itemTitle"], "Old map");
        assert_eq!(json["itemID"], "456");
        assert_eq!(json["rating"], "Positive");
    }
}
