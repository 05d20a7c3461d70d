use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Process-unique link identifier. Never reused, even after deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(pub u64);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LinkId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(LinkId)
    }
}

/// A single recorded visit of a short link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    pub timestamp: DateTime<Utc>,
    pub source_label: String,
    pub location_label: String,
    pub client_signature: String,
}

/// A shortcode bound to its original URL, expiry and click history.
///
/// Everything except the click history is fixed at creation. Clicks are
/// only appended through [`crate::clicks::ClickRecorder`], which keeps
/// `click_count` equal to the number of recorded events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortLink {
    id: LinkId,
    original_url: String,
    shortcode: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    click_count: u64,
    clicks: Vec<ClickEvent>,
}

impl ShortLink {
    pub(crate) fn new(
        id: LinkId,
        original_url: String,
        shortcode: String,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            original_url,
            shortcode,
            created_at,
            expires_at,
            click_count: 0,
            clicks: Vec::new(),
        }
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    pub fn original_url(&self) -> &str {
        &self.original_url
    }

    pub fn shortcode(&self) -> &str {
        &self.shortcode
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn click_count(&self) -> u64 {
        self.click_count
    }

    /// Click history in chronological (insertion) order
    pub fn clicks(&self) -> &[ClickEvent] {
        &self.clicks
    }

    /// A link is expired once `now` is strictly past its expiry instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub(crate) fn record_click(&mut self, event: ClickEvent) {
        self.clicks.push(event);
        self.click_count += 1;
    }
}

/// Validity as submitted. Anything that is not a whole number of minutes is
/// kept as-is so it can be reported against its entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValidityInput {
    Minutes(i64),
    Raw(serde_json::Value),
}

impl ValidityInput {
    /// Whole minutes, accepting integer strings the way a form field sends them
    pub fn minutes(&self) -> Option<i64> {
        match self {
            ValidityInput::Minutes(minutes) => Some(*minutes),
            ValidityInput::Raw(serde_json::Value::String(raw)) => raw.trim().parse().ok(),
            ValidityInput::Raw(value) => value.as_i64(),
        }
    }

    fn is_empty(&self) -> bool {
        matches!(self, ValidityInput::Raw(serde_json::Value::String(raw)) if raw.trim().is_empty())
    }
}

impl From<i64> for ValidityInput {
    fn from(minutes: i64) -> Self {
        ValidityInput::Minutes(minutes)
    }
}

/// One submitted form row. Empty strings are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkEntryRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_shortcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity_minutes: Option<ValidityInput>,
}

impl LinkEntryRequest {
    pub fn new(original_url: impl Into<String>) -> Self {
        Self {
            original_url: Some(original_url.into()),
            ..Self::default()
        }
    }

    pub fn with_shortcode(mut self, shortcode: impl Into<String>) -> Self {
        self.custom_shortcode = Some(shortcode.into());
        self
    }

    pub fn with_validity(mut self, minutes: i64) -> Self {
        self.validity_minutes = Some(ValidityInput::Minutes(minutes));
        self
    }

    pub fn url(&self) -> Option<&str> {
        non_empty(self.original_url.as_deref())
    }

    pub fn shortcode(&self) -> Option<&str> {
        non_empty(self.custom_shortcode.as_deref())
    }

    pub fn validity(&self) -> Option<&ValidityInput> {
        self.validity_minutes.as_ref().filter(|v| !v.is_empty())
    }

    /// True when the row carries nothing at all (an unused form slot)
    pub fn is_blank(&self) -> bool {
        self.url().is_none() && self.shortcode().is_none() && self.validity().is_none()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// How a caller addresses a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkRef {
    Id(LinkId),
    Shortcode(String),
}

impl From<LinkId> for LinkRef {
    fn from(id: LinkId) -> Self {
        LinkRef::Id(id)
    }
}

impl From<&str> for LinkRef {
    fn from(code: &str) -> Self {
        LinkRef::Shortcode(code.to_string())
    }
}

/// Expiry-derived view filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Active,
    Expired,
}

impl FromStr for LinkState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(LinkState::Active),
            "expired" => Ok(LinkState::Expired),
            other => Err(format!("unknown link state '{other}'")),
        }
    }
}
