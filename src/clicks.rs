//! Click recording: the only path that mutates a link's click history.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::ClickConfig;
use crate::models::{ClickEvent, LinkRef};
use crate::storage::{ErrorKind, ShortLinkStore};

/// Placeholder stored instead of a resolved visitor location
pub const DEFAULT_LOCATION_LABEL: &str = "Demo Location (San Francisco, CA)";

pub const DEFAULT_SOURCE_LABEL: &str = "Direct Click";

/// Stored when the client sent no user agent
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone)]
pub struct ClickRecorder {
    location_label: String,
}

impl Default for ClickRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_LOCATION_LABEL)
    }
}

impl From<&ClickConfig> for ClickRecorder {
    fn from(config: &ClickConfig) -> Self {
        Self::new(config.location_label.clone())
    }
}

impl ClickRecorder {
    pub fn new(location_label: impl Into<String>) -> Self {
        Self {
            location_label: location_label.into(),
        }
    }

    pub fn location_label(&self) -> &str {
        &self.location_label
    }

    /// Record a visit and hand back the URL to open.
    ///
    /// Unknown links fail with `NotFound`; links past their expiry fail with
    /// `Expired` and keep their click history untouched.
    pub fn visit(
        &self,
        store: &mut ShortLinkStore,
        link: &LinkRef,
        now: DateTime<Utc>,
        client_signature: &str,
        source_label: &str,
    ) -> Result<String, ErrorKind> {
        let Some(target) = store.find_mut(link) else {
            debug!(link = ?link, "visit to unknown link");
            return Err(ErrorKind::NotFound);
        };

        if target.is_expired_at(now) {
            info!(
                shortcode = %target.shortcode(),
                expires_at = %target.expires_at(),
                "attempted to visit expired link"
            );
            return Err(ErrorKind::Expired);
        }

        target.record_click(ClickEvent {
            timestamp: now,
            source_label: source_label.to_string(),
            location_label: self.location_label.clone(),
            client_signature: client_signature.to_string(),
        });

        info!(
            shortcode = %target.shortcode(),
            click_count = target.click_count(),
            "click recorded"
        );

        Ok(target.original_url().to_string())
    }
}

/// Shorten a user agent to `max_chars` characters, marking the cut with `...`
pub fn client_signature(user_agent: Option<&str>, max_chars: usize) -> String {
    let user_agent = match user_agent.map(str::trim) {
        Some(ua) if !ua.is_empty() => ua,
        _ => return UNKNOWN_CLIENT.to_string(),
    };

    match user_agent.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &user_agent[..cut]),
        None => user_agent.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LinkEntryRequest;
    use chrono::TimeDelta;

    fn store_with_link(now: DateTime<Utc>, minutes: i64) -> ShortLinkStore {
        let mut store = ShortLinkStore::default();
        store
            .submit(
                vec![LinkEntryRequest::new("https://example.com/page")
                    .with_shortcode("visit1")
                    .with_validity(minutes)],
                now,
            )
            .unwrap();
        store
    }

    #[test]
    fn test_visit_records_clicks_in_call_order() {
        let created = Utc::now();
        let mut store = store_with_link(created, 10);
        let recorder = ClickRecorder::default();
        let link = LinkRef::from("visit1");

        for i in 0..3 {
            let at = created + TimeDelta::seconds(i);
            let url = recorder
                .visit(&mut store, &link, at, &format!("agent-{i}"), "Direct Click")
                .unwrap();
            assert_eq!(url, "https://example.com/page");
        }

        let stored = store.find(&link).unwrap();
        assert_eq!(stored.click_count(), 3);
        assert_eq!(stored.clicks().len(), 3);
        let agents: Vec<_> = stored.clicks().iter().map(|c| c.client_signature.as_str()).collect();
        assert_eq!(agents, vec!["agent-0", "agent-1", "agent-2"]);
        assert!(stored.clicks().iter().all(|c| c.location_label == DEFAULT_LOCATION_LABEL));
    }

    #[test]
    fn test_visit_expired_leaves_history_untouched() {
        let created = Utc::now();
        let mut store = store_with_link(created, 5);
        let recorder = ClickRecorder::default();
        let link = LinkRef::from("visit1");
        let expires_at = store.find(&link).unwrap().expires_at();

        // exactly at expiry is still visitable
        assert!(recorder.visit(&mut store, &link, expires_at, "ua", "src").is_ok());

        let later = expires_at + TimeDelta::milliseconds(1);
        assert_eq!(
            recorder.visit(&mut store, &link, later, "ua", "src"),
            Err(ErrorKind::Expired)
        );

        let stored = store.find(&link).unwrap();
        assert_eq!(stored.click_count(), 1);
        assert_eq!(stored.clicks().len(), 1);
        assert_eq!(stored.expires_at(), expires_at);
    }

    #[test]
    fn test_visit_unknown_link() {
        let mut store = ShortLinkStore::default();
        let recorder = ClickRecorder::new("Nowhere");
        assert_eq!(
            recorder.visit(&mut store, &LinkRef::from("nope"), Utc::now(), "ua", "src"),
            Err(ErrorKind::NotFound)
        );
    }

    #[test]
    fn test_visit_by_id_uses_configured_location() {
        let created = Utc::now();
        let mut store = store_with_link(created, 5);
        let id = store.find(&LinkRef::from("visit1")).unwrap().id();
        let recorder = ClickRecorder::new("Somewhere");

        recorder
            .visit(&mut store, &LinkRef::Id(id), created, "ua", "QR Code")
            .unwrap();

        let click = &store.get(id).unwrap().clicks()[0];
        assert_eq!(click.location_label, "Somewhere");
        assert_eq!(click.source_label, "QR Code");
        assert_eq!(click.timestamp, created);
    }

    #[test]
    fn test_client_signature_truncation() {
        assert_eq!(client_signature(None, 50), UNKNOWN_CLIENT);
        assert_eq!(client_signature(Some("   "), 50), UNKNOWN_CLIENT);
        assert_eq!(client_signature(Some("curl/8.0"), 50), "curl/8.0");
        assert_eq!(client_signature(Some("abcdef"), 6), "abcdef");
        assert_eq!(client_signature(Some("abcdefg"), 6), "abcdef...");
        // cuts on character boundaries
        assert_eq!(client_signature(Some("ééééé"), 2), "éé...");
    }
}
