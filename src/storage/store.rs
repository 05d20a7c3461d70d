use chrono::{DateTime, TimeDelta, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};
use url::Url;

use super::error::{BatchErrors, BatchRejection, EntryField, ErrorKind, SubmitError};
use crate::config::LinkConfig;
use crate::models::{LinkEntryRequest, LinkId, LinkRef, ShortLink};
use crate::shortcode::{self, RandomShortcodeGenerator, ShortcodeGenerator};

#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Validity applied when an entry omits one
    pub default_validity_minutes: i64,
    /// Upper bound on entries per submitted batch
    pub max_batch_size: usize,
    /// Random draws per code length before widening
    pub max_attempts_per_length: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            default_validity_minutes: 30,
            max_batch_size: 5,
            max_attempts_per_length: 16,
        }
    }
}

impl From<&LinkConfig> for StoreSettings {
    fn from(config: &LinkConfig) -> Self {
        Self {
            default_validity_minutes: config.default_validity_minutes,
            max_batch_size: config.max_batch_size,
            max_attempts_per_length: config.shortcode_max_attempts,
        }
    }
}

/// An entry that passed its own checks and is waiting for the rest of the batch
struct PendingEntry {
    index: usize,
    original_url: String,
    custom_shortcode: Option<String>,
    expires_at: DateTime<Utc>,
}

/// In-memory registry of every short link created during the process lifetime.
///
/// A shortcode stays claimed until its link is deleted; expiry alone never
/// frees it. Expiry is evaluated lazily against the `now` given by the caller.
pub struct ShortLinkStore {
    /// Keyed by id, so iteration follows creation order
    links: BTreeMap<LinkId, ShortLink>,
    by_shortcode: HashMap<String, LinkId>,
    next_id: u64,
    generator: Box<dyn ShortcodeGenerator>,
    settings: StoreSettings,
}

impl Default for ShortLinkStore {
    fn default() -> Self {
        Self::new(Box::new(RandomShortcodeGenerator), StoreSettings::default())
    }
}

impl ShortLinkStore {
    pub fn new(generator: Box<dyn ShortcodeGenerator>, settings: StoreSettings) -> Self {
        Self {
            links: BTreeMap::new(),
            by_shortcode: HashMap::new(),
            next_id: 1,
            generator,
            settings,
        }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn is_shortcode_taken(&self, shortcode: &str) -> bool {
        self.by_shortcode.contains_key(shortcode)
    }

    /// Validate and insert a batch as a single unit.
    ///
    /// Either every non-blank entry becomes a link or none does. On rejection
    /// the error carries each failing field plus the indices of entries that
    /// were valid but not applied.
    pub fn submit(
        &mut self,
        requests: Vec<LinkEntryRequest>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ShortLink>, SubmitError> {
        if requests.len() > self.settings.max_batch_size {
            return Err(SubmitError::BatchTooLarge {
                limit: self.settings.max_batch_size,
                received: requests.len(),
            });
        }

        let mut errors = BatchErrors::default();
        let mut pending = Vec::with_capacity(requests.len());
        let mut claimed: HashSet<String> = HashSet::new();

        for (index, request) in requests.iter().enumerate() {
            if request.is_blank() {
                continue;
            }

            let Some(entry) = self.validate_entry(index, request, now, &mut errors) else {
                continue;
            };

            if let Some(code) = &entry.custom_shortcode {
                if self.is_shortcode_taken(code) || !claimed.insert(code.clone()) {
                    errors.insert(index, EntryField::CustomShortcode, ErrorKind::ShortcodeTaken);
                    continue;
                }
            }

            pending.push(entry);
        }

        if !errors.is_empty() {
            return Err(SubmitError::Rejected(BatchRejection {
                errors,
                not_applied: pending.iter().map(|entry| entry.index).collect(),
            }));
        }

        if pending.is_empty() {
            return Err(SubmitError::EmptyBatch);
        }

        let mut created = Vec::with_capacity(pending.len());
        for entry in pending {
            let shortcode = match entry.custom_shortcode {
                Some(code) => code,
                None => {
                    let code = self.generate_unique(&claimed);
                    claimed.insert(code.clone());
                    code
                }
            };

            let id = LinkId(self.next_id);
            self.next_id += 1;

            created.push(ShortLink::new(
                id,
                entry.original_url,
                shortcode,
                now,
                entry.expires_at,
            ));
        }

        for link in &created {
            self.by_shortcode.insert(link.shortcode().to_string(), link.id());
            self.links.insert(link.id(), link.clone());
        }

        debug!(count = created.len(), total = self.links.len(), "batch inserted");
        Ok(created)
    }

    /// Run the per-entry checks, recording every failing field
    fn validate_entry(
        &self,
        index: usize,
        request: &LinkEntryRequest,
        now: DateTime<Utc>,
        errors: &mut BatchErrors,
    ) -> Option<PendingEntry> {
        let original_url = match request.url() {
            None => {
                errors.insert(index, EntryField::OriginalUrl, ErrorKind::MissingUrl);
                None
            }
            Some(raw) if raw.chars().any(char::is_control) || Url::parse(raw).is_err() => {
                errors.insert(index, EntryField::OriginalUrl, ErrorKind::InvalidUrl);
                None
            }
            Some(raw) => Some(raw.to_string()),
        };

        let minutes = match request.validity() {
            None => Some(self.settings.default_validity_minutes),
            Some(validity) => validity.minutes(),
        };
        let expires_at = minutes
            .filter(|m| *m > 0)
            .and_then(TimeDelta::try_minutes)
            .and_then(|validity| now.checked_add_signed(validity));
        if expires_at.is_none() {
            errors.insert(index, EntryField::ValidityMinutes, ErrorKind::InvalidValidity);
        }

        let custom_shortcode = request.shortcode();
        if let Some(code) = custom_shortcode {
            if !shortcode::validate_format(code) {
                errors.insert(
                    index,
                    EntryField::CustomShortcode,
                    ErrorKind::InvalidShortcodeFormat,
                );
                return None;
            }
        }

        Some(PendingEntry {
            index,
            original_url: original_url?,
            custom_shortcode: custom_shortcode.map(str::to_string),
            expires_at: expires_at?,
        })
    }

    /// Draw random codes until one is free in the store and in the current batch.
    ///
    /// After `max_attempts_per_length` misses the code length grows by one, up
    /// to the format maximum, where drawing continues until a free code turns up.
    fn generate_unique(&self, claimed: &HashSet<String>) -> String {
        let attempts = self.settings.max_attempts_per_length.max(1);
        let mut length = shortcode::DEFAULT_LENGTH;

        loop {
            for _ in 0..attempts {
                let code = self.generator.generate(length);
                if !self.is_shortcode_taken(&code) && !claimed.contains(&code) {
                    return code;
                }
            }

            if length < shortcode::MAX_LENGTH {
                length += 1;
                warn!(length, attempts, "shortcode collisions exhausted attempts, widening code length");
            }
        }
    }

    /// Links whose expiry has not passed at `now`
    pub fn list_active(&self, now: DateTime<Utc>) -> Vec<ShortLink> {
        self.links
            .values()
            .filter(|link| !link.is_expired_at(now))
            .cloned()
            .collect()
    }

    /// Links whose expiry is strictly before `now`
    pub fn list_expired(&self, now: DateTime<Utc>) -> Vec<ShortLink> {
        self.links
            .values()
            .filter(|link| link.is_expired_at(now))
            .cloned()
            .collect()
    }

    pub fn list_all(&self) -> Vec<ShortLink> {
        self.links.values().cloned().collect()
    }

    pub fn get(&self, id: LinkId) -> Option<&ShortLink> {
        self.links.get(&id)
    }

    pub fn find(&self, link: &LinkRef) -> Option<&ShortLink> {
        match link {
            LinkRef::Id(id) => self.links.get(id),
            LinkRef::Shortcode(code) => self
                .by_shortcode
                .get(code)
                .and_then(|id| self.links.get(id)),
        }
    }

    pub(crate) fn find_mut(&mut self, link: &LinkRef) -> Option<&mut ShortLink> {
        let id = match link {
            LinkRef::Id(id) => *id,
            LinkRef::Shortcode(code) => *self.by_shortcode.get(code)?,
        };
        self.links.get_mut(&id)
    }

    /// Remove a link and release its shortcode. Returns whether it existed.
    pub fn delete(&mut self, id: LinkId) -> bool {
        match self.links.remove(&id) {
            Some(link) => {
                self.by_shortcode.remove(link.shortcode());
                true
            }
            None => false,
        }
    }
}
