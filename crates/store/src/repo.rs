//! Encoding of the single onboarding draft.
//!
//! The stored value is the draft's camelCase field map with one reserved
//! extra key, `_lastSaved`, holding the RFC 3339 save time:
//!
//! ```json
//! { "fullName": "Ada", "services": ["UI/UX"], "_lastSaved": "2026-03-15T10:00:00Z" }
//! ```
//!
//! An absent key means "no draft".

use std::sync::Arc;

use onboard_core::{FormDraft, Timestamp};
use serde::{Deserialize, Serialize};

use crate::{DraftStore, StoreError};

/// Key the draft is stored under unless configured otherwise.
pub const DEFAULT_DRAFT_KEY: &str = "onboarding-draft";

/// A persisted draft and when it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    #[serde(flatten)]
    pub draft: FormDraft,

    #[serde(rename = "_lastSaved", default, skip_serializing_if = "Option::is_none")]
    pub last_saved: Option<Timestamp>,
}

/// Reads and writes the draft snapshot under one key.
#[derive(Clone)]
pub struct DraftRepo {
    store: Arc<dyn DraftStore>,
    key: String,
}

impl DraftRepo {
    pub fn new(store: Arc<dyn DraftStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the snapshot. A value that does not decode is reported as
    /// [`StoreError::Malformed`] and left in place.
    pub fn load(&self) -> Result<Option<DraftSnapshot>, StoreError> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(StoreError::Malformed)
    }

    /// Replace the stored snapshot with `draft`, stamped `saved_at`.
    pub fn save(&self, draft: &FormDraft, saved_at: Timestamp) -> Result<DraftSnapshot, StoreError> {
        let snapshot = DraftSnapshot {
            draft: draft.clone(),
            last_saved: Some(saved_at),
        };
        let encoded = serde_json::to_string(&snapshot).map_err(StoreError::Encode)?;
        self.store.set(&self.key, &encoded)?;
        tracing::debug!(key = %self.key, bytes = encoded.len(), "Draft saved");
        Ok(snapshot)
    }

    /// Delete the snapshot. Deleting a missing draft succeeds.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(&self.key)?;
        tracing::debug!(key = %self.key, "Draft cleared");
        Ok(())
    }

    /// Whether a value exists under the key, without decoding it.
    pub fn exists(&self) -> Result<bool, StoreError> {
        self.store.contains(&self.key)
    }

    /// Size of the stored value in bytes (0 when absent).
    pub fn storage_size(&self) -> Result<usize, StoreError> {
        Ok(self.store.get(&self.key)?.map_or(0, |raw| raw.len()))
    }

    /// Human-readable dump of the draft for support/debugging.
    ///
    /// `None` when no draft is stored.
    pub fn export(&self) -> Result<Option<String>, StoreError> {
        let Some(snapshot) = self.load()? else {
            return Ok(None);
        };
        let doc = serde_json::json!({
            "data": snapshot.draft,
            "lastSaved": snapshot.last_saved,
        });
        serde_json::to_string_pretty(&doc)
            .map(Some)
            .map_err(StoreError::Encode)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use chrono::{TimeZone, Utc};
    use onboard_core::FieldValue;

    fn repo() -> (MemoryStore, DraftRepo) {
        let store = MemoryStore::new();
        let repo = DraftRepo::new(Arc::new(store.clone()), DEFAULT_DRAFT_KEY);
        (store, repo)
    }

    fn saved_at() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 15, 10, 0, 0).unwrap()
    }

    #[test]
    fn save_writes_field_map_with_timestamp() {
        let (store, repo) = repo();
        let mut draft = FormDraft::default();
        draft.apply(FieldValue::FullName("Ada".into()));

        repo.save(&draft, saved_at()).unwrap();

        let raw = store.get(DEFAULT_DRAFT_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["fullName"], "Ada");
        assert_eq!(value["_lastSaved"], "2026-03-15T10:00:00Z");
    }

    #[test]
    fn load_roundtrips_snapshot() {
        let (_, repo) = repo();
        let mut draft = FormDraft::initial();
        draft.apply(FieldValue::Services(vec!["Branding".into()]));
        draft.apply(FieldValue::BudgetUsd(Some(2500.0)));

        let saved = repo.save(&draft, saved_at()).unwrap();
        assert_eq!(repo.load().unwrap(), Some(saved));
    }

    #[test]
    fn load_accepts_draft_without_timestamp() {
        let (store, repo) = repo();
        store
            .set(DEFAULT_DRAFT_KEY, r#"{"fullName":"John Doe","email":"john@example.com"}"#)
            .unwrap();

        let snapshot = repo.load().unwrap().unwrap();
        assert_eq!(snapshot.draft.full_name.as_deref(), Some("John Doe"));
        assert_eq!(snapshot.last_saved, None);
    }

    #[test]
    fn malformed_draft_is_reported_and_kept() {
        let (store, repo) = repo();
        store.set(DEFAULT_DRAFT_KEY, "{not json").unwrap();

        assert!(matches!(repo.load(), Err(StoreError::Malformed(_))));
        assert!(repo.exists().unwrap());
    }

    #[test]
    fn clear_is_idempotent() {
        let (_, repo) = repo();
        repo.save(&FormDraft::default(), saved_at()).unwrap();
        assert!(repo.exists().unwrap());

        repo.clear().unwrap();
        repo.clear().unwrap();
        assert!(!repo.exists().unwrap());
        assert_eq!(repo.load().unwrap(), None);
    }

    #[test]
    fn storage_size_and_export() {
        let (_, repo) = repo();
        assert_eq!(repo.storage_size().unwrap(), 0);
        assert_eq!(repo.export().unwrap(), None);

        let mut draft = FormDraft::default();
        draft.apply(FieldValue::CompanyName("Acme".into()));
        repo.save(&draft, saved_at()).unwrap();

        assert!(repo.storage_size().unwrap() > 0);
        let exported: serde_json::Value =
            serde_json::from_str(&repo.export().unwrap().unwrap()).unwrap();
        assert_eq!(exported["data"]["companyName"], "Acme");
        assert_eq!(exported["lastSaved"], "2026-03-15T10:00:00Z");
    }

    #[test]
    fn quota_failure_surfaces_from_save() {
        let store = MemoryStore::with_quota(8);
        let repo = DraftRepo::new(Arc::new(store), DEFAULT_DRAFT_KEY);
        let err = repo.save(&FormDraft::initial(), saved_at()).unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { .. }));
    }
}
