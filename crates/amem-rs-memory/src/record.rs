//! Memory record model.

use crate::codec::FieldRegistry;
use crate::error::MemoryError;
use crate::field::RecordField;
use crate::value::{Attributes, Extras, FieldValue};
use amem_rs_vector::Metadata;
use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;
use uuid::Uuid;

pub const DEFAULT_CATEGORY: &str = "Uncategorized";
pub const DEFAULT_CONTEXT: &str = "General";
/// Edit reason recorded for the initial content.
pub const CREATION_REASON: &str = "created";
pub const DEFAULT_UPDATE_REASON: &str = "generic update";
pub const UPSERT_REASON: &str = "upsert";

/// One memory note plus its bookkeeping.
///
/// `edit_history` and `edit_reasons` always have the same non-zero length.
/// `retrieval_count` never decreases and `id` never changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryRecord {
    id: String,
    content: String,
    keywords: Vec<String>,
    tags: Vec<String>,
    category: String,
    context: String,
    retrieval_count: u64,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    edit_history: Vec<String>,
    edit_reasons: Vec<String>,
    extras: Extras,
}

impl MemoryRecord {
    /// Record with a fresh id and default fields.
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            keywords: Vec::new(),
            tags: Vec::new(),
            category: DEFAULT_CATEGORY.to_string(),
            context: DEFAULT_CONTEXT.to_string(),
            retrieval_count: 0,
            created_at: now,
            last_accessed_at: now,
            edit_history: vec![content.clone()],
            edit_reasons: vec![CREATION_REASON.to_string()],
            extras: Extras::new(),
            content,
        }
    }

    /// Build a record from open-ended attributes.
    ///
    /// Schema fields land in their slots; anything else is stringified into
    /// `extras`. A supplied `extras` mapping is merged underneath directly
    /// named keys. A schema field with the wrong shape is rejected.
    pub fn with_attributes(
        content: impl Into<String>,
        attrs: Attributes,
        registry: &FieldRegistry,
    ) -> Result<Self, MemoryError> {
        let mut record = Self::new(content);
        let mut supplied_extras = Extras::new();
        let mut direct_extras = Extras::new();
        let mut access_supplied = false;
        let shadowed: Vec<String> = attrs
            .keys()
            .filter(|key| {
                let canonical = registry.canonical_name(key);
                canonical != key.as_str() && attrs.contains_key(canonical)
            })
            .cloned()
            .collect();

        for (key, value) in attrs {
            if shadowed.contains(&key) {
                warn!("ignoring legacy attribute shadowed by its canonical name (key={})", key);
                continue;
            }
            let name = registry.canonical_name(&key);
            match RecordField::from_name(name) {
                Some(RecordField::Content) => {
                    warn!("ignoring content passed as an attribute (id={})", record.id);
                }
                Some(RecordField::Extras) => match value {
                    FieldValue::Mapping(map) => supplied_extras = map,
                    other => {
                        return Err(MemoryError::validation(
                            RecordField::Extras.as_str(),
                            format!("expected mapping, got {}", other.kind()),
                        ));
                    }
                },
                Some(field) => {
                    registry.check(field.as_str(), &value)?;
                    record.assign(field, value)?;
                    access_supplied |= field == RecordField::LastAccessedAt;
                }
                None => {
                    direct_extras.insert(key, value.to_string());
                }
            }
        }

        record.extras = sanitize_extras(supplied_extras, registry);
        record.extras.extend(direct_extras);
        if !access_supplied {
            record.last_accessed_at = record.last_accessed_at.max(record.created_at);
        }
        record.normalize_history();
        Ok(record)
    }

    /// Rebuild a record from a stored document and its flat metadata.
    ///
    /// `document_id` and `document` fill in `id` and `content` when the
    /// metadata lacks them. A conflicting stored id loses to `document_id`.
    pub fn from_metadata(
        document_id: &str,
        document: &str,
        metadata: &Metadata,
        registry: &FieldRegistry,
    ) -> Result<Self, MemoryError> {
        let mut attrs = registry.deserialize_all(metadata);
        let content = match attrs.remove(RecordField::Content.as_str()) {
            Some(FieldValue::Text(text)) => text,
            _ => document.to_string(),
        };
        if let Some(stored) = attrs.get(RecordField::Id.as_str()) {
            if stored.as_text() != Some(document_id) {
                warn!(
                    "stored id differs from document id (stored={}, document={})",
                    stored, document_id
                );
            }
        }
        attrs.insert(
            RecordField::Id.as_str().to_string(),
            FieldValue::from(document_id),
        );
        Self::with_attributes(content, attrs, registry)
    }

    /// Replace the content, record the edit and apply field overrides.
    ///
    /// Overrides are validated before anything changes.
    pub fn update(
        &mut self,
        new_content: impl Into<String>,
        reason: Option<&str>,
        overrides: &Attributes,
        registry: &FieldRegistry,
    ) -> Result<(), MemoryError> {
        let mut next = self.clone();
        next.apply_fields(overrides, registry)?;
        let new_content = new_content.into();
        next.edit_history.push(new_content.clone());
        next.edit_reasons
            .push(reason.unwrap_or(DEFAULT_UPDATE_REASON).to_string());
        next.content = new_content;
        next.touch();
        *self = next;
        Ok(())
    }

    /// Apply field overrides without touching content or history.
    pub fn apply_overrides(
        &mut self,
        overrides: &Attributes,
        registry: &FieldRegistry,
    ) -> Result<(), MemoryError> {
        let mut next = self.clone();
        next.apply_fields(overrides, registry)?;
        *self = next;
        Ok(())
    }

    /// Count a retrieval and refresh the access time.
    pub fn record_access(&mut self) {
        self.retrieval_count = self.retrieval_count.saturating_add(1);
        self.touch();
    }

    /// Every field, including `extras`, as typed attributes.
    pub fn to_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        let mut put = |field: RecordField, value: FieldValue| {
            attrs.insert(field.as_str().to_string(), value);
        };
        put(RecordField::Id, self.id.clone().into());
        put(RecordField::Content, self.content.clone().into());
        put(RecordField::Keywords, self.keywords.clone().into());
        put(RecordField::Tags, self.tags.clone().into());
        put(RecordField::Category, self.category.clone().into());
        put(RecordField::Context, self.context.clone().into());
        put(RecordField::RetrievalCount, self.retrieval_count.into());
        put(RecordField::CreatedAt, self.created_at.into());
        put(RecordField::LastAccessedAt, self.last_accessed_at.into());
        put(RecordField::EditHistory, self.edit_history.clone().into());
        put(RecordField::EditReasons, self.edit_reasons.clone().into());
        put(RecordField::Extras, self.extras.clone().into());
        attrs
    }

    /// Flat metadata for the vector store.
    pub fn to_metadata(&self, registry: &FieldRegistry) -> Metadata {
        registry.serialize_all(&self.to_attributes())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn retrieval_count(&self) -> u64 {
        self.retrieval_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        self.last_accessed_at
    }

    pub fn edit_history(&self) -> &[String] {
        &self.edit_history
    }

    pub fn edit_reasons(&self) -> &[String] {
        &self.edit_reasons
    }

    pub fn extras(&self) -> &Extras {
        &self.extras
    }

    fn touch(&mut self) {
        self.last_accessed_at = Utc::now().max(self.created_at);
    }

    fn apply_fields(
        &mut self,
        overrides: &Attributes,
        registry: &FieldRegistry,
    ) -> Result<(), MemoryError> {
        for (key, value) in overrides {
            let Some(field) = RecordField::from_name(registry.canonical_name(key)) else {
                continue;
            };
            if field.is_managed() {
                return Err(MemoryError::validation(
                    field.as_str(),
                    "field is maintained by the record and cannot be overridden",
                ));
            }
            if field == RecordField::Extras {
                let FieldValue::Mapping(map) = value else {
                    return Err(MemoryError::validation(
                        field.as_str(),
                        format!("expected mapping, got {}", value.kind()),
                    ));
                };
                self.extras = sanitize_extras(map.clone(), registry);
                continue;
            }
            registry.check(field.as_str(), value)?;
            if field == RecordField::RetrievalCount
                && value.as_integer().is_some_and(|count| count < self.retrieval_count_signed())
            {
                return Err(MemoryError::validation(
                    field.as_str(),
                    format!("cannot lower retrieval count below {}", self.retrieval_count),
                ));
            }
            self.assign(field, value.clone())?;
        }
        Ok(())
    }

    fn retrieval_count_signed(&self) -> i64 {
        i64::try_from(self.retrieval_count).unwrap_or(i64::MAX)
    }

    /// Store a value in its slot. The value must already match the field kind.
    fn assign(&mut self, field: RecordField, value: FieldValue) -> Result<(), MemoryError> {
        match (field, value) {
            (RecordField::Id, FieldValue::Text(id)) => self.id = id,
            (RecordField::Content, FieldValue::Text(content)) => self.content = content,
            (RecordField::Category, FieldValue::Text(category)) => self.category = category,
            (RecordField::Context, FieldValue::Text(context)) => self.context = context,
            (RecordField::Keywords, FieldValue::List(keywords)) => self.keywords = keywords,
            (RecordField::Tags, FieldValue::List(tags)) => self.tags = tags,
            (RecordField::EditHistory, FieldValue::List(history)) => self.edit_history = history,
            (RecordField::EditReasons, FieldValue::List(reasons)) => self.edit_reasons = reasons,
            (RecordField::RetrievalCount, FieldValue::Integer(count)) => {
                self.retrieval_count = u64::try_from(count).map_err(|_| {
                    MemoryError::validation(field.as_str(), "retrieval count must be non-negative")
                })?;
            }
            (RecordField::CreatedAt, FieldValue::Timestamp(at)) => self.created_at = at,
            (RecordField::LastAccessedAt, FieldValue::Timestamp(at)) => self.last_accessed_at = at,
            (RecordField::Extras, FieldValue::Mapping(extras)) => self.extras = extras,
            (field, value) => {
                return Err(MemoryError::validation(
                    field.as_str(),
                    format!("expected {}, got {}", field.kind(), value.kind()),
                ));
            }
        }
        Ok(())
    }

    /// Keep `edit_history` and `edit_reasons` parallel and non-empty.
    fn normalize_history(&mut self) {
        if self.edit_history.is_empty() || self.edit_reasons.is_empty() {
            self.edit_history = vec![self.content.clone()];
            self.edit_reasons = vec![CREATION_REASON.to_string()];
            return;
        }
        if self.edit_history.len() != self.edit_reasons.len() {
            warn!(
                "truncating mismatched edit history (id={}, history={}, reasons={})",
                self.id,
                self.edit_history.len(),
                self.edit_reasons.len()
            );
            let len = self.edit_history.len().min(self.edit_reasons.len());
            self.edit_history.truncate(len);
            self.edit_reasons.truncate(len);
        }
    }
}

/// Drop schema field names smuggled in through an extras map.
fn sanitize_extras(extras: Extras, registry: &FieldRegistry) -> Extras {
    extras
        .into_iter()
        .filter(|(key, _)| {
            let known = RecordField::from_name(registry.canonical_name(key)).is_some();
            if known {
                warn!("dropping schema field from extras (field={})", key);
            }
            !known
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{CREATION_REASON, DEFAULT_CATEGORY, DEFAULT_UPDATE_REASON, MemoryRecord};
    use crate::codec::FieldRegistry;
    use crate::error::MemoryError;
    use crate::value::{Attributes, Extras, FieldValue, attributes};
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn registry() -> FieldRegistry {
        FieldRegistry::for_memory_records()
    }

    #[test]
    fn new_record_starts_with_creation_entry() {
        let record = MemoryRecord::new("first thought");
        assert_eq!(record.edit_history(), ["first thought".to_string()]);
        assert_eq!(record.edit_reasons(), [CREATION_REASON.to_string()]);
        assert_eq!(record.category(), DEFAULT_CATEGORY);
        assert_eq!(record.retrieval_count(), 0);
        assert!(!record.id().is_empty());
    }

    #[test]
    fn attributes_partition_into_slots_and_extras() {
        let mut attrs = attributes([("category", "Work"), ("project", "amem")]);
        attrs.insert("tags".to_string(), vec!["rust"].into());
        attrs.insert("priority".to_string(), 2i64.into());
        attrs.insert(
            "extras".to_string(),
            Extras::from([
                ("project".to_string(), "overridden".to_string()),
                ("team".to_string(), "core".to_string()),
                ("tags".to_string(), "smuggled".to_string()),
            ])
            .into(),
        );
        let record = MemoryRecord::with_attributes("note", attrs, &registry()).expect("record");

        assert_eq!(record.category(), "Work");
        assert_eq!(record.tags(), ["rust".to_string()]);
        assert_eq!(
            record.extras(),
            &Extras::from([
                ("priority".to_string(), "2".to_string()),
                ("project".to_string(), "amem".to_string()),
                ("team".to_string(), "core".to_string()),
            ])
        );
    }

    #[test]
    fn wrongly_typed_schema_field_is_rejected() {
        let err = MemoryRecord::with_attributes(
            "note",
            attributes([("retrieval_count", "three")]),
            &registry(),
        )
        .unwrap_err();
        assert!(matches!(err, MemoryError::Validation { .. }));
    }

    #[test]
    fn future_creation_time_keeps_access_time_ordered() {
        let future = Utc::now() + Duration::days(1);
        let record = MemoryRecord::with_attributes(
            "note",
            attributes([("created_at", future)]),
            &registry(),
        )
        .expect("record");
        assert!(record.last_accessed_at() >= record.created_at());
    }

    #[test]
    fn canonical_attribute_beats_its_legacy_alias() {
        let canonical = Utc
            .with_ymd_and_hms(2024, 3, 1, 0, 0, 0)
            .single()
            .expect("time");
        let legacy = Utc
            .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
            .single()
            .expect("time");
        let record = MemoryRecord::with_attributes(
            "note",
            attributes([("created_at", canonical), ("timestamp", legacy)]),
            &registry(),
        )
        .expect("record");
        assert_eq!(record.created_at(), canonical);

        let record = MemoryRecord::with_attributes(
            "note",
            attributes([("timestamp", legacy)]),
            &registry(),
        )
        .expect("record");
        assert_eq!(record.created_at(), legacy);
    }

    #[test]
    fn metadata_round_trip_preserves_every_field() {
        let registry = registry();
        let created = Utc
            .with_ymd_and_hms(2023, 5, 6, 7, 8, 9)
            .single()
            .expect("time");
        let mut attrs = attributes([("category", "Research"), ("context", "ML notes")]);
        attrs.insert("keywords".to_string(), vec!["neural", "nets"].into());
        attrs.insert("created_at".to_string(), created.into());
        attrs.insert("retrieval_count".to_string(), 4i64.into());
        attrs.insert("owner".to_string(), "ana".into());
        let mut record =
            MemoryRecord::with_attributes("backprop", attrs, &registry).expect("record");
        record
            .update("backprop revisited", Some("refine"), &Attributes::new(), &registry)
            .expect("update");

        let metadata = record.to_metadata(&registry);
        assert_eq!(metadata["retrieval_count"], json!("4"));
        let restored =
            MemoryRecord::from_metadata(record.id(), record.content(), &metadata, &registry)
                .expect("restore");
        assert_eq!(restored, record);
    }

    #[test]
    fn from_metadata_fills_missing_fields_and_repairs_history() {
        let registry = registry();
        let mut metadata = serde_json::Map::new();
        metadata.insert("memory_update_history".to_string(), json!("[\"a\",\"b\"]"));
        metadata.insert("memory_update_context".to_string(), json!("[\"created\"]"));
        metadata.insert("timestamp".to_string(), json!("202401020304"));
        let record = MemoryRecord::from_metadata("doc-1", "stored text", &metadata, &registry)
            .expect("restore");
        assert_eq!(record.id(), "doc-1");
        assert_eq!(record.content(), "stored text");
        assert_eq!(record.edit_history(), ["a".to_string()]);
        assert_eq!(record.edit_reasons(), ["created".to_string()]);
        assert_eq!(record.created_at().to_rfc3339(), "2024-01-02T03:04:00+00:00");

        let empty = MemoryRecord::from_metadata("doc-2", "x", &serde_json::Map::new(), &registry)
            .expect("restore");
        assert_eq!(empty.edit_history(), ["x".to_string()]);
    }

    #[test]
    fn update_appends_history_and_refreshes_access() {
        let registry = registry();
        let mut record = MemoryRecord::new("v1");
        let before = record.last_accessed_at();
        record
            .update("v2", None, &attributes([("category", "Edited")]), &registry)
            .expect("update");
        record
            .update("v3", Some("fix typo"), &Attributes::new(), &registry)
            .expect("update");
        assert_eq!(record.content(), "v3");
        assert_eq!(record.category(), "Edited");
        assert_eq!(record.edit_history().len(), 3);
        assert_eq!(
            record.edit_reasons(),
            [
                CREATION_REASON.to_string(),
                DEFAULT_UPDATE_REASON.to_string(),
                "fix typo".to_string()
            ]
        );
        assert!(record.last_accessed_at() >= before);
    }

    #[test]
    fn rejected_override_mutates_nothing() {
        let registry = registry();
        let mut record = MemoryRecord::new("v1");
        let snapshot = record.clone();
        for overrides in [
            attributes([("id", "other")]),
            attributes([("created_at", Utc::now())]),
            attributes([("edit_history", vec!["forged"])]),
            attributes([("tags", "not a list")]),
        ] {
            let err = record
                .update("v2", None, &overrides, &registry)
                .unwrap_err();
            assert!(matches!(err, MemoryError::Validation { .. }));
        }
        assert_eq!(record, snapshot);
    }

    #[test]
    fn retrieval_count_cannot_be_lowered() {
        let registry = registry();
        let mut record = MemoryRecord::new("v1");
        record.record_access();
        record.record_access();
        let err = record
            .apply_overrides(&attributes([("retrieval_count", 1i64)]), &registry)
            .unwrap_err();
        assert!(matches!(err, MemoryError::Validation { .. }));
        record
            .apply_overrides(&attributes([("retrieval_count", 5i64)]), &registry)
            .expect("raise");
        assert_eq!(record.retrieval_count(), 5);
    }

    #[test]
    fn unknown_override_keys_are_ignored() {
        let registry = registry();
        let mut record = MemoryRecord::new("v1");
        record
            .apply_overrides(&attributes([("mood", "sunny")]), &registry)
            .expect("apply");
        assert!(record.extras().is_empty());
        assert_eq!(record.edit_history().len(), 1);
    }

    #[test]
    fn extras_override_replaces_the_map() {
        let registry = registry();
        let mut record = MemoryRecord::with_attributes(
            "v1",
            attributes([("project", "a")]),
            &registry,
        )
        .expect("record");
        let replacement = Extras::from([("owner".to_string(), "me".to_string())]);
        let mut overrides = Attributes::new();
        overrides.insert("extras".to_string(), FieldValue::from(replacement.clone()));
        record.apply_overrides(&overrides, &registry).expect("apply");
        assert_eq!(record.extras(), &replacement);
    }
}
