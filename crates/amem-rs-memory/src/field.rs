//! Fixed schema of a memory record.

use crate::codec::FieldKind;
use std::fmt;

/// Every field a [`MemoryRecord`](crate::MemoryRecord) stores in a dedicated slot.
///
/// The names returned by [`RecordField::as_str`] are the persisted metadata keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    Id,
    Content,
    Keywords,
    Tags,
    Category,
    Context,
    RetrievalCount,
    CreatedAt,
    LastAccessedAt,
    EditHistory,
    EditReasons,
    Extras,
}

impl RecordField {
    pub const ALL: [RecordField; 12] = [
        RecordField::Id,
        RecordField::Content,
        RecordField::Keywords,
        RecordField::Tags,
        RecordField::Category,
        RecordField::Context,
        RecordField::RetrievalCount,
        RecordField::CreatedAt,
        RecordField::LastAccessedAt,
        RecordField::EditHistory,
        RecordField::EditReasons,
        RecordField::Extras,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RecordField::Id => "id",
            RecordField::Content => "content",
            RecordField::Keywords => "keywords",
            RecordField::Tags => "tags",
            RecordField::Category => "category",
            RecordField::Context => "context",
            RecordField::RetrievalCount => "retrieval_count",
            RecordField::CreatedAt => "created_at",
            RecordField::LastAccessedAt => "last_accessed_at",
            RecordField::EditHistory => "edit_history",
            RecordField::EditReasons => "edit_reasons",
            RecordField::Extras => "extras",
        }
    }

    /// Look up a field by its canonical name. Legacy aliases are resolved by
    /// the [`FieldRegistry`](crate::FieldRegistry).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == name)
    }

    pub fn kind(self) -> FieldKind {
        match self {
            RecordField::Id
            | RecordField::Content
            | RecordField::Category
            | RecordField::Context => FieldKind::Text,
            RecordField::RetrievalCount => FieldKind::Integer,
            RecordField::Keywords
            | RecordField::Tags
            | RecordField::EditHistory
            | RecordField::EditReasons => FieldKind::List,
            RecordField::CreatedAt | RecordField::LastAccessedAt => FieldKind::Timestamp,
            RecordField::Extras => FieldKind::Mapping,
        }
    }

    /// Fields maintained by the record itself; they cannot be overridden on update.
    pub fn is_managed(self) -> bool {
        matches!(
            self,
            RecordField::Id
                | RecordField::Content
                | RecordField::CreatedAt
                | RecordField::LastAccessedAt
                | RecordField::EditHistory
                | RecordField::EditReasons
        )
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
