use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::{ReconstructOutcome, Record};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    pub uploader: String,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
}

impl UploadMetadata {
    pub fn new(
        uploader: impl Into<String>,
        filename: impl Into<String>,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            uploader: uploader.into(),
            filename: filename.into(),
            uploaded_at,
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.uploader.trim().is_empty() {
            return Err(StoreError::InvalidMetadata(
                "uploader must not be empty".to_string(),
            ));
        }
        if self.filename.trim().is_empty() {
            return Err(StoreError::InvalidMetadata(
                "filename must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RecordId(u64);

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "rec-{:06}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub id: RecordId,
    pub metadata: UploadMetadata,
    pub headers: Vec<String>,
    pub rows: Vec<Record>,
    pub confidence: f32,
    pub is_multi_page: bool,
}

pub trait ResultStore {
    fn store(
        &mut self,
        outcome: &ReconstructOutcome,
        metadata: UploadMetadata,
    ) -> Result<RecordId, StoreError>;

    fn get(&self, id: RecordId) -> Option<&StoredRecord>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    next_id: u64,
    records: BTreeMap<RecordId, StoredRecord>,
}

impl MemoryStore {
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ResultStore for MemoryStore {
    fn store(
        &mut self,
        outcome: &ReconstructOutcome,
        metadata: UploadMetadata,
    ) -> Result<RecordId, StoreError> {
        if !outcome.success {
            return Err(StoreError::Unsuccessful);
        }
        metadata.validate()?;

        self.next_id += 1;
        let id = RecordId(self.next_id);
        self.records.insert(
            id,
            StoredRecord {
                id,
                metadata,
                headers: outcome.headers.clone(),
                rows: outcome.rows.clone(),
                confidence: outcome.metadata.confidence,
                is_multi_page: outcome.metadata.is_multi_page,
            },
        );
        Ok(id)
    }

    fn get(&self, id: RecordId) -> Option<&StoredRecord> {
        self.records.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{MemoryStore, ResultStore, UploadMetadata};
    use crate::error::StoreError;
    use crate::model::{OutcomeMetadata, ReconstructOutcome, Record, TableOrigin};

    fn outcome(success: bool) -> ReconstructOutcome {
        let headers = vec!["ROLL".to_string(), "GRADE".to_string()];
        let rows = if success {
            vec![Record::from_row(&headers, &["101".to_string(), "A".to_string()])]
        } else {
            Vec::new()
        };
        ReconstructOutcome {
            success,
            metadata: OutcomeMetadata {
                confidence: 0.8,
                total_rows: rows.len(),
                column_count: 2,
                is_multi_page: false,
                origin: TableOrigin::Geometric,
                exam_result: false,
                page_breakdown: Vec::new(),
                issues: Vec::new(),
                ambiguous_rows: Vec::new(),
                errors: Vec::new(),
            },
            headers,
            rows,
        }
    }

    fn metadata(uploader: &str) -> UploadMetadata {
        let uploaded_at = Utc
            .with_ymd_and_hms(2024, 5, 1, 9, 30, 0)
            .single()
            .expect("timestamp should be valid");
        UploadMetadata::new(uploader, "sem4.pdf", uploaded_at)
    }

    #[test]
    fn stores_successful_outcomes_with_sequential_ids() {
        let mut store = MemoryStore::default();
        let first = store
            .store(&outcome(true), metadata("faculty-17"))
            .expect("store should accept");
        let second = store
            .store(&outcome(true), metadata("faculty-17"))
            .expect("store should accept");
        assert_eq!(first.to_string(), "rec-000001");
        assert_eq!(second.to_string(), "rec-000002");

        let stored = store.get(first).expect("record should exist");
        assert_eq!(stored.rows[0].get("GRADE"), Some("A"));
        assert_eq!(stored.metadata.filename, "sem4.pdf");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn rejects_unsuccessful_outcomes_and_blank_uploaders() {
        let mut store = MemoryStore::default();
        assert!(matches!(
            store.store(&outcome(false), metadata("faculty-17")),
            Err(StoreError::Unsuccessful)
        ));
        assert!(matches!(
            store.store(&outcome(true), metadata("  ")),
            Err(StoreError::InvalidMetadata(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn metadata_serializes_camel_case() {
        let json = serde_json::to_value(metadata("faculty-17")).expect("metadata should serialize");
        assert_eq!(json["uploadedAt"], "2024-05-01T09:30:00Z");
        assert_eq!(json["uploader"], "faculty-17");
    }
}
