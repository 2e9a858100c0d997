use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

// Coordinates are PDF points, origin top-left, y growing downward.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub text: String,
}

impl TextFragment {
    #[must_use]
    pub fn new(page: u32, x: f64, y: f64, text: impl Into<String>) -> Self {
        Self {
            page,
            x,
            y,
            width: 0.0,
            height: 0.0,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub(crate) fn right(&self) -> f64 {
        self.x + self.width
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageFragments {
    pub page_number: u32,
    pub fragments: Vec<TextFragment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowGroup {
    pub y_key: f64,
    pub fragments: Vec<TextFragment>,
}

impl RowGroup {
    pub(crate) fn joined_text(&self) -> String {
        self.fragments
            .iter()
            .map(|fragment| fragment.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub type StructuredRow = Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TableOrigin {
    Geometric,
    TextFallback,
    External,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageRows {
    pub page: u32,
    pub rows: Vec<StructuredRow>,
    pub lines: Vec<String>,
    pub origin: TableOrigin,
    pub boilerplate_removed: usize,
}

impl PageRows {
    #[must_use]
    pub fn external(page: u32, rows: Vec<StructuredRow>) -> Self {
        Self {
            page,
            rows,
            lines: Vec::new(),
            origin: TableOrigin::External,
            boilerplate_removed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLabel {
    Page(u32),
    Combined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageBreakdown {
    pub page: u32,
    pub rows: usize,
    pub header_detected: bool,
    pub skipped_header_rows: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableMetadata {
    pub column_count: usize,
    pub row_count: usize,
    pub header_detected: bool,
    pub confidence: f32,
    pub page_breakdown: Vec<PageBreakdown>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageTable {
    pub page: PageLabel,
    pub headers: Vec<String>,
    pub rows: Vec<StructuredRow>,
    pub origin: TableOrigin,
    pub metadata: TableMetadata,
}

impl PageTable {
    #[must_use]
    pub fn is_combined(&self) -> bool {
        self.page == PageLabel::Combined
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    entries: Vec<(String, String)>,
}

impl Record {
    #[must_use]
    pub fn from_row(headers: &[String], row: &[String]) -> Self {
        let entries = headers
            .iter()
            .enumerate()
            .map(|(index, header)| {
                (
                    header.clone(),
                    row.get(index).cloned().unwrap_or_default(),
                )
            })
            .collect();
        Self { entries }
    }

    #[must_use]
    pub fn get(&self, header: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == header)
            .map(|(_, value)| value.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeMetadata {
    pub confidence: f32,
    pub total_rows: usize,
    pub column_count: usize,
    pub is_multi_page: bool,
    pub origin: TableOrigin,
    pub exam_result: bool,
    pub page_breakdown: Vec<PageBreakdown>,
    pub issues: Vec<String>,
    pub ambiguous_rows: Vec<usize>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconstructOutcome {
    pub success: bool,
    pub headers: Vec<String>,
    pub rows: Vec<Record>,
    pub metadata: OutcomeMetadata,
}

impl ReconstructOutcome {
    #[must_use]
    pub fn row_values(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|record| record.values().map(str::to_string).collect())
            .collect()
    }
}
