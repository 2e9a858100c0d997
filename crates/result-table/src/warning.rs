use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueCode {
    LowConfidence,
    HeaderInferenceLowConfidence,
    BoilerplateRemoved,
    EmptyRowDropped,
    AmbiguousMapping,
    SourceFallback,
    TextFallback,
    NoTablesDetected,
}

impl IssueCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LowConfidence => "low_confidence",
            Self::HeaderInferenceLowConfidence => "header_inference_low_confidence",
            Self::BoilerplateRemoved => "boilerplate_removed",
            Self::EmptyRowDropped => "empty_row_dropped",
            Self::AmbiguousMapping => "ambiguous_mapping",
            Self::SourceFallback => "source_fallback",
            Self::TextFallback => "text_fallback",
            Self::NoTablesDetected => "no_tables_detected",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub code: IssueCode,
    pub message: String,
    pub page: Option<u32>,
    pub row: Option<usize>,
    pub confidence: Option<f32>,
}

impl Issue {
    #[must_use]
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            page: None,
            row: None,
            confidence: None,
        }
    }

    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

impl Display for Issue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code.as_str())?;
        if let Some(page) = self.page {
            write!(f, " page={page}")?;
        }
        if let Some(row) = self.row {
            write!(f, " row={row}")?;
        }
        if let Some(confidence) = self.confidence {
            write!(f, " confidence={confidence:.2}")?;
        }
        write!(f, ": {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::{Issue, IssueCode};

    #[test]
    fn renders_context_fields_in_order() {
        let issue = Issue::new(IssueCode::EmptyRowDropped, "row has no values")
            .with_page(2)
            .with_row(7);
        assert_eq!(
            issue.to_string(),
            "empty_row_dropped page=2 row=7: row has no values"
        );
    }
}
