use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::ReconstructError;
use crate::model::TextFragment;

pub const DEFAULT_ROW_TOLERANCE: f64 = 1.5;
pub const DEFAULT_COLUMN_TOLERANCE: f64 = 5.0;
pub const DEFAULT_MIN_TABLE_SCORE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMode {
    AutoDetect,
    HasHeader,
    NoHeader,
}

impl FromStr for HeaderMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" | "auto-detect" => Ok(Self::AutoDetect),
            "first" | "has-header" => Ok(Self::HasHeader),
            "none" | "no-header" => Ok(Self::NoHeader),
            other => Err(format!(
                "invalid header mode '{other}', expected auto, first or none"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityMode {
    BestEffort,
    Strict,
    SkipAmbiguous,
}

impl FromStr for QualityMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "best-effort" => Ok(Self::BestEffort),
            "strict" => Ok(Self::Strict),
            "skip-ambiguous" => Ok(Self::SkipAmbiguous),
            other => Err(format!(
                "invalid quality mode '{other}', expected best-effort, strict or skip-ambiguous"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowGrouping {
    Greedy,
    Sorted,
}

impl FromStr for RowGrouping {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "greedy" => Ok(Self::Greedy),
            "sorted" => Ok(Self::Sorted),
            other => Err(format!(
                "invalid row grouping '{other}', expected greedy or sorted"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    pages: BTreeSet<u32>,
}

impl PageSelection {
    #[must_use]
    pub fn contains(&self, page: u32) -> bool {
        self.pages.contains(&page)
    }
}

impl FromStr for PageSelection {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut pages = BTreeSet::new();
        for token in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some((start, end)) = token.split_once('-') {
                let start: u32 = start
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid page range start: '{start}'"))?;
                let end: u32 = end
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid page range end: '{end}'"))?;
                if start == 0 || end == 0 {
                    return Err("pages are 1-based".to_string());
                }
                if end < start {
                    return Err(format!(
                        "invalid range '{token}': end is smaller than start"
                    ));
                }
                pages.extend(start..=end);
            } else {
                let page: u32 = token
                    .parse()
                    .map_err(|_| format!("invalid page number: '{token}'"))?;
                if page == 0 {
                    return Err("pages are 1-based".to_string());
                }
                pages.insert(page);
            }
        }

        if pages.is_empty() {
            return Err("page selection cannot be empty".to_string());
        }

        Ok(Self { pages })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableArea {
    pub page: u32,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl TableArea {
    #[must_use]
    pub fn contains(&self, fragment: &TextFragment) -> bool {
        fragment.page == self.page
            && (self.x1..=self.x2).contains(&fragment.x)
            && (self.y1..=self.y2).contains(&fragment.y)
    }
}

impl FromStr for TableArea {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (page_part, rect_part) = raw
            .split_once(':')
            .ok_or_else(|| format!("invalid area format '{raw}', expected page:x1,y1,x2,y2"))?;

        let page: u32 = page_part
            .trim()
            .parse()
            .map_err(|_| format!("invalid page number in area: '{page_part}'"))?;

        if page == 0 {
            return Err("area page number must be >= 1".to_string());
        }

        let parts = rect_part.split(',').map(str::trim).collect::<Vec<_>>();
        if parts.len() != 4 {
            return Err(format!(
                "invalid area format '{raw}', expected exactly 4 coordinates"
            ));
        }

        let mut coords = [0.0_f64; 4];
        for (slot, (name, raw)) in coords
            .iter_mut()
            .zip(["x1", "y1", "x2", "y2"].iter().zip(parts.iter()))
        {
            *slot = raw
                .parse()
                .map_err(|_| format!("invalid {name} coordinate: '{raw}'"))?;
        }
        let [x1, y1, x2, y2] = coords;

        if x2 <= x1 || y2 <= y1 {
            return Err("area requires x2>x1 and y2>y1".to_string());
        }

        Ok(Self {
            page,
            x1,
            y1,
            x2,
            y2,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructOptions {
    pub pages: Option<PageSelection>,
    pub areas: Vec<TableArea>,
    pub row_tolerance: f64,
    pub column_tolerance: f64,
    pub row_grouping: RowGrouping,
    pub header_mode: HeaderMode,
    pub quality_mode: QualityMode,
    pub min_table_score: f32,
    pub min_cols: usize,
    pub filter_boilerplate: bool,
    pub restructure_results: bool,
}

impl ReconstructOptions {
    pub fn validate(&self) -> Result<(), ReconstructError> {
        if !(self.row_tolerance.is_finite() && self.row_tolerance >= 0.0) {
            return Err(ReconstructError::InvalidOption(
                "row_tolerance must be a non-negative number".to_string(),
            ));
        }
        if !(self.column_tolerance.is_finite() && self.column_tolerance >= 0.0) {
            return Err(ReconstructError::InvalidOption(
                "column_tolerance must be a non-negative number".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_table_score) {
            return Err(ReconstructError::InvalidOption(
                "min_table_score must be within 0..=1".to_string(),
            ));
        }
        if self.min_cols < 2 {
            return Err(ReconstructError::InvalidOption(
                "min_cols must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self {
            pages: None,
            areas: Vec::new(),
            row_tolerance: DEFAULT_ROW_TOLERANCE,
            column_tolerance: DEFAULT_COLUMN_TOLERANCE,
            row_grouping: RowGrouping::Greedy,
            header_mode: HeaderMode::AutoDetect,
            quality_mode: QualityMode::BestEffort,
            min_table_score: DEFAULT_MIN_TABLE_SCORE,
            min_cols: 2,
            filter_boilerplate: true,
            restructure_results: true,
        }
    }
}
