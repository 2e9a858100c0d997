mod classify;
mod columns;
mod csv_out;
mod error;
mod exam_result;
mod header;
mod merge;
mod model;
mod options;
mod pdf_reader;
mod quality;
mod rows;
mod source;
mod store;
mod table_detect;
mod table_parse;
mod warning;

use tracing::{debug, warn};

use crate::header::apply_header_mode;
use crate::merge::consolidate_pages;
use crate::quality::{LOW_CONFIDENCE_THRESHOLD, select_best, table_score};
use crate::source::{GeometricSource, collect_page_rows};
use crate::table_detect::text_fallback_table;
use crate::warning::{Issue, IssueCode};

pub use classify::{
    FieldKind, classify_value, clean_text, is_boilerplate, is_grade, is_marks,
    is_registration_number, is_strict_subject_code, is_student_name, is_subject_code,
    merge_cell_text,
};
pub use columns::{CellAssignment, assign_to_columns, detect_column_boundaries};
pub use csv_out::{outcome_to_csv_string, write_outcome_csv};
pub use error::{ExtractionError, ReconstructError, SoftError, StoreError};
pub use exam_result::{RestructuredTable, restructure_exam_table};
pub use header::{HeaderSplit, header_score, split_header};
pub use merge::consolidate_pages as consolidate;
pub use model::{
    OutcomeMetadata, PageBreakdown, PageFragments, PageLabel, PageRows, PageTable,
    ReconstructOutcome, Record, RowGroup, StructuredRow, TableMetadata, TableOrigin, TextFragment,
};
pub use options::{
    HeaderMode, PageSelection, QualityMode, ReconstructOptions, RowGrouping, TableArea,
};
pub use pdf_reader::{
    ContentStreamExtractor, DefaultExtractor, FallbackExtractor, PositionedTextExtractor,
    TextExtractor, decode_fragment_text,
};
pub use quality::{data_quality, row_consistency};
pub use rows::group_rows;
pub use source::{PrecomputedSource, SourcedRows, TableSource, build_page_rows};
pub use store::{MemoryStore, RecordId, ResultStore, StoredRecord, UploadMetadata};
pub use warning::{Issue as RowIssue, IssueCode as RowIssueCode};

const DETECTED_HEADER_CONFIDENCE: f32 = 0.8;
const MISSING_HEADER_CONFIDENCE: f32 = 0.3;

pub fn reconstruct_table(
    pdf: &[u8],
    options: &ReconstructOptions,
) -> Result<ReconstructOutcome, ReconstructError> {
    reconstruct_with_extractor(&DefaultExtractor::default(), pdf, options)
}

pub fn reconstruct_with_extractor<E: TextExtractor + ?Sized>(
    extractor: &E,
    pdf: &[u8],
    options: &ReconstructOptions,
) -> Result<ReconstructOutcome, ReconstructError> {
    reconstruct_with_sources(&GeometricSource::new(extractor), None, pdf, options)
}

pub fn reconstruct_with_sources(
    primary: &dyn TableSource,
    alternate: Option<&dyn TableSource>,
    pdf: &[u8],
    options: &ReconstructOptions,
) -> Result<ReconstructOutcome, ReconstructError> {
    options.validate()?;
    let sourced = collect_page_rows(primary, alternate, pdf, options)?;

    let mut issues = Vec::new();
    if sourced.fell_back {
        warn!(
            primary = primary.name(),
            source = sourced.source,
            "primary table source unavailable, using alternate"
        );
        issues.push(Issue::new(
            IssueCode::SourceFallback,
            format!("rows supplied by alternate source '{}'", sourced.source),
        ));
    }
    reconstruct_pages(sourced.pages, options, issues)
}

pub fn reconstruct_fragments(
    pages: Vec<PageFragments>,
    options: &ReconstructOptions,
) -> Result<ReconstructOutcome, ReconstructError> {
    options.validate()?;
    let pages = source::select_pages(pages, options)?;
    let rows = pages
        .iter()
        .map(|page| build_page_rows(page, options))
        .collect();
    reconstruct_pages(rows, options, Vec::new())
}

fn page_candidate(page: &PageRows, mode: HeaderMode) -> PageTable {
    let split = apply_header_mode(&page.rows, mode);
    let width = split
        .headers
        .len()
        .max(split.data_rows.iter().map(Vec::len).max().unwrap_or(0));

    let mut headers = split.headers;
    headers.resize_with(width, String::new);
    for (index, header) in headers.iter_mut().enumerate() {
        if header.trim().is_empty() {
            *header = format!("Column {}", index + 1);
        }
    }
    let rows = split
        .data_rows
        .into_iter()
        .map(|mut row| {
            row.resize(width, String::new());
            row
        })
        .collect::<Vec<_>>();

    let confidence = if split.header_detected {
        DETECTED_HEADER_CONFIDENCE
    } else {
        MISSING_HEADER_CONFIDENCE
    };
    let skipped_header_rows = if split.header_detected {
        split.discarded_rows + 1
    } else {
        0
    };

    PageTable {
        page: PageLabel::Page(page.page),
        metadata: TableMetadata {
            column_count: width,
            row_count: rows.len(),
            header_detected: split.header_detected,
            confidence,
            page_breakdown: vec![PageBreakdown {
                page: page.page,
                rows: rows.len(),
                header_detected: split.header_detected,
                skipped_header_rows,
            }],
        },
        headers,
        rows,
        origin: page.origin,
    }
}

fn skip_ambiguous_pages(candidates: Vec<PageTable>, issues: &mut Vec<Issue>) -> Vec<PageTable> {
    candidates
        .into_iter()
        .filter(|table| {
            let score = table_score(table);
            if table.is_combined() || score >= LOW_CONFIDENCE_THRESHOLD {
                return true;
            }
            let mut issue = Issue::new(IssueCode::LowConfidence, "skipping low-scoring page table")
                .with_confidence(score);
            if let PageLabel::Page(page) = table.page {
                issue = issue.with_page(page);
            }
            issues.push(issue);
            false
        })
        .collect()
}

fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(headers.len());
    for header in headers {
        let mut label = header.clone();
        let mut suffix = 2;
        while seen.contains(&label) {
            label = format!("{header} ({suffix})");
            suffix += 1;
        }
        seen.push(label);
    }
    seen
}

fn empty_outcome(
    origin: TableOrigin,
    issues: &[Issue],
    mut errors: Vec<SoftError>,
) -> ReconstructOutcome {
    errors.push(SoftError::EmptyResult);
    ReconstructOutcome {
        success: false,
        headers: Vec::new(),
        rows: Vec::new(),
        metadata: OutcomeMetadata {
            confidence: 0.0,
            total_rows: 0,
            column_count: 0,
            is_multi_page: false,
            origin,
            exam_result: false,
            page_breakdown: Vec::new(),
            issues: issues.iter().map(ToString::to_string).collect(),
            ambiguous_rows: Vec::new(),
            errors: errors.iter().map(ToString::to_string).collect(),
        },
    }
}

fn reconstruct_pages(
    pages: Vec<PageRows>,
    options: &ReconstructOptions,
    mut issues: Vec<Issue>,
) -> Result<ReconstructOutcome, ReconstructError> {
    let mut errors = Vec::new();
    let default_origin = pages.first().map_or(TableOrigin::Geometric, |page| page.origin);
    let strict_codes = pages.iter().any(|page| page.origin == TableOrigin::External);

    for page in pages.iter().filter(|page| page.boilerplate_removed > 0) {
        issues.push(
            Issue::new(
                IssueCode::BoilerplateRemoved,
                format!("removed {} boilerplate row(s)", page.boilerplate_removed),
            )
            .with_page(page.page),
        );
    }

    let with_rows = pages
        .iter()
        .filter(|page| !page.rows.is_empty())
        .cloned()
        .collect::<Vec<_>>();
    let mut candidates = with_rows
        .iter()
        .map(|page| page_candidate(page, options.header_mode))
        .collect::<Vec<_>>();
    if with_rows.len() > 1 {
        candidates.push(consolidate_pages(&with_rows, options.header_mode));
    }
    if options.quality_mode == QualityMode::SkipAmbiguous {
        candidates = skip_ambiguous_pages(candidates, &mut issues);
    }

    let mut selected = select_best(&candidates);
    let consistent = selected.is_some_and(|(index, score)| {
        candidates[index].is_combined() || score >= options.min_table_score
    });
    if !consistent {
        let best_score = selected.map_or(0.0, |(_, score)| score);
        warn!(best_score, "no consistent table, trying text-line fallback");
        errors.push(SoftError::NoConsistentTable { best_score });
        if let Some(fallback) = text_fallback_table(&pages, options.min_cols, options.header_mode) {
            issues.push(
                Issue::new(IssueCode::TextFallback, "table recovered from text lines")
                    .with_confidence(fallback.metadata.confidence),
            );
            candidates.push(fallback);
            selected = select_best(&candidates);
        }
    }

    let Some((index, score)) = selected else {
        issues.push(Issue::new(
            IssueCode::NoTablesDetected,
            "no table rows were detected in the selected pages",
        ));
        return Ok(empty_outcome(default_origin, &issues, errors));
    };
    let table = candidates.swap_remove(index);
    debug!(
        page = ?table.page,
        score,
        rows = table.rows.len(),
        columns = table.headers.len(),
        "table selected"
    );

    if !table.metadata.header_detected {
        issues.push(Issue::new(
            IssueCode::HeaderInferenceLowConfidence,
            "no header row detected; generic column names used",
        ));
    }

    let mut headers = table.headers;
    let mut rows = table.rows;
    let mut ambiguous = Vec::new();
    let mut exam_result = false;
    if options.restructure_results
        && let Some(restructured) = restructure_exam_table(&headers, &rows, strict_codes)
    {
        exam_result = true;
        headers = restructured.headers;
        rows = restructured.rows;
        ambiguous = restructured.ambiguous_rows;
    }

    let headers = unique_headers(headers);
    let mut records = Vec::with_capacity(rows.len());
    let mut ambiguous_rows = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            issues.push(
                Issue::new(IssueCode::EmptyRowDropped, "row has no non-empty cells").with_row(index),
            );
            continue;
        }
        if ambiguous.contains(&index) {
            ambiguous_rows.push(records.len());
            issues.push(
                Issue::new(IssueCode::AmbiguousMapping, "row value moved out of its column")
                    .with_row(records.len()),
            );
        }
        records.push(Record::from_row(&headers, row));
    }

    let confidence = table.metadata.confidence;
    if confidence < LOW_CONFIDENCE_THRESHOLD {
        if options.quality_mode == QualityMode::Strict {
            return Err(ReconstructError::AmbiguousTable { confidence });
        }
        issues.push(
            Issue::new(IssueCode::LowConfidence, "table confidence is low")
                .with_confidence(confidence),
        );
    }

    if records.is_empty() {
        return Ok(empty_outcome(table.origin, &issues, errors));
    }

    Ok(ReconstructOutcome {
        success: true,
        metadata: OutcomeMetadata {
            confidence,
            total_rows: records.len(),
            column_count: headers.len(),
            is_multi_page: table.page == PageLabel::Combined,
            origin: table.origin,
            exam_result,
            page_breakdown: table.metadata.page_breakdown,
            issues: issues.iter().map(ToString::to_string).collect(),
            ambiguous_rows,
            errors: errors.iter().map(ToString::to_string).collect(),
        },
        headers,
        rows: records,
    })
}
