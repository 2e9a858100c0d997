use tracing::debug;

use crate::header::apply_header_mode;
use crate::model::{
    PageBreakdown, PageLabel, PageRows, PageTable, StructuredRow, TableMetadata, TableOrigin,
};
use crate::options::HeaderMode;
use crate::table_parse::{normalize_rows, soft_split_line_into_cells, split_line_into_cells};

// Stays under the 0.3 given to geometric tables without a header.
const TEXT_FALLBACK_WEIGHT: f32 = 0.25;

struct LineScan {
    rows: Vec<StructuredRow>,
    matched_lines: usize,
    non_empty_lines: usize,
}

fn line_cells(line: &str, min_cols: usize) -> Vec<String> {
    let mut cells = split_line_into_cells(line);
    if cells.len() < min_cols {
        let soft_cells = soft_split_line_into_cells(line);
        let has_numeric = soft_cells
            .iter()
            .any(|cell| cell.chars().any(|ch| ch.is_ascii_digit()));
        let looks_like_sentence = ['.', '!', '?']
            .iter()
            .any(|punctuation| line.trim_end().ends_with(*punctuation));
        if soft_cells.len() >= min_cols
            && !looks_like_sentence
            && (has_numeric || soft_cells.len() <= 6)
        {
            cells = soft_cells;
        }
    }
    cells
}

fn scan_lines(lines: &[String], min_cols: usize) -> LineScan {
    let mut scan = LineScan {
        rows: Vec::new(),
        matched_lines: 0,
        non_empty_lines: 0,
    };
    let mut block: Vec<StructuredRow> = Vec::new();

    let flush = |block: &mut Vec<StructuredRow>, scan: &mut LineScan| {
        if block.len() >= 2 {
            scan.matched_lines += block.len();
            scan.rows.append(block);
        } else {
            block.clear();
        }
    };

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        scan.non_empty_lines += 1;

        let cells = line_cells(line, min_cols);
        if cells.len() >= min_cols {
            block.push(cells);
        } else {
            flush(&mut block, &mut scan);
        }
    }
    flush(&mut block, &mut scan);

    scan
}

pub(crate) fn text_fallback_table(
    pages: &[PageRows],
    min_cols: usize,
    header_mode: HeaderMode,
) -> Option<PageTable> {
    let mut rows = Vec::new();
    let mut matched = 0;
    let mut non_empty = 0;
    let mut page_breakdown = Vec::new();

    for page in pages {
        let scan = scan_lines(&page.lines, min_cols);
        matched += scan.matched_lines;
        non_empty += scan.non_empty_lines;
        if scan.rows.is_empty() {
            continue;
        }
        page_breakdown.push(PageBreakdown {
            page: page.page,
            rows: scan.rows.len(),
            header_detected: false,
            skipped_header_rows: 0,
        });
        rows.extend(scan.rows);
    }

    if rows.is_empty() || non_empty == 0 {
        return None;
    }

    let first_page = page_breakdown.first().map_or(1, |entry| entry.page);
    let split = apply_header_mode(&rows, header_mode);
    let width = split
        .headers
        .len()
        .max(split.data_rows.iter().map(Vec::len).max().unwrap_or(0));
    let mut headers = split.headers;
    headers.resize_with(width, String::new);
    for (index, header) in headers.iter_mut().enumerate() {
        if header.is_empty() {
            *header = format!("Column {}", index + 1);
        }
    }
    let data_rows = normalize_rows(&split.data_rows, width);

    if split.header_detected
        && let Some(entry) = page_breakdown.first_mut()
    {
        entry.header_detected = true;
        entry.rows = entry.rows.saturating_sub(1 + split.discarded_rows);
    }

    let confidence = matched as f32 / non_empty as f32 * TEXT_FALLBACK_WEIGHT;
    debug!(
        matched,
        non_empty,
        rows = data_rows.len(),
        confidence,
        "text-line fallback table built"
    );

    Some(PageTable {
        page: PageLabel::Page(first_page),
        metadata: TableMetadata {
            column_count: width,
            row_count: data_rows.len(),
            header_detected: split.header_detected,
            confidence,
            page_breakdown,
        },
        headers,
        rows: data_rows,
        origin: TableOrigin::TextFallback,
    })
}
