use tracing::debug;

use crate::classify::{has_repeated_header_keyword, is_purely_numeric};
use crate::header::{generic_headers, header_score};
use crate::model::{
    PageBreakdown, PageLabel, PageRows, PageTable, StructuredRow, TableMetadata, TableOrigin,
};
use crate::options::HeaderMode;
use crate::table_parse::normalize_rows;

const FIRST_PAGE_HEADER_SCAN: usize = 3;
const FIRST_PAGE_HEADER_THRESHOLD: f32 = 0.6;
const DETECTED_HEADER_CONFIDENCE: f32 = 0.8;
const MISSING_HEADER_CONFIDENCE: f32 = 0.3;

struct PageSplit<'a> {
    header: Option<&'a StructuredRow>,
    data: &'a [StructuredRow],
    skipped: usize,
}

impl<'a> PageSplit<'a> {
    fn all_data(rows: &'a [StructuredRow]) -> Self {
        Self {
            header: None,
            data: rows,
            skipped: 0,
        }
    }
}

fn split_first_page(rows: &[StructuredRow], mode: HeaderMode) -> PageSplit<'_> {
    match mode {
        HeaderMode::AutoDetect => {}
        HeaderMode::HasHeader if !rows.is_empty() => {
            return PageSplit {
                header: Some(&rows[0]),
                data: &rows[1..],
                skipped: 1,
            };
        }
        HeaderMode::HasHeader | HeaderMode::NoHeader => return PageSplit::all_data(rows),
    }

    let mut best: Option<(usize, f32)> = None;
    for (index, row) in rows.iter().take(FIRST_PAGE_HEADER_SCAN).enumerate() {
        let score = header_score(row);
        if score > FIRST_PAGE_HEADER_THRESHOLD && best.is_none_or(|(_, top)| score > top) {
            best = Some((index, score));
        }
    }

    match best {
        Some((index, _)) => PageSplit {
            header: Some(&rows[index]),
            data: &rows[index + 1..],
            skipped: index + 1,
        },
        None => PageSplit::all_data(rows),
    }
}

pub(crate) fn is_repeated_header(row: &[String]) -> bool {
    let joined = row.join(" ");
    has_repeated_header_keyword(&joined) && row.iter().all(|cell| !is_purely_numeric(cell))
}

fn split_later_page(rows: &[StructuredRow], mode: HeaderMode) -> PageSplit<'_> {
    match rows.first() {
        Some(first) if mode != HeaderMode::NoHeader && is_repeated_header(first) => PageSplit {
            header: Some(first),
            data: &rows[1..],
            skipped: 1,
        },
        _ => PageSplit::all_data(rows),
    }
}

fn filled_width(row: &[String]) -> usize {
    row.iter()
        .rposition(|cell| !cell.trim().is_empty())
        .map_or(0, |index| index + 1)
}

// `HasHeader` forces the first row of page one; `NoHeader` keeps every row as data.
#[must_use]
pub fn consolidate_pages(pages: &[PageRows], mode: HeaderMode) -> PageTable {
    let mut master: Option<&StructuredRow> = None;
    let mut data_rows: Vec<StructuredRow> = Vec::new();
    let mut page_breakdown = Vec::new();

    for (position, page) in pages.iter().enumerate() {
        let split = if position == 0 {
            split_first_page(&page.rows, mode)
        } else {
            split_later_page(&page.rows, mode)
        };

        if let Some(header) = split.header
            && master.is_none_or(|current| filled_width(header) > filled_width(current))
        {
            master = Some(header);
        }

        page_breakdown.push(PageBreakdown {
            page: page.page,
            rows: split.data.len(),
            header_detected: split.header.is_some(),
            skipped_header_rows: split.skipped,
        });
        data_rows.extend(split.data.iter().cloned());
    }

    let data_width = data_rows.iter().map(|row| filled_width(row)).max().unwrap_or(0);
    let (mut headers, confidence) = match master {
        Some(header) => (
            header.iter().map(|cell| cell.trim().to_string()).collect::<Vec<_>>(),
            DETECTED_HEADER_CONFIDENCE,
        ),
        None => (generic_headers(data_width), MISSING_HEADER_CONFIDENCE),
    };
    let width = filled_width(&headers).max(data_width);
    headers.truncate(width);
    while headers.len() < width {
        headers.push(format!("Column {}", headers.len() + 1));
    }
    for (index, header) in headers.iter_mut().enumerate() {
        if header.is_empty() {
            *header = format!("Column {}", index + 1);
        }
    }

    let rows = normalize_rows(
        &data_rows
            .into_iter()
            .map(|mut row| {
                row.truncate(width);
                row
            })
            .collect::<Vec<_>>(),
        width,
    );

    debug!(
        pages = pages.len(),
        rows = rows.len(),
        columns = width,
        header_detected = master.is_some(),
        "consolidated multi-page table"
    );

    let origin = pages.first().map_or(TableOrigin::Geometric, |page| page.origin);
    PageTable {
        page: PageLabel::Combined,
        metadata: TableMetadata {
            column_count: width,
            row_count: rows.len(),
            header_detected: master.is_some(),
            confidence,
            page_breakdown,
        },
        headers,
        rows,
        origin,
    }
}

#[cfg(test)]
mod tests {
    use super::{consolidate_pages, is_repeated_header};
    use crate::model::{PageLabel, PageRows, TableOrigin};
    use crate::options::HeaderMode;

    fn page(number: u32, data: &[&[&str]]) -> PageRows {
        PageRows {
            page: number,
            rows: data
                .iter()
                .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
                .collect(),
            lines: Vec::new(),
            origin: TableOrigin::Geometric,
            boilerplate_removed: 0,
        }
    }

    #[test]
    fn skips_repeated_header_on_later_pages() {
        let pages = vec![
            page(1, &[&["ROLL", "NAME", "GRADE"], &["101", "JOHN SMITH", "A"], &["102", "JANE DOE", "B"]]),
            page(2, &[&["ROLL", "NAME", "GRADE"], &["103", "RAVI KUMAR", "C"]]),
        ];
        let table = consolidate_pages(&pages, HeaderMode::AutoDetect);
        assert_eq!(table.page, PageLabel::Combined);
        assert_eq!(table.headers, vec!["ROLL", "NAME", "GRADE"]);
        assert_eq!(table.rows.len(), 3);
        assert!(table.rows.iter().all(|row| row[0] != "ROLL"));
        assert_eq!(table.metadata.page_breakdown[0].rows, 2);
        assert_eq!(table.metadata.page_breakdown[1].rows, 1);
        assert_eq!(table.metadata.page_breakdown[1].skipped_header_rows, 1);
        assert!((table.metadata.confidence - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn pads_every_row_to_master_width() {
        let pages = vec![
            page(1, &[&["REG NO", "NAME"], &["1001", "Jane Doe"]]),
            page(2, &[&["1002", "John Roe", "A"]]),
        ];
        let table = consolidate_pages(&pages, HeaderMode::AutoDetect);
        assert_eq!(table.headers, vec!["REG NO", "NAME", "Column 3"]);
        assert!(table.rows.iter().all(|row| row.len() == table.headers.len()));
        assert_eq!(table.rows[0], vec!["1001", "Jane Doe", ""]);
    }

    #[test]
    fn synthesizes_headers_when_none_detected() {
        let pages = vec![
            page(1, &[&["1", "2"], &["3", "4"]]),
            page(2, &[&["5", "6"]]),
        ];
        let table = consolidate_pages(&pages, HeaderMode::AutoDetect);
        assert_eq!(table.headers, vec!["Column 1", "Column 2"]);
        assert_eq!(table.rows.len(), 3);
        assert!((table.metadata.confidence - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn no_header_mode_keeps_every_row() {
        let pages = vec![
            page(1, &[&["ROLL", "NAME"], &["101", "JOHN SMITH"]]),
            page(2, &[&["ROLL", "NAME"], &["102", "JANE DOE"]]),
        ];
        let table = consolidate_pages(&pages, HeaderMode::NoHeader);
        assert_eq!(table.headers, vec!["Column 1", "Column 2"]);
        assert_eq!(table.rows.len(), 4);
        assert!(!table.metadata.header_detected);
    }

    #[test]
    fn numeric_first_rows_are_not_repeated_headers() {
        let row = |cells: &[&str]| cells.iter().map(|c| (*c).to_string()).collect::<Vec<_>>();
        assert!(is_repeated_header(&row(&["Reg No", "Name"])));
        assert!(!is_repeated_header(&row(&["Name", "12"])));
        assert!(!is_repeated_header(&row(&["Ravi", "Kumar"])));
    }
}
