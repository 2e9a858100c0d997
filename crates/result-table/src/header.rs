use crate::classify::has_header_keyword;
use crate::model::StructuredRow;
use crate::options::HeaderMode;

const HEADER_THRESHOLD: f32 = 0.5;
const FIRST_ROW_FALLBACK_THRESHOLD: f32 = 0.3;

#[must_use]
pub fn header_score(row: &[String]) -> f32 {
    if row.is_empty() {
        return 0.0;
    }

    let total = row
        .iter()
        .map(|cell| {
            let cell = cell.trim();
            let mut score = 0.0_f32;
            if has_header_keyword(cell) {
                score += 2.0;
            }
            if !cell.starts_with(|ch: char| ch.is_ascii_digit()) {
                score += 1.0;
            }
            if cell.chars().count() < 20 {
                score += 0.5;
            }
            if cell.starts_with(char::is_uppercase) {
                score += 0.5;
            }
            score
        })
        .sum::<f32>();

    total / row.len() as f32
}

#[must_use]
pub fn generic_headers(count: usize) -> Vec<String> {
    (1..=count).map(|index| format!("Column {index}")).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderSplit {
    pub headers: Vec<String>,
    pub data_rows: Vec<StructuredRow>,
    pub header_detected: bool,
    pub discarded_rows: usize,
}

fn width_of(rows: &[StructuredRow]) -> usize {
    rows.iter().map(Vec::len).max().unwrap_or(0)
}

fn synthesized(rows: &[StructuredRow]) -> HeaderSplit {
    HeaderSplit {
        headers: generic_headers(width_of(rows)),
        data_rows: rows.to_vec(),
        header_detected: false,
        discarded_rows: 0,
    }
}

fn header_at(rows: &[StructuredRow], index: usize) -> HeaderSplit {
    HeaderSplit {
        headers: rows[index].iter().map(|cell| cell.trim().to_string()).collect(),
        data_rows: rows[index + 1..].to_vec(),
        header_detected: true,
        discarded_rows: index,
    }
}

#[must_use]
pub fn split_header(rows: &[StructuredRow]) -> HeaderSplit {
    if rows.is_empty() {
        return synthesized(rows);
    }

    let mut best_index = 0;
    let mut best_score = f32::MIN;
    for (index, row) in rows.iter().enumerate() {
        let score = header_score(row);
        if score > best_score {
            best_score = score;
            best_index = index;
        }
    }

    if best_score > HEADER_THRESHOLD {
        return header_at(rows, best_index);
    }

    if header_score(&rows[0]) > FIRST_ROW_FALLBACK_THRESHOLD {
        return header_at(rows, 0);
    }

    synthesized(rows)
}

#[must_use]
pub fn apply_header_mode(rows: &[StructuredRow], mode: HeaderMode) -> HeaderSplit {
    match mode {
        HeaderMode::AutoDetect => split_header(rows),
        HeaderMode::HasHeader if !rows.is_empty() => header_at(rows, 0),
        HeaderMode::HasHeader | HeaderMode::NoHeader => synthesized(rows),
    }
}
