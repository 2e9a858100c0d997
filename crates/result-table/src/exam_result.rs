use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::classify::{
    FieldKind, has_exam_keyword, has_long_number, has_three_word_name, is_grade, is_marks,
    is_registration_number, is_serial_number, is_strict_subject_code, is_student_name,
    is_subject_code,
};
use crate::model::StructuredRow;

const SAMPLE_ROWS: usize = 10;

const HEADER_KIND_ORDER: [FieldKind; 6] = [
    FieldKind::SerialNumber,
    FieldKind::RegistrationNumber,
    FieldKind::StudentName,
    FieldKind::SubjectCode,
    FieldKind::Grade,
    FieldKind::Marks,
];

#[derive(Debug, Clone, PartialEq)]
pub struct RestructuredTable {
    pub headers: Vec<String>,
    pub rows: Vec<StructuredRow>,
    pub ambiguous_rows: Vec<usize>,
    pub renamed_headers: usize,
}

#[must_use]
pub fn looks_like_exam_result(headers: &[String], rows: &[StructuredRow]) -> bool {
    let sample = &rows[..rows.len().min(SAMPLE_ROWS)];
    let mut text = headers.join(" ");
    for row in sample {
        text.push(' ');
        text.push_str(&row.join(" "));
    }
    if !has_exam_keyword(&text) {
        return false;
    }

    sample.iter().any(|row| {
        row.iter().any(|cell| has_long_number(cell)) || has_three_word_name(&row.join(" "))
    })
}

fn is_numeric_subject_code(value: &str) -> bool {
    (4..=6).contains(&value.len())
        && value.chars().all(|ch| ch.is_ascii_digit())
        && !is_registration_number(value)
}

fn matches_kind(kind: FieldKind, value: &str, strict_codes: bool) -> bool {
    match kind {
        FieldKind::SerialNumber => is_serial_number(value),
        FieldKind::RegistrationNumber => is_registration_number(value),
        FieldKind::StudentName => is_student_name(value),
        FieldKind::SubjectCode => {
            let code = if strict_codes {
                is_strict_subject_code(value)
            } else {
                is_subject_code(value)
            };
            code || is_numeric_subject_code(value)
        }
        FieldKind::Grade => is_grade(value),
        FieldKind::Marks => is_marks(value),
        FieldKind::Other => false,
    }
}

fn bucket_kind(position: usize, value: &str, strict_codes: bool) -> FieldKind {
    if position == 0 && is_serial_number(value) {
        return FieldKind::SerialNumber;
    }
    [
        FieldKind::RegistrationNumber,
        FieldKind::StudentName,
        FieldKind::SubjectCode,
        FieldKind::Grade,
        FieldKind::Marks,
    ]
    .into_iter()
    .find(|kind| matches_kind(*kind, value, strict_codes))
    .unwrap_or(FieldKind::Other)
}

#[must_use]
pub fn header_kind(header: &str) -> FieldKind {
    let lowered = header.to_lowercase();
    HEADER_KIND_ORDER
        .into_iter()
        .find(|kind| {
            kind.header_keywords()
                .iter()
                .any(|keyword| lowered.contains(keyword))
        })
        .unwrap_or(FieldKind::Other)
}

#[must_use]
pub fn improve_headers(headers: &[String], rows: &[StructuredRow], strict_codes: bool) -> Vec<String> {
    let mut improved = headers.to_vec();

    for column in 0..headers.len() {
        let sample = rows
            .iter()
            .filter_map(|row| row.get(column))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .take(SAMPLE_ROWS)
            .collect::<Vec<_>>();
        if sample.is_empty() {
            continue;
        }

        let mut candidates = vec![
            FieldKind::RegistrationNumber,
            FieldKind::SubjectCode,
            FieldKind::Grade,
            FieldKind::StudentName,
        ];
        if column == 0 {
            candidates.push(FieldKind::SerialNumber);
        }
        candidates.push(FieldKind::Marks);

        let Some(kind) = candidates.into_iter().find(|kind| {
            sample
                .iter()
                .all(|value| matches_kind(*kind, value, strict_codes))
        }) else {
            continue;
        };

        let lowered = improved[column].to_lowercase();
        let mentioned = kind
            .header_keywords()
            .iter()
            .any(|keyword| lowered.contains(keyword));
        let label = kind.canonical_label();
        if !mentioned && !improved.iter().any(|header| header == label) {
            improved[column] = label.to_string();
        }
    }

    improved
}

fn take_preferring(queue: &mut VecDeque<(usize, &str)>, column: usize) -> Option<String> {
    let index = queue
        .iter()
        .position(|(position, _)| *position == column)
        .unwrap_or(0);
    queue.remove(index).map(|(_, value)| value.to_string())
}

#[must_use]
pub fn remap_row(headers: &[String], row: &[String], strict_codes: bool) -> (StructuredRow, bool) {
    let mut buckets: HashMap<FieldKind, VecDeque<(usize, &str)>> = HashMap::new();
    let mut other: Vec<(usize, &str)> = Vec::new();
    for (position, value) in row.iter().enumerate() {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match bucket_kind(position, value, strict_codes) {
            FieldKind::Other => other.push((position, value)),
            kind => buckets.entry(kind).or_default().push_back((position, value)),
        }
    }

    let mut out = vec![String::new(); headers.len()];
    for (column, header) in headers.iter().enumerate() {
        if let Some(value) = buckets
            .get_mut(&header_kind(header))
            .and_then(|queue| take_preferring(queue, column))
        {
            out[column] = value;
        }
    }

    let mut remaining = other;
    remaining.extend(buckets.into_values().flatten());
    remaining.sort_by_key(|(position, _)| *position);

    let mut displaced = VecDeque::new();
    for (position, value) in remaining {
        match out.get_mut(position) {
            Some(slot) if slot.is_empty() => *slot = value.to_string(),
            _ => displaced.push_back(value),
        }
    }

    let ambiguous = !displaced.is_empty();
    for slot in out.iter_mut().filter(|slot| slot.is_empty()) {
        match displaced.pop_front() {
            Some(value) => *slot = value.to_string(),
            None => break,
        }
    }

    (out, ambiguous)
}

#[must_use]
pub fn restructure_exam_table(
    headers: &[String],
    rows: &[StructuredRow],
    strict_codes: bool,
) -> Option<RestructuredTable> {
    if !looks_like_exam_result(headers, rows) {
        return None;
    }

    let improved = improve_headers(headers, rows, strict_codes);
    let renamed_headers = improved
        .iter()
        .zip(headers)
        .filter(|(new, old)| new != old)
        .count();

    let mut ambiguous_rows = Vec::new();
    let remapped = rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let (out, ambiguous) = remap_row(&improved, row, strict_codes);
            if ambiguous {
                ambiguous_rows.push(index);
            }
            out
        })
        .collect::<Vec<_>>();

    debug!(
        rows = remapped.len(),
        renamed_headers,
        ambiguous = ambiguous_rows.len(),
        "restructured exam result table"
    );

    Some(RestructuredTable {
        headers: improved,
        rows: remapped,
        ambiguous_rows,
        renamed_headers,
    })
}
