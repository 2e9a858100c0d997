use crate::model::{PageTable, StructuredRow};

pub(crate) const LOW_CONFIDENCE_THRESHOLD: f32 = 0.60;

const CONSISTENCY_WEIGHT: f32 = 0.6;
const DATA_QUALITY_WEIGHT: f32 = 0.4;

#[must_use]
pub fn row_consistency(rows: &[StructuredRow]) -> f32 {
    if rows.len() < 2 {
        return 0.0;
    }

    let lengths = rows
        .iter()
        .map(|row| row.iter().filter(|cell| !cell.trim().is_empty()).count() as f32)
        .collect::<Vec<_>>();
    let count = lengths.len() as f32;
    let mean = lengths.iter().sum::<f32>() / count;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance = lengths
        .iter()
        .map(|length| (length - mean).powi(2))
        .sum::<f32>()
        / count;

    (1.0 - variance / mean).clamp(0.0, 1.0)
}

#[must_use]
pub fn data_quality(rows: &[StructuredRow]) -> f32 {
    if rows.is_empty() {
        return 0.0;
    }
    let filled = rows
        .iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .count();
    filled as f32 / rows.len() as f32
}

#[must_use]
pub fn table_score(table: &PageTable) -> f32 {
    CONSISTENCY_WEIGHT * row_consistency(&table.rows)
        + DATA_QUALITY_WEIGHT * data_quality(&table.rows)
}

#[must_use]
pub fn select_best(candidates: &[PageTable]) -> Option<(usize, f32)> {
    if let Some(index) = candidates.iter().position(PageTable::is_combined) {
        return Some((index, table_score(&candidates[index])));
    }

    candidates
        .iter()
        .enumerate()
        .filter(|(_, table)| !table.rows.is_empty())
        .map(|(index, table)| (index, table_score(table)))
        .fold(None, |best: Option<(usize, f32)>, (index, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((index, score)),
        })
}

#[cfg(test)]
mod tests {
    use super::{data_quality, row_consistency, select_best, table_score};
    use crate::model::{PageLabel, PageTable, TableMetadata, TableOrigin};

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
            .collect()
    }

    fn table(page: PageLabel, data: &[&[&str]]) -> PageTable {
        let rows = rows(data);
        PageTable {
            page,
            headers: Vec::new(),
            metadata: TableMetadata {
                column_count: rows.first().map_or(0, Vec::len),
                row_count: rows.len(),
                header_detected: false,
                confidence: 0.0,
                page_breakdown: Vec::new(),
            },
            rows,
            origin: TableOrigin::Geometric,
        }
    }

    #[test]
    fn uniform_rows_are_fully_consistent() {
        let data = rows(&[&["1", "a"], &["2", "b"]]);
        assert!((row_consistency(&data) - 1.0).abs() < f32::EPSILON);
        assert!((data_quality(&data) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn single_row_tables_have_zero_consistency() {
        let single = table(PageLabel::Page(1), &[&["1", "a"]]);
        assert!((table_score(&single) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn ragged_rows_lose_consistency() {
        let data = rows(&[&["1", "a", "x"], &["2", "", ""], &["", "", ""]]);
        assert!(row_consistency(&data) < 0.5);
        assert!((data_quality(&data) - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn combined_table_is_preferred_outright() {
        let candidates = vec![
            table(PageLabel::Page(1), &[&["1", "a"], &["2", "b"]]),
            table(PageLabel::Combined, &[&["1", ""], &["", "b"], &["3", "c"]]),
        ];
        assert_eq!(select_best(&candidates).map(|(index, _)| index), Some(1));
    }

    #[test]
    fn highest_score_wins_and_empty_tables_are_ineligible() {
        let candidates = vec![
            table(PageLabel::Page(1), &[]),
            table(PageLabel::Page(2), &[&["1", "a"]]),
            table(PageLabel::Page(3), &[&["1", "a"], &["2", "b"]]),
        ];
        assert_eq!(select_best(&candidates).map(|(index, _)| index), Some(2));
        assert_eq!(select_best(&[table(PageLabel::Page(1), &[])]), None);
    }
}
