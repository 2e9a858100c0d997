use std::cmp::Ordering;

use tracing::trace;

use crate::classify::{is_boilerplate, merge_cell_text};
use crate::model::{RowGroup, StructuredRow, TextFragment};

#[must_use]
pub fn detect_column_boundaries(fragments: &[TextFragment], tolerance: f64) -> Vec<f64> {
    let mut xs = fragments
        .iter()
        .map(|fragment| fragment.x)
        .filter(|x| x.is_finite())
        .collect::<Vec<_>>();
    xs.sort_by(|left, right| left.partial_cmp(right).unwrap_or(Ordering::Equal));
    xs.dedup();

    let mut boundaries: Vec<f64> = Vec::new();
    for x in xs {
        match boundaries.last() {
            Some(last) if x - last <= tolerance => {}
            _ => boundaries.push(x),
        }
    }
    boundaries
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellAssignment {
    pub cells: StructuredRow,
    pub out_of_tolerance: usize,
}

#[must_use]
pub fn assign_to_columns(row: &RowGroup, boundaries: &[f64], tolerance: f64) -> CellAssignment {
    if boundaries.is_empty() {
        return CellAssignment {
            cells: row
                .fragments
                .iter()
                .map(|fragment| fragment.text.trim().to_string())
                .collect(),
            out_of_tolerance: 0,
        };
    }

    let mut cells = vec![String::new(); boundaries.len()];
    let mut out_of_tolerance = 0;

    for fragment in &row.fragments {
        let (index, distance) = nearest_boundary(boundaries, fragment.x);
        if distance > tolerance {
            out_of_tolerance += 1;
            trace!(
                x = fragment.x,
                distance, "fragment outside column tolerance, using nearest boundary"
            );
        }
        cells[index] = merge_cell_text(&cells[index], &fragment.text);
    }

    CellAssignment {
        cells,
        out_of_tolerance,
    }
}

fn nearest_boundary(boundaries: &[f64], x: f64) -> (usize, f64) {
    boundaries
        .iter()
        .enumerate()
        .map(|(index, boundary)| (index, (boundary - x).abs()))
        .min_by(|left, right| left.1.partial_cmp(&right.1).unwrap_or(Ordering::Equal))
        .unwrap_or((0, f64::INFINITY))
}

#[must_use]
pub fn is_boilerplate_row(row: &RowGroup) -> bool {
    is_boilerplate(&row.joined_text())
}

#[cfg(test)]
mod tests {
    use super::{assign_to_columns, detect_column_boundaries, is_boilerplate_row};
    use crate::model::{RowGroup, TextFragment};

    fn row(cells: &[(f64, &str)]) -> RowGroup {
        RowGroup {
            y_key: 0.0,
            fragments: cells
                .iter()
                .map(|(x, text)| TextFragment::new(1, *x, 0.0, *text))
                .collect(),
        }
    }

    #[test]
    fn collapses_nearby_x_positions() {
        let fragments = [0.0, 2.0, 4.9, 100.0, 103.0, 200.0]
            .iter()
            .map(|x| TextFragment::new(1, *x, 0.0, "t"))
            .collect::<Vec<_>>();
        assert_eq!(detect_column_boundaries(&fragments, 5.0), vec![0.0, 100.0, 200.0]);
    }

    #[test]
    fn boundary_chain_starts_from_last_accepted_anchor() {
        let fragments = [0.0, 4.0, 8.0, 12.0]
            .iter()
            .map(|x| TextFragment::new(1, *x, 0.0, "t"))
            .collect::<Vec<_>>();
        assert_eq!(detect_column_boundaries(&fragments, 5.0), vec![0.0, 8.0]);
    }

    #[test]
    fn pads_missing_cells_and_merges_shared_ones() {
        let boundaries = vec![0.0, 100.0, 200.0];
        let assigned = assign_to_columns(
            &row(&[(0.0, "101"), (100.0, "JOHN"), (103.0, "SMITH")]),
            &boundaries,
            5.0,
        );
        assert_eq!(assigned.cells, vec!["101", "JOHN SMITH", ""]);
        assert_eq!(assigned.out_of_tolerance, 0);
    }

    #[test]
    fn never_drops_fragments_outside_tolerance() {
        let boundaries = vec![0.0, 100.0];
        let input = row(&[(0.0, "a"), (40.0, "b"), (180.0, "c")]);
        let assigned = assign_to_columns(&input, &boundaries, 5.0);
        let words = assigned
            .cells
            .iter()
            .map(|cell| cell.split_whitespace().count())
            .sum::<usize>();
        assert!(words >= input.fragments.len());
        assert_eq!(assigned.cells, vec!["a b", "c"]);
        assert_eq!(assigned.out_of_tolerance, 2);
    }

    #[test]
    fn without_boundaries_returns_raw_texts() {
        let assigned = assign_to_columns(&row(&[(0.0, " x "), (9.0, "y")]), &[], 5.0);
        assert_eq!(assigned.cells, vec!["x", "y"]);
    }

    #[test]
    fn detects_boilerplate_rows() {
        assert!(is_boilerplate_row(&row(&[
            (0.0, "ANNA UNIVERSITY"),
            (100.0, "BONAFIDE CERTIFICATE")
        ])));
        assert!(!is_boilerplate_row(&row(&[(0.0, "ROLL"), (100.0, "NAME")])));
    }
}
