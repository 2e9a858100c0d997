use crate::model::RowGroup;

const CELL_GAP_GLYPHS: f64 = 2.0;
const FALLBACK_GLYPH_WIDTH: f64 = 5.0;

pub(crate) fn split_line_into_cells(line: &str) -> Vec<String> {
    line.split('\t')
        .flat_map(|piece| piece.split("  "))
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn soft_split_line_into_cells(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

pub(crate) fn render_row_line(row: &RowGroup) -> String {
    let mut line = String::new();
    let mut previous_right: Option<f64> = None;

    for fragment in &row.fragments {
        let text = fragment.text.trim();
        if text.is_empty() {
            continue;
        }

        if let Some(right) = previous_right {
            let glyph_count = text.chars().count().max(1) as f64;
            let glyph_width = if fragment.width > 0.0 {
                fragment.width / glyph_count
            } else {
                FALLBACK_GLYPH_WIDTH
            };
            if fragment.x - right > glyph_width * CELL_GAP_GLYPHS {
                line.push_str("  ");
            } else {
                line.push(' ');
            }
        }

        line.push_str(text);
        previous_right = Some(if fragment.width > 0.0 {
            fragment.right()
        } else {
            fragment.x + text.chars().count() as f64 * FALLBACK_GLYPH_WIDTH
        });
    }

    line
}

pub(crate) fn normalize_rows(rows: &[Vec<String>], width: usize) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| {
            let mut out = row.clone();
            out.resize(width, String::new());
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        normalize_rows, render_row_line, soft_split_line_into_cells, split_line_into_cells,
    };
    use crate::model::{RowGroup, TextFragment};

    #[test]
    fn splits_double_space_and_tab_separated_cells() {
        assert_eq!(
            split_line_into_cells("101  Jane Doe   A"),
            vec!["101", "Jane Doe", "A"]
        );
        assert_eq!(split_line_into_cells("A\tB\tC"), vec!["A", "B", "C"]);
    }

    #[test]
    fn soft_splits_single_space_cells() {
        let cells = soft_split_line_into_cells("Roll Name Grade");
        assert_eq!(cells, vec!["Roll", "Name", "Grade"]);
    }

    #[test]
    fn renders_wide_gaps_as_cell_breaks() {
        let row = RowGroup {
            y_key: 0.0,
            fragments: vec![
                TextFragment::new(1, 0.0, 0.0, "101").with_size(15.0, 10.0),
                TextFragment::new(1, 100.0, 0.0, "Jane").with_size(20.0, 10.0),
                TextFragment::new(1, 124.0, 0.0, "Doe").with_size(15.0, 10.0),
            ],
        };
        assert_eq!(render_row_line(&row), "101  Jane Doe");
    }

    #[test]
    fn normalizes_ragged_rows() {
        let rows = vec![
            vec!["a".to_string()],
            vec!["b".to_string(), "c".to_string()],
        ];
        let normalized = normalize_rows(&rows, 3);
        assert_eq!(normalized[0], vec!["a", "", ""]);
        assert_eq!(normalized[1], vec!["b", "c", ""]);
    }
}
