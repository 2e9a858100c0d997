use std::cmp::Ordering;

use crate::model::{RowGroup, TextFragment};
use crate::options::RowGrouping;

struct PendingGroup {
    y_key: f64,
    keys: Vec<f64>,
    fragments: Vec<TextFragment>,
}

// Greedy mode is first-fit in arrival order and every member's y becomes
// a key of its group, so chains of close values merge.
#[must_use]
pub fn group_rows(fragments: &[TextFragment], tolerance: f64, mode: RowGrouping) -> Vec<RowGroup> {
    let mut groups = match mode {
        RowGrouping::Greedy => group_greedy(fragments, tolerance),
        RowGrouping::Sorted => group_sorted(fragments, tolerance),
    };

    groups.sort_by(|left, right| left.y_key.partial_cmp(&right.y_key).unwrap_or(Ordering::Equal));
    groups
        .into_iter()
        .map(|mut group| {
            group
                .fragments
                .sort_by(|left, right| left.x.partial_cmp(&right.x).unwrap_or(Ordering::Equal));
            RowGroup {
                y_key: group.y_key,
                fragments: group.fragments,
            }
        })
        .collect()
}

fn group_greedy(fragments: &[TextFragment], tolerance: f64) -> Vec<PendingGroup> {
    let mut groups: Vec<PendingGroup> = Vec::new();

    for fragment in fragments {
        let found = groups.iter_mut().find(|group| {
            group
                .keys
                .iter()
                .any(|key| (key - fragment.y).abs() <= tolerance)
        });

        match found {
            Some(group) => {
                if !group.keys.contains(&fragment.y) {
                    group.keys.push(fragment.y);
                }
                group.fragments.push(fragment.clone());
            }
            None => groups.push(PendingGroup {
                y_key: fragment.y,
                keys: vec![fragment.y],
                fragments: vec![fragment.clone()],
            }),
        }
    }

    groups
}

fn group_sorted(fragments: &[TextFragment], tolerance: f64) -> Vec<PendingGroup> {
    let mut ordered = fragments.to_vec();
    ordered.sort_by(|left, right| left.y.partial_cmp(&right.y).unwrap_or(Ordering::Equal));

    let mut groups: Vec<PendingGroup> = Vec::new();
    let mut last_y = f64::NEG_INFINITY;
    for fragment in ordered {
        let y = fragment.y;
        match groups.last_mut() {
            Some(group) if (y - last_y).abs() <= tolerance => {
                group.keys.push(y);
                group.fragments.push(fragment);
            }
            _ => groups.push(PendingGroup {
                y_key: y,
                keys: vec![y],
                fragments: vec![fragment],
            }),
        }
        last_y = y;
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::group_rows;
    use crate::model::TextFragment;
    use crate::options::RowGrouping;

    fn at(y: f64, x: f64, text: &str) -> TextFragment {
        TextFragment::new(1, x, y, text)
    }

    fn texts(groups: &[crate::model::RowGroup]) -> Vec<Vec<&str>> {
        groups
            .iter()
            .map(|group| group.fragments.iter().map(|f| f.text.as_str()).collect())
            .collect()
    }

    #[test]
    fn chains_close_rows_in_arrival_order() {
        let fragments = vec![at(10.0, 0.0, "a"), at(11.0, 10.0, "b"), at(12.0, 20.0, "c")];
        let groups = group_rows(&fragments, 1.5, RowGrouping::Greedy);
        assert_eq!(texts(&groups), vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn arrival_order_can_split_the_chain() {
        let fragments = vec![at(10.0, 0.0, "a"), at(12.0, 20.0, "c"), at(11.0, 10.0, "b")];
        let groups = group_rows(&fragments, 1.5, RowGrouping::Greedy);
        assert_eq!(texts(&groups), vec![vec!["a", "b"], vec!["c"]]);
        assert_eq!(groups[0].y_key, 10.0);
        assert_eq!(groups[1].y_key, 12.0);
    }

    #[test]
    fn sorted_mode_is_order_independent() {
        let fragments = vec![at(10.0, 0.0, "a"), at(12.0, 20.0, "c"), at(11.0, 10.0, "b")];
        let groups = group_rows(&fragments, 1.5, RowGrouping::Sorted);
        assert_eq!(texts(&groups), vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn orders_rows_by_y_and_cells_by_x() {
        let fragments = vec![
            at(40.0, 200.0, "B"),
            at(0.0, 100.0, "NAME"),
            at(40.0, 0.0, "102"),
            at(0.0, 0.0, "ROLL"),
        ];
        let groups = group_rows(&fragments, 1.5, RowGrouping::Greedy);
        assert_eq!(texts(&groups), vec![vec!["ROLL", "NAME"], vec!["102", "B"]]);
    }
}
