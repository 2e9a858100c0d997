use tracing::debug;

use crate::columns::{assign_to_columns, detect_column_boundaries, is_boilerplate_row};
use crate::error::ExtractionError;
use crate::model::{PageFragments, PageRows, TableOrigin, TextFragment};
use crate::options::ReconstructOptions;
use crate::pdf_reader::TextExtractor;
use crate::rows::group_rows;
use crate::table_parse::render_row_line;

pub trait TableSource {
    fn name(&self) -> &'static str;

    fn page_rows(
        &self,
        pdf: &[u8],
        options: &ReconstructOptions,
    ) -> Result<Vec<PageRows>, ExtractionError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GeometricSource<E> {
    extractor: E,
}

impl<E> GeometricSource<E> {
    pub fn new(extractor: E) -> Self {
        Self { extractor }
    }
}

impl<E: TextExtractor> TableSource for GeometricSource<E> {
    fn name(&self) -> &'static str {
        "geometric"
    }

    fn page_rows(
        &self,
        pdf: &[u8],
        options: &ReconstructOptions,
    ) -> Result<Vec<PageRows>, ExtractionError> {
        let pages = self.extractor.extract(pdf)?;
        let pages = select_pages(pages, options)?;
        Ok(pages
            .iter()
            .map(|page| build_page_rows(page, options))
            .collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PrecomputedSource {
    pages: Vec<PageRows>,
}

impl PrecomputedSource {
    #[must_use]
    pub fn new(pages: Vec<PageRows>) -> Self {
        Self { pages }
    }
}

impl TableSource for PrecomputedSource {
    fn name(&self) -> &'static str {
        "precomputed"
    }

    fn page_rows(
        &self,
        _pdf: &[u8],
        _options: &ReconstructOptions,
    ) -> Result<Vec<PageRows>, ExtractionError> {
        Ok(self.pages.clone())
    }
}

pub(crate) fn select_pages(
    pages: Vec<PageFragments>,
    options: &ReconstructOptions,
) -> Result<Vec<PageFragments>, ExtractionError> {
    let Some(selection) = options.pages.as_ref() else {
        return Ok(pages);
    };

    let selected = pages
        .into_iter()
        .filter(|page| selection.contains(page.page_number))
        .collect::<Vec<_>>();
    if selected.is_empty() {
        return Err(ExtractionError::NoPagesSelected);
    }
    Ok(selected)
}

fn crop_to_areas<'a>(page: &'a PageFragments, options: &ReconstructOptions) -> Vec<&'a TextFragment> {
    let areas = options
        .areas
        .iter()
        .filter(|area| area.page == page.page_number)
        .collect::<Vec<_>>();
    page.fragments
        .iter()
        .filter(|fragment| !fragment.text.trim().is_empty())
        .filter(|fragment| areas.is_empty() || areas.iter().any(|area| area.contains(fragment)))
        .collect()
}

#[must_use]
pub fn build_page_rows(page: &PageFragments, options: &ReconstructOptions) -> PageRows {
    let fragments = crop_to_areas(page, options)
        .into_iter()
        .cloned()
        .collect::<Vec<_>>();
    let grouped = group_rows(&fragments, options.row_tolerance, options.row_grouping);

    let mut boilerplate_removed = 0;
    let mut lines = Vec::with_capacity(grouped.len());
    let mut table_rows = Vec::with_capacity(grouped.len());
    for row in grouped {
        lines.push(render_row_line(&row));
        if options.filter_boilerplate && is_boilerplate_row(&row) {
            boilerplate_removed += 1;
            continue;
        }
        table_rows.push(row);
    }

    let kept = table_rows
        .iter()
        .flat_map(|row| row.fragments.iter().cloned())
        .collect::<Vec<_>>();
    let boundaries = detect_column_boundaries(&kept, options.column_tolerance);

    let mut out_of_tolerance = 0;
    let rows = table_rows
        .iter()
        .map(|row| {
            let assignment = assign_to_columns(row, &boundaries, options.column_tolerance);
            out_of_tolerance += assignment.out_of_tolerance;
            assignment.cells
        })
        .filter(|cells| cells.iter().any(|cell| !cell.trim().is_empty()))
        .collect::<Vec<_>>();

    debug!(
        page = page.page_number,
        fragments = fragments.len(),
        rows = rows.len(),
        columns = boundaries.len(),
        boilerplate_removed,
        out_of_tolerance,
        "page rows built"
    );

    PageRows {
        page: page.page_number,
        rows,
        lines,
        origin: TableOrigin::Geometric,
        boilerplate_removed,
    }
}

fn has_rows(pages: &[PageRows]) -> bool {
    pages.iter().any(|page| !page.rows.is_empty())
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourcedRows {
    pub source: &'static str,
    pub pages: Vec<PageRows>,
    pub fell_back: bool,
}

// When both sources fail the primary error is returned.
pub fn collect_page_rows(
    primary: &dyn TableSource,
    alternate: Option<&dyn TableSource>,
    pdf: &[u8],
    options: &ReconstructOptions,
) -> Result<SourcedRows, ExtractionError> {
    let primary_result = primary.page_rows(pdf, options);
    let Some(alternate) = alternate else {
        return primary_result.map(|pages| SourcedRows {
            source: primary.name(),
            pages,
            fell_back: false,
        });
    };

    match primary_result {
        Ok(pages) if has_rows(&pages) => Ok(SourcedRows {
            source: primary.name(),
            pages,
            fell_back: false,
        }),
        Ok(pages) => match alternate.page_rows(pdf, options) {
            Ok(alternate_pages) if has_rows(&alternate_pages) => Ok(SourcedRows {
                source: alternate.name(),
                pages: alternate_pages,
                fell_back: true,
            }),
            _ => Ok(SourcedRows {
                source: primary.name(),
                pages,
                fell_back: false,
            }),
        },
        Err(error) => alternate
            .page_rows(pdf, options)
            .map(|pages| SourcedRows {
                source: alternate.name(),
                pages,
                fell_back: true,
            })
            .map_err(|_| error),
    }
}

#[cfg(test)]
mod tests {
    use super::{PrecomputedSource, TableSource, build_page_rows, collect_page_rows, select_pages};
    use crate::error::ExtractionError;
    use crate::model::{PageFragments, PageRows, TextFragment};
    use crate::options::{PageSelection, ReconstructOptions, TableArea};
    use std::str::FromStr;

    struct BrokenSource;

    impl TableSource for BrokenSource {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn page_rows(
            &self,
            _pdf: &[u8],
            _options: &ReconstructOptions,
        ) -> Result<Vec<PageRows>, ExtractionError> {
            Err(ExtractionError::Encrypted)
        }
    }

    fn page(number: u32, cells: &[(f64, f64, &str)]) -> PageFragments {
        PageFragments {
            page_number: number,
            fragments: cells
                .iter()
                .map(|(x, y, text)| TextFragment::new(number, *x, *y, *text))
                .collect(),
        }
    }

    #[test]
    fn builds_uniform_rows_and_drops_boilerplate() {
        let fragments = page(
            1,
            &[
                (0.0, 0.0, "ANNA UNIVERSITY BONAFIDE CERTIFICATE"),
                (0.0, 20.0, "ROLL"),
                (100.0, 20.0, "NAME"),
                (200.0, 20.0, "GRADE"),
                (0.0, 40.0, "101"),
                (100.0, 40.0, "JOHN SMITH"),
                (200.0, 40.0, "A"),
            ],
        );
        let rows = build_page_rows(&fragments, &ReconstructOptions::default());
        assert_eq!(rows.boilerplate_removed, 1);
        assert_eq!(rows.rows.len(), 2);
        assert_eq!(rows.rows[0], vec!["ROLL", "NAME", "GRADE"]);
        assert_eq!(rows.lines.len(), 3);
    }

    #[test]
    fn crops_fragments_to_table_area() {
        let fragments = page(
            1,
            &[(0.0, 0.0, "Title"), (10.0, 100.0, "101"), (110.0, 100.0, "A")],
        );
        let options = ReconstructOptions {
            areas: vec![TableArea::from_str("1:5,50,200,150").expect("area should parse")],
            ..ReconstructOptions::default()
        };
        let rows = build_page_rows(&fragments, &options);
        assert_eq!(rows.rows, vec![vec!["101".to_string(), "A".to_string()]]);
    }

    #[test]
    fn empty_page_selection_result_is_an_error() {
        let options = ReconstructOptions {
            pages: Some(PageSelection::from_str("5").expect("selection should parse")),
            ..ReconstructOptions::default()
        };
        let result = select_pages(vec![page(1, &[(0.0, 0.0, "x")])], &options);
        assert!(matches!(result, Err(ExtractionError::NoPagesSelected)));
    }

    #[test]
    fn alternate_source_covers_primary_failure() {
        let alternate = PrecomputedSource::new(vec![PageRows::external(
            1,
            vec![vec!["101".to_string(), "A".to_string()]],
        )]);
        let sourced = collect_page_rows(
            &BrokenSource,
            Some(&alternate as &dyn TableSource),
            b"%PDF",
            &ReconstructOptions::default(),
        )
        .expect("alternate should supply rows");
        assert!(sourced.fell_back);
        assert_eq!(sourced.source, "precomputed");

        let failed = collect_page_rows(&BrokenSource, None, b"%PDF", &ReconstructOptions::default());
        assert!(matches!(failed, Err(ExtractionError::Encrypted)));
    }
}
