use scraper::{ElementRef, Html, Node};
use tracing::debug;

use crate::domain::{ClassSnapshot, ClassSpec, CrawlError};
use crate::scraper::layout::ColumnLayout;
use crate::scraper::site;

/// Turns one results page into a class snapshot or a classified error.
///
/// The page is walked depth-first. Until a warning header is seen, the walk
/// looks for the results table and for the unwarned no-results message.
/// After the warning header, text nodes are matched against the known error
/// phrases and the first match wins.
#[derive(Debug, Clone, Default)]
pub struct ResultExtractor;

impl ResultExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract from a raw response body.
    ///
    /// The site does not always answer in UTF-8. Every marker is plain
    /// ASCII, so a lossy decode is enough to classify the page.
    pub fn extract(&self, spec: &ClassSpec, body: &[u8]) -> Result<ClassSnapshot, CrawlError> {
        self.extract_str(spec, &String::from_utf8_lossy(body))
    }

    pub fn extract_str(&self, spec: &ClassSpec, html: &str) -> Result<ClassSnapshot, CrawlError> {
        let document = Html::parse_document(html);
        let mut warned = false;

        for node in document.tree.root().descendants() {
            match node.value() {
                Node::Text(text) => {
                    if warned {
                        if let Some(error) = classify_warning(text) {
                            return Err(error);
                        }
                        continue;
                    }
                    if text.contains(site::WARNING_MARKER) {
                        debug!("Found warning for {}", spec.name);
                        warned = true;
                    }
                    if text.contains(site::NO_RESULTS_UNWARNED_MARKER) {
                        return Err(CrawlError::NoResults);
                    }
                }
                Node::Element(element) if !warned && element.name() == "table" => {
                    let (attr, value) = site::RESULTS_TABLE_ATTR;
                    if element.attr(attr) != Some(value) {
                        continue;
                    }
                    if let Some(table) = ElementRef::wrap(node) {
                        debug!("Found results table for {}", spec.name);
                        return parse_results_table(spec, table);
                    }
                }
                _ => {}
            }
        }

        Err(CrawlError::Unknown)
    }
}

fn classify_warning(text: &str) -> Option<CrawlError> {
    if text.contains(site::NO_RESULTS_MARKER) {
        Some(CrawlError::NoResults)
    } else if text.contains(site::INVALID_CLASS_MARKER) {
        Some(CrawlError::InvalidClassGroup)
    } else if text.contains(site::INVALID_CREDENTIALS_MARKER) {
        Some(CrawlError::InvalidCredentials)
    } else if text.contains(site::NOT_REGISTERED_MARKER) {
        Some(CrawlError::NotRegistered)
    } else {
        None
    }
}

fn parse_results_table(spec: &ClassSpec, table: ElementRef<'_>) -> Result<ClassSnapshot, CrawlError> {
    let mut data_rows = Vec::new();
    let mut meta_rows = Vec::new();

    for row in table_rows(table) {
        let cells = row_cells(row);
        let is_meta = row
            .value()
            .attr(site::META_ROW_ATTR)
            .is_some_and(|v| !v.is_empty());
        if is_meta {
            meta_rows.push(cells);
        } else {
            data_rows.push(cells);
        }
    }

    // Meta rows: title, header, total, then the final grade once the
    // course is complete.
    let header = meta_rows.get(1).ok_or(CrawlError::UnknownLayout(0))?;
    let layout = ColumnLayout::from_header_count(header.len())?;

    let total = meta_rows
        .get(2)
        .map(|row| layout.normal(row))
        .filter(|total| !total.is_blank());
    let final_grade = meta_rows
        .iter()
        .skip(3)
        .find(|row| is_final_grade_row(row))
        .and_then(|row| row.get(1))
        .filter(|grade| !grade.is_empty())
        .cloned();

    debug!("Found {} results for {}", data_rows.len(), spec.name);

    Ok(ClassSnapshot {
        spec: spec.clone(),
        results: data_rows.iter().map(|row| layout.entry(row)).collect(),
        total,
        final_grade,
    })
}

fn is_final_grade_row(cells: &[String]) -> bool {
    cells.first().is_some_and(|label| {
        label
            .to_lowercase()
            .starts_with(&site::FINAL_GRADE_LABEL.to_lowercase())
    })
}

/// Rows that belong to `table` itself, looking through the implicit
/// `tbody` the parser inserts but not into nested tables.
fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|row| row.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| cell.value().name() == "td")
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Measure;

    fn spec() -> ClassSpec {
        ClassSpec::new("INF1120", "40", "20143")
    }

    fn extract(html: &str) -> Result<ClassSnapshot, CrawlError> {
        ResultExtractor::new().extract_str(&spec(), html)
    }

    #[test]
    fn test_results_with_average() {
        let snapshot = extract(include_str!("../../tests/fixtures/results.html")).unwrap();
        assert_eq!(snapshot.spec, spec());
        assert_eq!(snapshot.results.len(), 3);

        let first = &snapshot.results[0];
        assert_eq!(first.name, "Travail pratique 1");
        assert_eq!(first.normal, Measure::new("18.5", "15.2", "N/A"));
        assert_eq!(first.weighted, Measure::new("9.25", "7.6", "N/A"));

        assert_eq!(snapshot.total, Some(Measure::new("62.5", "55.1", "N/A")));
        assert_eq!(snapshot.final_grade, None);
    }

    #[test]
    fn test_full_layout_with_final_grade() {
        let snapshot = extract(include_str!("../../tests/fixtures/results_full.html")).unwrap();
        assert_eq!(snapshot.results.len(), 2);
        assert_eq!(snapshot.results[1].name, "Examen final");
        assert_eq!(snapshot.results[1].normal, Measure::new("82", "71.4", "9.8"));
        assert_eq!(snapshot.results[1].weighted, Measure::new("41", "35.7", "4.9"));
        assert_eq!(snapshot.total, Some(Measure::new("84.5", "73", "8.1")));
        assert_eq!(snapshot.final_grade.as_deref(), Some("A"));
    }

    #[test]
    fn test_empty_table_is_not_an_error() {
        let snapshot = extract(include_str!("../../tests/fixtures/results_empty.html")).unwrap();
        assert!(snapshot.results.is_empty());
        assert_eq!(snapshot.total, None);
    }

    #[test]
    fn test_no_results_both_variants() {
        assert_eq!(
            extract(include_str!("../../tests/fixtures/no_results.html")),
            Err(CrawlError::NoResults)
        );
        assert_eq!(
            extract(include_str!("../../tests/fixtures/no_results_alt.html")),
            Err(CrawlError::NoResults)
        );
    }

    #[test]
    fn test_classified_errors() {
        assert_eq!(
            extract(include_str!("../../tests/fixtures/invalid_code_or_nip.html")),
            Err(CrawlError::InvalidCredentials)
        );
        assert_eq!(
            extract(include_str!("../../tests/fixtures/invalid_class_or_group.html")),
            Err(CrawlError::InvalidClassGroup)
        );
        assert_eq!(
            extract(include_str!("../../tests/fixtures/not_registered_for_class.html")),
            Err(CrawlError::NotRegistered)
        );
    }

    #[test]
    fn test_unknown_layout() {
        assert_eq!(
            extract(include_str!("../../tests/fixtures/unknown_layout.html")),
            Err(CrawlError::UnknownLayout(4))
        );
    }

    #[test]
    fn test_malformed_documents_are_unknown() {
        assert_eq!(extract(""), Err(CrawlError::Unknown));
        assert_eq!(extract("<html><body><p>"), Err(CrawlError::Unknown));
        assert_eq!(
            extract("<p>ATTENTION</p><p>Something new went wrong</p>"),
            Err(CrawlError::Unknown)
        );
    }

    #[test]
    fn test_table_without_header_row_is_unknown_layout() {
        let html = r##"<table name="form"><tr bgcolor="#ccc"><td>Title</td></tr></table>"##;
        assert_eq!(extract(html), Err(CrawlError::UnknownLayout(0)));
    }

    #[test]
    fn test_warning_stops_table_detection() {
        let html = r#"<p>ATTENTION</p>
            <table name="form"><tr bgcolor="x"><td>t</td></tr></table>
            <p>Code permanent inexistant ou NIP non valide</p>"#;
        assert_eq!(extract(html), Err(CrawlError::InvalidCredentials));
    }

    #[test]
    fn test_non_utf8_body() {
        let mut body = b"<p>ATTENTION</p><p>Les r\xe9sultats ne sont pas disponibles via le web</p>".to_vec();
        body.extend_from_slice(b"</body>");
        let result = ResultExtractor::new().extract(&spec(), &body);
        assert_eq!(result, Err(CrawlError::NoResults));
    }
}
