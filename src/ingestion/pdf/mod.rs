//! Document-with-tables extraction.
//!
//! Pages are processed in document order. Each page's content stream is read into positioned
//! text runs ([`content`]), which are grouped into lines and cells by position ([`layout`]).
//! Runs of consecutive lines with the same cell count are tables ([`grid_tables`]); a page with
//! none is also scanned for whitespace-aligned columns ([`detect_text_tables`]). Every table found
//! becomes one [`RawTable`] after header promotion ([`promote_header`]). Pages without tables
//! contribute their text to a one-column fallback table, which is returned only when no page
//! produced a structural table.

#[cfg(feature = "pdf")]
pub mod content;
pub mod layout;

use std::path::Path;

use tracing::{debug, warn};

use crate::error::{IngestionError, IngestionResult};
use crate::processing::normalize::coerce_number;
use crate::types::RawTable;

use self::layout::{layout_lines, TextRun};

/// Column name of the fallback table built from page text.
pub const TEXT_COLUMN: &str = "text";

/// Rows of optional cells, as detected on one page.
pub type Grid = Vec<Vec<Option<String>>>;

/// Per-page result of structural detection and text extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct PageContent {
    /// 1-based page number.
    pub number: u32,
    /// Plain text of the page, if any could be extracted.
    pub text: Option<String>,
    /// Tables detected on the page, or the reason detection failed.
    pub tables: Result<Vec<Grid>, String>,
}

impl PageContent {
    /// Build a page from its extracted text, running table detection on it.
    pub fn from_text(number: u32, text: impl Into<String>) -> Self {
        let text = text.into();
        let tables = Ok(detect_text_tables(&text));
        Self {
            number,
            text: Some(text),
            tables,
        }
    }

    /// Build a page from positioned text runs.
    ///
    /// Tables come from the position layout; when it has none, the laid-out text is scanned for
    /// whitespace-aligned columns instead.
    pub fn from_runs(number: u32, runs: &[TextRun]) -> Self {
        let lines = layout_lines(runs);
        let text = lines.iter().map(|cells| cells.join(" ")).collect::<Vec<_>>().join("\n");

        let mut tables = grid_tables(
            lines
                .into_iter()
                .map(|cells| cells.into_iter().map(Some).collect()),
        );
        if tables.is_empty() {
            tables = detect_text_tables(&text);
        }
        Self {
            number,
            text: Some(text),
            tables: Ok(tables),
        }
    }

    /// A page whose content could not be parsed.
    pub fn unparsable(number: u32, reason: impl Into<String>) -> Self {
        Self {
            number,
            text: None,
            tables: Err(reason.into()),
        }
    }
}

/// Read a PDF and extract its tables (or the text fallback table).
#[cfg(feature = "pdf")]
pub fn extract_pdf_from_path(path: impl AsRef<Path>) -> IngestionResult<Vec<RawTable>> {
    let path = path.as_ref();
    let doc = lopdf::Document::load(path).map_err(|e| IngestionError::unreadable(path, e))?;

    let pages = doc
        .get_pages()
        .into_iter()
        .map(|(number, page_id)| read_page(&doc, number, page_id))
        .collect::<Vec<_>>();

    assemble_document_tables(path, pages)
}

#[cfg(feature = "pdf")]
fn read_page(doc: &lopdf::Document, number: u32, page_id: lopdf::ObjectId) -> PageContent {
    let operations = match doc.get_and_decode_page_content(page_id) {
        Ok(content) => content.operations,
        Err(e) => return PageContent::unparsable(number, e.to_string()),
    };

    let runs = content::positioned_runs(&operations);
    if runs.iter().any(|r| !r.text.trim().is_empty()) {
        return PageContent::from_runs(number, &runs);
    }
    match doc.extract_text(&[number]) {
        Ok(text) => PageContent::from_text(number, text),
        Err(e) => PageContent::unparsable(number, e.to_string()),
    }
}

/// Turn per-page contents into raw tables.
///
/// Never fails because of a single page: a page whose detection failed is skipped (its text, if
/// any, still feeds the fallback). Fails with [`IngestionError::NoExtractableContent`] only when
/// no page yields a table and no page has text.
pub fn assemble_document_tables(
    path: &Path,
    pages: impl IntoIterator<Item = PageContent>,
) -> IngestionResult<Vec<RawTable>> {
    let mut tables = Vec::new();
    let mut fallback_rows = Vec::new();
    let mut any_text = false;

    for page in pages {
        let page_text = page
            .text
            .filter(|t| !t.trim().is_empty());
        any_text |= page_text.is_some();

        match page.tables {
            Ok(grids) if !grids.is_empty() => {
                debug!(page = page.number, tables = grids.len(), "page tables detected");
                tables.extend(grids.into_iter().map(promote_header));
            }
            Ok(_) => fallback_rows.push(vec![page_text]),
            Err(reason) => {
                warn!(page = page.number, %reason, path = %path.display(), "skipping unparsable page");
                fallback_rows.push(vec![page_text]);
            }
        }
    }

    if !tables.is_empty() {
        return Ok(tables);
    }
    if !any_text {
        return Err(IngestionError::NoExtractableContent {
            path: path.to_path_buf(),
        });
    }
    Ok(vec![RawTable::new(vec![Some(TEXT_COLUMN.to_string())], fallback_rows)])
}

/// Promote the first row of `grid` to the header if every cell is present, non-blank and
/// non-numeric. Otherwise keep it as data under positional headers (`"0"`, `"1"`, ...).
pub fn promote_header(mut grid: Grid) -> RawTable {
    let promotable = grid.first().is_some_and(|first| {
        !first.is_empty()
            && first.iter().all(|c| match c {
                Some(s) => !s.trim().is_empty() && coerce_number(s.trim()).is_none(),
                None => false,
            })
    });

    if promotable {
        let header = grid.remove(0);
        RawTable::new(header, grid)
    } else {
        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        let header = (0..width).map(|i| Some(i.to_string())).collect();
        RawTable::new(header, grid)
    }
}

/// Recover tables from page text.
///
/// A line is a row candidate when splitting it on tabs or runs of two or more spaces yields at
/// least two cells. Two or more consecutive candidates with the same cell count form a table.
pub fn detect_text_tables(text: &str) -> Vec<Grid> {
    grid_tables(text.lines().map(split_cells))
}

/// Find tables among consecutive rows of cells.
///
/// A row with at least two cells is a candidate; two or more consecutive candidates with the
/// same cell count form a table.
pub fn grid_tables(rows: impl IntoIterator<Item = Vec<Option<String>>>) -> Vec<Grid> {
    let mut tables = Vec::new();
    let mut run: Grid = Vec::new();

    for cells in rows {
        let continues = cells.len() >= 2 && run.first().is_none_or(|r| r.len() == cells.len());
        if continues {
            run.push(cells);
            continue;
        }
        flush_run(&mut run, &mut tables);
        if cells.len() >= 2 {
            run.push(cells);
        }
    }
    flush_run(&mut run, &mut tables);
    tables
}

fn flush_run(run: &mut Grid, tables: &mut Vec<Grid>) {
    if run.len() >= 2 {
        tables.push(std::mem::take(run));
    } else {
        run.clear();
    }
}

fn split_cells(line: &str) -> Vec<Option<String>> {
    let line = line.trim();
    if line.is_empty() {
        return Vec::new();
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut spaces = 0usize;
    for ch in line.chars() {
        match ch {
            '\t' => {
                cells.push(current.trim().to_string());
                current.clear();
                spaces = 0;
            }
            ' ' => {
                spaces += 1;
                current.push(ch);
            }
            _ => {
                if spaces >= 2 {
                    let cut = current.len() - spaces;
                    cells.push(current[..cut].trim().to_string());
                    current.clear();
                }
                spaces = 0;
                current.push(ch);
            }
        }
    }
    cells.push(current.trim().to_string());

    cells
        .into_iter()
        .map(|c| if c.is_empty() { None } else { Some(c) })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::layout::TextRun;
    use super::{assemble_document_tables, detect_text_tables, promote_header, PageContent, TEXT_COLUMN};
    use crate::error::IngestionError;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn splits_on_wide_gaps_and_tabs() {
        let tables = detect_text_tables("Invoice 42\nName   Qty\nAda Lovelace  3\nGrace\t7\nFooter text");
        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0],
            vec![
                vec![s("Name"), s("Qty")],
                vec![s("Ada Lovelace"), s("3")],
                vec![s("Grace"), s("7")],
            ]
        );
    }

    #[test]
    fn single_aligned_line_is_not_a_table() {
        assert!(detect_text_tables("Title   Page 1\nplain prose here").is_empty());
    }

    #[test]
    fn column_count_change_starts_a_new_table() {
        let text = "a  b\n1  2\nx  y  z\n1  2  3\n4  5  6";
        let tables = detect_text_tables(text);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].len(), 3);
    }

    #[test]
    fn all_text_first_row_is_promoted() {
        let t = promote_header(vec![vec![s("Name"), s("Qty")], vec![s("ada"), s("1")]]);
        assert_eq!(t.header, vec![s("Name"), s("Qty")]);
        assert_eq!(t.row_count(), 1);
    }

    #[test]
    fn numeric_or_missing_first_row_gets_positional_headers() {
        let t = promote_header(vec![vec![s("Name"), s("1,5")], vec![s("ada"), s("1")]]);
        assert_eq!(t.header, vec![s("0"), s("1")]);
        assert_eq!(t.row_count(), 2);

        let t = promote_header(vec![vec![s("Name"), None], vec![s("ada"), s("1")]]);
        assert_eq!(t.header, vec![s("0"), s("1")]);
        assert_eq!(t.row_count(), 2);
    }

    #[test]
    fn positioned_runs_form_a_table() {
        let runs = vec![
            TextRun::new(50.0, 760.0, 12.0, "Stock report"),
            TextRun::new(50.0, 700.0, 12.0, "Name"),
            TextRun::new(250.0, 700.0, 12.0, "Qty"),
            TextRun::new(50.0, 685.0, 12.0, "Ada"),
            TextRun::new(250.0, 685.0, 12.0, "1"),
            TextRun::new(50.0, 670.0, 12.0, "Grace"),
            TextRun::new(250.0, 670.0, 12.0, "2"),
        ];
        let page = PageContent::from_runs(1, &runs);
        let tables = page.tables.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0][0], vec![s("Name"), s("Qty")]);
        assert_eq!(tables[0][2], vec![s("Grace"), s("2")]);
        assert_eq!(page.text.as_deref(), Some("Stock report\nName Qty\nAda 1\nGrace 2"));
    }

    #[test]
    fn single_run_lines_fall_back_to_whitespace_columns() {
        let runs = vec![
            TextRun::new(50.0, 700.0, 10.0, "Item    Qty"),
            TextRun::new(50.0, 688.0, 10.0, "bolts   100"),
        ];
        let tables = PageContent::from_runs(1, &runs).tables.unwrap();
        assert_eq!(tables, vec![vec![vec![s("Item"), s("Qty")], vec![s("bolts"), s("100")]]]);
    }

    #[test]
    fn valid_page_plus_unparsable_page_yields_one_table() {
        let pages = vec![
            PageContent::from_text(1, "Name  Qty\nada  1\ngrace  2"),
            PageContent::unparsable(2, "broken content stream"),
        ];
        let tables = assemble_document_tables(Path::new("doc.pdf"), pages).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].header, vec![s("Name"), s("Qty")]);
        assert_eq!(tables[0].row_count(), 2);
    }

    #[test]
    fn text_only_document_falls_back_to_text_table() {
        let pages = vec![
            PageContent::from_text(1, "Dear reader,\nthis page has prose."),
            PageContent::unparsable(2, "bad xref"),
            PageContent::from_text(3, "Closing words."),
        ];
        let tables = assemble_document_tables(Path::new("letter.pdf"), pages).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].header, vec![s(TEXT_COLUMN)]);
        assert_eq!(tables[0].row_count(), 3);
        assert_eq!(tables[0].rows[1], vec![None]);
    }

    #[test]
    fn document_without_content_fails() {
        let pages = vec![PageContent::from_text(1, "   "), PageContent::unparsable(2, "bad")];
        let err = assemble_document_tables(Path::new("blank.pdf"), pages).unwrap_err();
        assert!(matches!(err, IngestionError::NoExtractableContent { .. }));
    }
}
