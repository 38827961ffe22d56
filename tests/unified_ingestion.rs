use std::io::Write;
use std::path::Path;

use tabular_reconcile::ingestion::pdf::{assemble_document_tables, PageContent, TEXT_COLUMN};
use tabular_reconcile::ingestion::{detect_source_kind, extract_tables, ExtractOptions};
use tabular_reconcile::types::{SourceDocument, SourceKind};
use tabular_reconcile::IngestionError;

fn s(v: &str) -> Option<String> {
    Some(v.to_string())
}

#[test]
fn kind_is_detected_from_extension_case_insensitively() {
    assert_eq!(detect_source_kind(Path::new("a/b/Sales.CSV")), SourceKind::Delimited);
    assert_eq!(detect_source_kind(Path::new("book.Xlsx")), SourceKind::Spreadsheet);
    assert_eq!(detect_source_kind(Path::new("legacy.xls")), SourceKind::Spreadsheet);
    assert_eq!(detect_source_kind(Path::new("report.pdf")), SourceKind::Document);
    assert_eq!(detect_source_kind(Path::new("notes.txt")), SourceKind::Unknown);
    assert_eq!(detect_source_kind(Path::new("no_extension")), SourceKind::Unknown);
}

#[test]
fn unsupported_extension_cannot_become_a_document() {
    let err = SourceDocument::detect("notes.txt").unwrap_err();
    let IngestionError::UnsupportedFormat { extension, .. } = &err else {
        panic!("expected UnsupportedFormat, got {err:?}");
    };
    assert_eq!(extension, "txt");
}

#[test]
fn csv_yields_exactly_one_table() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(b"a,b\n1,2\n3,4\n").unwrap();

    let doc = SourceDocument::detect(file.path()).unwrap();
    let tables = extract_tables(&doc, &ExtractOptions::default()).unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].header, vec![s("a"), s("b")]);
    assert_eq!(tables[0].row_count(), 2);
}

#[cfg(feature = "pdf")]
mod pdf_files {
    use std::path::{Path, PathBuf};

    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    use tabular_reconcile::ingestion::pdf::{extract_pdf_from_path, TEXT_COLUMN};
    use tabular_reconcile::ingestion::{extract_tables, ExtractOptions};
    use tabular_reconcile::types::SourceDocument;
    use tabular_reconcile::IngestionError;

    use super::s;

    /// Text shown at absolute positions, one `(x, y, text)` per cell.
    fn placed(cells: &[(i64, i64, &str)]) -> Vec<Operation> {
        let mut ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
        ];
        for &(x, y, text) in cells {
            ops.push(Operation::new(
                "Tm",
                vec![1.into(), 0.into(), 0.into(), 1.into(), x.into(), y.into()],
            ));
            ops.push(Operation::new("Tj", vec![Object::string_literal(text)]));
        }
        ops.push(Operation::new("ET", vec![]));
        ops
    }

    fn write_pdf(dir: &tempfile::TempDir, name: &str, pages: Vec<Vec<Operation>>) -> PathBuf {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for operations in pages {
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::from(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let path = dir.path().join(name);
        doc.save(&path).unwrap();
        path
    }

    #[test]
    fn positioned_table_page_plus_prose_page_yields_one_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(
            &dir,
            "stock.pdf",
            vec![
                placed(&[
                    (50, 700, "Name"),
                    (250, 700, "Qty"),
                    (50, 685, "Ada"),
                    (250, 685, "1"),
                    (50, 670, "Grace"),
                    (250, 670, "2"),
                ]),
                placed(&[(50, 700, "Thanks for reading this report.")]),
            ],
        );

        let tables = extract_pdf_from_path(&path).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].header, vec![s("Name"), s("Qty")]);
        assert_eq!(tables[0].rows, vec![vec![s("Ada"), s("1")], vec![s("Grace"), s("2")]]);
    }

    #[test]
    fn text_only_pdf_falls_back_to_text_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(
            &dir,
            "letter.pdf",
            vec![
                placed(&[(50, 700, "Dear reader,"), (50, 685, "no tables here.")]),
                placed(&[(50, 700, "Regards.")]),
            ],
        );

        let doc = SourceDocument::detect(&path).unwrap();
        let tables = extract_tables(&doc, &ExtractOptions::default()).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].header, vec![s(TEXT_COLUMN)]);
        assert_eq!(
            tables[0].rows,
            vec![vec![s("Dear reader,\nno tables here.")], vec![s("Regards.")]]
        );
    }

    #[test]
    fn pdf_without_text_has_no_extractable_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(&dir, "blank.pdf", vec![Vec::new(), Vec::new()]);

        let err = extract_pdf_from_path(&path).unwrap_err();
        assert!(matches!(err, IngestionError::NoExtractableContent { .. }));
    }

    #[test]
    fn missing_pdf_is_source_unreadable() {
        let doc = SourceDocument::detect(Path::new("tests/fixtures/absent.pdf")).unwrap();
        let err = extract_tables(&doc, &ExtractOptions::default()).unwrap_err();
        assert!(matches!(err, IngestionError::SourceUnreadable { .. }));
    }
}

#[cfg(not(feature = "pdf"))]
#[test]
fn pdf_without_feature_reports_missing_dependency() {
    let doc = SourceDocument::detect("report.pdf").unwrap();
    let err = extract_tables(&doc, &ExtractOptions::default()).unwrap_err();
    assert!(matches!(err, IngestionError::DependencyMissing { feature: "pdf", .. }));
}

#[cfg(not(feature = "excel"))]
#[test]
fn spreadsheet_without_feature_reports_missing_dependency() {
    let doc = SourceDocument::detect("book.xlsx").unwrap();
    let err = extract_tables(&doc, &ExtractOptions::default()).unwrap_err();
    assert!(matches!(err, IngestionError::DependencyMissing { feature: "excel", .. }));
}

#[test]
fn document_pages_yield_one_table_per_detected_grid() {
    let pages = vec![
        PageContent::from_text(1, "Quarterly report\n\nRegion   Units   Price\nNorth   10   2.5\nSouth   7   3.0\n"),
        PageContent::unparsable(2, "bad content stream"),
        PageContent::from_text(3, "Item\tQty\nbolts\t100\nnuts\t250\n"),
    ];

    let tables = assemble_document_tables(Path::new("report.pdf"), pages).unwrap();
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].header, vec![s("Region"), s("Units"), s("Price")]);
    assert_eq!(tables[0].rows[1], vec![s("South"), s("7"), s("3.0")]);
    assert_eq!(tables[1].header, vec![s("Item"), s("Qty")]);
}

#[test]
fn document_without_tables_falls_back_to_page_text() {
    let pages = vec![
        PageContent::from_text(1, "Just a paragraph of prose."),
        PageContent::from_text(2, "More prose on page two."),
    ];

    let tables = assemble_document_tables(Path::new("memo.pdf"), pages).unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].header, vec![s(TEXT_COLUMN)]);
    assert_eq!(tables[0].row_count(), 2);
}
