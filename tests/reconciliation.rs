use bigdecimal::BigDecimal;
use invoice_recon::export::export_to_csv;
use invoice_recon::loader::{self, document_summary, LoaderOptions, Source};
use invoice_recon::models::{
    CheckKind, ExtractedDocument, ExtractedField, ExtractedItem, MatchStatus, MatchStrategy,
    SourceKind,
};
use invoice_recon::service::registry::ReferenceInput;
use invoice_recon::service::{MatchSettings, RunContext, ToolInput};
use invoice_recon::{reconcile, ToolRegistry};
use std::fs;
use std::str::FromStr;

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn field(s: &str) -> Option<ExtractedField> {
    Some(s.into())
}

const PO_CSV: &str = "\
Glen Appliances Purchase Order,,,,,,,,,,,
SKU,Description,Vendor,PO Ref No.,Qty,Rate,Disc,Basic,CGST,SGST,Tax,Total
TR-GL1054,Chimney 60cm,Glen,PO-7781,2,,,,,,180.00,1180.00
WO-GL2210,Hob 3 burner,Glen,PO-7781,1,,,,,,90.00,590.00
TR-GL9999,Cooktop glass,Glen,PO-7781,1,,,,,,18.00,118.00
,,,,,,,,,,,1888.00
";

fn invoice() -> ExtractedDocument {
    ExtractedDocument {
        invoice_id: field("INV/PO-7781/24"),
        sub_total: field("1,500.00"),
        invoice_total: field("1,770.00"),
        items: vec![
            ExtractedItem {
                description: field("2 | Chimney 60cm Code: GLIO54"),
                amount: field("1,000.00"),
                tax: field("180.00"),
                ..Default::default()
            },
            ExtractedItem {
                product_code: field("gl2210"),
                description: field("Hob 3 burner"),
                quantity: field("1"),
                amount: field("500.00"),
                tax: field("90.00"),
                ..Default::default()
            },
            ExtractedItem {
                description: field("HSN Summary 8414"),
                amount: field("1500.00"),
                ..Default::default()
            },
        ],
        ..Default::default()
    }
}

fn glen_options() -> LoaderOptions {
    LoaderOptions {
        strip_prefixes: vec!["TR-".to_string(), "WO-".to_string()],
        ..Default::default()
    }
}

#[test]
fn csv_purchase_order_against_extracted_invoice() {
    let dir = tempfile::tempdir().unwrap();
    let po_path = dir.path().join("glen_po.csv");
    fs::write(&po_path, PO_CSV).unwrap();

    let options = glen_options();
    let reference = loader::load(&Source::File(po_path), SourceKind::Reference, &options).unwrap();
    assert_eq!(reference.len(), 3);
    assert_eq!(reference[0].material_code, "GL1054");
    assert_eq!(reference[0].base_amount, dec("1000.00"));

    let document = invoice();
    let summary = document_summary(&document);
    let candidates = loader::load(
        &Source::Extracted {
            name: "glen invoice".to_string(),
            document,
        },
        SourceKind::Candidate,
        &options,
    )
    .unwrap();
    assert_eq!(candidates.len(), 2);

    let result = reconcile(&reference, &candidates, &summary, &MatchSettings::default());

    // 发票上 1/0 被识别成 I/O，仍应模糊命中
    assert_eq!(result.report[0].strategy_used, MatchStrategy::FuzzyCode);
    assert_eq!(result.report[0].status, MatchStatus::Match);
    assert_eq!(result.report[1].strategy_used, MatchStrategy::ExactCode);
    assert_eq!(result.report[1].status, MatchStatus::Match);
    assert_eq!(result.report[2].status, MatchStatus::NotFound);

    // 行级 3 + 2 × 2，单据级 3
    assert_eq!(result.summary.total_checks, 10);
    assert_eq!(result.summary.passed_checks, 7);
    assert_eq!(result.summary.accuracy_pct, 70.0);

    let reference_check = result.summary.check(CheckKind::ReferenceId).unwrap();
    assert!(reference_check.passed);
    // 288 vs 1770 - 1500
    let tax_check = result.summary.check(CheckKind::TaxTotal).unwrap();
    assert!(!tax_check.passed);
    assert!(!result.summary.check(CheckKind::GrandTotal).unwrap().passed);

    let (report_path, summary_path) = export_to_csv(&result, dir.path(), "glen").unwrap();
    let report = fs::read_to_string(report_path).unwrap();
    assert_eq!(report.lines().count(), 4);
    assert!(report.contains("❌ NOT_FOUND"));
    let summary_csv = fs::read_to_string(summary_path).unwrap();
    assert!(summary_csv.contains("Overall Accuracy,7/10,,70.00%"));
}

#[test]
fn registry_runs_tool_from_file_reference() {
    let dir = tempfile::tempdir().unwrap();
    let po_path = dir.path().join("glen_po.csv");
    fs::write(&po_path, PO_CSV).unwrap();

    let registry = ToolRegistry::builtin();
    let ctx = RunContext::new("glen", MatchSettings::default(), "SKU");
    let output = registry
        .run(
            "glen",
            &ctx,
            ToolInput {
                reference: ReferenceInput::Path { path: po_path },
                candidate: invoice(),
                tolerance: None,
            },
        )
        .unwrap();

    assert_eq!(output.tool, "glen");
    assert_eq!(output.invoice_no, "INV/PO-7781/24");
    assert_eq!(output.table.len(), 3);
    assert_eq!(output.reconciliation.count(MatchStatus::Match), 2);
}

#[test]
fn unsupported_reference_format_fails_whole_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("po.pdf");
    fs::write(&path, "not a sheet").unwrap();

    let err = loader::load(&Source::File(path), SourceKind::Reference, &glen_options()).unwrap_err();
    assert!(err.source_name().ends_with("po.pdf"));
}
