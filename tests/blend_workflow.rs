use approx::assert_relative_eq;
use chrono::NaiveDate;
use rusqlite::Connection;

use blend_calculator::db::{self, SaveRequest};
use blend_calculator::error::SaveError;
use blend_calculator::input::{parse_entry_document, parse_material};
use blend_calculator::{BlendSheet, PercentageStatus, aggregate, classify_percentage_total};

const STORED_FORM: &str = r#"{
    "sale_price": "11000",
    "entries": [
        {"id": "12", "name": "AI-92", "octane": "92", "price": "12000", "percentage": "40"},
        {"id": "15", "name": "A-80", "octane": 80, "price": 9000, "percentage": 60},
        {"id": "18", "name": "Reformate", "octane": "95", "price": "", "percentage": ""}
    ]
}"#;

#[test]
fn stored_form_aggregates_like_the_reference_blend() {
    let document = parse_entry_document(STORED_FORM).unwrap();
    let totals = aggregate(&document.entries, document.sale_price.unwrap_or(0.0));

    assert_relative_eq!(totals.total_percentage, 100.0);
    assert_relative_eq!(totals.total_octane, 84.8);
    assert_relative_eq!(totals.total_cost, 10200.0);
    assert_relative_eq!(totals.profit, 800.0);
    assert_eq!(
        classify_percentage_total(totals.total_percentage).status,
        PercentageStatus::Complete
    );
}

#[test]
fn editing_a_sheet_then_saving_and_reloading() {
    let mut sheet = BlendSheet::new();
    sheet.merge(parse_entry_document(STORED_FORM).unwrap());

    // Fill in the reformate row, pushing the blend over 100%
    sheet.upsert(parse_material("Reformate:95:14000:10", "18").unwrap());
    assert_eq!(sheet.percentage_check().status, PercentageStatus::OverLimit);

    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();

    let refused = db::save_calculation(
        &mut conn,
        &SaveRequest {
            calculation_date: date,
            entries: sheet.entries(),
            sale_price: sheet.sale_price(),
            notes: None,
        },
    );
    assert!(matches!(refused, Err(SaveError::OverLimit { .. })));

    // Trim the straight-run share back to 50%
    sheet.upsert(parse_material("A-80:80:9000:50", "15").unwrap());
    assert_eq!(sheet.percentage_check().status, PercentageStatus::Complete);

    let id = db::save_calculation(
        &mut conn,
        &SaveRequest {
            calculation_date: date,
            entries: sheet.entries(),
            sale_price: sheet.sale_price(),
            notes: Some("trimmed".to_string()),
        },
    )
    .unwrap();

    let (record, lines) = db::get_calculation(&conn, id).unwrap().unwrap();
    assert_eq!(lines.len(), 3);
    assert_eq!(record.totals, sheet.summary());
    assert_relative_eq!(record.totals.total_cost, 4800.0 + 4500.0 + 1400.0);
}
