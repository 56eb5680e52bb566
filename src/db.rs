//! Database schema and operations for saved calculations

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{info, warn};

use crate::calculator;
use crate::error::SaveError;
use crate::models::{
    AggregateResult, CalculationRecord, Contributions, MaterialEntry, MaterialLine,
};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- One row per saved calculation
        CREATE TABLE IF NOT EXISTS calculations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            calculation_date TEXT NOT NULL,
            sale_price REAL NOT NULL,
            total_percentage REAL NOT NULL,
            total_octane REAL NOT NULL,
            total_cost REAL NOT NULL,
            profit REAL NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Filled materials of a calculation, in display order
        CREATE TABLE IF NOT EXISTS calculation_materials (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            calculation_id INTEGER NOT NULL REFERENCES calculations(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            identifier TEXT NOT NULL,
            name TEXT NOT NULL,
            octane_rating REAL NOT NULL,
            unit_price REAL NOT NULL,
            inclusion_percentage REAL NOT NULL,
            octane_contribution REAL NOT NULL,
            cost_contribution REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_calculation_materials_calculation
            ON calculation_materials(calculation_id);
        "#,
    )?;
    Ok(())
}

/// A calculation ready to be saved
#[derive(Debug, Clone)]
pub struct SaveRequest<'a> {
    pub calculation_date: NaiveDate,
    pub entries: &'a [MaterialEntry],
    pub sale_price: f64,
    pub notes: Option<String>,
}

/// Save a calculation, refusing empty or over-limit blends
///
/// Only filled materials are written. Totals are recomputed here rather than
/// trusted from the caller.
pub fn save_calculation(
    conn: &mut Connection,
    request: &SaveRequest<'_>,
) -> Result<i64, SaveError> {
    let lines = calculator::filled_lines(request.entries);
    if lines.is_empty() {
        warn!("refusing to save a calculation without filled materials");
        return Err(SaveError::NoMaterials);
    }

    let totals = calculator::aggregate(request.entries, request.sale_price);
    if calculator::classify_percentage_total(totals.total_percentage).is_over_limit {
        warn!(total = totals.total_percentage, "refusing to save an over-limit blend");
        return Err(SaveError::OverLimit {
            total: totals.total_percentage,
        });
    }

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO calculations (calculation_date, sale_price, total_percentage, total_octane, total_cost, profit, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            request.calculation_date,
            totals.sale_price,
            totals.total_percentage,
            totals.total_octane,
            totals.total_cost,
            totals.profit,
            &request.notes,
        ),
    )?;
    let id = tx.last_insert_rowid();

    {
        let mut stmt = tx.prepare(
            "INSERT INTO calculation_materials (calculation_id, position, identifier, name, octane_rating,
                 unit_price, inclusion_percentage, octane_contribution, cost_contribution)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for (position, line) in lines.iter().enumerate() {
            stmt.execute((
                id,
                position as i64,
                &line.entry.identifier,
                &line.entry.name,
                line.entry.octane_rating,
                line.entry.unit_price,
                line.entry.inclusion_percentage,
                line.contributions.octane_contribution,
                line.contributions.cost_contribution,
            ))?;
        }
    }
    tx.commit()?;

    info!(id, materials = lines.len(), "saved calculation");
    Ok(id)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CalculationRecord> {
    Ok(CalculationRecord {
        id: row.get(0)?,
        calculation_date: row.get(1)?,
        totals: AggregateResult {
            sale_price: row.get(2)?,
            total_percentage: row.get(3)?,
            total_octane: row.get(4)?,
            total_cost: row.get(5)?,
            profit: row.get(6)?,
        },
        notes: row.get(7)?,
        created_at: row.get(8)?,
    })
}

const RECORD_COLUMNS: &str = "id, calculation_date, sale_price, total_percentage, \
     total_octane, total_cost, profit, notes, created_at";

/// List saved calculations, newest first
pub fn list_calculations(conn: &Connection) -> rusqlite::Result<Vec<CalculationRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM calculations ORDER BY calculation_date DESC, id DESC"
    ))?;

    let rows = stmt.query_map([], record_from_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Get a saved calculation with its materials
pub fn get_calculation(
    conn: &Connection,
    id: i64,
) -> rusqlite::Result<Option<(CalculationRecord, Vec<MaterialLine>)>> {
    let record = conn
        .query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM calculations WHERE id = ?1"),
            [id],
            record_from_row,
        )
        .optional()?;

    let Some(record) = record else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT identifier, name, octane_rating, unit_price, inclusion_percentage,
                octane_contribution, cost_contribution
         FROM calculation_materials
         WHERE calculation_id = ?1
         ORDER BY position",
    )?;

    let rows = stmt.query_map([id], |row| {
        Ok(MaterialLine {
            entry: MaterialEntry {
                identifier: row.get(0)?,
                name: row.get(1)?,
                octane_rating: row.get(2)?,
                unit_price: row.get(3)?,
                inclusion_percentage: row.get(4)?,
            },
            contributions: Contributions {
                octane_contribution: row.get(5)?,
                cost_contribution: row.get(6)?,
            },
        })
    })?;

    let mut lines = Vec::new();
    for row in rows {
        lines.push(row?);
    }
    Ok(Some((record, lines)))
}

/// Delete a saved calculation and its materials
///
/// Returns false when no calculation had that id.
pub fn delete_calculation(conn: &mut Connection, id: i64) -> rusqlite::Result<bool> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM calculation_materials WHERE calculation_id = ?1", [id])?;
    let deleted = tx.execute("DELETE FROM calculations WHERE id = ?1", [id])?;
    tx.commit()?;

    if deleted > 0 {
        info!(id, "deleted calculation");
    }
    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn blend() -> Vec<MaterialEntry> {
        vec![
            MaterialEntry::new("1", "AI-92", 92.0, 12000.0, 40.0),
            MaterialEntry::new("2", "Unused", 95.0, 14000.0, 0.0),
            MaterialEntry::new("3", "A-80", 80.0, 9000.0, 60.0),
        ]
    }

    #[test]
    fn save_then_get_keeps_only_filled_materials() {
        let mut conn = memory_db();
        let entries = blend();
        let id = save_calculation(
            &mut conn,
            &SaveRequest {
                calculation_date: date("2024-03-01"),
                entries: &entries,
                sale_price: 11000.0,
                notes: Some("morning batch".to_string()),
            },
        )
        .unwrap();

        let (record, lines) = get_calculation(&conn, id).unwrap().unwrap();
        assert_eq!(record.calculation_date, date("2024-03-01"));
        assert_eq!(record.notes.as_deref(), Some("morning batch"));
        assert_relative_eq!(record.totals.total_octane, 84.8);
        assert_relative_eq!(record.totals.profit, 800.0);

        let names: Vec<_> = lines.iter().map(|l| l.entry.name.as_str()).collect();
        assert_eq!(names, vec!["AI-92", "A-80"]);
        assert_relative_eq!(lines[1].contributions.cost_contribution, 5400.0);
    }

    #[test]
    fn save_refuses_over_limit_totals() {
        let mut conn = memory_db();
        let entries = vec![
            MaterialEntry::new("1", "AI-92", 92.0, 12000.0, 50.0),
            MaterialEntry::new("2", "A-80", 80.0, 9000.0, 50.02),
        ];
        let err = save_calculation(
            &mut conn,
            &SaveRequest {
                calculation_date: date("2024-03-01"),
                entries: &entries,
                sale_price: 0.0,
                notes: None,
            },
        )
        .unwrap_err();

        assert!(matches!(err, SaveError::OverLimit { .. }));
        assert!(list_calculations(&conn).unwrap().is_empty());
    }

    #[test]
    fn save_accepts_the_tolerance_band() {
        let mut conn = memory_db();
        let entries = vec![MaterialEntry::new("1", "AI-92", 92.0, 12000.0, 100.01)];
        let result = save_calculation(
            &mut conn,
            &SaveRequest {
                calculation_date: date("2024-03-01"),
                entries: &entries,
                sale_price: 0.0,
                notes: None,
            },
        );
        assert!(result.is_ok());
    }

    #[test]
    fn save_refuses_blends_without_filled_materials() {
        let mut conn = memory_db();
        let entries = vec![MaterialEntry::new("1", "AI-92", 92.0, 0.0, 40.0)];
        let err = save_calculation(
            &mut conn,
            &SaveRequest {
                calculation_date: date("2024-03-01"),
                entries: &entries,
                sale_price: 1000.0,
                notes: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, SaveError::NoMaterials));
    }

    #[test]
    fn list_is_newest_first_and_delete_removes() {
        let mut conn = memory_db();
        let entries = blend();
        let mut ids = Vec::new();
        for day in ["2024-03-01", "2024-03-05", "2024-03-03"] {
            let request = SaveRequest {
                calculation_date: date(day),
                entries: &entries,
                sale_price: 11000.0,
                notes: None,
            };
            ids.push(save_calculation(&mut conn, &request).unwrap());
        }

        let dates: Vec<_> = list_calculations(&conn)
            .unwrap()
            .iter()
            .map(|r| r.calculation_date.to_string())
            .collect();
        assert_eq!(dates, vec!["2024-03-05", "2024-03-03", "2024-03-01"]);

        assert!(delete_calculation(&mut conn, ids[0]).unwrap());
        assert!(!delete_calculation(&mut conn, ids[0]).unwrap());
        assert!(get_calculation(&conn, ids[0]).unwrap().is_none());
        assert_eq!(list_calculations(&conn).unwrap().len(), 2);

        let orphaned: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM calculation_materials WHERE calculation_id = ?1",
                [ids[0]],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(orphaned, 0);
    }
}
