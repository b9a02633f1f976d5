//! Breeding cycle database operations.

use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

use super::{Database, DbError, DbResult};
use crate::engine::{
    check_ai_date, evaluate_guard, next_service_number, parse_date, parse_optional_date,
    GuardResult,
};
use crate::models::{BreedingCycle, CalfGender, CyclePatch, NewCycle, PdOutcome};

const CYCLE_COLUMNS: &str = r#"
    id, cow_id, service_number, ai_date, ai_status, pd_done, pd_result, pd_date,
    expected_delivery_date, actual_delivery_date, calf_gender, notes,
    created_at, updated_at
"#;

impl Database {
    /// Open a new cycle for a cow, atomically.
    ///
    /// The guard check, the back-dating check, service-number assignment and
    /// insert run inside one IMMEDIATE transaction, so a concurrent writer
    /// cannot slip a second open cycle in between.
    pub fn create_cycle(&self, new_cycle: &NewCycle) -> DbResult<BreedingCycle> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        if !cow_exists(&tx, &new_cycle.cow_id)? {
            return Err(DbError::NotFound(format!("cow {}", new_cycle.cow_id)));
        }

        let existing = select_cycles_for_cow(&tx, &new_cycle.cow_id)?;
        if let GuardResult::Blocked { blocking_record } = evaluate_guard(&existing) {
            return Err(DbError::Constraint(format!(
                "cow {} has an unresolved cycle {} (service {})",
                new_cycle.cow_id, blocking_record.id, blocking_record.service_number
            )));
        }
        check_ai_date(&existing, new_cycle.ai_date)
            .map_err(|e| DbError::Constraint(format!("cow {}: {e}", new_cycle.cow_id)))?;

        let cycle = new_cycle
            .clone()
            .into_cycle(next_service_number(&existing));
        insert_cycle_row(&tx, &cycle)?;
        tx.commit()?;

        tracing::info!(
            cow_id = %cycle.cow_id,
            cycle_id = %cycle.id,
            service_number = cycle.service_number,
            ai_date = %cycle.ai_date,
            "inserted breeding cycle"
        );
        Ok(cycle)
    }

    /// Get a cycle by ID.
    pub fn get_cycle(&self, cycle_id: &str) -> DbResult<Option<BreedingCycle>> {
        select_cycle(&self.conn, cycle_id)
    }

    /// All cycles for one cow, oldest AI first.
    pub fn list_cycles_for_cow(&self, cow_id: &str) -> DbResult<Vec<BreedingCycle>> {
        select_cycles_for_cow(&self.conn, cow_id)
    }

    /// All cycles in the herd.
    pub fn list_all_cycles(&self) -> DbResult<Vec<BreedingCycle>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CYCLE_COLUMNS} FROM breeding_cycles ORDER BY cow_id, ai_date, service_number"
        ))?;
        let rows = stmt.query_map([], CycleRow::from_row)?;

        let mut cycles = Vec::new();
        for row in rows {
            cycles.push(row?.try_into()?);
        }
        Ok(cycles)
    }

    /// Apply a patch to a stored cycle and return the updated record.
    ///
    /// The read and the write share one IMMEDIATE transaction, and the UPDATE
    /// only matches while the patched field is still unset, so a PD or a
    /// delivery is written at most once even across sessions.
    pub fn update_cycle(&self, cycle_id: &str, patch: &CyclePatch) -> DbResult<BreedingCycle> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        let mut cycle = select_cycle(&tx, cycle_id)?
            .ok_or_else(|| DbError::NotFound(format!("cycle {cycle_id}")))?;
        cycle.apply(patch);

        let (precondition, field) = match patch {
            CyclePatch::RecordPd(_) | CyclePatch::SetAiStatus(_) => ("pd_done = 0", "PD result"),
            CyclePatch::RecordDelivery(_) => ("actual_delivery_date IS NULL", "delivery"),
        };

        let rows_affected = tx
            .execute(
                &format!(
                    r#"
                    UPDATE breeding_cycles SET
                        ai_status = ?2,
                        pd_done = ?3,
                        pd_result = ?4,
                        pd_date = ?5,
                        actual_delivery_date = ?6,
                        calf_gender = ?7,
                        updated_at = ?8
                    WHERE id = ?1 AND {precondition}
                    "#
                ),
                params![
                    cycle.id,
                    cycle.ai_status.as_str(),
                    cycle.pd_done(),
                    cycle.pd_result().map(|r| r.as_str()),
                    cycle.pd_date().map(|d| d.to_string()),
                    cycle.actual_delivery_date.map(|d| d.to_string()),
                    cycle.calf_gender.map(|g| g.as_str()),
                    cycle.updated_at,
                ],
            )
            .map_err(|e| DbError::from_write(e, &format!("update cycle {cycle_id}")))?;

        if rows_affected == 0 {
            return Err(DbError::Constraint(format!(
                "cycle {cycle_id} already has a {field} recorded"
            )));
        }
        tx.commit()?;

        Ok(cycle)
    }
}

fn cow_exists(conn: &Connection, cow_id: &str) -> DbResult<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM cows WHERE id = ?", [cow_id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

fn insert_cycle_row(conn: &Connection, cycle: &BreedingCycle) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO breeding_cycles (
            id, cow_id, service_number, ai_date, ai_status, pd_done, pd_result, pd_date,
            expected_delivery_date, actual_delivery_date, calf_gender, notes,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
        params![
            cycle.id,
            cycle.cow_id,
            cycle.service_number,
            cycle.ai_date.to_string(),
            cycle.ai_status.as_str(),
            cycle.pd_done(),
            cycle.pd_result().map(|r| r.as_str()),
            cycle.pd_date().map(|d| d.to_string()),
            cycle.expected_delivery_date.map(|d| d.to_string()),
            cycle.actual_delivery_date.map(|d| d.to_string()),
            cycle.calf_gender.map(|g| g.as_str()),
            cycle.notes,
            cycle.created_at,
            cycle.updated_at,
        ],
    )
    .map_err(|e| DbError::from_write(e, &format!("insert cycle for cow {}", cycle.cow_id)))?;
    Ok(())
}

fn select_cycle(conn: &Connection, cycle_id: &str) -> DbResult<Option<BreedingCycle>> {
    conn.query_row(
        &format!("SELECT {CYCLE_COLUMNS} FROM breeding_cycles WHERE id = ?"),
        [cycle_id],
        CycleRow::from_row,
    )
    .optional()?
    .map(BreedingCycle::try_from)
    .transpose()
}

fn select_cycles_for_cow(conn: &Connection, cow_id: &str) -> DbResult<Vec<BreedingCycle>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CYCLE_COLUMNS} FROM breeding_cycles WHERE cow_id = ? ORDER BY ai_date, service_number"
    ))?;
    let rows = stmt.query_map([cow_id], CycleRow::from_row)?;

    let mut cycles = Vec::new();
    for row in rows {
        cycles.push(row?.try_into()?);
    }
    Ok(cycles)
}

/// Internal row representation for breeding cycles.
struct CycleRow {
    id: String,
    cow_id: String,
    service_number: u32,
    ai_date: String,
    ai_status: String,
    pd_done: bool,
    pd_result: Option<String>,
    pd_date: Option<String>,
    expected_delivery_date: Option<String>,
    actual_delivery_date: Option<String>,
    calf_gender: Option<String>,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl CycleRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(CycleRow {
            id: row.get(0)?,
            cow_id: row.get(1)?,
            service_number: row.get(2)?,
            ai_date: row.get(3)?,
            ai_status: row.get(4)?,
            pd_done: row.get(5)?,
            pd_result: row.get(6)?,
            pd_date: row.get(7)?,
            expected_delivery_date: row.get(8)?,
            actual_delivery_date: row.get(9)?,
            calf_gender: row.get(10)?,
            notes: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }
}

fn invalid_data<E: std::fmt::Display>(cycle_id: &str) -> impl Fn(E) -> DbError + '_ {
    move |e| DbError::InvalidData(format!("cycle {cycle_id}: {e}"))
}

impl TryFrom<CycleRow> for BreedingCycle {
    type Error = DbError;

    fn try_from(row: CycleRow) -> Result<Self, Self::Error> {
        let pd = match (row.pd_done, row.pd_result.as_deref(), row.pd_date.as_deref()) {
            (false, _, _) => None,
            (true, Some(result), Some(date)) => Some(PdOutcome {
                result: result.parse().map_err(invalid_data(&row.id))?,
                date: parse_date(date).map_err(invalid_data(&row.id))?,
            }),
            (true, _, _) => {
                return Err(DbError::InvalidData(format!(
                    "cycle {}: pd_done set without result and date",
                    row.id
                )))
            }
        };

        Ok(BreedingCycle {
            ai_date: parse_date(&row.ai_date).map_err(invalid_data(&row.id))?,
            ai_status: row.ai_status.parse().map_err(invalid_data(&row.id))?,
            pd,
            expected_delivery_date: parse_optional_date(row.expected_delivery_date.as_deref())
                .map_err(invalid_data(&row.id))?,
            actual_delivery_date: parse_optional_date(row.actual_delivery_date.as_deref())
                .map_err(invalid_data(&row.id))?,
            calf_gender: row
                .calf_gender
                .as_deref()
                .map(str::parse::<CalfGender>)
                .transpose()
                .map_err(invalid_data(&row.id))?,
            id: row.id,
            cow_id: row.cow_id,
            service_number: row.service_number,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
