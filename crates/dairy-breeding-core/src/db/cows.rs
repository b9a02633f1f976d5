//! Cow database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{Cow, MilkingGroupState};

const COW_COLUMNS: &str = r#"
    id, cow_number, needs_milking_move, needs_milking_move_at,
    moved_to_milking, moved_to_milking_at, created_at, updated_at
"#;

impl Database {
    /// Insert a new cow.
    pub fn insert_cow(&self, cow: &Cow) -> DbResult<()> {
        let flags = FlagColumns::from(&cow.milking);
        self.conn
            .execute(
                r#"
                INSERT INTO cows (
                    id, cow_number, needs_milking_move, needs_milking_move_at,
                    moved_to_milking, moved_to_milking_at, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    cow.id,
                    cow.cow_number,
                    flags.needs_milking_move,
                    flags.needs_milking_move_at,
                    flags.moved_to_milking,
                    flags.moved_to_milking_at,
                    cow.created_at,
                    cow.updated_at,
                ],
            )
            .map_err(|e| DbError::from_write(e, &format!("insert cow {}", cow.cow_number)))?;
        tracing::info!(cow_id = %cow.id, cow_number = %cow.cow_number, "inserted cow");
        Ok(())
    }

    /// Get a cow by ID.
    pub fn get_cow(&self, cow_id: &str) -> DbResult<Option<Cow>> {
        self.conn
            .query_row(
                &format!("SELECT {COW_COLUMNS} FROM cows WHERE id = ?"),
                [cow_id],
                CowRow::from_row,
            )
            .optional()?
            .map(Cow::try_from)
            .transpose()
    }

    /// Get a cow by its herd number.
    pub fn get_cow_by_number(&self, cow_number: &str) -> DbResult<Option<Cow>> {
        self.conn
            .query_row(
                &format!("SELECT {COW_COLUMNS} FROM cows WHERE cow_number = ?"),
                [cow_number],
                CowRow::from_row,
            )
            .optional()?
            .map(Cow::try_from)
            .transpose()
    }

    /// List all cows ordered by herd number.
    pub fn list_cows(&self) -> DbResult<Vec<Cow>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {COW_COLUMNS} FROM cows ORDER BY cow_number"))?;

        let rows = stmt.query_map([], CowRow::from_row)?;

        let mut cows = Vec::new();
        for row in rows {
            cows.push(row?.try_into()?);
        }
        Ok(cows)
    }

    /// Persist the milking-group flags for a cow and return the updated record.
    pub fn update_cow_flags(&self, cow_id: &str, state: &MilkingGroupState) -> DbResult<Cow> {
        let flags = FlagColumns::from(state);
        let rows_affected = self.conn.execute(
            r#"
            UPDATE cows SET
                needs_milking_move = ?2,
                needs_milking_move_at = ?3,
                moved_to_milking = ?4,
                moved_to_milking_at = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
            params![
                cow_id,
                flags.needs_milking_move,
                flags.needs_milking_move_at,
                flags.moved_to_milking,
                flags.moved_to_milking_at,
                Utc::now().to_rfc3339(),
            ],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("cow {cow_id}")));
        }
        self.get_cow(cow_id)?
            .ok_or_else(|| DbError::NotFound(format!("cow {cow_id}")))
    }

    /// Delete a cow and, by cascade, its breeding cycles.
    pub fn delete_cow(&self, cow_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM cows WHERE id = ?", [cow_id])?;
        Ok(rows_affected > 0)
    }
}

/// The four persisted flag columns for a milking-group state.
struct FlagColumns {
    needs_milking_move: bool,
    needs_milking_move_at: Option<String>,
    moved_to_milking: bool,
    moved_to_milking_at: Option<String>,
}

impl From<&MilkingGroupState> for FlagColumns {
    fn from(state: &MilkingGroupState) -> Self {
        match state {
            MilkingGroupState::Normal => FlagColumns {
                needs_milking_move: false,
                needs_milking_move_at: None,
                moved_to_milking: false,
                moved_to_milking_at: None,
            },
            MilkingGroupState::FlaggedForMove { at } => FlagColumns {
                needs_milking_move: true,
                needs_milking_move_at: Some(at.to_rfc3339()),
                moved_to_milking: false,
                moved_to_milking_at: None,
            },
            MilkingGroupState::MovedToMilking { at } => FlagColumns {
                needs_milking_move: false,
                needs_milking_move_at: None,
                moved_to_milking: true,
                moved_to_milking_at: Some(at.to_rfc3339()),
            },
        }
    }
}

/// Internal row representation for cows.
struct CowRow {
    id: String,
    cow_number: String,
    needs_milking_move: bool,
    needs_milking_move_at: Option<String>,
    moved_to_milking: bool,
    moved_to_milking_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl CowRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(CowRow {
            id: row.get(0)?,
            cow_number: row.get(1)?,
            needs_milking_move: row.get(2)?,
            needs_milking_move_at: row.get(3)?,
            moved_to_milking: row.get(4)?,
            moved_to_milking_at: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

fn parse_timestamp(value: Option<String>) -> DbResult<Option<DateTime<Utc>>> {
    value
        .filter(|s| !s.is_empty())
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| DbError::InvalidData(format!("invalid timestamp: {s:?}")))
        })
        .transpose()
}

impl TryFrom<CowRow> for Cow {
    type Error = DbError;

    fn try_from(row: CowRow) -> Result<Self, Self::Error> {
        let fallback_at = parse_timestamp(Some(row.updated_at.clone()))
            .ok()
            .flatten()
            .unwrap_or_else(Utc::now);
        let milking = MilkingGroupState::from_flags(
            row.needs_milking_move,
            parse_timestamp(row.needs_milking_move_at)?,
            row.moved_to_milking,
            parse_timestamp(row.moved_to_milking_at)?,
            fallback_at,
        );

        Ok(Cow {
            id: row.id,
            cow_number: row.cow_number,
            milking,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
