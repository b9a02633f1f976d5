//! SQLite schema definition.

/// Complete database schema for dairy breeding records.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Cows
-- ============================================================================

CREATE TABLE IF NOT EXISTS cows (
    id TEXT PRIMARY KEY,
    cow_number TEXT NOT NULL UNIQUE,
    needs_milking_move INTEGER NOT NULL DEFAULT 0,
    needs_milking_move_at TEXT,                  -- RFC 3339, set while flagged
    moved_to_milking INTEGER NOT NULL DEFAULT 0,
    moved_to_milking_at TEXT,                    -- RFC 3339, set once moved
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Breeding Cycles (one row per AI attempt)
-- ============================================================================

CREATE TABLE IF NOT EXISTS breeding_cycles (
    id TEXT PRIMARY KEY,
    cow_id TEXT NOT NULL REFERENCES cows(id) ON DELETE CASCADE,
    service_number INTEGER NOT NULL CHECK (service_number > 0),
    ai_date TEXT NOT NULL,                       -- YYYY-MM-DD
    ai_status TEXT NOT NULL DEFAULT 'done'
        CHECK (ai_status IN ('done', 'pending', 'failed')),
    pd_done INTEGER NOT NULL DEFAULT 0,
    pd_result TEXT CHECK (pd_result IN ('positive', 'negative', 'inconclusive')),
    pd_date TEXT,
    expected_delivery_date TEXT,
    actual_delivery_date TEXT,
    calf_gender TEXT CHECK (calf_gender IN ('male', 'female')),
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (cow_id, service_number),
    -- PD result and date exist exactly when pd_done is set
    CHECK (
        (pd_done = 0 AND pd_result IS NULL AND pd_date IS NULL)
        OR (pd_done = 1 AND pd_result IS NOT NULL AND pd_date IS NOT NULL)
    )
);

CREATE INDEX IF NOT EXISTS idx_cycles_cow_ai_date ON breeding_cycles(cow_id, ai_date);

-- At most one cycle without a PD outcome per cow
CREATE UNIQUE INDEX IF NOT EXISTS idx_cycles_one_open_per_cow
    ON breeding_cycles(cow_id) WHERE pd_done = 0;

-- ============================================================================
-- Settings (alert thresholds)
-- ============================================================================

CREATE TABLE IF NOT EXISTS app_settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn conn_with_cow() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute("INSERT INTO cows (id, cow_number) VALUES ('c1', '101')", [])
            .unwrap();
        conn
    }

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);

        // Idempotent
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_pd_fields_constraint() {
        let conn = conn_with_cow();

        // pd_done without result should fail
        let result = conn.execute(
            "INSERT INTO breeding_cycles (id, cow_id, service_number, ai_date, pd_done) VALUES ('b1', 'c1', 1, '2024-01-01', 1)",
            [],
        );
        assert!(result.is_err());

        // Result without pd_done should fail
        let result = conn.execute(
            "INSERT INTO breeding_cycles (id, cow_id, service_number, ai_date, pd_result, pd_date) VALUES ('b1', 'c1', 1, '2024-01-01', 'positive', '2024-03-01')",
            [],
        );
        assert!(result.is_err());

        let result = conn.execute(
            "INSERT INTO breeding_cycles (id, cow_id, service_number, ai_date, pd_done, pd_result, pd_date) VALUES ('b1', 'c1', 1, '2024-01-01', 1, 'positive', '2024-03-01')",
            [],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_one_open_cycle_per_cow() {
        let conn = conn_with_cow();

        conn.execute(
            "INSERT INTO breeding_cycles (id, cow_id, service_number, ai_date) VALUES ('b1', 'c1', 1, '2024-01-01')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO breeding_cycles (id, cow_id, service_number, ai_date) VALUES ('b2', 'c1', 2, '2024-02-01')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_service_number_unique_per_cow() {
        let conn = conn_with_cow();

        conn.execute(
            "INSERT INTO breeding_cycles (id, cow_id, service_number, ai_date, pd_done, pd_result, pd_date) VALUES ('b1', 'c1', 1, '2024-01-01', 1, 'negative', '2024-03-01')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO breeding_cycles (id, cow_id, service_number, ai_date) VALUES ('b2', 'c1', 1, '2024-04-01')",
            [],
        );
        assert!(result.is_err());
    }
}
