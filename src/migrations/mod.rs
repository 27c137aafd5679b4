//! migrations: версионирование схемы sidecar-БД.
//!
//! Ledger: schema_migrations(name TEXT PRIMARY KEY, applied_ts_ms INTEGER NOT NULL).
//! Строки ledger только добавляются.
//!
//! Правила apply():
//! - миграции сортируются по имени (лексикографически), дубликаты имён => ошибка до применения;
//! - каждая миграция: BEGIN IMMEDIATE -> SQL -> запись в ledger -> COMMIT;
//! - сбой на любом шаге => ROLLBACK этой миграции и остановка (fail-fast),
//!   уже применённые остаются применёнными.
//!
//! SQL лежит в src/migrations/sql/*.sql и встраивается при компиляции.

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::metrics::record_migration_applied;
use crate::util::now_ms;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub name: &'static str,
    pub sql: &'static str,
}

/// Встроенные миграции схемы snapshots.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "202602180001_create_snapshots.sql",
        sql: include_str!("sql/202602180001_create_snapshots.sql"),
    },
    Migration {
        name: "202602180002_add_snapshots_tag.sql",
        sql: include_str!("sql/202602180002_add_snapshots_tag.sql"),
    },
];

const LEDGER_DDL: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (\
                          name TEXT PRIMARY KEY, applied_ts_ms INTEGER NOT NULL);";

/// Строка ledger.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AppliedMigration {
    pub name: String,
    pub applied_ts_ms: i64,
}

/// Apply the built-in migrations.
pub fn apply(conn: &mut Connection) -> Result<()> {
    apply_set(conn, MIGRATIONS).map(|_| ())
}

/// Apply an arbitrary migration set. Returns the number of migrations applied by this call.
pub fn apply_set(conn: &mut Connection, migrations: &[Migration]) -> Result<usize> {
    conn.execute_batch(LEDGER_DDL)
        .context("create schema_migrations")?;

    let mut ordered: Vec<&Migration> = migrations.iter().collect();
    ordered.sort_by(|a, b| a.name.cmp(b.name));

    for w in ordered.windows(2) {
        if w[0].name == w[1].name {
            return Err(anyhow!("migration: duplicate migration name {}", w[1].name));
        }
    }

    let mut applied = 0usize;
    for m in ordered {
        if is_applied(conn, m.name)
            .with_context(|| format!("migration: failed to query {}", m.name))?
        {
            continue;
        }

        // Transaction откатывается в Drop, если до commit() не дошли.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .with_context(|| format!("migration: begin {}", m.name))?;
        tx.execute_batch(m.sql)
            .with_context(|| format!("migration: failed applying {}", m.name))?;
        tx.execute(
            "INSERT INTO schema_migrations(name, applied_ts_ms) VALUES(?1, ?2);",
            params![m.name, now_ms()],
        )
        .with_context(|| format!("migration: failed recording {}", m.name))?;
        tx.commit()
            .with_context(|| format!("migration: commit {}", m.name))?;

        record_migration_applied();
        info!("migration applied: {}", m.name);
        applied += 1;
    }

    if applied == 0 {
        debug!("migration: schema up to date");
    }
    Ok(applied)
}

fn is_applied(conn: &Connection, name: &str) -> Result<bool> {
    let hit: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM schema_migrations WHERE name = ?1 LIMIT 1;",
            params![name],
            |r| r.get(0),
        )
        .optional()?;
    Ok(hit.is_some())
}

/// Ledger contents in name order.
pub fn applied(conn: &Connection) -> Result<Vec<AppliedMigration>> {
    let mut stmt =
        conn.prepare("SELECT name, applied_ts_ms FROM schema_migrations ORDER BY name ASC;")?;
    let rows = stmt.query_map([], |r| {
        Ok(AppliedMigration {
            name: r.get(0)?,
            applied_ts_ms: r.get(1)?,
        })
    })?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
