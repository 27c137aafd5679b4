// tests/migrations.rs
//
// Migration engine: идемпотентность, порядок по имени, дубликаты, fail-fast с откатом.

use anyhow::Result;
use rusqlite::Connection;
use std::path::PathBuf;

use SramVault::migrations::{self, apply_set, Migration, MIGRATIONS};
use SramVault::SnapshotDb;

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let root = std::env::temp_dir().join(format!("sramv-{}-{}-{}", prefix, pid, t));
    std::fs::create_dir_all(&root).unwrap();
    root
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1;",
        [name],
        |r| r.get(0),
    )?;
    Ok(n > 0)
}

fn schema_dump(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT sql FROM sqlite_master WHERE sql IS NOT NULL ORDER BY name;")?;
    let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

#[test]
fn apply_twice_is_a_noop() -> Result<()> {
    let root = unique_root("mig-idem");
    let path = root.join("m.sqlite3");

    let db = SnapshotDb::open(&path)?;
    let schema1 = schema_dump(db.conn())?;
    let ledger1 = migrations::applied(db.conn())?;
    drop(db);

    let mut conn = Connection::open(&path)?;
    assert_eq!(apply_set(&mut conn, MIGRATIONS)?, 0, "second apply must not re-run anything");
    migrations::apply(&mut conn)?;

    assert_eq!(schema_dump(&conn)?, schema1);
    assert_eq!(migrations::applied(&conn)?, ledger1, "ledger rows are never rewritten");
    assert_eq!(ledger1.len(), MIGRATIONS.len());
    Ok(())
}

#[test]
fn migrations_run_in_name_order() -> Result<()> {
    // Объявлены в обратном порядке: b зависит от a.
    let set = [
        Migration {
            name: "0002_b.sql",
            sql: "INSERT INTO log(step) VALUES('b');",
        },
        Migration {
            name: "0001_a.sql",
            sql: "CREATE TABLE log(seq INTEGER PRIMARY KEY, step TEXT NOT NULL); \
                  INSERT INTO log(step) VALUES('a');",
        },
    ];
    let mut conn = Connection::open_in_memory()?;
    assert_eq!(apply_set(&mut conn, &set)?, 2);

    let mut stmt = conn.prepare("SELECT step FROM log ORDER BY seq;")?;
    let steps: Vec<String> = stmt
        .query_map([], |r| r.get(0))?
        .collect::<Result<_, _>>()?;
    assert_eq!(steps, vec!["a".to_string(), "b".to_string()]);
    Ok(())
}

#[test]
fn duplicate_names_fail_before_anything_is_applied() -> Result<()> {
    let set = [
        Migration {
            name: "0001_x.sql",
            sql: "CREATE TABLE x1(id INTEGER);",
        },
        Migration {
            name: "0001_x.sql",
            sql: "CREATE TABLE x2(id INTEGER);",
        },
    ];
    let mut conn = Connection::open_in_memory()?;
    let err = apply_set(&mut conn, &set).expect_err("duplicates must be rejected");
    assert!(format!("{:#}", err).contains("duplicate"), "got: {:#}", err);

    assert!(!table_exists(&conn, "x1")?);
    assert!(!table_exists(&conn, "x2")?);
    assert!(migrations::applied(&conn)?.is_empty());
    Ok(())
}

#[test]
fn failing_migration_rolls_back_and_stops() -> Result<()> {
    let set = [
        Migration {
            name: "0001_ok.sql",
            sql: "CREATE TABLE ok1(id INTEGER);",
        },
        Migration {
            // первая инструкция выполнится, вторая упадёт: всё должно откатиться
            name: "0002_broken.sql",
            sql: "CREATE TABLE half(id INTEGER); THIS IS NOT SQL;",
        },
        Migration {
            name: "0003_never.sql",
            sql: "CREATE TABLE never(id INTEGER);",
        },
    ];
    let mut conn = Connection::open_in_memory()?;
    assert!(apply_set(&mut conn, &set).is_err());

    assert!(table_exists(&conn, "ok1")?, "earlier migration stays applied");
    assert!(!table_exists(&conn, "half")?, "failed migration is rolled back");
    assert!(!table_exists(&conn, "never")?, "later migrations are not attempted");

    let names: Vec<String> = migrations::applied(&conn)?.into_iter().map(|m| m.name).collect();
    assert_eq!(names, vec!["0001_ok.sql".to_string()]);

    // повтор после "исправления" продолжает с места сбоя
    let fixed = [
        set[0],
        Migration {
            name: "0002_broken.sql",
            sql: "CREATE TABLE half(id INTEGER);",
        },
        set[2],
    ];
    assert_eq!(apply_set(&mut conn, &fixed)?, 2);
    assert!(table_exists(&conn, "never")?);
    Ok(())
}

#[test]
fn old_schema_gets_tag_column() -> Result<()> {
    let root = unique_root("mig-upgrade");
    let path = root.join("old.sqlite3");
    {
        // БД, созданная до появления tag (только первая миграция)
        let mut conn = Connection::open(&path)?;
        apply_set(&mut conn, &MIGRATIONS[..1])?;
        conn.execute(
            "INSERT INTO snapshots(ts_ms, crc32, sram) VALUES(1, 0, x'');",
            [],
        )?;
    }
    let mut db = SnapshotDb::open(&path)?;
    db.insert_tagged(b"x", "pinned")?;
    assert_eq!(db.counts()?, (1, 1));
    Ok(())
}
