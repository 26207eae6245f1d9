// ==========================================
// 国际象棋赛事管理引擎 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键级联删除依赖 foreign_keys）
// - 统一 busy_timeout
// - 建表幂等，打开任意赛事文件前都可调用
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存数据库并应用统一配置
pub fn open_in_memory_connection() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version     INTEGER NOT NULL,
            applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS tournaments (
            id          TEXT PRIMARY KEY,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS options (
            tournament_id  TEXT NOT NULL REFERENCES tournaments(id) ON DELETE CASCADE,
            key            TEXT NOT NULL,
            value          TEXT NOT NULL,
            PRIMARY KEY (tournament_id, key)
        );

        CREATE TABLE IF NOT EXISTS players (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            tournament_id    TEXT NOT NULL REFERENCES tournaments(id) ON DELETE CASCADE,
            starting_rank    INTEGER NOT NULL,
            title            TEXT NOT NULL DEFAULT '',
            name             TEXT NOT NULL,
            surname          TEXT NOT NULL DEFAULT '',
            rating           INTEGER NOT NULL DEFAULT 0,
            national_rating  INTEGER NOT NULL DEFAULT 0,
            player_id        TEXT NOT NULL DEFAULT '',
            birth_date       TEXT NOT NULL DEFAULT '',
            federation       TEXT NOT NULL DEFAULT '',
            origin           TEXT NOT NULL DEFAULT '',
            sex              TEXT NOT NULL DEFAULT '',
            extra            TEXT
        );

        CREATE TABLE IF NOT EXISTS rounds (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            tournament_id  TEXT NOT NULL REFERENCES tournaments(id) ON DELETE CASCADE,
            number         INTEGER NOT NULL,
            date_time      TEXT,
            extra          TEXT,
            UNIQUE (tournament_id, number)
        );

        CREATE TABLE IF NOT EXISTS pairings (
            id            TEXT PRIMARY KEY,
            round_id      INTEGER NOT NULL REFERENCES rounds(id) ON DELETE CASCADE,
            board         INTEGER NOT NULL,
            white_player  INTEGER NOT NULL REFERENCES players(id) ON DELETE CASCADE,
            black_player  INTEGER REFERENCES players(id) ON DELETE CASCADE,
            white_result  TEXT NOT NULL,
            black_result  TEXT NOT NULL,
            extra         TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_players_tournament ON players(tournament_id);
        CREATE INDEX IF NOT EXISTS idx_rounds_tournament ON rounds(tournament_id);
        CREATE INDEX IF NOT EXISTS idx_pairings_round ON pairings(round_id);
        "#,
    )?;

    if read_schema_version(conn)?.is_none() {
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [CURRENT_SCHEMA_VERSION],
        )?;
    }

    Ok(())
}

/// 等级分名单库建表（幂等）；名单库与赛事文件分开存放
pub fn init_rating_list_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS rating_lists (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            name         TEXT NOT NULL,
            source       TEXT,
            imported_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS rated_players (
            list_id     INTEGER NOT NULL REFERENCES rating_lists(id) ON DELETE CASCADE,
            fide_id     INTEGER NOT NULL,
            name        TEXT NOT NULL,
            federation  TEXT NOT NULL DEFAULT '',
            sex         TEXT NOT NULL DEFAULT '',
            title       TEXT NOT NULL DEFAULT '',
            birth_year  INTEGER,
            standard    INTEGER NOT NULL DEFAULT 0,
            rapid       INTEGER NOT NULL DEFAULT 0,
            blitz       INTEGER NOT NULL DEFAULT 0,
            extra       TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_rated_players_list ON rated_players(list_id);
        CREATE INDEX IF NOT EXISTS idx_rated_players_fide_id ON rated_players(fide_id);
        CREATE INDEX IF NOT EXISTS idx_rated_players_name ON rated_players(name COLLATE NOCASE);
        "#,
    )
}

/// 读取 schema_version（若表不存在或为空则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_idempotent() {
        let conn = open_in_memory_connection().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_rating_list_schema_idempotent() {
        let conn = open_in_memory_connection().unwrap();
        init_rating_list_schema(&conn).unwrap();
        init_rating_list_schema(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('rating_lists', 'rated_players')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = open_in_memory_connection().unwrap();
        let on: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(on, 1);
    }
}
