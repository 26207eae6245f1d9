// ==========================================
// 国际象棋赛事管理引擎 - 等级分名单仓储
// ==========================================
// 职责: 名单与名单棋手的存取、按 FIDE ID / 姓名检索
// 存储: 独立的 SQLite 文件（不随赛事文件另存）
// 红线: 不解析名单文件格式，只接收已解析的记录
// ==========================================

use crate::db::{init_rating_list_schema, open_in_memory_connection, open_sqlite_connection};
use crate::domain::{RatedPlayer, RatingListInfo};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const PLAYER_COLUMNS: &str =
    "fide_id, name, federation, sex, title, birth_year, standard, rapid, blitz, extra";

pub struct RatingListRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RatingListRepository {
    /// 打开（或新建）名单库
    pub fn open(path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> RepositoryResult<Self> {
        let conn = open_in_memory_connection()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> RepositoryResult<Self> {
        init_rating_list_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 名单
    // ==========================================

    /// 登记新名单
    ///
    /// # 返回
    /// - Ok(i64): 名单 ID
    pub fn create_list(&self, name: &str, source: Option<&str>) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO rating_lists (name, source) VALUES (?1, ?2)",
            params![name, source],
        )?;
        let id = conn.last_insert_rowid();
        debug!(list_id = id, name, "登记等级分名单");
        Ok(id)
    }

    /// 全部名单（含棋手数），按导入先后
    pub fn lists(&self) -> RepositoryResult<Vec<RatingListInfo>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT l.id, l.name, l.source, l.imported_at,
                   (SELECT COUNT(*) FROM rated_players p WHERE p.list_id = l.id)
            FROM rating_lists l
            ORDER BY l.id
            "#,
        )?;
        let lists = stmt
            .query_map([], |row| {
                Ok(RatingListInfo {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    source: row.get(2)?,
                    imported_at: row.get(3)?,
                    players: row.get::<_, i64>(4)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lists)
    }

    pub fn list(&self, id: i64) -> RepositoryResult<RatingListInfo> {
        self.lists()?
            .into_iter()
            .find(|l| l.id == id)
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "RatingList".to_string(),
                id: id.to_string(),
            })
    }

    /// 删除名单（级联删除名单棋手）
    pub fn remove_list(&self, id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM rating_lists WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "RatingList".to_string(),
                id: id.to_string(),
            });
        }
        info!(list_id = id, "删除等级分名单");
        Ok(())
    }

    // ==========================================
    // 名单棋手
    // ==========================================

    /// 批量写入名单棋手（单个事务）
    pub fn insert_players(&self, list_id: i64, players: &[RatedPlayer]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO rated_players (list_id, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                PLAYER_COLUMNS
            ))?;
            for p in players {
                let extra = if p.extra.is_null() {
                    None
                } else {
                    Some(p.extra.to_string())
                };
                stmt.execute(params![
                    list_id,
                    p.fide_id as i64,
                    p.name,
                    p.federation,
                    p.sex,
                    p.title,
                    p.birth_year,
                    p.standard,
                    p.rapid,
                    p.blitz,
                    extra,
                ])?;
            }
        }
        tx.commit()?;
        Ok(players.len())
    }

    /// 按 FIDE ID 查找（多个名单均有时取最新导入的名单）
    pub fn find_by_fide_id(&self, fide_id: u64) -> RepositoryResult<Option<RatedPlayer>> {
        let conn = self.get_conn()?;
        let player = conn
            .query_row(
                &format!(
                    "SELECT {} FROM rated_players WHERE fide_id = ?1 ORDER BY list_id DESC LIMIT 1",
                    PLAYER_COLUMNS
                ),
                params![fide_id as i64],
                map_rated_player,
            )
            .optional()?;
        Ok(player)
    }

    /// 按姓名前缀检索（大小写不敏感），标准棋等级分降序
    ///
    /// # 参数
    /// - query: 姓名前缀，如 "carlsen" 或 "Carlsen, M"
    /// - limit: 最多返回条数
    pub fn search_by_name(&self, query: &str, limit: usize) -> RepositoryResult<Vec<RatedPlayer>> {
        let pattern = format!("{}%", escape_like(query.trim()));
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM rated_players
            WHERE name LIKE ?1 ESCAPE '\'
            ORDER BY standard DESC, name COLLATE NOCASE, list_id DESC
            LIMIT ?2
            "#,
            PLAYER_COLUMNS
        ))?;
        let players = stmt
            .query_map(params![pattern, limit as i64], map_rated_player)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(players)
    }
}

fn map_rated_player(row: &Row) -> rusqlite::Result<RatedPlayer> {
    let extra: Option<String> = row.get(9)?;
    Ok(RatedPlayer {
        fide_id: row.get::<_, i64>(0)? as u64,
        name: row.get(1)?,
        federation: row.get(2)?,
        sex: row.get(3)?,
        title: row.get(4)?,
        birth_year: row.get(5)?,
        standard: row.get(6)?,
        rapid: row.get(7)?,
        blitz: row.get(8)?,
        extra: extra
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or(serde_json::Value::Null),
    })
}

/// LIKE 通配符转义
fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rated(fide_id: u64, name: &str, standard: u32) -> RatedPlayer {
        RatedPlayer {
            fide_id,
            name: name.to_string(),
            federation: "ESP".to_string(),
            sex: "M".to_string(),
            title: String::new(),
            birth_year: Some(2000),
            standard,
            rapid: 0,
            blitz: 0,
            extra: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let repo = RatingListRepository::open_in_memory().unwrap();
        let list = repo.create_list("FIDE 2024-03", Some("players_list.txt")).unwrap();
        let mut garcia = rated(2200001, "Garcia, Ana", 2105);
        garcia.extra = serde_json::json!({"sk": 20});
        repo.insert_players(
            list,
            &[
                garcia.clone(),
                rated(2200002, "Garcia Lopez, Juan", 1980),
                rated(2200003, "Gomez, Luis", 2250),
            ],
        )
        .unwrap();

        assert_eq!(repo.find_by_fide_id(2200001).unwrap(), Some(garcia));
        assert_eq!(repo.find_by_fide_id(9).unwrap(), None);

        let names: Vec<String> = repo
            .search_by_name("garcia", 10)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Garcia, Ana", "Garcia Lopez, Juan"]);
        assert_eq!(repo.search_by_name("g", 1).unwrap()[0].name, "Gomez, Luis");

        let info = repo.list(list).unwrap();
        assert_eq!(info.players, 3);
        assert_eq!(info.source.as_deref(), Some("players_list.txt"));
    }

    #[test]
    fn test_search_escapes_wildcards() {
        let repo = RatingListRepository::open_in_memory().unwrap();
        let list = repo.create_list("L", None).unwrap();
        repo.insert_players(list, &[rated(1, "Abc, X", 0), rated(2, "A_c, Y", 0)])
            .unwrap();

        let found = repo.search_by_name("A_", 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].fide_id, 2);
    }

    #[test]
    fn test_newest_list_wins_and_remove_cascades() {
        let repo = RatingListRepository::open_in_memory().unwrap();
        let old = repo.create_list("old", None).unwrap();
        repo.insert_players(old, &[rated(7, "Doe, John", 1800)]).unwrap();
        let new = repo.create_list("new", None).unwrap();
        repo.insert_players(new, &[rated(7, "Doe, John", 1850)]).unwrap();

        assert_eq!(repo.find_by_fide_id(7).unwrap().unwrap().standard, 1850);

        repo.remove_list(new).unwrap();
        assert_eq!(repo.find_by_fide_id(7).unwrap().unwrap().standard, 1800);
        assert_eq!(repo.lists().unwrap().len(), 1);
        assert!(matches!(
            repo.remove_list(new),
            Err(RepositoryError::NotFound { .. })
        ));
    }
}
