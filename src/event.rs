// ==========================================
// 国际象棋赛事管理引擎 - 赛事文件 (Event)
// ==========================================
// 职责: 一个 SQLite 文件 = 一个 Event，包含多个赛事
// 连接: Event 持有 Arc<Mutex<Connection>>，各赛事存储共享同一连接
// ==========================================

use crate::db::{init_schema, open_in_memory_connection, open_sqlite_connection};
use crate::engine::error::TournamentResult;
use crate::engine::tournament::Tournament;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sqlite_store::SqliteTournamentStore;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

pub struct Event {
    conn: Arc<Mutex<Connection>>,
    file_name: Option<String>,
    tournaments: Vec<Tournament>,
}

impl Event {
    /// 打开（或新建）赛事文件并加载全部赛事
    pub fn open(path: &str) -> TournamentResult<Self> {
        let conn = open_sqlite_connection(path).map_err(RepositoryError::from)?;
        Self::from_connection(conn, Some(path.to_string()))
    }

    /// 内存赛事文件（测试 / 临时使用）
    pub fn open_in_memory() -> TournamentResult<Self> {
        let conn = open_in_memory_connection().map_err(RepositoryError::from)?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, file_name: Option<String>) -> TournamentResult<Self> {
        init_schema(&conn).map_err(RepositoryError::from)?;

        let mut event = Self {
            conn: Arc::new(Mutex::new(conn)),
            file_name,
            tournaments: Vec::new(),
        };

        for id in event.tournament_ids()? {
            let tournament = Tournament::load(event.store_for(&id))?;
            event.tournaments.push(tournament);
        }

        info!(
            file = event.file_name.as_deref().unwrap_or(":memory:"),
            tournaments = event.tournaments.len(),
            "赛事文件已打开"
        );
        Ok(event)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn store_for(&self, tournament_id: &str) -> Arc<SqliteTournamentStore> {
        Arc::new(SqliteTournamentStore::from_connection(
            Arc::clone(&self.conn),
            tournament_id,
        ))
    }

    fn tournament_ids(&self) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT id FROM tournaments ORDER BY rowid")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn number_of_tournaments(&self) -> usize {
        self.tournaments.len()
    }

    pub fn tournaments(&self) -> &[Tournament] {
        &self.tournaments
    }

    pub fn tournament(&self, index: usize) -> Option<&Tournament> {
        self.tournaments.get(index)
    }

    pub fn tournament_mut(&mut self, index: usize) -> Option<&mut Tournament> {
        self.tournaments.get_mut(index)
    }

    /// 按赛事 ID 查找（支持 ID 前缀）
    pub fn find_tournament_mut(&mut self, id: &str) -> Option<&mut Tournament> {
        self.tournaments.iter_mut().find(|t| t.id().starts_with(id))
    }

    /// 新建赛事
    pub fn create_tournament(&mut self) -> TournamentResult<&mut Tournament> {
        let id = uuid::Uuid::new_v4().to_string();
        {
            let conn = self.get_conn()?;
            conn.execute("INSERT INTO tournaments (id) VALUES (?1)", params![id])
                .map_err(RepositoryError::from)?;
        }

        let tournament = Tournament::create(self.store_for(&id))?;
        info!(tournament_id = %id, "新建赛事");

        let index = self.tournaments.len();
        self.tournaments.push(tournament);
        Ok(&mut self.tournaments[index])
    }

    /// 从 TRF 文件导入新赛事；失败时删除半成品赛事
    pub fn import_tournament(&mut self, path: &Path) -> TournamentResult<&mut Tournament> {
        let text = std::fs::read_to_string(path)?;

        let index = self.tournaments.len();
        self.create_tournament()?;

        if let Err(e) = self.tournaments[index].read_trf(&text) {
            warn!(path = %path.display(), error = %e, "TRF 导入失败");
            self.remove_tournament(index)?;
            return Err(e);
        }

        info!(path = %path.display(), "TRF 导入完成");
        Ok(&mut self.tournaments[index])
    }

    /// 删除赛事（级联删除其选项/棋手/轮次/对局）
    pub fn remove_tournament(&mut self, index: usize) -> TournamentResult<()> {
        assert!(index < self.tournaments.len(), "赛事下标越界");
        let tournament = self.tournaments.remove(index);
        let conn = self.get_conn()?;
        conn.execute("DELETE FROM tournaments WHERE id = ?1", params![tournament.id()])
            .map_err(RepositoryError::from)?;
        Ok(())
    }

    /// 另存为（VACUUM INTO）
    pub fn save_as(&self, path: &str) -> TournamentResult<()> {
        let conn = self.get_conn()?;
        conn.execute("VACUUM INTO ?1", params![path])
            .map_err(RepositoryError::from)?;
        info!(path, "赛事文件已另存");
        Ok(())
    }
}
