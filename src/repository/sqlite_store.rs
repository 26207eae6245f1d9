// ==========================================
// 国际象棋赛事管理引擎 - 赛事存储 SQLite 实现
// ==========================================
// 职责: TournamentStore 的 rusqlite 实现
// 约束: 所有查询使用参数化
// 事务: SAVEPOINT 实现，可被赛事导入等外层事务嵌套
// ==========================================

use crate::domain::{Pairing, PartialResult, Player, PlayerId, Round, Title};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::tournament_store::TournamentStore;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use tracing::debug;

const SAVEPOINT_NAME: &str = "tournament_tx";

// ==========================================
// SqliteTournamentStore
// ==========================================
pub struct SqliteTournamentStore {
    conn: Arc<Mutex<Connection>>,
    tournament_id: String,
}

impl SqliteTournamentStore {
    /// 从已有连接创建（连接由 Event 持有并共享）
    pub fn from_connection(conn: Arc<Mutex<Connection>>, tournament_id: impl Into<String>) -> Self {
        Self {
            conn,
            tournament_id: tournament_id.into(),
        }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

// ==========================================
// 行映射辅助
// ==========================================

fn extra_to_sql(extra: &serde_json::Value) -> Option<String> {
    if extra.is_null() {
        None
    } else {
        Some(extra.to_string())
    }
}

fn extra_from_sql(raw: Option<String>) -> serde_json::Value {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or(serde_json::Value::Null)
}

fn parse_result(raw: &str, field: &str) -> RepositoryResult<PartialResult> {
    PartialResult::from_str(raw).ok_or_else(|| RepositoryError::FieldValueError {
        field: field.to_string(),
        message: format!("未知的对局结果: {}", raw),
    })
}

fn map_player(row: &Row) -> rusqlite::Result<Player> {
    Ok(Player {
        id: PlayerId(row.get(0)?),
        starting_rank: row.get(1)?,
        title: Title::from_str(&row.get::<_, String>(2)?),
        name: row.get(3)?,
        surname: row.get(4)?,
        rating: row.get(5)?,
        national_rating: row.get(6)?,
        player_id: row.get(7)?,
        birth_date: row.get(8)?,
        federation: row.get(9)?,
        origin: row.get(10)?,
        sex: row.get(11)?,
        extra: extra_from_sql(row.get(12)?),
    })
}

/// 对局原始行：(round_id, Pairing 字段..., white_result, black_result)
struct PairingRow {
    round_id: i64,
    id: String,
    board: u32,
    white: i64,
    black: Option<i64>,
    white_result: String,
    black_result: String,
    extra: Option<String>,
}

impl TournamentStore for SqliteTournamentStore {
    fn tournament_id(&self) -> &str {
        &self.tournament_id
    }

    fn begin_transaction(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(&format!("SAVEPOINT {}", SAVEPOINT_NAME))
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    fn commit(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(&format!("RELEASE {}", SAVEPOINT_NAME))
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    fn rollback(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(&format!(
            "ROLLBACK TO {name}; RELEASE {name}",
            name = SAVEPOINT_NAME
        ))
        .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    fn get_option(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM options WHERE tournament_id = ?1 AND key = ?2",
                params![self.tournament_id, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_option(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO options (tournament_id, key, value)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(tournament_id, key) DO UPDATE SET value = excluded.value
            "#,
            params![self.tournament_id, key, value],
        )?;
        Ok(())
    }

    fn insert_player(&self, player: &Player) -> RepositoryResult<PlayerId> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO players (
                tournament_id, starting_rank, title, name, surname, rating,
                national_rating, player_id, birth_date, federation, origin, sex, extra
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                self.tournament_id,
                player.starting_rank,
                player.title.as_str(),
                player.name,
                player.surname,
                player.rating,
                player.national_rating,
                player.player_id,
                player.birth_date,
                player.federation,
                player.origin,
                player.sex,
                extra_to_sql(&player.extra),
            ],
        )?;
        Ok(PlayerId(conn.last_insert_rowid()))
    }

    fn update_player(&self, player: &Player) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE players SET
                starting_rank = ?1, title = ?2, name = ?3, surname = ?4, rating = ?5,
                national_rating = ?6, player_id = ?7, birth_date = ?8, federation = ?9,
                origin = ?10, sex = ?11, extra = ?12
            WHERE id = ?13 AND tournament_id = ?14
            "#,
            params![
                player.starting_rank,
                player.title.as_str(),
                player.name,
                player.surname,
                player.rating,
                player.national_rating,
                player.player_id,
                player.birth_date,
                player.federation,
                player.origin,
                player.sex,
                extra_to_sql(&player.extra),
                player.id.0,
                self.tournament_id,
            ],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Player".to_string(),
                id: player.id.to_string(),
            });
        }
        Ok(())
    }

    fn insert_round(&self, round: &Round) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO rounds (tournament_id, number, date_time, extra) VALUES (?1, ?2, ?3, ?4)",
            params![
                self.tournament_id,
                round.number,
                round.date_time,
                extra_to_sql(&round.extra),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_round(&self, round: &Round) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE rounds SET number = ?1, date_time = ?2, extra = ?3 WHERE id = ?4 AND tournament_id = ?5",
            params![
                round.number,
                round.date_time,
                extra_to_sql(&round.extra),
                round.id,
                self.tournament_id,
            ],
        )?;
        Ok(())
    }

    fn insert_pairing(&self, round_id: i64, pairing: &Pairing) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO pairings (
                id, round_id, board, white_player, black_player,
                white_result, black_result, extra
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                pairing.id,
                round_id,
                pairing.board,
                pairing.white.0,
                pairing.black.map(|b| b.0),
                pairing.white_result.to_db_str(),
                pairing.black_result.to_db_str(),
                extra_to_sql(&pairing.extra),
            ],
        )?;
        Ok(())
    }

    fn update_pairing(&self, pairing: &Pairing) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE pairings SET
                board = ?1, white_player = ?2, black_player = ?3,
                white_result = ?4, black_result = ?5, extra = ?6
            WHERE id = ?7
            "#,
            params![
                pairing.board,
                pairing.white.0,
                pairing.black.map(|b| b.0),
                pairing.white_result.to_db_str(),
                pairing.black_result.to_db_str(),
                extra_to_sql(&pairing.extra),
                pairing.id,
            ],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Pairing".to_string(),
                id: pairing.id.clone(),
            });
        }
        Ok(())
    }

    fn delete_pairing(&self, pairing_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute("DELETE FROM pairings WHERE id = ?1", params![pairing_id])?;
        Ok(())
    }

    fn delete_round_pairings(&self, round_id: i64, keep_requested_byes: bool) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = if keep_requested_byes {
            conn.execute(
                "DELETE FROM pairings WHERE round_id = ?1 AND white_result NOT IN (?2, ?3)",
                params![
                    round_id,
                    PartialResult::HalfBye.to_db_str(),
                    PartialResult::ZeroBye.to_db_str(),
                ],
            )?
        } else {
            conn.execute("DELETE FROM pairings WHERE round_id = ?1", params![round_id])?
        };

        debug!(round_id, rows, keep_requested_byes, "删除轮次对局");
        Ok(rows)
    }

    fn load_players(&self) -> RepositoryResult<Vec<Player>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                id, starting_rank, title, name, surname, rating, national_rating,
                player_id, birth_date, federation, origin, sex, extra
            FROM players
            WHERE tournament_id = ?1
            ORDER BY starting_rank, id
            "#,
        )?;

        let players = stmt
            .query_map(params![self.tournament_id], map_player)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(players)
    }

    fn load_rounds(&self) -> RepositoryResult<Vec<Round>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, number, date_time, extra
            FROM rounds
            WHERE tournament_id = ?1
            ORDER BY number
            "#,
        )?;
        let mut rounds = stmt
            .query_map(params![self.tournament_id], |row| {
                Ok(Round {
                    id: row.get(0)?,
                    number: row.get(1)?,
                    date_time: row.get::<_, Option<NaiveDateTime>>(2)?,
                    extra: extra_from_sql(row.get(3)?),
                    pairings: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT
                p.round_id, p.id, p.board, p.white_player, p.black_player,
                p.white_result, p.black_result, p.extra
            FROM pairings p
            JOIN rounds r ON r.id = p.round_id
            WHERE r.tournament_id = ?1
            ORDER BY r.number, p.board
            "#,
        )?;
        let rows = stmt
            .query_map(params![self.tournament_id], |row| {
                Ok(PairingRow {
                    round_id: row.get(0)?,
                    id: row.get(1)?,
                    board: row.get(2)?,
                    white: row.get(3)?,
                    black: row.get(4)?,
                    white_result: row.get(5)?,
                    black_result: row.get(6)?,
                    extra: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for row in rows {
            let round = rounds
                .iter_mut()
                .find(|r| r.id == row.round_id)
                .ok_or_else(|| RepositoryError::NotFound {
                    entity: "Round".to_string(),
                    id: row.round_id.to_string(),
                })?;

            round.pairings.push(Pairing {
                id: row.id,
                board: row.board,
                white: PlayerId(row.white),
                black: row.black.map(PlayerId),
                white_result: parse_result(&row.white_result, "white_result")?,
                black_result: parse_result(&row.black_result, "black_result")?,
                extra: extra_from_sql(row.extra),
            });
        }

        Ok(rounds)
    }
}
