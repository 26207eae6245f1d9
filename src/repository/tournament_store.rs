// ==========================================
// 国际象棋赛事管理引擎 - 赛事存储 Trait
// ==========================================
// 职责: 定义单个赛事的数据访问接口（不包含业务逻辑）
// 红线: 存储层只做 CRUD + 选项读写，不做任何排序/校验
// ==========================================

use crate::domain::{Pairing, Player, PlayerId, Round};
use crate::repository::error::RepositoryResult;

// ==========================================
// TournamentStore Trait
// ==========================================
// 实现者: SqliteTournamentStore（使用 rusqlite）
// 所有操作都限定在构造时绑定的赛事 ID 内
pub trait TournamentStore: Send + Sync {
    /// 绑定的赛事 ID
    fn tournament_id(&self) -> &str;

    // ===== 事务 =====

    /// 开启事务（可嵌套）
    fn begin_transaction(&self) -> RepositoryResult<()>;

    /// 提交最近一次开启的事务
    fn commit(&self) -> RepositoryResult<()>;

    /// 回滚最近一次开启的事务
    fn rollback(&self) -> RepositoryResult<()>;

    // ===== 赛事选项 (key-value) =====

    fn get_option(&self, key: &str) -> RepositoryResult<Option<String>>;

    fn set_option(&self, key: &str, value: &str) -> RepositoryResult<()>;

    // ===== 棋手 =====

    /// 插入棋手
    ///
    /// # 返回
    /// - Ok(PlayerId): 新分配的存储 ID
    fn insert_player(&self, player: &Player) -> RepositoryResult<PlayerId>;

    fn update_player(&self, player: &Player) -> RepositoryResult<()>;

    // ===== 轮次 =====

    /// 插入轮次（不含对局）
    ///
    /// # 返回
    /// - Ok(i64): 新分配的轮次存储 ID
    fn insert_round(&self, round: &Round) -> RepositoryResult<i64>;

    fn update_round(&self, round: &Round) -> RepositoryResult<()>;

    // ===== 对局 =====

    fn insert_pairing(&self, round_id: i64, pairing: &Pairing) -> RepositoryResult<()>;

    fn update_pairing(&self, pairing: &Pairing) -> RepositoryResult<()>;

    fn delete_pairing(&self, pairing_id: &str) -> RepositoryResult<()>;

    /// 删除某轮全部对局
    ///
    /// # 参数
    /// - keep_requested_byes: 为 true 时保留棋手申请的轮空（半分/零分）
    ///
    /// # 返回
    /// - Ok(usize): 删除的行数
    fn delete_round_pairings(&self, round_id: i64, keep_requested_byes: bool) -> RepositoryResult<usize>;

    // ===== 加载 =====

    /// 加载全部棋手（种子序号顺序）
    fn load_players(&self) -> RepositoryResult<Vec<Player>>;

    /// 加载全部轮次及其对局（轮次序号 / 台次顺序）
    fn load_rounds(&self) -> RepositoryResult<Vec<Round>>;
}
