// ==========================================
// 国际象棋赛事管理引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: 所有查询使用参数化
// ==========================================

pub mod error;
pub mod rating_list_repo;
pub mod sqlite_store;
pub mod tournament_store;

pub use error::{RepositoryError, RepositoryResult};
pub use rating_list_repo::RatingListRepository;
pub use sqlite_store::SqliteTournamentStore;
pub use tournament_store::TournamentStore;
