// ==========================================
// 国际象棋赛事管理引擎 - 引擎层
// ==========================================
// 职责: 赛事聚合根、状态快照、破同分、排名、编排调用
// 红线: 引擎不拼 SQL，所有持久化经由 TournamentStore
// ==========================================

pub mod error;
pub mod pairing_engine;
pub mod standings;
pub mod state;
pub mod tiebreak;
pub mod tournament;

// 重导出核心引擎
pub use error::{PairingError, TournamentError, TournamentResult};
pub use pairing_engine::{parse_pairing_output, BbpPairingEngine, PairingEngine};
pub use standings::compute_standings;
pub use state::TournamentState;
pub use tiebreak::Tiebreak;
pub use tournament::{InitialColorChoice, PairRoundOptions, Tournament};
