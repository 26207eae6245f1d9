// ==========================================
// 国际象棋赛事管理引擎 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定: 前置条件违反属于编程错误，使用 assert! 而非返回错误
// ==========================================

use crate::repository::error::RepositoryError;
use crate::trf::error::TrfError;
use thiserror::Error;

/// 编排程序调用错误
#[derive(Error, Debug)]
pub enum PairingError {
    #[error("找不到编排程序: {0}")]
    ProgramNotFound(String),

    #[error("编排程序启动失败: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("编排程序超时: 超过 {0} 毫秒未结束")]
    Timeout(u128),

    #[error("编排程序非零退出 (code={code:?}): {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("无效的编排输出行: \"{0}\"")]
    InvalidLine(String),

    #[error("编排输出引用了未知棋手: 种子序号 {0}")]
    UnknownPlayer(u32),
}

/// 赛事聚合错误
#[derive(Error, Debug)]
pub enum TournamentError {
    // ===== 下游错误（原样透传）=====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("TRF 格式错误: {0}")]
    Trf(#[from] TrfError),

    #[error("编排失败: {0}")]
    Pairing(#[from] PairingError),

    // ===== 配置错误 =====
    #[error("未知的破同分指标: {0}")]
    UnknownTiebreak(String),

    #[error("不支持的破同分指标代码: {0}")]
    UnsupportedTiebreak(String),

    #[error("选项值无效 (key={key}): {value}")]
    InvalidOption { key: String, value: String },

    #[error("JSON 序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    // ===== 引用错误 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },
}

/// Result 类型别名
pub type TournamentResult<T> = Result<T, TournamentError>;
