// ==========================================
// 国际象棋赛事管理引擎 - TRF 编解码错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定: 错误信息携带出错片段原文
// ==========================================

use thiserror::Error;

/// TRF 格式错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrfError {
    // ===== 字段错误 =====
    #[error("字段格式错误 (行 {line}): {message}")]
    InvalidField { line: usize, message: String },

    #[error("数值解析失败 (字段 {field}): \"{value}\"")]
    InvalidNumber { field: String, value: String },

    #[error("日期格式错误: \"{0}\"（期望 yy/MM/dd）")]
    InvalidDate(String),

    // ===== 对局块错误 =====
    #[error("无效的对局块: \"{0}\"")]
    InvalidPairing(String),

    #[error("对局块 \"{block}\" 中的对手序号无效: \"{opponent}\"")]
    InvalidOpponent { opponent: String, block: String },

    #[error("对局块 \"{block}\" 中的结果代码未知: '{code}'")]
    UnknownResult { code: char, block: String },

    #[error("对局块 \"{0}\" 缺少对手")]
    MissingOpponent(String),

    // ===== 引用错误 =====
    #[error("棋手不存在: 种子序号 {0}")]
    PlayerNotFound(u32),

    #[error("对局结果未知: 白方 {white}, 黑方 {black}")]
    UnknownPairingResult { white: u32, black: u32 },
}

/// Result 类型别名
pub type TrfResult<T> = Result<T, TrfError>;
