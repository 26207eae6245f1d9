// ==========================================
// 国际象棋赛事管理引擎 - 等级分名单错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RatingListError {
    // ===== 文件 / 存储 =====
    #[error("名单文件读取失败: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 单行错误（导入时跳过该行）=====
    #[error("名单行过短: {0} 列")]
    ShortLine(usize),

    #[error("名单字段无效 (field={field}): \"{value}\"")]
    InvalidField { field: &'static str, value: String },
}

/// Result 类型别名
pub type RatingListResult<T> = Result<T, RatingListError>;
