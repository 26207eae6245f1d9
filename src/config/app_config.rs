// ==========================================
// 国际象棋赛事管理引擎 - 应用配置
// ==========================================
// 来源优先级: 环境变量 > 默认值
// ==========================================

use std::path::PathBuf;
use std::time::Duration;

/// 数据库路径环境变量
pub const ENV_DB_PATH: &str = "CHESS_ARBITER_DB_PATH";
/// 编排程序路径环境变量
pub const ENV_PAIRING_PROGRAM: &str = "CHESS_ARBITER_PAIRING_PROGRAM";
/// 编排超时（毫秒）环境变量
pub const ENV_PAIRING_TIMEOUT_MS: &str = "CHESS_ARBITER_PAIRING_TIMEOUT_MS";
/// 等级分名单库路径环境变量
pub const ENV_RATING_LIST_PATH: &str = "CHESS_ARBITER_RATING_LIST_PATH";

/// 赛事数据库默认文件名
pub const DB_FILE_NAME: &str = "chess_arbiter.db";
/// 名单库默认文件名
pub const RATING_LIST_FILE_NAME: &str = "ratinglists.db";

/// 默认编排程序
pub const DEFAULT_PAIRING_PROGRAM: &str = "bbpPairings";
/// 默认编排超时（毫秒）
pub const DEFAULT_PAIRING_TIMEOUT_MS: u64 = 3_000;

// ==========================================
// AppConfig - 应用配置
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: String,          // 赛事数据库文件
    pub pairing_program: String,  // 编排程序（路径或 PATH 中的名称）
    pub pairing_timeout: Duration, // 编排超时
    pub rating_list_path: String, // 等级分名单库文件
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: get_default_db_path(),
            pairing_program: DEFAULT_PAIRING_PROGRAM.to_string(),
            pairing_timeout: Duration::from_millis(DEFAULT_PAIRING_TIMEOUT_MS),
            rating_list_path: default_data_file(RATING_LIST_FILE_NAME),
        }
    }
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意 key → value 来源加载配置
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let db_path = non_empty(ENV_DB_PATH).unwrap_or_else(|| default_data_file(DB_FILE_NAME));
        let rating_list_path = non_empty(ENV_RATING_LIST_PATH)
            .unwrap_or_else(|| default_data_file(RATING_LIST_FILE_NAME));
        let pairing_program =
            non_empty(ENV_PAIRING_PROGRAM).unwrap_or_else(|| DEFAULT_PAIRING_PROGRAM.to_string());
        let timeout_ms = match non_empty(ENV_PAIRING_TIMEOUT_MS) {
            Some(raw) => raw.parse::<u64>().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "编排超时配置无效，使用默认值");
                DEFAULT_PAIRING_TIMEOUT_MS
            }),
            None => DEFAULT_PAIRING_TIMEOUT_MS,
        };

        Self {
            db_path,
            pairing_program,
            pairing_timeout: Duration::from_millis(timeout_ms),
            rating_list_path,
        }
    }
}

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 CHESS_ARBITER_DB_PATH（若设置）
/// - 否则同 default_data_file
pub fn get_default_db_path() -> String {
    match std::env::var(ENV_DB_PATH) {
        Ok(path) if !path.trim().is_empty() => path.trim().to_string(),
        _ => default_data_file(DB_FILE_NAME),
    }
}

/// 用户数据目录/chess-arbiter/<file>，目录不可用时回退到 ./<file>
pub fn default_data_file(file: &str) -> String {
    let mut path = PathBuf::from(".").join(file);

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("chess-arbiter");
        // 目录创建失败时沿用当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join(file);
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_from_lookup_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_DB_PATH, "/tmp/t.db"),
            (ENV_PAIRING_PROGRAM, " /opt/bbp "),
            (ENV_PAIRING_TIMEOUT_MS, "500"),
        ]
        .into_iter()
        .collect();

        let config = AppConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.db_path, "/tmp/t.db");
        assert_eq!(config.pairing_program, "/opt/bbp");
        assert_eq!(config.pairing_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_from_lookup_ignores_process_env() {
        std::env::set_var(ENV_DB_PATH, "/from/process/env.db");
        let config = AppConfig::from_lookup(|_| None);
        std::env::remove_var(ENV_DB_PATH);

        assert_ne!(config.db_path, "/from/process/env.db");
        assert!(config.db_path.ends_with(DB_FILE_NAME));
        assert!(config.rating_list_path.ends_with(RATING_LIST_FILE_NAME));
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = AppConfig::from_lookup(|k| {
            if k == ENV_PAIRING_TIMEOUT_MS {
                Some("abc".to_string())
            } else if k == ENV_DB_PATH {
                Some("x.db".to_string())
            } else if k == ENV_RATING_LIST_PATH {
                Some(" lists.db ".to_string())
            } else {
                None
            }
        });
        assert_eq!(config.pairing_program, DEFAULT_PAIRING_PROGRAM);
        assert_eq!(config.rating_list_path, "lists.db");
        assert_eq!(config.pairing_timeout, Duration::from_millis(DEFAULT_PAIRING_TIMEOUT_MS));
    }
}
