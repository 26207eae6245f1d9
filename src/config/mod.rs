// ==========================================
// 国际象棋赛事管理引擎 - 配置层
// ==========================================
// 职责: 应用级配置（环境变量）+ 赛事选项键名
// 存储: 赛事选项保存在 options 表 (tournament_id + key)
// ==========================================

pub mod app_config;

pub use app_config::{get_default_db_path, AppConfig};

/// 赛事选项键名
pub mod option_keys {
    // 描述字段
    pub const NAME: &str = "name";
    pub const CITY: &str = "city";
    pub const FEDERATION: &str = "federation";
    pub const CHIEF_ARBITER: &str = "chief_arbiter";
    pub const DEPUTY_CHIEF_ARBITER: &str = "deputy_chief_arbiter";
    pub const TIME_CONTROL: &str = "time_control";

    // 轮次状态
    pub const NUMBER_OF_ROUNDS: &str = "number_of_rounds";
    pub const CURRENT_ROUND: &str = "current_round";
    pub const INITIAL_COLOR: &str = "initial_color"; // 0 = 白, 1 = 黑

    // 破同分指标配置 (JSON)
    pub const TIEBREAKS: &str = "tiebreaks";
}
