// ==========================================
// 国际象棋赛事管理引擎 - 排名投影
// ==========================================
// 瞬态结构，不入库
// ==========================================

use crate::domain::player::PlayerId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub player: PlayerId,   // 棋手
    pub starting_rank: u32, // 种子序号
    pub rank: u32,          // 名次（并列共享）
    pub values: Vec<f64>,   // 各破同分指标取值（按配置顺序）
}
