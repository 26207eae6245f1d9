// ==========================================
// 国际象棋赛事管理引擎 - 轮次领域模型
// ==========================================

use crate::domain::pairing::Pairing;
use crate::domain::player::PlayerId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Round - 轮次
// ==========================================
// pairings 按台次顺序保存
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: i64,                          // 存储 ID
    pub number: u32,                      // 轮次序号 (1-based)
    pub date_time: Option<NaiveDateTime>, // 比赛时间
    pub extra: serde_json::Value,         // 扩展数据
    pub pairings: Vec<Pairing>,           // 对局（台次顺序）
}

impl Round {
    pub fn new(id: i64, number: u32) -> Self {
        Self {
            id,
            number,
            date_time: None,
            extra: serde_json::Value::Null,
            pairings: Vec::new(),
        }
    }

    /// 棋手在本轮的对局
    pub fn pairing_of(&self, player: PlayerId) -> Option<&Pairing> {
        self.pairings.iter().find(|p| p.involves(player))
    }

    /// 按 ID 查找对局
    pub fn pairing(&self, pairing_id: &str) -> Option<&Pairing> {
        self.pairings.iter().find(|p| p.id == pairing_id)
    }

    pub(crate) fn pairing_mut(&mut self, pairing_id: &str) -> Option<&mut Pairing> {
        self.pairings.iter_mut().find(|p| p.id == pairing_id)
    }
}
