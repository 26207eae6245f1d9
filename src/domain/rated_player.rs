// ==========================================
// 国际象棋赛事管理引擎 - 等级分名单领域模型
// ==========================================
// 职责: 名单中的棋手记录，可用于补全赛事棋手资料
// ==========================================

use crate::domain::player::Player;
use crate::domain::types::Title;
use serde::{Deserialize, Serialize};

/// 已导入的等级分名单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingListInfo {
    pub id: i64,
    pub name: String,
    pub source: Option<String>, // 来源文件
    pub imported_at: String,
    pub players: u64,
}

// ==========================================
// RatedPlayer - 名单中的棋手
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatedPlayer {
    pub fide_id: u64,
    pub name: String,            // "姓, 名"
    pub federation: String,
    pub sex: String,             // M / F
    pub title: String,           // 名单原样称号 (GM, WIM, ...)
    pub birth_year: Option<u32>,
    pub standard: u32,           // 0 = 无
    pub rapid: u32,
    pub blitz: u32,
    pub extra: serde_json::Value, // K 系数、其他称号
}

impl RatedPlayer {
    /// 用名单资料覆盖棋手的身份字段与标准棋等级分
    ///
    /// 种子序号、存储 ID、国内等级分与俱乐部保持不变
    pub fn apply_to(&self, player: &mut Player) {
        match self.name.split_once(',') {
            Some((surname, name)) => {
                player.surname = surname.trim().to_string();
                player.name = name.trim().to_string();
            }
            None => {
                player.surname.clear();
                player.name = self.name.trim().to_string();
            }
        }

        player.player_id = self.fide_id.to_string();
        player.federation = self.federation.clone();
        player.title = Title::from_str(&self.title);
        player.rating = self.standard;
        player.birth_date = self.birth_year.map(|y| y.to_string()).unwrap_or_default();
        // TRF 性别: m / w
        player.sex = match self.sex.as_str() {
            "M" => "m",
            "F" => "w",
            _ => "",
        }
        .to_string();
    }
}
