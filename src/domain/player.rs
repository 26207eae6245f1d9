// ==========================================
// 国际象棋赛事管理引擎 - 棋手领域模型
// ==========================================
// 红线: starting_rank 在赛事内构成 1..N 稠密排列
// ==========================================

use crate::domain::types::Title;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// 棋手存储 ID（对局通过该 ID 引用棋手）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub i64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ==========================================
// Player - 棋手
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,              // 存储 ID（入库前为 0）
    pub starting_rank: u32,        // 种子序号 (1-based)
    pub title: Title,              // 称号
    pub name: String,              // 名
    pub surname: String,           // 姓（可为空）
    pub rating: u32,               // 国际等级分（0 = 无等级分）
    pub national_rating: u32,      // 国内等级分
    pub player_id: String,         // 外部棋手编号 (FIDE ID)
    pub birth_date: String,        // 出生日期（原样保存）
    pub federation: String,        // 协会
    pub origin: String,            // 俱乐部 / 来源
    pub sex: String,               // 性别
    pub extra: serde_json::Value,  // 扩展数据
}

impl Player {
    /// 创建新棋手（尚未入库）
    pub fn new(starting_rank: u32, name: impl Into<String>, rating: u32) -> Self {
        Self {
            id: PlayerId(0),
            starting_rank,
            title: Title::None,
            name: name.into(),
            surname: String::new(),
            rating,
            national_rating: 0,
            player_id: String::new(),
            birth_date: String::new(),
            federation: String::new(),
            origin: String::new(),
            sex: String::new(),
            extra: serde_json::Value::Null,
        }
    }

    /// 全名：有姓时为 "姓, 名"
    pub fn full_name(&self) -> String {
        if self.surname.is_empty() {
            self.name.clone()
        } else {
            format!("{}, {}", self.surname, self.name)
        }
    }

    /// 是否有国际等级分
    pub fn is_rated(&self) -> bool {
        self.rating > 0
    }

    /// 种子排序比较：等级分降序 → 称号强度升序 → 全名（小写）升序
    pub fn seeding_cmp(&self, other: &Player) -> Ordering {
        other
            .rating
            .cmp(&self.rating)
            .then_with(|| {
                self.title
                    .strength_level()
                    .cmp(&other.title.strength_level())
            })
            .then_with(|| {
                self.full_name()
                    .to_lowercase()
                    .cmp(&other.full_name().to_lowercase())
            })
    }
}
