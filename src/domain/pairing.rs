// ==========================================
// 国际象棋赛事管理引擎 - 对局领域模型
// ==========================================
// 红线: 黑方缺省即轮空，轮空时 black_result 恒为 Unknown
// ==========================================

use crate::domain::player::PlayerId;
use crate::domain::types::{Color, PartialResult, ResultPair};
use serde::{Deserialize, Serialize};

// ==========================================
// Pairing - 对局
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pairing {
    pub id: String,                     // 对局 ID (UUID)
    pub board: u32,                     // 台次 (1-based)
    pub white: PlayerId,                // 白方
    pub black: Option<PlayerId>,        // 黑方（None = 轮空）
    pub white_result: PartialResult,    // 白方结果
    pub black_result: PartialResult,    // 黑方结果
    pub extra: serde_json::Value,       // 扩展数据
}

impl Pairing {
    /// 创建新对局（自动分配 UUID）
    pub fn new(
        board: u32,
        white: PlayerId,
        black: Option<PlayerId>,
        white_result: PartialResult,
        black_result: PartialResult,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            board,
            white,
            black,
            white_result,
            black_result,
            extra: serde_json::Value::Null,
        }
    }

    /// 创建轮空对局
    pub fn bye(board: u32, player: PlayerId, result: PartialResult) -> Self {
        Self::new(board, player, None, result, PartialResult::Unknown)
    }

    /// 是否为轮空（无黑方）
    pub fn is_bye(&self) -> bool {
        self.black.is_none()
    }

    /// 当前结果组合
    pub fn result(&self) -> ResultPair {
        (self.white_result, self.black_result)
    }

    /// 对局是否已结束（轮空视为已结束）
    pub fn has_finished(&self) -> bool {
        self.white_result.is_bye()
            || (self.white_result != PartialResult::Unknown
                && self.black_result != PartialResult::Unknown)
    }

    /// 棋手是否参与该对局
    pub fn involves(&self, player: PlayerId) -> bool {
        self.white == player || self.black == Some(player)
    }

    /// 指定棋手的结果
    ///
    /// # Panics
    /// 棋手不在该对局中
    pub fn result_of(&self, player: PlayerId) -> PartialResult {
        if self.white == player {
            self.white_result
        } else if self.black == Some(player) {
            self.black_result
        } else {
            panic!("棋手 {} 不在对局 {} 中", player, self.id);
        }
    }

    /// 指定棋手的得分
    pub fn points_of(&self, player: PlayerId) -> f64 {
        self.result_of(player).points()
    }

    /// 指定棋手的执色（轮空为 Unknown）
    pub fn color_of(&self, player: PlayerId) -> Color {
        match self.black {
            None => Color::Unknown,
            Some(_) if self.white == player => Color::White,
            Some(_) => Color::Black,
        }
    }

    /// 指定棋手的对手
    pub fn opponent_of(&self, player: PlayerId) -> Option<PlayerId> {
        if self.white == player {
            self.black
        } else {
            Some(self.white)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_views() {
        let w = PlayerId(1);
        let b = PlayerId(2);
        let p = Pairing::new(1, w, Some(b), PartialResult::Draw, PartialResult::Draw);

        assert_eq!(p.color_of(w), Color::White);
        assert_eq!(p.color_of(b), Color::Black);
        assert_eq!(p.opponent_of(b), Some(w));
        assert_eq!(p.points_of(b), 0.5);
        assert!(p.has_finished());
        assert!(p.involves(b));
        assert!(!p.involves(PlayerId(3)));
    }

    #[test]
    fn test_bye() {
        let p = Pairing::bye(3, PlayerId(7), PartialResult::PairingBye);
        assert!(p.is_bye());
        assert!(p.has_finished());
        assert_eq!(p.color_of(PlayerId(7)), Color::Unknown);
        assert_eq!(p.opponent_of(PlayerId(7)), None);
        assert_eq!(p.points_of(PlayerId(7)), 1.0);
    }

    #[test]
    fn test_unfinished() {
        let p = Pairing::new(1, PlayerId(1), Some(PlayerId(2)), PartialResult::Win, PartialResult::Unknown);
        assert!(!p.has_finished());
    }
}
