// ==========================================
// 国际象棋赛事管理引擎 - 赛事状态快照
// ==========================================
// 职责: 以轮次截止点构建每名棋手的对局历史，提供积分查询
// 红线: 只读；每次排名计算重新构建
// ==========================================

use crate::domain::{Pairing, PlayerId, Round};
use std::cell::RefCell;
use std::collections::HashMap;

// ==========================================
// TournamentState - 状态快照
// ==========================================
pub struct TournamentState<'a> {
    max_round: u32,
    pairings_by_player: HashMap<PlayerId, Vec<&'a Pairing>>,
    // 对手 Buchholz 缓存（AOB 使用）
    buchholz_memo: RefCell<HashMap<PlayerId, f64>>,
}

impl<'a> TournamentState<'a> {
    /// 构建快照
    ///
    /// # 参数
    /// - rounds: 赛事全部轮次
    /// - max_round: 截止轮次（只统计第 1..=max_round 轮）
    pub fn new(rounds: &'a [Round], max_round: u32) -> Self {
        let mut pairings_by_player: HashMap<PlayerId, Vec<&'a Pairing>> = HashMap::new();

        for round in rounds.iter().take(max_round as usize) {
            for pairing in &round.pairings {
                pairings_by_player.entry(pairing.white).or_default().push(pairing);
                if let Some(black) = pairing.black {
                    pairings_by_player.entry(black).or_default().push(pairing);
                }
            }
        }

        Self {
            max_round,
            pairings_by_player,
            buchholz_memo: RefCell::new(HashMap::new()),
        }
    }

    /// 截止轮次
    pub fn last_round(&self) -> u32 {
        self.max_round
    }

    /// 棋手的对局历史（轮次顺序）
    pub fn pairings(&self, player: PlayerId) -> &[&'a Pairing] {
        self.pairings_by_player
            .get(&player)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 棋手原始积分
    pub fn points(&self, player: PlayerId) -> f64 {
        self.pairings(player)
            .iter()
            .map(|p| p.points_of(player))
            .sum()
    }

    /// 破同分用积分（VUR 修正）
    ///
    /// 从最后一轮向前遍历，携带 VUR 连续标志：
    /// - 未赛轮且为申请轮空，并且 (标志成立 或 为最后一轮)：计 0.5 并置位
    /// - 其他未赛轮：按实际得分计，标志 = 本轮可计 VUR 且 (最后一轮 或 原标志)
    /// - 已赛轮：按实际得分计，清除标志
    pub fn points_for_tiebreaks(&self, player: PlayerId) -> f64 {
        let mut points = 0.0;
        let mut had_vur = false;

        for (i, pairing) in self.pairings(player).iter().rev().enumerate() {
            let is_last = i == 0;

            if pairing.white_result.is_unplayed() {
                if pairing.white_result.is_requested_bye() && (had_vur || is_last) {
                    points += 0.5;
                    had_vur = true;
                } else {
                    points += pairing.points_of(player);
                    let vur = pairing.result_of(player).is_vur();
                    if is_last {
                        had_vur = vur;
                    } else {
                        had_vur &= vur;
                    }
                }
            } else {
                points += pairing.points_of(player);
                had_vur = false;
            }
        }

        points
    }

    /// 读取或计算棋手 Buchholz（不截分）缓存
    pub(crate) fn memoized_buchholz(&self, player: PlayerId, compute: impl FnOnce() -> f64) -> f64 {
        if let Some(v) = self.buchholz_memo.borrow().get(&player) {
            return *v;
        }
        let value = compute();
        self.buchholz_memo.borrow_mut().insert(player, value);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PartialResult;

    fn round(number: u32, pairings: Vec<Pairing>) -> Round {
        let mut r = Round::new(number as i64, number);
        r.pairings = pairings;
        r
    }

    fn game(white: i64, black: i64, w: PartialResult, b: PartialResult) -> Pairing {
        Pairing::new(1, PlayerId(white), Some(PlayerId(black)), w, b)
    }

    #[test]
    fn test_max_round_cutoff() {
        let rounds = vec![
            round(1, vec![game(1, 2, PartialResult::Win, PartialResult::Lost)]),
            round(2, vec![game(2, 1, PartialResult::Win, PartialResult::Lost)]),
        ];

        let state = TournamentState::new(&rounds, 1);
        assert_eq!(state.last_round(), 1);
        assert_eq!(state.points(PlayerId(1)), 1.0);
        assert_eq!(state.pairings(PlayerId(2)).len(), 1);

        let state = TournamentState::new(&rounds, 5);
        assert_eq!(state.points(PlayerId(1)), 1.0);
        assert_eq!(state.points(PlayerId(2)), 1.0);
        assert!(state.pairings(PlayerId(9)).is_empty());
    }

    #[test]
    fn test_tiebreak_points_requested_bye_last_round() {
        // 最后一轮申请零分轮空 → 按 0.5 计
        let rounds = vec![
            round(1, vec![game(1, 2, PartialResult::Win, PartialResult::Lost)]),
            round(2, vec![Pairing::bye(1, PlayerId(1), PartialResult::ZeroBye)]),
        ];
        let state = TournamentState::new(&rounds, 2);

        assert_eq!(state.points(PlayerId(1)), 1.0);
        assert_eq!(state.points_for_tiebreaks(PlayerId(1)), 1.5);
    }

    #[test]
    fn test_tiebreak_points_vur_streak() {
        let rounds = vec![
            round(1, vec![Pairing::bye(1, PlayerId(1), PartialResult::HalfBye)]),
            round(2, vec![game(2, 1, PartialResult::WinForfeit, PartialResult::LostForfeit)]),
            round(3, vec![Pairing::bye(1, PlayerId(1), PartialResult::ZeroBye)]),
        ];
        let state = TournamentState::new(&rounds, 3);

        // 倒序: 第 3 轮 ZeroBye(最后一轮) → +0.5, 标志=真
        //       第 2 轮 LostForfeit(非申请轮空) → +0, 标志 = 真 && 可计 VUR = 真
        //       第 1 轮 HalfBye(标志成立) → +0.5
        assert_eq!(state.points(PlayerId(1)), 0.5);
        assert_eq!(state.points_for_tiebreaks(PlayerId(1)), 1.0);
    }

    #[test]
    fn test_tiebreak_points_played_round_breaks_streak() {
        let rounds = vec![
            round(1, vec![Pairing::bye(1, PlayerId(1), PartialResult::ZeroBye)]),
            round(2, vec![game(1, 2, PartialResult::Draw, PartialResult::Draw)]),
        ];
        let state = TournamentState::new(&rounds, 2);

        // 已赛轮清除标志，第 1 轮零分轮空按实际 0 分计
        assert_eq!(state.points_for_tiebreaks(PlayerId(1)), 0.5);
    }

    #[test]
    fn test_memoized_buchholz() {
        let rounds: Vec<Round> = Vec::new();
        let state = TournamentState::new(&rounds, 0);
        assert_eq!(state.memoized_buchholz(PlayerId(1), || 3.5), 3.5);
        // 第二次读取缓存，不再调用计算闭包
        assert_eq!(state.memoized_buchholz(PlayerId(1), || 0.0), 3.5);
    }
}
