// ==========================================
// 国际象棋赛事管理引擎 - 排名算法
// ==========================================
// 职责: 按配置顺序逐个计算破同分指标，分组 → 计算 → 排序 → 定名次
// 红线: 同一状态重复计算结果必须完全一致
// ==========================================

use crate::domain::{Player, PlayerId, Standing};
use crate::engine::state::TournamentState;
use crate::engine::tiebreak::Tiebreak;
use std::cmp::Ordering;

/// 计算排名
///
/// # 参数
/// - players: 参赛棋手（种子序号顺序）
/// - tiebreaks: 破同分指标（按优先级）
/// - state: 状态快照
///
/// # 返回
/// 按名次排序的 Standing 列表
pub fn compute_standings(
    players: &[&Player],
    tiebreaks: &[Tiebreak],
    state: &TournamentState,
) -> Vec<Standing> {
    let mut rows: Vec<Standing> = players
        .iter()
        .map(|p| Standing {
            player: p.id,
            starting_rank: p.starting_rank,
            rank: 0,
            values: Vec::new(),
        })
        .collect();

    for tiebreak in tiebreaks {
        let mut start = 0;
        while start < rows.len() {
            // 当前已排序列表中取值向量相等的最大连续段
            let mut end = start + 1;
            while end < rows.len() && rows[end].values == rows[start].values {
                end += 1;
            }

            let group: Vec<PlayerId> = rows[start..end].iter().map(|s| s.player).collect();
            for row in &mut rows[start..end] {
                let value = tiebreak.calculate(state, &group, row.player);
                row.values.push(value);
            }

            start = end;
        }

        rows.sort_by(compare_rows);
    }

    assign_ranks(&mut rows);
    rows
}

/// 取值向量字典序降序，其次种子序号升序
fn compare_rows(a: &Standing, b: &Standing) -> Ordering {
    for (x, y) in a.values.iter().zip(b.values.iter()) {
        match y.total_cmp(x) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    b.values
        .len()
        .cmp(&a.values.len())
        .then(a.starting_rank.cmp(&b.starting_rank))
}

/// 名次：取值向量完全相同者共享上一名次，否则取 1-based 位置
fn assign_ranks(rows: &mut [Standing]) {
    for i in 0..rows.len() {
        rows[i].rank = if i > 0 && rows[i].values == rows[i - 1].values {
            rows[i - 1].rank
        } else {
            i as u32 + 1
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Pairing, PartialResult, Round};

    fn players(n: u32) -> Vec<Player> {
        (1..=n)
            .map(|i| {
                let mut p = Player::new(i, format!("Player {}", i), 2000);
                p.id = PlayerId(i as i64);
                p
            })
            .collect()
    }

    fn round(number: u32, pairings: Vec<Pairing>) -> Round {
        let mut r = Round::new(number as i64, number);
        r.pairings = pairings;
        r
    }

    fn game(white: i64, black: i64, w: PartialResult, b: PartialResult) -> Pairing {
        Pairing::new(1, PlayerId(white), Some(PlayerId(black)), w, b)
    }

    #[test]
    fn test_ranks_share_on_equal_vectors() {
        let all = players(4);
        let refs: Vec<&Player> = all.iter().collect();
        let rounds = vec![round(1, vec![
            game(1, 2, PartialResult::Draw, PartialResult::Draw),
            game(3, 4, PartialResult::Lost, PartialResult::Win),
        ])];
        let state = TournamentState::new(&rounds, 1);

        let standings = compute_standings(&refs, &[Tiebreak::Points], &state);
        let order: Vec<u32> = standings.iter().map(|s| s.starting_rank).collect();
        let ranks: Vec<u32> = standings.iter().map(|s| s.rank).collect();

        assert_eq!(order, vec![4, 1, 2, 3]);
        assert_eq!(ranks, vec![1, 2, 2, 4]);
    }

    #[test]
    fn test_second_tiebreak_only_inside_group() {
        let all = players(4);
        let refs: Vec<&Player> = all.iter().collect();
        // 1、3 同积分 1.5；3 的对手积分更高
        let rounds = vec![
            round(1, vec![
                game(1, 2, PartialResult::Win, PartialResult::Lost),
                game(3, 4, PartialResult::Win, PartialResult::Lost),
            ]),
            round(2, vec![
                game(1, 3, PartialResult::Draw, PartialResult::Draw),
                game(2, 4, PartialResult::Lost, PartialResult::Win),
            ]),
        ];
        let state = TournamentState::new(&rounds, 2);

        let standings = compute_standings(
            &refs,
            &[Tiebreak::Points, Tiebreak::Buchholz { cut_lowest: 0 }],
            &state,
        );

        let order: Vec<u32> = standings.iter().map(|s| s.starting_rank).collect();
        assert_eq!(order, vec![3, 1, 4, 2]);
        assert_eq!(standings[0].values, vec![1.5, 2.5]);
        assert_eq!(standings[1].values, vec![1.5, 1.5]);
        assert_eq!(standings[2].values, vec![1.0, 1.5]);
        assert_eq!(standings[3].values, vec![0.0, 2.5]);

        let ranks: Vec<u32> = standings.iter().map(|s| s.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_deterministic() {
        let all = players(4);
        let refs: Vec<&Player> = all.iter().collect();
        let rounds = vec![round(1, vec![
            game(2, 1, PartialResult::Win, PartialResult::Lost),
            game(4, 3, PartialResult::Draw, PartialResult::Draw),
        ])];
        let tiebreaks = [Tiebreak::Points, Tiebreak::AverageBuchholzOfOpponents];

        let a = compute_standings(&refs, &tiebreaks, &TournamentState::new(&rounds, 1));
        let b = compute_standings(&refs, &tiebreaks, &TournamentState::new(&rounds, 1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_tiebreaks() {
        let all = players(3);
        let refs: Vec<&Player> = all.iter().collect();
        let rounds: Vec<Round> = Vec::new();
        let standings = compute_standings(&refs, &[], &TournamentState::new(&rounds, 0));
        assert!(standings.iter().all(|s| s.rank == 1));
    }
}
