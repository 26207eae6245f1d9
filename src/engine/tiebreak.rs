// ==========================================
// 国际象棋赛事管理引擎 - 破同分指标
// ==========================================
// 职责: 每个指标是纯函数 (状态, 分组, 棋手) -> 实数
// 红线: 指标集合固定，使用封闭枚举分发
// ==========================================
// 存储格式: {"tiebreaks":[{"id":"bh","options":{"cut_lowest":1}}]}
// ==========================================

use crate::domain::{Color, PlayerId};
use crate::engine::error::{TournamentError, TournamentResult};
use crate::engine::state::TournamentState;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

// ==========================================
// Tiebreak - 破同分指标
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tiebreak {
    Points,                            // 积分
    Buchholz { cut_lowest: u32 },      // 布赫霍尔茨（可去掉最低 N 项）
    NumberOfWins,                      // 胜局数（含弃权/轮空胜）
    GamesWon,                          // 实战胜局数
    GamesPlayedWithBlack,              // 执黑实战局数
    AverageBuchholzOfOpponents,        // 对手平均布赫霍尔茨
}

impl Tiebreak {
    /// 全部指标（默认参数）
    pub const ALL: [Tiebreak; 6] = [
        Tiebreak::Points,
        Tiebreak::Buchholz { cut_lowest: 0 },
        Tiebreak::NumberOfWins,
        Tiebreak::GamesWon,
        Tiebreak::GamesPlayedWithBlack,
        Tiebreak::AverageBuchholzOfOpponents,
    ];

    /// 短 ID（存储使用）
    pub fn id(&self) -> &'static str {
        match self {
            Tiebreak::Points => "pts",
            Tiebreak::Buchholz { .. } => "bh",
            Tiebreak::NumberOfWins => "win",
            Tiebreak::GamesWon => "won",
            Tiebreak::GamesPlayedWithBlack => "bpg",
            Tiebreak::AverageBuchholzOfOpponents => "aob",
        }
    }

    /// FIDE 指标代码
    pub fn code(&self) -> &'static str {
        match self {
            Tiebreak::Points => "PTS",
            Tiebreak::Buchholz { .. } => "BH",
            Tiebreak::NumberOfWins => "WIN",
            Tiebreak::GamesWon => "WON",
            Tiebreak::GamesPlayedWithBlack => "BPG",
            Tiebreak::AverageBuchholzOfOpponents => "AOB",
        }
    }

    /// 显示名称
    pub fn name(&self) -> String {
        match self {
            Tiebreak::Points => "Points".to_string(),
            Tiebreak::Buchholz { cut_lowest: 0 } => "Buchholz".to_string(),
            Tiebreak::Buchholz { cut_lowest } => format!("Buchholz -{}", cut_lowest),
            Tiebreak::NumberOfWins => "Number of wins".to_string(),
            Tiebreak::GamesWon => "Games won".to_string(),
            Tiebreak::GamesPlayedWithBlack => "Games played with black".to_string(),
            Tiebreak::AverageBuchholzOfOpponents => "Average Buchholz of opponents".to_string(),
        }
    }

    /// 排名表列头短名
    pub fn short_name(&self) -> String {
        match self {
            Tiebreak::Points => "Pts".to_string(),
            Tiebreak::Buchholz { cut_lowest: 0 } => "BH".to_string(),
            Tiebreak::Buchholz { cut_lowest } => format!("BH-{}", cut_lowest),
            Tiebreak::NumberOfWins => "Wins".to_string(),
            Tiebreak::GamesWon => "Games Won".to_string(),
            Tiebreak::GamesPlayedWithBlack => "BPG".to_string(),
            Tiebreak::AverageBuchholzOfOpponents => "AOB".to_string(),
        }
    }

    /// 是否有可配置参数
    pub fn is_configurable(&self) -> bool {
        matches!(self, Tiebreak::Buchholz { .. })
    }

    /// 计算指标值
    ///
    /// # 参数
    /// - state: 状态快照
    /// - group: 当前同分分组（上下文，现有指标未使用）
    /// - player: 目标棋手
    pub fn calculate(&self, state: &TournamentState, group: &[PlayerId], player: PlayerId) -> f64 {
        let _ = group;
        match self {
            Tiebreak::Points => state.points(player),
            Tiebreak::Buchholz { cut_lowest } => buchholz(state, player, *cut_lowest),
            Tiebreak::NumberOfWins => count_pairings(state, player, |p| {
                p.points_of(player) == 1.0
            }),
            Tiebreak::GamesWon => count_pairings(state, player, |p| {
                p.points_of(player) == 1.0 && !p.result_of(player).is_unplayed()
            }),
            Tiebreak::GamesPlayedWithBlack => count_pairings(state, player, |p| {
                p.color_of(player) == Color::Black && !p.result_of(player).is_unplayed()
            }),
            Tiebreak::AverageBuchholzOfOpponents => average_buchholz_of_opponents(state, player),
        }
    }

    // ==========================================
    // 配置（反）序列化
    // ==========================================

    /// 参数对象
    pub fn options(&self) -> Map<String, Value> {
        let mut options = Map::new();
        if let Tiebreak::Buchholz { cut_lowest } = self {
            options.insert("cut_lowest".to_string(), json!(cut_lowest));
        }
        options
    }

    /// 按 ID + 参数构造
    pub fn from_id(id: &str, options: &Map<String, Value>) -> TournamentResult<Self> {
        match id {
            "pts" => Ok(Tiebreak::Points),
            "bh" => {
                let cut_lowest = match options.get("cut_lowest") {
                    None | Some(Value::Null) => 0,
                    Some(v) => v
                        .as_u64()
                        .and_then(|n| u32::try_from(n).ok())
                        .ok_or_else(|| TournamentError::InvalidOption {
                            key: "cut_lowest".to_string(),
                            value: v.to_string(),
                        })?,
                };
                Ok(Tiebreak::Buchholz { cut_lowest })
            }
            "win" => Ok(Tiebreak::NumberOfWins),
            "won" => Ok(Tiebreak::GamesWon),
            "bpg" => Ok(Tiebreak::GamesPlayedWithBlack),
            "aob" => Ok(Tiebreak::AverageBuchholzOfOpponents),
            other => Err(TournamentError::UnknownTiebreak(other.to_string())),
        }
    }

    /// 按 FIDE 代码构造，如 "BH"、"BH/C1"
    ///
    /// 修饰符 `C<n>`（n > 0）表示去掉最低 n 项，仅对 BH 有效
    pub fn from_trf_code(code: &str) -> TournamentResult<Self> {
        let mut parts = code.trim().split('/');
        let base = parts.next().unwrap_or_default().to_uppercase();
        let modifiers: Vec<&str> = parts.collect();

        let mut tiebreak = match base.as_str() {
            "PTS" => Tiebreak::Points,
            "BH" => Tiebreak::Buchholz { cut_lowest: 0 },
            "WIN" => Tiebreak::NumberOfWins,
            "WON" => Tiebreak::GamesWon,
            "BPG" => Tiebreak::GamesPlayedWithBlack,
            "AOB" => Tiebreak::AverageBuchholzOfOpponents,
            _ => return Err(TournamentError::UnsupportedTiebreak(code.to_string())),
        };

        for modifier in modifiers {
            let unsupported = || TournamentError::UnsupportedTiebreak(code.to_string());
            match (&mut tiebreak, modifier.chars().next()) {
                (Tiebreak::Buchholz { cut_lowest }, Some('C') | Some('c')) => {
                    let n: u32 = modifier[1..].parse().map_err(|_| unsupported())?;
                    if n == 0 {
                        return Err(unsupported());
                    }
                    *cut_lowest = n;
                }
                _ => return Err(unsupported()),
            }
        }

        Ok(tiebreak)
    }
}

// ==========================================
// 指标配置存储结构
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TiebreakEntry {
    id: String,
    #[serde(default)]
    options: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TiebreakList {
    tiebreaks: Vec<TiebreakEntry>,
}

/// 序列化指标列表
pub fn tiebreaks_to_json(tiebreaks: &[Tiebreak]) -> TournamentResult<String> {
    let list = TiebreakList {
        tiebreaks: tiebreaks
            .iter()
            .map(|t| TiebreakEntry {
                id: t.id().to_string(),
                options: t.options(),
            })
            .collect(),
    };
    Ok(serde_json::to_string(&list)?)
}

/// 反序列化指标列表
pub fn tiebreaks_from_json(raw: &str) -> TournamentResult<Vec<Tiebreak>> {
    let list: TiebreakList = serde_json::from_str(raw)?;
    list.tiebreaks
        .iter()
        .map(|entry| Tiebreak::from_id(&entry.id, &entry.options))
        .collect()
}

// ==========================================
// 计算实现
// ==========================================

fn count_pairings(
    state: &TournamentState,
    player: PlayerId,
    predicate: impl Fn(&crate::domain::Pairing) -> bool,
) -> f64 {
    state
        .pairings(player)
        .iter()
        .filter(|p| predicate(p))
        .count() as f64
}

/// 布赫霍尔茨
///
/// - 未赛轮（以白方结果判定）按虚拟对手计：取棋手本轮自身得分
/// - 已赛轮取对手的破同分用积分
/// - 棋手本轮结果可计 VUR 的贡献进入 VUR 桶，其余进入常规桶
/// - 去掉最低 N 项时先从 VUR 桶去除
fn buchholz(state: &TournamentState, player: PlayerId, cut_lowest: u32) -> f64 {
    let mut contributions: Vec<f64> = Vec::new();
    let mut vur_contributions: Vec<f64> = Vec::new();

    for pairing in state.pairings(player) {
        let value = match pairing.opponent_of(player) {
            Some(opponent) if !pairing.white_result.is_unplayed() => {
                state.points_for_tiebreaks(opponent)
            }
            _ => pairing.points_of(player),
        };

        if pairing.result_of(player).is_vur() {
            vur_contributions.push(value);
        } else {
            contributions.push(value);
        }
    }

    if cut_lowest > 0 {
        // 降序排列，pop 即去掉最低值
        contributions.sort_by(|a, b| b.total_cmp(a));
        vur_contributions.sort_by(|a, b| b.total_cmp(a));

        for _ in 0..cut_lowest {
            if vur_contributions.pop().is_none() {
                contributions.pop();
            }
        }
    }

    contributions.iter().sum::<f64>() + vur_contributions.iter().sum::<f64>()
}

/// 对手平均布赫霍尔茨，保留两位小数
fn average_buchholz_of_opponents(state: &TournamentState, player: PlayerId) -> f64 {
    let mut total = 0.0;
    let mut count = 0u32;

    for pairing in state.pairings(player) {
        if pairing.white_result.is_unplayed() {
            continue;
        }
        if let Some(opponent) = pairing.opponent_of(player) {
            total += state.memoized_buchholz(opponent, || buchholz(state, opponent, 0));
            count += 1;
        }
    }

    if count == 0 {
        return 0.0;
    }
    (100.0 * total / f64::from(count)).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Pairing, PartialResult, Round};

    fn round(number: u32, pairings: Vec<Pairing>) -> Round {
        let mut r = Round::new(number as i64, number);
        r.pairings = pairings;
        r
    }

    fn game(white: i64, black: i64, w: PartialResult, b: PartialResult) -> Pairing {
        Pairing::new(1, PlayerId(white), Some(PlayerId(black)), w, b)
    }

    fn bye(player: i64, result: PartialResult) -> Pairing {
        Pairing::bye(1, PlayerId(player), result)
    }

    #[test]
    fn test_buchholz_dummy_opponent() {
        // A(1) 第 1 轮胜 B(2)，第 2 轮编排轮空；B 第 2 轮胜 C(3)
        let rounds = vec![
            round(1, vec![
                game(1, 2, PartialResult::Win, PartialResult::Lost),
                bye(3, PartialResult::PairingBye),
            ]),
            round(2, vec![
                game(2, 3, PartialResult::Win, PartialResult::Lost),
                bye(1, PartialResult::PairingBye),
            ]),
        ];
        let state = TournamentState::new(&rounds, 2);

        let opponent_tb = state.points_for_tiebreaks(PlayerId(2));
        assert_eq!(opponent_tb, 1.0);

        let bh = Tiebreak::Buchholz { cut_lowest: 0 }.calculate(&state, &[], PlayerId(1));
        assert_eq!(bh, opponent_tb + 1.0);
    }

    #[test]
    fn test_buchholz_cut_prefers_vur_bucket() {
        // 棋手 1: 第 1 轮胜 2，第 2 轮胜 3，第 3 轮弃权负给 4
        // 2、3 的破同分积分 > 0，第 3 轮贡献为自身本轮得分 0（VUR 桶）
        let rounds = vec![
            round(1, vec![
                game(1, 2, PartialResult::Win, PartialResult::Lost),
                game(3, 4, PartialResult::Draw, PartialResult::Draw),
            ]),
            round(2, vec![
                game(3, 1, PartialResult::Lost, PartialResult::Win),
                game(2, 4, PartialResult::Win, PartialResult::Lost),
            ]),
            round(3, vec![
                game(4, 1, PartialResult::WinForfeit, PartialResult::LostForfeit),
                game(2, 3, PartialResult::Lost, PartialResult::Win),
            ]),
        ];
        let state = TournamentState::new(&rounds, 3);

        let p2 = state.points_for_tiebreaks(PlayerId(2));
        let p3 = state.points_for_tiebreaks(PlayerId(3));
        assert_eq!(p2, 1.0);
        assert_eq!(p3, 1.5);

        let full = Tiebreak::Buchholz { cut_lowest: 0 }.calculate(&state, &[], PlayerId(1));
        assert_eq!(full, p2 + p3);

        // 去掉 1 项：VUR 桶只有一项（本轮 0 分），先被去掉
        let cut1 = Tiebreak::Buchholz { cut_lowest: 1 }.calculate(&state, &[], PlayerId(1));
        assert_eq!(cut1, p2 + p3);

        // 去掉 2 项：VUR 桶空后才去掉常规桶最低项 (p2)
        let cut2 = Tiebreak::Buchholz { cut_lowest: 2 }.calculate(&state, &[], PlayerId(1));
        assert_eq!(cut2, p3);
    }

    #[test]
    fn test_buchholz_cut_vur_before_lower_normal() {
        // VUR 桶贡献 (半分轮空 → 本轮 0.5) 高于常规桶最低项 (0) 时仍先去掉 VUR 项
        let rounds = vec![
            round(1, vec![
                game(1, 2, PartialResult::Win, PartialResult::Lost),
                game(3, 4, PartialResult::Win, PartialResult::Lost),
            ]),
            round(2, vec![
                bye(1, PartialResult::HalfBye),
                game(2, 4, PartialResult::Lost, PartialResult::Lost),
                bye(3, PartialResult::PairingBye),
            ]),
        ];
        let state = TournamentState::new(&rounds, 2);

        assert_eq!(state.points_for_tiebreaks(PlayerId(2)), 0.0);
        let full = Tiebreak::Buchholz { cut_lowest: 0 }.calculate(&state, &[], PlayerId(1));
        assert_eq!(full, 0.5);
        let cut1 = Tiebreak::Buchholz { cut_lowest: 1 }.calculate(&state, &[], PlayerId(1));
        assert_eq!(cut1, 0.0);
    }

    #[test]
    fn test_win_counts() {
        let rounds = vec![
            round(1, vec![game(1, 2, PartialResult::WinForfeit, PartialResult::LostForfeit)]),
            round(2, vec![game(2, 1, PartialResult::Lost, PartialResult::Win)]),
            round(3, vec![bye(1, PartialResult::PairingBye), bye(2, PartialResult::HalfBye)]),
        ];
        let state = TournamentState::new(&rounds, 3);
        let p1 = PlayerId(1);

        assert_eq!(Tiebreak::Points.calculate(&state, &[], p1), 3.0);
        assert_eq!(Tiebreak::NumberOfWins.calculate(&state, &[], p1), 3.0);
        assert_eq!(Tiebreak::GamesWon.calculate(&state, &[], p1), 1.0);
        assert_eq!(Tiebreak::GamesPlayedWithBlack.calculate(&state, &[], p1), 1.0);
        assert_eq!(Tiebreak::GamesPlayedWithBlack.calculate(&state, &[], PlayerId(2)), 0.0);
    }

    #[test]
    fn test_average_buchholz_of_opponents() {
        let rounds = vec![
            round(1, vec![
                game(1, 2, PartialResult::Win, PartialResult::Lost),
                game(3, 4, PartialResult::Draw, PartialResult::Draw),
            ]),
            round(2, vec![
                game(1, 3, PartialResult::Draw, PartialResult::Draw),
                game(4, 2, PartialResult::WinForfeit, PartialResult::LostForfeit),
            ]),
        ];
        let state = TournamentState::new(&rounds, 2);

        let bh = Tiebreak::Buchholz { cut_lowest: 0 };
        let bh2 = bh.calculate(&state, &[], PlayerId(2));
        let bh3 = bh.calculate(&state, &[], PlayerId(3));
        let expected = (100.0 * (bh2 + bh3) / 2.0_f64).round() / 100.0;

        let aob = Tiebreak::AverageBuchholzOfOpponents.calculate(&state, &[], PlayerId(1));
        assert_eq!(aob, expected);

        // 棋手 4 只有一局实战（第 2 轮为弃权）
        let aob4 = Tiebreak::AverageBuchholzOfOpponents.calculate(&state, &[], PlayerId(4));
        assert_eq!(aob4, bh3);
    }

    #[test]
    fn test_average_buchholz_without_games() {
        let rounds = vec![round(1, vec![bye(1, PartialResult::FullBye)])];
        let state = TournamentState::new(&rounds, 1);
        assert_eq!(
            Tiebreak::AverageBuchholzOfOpponents.calculate(&state, &[], PlayerId(1)),
            0.0
        );
    }

    #[test]
    fn test_names() {
        assert_eq!(Tiebreak::Buchholz { cut_lowest: 0 }.name(), "Buchholz");
        assert_eq!(Tiebreak::Buchholz { cut_lowest: 2 }.name(), "Buchholz -2");
        assert!(Tiebreak::Buchholz { cut_lowest: 0 }.is_configurable());
        assert!(!Tiebreak::Points.is_configurable());
        assert_eq!(Tiebreak::NumberOfWins.short_name(), "Wins");
    }

    #[test]
    fn test_from_trf_code() {
        assert_eq!(Tiebreak::from_trf_code("PTS").unwrap(), Tiebreak::Points);
        assert_eq!(
            Tiebreak::from_trf_code("BH/C1").unwrap(),
            Tiebreak::Buchholz { cut_lowest: 1 }
        );
        assert!(Tiebreak::from_trf_code("BH/C0").is_err());
        assert!(Tiebreak::from_trf_code("BH/Cx").is_err());
        assert!(Tiebreak::from_trf_code("WIN/C1").is_err());
        assert!(matches!(
            Tiebreak::from_trf_code("OTHER_SB"),
            Err(TournamentError::UnsupportedTiebreak(_))
        ));
    }

    #[test]
    fn test_json_config() {
        let list = vec![Tiebreak::Points, Tiebreak::Buchholz { cut_lowest: 1 }, Tiebreak::GamesWon];
        let json = tiebreaks_to_json(&list).unwrap();
        assert!(json.contains("\"cut_lowest\":1"));
        assert_eq!(tiebreaks_from_json(&json).unwrap(), list);

        let legacy = r#"{"tiebreaks":[{"id":"bh"},{"id":"aob","options":{}}]}"#;
        assert_eq!(
            tiebreaks_from_json(legacy).unwrap(),
            vec![Tiebreak::Buchholz { cut_lowest: 0 }, Tiebreak::AverageBuchholzOfOpponents]
        );

        assert!(matches!(
            tiebreaks_from_json(r#"{"tiebreaks":[{"id":"xyz"}]}"#),
            Err(TournamentError::UnknownTiebreak(_))
        ));
    }
}
