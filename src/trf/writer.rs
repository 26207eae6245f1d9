// ==========================================
// 国际象棋赛事管理引擎 - TRF 写出器
// ==========================================
// 职责: 按截止轮次生成 TRF 文本（导出 / 编排程序输入）
// 依赖: 需要完整排名计算得到每名棋手的当前名次
// ==========================================

use crate::domain::{InitialColor, Pairing, Player};
use crate::engine::tournament::Tournament;
use crate::trf::{Field, TrfOptions, DATE_FORMAT, ROUNDS_OFFSET};
use std::collections::HashMap;
use std::fmt::Write;
use unicode_normalization::UnicodeNormalization;

/// 生成 TRF 文本
///
/// # 参数
/// - options: XXR / XXC 提示行
/// - max_round: 截止轮次；None 表示全部轮次
pub(crate) fn write_trf(tournament: &Tournament, options: TrfOptions, max_round: Option<u32>) -> String {
    let state = tournament.state(max_round);
    let standings = tournament.standings(&state);
    let ranks: HashMap<_, u32> = standings
        .iter()
        .enumerate()
        .map(|(i, s)| (s.player, i as u32 + 1))
        .collect();

    let mut out = String::new();
    let mut field = |field: Field, value: &str| {
        out.push_str(field.code());
        out.push(' ');
        out.push_str(value);
        out.push('\n');
    };

    field(Field::TournamentName, tournament.name());
    field(Field::City, tournament.city());
    field(Field::Federation, tournament.federation());
    field(Field::NumberOfPlayers, &tournament.number_of_players().to_string());
    field(
        Field::NumberOfRatedPlayers,
        &tournament.number_of_rated_players().to_string(),
    );
    field(Field::ChiefArbiter, tournament.chief_arbiter());
    field(Field::DeputyChiefArbiter, tournament.deputy_chief_arbiter());
    field(Field::TimeControl, tournament.time_control());

    if options.number_of_rounds {
        let _ = writeln!(out, "XXR {}", tournament.number_of_rounds());
    }
    match options.initial_color {
        Some(InitialColor::White) => out.push_str("XXC white1\n"),
        Some(InitialColor::Black) => out.push_str("XXC black1\n"),
        None => {}
    }

    // ===== 日程 =====
    out.push_str(Field::Calendar.code());
    out.push_str(&" ".repeat(ROUNDS_OFFSET - 5));
    for round in 1..=state.last_round() {
        let date = tournament
            .round(round)
            .and_then(|r| r.date_time)
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| " ".repeat(8));
        out.push_str("  ");
        out.push_str(&date);
    }
    out.push('\n');

    // ===== 棋手行 =====
    for player in tournament.players() {
        let rank = ranks.get(&player.id).copied().unwrap_or(0);
        out.push_str(&player_row(player, state.points(player.id), rank));

        for round in 1..=state.last_round() {
            match tournament.round(round).and_then(|r| r.pairing_of(player.id)) {
                Some(pairing) => out.push_str(&pairing_block(tournament, pairing, player)),
                None => out.push_str(&" ".repeat(10)),
            }
        }
        out.push('\n');
    }

    out
}

/// NFKD 分解后只保留拉丁字母/数字及少量标点（"é" → "e"）
fn normalize(text: &str) -> String {
    text.nfkd()
        .filter(|c| c.is_ascii_alphanumeric() || " .,-_()".contains(*c))
        .collect()
}

fn truncate(text: &str, len: usize) -> String {
    text.chars().take(len).collect()
}

/// 棋手行前 89 列
fn player_row(player: &Player, points: f64, rank: u32) -> String {
    let sex = player.sex.chars().next().unwrap_or(' ');
    let rating = if player.rating > 0 {
        player.rating.to_string()
    } else {
        String::new()
    };

    format!(
        "{} {:>4} {}{:>3} {:<33} {:>4} {:>3} {:>11} {:>10} {:>4.1} {:>4}",
        Field::Player.code(),
        player.starting_rank,
        sex,
        player.title.as_str(),
        truncate(&normalize(&player.full_name()), 33),
        rating,
        truncate(&player.federation, 3),
        truncate(&player.player_id, 11),
        truncate(&player.birth_date, 10),
        points,
        rank
    )
}

/// 单轮对局块 "  oooo c r"
fn pairing_block(tournament: &Tournament, pairing: &Pairing, player: &Player) -> String {
    let opponent = match pairing.opponent_of(player.id) {
        Some(id) => {
            let rank = tournament.player(id).map_or(0, |p| p.starting_rank);
            format!("{:>4}", rank)
        }
        None => "0000".to_string(),
    };
    format!(
        "  {} {} {}",
        opponent,
        pairing.color_of(player.id).to_trf_char(),
        pairing.result_of(player.id).to_trf_char()
    )
}
