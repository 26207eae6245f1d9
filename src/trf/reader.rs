// ==========================================
// 国际象棋赛事管理引擎 - TRF 读取器
// ==========================================
// 流程: 解析 (纯函数, 产出 TrfDocument) → 提交 (写入赛事)
// 红线:
// - 解析阶段不触碰存储
// - 提交阶段由调用方包在一个存储事务内
// ==========================================

use crate::domain::{Color, InitialColor, Pairing, PartialResult, Player, PlayerId, ResultPair, Title};
use crate::engine::error::TournamentResult;
use crate::engine::tournament::Tournament;
use crate::trf::error::{TrfError, TrfResult};
use crate::trf::{slice_chars, Field, DATE_FORMAT, ROUNDS_OFFSET, ROUND_BLOCK_LEN, ROUND_BLOCK_WIDTH};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// 对局键: (轮次, 白方种子序号, 黑方种子序号; 0 = 轮空)
pub type PairingKey = (u32, u32, u32);

// ==========================================
// TrfDocument - 解析结果
// ==========================================
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TrfDocument {
    pub name: Option<String>,
    pub city: Option<String>,
    pub federation: Option<String>,
    pub chief_arbiter: Option<String>,
    pub deputy_chief_arbiter: Option<String>,
    pub time_control: Option<String>,
    pub round_dates: BTreeMap<u32, NaiveDateTime>, // 轮次 → 日期
    pub players: BTreeMap<u32, Player>,            // 种子序号 → 棋手
    pub pairings: BTreeMap<PairingKey, ResultPair>, // 双方行合并后的结果
}

/// 解析 TRF 文本
pub fn parse_trf(text: &str) -> TrfResult<TrfDocument> {
    let mut doc = TrfDocument::default();

    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        let code = slice_chars(line, 0, 3);
        let value = || line.chars().skip(4).collect::<String>().trim().to_string();

        match Field::from_code(&code) {
            Field::TournamentName => doc.name = Some(value()),
            Field::City => doc.city = Some(value()),
            Field::Federation => doc.federation = Some(value()),
            Field::ChiefArbiter => doc.chief_arbiter = Some(value()),
            Field::DeputyChiefArbiter => doc.deputy_chief_arbiter = Some(value()),
            Field::TimeControl => doc.time_control = Some(value()),
            Field::Calendar => read_dates(&mut doc, line)?,
            Field::Player => read_player(&mut doc, line, line_no + 1)?,
            // 计数字段会重新计算；起止日期 / 队伍 / 赛制 / 编排提示不导入
            _ => {}
        }
    }

    Ok(doc)
}

/// 对局块迭代: (轮次, 块文本)；超出行尾时结束
fn round_blocks(line: &str) -> impl Iterator<Item = (u32, String)> + '_ {
    let len = line.chars().count();
    (0..)
        .map(|k| (k, ROUNDS_OFFSET + ROUND_BLOCK_WIDTH * k))
        .take_while(move |(_, start)| *start < len)
        .map(move |(k, start)| (k as u32 + 1, slice_chars(line, start, ROUND_BLOCK_LEN)))
}

fn read_dates(doc: &mut TrfDocument, line: &str) -> TrfResult<()> {
    for (round, text) in round_blocks(line) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }

        let date = NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
            .map_err(|_| TrfError::InvalidDate(text.clone()))?;
        let date_time = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| TrfError::InvalidDate(text.clone()))?;
        doc.round_dates.insert(round, date_time);
    }
    Ok(())
}

fn parse_number(field: &str, text: &str) -> TrfResult<u32> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed.parse().map_err(|_| TrfError::InvalidNumber {
        field: field.to_string(),
        value: text.to_string(),
    })
}

fn read_player(doc: &mut TrfDocument, line: &str, line_no: usize) -> TrfResult<()> {
    let starting_rank = parse_number("starting_rank", &slice_chars(line, 4, 4))?;
    if starting_rank == 0 {
        return Err(TrfError::InvalidField {
            line: line_no,
            message: "种子序号缺失".to_string(),
        });
    }

    let mut player = Player::new(starting_rank, String::new(), 0);
    player.sex = slice_chars(line, 9, 1).trim().to_string();
    player.title = Title::from_str(&slice_chars(line, 10, 3));

    let full_name = slice_chars(line, 14, 33);
    match full_name.split_once(',') {
        Some((surname, name)) => {
            player.surname = surname.trim().to_string();
            player.name = name.trim().to_string();
        }
        None => player.name = full_name.trim().to_string(),
    }

    player.rating = parse_number("rating", &slice_chars(line, 48, 4))?;
    player.federation = slice_chars(line, 53, 5).trim().to_string();
    player.player_id = slice_chars(line, 57, 11).trim().to_string();
    player.birth_date = slice_chars(line, 69, 10).trim().to_string();

    for (round, block) in round_blocks(line) {
        if block.trim().is_empty() {
            continue;
        }
        read_pairing(doc, starting_rank, round, &block)?;
    }

    doc.players.insert(starting_rank, player);
    Ok(())
}

/// 解析单个对局块 "oooo c r"
fn read_pairing(doc: &mut TrfDocument, starting_rank: u32, round: u32, block: &str) -> TrfResult<()> {
    let chars: Vec<char> = block.chars().collect();
    if chars.len() != ROUND_BLOCK_LEN {
        return Err(TrfError::InvalidPairing(block.to_string()));
    }

    let opponent: String = chars[..4].iter().collect();
    let has_opponent = !(opponent == "    " || opponent == "0000");
    let mut opponent_rank = 0;
    if has_opponent {
        opponent_rank = opponent
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|n| *n > 0)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| TrfError::InvalidOpponent {
                opponent: opponent.clone(),
                block: block.to_string(),
            })?;
    }

    let color = Color::from_trf_char(chars[5]);
    let mut result = PartialResult::from_trf_char(chars[7]).ok_or_else(|| TrfError::UnknownResult {
        code: chars[7],
        block: block.to_string(),
    })?;

    // 无对手的弃权负按零分轮空处理（部分平台如此导出）
    if !has_opponent && result == PartialResult::LostForfeit {
        result = PartialResult::ZeroBye;
    }
    if !has_opponent && !result.is_bye() {
        return Err(TrfError::MissingOpponent(block.to_string()));
    }

    let as_white = color == Color::White || !has_opponent;
    let key = if as_white {
        (round, starting_rank, opponent_rank)
    } else {
        (round, opponent_rank, starting_rank)
    };

    let entry = doc
        .pairings
        .entry(key)
        .or_insert((PartialResult::Unknown, PartialResult::Unknown));
    if as_white {
        entry.0 = result;
    } else {
        entry.1 = result;
    }
    Ok(())
}

// ==========================================
// 提交
// ==========================================

/// 解析并写入赛事（调用方负责事务）
pub(crate) fn read_trf(tournament: &mut Tournament, text: &str) -> TournamentResult<()> {
    let doc = parse_trf(text)?;
    apply(tournament, doc)
}

fn apply(tournament: &mut Tournament, doc: TrfDocument) -> TournamentResult<()> {
    if let Some(v) = doc.name {
        tournament.set_name(v)?;
    }
    if let Some(v) = doc.city {
        tournament.set_city(v)?;
    }
    if let Some(v) = doc.federation {
        tournament.set_federation(v)?;
    }
    if let Some(v) = doc.chief_arbiter {
        tournament.set_chief_arbiter(v)?;
    }
    if let Some(v) = doc.deputy_chief_arbiter {
        tournament.set_deputy_chief_arbiter(v)?;
    }
    if let Some(v) = doc.time_control {
        tournament.set_time_control(v)?;
    }
    for (round, date_time) in &doc.round_dates {
        tournament.set_round_date(*round, Some(*date_time))?;
    }

    // ===== 棋手（种子序号顺序）=====
    let mut ids: BTreeMap<u32, PlayerId> = BTreeMap::new();
    for (rank, player) in doc.players {
        let id = tournament.add_player(player)?;
        ids.insert(rank, id);
    }

    // ===== 对局 =====
    for ((round, white_rank, black_rank), (white_result, black_result)) in doc.pairings {
        let white = *ids
            .get(&white_rank)
            .ok_or(TrfError::PlayerNotFound(white_rank))?;
        let black = match black_rank {
            0 => None,
            rank => Some(*ids.get(&rank).ok_or(TrfError::PlayerNotFound(rank))?),
        };

        if white_result == PartialResult::Unknown && black_result == PartialResult::Unknown {
            return Err(TrfError::UnknownPairingResult {
                white: white_rank,
                black: black_rank,
            }
            .into());
        }

        let board = tournament.pairings(round).len() as u32 + 1;
        tournament.add_pairing(round, Pairing::new(board, white, black, white_result, black_result))?;
    }

    // ===== 轮次状态 =====
    let rounds = tournament.rounds().len() as u32;
    tournament.set_number_of_rounds(rounds)?;
    tournament.sort_all_pairings()?;

    let current_round = (1..=rounds)
        .find(|r| !tournament.is_round_fully_paired(*r))
        .map_or(rounds, |r| r - 1);
    tournament.set_current_round(current_round)?;

    if current_round > 0 {
        let first = tournament.pairings(1).first().and_then(|p| {
            p.black.map(|black| {
                let white_rank = tournament.player(p.white).map_or(0, |x| x.starting_rank);
                let black_rank = tournament.player(black).map_or(0, |x| x.starting_rank);
                if white_rank < black_rank {
                    InitialColor::White
                } else {
                    InitialColor::Black
                }
            })
        });
        if let Some(color) = first {
            tournament.set_initial_color(color)?;
        }
    }

    debug!(rounds, current_round, "TRF 轮次状态");
    info!(
        players = tournament.number_of_players(),
        rounds,
        "TRF 导入完成"
    );
    Ok(())
}
