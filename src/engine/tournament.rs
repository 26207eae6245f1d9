// ==========================================
// 国际象棋赛事管理引擎 - 赛事聚合根
// ==========================================
// 职责: 持有棋手/轮次/对局/选项，实现轮次推进状态机
// 状态: 未开始 (current_round = 0) → 进行中 → 已完成 (current_round = number_of_rounds)
// 红线:
// - 每轮台次为 1..k 稠密排列；种子序号为 1..N 稠密排列
// - 每名棋手每轮至多出现一次
// - current_round 之后的轮次只允许存在棋手申请的轮空
// - 前置条件违反属于编程错误，使用 assert!
// ==========================================

use crate::config::option_keys;
use crate::domain::{InitialColor, Pairing, PartialResult, Player, PlayerId, ResultPair, Round, Standing};
use crate::engine::error::{TournamentError, TournamentResult};
use crate::engine::pairing_engine::PairingEngine;
use crate::engine::standings::compute_standings;
use crate::engine::state::TournamentState;
use crate::engine::tiebreak::{tiebreaks_from_json, tiebreaks_to_json, Tiebreak};
use crate::repository::tournament_store::TournamentStore;
use crate::trf::{self, TrfOptions};
use chrono::NaiveDateTime;
use serde_json::json;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

// ==========================================
// 编排选项
// ==========================================

/// 首轮执色选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitialColorChoice {
    #[default]
    Configured, // 沿用赛事已配置的执色
    White,
    Black,
    Random,
}

/// 编排下一轮的选项（仅首轮生效）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairRoundOptions {
    pub sort_players: bool,              // 首轮前按等级分重排种子
    pub initial_color: InitialColorChoice, // 首轮执色
}

impl Default for PairRoundOptions {
    fn default() -> Self {
        Self {
            sort_players: true,
            initial_color: InitialColorChoice::Configured,
        }
    }
}

// ==========================================
// 台次排序键
// ==========================================
struct BoardKey {
    bye: bool,        // 轮空
    severity: u8,     // 白方结果序号（轮空间排序）
    white_rank: u32,  // 白方种子序号
    rank: u32,        // 双方较小种子序号
    score: f64,       // 较高种子方积分（截至上一轮）
    total: f64,       // 双方积分之和（截至上一轮）
}

fn compare_boards(a: &BoardKey, b: &BoardKey, by_score: bool) -> Ordering {
    match (a.bye, b.bye) {
        (true, true) => b
            .severity
            .cmp(&a.severity)
            .then(a.white_rank.cmp(&b.white_rank)),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let by_points = if by_score {
                b.score
                    .total_cmp(&a.score)
                    .then(b.total.total_cmp(&a.total))
            } else {
                Ordering::Equal
            };
            by_points.then(a.rank.cmp(&b.rank))
        }
    }
}

// ==========================================
// Tournament - 赛事聚合根
// ==========================================
pub struct Tournament {
    store: Arc<dyn TournamentStore>,

    // ===== 描述字段 =====
    name: String,
    city: String,
    federation: String,
    chief_arbiter: String,
    deputy_chief_arbiter: String,
    time_control: String,

    // ===== 轮次状态 =====
    number_of_rounds: u32,
    current_round: u32,
    initial_color: InitialColor,
    tiebreaks: Vec<Tiebreak>,

    // ===== 实体（棋手按存储 ID 索引，对局通过 ID 引用棋手）=====
    players: BTreeMap<PlayerId, Player>,
    rounds: Vec<Round>,
}

impl Tournament {
    /// 创建空赛事（尚无任何选项写入）
    pub fn new(store: Arc<dyn TournamentStore>) -> Self {
        Self {
            store,
            name: String::new(),
            city: String::new(),
            federation: String::new(),
            chief_arbiter: String::new(),
            deputy_chief_arbiter: String::new(),
            time_control: String::new(),
            number_of_rounds: 0,
            current_round: 0,
            initial_color: InitialColor::White,
            tiebreaks: vec![Tiebreak::Points],
            players: BTreeMap::new(),
            rounds: Vec::new(),
        }
    }

    /// 创建新赛事并写入默认选项
    pub fn create(store: Arc<dyn TournamentStore>) -> TournamentResult<Self> {
        let mut tournament = Self::new(store);
        tournament.set_name("")?;
        tournament.set_number_of_rounds(0)?;
        tournament.set_current_round(0)?;
        tournament.set_initial_color(InitialColor::White)?;
        tournament.set_tiebreaks(vec![Tiebreak::Points])?;
        Ok(tournament)
    }

    /// 从存储加载赛事
    pub fn load(store: Arc<dyn TournamentStore>) -> TournamentResult<Self> {
        let mut tournament = Self::new(store);
        let store = Arc::clone(&tournament.store);

        let text = |key: &str| -> TournamentResult<String> {
            Ok(store.get_option(key)?.unwrap_or_default())
        };
        tournament.name = text(option_keys::NAME)?;
        tournament.city = text(option_keys::CITY)?;
        tournament.federation = text(option_keys::FEDERATION)?;
        tournament.chief_arbiter = text(option_keys::CHIEF_ARBITER)?;
        tournament.deputy_chief_arbiter = text(option_keys::DEPUTY_CHIEF_ARBITER)?;
        tournament.time_control = text(option_keys::TIME_CONTROL)?;

        tournament.number_of_rounds = parse_u32_option(&*store, option_keys::NUMBER_OF_ROUNDS)?;
        tournament.current_round = parse_u32_option(&*store, option_keys::CURRENT_ROUND)?;

        if let Some(raw) = store.get_option(option_keys::INITIAL_COLOR)? {
            tournament.initial_color =
                InitialColor::from_str(&raw).ok_or_else(|| TournamentError::InvalidOption {
                    key: option_keys::INITIAL_COLOR.to_string(),
                    value: raw.clone(),
                })?;
        }
        if let Some(raw) = store.get_option(option_keys::TIEBREAKS)? {
            tournament.tiebreaks = tiebreaks_from_json(&raw)?;
        }

        tournament.players = store
            .load_players()?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        tournament.rounds = store.load_rounds()?;

        debug!(
            tournament_id = %store.tournament_id(),
            players = tournament.players.len(),
            rounds = tournament.rounds.len(),
            "赛事加载完成"
        );
        Ok(tournament)
    }

    // ==========================================
    // 描述字段
    // ==========================================

    pub fn id(&self) -> &str {
        self.store.tournament_id()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn federation(&self) -> &str {
        &self.federation
    }

    pub fn chief_arbiter(&self) -> &str {
        &self.chief_arbiter
    }

    pub fn deputy_chief_arbiter(&self) -> &str {
        &self.deputy_chief_arbiter
    }

    pub fn time_control(&self) -> &str {
        &self.time_control
    }

    pub fn set_name(&mut self, value: impl Into<String>) -> TournamentResult<()> {
        self.name = value.into();
        self.store.set_option(option_keys::NAME, &self.name)?;
        Ok(())
    }

    pub fn set_city(&mut self, value: impl Into<String>) -> TournamentResult<()> {
        self.city = value.into();
        self.store.set_option(option_keys::CITY, &self.city)?;
        Ok(())
    }

    pub fn set_federation(&mut self, value: impl Into<String>) -> TournamentResult<()> {
        self.federation = value.into();
        self.store.set_option(option_keys::FEDERATION, &self.federation)?;
        Ok(())
    }

    pub fn set_chief_arbiter(&mut self, value: impl Into<String>) -> TournamentResult<()> {
        self.chief_arbiter = value.into();
        self.store.set_option(option_keys::CHIEF_ARBITER, &self.chief_arbiter)?;
        Ok(())
    }

    pub fn set_deputy_chief_arbiter(&mut self, value: impl Into<String>) -> TournamentResult<()> {
        self.deputy_chief_arbiter = value.into();
        self.store
            .set_option(option_keys::DEPUTY_CHIEF_ARBITER, &self.deputy_chief_arbiter)?;
        Ok(())
    }

    pub fn set_time_control(&mut self, value: impl Into<String>) -> TournamentResult<()> {
        self.time_control = value.into();
        self.store.set_option(option_keys::TIME_CONTROL, &self.time_control)?;
        Ok(())
    }

    // ==========================================
    // 轮次状态
    // ==========================================

    pub fn number_of_rounds(&self) -> u32 {
        self.number_of_rounds
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn initial_color(&self) -> InitialColor {
        self.initial_color
    }

    pub fn tiebreaks(&self) -> &[Tiebreak] {
        &self.tiebreaks
    }

    pub fn set_number_of_rounds(&mut self, rounds: u32) -> TournamentResult<()> {
        self.number_of_rounds = rounds;
        self.store
            .set_option(option_keys::NUMBER_OF_ROUNDS, &rounds.to_string())?;
        Ok(())
    }

    pub(crate) fn set_current_round(&mut self, round: u32) -> TournamentResult<()> {
        self.current_round = round;
        self.store
            .set_option(option_keys::CURRENT_ROUND, &round.to_string())?;
        Ok(())
    }

    pub fn set_initial_color(&mut self, color: InitialColor) -> TournamentResult<()> {
        self.initial_color = color;
        self.store
            .set_option(option_keys::INITIAL_COLOR, color.to_db_str())?;
        Ok(())
    }

    /// 更新破同分指标配置
    pub fn set_tiebreaks(&mut self, tiebreaks: Vec<Tiebreak>) -> TournamentResult<()> {
        let raw = tiebreaks_to_json(&tiebreaks)?;
        self.store.set_option(option_keys::TIEBREAKS, &raw)?;
        self.tiebreaks = tiebreaks;
        Ok(())
    }

    // ==========================================
    // 棋手
    // ==========================================

    pub fn number_of_players(&self) -> usize {
        self.players.len()
    }

    /// 有国际等级分的棋手数
    pub fn number_of_rated_players(&self) -> usize {
        self.players.values().filter(|p| p.is_rated()).count()
    }

    /// 全部棋手（种子序号顺序）
    pub fn players(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by_key(|p| (p.starting_rank, p.id));
        players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_by_starting_rank(&self, rank: u32) -> Option<&Player> {
        self.players.values().find(|p| p.starting_rank == rank)
    }

    /// 种子序号 → 棋手 ID
    pub fn players_by_starting_rank(&self) -> BTreeMap<u32, PlayerId> {
        self.players
            .values()
            .map(|p| (p.starting_rank, p.id))
            .collect()
    }

    fn starting_rank_of(&self, id: PlayerId) -> u32 {
        self.players.get(&id).map_or(u32::MAX, |p| p.starting_rank)
    }

    /// 添加棋手
    ///
    /// - 种子序号为 0 时追加到末尾 (N + 1)
    /// - 赛事进行中时，为已编排的每一轮补一个零分轮空，保持积分历史一致
    /// - 棋手与补登轮空在同一事务中写入
    ///
    /// # 返回
    /// - Ok(PlayerId): 新棋手的存储 ID
    pub fn add_player(&mut self, mut player: Player) -> TournamentResult<PlayerId> {
        if player.starting_rank == 0 {
            player.starting_rank = self.players.len() as u32 + 1;
        }

        let (id, byes) = self.in_transaction("添加棋手", |t| t.write_new_player(&player))?;

        player.id = id;
        debug!(player_id = %id, starting_rank = player.starting_rank, byes = byes.len(), "添加棋手");
        self.players.insert(id, player);
        for (round_idx, pairing) in byes {
            self.rounds[round_idx].pairings.push(pairing);
        }
        Ok(id)
    }

    fn write_new_player(&self, player: &Player) -> TournamentResult<(PlayerId, Vec<(usize, Pairing)>)> {
        let id = self.store.insert_player(player)?;

        let mut byes = Vec::new();
        for round_idx in 0..(self.current_round as usize).min(self.rounds.len()) {
            let round = &self.rounds[round_idx];
            let bye = Pairing::bye(round.pairings.len() as u32 + 1, id, PartialResult::ZeroBye);
            self.store.insert_pairing(round.id, &bye)?;
            byes.push((round_idx, bye));
        }
        Ok((id, byes))
    }

    /// 更新棋手资料（按存储 ID 覆盖）
    pub fn update_player(&mut self, player: Player) -> TournamentResult<()> {
        if !self.players.contains_key(&player.id) {
            return Err(TournamentError::NotFound {
                entity: "Player".to_string(),
                id: player.id.to_string(),
            });
        }
        self.store.update_player(&player)?;
        self.players.insert(player.id, player);
        Ok(())
    }

    /// 当前种子顺序是否已符合排序规则
    pub fn are_players_sorted(&self) -> bool {
        self.players()
            .windows(2)
            .all(|w| w[0].seeding_cmp(w[1]) != Ordering::Greater)
    }

    /// 按等级分降序 → 称号强度 → 姓名重排种子序号 (1..N) 并保存
    pub fn sort_players(&mut self) -> TournamentResult<()> {
        let mut order: Vec<&Player> = self.players.values().collect();
        order.sort_by(|a, b| a.seeding_cmp(b));
        let ids: Vec<PlayerId> = order.into_iter().map(|p| p.id).collect();

        self.in_transaction("种子序号重排", |t| {
            for (i, id) in ids.iter().enumerate() {
                if let Some(player) = t.players.get_mut(id) {
                    player.starting_rank = i as u32 + 1;
                    t.store.update_player(player)?;
                }
            }
            Ok(())
        })?;

        info!(players = ids.len(), "种子序号重排完成");
        Ok(())
    }

    /// 调整单个棋手的种子序号，其余棋手顺移保持稠密
    pub fn change_starting_rank(&mut self, id: PlayerId, rank: u32) -> TournamentResult<()> {
        assert!(rank >= 1, "种子序号从 1 开始");
        let old = self
            .players
            .get(&id)
            .map(|p| p.starting_rank)
            .ok_or_else(|| TournamentError::NotFound {
                entity: "Player".to_string(),
                id: id.to_string(),
            })?;
        let rank = rank.min(self.players.len() as u32);
        if rank == old {
            return Ok(());
        }

        self.in_transaction("调整种子序号", |t| {
            let mut changed = Vec::new();
            for player in t.players.values_mut() {
                let r = player.starting_rank;
                if player.id == id {
                    player.starting_rank = rank;
                } else if rank < old && r >= rank && r < old {
                    player.starting_rank += 1;
                } else if rank > old && r > old && r <= rank {
                    player.starting_rank -= 1;
                } else {
                    continue;
                }
                changed.push(player.id);
            }

            for player_id in changed {
                if let Some(player) = t.players.get(&player_id) {
                    t.store.update_player(player)?;
                }
            }
            Ok(())
        })?;

        debug!(player_id = %id, from = old, to = rank, "调整种子序号");
        Ok(())
    }

    // ==========================================
    // 轮次 / 对局
    // ==========================================

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn round(&self, number: u32) -> Option<&Round> {
        number
            .checked_sub(1)
            .and_then(|i| self.rounds.get(i as usize))
    }

    /// 某轮对局（台次顺序）；轮次不存在时为空
    pub fn pairings(&self, round: u32) -> &[Pairing] {
        self.round(round).map(|r| r.pairings.as_slice()).unwrap_or(&[])
    }

    /// 确保第 1..=number 轮均已创建
    pub fn ensure_round_exists(&mut self, number: u32) -> TournamentResult<()> {
        while (self.rounds.len() as u32) < number {
            let mut round = Round::new(0, self.rounds.len() as u32 + 1);
            round.id = self.store.insert_round(&round)?;
            debug!(round = round.number, round_id = round.id, "创建轮次");
            self.rounds.push(round);
        }
        Ok(())
    }

    /// 设置轮次日期（轮次不存在时自动创建）
    pub fn set_round_date(&mut self, number: u32, date_time: Option<NaiveDateTime>) -> TournamentResult<()> {
        assert!(number >= 1, "轮次从 1 开始");
        self.ensure_round_exists(number)?;
        let round = &mut self.rounds[number as usize - 1];
        round.date_time = date_time;
        self.store.update_round(round)?;
        Ok(())
    }

    /// 向指定轮次追加对局（轮次按需创建）
    pub fn add_pairing(&mut self, round: u32, pairing: Pairing) -> TournamentResult<()> {
        assert!(round >= 1, "轮次从 1 开始");
        self.ensure_round_exists(round)?;
        let target = &mut self.rounds[round as usize - 1];
        self.store.insert_pairing(target.id, &pairing)?;
        target.pairings.push(pairing);
        Ok(())
    }

    /// 录入对局结果（不做白名单校验）
    pub fn set_result(&mut self, round: u32, pairing_id: &str, result: ResultPair) -> TournamentResult<()> {
        let pairing = round
            .checked_sub(1)
            .and_then(|i| self.rounds.get_mut(i as usize))
            .and_then(|r| r.pairing_mut(pairing_id))
            .ok_or_else(|| TournamentError::NotFound {
                entity: "Pairing".to_string(),
                id: pairing_id.to_string(),
            })?;

        pairing.white_result = result.0;
        pairing.black_result = result.1;
        self.store.update_pairing(pairing)?;

        debug!(round, pairing_id, white = %result.0, black = %result.1, "录入结果");
        Ok(())
    }

    /// 为尚未编排的轮次登记 / 修改 / 取消棋手轮空
    ///
    /// # 参数
    /// - result: 轮空类型；Unknown 表示取消
    pub fn set_bye(&mut self, player: PlayerId, round: u32, result: PartialResult) -> TournamentResult<()> {
        assert!(round > self.current_round, "只能为未编排的轮次登记轮空");

        let existing = self
            .round(round)
            .and_then(|r| r.pairing_of(player))
            .map(|p| p.id.clone());

        match existing {
            None if result == PartialResult::Unknown => Ok(()),
            None => {
                self.ensure_round_exists(round)?;
                let board = self.pairings(round).len() as u32 + 1;
                self.add_pairing(round, Pairing::bye(board, player, result))
            }
            Some(pairing_id) if result == PartialResult::Unknown => {
                self.store.delete_pairing(&pairing_id)?;
                let target = &mut self.rounds[round as usize - 1];
                target.pairings.retain(|p| p.id != pairing_id);
                self.renumber_boards(round)
            }
            Some(pairing_id) => {
                let target = &mut self.rounds[round as usize - 1];
                if let Some(pairing) = target.pairing_mut(&pairing_id) {
                    pairing.white_result = result;
                    pairing.black_result = PartialResult::Unknown;
                    self.store.update_pairing(pairing)?;
                }
                Ok(())
            }
        }
    }

    /// 棋手退赛：current_round 之后的每一轮登记零分轮空
    pub fn retire(&mut self, player: PlayerId) -> TournamentResult<()> {
        for round in (self.current_round + 1)..=self.number_of_rounds {
            self.set_bye(player, round, PartialResult::ZeroBye)?;
        }
        info!(player_id = %player, from_round = self.current_round + 1, "棋手退赛");
        Ok(())
    }

    /// 某轮申请轮空的棋手
    pub fn voluntary_byes(&self, round: u32) -> Vec<PlayerId> {
        self.pairings(round)
            .iter()
            .filter(|p| p.white_result.is_requested_bye())
            .map(|p| p.white)
            .collect()
    }

    /// 台次重排
    ///
    /// - 排序秩: 轮空为 0，否则为双方较小种子序号
    /// - 两个轮空: 结果序号降序，再按白方种子序号升序
    /// - 轮空排在对局之后
    /// - 第 1 轮按秩升序；之后各轮先比较较高种子方积分（降序），再比较双方积分和（降序），最后按秩升序
    /// - 台次从 1 开始重新编号并保存
    pub fn sort_pairings(&mut self, round: u32) -> TournamentResult<()> {
        assert!(round >= 1, "轮次从 1 开始");
        let idx = round as usize - 1;
        if idx >= self.rounds.len() {
            return Ok(());
        }

        let keys: Vec<BoardKey> = {
            let state = TournamentState::new(&self.rounds, round - 1);
            self.rounds[idx]
                .pairings
                .iter()
                .map(|p| self.board_key(p, &state))
                .collect()
        };

        let pairings = std::mem::take(&mut self.rounds[idx].pairings);
        let mut keyed: Vec<(BoardKey, Pairing)> = keys.into_iter().zip(pairings).collect();
        keyed.sort_by(|a, b| compare_boards(&a.0, &b.0, round > 1));
        self.rounds[idx].pairings = keyed.into_iter().map(|(_, p)| p).collect();

        self.renumber_boards(round)
    }

    /// 全部轮次台次重排
    pub fn sort_all_pairings(&mut self) -> TournamentResult<()> {
        for round in 1..=self.rounds.len() as u32 {
            self.sort_pairings(round)?;
        }
        Ok(())
    }

    fn board_key(&self, pairing: &Pairing, state: &TournamentState) -> BoardKey {
        let white_rank = self.starting_rank_of(pairing.white);
        match pairing.black {
            None => BoardKey {
                bye: true,
                severity: pairing.white_result.ordinal(),
                white_rank,
                rank: 0,
                score: 0.0,
                total: 0.0,
            },
            Some(black) => {
                let black_rank = self.starting_rank_of(black);
                let (higher, lower) = if white_rank < black_rank {
                    (pairing.white, black)
                } else {
                    (black, pairing.white)
                };
                let score = state.points(higher);
                BoardKey {
                    bye: false,
                    severity: pairing.white_result.ordinal(),
                    white_rank,
                    rank: white_rank.min(black_rank),
                    score,
                    total: score + state.points(lower),
                }
            }
        }
    }

    /// 按当前顺序重新编号台次并保存
    fn renumber_boards(&mut self, round: u32) -> TournamentResult<()> {
        let target = &mut self.rounds[round as usize - 1];
        for (i, pairing) in target.pairings.iter_mut().enumerate() {
            pairing.board = i as u32 + 1;
            self.store.update_pairing(pairing)?;
        }
        Ok(())
    }

    /// 轮次是否已结束：每个对局都是轮空或双方结果已知
    pub fn is_round_finished(&self, round: u32) -> bool {
        assert!(round >= 1, "轮次从 1 开始");
        match self.round(round) {
            Some(r) => r.pairings.iter().all(Pairing::has_finished),
            None => false,
        }
    }

    /// 轮次是否完整编排：每名棋手恰好出现一次
    pub fn is_round_fully_paired(&self, round: u32) -> bool {
        assert!(round >= 1, "轮次从 1 开始");
        let Some(r) = self.round(round) else {
            return false;
        };

        let mut seen = HashSet::new();
        let mut appearances = 0usize;
        for pairing in &r.pairings {
            seen.insert(pairing.white);
            appearances += 1;
            if let Some(black) = pairing.black {
                seen.insert(black);
                appearances += 1;
            }
        }
        seen.len() == self.players.len() && appearances == self.players.len()
    }

    // ==========================================
    // 编排
    // ==========================================

    /// 编排下一轮
    ///
    /// 前置条件: 当前轮已结束（未开始的赛事除外），且尚未达到总轮数
    ///
    /// 失败时 current_round 不前进；已写入的部分对局不会自动回滚，
    /// 调用方需先调用 remove_pairings 清理再重试
    pub async fn pair_next_round(
        &mut self,
        engine: &dyn PairingEngine,
        options: PairRoundOptions,
    ) -> TournamentResult<()> {
        assert!(
            self.current_round == 0 || self.is_round_finished(self.current_round),
            "当前轮尚未结束"
        );
        assert!(self.current_round < self.number_of_rounds, "已达到总轮数");

        let round_to_pair = self.current_round + 1;

        if round_to_pair == 1 {
            if options.sort_players && !self.are_players_sorted() {
                self.sort_players()?;
            }
            let color = match options.initial_color {
                InitialColorChoice::Configured => self.initial_color,
                InitialColorChoice::White => InitialColor::White,
                InitialColorChoice::Black => InitialColor::Black,
                InitialColorChoice::Random => {
                    if uuid::Uuid::new_v4().as_bytes()[0] & 1 == 0 {
                        InitialColor::White
                    } else {
                        InitialColor::Black
                    }
                }
            };
            self.set_initial_color(color)?;
        }

        info!(round = round_to_pair, players = self.players.len(), "开始编排");
        let pairs = engine.pair(round_to_pair, self).await?;

        let by_rank = self.players_by_starting_rank();
        let resolve = |rank: u32| {
            by_rank
                .get(&rank)
                .copied()
                .ok_or(TournamentError::NotFound {
                    entity: "Player".to_string(),
                    id: format!("starting_rank={}", rank),
                })
        };

        let mut board = self.pairings(round_to_pair).len() as u32 + 1;
        for (white_rank, black_rank) in pairs {
            let white = resolve(white_rank)?;
            let pairing = if black_rank == 0 {
                Pairing::bye(board, white, PartialResult::PairingBye)
            } else {
                let black = resolve(black_rank)?;
                Pairing::new(board, white, Some(black), PartialResult::Unknown, PartialResult::Unknown)
            };
            self.add_pairing(round_to_pair, pairing)?;
            board += 1;
        }

        self.sort_pairings(round_to_pair)?;
        self.set_current_round(round_to_pair)?;

        info!(
            round = round_to_pair,
            pairings = self.pairings(round_to_pair).len(),
            "编排完成"
        );
        Ok(())
    }

    /// 删除第 round 轮及之后所有轮次的对局，current_round 回退到 round - 1
    ///
    /// # 参数
    /// - keep_byes: 为 true 时保留棋手申请的轮空
    pub fn remove_pairings(&mut self, round: u32, keep_byes: bool) -> TournamentResult<()> {
        assert!(round >= 1, "轮次从 1 开始");
        assert!(round <= self.number_of_rounds, "轮次超出总轮数");

        for number in round..=self.rounds.len() as u32 {
            let target = &mut self.rounds[number as usize - 1];
            self.store.delete_round_pairings(target.id, keep_byes)?;
            target
                .pairings
                .retain(|p| keep_byes && p.white_result.is_requested_bye());
            self.renumber_boards(number)?;
        }

        self.set_current_round(round - 1)?;
        info!(from_round = round, keep_byes, "删除对局");
        Ok(())
    }

    // ==========================================
    // 事务
    // ==========================================

    /// 在存储事务内执行一组修改
    ///
    /// 失败时回滚存储，并从存储重新加载内存状态，保证两者一致
    fn in_transaction<T>(
        &mut self,
        operation: &str,
        f: impl FnOnce(&mut Self) -> TournamentResult<T>,
    ) -> TournamentResult<T> {
        self.store.begin_transaction()?;
        let result = f(self).and_then(|value| {
            self.store.commit()?;
            Ok(value)
        });

        if let Err(e) = &result {
            warn!(operation, error = %e, "事务失败，回滚并重新加载");
            if let Err(rollback_err) = self.store.rollback() {
                warn!(operation, error = %rollback_err, "事务回滚失败");
            }
            if let Err(reload_err) = self.reload() {
                warn!(operation, error = %reload_err, "重新加载赛事失败");
            }
        }
        result
    }

    /// 丢弃内存状态，从存储重新加载
    fn reload(&mut self) -> TournamentResult<()> {
        *self = Self::load(Arc::clone(&self.store))?;
        Ok(())
    }

    // ==========================================
    // 状态 / 排名
    // ==========================================

    /// 构建状态快照
    ///
    /// # 参数
    /// - max_round: 截止轮次；None 表示全部轮次
    pub fn state(&self, max_round: Option<u32>) -> TournamentState<'_> {
        let all = self.number_of_rounds.max(self.rounds.len() as u32);
        TournamentState::new(&self.rounds, max_round.unwrap_or(all))
    }

    /// 计算排名
    pub fn standings(&self, state: &TournamentState) -> Vec<Standing> {
        compute_standings(&self.players(), &self.tiebreaks, state)
    }

    // ==========================================
    // 导入 / 导出
    // ==========================================

    /// 读取 TRF 文本（在一个存储事务内提交）
    pub fn read_trf(&mut self, text: &str) -> TournamentResult<()> {
        self.in_transaction("TRF 导入", |t| trf::reader::read_trf(t, text))
    }

    /// 生成 TRF 文本
    ///
    /// # 参数
    /// - options: 编排程序提示行
    /// - max_round: 输出的最大轮次；None 表示全部轮次
    pub fn to_trf(&self, options: TrfOptions, max_round: Option<u32>) -> String {
        trf::writer::write_trf(self, options, max_round)
    }

    /// 导出 TRF 文件
    pub fn export_trf(&self, path: &std::path::Path) -> TournamentResult<()> {
        std::fs::write(path, self.to_trf(TrfOptions::default(), None))?;
        info!(path = %path.display(), "TRF 导出完成");
        Ok(())
    }

    /// JSON 快照
    pub fn to_json(&self) -> TournamentResult<serde_json::Value> {
        let tiebreaks: Vec<&str> = self.tiebreaks.iter().map(Tiebreak::id).collect();
        Ok(json!({
            "tournament": {
                "id": self.id(),
                "name": self.name,
                "city": self.city,
                "federation": self.federation,
                "chief_arbiter": self.chief_arbiter,
                "deputy_chief_arbiter": self.deputy_chief_arbiter,
                "time_control": self.time_control,
                "number_of_rounds": self.number_of_rounds,
                "current_round": self.current_round,
                "initial_color": self.initial_color,
                "tiebreaks": tiebreaks,
            },
            "players": serde_json::to_value(self.players())?,
            "rounds": serde_json::to_value(&self.rounds)?,
        }))
    }
}

fn parse_u32_option(store: &dyn TournamentStore, key: &str) -> TournamentResult<u32> {
    match store.get_option(key)? {
        None => Ok(0),
        Some(raw) => raw.trim().parse().map_err(|_| TournamentError::InvalidOption {
            key: key.to_string(),
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_schema, open_in_memory_connection};
    use crate::repository::error::{RepositoryError, RepositoryResult};
    use crate::repository::sqlite_store::SqliteTournamentStore;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Mutex;

    /// 前 N 次 update_player 成功，之后全部失败
    struct FlakyStore {
        inner: SqliteTournamentStore,
        updates_left: AtomicUsize,
    }

    impl FlakyStore {
        fn new() -> Self {
            let conn = open_in_memory_connection().unwrap();
            init_schema(&conn).unwrap();
            conn.execute("INSERT INTO tournaments (id) VALUES ('t1')", []).unwrap();
            Self {
                inner: SqliteTournamentStore::from_connection(Arc::new(Mutex::new(conn)), "t1"),
                updates_left: AtomicUsize::new(usize::MAX),
            }
        }

        fn fail_updates_after(&self, n: usize) {
            self.updates_left.store(n, AtomicOrdering::SeqCst);
        }
    }

    impl TournamentStore for FlakyStore {
        fn tournament_id(&self) -> &str {
            self.inner.tournament_id()
        }
        fn begin_transaction(&self) -> RepositoryResult<()> {
            self.inner.begin_transaction()
        }
        fn commit(&self) -> RepositoryResult<()> {
            self.inner.commit()
        }
        fn rollback(&self) -> RepositoryResult<()> {
            self.inner.rollback()
        }
        fn get_option(&self, key: &str) -> RepositoryResult<Option<String>> {
            self.inner.get_option(key)
        }
        fn set_option(&self, key: &str, value: &str) -> RepositoryResult<()> {
            self.inner.set_option(key, value)
        }
        fn insert_player(&self, player: &Player) -> RepositoryResult<PlayerId> {
            self.inner.insert_player(player)
        }
        fn update_player(&self, player: &Player) -> RepositoryResult<()> {
            let left = self.updates_left.load(AtomicOrdering::SeqCst);
            if left == 0 {
                return Err(RepositoryError::DatabaseQueryError("disk full".to_string()));
            }
            self.updates_left.store(left - 1, AtomicOrdering::SeqCst);
            self.inner.update_player(player)
        }
        fn insert_round(&self, round: &Round) -> RepositoryResult<i64> {
            self.inner.insert_round(round)
        }
        fn update_round(&self, round: &Round) -> RepositoryResult<()> {
            self.inner.update_round(round)
        }
        fn insert_pairing(&self, round_id: i64, pairing: &Pairing) -> RepositoryResult<()> {
            self.inner.insert_pairing(round_id, pairing)
        }
        fn update_pairing(&self, pairing: &Pairing) -> RepositoryResult<()> {
            self.inner.update_pairing(pairing)
        }
        fn delete_pairing(&self, pairing_id: &str) -> RepositoryResult<()> {
            self.inner.delete_pairing(pairing_id)
        }
        fn delete_round_pairings(&self, round_id: i64, keep_requested_byes: bool) -> RepositoryResult<usize> {
            self.inner.delete_round_pairings(round_id, keep_requested_byes)
        }
        fn load_players(&self) -> RepositoryResult<Vec<Player>> {
            self.inner.load_players()
        }
        fn load_rounds(&self) -> RepositoryResult<Vec<Round>> {
            self.inner.load_rounds()
        }
    }

    /// 4 名棋手，按等级分升序录入（种子顺序与排序规则相反）
    fn flaky_tournament() -> (Arc<FlakyStore>, Tournament) {
        let store = Arc::new(FlakyStore::new());
        let mut t = Tournament::create(store.clone()).unwrap();
        for (name, rating) in [("A", 1800), ("B", 1900), ("C", 2000), ("D", 2100)] {
            t.add_player(Player::new(0, name, rating)).unwrap();
        }
        (store, t)
    }

    fn ranks(t: &Tournament) -> Vec<(String, u32)> {
        t.players()
            .iter()
            .map(|p| (p.name.clone(), p.starting_rank))
            .collect()
    }

    #[test]
    fn test_failed_rank_change_keeps_memory_and_store_in_sync() {
        let (store, mut t) = flaky_tournament();
        let before = ranks(&t);
        let moved = t.player_by_starting_rank(4).unwrap().id;

        store.fail_updates_after(2);
        assert!(t.change_starting_rank(moved, 1).is_err());

        assert_eq!(ranks(&t), before);
        let reloaded = Tournament::load(store.clone()).unwrap();
        assert_eq!(ranks(&reloaded), before);
    }

    #[test]
    fn test_failed_sort_keeps_memory_and_store_in_sync() {
        let (store, mut t) = flaky_tournament();
        let before = ranks(&t);

        store.fail_updates_after(3);
        assert!(t.sort_players().is_err());
        assert!(!t.are_players_sorted());

        assert_eq!(ranks(&t), before);
        let reloaded = Tournament::load(store.clone()).unwrap();
        assert_eq!(ranks(&reloaded), before);

        store.fail_updates_after(usize::MAX);
        t.sort_players().unwrap();
        assert_eq!(t.players()[0].name, "D");
    }

    fn key(bye: bool, severity: u8, white_rank: u32, rank: u32, score: f64, total: f64) -> BoardKey {
        BoardKey { bye, severity, white_rank, rank, score, total }
    }

    #[test]
    fn test_compare_boards_byes() {
        let half = key(true, PartialResult::HalfBye.ordinal(), 3, 0, 0.0, 0.0);
        let pab = key(true, PartialResult::PairingBye.ordinal(), 9, 0, 0.0, 0.0);
        let game = key(false, 0, 5, 5, 0.0, 0.0);

        assert_eq!(compare_boards(&pab, &half, true), Ordering::Less);
        assert_eq!(compare_boards(&game, &half, true), Ordering::Less);
        assert_eq!(compare_boards(&half, &game, false), Ordering::Greater);

        let half2 = key(true, PartialResult::HalfBye.ordinal(), 1, 0, 0.0, 0.0);
        assert_eq!(compare_boards(&half2, &half, true), Ordering::Less);
    }

    #[test]
    fn test_compare_boards_games() {
        let a = key(false, 0, 1, 1, 1.0, 1.0);
        let b = key(false, 0, 2, 2, 2.0, 2.0);
        // 第 1 轮只看秩
        assert_eq!(compare_boards(&a, &b, false), Ordering::Less);
        // 之后各轮先看积分
        assert_eq!(compare_boards(&a, &b, true), Ordering::Greater);

        let c = key(false, 0, 3, 3, 2.0, 3.0);
        assert_eq!(compare_boards(&c, &b, true), Ordering::Less);
    }
}
