// ==========================================
// 国际象棋赛事管理引擎 - 命令行入口
// ==========================================
// 用法:
//   chess-arbiter [--db <path>] list
//   chess-arbiter [--db <path>] import <trf 文件>
//   chess-arbiter [--db <path>] export <赛事 ID> [输出文件]
//   chess-arbiter [--db <path>] standings <赛事 ID> [截止轮次]
//   chess-arbiter [--db <path>] pair <赛事 ID>
//   chess-arbiter ratings-import <FIDE 名单文件> [名单名称]
//   chess-arbiter ratings-search <姓名前缀 | FIDE ID>
//   chess-arbiter [--db <path>] ratings-fill <赛事 ID> <种子序号> <FIDE ID>
// 赛事 ID 支持前缀匹配
// ==========================================

use anyhow::{anyhow, bail, Context};
use chess_arbiter::config::AppConfig;
use chess_arbiter::ratinglist::import_fide_file;
use chess_arbiter::{
    logging, BbpPairingEngine, Event, PairRoundOptions, RatedPlayer, RatingListRepository,
    Tournament, TrfOptions,
};
use std::path::Path;

const USAGE: &str = "用法: chess-arbiter [--db <path>] <list | import <trf> | export <id> [out] | standings <id> [round] | pair <id> | ratings-import <file> [name] | ratings-search <query> | ratings-fill <id> <rank> <fide_id>>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let mut config = AppConfig::from_env();
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    if let Some(pos) = args.iter().position(|a| a == "--db") {
        if pos + 1 >= args.len() {
            bail!("--db 缺少路径参数\n{}", USAGE);
        }
        config.db_path = args.remove(pos + 1);
        args.remove(pos);
    }

    let Some(command) = args.first().cloned() else {
        bail!(USAGE);
    };
    let rest = &args[1..];

    // 名单命令不需要赛事文件
    match command.as_str() {
        "ratings-import" => {
            let path = rest.first().ok_or_else(|| anyhow!(USAGE))?;
            let repo = open_rating_lists(&config)?;
            let name = rest
                .get(1)
                .cloned()
                .unwrap_or_else(|| chrono::Local::now().format("FIDE %Y-%m").to_string());
            let info = import_fide_file(&repo, &name, Path::new(path))
                .with_context(|| format!("名单导入失败: {}", path))?;
            println!("{}  {}  players={}", info.id, info.name, info.players);
            return Ok(());
        }
        "ratings-search" => {
            let query = rest.first().ok_or_else(|| anyhow!(USAGE))?;
            let repo = open_rating_lists(&config)?;
            let found: Vec<RatedPlayer> = match query.parse::<u64>() {
                Ok(fide_id) => repo.find_by_fide_id(fide_id)?.into_iter().collect(),
                Err(_) => repo.search_by_name(query, 20)?,
            };
            for p in &found {
                print_rated(p);
            }
            return Ok(());
        }
        _ => {}
    }

    tracing::info!(db = %config.db_path, command = %command, "chess-arbiter {}", chess_arbiter::VERSION);
    let mut event = Event::open(&config.db_path)
        .with_context(|| format!("无法打开赛事文件: {}", config.db_path))?;

    match command.as_str() {
        "list" => {
            for tournament in event.tournaments() {
                println!(
                    "{}  {}  players={} rounds={}/{}",
                    tournament.id(),
                    tournament.name(),
                    tournament.number_of_players(),
                    tournament.current_round(),
                    tournament.number_of_rounds()
                );
            }
        }
        "import" => {
            let path = rest.first().ok_or_else(|| anyhow!(USAGE))?;
            let tournament = event
                .import_tournament(Path::new(path))
                .with_context(|| format!("导入失败: {}", path))?;
            println!("{}", tournament.id());
        }
        "export" => {
            let tournament = find(&mut event, rest.first())?;
            let trf = tournament.to_trf(TrfOptions::default(), None);
            match rest.get(1) {
                Some(out) => std::fs::write(out, trf).with_context(|| format!("写入失败: {}", out))?,
                None => print!("{}", trf),
            }
        }
        "standings" => {
            let max_round = rest
                .get(1)
                .map(|r| r.parse::<u32>())
                .transpose()
                .context("截止轮次必须为正整数")?;
            let tournament = find(&mut event, rest.first())?;
            print_standings(tournament, max_round);
        }
        "pair" => {
            let engine = BbpPairingEngine::from_config(&config);
            let tournament = find(&mut event, rest.first())?;
            if tournament.current_round() > 0 && !tournament.is_round_finished(tournament.current_round()) {
                bail!("第 {} 轮尚未结束", tournament.current_round());
            }
            if tournament.current_round() >= tournament.number_of_rounds() {
                bail!("赛事已完成全部 {} 轮", tournament.number_of_rounds());
            }
            tournament
                .pair_next_round(&engine, PairRoundOptions::default())
                .await?;
            let round = tournament.current_round();
            for pairing in tournament.pairings(round) {
                let white = tournament.player(pairing.white).map(|p| p.full_name()).unwrap_or_default();
                let black = pairing
                    .black
                    .and_then(|b| tournament.player(b))
                    .map(|p| p.full_name())
                    .unwrap_or_else(|| format!("({})", pairing.white_result));
                println!("{:>3}  {:<33} - {}", pairing.board, white, black);
            }
        }
        "ratings-fill" => {
            let (Some(rank), Some(fide_id)) = (rest.get(1), rest.get(2)) else {
                bail!(USAGE);
            };
            let rank: u32 = rank.parse().context("种子序号必须为正整数")?;
            let fide_id: u64 = fide_id.parse().context("FIDE ID 必须为数字")?;
            let repo = open_rating_lists(&config)?;
            let rated = repo
                .find_by_fide_id(fide_id)?
                .ok_or_else(|| anyhow!("名单中无此 FIDE ID: {}", fide_id))?;

            let tournament = find(&mut event, rest.first())?;
            let mut player = tournament
                .player_by_starting_rank(rank)
                .cloned()
                .ok_or_else(|| anyhow!("无此种子序号: {}", rank))?;
            rated.apply_to(&mut player);
            tournament.update_player(player)?;
            print_rated(&rated);
        }
        other => bail!("未知命令: {}\n{}", other, USAGE),
    }

    Ok(())
}

fn open_rating_lists(config: &AppConfig) -> anyhow::Result<RatingListRepository> {
    RatingListRepository::open(&config.rating_list_path)
        .with_context(|| format!("无法打开名单库: {}", config.rating_list_path))
}

fn print_rated(p: &RatedPlayer) {
    println!(
        "{:>10}  {:<33} {:<3} {:<4} {:>4} {:>4} {:>4}",
        p.fide_id, p.name, p.federation, p.title, p.standard, p.rapid, p.blitz
    );
}

fn find<'a>(event: &'a mut Event, id: Option<&String>) -> anyhow::Result<&'a mut Tournament> {
    let id = id.ok_or_else(|| anyhow!(USAGE))?;
    event
        .find_tournament_mut(id)
        .ok_or_else(|| anyhow!("赛事不存在: {}", id))
}

fn print_standings(tournament: &Tournament, max_round: Option<u32>) {
    let state = tournament.state(max_round);
    let standings = tournament.standings(&state);

    let header: Vec<String> = tournament.tiebreaks().iter().map(|t| t.short_name()).collect();
    println!("{:>4} {:>4}  {:<33} {:>4}  {}", "#", "SR", "Name", "Elo", header.join("  "));

    for standing in &standings {
        let Some(player) = tournament.player(standing.player) else {
            continue;
        };
        let values: Vec<String> = standing.values.iter().map(|v| format!("{:.1}", v)).collect();
        println!(
            "{:>4} {:>4}  {:<33} {:>4}  {}",
            standing.rank,
            standing.starting_rank,
            player.full_name(),
            player.rating,
            values.join("  ")
        );
    }
}
