// ==========================================
// 国际象棋赛事管理引擎 - 等级分名单导入
// ==========================================
// 职责: 读取本地 FIDE 名单文件并写入名单库
// 红线: 不联网下载；单行格式错误只跳过该行，不中断导入
// ==========================================

pub mod error;
pub mod fide_reader;

pub use error::{RatingListError, RatingListResult};
pub use fide_reader::parse_fide_line;

use crate::domain::RatingListInfo;
use crate::repository::RatingListRepository;
use std::io::BufRead;
use std::path::Path;
use tracing::{info, warn};

/// 每批写入的棋手数
const BATCH_SIZE: usize = 1000;

/// 从文件导入 FIDE 名单
pub fn import_fide_file(
    repo: &RatingListRepository,
    name: &str,
    path: &Path,
) -> RatingListResult<RatingListInfo> {
    let file = std::fs::File::open(path)?;
    let source = path.file_name().map(|n| n.to_string_lossy().into_owned());
    import_fide_list(
        repo,
        name,
        source.as_deref(),
        std::io::BufReader::new(file),
    )
}

/// 导入 FIDE 名单（首行为表头）
///
/// # 返回
/// - Ok(RatingListInfo): 新名单及实际写入的棋手数
/// - Err: 读取或写库失败，已写入的部分随名单一并删除
pub fn import_fide_list<R: BufRead>(
    repo: &RatingListRepository,
    name: &str,
    source: Option<&str>,
    reader: R,
) -> RatingListResult<RatingListInfo> {
    let list_id = repo.create_list(name, source)?;

    match import_lines(repo, list_id, reader) {
        Ok(skipped) => {
            let info = repo.list(list_id)?;
            info!(
                list_id,
                name,
                players = info.players,
                skipped,
                "等级分名单导入完成"
            );
            Ok(info)
        }
        Err(e) => {
            if let Err(cleanup) = repo.remove_list(list_id) {
                warn!(list_id, error = %cleanup, "导入失败后删除名单失败");
            }
            Err(e)
        }
    }
}

/// 返回跳过的行数
fn import_lines<R: BufRead>(
    repo: &RatingListRepository,
    list_id: i64,
    mut reader: R,
) -> RatingListResult<usize> {
    let mut buf = Vec::new();
    let mut batch = Vec::with_capacity(BATCH_SIZE);
    let mut line_no = 0usize;
    let mut skipped = 0usize;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;
        // 表头
        if line_no == 1 {
            continue;
        }

        // 名单文件并非总是 UTF-8
        let text = String::from_utf8_lossy(&buf);
        let line = text.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }

        match parse_fide_line(line) {
            Ok(player) => batch.push(player),
            Err(e) => {
                warn!(line = line_no, error = %e, "跳过无效名单行");
                skipped += 1;
            }
        }

        if batch.len() >= BATCH_SIZE {
            repo.insert_players(list_id, &batch)?;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        repo.insert_players(list_id, &batch)?;
    }
    Ok(skipped)
}

#[cfg(test)]
mod tests {
    use super::fide_reader::tests::fide_line;
    use super::*;
    use std::io::Cursor;

    fn sample_list() -> String {
        let header = "ID Number      Name                                                         Fed Sex Tit  WTit OTit           SRtng SGm SK RRtng RGm Rk BRtng BGm BK B-day Flag";
        [
            header.to_string(),
            fide_line(&[(0, "1503014"), (15, "Carlsen, Magnus"), (76, "NOR"), (80, "M"), (84, "GM"), (113, "2830"), (152, "1990")]),
            fide_line(&[(0, "bogus"), (15, "Broken, Line")]),
            "1234  short".to_string(),
            String::new(),
            fide_line(&[(0, "5000017"), (15, "Anand, Viswanathan"), (76, "IND"), (80, "M"), (84, "GM"), (113, "2750"), (152, "1969")]),
        ]
        .join("\r\n")
    }

    #[test]
    fn test_import_skips_header_and_invalid_lines() {
        let repo = RatingListRepository::open_in_memory().unwrap();
        let info = import_fide_list(&repo, "FIDE 2024-03", Some("players_list_foa.txt"), Cursor::new(sample_list())).unwrap();

        assert_eq!(info.name, "FIDE 2024-03");
        assert_eq!(info.players, 2);
        assert_eq!(repo.find_by_fide_id(5000017).unwrap().unwrap().standard, 2750);
        assert_eq!(repo.search_by_name("carl", 5).unwrap()[0].fide_id, 1503014);
    }

    #[test]
    fn test_import_latin1_bytes() {
        let repo = RatingListRepository::open_in_memory().unwrap();
        let mut bytes = b"header\n".to_vec();
        let line = fide_line(&[(0, "42"), (15, "Nu?ez, Ana"), (76, "ESP"), (113, "2001")]);
        let mut raw = line.into_bytes();
        raw[17] = 0xF1; // Latin-1 "ñ"
        bytes.extend_from_slice(&raw);

        let info = import_fide_list(&repo, "L", None, Cursor::new(bytes)).unwrap();
        assert_eq!(info.players, 1);
        assert_eq!(repo.find_by_fide_id(42).unwrap().unwrap().standard, 2001);
    }

    #[test]
    fn test_import_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("players_list_foa.txt");
        std::fs::write(&path, sample_list()).unwrap();

        let repo = RatingListRepository::open_in_memory().unwrap();
        let info = import_fide_file(&repo, "March", &path).unwrap();
        assert_eq!(info.source.as_deref(), Some("players_list_foa.txt"));
        assert_eq!(info.players, 2);

        assert!(matches!(
            import_fide_file(&repo, "missing", &dir.path().join("nope.txt")),
            Err(RatingListError::Io(_))
        ));
        assert_eq!(repo.lists().unwrap().len(), 1);
    }
}
