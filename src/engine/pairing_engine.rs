// ==========================================
// 国际象棋赛事管理引擎 - 编排程序调用
// ==========================================
// 职责: 生成 TRF 快照 → 调用外部编排程序 → 解析对局列表
// 协议: <program> --dutch <trf 文件> -p
//       输出首行为对局数，其余每行 "白方种子序号 黑方种子序号"（黑方 0 = 轮空）
// 红线: 子进程受超时约束；超时即终止进程
// ==========================================

use crate::config::AppConfig;
use crate::engine::error::PairingError;
use crate::engine::tournament::Tournament;
use crate::trf::TrfOptions;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, error, info};

// ==========================================
// PairingEngine Trait
// ==========================================
// 实现者: BbpPairingEngine；测试中可替换为固定输出的实现
#[async_trait]
pub trait PairingEngine: Send + Sync {
    /// 编排指定轮次
    ///
    /// # 返回
    /// - Ok(Vec<(白方种子序号, 黑方种子序号)>): 黑方 0 表示轮空
    async fn pair(&self, round: u32, tournament: &Tournament) -> Result<Vec<(u32, u32)>, PairingError>;
}

// ==========================================
// BbpPairingEngine - bbpPairings 荷兰制编排
// ==========================================
#[derive(Debug, Clone)]
pub struct BbpPairingEngine {
    program: String,
    timeout: Duration,
}

impl BbpPairingEngine {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.pairing_program.clone(), config.pairing_timeout)
    }

    /// 定位编排程序
    ///
    /// - 含路径分隔符: 按路径检查
    /// - 否则依次搜索 PATH 与当前可执行文件所在目录
    fn resolve_program(&self) -> Result<PathBuf, PairingError> {
        let not_found = || PairingError::ProgramNotFound(self.program.clone());

        let direct = Path::new(&self.program);
        if direct.components().count() > 1 {
            return if direct.is_file() {
                Ok(direct.to_path_buf())
            } else {
                Err(not_found())
            };
        }

        let mut dirs: Vec<PathBuf> = std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).collect())
            .unwrap_or_default();
        if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
            dirs.push(exe_dir);
        }

        dirs.into_iter()
            .flat_map(|dir| {
                let plain = dir.join(&self.program);
                let exe = dir.join(format!("{}.exe", self.program));
                [plain, exe]
            })
            .find(|candidate| candidate.is_file())
            .ok_or_else(not_found)
    }
}

#[async_trait]
impl PairingEngine for BbpPairingEngine {
    async fn pair(&self, round: u32, tournament: &Tournament) -> Result<Vec<(u32, u32)>, PairingError> {
        let program = self.resolve_program()?;

        let options = TrfOptions {
            number_of_rounds: true,
            initial_color: Some(tournament.initial_color()),
        };
        let trf = tournament.to_trf(options, Some(round));

        let file = tempfile::NamedTempFile::new()?;
        tokio::fs::write(file.path(), trf.as_bytes()).await?;
        debug!(round, path = %file.path().display(), bytes = trf.len(), "编排输入已写出");

        let child = tokio::process::Command::new(&program)
            .arg("--dutch")
            .arg(file.path())
            .arg("-p")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(result) => result?,
            Err(_) => {
                error!(round, timeout_ms = self.timeout.as_millis() as u64, "编排程序超时");
                return Err(PairingError::Timeout(self.timeout.as_millis()));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(round, code = ?output.status.code(), stderr = %stderr, "编排程序非零退出");
            return Err(PairingError::NonZeroExit {
                code: output.status.code(),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let known: HashSet<u32> = tournament.players().iter().map(|p| p.starting_rank).collect();
        let pairs = parse_pairing_output(&stdout, |rank| known.contains(&rank))?;

        info!(round, pairs = pairs.len(), "编排程序返回");
        Ok(pairs)
    }
}

/// 解析编排程序输出
///
/// # 参数
/// - output: 标准输出全文（首行为对局数，忽略）
/// - is_known: 种子序号是否存在
pub fn parse_pairing_output(
    output: &str,
    is_known: impl Fn(u32) -> bool,
) -> Result<Vec<(u32, u32)>, PairingError> {
    let mut pairs = Vec::new();

    for line in output.lines().skip(1) {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let numbers: Vec<u32> = line
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| PairingError::InvalidLine(line.to_string()))?;
        let &[white, black] = numbers.as_slice() else {
            return Err(PairingError::InvalidLine(line.to_string()));
        };

        if !is_known(white) {
            return Err(PairingError::UnknownPlayer(white));
        }
        if black != 0 && !is_known(black) {
            return Err(PairingError::UnknownPlayer(black));
        }
        pairs.push((white, black));
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(rank: u32) -> bool {
        (1..=5).contains(&rank)
    }

    #[test]
    fn test_parse_output() {
        let output = "3\n1 4\n2 3\n\n5 0\n";
        let pairs = parse_pairing_output(output, known).unwrap();
        assert_eq!(pairs, vec![(1, 4), (2, 3), (5, 0)]);
    }

    #[test]
    fn test_parse_output_invalid_lines() {
        assert!(matches!(
            parse_pairing_output("1\n1 2 3\n", known),
            Err(PairingError::InvalidLine(_))
        ));
        assert!(matches!(
            parse_pairing_output("1\n1 x\n", known),
            Err(PairingError::InvalidLine(_))
        ));
        assert!(matches!(
            parse_pairing_output("1\n1 9\n", known),
            Err(PairingError::UnknownPlayer(9))
        ));
        assert!(matches!(
            parse_pairing_output("1\n0 2\n", known),
            Err(PairingError::UnknownPlayer(0))
        ));
    }

    #[test]
    fn test_missing_program() {
        let engine = BbpPairingEngine::new("definitely-not-a-pairing-program-xyz", Duration::from_secs(1));
        assert!(matches!(
            engine.resolve_program(),
            Err(PairingError::ProgramNotFound(_))
        ));

        let engine = BbpPairingEngine::new("/nonexistent/dir/bbpPairings", Duration::from_secs(1));
        assert!(matches!(
            engine.resolve_program(),
            Err(PairingError::ProgramNotFound(_))
        ));
    }
}
