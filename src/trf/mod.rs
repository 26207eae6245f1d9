// ==========================================
// 国际象棋赛事管理引擎 - TRF 编解码层
// ==========================================
// 职责: FIDE 赛事报告格式 (Tournament Report File) 读写
// 格式: 行式定长列，前三个字符为字段代码
// ==========================================

pub mod error;
pub mod reader;
pub mod writer;

pub use error::{TrfError, TrfResult};

use crate::domain::InitialColor;

/// TRF 日期格式 (yy/MM/dd)
pub const DATE_FORMAT: &str = "%y/%m/%d";

/// 对局块起始列
pub const ROUNDS_OFFSET: usize = 91;
/// 对局块宽度（含分隔空格）
pub const ROUND_BLOCK_WIDTH: usize = 10;
/// 对局块有效长度
pub const ROUND_BLOCK_LEN: usize = 8;

// ==========================================
// 字段代码
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Player,
    TournamentName,
    City,
    Federation,
    StartDate,
    EndDate,
    NumberOfPlayers,
    NumberOfRatedPlayers,
    NumberOfTeams,
    TournamentType,
    ChiefArbiter,
    DeputyChiefArbiter,
    TimeControl,
    Calendar,
    Unknown,
}

impl Field {
    pub fn code(self) -> &'static str {
        match self {
            Field::Player => "001",
            Field::TournamentName => "012",
            Field::City => "022",
            Field::Federation => "032",
            Field::StartDate => "042",
            Field::EndDate => "052",
            Field::NumberOfPlayers => "062",
            Field::NumberOfRatedPlayers => "072",
            Field::NumberOfTeams => "082",
            Field::TournamentType => "092",
            Field::ChiefArbiter => "102",
            Field::DeputyChiefArbiter => "112",
            Field::TimeControl => "122",
            Field::Calendar => "132",
            Field::Unknown => "",
        }
    }

    /// 解析字段代码（未知代码返回 Unknown）
    pub fn from_code(code: &str) -> Self {
        match code {
            "001" => Field::Player,
            "012" => Field::TournamentName,
            "022" => Field::City,
            "032" => Field::Federation,
            "042" => Field::StartDate,
            "052" => Field::EndDate,
            "062" => Field::NumberOfPlayers,
            "072" => Field::NumberOfRatedPlayers,
            "082" => Field::NumberOfTeams,
            "092" => Field::TournamentType,
            "102" => Field::ChiefArbiter,
            "112" => Field::DeputyChiefArbiter,
            "122" => Field::TimeControl,
            "132" => Field::Calendar,
            _ => Field::Unknown,
        }
    }
}

/// 写出选项（编排程序提示行）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrfOptions {
    pub number_of_rounds: bool,             // 输出 XXR
    pub initial_color: Option<InitialColor>, // 输出 XXC
}

/// 按字符截取 [start, start + len)，越界部分截断
pub(crate) fn slice_chars(line: &str, start: usize, len: usize) -> String {
    line.chars().skip(start).take(len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_codes() {
        assert_eq!(Field::from_code("001"), Field::Player);
        assert_eq!(Field::from_code("132"), Field::Calendar);
        assert_eq!(Field::from_code("XXR"), Field::Unknown);
        assert_eq!(Field::DeputyChiefArbiter.code(), "112");
    }

    #[test]
    fn test_slice_chars() {
        assert_eq!(slice_chars("001    1", 4, 4), "   1");
        assert_eq!(slice_chars("abc", 2, 10), "c");
        assert_eq!(slice_chars("abc", 5, 2), "");
        assert_eq!(slice_chars("añbc", 1, 2), "ñb");
    }
}
