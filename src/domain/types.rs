// ==========================================
// 国际象棋赛事管理引擎 - 领域类型定义
// ==========================================
// 职责: 对局结果 / 执色 / 称号 / 首轮执色等基础枚举
// 红线: 结果组合必须落在 VALID_RESULTS 白名单内
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 单方结果 (Partial Result)
// ==========================================
// 顺序即"严重程度"序号，轮空排序依赖该顺序，不得调整
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartialResult {
    Unknown,     // 未录入
    Win,         // 胜
    Lost,        // 负
    Draw,        // 和
    WinForfeit,  // 对手弃权胜
    LostForfeit, // 弃权负
    WinUnrated,  // 不计等级分胜
    LostUnrated, // 不计等级分负
    DrawUnrated, // 不计等级分和
    HalfBye,     // 申请轮空(半分)
    FullBye,     // 整分轮空
    ZeroBye,     // 申请轮空(零分)
    PairingBye,  // 编排轮空
}

impl PartialResult {
    /// 全部取值（按序号）
    pub const ALL: [PartialResult; 13] = [
        PartialResult::Unknown,
        PartialResult::Win,
        PartialResult::Lost,
        PartialResult::Draw,
        PartialResult::WinForfeit,
        PartialResult::LostForfeit,
        PartialResult::WinUnrated,
        PartialResult::LostUnrated,
        PartialResult::DrawUnrated,
        PartialResult::HalfBye,
        PartialResult::FullBye,
        PartialResult::ZeroBye,
        PartialResult::PairingBye,
    ];

    /// 序号（轮空排序使用）
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// 该结果对应的积分
    pub fn points(self) -> f64 {
        match self {
            PartialResult::Win
            | PartialResult::WinForfeit
            | PartialResult::WinUnrated
            | PartialResult::FullBye
            | PartialResult::PairingBye => 1.0,
            PartialResult::Draw | PartialResult::DrawUnrated | PartialResult::HalfBye => 0.5,
            _ => 0.0,
        }
    }

    /// 是否为"未实际对弈"类结果（弃权 / 轮空）
    pub fn is_unplayed(self) -> bool {
        matches!(
            self,
            PartialResult::WinForfeit
                | PartialResult::LostForfeit
                | PartialResult::HalfBye
                | PartialResult::FullBye
                | PartialResult::ZeroBye
                | PartialResult::PairingBye
        )
    }

    /// 是否为轮空
    pub fn is_bye(self) -> bool {
        matches!(
            self,
            PartialResult::HalfBye
                | PartialResult::FullBye
                | PartialResult::ZeroBye
                | PartialResult::PairingBye
        )
    }

    /// 是否为棋手主动申请的轮空
    pub fn is_requested_bye(self) -> bool {
        matches!(self, PartialResult::HalfBye | PartialResult::ZeroBye)
    }

    /// 是否计入虚拟未赛轮 (VUR)
    pub fn is_vur(self) -> bool {
        matches!(
            self,
            PartialResult::LostForfeit | PartialResult::HalfBye | PartialResult::ZeroBye
        )
    }

    /// TRF 结果字符
    pub fn to_trf_char(self) -> char {
        match self {
            PartialResult::Unknown => 'X',
            PartialResult::Win => '1',
            PartialResult::Lost => '0',
            PartialResult::Draw => '=',
            PartialResult::WinForfeit => '+',
            PartialResult::LostForfeit => '-',
            PartialResult::WinUnrated => 'W',
            PartialResult::LostUnrated => 'L',
            PartialResult::DrawUnrated => 'D',
            PartialResult::HalfBye => 'H',
            PartialResult::FullBye => 'F',
            PartialResult::ZeroBye => 'Z',
            PartialResult::PairingBye => 'U',
        }
    }

    /// 解析 TRF 结果字符（未知字符返回 None）
    pub fn from_trf_char(c: char) -> Option<Self> {
        match c {
            '1' => Some(PartialResult::Win),
            '0' => Some(PartialResult::Lost),
            '=' => Some(PartialResult::Draw),
            '+' => Some(PartialResult::WinForfeit),
            '-' => Some(PartialResult::LostForfeit),
            'W' => Some(PartialResult::WinUnrated),
            'L' => Some(PartialResult::LostUnrated),
            'D' => Some(PartialResult::DrawUnrated),
            'H' => Some(PartialResult::HalfBye),
            'F' => Some(PartialResult::FullBye),
            'Z' => Some(PartialResult::ZeroBye),
            'U' => Some(PartialResult::PairingBye),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PartialResult::Unknown => "UNKNOWN",
            PartialResult::Win => "WIN",
            PartialResult::Lost => "LOST",
            PartialResult::Draw => "DRAW",
            PartialResult::WinForfeit => "WIN_FORFEIT",
            PartialResult::LostForfeit => "LOST_FORFEIT",
            PartialResult::WinUnrated => "WIN_UNRATED",
            PartialResult::LostUnrated => "LOST_UNRATED",
            PartialResult::DrawUnrated => "DRAW_UNRATED",
            PartialResult::HalfBye => "HALF_BYE",
            PartialResult::FullBye => "FULL_BYE",
            PartialResult::ZeroBye => "ZERO_BYE",
            PartialResult::PairingBye => "PAIRING_BYE",
        }
    }

    /// 从数据库字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        let upper = s.trim().to_uppercase();
        Self::ALL.iter().copied().find(|r| r.to_db_str() == upper)
    }
}

impl fmt::Display for PartialResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

/// (白方结果, 黑方结果)
pub type ResultPair = (PartialResult, PartialResult);

// ==========================================
// 合法结果白名单
// ==========================================
// 分组切片见 ResultGroup::results()
pub const VALID_RESULTS: [ResultPair; 19] = [
    // 常规
    (PartialResult::Win, PartialResult::Lost),
    (PartialResult::Lost, PartialResult::Win),
    (PartialResult::Draw, PartialResult::Draw),
    // 弃权
    (PartialResult::WinForfeit, PartialResult::LostForfeit),
    (PartialResult::LostForfeit, PartialResult::WinForfeit),
    (PartialResult::LostForfeit, PartialResult::LostForfeit),
    // 不计等级分
    (PartialResult::WinUnrated, PartialResult::LostUnrated),
    (PartialResult::DrawUnrated, PartialResult::DrawUnrated),
    (PartialResult::LostUnrated, PartialResult::WinUnrated),
    (PartialResult::DrawUnrated, PartialResult::LostUnrated),
    (PartialResult::LostUnrated, PartialResult::DrawUnrated),
    (PartialResult::LostUnrated, PartialResult::LostUnrated),
    // 其他
    (PartialResult::Draw, PartialResult::Lost),
    (PartialResult::Lost, PartialResult::Draw),
    (PartialResult::Lost, PartialResult::Lost),
    // 轮空（黑方恒为 Unknown）
    (PartialResult::HalfBye, PartialResult::Unknown),
    (PartialResult::FullBye, PartialResult::Unknown),
    (PartialResult::ZeroBye, PartialResult::Unknown),
    (PartialResult::PairingBye, PartialResult::Unknown),
];

/// 判断结果组合是否合法
pub fn is_valid_result(result: ResultPair) -> bool {
    VALID_RESULTS.contains(&result)
}

/// 结果组合的显示字符串，如 "1-0"、"½-½"、"+--"
pub fn result_string(result: ResultPair) -> String {
    let side = |r: PartialResult| match r {
        PartialResult::Win | PartialResult::WinUnrated => "1".to_string(),
        PartialResult::Lost | PartialResult::LostUnrated => "0".to_string(),
        PartialResult::Draw | PartialResult::DrawUnrated => "½".to_string(),
        PartialResult::WinForfeit => "+".to_string(),
        PartialResult::LostForfeit => "-".to_string(),
        PartialResult::Unknown => String::new(),
        bye => bye.to_trf_char().to_string(),
    };

    if result.0.is_bye() {
        return side(result.0);
    }
    if result.0 == PartialResult::Unknown && result.1 == PartialResult::Unknown {
        return String::new();
    }
    format!("{}-{}", side(result.0), side(result.1))
}

// ==========================================
// 结果分组 (录入菜单使用)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultGroup {
    Normal,
    Forfeit,
    Unrated,
    Other,
}

impl ResultGroup {
    /// 该分组包含的结果组合
    pub fn results(self) -> &'static [ResultPair] {
        match self {
            ResultGroup::Normal => &VALID_RESULTS[0..3],
            ResultGroup::Forfeit => &VALID_RESULTS[3..6],
            ResultGroup::Unrated => &VALID_RESULTS[6..12],
            ResultGroup::Other => &VALID_RESULTS[12..15],
        }
    }
}

// ==========================================
// 执色 (Color)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Color {
    White,
    Black,
    Unknown, // 轮空
}

impl Color {
    /// TRF 执色字符
    pub fn to_trf_char(self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
            Color::Unknown => '-',
        }
    }

    /// 解析 TRF 执色字符（大小写不敏感）
    pub fn from_trf_char(c: char) -> Self {
        match c.to_ascii_lowercase() {
            'w' => Color::White,
            'b' => Color::Black,
            _ => Color::Unknown,
        }
    }
}

// ==========================================
// 首轮执色 (Initial Color)
// ==========================================
// 1 号种子在第一轮的执色；存储为 0 / 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InitialColor {
    #[default]
    White,
    Black,
}

impl InitialColor {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            InitialColor::White => "0",
            InitialColor::Black => "1",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "0" => Some(InitialColor::White),
            "1" => Some(InitialColor::Black),
            _ => None,
        }
    }
}

impl fmt::Display for InitialColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitialColor::White => write!(f, "WHITE"),
            InitialColor::Black => write!(f, "BLACK"),
        }
    }
}

// ==========================================
// 棋手称号 (Title)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Title {
    #[default]
    None,
    GM,
    IM,
    FM,
    CM,
    WGM,
    WIM,
    WFM,
    WCM,
}

impl Title {
    /// 称号强度等级（数值越小越强）
    pub fn strength_level(self) -> u8 {
        match self {
            Title::GM => 0,
            Title::IM => 1,
            Title::WGM => 2,
            Title::FM => 3,
            Title::WIM => 4,
            Title::CM => 5,
            Title::WFM => 6,
            Title::WCM => 7,
            Title::None => 8,
        }
    }

    /// 称号字符串（无称号为空串）
    pub fn as_str(&self) -> &'static str {
        match self {
            Title::None => "",
            Title::GM => "GM",
            Title::IM => "IM",
            Title::FM => "FM",
            Title::CM => "CM",
            Title::WGM => "WGM",
            Title::WIM => "WIM",
            Title::WFM => "WFM",
            Title::WCM => "WCM",
        }
    }

    /// 解析称号（大小写不敏感，未知值视为无称号）
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "GM" => Title::GM,
            "IM" => Title::IM,
            "FM" => Title::FM,
            "CM" => Title::CM,
            "WGM" => Title::WGM,
            "WIM" => Title::WIM,
            "WFM" => Title::WFM,
            "WCM" => Title::WCM,
            _ => Title::None,
        }
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_table() {
        assert_eq!(PartialResult::Win.points(), 1.0);
        assert_eq!(PartialResult::PairingBye.points(), 1.0);
        assert_eq!(PartialResult::HalfBye.points(), 0.5);
        assert_eq!(PartialResult::DrawUnrated.points(), 0.5);
        assert_eq!(PartialResult::ZeroBye.points(), 0.0);
        assert_eq!(PartialResult::LostForfeit.points(), 0.0);
        assert_eq!(PartialResult::Unknown.points(), 0.0);
    }

    #[test]
    fn test_classification() {
        assert!(PartialResult::WinForfeit.is_unplayed());
        assert!(!PartialResult::WinForfeit.is_bye());
        assert!(PartialResult::PairingBye.is_bye());
        assert!(!PartialResult::PairingBye.is_requested_bye());
        assert!(PartialResult::ZeroBye.is_requested_bye());
        assert!(PartialResult::LostForfeit.is_vur());
        assert!(!PartialResult::FullBye.is_vur());
        assert!(!PartialResult::Draw.is_unplayed());
    }

    #[test]
    fn test_trf_chars() {
        for r in PartialResult::ALL.iter().skip(1) {
            assert_eq!(PartialResult::from_trf_char(r.to_trf_char()), Some(*r));
        }
        assert_eq!(PartialResult::Unknown.to_trf_char(), 'X');
        assert_eq!(PartialResult::from_trf_char('X'), None);
        assert_eq!(PartialResult::from_trf_char('?'), None);
    }

    #[test]
    fn test_db_str() {
        assert_eq!(PartialResult::from_str("pairing_bye"), Some(PartialResult::PairingBye));
        assert_eq!(PartialResult::from_str("nope"), None);
    }

    #[test]
    fn test_whitelist() {
        assert!(is_valid_result((PartialResult::Win, PartialResult::Lost)));
        assert!(is_valid_result((PartialResult::ZeroBye, PartialResult::Unknown)));
        assert!(!is_valid_result((PartialResult::Win, PartialResult::Win)));
        assert!(!is_valid_result((PartialResult::HalfBye, PartialResult::Lost)));
        assert_eq!(ResultGroup::Unrated.results().len(), 6);
        assert_eq!(
            ResultGroup::Other.results()[2],
            (PartialResult::Lost, PartialResult::Lost)
        );
    }

    #[test]
    fn test_result_string() {
        assert_eq!(result_string((PartialResult::Win, PartialResult::Lost)), "1-0");
        assert_eq!(result_string((PartialResult::Draw, PartialResult::Draw)), "½-½");
        assert_eq!(result_string((PartialResult::HalfBye, PartialResult::Unknown)), "H");
        assert_eq!(result_string((PartialResult::Unknown, PartialResult::Unknown)), "");
    }

    #[test]
    fn test_color_parse() {
        assert_eq!(Color::from_trf_char('W'), Color::White);
        assert_eq!(Color::from_trf_char('b'), Color::Black);
        assert_eq!(Color::from_trf_char('-'), Color::Unknown);
    }

    #[test]
    fn test_title_strength() {
        assert!(Title::GM.strength_level() < Title::IM.strength_level());
        assert!(Title::WGM.strength_level() < Title::FM.strength_level());
        assert!(Title::WCM.strength_level() < Title::None.strength_level());
        assert_eq!(Title::from_str("wgm"), Title::WGM);
        assert_eq!(Title::from_str(""), Title::None);
    }
}
