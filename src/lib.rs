// ==========================================
// 国际象棋赛事管理引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite (rusqlite) + tokio
// 系统定位: 瑞士制赛事裁判管理（编排交由外部程序 bbpPairings）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 赛事规则
pub mod engine;

// TRF 编解码
pub mod trf;

// 赛事文件（多赛事容器）
pub mod event;

// 等级分名单（FIDE 名单导入与检索）
pub mod ratinglist;

// 配置层
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    Color, InitialColor, Pairing, PartialResult, Player, PlayerId, RatedPlayer, RatingListInfo,
    ResultGroup, ResultPair, Round, Standing, Title,
};

// 引擎
pub use engine::{
    BbpPairingEngine, InitialColorChoice, PairRoundOptions, PairingEngine, Tiebreak, Tournament,
    TournamentError, TournamentResult, TournamentState,
};

pub use event::Event;
pub use ratinglist::{RatingListError, RatingListResult};
pub use repository::RatingListRepository;
pub use trf::TrfOptions;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "chess-arbiter";
