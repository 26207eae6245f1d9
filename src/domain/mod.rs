// ==========================================
// 国际象棋赛事管理引擎 - 领域模型层
// ==========================================
// 红线: 领域模型只承载数据与分类辅助，不含流程逻辑
// ==========================================

pub mod pairing;
pub mod player;
pub mod rated_player;
pub mod round;
pub mod standing;
pub mod types;

pub use pairing::Pairing;
pub use player::{Player, PlayerId};
pub use rated_player::{RatedPlayer, RatingListInfo};
pub use round::Round;
pub use standing::Standing;
pub use types::{Color, InitialColor, PartialResult, ResultGroup, ResultPair, Title, VALID_RESULTS};
