// ==========================================
// 国际象棋赛事管理引擎 - FIDE 等级分名单行解析
// ==========================================
// 格式: FIDE 综合名单 players_list_foa.txt（定宽，首行为表头）
//   0  ID(15)   15 Name(61)  76 Fed(3)  80 Sex  84 Tit(4)
//   94 OTit(15) 113 SRtng(4) 123 SK(2)  126 RRtng(4) 136 RK(2)
//   139 BRtng(4) 149 BK(2)   152 B-day(4)
// ==========================================

use crate::domain::RatedPlayer;
use crate::ratinglist::error::{RatingListError, RatingListResult};
use crate::trf::slice_chars;
use serde_json::{json, Map, Value};

/// 至少覆盖到出生年份列
pub const MIN_LINE_LEN: usize = 156;

fn field(line: &str, start: usize, len: usize) -> String {
    slice_chars(line, start, len).trim().to_string()
}

/// 空白视为 0
fn number(line: &str, name: &'static str, start: usize, len: usize) -> RatingListResult<u32> {
    let text = field(line, start, len);
    if text.is_empty() {
        return Ok(0);
    }
    text.parse().map_err(|_| RatingListError::InvalidField { field: name, value: text })
}

/// 解析一行名单记录
pub fn parse_fide_line(line: &str) -> RatingListResult<RatedPlayer> {
    let len = line.chars().count();
    if len < MIN_LINE_LEN {
        return Err(RatingListError::ShortLine(len));
    }

    let id_text = field(line, 0, 15);
    let fide_id: u64 = id_text
        .parse()
        .ok()
        .filter(|id| *id > 0)
        .ok_or(RatingListError::InvalidField {
            field: "id",
            value: id_text,
        })?;

    let standard = number(line, "standard", 113, 4)?;
    let sk = number(line, "sk", 123, 2)?;
    let rapid = number(line, "rapid", 126, 4)?;
    let rk = number(line, "rk", 136, 2)?;
    let blitz = number(line, "blitz", 139, 4)?;
    let bk = number(line, "bk", 149, 2)?;
    let birth_year = Some(number(line, "birth_year", 152, 4)?).filter(|y| *y > 0);

    let mut extra = Map::new();
    for (key, k) in [("sk", sk), ("rk", rk), ("bk", bk)] {
        if k != 0 {
            extra.insert(key.to_string(), json!(k));
        }
    }
    let other_titles: Vec<String> = field(line, 94, 15)
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if !other_titles.is_empty() {
        extra.insert("other_titles".to_string(), json!(other_titles));
    }

    Ok(RatedPlayer {
        fide_id,
        name: field(line, 15, 61),
        federation: field(line, 76, 3),
        sex: field(line, 80, 3),
        title: field(line, 84, 4),
        birth_year,
        standard,
        rapid,
        blitz,
        extra: if extra.is_empty() {
            Value::Null
        } else {
            Value::Object(extra)
        },
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 按列写出一行名单
    pub(crate) fn fide_line(fields: &[(usize, &str)]) -> String {
        let mut chars = vec![' '; 162];
        for (start, text) in fields {
            for (i, c) in text.chars().enumerate() {
                chars[start + i] = c;
            }
        }
        chars.into_iter().collect()
    }

    #[test]
    fn test_parse_full_line() {
        let line = fide_line(&[
            (0, "1503014"),
            (15, "Carlsen, Magnus"),
            (76, "NOR"),
            (80, "M"),
            (84, "GM"),
            (94, "FT, IA"),
            (113, "2830"),
            (123, "10"),
            (126, "2820"),
            (136, "20"),
            (139, "2880"),
            (149, "10"),
            (152, "1990"),
        ]);

        let p = parse_fide_line(&line).unwrap();
        assert_eq!(p.fide_id, 1503014);
        assert_eq!(p.name, "Carlsen, Magnus");
        assert_eq!(p.federation, "NOR");
        assert_eq!(p.sex, "M");
        assert_eq!(p.title, "GM");
        assert_eq!((p.standard, p.rapid, p.blitz), (2830, 2820, 2880));
        assert_eq!(p.birth_year, Some(1990));
        assert_eq!(
            p.extra,
            json!({"sk": 10, "rk": 20, "bk": 10, "other_titles": ["FT", "IA"]})
        );
    }

    #[test]
    fn test_blank_ratings_are_zero() {
        let line = fide_line(&[(0, "34567890"), (15, "Newcomer, Ann"), (76, "ESP"), (80, "F")]);
        let p = parse_fide_line(&line).unwrap();
        assert_eq!((p.standard, p.rapid, p.blitz), (0, 0, 0));
        assert_eq!(p.birth_year, None);
        assert!(p.extra.is_null());
    }

    #[test]
    fn test_invalid_lines() {
        assert!(matches!(
            parse_fide_line("too short"),
            Err(RatingListError::ShortLine(9))
        ));

        let bad_id = fide_line(&[(0, "abc"), (15, "X, Y")]);
        assert!(matches!(
            parse_fide_line(&bad_id),
            Err(RatingListError::InvalidField { field: "id", .. })
        ));

        let bad_rating = fide_line(&[(0, "12"), (15, "X, Y"), (113, "2a00")]);
        assert!(matches!(
            parse_fide_line(&bad_rating),
            Err(RatingListError::InvalidField { field: "standard", .. })
        ));
    }
}
