/// Positional narrowing of a match sequence.
///
/// Positions are 1-based and counted over matches in document order, after
/// every other filter applied. Out-of-range positions select nothing.
use crate::ooxml::error::{OoxmlError, Result};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawOccurrence")]
pub enum Occurrence {
    /// The Nth match; `0` matches nothing
    Nth(usize),
    Last,
    /// Union of positions
    Positions(Vec<usize>),
    /// Inclusive range, either side open
    Range {
        from: Option<usize>,
        to: Option<usize>,
    },
}

impl Occurrence {
    pub const FIRST: Occurrence = Occurrence::Nth(1);

    /// 0-based indices into a match sequence of length `len`, ascending.
    pub fn resolve(&self, len: usize) -> Vec<usize> {
        match self {
            Occurrence::Nth(n) => {
                if *n >= 1 && *n <= len {
                    vec![n - 1]
                } else {
                    Vec::new()
                }
            },
            Occurrence::Last => len.checked_sub(1).into_iter().collect(),
            Occurrence::Positions(positions) => {
                let mut out: Vec<usize> = positions
                    .iter()
                    .filter(|&&p| p >= 1 && p <= len)
                    .map(|p| p - 1)
                    .collect();
                out.sort_unstable();
                out.dedup();
                out
            },
            Occurrence::Range { from, to } => {
                let lo = from.unwrap_or(1).max(1);
                let hi = to.unwrap_or(len).min(len);
                (lo..=hi).map(|p| p - 1).collect()
            },
        }
    }

    fn from_int(n: i64) -> Self {
        if n < 0 {
            Occurrence::Last
        } else {
            Occurrence::Nth(n as usize)
        }
    }
}

impl FromStr for Occurrence {
    type Err = OoxmlError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s {
            "first()" => return Ok(Occurrence::FIRST),
            "last()" => return Ok(Occurrence::Last),
            _ => {},
        }
        let invalid = || OoxmlError::InvalidSelector(format!("invalid occurrence '{s}'"));

        let Some((from, to)) = s.split_once("..") else {
            return s.parse::<i64>().map(Occurrence::from_int).map_err(|_| invalid());
        };
        // An empty or zero bound leaves that side open
        let bound = |b: &str| -> Result<Option<usize>> {
            let b = b.trim();
            if b.is_empty() {
                return Ok(None);
            }
            let n = b.parse::<usize>().map_err(|_| invalid())?;
            Ok((n != 0).then_some(n))
        };
        let (from, to) = (bound(from)?, bound(to)?);
        if from.is_none() && to.is_none() {
            return Err(invalid());
        }
        Ok(Occurrence::Range { from, to })
    }
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Occurrence::Nth(n) => write!(f, "{n}"),
            Occurrence::Last => f.write_str("last()"),
            Occurrence::Positions(positions) => {
                let parts: Vec<String> = positions.iter().map(|p| format!("position() = {p}")).collect();
                f.write_str(&parts.join(" or "))
            },
            Occurrence::Range { from, to } => match (from, to) {
                (Some(a), Some(b)) => write!(f, "position() >= {a} and position() <= {b}"),
                (Some(a), None) => write!(f, "position() >= {a}"),
                (None, Some(b)) => write!(f, "position() <= {b}"),
                (None, None) => f.write_str("true()"),
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOccurrence {
    Int(i64),
    List(Vec<i64>),
    Text(String),
}

impl TryFrom<RawOccurrence> for Occurrence {
    type Error = String;

    fn try_from(raw: RawOccurrence) -> std::result::Result<Self, String> {
        match raw {
            RawOccurrence::Int(n) => Ok(Occurrence::from_int(n)),
            RawOccurrence::List(list) => Ok(Occurrence::Positions(
                list.into_iter()
                    .filter(|&n| n > 0)
                    .map(|n| n as usize)
                    .collect(),
            )),
            RawOccurrence::Text(s) => s.parse().map_err(|e: OoxmlError| e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_over_six() {
        let occ: Occurrence = "2..4".parse().unwrap();
        assert_eq!(occ.resolve(6), [1, 2, 3]);
    }

    #[test]
    fn test_open_ranges() {
        assert_eq!("4..".parse::<Occurrence>().unwrap().resolve(6), [3, 4, 5]);
        assert_eq!("..2".parse::<Occurrence>().unwrap().resolve(6), [0, 1]);
        assert_eq!("0..2".parse::<Occurrence>().unwrap().resolve(6), [0, 1]);
        assert_eq!("5..9".parse::<Occurrence>().unwrap().resolve(6), [4, 5]);
        assert!("..".parse::<Occurrence>().is_err());
        assert!("a..b".parse::<Occurrence>().is_err());
    }

    #[test]
    fn test_first_last_and_out_of_range() {
        assert_eq!("first()".parse::<Occurrence>().unwrap().resolve(6), [0]);
        assert_eq!("last()".parse::<Occurrence>().unwrap().resolve(6), [5]);
        assert_eq!(Occurrence::from_int(-1).resolve(6), [5]);
        assert!(Occurrence::Nth(0).resolve(6).is_empty());
        assert!(Occurrence::Nth(10).resolve(6).is_empty());
        assert!(Occurrence::Last.resolve(0).is_empty());
    }

    #[test]
    fn test_positions_union_in_document_order() {
        let occ = Occurrence::Positions(vec![5, 2, 5, 9]);
        assert_eq!(occ.resolve(6), [1, 4]);
    }

    #[test]
    fn test_deserialize_forms() {
        let n: Occurrence = serde_saphyr::from_str("3").unwrap();
        assert_eq!(n, Occurrence::Nth(3));
        let list: Occurrence = serde_saphyr::from_str("[1, 3]").unwrap();
        assert_eq!(list, Occurrence::Positions(vec![1, 3]));
        let range: Occurrence = serde_saphyr::from_str("\"2..\"").unwrap();
        assert_eq!(range, Occurrence::Range { from: Some(2), to: None });
        let last: Occurrence = serde_saphyr::from_str("last()").unwrap();
        assert_eq!(last, Occurrence::Last);
    }
}
