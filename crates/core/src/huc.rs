//! USGS Hydrologic Unit Codes.
//!
//! Codes arrive from feature services in inconsistent shapes: numeric
//! attributes that lost their leading zero, floats exported as `"20700.0"`,
//! dashed or spaced strings. [`normalize_huc`] turns those into a
//! validated [`HucCode`] of a known [`HucLevel`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Hydrologic unit granularity, by digit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HucLevel {
    Huc2,
    Huc4,
    Huc6,
    Huc8,
    Huc10,
    Huc12,
}

impl HucLevel {
    pub const ALL: [HucLevel; 6] = [
        HucLevel::Huc2,
        HucLevel::Huc4,
        HucLevel::Huc6,
        HucLevel::Huc8,
        HucLevel::Huc10,
        HucLevel::Huc12,
    ];

    pub fn digits(self) -> usize {
        match self {
            HucLevel::Huc2 => 2,
            HucLevel::Huc4 => 4,
            HucLevel::Huc6 => 6,
            HucLevel::Huc8 => 8,
            HucLevel::Huc10 => 10,
            HucLevel::Huc12 => 12,
        }
    }

    pub fn from_digits(digits: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.digits() == digits)
    }

    /// Lowercase attribute name, e.g. `huc10`.
    pub fn field_name(self) -> String {
        format!("huc{}", self.digits())
    }

    /// Attribute field names to try, most likely first.
    ///
    /// Covers the spellings seen across WBD MapServer layers, Geoconnex
    /// collections and hand-built shapefiles.
    pub fn field_candidates(self) -> Vec<String> {
        let d = self.digits();
        let mut fields = vec![
            format!("huc{d}"),
            format!("HUC{d}"),
            format!("HUC_{d}"),
            format!("huc_{d}"),
        ];
        if d < 10 {
            fields.push(format!("huc0{d}"));
            fields.push(format!("HUC0{d}"));
        }
        fields
    }
}

impl fmt::Display for HucLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HUC{}", self.digits())
    }
}

impl FromStr for HucLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let rest = lower
            .strip_prefix("huc")
            .or_else(|| lower.strip_prefix("hu"))
            .unwrap_or(&lower)
            .trim_start_matches('_');
        rest.parse::<usize>()
            .ok()
            .filter(|_| rest.chars().all(|c| c.is_ascii_digit()))
            .and_then(Self::from_digits)
            .ok_or_else(|| Error::UnknownHucLevel(s.to_string()))
    }
}

/// A validated hydrologic unit code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HucCode(String);

impl HucCode {
    /// Parse a code that must normalise to `level`.
    pub fn parse(raw: &str, level: HucLevel) -> Result<Self> {
        normalize_huc(raw, level).ok_or_else(|| Error::InvalidHuc {
            raw: raw.to_string(),
            level: level.digits() as u8,
        })
    }

    pub fn level(&self) -> HucLevel {
        // Construction guarantees a valid digit count.
        HucLevel::from_digits(self.0.len()).unwrap_or(HucLevel::Huc2)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The enclosing unit at a coarser level. Returns `None` when `level`
    /// is finer than this code.
    pub fn truncate(&self, level: HucLevel) -> Option<HucCode> {
        (level.digits() <= self.0.len()).then(|| HucCode(self.0[..level.digits()].to_string()))
    }

    /// Whether this unit lies within `parent` (or is `parent`).
    pub fn is_within(&self, parent: &HucCode) -> bool {
        self.0.starts_with(parent.as_str())
    }
}

impl fmt::Display for HucCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HucCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<HucCode> for String {
    fn from(code: HucCode) -> Self {
        code.0
    }
}

impl TryFrom<String> for HucCode {
    type Error = Error;

    /// The level is taken from the cleaned digit count; no padding or
    /// truncation is applied.
    fn try_from(raw: String) -> Result<Self> {
        let digits = clean_digits(&raw).unwrap_or_default();
        match HucLevel::from_digits(digits.len()) {
            Some(_) => Ok(HucCode(digits)),
            None => Err(Error::InvalidHuc {
                level: digits.len() as u8,
                raw,
            }),
        }
    }
}

/// Normalise a raw attribute value to a code of `level`.
///
/// Accepted forms, in order of processing:
/// - surrounding whitespace, trailing `.0`/`.00` float artefacts;
/// - `-`, `_` and space separators inside the code;
/// - codes one or two digits short, left-padded with zeros;
/// - codes longer than the level, truncated to the level prefix.
///
/// Anything containing other characters is rejected.
pub fn normalize_huc(raw: &str, level: HucLevel) -> Option<HucCode> {
    let digits = clean_digits(raw)?;
    let want = level.digits();
    let code = match digits.len() {
        n if n == want => digits,
        n if n > want => digits[..want].to_string(),
        n if n + 2 >= want => format!("{digits:0>want$}"),
        _ => return None,
    };
    Some(HucCode(code))
}

/// Strip whitespace, a zero fraction and separators; `None` unless only
/// digits remain.
fn clean_digits(raw: &str) -> Option<String> {
    let mut s = raw.trim();
    if let Some((int, frac)) = s.split_once('.') {
        if frac.is_empty() || frac.chars().any(|c| c != '0') {
            return None;
        }
        s = int;
    }

    let digits: String = s.chars().filter(|c| !matches!(c, '-' | '_' | ' ')).collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(digits)
}

/// [`normalize_huc`] for JSON attribute values (string or number).
pub fn normalize_huc_value(value: &Value, level: HucLevel) -> Option<HucCode> {
    match value {
        Value::String(s) => normalize_huc(s, level),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                normalize_huc(&u.to_string(), level)
            } else {
                let f = n.as_f64()?;
                (f.fract() == 0.0 && f >= 0.0)
                    .then(|| normalize_huc(&format!("{f:.0}"), level))
                    .flatten()
            }
        }
        _ => None,
    }
}

fn squash(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Pick the attribute holding the code for `level`.
///
/// Exact candidate names win, then case-insensitive candidates, then any
/// key that reads as `huc<digits>` once punctuation and case are dropped
/// (`WBD_HUC10`, `Huc10Code`). Keys naming a different level never match.
pub fn detect_huc_field<'a, I>(keys: I, level: HucLevel) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let keys: Vec<&str> = keys.into_iter().collect();
    let candidates = level.field_candidates();

    if let Some(k) = candidates.iter().find(|c| keys.contains(&c.as_str())) {
        return Some(k.clone());
    }

    if let Some(k) = keys
        .iter()
        .find(|k| candidates.iter().any(|c| c.eq_ignore_ascii_case(k)))
    {
        return Some(k.to_string());
    }

    let needle = format!("huc{}", level.digits());
    let padded = format!("huc0{}", level.digits());
    keys.iter()
        .find(|k| {
            let sq = squash(k);
            [&needle, &padded].iter().any(|n| {
                sq.match_indices(n.as_str()).any(|(i, _)| {
                    !sq[i + n.len()..].starts_with(|c: char| c.is_ascii_digit())
                })
            })
        })
        .map(|k| k.to_string())
}

/// Every coarser code of a HUC12, HUC2 first.
pub fn derive_levels(huc12: &HucCode) -> Vec<HucCode> {
    HucLevel::ALL
        .iter()
        .filter_map(|l| huc12.truncate(*l))
        .collect()
}
