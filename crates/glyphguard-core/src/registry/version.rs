//! Dotted version strings as plugin headers write them.
//!
//! Versions are split into numeric and named parts (`4.0.0-rc2` becomes
//! `4 . 0 . 0 . rc . 2`). Named parts rank `dev < alpha < beta < rc`, all below a
//! number, with `pl` (patch level) above a number. Unknown names rank lowest.
//! When one version runs out of parts, the other is greater if its next part is
//! a number or `pl`, and smaller otherwise, so `4.0 < 4.0.0` but
//! `4.0.0-rc1 < 4.0.0`.

use crate::error::{GlyphError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Number(u64),
    Named(u8),
}

// Rank a number holds when compared against a named part.
const NUMBER_RANK: u8 = 5;

impl Part {
    fn rank(&self) -> u8 {
        match self {
            Part::Number(_) => NUMBER_RANK,
            Part::Named(rank) => *rank,
        }
    }

    fn named(word: &str) -> Self {
        let rank = match word.to_ascii_lowercase().as_str() {
            "dev" => 1,
            "alpha" | "a" => 2,
            "beta" | "b" => 3,
            "rc" => 4,
            "pl" | "p" => 6,
            _ => 0,
        };
        Part::Named(rank)
    }

    fn cmp_part(&self, other: &Part) -> Ordering {
        match (self, other) {
            (Part::Number(a), Part::Number(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// A parsed dotted version.
#[derive(Debug, Clone)]
pub struct DottedVersion {
    raw: String,
    parts: Vec<Part>,
}

impl DottedVersion {
    /// Parse a version string such as `4.0.0`, `4.0.0-rc2` or `5.1`.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(GlyphError::InvalidVersion {
                version: raw.to_string(),
            });
        }

        let mut parts = Vec::new();
        for segment in trimmed.split(|c: char| matches!(c, '.' | '-' | '_' | '+')) {
            if segment.is_empty() {
                continue;
            }
            split_alnum(segment, &mut parts).ok_or_else(|| GlyphError::InvalidVersion {
                version: raw.to_string(),
            })?;
        }

        if !matches!(parts.first(), Some(Part::Number(_))) {
            return Err(GlyphError::InvalidVersion {
                version: raw.to_string(),
            });
        }

        Ok(Self {
            raw: trimmed.to_string(),
            parts,
        })
    }

    /// The version as it was written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Split `0rc2` into `0`, `rc`, `2`. Returns `None` on characters that are
/// neither ASCII digits nor letters.
fn split_alnum(segment: &str, parts: &mut Vec<Part>) -> Option<()> {
    let mut chars = segment.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        let digit = c.is_ascii_digit();
        if !digit && !c.is_ascii_alphabetic() {
            return None;
        }
        let mut end = start + c.len_utf8();
        while let Some(&(idx, next)) = chars.peek() {
            if next.is_ascii_digit() != digit || !next.is_ascii_alphanumeric() {
                break;
            }
            end = idx + next.len_utf8();
            chars.next();
        }
        let token = &segment[start..end];
        if digit {
            parts.push(Part::Number(token.parse().ok()?));
        } else {
            parts.push(Part::named(token));
        }
    }
    Some(())
}

impl Ord for DottedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.parts.iter().zip(other.parts.iter()) {
            match a.cmp_part(b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }

        let shared = self.parts.len().min(other.parts.len());
        match (self.parts.get(shared), other.parts.get(shared)) {
            (None, None) => Ordering::Equal,
            (Some(next), None) => trailing_part_order(next),
            (None, Some(next)) => trailing_part_order(next).reverse(),
            (Some(_), Some(_)) => Ordering::Equal,
        }
    }
}

/// Order of the longer version relative to the shorter one, given the first
/// part the shorter one lacks.
fn trailing_part_order(next: &Part) -> Ordering {
    if next.rank() >= NUMBER_RANK {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}

impl PartialOrd for DottedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for DottedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DottedVersion {}

impl FromStr for DottedVersion {
    type Err = GlyphError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DottedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for DottedVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for DottedVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DottedVersion::parse(&raw).map_err(serde::de::Error::custom)
    }
}
