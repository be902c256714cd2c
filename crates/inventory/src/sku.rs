//! SKU composition rules.
//!
//! A SKU is a part number optionally followed by a finish code, joined with `-`
//! (e.g. `HB-100-BL`). Only a fixed set of finish codes is recognized; anything
//! else stays part of the part number.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use forgedesk_core::DomainError;

/// Recognized finish codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Finish {
    #[serde(rename = "BL")]
    Bl,
    #[serde(rename = "C2")]
    C2,
    #[serde(rename = "DB")]
    Db,
    #[serde(rename = "0R")]
    ZeroR,
}

impl Finish {
    pub const ALL: [Finish; 4] = [Finish::Bl, Finish::C2, Finish::Db, Finish::ZeroR];

    pub fn code(&self) -> &'static str {
        match self {
            Finish::Bl => "BL",
            Finish::C2 => "C2",
            Finish::Db => "DB",
            Finish::ZeroR => "0R",
        }
    }

    /// Lenient lookup: trims and upper-cases, unknown codes yield `None`.
    pub fn normalize(raw: Option<&str>) -> Option<Finish> {
        let raw = raw?.trim().to_ascii_uppercase();
        Finish::ALL.into_iter().find(|f| f.code() == raw)
    }
}

impl fmt::Display for Finish {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Finish {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Finish::normalize(Some(s))
            .ok_or_else(|| DomainError::validation(format!("unknown finish code '{s}'")))
    }
}

/// A SKU split into its components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSku {
    pub part_number: String,
    pub finish: Option<Finish>,
}

/// Build a SKU from a part number and optional finish. Blank segments are dropped.
pub fn compose_sku(part_number: &str, finish: Option<Finish>) -> String {
    let part = part_number.trim();
    match finish {
        Some(finish) if part.is_empty() => finish.code().to_string(),
        Some(finish) => format!("{part}-{}", finish.code()),
        None => part.to_string(),
    }
}

/// Split a SKU into part number and finish.
///
/// Repeated dashes collapse. The trailing segment is treated as a finish only when
/// it is a recognized code and at least one other segment precedes it.
pub fn parse_sku(sku: &str) -> ParsedSku {
    let mut segments: Vec<&str> = sku.trim().split('-').filter(|s| !s.is_empty()).collect();

    let mut finish = None;
    if segments.len() > 1 {
        if let Some(last) = segments.last().and_then(|s| Finish::normalize(Some(s))) {
            finish = Some(last);
            segments.pop();
        }
    }

    ParsedSku {
        part_number: segments.join("-"),
        finish,
    }
}
