// Primary playing position, derived from roster strings like "DF,MF".

use std::fmt;

/// Position buckets in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Position {
    GK,
    DF,
    MF,
    FW,
    Other,
}

impl Position {
    /// First segment of a `,`- or `/`-separated position list.
    pub fn primary(raw: &str) -> Self {
        let first = raw.split(|c: char| c == ',' || c == '/').next().unwrap_or("");
        Self::from_code(first).unwrap_or(Position::Other)
    }

    /// A single two-letter code, case-insensitive. `None` for anything else.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "GK" => Some(Position::GK),
            "DF" => Some(Position::DF),
            "MF" => Some(Position::MF),
            "FW" => Some(Position::FW),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::GK => "GK",
            Position::DF => "DF",
            Position::MF => "MF",
            Position::FW => "FW",
            Position::Other => "Other",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
