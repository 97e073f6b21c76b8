//! Resource model.
//!
//! Resources are the workers that receive time blocks: painters and the
//! shared carpenter. Each resource carries a cursor, the only mutable
//! scheduling state, which marks how far its calendar has been filled.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of worker a block or resource belongs to.
///
/// Closed set: sequencing rules (carpentry before painting) are expressed
/// against these variants rather than free-form labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Carpentry work; must finish before painting starts.
    Carpenter,
    /// Painting work.
    Painter,
}

impl ResourceKind {
    /// All kinds, in sequencing order.
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Carpenter, ResourceKind::Painter];

    /// Lowercase name used in storage and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Carpenter => "carpenter",
            ResourceKind::Painter => "painter",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "carpenter" => Ok(ResourceKind::Carpenter),
            "painter" => Ok(ResourceKind::Painter),
            other => Err(format!("unknown resource kind '{other}'")),
        }
    }
}

/// Position of a resource's calendar fill: day offset from the plan start
/// date plus minutes already used on that day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cursor {
    /// Days after the plan start date.
    pub day: u32,
    /// Minutes consumed on `day`, measured from the workday start.
    pub used_minutes: u32,
}

impl Cursor {
    /// Creates a cursor at the given position.
    pub fn new(day: u32, used_minutes: u32) -> Self {
        Self { day, used_minutes }
    }

    /// Start of the following day.
    pub fn next_day(self) -> Self {
        Self::new(self.day + 1, 0)
    }

    /// Start of the day `days` ahead. Zero leaves the cursor untouched.
    pub fn skip_days(self, days: u32) -> Self {
        if days == 0 {
            self
        } else {
            Self::new(self.day + days, 0)
        }
    }
}

/// A worker with a daily working-time budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource identifier (e.g. `PAINTER_1`).
    pub id: String,
    /// Worker kind.
    pub kind: ResourceKind,
    /// Current calendar fill position.
    pub cursor: Cursor,
}

impl Resource {
    /// Creates a resource with its cursor at the plan start.
    pub fn new(id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            cursor: Cursor::default(),
        }
    }

    /// Creates the `n`-th painter (1-based id suffix).
    pub fn painter(n: usize) -> Self {
        Self::new(format!("PAINTER_{n}"), ResourceKind::Painter)
    }

    /// Creates the shared carpenter.
    pub fn carpenter() -> Self {
        Self::new("CARPENTER", ResourceKind::Carpenter)
    }

    /// Label written onto plan blocks produced for this resource.
    pub fn block_label(&self) -> String {
        match self.kind {
            ResourceKind::Carpenter => "CARPENTER".to_string(),
            ResourceKind::Painter => format!("PAINTER ({})", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_and_display() {
        assert_eq!("Painter".parse::<ResourceKind>(), Ok(ResourceKind::Painter));
        assert_eq!(" carpenter ".parse::<ResourceKind>(), Ok(ResourceKind::Carpenter));
        assert!("cleaning".parse::<ResourceKind>().is_err());
        assert_eq!(ResourceKind::Painter.to_string(), "painter");
    }

    #[test]
    fn test_kind_serde() {
        let json = serde_json::to_string(&ResourceKind::Carpenter).unwrap();
        assert_eq!(json, "\"carpenter\"");
    }

    #[test]
    fn test_cursor_moves() {
        let c = Cursor::new(2, 120);
        assert_eq!(c.next_day(), Cursor::new(3, 0));
        assert_eq!(c.skip_days(0), c);
        assert_eq!(c.skip_days(3), Cursor::new(5, 0));
    }

    #[test]
    fn test_resource_builders() {
        let p = Resource::painter(3);
        assert_eq!(p.id, "PAINTER_3");
        assert_eq!(p.kind, ResourceKind::Painter);
        assert_eq!(p.cursor, Cursor::default());
        assert_eq!(p.block_label(), "PAINTER (PAINTER_3)");

        let c = Resource::carpenter();
        assert_eq!(c.kind, ResourceKind::Carpenter);
        assert_eq!(c.block_label(), "CARPENTER");
    }
}
