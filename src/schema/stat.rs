use serde::{Deserialize, Serialize};
use std::fmt;

/// A numeric variable tracked on the game state.
///
/// The first five are the core status variables shown on every run; the
/// last three are location skills, only one of which matters per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stat {
    /// Safety.
    S,
    /// Resources.
    R,
    /// Mobility.
    M,
    /// Social capital.
    SC,
    /// High-risk exposure, accumulated hazards.
    HR,
    /// Surge awareness (coastal skill).
    SA,
    /// Flood management (river skill).
    FM,
    /// Landslide awareness (hill skill).
    LA,
}

impl Stat {
    pub const ALL: [Stat; 8] = [
        Stat::S,
        Stat::R,
        Stat::M,
        Stat::SC,
        Stat::HR,
        Stat::SA,
        Stat::FM,
        Stat::LA,
    ];

    /// The status variables bounded by `system.variables`.
    pub const VARIABLES: [Stat; 5] = [Stat::S, Stat::R, Stat::M, Stat::SC, Stat::HR];

    /// The skill variables bounded by `system.skills`.
    pub const SKILLS: [Stat; 3] = [Stat::SA, Stat::FM, Stat::LA];

    /// The symbol used for this stat in content (delta keys, conditions, text).
    pub fn key(&self) -> &'static str {
        match self {
            Self::S => "S",
            Self::R => "R",
            Self::M => "M",
            Self::SC => "SC",
            Self::HR => "HR",
            Self::SA => "SA",
            Self::FM => "FM",
            Self::LA => "LA",
        }
    }

    /// Look up a stat by its content symbol. Case-sensitive.
    pub fn from_key(key: &str) -> Option<Stat> {
        Self::ALL.iter().copied().find(|s| s.key() == key)
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::S => "Safety",
            Self::R => "Resources",
            Self::M => "Mobility",
            Self::SC => "Social Capital",
            Self::HR => "High Risk",
            Self::SA => "Surge Awareness",
            Self::FM => "Flood Management",
            Self::LA => "Landslide Awareness",
        }
    }

    pub fn is_skill(&self) -> bool {
        Self::SKILLS.contains(self)
    }

    /// The skill that applies to a given location, if that location has one.
    pub fn skill_for_location(location: &str) -> Option<Stat> {
        match location {
            "Coastal" => Some(Self::SA),
            "River" => Some(Self::FM),
            "Hill" => Some(Self::LA),
            _ => None,
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.key())
    }
}

/// Authored inclusive range for a stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatBounds {
    pub min: i32,
    pub max: i32,
}

impl StatBounds {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: i32) -> i32 {
        value.max(self.min).min(self.max)
    }

    pub fn contains(&self, value: i32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Current values of every stat.
///
/// Serializes as a flat map keyed by stat symbol so snapshots read the same
/// as authored content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stats {
    #[serde(rename = "S")]
    s: i32,
    #[serde(rename = "R")]
    r: i32,
    #[serde(rename = "M")]
    m: i32,
    #[serde(rename = "SC")]
    sc: i32,
    #[serde(rename = "HR")]
    hr: i32,
    #[serde(rename = "SA")]
    sa: i32,
    #[serde(rename = "FM")]
    fm: i32,
    #[serde(rename = "LA")]
    la: i32,
}

impl Stats {
    pub fn get(&self, stat: Stat) -> i32 {
        match stat {
            Stat::S => self.s,
            Stat::R => self.r,
            Stat::M => self.m,
            Stat::SC => self.sc,
            Stat::HR => self.hr,
            Stat::SA => self.sa,
            Stat::FM => self.fm,
            Stat::LA => self.la,
        }
    }

    pub fn set(&mut self, stat: Stat, value: i32) {
        let slot = match stat {
            Stat::S => &mut self.s,
            Stat::R => &mut self.r,
            Stat::M => &mut self.m,
            Stat::SC => &mut self.sc,
            Stat::HR => &mut self.hr,
            Stat::SA => &mut self.sa,
            Stat::FM => &mut self.fm,
            Stat::LA => &mut self.la,
        };
        *slot = value;
    }

    /// Iterate `(stat, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Stat, i32)> + '_ {
        Stat::ALL.iter().map(move |s| (*s, self.get(*s)))
    }
}

/// Bounds for every stat, indexed by [`Stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundsTable {
    bounds: [StatBounds; 8],
}

impl BoundsTable {
    pub fn uniform(bounds: StatBounds) -> Self {
        Self { bounds: [bounds; 8] }
    }

    pub fn get(&self, stat: Stat) -> StatBounds {
        self.bounds[stat.index()]
    }

    pub fn set(&mut self, stat: Stat, bounds: StatBounds) {
        self.bounds[stat.index()] = bounds;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_round_trip_for_every_stat() {
        for stat in Stat::ALL {
            assert_eq!(Stat::from_key(stat.key()), Some(stat));
        }
        assert_eq!(Stat::from_key("sc"), None);
        assert_eq!(Stat::from_key("flags"), None);
    }

    #[test]
    fn bounds_clamp() {
        let b = StatBounds::new(0, 10);
        assert_eq!(b.clamp(-2), 0);
        assert_eq!(b.clamp(4), 4);
        assert_eq!(b.clamp(11), 10);
        assert!(b.contains(0));
        assert!(!b.contains(11));
    }

    #[test]
    fn stats_get_set() {
        let mut stats = Stats::default();
        stats.set(Stat::SC, 7);
        stats.set(Stat::LA, -1);
        assert_eq!(stats.get(Stat::SC), 7);
        assert_eq!(stats.get(Stat::LA), -1);
        assert_eq!(stats.get(Stat::S), 0);
    }

    #[test]
    fn stats_serialize_with_content_symbols() {
        let mut stats = Stats::default();
        stats.set(Stat::HR, 2);
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["HR"], 2);
        assert_eq!(json["SA"], 0);
    }

    #[test]
    fn location_skill_mapping() {
        assert_eq!(Stat::skill_for_location("Coastal"), Some(Stat::SA));
        assert_eq!(Stat::skill_for_location("River"), Some(Stat::FM));
        assert_eq!(Stat::skill_for_location("Hill"), Some(Stat::LA));
        assert_eq!(Stat::skill_for_location("Desert"), None);
        assert!(Stat::LA.is_skill());
        assert!(!Stat::HR.is_skill());
    }

    #[test]
    fn bounds_table_indexing() {
        let mut table = BoundsTable::uniform(StatBounds::new(0, 5));
        table.set(Stat::R, StatBounds::new(-3, 3));
        assert_eq!(table.get(Stat::R), StatBounds::new(-3, 3));
        assert_eq!(table.get(Stat::M), StatBounds::new(0, 5));
    }
}
