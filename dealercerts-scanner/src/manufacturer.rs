use serde::{Deserialize, Serialize};
use std::fmt;

/// Manufacturers whose dealer networks are tracked, plus a catch-all bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Manufacturer {
    Acura,
    Honda,
    Hyundai,
    Lexus,
    Nissan,
    Subaru,
    Toyota,
    Volkswagen,
    Unclassified,
}

/// Substring that marks a hostname as belonging to a manufacturer.
#[derive(Debug, Clone, Copy)]
pub struct MakePattern {
    pub needle: &'static str,
    pub make: Manufacturer,
    /// Legacy spellings are bucketed separately and merged into `make` afterwards.
    pub alias: bool,
}

const fn pattern(needle: &'static str, make: Manufacturer) -> MakePattern {
    MakePattern {
        needle,
        make,
        alias: false,
    }
}

pub const MAKE_PATTERNS: [MakePattern; 9] = [
    pattern("acura", Manufacturer::Acura),
    pattern("honda", Manufacturer::Honda),
    pattern("hyundai", Manufacturer::Hyundai),
    pattern("lexus", Manufacturer::Lexus),
    pattern("nissan", Manufacturer::Nissan),
    pattern("subaru", Manufacturer::Subaru),
    pattern("toyota", Manufacturer::Toyota),
    pattern("volkswagen", Manufacturer::Volkswagen),
    MakePattern {
        needle: "vw",
        make: Manufacturer::Volkswagen,
        alias: true,
    },
];

impl Manufacturer {
    pub const ALL: [Manufacturer; 9] = [
        Manufacturer::Acura,
        Manufacturer::Honda,
        Manufacturer::Hyundai,
        Manufacturer::Lexus,
        Manufacturer::Nissan,
        Manufacturer::Subaru,
        Manufacturer::Toyota,
        Manufacturer::Volkswagen,
        Manufacturer::Unclassified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Manufacturer::Acura => "acura",
            Manufacturer::Honda => "honda",
            Manufacturer::Hyundai => "hyundai",
            Manufacturer::Lexus => "lexus",
            Manufacturer::Nissan => "nissan",
            Manufacturer::Subaru => "subaru",
            Manufacturer::Toyota => "toyota",
            Manufacturer::Volkswagen => "volkswagen",
            Manufacturer::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for Manufacturer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All patterns whose substring appears in `name`, case-insensitively.
pub fn matching_patterns(name: &str) -> Vec<MakePattern> {
    let lowered = name.to_lowercase();
    MAKE_PATTERNS
        .iter()
        .filter(|p| lowered.contains(p.needle))
        .copied()
        .collect()
}

/// A host of interest contains at least one manufacturer substring.
pub fn is_interesting(name: &str) -> bool {
    let lowered = name.to_lowercase();
    MAKE_PATTERNS.iter().any(|p| lowered.contains(p.needle))
}
