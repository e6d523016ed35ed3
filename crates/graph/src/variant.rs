use serde::{Deserialize, Serialize};

/// Graph-shape parameters for one fuzzing campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Variant {
    /// Edges may point at any module, including forward and self edges.
    pub cyclic: bool,
    /// Every module schedules a deferred "after" event.
    #[serde(default)]
    pub trailing_deferred: bool,
}

impl Variant {
    /// Every combination, acyclic campaigns first.
    pub const ALL: [Variant; 4] = [
        Variant::new(false, false),
        Variant::new(false, true),
        Variant::new(true, false),
        Variant::new(true, true),
    ];

    pub const fn new(cyclic: bool, trailing_deferred: bool) -> Self {
        Variant {
            cyclic,
            trailing_deferred,
        }
    }

    /// Short label used in progress output, reports and directory names.
    pub fn label(&self) -> &'static str {
        match (self.cyclic, self.trailing_deferred) {
            (false, false) => "acyclic",
            (false, true) => "acyclic-deferred",
            (true, false) => "cyclic",
            (true, true) => "cyclic-deferred",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Variant {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .into_iter()
            .find(|v| v.label() == s)
            .ok_or_else(|| format!("unknown variant: {s}"))
    }
}
