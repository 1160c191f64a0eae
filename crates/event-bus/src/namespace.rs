use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Push namespaces served by the backend, one per page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Dashboard,
    Monitor,
    Strategy,
    Logs,
}

impl Namespace {
    pub const ALL: [Namespace; 4] = [
        Namespace::Dashboard,
        Namespace::Monitor,
        Namespace::Strategy,
        Namespace::Logs,
    ];

    /// Path segment appended to the push base URL
    pub fn path(&self) -> &'static str {
        match self {
            Namespace::Dashboard => "/dashboard",
            Namespace::Monitor => "/monitor",
            Namespace::Strategy => "/strategy",
            Namespace::Logs => "/logs",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Namespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('/') {
            "dashboard" => Ok(Namespace::Dashboard),
            "monitor" => Ok(Namespace::Monitor),
            "strategy" => Ok(Namespace::Strategy),
            "logs" => Ok(Namespace::Logs),
            other => Err(format!("unknown namespace: {other}")),
        }
    }
}
