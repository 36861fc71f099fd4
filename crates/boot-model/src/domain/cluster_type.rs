use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Run mode of a booted cluster.
///
/// Exported to children as `RAILS_ENV`, so the string forms are part of the contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterType {
    Production,
    #[default]
    Development,
    Test,
}

impl ClusterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterType::Production => "production",
            ClusterType::Development => "development",
            ClusterType::Test => "test",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, ClusterType::Production)
    }

    pub fn is_test(&self) -> bool {
        matches!(self, ClusterType::Test)
    }
}

impl fmt::Display for ClusterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClusterType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" => Ok(ClusterType::Production),
            "development" => Ok(ClusterType::Development),
            "test" => Ok(ClusterType::Test),
            _ => Err(ModelError::UnknownClusterType(s.to_string())),
        }
    }
}
