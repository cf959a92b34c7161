//! Record priority

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Priority class of a record. Used for ordering and highlighting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// All priorities in display order, lowest first.
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    /// Search order used when picking the most urgent pending record.
    pub const URGENCY_ORDER: [Self; 4] = [Self::Urgent, Self::High, Self::Medium, Self::Low];

    /// Wire representation stored in remote documents.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    /// Human label for display.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Urgent => "Urgent",
        }
    }

    /// Parse a priority coming from remote data.
    ///
    /// Never fails: unrecognized values fall back to [`Priority::Medium`].
    /// Legacy labels such as `"🔴 Urgente"` or `"🟢 Faible"` are recognized
    /// by their marker emoji or French word.
    pub fn from_wire(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "low" => return Self::Low,
            "medium" => return Self::Medium,
            "high" => return Self::High,
            "urgent" => return Self::Urgent,
            _ => {}
        }

        if normalized.contains('🔴') || normalized.contains("urgent") {
            Self::Urgent
        } else if normalized.contains('🟠')
            || normalized.contains("élevée")
            || normalized.contains("haute")
        {
            Self::High
        } else if normalized.contains('🟢') || normalized.contains("faible") {
            Self::Low
        } else {
            Self::Medium
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&raw))
    }
}
