//! Gate decision and data category types.
//!
//! These are the values the presentation layer consumes: a [`GateDecision`]
//! picks one of three render paths, and a [`VaultCategory`] names one of the
//! independently stored collections.

use serde::{Deserialize, Serialize};

/// What a protected view should render right now.
///
/// The vault transitions between these states:
/// - `NeedsSetup` → `NeedsUnlock` (after a PIN is configured)
/// - `NeedsUnlock` → `Open` (after a correct PIN is entered)
/// - `Open` → `NeedsUnlock` (on explicit lock or when the session TTL lapses)
/// - any → `NeedsSetup` (after a committed reset)
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum GateDecision {
    /// No PIN configured yet; show the setup prompt.
    #[default]
    NeedsSetup,
    /// PIN configured but no live session; show the unlock prompt.
    NeedsUnlock,
    /// Session unlocked; protected content may render.
    Open,
}

/// One independently stored collection of vault records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultCategory {
    Credentials,
    Notes,
    Snippets,
    Links,
    Bugs,
    Prompts,
}

impl VaultCategory {
    /// Every category, in the order a reset wipes them.
    pub const ALL: [VaultCategory; 6] = [
        Self::Credentials,
        Self::Notes,
        Self::Snippets,
        Self::Links,
        Self::Bugs,
        Self::Prompts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credentials => "credentials",
            Self::Notes => "notes",
            Self::Snippets => "snippets",
            Self::Links => "links",
            Self::Bugs => "bugs",
            Self::Prompts => "prompts",
        }
    }
}

impl std::fmt::Display for GateDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NeedsSetup => write!(f, "NeedsSetup"),
            Self::NeedsUnlock => write!(f, "NeedsUnlock"),
            Self::Open => write!(f, "Open"),
        }
    }
}

impl std::fmt::Display for VaultCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_decision_serializes_pascal_case() {
        let json = serde_json::to_string(&GateDecision::NeedsUnlock).unwrap();
        assert_eq!(json, "\"NeedsUnlock\"");
    }

    #[test]
    fn test_category_names_match_serde() {
        for category in VaultCategory::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category));
        }
    }
}
