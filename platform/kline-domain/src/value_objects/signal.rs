use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    Buy,
    Sell,
    #[default]
    None,
}

/// Per-day strategy output. The reason is informational only.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Signal {
    pub action: SignalAction,
    pub reason: String,
}

impl Signal {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn buy(reason: impl Into<String>) -> Self {
        Self {
            action: SignalAction::Buy,
            reason: reason.into(),
        }
    }

    pub fn sell(reason: impl Into<String>) -> Self {
        Self {
            action: SignalAction::Sell,
            reason: reason.into(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.action == SignalAction::None
    }
}
