use serde::{Deserialize, Serialize};

/// Price/momentum disagreement tag produced by the divergence scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Divergence {
    #[default]
    None,
    Bottom,
    Top,
}

impl Divergence {
    pub fn as_str(self) -> &'static str {
        match self {
            Divergence::None => "none",
            Divergence::Bottom => "bottom",
            Divergence::Top => "top",
        }
    }
}
