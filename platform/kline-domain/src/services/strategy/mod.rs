pub mod composite;
mod crosses;
pub mod crossover;

pub use composite::{CompositeStrategy, ScoreTable};
pub use crossover::{CrossoverConfig, CrossoverStrategy};

use crate::value_objects::price_bar::PriceBar;
use crate::value_objects::signal::Signal;

/// Produces one signal per bar. The signal at index `i` may only depend on
/// `bars[..=i]`.
pub trait SignalGenerator {
    fn name(&self) -> &str;
    fn generate(&self, bars: &[PriceBar]) -> Vec<Signal>;
}

#[derive(Debug, Clone)]
pub enum StrategyKind {
    Crossover(CrossoverStrategy),
    Composite(CompositeStrategy),
}

impl StrategyKind {
    pub fn from_name(name: &str) -> Result<Self, String> {
        match name.trim().to_lowercase().as_str() {
            "crossover" => Ok(StrategyKind::Crossover(CrossoverStrategy::default())),
            "composite" => Ok(StrategyKind::Composite(CompositeStrategy::default())),
            other => Err(format!(
                "unknown strategy: {other} (expected crossover|composite)"
            )),
        }
    }
}

impl SignalGenerator for StrategyKind {
    fn name(&self) -> &str {
        match self {
            StrategyKind::Crossover(strategy) => strategy.name(),
            StrategyKind::Composite(strategy) => strategy.name(),
        }
    }

    fn generate(&self, bars: &[PriceBar]) -> Vec<Signal> {
        match self {
            StrategyKind::Crossover(strategy) => strategy.generate(bars),
            StrategyKind::Composite(strategy) => strategy.generate(bars),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SignalGenerator, StrategyKind};

    #[test]
    fn from_name_resolves_both_strategies() {
        let crossover = StrategyKind::from_name("Crossover").expect("crossover");
        assert_eq!(crossover.name(), "crossover");
        let composite = StrategyKind::from_name(" composite ").expect("composite");
        assert_eq!(composite.name(), "composite");
        let err = StrategyKind::from_name("momentum").expect_err("unknown");
        assert!(err.contains("unknown strategy"));
    }

    #[test]
    fn generators_emit_one_signal_per_bar() {
        for name in ["crossover", "composite"] {
            let strategy = StrategyKind::from_name(name).expect("strategy");
            assert!(strategy.generate(&[]).is_empty());
        }
    }
}
