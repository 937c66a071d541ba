use crate::entities::metrics::MetricsSummary;

/// Returns closer than this are reported as a tie.
pub const RETURN_TIE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    NoRuns,
    Best(String),
    Tie(Vec<String>),
}

impl Comparison {
    pub fn describe(&self) -> String {
        match self {
            Comparison::NoRuns => "no runs".to_string(),
            Comparison::Best(name) => name.clone(),
            Comparison::Tie(names) => format!("tie ({})", names.join(" = ")),
        }
    }
}

/// Highest total return wins; every run sharing the top return ties.
pub fn compare_runs(runs: &[(&str, &MetricsSummary)]) -> Comparison {
    let Some(top) = runs
        .iter()
        .map(|(_, summary)| summary.total_return)
        .fold(None, |best: Option<f64>, value| {
            Some(best.map_or(value, |best| best.max(value)))
        })
    else {
        return Comparison::NoRuns;
    };

    let leaders: Vec<String> = runs
        .iter()
        .filter(|(_, summary)| (summary.total_return - top).abs() <= RETURN_TIE_TOLERANCE)
        .map(|(name, _)| name.to_string())
        .collect();

    match leaders.as_slice() {
        [single] => Comparison::Best(single.clone()),
        _ => Comparison::Tie(leaders),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyAverage {
    pub strategy: String,
    pub avg_total_return: f64,
    pub avg_alpha: f64,
    pub avg_win_rate: f64,
    /// Instruments on which this strategy was the outright best.
    pub best_count: usize,
}

struct Accumulator {
    strategy: String,
    total_return: f64,
    alpha: f64,
    win_rate: f64,
    count: usize,
    best_count: usize,
}

impl Accumulator {
    fn new(strategy: &str) -> Self {
        Self {
            strategy: strategy.to_string(),
            total_return: 0.0,
            alpha: 0.0,
            win_rate: 0.0,
            count: 0,
            best_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CrossInstrumentSummary {
    pub instruments: usize,
    pub strategies: Vec<StrategyAverage>,
    pub avg_buy_hold_return: f64,
}

/// Averages each strategy over instruments. Strategies keep the order in
/// which they first appear.
pub fn summarize_instruments(
    per_instrument: &[Vec<(&str, &MetricsSummary)>],
) -> CrossInstrumentSummary {
    let mut summary = CrossInstrumentSummary {
        instruments: per_instrument.len(),
        ..CrossInstrumentSummary::default()
    };
    if per_instrument.is_empty() {
        return summary;
    }

    let mut totals: Vec<Accumulator> = Vec::new();
    let mut buy_hold_sum = 0.0;
    for runs in per_instrument {
        if let Some((_, first)) = runs.first() {
            buy_hold_sum += first.buy_hold_return;
        }
        let best = compare_runs(runs);
        for (name, metrics) in runs {
            let idx = match totals.iter().position(|acc| acc.strategy == *name) {
                Some(idx) => idx,
                None => {
                    totals.push(Accumulator::new(name));
                    totals.len() - 1
                }
            };
            let acc = &mut totals[idx];
            acc.total_return += metrics.total_return;
            acc.alpha += metrics.alpha();
            acc.win_rate += metrics.win_rate;
            acc.count += 1;
            if matches!(&best, Comparison::Best(winner) if winner == name) {
                acc.best_count += 1;
            }
        }
    }

    summary.avg_buy_hold_return = buy_hold_sum / per_instrument.len() as f64;
    summary.strategies = totals
        .into_iter()
        .map(|acc| {
            let n = acc.count.max(1) as f64;
            StrategyAverage {
                strategy: acc.strategy,
                avg_total_return: acc.total_return / n,
                avg_alpha: acc.alpha / n,
                avg_win_rate: acc.win_rate / n,
                best_count: acc.best_count,
            }
        })
        .collect();
    summary
}
