use super::crosses::{death_cross, golden_cross, kdj_lines, macd_lines};
use super::SignalGenerator;
use crate::value_objects::divergence::Divergence;
use crate::value_objects::price_bar::PriceBar;
use crate::value_objects::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoneBound {
    Below(f64),
    Above(f64),
}

impl ZoneBound {
    fn contains(self, value: f64) -> bool {
        match self {
            ZoneBound::Below(limit) => value < limit,
            ZoneBound::Above(limit) => value > limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRule {
    pub bound: ZoneBound,
    pub side: Side,
    pub points: u32,
    /// Reason fragment emitted when the rule fires, if any.
    pub label: Option<&'static str>,
}

/// Threshold table scanned top to bottom; the first matching rule wins and
/// `fallback` applies when nothing matches.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneTable {
    pub rules: Vec<ZoneRule>,
    pub fallback: Option<(Side, u32)>,
}

impl ZoneTable {
    pub fn score(&self, value: f64) -> Option<(Side, u32, Option<&'static str>)> {
        self.rules
            .iter()
            .find(|rule| rule.bound.contains(value))
            .map(|rule| (rule.side, rule.points, rule.label))
            .or_else(|| self.fallback.map(|(side, points)| (side, points, None)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacdWeights {
    pub fresh_cross: u32,
    pub confirmed_cross: u32,
    pub established: u32,
    pub above_zero: u32,
    pub golden_below_zero: u32,
    pub below_zero: u32,
    pub histogram: u32,
    pub divergence: u32,
    pub cap: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KdjWeights {
    pub cross: u32,
    pub side: u32,
    pub low_cross_j: f64,
    pub high_cross_j: f64,
    pub zone_cross: u32,
    pub cap: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeWeights {
    /// Volume over its moving average above which the day counts.
    pub ratio: f64,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResonanceWeights {
    pub double_cross: u32,
    pub partial: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendGuardWeights {
    pub below_ma_long: u32,
    pub ma_long_declining: u32,
}

/// Every threshold and score delta of the composite strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTable {
    pub macd: MacdWeights,
    pub kdj: KdjWeights,
    pub j_zones: ZoneTable,
    pub rsi_zones: ZoneTable,
    pub rsi_cap: u32,
    pub ma_alignment: u32,
    pub volume: VolumeWeights,
    pub resonance: ResonanceWeights,
    pub trend_guard: TrendGuardWeights,
    pub total_cap: u32,
    pub trigger: u32,
}

impl Default for ScoreTable {
    fn default() -> Self {
        Self {
            macd: MacdWeights {
                fresh_cross: 5,
                confirmed_cross: 4,
                established: 2,
                above_zero: 1,
                golden_below_zero: 2,
                below_zero: 1,
                histogram: 1,
                divergence: 3,
                cap: 7,
            },
            kdj: KdjWeights {
                cross: 4,
                side: 1,
                low_cross_j: 30.0,
                high_cross_j: 70.0,
                zone_cross: 2,
                cap: 7,
            },
            j_zones: ZoneTable {
                rules: vec![
                    zone(ZoneBound::Below(0.0), Side::Buy, 3, None),
                    zone(ZoneBound::Below(20.0), Side::Buy, 3, Some("KDJ oversold")),
                    zone(ZoneBound::Above(100.0), Side::Sell, 3, None),
                    zone(ZoneBound::Above(80.0), Side::Sell, 3, Some("KDJ overbought")),
                    zone(ZoneBound::Below(50.0), Side::Buy, 1, None),
                ],
                fallback: Some((Side::Sell, 1)),
            },
            rsi_zones: ZoneTable {
                rules: vec![
                    zone(ZoneBound::Below(30.0), Side::Buy, 2, None),
                    zone(ZoneBound::Above(70.0), Side::Sell, 2, None),
                    zone(ZoneBound::Below(45.0), Side::Buy, 1, None),
                    zone(ZoneBound::Above(55.0), Side::Sell, 1, None),
                ],
                fallback: None,
            },
            rsi_cap: 2,
            ma_alignment: 2,
            volume: VolumeWeights {
                ratio: 1.5,
                points: 2,
            },
            resonance: ResonanceWeights {
                double_cross: 3,
                partial: 2,
            },
            trend_guard: TrendGuardWeights {
                below_ma_long: 2,
                ma_long_declining: 1,
            },
            total_cap: 20,
            trigger: 10,
        }
    }
}

fn zone(bound: ZoneBound, side: Side, points: u32, label: Option<&'static str>) -> ZoneRule {
    ZoneRule {
        bound,
        side,
        points,
        label,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayScore {
    pub buy: u32,
    pub sell: u32,
}

impl DayScore {
    fn add(&mut self, side: Side, points: u32) {
        match side {
            Side::Buy => self.buy += points,
            Side::Sell => self.sell += points,
        }
    }

    fn absorb(&mut self, part: DayScore, cap: u32) {
        self.buy += part.buy.min(cap);
        self.sell += part.sell.min(cap);
    }
}

/// Bounded buy/sell scoring across MACD, KDJ, RSI, moving averages,
/// volume and an MA20 trend guard.
#[derive(Debug, Clone, Default)]
pub struct CompositeStrategy {
    table: ScoreTable,
}

impl CompositeStrategy {
    pub fn new(table: ScoreTable) -> Self {
        Self { table }
    }

    /// Capped scores and reason fragments for `bars[idx]`. Needs two prior
    /// bars; earlier indices score zero.
    pub fn score_day(&self, bars: &[PriceBar], idx: usize) -> (DayScore, Vec<String>) {
        let mut score = DayScore::default();
        let mut reasons = Vec::new();
        if idx < 2 || idx >= bars.len() {
            return (score, reasons);
        }
        let t = &self.table;
        let (cur, prev, prev2) = (&bars[idx], &bars[idx - 1], &bars[idx - 2]);

        let macd_now = macd_lines(cur);
        let macd_prev = macd_lines(prev);
        let macd_golden = golden_cross(macd_prev, macd_now);
        let macd_death = death_cross(macd_prev, macd_now);
        let kdj_golden = golden_cross(kdj_lines(prev), kdj_lines(cur));
        let kdj_death = death_cross(kdj_lines(prev), kdj_lines(cur));
        let j = cur.indicators.j;

        if let (Some((dif, dea)), Some((prev_dif, prev_dea))) = (macd_now, macd_prev) {
            let w = &t.macd;
            let mut part = DayScore::default();
            if dif > dea {
                if prev_dif <= prev_dea {
                    part.add(Side::Buy, w.fresh_cross);
                    reasons.push("MACD golden cross".to_string());
                } else if macd_lines(prev2).is_some_and(|(d2, e2)| d2 <= e2) {
                    part.add(Side::Buy, w.confirmed_cross);
                    reasons.push("MACD golden cross confirmed".to_string());
                } else {
                    part.add(Side::Buy, w.established);
                }
            } else if prev_dif >= prev_dea {
                part.add(Side::Sell, w.fresh_cross);
                reasons.push("MACD death cross".to_string());
            } else if macd_lines(prev2).is_some_and(|(d2, e2)| d2 >= e2) {
                part.add(Side::Sell, w.confirmed_cross);
                reasons.push("MACD death cross confirmed".to_string());
            } else {
                part.add(Side::Sell, w.established);
            }

            if dif > 0.0 {
                part.add(Side::Buy, w.above_zero);
            } else if dif < 0.0 {
                if macd_golden {
                    part.add(Side::Buy, w.golden_below_zero);
                } else {
                    part.add(Side::Sell, w.below_zero);
                }
            }

            if let (Some(hist), Some(prev_hist)) = (cur.indicators.macd, prev.indicators.macd) {
                let side = if hist > prev_hist { Side::Buy } else { Side::Sell };
                part.add(side, w.histogram);
            }

            match cur.indicators.divergence {
                Divergence::Bottom => {
                    part.add(Side::Buy, w.divergence);
                    reasons.push("MACD bottom divergence".to_string());
                }
                Divergence::Top => {
                    part.add(Side::Sell, w.divergence);
                    reasons.push("MACD top divergence".to_string());
                }
                Divergence::None => {}
            }
            score.absorb(part, w.cap);
        }

        if let (Some((k, d)), Some(_), Some(j)) = (kdj_lines(cur), kdj_lines(prev), j) {
            let w = &t.kdj;
            let mut part = DayScore::default();
            if kdj_golden {
                part.add(Side::Buy, w.cross);
                reasons.push("KDJ golden cross".to_string());
            } else if kdj_death {
                part.add(Side::Sell, w.cross);
                reasons.push("KDJ death cross".to_string());
            } else if k > d {
                part.add(Side::Buy, w.side);
            } else {
                part.add(Side::Sell, w.side);
            }

            if let Some((side, points, label)) = t.j_zones.score(j) {
                part.add(side, points);
                if let Some(label) = label {
                    reasons.push(format!("{label} J={j:.0}"));
                }
            }

            if j < w.low_cross_j && kdj_golden {
                part.add(Side::Buy, w.zone_cross);
                reasons.push("KDJ low golden cross".to_string());
            } else if j > w.high_cross_j && kdj_death {
                part.add(Side::Sell, w.zone_cross);
                reasons.push("KDJ high death cross".to_string());
            }
            score.absorb(part, w.cap);
        }

        if let Some((side, points, _)) = cur.indicators.rsi.and_then(|rsi| t.rsi_zones.score(rsi)) {
            let mut part = DayScore::default();
            part.add(side, points);
            score.absorb(part, t.rsi_cap);
        }

        if let (Some(ma5), Some(ma10)) = (cur.indicators.ma5, cur.indicators.ma10) {
            if cur.close > ma5 && ma5 > ma10 {
                score.add(Side::Buy, t.ma_alignment);
            } else if cur.close < ma5 && ma5 < ma10 {
                score.add(Side::Sell, t.ma_alignment);
            }
        }

        if let Some(vol_ma) = cur.indicators.vol_ma5.filter(|v| *v > 0.0) {
            if cur.volume as f64 / vol_ma > t.volume.ratio {
                let side = if cur.change_pct(prev) > 0.0 {
                    Side::Buy
                } else {
                    Side::Sell
                };
                score.add(side, t.volume.points);
            }
        }

        let trend_up = macd_now.is_some_and(|(dif, dea)| dif > dea);
        let trend_down = macd_now.is_some_and(|(dif, dea)| dif < dea);
        let low_j = j.is_some_and(|j| j < t.kdj.low_cross_j);
        let high_j = j.is_some_and(|j| j > t.kdj.high_cross_j);
        if macd_golden && kdj_golden {
            score.add(Side::Buy, t.resonance.double_cross);
            reasons.push("double golden cross".to_string());
        } else if macd_death && kdj_death {
            score.add(Side::Sell, t.resonance.double_cross);
            reasons.push("double death cross".to_string());
        } else if trend_up && kdj_golden && low_j {
            score.add(Side::Buy, t.resonance.partial);
        } else if trend_down && kdj_death && high_j {
            score.add(Side::Sell, t.resonance.partial);
        }

        if let Some(ma20) = cur.indicators.ma20 {
            let below = cur.close < ma20;
            if below {
                score.add(Side::Sell, t.trend_guard.below_ma_long);
                reasons.push("price below MA20".to_string());
            }
            if cur.indicators.ma20_slope.is_some_and(|slope| slope < 0.0) {
                score.add(Side::Sell, t.trend_guard.ma_long_declining);
                if below {
                    reasons.push("MA20 declining".to_string());
                }
            }
        }

        score.buy = score.buy.min(t.total_cap);
        score.sell = score.sell.min(t.total_cap);
        (score, reasons)
    }

    pub fn decide(&self, score: DayScore, reasons: &[String]) -> Signal {
        let trigger = self.table.trigger;
        let reason = || {
            format!("score B{}/S{} {}", score.buy, score.sell, reasons.join("+"))
                .trim_end()
                .to_string()
        };
        if score.buy >= trigger && score.buy > score.sell {
            Signal::buy(reason())
        } else if score.sell >= trigger && score.sell > score.buy {
            Signal::sell(reason())
        } else {
            Signal::none()
        }
    }
}

impl SignalGenerator for CompositeStrategy {
    fn name(&self) -> &str {
        "composite"
    }

    fn generate(&self, bars: &[PriceBar]) -> Vec<Signal> {
        (0..bars.len())
            .map(|idx| {
                if idx < 2 {
                    return Signal::none();
                }
                let (score, reasons) = self.score_day(bars, idx);
                self.decide(score, &reasons)
            })
            .collect()
    }
}
