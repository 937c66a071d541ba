use crate::value_objects::price_bar::PriceBar;

/// (fast, slow) line pair of an oscillator.
pub(crate) type LinePair = Option<(f64, f64)>;

pub(crate) fn macd_lines(bar: &PriceBar) -> LinePair {
    Some((bar.indicators.dif?, bar.indicators.dea?))
}

pub(crate) fn kdj_lines(bar: &PriceBar) -> LinePair {
    Some((bar.indicators.k?, bar.indicators.d?))
}

/// Fast line moves from at-or-below to strictly above the slow line.
pub(crate) fn golden_cross(prev: LinePair, cur: LinePair) -> bool {
    matches!((prev, cur), (Some((pf, ps)), Some((cf, cs))) if cf > cs && pf <= ps)
}

/// Fast line moves from at-or-above to strictly below the slow line.
pub(crate) fn death_cross(prev: LinePair, cur: LinePair) -> bool {
    matches!((prev, cur), (Some((pf, ps)), Some((cf, cs))) if cf < cs && pf >= ps)
}
