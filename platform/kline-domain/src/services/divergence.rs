use crate::value_objects::divergence::Divergence;
use crate::value_objects::price_bar::PriceBar;

/// Smallest window that can hold two pivots.
pub const MIN_WINDOW: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pivot {
    close: f64,
    dif: f64,
}

/// Scans `window` for MACD divergence between the last two pivot closes.
///
/// Bottom: lower pivot low with a higher DIF. Top: higher pivot high with a
/// lower DIF. A top takes precedence when both appear.
pub fn detect_divergence(window: &[PriceBar]) -> Divergence {
    if window.len() < MIN_WINDOW {
        return Divergence::None;
    }

    let lows = pivots(window, |cur, before, after| cur < before && cur <= after);
    let highs = pivots(window, |cur, before, after| cur > before && cur >= after);

    let top = matches!(highs.as_slice(), [.., prev, last] if last.close > prev.close && last.dif < prev.dif);
    if top {
        return Divergence::Top;
    }
    let bottom = matches!(lows.as_slice(), [.., prev, last] if last.close < prev.close && last.dif > prev.dif);
    if bottom {
        return Divergence::Bottom;
    }
    Divergence::None
}

/// `accept(close, neighbour_before, neighbour_after)` must hold against
/// both of the two bars on each side.
fn pivots(window: &[PriceBar], accept: impl Fn(f64, f64, f64) -> bool) -> Vec<Pivot> {
    let mut found = Vec::new();
    for i in 2..window.len() - 2 {
        let cur = window[i].close;
        let is_pivot = accept(cur, window[i - 1].close, window[i + 1].close)
            && accept(cur, window[i - 2].close, window[i + 2].close);
        if !is_pivot {
            continue;
        }
        if let Some(dif) = window[i].indicators.dif {
            found.push(Pivot { close: cur, dif });
        }
    }
    found
}
