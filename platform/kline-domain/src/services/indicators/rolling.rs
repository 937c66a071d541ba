use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RollingSma {
    window: usize,
    buf: VecDeque<f64>,
    sum: f64,
}

impl RollingSma {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            buf: VecDeque::with_capacity(window),
            sum: 0.0,
        }
    }

    pub fn update(&mut self, value: f64) -> Option<f64> {
        if self.window == 0 {
            return None;
        }

        self.buf.push_back(value);
        self.sum += value;
        while self.buf.len() > self.window {
            if let Some(front) = self.buf.pop_front() {
                self.sum -= front;
            }
        }

        if self.buf.len() == self.window {
            Some(self.sum / self.window as f64)
        } else {
            None
        }
    }
}

/// Recursive exponential smoothing seeded with the first observation:
/// `s = alpha * x + (1 - alpha) * s_prev`.
#[derive(Debug, Clone)]
pub struct RecursiveEma {
    alpha: f64,
    value: Option<f64>,
}

impl RecursiveEma {
    /// `alpha = 2 / (span + 1)`.
    pub fn with_span(span: usize) -> Self {
        Self {
            alpha: 2.0 / (span.max(1) as f64 + 1.0),
            value: None,
        }
    }

    /// `alpha = 1 / period`, the KDJ smoothing convention.
    pub fn with_period(period: usize) -> Self {
        Self {
            alpha: 1.0 / period.max(1) as f64,
            value: None,
        }
    }

    pub fn update(&mut self, x: f64) -> f64 {
        let next = match self.value {
            Some(prev) => self.alpha * x + (1.0 - self.alpha) * prev,
            None => x,
        };
        self.value = Some(next);
        next
    }

    pub fn current(&self) -> Option<f64> {
        self.value
    }
}

/// Lowest low and highest high over the last `window` bars.
#[derive(Debug, Clone)]
pub struct RollingRange {
    window: usize,
    highs: VecDeque<f64>,
    lows: VecDeque<f64>,
}

impl RollingRange {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            highs: VecDeque::with_capacity(window),
            lows: VecDeque::with_capacity(window),
        }
    }

    pub fn update(&mut self, high: f64, low: f64) -> Option<(f64, f64)> {
        if self.window == 0 {
            return None;
        }
        self.highs.push_back(high);
        self.lows.push_back(low);
        while self.highs.len() > self.window {
            self.highs.pop_front();
            self.lows.pop_front();
        }
        if self.highs.len() < self.window {
            return None;
        }
        let lowest = self.lows.iter().copied().fold(f64::INFINITY, f64::min);
        let highest = self.highs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some((lowest, highest))
    }
}

/// RSI from simple rolling means of gains and losses.
#[derive(Debug, Clone)]
pub struct RollingRsi {
    prev_close: Option<f64>,
    gains: RollingSma,
    losses: RollingSma,
}

impl RollingRsi {
    pub fn new(window: usize) -> Self {
        Self {
            prev_close: None,
            gains: RollingSma::new(window),
            losses: RollingSma::new(window),
        }
    }

    pub fn update(&mut self, close: f64) -> Option<f64> {
        let Some(prev) = self.prev_close.replace(close) else {
            return None;
        };

        let diff = close - prev;
        let avg_gain = self.gains.update(diff.max(0.0));
        let avg_loss = self.losses.update((-diff).max(0.0));
        let (avg_gain, avg_loss) = (avg_gain?, avg_loss?);

        if avg_loss <= 1e-12 {
            return Some(if avg_gain <= 1e-12 { 50.0 } else { 100.0 });
        }
        let rs = avg_gain / avg_loss;
        Some(100.0 - 100.0 / (1.0 + rs))
    }
}

#[cfg(test)]
mod tests {
    use super::{RecursiveEma, RollingRange, RollingRsi, RollingSma};

    #[test]
    fn sma_waits_for_full_window() {
        let mut sma = RollingSma::new(3);
        assert_eq!(sma.update(1.0), None);
        assert_eq!(sma.update(2.0), None);
        assert_eq!(sma.update(3.0), Some(2.0));
        assert_eq!(sma.update(6.0), Some(11.0 / 3.0));
    }

    #[test]
    fn ema_is_seeded_with_first_value() {
        let mut ema = RecursiveEma::with_span(3);
        assert_eq!(ema.current(), None);
        assert_eq!(ema.update(10.0), 10.0);
        assert!((ema.update(20.0) - 15.0).abs() < 1e-12);

        let mut smooth = RecursiveEma::with_period(3);
        smooth.update(90.0);
        assert!((smooth.update(30.0) - 70.0).abs() < 1e-12);
    }

    #[test]
    fn range_tracks_extremes() {
        let mut range = RollingRange::new(2);
        assert_eq!(range.update(10.0, 8.0), None);
        assert_eq!(range.update(12.0, 9.0), Some((8.0, 12.0)));
        assert_eq!(range.update(11.0, 10.0), Some((9.0, 12.0)));
    }

    #[test]
    fn rsi_extremes_and_flat() {
        let mut rising = RollingRsi::new(3);
        let values: Vec<Option<f64>> = [1.0, 2.0, 3.0, 4.0].iter().map(|c| rising.update(*c)).collect();
        assert_eq!(values, vec![None, None, None, Some(100.0)]);

        let mut flat = RollingRsi::new(2);
        flat.update(5.0);
        flat.update(5.0);
        assert_eq!(flat.update(5.0), Some(50.0));

        let mut mixed = RollingRsi::new(2);
        mixed.update(10.0);
        mixed.update(13.0);
        let rsi = mixed.update(12.0).expect("rsi");
        assert!((rsi - 75.0).abs() < 1e-9);
    }
}
