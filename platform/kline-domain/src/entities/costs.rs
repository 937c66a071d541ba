/// Proportional transaction costs. Commission applies to both sides,
/// stamp tax to sells only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub commission_rate: f64,
    pub stamp_tax_rate: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            commission_rate: 0.00025,
            stamp_tax_rate: 0.0005,
        }
    }
}

impl CostModel {
    pub fn buy_fee(&self, price: f64, shares: u64) -> f64 {
        price * shares as f64 * self.commission_rate
    }

    pub fn sell_fee(&self, price: f64, shares: u64) -> f64 {
        price * shares as f64 * (self.commission_rate + self.stamp_tax_rate)
    }

    /// Largest lot-aligned share count that `cash` can pay for including
    /// commission. Zero when not even one lot is affordable.
    pub fn max_lot_shares(&self, cash: f64, price: f64, lot_size: u64) -> u64 {
        if price <= 0.0 || !price.is_finite() || cash <= 0.0 || cash.is_nan() {
            return 0;
        }
        let lot = lot_size.max(1);
        let raw = (cash / (price * (1.0 + self.commission_rate))).floor();
        if !raw.is_finite() || raw < 1.0 {
            return 0;
        }
        let shares = (raw as u64 / lot) * lot;
        // Float rounding can leave the total a hair above cash.
        if price * shares as f64 + self.buy_fee(price, shares) > cash && shares >= lot {
            shares - lot
        } else {
            shares
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CostModel;

    #[test]
    fn sell_fee_includes_stamp_tax() {
        let costs = CostModel::default();
        assert!((costs.buy_fee(10.0, 1_000) - 2.5).abs() < 1e-9);
        assert!((costs.sell_fee(10.0, 1_000) - 7.5).abs() < 1e-9);
    }

    #[test]
    fn max_lot_shares_rounds_down_to_lot() {
        let costs = CostModel::default();
        assert_eq!(costs.max_lot_shares(100_000.0, 10.0, 100), 9_900);
        assert_eq!(costs.max_lot_shares(100_000.0, 9.0, 100), 11_100);
    }

    #[test]
    fn max_lot_shares_is_zero_below_one_lot() {
        let costs = CostModel::default();
        assert_eq!(costs.max_lot_shares(50.0, 100.0, 100), 0);
        assert_eq!(costs.max_lot_shares(10_000.0, 100.0, 100), 0);
        assert_eq!(costs.max_lot_shares(10_003.0, 100.0, 100), 100);
    }

    #[test]
    fn max_lot_shares_rejects_degenerate_prices() {
        let costs = CostModel::default();
        assert_eq!(costs.max_lot_shares(1_000.0, 0.0, 100), 0);
        assert_eq!(costs.max_lot_shares(1_000.0, f64::NAN, 100), 0);
        assert_eq!(costs.max_lot_shares(-5.0, 1.0, 100), 0);
    }
}
