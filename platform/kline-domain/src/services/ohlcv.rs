use crate::value_objects::price_bar::PriceBar;
use chrono::NaiveDate;

/// Calendar gap (in days) above which two consecutive daily bars are
/// reported as a gap, e.g. a trading suspension.
pub const DEFAULT_MAX_GAP_DAYS: i64 = 10;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DataQualityReport {
    pub rows: usize,
    pub duplicates: usize,
    pub out_of_order: usize,
    /// Rows whose close (or any other price) is non-finite or non-positive.
    pub invalid_close: usize,
    pub invalid_range: usize,
    pub gaps: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub first_duplicate: Option<NaiveDate>,
    pub first_out_of_order: Option<NaiveDate>,
    pub first_invalid_close: Option<NaiveDate>,
    pub first_gap: Option<NaiveDate>,
    pub max_gap_days: Option<i64>,
}

impl DataQualityReport {
    pub fn has_issues(&self) -> bool {
        self.duplicates > 0
            || self.out_of_order > 0
            || self.invalid_close > 0
            || self.invalid_range > 0
            || self.gaps > 0
    }

    /// Folds in counters gathered while parsing raw rows, before rows were
    /// dropped, sorted and de-duplicated.
    pub fn merge_parse_stage(&mut self, parsed: &DataQualityReport) {
        self.rows = parsed.rows;
        self.duplicates += parsed.duplicates;
        self.out_of_order += parsed.out_of_order;
        self.invalid_close += parsed.invalid_close;
        self.first_duplicate = self.first_duplicate.or(parsed.first_duplicate);
        self.first_out_of_order = self.first_out_of_order.or(parsed.first_out_of_order);
        self.first_invalid_close = self.first_invalid_close.or(parsed.first_invalid_close);
    }
}

/// Every price column finite and strictly positive.
pub fn prices_are_valid(open: f64, high: f64, low: f64, close: f64) -> bool {
    [open, high, low, close]
        .iter()
        .all(|price| price.is_finite() && *price > 0.0)
}

/// Quality report over an already loaded series (no rows are dropped).
/// Bars with an unusable price are counted under `invalid_close`.
pub fn data_quality_from_bars(bars: &[PriceBar], max_gap_days: i64) -> DataQualityReport {
    let mut report = DataQualityReport {
        rows: bars.len(),
        ..DataQualityReport::default()
    };
    let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
        return report;
    };
    report.first_date = Some(first.date);
    report.last_date = Some(last.date);

    let mut prev: Option<NaiveDate> = None;
    for bar in bars {
        if !prices_are_valid(bar.open, bar.high, bar.low, bar.close) {
            report.invalid_close += 1;
            report.first_invalid_close.get_or_insert(bar.date);
        }
        if !bar_range_is_valid(bar) {
            report.invalid_range += 1;
        }

        if let Some(prev_date) = prev {
            if bar.date == prev_date {
                report.duplicates += 1;
                report.first_duplicate.get_or_insert(bar.date);
            } else if bar.date < prev_date {
                report.out_of_order += 1;
                report.first_out_of_order.get_or_insert(bar.date);
            } else {
                record_gap(&mut report, prev_date, bar.date, max_gap_days);
            }
        }
        prev = Some(bar.date);
    }

    report
}

fn bar_range_is_valid(bar: &PriceBar) -> bool {
    bar.low <= bar.open.min(bar.close) && bar.high >= bar.open.max(bar.close) && bar.low > 0.0
}

fn record_gap(report: &mut DataQualityReport, prev: NaiveDate, next: NaiveDate, max_gap_days: i64) {
    let diff = (next - prev).num_days();
    if max_gap_days > 0 && diff > max_gap_days {
        report.gaps += 1;
        report.first_gap.get_or_insert(next);
        report.max_gap_days = Some(report.max_gap_days.map_or(diff, |current| current.max(diff)));
    }
}
