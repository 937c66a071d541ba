pub mod divergence;
pub mod equity_point;
pub mod price_bar;
pub mod signal;
pub mod trade;
