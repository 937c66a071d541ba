pub mod account;
pub mod costs;
pub mod metrics;
pub mod risk;
