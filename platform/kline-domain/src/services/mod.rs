pub mod audit;
pub mod comparison;
pub mod divergence;
pub mod engine;
pub mod indicators;
pub mod ohlcv;
pub mod strategy;
