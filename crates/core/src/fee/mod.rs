//! Platform fee computation.

pub mod calculator;

#[cfg(test)]
mod calculator_props;

pub use calculator::{FeeBreakdown, FeeCalculator};
