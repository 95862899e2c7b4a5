//! Hardware monitoring domain logic.
//!
//! Threshold evaluation and alert rate limiting. All logic in this module
//! is pure (no subprocess or network access) so it can be tested in
//! isolation.

pub mod gate;
pub mod thresholds;
