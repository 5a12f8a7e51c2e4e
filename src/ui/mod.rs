//! Presentational widgets
//!
//! Pure functions from state to `Element`; none of them hold state.

pub mod drop_zone;
pub mod preview;
pub mod status;
