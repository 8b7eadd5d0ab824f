// Timebase table of the SDS800X HD front panel

use crate::error::{Result, ScopeError};

/// Horizontal divisions on the SDS800X HD display.
pub const HORIZONTAL_DIVISIONS: f64 = 10.0;

/// Time-per-division settings in seconds, ordered as the preamble indexes them.
pub const TIMEBASE_TABLE: [f64; 39] = [
    200e-12, 500e-12, 1e-9,
    2e-9, 5e-9, 10e-9, 20e-9, 50e-9, 100e-9, 200e-9, 500e-9,
    1e-6, 2e-6, 5e-6, 10e-6, 20e-6, 50e-6, 100e-6, 200e-6, 500e-6,
    1e-3, 2e-3, 5e-3, 10e-3, 20e-3, 50e-3, 100e-3, 200e-3, 500e-3,
    1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0, 1000.0,
];

/// Look up the s/div value for a preamble timebase index.
pub fn lookup(index: i64) -> Result<f64> {
    usize::try_from(index)
        .ok()
        .and_then(|i| TIMEBASE_TABLE.get(i).copied())
        .ok_or_else(|| ScopeError::out_of_range("timebase", index, TIMEBASE_TABLE.len()))
}
