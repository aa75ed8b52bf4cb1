//! Unit conversions and band-plan constants.

/// One megahertz in hertz.
pub const MHZ: f64 = 1.0e6;

/// IAP reference bandwidth (one channel).
pub const IAPBW_HZ: f64 = 5.0 * MHZ;

/// CBRS band edges.
pub const CBRS_LOW_FREQ_HZ: f64 = 3550.0 * MHZ;
pub const CBRS_HIGH_FREQ_HZ: f64 = 3700.0 * MHZ;

/// ESC sensor protected passband.
pub const ESC_LOW_FREQ_HZ: f64 = 3550.0 * MHZ;
pub const ESC_HIGH_FREQ_HZ: f64 = 3680.0 * MHZ;

/// Center frequency of channel 21 (3650-3655 MHz), the ESC roll-off reference.
pub const ESC_CH21_CF_HZ: f64 = 3652.5 * MHZ;

/// FSS telemetry, tracking and command band.
pub const FSS_TTC_LOW_FREQ_HZ: f64 = 3700.0 * MHZ;
pub const FSS_TTC_HIGH_FREQ_HZ: f64 = 4200.0 * MHZ;

/// Reference bandwidth of the area incumbent thresholds.
pub const PPA_RBW_HZ: f64 = 10.0 * MHZ;
pub const GWPZ_RBW_HZ: f64 = 10.0 * MHZ;

/// Convert a logarithmic value (dB / dBm) to linear units (ratio / mW).
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

/// Convert a linear value (ratio / mW) to logarithmic units (dB / dBm).
pub fn linear_to_db(linear: f64) -> f64 {
    10.0 * linear.log10()
}
