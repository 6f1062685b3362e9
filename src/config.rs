//! Configuration constants for the go-kart drive controller

use crate::drivers::drive::DriveLimits;

/// CPU frequency in Hz (internal RC oscillator)
pub const CPU_FREQ_HZ: u32 = 1_000_000;

/// Motor PWM frequency in Hz
pub const PWM_FREQ_HZ: u32 = 20_000;

/// UART baud rate for the diagnostics console
pub const UART_BAUD: u32 = 9600;

/// Control loop period in milliseconds
pub const LOOP_PERIOD_MS: u16 = 2;

/// Pedal reading below which the pedal counts as released (dead-zone floor)
pub const PEDAL_MIN: u8 = 50;

/// Pedal reading treated as full scale
pub const PEDAL_MAX: u8 = 200;

/// Accelerator reading above this is a sensor fault (shorted wiring etc.)
pub const PEDAL_ERROR_LIMIT: u8 = 230;

/// Pedal mapping used by the drive arbiter
pub const DRIVE_LIMITS: DriveLimits = DriveLimits {
    pedal_min: PEDAL_MIN,
    pedal_max: PEDAL_MAX,
    pedal_error_limit: PEDAL_ERROR_LIMIT,
};

/// Switch debounce time in loop ticks (60 ticks = 120ms at 2ms cadence)
pub const DEBOUNCE_TICKS: i8 = 60;

/// Turn signal period in loop ticks (~1.5Hz blink at 2ms cadence)
pub const TURN_SIGNAL_PERIOD: u8 = 199;

/// Conversion polls before a pedal acquisition counts as failed
pub const ADC_RETRY_LIMIT: u16 = 1000;

// The arbiter divides by (pedal_max - pedal_min) and compares against the
// error limit, so this ordering is load-bearing.
const _: () = assert!(PEDAL_MIN < PEDAL_MAX);
const _: () = assert!(PEDAL_MAX < PEDAL_ERROR_LIMIT);
const _: () = assert!(DEBOUNCE_TICKS > 0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pedal_range_is_wide_enough_for_percent_math() {
        // duty math uses a u16 intermediate: (255 - min) * 100 must fit
        assert!((255u16 - PEDAL_MIN as u16) * 100 <= u16::MAX);
        assert!(PEDAL_MAX - PEDAL_MIN > 0);
    }

    #[test]
    fn debounce_outlasts_switch_bounce() {
        // 2ms cadence: worst-case contact bounce is well under 120ms
        assert!(DEBOUNCE_TICKS as u32 * LOOP_PERIOD_MS as u32 >= 100);
    }
}
