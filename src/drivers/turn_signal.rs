//! Turn-signal blinking.
//!
//! Left and right share one phase counter, so both lamps blink in lockstep
//! when active together (hazard-light behavior, intentional).

use crate::config::TURN_SIGNAL_PERIOD;

pub struct TurnSignal {
    phase: u8,
}

impl TurnSignal {
    pub const fn new() -> Self {
        Self { phase: 0 }
    }

    /// Restart the pattern from its ON half. Called when a signal is
    /// activated from the all-off state, so the lamp lights immediately.
    pub fn reset(&mut self) {
        self.phase = 0;
    }

    /// Lamp levels for the current phase, then advance one tick. ON during
    /// the first half of the period.
    pub fn tick(&mut self, left: bool, right: bool) -> (bool, bool) {
        let lit = self.phase <= TURN_SIGNAL_PERIOD / 2;
        let outputs = (left && lit, right && lit);

        self.phase = if self.phase >= TURN_SIGNAL_PERIOD {
            0
        } else {
            self.phase + 1
        };
        outputs
    }
}

impl Default for TurnSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_signals_stay_dark() {
        let mut signal = TurnSignal::new();
        for _ in 0..2 * (TURN_SIGNAL_PERIOD as u32 + 1) {
            assert_eq!(signal.tick(false, false), (false, false));
        }
    }

    #[test]
    fn left_blinks_half_on_half_off_then_wraps() {
        let mut signal = TurnSignal::new();

        // period 199: ON for phase 0..=99, OFF for 100..=199
        for phase in 0..=TURN_SIGNAL_PERIOD as u32 {
            let expected = phase <= TURN_SIGNAL_PERIOD as u32 / 2;
            assert_eq!(signal.tick(true, false), (expected, false), "phase {}", phase);
        }

        // wrapped: next tick is the ON half again
        assert_eq!(signal.tick(true, false), (true, false));
    }

    #[test]
    fn both_active_blink_in_lockstep() {
        let mut signal = TurnSignal::new();
        for _ in 0..=TURN_SIGNAL_PERIOD {
            let (left, right) = signal.tick(true, true);
            assert_eq!(left, right);
        }
    }

    #[test]
    fn reset_restarts_the_on_half() {
        let mut signal = TurnSignal::new();
        for _ in 0..TURN_SIGNAL_PERIOD / 2 + 10 {
            signal.tick(true, false);
        }
        assert_eq!(signal.tick(true, false), (false, false));

        signal.reset();
        assert_eq!(signal.tick(true, false), (true, false));
    }
}
