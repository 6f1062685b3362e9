//! Switch debouncing.
//!
//! Each switch carries a countdown that gates the *press edge* only: a held
//! button produces exactly one edge until it has been released long enough
//! for the countdown to drain. Release never toggles anything.

use embedded_hal::digital::v2::InputPin;

use crate::config::DEBOUNCE_TICKS;
use crate::hal::{SwitchId, SWITCH_COUNT};

/// Raw level for the debouncer: pulled-up switches read high when released.
/// A pin read error counts as released, so electrical noise can never fake
/// a press.
pub fn released_level<P: InputPin>(pin: &P) -> bool {
    pin.is_high().unwrap_or(true)
}

/// Debounce countdown and logical toggled state of one switch.
#[derive(Clone, Copy)]
struct DigitalInput {
    countdown: i8,
    state: bool,
}

/// The six drive switches with their debounce state.
pub struct SwitchBank {
    inputs: [DigitalInput; SWITCH_COUNT],
}

impl SwitchBank {
    pub const fn new() -> Self {
        Self {
            inputs: [DigitalInput {
                countdown: 0,
                state: false,
            }; SWITCH_COUNT],
        }
    }

    /// Feed one raw level sample for `id`. Returns `true` on an accepted
    /// press edge; the caller runs the edge action.
    pub fn debounce(&mut self, id: SwitchId, released: bool) -> bool {
        let input = &mut self.inputs[id.index()];
        if released {
            if input.countdown > 0 {
                input.countdown -= 1;
            }
            false
        } else if input.countdown == 0 {
            input.countdown = DEBOUNCE_TICKS;
            true
        } else {
            false
        }
    }

    /// Logical toggled state (direction selected, turn signal active).
    pub fn state(&self, id: SwitchId) -> bool {
        self.inputs[id.index()].state
    }

    pub fn set_state(&mut self, id: SwitchId, on: bool) {
        self.inputs[id.index()].state = on;
    }

    pub fn toggle_state(&mut self, id: SwitchId) {
        let input = &mut self.inputs[id.index()];
        input.state = !input.state;
    }
}

impl Default for SwitchBank {
    fn default() -> Self {
        Self::new()
    }
}
