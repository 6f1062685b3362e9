//! Hardware boundary of the drive core.
//!
//! The control loop only ever talks to [`DriveHal`]; the AVR register
//! implementation lives in [`avr`] and a scripted stand-in for host tests
//! lives in [`sim`].

#[cfg(target_arch = "avr")]
pub mod avr;
#[cfg(not(target_arch = "avr"))]
pub mod sim;

use core::convert::Infallible;

use crate::config::ADC_RETRY_LIMIT;

/// Analog pedal channels
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PedalChannel {
    Brake,
    Accelerate,
}

/// The six debounced switch inputs
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SwitchId {
    ForwardSelect,
    BackwardSelect,
    TurnLeft,
    TurnRight,
    Lights,
    Neon,
}

pub const SWITCH_COUNT: usize = 6;

impl SwitchId {
    pub const ALL: [SwitchId; SWITCH_COUNT] = [
        SwitchId::ForwardSelect,
        SwitchId::BackwardSelect,
        SwitchId::TurnLeft,
        SwitchId::TurnRight,
        SwitchId::Lights,
        SwitchId::Neon,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Discrete (non-PWM) outputs
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DiscreteOutput {
    LeftLamp,
    RightLamp,
    Lights,
    Neon,
    BackwardIndicator,
}

/// Everything the drive core needs from the hardware.
///
/// Duty parameters are percentages in 0..=100. Implementations must treat a
/// zero duty as "output disconnected", never as a 0%-high PWM glitch.
pub trait DriveHal {
    /// Poll one pedal conversion. Returns `WouldBlock` while the conversion
    /// is still running; callers go through [`acquire_pedal`] so a stuck
    /// converter cannot hang the loop.
    fn sample_pedal(&mut self, channel: PedalChannel) -> nb::Result<u8, Infallible>;

    /// Raw switch level. `true` is the pulled-up (released) level.
    fn switch_released(&self, id: SwitchId) -> bool;

    fn set_forward_duty(&mut self, duty: u8);
    fn set_backward_duty(&mut self, duty: u8);
    fn set_enable_duty(&mut self, duty: u8);

    fn set_discrete_output(&mut self, output: DiscreteOutput, on: bool);
    fn toggle_discrete_output(&mut self, output: DiscreteOutput);

    /// Latch the stop/fault lamp on. There is no way to clear it from the
    /// core; power-off is the reset.
    fn set_error_indicator(&mut self);
}

/// A pedal acquisition that gave up after [`ADC_RETRY_LIMIT`] polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionError {
    pub channel: PedalChannel,
}

/// Bounded-retry pedal read. The budget is an iteration count, not a
/// wall-clock timeout, so worst-case loop latency stays deterministic.
pub fn acquire_pedal<H: DriveHal>(
    hal: &mut H,
    channel: PedalChannel,
) -> Result<u8, AcquisitionError> {
    for _ in 0..ADC_RETRY_LIMIT {
        match hal.sample_pedal(channel) {
            Ok(sample) => return Ok(sample),
            Err(nb::Error::WouldBlock) => {}
            Err(nb::Error::Other(e)) => match e {},
        }
    }
    Err(AcquisitionError { channel })
}
