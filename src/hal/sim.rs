//! Scripted HAL stand-in for host-side tests.
//!
//! Levels and pedal samples are set by the test; every actuator write is
//! recorded in call order so tests can check both final state and the
//! read-arbitrate-write ordering of a tick.

use core::convert::Infallible;

use super::{DiscreteOutput, DriveHal, PedalChannel, SwitchId, SWITCH_COUNT};

const LOG_CAPACITY: usize = 32;

/// One recorded actuator write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorWrite {
    ForwardDuty(u8),
    BackwardDuty(u8),
    EnableDuty(u8),
    Discrete(DiscreteOutput, bool),
    Toggle(DiscreteOutput),
    ErrorIndicator,
}

pub struct SimHal {
    pedal: [u8; 2],
    failed: [bool; 2],
    conversion_delay: u16,
    remaining: [u16; 2],
    sample_polls: u32,

    released: [bool; SWITCH_COUNT],

    forward_duty: u8,
    backward_duty: u8,
    enable_duty: u8,
    outputs: [bool; 5],
    error_indicator: bool,

    log: [Option<ActuatorWrite>; LOG_CAPACITY],
    log_len: usize,
}

impl SimHal {
    pub fn new() -> Self {
        Self {
            pedal: [0; 2],
            failed: [false; 2],
            conversion_delay: 0,
            remaining: [0; 2],
            sample_polls: 0,
            // pulled-up inputs idle high
            released: [true; SWITCH_COUNT],
            forward_duty: 0,
            backward_duty: 0,
            enable_duty: 0,
            outputs: [false; 5],
            error_indicator: false,
            log: [None; LOG_CAPACITY],
            log_len: 0,
        }
    }

    pub fn set_pedal(&mut self, channel: PedalChannel, sample: u8) {
        self.pedal[channel as usize] = sample;
    }

    /// Make every acquisition on `channel` exhaust its retry budget.
    pub fn fail_channel(&mut self, channel: PedalChannel) {
        self.failed[channel as usize] = true;
    }

    pub fn restore_channel(&mut self, channel: PedalChannel) {
        self.failed[channel as usize] = false;
    }

    /// Number of `WouldBlock` polls before each conversion completes.
    pub fn set_conversion_delay(&mut self, polls: u16) {
        self.conversion_delay = polls;
        self.remaining = [polls; 2];
    }

    pub fn press(&mut self, id: SwitchId) {
        self.released[id.index()] = false;
    }

    pub fn release(&mut self, id: SwitchId) {
        self.released[id.index()] = true;
    }

    pub fn sample_polls(&self) -> u32 {
        self.sample_polls
    }

    pub fn forward_duty(&self) -> u8 {
        self.forward_duty
    }

    pub fn backward_duty(&self) -> u8 {
        self.backward_duty
    }

    pub fn enable_duty(&self) -> u8 {
        self.enable_duty
    }

    pub fn output(&self, output: DiscreteOutput) -> bool {
        self.outputs[output as usize]
    }

    pub fn error_indicator(&self) -> bool {
        self.error_indicator
    }

    pub fn writes(&self) -> impl Iterator<Item = ActuatorWrite> + '_ {
        self.log.iter().take(self.log_len).filter_map(|w| *w)
    }

    pub fn clear_log(&mut self) {
        self.log = [None; LOG_CAPACITY];
        self.log_len = 0;
    }

    fn record(&mut self, write: ActuatorWrite) {
        if self.log_len < LOG_CAPACITY {
            self.log[self.log_len] = Some(write);
            self.log_len += 1;
        }
    }
}

impl Default for SimHal {
    fn default() -> Self {
        Self::new()
    }
}

impl DriveHal for SimHal {
    fn sample_pedal(&mut self, channel: PedalChannel) -> nb::Result<u8, Infallible> {
        self.sample_polls += 1;
        let idx = channel as usize;
        if self.failed[idx] {
            return Err(nb::Error::WouldBlock);
        }
        if self.remaining[idx] > 0 {
            self.remaining[idx] -= 1;
            return Err(nb::Error::WouldBlock);
        }
        self.remaining[idx] = self.conversion_delay;
        Ok(self.pedal[idx])
    }

    fn switch_released(&self, id: SwitchId) -> bool {
        self.released[id.index()]
    }

    fn set_forward_duty(&mut self, duty: u8) {
        self.forward_duty = duty;
        self.record(ActuatorWrite::ForwardDuty(duty));
    }

    fn set_backward_duty(&mut self, duty: u8) {
        self.backward_duty = duty;
        self.record(ActuatorWrite::BackwardDuty(duty));
    }

    fn set_enable_duty(&mut self, duty: u8) {
        self.enable_duty = duty;
        self.record(ActuatorWrite::EnableDuty(duty));
    }

    fn set_discrete_output(&mut self, output: DiscreteOutput, on: bool) {
        self.outputs[output as usize] = on;
        self.record(ActuatorWrite::Discrete(output, on));
    }

    fn toggle_discrete_output(&mut self, output: DiscreteOutput) {
        self.outputs[output as usize] = !self.outputs[output as usize];
        self.record(ActuatorWrite::Toggle(output));
    }

    fn set_error_indicator(&mut self) {
        self.error_indicator = true;
        self.record(ActuatorWrite::ErrorIndicator);
    }
}
