//! One-tick drive control logic.
//!
//! The controller is a Moore-style single-state loop: all state lives in the
//! data (switch bank, acceleration lock, blink phase), and every tick
//! re-derives the actuator command from scratch. Tick ordering is fixed:
//! pedal reads, arbitration, motor writes, switch debouncing, turn-signal
//! lamps. Motor commands must never see debounce results from the same
//! tick's input scan.

use crate::drivers::drive::{arbitrate, DriveCommand, DriveLimits};
use crate::drivers::switches::SwitchBank;
use crate::drivers::turn_signal::TurnSignal;
use crate::hal::{acquire_pedal, DiscreteOutput, DriveHal, PedalChannel, SwitchId};

/// What one tick saw and commanded, for the diagnostics console.
#[derive(Debug, Clone, Copy)]
pub struct TickReport {
    pub brake: u8,
    pub accelerate: u8,
    pub acquisition_failed: bool,
    pub command: DriveCommand,
}

pub struct Controller {
    limits: DriveLimits,
    switches: SwitchBank,
    turn_signal: TurnSignal,
    acceleration_lock: bool,
}

impl Controller {
    pub const fn new(limits: DriveLimits) -> Self {
        Self {
            limits,
            switches: SwitchBank::new(),
            turn_signal: TurnSignal::new(),
            // boot locked: the pedal may already be pressed at power-on
            acceleration_lock: true,
        }
    }

    /// Run one fixed-period iteration against the hardware.
    pub fn tick<H: DriveHal>(&mut self, hal: &mut H) -> TickReport {
        let (brake, brake_ok) = self.acquire_or_failsafe(hal, PedalChannel::Brake);
        let (accelerate, accelerate_ok) = self.acquire_or_failsafe(hal, PedalChannel::Accelerate);

        // unlock only once the pedal is actually released
        if accelerate < self.limits.pedal_min {
            self.acceleration_lock = false;
        }
        let effective_accelerate = if self.acceleration_lock { 0 } else { accelerate };

        let command = arbitrate(
            &self.limits,
            self.switches.state(SwitchId::ForwardSelect),
            self.switches.state(SwitchId::BackwardSelect),
            effective_accelerate,
            brake,
        );
        if command.fault {
            hal.set_error_indicator();
        }

        hal.set_forward_duty(command.forward_duty);
        hal.set_backward_duty(command.backward_duty);
        hal.set_enable_duty(command.enable_duty);

        self.poll_switches(hal);

        let (left, right) = self.turn_signal.tick(
            self.switches.state(SwitchId::TurnLeft),
            self.switches.state(SwitchId::TurnRight),
        );
        hal.set_discrete_output(DiscreteOutput::LeftLamp, left);
        hal.set_discrete_output(DiscreteOutput::RightLamp, right);

        TickReport {
            brake,
            accelerate,
            acquisition_failed: !(brake_ok && accelerate_ok),
            command,
        }
    }

    /// Acquisition failure policy: latch the indicator and substitute the
    /// fail-safe reading (full brake, no throttle) instead of trusting a
    /// dead sensor.
    fn acquire_or_failsafe<H: DriveHal>(&self, hal: &mut H, channel: PedalChannel) -> (u8, bool) {
        match acquire_pedal(hal, channel) {
            Ok(sample) => (sample, true),
            Err(_) => {
                hal.set_error_indicator();
                let failsafe = match channel {
                    PedalChannel::Brake => self.limits.pedal_max,
                    PedalChannel::Accelerate => 0,
                };
                (failsafe, false)
            }
        }
    }

    fn poll_switches<H: DriveHal>(&mut self, hal: &mut H) {
        for id in SwitchId::ALL {
            let released = hal.switch_released(id);
            if self.switches.debounce(id, released) {
                self.on_press(id, hal);
            }
        }
    }

    /// Edge action for one accepted press, per switch role.
    fn on_press<H: DriveHal>(&mut self, id: SwitchId, hal: &mut H) {
        match id {
            SwitchId::ForwardSelect => {
                self.switches.set_state(SwitchId::BackwardSelect, false);
                hal.set_discrete_output(DiscreteOutput::BackwardIndicator, false);
                self.switches.toggle_state(SwitchId::ForwardSelect);
                self.acceleration_lock = true;
            }
            SwitchId::BackwardSelect => {
                self.switches.set_state(SwitchId::ForwardSelect, false);
                hal.toggle_discrete_output(DiscreteOutput::BackwardIndicator);
                self.switches.toggle_state(SwitchId::BackwardSelect);
                self.acceleration_lock = true;
            }
            SwitchId::TurnLeft | SwitchId::TurnRight => {
                // restart the blink from its ON half only when coming from
                // the all-off state
                if !self.switches.state(SwitchId::TurnLeft)
                    && !self.switches.state(SwitchId::TurnRight)
                {
                    self.turn_signal.reset();
                }
                self.switches.toggle_state(id);
            }
            SwitchId::Lights => hal.toggle_discrete_output(DiscreteOutput::Lights),
            SwitchId::Neon => hal.toggle_discrete_output(DiscreteOutput::Neon),
        }
    }

    pub fn acceleration_locked(&self) -> bool {
        self.acceleration_lock
    }

    pub fn forward_selected(&self) -> bool {
        self.switches.state(SwitchId::ForwardSelect)
    }

    pub fn backward_selected(&self) -> bool {
        self.switches.state(SwitchId::BackwardSelect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEBOUNCE_TICKS, DRIVE_LIMITS, PEDAL_MAX, PEDAL_MIN};
    use crate::hal::sim::{ActuatorWrite, SimHal};

    fn controller() -> Controller {
        Controller::new(DRIVE_LIMITS)
    }

    /// Press, tick once (edge accepted), release, drain the countdown.
    fn tap(controller: &mut Controller, hal: &mut SimHal, id: SwitchId) {
        hal.press(id);
        controller.tick(hal);
        hal.release(id);
        for _ in 0..DEBOUNCE_TICKS {
            controller.tick(hal);
        }
    }

    #[test]
    fn idle_kart_commands_nothing() {
        let mut hal = SimHal::new();
        let mut controller = controller();

        let report = controller.tick(&mut hal);
        assert_eq!(report.command, crate::drivers::drive::DriveCommand::NEUTRAL);
        assert_eq!(hal.forward_duty(), 0);
        assert_eq!(hal.backward_duty(), 0);
        assert_eq!(hal.enable_duty(), 0);
        assert!(!hal.error_indicator());
    }

    #[test]
    fn boot_lock_suppresses_a_pressed_pedal() {
        let mut hal = SimHal::new();
        let mut controller = controller();
        hal.set_pedal(PedalChannel::Accelerate, 150);

        tap(&mut controller, &mut hal, SwitchId::ForwardSelect);
        assert!(controller.forward_selected());
        assert!(controller.acceleration_locked());
        assert_eq!(hal.forward_duty(), 0);
    }

    #[test]
    fn forward_drive_after_pedal_cycle() {
        let mut hal = SimHal::new();
        let mut controller = controller();

        tap(&mut controller, &mut hal, SwitchId::ForwardSelect);
        // pedal released once, lock clears
        controller.tick(&mut hal);
        assert!(!controller.acceleration_locked());

        hal.set_pedal(PedalChannel::Accelerate, 150);
        let report = controller.tick(&mut hal);
        // (150 - 50) * 100 / 150 = 66
        assert_eq!(report.command.forward_duty, 66);
        assert_eq!(hal.forward_duty(), 66);
        assert_eq!(hal.backward_duty(), 0);
        assert_eq!(hal.enable_duty(), 100);
    }

    #[test]
    fn direction_press_with_pedal_down_relocks() {
        let mut hal = SimHal::new();
        let mut controller = controller();

        // unlock with the pedal up, then hold it down
        controller.tick(&mut hal);
        hal.set_pedal(PedalChannel::Accelerate, 150);
        controller.tick(&mut hal);
        assert!(!controller.acceleration_locked());

        tap(&mut controller, &mut hal, SwitchId::ForwardSelect);
        assert!(controller.acceleration_locked());
        assert_eq!(hal.forward_duty(), 0);

        // releasing the pedal unlocks again
        hal.set_pedal(PedalChannel::Accelerate, 0);
        controller.tick(&mut hal);
        assert!(!controller.acceleration_locked());
    }

    #[test]
    fn direction_selects_are_mutually_exclusive() {
        let mut hal = SimHal::new();
        let mut controller = controller();

        tap(&mut controller, &mut hal, SwitchId::ForwardSelect);
        assert!(controller.forward_selected());

        tap(&mut controller, &mut hal, SwitchId::BackwardSelect);
        assert!(!controller.forward_selected());
        assert!(controller.backward_selected());
        assert!(hal.output(DiscreteOutput::BackwardIndicator));

        tap(&mut controller, &mut hal, SwitchId::ForwardSelect);
        assert!(controller.forward_selected());
        assert!(!controller.backward_selected());
        assert!(!hal.output(DiscreteOutput::BackwardIndicator));
    }

    #[test]
    fn regen_braking_gates_out_the_drive_channels() {
        let mut hal = SimHal::new();
        let mut controller = controller();

        tap(&mut controller, &mut hal, SwitchId::ForwardSelect);
        controller.tick(&mut hal);
        hal.set_pedal(PedalChannel::Accelerate, 150);
        hal.set_pedal(PedalChannel::Brake, 125);

        let report = controller.tick(&mut hal);
        assert_eq!(report.command.forward_duty, 0);
        assert_eq!(report.command.backward_duty, 0);
        // (125 - 50) * 100 / 150 = 50
        assert_eq!(report.command.enable_duty, 50);
        assert!(!report.command.fault);
    }

    #[test]
    fn pedal_fault_commands_emergency_brake_and_indicator() {
        let mut hal = SimHal::new();
        let mut controller = controller();

        controller.tick(&mut hal); // unlock
        hal.set_pedal(PedalChannel::Accelerate, 240);
        let report = controller.tick(&mut hal);

        assert!(report.command.fault);
        assert_eq!(hal.forward_duty(), 0);
        assert_eq!(hal.backward_duty(), 0);
        assert_eq!(hal.enable_duty(), 100);
        assert!(hal.error_indicator());
    }

    #[test]
    fn failed_brake_acquisition_engages_full_regen() {
        let mut hal = SimHal::new();
        let mut controller = controller();
        hal.fail_channel(PedalChannel::Brake);

        let report = controller.tick(&mut hal);
        assert!(report.acquisition_failed);
        assert_eq!(report.brake, PEDAL_MAX);
        assert!(hal.error_indicator());
        assert_eq!(hal.forward_duty(), 0);
        assert_eq!(hal.backward_duty(), 0);
        // substituted pedal_max maps to a full-scale regen ramp
        assert_eq!(hal.enable_duty(), 100);
    }

    #[test]
    fn failed_accelerator_acquisition_reads_as_no_throttle() {
        let mut hal = SimHal::new();
        let mut controller = controller();

        tap(&mut controller, &mut hal, SwitchId::ForwardSelect);
        controller.tick(&mut hal);
        hal.fail_channel(PedalChannel::Accelerate);

        let report = controller.tick(&mut hal);
        assert!(report.acquisition_failed);
        assert_eq!(report.accelerate, 0);
        assert!(report.accelerate < PEDAL_MIN);
        assert_eq!(hal.forward_duty(), 0);
        assert!(hal.error_indicator());
    }

    #[test]
    fn lights_toggle_once_per_press() {
        let mut hal = SimHal::new();
        let mut controller = controller();

        hal.press(SwitchId::Lights);
        for _ in 0..100 {
            controller.tick(&mut hal);
        }
        assert!(hal.output(DiscreteOutput::Lights));

        hal.release(SwitchId::Lights);
        for _ in 0..DEBOUNCE_TICKS {
            controller.tick(&mut hal);
        }
        tap(&mut controller, &mut hal, SwitchId::Lights);
        assert!(!hal.output(DiscreteOutput::Lights));
    }

    #[test]
    fn neon_toggles_independently_of_lights() {
        let mut hal = SimHal::new();
        let mut controller = controller();

        tap(&mut controller, &mut hal, SwitchId::Neon);
        assert!(hal.output(DiscreteOutput::Neon));
        assert!(!hal.output(DiscreteOutput::Lights));
    }

    #[test]
    fn fresh_turn_signal_starts_lit() {
        let mut hal = SimHal::new();
        let mut controller = controller();

        // let some phase accumulate with everything off
        for _ in 0..150 {
            controller.tick(&mut hal);
        }
        hal.press(SwitchId::TurnLeft);
        controller.tick(&mut hal);

        // the press reset the phase; the next tick's lamp write is ON
        controller.tick(&mut hal);
        assert!(hal.output(DiscreteOutput::LeftLamp));
        assert!(!hal.output(DiscreteOutput::RightLamp));
    }

    #[test]
    fn second_signal_joins_without_phase_reset() {
        let mut hal = SimHal::new();
        let mut controller = controller();

        tap(&mut controller, &mut hal, SwitchId::TurnLeft);
        // left already active: right must join in lockstep, not restart
        tap(&mut controller, &mut hal, SwitchId::TurnRight);

        for _ in 0..500 {
            controller.tick(&mut hal);
            assert_eq!(
                hal.output(DiscreteOutput::LeftLamp),
                hal.output(DiscreteOutput::RightLamp)
            );
        }
    }

    #[test]
    fn motor_writes_precede_lamp_writes() {
        let mut hal = SimHal::new();
        let mut controller = controller();

        hal.clear_log();
        controller.tick(&mut hal);

        let writes: std::vec::Vec<_> = hal.writes().collect();
        assert!(matches!(writes[0], ActuatorWrite::ForwardDuty(_)));
        assert!(matches!(writes[1], ActuatorWrite::BackwardDuty(_)));
        assert!(matches!(writes[2], ActuatorWrite::EnableDuty(_)));
        assert!(matches!(
            writes[writes.len() - 2],
            ActuatorWrite::Discrete(DiscreteOutput::LeftLamp, _)
        ));
        assert!(matches!(
            writes[writes.len() - 1],
            ActuatorWrite::Discrete(DiscreteOutput::RightLamp, _)
        ));
    }
}
