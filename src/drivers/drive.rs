//! Pedal-to-duty arbitration.
//!
//! Four mutually exclusive branches, re-evaluated fresh every tick:
//! regenerative braking, pedal-sensor fault, normal drive, neutral. The
//! enable channel gates the motor driver as a whole; the forward and
//! backward channels carry the direction PWM and are never energized
//! together.

/// Pedal mapping limits. Compile-time constant; `config.rs` asserts
/// `pedal_min < pedal_max < pedal_error_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveLimits {
    /// Dead-zone floor: readings at or below this count as released
    pub pedal_min: u8,
    /// Full-scale ceiling of the pedal travel
    pub pedal_max: u8,
    /// Accelerator readings above this are a sensor fault
    pub pedal_error_limit: u8,
}

/// Actuator command for one tick. Duties are percentages in 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveCommand {
    pub forward_duty: u8,
    pub backward_duty: u8,
    pub enable_duty: u8,
    pub fault: bool,
}

impl DriveCommand {
    /// All channels off.
    pub const NEUTRAL: DriveCommand = DriveCommand {
        forward_duty: 0,
        backward_duty: 0,
        enable_duty: 0,
        fault: false,
    };
}

/// Map a reading above the dead zone to a 0..=100 percentage. Truncating
/// integer division; readings past `pedal_max` clamp to full scale.
fn pedal_percent(limits: &DriveLimits, value: u8) -> u8 {
    let span = (limits.pedal_max - limits.pedal_min) as u16;
    let above = (value - limits.pedal_min) as u16;
    let percent = above * 100 / span;
    if percent > 100 {
        100
    } else {
        percent as u8
    }
}

/// Derive the per-channel duties from the pedals and the selected direction.
/// First matching branch wins.
pub fn arbitrate(
    limits: &DriveLimits,
    forward: bool,
    backward: bool,
    accelerate: u8,
    brake: u8,
) -> DriveCommand {
    if brake > limits.pedal_min {
        // regenerative braking: direction channels off, enable ramps with
        // the brake pedal
        DriveCommand {
            forward_duty: 0,
            backward_duty: 0,
            enable_duty: pedal_percent(limits, brake),
            fault: false,
        }
    } else if accelerate > limits.pedal_error_limit {
        // accelerator sensor fault: emergency brake at full enable
        DriveCommand {
            forward_duty: 0,
            backward_duty: 0,
            enable_duty: 100,
            fault: true,
        }
    } else if accelerate > limits.pedal_min {
        let duty = pedal_percent(limits, accelerate);
        if forward {
            DriveCommand {
                forward_duty: duty,
                backward_duty: 0,
                enable_duty: 100,
                fault: false,
            }
        } else if backward {
            DriveCommand {
                forward_duty: 0,
                backward_duty: duty,
                enable_duty: 100,
                fault: false,
            }
        } else {
            DriveCommand::NEUTRAL
        }
    } else {
        DriveCommand::NEUTRAL
    }
}
