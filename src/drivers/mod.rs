pub mod drive;
pub mod switches;
pub mod turn_signal;

pub use drive::{arbitrate, DriveCommand, DriveLimits};
pub use switches::SwitchBank;
pub use turn_signal::TurnSignal;
