//! Fault reporting over the serial console.
//!
//! The loop runs at 500Hz and the UART does not, so only transitions are
//! printed: entering a pedal fault, losing and recovering the ADC.
//! Formatting goes through `ufmt` to keep `core::fmt` out of the image.

use ufmt::{uwriteln, uWrite};

use crate::application::TickReport;

pub struct Reporter<W: uWrite> {
    sink: W,
    fault_active: bool,
    acquisition_lost: bool,
}

impl<W: uWrite> Reporter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            fault_active: false,
            acquisition_lost: false,
        }
    }

    /// Startup banner, printed once before the loop starts.
    pub fn banner(&mut self) {
        let _ = uwriteln!(self.sink, "gokart-firmware v0.1.0");
    }

    /// Record one tick; prints only when something changed.
    pub fn record(&mut self, report: &TickReport) {
        if report.command.fault && !self.fault_active {
            let _ = uwriteln!(
                self.sink,
                "[FLT] accelerator out of range: {}",
                report.accelerate
            );
        }
        self.fault_active = report.command.fault;

        if report.acquisition_failed && !self.acquisition_lost {
            let _ = uwriteln!(self.sink, "[FLT] pedal acquisition failed, fail-safe engaged");
        }
        if !report.acquisition_failed && self.acquisition_lost {
            let _ = uwriteln!(self.sink, "[DBG] pedal acquisition recovered");
        }
        self.acquisition_lost = report.acquisition_failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::drive::DriveCommand;

    struct BufSink(String);

    impl uWrite for BufSink {
        type Error = core::convert::Infallible;

        fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
            self.0.push_str(s);
            Ok(())
        }
    }

    fn quiet_report() -> TickReport {
        TickReport {
            brake: 0,
            accelerate: 0,
            acquisition_failed: false,
            command: DriveCommand::NEUTRAL,
        }
    }

    #[test]
    fn quiet_ticks_print_nothing() {
        let mut reporter = Reporter::new(BufSink(String::new()));
        for _ in 0..100 {
            reporter.record(&quiet_report());
        }
        assert!(reporter.sink.0.is_empty());
    }

    #[test]
    fn fault_prints_once_per_episode() {
        let mut reporter = Reporter::new(BufSink(String::new()));
        let mut report = quiet_report();
        report.accelerate = 240;
        report.command.fault = true;

        for _ in 0..10 {
            reporter.record(&report);
        }
        assert_eq!(reporter.sink.0.matches("[FLT]").count(), 1);
        assert!(reporter.sink.0.contains("240"));
    }

    #[test]
    fn acquisition_recovery_is_reported() {
        let mut reporter = Reporter::new(BufSink(String::new()));
        let mut report = quiet_report();
        report.acquisition_failed = true;
        reporter.record(&report);

        report.acquisition_failed = false;
        reporter.record(&report);
        assert!(reporter.sink.0.contains("recovered"));
    }
}
