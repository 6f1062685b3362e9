#![cfg_attr(target_arch = "avr", no_std)]
#![cfg_attr(target_arch = "avr", no_main)]

#[cfg(target_arch = "avr")]
mod firmware {
    use panic_halt as _;

    use gokart_firmware::application::Controller;
    use gokart_firmware::config::{DRIVE_LIMITS, LOOP_PERIOD_MS};
    use gokart_firmware::diagnostics::Reporter;
    use gokart_firmware::hal::avr::{delay_ms, AvrHal, Uart0};

    #[avr_device::entry]
    fn main() -> ! {
        // claim the peripherals once; the HAL uses raw register access
        let _dp = avr_device::atmega328p::Peripherals::take().unwrap();

        let mut hal = AvrHal::new();
        let mut reporter = Reporter::new(Uart0::new());
        let mut controller = Controller::new(DRIVE_LIMITS);

        reporter.banner();

        loop {
            let report = controller.tick(&mut hal);
            reporter.record(&report);
            delay_ms(LOOP_PERIOD_MS);
        }
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {
    eprintln!("gokart-firmware only produces an image for the AVR target; run `cargo test` for the host-side control core");
}
