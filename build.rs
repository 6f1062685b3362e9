use std::env;

fn main() {
    let target = env::var("TARGET").unwrap();

    // Only the firmware image itself is AVR; the control core and its
    // simulated-HAL tests build for the host.
    if target.contains("avr") {
        println!("cargo:rustc-link-arg=-mmcu=atmega328p");
        // Pass CPU frequency for timing calculations
        println!("cargo:rustc-env=MCU_FREQ_HZ=1000000");
    }
}
