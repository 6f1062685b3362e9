//! ATmega328P implementation of the drive HAL.
//!
//! Register topology of the kart wiring: three fast-PWM channels at ~20kHz
//! (forward on OC0B, enable on OC1B, backward on OC2B), pulled-up switch
//! inputs, left-adjusted 8-bit pedal conversions on ADC4/ADC5, UART0 for
//! the diagnostics console. A zero duty disconnects the compare output from
//! the pin instead of programming a 0% cycle.

use core::convert::Infallible;

use avr_device::atmega328p::{ADC, PORTB, PORTC, PORTD, TC0, TC1, TC2, USART0};
use embedded_hal::digital::v2::InputPin;

use super::{DiscreteOutput, DriveHal, PedalChannel, SwitchId, SWITCH_COUNT};
use crate::config::{CPU_FREQ_HZ, PWM_FREQ_HZ, UART_BAUD};
use crate::drivers::switches::released_level;

/// PWM TOP for ~20kHz from the core clock
const PWM_TOP: u8 = (CPU_FREQ_HZ / PWM_FREQ_HZ - 1) as u8;

// ADCSRA bits
const ADEN: u8 = 0x80;
const ADSC: u8 = 0x40;
const ADIF: u8 = 0x10;
const ADPS2: u8 = 0x04;
/// AVcc reference, left-adjusted result
const ADMUX_BASE: u8 = 0x60;

// compare-output-enable bits for the non-inverting B channels
const COM0B1: u8 = 0x20;
const COM1B1: u8 = 0x20;
const COM2B1: u8 = 0x20;

// UART bits
const TXEN0: u8 = 0x08;
const UDRE0: u8 = 0x20;

// PORTB outputs
const DO_LIGHT: u8 = 1 << 0;
const DO_NEON: u8 = 1 << 1;
const DO_RIGHT: u8 = 1 << 3;

// PORTC
const DO_BWD_INDICATOR: u8 = 1 << 0;
const DI_FWD: u8 = 1 << 1;
const DI_RIGHT: u8 = 1 << 2;
const DI_LEFT: u8 = 1 << 3;

// PORTD
const DI_BWD: u8 = 1 << 0;
const DI_LIGHT: u8 = 1 << 1;
const DI_NEON: u8 = 1 << 2;
const DO_STOP: u8 = 1 << 6;
const DO_LEFT: u8 = 1 << 7;

// PWM pins, driven by their timers once the compare output is connected:
// enable PB2 (OC1B), backward PD3 (OC2B), forward PD5 (OC0B)
const DO_ENABLE: u8 = 1 << 2;
const DO_BWD: u8 = 1 << 3;
const DO_FWD: u8 = 1 << 5;

fn portb() -> &'static avr_device::atmega328p::portb::RegisterBlock {
    unsafe { &*PORTB::ptr() }
}

fn portc() -> &'static avr_device::atmega328p::portc::RegisterBlock {
    unsafe { &*PORTC::ptr() }
}

fn portd() -> &'static avr_device::atmega328p::portd::RegisterBlock {
    unsafe { &*PORTD::ptr() }
}

fn adc() -> &'static avr_device::atmega328p::adc::RegisterBlock {
    unsafe { &*ADC::ptr() }
}

fn tc0() -> &'static avr_device::atmega328p::tc0::RegisterBlock {
    unsafe { &*TC0::ptr() }
}

fn tc1() -> &'static avr_device::atmega328p::tc1::RegisterBlock {
    unsafe { &*TC1::ptr() }
}

fn tc2() -> &'static avr_device::atmega328p::tc2::RegisterBlock {
    unsafe { &*TC2::ptr() }
}

fn usart0() -> &'static avr_device::atmega328p::usart0::RegisterBlock {
    unsafe { &*USART0::ptr() }
}

#[derive(Clone, Copy)]
enum Port {
    B,
    C,
    D,
}

/// One pulled-up switch input, read through the PINx register.
struct SwitchPin {
    port: Port,
    mask: u8,
}

impl InputPin for SwitchPin {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        let levels = match self.port {
            Port::B => portb().pinb.read().bits(),
            Port::C => portc().pinc.read().bits(),
            Port::D => portd().pind.read().bits(),
        };
        Ok(levels & self.mask != 0)
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(!self.is_high()?)
    }
}

fn write_output(port: Port, mask: u8, on: bool) {
    let update = |bits: u8| if on { bits | mask } else { bits & !mask };
    match port {
        Port::B => portb().portb.modify(|r, w| unsafe { w.bits(update(r.bits())) }),
        Port::C => portc().portc.modify(|r, w| unsafe { w.bits(update(r.bits())) }),
        Port::D => portd().portd.modify(|r, w| unsafe { w.bits(update(r.bits())) }),
    }
}

fn toggle_output(port: Port, mask: u8) {
    match port {
        Port::B => portb().portb.modify(|r, w| unsafe { w.bits(r.bits() ^ mask) }),
        Port::C => portc().portc.modify(|r, w| unsafe { w.bits(r.bits() ^ mask) }),
        Port::D => portd().portd.modify(|r, w| unsafe { w.bits(r.bits() ^ mask) }),
    }
}

fn output_pin(output: DiscreteOutput) -> (Port, u8) {
    match output {
        DiscreteOutput::LeftLamp => (Port::D, DO_LEFT),
        DiscreteOutput::RightLamp => (Port::B, DO_RIGHT),
        DiscreteOutput::Lights => (Port::B, DO_LIGHT),
        DiscreteOutput::Neon => (Port::B, DO_NEON),
        DiscreteOutput::BackwardIndicator => (Port::C, DO_BWD_INDICATOR),
    }
}

fn channel_mux(channel: PedalChannel) -> u8 {
    match channel {
        PedalChannel::Brake => 4,
        PedalChannel::Accelerate => 5,
    }
}

/// Duty percentage to compare value. Multiply first for accuracy.
fn pwm_compare(duty: u8) -> u8 {
    (duty as u16 * PWM_TOP as u16 / 100) as u8
}

pub struct AvrHal {
    conversion: Option<PedalChannel>,
    switch_pins: [SwitchPin; SWITCH_COUNT],
}

impl AvrHal {
    /// Configure port directions, pull-ups, the three PWM timers and the
    /// ADC. Call once at reset, before the first tick.
    pub fn new() -> Self {
        portb()
            .ddrb
            .modify(|r, w| unsafe { w.bits(r.bits() | DO_NEON | DO_ENABLE | DO_LIGHT | DO_RIGHT) });
        portc()
            .ddrc
            .modify(|r, w| unsafe { w.bits(r.bits() | DO_BWD_INDICATOR) });
        portd()
            .ddrd
            .modify(|r, w| unsafe { w.bits(r.bits() | DO_STOP | DO_LEFT | DO_FWD | DO_BWD) });

        // pull-ups on the switch inputs
        portc()
            .portc
            .modify(|r, w| unsafe { w.bits(r.bits() | DI_LEFT | DI_RIGHT | DI_FWD) });
        portd()
            .portd
            .modify(|r, w| unsafe { w.bits(r.bits() | DI_BWD | DI_LIGHT | DI_NEON) });

        // forward PWM: fast PWM, TOP = OCR0A, no prescaler
        tc0().tccr0a.write(|w| unsafe { w.bits(0x03) });
        tc0().tccr0b.write(|w| unsafe { w.bits(0x09) });
        tc0().ocr0a.write(|w| unsafe { w.bits(PWM_TOP) });

        // enable PWM: fast PWM mode 15, TOP = OCR1A, no prescaler
        tc1().tccr1a.write(|w| unsafe { w.bits(0x03) });
        tc1().tccr1b.write(|w| unsafe { w.bits(0x19) });
        tc1().ocr1a.write(|w| unsafe { w.bits(PWM_TOP as u16) });

        // backward PWM: fast PWM, TOP = OCR2A, no prescaler
        tc2().tccr2a.write(|w| unsafe { w.bits(0x03) });
        tc2().tccr2b.write(|w| unsafe { w.bits(0x09) });
        tc2().ocr2a.write(|w| unsafe { w.bits(PWM_TOP) });

        // ADC enabled, 16x prescaler
        adc().admux.write(|w| unsafe { w.bits(ADMUX_BASE) });
        adc().adcsra.write(|w| unsafe { w.bits(ADEN | ADPS2) });

        Self {
            conversion: None,
            // order matches SwitchId::ALL
            switch_pins: [
                SwitchPin { port: Port::C, mask: DI_FWD },
                SwitchPin { port: Port::D, mask: DI_BWD },
                SwitchPin { port: Port::C, mask: DI_LEFT },
                SwitchPin { port: Port::C, mask: DI_RIGHT },
                SwitchPin { port: Port::D, mask: DI_LIGHT },
                SwitchPin { port: Port::D, mask: DI_NEON },
            ],
        }
    }
}

impl Default for AvrHal {
    fn default() -> Self {
        Self::new()
    }
}

impl DriveHal for AvrHal {
    fn sample_pedal(&mut self, channel: PedalChannel) -> nb::Result<u8, Infallible> {
        let adc = adc();
        match self.conversion {
            None => {
                adc.admux
                    .write(|w| unsafe { w.bits(ADMUX_BASE | channel_mux(channel)) });
                adc.adcsra.modify(|r, w| unsafe { w.bits(r.bits() | ADSC) });
                self.conversion = Some(channel);
                Err(nb::Error::WouldBlock)
            }
            Some(active) if active != channel => {
                // abandoned conversion for the other channel; restart
                self.conversion = None;
                Err(nb::Error::WouldBlock)
            }
            Some(_) => {
                if adc.adcsra.read().bits() & ADIF == 0 {
                    return Err(nb::Error::WouldBlock);
                }
                let sample = adc.adch.read().bits();
                // conversion-complete flag clears by writing it back as 1
                adc.adcsra.modify(|r, w| unsafe { w.bits(r.bits() | ADIF) });
                self.conversion = None;
                Ok(sample)
            }
        }
    }

    fn switch_released(&self, id: SwitchId) -> bool {
        released_level(&self.switch_pins[id.index()])
    }

    fn set_forward_duty(&mut self, duty: u8) {
        tc0().ocr0b.write(|w| unsafe { w.bits(pwm_compare(duty)) });
        if duty > 0 {
            tc0().tccr0a.modify(|r, w| unsafe { w.bits(r.bits() | COM0B1) });
        } else {
            tc0().tccr0a.modify(|r, w| unsafe { w.bits(r.bits() & !COM0B1) });
        }
    }

    fn set_backward_duty(&mut self, duty: u8) {
        tc2().ocr2b.write(|w| unsafe { w.bits(pwm_compare(duty)) });
        if duty > 0 {
            tc2().tccr2a.modify(|r, w| unsafe { w.bits(r.bits() | COM2B1) });
        } else {
            tc2().tccr2a.modify(|r, w| unsafe { w.bits(r.bits() & !COM2B1) });
        }
    }

    fn set_enable_duty(&mut self, duty: u8) {
        tc1()
            .ocr1b
            .write(|w| unsafe { w.bits(pwm_compare(duty) as u16) });
        if duty > 0 {
            tc1().tccr1a.modify(|r, w| unsafe { w.bits(r.bits() | COM1B1) });
        } else {
            tc1().tccr1a.modify(|r, w| unsafe { w.bits(r.bits() & !COM1B1) });
        }
    }

    fn set_discrete_output(&mut self, output: DiscreteOutput, on: bool) {
        let (port, mask) = output_pin(output);
        write_output(port, mask, on);
    }

    fn toggle_discrete_output(&mut self, output: DiscreteOutput) {
        let (port, mask) = output_pin(output);
        toggle_output(port, mask);
    }

    fn set_error_indicator(&mut self) {
        write_output(Port::D, DO_STOP, true);
    }
}

/// Transmit-only UART0 console at 9600 baud, 8N1.
pub struct Uart0 {
    _private: (),
}

impl Uart0 {
    pub fn new() -> Self {
        let uart = usart0();
        let ubrr = (CPU_FREQ_HZ / (16 * UART_BAUD) - 1) as u16;
        uart.ubrr0.write(|w| unsafe { w.bits(ubrr) });
        uart.ucsr0b.write(|w| unsafe { w.bits(TXEN0) });
        uart.ucsr0c.write(|w| unsafe { w.bits(0x06) });
        Self { _private: () }
    }

    fn write_byte(&mut self, byte: u8) {
        let uart = usart0();
        while uart.ucsr0a.read().bits() & UDRE0 == 0 {}
        uart.udr0.write(|w| unsafe { w.bits(byte) });
    }
}

impl Default for Uart0 {
    fn default() -> Self {
        Self::new()
    }
}

impl ufmt::uWrite for Uart0 {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
        Ok(())
    }
}

/// Busy-wait delay, calibrated for the 1MHz core clock. Coarse, but the
/// loop cadence only needs ~2ms.
pub fn delay_ms(ms: u16) {
    const LOOPS_PER_MS: u32 = CPU_FREQ_HZ / 1000 / 4;
    for _ in 0..ms {
        for _ in 0..LOOPS_PER_MS {
            avr_device::asm::nop();
        }
    }
}
