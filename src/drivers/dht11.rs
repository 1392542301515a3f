//! DHT11 temperature/humidity sensor driver (single-wire, bit-banged).
//!
//! ## Protocol
//!
//! ```text
//!  host   ‾‾‾\_____18ms_____/‾‾‾
//!  sensor                        \__80us__/‾‾80us‾‾\  40 × bit
//!  bit    \__50us__/‾‾ 26-28us ‾‾\   = 0
//!         \__50us__/‾‾‾‾ 70us ‾‾‾\   = 1
//! ```
//!
//! Frame: `[hum_int, hum_dec, temp_int, temp_dec, checksum]`, checksum is
//! the low byte of the sum of the first four. Bit 7 of `temp_dec` marks a
//! negative temperature on newer parts.
//!
//! Pulse widths are measured against a monotonic microsecond clock, so the
//! cost of each GPIO read does not skew the bit decision.
//!
//! Every wait on the data line is bounded, so one acquisition never blocks
//! for much more than the 18 ms start pulse plus ~5 ms of frame. The part
//! needs at least 1 s between acquisitions; the sampling interval enforces
//! that.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::app::events::Measurement;
use crate::app::ports::SensorPort;
use crate::error::SensorError;

/// Host start pulse.
const START_LOW_MS: u32 = 18;
/// Longest any single line phase may last before we give up.
const PHASE_TIMEOUT_US: u32 = 100;
/// High pulses longer than this are a `1`.
const BIT_ONE_THRESHOLD_US: u32 = 40;

/// Accepted envelope. The part is rated 0–50 °C / 20–95 %RH; readings
/// slightly outside are kept, anything beyond this is a corrupt frame.
const TEMP_RANGE: core::ops::RangeInclusive<f32> = -20.0..=60.0;
const HUMIDITY_RANGE: core::ops::RangeInclusive<f32> = 0.0..=100.0;

/// Free-running microsecond counter used to time line phases.
pub trait MicrosClock {
    fn now_us(&self) -> u64;
}

/// Validate a raw 5-byte frame and convert it to engineering units.
pub fn decode_frame(frame: [u8; 5]) -> Result<Measurement, SensorError> {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return Err(SensorError::Checksum);
    }

    let humidity = f32::from(frame[0]) + f32::from(frame[1]) / 10.0;
    let magnitude = f32::from(frame[2]) + f32::from(frame[3] & 0x7F) / 10.0;
    let temperature = if frame[3] & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    };

    if !TEMP_RANGE.contains(&temperature) || !HUMIDITY_RANGE.contains(&humidity) {
        return Err(SensorError::OutOfRange);
    }
    Ok(Measurement {
        temperature,
        humidity,
    })
}

/// DHT11 on an open-drain GPIO.
pub struct Dht11<P, D, C> {
    pin: P,
    delay: D,
    clock: C,
}

impl<P, D, C> Dht11<P, D, C>
where
    P: InputPin + OutputPin,
    D: DelayNs,
    C: MicrosClock,
{
    /// `pin` must be configured open-drain with a pull-up; it is left high (idle).
    pub fn new(mut pin: P, delay: D, clock: C) -> Result<Self, SensorError> {
        pin.set_high().map_err(|_| SensorError::Gpio)?;
        Ok(Self { pin, delay, clock })
    }

    pub fn release(self) -> (P, D, C) {
        (self.pin, self.delay, self.clock)
    }

    /// Spin while the line sits at `level`; returns how many µs that took.
    fn wait_while(&mut self, level: bool) -> Result<u32, SensorError> {
        let start = self.clock.now_us();
        loop {
            let elapsed = self.clock.now_us().saturating_sub(start) as u32;
            if self.pin.is_high().map_err(|_| SensorError::Gpio)? != level {
                return Ok(elapsed);
            }
            if elapsed >= PHASE_TIMEOUT_US {
                return Err(SensorError::Timeout);
            }
        }
    }

    /// Run one full acquisition and return the raw frame.
    pub fn read_frame(&mut self) -> Result<[u8; 5], SensorError> {
        self.pin.set_low().map_err(|_| SensorError::Gpio)?;
        self.delay.delay_ms(START_LOW_MS);
        self.pin.set_high().map_err(|_| SensorError::Gpio)?;

        // Response: line released high, sensor pulls low 80us, then high 80us.
        self.wait_while(true)?;
        self.wait_while(false)?;
        self.wait_while(true)?;

        let mut frame = [0u8; 5];
        for bit in 0..40 {
            self.wait_while(false)?;
            let high_us = self.wait_while(true)?;
            if high_us > BIT_ONE_THRESHOLD_US {
                frame[bit / 8] |= 0x80 >> (bit % 8);
            }
        }
        Ok(frame)
    }

    pub fn read(&mut self) -> Result<Measurement, SensorError> {
        let frame = self.read_frame()?;
        decode_frame(frame)
    }
}

impl<P, D, C> SensorPort for Dht11<P, D, C>
where
    P: InputPin + OutputPin,
    D: DelayNs,
    C: MicrosClock,
{
    fn sample(&mut self) -> Result<Measurement, SensorError> {
        self.read()
    }
}
