//! Fuzz target: `decode_reading`
//!
//! Arbitrary bytes must decode to a reading or a typed error, never panic.
//! Any reading that does decode must survive a re-encode unchanged.
//!
//! cargo fuzz run fuzz_reading_codec

#![no_main]

use homeguard::mqtt::codec::{ReadingPayload, decode_reading, encode_reading};
use homeguard::registry;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(reading) = decode_reading(data) else {
        return;
    };
    if !reading.temperature.is_finite() || !reading.humidity.is_finite() {
        return;
    }

    let identity = registry::DEFAULT_SENSOR.identity();
    let bytes = encode_reading(&ReadingPayload::new(&identity, &reading, None, reading.timestamp_ms))
        .expect("finite reading encodes");
    let again = decode_reading(&bytes).expect("own output decodes");
    assert_eq!(again, reading);
});
