//! Fuzz harness for the Location JSON wire shape.
//!
//! Location values ride inside persisted tfid strings, so the codec
//! must tolerate arbitrary JSON without panicking, and every value it
//! does accept must survive a serialize/deserialize round trip.

#![no_main]

use libfuzzer_sys::fuzz_target;
use palisade_core::location::Location;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(location) = serde_json::from_str::<Location>(input) {
            let json = serde_json::to_string(&location).expect("serialize accepted value");
            let back: Location = serde_json::from_str(&json).expect("round trip");
            assert_eq!(back, location);
        }
    }
});
