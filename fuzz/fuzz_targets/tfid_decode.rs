//! Fuzz harness for `tfid::decode`.
//!
//! Decode accepts orchestrator-supplied import ids verbatim, so it must
//! reject arbitrary byte sequences without panicking: malformed base64,
//! non-UTF-8 payloads, truncated JSON, and valid JSON with invalid
//! identity shapes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use palisade_core::tfid;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Any outcome but a panic is acceptable; a successful decode
        // must re-encode.
        if let Ok(identity) = tfid::decode(input) {
            let _ = tfid::encode(&identity);
        }
    }
});
