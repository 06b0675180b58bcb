//! Fuzz target for DSARC archive parsing with arbitrary byte input.
//!
//! Exercises the header, entry table and embedded-bundle checks with
//! malformed or adversarial input, looking for panics, hangs or
//! out-of-range slicing.
//!
//! Run with: cargo +nightly fuzz run parse_archive

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let _ = dsarc::format::detect::detect_bytes(data);

    if let Ok(entries) = dsarc::archive::parse_archive(data) {
        for entry in &entries {
            // Every accepted entry must slice cleanly
            let payload = entry.data(data).expect("entry in bounds");
            for chunk in &entry.children {
                assert!(chunk.data(payload).is_some());
            }
        }
    }

    // The reader path must agree with the in-memory path
    let mut cursor = Cursor::new(data);
    let from_reader = dsarc::archive::parse_archive_reader(&mut cursor);
    let from_slice = dsarc::archive::parse_archive(data);
    assert_eq!(from_reader.is_ok(), from_slice.is_ok());
});
