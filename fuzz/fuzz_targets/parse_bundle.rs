//! Fuzz target for DSEQ bundle parsing and chunk replacement.
//!
//! The first byte selects the chunk to replace; the rest is treated as
//! the bundle. Replacement on an accepted bundle must produce a bundle
//! that parses again.
//!
//! Run with: cargo +nightly fuzz run parse_bundle

#![no_main]

use dsarc::bundle::{BundleChunk, parse_bundle, replace_chunk};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, bundle)) = data.split_first() else {
        return;
    };

    let Ok(chunks) = parse_bundle(bundle, "fuzz") else {
        return;
    };
    for chunk in &chunks {
        assert!(chunk.data(bundle).is_some());
    }

    let target = BundleChunk::ALL[usize::from(selector) % 3];
    let replaced = replace_chunk(bundle, target.extension(), b"fuzz")
        .unwrap_or_else(|e| panic!("replace on a parsed bundle failed: {e}"));
    let after = parse_bundle(&replaced, "fuzz")
        .unwrap_or_else(|e| panic!("replaced bundle does not parse: {e}"));
    assert_eq!(after[target.index()].data(&replaced), Some(&b"fuzz"[..]));
});
