//! Fuzz target for container path splitting with arbitrary string input.
//!
//! Run with: cargo +nightly fuzz run container_path
//!
//! Properties checked:
//! - every split is a prefix/suffix pair around one separator
//! - the member half is never empty
//! - index selectors never panic

#![no_main]

use arcvfs::path::{container_candidates, extension, parse_index_selector};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(path) = std::str::from_utf8(data) else {
        return;
    };

    let _ = extension(path);
    for split in container_candidates(path) {
        assert!(!split.member.is_empty(), "empty member in {:?}", path);
        assert!(path.starts_with(split.container));
        assert!(path.ends_with(split.member));
        assert_eq!(
            split.container.len() + 1 + split.member.len(),
            path.len(),
            "split of {:?} drops bytes",
            path
        );
        let _ = parse_index_selector(split.member);
    }
});
