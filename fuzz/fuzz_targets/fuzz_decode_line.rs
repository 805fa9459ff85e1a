#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Same lossy path the logger takes for raw serial bytes
    let line = String::from_utf8_lossy(data);
    if let Some(sample) = fantune_core::decode_line(line.trim()) {
        // Anything accepted must be exactly four hex fields
        let fields: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(fields.len(), 4);
        assert_eq!(u32::from_str_radix(fields[0], 16).ok(), Some(sample.target_rpm));
        assert_eq!(u32::from_str_radix(fields[3], 16).ok(), Some(sample.stall_count));
    }
});
