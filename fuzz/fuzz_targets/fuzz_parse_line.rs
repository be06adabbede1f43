#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = serialdump::protocol::decode_line(data) else {
        return;
    };
    if let Ok(Some(sample)) = serialdump::protocol::parse_line(line) {
        let _ = sample.to_line();
    }
});
