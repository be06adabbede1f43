#![no_main]
use std::sync::atomic::AtomicBool;

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut reader = std::io::Cursor::new(data);
    let _ = serialdump::Acquisition::new(4).run(&mut reader, &AtomicBool::new(false));
});
