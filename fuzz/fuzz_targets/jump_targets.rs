#![no_main]

use libfuzzer_sys::fuzz_target;
use il2scope::xref::jump_targets;

fuzz_target!(|data: &[u8]| {
    for bitness in [32, 64] {
        if let Ok(targets) = jump_targets(data, bitness, 0x1000_0000) {
            for _ in targets {}
        }
    }
});
