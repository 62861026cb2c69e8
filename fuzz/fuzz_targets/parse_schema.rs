#![no_main]

use codecmp::Schema;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(schema) = Schema::parse(text) {
            let _ = schema.batch_layout("Employees");
        }
    }
});
