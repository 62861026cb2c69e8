#![no_main]

use codecmp::formats::Codec;
use codecmp::XmlCodec;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = XmlCodec::new().decode(data);
});
