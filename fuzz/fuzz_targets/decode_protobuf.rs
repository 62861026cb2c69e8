#![no_main]

use codecmp::formats::Codec;
use codecmp::ProtobufCodec;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let codec = ProtobufCodec::with_default_schema().expect("built-in schema");
    // Anything that decodes must re-encode and decode to the same batch.
    if let Ok(batch) = codec.decode(data) {
        if let Ok(bytes) = codec.encode(&batch) {
            assert_eq!(codec.decode(&bytes).expect("re-decode"), batch);
        }
    }
});
