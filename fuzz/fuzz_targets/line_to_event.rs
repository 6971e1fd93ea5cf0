#![no_main]

use libfuzzer_sys::fuzz_target;
use logship_pipeline::{IngestTags, collector::line_to_event};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let tags = IngestTags::new(Some("fuzz".to_owned()), "fuzz-host");
    if let Some(event) = line_to_event(&text, &tags) {
        let _ = event.to_json_string();
    }
});
