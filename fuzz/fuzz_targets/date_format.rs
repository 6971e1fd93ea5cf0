#![no_main]

use arbitrary::Arbitrary;
use chrono::{FixedOffset, Offset, Utc};
use libfuzzer_sys::fuzz_target;
use logship_pipeline::filter::date::{JodaFormat, parse_free_form, parse_offset};

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    pattern: &'a str,
    text: &'a str,
}

fuzz_target!(|input: Input<'_>| {
    let utc: FixedOffset = Utc.fix();
    let _ = parse_offset(input.pattern);
    let _ = parse_free_form(input.text, utc);
    if let Ok(format) = JodaFormat::compile(input.pattern) {
        let _ = format.parse(input.text, utc);
    }
});
