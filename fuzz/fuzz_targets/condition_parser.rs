#![no_main]

use libfuzzer_sys::fuzz_target;
use logship_core::event::Event;
use logship_pipeline::Condition;

fuzz_target!(|data: &[u8]| {
    if let Ok(expression) = std::str::from_utf8(data) {
        if let Ok(condition) = Condition::parse(expression) {
            let mut event = Event::new();
            event.insert("status", "200");
            event.insert("count", 3i64);
            let _ = condition.evaluate(&event);
        }
    }
});
