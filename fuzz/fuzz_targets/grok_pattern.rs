#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use logship_pipeline::PatternResolver;

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    expression: &'a str,
    text: &'a str,
}

fuzz_target!(|input: Input<'_>| {
    let resolver = PatternResolver::new();
    // 해석 실패는 에러로 보고되어야 하며 panic이 아니어야 합니다.
    if let Ok(pattern) = resolver.resolve(input.expression) {
        let _ = pattern.captures(input.text);
    }
});
