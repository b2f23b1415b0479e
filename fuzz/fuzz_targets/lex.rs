#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // arbitrary text must lex without panicking
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = rslang::lexer::lex(s);
    }
});
