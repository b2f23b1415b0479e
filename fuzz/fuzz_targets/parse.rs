#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rslang::{CheckOptions, Engine};

/// Source fragments; sequences of them are mostly near-valid expressions.
#[derive(Arbitrary, Debug)]
enum Fragment {
    Base,
    Structure,
    Local,
    Integer,
    Empty,
    Union,
    Minus,
    Product,
    Power,
    In,
    Eq,
    And,
    Forall,
    Card,
    Projection,
    Declarative,
    Imperative,
    Recursion,
    Open,
    Close,
    OpenBrace,
    CloseBrace,
    Comma,
    Bar,
    Semicolon,
    Assign,
    Iterate,
}

impl Fragment {
    fn text(&self) -> &'static str {
        match self {
            Fragment::Base => "X1",
            Fragment::Structure => "S1",
            Fragment::Local => "a",
            Fragment::Integer => "2",
            Fragment::Empty => "∅",
            Fragment::Union => "∪",
            Fragment::Minus => "\\",
            Fragment::Product => "×",
            Fragment::Power => "ℬ",
            Fragment::In => "∈",
            Fragment::Eq => "=",
            Fragment::And => "&",
            Fragment::Forall => "∀",
            Fragment::Card => "card",
            Fragment::Projection => "Pr1",
            Fragment::Declarative => "D{",
            Fragment::Imperative => "I{",
            Fragment::Recursion => "R{",
            Fragment::Open => "(",
            Fragment::Close => ")",
            Fragment::OpenBrace => "{",
            Fragment::CloseBrace => "}",
            Fragment::Comma => ",",
            Fragment::Bar => "|",
            Fragment::Semicolon => ";",
            Fragment::Assign => ":=",
            Fragment::Iterate => ":∈",
        }
    }
}

fuzz_target!(|fragments: Vec<Fragment>| {
    let source = fragments.iter().map(Fragment::text).collect::<Vec<_>>().join(" ");

    let mut engine = Engine::default();
    engine.add_base("X1", false);
    if let Ok(value) = engine.parse_value("{1, 2}") {
        engine.set_value("X1", value);
    }

    // none of the stages may panic, whatever the input
    let _ = engine.check(&source, CheckOptions::default());
    let _ = engine.calculate(&source);
});
