use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::span::Span;

/// Callback receiving every error a pass reports, in the order found.
pub type Reporter<'r> = &'r mut dyn FnMut(&RsError);

/// Which stage of the engine an error belongs to, derived from its code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorClass {
    Lexical,
    Syntax,
    Semantic,
    ValueClass,
    Runtime,
}

/// Stable error codes. The `0x8000` bit marks critical errors; everything
/// without it is advisory and never fails a check on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    // lexical
    UnknownSymbol,

    // syntax
    UnknownSyntax,
    MissingParenthesis,
    MissingCurlyBrace,
    MissingSquareBracket,
    InvalidQuantifier,
    InvalidImperative,
    UnexpectedEnd,
    ExpectedArgDeclaration,
    ExpectedLocal,
    NestingTooDeep,
    PredicateChain,

    // advisory
    LocalReused,
    LocalNotUsed,

    // semantic
    LocalUndeclared,
    LocalShadowing,
    TypesNotEqual,
    GlobalNotTyped,
    InvalidDecart,
    InvalidBoolean,
    InvalidTypeOperation,
    InvalidCard,
    InvalidDebool,
    GlobalFuncMissing,
    GlobalFuncWithoutArgs,
    LocalDoubleDeclare,
    LocalOutOfScope,
    InvalidReduce,
    InvalidProjectionTuple,
    InvalidProjectionSet,
    InvalidEnumeration,
    InvalidBinding,
    InvalidElementPredicate,
    InvalidEmptySetUsage,
    InvalidArgsArity,
    InvalidArgumentType,
    GlobalStructure,
    RadicalUsage,
    InvalidFilterArgumentType,
    InvalidFilterArity,
    ArithmeticNotSupported,
    TypesNotCompatible,
    OrderingNotSupported,
    UnexpectedExpressionType,
    ExpectedLogic,
    ExpectedTyped,
    InvalidTypification,

    // value class
    InvalidPropertyUsage,
    GlobalNoValue,

    // runtime
    ValueIterationsLimit,
    ValueTypedOverflow,
    ValueBooleanLimit,
    ValueInvalidDebool,
    ValueIterateInfinity,
    ValueGlobalMissing,
    ValueFunctionMissing,
    ValueArithmeticOverflow,
}

impl ErrorCode {
    pub fn code(self) -> u32 {
        use ErrorCode::*;
        match self {
            UnknownSymbol => 0x8201,

            UnknownSyntax => 0x8400,
            MissingParenthesis => 0x8406,
            MissingCurlyBrace => 0x8407,
            InvalidQuantifier => 0x8408,
            InvalidImperative => 0x8409,
            MissingSquareBracket => 0x840A,
            UnexpectedEnd => 0x840B,
            ExpectedArgDeclaration => 0x8414,
            ExpectedLocal => 0x8415,
            NestingTooDeep => 0x8416,
            PredicateChain => 0x8417,

            LocalReused => 0x2801,
            LocalNotUsed => 0x2802,

            LocalUndeclared => 0x8801,
            LocalShadowing => 0x8802,
            TypesNotEqual => 0x8803,
            GlobalNotTyped => 0x8804,
            InvalidDecart => 0x8805,
            InvalidBoolean => 0x8806,
            InvalidTypeOperation => 0x8807,
            InvalidCard => 0x8808,
            InvalidDebool => 0x8809,
            GlobalFuncMissing => 0x880A,
            GlobalFuncWithoutArgs => 0x880B,
            LocalDoubleDeclare => 0x880C,
            LocalOutOfScope => 0x880D,
            InvalidReduce => 0x8810,
            InvalidProjectionTuple => 0x8811,
            InvalidProjectionSet => 0x8812,
            InvalidEnumeration => 0x8813,
            InvalidBinding => 0x8814,
            InvalidElementPredicate => 0x8816,
            InvalidEmptySetUsage => 0x8817,
            InvalidArgsArity => 0x8818,
            InvalidArgumentType => 0x8819,
            GlobalStructure => 0x881C,
            RadicalUsage => 0x8821,
            InvalidFilterArgumentType => 0x8822,
            InvalidFilterArity => 0x8823,
            ArithmeticNotSupported => 0x8824,
            TypesNotCompatible => 0x8825,
            OrderingNotSupported => 0x8826,
            UnexpectedExpressionType => 0x8827,
            ExpectedLogic => 0x8828,
            ExpectedTyped => 0x8829,
            InvalidTypification => 0x882A,

            InvalidPropertyUsage => 0x8A01,
            GlobalNoValue => 0x8A02,

            ValueIterationsLimit => 0x8C01,
            ValueTypedOverflow => 0x8C02,
            ValueBooleanLimit => 0x8C03,
            ValueInvalidDebool => 0x8C04,
            ValueIterateInfinity => 0x8C05,
            ValueGlobalMissing => 0x8C06,
            ValueFunctionMissing => 0x8C07,
            ValueArithmeticOverflow => 0x8C08,
        }
    }

    pub fn is_critical(self) -> bool {
        self.code() & 0x8000 != 0
    }

    pub fn class(self) -> ErrorClass {
        match self.code() & 0x7F00 {
            0x0200 => ErrorClass::Lexical,
            0x0400 => ErrorClass::Syntax,
            0x0A00 => ErrorClass::ValueClass,
            0x0C00 => ErrorClass::Runtime,
            _ => ErrorClass::Semantic,
        }
    }
}

/// A structured engine error: a stable code, a byte offset into the checked
/// source and the parameters its message is formatted from.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{}", self.message())]
pub struct RsError {
    pub code: ErrorCode,
    pub position: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
}

impl RsError {
    pub fn new(code: ErrorCode, position: usize) -> Self {
        Self { code, position, params: Vec::new() }
    }

    pub fn at(code: ErrorCode, span: Span) -> Self {
        Self::new(code, span.start)
    }

    pub fn with_params(code: ErrorCode, span: Span, params: Vec<String>) -> Self {
        Self { code, position: span.start, params }
    }

    pub fn with_param(code: ErrorCode, span: Span, param: impl Into<String>) -> Self {
        Self::with_params(code, span, vec![param.into()])
    }

    pub fn is_critical(&self) -> bool {
        self.code.is_critical()
    }

    fn param(&self, index: usize) -> &str {
        self.params.get(index).map(String::as_str).unwrap_or("?")
    }

    /// Human-readable message for this error.
    pub fn message(&self) -> String {
        use ErrorCode::*;
        let p = |i| self.param(i);
        match self.code {
            UnknownSymbol => format!("unknown symbol '{}'", p(0)),
            UnknownSyntax => format!("unexpected {}", p(0)),
            MissingParenthesis => "missing closing parenthesis".to_string(),
            MissingCurlyBrace => "missing closing curly brace".to_string(),
            MissingSquareBracket => "missing closing square bracket".to_string(),
            InvalidQuantifier => "invalid quantifier declaration".to_string(),
            InvalidImperative => "invalid imperative expression".to_string(),
            UnexpectedEnd => "unexpected end of expression".to_string(),
            ExpectedArgDeclaration => "expected argument declaration".to_string(),
            ExpectedLocal => format!("expected local identifier, found {}", p(0)),
            NestingTooDeep => format!("expression is nested deeper than {} levels", p(0)),
            PredicateChain => format!("predicates cannot be chained, parenthesize before '{}'", p(0)),

            LocalReused => format!("local '{}' is declared again", p(0)),
            LocalNotUsed => format!("local '{}' is never used", p(0)),

            LocalUndeclared => format!("undeclared local '{}'", p(0)),
            LocalShadowing => format!("local '{}' shadows a local of an enclosing scope", p(0)),
            TypesNotEqual => format!("types are not equal: {} and {}", p(0), p(1)),
            GlobalNotTyped => format!("global '{}' has no typification", p(0)),
            InvalidDecart => format!("cartesian product requires set operands, found {}", p(0)),
            InvalidBoolean => format!("boolean requires a set operand, found {}", p(0)),
            InvalidTypeOperation => format!("operation is not applicable to {}", p(0)),
            InvalidCard => format!("card requires a set operand, found {}", p(0)),
            InvalidDebool => format!("debool requires a set operand, found {}", p(0)),
            GlobalFuncMissing => format!("function '{}' is not defined", p(0)),
            GlobalFuncWithoutArgs => format!("'{}' is used without arguments", p(0)),
            LocalDoubleDeclare => format!("local '{}' is declared twice in one binding", p(0)),
            LocalOutOfScope => format!("local '{}' is used outside of its scope", p(0)),
            InvalidReduce => format!("red requires a set of sets, found {}", p(0)),
            InvalidProjectionTuple => format!("projection {} is not applicable to {}", p(0), p(1)),
            InvalidProjectionSet => format!("set projection {} is not applicable to {}", p(0), p(1)),
            InvalidEnumeration => format!("enumeration elements have different types: {} and {}", p(0), p(1)),
            InvalidBinding => format!("cannot bind locals to elements of {}", p(0)),
            InvalidElementPredicate => format!("{} cannot be an element of {}", p(0), p(1)),
            InvalidEmptySetUsage => "empty set is not allowed here".to_string(),
            InvalidArgsArity => format!("expected {} arguments, found {}", p(0), p(1)),
            InvalidArgumentType => format!("argument {}: expected {}, found {}", p(0), p(1), p(2)),
            GlobalStructure => format!("expected a set-valued expression, found {}", p(0)),
            RadicalUsage => format!("radical '{}' is only allowed in argument declarations", p(0)),
            InvalidFilterArgumentType => format!("filter {} is not applicable to {}", p(0), p(1)),
            InvalidFilterArity => format!("filter expects {} parameters, found {}", p(0), p(1)),
            ArithmeticNotSupported => format!("arithmetic is not supported for {}", p(0)),
            TypesNotCompatible => format!("types are not compatible: {} and {}", p(0), p(1)),
            OrderingNotSupported => format!("ordering is not supported for {}", p(0)),
            UnexpectedExpressionType => format!("expected {}, found {}", p(0), p(1)),
            ExpectedLogic => format!("expected a logical expression, found {}", p(0)),
            ExpectedTyped => "expected a typed expression, found Logic".to_string(),
            InvalidTypification => format!("'{}' is not a typification", p(0)),

            InvalidPropertyUsage => "property cannot be used where a value is required".to_string(),
            GlobalNoValue => format!("global '{}' has no value class", p(0)),

            ValueIterationsLimit => format!("iterations limit of {} exceeded", p(0)),
            ValueTypedOverflow => format!("set cardinality exceeds the limit of {}", p(0)),
            ValueBooleanLimit => format!("boolean of a set larger than {} elements", p(0)),
            ValueInvalidDebool => format!("debool of a set with {} elements", p(0)),
            ValueIterateInfinity => "cannot iterate an infinite set".to_string(),
            ValueGlobalMissing => format!("global '{}' has no value", p(0)),
            ValueFunctionMissing => format!("no definition for '{}'", p(0)),
            ValueArithmeticOverflow => "integer overflow".to_string(),
        }
    }
}

/// Render an RsError with ariadne for terminal output.
pub fn render_error(source: &str, err: &RsError) {
    use ariadne::{Label, Report, ReportKind, Source};

    // ariadne counts characters, positions are bytes
    let start = source.get(..err.position).map(|s| s.chars().count()).unwrap_or(0);
    let end = start + usize::from(err.position < source.len());
    let kind = if err.is_critical() { ReportKind::Error } else { ReportKind::Warning };
    let class = match err.code.class() {
        ErrorClass::Lexical => "lexical",
        ErrorClass::Syntax => "syntax",
        ErrorClass::Semantic => "semantic",
        ErrorClass::ValueClass => "value class",
        ErrorClass::Runtime => "evaluation",
    };

    let _ = Report::build(kind, (), start)
        .with_code(format!("{:#06X}", err.code.code()))
        .with_message(format!("{class} error"))
        .with_label(Label::new(start..end).with_message(err.message()))
        .finish()
        .eprint(Source::from(source));
}
