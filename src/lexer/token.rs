use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\u{00A0}]+")]
pub enum Token {
    // Identifiers
    #[regex(r"[XCSDATFP][0-9]+")]
    Global,
    #[regex(r"R[0-9]+")]
    Radical,
    #[regex(r"[a-zα-ω][a-zA-Z0-9_α-ω]*", priority = 1)]
    Local,

    // Literals
    #[regex(r"[0-9]+")]
    Integer,
    #[token("Z")]
    IntegerSet,
    #[token("∅")]
    EmptySet,

    // Logic
    #[token("¬")]
    Not,
    #[token("&")]
    And,
    #[token("∨")]
    Or,
    #[token("⇒")]
    Implies,
    #[token("⇔")]
    Equiv,
    #[token("∀")]
    Forall,
    #[token("∃")]
    Exists,

    // Predicates
    #[token("=")]
    Eq,
    #[token("≠")]
    NotEq,
    #[token("∈")]
    In,
    #[token("∉")]
    NotIn,
    #[token("⊆")]
    SubsetOrEq,
    #[token("⊂")]
    Subset,
    #[token("⊄")]
    NotSubset,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("≤")]
    LtEq,
    #[token("≥")]
    GtEq,

    // Set operators
    #[token("∪")]
    Union,
    #[token("∩")]
    Intersection,
    #[token("\\")]
    #[token("∖")]
    SetMinus,
    #[token("∆")]
    SymDiff,
    #[token("×")]
    Decart,
    #[token("ℬ")]
    Boolean,

    // Arithmetic
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,

    // Text operators
    #[token("card")]
    Card,
    #[token("bool")]
    Bool,
    #[token("debool")]
    Debool,
    #[token("red")]
    Red,
    #[regex(r"pr[1-9][0-9]*(,[1-9][0-9]*)*")]
    SmallPr,
    #[regex(r"Pr[1-9][0-9]*(,[1-9][0-9]*)*")]
    BigPr,
    #[regex(r"Fi[1-9][0-9]*(,[1-9][0-9]*)*")]
    Filter,

    // Constructors
    #[token("D{")]
    DeclarativeOpen,
    #[token("I{")]
    ImperativeOpen,
    #[token("R{")]
    RecursionOpen,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token("|")]
    Bar,
    #[token(":=")]
    Assign,
    #[token(":∈")]
    IterateIn,
}

impl Token {
    /// Tokens that open a bracketed group closed by `)`, `]` or `}`.
    pub fn is_opener(self) -> bool {
        matches!(
            self,
            Token::LParen
                | Token::LBracket
                | Token::LBrace
                | Token::DeclarativeOpen
                | Token::ImperativeOpen
                | Token::RecursionOpen
        )
    }

    pub fn is_closer(self) -> bool {
        matches!(self, Token::RParen | Token::RBracket | Token::RBrace)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Global => write!(f, "global identifier"),
            Token::Radical => write!(f, "radical"),
            Token::Local => write!(f, "local identifier"),
            Token::Integer => write!(f, "integer"),
            Token::IntegerSet => write!(f, "Z"),
            Token::EmptySet => write!(f, "∅"),
            Token::Not => write!(f, "¬"),
            Token::And => write!(f, "&"),
            Token::Or => write!(f, "∨"),
            Token::Implies => write!(f, "⇒"),
            Token::Equiv => write!(f, "⇔"),
            Token::Forall => write!(f, "∀"),
            Token::Exists => write!(f, "∃"),
            Token::Eq => write!(f, "="),
            Token::NotEq => write!(f, "≠"),
            Token::In => write!(f, "∈"),
            Token::NotIn => write!(f, "∉"),
            Token::SubsetOrEq => write!(f, "⊆"),
            Token::Subset => write!(f, "⊂"),
            Token::NotSubset => write!(f, "⊄"),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::LtEq => write!(f, "≤"),
            Token::GtEq => write!(f, "≥"),
            Token::Union => write!(f, "∪"),
            Token::Intersection => write!(f, "∩"),
            Token::SetMinus => write!(f, "\\"),
            Token::SymDiff => write!(f, "∆"),
            Token::Decart => write!(f, "×"),
            Token::Boolean => write!(f, "ℬ"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Card => write!(f, "card"),
            Token::Bool => write!(f, "bool"),
            Token::Debool => write!(f, "debool"),
            Token::Red => write!(f, "red"),
            Token::SmallPr => write!(f, "projection"),
            Token::BigPr => write!(f, "set projection"),
            Token::Filter => write!(f, "filter"),
            Token::DeclarativeOpen => write!(f, "D{{"),
            Token::ImperativeOpen => write!(f, "I{{"),
            Token::RecursionOpen => write!(f, "R{{"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::Bar => write!(f, "|"),
            Token::Assign => write!(f, ":="),
            Token::IterateIn => write!(f, ":∈"),
        }
    }
}
