use phf::phf_map;

pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "var" => TokenKind::Var,
    "array" => TokenKind::Array,
    "of" => TokenKind::Of,
    "begin" => TokenKind::Begin,
    "end" => TokenKind::End,
    "if" => TokenKind::If,
    "then" => TokenKind::Then,
    "else" => TokenKind::Else,
    "while" => TokenKind::While,
    "do" => TokenKind::Do,
    "for" => TokenKind::For,
    "to" => TokenKind::To,
    "return" => TokenKind::Return,
    "print" => TokenKind::Print,
    "read" => TokenKind::Read,
    "true" => TokenKind::True,
    "false" => TokenKind::False,
    "and" => TokenKind::And,
    "or" => TokenKind::Or,
    "not" => TokenKind::Not,
    "mod" => TokenKind::Mod,
    "integer" => TokenKind::IntegerType,
    "real" => TokenKind::RealType,
    "boolean" => TokenKind::BooleanType,
    "string" => TokenKind::StringType,
};

pub static TWO_SYMBOLS_TOKENS: phf::Map<&'static str, TokenKind> = phf_map! {
    ":=" => TokenKind::Assign,
    "<=" => TokenKind::LessEqual,
    ">=" => TokenKind::GreaterEqual,
    "<>" => TokenKind::NotEqual,
};

pub static ONE_SYMBOL_TOKENS: phf::Map<char, TokenKind> = phf_map! {
    ',' => TokenKind::Comma,
    ';' => TokenKind::SemiColon,
    ':' => TokenKind::Colon,
    '(' => TokenKind::LeftParen,
    ')' => TokenKind::RightParen,
    '[' => TokenKind::LeftSquareBrace,
    ']' => TokenKind::RightSquareBrace,
    '+' => TokenKind::Plus,
    '-' => TokenKind::Minus,
    '*' => TokenKind::Star,
    '/' => TokenKind::Slash,
    '<' => TokenKind::LessThan,
    '>' => TokenKind::GreaterThan,
    '=' => TokenKind::Equal,
};

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Ident(String),
    /// Decimal text, octal literals already converted.
    Integer(String),
    Real(String),
    /// Contents without the surrounding quotes.
    Str(String),

    Var,
    Array,
    Of,
    Begin,
    End,
    If,
    Then,
    Else,
    While,
    Do,
    For,
    To,
    Return,
    Print,
    Read,
    True,
    False,
    And,
    Or,
    Not,
    Mod,
    IntegerType,
    RealType,
    BooleanType,
    StringType,

    Comma,
    SemiColon,
    Colon,
    LeftParen,
    RightParen,
    LeftSquareBrace,
    RightSquareBrace,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Equal,
    NotEqual,
}
