use crate::parser::{Location, ParseError};

use super::{TokenKind, KEYWORDS, ONE_SYMBOL_TOKENS, TWO_SYMBOLS_TOKENS};

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
}

#[derive(Debug)]
pub struct Lexer {
    chars: Vec<char>,
    tokens: Vec<Token>,
    index: usize,
    line: u32,
    col: u32,
}

impl Lexer {
    fn new(s: &str) -> Self {
        Self {
            chars: s.chars().collect(),
            tokens: vec![],
            index: 0,
            line: 1,
            col: 1,
        }
    }

    fn location(&self) -> Location {
        Location::new(self.line, self.col)
    }

    fn peek(&self, n: usize) -> Option<char> {
        self.chars.get(self.index + n).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.index += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn take_while(&mut self, f: impl Fn(char) -> bool) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek(0).filter(|&c| f(c)) {
            s.push(c);
            self.advance();
        }
        s
    }

    fn new_token(&mut self, kind: TokenKind, location: Location) {
        self.tokens.push(Token { kind, location });
    }

    fn skip_comment(&mut self) -> Result<(), ParseError> {
        let start = self.location();
        if self.peek(1) == Some('/') {
            self.take_while(|c| c != '\n');
            return Ok(());
        }

        self.advance();
        self.advance();
        loop {
            match (self.peek(0), self.peek(1)) {
                (Some('*'), Some('/')) => {
                    self.advance();
                    self.advance();
                    return Ok(());
                }
                (Some(_), _) => {
                    self.advance();
                }
                (None, _) => return Err(ParseError::new(start, "unterminated comment")),
            }
        }
    }

    fn parse_number(&mut self) -> Result<(), ParseError> {
        let location = self.location();
        let mut s = self.take_while(|c| c.is_ascii_digit());
        let mut is_real = false;

        if self.peek(0) == Some('.') && self.peek(1).is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            s.push('.');
            s += &self.take_while(|c| c.is_ascii_digit());
            is_real = true;
        }
        if matches!(self.peek(0), Some('e' | 'E')) {
            let sign = matches!(self.peek(1), Some('+' | '-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                s.push('E');
                self.advance();
                if sign {
                    s.extend(self.advance());
                }
                s += &self.take_while(|c| c.is_ascii_digit());
                is_real = true;
            }
        }

        if is_real {
            self.new_token(TokenKind::Real(s), location);
            return Ok(());
        }

        let value = if s.len() > 1 && s.starts_with('0') {
            i64::from_str_radix(&s[1..], 8)
        } else {
            s.parse()
        }
        .map_err(|_| ParseError::new(location, format!("invalid integer literal '{}'", s)))?;
        self.new_token(TokenKind::Integer(value.to_string()), location);
        Ok(())
    }

    fn parse_identifier(&mut self) {
        let location = self.location();
        let s = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');

        if let Some(kind) = KEYWORDS.get(s.as_str()) {
            self.new_token(kind.clone(), location);
        } else {
            self.new_token(TokenKind::Ident(s), location);
        }
    }

    fn parse_string(&mut self) -> Result<(), ParseError> {
        let location = self.location();
        self.advance();
        let mut s = String::new();
        loop {
            match self.advance() {
                Some('"') if self.peek(0) == Some('"') => {
                    self.advance();
                    s.push('"');
                }
                Some('"') => break,
                Some('\n') | None => {
                    return Err(ParseError::new(location, "unterminated string literal"))
                }
                Some(c) => s.push(c),
            }
        }
        self.new_token(TokenKind::Str(s), location);
        Ok(())
    }

    fn _tokenize(&mut self) -> Result<(), ParseError> {
        while let Some(c) = self.peek(0) {
            let location = self.location();
            let c2: String = self.chars[self.index..].iter().take(2).collect();

            if c.is_whitespace() {
                self.advance();
            } else if c2 == "//" || c2 == "/*" {
                self.skip_comment()?;
            } else if c.is_ascii_digit() {
                self.parse_number()?;
            } else if c.is_ascii_alphabetic() {
                self.parse_identifier();
            } else if c == '"' {
                self.parse_string()?;
            } else if let Some(kind) = TWO_SYMBOLS_TOKENS.get(c2.as_str()) {
                self.new_token(kind.clone(), location);
                self.advance();
                self.advance();
            } else if let Some(kind) = ONE_SYMBOL_TOKENS.get(&c) {
                self.new_token(kind.clone(), location);
                self.advance();
            } else {
                return Err(ParseError::new(
                    location,
                    format!("unexpected character '{}'", c),
                ));
            }
        }
        Ok(())
    }

    pub fn tokenize(s: &str) -> Result<Vec<Token>, ParseError> {
        let mut lexer = Lexer::new(s);
        lexer._tokenize()?;

        Ok(lexer.tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(s: &str) -> Vec<TokenKind> {
        Lexer::tokenize(s)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_keywords_and_symbols() {
        assert_eq!(
            kinds("var a: array 3 of integer;"),
            vec![
                TokenKind::Var,
                TokenKind::Ident("a".to_string()),
                TokenKind::Colon,
                TokenKind::Array,
                TokenKind::Integer("3".to_string()),
                TokenKind::Of,
                TokenKind::IntegerType,
                TokenKind::SemiColon,
            ]
        );
        assert_eq!(
            kinds("a := b <> c <= d"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Assign,
                TokenKind::Ident("b".to_string()),
                TokenKind::NotEqual,
                TokenKind::Ident("c".to_string()),
                TokenKind::LessEqual,
                TokenKind::Ident("d".to_string()),
            ]
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(kinds("017"), vec![TokenKind::Integer("15".to_string())]);
        assert_eq!(kinds("3.25"), vec![TokenKind::Real("3.25".to_string())]);
        assert_eq!(kinds("1.5e-3"), vec![TokenKind::Real("1.5E-3".to_string())]);
        assert!(Lexer::tokenize("09").is_err());
    }

    #[test]
    fn strings_and_comments() {
        assert_eq!(
            kinds("// line\nprint \"say \"\"hi\"\"\"; /* block\n */"),
            vec![
                TokenKind::Print,
                TokenKind::Str("say \"hi\"".to_string()),
                TokenKind::SemiColon,
            ]
        );
    }

    #[test]
    fn tracks_locations() {
        let tokens = Lexer::tokenize("a;\n  b").unwrap();
        assert_eq!(tokens[0].location, Location::new(1, 1));
        assert_eq!(tokens[1].location, Location::new(1, 2));
        assert_eq!(tokens[2].location, Location::new(2, 3));
    }
}
