use crate::common::{Error, Result};
use crate::errinput;
use std::iter::Peekable;
use std::str::Chars;

/// Prefix of errors for input that ends inside a string or comment.
const UNTERMINATED: &str = "unterminated";

/// A lexical token.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// A numeric literal, kept as the original text.
    Number(String),
    /// A string literal, with escapes resolved.
    String(String),
    /// An identifier, e.g. `db`, `sales`, `$match`, `_id`.
    Ident(String),
    Period,
    Comma,
    Colon,
    Semicolon,
    Minus,
    Plus,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Number(n) => n.as_str(),
            Self::String(s) => return write!(f, "'{}'", s.escape_debug()),
            Self::Ident(s) => s.as_str(),
            Self::Period => ".",
            Self::Comma => ",",
            Self::Colon => ":",
            Self::Semicolon => ";",
            Self::Minus => "-",
            Self::Plus => "+",
            Self::OpenParen => "(",
            Self::CloseParen => ")",
            Self::OpenBracket => "[",
            Self::CloseBracket => "]",
            Self::OpenBrace => "{",
            Self::CloseBrace => "}",
        })
    }
}

/// The lexer splits shell input into tokens, skipping whitespace and
/// comments. It is an iterator of `Result<Token>`.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Result<Token>> {
        match self.scan() {
            Ok(Some(token)) => Some(Ok(token)),
            // If there's no token but there's still input, it's unexpected.
            Ok(None) => self
                .chars
                .peek()
                .map(|c| errinput!("unexpected character {c}")),
            Err(err) => Some(Err(err)),
        }
    }
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Lexer<'a> {
        Lexer {
            chars: input.chars().peekable(),
        }
    }

    /// Returns the next character if it satisfies the predicate.
    fn next_if(&mut self, predicate: impl Fn(char) -> bool) -> Option<char> {
        self.chars.peek().filter(|&&c| predicate(c))?;
        self.chars.next()
    }

    /// Consumes characters while they satisfy the predicate.
    fn next_while(&mut self, predicate: impl Fn(char) -> bool) -> Option<String> {
        let mut value = String::new();
        while let Some(c) = self.next_if(&predicate) {
            value.push(c);
        }
        Some(value).filter(|v| !v.is_empty())
    }

    /// Consumes the next character if it is the given one.
    fn next_is(&mut self, c: char) -> bool {
        self.next_if(|n| n == c).is_some()
    }

    /// Scans the next token, if any.
    fn scan(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace_and_comments()?;
        match self.chars.peek() {
            Some('\'' | '"') => self.scan_string(),
            Some(c) if c.is_ascii_digit() => Ok(self.scan_number()),
            Some(c) if is_ident_start(*c) => Ok(self.scan_ident()),
            Some(_) => Ok(self.scan_symbol()),
            None => Ok(None),
        }
    }

    /// Skips whitespace as well as `//` and `/* */` comments.
    fn skip_whitespace_and_comments(&mut self) -> Result<()> {
        loop {
            self.next_while(|c| c.is_whitespace());
            let mut lookahead = self.chars.clone();
            match (lookahead.next(), lookahead.next()) {
                (Some('/'), Some('/')) => {
                    self.next_while(|c| c != '\n');
                }
                (Some('/'), Some('*')) => {
                    self.chars.next();
                    self.chars.next();
                    let mut previous = None;
                    loop {
                        match self.chars.next() {
                            Some('/') if previous == Some('*') => break,
                            Some(c) => previous = Some(c),
                            None => return errinput!("{UNTERMINATED} comment"),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Scans an identifier. `$` and `_` count as letters.
    fn scan_ident(&mut self) -> Option<Token> {
        let mut name = self.next_if(is_ident_start)?.to_string();
        while let Some(c) = self.next_if(|c| is_ident_start(c) || c.is_ascii_digit()) {
            name.push(c);
        }
        Some(Token::Ident(name))
    }

    /// Scans a number: digits, an optional fraction, and an optional exponent.
    fn scan_number(&mut self) -> Option<Token> {
        let mut number = self.next_while(|c| c.is_ascii_digit())?;
        if self.next_is('.') {
            number.push('.');
            while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
                number.push(c);
            }
        }
        if let Some(exp) = self.next_if(|c| c == 'e' || c == 'E') {
            number.push(exp);
            if let Some(sign) = self.next_if(|c| c == '+' || c == '-') {
                number.push(sign);
            }
            while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
                number.push(c);
            }
        }
        Some(Token::Number(number))
    }

    /// Scans a single- or double-quoted string, resolving backslash escapes.
    fn scan_string(&mut self) -> Result<Option<Token>> {
        let Some(quote) = self.next_if(|c| c == '\'' || c == '"') else {
            return Ok(None);
        };
        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some(c) if c == quote => break,
                Some('\\') => match self.chars.next() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('0') => value.push('\0'),
                    Some('u') => value.push(self.scan_unicode_escape()?),
                    Some(c) => value.push(c),
                    None => return errinput!("{UNTERMINATED} string"),
                },
                Some(c) => value.push(c),
                None => return errinput!("{UNTERMINATED} string"),
            }
        }
        Ok(Some(Token::String(value)))
    }

    /// Scans the four hex digits of a \uXXXX escape.
    fn scan_unicode_escape(&mut self) -> Result<char> {
        let mut hex = String::new();
        for _ in 0..4 {
            match self.next_if(|c| c.is_ascii_hexdigit()) {
                Some(c) => hex.push(c),
                None => return errinput!("invalid unicode escape \\u{hex}"),
            }
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .map_or_else(|| errinput!("invalid unicode escape \\u{hex}"), Ok)
    }

    /// Scans a single-character symbol.
    fn scan_symbol(&mut self) -> Option<Token> {
        let token = match self.chars.peek()? {
            '.' => Token::Period,
            ',' => Token::Comma,
            ':' => Token::Colon,
            ';' => Token::Semicolon,
            '-' => Token::Minus,
            '+' => Token::Plus,
            '(' => Token::OpenParen,
            ')' => Token::CloseParen,
            '[' => Token::OpenBracket,
            ']' => Token::CloseBracket,
            '{' => Token::OpenBrace,
            '}' => Token::CloseBrace,
            _ => return None,
        };
        self.chars.next();
        Some(token)
    }
}

/// Returns true if the character can start an identifier.
fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

/// Returns true if the input ends inside an open bracket, string, or comment,
/// i.e. the shell should keep reading lines before executing it.
pub fn is_incomplete(input: &str) -> bool {
    let mut depth = 0i32;
    for token in Lexer::new(input) {
        match token {
            Ok(Token::OpenParen | Token::OpenBracket | Token::OpenBrace) => depth += 1,
            Ok(Token::CloseParen | Token::CloseBracket | Token::CloseBrace) => depth -= 1,
            Ok(_) => {}
            Err(Error::InvalidInput(msg)) => return msg.starts_with(UNTERMINATED),
            Err(_) => return false,
        }
    }
    depth > 0
}
