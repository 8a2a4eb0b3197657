use super::ast::{Call, Statement};
use super::{Lexer, Token};
use crate::common::Result;
use crate::errinput;
use crate::types::{Document, Value};
use std::iter::Peekable;

/// The shell parser takes tokens from the lexer and parses the shell syntax
/// into a sequence of statements.
pub struct Parser<'a> {
    lexer: Peekable<Lexer<'a>>,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given raw input.
    pub fn new(input: &'a str) -> Parser<'a> {
        Parser {
            lexer: Lexer::new(input).peekable(),
        }
    }

    /// Parses the input into statements. Statements may be separated by
    /// semicolons, which are otherwise optional.
    pub fn parse(&mut self) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        loop {
            while self.next_is(Token::Semicolon) {}
            if self.peek()?.is_none() {
                return Ok(statements);
            }
            statements.push(self.parse_statement()?);
        }
    }

    /// Fetches the next lexer token, or errors if none is found.
    fn next(&mut self) -> Result<Token> {
        self.lexer
            .next()
            .transpose()?
            .map_or_else(|| errinput!("unexpected end of input"), Ok)
    }

    /// Returns the next identifier, or errors if not found.
    fn next_ident(&mut self) -> Result<String> {
        match self.next()? {
            Token::Ident(ident) => Ok(ident),
            token => errinput!("expected identifier, got {token}"),
        }
    }

    /// Passes the next lexer token through the closure, consuming it if the
    /// closure returns Some. Returns the result of the closure.
    fn next_if_map<T>(&mut self, f: impl Fn(&Token) -> Option<T>) -> Option<T> {
        let value = self.lexer.peek().and_then(|r| r.as_ref().ok()).and_then(f)?;
        self.lexer.next();
        Some(value)
    }

    /// Consumes the next lexer token if it is the given token, returning true.
    fn next_is(&mut self, token: Token) -> bool {
        self.next_if_map(|t| (*t == token).then_some(())).is_some()
    }

    /// Consumes the next lexer token if it's the expected token, or errors.
    fn expect(&mut self, expect: Token) -> Result<()> {
        let token = self.next()?;
        if token != expect {
            return errinput!("expected token {expect}, found {token}");
        }
        Ok(())
    }

    /// Peeks the next lexer token if any, but transposes it for convenience.
    fn peek(&mut self) -> Result<Option<&Token>> {
        self.lexer
            .peek()
            .map(|r| r.as_ref().map_err(|err| err.clone()))
            .transpose()
    }

    /// Parses a statement.
    fn parse_statement(&mut self) -> Result<Statement> {
        match self.next_ident()?.as_str() {
            "use" => self.parse_use(),
            "show" => match self.next_ident()?.as_str() {
                "collections" | "tables" => Ok(Statement::ShowCollections),
                other => errinput!("unknown show target {other}"),
            },
            "db" => self.parse_db(),
            other => errinput!("unexpected identifier {other}, expected use, show or db"),
        }
    }

    /// Parses use("name") or use name.
    fn parse_use(&mut self) -> Result<Statement> {
        if !self.next_is(Token::OpenParen) {
            return Ok(Statement::Use(self.next_ident()?));
        }
        let name = match self.next()? {
            Token::String(name) | Token::Ident(name) => name,
            token => return errinput!("expected database name, got {token}"),
        };
        self.expect(Token::CloseParen)?;
        Ok(Statement::Use(name))
    }

    /// Parses a statement following `db`: a database method, a collection
    /// method, or a collection method via db.getCollection("name").
    fn parse_db(&mut self) -> Result<Statement> {
        self.expect(Token::Period)?;
        let name = self.next_ident()?;
        if self.next_is(Token::OpenParen) {
            let args = self.parse_arguments()?;
            if name != "getCollection" {
                return Ok(Statement::Database(Call { method: name, args }));
            }
            let collection = match args.as_slice() {
                [Value::String(collection)] => collection.clone(),
                _ => return errinput!("getCollection expects a collection name"),
            };
            return self.parse_collection_method(collection);
        }
        self.parse_collection_method(name)
    }

    /// Parses .method(args) on the given collection, plus chained cursor calls.
    fn parse_collection_method(&mut self, collection: String) -> Result<Statement> {
        let call = self.parse_call()?;
        let mut cursor = Vec::new();
        while self.peek()? == Some(&Token::Period) {
            cursor.push(self.parse_call()?);
        }
        Ok(Statement::Collection {
            collection,
            call,
            cursor,
        })
    }

    /// Parses .method(args).
    fn parse_call(&mut self) -> Result<Call> {
        self.expect(Token::Period)?;
        let method = self.next_ident()?;
        self.expect(Token::OpenParen)?;
        let args = self.parse_arguments()?;
        Ok(Call { method, args })
    }

    /// Parses comma-separated call arguments up to the closing parenthesis,
    /// which must already have been opened.
    fn parse_arguments(&mut self) -> Result<Vec<Value>> {
        let mut args = Vec::new();
        while !self.next_is(Token::CloseParen) {
            args.push(self.parse_value()?);
            if !self.next_is(Token::Comma) {
                self.expect(Token::CloseParen)?;
                break;
            }
        }
        Ok(args)
    }

    /// Parses a literal value.
    fn parse_value(&mut self) -> Result<Value> {
        Ok(match self.next()? {
            Token::OpenBrace => Value::Document(self.parse_document()?),
            Token::OpenBracket => Value::Array(self.parse_array()?),
            Token::String(s) => Value::String(s),
            Token::Number(n) => parse_number(&n)?,
            Token::Minus => match self.next()? {
                Token::Number(n) => parse_number(&format!("-{n}"))?,
                token => return errinput!("expected number after -, got {token}"),
            },
            Token::Plus => match self.next()? {
                Token::Number(n) => parse_number(&n)?,
                token => return errinput!("expected number after +, got {token}"),
            },
            Token::Ident(ident) => match ident.as_str() {
                "true" => Value::Boolean(true),
                "false" => Value::Boolean(false),
                "null" | "undefined" => Value::Null,
                "NaN" => Value::Float(f64::NAN),
                "Infinity" => Value::Float(f64::INFINITY),
                "NumberInt" | "NumberLong" | "NumberDecimal" => self.parse_number_wrapper()?,
                _ => return errinput!("unexpected identifier {ident}"),
            },
            token => return errinput!("expected value, got {token}"),
        })
    }

    /// Parses the argument of NumberInt(5), NumberLong("5") and friends.
    fn parse_number_wrapper(&mut self) -> Result<Value> {
        self.expect(Token::OpenParen)?;
        let value = match self.next()? {
            Token::Number(n) | Token::String(n) => parse_number(&n)?,
            Token::Minus => match self.next()? {
                Token::Number(n) => parse_number(&format!("-{n}"))?,
                token => return errinput!("expected number after -, got {token}"),
            },
            token => return errinput!("expected number, got {token}"),
        };
        self.expect(Token::CloseParen)?;
        Ok(value)
    }

    /// Parses the fields of a document, after the opening brace. Trailing
    /// commas are allowed.
    fn parse_document(&mut self) -> Result<Document> {
        let mut document = Document::new();
        while !self.next_is(Token::CloseBrace) {
            let key = match self.next()? {
                Token::Ident(key) | Token::String(key) | Token::Number(key) => key,
                token => return errinput!("expected field name, got {token}"),
            };
            self.expect(Token::Colon)?;
            document.insert(key, self.parse_value()?);
            if !self.next_is(Token::Comma) {
                self.expect(Token::CloseBrace)?;
                break;
            }
        }
        Ok(document)
    }

    /// Parses the elements of an array, after the opening bracket. Trailing
    /// commas are allowed.
    fn parse_array(&mut self) -> Result<Vec<Value>> {
        let mut values = Vec::new();
        while !self.next_is(Token::CloseBracket) {
            values.push(self.parse_value()?);
            if !self.next_is(Token::Comma) {
                self.expect(Token::CloseBracket)?;
                break;
            }
        }
        Ok(values)
    }
}

/// Parses a numeric literal. Integers that don't fit an i64 become floats.
fn parse_number(literal: &str) -> Result<Value> {
    if !literal.contains(['.', 'e', 'E']) {
        if let Ok(integer) = literal.parse::<i64>() {
            return Ok(Value::Integer(integer));
        }
    }
    match literal.parse::<f64>() {
        Ok(float) => Ok(Value::Float(float)),
        Err(err) => errinput!("invalid number {literal}: {err}"),
    }
}
