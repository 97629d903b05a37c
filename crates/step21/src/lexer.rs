//! Part 21 tokenizer.
//!
//! Produces the token stream for a STEP physical file: keywords, `#id`
//! references, strings (escape directives decoded), reals, integers,
//! enumerations, binary literals, punctuation. `/* */` comments and
//! whitespace are skipped.

use crate::error::StepError;
use crate::escape::decode_string;

/// A token in a STEP file.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Keyword or type name (e.g., `CARTESIAN_POINT`, `DATA`).
    Keyword(String),
    /// Entity reference (e.g., `#123`).
    EntityRef(u64),
    /// String literal, decoded (without quotes).
    String(String),
    /// Real number.
    Real(f64),
    /// Integer number.
    Integer(i64),
    /// Enumeration (e.g., `.TRUE.` becomes `Enum("TRUE")`).
    Enum(String),
    /// Binary literal (hex digits, without the double quotes).
    Binary(String),
    /// Left parenthesis `(`.
    LParen,
    /// Right parenthesis `)`.
    RParen,
    /// Comma `,`.
    Comma,
    /// Semicolon `;`.
    Semicolon,
    /// Equals `=`.
    Equals,
    /// Asterisk `*` (derived value marker).
    Asterisk,
    /// Dollar `$` (null value marker).
    Dollar,
}

/// Lexer for Part 21 STEP files.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Tokenize the entire input.
    pub fn tokenize(mut self) -> Result<Vec<Token>, StepError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Token>, StepError> {
        self.skip_whitespace_and_comments();
        let Some(ch) = self.peek() else {
            return Ok(None);
        };

        let token = match ch {
            b'(' => self.punct(Token::LParen),
            b')' => self.punct(Token::RParen),
            b',' => self.punct(Token::Comma),
            b';' => self.punct(Token::Semicolon),
            b'=' => self.punct(Token::Equals),
            b'*' => self.punct(Token::Asterisk),
            b'$' => self.punct(Token::Dollar),
            b'#' => self.read_entity_ref()?,
            b'\'' => self.read_string()?,
            b'"' => self.read_binary()?,
            b'.' => self.read_enum()?,
            b'0'..=b'9' => self.read_number()?,
            b'-' | b'+' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.read_number()?
            }
            b'A'..=b'Z' | b'a'..=b'z' | b'_' => self.read_keyword(),
            _ => {
                return Err(self.error(format!("unexpected character: '{}'", ch as char)));
            }
        };
        Ok(Some(token))
    }

    fn error(&self, message: impl Into<String>) -> StepError {
        StepError::lexer(self.line, self.col, message)
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.input.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn punct(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
                self.advance();
            }
            if self.peek() == Some(b'/') && self.peek_at(1) == Some(b'*') {
                self.advance();
                self.advance();
                while self.peek().is_some() {
                    if self.peek() == Some(b'*') && self.peek_at(1) == Some(b'/') {
                        self.advance();
                        self.advance();
                        break;
                    }
                    self.advance();
                }
                continue;
            }
            break;
        }
    }

    fn read_entity_ref(&mut self) -> Result<Token, StepError> {
        let (line, col) = (self.line, self.col);
        self.advance(); // '#'
        let digits = self.take_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            return Err(StepError::lexer(line, col, "expected digits after '#'"));
        }
        let id = digits
            .parse()
            .map_err(|_| StepError::lexer(line, col, format!("invalid entity ID: {digits}")))?;
        Ok(Token::EntityRef(id))
    }

    fn read_string(&mut self) -> Result<Token, StepError> {
        let (line, col) = (self.line, self.col);
        self.advance(); // opening quote
        let mut raw = Vec::new();
        loop {
            match self.advance() {
                None => return Err(StepError::lexer(line, col, "unterminated string")),
                Some(b'\'') => {
                    // Doubled quotes stay in the raw text; the decoder
                    // collapses them together with the \X directives.
                    if self.peek() == Some(b'\'') {
                        raw.extend_from_slice(b"''");
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(ch) => raw.push(ch),
            }
        }
        let raw = String::from_utf8_lossy(&raw).into_owned();
        let decoded = decode_string(&raw)
            .map_err(|e| StepError::lexer(line, col, e.to_string()))?;
        Ok(Token::String(decoded))
    }

    fn read_binary(&mut self) -> Result<Token, StepError> {
        let (line, col) = (self.line, self.col);
        self.advance(); // opening double quote
        let mut content = Vec::new();
        loop {
            match self.advance() {
                None => return Err(StepError::lexer(line, col, "unterminated binary literal")),
                Some(b'"') => break,
                Some(ch) => content.push(ch),
            }
        }
        let s = String::from_utf8_lossy(&content).into_owned();
        Ok(Token::Binary(s))
    }

    fn read_enum(&mut self) -> Result<Token, StepError> {
        let (line, col) = (self.line, self.col);
        self.advance(); // opening '.'
        let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_');
        if name.is_empty() {
            return Err(StepError::lexer(line, col, "empty enumeration"));
        }
        if self.advance() != Some(b'.') {
            return Err(StepError::lexer(line, col, "unterminated enumeration"));
        }
        Ok(Token::Enum(name))
    }

    fn read_number(&mut self) -> Result<Token, StepError> {
        let (line, col) = (self.line, self.col);
        let mut text = String::new();
        let mut is_real = false;

        if let Some(sign @ (b'-' | b'+')) = self.peek() {
            text.push(sign as char);
            self.advance();
        }
        text.push_str(&self.take_while(|c| c.is_ascii_digit()));

        // A '.' only belongs to the number if not opening an enumeration.
        if self.peek() == Some(b'.') {
            is_real = true;
            text.push('.');
            self.advance();
            text.push_str(&self.take_while(|c| c.is_ascii_digit()));
        }
        if let Some(e @ (b'E' | b'e')) = self.peek() {
            is_real = true;
            text.push(e as char);
            self.advance();
            if let Some(sign @ (b'-' | b'+')) = self.peek() {
                text.push(sign as char);
                self.advance();
            }
            text.push_str(&self.take_while(|c| c.is_ascii_digit()));
        }

        if is_real {
            let value = text
                .parse()
                .map_err(|_| StepError::lexer(line, col, format!("invalid real number: {text}")))?;
            Ok(Token::Real(value))
        } else {
            let value = text
                .parse()
                .map_err(|_| StepError::lexer(line, col, format!("invalid integer: {text}")))?;
            Ok(Token::Integer(value))
        }
    }

    fn read_keyword(&mut self) -> Token {
        // Keywords include hyphens for ISO-10303-21 / END-ISO-10303-21.
        let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'-');
        Token::Keyword(name.to_ascii_uppercase())
    }

    fn take_while(&mut self, mut pred: impl FnMut(u8) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&mut pred) {
            self.advance();
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }
}
