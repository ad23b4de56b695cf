//! XPath Lexer
//!
//! Tokenizes XPath expressions into tokens.
//!
//! `*` and the names `and`, `or`, `mod`, `div` are operators only when they
//! follow an operand; elsewhere they are name tests (`//div`, `*`).

use crate::core::cursor::{is_name_char, is_name_start_char};

/// XPath token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Operators
    Slash,       // /
    DoubleSlash, // //
    Dot,         // .
    DoubleDot,   // ..
    At,          // @
    Pipe,        // |
    Plus,        // +
    Minus,       // -
    Star,        // * as a name test
    Multiply,    // * as an operator
    Eq,          // =
    NotEq,       // !=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    And,         // and
    Or,          // or
    Mod,         // mod
    Div,         // div

    // Brackets
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]

    // Literals
    Number(f64),
    String(String),

    // Names
    Name(String),         // NCName
    NameTest(String),     // prefix:* or prefix:local
    NodeType(String),     // node(), text(), comment(), processing-instruction()
    FunctionName(String), // name followed by (

    // Axis
    Axis(String), // child::, descendant::, etc.

    // Special
    DoubleColon, // ::
    Comma,       // ,
    Dollar,      // $

    // End of input
    Eof,
}

impl Token {
    /// Does this token end an operand, making a following `*` or
    /// operator name an operator?
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Token::Name(_)
                | Token::NameTest(_)
                | Token::Number(_)
                | Token::String(_)
                | Token::RightParen
                | Token::RightBracket
                | Token::Star
                | Token::Dot
                | Token::DoubleDot
        )
    }
}

/// XPath lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    after_operand: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            after_operand: false,
        }
    }

    /// Byte offset of the next unread character
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get the remaining input
    fn remaining(&self) -> &'a str {
        self.input.get(self.pos..).unwrap_or("")
    }

    /// Peek at current character
    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Peek at character at offset
    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    /// Advance by n bytes
    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Skip whitespace
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if matches!(c, ' ' | '\t' | '\n' | '\r') {
                self.advance(1);
            } else {
                break;
            }
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token, String> {
        let token = self.scan()?;
        self.after_operand = token.ends_operand();
        Ok(token)
    }

    fn scan(&mut self) -> Result<Token, String> {
        self.skip_whitespace();

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let token = match c {
            '/' => {
                self.advance(1);
                if self.peek() == Some('/') {
                    self.advance(1);
                    Token::DoubleSlash
                } else {
                    Token::Slash
                }
            }
            '.' => {
                if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                    // Number starting with .
                    return Ok(self.read_number());
                }
                self.advance(1);
                if self.peek() == Some('.') {
                    self.advance(1);
                    Token::DoubleDot
                } else {
                    Token::Dot
                }
            }
            '*' => {
                self.advance(1);
                if self.after_operand {
                    Token::Multiply
                } else {
                    Token::Star
                }
            }
            '!' => {
                if self.peek_at(1) != Some('=') {
                    return Err(format!("unexpected '!' at offset {}", self.pos));
                }
                self.advance(2);
                Token::NotEq
            }
            '<' | '>' => {
                self.advance(1);
                let or_equal = self.peek() == Some('=');
                if or_equal {
                    self.advance(1);
                }
                match (c, or_equal) {
                    ('<', false) => Token::Lt,
                    ('<', true) => Token::LtEq,
                    (_, false) => Token::Gt,
                    (_, true) => Token::GtEq,
                }
            }
            ':' => {
                if self.peek_at(1) != Some(':') {
                    return Err(format!("unexpected ':' at offset {}", self.pos));
                }
                self.advance(2);
                Token::DoubleColon
            }
            '@' | '|' | '+' | '-' | '=' | '(' | ')' | '[' | ']' | ',' | '$' => {
                self.advance(1);
                match c {
                    '@' => Token::At,
                    '|' => Token::Pipe,
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '=' => Token::Eq,
                    '(' => Token::LeftParen,
                    ')' => Token::RightParen,
                    '[' => Token::LeftBracket,
                    ']' => Token::RightBracket,
                    ',' => Token::Comma,
                    _ => Token::Dollar,
                }
            }
            '"' | '\'' => self.read_string(c)?,
            '0'..='9' => self.read_number(),
            _ if is_ncname_start(c) => self.read_name_or_keyword(),
            _ => return Err(format!("unexpected '{}' at offset {}", c, self.pos)),
        };
        Ok(token)
    }

    /// Read a number literal
    fn read_number(&mut self) -> Token {
        let start = self.pos;

        // Integer part
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(1);
        }

        // Decimal part
        if self.peek() == Some('.') {
            self.advance(1);
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance(1);
            }
        }

        let num_str = &self.input[start..self.pos];
        Token::Number(num_str.parse().unwrap_or(f64::NAN))
    }

    /// Read a string literal
    fn read_string(&mut self, quote: char) -> Result<Token, String> {
        let opened_at = self.pos;
        self.advance(1); // Skip opening quote

        let start = self.pos;
        match self.remaining().find(quote) {
            Some(len) => {
                self.advance(len + 1);
                Ok(Token::String(self.input[start..start + len].to_string()))
            }
            None => Err(format!("unterminated string literal at offset {}", opened_at)),
        }
    }

    fn read_ncname(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_ncname_char(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    /// Read a name or keyword
    fn read_name_or_keyword(&mut self) -> Token {
        let name = self.read_ncname();

        if self.after_operand {
            match name {
                "and" => return Token::And,
                "or" => return Token::Or,
                "mod" => return Token::Mod,
                "div" => return Token::Div,
                _ => {}
            }
        }

        // Check for namespace prefix
        if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
            if self.peek_at(1) == Some('*') {
                self.advance(2);
                return Token::NameTest(format!("{}:*", name));
            }
            if self.peek_at(1).is_some_and(is_ncname_start) {
                self.advance(1);
                let local = self.read_ncname();
                let qname = format!("{}:{}", name, local);
                return if self.lookahead_is('(') {
                    Token::FunctionName(qname)
                } else {
                    Token::NameTest(qname)
                };
            }
        }

        // Check if followed by :: (axis)
        if self.lookahead_starts_with("::") {
            return Token::Axis(name.to_string());
        }
        // Check if followed by ( (function or node type)
        if self.lookahead_is('(') {
            return match name {
                "node" | "text" | "comment" | "processing-instruction" => {
                    Token::NodeType(name.to_string())
                }
                _ => Token::FunctionName(name.to_string()),
            };
        }
        Token::Name(name.to_string())
    }

    fn lookahead_is(&self, c: char) -> bool {
        self.remaining().trim_start().starts_with(c)
    }

    fn lookahead_starts_with(&self, s: &str) -> bool {
        self.remaining().trim_start().starts_with(s)
    }

    /// Tokenize entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if matches!(token, Token::Eof) {
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }
}

fn is_ncname_start(c: char) -> bool {
    c != ':' && is_name_start_char(c)
}

fn is_ncname_char(c: char) -> bool {
    c != ':' && is_name_char(c)
}
