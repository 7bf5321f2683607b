use std::fmt;

use crate::error::{EngineError, Result};

/// Represents the smallest meaningful units (atoms) of the SQL dialect.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // --- SQL Keywords ---
    Create,
    Table,
    Insert,
    Into,
    Values,
    Select,
    From,
    Where,
    Update,
    Set,
    Delete,
    Drop,
    Primary,
    Key,
    Unique,
    Inner,
    Join,
    On,
    If,
    Exists,
    Null,

    // --- Identifiers & Literals ---
    /// A name representing a table, a column or a type (e.g., `users`, `TEXT`).
    Ident(String),
    /// An unquoted literal starting with a digit or a sign (e.g., `42`,
    /// `-3.5`, `2024-01-31`), kept verbatim.
    Number(String),
    /// A string literal between single quotes, with `''` already unescaped.
    String(String),

    // --- Symbols ---
    /// Left parenthesis `(`
    LeftParen,
    /// Right parenthesis `)`
    RightParen,
    /// Comma `,`
    Comma,
    /// Semicolon `;`
    Semicolon,
    /// Wildcard `*`
    Star,
    /// Equal to
    Equal,
    /// Qualifier separator in `table.column`
    Dot,

    // --- Special ---
    /// Represents the End Of File/Input.
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            Self::Create => "CREATE",
            Self::Table => "TABLE",
            Self::Insert => "INSERT",
            Self::Into => "INTO",
            Self::Values => "VALUES",
            Self::Select => "SELECT",
            Self::From => "FROM",
            Self::Where => "WHERE",
            Self::Update => "UPDATE",
            Self::Set => "SET",
            Self::Delete => "DELETE",
            Self::Drop => "DROP",
            Self::Primary => "PRIMARY",
            Self::Key => "KEY",
            Self::Unique => "UNIQUE",
            Self::Inner => "INNER",
            Self::Join => "JOIN",
            Self::On => "ON",
            Self::If => "IF",
            Self::Exists => "EXISTS",
            Self::Null => "NULL",
            Self::Ident(s) | Self::Number(s) => return f.write_str(s),
            Self::String(s) => return write!(f, "'{}'", s.replace('\'', "''")),
            Self::LeftParen => "(",
            Self::RightParen => ")",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::Star => "*",
            Self::Equal => "=",
            Self::Dot => ".",
            Self::Eof => "end of input",
        };
        f.write_str(keyword)
    }
}

/// A lexical scanner (lexer) that converts a raw SQL string into a sequence of [Token]s.
pub struct Tokenizer {
    /// The input string stored as a vector of characters for easy iteration.
    input: Vec<char>,
    /// The current position in the character vector.
    position: usize,
}

impl Tokenizer {
    /// Creates a new Tokenizer for the given input string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Processes the entire input and returns a vector of tokens ending with
    /// [Token::Eof].
    ///
    /// # Errors
    /// Returns [EngineError::Syntax] if an invalid character is encountered
    /// or a string literal is not terminated.
    ///
    /// # Example
    /// ```
    /// # use minidb::tokenizer::{Tokenizer, Token};
    /// let mut t = Tokenizer::new("SELECT *");
    /// let tokens = t.tokenize().unwrap();
    /// assert_eq!(tokens[0], Token::Select);
    /// ```
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            self.skip_whitespace();

            if self.is_at_end() {
                break;
            }

            let token = self.next_token()?;
            tokens.push(token);
        }

        tokens.push(Token::Eof);
        Ok(tokens)
    }

    /// Identifies the next token based on the character at the current position.
    fn next_token(&mut self) -> Result<Token> {
        let ch = self.current_char();

        let symbol = match ch {
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '*' => Some(Token::Star),
            '=' => Some(Token::Equal),
            '.' => Some(Token::Dot),
            _ => None,
        };
        if let Some(token) = symbol {
            self.advance();
            return Ok(token);
        }

        match ch {
            c if c.is_alphabetic() || c == '_' => Ok(self.read_identifier()),
            c if c.is_ascii_digit() => Ok(self.read_number()),
            '-' | '+' if self.peek_char().is_some_and(|c| c.is_ascii_digit()) => {
                Ok(self.read_number())
            }
            '\'' => self.read_string(),
            _ => Err(EngineError::Syntax(format!(
                "character {ch:?} is not supported near '{}'",
                self.rest()
            ))),
        }
    }

    // --- Navigation Helpers ---

    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    /// Up to 20 characters from the cursor, for error messages.
    fn rest(&self) -> String {
        self.input[self.position..].iter().take(20).collect()
    }

    // --- Extraction Logic ---

    /// Reads a sequence of alphanumeric characters and determines if it's
    /// a reserved SQL keyword or a user-defined identifier.
    ///
    /// Keywords are matched case-insensitively. Type names are not keywords.
    fn read_identifier(&mut self) -> Token {
        let mut ident = String::new();

        while !self.is_at_end()
            && (self.current_char().is_alphanumeric() || self.current_char() == '_')
        {
            ident.push(self.current_char());
            self.advance();
        }

        match ident.to_uppercase().as_str() {
            "CREATE" => Token::Create,
            "TABLE" => Token::Table,
            "INSERT" => Token::Insert,
            "INTO" => Token::Into,
            "VALUES" => Token::Values,
            "SELECT" => Token::Select,
            "FROM" => Token::From,
            "WHERE" => Token::Where,
            "UPDATE" => Token::Update,
            "SET" => Token::Set,
            "DELETE" => Token::Delete,
            "DROP" => Token::Drop,
            "PRIMARY" => Token::Primary,
            "KEY" => Token::Key,
            "UNIQUE" => Token::Unique,
            "INNER" => Token::Inner,
            "JOIN" => Token::Join,
            "ON" => Token::On,
            "IF" => Token::If,
            "EXISTS" => Token::Exists,
            "NULL" => Token::Null,
            _ => Token::Ident(ident),
        }
    }

    /// Reads an unquoted literal that starts with a digit or a sign.
    ///
    /// Digits, letters, `.`, `-`, `+` and `:` are all taken, so `3.14`,
    /// `1e-5` and `2024-01-31` each stay one token. Whether the text is a
    /// valid value is decided by the column type, not here.
    fn read_number(&mut self) -> Token {
        let mut number = String::new();
        number.push(self.current_char());
        self.advance();

        while !self.is_at_end() {
            let c = self.current_char();
            if !(c.is_alphanumeric() || matches!(c, '.' | '-' | '+' | ':' | '_')) {
                break;
            }
            number.push(c);
            self.advance();
        }

        Token::Number(number)
    }

    /// Reads a string literal enclosed in single quotes. A doubled quote
    /// inside the literal stands for one quote character.
    fn read_string(&mut self) -> Result<Token> {
        self.advance(); // Skip the opening quote

        let mut string = String::new();
        loop {
            if self.is_at_end() {
                return Err(EngineError::Syntax(format!(
                    "unterminated string '{string}"
                )));
            }
            let c = self.current_char();
            self.advance();
            if c != '\'' {
                string.push(c);
                continue;
            }
            if !self.is_at_end() && self.current_char() == '\'' {
                string.push('\'');
                self.advance();
                continue;
            }
            break;
        }

        Ok(Token::String(string))
    }
}
