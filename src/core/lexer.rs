//! Display-syntax tokenizer
//!
//! Splits a formula like `=[交接单].@金额.SUM() + @编号` into reference tokens
//! (`[Table]`, `@Field`, chained method calls) and pass-through text. The
//! longer forms are recognised first at each position, so precedence between
//! `[T].@F.M()`, `[T].M()`, `[T].F`, `@F.M()` and `@F` is decided here rather
//! than by the order of rewrite passes.
//!
//! The tokenizer never fails: unterminated brackets, quotes or argument lists
//! degrade to pass-through text or an open chained call.

/// A token of display syntax
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `[Table]` with no field or method after it
    TableRef(String),
    /// `[Table].@Field` or `[Table].Field`
    TableField { table: String, field: String },
    /// `@Field`
    FieldRef(String),
    /// `[Table].METHOD(args)`, `[Table].@Field.METHOD(args)` or `@Field.METHOD(args)`
    ChainedCall {
        table: Option<String>,
        field: Option<String>,
        method: String,
        /// Raw argument text between the parentheses
        args: String,
        /// False when the input ended before the closing parenthesis
        closed: bool,
    },
    /// A bare identifier: function name, field name, boolean, cell reference
    Identifier { name: String, is_call: bool },
    /// Everything else, copied through verbatim
    Other(String),
}

/// True for characters that may appear in a field or table token
pub(crate) fn is_field_char(c: char) -> bool {
    !(c.is_whitespace()
        || matches!(
            c,
            '.' | '(' | ')' | ',' | '，' | '[' | ']' | '@' | '"' | '\'' | '+' | '-' | '*' | '/'
                | '^' | '&' | '=' | '<' | '>' | ':' | ';' | '!' | '{' | '}' | '%'
        ))
}

/// True for characters that start a bare identifier
pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_method_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_method_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Tokenizer for display-syntax formulas
pub struct Tokenizer {
    chars: Vec<char>,
    position: usize,
}

impl Tokenizer {
    /// Create a tokenizer over the full formula text (a leading `=` is kept
    /// as pass-through text)
    pub fn new(formula: &str) -> Self {
        Self {
            chars: formula.chars().collect(),
            position: 0,
        }
    }

    /// Tokenize the whole input. Adjacent pass-through text is merged.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens: Vec<Token> = Vec::new();

        while let Some(token) = self.next_token() {
            if let Token::Other(text) = &token {
                if let Some(Token::Other(prev)) = tokens.last_mut() {
                    prev.push_str(text);
                    continue;
                }
            }
            tokens.push(token);
        }

        tokens
    }

    fn next_token(&mut self) -> Option<Token> {
        let c = self.peek()?;
        let token = match c {
            '"' | '\'' => Token::Other(self.read_quoted(c)),
            '[' => self.read_table(),
            '@' => self.read_at_field(),
            c if is_ident_start(c) => self.read_identifier(),
            c if c.is_ascii_digit() => Token::Other(self.read_number()),
            '!' => Token::Other(self.read_sheet_address()),
            c => {
                self.advance();
                Token::Other(c.to_string())
            }
        };
        Some(token)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.position += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    fn rest(&mut self, start: usize) -> String {
        self.position = self.chars.len();
        self.slice(start, self.position)
    }

    /// Read a quoted literal including its quotes; runs to end of input when
    /// unterminated. A doubled quote stays inside the literal.
    fn read_quoted(&mut self, quote: char) -> String {
        let start = self.position;
        self.advance();
        while let Some(c) = self.advance() {
            if c == quote {
                if self.peek() == Some(quote) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.slice(start, self.position)
    }

    fn read_number(&mut self) -> String {
        let start = self.position;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '.' {
                self.advance();
            } else {
                break;
            }
        }
        self.slice(start, self.position)
    }

    /// `!A:C` after a sheet name stays a cell address
    fn read_sheet_address(&mut self) -> String {
        let start = self.position;
        self.advance();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '$' || c == ':' {
                self.advance();
            } else {
                break;
            }
        }
        self.slice(start, self.position)
    }

    fn read_field_name(&mut self) -> String {
        let start = self.position;
        while let Some(c) = self.peek() {
            if is_field_char(c) {
                self.advance();
            } else {
                break;
            }
        }
        self.slice(start, self.position)
    }

    fn read_method_name(&mut self) -> Option<String> {
        if !self.peek().is_some_and(is_method_start) {
            return None;
        }
        let start = self.position;
        while self.peek().is_some_and(is_method_char) {
            self.advance();
        }
        Some(self.slice(start, self.position))
    }

    /// Argument text up to the matching `)`; the opening `(` is already
    /// consumed. Parentheses inside double-quoted strings are ignored.
    fn read_arguments(&mut self) -> (String, bool) {
        let start = self.position;
        let mut depth = 0usize;
        let mut in_string = false;

        while let Some(c) = self.advance() {
            match c {
                '"' => in_string = !in_string,
                '(' if !in_string => depth += 1,
                ')' if !in_string => {
                    if depth == 0 {
                        return (self.slice(start, self.position - 1), true);
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }

        (self.slice(start, self.position), false)
    }

    /// `.METHOD(args)` following a reference. Restores the position and
    /// returns `None` when the chain is incomplete.
    fn read_method_chain(&mut self) -> Option<(String, String, bool)> {
        let save = self.position;
        self.skip_whitespace();
        if self.peek() != Some('.') {
            self.position = save;
            return None;
        }
        self.advance();
        self.skip_whitespace();
        let Some(method) = self.read_method_name() else {
            self.position = save;
            return None;
        };
        self.skip_whitespace();
        if self.peek() != Some('(') {
            self.position = save;
            return None;
        }
        self.advance();
        let (args, closed) = self.read_arguments();
        Some((method, args, closed))
    }

    fn read_table(&mut self) -> Token {
        let start = self.position;
        self.advance(); // consume '['

        let name_start = self.position;
        while let Some(c) = self.peek() {
            if c == ']' {
                break;
            }
            self.advance();
        }
        if self.peek().is_none() {
            return Token::Other(self.rest(start));
        }
        let table = self.slice(name_start, self.position);
        self.advance(); // consume ']'

        if table.trim().is_empty() {
            return Token::Other(self.slice(start, self.position));
        }

        let after_table = self.position;
        self.skip_whitespace();
        if self.peek() != Some('.') {
            self.position = after_table;
            return Token::TableRef(table);
        }
        self.advance();
        self.skip_whitespace();

        match self.peek() {
            Some('@') => {
                self.advance();
                let field = self.read_field_name();
                if field.is_empty() {
                    self.position = after_table;
                    return Token::TableRef(table);
                }
                match self.read_method_chain() {
                    Some((method, args, closed)) => Token::ChainedCall {
                        table: Some(table),
                        field: Some(field),
                        method,
                        args,
                        closed,
                    },
                    None => Token::TableField { table, field },
                }
            }
            Some(c) if is_field_char(c) => {
                let name = self.read_field_name();
                let after_name = self.position;
                self.skip_whitespace();
                let is_method = self.peek() == Some('(')
                    && name.starts_with(is_method_start)
                    && name.chars().all(is_method_char);
                if is_method {
                    self.advance();
                    let (args, closed) = self.read_arguments();
                    return Token::ChainedCall {
                        table: Some(table),
                        field: None,
                        method: name,
                        args,
                        closed,
                    };
                }
                self.position = after_name;
                Token::TableField { table, field: name }
            }
            _ => {
                self.position = after_table;
                Token::TableRef(table)
            }
        }
    }

    fn read_at_field(&mut self) -> Token {
        self.advance(); // consume '@'
        let field = self.read_field_name();
        if field.is_empty() {
            return Token::Other("@".to_string());
        }
        match self.read_method_chain() {
            Some((method, args, closed)) => Token::ChainedCall {
                table: None,
                field: Some(field),
                method,
                args,
                closed,
            },
            None => Token::FieldRef(field),
        }
    }

    fn read_identifier(&mut self) -> Token {
        let name = self.read_field_name();
        let after_name = self.position;
        self.skip_whitespace();
        let is_call = self.peek() == Some('(');
        self.position = after_name;
        Token::Identifier { name, is_call }
    }
}

/// Convenience function to tokenize a formula string
pub fn tokenize(formula: &str) -> Vec<Token> {
    Tokenizer::new(formula).tokenize()
}
