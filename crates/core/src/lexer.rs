use std::fmt;

use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Identifier; `_` already folded to a space, `-` preserved
    Id(String),
    /// Digit run, kept as written
    Int(String),
    /// `digits.digits`, kept as written
    Decimal(String),
    /// `CONT<k>`; `None` for a bare `CONT` keyword
    Cont(Option<u32>),
    /// Verbatim body of a `PYTHON{# ... #}` block
    Code(String),
    // Reserved words
    Rules,
    Type,
    All,
    State,
    If,
    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Colon,
    Causes,
    Dot,
    Quote,
    Dash,
    // Comparison operators
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    // Rule-clause connectives
    And,
    Or,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Id(s) => write!(f, "identifier '{}'", s),
            Token::Int(s) | Token::Decimal(s) => write!(f, "number {}", s),
            Token::Cont(Some(k)) => write!(f, "'CONT{}'", k),
            Token::Cont(None) => f.write_str("'CONT'"),
            Token::Code(_) => f.write_str("inline code block"),
            Token::Rules => f.write_str("'RULES'"),
            Token::Type => f.write_str("'TYPE'"),
            Token::All => f.write_str("'ALL'"),
            Token::State => f.write_str("'STATE'"),
            Token::If => f.write_str("'if'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::LBracket => f.write_str("'['"),
            Token::RBracket => f.write_str("']'"),
            Token::LBrace => f.write_str("'{'"),
            Token::RBrace => f.write_str("'}'"),
            Token::Comma => f.write_str("','"),
            Token::Semi => f.write_str("';'"),
            Token::Colon => f.write_str("':'"),
            Token::Causes => f.write_str("':='"),
            Token::Dot => f.write_str("'.'"),
            Token::Quote => f.write_str("'''"),
            Token::Dash => f.write_str("'-'"),
            Token::Eq => f.write_str("'='"),
            Token::Neq => f.write_str("'!='"),
            Token::Lt => f.write_str("'<'"),
            Token::Gt => f.write_str("'>'"),
            Token::Lte => f.write_str("'<='"),
            Token::Gte => f.write_str("'>='"),
            Token::And => f.write_str("'&&'"),
            Token::Or => f.write_str("'||'"),
            Token::Eof => f.write_str("end of input"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
}

/// Opening and closing delimiters of an inline code block.
pub const CODE_OPEN: &str = "{#";
pub const CODE_CLOSE: &str = "#}";

/// Single-owner tokenizer over one source text.
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
}

impl Lexer {
    pub fn new(src: &str) -> Self {
        Lexer {
            chars: src.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn cur(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn bump(&mut self) {
        if self.cur() == Some('\n') {
            self.line += 1;
        }
        self.pos += 1;
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.chars.get(self.pos + i) == Some(&c))
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.cur() {
            if c.is_whitespace() {
                self.bump();
            } else if c == '/' && self.peek() == Some('/') {
                while self.cur().is_some_and(|c| c != '\n') {
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn digits(&mut self) -> String {
        let start = self.pos;
        while self.cur().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn number(&mut self) -> Token {
        let whole = self.digits();
        if self.cur() == Some('.') && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            let frac = self.digits();
            Token::Decimal(format!("{}.{}", whole, frac))
        } else {
            Token::Int(whole)
        }
    }

    fn word(&mut self) -> Result<Token, CompileError> {
        let start = self.pos;
        while self
            .cur()
            .is_some_and(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            self.bump();
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        let token = match word.as_str() {
            "RULES" => Token::Rules,
            "TYPE" => Token::Type,
            "ALL" => Token::All,
            "STATE" => Token::State,
            "CONT" => Token::Cont(None),
            "if" => Token::If,
            "PYTHON" => Token::Code(self.code_block()?),
            _ => match word.strip_prefix("CONT") {
                Some(k) if !k.is_empty() && k.chars().all(|c| c.is_ascii_digit()) => {
                    let k = k.parse::<u32>().map_err(|_| {
                        CompileError::lex(self.line, format!("CONT offset too large in '{}'", word))
                    })?;
                    Token::Cont(Some(k))
                }
                _ => Token::Id(word.replace('_', " ")),
            },
        };
        Ok(token)
    }

    fn code_block(&mut self) -> Result<String, CompileError> {
        let line = self.line;
        if !self.starts_with(CODE_OPEN) {
            return Err(CompileError::lex(
                line,
                format!("expected '{}' after PYTHON", CODE_OPEN),
            ));
        }
        self.bump();
        self.bump();
        let start = self.pos;
        while !self.starts_with(CODE_CLOSE) {
            if self.cur().is_none() {
                return Err(CompileError::lex(line, "unterminated PYTHON code block"));
            }
            self.bump();
        }
        let body: String = self.chars[start..self.pos].iter().collect();
        self.bump();
        self.bump();
        Ok(body.trim().to_owned())
    }

    /// Consume and return the next token. Returns `Eof` forever once the
    /// input is exhausted.
    pub fn next_token(&mut self) -> Result<Spanned, CompileError> {
        self.skip_trivia();
        let line = self.line;
        let c = match self.cur() {
            Some(c) => c,
            None => {
                return Ok(Spanned {
                    token: Token::Eof,
                    line,
                })
            }
        };

        if c.is_alphabetic() {
            let token = self.word()?;
            return Ok(Spanned { token, line });
        }
        if c.is_ascii_digit() {
            let token = self.number();
            return Ok(Spanned { token, line });
        }

        let next = self.peek();
        let (token, width) = match (c, next) {
            (':', Some('=')) => (Token::Causes, 2),
            ('!', Some('=')) => (Token::Neq, 2),
            ('<', Some('=')) => (Token::Lte, 2),
            ('>', Some('=')) => (Token::Gte, 2),
            ('&', Some('&')) => (Token::And, 2),
            ('|', Some('|')) => (Token::Or, 2),
            (':', _) => (Token::Colon, 1),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('=', _) => (Token::Eq, 1),
            (';', _) => (Token::Semi, 1),
            ('-', _) => (Token::Dash, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            ('{', _) => (Token::LBrace, 1),
            ('}', _) => (Token::RBrace, 1),
            (',', _) => (Token::Comma, 1),
            ('.', _) => (Token::Dot, 1),
            ('\'', _) => (Token::Quote, 1),
            _ => {
                return Err(CompileError::lex(
                    line,
                    format!("invalid character '{}'", c),
                ))
            }
        };
        for _ in 0..width {
            self.bump();
        }
        Ok(Spanned { token, line })
    }
}

/// Tokenize a whole source text, ending with a single `Eof`.
pub fn lex(src: &str) -> Result<Vec<Spanned>, CompileError> {
    let mut lexer = Lexer::new(src);
    let mut tokens = Vec::new();
    loop {
        let t = lexer.next_token()?;
        let done = t.token == Token::Eof;
        tokens.push(t);
        if done {
            break;
        }
    }
    tracing::debug!(tokens = tokens.len(), "tokenized source");
    Ok(tokens)
}
