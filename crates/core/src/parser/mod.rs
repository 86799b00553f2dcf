//! Recursive-descent parser: token stream -> [`Program`].
//! Not error-recovering; the first mismatch aborts the compilation.

use crate::ast::{Act, Causation, Program, Rule};
use crate::error::CompileError;
use crate::lexer::{Spanned, Token};

mod expressions;

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned]) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn cur_line(&self) -> u32 {
        self.cur().line
    }

    fn advance(&mut self) -> &Spanned {
        let t = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    /// Consume `expected` or fail naming it.
    fn expect(&mut self, expected: Token) -> Result<u32, CompileError> {
        if self.peek() == &expected {
            let line = self.cur_line();
            self.advance();
            Ok(line)
        } else {
            Err(self.err(expected.to_string()))
        }
    }

    fn err(&self, expected: impl Into<String>) -> CompileError {
        CompileError::parse(self.cur_line(), expected, self.peek().to_string())
    }

    fn take_id(&mut self) -> Result<String, CompileError> {
        if let Token::Id(name) = self.peek().clone() {
            self.advance();
            Ok(name)
        } else {
            Err(self.err("identifier"))
        }
    }

    // -- Statements ---------------------------------------------

    fn parse_program(&mut self) -> Result<Program, CompileError> {
        self.expect(Token::Rules)?;
        self.expect(Token::LBrace)?;
        let mut rules = vec![self.parse_stmt(1)?];
        while self.peek() == &Token::Semi {
            self.advance();
            let index = rules.len() + 1;
            rules.push(self.parse_stmt(index)?);
        }
        self.expect(Token::RBrace)?;
        if self.peek() != &Token::Eof {
            return Err(self.err(Token::Eof.to_string()));
        }
        Ok(Program { rules })
    }

    fn parse_stmt(&mut self, index: usize) -> Result<Rule, CompileError> {
        let line = self.cur_line();
        let guard = if self.peek() == &Token::If {
            self.advance();
            self.expect(Token::LParen)?;
            let guard = self.parse_bools()?;
            self.expect(Token::RParen)?;
            self.expect(Token::Colon)?;
            Some(guard)
        } else {
            None
        };
        let causation = self.parse_causation()?;
        Ok(Rule {
            index,
            line,
            guard,
            causation,
        })
    }

    fn parse_causation(&mut self) -> Result<Causation, CompileError> {
        let intention = self.parse_act()?;
        self.expect(Token::Causes)?;
        let mut actions = vec![self.parse_act()?];
        while self.peek() == &Token::Comma {
            self.advance();
            actions.push(self.parse_act()?);
        }
        Ok(Causation { intention, actions })
    }

    fn parse_act(&mut self) -> Result<Act, CompileError> {
        let line = self.cur_line();
        let name = self.take_id()?;
        self.expect(Token::LParen)?;
        let args = self.parse_args()?;
        self.expect(Token::RParen)?;
        Ok(Act { name, args, line })
    }
}

/// Parse a full token stream (ending in `Eof`) into a program.
pub fn parse(tokens: &[Spanned]) -> Result<Program, CompileError> {
    if tokens.is_empty() {
        return Err(CompileError::parse(1, Token::Rules.to_string(), Token::Eof.to_string()));
    }
    let mut p = Parser::new(tokens);
    let program = p.parse_program()?;
    tracing::debug!(rules = program.rules.len(), "parsed program");
    Ok(program)
}
