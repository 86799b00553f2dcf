use super::Parser;
use crate::ast::{CmpOp, Expr, Guard, GuardUnit};
use crate::error::CompileError;
use crate::lexer::Token;

impl<'a> Parser<'a> {
    // -- Argument placeholders ----------------------------------

    pub(super) fn parse_args(&mut self) -> Result<Vec<Expr>, CompileError> {
        let mut args = vec![self.parse_arg()?];
        while self.peek() == &Token::Comma {
            self.advance();
            args.push(self.parse_arg()?);
        }
        Ok(args)
    }

    fn parse_arg(&mut self) -> Result<Expr, CompileError> {
        match self.peek().clone() {
            Token::Quote => self.parse_literal(),
            Token::Cont(Some(k)) => {
                self.advance();
                Ok(Expr::Cont(k))
            }
            Token::Cont(None) => Err(self.err("continuation offset (CONT<k>)")),
            _ => self.parse_var(),
        }
    }

    fn parse_var(&mut self) -> Result<Expr, CompileError> {
        match self.peek().clone() {
            Token::Id(name) => {
                self.advance();
                Ok(Expr::Var(name))
            }
            Token::Code(code) => {
                self.advance();
                Ok(Expr::Code(code))
            }
            Token::State => {
                self.advance();
                self.expect(Token::LParen)?;
                let args = self.parse_args()?;
                self.expect(Token::RParen)?;
                Ok(Expr::State(args))
            }
            Token::Dash | Token::Int(_) | Token::Decimal(_) | Token::Dot => self.parse_number(),
            _ => Err(self.err("argument")),
        }
    }

    /// `'text'` where text is one identifier or number. Quoted `STATE(...)`
    /// and quoted code are rejected; write them unquoted.
    fn parse_literal(&mut self) -> Result<Expr, CompileError> {
        self.expect(Token::Quote)?;
        let text = match self.peek().clone() {
            Token::Id(name) => {
                self.advance();
                name
            }
            Token::Dash | Token::Int(_) | Token::Decimal(_) | Token::Dot => {
                self.parse_number()?.to_string()
            }
            _ => return Err(self.err("identifier or number inside quotes")),
        };
        self.expect(Token::Quote)?;
        Ok(Expr::Literal(text))
    }

    fn parse_number(&mut self) -> Result<Expr, CompileError> {
        let sign = if self.peek() == &Token::Dash {
            self.advance();
            "-"
        } else {
            ""
        };
        match self.peek().clone() {
            Token::Int(whole) => {
                self.advance();
                if self.peek() == &Token::Dot {
                    self.advance();
                    let frac = self.take_digits()?;
                    Ok(Expr::Decimal(format!("{}{}.{}", sign, whole, frac)))
                } else {
                    Ok(Expr::Int(format!("{}{}", sign, whole)))
                }
            }
            Token::Decimal(d) => {
                self.advance();
                Ok(Expr::Decimal(format!("{}{}", sign, d)))
            }
            Token::Dot => {
                self.advance();
                let frac = self.take_digits()?;
                Ok(Expr::Decimal(format!("{}0.{}", sign, frac)))
            }
            _ => Err(self.err("number")),
        }
    }

    fn take_digits(&mut self) -> Result<String, CompileError> {
        if let Token::Int(digits) = self.peek().clone() {
            self.advance();
            Ok(digits)
        } else {
            Err(self.err("digits"))
        }
    }

    // -- Guard operands -----------------------------------------

    fn parse_operand(&mut self) -> Result<Expr, CompileError> {
        match self.peek().clone() {
            Token::All => {
                self.advance();
                self.expect(Token::LParen)?;
                let ty = self.take_id()?;
                self.expect(Token::RParen)?;
                Ok(Expr::All(ty))
            }
            Token::Type => {
                self.advance();
                self.expect(Token::LParen)?;
                let var = self.take_id()?;
                self.expect(Token::RParen)?;
                Ok(Expr::Type(var))
            }
            Token::Quote => self.parse_literal(),
            Token::LBracket => {
                self.advance();
                let items = self.parse_args()?;
                self.expect(Token::RBracket)?;
                Ok(Expr::List(items))
            }
            _ => self.parse_var(),
        }
    }

    // -- Guards -------------------------------------------------

    /// `bools := '(' bools ')' (conn bools)? | unit (conn bools)?`
    pub(super) fn parse_bools(&mut self) -> Result<Guard, CompileError> {
        let left = if self.peek() == &Token::LParen {
            self.advance();
            let inner = self.parse_bools()?;
            self.expect(Token::RParen)?;
            Guard::Group(Box::new(inner))
        } else {
            Guard::Unit(self.parse_bool_unit()?)
        };
        match self.peek() {
            Token::And => {
                self.advance();
                let right = self.parse_bools()?;
                Ok(Guard::And(Box::new(left), Box::new(right)))
            }
            Token::Or => {
                self.advance();
                let right = self.parse_bools()?;
                Ok(Guard::Or(Box::new(left), Box::new(right)))
            }
            _ => Ok(left),
        }
    }

    fn parse_bool_unit(&mut self) -> Result<GuardUnit, CompileError> {
        let left = self.parse_operand()?;
        let op = match self.peek() {
            Token::Eq => Some(CmpOp::Eq),
            Token::Neq => Some(CmpOp::Ne),
            Token::Lt => Some(CmpOp::Lt),
            Token::Gt => Some(CmpOp::Gt),
            Token::Lte => Some(CmpOp::Le),
            Token::Gte => Some(CmpOp::Ge),
            _ => None,
        };
        match (op, left) {
            (Some(op), left) => {
                self.advance();
                let right = self.parse_operand()?;
                Ok(GuardUnit::Compare { left, op, right })
            }
            (None, Expr::Code(code)) => Ok(GuardUnit::Code(code)),
            (None, _) => Err(self.err("comparison operator")),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{CmpOp, Expr, Guard, GuardUnit};
    use crate::error::CompileError;
    use crate::lexer::lex;
    use crate::parser::parse;

    fn guard_of(cond: &str) -> Guard {
        let src = format!("RULES {{ if ({}) : a(x) := b(x) }}", cond);
        parse(&lex(&src).unwrap()).unwrap().rules[0]
            .guard
            .clone()
            .unwrap()
    }

    fn intention_args(args: &str) -> Vec<Expr> {
        let src = format!("RULES {{ a({}) := b(x) }}", args);
        parse(&lex(&src).unwrap()).unwrap().rules[0]
            .intention()
            .args
            .clone()
    }

    fn eq(l: &str, r: &str) -> Guard {
        Guard::Unit(GuardUnit::Compare {
            left: Expr::Var(l.into()),
            op: CmpOp::Eq,
            right: Expr::Var(r.into()),
        })
    }

    #[test]
    fn numbers_keep_sign_and_gain_leading_zero() {
        assert_eq!(
            intention_args("-3, .5, -.25, 1.5, 007"),
            vec![
                Expr::Int("-3".into()),
                Expr::Decimal("0.5".into()),
                Expr::Decimal("-0.25".into()),
                Expr::Decimal("1.5".into()),
                Expr::Int("007".into()),
            ]
        );
    }

    #[test]
    fn literals_state_and_cont_arguments() {
        assert_eq!(
            intention_args("'room', STATE(x, 'pos'), x, CONT1"),
            vec![
                Expr::Literal("room".into()),
                Expr::State(vec![Expr::Var("x".into()), Expr::Literal("pos".into())]),
                Expr::Var("x".into()),
                Expr::Cont(1),
            ]
        );
    }

    #[test]
    fn quoted_literal_holds_one_identifier_or_number() {
        assert_eq!(
            intention_args("'-1.5', 'block'"),
            vec![Expr::Literal("-1.5".into()), Expr::Literal("block".into())]
        );
        for quoted in ["'STATE(x)'", "'PYTHON{# 1 #}'"] {
            let src = format!("RULES {{ a({}) := b(x) }}", quoted);
            match parse(&lex(&src).unwrap()).unwrap_err() {
                CompileError::Parse { expected, .. } => {
                    assert_eq!(expected, "identifier or number inside quotes")
                }
                other => panic!("expected parse error, got {:?}", other),
            }
        }
    }

    #[test]
    fn bare_cont_is_a_parse_error() {
        let err = parse(&lex("RULES { a(x, CONT) := b(x) }").unwrap()).unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }), "{:?}", err);
    }

    #[test]
    fn connectives_build_a_right_spine() {
        let g = guard_of("a = b && c = d || e = f");
        assert_eq!(
            g,
            Guard::And(
                Box::new(eq("a", "b")),
                Box::new(Guard::Or(Box::new(eq("c", "d")), Box::new(eq("e", "f"))))
            )
        );
    }

    #[test]
    fn parentheses_become_groups() {
        let g = guard_of("(a = b || c = d) && e = f");
        assert_eq!(
            g,
            Guard::And(
                Box::new(Guard::Group(Box::new(Guard::Or(
                    Box::new(eq("a", "b")),
                    Box::new(eq("c", "d"))
                )))),
                Box::new(eq("e", "f"))
            )
        );
    }

    #[test]
    fn all_and_list_operands() {
        let g = guard_of("ALL(block) = [o, CONT1]");
        assert_eq!(
            g,
            Guard::Unit(GuardUnit::Compare {
                left: Expr::All("block".into()),
                op: CmpOp::Eq,
                right: Expr::List(vec![Expr::Var("o".into()), Expr::Cont(1)]),
            })
        );
    }

    #[test]
    fn code_without_operator_is_a_raw_unit() {
        let g = guard_of("PYTHON{# len($x$) > 1 #} && x != 2");
        match g {
            Guard::And(l, r) => {
                assert_eq!(*l, Guard::Unit(GuardUnit::Code("len($x$) > 1".into())));
                assert!(matches!(
                    *r,
                    Guard::Unit(GuardUnit::Compare { op: CmpOp::Ne, .. })
                ));
            }
            other => panic!("unexpected guard {:?}", other),
        }
    }

    #[test]
    fn plain_operand_without_operator_is_rejected() {
        let src = "RULES { if (x) : a(x) := b(x) }";
        let err = parse(&lex(src).unwrap()).unwrap_err();
        match err {
            CompileError::Parse { expected, .. } => assert_eq!(expected, "comparison operator"),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
