use crate::ast::*;
use crate::lexer::{Lexer, Span, Token, TokenKind};
use lpcheck_solver::parse_rational;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token: expected {expected}, found {found} at position {span:?}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("Unexpected end of file: expected {0}")]
    UnexpectedEof(String),
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(source: &str) -> Result<Program, ParseError> {
        let tokens = Lexer::tokenize(source);
        let mut parser = Parser::new(tokens);
        parser.parse_program()
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> TokenKind {
        self.current().map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    /// End offset of the last consumed token.
    fn last_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |t| t.span.end)
    }

    fn current_start(&self) -> usize {
        self.current().map_or_else(|| self.last_end(), |t| t.span.start)
    }

    // Statements are line-oriented, so inside one only comments are skipped.
    fn skip_comments(&mut self) {
        while self.peek_kind() == TokenKind::Comment {
            self.advance();
        }
    }

    fn skip_separators(&mut self) {
        while matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Comment
        ) {
            self.advance();
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.current() {
            Some(t) if t.kind != TokenKind::Eof => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: if t.kind == TokenKind::Error {
                    format!("{:?}", t.text)
                } else {
                    format!("{:?}", t.kind)
                },
                span: t.span,
            },
            _ => ParseError::UnexpectedEof(expected.to_string()),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        self.skip_comments();
        match self.current() {
            Some(t) if t.kind == kind => {
                let token = t.clone();
                self.advance();
                Ok(token)
            }
            _ => Err(self.unexpected(&format!("{kind:?}"))),
        }
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();

        loop {
            self.skip_separators();
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Bound => statements.push(Statement::Bound(self.parse_bound()?)),
                _ => statements.push(Statement::Constraint(self.parse_constraint()?)),
            }
            self.expect_statement_end()?;
        }

        Ok(Program { statements })
    }

    fn expect_statement_end(&mut self) -> Result<(), ParseError> {
        self.skip_comments();
        if self.peek_kind().is_statement_end() {
            Ok(())
        } else {
            Err(self.unexpected("newline or ;"))
        }
    }

    fn parse_relation(&mut self) -> Result<Relation, ParseError> {
        self.skip_comments();
        let relation = match self.peek_kind() {
            TokenKind::LessEq => Relation::LessEq,
            TokenKind::GreaterEq => Relation::GreaterEq,
            TokenKind::Equal => Relation::Equal,
            _ => return Err(self.unexpected("<=, >= or =")),
        };
        self.advance();
        Ok(relation)
    }

    fn parse_constraint(&mut self) -> Result<ConstraintStmt, ParseError> {
        let start = self.current_start();
        let lhs = self.parse_expr()?;
        let relation = self.parse_relation()?;
        let rhs = self.parse_expr()?;

        Ok(ConstraintStmt {
            span: Span::new(start, self.last_end()),
            lhs,
            relation,
            rhs,
        })
    }

    fn parse_bound(&mut self) -> Result<BoundStmt, ParseError> {
        let start = self.expect(TokenKind::Bound)?.span;
        let variable = self.expect(TokenKind::Ident)?.text;

        self.skip_comments();
        let kind = match self.peek_kind() {
            TokenKind::GreaterEq => {
                self.advance();
                BoundKind::Lower(self.parse_expr()?)
            }
            TokenKind::LessEq => {
                self.advance();
                BoundKind::Upper(self.parse_expr()?)
            }
            TokenKind::In => {
                self.advance();
                self.expect(TokenKind::LBracket)?;
                let lower = self.parse_expr()?;
                self.expect(TokenKind::Comma)?;
                let upper = self.parse_expr()?;
                self.expect(TokenKind::RBracket)?;
                BoundKind::Range(lower, upper)
            }
            _ => return Err(self.unexpected(">=, <= or in")),
        };

        Ok(BoundStmt {
            span: start.merge(Span::new(start.end, self.last_end())),
            variable,
            kind,
        })
    }

    pub(crate) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            self.skip_comments();
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            self.skip_comments();
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        self.skip_comments();
        match self.peek_kind() {
            TokenKind::Minus => {
                self.advance();
                Ok(Expr::Neg(Box::new(self.parse_unary()?)))
            }
            TokenKind::Plus => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        self.skip_comments();

        match self.peek_kind() {
            TokenKind::Number => {
                let token = self.expect(TokenKind::Number)?;
                if parse_rational(&token.text).is_none() {
                    return Err(ParseError::InvalidNumber(token.text));
                }
                Ok(Expr::Number(token.text))
            }
            TokenKind::Ident => {
                let token = self.expect(TokenKind::Ident)?;
                Ok(Expr::Variable(Variable::new(token.span, token.text)))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(Expr::Paren(Box::new(expr)))
            }
            _ => Err(self.unexpected("number, identifier, or (")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraint(statement: &Statement) -> &ConstraintStmt {
        match statement {
            Statement::Constraint(c) => c,
            other => panic!("Expected constraint, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_constraints() {
        let program = Parser::parse("x + 2 <= y - 1\nx = y + 10; x >= 5").unwrap();
        assert_eq!(program.statements.len(), 3);

        let first = constraint(&program.statements[0]);
        assert_eq!(first.relation, Relation::LessEq);
        assert_eq!(first.span, Span::new(0, 14));
        assert_eq!(constraint(&program.statements[1]).relation, Relation::Equal);
        assert_eq!(constraint(&program.statements[2]).relation, Relation::GreaterEq);
    }

    #[test]
    fn test_precedence() {
        let program = Parser::parse("2*y - 3/2 * x <= -(1 + z)").unwrap();
        let c = constraint(&program.statements[0]);
        assert_eq!(c.lhs.to_string(), "2 * y - 3 / 2 * x");
        match &c.lhs {
            Expr::BinaryOp { op, right, .. } => {
                assert_eq!(*op, BinaryOp::Sub);
                // (3 / 2) * x
                match right.as_ref() {
                    Expr::BinaryOp { left, op, .. } => {
                        assert_eq!(*op, BinaryOp::Mul);
                        assert!(matches!(
                            left.as_ref(),
                            Expr::BinaryOp { op: BinaryOp::Div, .. }
                        ));
                    }
                    other => panic!("Expected product, got {other:?}"),
                }
            }
            other => panic!("Expected difference, got {other:?}"),
        }
        assert!(matches!(c.rhs, Expr::Neg(_)));
    }

    #[test]
    fn test_parse_bounds() {
        let source = "bound y >= 1\nbound z <= 4\nbound w in [1, 7/2]";
        let program = Parser::parse(source).unwrap();
        let kinds: Vec<_> = program
            .statements
            .iter()
            .map(|s| match s {
                Statement::Bound(b) => (b.variable.as_str(), b.kind.clone()),
                other => panic!("Expected bound, got {other:?}"),
            })
            .collect();

        assert_eq!(kinds[0].0, "y");
        assert!(matches!(kinds[0].1, BoundKind::Lower(_)));
        assert_eq!(kinds[1].0, "z");
        assert!(matches!(kinds[1].1, BoundKind::Upper(_)));
        assert_eq!(kinds[2].0, "w");
        assert!(matches!(kinds[2].1, BoundKind::Range(_, _)));
        assert_eq!(program.statements[2].to_string(), "bound w in [1, 7 / 2]");
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let source = r#"
            // header
            x <= 3 // trailing
            /* block */ y >= 1;;

        "#;
        let program = Parser::parse(source).unwrap();
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn test_empty_program() {
        assert_eq!(Parser::parse("").unwrap().statements, vec![]);
        assert_eq!(Parser::parse("\n// nothing\n").unwrap().statements, vec![]);
    }

    #[test]
    fn test_missing_relation() {
        let err = Parser::parse("x + y\n").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_unexpected_eof() {
        let err = Parser::parse("x <=").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof(_)));
    }

    #[test]
    fn test_statement_must_end_at_line_end() {
        let err = Parser::parse("x <= 1 y <= 2").unwrap_err();
        match err {
            ParseError::UnexpectedToken { expected, span, .. } => {
                assert_eq!(expected, "newline or ;");
                assert_eq!(span, Span::new(7, 8));
            }
            other => panic!("Expected unexpected token, got {other:?}"),
        }
    }

    #[test]
    fn test_error_token_is_reported() {
        let err = Parser::parse("x < 1").unwrap_err();
        match err {
            ParseError::UnexpectedToken { found, .. } => assert_eq!(found, "\"<\""),
            other => panic!("Expected unexpected token, got {other:?}"),
        }
    }
}
