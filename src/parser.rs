use thiserror::Error;

use crate::ast::{
    BinaryOperator, Expression, PostfixOperator, Program, Statement, UnaryOperator, VarType,
};
use crate::token::{Token, TokenKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Syntax error: expected {expected}, got {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("Syntax error: unexpected {found}")]
    UnrecognizedStatement { found: String },
    #[error("Syntax error: else branches are not supported")]
    ElseUnsupported,
    #[error("Syntax error: return outside of a function")]
    ReturnOutsideFunction,
    #[error("Syntax error: nested function definitions are not supported")]
    NestedFunctionDef,
}

/// Recursive-descent parser over the token stream.
///
/// Statement recognition is terminator-first: a simple statement on a line
/// with no `;` before the line ends is dropped without error, matching the
/// language's permissive skip policy. Block constructs (`function`, `if`,
/// `while`) are brace-delimited and exempt.
pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token<'a>>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn parse_program(mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        while !matches!(self.kind(), TokenKind::Eof) {
            if self.consume_newlines() {
                continue;
            }
            if let Some(statement) = self.parse_statement(false)? {
                statements.push(statement);
            }
        }
        Ok(Program { statements })
    }

    fn parse_statement(&mut self, in_function: bool) -> Result<Option<Statement>, ParseError> {
        match *self.kind() {
            TokenKind::Function => {
                if in_function {
                    return Err(ParseError::NestedFunctionDef);
                }
                self.parse_function_def().map(Some)
            }
            TokenKind::If => self.parse_if(in_function).map(Some),
            TokenKind::While => self.parse_while(in_function).map(Some),
            TokenKind::Else => Err(ParseError::ElseUnsupported),
            TokenKind::Return => {
                if in_function {
                    return self.parse_return().map(Some);
                }
                // Outside a function a return line is just statement-shaped,
                // so the terminator-first skip rule still applies to it.
                if self.line_has_terminator() {
                    Err(ParseError::ReturnOutsideFunction)
                } else {
                    self.skip_line();
                    Ok(None)
                }
            }
            _ => {
                if !self.line_has_terminator() {
                    self.skip_line();
                    return Ok(None);
                }
                self.parse_simple().map(Some)
            }
        }
    }

    fn parse_simple(&mut self) -> Result<Statement, ParseError> {
        let statement = match *self.kind() {
            TokenKind::Int => self.parse_declaration(VarType::Int)?,
            TokenKind::Double => self.parse_declaration(VarType::Double)?,
            TokenKind::Bool => self.parse_declaration(VarType::Bool)?,
            TokenKind::Char => self.parse_declaration(VarType::Char)?,
            TokenKind::Print => {
                self.advance();
                // Parentheses around the argument are plain grouping, so
                // both `print(x);` and `print x;` fall out of the
                // expression grammar.
                Statement::Print(self.parse_expression()?)
            }
            TokenKind::Identifier(_) => match *self.peek_kind() {
                TokenKind::Equal => {
                    let name = self.expect_identifier()?;
                    self.advance();
                    Statement::Assignment {
                        name,
                        value: self.parse_expression()?,
                    }
                }
                TokenKind::PlusPlus => {
                    let name = self.expect_identifier()?;
                    self.advance();
                    Statement::IncDec {
                        name,
                        op: PostfixOperator::Increment,
                    }
                }
                TokenKind::MinusMinus => {
                    let name = self.expect_identifier()?;
                    self.advance();
                    Statement::IncDec {
                        name,
                        op: PostfixOperator::Decrement,
                    }
                }
                found => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "'=', '++', or '--' after identifier".to_string(),
                        found: found.describe(),
                    });
                }
            },
            ref found => {
                return Err(ParseError::UnrecognizedStatement {
                    found: found.describe(),
                });
            }
        };
        self.expect_semicolon()?;
        Ok(statement)
    }

    fn parse_declaration(&mut self, ty: VarType) -> Result<Statement, ParseError> {
        self.advance();
        let name = self.expect_identifier()?;
        self.expect_equal()?;
        let value = self.parse_expression()?;
        Ok(Statement::Declaration { ty, name, value })
    }

    fn parse_return(&mut self) -> Result<Statement, ParseError> {
        self.advance();
        let value = self.parse_expression()?;
        // The terminator is optional on return lines.
        if matches!(self.kind(), TokenKind::Semicolon) {
            self.advance();
        }
        Ok(Statement::Return(value))
    }

    fn parse_function_def(&mut self) -> Result<Statement, ParseError> {
        self.advance();
        let name = self.expect_identifier()?;
        self.expect_lparen()?;
        let mut params = Vec::new();
        if !matches!(self.kind(), TokenKind::RParen) {
            params.push(self.expect_identifier()?);
            while matches!(self.kind(), TokenKind::Comma) {
                self.advance();
                params.push(self.expect_identifier()?);
            }
        }
        self.expect_rparen()?;
        let (body, _) = self.parse_block(true)?;
        Ok(Statement::FunctionDef { name, params, body })
    }

    fn parse_if(&mut self, in_function: bool) -> Result<Statement, ParseError> {
        self.advance();
        self.expect_lparen()?;
        let condition = self.parse_expression()?;
        self.expect_rparen()?;
        let (body, exit_line) = self.parse_block(in_function)?;
        Ok(Statement::If {
            condition,
            body,
            exit_line,
        })
    }

    fn parse_while(&mut self, in_function: bool) -> Result<Statement, ParseError> {
        self.advance();
        self.expect_lparen()?;
        let condition = self.parse_expression()?;
        self.expect_rparen()?;
        let (body, _) = self.parse_block(in_function)?;
        Ok(Statement::While { condition, body })
    }

    /// Parses `{ … }` and returns the body together with the source line
    /// one past the closing brace (the TAC branch pseudo-label). The brace
    /// may sit on the line after the construct header.
    fn parse_block(&mut self, in_function: bool) -> Result<(Vec<Statement>, usize), ParseError> {
        self.consume_newlines();
        self.expect_lbrace()?;
        let mut body = Vec::new();
        loop {
            if self.consume_newlines() {
                continue;
            }
            match *self.kind() {
                TokenKind::RBrace => break,
                TokenKind::Eof => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "'}'".to_string(),
                        found: "end of input".to_string(),
                    });
                }
                _ => {
                    if let Some(statement) = self.parse_statement(in_function)? {
                        body.push(statement);
                    }
                }
            }
        }
        let exit_line = self.current().span().line + 1;
        self.advance();
        Ok((body, exit_line))
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary(1)
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expression, ParseError> {
        let mut expr = self.parse_unary()?;
        while let Some((op, precedence)) = binary_operator(self.kind()) {
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let right = self.parse_binary(precedence + 1)?;
            expr = Expression::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let op = match self.kind() {
            TokenKind::Minus => Some(UnaryOperator::Neg),
            TokenKind::Bang => Some(UnaryOperator::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expression::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        self.parse_postfix()
    }

    /// Calls and `++`/`--` apply to a plain identifier only.
    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_primary()?;
        if let Expression::Identifier(name) = &expr {
            match *self.kind() {
                TokenKind::LParen => {
                    let name = name.clone();
                    self.advance();
                    let mut args = Vec::new();
                    if !matches!(self.kind(), TokenKind::RParen) {
                        args.push(self.parse_expression()?);
                        while matches!(self.kind(), TokenKind::Comma) {
                            self.advance();
                            args.push(self.parse_expression()?);
                        }
                    }
                    self.expect_rparen()?;
                    return Ok(Expression::Call { name, args });
                }
                TokenKind::PlusPlus => {
                    let name = name.clone();
                    self.advance();
                    return Ok(Expression::Postfix {
                        name,
                        op: PostfixOperator::Increment,
                    });
                }
                TokenKind::MinusMinus => {
                    let name = name.clone();
                    self.advance();
                    return Ok(Expression::Postfix {
                        name,
                        op: PostfixOperator::Decrement,
                    });
                }
                _ => {}
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        match *self.kind() {
            TokenKind::Number(value) => {
                self.advance();
                Ok(Expression::Number(value))
            }
            TokenKind::Str(value) => {
                let value = value.to_string();
                self.advance();
                Ok(Expression::Str(value))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Boolean(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Boolean(false))
            }
            TokenKind::Identifier(name) => {
                let name = name.to_string();
                self.advance();
                Ok(Expression::Identifier(name))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_rparen()?;
                Ok(expr)
            }
            _ => Err(self.error("expression")),
        }
    }

    /// True when a `;` appears before the current line ends (newline, end
    /// of input, or a closing brace on the same line).
    fn line_has_terminator(&self) -> bool {
        for token in &self.tokens[self.position..] {
            match token.kind {
                TokenKind::Semicolon => return true,
                TokenKind::Newline | TokenKind::Eof | TokenKind::RBrace => return false,
                _ => {}
            }
        }
        false
    }

    /// Discards the rest of the current line, leaving a closing brace for
    /// the enclosing block to consume.
    fn skip_line(&mut self) {
        while !matches!(
            self.kind(),
            TokenKind::Newline | TokenKind::Eof | TokenKind::RBrace
        ) {
            self.advance();
        }
        if matches!(self.kind(), TokenKind::Newline) {
            self.advance();
        }
    }

    fn consume_newlines(&mut self) -> bool {
        let mut consumed = false;
        while matches!(self.kind(), TokenKind::Newline) {
            consumed = true;
            self.advance();
        }
        consumed
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Identifier(name) = self.kind() {
            let name = name.to_string();
            self.advance();
            Ok(name)
        } else {
            Err(self.error("identifier"))
        }
    }

    fn expect_equal(&mut self) -> Result<(), ParseError> {
        if matches!(self.kind(), TokenKind::Equal) {
            self.advance();
            Ok(())
        } else {
            Err(self.error("'='"))
        }
    }

    fn expect_lparen(&mut self) -> Result<(), ParseError> {
        if matches!(self.kind(), TokenKind::LParen) {
            self.advance();
            Ok(())
        } else {
            Err(self.error("'('"))
        }
    }

    fn expect_rparen(&mut self) -> Result<(), ParseError> {
        if matches!(self.kind(), TokenKind::RParen) {
            self.advance();
            Ok(())
        } else {
            Err(self.error("')'"))
        }
    }

    fn expect_lbrace(&mut self) -> Result<(), ParseError> {
        if matches!(self.kind(), TokenKind::LBrace) {
            self.advance();
            Ok(())
        } else {
            Err(self.error("'{'"))
        }
    }

    fn expect_semicolon(&mut self) -> Result<(), ParseError> {
        if matches!(self.kind(), TokenKind::Semicolon) {
            self.advance();
            Ok(())
        } else {
            Err(self.error("';'"))
        }
    }

    fn current(&self) -> &Token<'a> {
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> &TokenKind<'a> {
        self.current().kind()
    }

    fn peek_kind(&self) -> &TokenKind<'a> {
        let index = (self.position + 1).min(self.tokens.len() - 1);
        self.tokens[index].kind()
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn error(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.kind().describe(),
        }
    }
}

fn binary_operator(kind: &TokenKind<'_>) -> Option<(BinaryOperator, u8)> {
    let pair = match kind {
        TokenKind::OrOr => (BinaryOperator::Or, 1),
        TokenKind::AndAnd => (BinaryOperator::And, 2),
        TokenKind::EqualEqual => (BinaryOperator::Equal, 3),
        TokenKind::NotEqual => (BinaryOperator::NotEqual, 3),
        TokenKind::Less => (BinaryOperator::Less, 4),
        TokenKind::Greater => (BinaryOperator::Greater, 4),
        TokenKind::LessEqual => (BinaryOperator::LessEqual, 4),
        TokenKind::GreaterEqual => (BinaryOperator::GreaterEqual, 4),
        TokenKind::Plus => (BinaryOperator::Add, 5),
        TokenKind::Minus => (BinaryOperator::Sub, 5),
        TokenKind::Star => (BinaryOperator::Mul, 6),
        TokenKind::Slash => (BinaryOperator::Div, 6),
        TokenKind::Percent => (BinaryOperator::Rem, 6),
        _ => return None,
    };
    Some(pair)
}

pub fn parse_tokens(tokens: Vec<Token<'_>>) -> Result<Program, ParseError> {
    Parser::new(tokens).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use indoc::indoc;

    fn parse(input: &str) -> Result<Program, ParseError> {
        parse_tokens(tokenize(input).expect("tokenize should succeed"))
    }

    fn ident(name: &str) -> Expression {
        Expression::Identifier(name.to_string())
    }

    fn num(value: f64) -> Expression {
        Expression::Number(value)
    }

    #[test]
    fn parses_declaration_and_print() {
        let input = indoc! {"
            int x = 5;
            print(x);
        "};
        let program = parse(input).expect("parse failed");
        let expected = Program {
            statements: vec![
                Statement::Declaration {
                    ty: VarType::Int,
                    name: "x".to_string(),
                    value: num(5.0),
                },
                Statement::Print(ident("x")),
            ],
        };
        assert_eq!(program, expected);
    }

    #[test]
    fn parses_print_without_parentheses() {
        let program = parse("print x + 1;").expect("parse failed");
        let expected = Program {
            statements: vec![Statement::Print(Expression::Binary {
                left: Box::new(ident("x")),
                op: BinaryOperator::Add,
                right: Box::new(num(1.0)),
            })],
        };
        assert_eq!(program, expected);
    }

    #[test]
    fn parses_function_definition_with_return() {
        let input = indoc! {"
            function add(a, b) {
              return a + b;
            }
        "};
        let program = parse(input).expect("parse failed");
        let expected = Program {
            statements: vec![Statement::FunctionDef {
                name: "add".to_string(),
                params: vec!["a".to_string(), "b".to_string()],
                body: vec![Statement::Return(Expression::Binary {
                    left: Box::new(ident("a")),
                    op: BinaryOperator::Add,
                    right: Box::new(ident("b")),
                })],
            }],
        };
        assert_eq!(program, expected);
    }

    #[test]
    fn records_the_post_block_line_as_exit_label() {
        let input = indoc! {"
            if (x) {
              print(1);
            }
            print(2);
        "};
        let program = parse(input).expect("parse failed");
        match &program.statements[0] {
            Statement::If { exit_line, .. } => assert_eq!(*exit_line, 4),
            other => panic!("expected if statement, got {other:?}"),
        }
    }

    #[test]
    fn allows_the_block_brace_on_the_next_line() {
        let input = indoc! {"
            if (x > 0)
            {
              print(x);
            }
        "};
        let program = parse(input).expect("parse failed");
        assert!(matches!(program.statements[0], Statement::If { .. }));
    }

    #[test]
    fn nests_control_flow_inside_loop_bodies() {
        let input = indoc! {"
            while (i < 10) {
              if (i % 2 == 0) {
                print(i);
              }
              i++;
            }
        "};
        let program = parse(input).expect("parse failed");
        match &program.statements[0] {
            Statement::While { body, .. } => {
                assert!(matches!(body[0], Statement::If { .. }));
                assert!(matches!(body[1], Statement::IncDec { .. }));
            }
            other => panic!("expected while statement, got {other:?}"),
        }
    }

    #[test]
    fn drops_simple_statements_missing_their_terminator() {
        let input = indoc! {"
            print(x)
            int y = 1;
        "};
        let program = parse(input).expect("parse failed");
        assert_eq!(
            program,
            Program {
                statements: vec![Statement::Declaration {
                    ty: VarType::Int,
                    name: "y".to_string(),
                    value: num(1.0),
                }],
            }
        );
    }

    #[test]
    fn drops_an_unterminated_statement_at_end_of_input() {
        let program = parse("print(x)").expect("parse failed");
        assert_eq!(program, Program { statements: vec![] });
    }

    #[test]
    fn parses_postfix_and_calls_inside_expressions() {
        let program = parse("int y = add(n--, 2) + 1;").expect("parse failed");
        let expected = Program {
            statements: vec![Statement::Declaration {
                ty: VarType::Int,
                name: "y".to_string(),
                value: Expression::Binary {
                    left: Box::new(Expression::Call {
                        name: "add".to_string(),
                        args: vec![
                            Expression::Postfix {
                                name: "n".to_string(),
                                op: PostfixOperator::Decrement,
                            },
                            num(2.0),
                        ],
                    }),
                    op: BinaryOperator::Add,
                    right: Box::new(num(1.0)),
                },
            }],
        };
        assert_eq!(program, expected);
    }

    #[test]
    fn binds_multiplication_tighter_than_addition() {
        let program = parse("int y = 1 + 2 * 3;").expect("parse failed");
        let expected = Program {
            statements: vec![Statement::Declaration {
                ty: VarType::Int,
                name: "y".to_string(),
                value: Expression::Binary {
                    left: Box::new(num(1.0)),
                    op: BinaryOperator::Add,
                    right: Box::new(Expression::Binary {
                        left: Box::new(num(2.0)),
                        op: BinaryOperator::Mul,
                        right: Box::new(num(3.0)),
                    }),
                },
            }],
        };
        assert_eq!(program, expected);
    }

    #[test]
    fn rejects_else_branches() {
        let input = indoc! {"
            if (x) {
              print(1);
            }
            else {
              print(2);
            }
        "};
        let err = parse(input).expect_err("expected parse failure");
        assert_eq!(err, ParseError::ElseUnsupported);
    }

    #[test]
    fn rejects_terminated_return_outside_a_function() {
        let err = parse("return 1;").expect_err("expected parse failure");
        assert_eq!(err, ParseError::ReturnOutsideFunction);
    }

    #[test]
    fn skips_unterminated_return_outside_a_function() {
        let program = parse("return 1").expect("parse failed");
        assert_eq!(program, Program { statements: vec![] });
    }

    #[test]
    fn rejects_nested_function_definitions() {
        let input = indoc! {"
            function outer() {
              function inner() {
                return 1;
              }
            }
        "};
        let err = parse(input).expect_err("expected parse failure");
        assert_eq!(err, ParseError::NestedFunctionDef);
    }

    #[test]
    fn rejects_braceless_bodies() {
        let input = indoc! {"
            if (x > 0)
              print(x);
        "};
        let err = parse(input).expect_err("expected parse failure");
        assert_eq!(
            err,
            ParseError::UnexpectedToken {
                expected: "'{'".to_string(),
                found: "'print'".to_string(),
            }
        );
    }

    #[test]
    fn rejects_statement_shaped_garbage_with_terminator() {
        let err = parse("fly away;").expect_err("expected parse failure");
        assert_eq!(
            err,
            ParseError::UnexpectedToken {
                expected: "'=', '++', or '--' after identifier".to_string(),
                found: "identifier 'away'".to_string(),
            }
        );
        let err = parse("5 + 3;").expect_err("expected parse failure");
        assert_eq!(
            err,
            ParseError::UnrecognizedStatement {
                found: "number 5".to_string(),
            }
        );
    }
}
