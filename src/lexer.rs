use std::{iter::Peekable, str::CharIndices};

use crate::token::{Span, Token, TokenKind};

mod error;

pub use error::{LexError, LexResult};

/// Hand-rolled scanner for CustomLang source text.
///
/// The language is brace-delimited and line-oriented: `{`/`}` are ordinary
/// tokens and every physical line break becomes a `Newline` token, which the
/// parser needs to apply the unterminated-statement skip rule.
pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            line: 1,
            column: 0,
        }
    }

    pub fn next_token(&mut self) -> LexResult<Token<'a>> {
        self.skip_blanks();

        let (start_idx, ch) = match self.chars.peek() {
            Some(&(idx, c)) => (idx, c),
            None => {
                let index = self.input.len();
                return Ok(Token::new(
                    TokenKind::Eof,
                    Span {
                        start: index,
                        end: index,
                        line: self.line,
                        column: self.column,
                    },
                ));
            }
        };

        let start_line = self.line;
        let start_column = self.column;
        match ch {
            '\n' => {
                self.advance_char();
                Ok(self.single(TokenKind::Newline, start_idx, start_line, start_column))
            }
            '(' => {
                self.advance_char();
                Ok(self.single(TokenKind::LParen, start_idx, start_line, start_column))
            }
            ')' => {
                self.advance_char();
                Ok(self.single(TokenKind::RParen, start_idx, start_line, start_column))
            }
            '{' => {
                self.advance_char();
                Ok(self.single(TokenKind::LBrace, start_idx, start_line, start_column))
            }
            '}' => {
                self.advance_char();
                Ok(self.single(TokenKind::RBrace, start_idx, start_line, start_column))
            }
            ',' => {
                self.advance_char();
                Ok(self.single(TokenKind::Comma, start_idx, start_line, start_column))
            }
            ';' => {
                self.advance_char();
                Ok(self.single(TokenKind::Semicolon, start_idx, start_line, start_column))
            }
            '*' => {
                self.advance_char();
                Ok(self.single(TokenKind::Star, start_idx, start_line, start_column))
            }
            '/' => {
                self.advance_char();
                Ok(self.single(TokenKind::Slash, start_idx, start_line, start_column))
            }
            '%' => {
                self.advance_char();
                Ok(self.single(TokenKind::Percent, start_idx, start_line, start_column))
            }
            '+' => Ok(self.one_or_two('+', TokenKind::PlusPlus, TokenKind::Plus)),
            '-' => Ok(self.one_or_two('-', TokenKind::MinusMinus, TokenKind::Minus)),
            '<' => Ok(self.one_or_two('=', TokenKind::LessEqual, TokenKind::Less)),
            '>' => Ok(self.one_or_two('=', TokenKind::GreaterEqual, TokenKind::Greater)),
            '=' => Ok(self.one_or_two('=', TokenKind::EqualEqual, TokenKind::Equal)),
            '!' => Ok(self.one_or_two('=', TokenKind::NotEqual, TokenKind::Bang)),
            '&' => self.paired('&', TokenKind::AndAnd),
            '|' => self.paired('|', TokenKind::OrOr),
            '"' | '\'' => self.read_string(ch, start_idx, start_line, start_column),
            c if c.is_alphabetic() || c == '_' => {
                Ok(self.read_identifier(start_idx, start_line, start_column))
            }
            c if c.is_ascii_digit() => self.read_number(start_idx, start_line, start_column),
            _ => Err(LexError::UnexpectedCharacter {
                character: ch,
                line: start_line,
                column: start_column,
            }),
        }
    }

    fn skip_blanks(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c == ' ' || c == '\t' || c == '\r' {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn single(&mut self, kind: TokenKind<'a>, start: usize, line: usize, column: usize) -> Token<'a> {
        Token::new(
            kind,
            Span {
                start,
                end: start + 1,
                line,
                column,
            },
        )
    }

    /// Consumes the current character and, if `second` follows, also that
    /// one, producing `double`; otherwise produces `one`.
    fn one_or_two(&mut self, second: char, double: TokenKind<'a>, one: TokenKind<'a>) -> Token<'a> {
        let line = self.line;
        let column = self.column;
        let (start, _) = self.advance_char().expect("operator character missing");
        if let Some(&(_, c)) = self.chars.peek() {
            if c == second {
                self.advance_char();
                return Token::new(
                    double,
                    Span {
                        start,
                        end: start + 2,
                        line,
                        column,
                    },
                );
            }
        }
        Token::new(
            one,
            Span {
                start,
                end: start + 1,
                line,
                column,
            },
        )
    }

    /// `&&` and `||` have no single-character form in the language.
    fn paired(&mut self, second: char, kind: TokenKind<'a>) -> LexResult<Token<'a>> {
        let line = self.line;
        let column = self.column;
        let (start, first) = self.advance_char().expect("operator character missing");
        match self.chars.peek() {
            Some(&(_, c)) if c == second => {
                self.advance_char();
                Ok(Token::new(
                    kind,
                    Span {
                        start,
                        end: start + 2,
                        line,
                        column,
                    },
                ))
            }
            _ => Err(LexError::UnexpectedCharacter {
                character: first,
                line,
                column,
            }),
        }
    }

    fn read_identifier(&mut self, start: usize, line: usize, column: usize) -> Token<'a> {
        self.advance_char();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance_char();
            } else {
                break;
            }
        }

        let end_idx = self.current_index();
        let ident = &self.input[start..end_idx];
        let kind = match ident {
            "int" => TokenKind::Int,
            "double" => TokenKind::Double,
            "bool" => TokenKind::Bool,
            "char" => TokenKind::Char,
            "print" => TokenKind::Print,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "function" => TokenKind::Function,
            "return" => TokenKind::Return,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => TokenKind::Identifier(ident),
        };
        Token::new(
            kind,
            Span {
                start,
                end: end_idx,
                line,
                column,
            },
        )
    }

    fn read_number(&mut self, start: usize, line: usize, column: usize) -> LexResult<Token<'a>> {
        self.advance_char();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.advance_char();
            } else {
                break;
            }
        }
        if let Some(&(_, '.')) = self.chars.peek() {
            self.advance_char();
            while let Some(&(_, c)) = self.chars.peek() {
                if c.is_ascii_digit() {
                    self.advance_char();
                } else {
                    break;
                }
            }
        }

        let end_idx = self.current_index();
        let literal = &self.input[start..end_idx];
        let value = literal
            .parse::<f64>()
            .map_err(|_| LexError::InvalidNumberLiteral {
                literal: literal.to_string(),
                line,
                column,
            })?;
        Ok(Token::new(
            TokenKind::Number(value),
            Span {
                start,
                end: end_idx,
                line,
                column,
            },
        ))
    }

    /// Reads a string literal delimited by `quote` (both `"…"` and `'…'`
    /// forms are accepted; the payload is the text between the quotes, with
    /// no escape processing).
    fn read_string(
        &mut self,
        quote: char,
        start: usize,
        line: usize,
        column: usize,
    ) -> LexResult<Token<'a>> {
        self.advance_char();
        let content_start = (start + quote.len_utf8()).min(self.input.len());
        while let Some(&(idx, c)) = self.chars.peek() {
            if c == quote {
                self.advance_char();
                return Ok(Token::new(
                    TokenKind::Str(&self.input[content_start..idx]),
                    Span {
                        start,
                        end: idx + quote.len_utf8(),
                        line,
                        column,
                    },
                ));
            }
            if c == '\n' {
                break;
            }
            self.advance_char();
        }
        Err(LexError::UnterminatedString { line, column })
    }

    fn advance_char(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }
}

pub fn tokenize(input: &str) -> LexResult<Vec<Token<'_>>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_eof = matches!(token.kind, TokenKind::Eof);
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn kinds(input: &str) -> Vec<TokenKind<'_>> {
        tokenize(input)
            .expect("tokenize should succeed")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn tokenizes_declaration_and_print() {
        let input = indoc! {"
            int x = 5;
            print(x);
        "};
        let expected = vec![
            TokenKind::Int,
            TokenKind::Identifier("x"),
            TokenKind::Equal,
            TokenKind::Number(5.0),
            TokenKind::Semicolon,
            TokenKind::Newline,
            TokenKind::Print,
            TokenKind::LParen,
            TokenKind::Identifier("x"),
            TokenKind::RParen,
            TokenKind::Semicolon,
            TokenKind::Newline,
            TokenKind::Eof,
        ];
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn tokenizes_block_header_with_condition() {
        let input = "while (i < 3) {";
        let expected = vec![
            TokenKind::While,
            TokenKind::LParen,
            TokenKind::Identifier("i"),
            TokenKind::Less,
            TokenKind::Number(3.0),
            TokenKind::RParen,
            TokenKind::LBrace,
            TokenKind::Eof,
        ];
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn distinguishes_compound_operators() {
        let expected = vec![
            TokenKind::PlusPlus,
            TokenKind::Plus,
            TokenKind::MinusMinus,
            TokenKind::LessEqual,
            TokenKind::EqualEqual,
            TokenKind::Equal,
            TokenKind::NotEqual,
            TokenKind::Bang,
            TokenKind::AndAnd,
            TokenKind::OrOr,
            TokenKind::Eof,
        ];
        assert_eq!(kinds("++ + -- <= == = != ! && ||"), expected);
    }

    #[test]
    fn reads_decimal_numbers_and_both_quote_styles() {
        let expected = vec![
            TokenKind::Number(3.5),
            TokenKind::Str("hi"),
            TokenKind::Str("a"),
            TokenKind::Eof,
        ];
        assert_eq!(kinds("3.5 \"hi\" 'a'"), expected);
    }

    #[test]
    fn tracks_line_numbers_across_newlines() {
        let tokens = tokenize("x\ny\n").expect("tokenize should succeed");
        let lines: Vec<usize> = tokens.iter().map(|token| token.span.line).collect();
        assert_eq!(lines, vec![1, 1, 2, 2, 3]);
    }

    #[test]
    fn errors_on_unexpected_character() {
        let err = tokenize("x = 1 @ 2\n").expect_err("expected lexing failure");
        assert_eq!(
            err,
            LexError::UnexpectedCharacter {
                character: '@',
                line: 1,
                column: 6,
            }
        );
    }

    #[test]
    fn errors_on_lone_ampersand() {
        let err = tokenize("a & b").expect_err("expected lexing failure");
        assert!(matches!(err, LexError::UnexpectedCharacter { character: '&', .. }));
    }

    #[test]
    fn errors_on_unterminated_string() {
        let err = tokenize("print(\"oops);\n").expect_err("expected lexing failure");
        assert!(matches!(err, LexError::UnterminatedString { .. }));
    }
}
