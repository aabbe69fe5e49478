//! Syntax tree shared by the parser and the interpreter.
//!
//! The parser builds these nodes once, then the interpreter walks them
//! directly. Expressions also know how to render themselves back to text:
//! the raw form feeds statement-level TAC lines, while the substituted form
//! (identifiers replaced through a resolver) feeds TAC temporaries and
//! expression-error messages.

use std::fmt;

/// Declared type tag. Advisory only: recorded at declaration and consulted
/// to gate re-assignment, never checked against a value's actual kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Int,
    Double,
    Bool,
    Char,
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VarType::Int => "int",
            VarType::Double => "double",
            VarType::Bool => "bool",
            VarType::Char => "char",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Or => "||",
            BinaryOperator::And => "&&",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::Greater => ">",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Rem => "%",
        }
    }

    fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Or => 1,
            BinaryOperator::And => 2,
            BinaryOperator::Equal | BinaryOperator::NotEqual => 3,
            BinaryOperator::Less
            | BinaryOperator::Greater
            | BinaryOperator::LessEqual
            | BinaryOperator::GreaterEqual => 4,
            BinaryOperator::Add | BinaryOperator::Sub => 5,
            BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::Rem => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Neg,
    Not,
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Neg => "-",
            UnaryOperator::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOperator {
    Increment,
    Decrement,
}

impl PostfixOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            PostfixOperator::Increment => "++",
            PostfixOperator::Decrement => "--",
        }
    }

    /// The binary operator of the desugared `v = v (+|-) 1` form.
    pub fn desugared(self) -> BinaryOperator {
        match self {
            PostfixOperator::Increment => BinaryOperator::Add,
            PostfixOperator::Decrement => BinaryOperator::Sub,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(f64),
    Boolean(bool),
    Str(String),
    Identifier(String),
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    /// Postfix `name++` / `name--` embedded in an expression. Normalized to
    /// the inline assignment form `name = name (+|-) 1` at evaluation time,
    /// so it both rebinds the variable and yields the incremented value.
    Postfix {
        name: String,
        op: PostfixOperator,
    },
    Call {
        name: String,
        args: Vec<Expression>,
    },
}

/// Precedence floor an atom never falls below; used as the context for
/// unparenthesized positions.
const ATOM: u8 = 8;

type Resolver<'r> = &'r dyn Fn(&str) -> Option<String>;

impl Expression {
    /// Renders the expression with every identifier the resolver knows
    /// replaced by its literal. Identifiers the resolver does not know keep
    /// their name, which is what makes unbound names visible in
    /// expression-error messages.
    pub fn render_substituted(&self, resolve: Resolver<'_>) -> String {
        self.render_prec(Some(resolve), 0)
    }

    fn render_prec(&self, resolve: Option<Resolver<'_>>, parent: u8) -> String {
        let (text, precedence) = match self {
            Expression::Number(value) => (format_number(*value), ATOM),
            Expression::Boolean(value) => (value.to_string(), ATOM),
            Expression::Str(value) => (format!("\"{value}\""), ATOM),
            Expression::Identifier(name) => {
                let text = resolve
                    .and_then(|resolve| resolve(name))
                    .unwrap_or_else(|| name.clone());
                (text, ATOM)
            }
            Expression::Unary { op, operand } => {
                (format!("{}{}", op.symbol(), operand.render_prec(resolve, 7)), 7)
            }
            Expression::Binary { left, op, right } => {
                let precedence = op.precedence();
                let text = format!(
                    "{} {} {}",
                    left.render_prec(resolve, precedence),
                    op.symbol(),
                    right.render_prec(resolve, precedence + 1),
                );
                (text, precedence)
            }
            Expression::Postfix { name, op } => match resolve {
                // Substituted form shows the normalized inline assignment,
                // with the pre-increment value on the right-hand side.
                Some(resolve) => {
                    let old = resolve(name).unwrap_or_else(|| name.clone());
                    let text = format!("{name} = {old} {} 1", op.desugared().symbol());
                    (text, 0)
                }
                None => (format!("{name}{}", op.symbol()), ATOM),
            },
            Expression::Call { name, args } => {
                let rendered: Vec<String> = args
                    .iter()
                    .map(|arg| arg.render_prec(resolve, 0))
                    .collect();
                (format!("{name}({})", rendered.join(", ")), ATOM)
            }
        };
        if precedence < parent {
            format!("({text})")
        } else {
            text
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render_prec(None, 0))
    }
}

/// Numbers are double-precision throughout; integral values render without
/// a decimal point (`8` rather than `8.0`, but `8.5` stays `8.5`).
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Declaration {
        ty: VarType,
        name: String,
        value: Expression,
    },
    Assignment {
        name: String,
        value: Expression,
    },
    Print(Expression),
    IncDec {
        name: String,
        op: PostfixOperator,
    },
    Return(Expression),
    FunctionDef {
        name: String,
        params: Vec<String>,
        body: Vec<Statement>,
    },
    If {
        condition: Expression,
        body: Vec<Statement>,
        /// Source line one past the body's closing brace; the pseudo-label
        /// of the TAC branch line.
        exit_line: usize,
    },
    While {
        condition: Expression,
        body: Vec<Statement>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}
