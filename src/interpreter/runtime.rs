use std::collections::HashMap;

use crate::ast::{BinaryOperator, Expression, Statement, UnaryOperator, VarType};

use super::trace::Tac;
use super::value::Value;
use super::{Function, RunOutput, RuntimeError};

/// Control-flow marker for statement execution.
pub(super) enum ExecResult {
    Continue,
    Return(Value),
}

/// Internal error channel for expression evaluation. A `Fault` is a failure
/// of the expression itself (unbound identifier, unsupported operand types,
/// division by zero) and becomes `RuntimeError::Expression` — carrying the
/// substituted expression text — at the evaluator entry. `Runtime` errors
/// (call resolution, callee bodies) pass through unchanged.
pub(super) enum EvalError {
    Fault,
    Runtime(RuntimeError),
}

/// Flat variable namespace shared by the top level and every function body,
/// with the declared-type tags alongside.
///
/// Call isolation is an explicit frame stack: entering a call pushes a
/// snapshot of the variable map, the callee then reads and writes the live
/// map directly (so caller variables stay visible, dynamic-scope style),
/// and leaving the call pops the snapshot back in. Type tags are deliberately
/// not rolled back.
pub(super) struct Environment {
    variables: HashMap<String, Value>,
    types: HashMap<String, VarType>,
    frames: Vec<HashMap<String, Value>>,
}

impl Environment {
    fn new() -> Self {
        Self {
            variables: HashMap::new(),
            types: HashMap::new(),
            frames: Vec::new(),
        }
    }

    fn load(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    fn bind(&mut self, name: String, value: Value) {
        self.variables.insert(name, value);
    }

    fn declare(&mut self, name: String, ty: VarType, value: Value) {
        self.types.insert(name.clone(), ty);
        self.variables.insert(name, value);
    }

    fn is_declared(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    fn push_frame(&mut self) {
        self.frames.push(self.variables.clone());
    }

    fn pop_frame(&mut self) {
        if let Some(snapshot) = self.frames.pop() {
            self.variables = snapshot;
        }
    }
}

/// Runtime executor: walks the statement tree once, interleaving TAC
/// emission with execution. Function definitions are registered as they are
/// encountered, so a call is only valid after (or during, for recursion)
/// its definition.
pub(super) struct InterpreterRuntime {
    functions: HashMap<String, Function>,
    environment: Environment,
    tac: Tac,
    result: String,
}

impl InterpreterRuntime {
    pub(super) fn new() -> Self {
        Self {
            functions: HashMap::new(),
            environment: Environment::new(),
            tac: Tac::new(),
            result: String::new(),
        }
    }

    pub(super) fn into_output(self) -> RunOutput {
        RunOutput {
            result: self.result,
            tac: self.tac.into_text(),
        }
    }

    pub(super) fn exec_block(&mut self, body: &[Statement]) -> Result<ExecResult, RuntimeError> {
        // Execute statements in order until one returns, then bubble that up.
        for statement in body {
            match self.exec_statement(statement)? {
                ExecResult::Continue => {}
                ExecResult::Return(value) => return Ok(ExecResult::Return(value)),
            }
        }
        Ok(ExecResult::Continue)
    }

    fn exec_statement(&mut self, statement: &Statement) -> Result<ExecResult, RuntimeError> {
        match statement {
            Statement::Declaration { ty, name, value } => {
                let evaluated = self.evaluate(value)?;
                self.environment.declare(name.clone(), *ty, evaluated);
                self.tac.assign(name, &value.to_string());
                Ok(ExecResult::Continue)
            }
            Statement::Assignment { name, value } => {
                if !self.environment.is_declared(name) {
                    return Err(RuntimeError::UndeclaredVariable { name: name.clone() });
                }
                let evaluated = self.evaluate(value)?;
                self.environment.bind(name.clone(), evaluated);
                self.tac.assign(name, &value.to_string());
                Ok(ExecResult::Continue)
            }
            Statement::Print(expr) => {
                let evaluated = self.evaluate(expr)?;
                self.result.push_str(&evaluated.to_output());
                self.result.push('\n');
                self.tac.print(&expr.to_string());
                Ok(ExecResult::Continue)
            }
            Statement::IncDec { name, op } => {
                // `i++;` desugars to `i = i + 1`, with no declared-check:
                // an unbound name surfaces as an expression error from the
                // desugared form.
                let desugared = Expression::Binary {
                    left: Box::new(Expression::Identifier(name.clone())),
                    op: op.desugared(),
                    right: Box::new(Expression::Number(1.0)),
                };
                let evaluated = self.evaluate(&desugared)?;
                self.environment.bind(name.clone(), evaluated);
                self.tac.assign(name, &desugared.to_string());
                Ok(ExecResult::Continue)
            }
            Statement::Return(value) => {
                let evaluated = self.evaluate(value)?;
                Ok(ExecResult::Return(evaluated))
            }
            Statement::FunctionDef { name, params, body } => {
                self.functions.insert(
                    name.clone(),
                    Function {
                        params: params.clone(),
                        body: body.clone(),
                    },
                );
                self.tac.function(name, params);
                Ok(ExecResult::Continue)
            }
            Statement::If {
                condition,
                body,
                exit_line,
            } => {
                let evaluated = self.evaluate(condition)?;
                self.tac.branch(&condition.to_string(), *exit_line);
                if evaluated.is_truthy() {
                    return self.exec_block(body);
                }
                Ok(ExecResult::Continue)
            }
            Statement::While { condition, body } => {
                self.tac.loop_header(&condition.to_string());
                loop {
                    let evaluated = self.evaluate(condition)?;
                    if !evaluated.is_truthy() {
                        break;
                    }
                    if let ExecResult::Return(value) = self.exec_block(body)? {
                        return Ok(ExecResult::Return(value));
                    }
                }
                Ok(ExecResult::Continue)
            }
        }
    }

    /// Evaluator entry point: one TAC temporary per invocation (shallow —
    /// sub-expressions do not get their own), except that a whole-expression
    /// call delegates to the invocation path and emits none itself.
    ///
    /// The substituted rendering happens before evaluation so that embedded
    /// `++`/`--` side effects do not leak into the rendered text.
    fn evaluate(&mut self, expr: &Expression) -> Result<Value, RuntimeError> {
        if let Expression::Call { name, args } = expr {
            return self.eval_call(name, args);
        }
        let rendered = self.render_substituted(expr);
        match self.eval_inner(expr) {
            Ok(value) => {
                self.tac.temp(&rendered);
                Ok(value)
            }
            Err(EvalError::Runtime(error)) => Err(error),
            Err(EvalError::Fault) => Err(RuntimeError::Expression { expr: rendered }),
        }
    }

    fn render_substituted(&self, expr: &Expression) -> String {
        let environment = &self.environment;
        expr.render_substituted(&|name| environment.load(name).map(Value::to_literal))
    }

    fn eval_inner(&mut self, expr: &Expression) -> Result<Value, EvalError> {
        match expr {
            Expression::Number(value) => Ok(Value::Number(*value)),
            Expression::Boolean(value) => Ok(Value::Boolean(*value)),
            Expression::Str(value) => Ok(Value::Str(value.clone())),
            Expression::Identifier(name) => self
                .environment
                .load(name)
                .cloned()
                .ok_or(EvalError::Fault),
            Expression::Unary { op, operand } => {
                let value = self.eval_inner(operand)?;
                match op {
                    UnaryOperator::Neg => value
                        .as_number()
                        .map(|number| Value::Number(-number))
                        .ok_or(EvalError::Fault),
                    UnaryOperator::Not => Ok(Value::Boolean(!value.is_truthy())),
                }
            }
            Expression::Binary { left, op, right } => match op {
                BinaryOperator::And => {
                    let left = self.eval_inner(left)?;
                    if !left.is_truthy() {
                        return Ok(Value::Boolean(false));
                    }
                    let right = self.eval_inner(right)?;
                    Ok(Value::Boolean(right.is_truthy()))
                }
                BinaryOperator::Or => {
                    let left = self.eval_inner(left)?;
                    if left.is_truthy() {
                        return Ok(Value::Boolean(true));
                    }
                    let right = self.eval_inner(right)?;
                    Ok(Value::Boolean(right.is_truthy()))
                }
                _ => {
                    let left = self.eval_inner(left)?;
                    let right = self.eval_inner(right)?;
                    apply_binary(*op, &left, &right)
                }
            },
            Expression::Postfix { name, op } => {
                let old = self
                    .environment
                    .load(name)
                    .and_then(Value::as_number)
                    .ok_or(EvalError::Fault)?;
                let new = match op.desugared() {
                    BinaryOperator::Add => old + 1.0,
                    _ => old - 1.0,
                };
                self.environment.bind(name.clone(), Value::Number(new));
                Ok(Value::Number(new))
            }
            Expression::Call { name, args } => {
                self.eval_call(name, args).map_err(EvalError::Runtime)
            }
        }
    }

    fn eval_call(&mut self, name: &str, args: &[Expression]) -> Result<Value, RuntimeError> {
        // Arguments are evaluated before the callee is resolved, so their
        // TAC temporaries and side effects land even when the call fails.
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate(arg)?);
        }
        let function = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedFunction {
                name: name.to_string(),
            })?;
        if values.len() != function.params.len() {
            return Err(RuntimeError::FunctionArityMismatch {
                name: name.to_string(),
                expected: function.params.len(),
                found: values.len(),
            });
        }
        self.environment.push_frame();
        for (param, value) in function.params.iter().zip(values) {
            self.environment.bind(param.clone(), value);
        }
        let outcome = self.exec_block(&function.body);
        // Copy-out on every exit path, errors included.
        self.environment.pop_frame();
        match outcome? {
            ExecResult::Continue => Ok(Value::Undefined),
            ExecResult::Return(value) => Ok(value),
        }
    }
}

fn apply_binary(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOperator::Add => match (left, right) {
            (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::Str(format!(
                "{}{}",
                left.to_output(),
                right.to_output()
            ))),
            (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
            _ => Err(EvalError::Fault),
        },
        BinaryOperator::Sub => numeric(left, right).map(|(l, r)| Value::Number(l - r)),
        BinaryOperator::Mul => numeric(left, right).map(|(l, r)| Value::Number(l * r)),
        BinaryOperator::Div => {
            let (l, r) = numeric(left, right)?;
            if r == 0.0 {
                return Err(EvalError::Fault);
            }
            Ok(Value::Number(l / r))
        }
        BinaryOperator::Rem => {
            let (l, r) = numeric(left, right)?;
            if r == 0.0 {
                return Err(EvalError::Fault);
            }
            Ok(Value::Number(l % r))
        }
        BinaryOperator::Less => compare(left, right, |o| o.is_lt()),
        BinaryOperator::Greater => compare(left, right, |o| o.is_gt()),
        BinaryOperator::LessEqual => compare(left, right, |o| o.is_le()),
        BinaryOperator::GreaterEqual => compare(left, right, |o| o.is_ge()),
        BinaryOperator::Equal => Ok(Value::Boolean(left == right)),
        BinaryOperator::NotEqual => Ok(Value::Boolean(left != right)),
        // The short-circuit forms are handled before evaluation reaches
        // here; these are the eager equivalents.
        BinaryOperator::And => Ok(Value::Boolean(left.is_truthy() && right.is_truthy())),
        BinaryOperator::Or => Ok(Value::Boolean(left.is_truthy() || right.is_truthy())),
    }
}

fn numeric(left: &Value, right: &Value) -> Result<(f64, f64), EvalError> {
    match (left.as_number(), right.as_number()) {
        (Some(l), Some(r)) => Ok((l, r)),
        _ => Err(EvalError::Fault),
    }
}

/// Relational comparison over two numbers or two strings.
fn compare(
    left: &Value,
    right: &Value,
    check: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<Value, EvalError> {
    let ordering = match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.partial_cmp(r).ok_or(EvalError::Fault)?,
        (Value::Str(l), Value::Str(r)) => l.cmp(r),
        _ => return Err(EvalError::Fault),
    };
    Ok(Value::Boolean(check(ordering)))
}
