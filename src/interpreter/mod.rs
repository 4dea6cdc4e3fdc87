//! The tree-walking evaluator.
//!
//! Every statement node evaluates through one exhaustive match with the
//! uniform contract `execute(scope, context)`. Evaluation yields a [`Flow`]:
//! either a plain value or a `return` signal travelling to the nearest
//! method frame. Threading the signal through the return type keeps control
//! flow explicit; there is no catch-all that could swallow a genuine
//! failure.

pub mod errors;

use std::fmt;

use tracing::debug;

use crate::ast::{BinaryOp, CompareOp, Statement, VariableValue};
use crate::runtime::class::{self, ClassInstance, ADD_METHOD, INIT_METHOD};
use crate::runtime::{equal, less, Context, ObjectHandle, Scope, DEFAULT_MAX_CALL_DEPTH};
use errors::{RuntimeError, ScriptError};

/// Outcome of evaluating one statement.
#[derive(Debug)]
pub enum Flow {
    /// Evaluation produced a value; execution continues normally.
    Value(ObjectHandle),
    /// A `return` is unwinding towards its method frame, carrying the value.
    Return(ObjectHandle),
}

impl Flow {
    /// Collapses the flow into its carried handle. At the program root a
    /// surviving `return` simply becomes the program result.
    pub fn into_value(self) -> ObjectHandle {
        match self {
            Flow::Value(value) | Flow::Return(value) => value,
        }
    }
}

/// Evaluates `stmt` to a plain value, propagating an in-flight `return`
/// signal to the caller's frame.
macro_rules! eval {
    ($stmt:expr, $scope:expr, $ctx:expr) => {
        match $stmt.execute($scope, $ctx)? {
            Flow::Value(value) => value,
            flow @ Flow::Return(_) => return Ok(flow),
        }
    };
}

impl Statement {
    /// Executes this node against `scope`, writing any output through `ctx`.
    pub fn execute(&self, scope: &mut Scope, ctx: &mut Context) -> Result<Flow, RuntimeError> {
        match self {
            Statement::NumericConst(value) => Ok(Flow::Value(ObjectHandle::number(*value))),
            Statement::StringConst(value) => Ok(Flow::Value(ObjectHandle::string(value.clone()))),
            Statement::BoolConst(value) => Ok(Flow::Value(ObjectHandle::boolean(*value))),
            Statement::None => Ok(Flow::Value(ObjectHandle::none())),
            Statement::Variable(variable) => variable.resolve(scope).map(Flow::Value),
            Statement::Assignment { target, value } => {
                let value = eval!(value, scope, ctx);
                scope.set(target.clone(), value.clone());
                Ok(Flow::Value(value))
            }
            Statement::FieldAssignment {
                object,
                field,
                value,
            } => {
                let target = object.resolve(scope)?;
                let Some(instance) = target.as_instance() else {
                    return Err(RuntimeError::TypeError(format!(
                        "cannot assign field '{field}' on {}",
                        target.type_name()
                    )));
                };
                let value = eval!(value, scope, ctx);
                instance.set_field(field.clone(), value.clone());
                Ok(Flow::Value(value))
            }
            Statement::Print(args) => {
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        ctx.write_char(' ')?;
                    }
                    let value = eval!(arg, scope, ctx);
                    let mut repr = String::new();
                    value.write_repr(&mut repr, ctx)?;
                    ctx.write_str(&repr)?;
                }
                ctx.write_char('\n')?;
                Ok(Flow::Value(ObjectHandle::none()))
            }
            Statement::Stringify(arg) => {
                let value = eval!(arg, scope, ctx);
                let mut repr = String::new();
                value.write_repr(&mut repr, ctx)?;
                Ok(Flow::Value(ObjectHandle::string(repr)))
            }
            Statement::Binary { op, lhs, rhs } => {
                let lhs = eval!(lhs, scope, ctx);
                let rhs = eval!(rhs, scope, ctx);
                apply_binary(*op, lhs, rhs, ctx).map(Flow::Value)
            }
            Statement::Comparison { op, lhs, rhs } => {
                let lhs = eval!(lhs, scope, ctx);
                let rhs = eval!(rhs, scope, ctx);
                let verdict = op.apply(&lhs, &rhs, ctx)?;
                Ok(Flow::Value(ObjectHandle::boolean(verdict)))
            }
            Statement::Or { lhs, rhs } => {
                let lhs = eval!(lhs, scope, ctx);
                let result = if lhs.is_truthy() {
                    true
                } else {
                    let rhs = eval!(rhs, scope, ctx);
                    rhs.is_truthy()
                };
                Ok(Flow::Value(ObjectHandle::boolean(result)))
            }
            Statement::And { lhs, rhs } => {
                let lhs = eval!(lhs, scope, ctx);
                let result = if lhs.is_truthy() {
                    let rhs = eval!(rhs, scope, ctx);
                    rhs.is_truthy()
                } else {
                    false
                };
                Ok(Flow::Value(ObjectHandle::boolean(result)))
            }
            Statement::Not(arg) => {
                let value = eval!(arg, scope, ctx);
                Ok(Flow::Value(ObjectHandle::boolean(!value.is_truthy())))
            }
            Statement::NewInstance { class, args } => {
                let instance = ObjectHandle::instance(ClassInstance::new(class.clone()));
                // Arguments are only evaluated when a constructor of
                // matching arity resolves.
                if class.has_method(INIT_METHOD, args.len()) {
                    let mut call_args = Vec::with_capacity(args.len());
                    for arg in args {
                        call_args.push(eval!(arg, scope, ctx));
                    }
                    class::call_method(&instance, INIT_METHOD, call_args, ctx)?;
                }
                Ok(Flow::Value(instance))
            }
            Statement::MethodCall {
                object,
                method,
                args,
            } => {
                let target = eval!(object, scope, ctx);
                if target.as_instance().is_none() {
                    // Permissive dispatch on absent objects: no call, no
                    // argument evaluation, just None.
                    return Ok(Flow::Value(ObjectHandle::none()));
                }
                let mut call_args = Vec::with_capacity(args.len());
                for arg in args {
                    call_args.push(eval!(arg, scope, ctx));
                }
                class::call_method(&target, method, call_args, ctx).map(Flow::Value)
            }
            Statement::Compound(statements) => {
                for statement in statements {
                    if let flow @ Flow::Return(_) = statement.execute(scope, ctx)? {
                        return Ok(flow);
                    }
                }
                Ok(Flow::Value(ObjectHandle::none()))
            }
            Statement::Return(value) => {
                let value = eval!(value, scope, ctx);
                Ok(Flow::Return(value))
            }
            Statement::MethodBody(body) => match body.execute(scope, ctx)? {
                Flow::Return(value) => Ok(Flow::Value(value)),
                Flow::Value(_) => Ok(Flow::Value(ObjectHandle::none())),
            },
            Statement::ClassDefinition(class) => {
                debug!(class = class.name(), "binding class definition");
                scope.set(class.name().to_string(), ObjectHandle::class(class.clone()));
                Ok(Flow::Value(ObjectHandle::none()))
            }
            Statement::IfElse {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = eval!(condition, scope, ctx);
                if condition.is_truthy() {
                    then_branch.execute(scope, ctx)
                } else if let Some(else_branch) = else_branch {
                    else_branch.execute(scope, ctx)
                } else {
                    Ok(Flow::Value(ObjectHandle::none()))
                }
            }
        }
    }
}

impl VariableValue {
    /// Looks up the base name and walks the attribute chain, one instance
    /// field per hop.
    fn resolve(&self, scope: &Scope) -> Result<ObjectHandle, RuntimeError> {
        let mut current = scope.expect(self.name())?.clone();
        for attr in self.attrs() {
            let instance = current.as_instance().ok_or_else(|| {
                RuntimeError::TypeError(format!(
                    "cannot read attribute '{attr}' of {}",
                    current.type_name()
                ))
            })?;
            let next = instance
                .field(attr)
                .ok_or_else(|| RuntimeError::AttributeNotFound(attr.clone()))?;
            current = next;
        }
        Ok(current)
    }
}

impl CompareOp {
    /// Applies the comparator. Only equality and strict less-than are
    /// primitive; the remaining four derive from them, so instance dispatch
    /// only ever reaches `__eq__` and `__lt__`.
    pub(crate) fn apply(
        self,
        lhs: &ObjectHandle,
        rhs: &ObjectHandle,
        ctx: &mut Context,
    ) -> Result<bool, RuntimeError> {
        match self {
            CompareOp::Equal => equal(lhs, rhs, ctx),
            CompareOp::NotEqual => Ok(!equal(lhs, rhs, ctx)?),
            CompareOp::Less => less(lhs, rhs, ctx),
            CompareOp::LessEqual => Ok(less(lhs, rhs, ctx)? || equal(lhs, rhs, ctx)?),
            CompareOp::Greater => Ok(!(less(lhs, rhs, ctx)? || equal(lhs, rhs, ctx)?)),
            CompareOp::GreaterEqual => Ok(!less(lhs, rhs, ctx)?),
        }
    }
}

fn apply_binary(
    op: BinaryOp,
    lhs: ObjectHandle,
    rhs: ObjectHandle,
    ctx: &mut Context,
) -> Result<ObjectHandle, RuntimeError> {
    if op == BinaryOp::Add {
        if let Some(instance) = lhs.as_instance() {
            if instance.class().has_method(ADD_METHOD, 1) {
                return class::call_method(&lhs, ADD_METHOD, vec![rhs], ctx);
            }
        }
    }
    match op {
        BinaryOp::Add => {
            if let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) {
                return Ok(ObjectHandle::number(a.wrapping_add(b)));
            }
            if let (Some(a), Some(b)) = (lhs.as_string(), rhs.as_string()) {
                let mut joined = String::with_capacity(a.len() + b.len());
                joined.push_str(a);
                joined.push_str(b);
                return Ok(ObjectHandle::string(joined));
            }
            Err(unsupported_operands(op, &lhs, &rhs))
        }
        BinaryOp::Sub => {
            let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) else {
                return Err(unsupported_operands(op, &lhs, &rhs));
            };
            Ok(ObjectHandle::number(a.wrapping_sub(b)))
        }
        BinaryOp::Mult => {
            let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) else {
                return Err(unsupported_operands(op, &lhs, &rhs));
            };
            Ok(ObjectHandle::number(a.wrapping_mul(b)))
        }
        BinaryOp::Div => {
            let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) else {
                return Err(unsupported_operands(op, &lhs, &rhs));
            };
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            // Truncation toward zero; i64::MIN / -1 wraps instead of
            // trapping.
            Ok(ObjectHandle::number(a.wrapping_div(b)))
        }
    }
}

fn unsupported_operands(op: BinaryOp, lhs: &ObjectHandle, rhs: &ObjectHandle) -> RuntimeError {
    RuntimeError::TypeError(format!(
        "unsupported operand types for '{}': {} and {}",
        op.symbol(),
        lhs.type_name(),
        rhs.type_name()
    ))
}

/// Runs a program root against an existing scope and context, collapsing a
/// top-level `return` into the program result.
pub fn run_program(
    program: &Statement,
    globals: &mut Scope,
    ctx: &mut Context,
) -> Result<ObjectHandle, RuntimeError> {
    program.execute(globals, ctx).map(Flow::into_value)
}

/// Owns the global scope across runs and the evaluator configuration.
pub struct Interpreter {
    globals: Scope,
    max_call_depth: usize,
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            globals: Scope::new(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    /// Overrides the method-call depth ceiling.
    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    pub fn globals(&self) -> &Scope {
        &self.globals
    }

    pub fn globals_mut(&mut self) -> &mut Scope {
        &mut self.globals
    }

    /// Executes `program`, writing output to `sink`. Global bindings persist
    /// across calls, so a program can be fed in pieces.
    pub fn run(
        &mut self,
        program: &Statement,
        sink: &mut dyn fmt::Write,
    ) -> Result<ObjectHandle, ScriptError> {
        let mut ctx = Context::with_max_call_depth(sink, self.max_call_depth);
        run_program(program, &mut self.globals, &mut ctx).map_err(ScriptError::from)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
