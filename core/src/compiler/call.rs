use super::{CompiledNode, Compiler, err, runtime_err};
use crate::ast::{Expr, Span};
use crate::compiler::{CompileError, CompileErrorKind};
use crate::environment::ValueEnv;
use crate::evaluator::{ExecutionError, RuntimeErrorKind};
use crate::types::Type;
use crate::values::{Sequence, Value};
use smallvec::SmallVec;
use tracing::trace;

/// A call to a host function or a method.
///
/// For a method callee the receiver is already bound by the selector, so
/// only the explicit arguments are passed here.
pub struct CallNode<'t> {
    callee: Box<CompiledNode<'t>>,
    args: Vec<CompiledNode<'t>>,
    // Types of the explicit arguments.
    params: &'t [&'t Type<'t>],
    // Declared results minus a trailing `error`.
    results: &'t [&'t Type<'t>],
    pub(super) ty: &'t Type<'t>,
    pub(super) span: Span,
}

impl<'t> CallNode<'t> {
    pub fn args(&self) -> &[CompiledNode<'t>] {
        &self.args
    }

    pub(super) fn execute(&self, env: &ValueEnv<'t>) -> Result<Value<'t>, ExecutionError> {
        let callee = self.callee.execute(env)?;
        let func = match &callee {
            Value::Null => {
                return Err(runtime_err(RuntimeErrorKind::FunctionNotFound, &self.span));
            }
            Value::Function(func) => func,
            other => {
                return Err(runtime_err(
                    RuntimeErrorKind::NotAFunction {
                        found: other.dynamic_type().to_string(),
                    },
                    &self.span,
                ));
            }
        };

        let mut args: SmallVec<[Value<'t>; 4]> = SmallVec::with_capacity(self.args.len());
        for (index, (arg, param)) in self.args.iter().zip(self.params).enumerate() {
            let value = arg.execute(env)?;
            if !value.conforms_to(param) {
                return Err(runtime_err(
                    RuntimeErrorKind::ArgumentTypeMismatch {
                        index,
                        expected: param.to_string(),
                        found: value.dynamic_type().to_string(),
                    },
                    arg.span(),
                ));
            }
            args.push(value);
        }

        let arity = func.arity();
        if arity > args.len() {
            return Err(runtime_err(
                RuntimeErrorKind::TooFewArguments {
                    expected: arity,
                    found: args.len(),
                },
                &self.span,
            ));
        }
        if arity < args.len() {
            return Err(runtime_err(
                RuntimeErrorKind::TooManyArguments {
                    expected: arity,
                    found: args.len(),
                },
                &self.span,
            ));
        }

        trace!(args = args.len(), "calling function");
        let mut results = func.call(&args).map_err(ExecutionError::Host)?;

        if results.len() != self.results.len() {
            return Err(runtime_err(
                RuntimeErrorKind::ResultCountMismatch {
                    expected: self.results.len(),
                    found: results.len(),
                },
                &self.span,
            ));
        }
        for (index, (value, expected)) in results.iter().zip(self.results).enumerate() {
            if !value.conforms_to(expected) {
                return Err(runtime_err(
                    RuntimeErrorKind::ResultTypeMismatch {
                        index,
                        expected: expected.to_string(),
                        found: value.dynamic_type().to_string(),
                    },
                    &self.span,
                ));
            }
        }

        Ok(match results.len() {
            0 => Value::Null,
            1 => results.swap_remove(0),
            _ => Value::Sequence(Sequence::new(self.ty, results)),
        })
    }
}

impl<'t> Compiler<'_, 't> {
    pub(super) fn compile_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        span: &Span,
    ) -> Result<CompiledNode<'t>, CompileError> {
        let callee = self.compile(callee)?;
        let callee_ty = callee.return_type()?;
        let (params, results) = match callee_ty {
            Type::Function {
                variadic: true, ..
            } => return Err(err(CompileErrorKind::VariadicUnsupported, span)),
            Type::Function {
                params, results, ..
            } => (*params, *results),
            _ => {
                return Err(err(
                    CompileErrorKind::NotAFunction {
                        ty: callee_ty.to_string(),
                    },
                    span,
                ));
            }
        };

        // A method's signature carries its receiver first; the selector
        // already supplies it.
        let params = if callee.has_owner() {
            params.get(1..).unwrap_or_default()
        } else {
            params
        };
        if args.len() < params.len() {
            return Err(err(
                CompileErrorKind::TooFewArguments {
                    expected: params.len(),
                    found: args.len(),
                },
                span,
            ));
        }
        if args.len() > params.len() {
            return Err(err(
                CompileErrorKind::TooManyArguments {
                    expected: params.len(),
                    found: args.len(),
                },
                span,
            ));
        }

        let mut compiled = Vec::with_capacity(args.len());
        for (index, (arg, param)) in args.iter().zip(params).enumerate() {
            let node = self.compile(arg)?;
            let arg_ty = node.return_type()?;
            if !arg_ty.assignable_to(param) {
                return Err(err(
                    CompileErrorKind::ArgumentTypeMismatch {
                        index,
                        expected: param.to_string(),
                        found: arg_ty.to_string(),
                    },
                    &arg.span,
                ));
            }
            compiled.push(node);
        }

        let results = match results.split_last() {
            Some((Type::Error, rest)) => rest,
            _ => results,
        };
        let ty = match results {
            [] => self.types.void(),
            [single] => *single,
            _ => self.types.sequence(self.types.any()),
        };

        Ok(CompiledNode::Call(CallNode {
            callee: Box::new(callee),
            args: compiled,
            params,
            results,
            ty,
            span: span.clone(),
        }))
    }
}
