//! Expression trees
//!
//! `=NAME(arg arg ...)` applies a [`Function`] to dynamic arguments. The
//! result type is fixed when the node is built, from the function, the
//! argument types and the type the caller expects.

use std::fmt;

use smallvec::SmallVec;

use crate::context::EvaluationContext;
use crate::error::{Error, Result};
use crate::functions;
use crate::scalar::Scalar;
use crate::types::PropertyType;

use super::{DynamicValue, Evaluated};

pub use crate::functions::Function;

/// A function application over dynamic arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionNode {
    function: Function,
    args: SmallVec<[DynamicValue; 3]>,
    result_type: PropertyType,
}

impl ExpressionNode {
    pub fn new(
        function: Function,
        args: impl IntoIterator<Item = DynamicValue>,
        expected: Option<&PropertyType>,
    ) -> Result<Self> {
        let args: SmallVec<[DynamicValue; 3]> = args.into_iter().collect();
        if args.len() != function.arity() {
            return Err(Error::InvalidOperation(format!(
                "{} takes {} argument(s), got {}",
                function,
                function.arity(),
                args.len()
            )));
        }
        let result_type = functions::infer_result_type(function, &args, expected);
        Ok(Self {
            function,
            args,
            result_type,
        })
    }

    pub fn function(&self) -> Function {
        self.function
    }

    pub fn args(&self) -> &[DynamicValue] {
        &self.args
    }

    pub fn result_type(&self) -> &PropertyType {
        &self.result_type
    }

    /// Evaluate every argument in its own type, then apply the function.
    /// A soft failure in any argument fails the whole expression.
    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Option<Evaluated> {
        let args = self
            .args
            .iter()
            .map(|arg| arg.try_evaluate_boxed(ctx))
            .collect::<Option<SmallVec<[Evaluated; 3]>>>()?;
        functions::apply(self.function, &args, &self.result_type)
    }
}

impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "={}(", self.function)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if let Some(quoted) = quoted_string(arg) {
                f.write_str(&quoted)?;
                continue;
            }
            let text = arg.to_string();
            if text.chars().any(char::is_whitespace) {
                write!(f, "({})", text)?;
            } else {
                f.write_str(&text)?;
            }
        }
        f.write_str(")")
    }
}

/// String literal arguments are quoted so they read back as strings, not as
/// numbers or named constants.
fn quoted_string(arg: &DynamicValue) -> Option<String> {
    let DynamicValue::Concrete(concrete) = arg else {
        return None;
    };
    let Some(Scalar::String(text)) = concrete.value() else {
        return None;
    };
    if !text.contains('\'') {
        Some(format!("'{}'", text))
    } else if !text.contains('"') {
        Some(format!("\"{}\"", text))
    } else {
        None
    }
}
