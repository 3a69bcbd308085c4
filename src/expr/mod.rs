//! Scalar expression runtime
//!
//! Expression strings are the interchange format between callers and operators.
//! They are parsed once, resolved against one or more schemas, type-checked, and
//! turned into [`Evaluator`] values that are applied to live records on every row.
//!
//! # Syntax
//!
//! - Literals: `int[5]`, `double[2.5]`, `string[eng]`, `bool[true]`
//! - Attribute references: `[dept]`
//! - Calls (prefix form): `+ (a, b)`, `- (a)`, `/ (a, b)`, `== (a, b)`, `&& (a, b)`, `! (a)`

mod compiler;
mod errors;
mod parser;

pub use compiler::Evaluator;
pub use errors::{ExprError, ExprResult};
pub use parser::{parse, Expr, Op};
