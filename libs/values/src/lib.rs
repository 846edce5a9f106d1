//! Dynamic value and condition evaluation for asset schemas
//!
//! Schema files describe asset properties whose defaults, constraints and
//! types may be computed. This crate represents those computed values and
//! evaluates them against one asset file at a time.
//!
//! # Architecture Overview
//!
//! ```text
//!  schema text / JSON
//!        |
//!   parser, json -> DynamicValue (immutable, shareable)
//!        |
//!   evaluate against EvaluationContext
//!        |            (types, file, discovery, workspace)
//!        |
//!   references -> expressions -> switches
//!        |
//!   compare: cross-type comparison protocol -> bool / Evaluated
//! ```
//!
//! Evaluation never fails hard. A reference that cannot be resolved, a file
//! that cannot be loaded or an operand that cannot be converted produces a
//! null value or the null outcome of a condition. [`Error`] is reserved for
//! malformed text and for callers asking a literal for a type it does not have.
//!
//! The crate performs no I/O and does not log.

pub mod compare;
pub mod condition;
pub mod context;
pub mod error;
pub mod functions;
pub mod geometry;
pub mod guid_or_id;
pub mod json;
pub mod operation;
mod parser;
pub mod scalar;
pub mod types;
pub mod value;

// Re-export main types
pub use condition::Condition;
pub use context::{
    AssetType, Breadcrumbs, DiscoveredFile, DiscoveryEnvironment, EvaluationContext, FileHandle,
    NodeValue, PropertyContext, PropertyNode, SchemaProperty, SourceFile, TypeDatabase, Workspace,
};
pub use error::{Error, Result};
pub use guid_or_id::{AssetCategory, GuidOrId};
pub use operation::ConditionOperation;
pub use scalar::Scalar;
pub use types::{EnumMember, EnumType, PropertyType, ValueKind};
pub use value::{
    CaseOrCondition, DataRef, DynamicValue, Evaluated, ExpressionNode, Function, PropertyRef,
    SwitchCase, SwitchValue,
};
