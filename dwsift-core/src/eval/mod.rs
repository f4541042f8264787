//! The evaluation pipeline: operator protocol, traversal and shape
//! operators, predicates, overload dispatch, and the builtin registry

pub mod builtin;
pub(crate) mod dwarf_ops;
pub mod op;
pub mod overload;
pub mod traverse;
pub(crate) mod value_ops;

pub use builtin::{dw_dict, Builtin, BuiltinDict, Scope};
pub use dwarf_ops::ValueOp;
pub use op::{
    maybe_invert, report_expects, FilterOp, NotPred, Op, OpRef, OnceOp, Pred, PredResult,
    PushConstOp,
};
pub use overload::{OverloadTab, OverloadedBuiltin, Selector};
pub use traverse::{AttributeOp, ChildOp, UnitOp, Winfo};
