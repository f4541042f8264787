//! dwsift query engine core
//!
//! A lazy, pull-based query pipeline over DWARF debug information: stacks of
//! typed values are threaded through a chain of operators that traverse the
//! DIE graph, project entity properties, and filter by predicates. The
//! concrete-syntax front end builds operator trees out of the builtin
//! dictionary exposed here; the heavy DWARF lifting is delegated to `gimli`
//! behind the [`DwarfGraph`] facade.

// Core value/stack model and errors
pub mod core;

// DWARF data access
pub mod data;

// Operators, predicates, dispatch, builtins
pub mod eval;

// Re-export the main public API
pub use crate::core::{
    Brevity, CmpResult, Constant, ConstantDom, CustomValue, QueryError, Result, Stack, TypedValue,
    Value, ValueKind, ValueType,
};
pub use crate::data::{load_file, DieHandle, DwarfGraph, Slice};
pub use crate::eval::{
    dw_dict, Builtin, BuiltinDict, FilterOp, OnceOp, Op, OpRef, Pred, PredResult, Scope,
};

// Re-export gimli constants for callers assembling queries programmatically
pub use gimli::constants;

#[cfg(test)]
pub(crate) mod tests_support {
    use std::sync::Arc;

    use crate::data::{DwarfGraph, Slice};

    /// A graph over an image with no debug info at all.
    pub(crate) fn empty_graph() -> Arc<DwarfGraph> {
        let dwarf = gimli::Dwarf::load(|_| -> std::result::Result<Slice, gimli::Error> {
            Ok(Slice::new(Arc::from(Vec::<u8>::new()), gimli::LittleEndian))
        })
        .expect("empty sections always load");
        DwarfGraph::from_dwarf(dwarf).expect("empty image always parses")
    }

    #[test]
    fn test_empty_graph_has_no_units() {
        let graph = empty_graph();
        assert_eq!(graph.unit_count(), 0);
        assert!(graph.all_dies().unwrap().is_empty());
    }
}
