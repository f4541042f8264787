//! DWARF data access: graph facade, die index, attribute decoding, loading

pub(crate) mod atval;
pub(crate) mod die_index;
pub(crate) mod graph;
pub(crate) mod loader;

pub use atval::{attr_form, attr_values, operation_operands, ValueProducer};
pub use graph::{DieHandle, DwarfGraph, Slice};
pub use loader::{from_object, load_file};
