//! Object file loading
//!
//! Maps the input file, pulls the DWARF sections out with `object`, and hands
//! `Arc`-owned copies to gimli. Missing sections load as empty slices.

use std::path::Path;
use std::sync::Arc;

use object::{Object, ObjectSection};
use tracing::debug;

use crate::core::{QueryError, Result};
use crate::data::graph::{DwarfGraph, Slice};

pub fn load_file(path: impl AsRef<Path>) -> Result<Arc<DwarfGraph>> {
    let path = path.as_ref();
    debug!("Loading object file: {}", path.display());

    let file = std::fs::File::open(path)?;
    // SAFETY: the mapping is only read while building the Arc-owned section
    // copies below; nothing keeps a reference to it afterwards.
    let mmap = unsafe { memmap2::Mmap::map(&file)? };
    let object = object::File::parse(&mmap[..])?;

    let graph = from_object(&object)?;
    if graph.unit_count() == 0 {
        return Err(QueryError::NoDebugInfo {
            path: path.to_path_buf(),
        }
        .into());
    }
    Ok(graph)
}

/// Assemble a graph from an already-parsed object file.
pub fn from_object(object: &object::File<'_>) -> Result<Arc<DwarfGraph>> {
    let dwarf = gimli::Dwarf::load(|id| -> std::result::Result<Slice, gimli::Error> {
        let data = match object.section_by_name(id.name()) {
            Some(section) => section
                .uncompressed_data()
                .map_err(|_| gimli::Error::Io)?
                .into_owned(),
            None => Vec::new(),
        };
        Ok(Slice::new(Arc::from(data), gimli::LittleEndian))
    })?;
    DwarfGraph::from_dwarf(dwarf)
}
