//! Die index - one-pass back-index over the DIE tree
//!
//! The gimli cursor only walks forward, so the first traversal-dependent
//! lookup (parent, children, file-order enumeration) triggers a single DFS
//! over every unit that records, per DIE: its file-order ordinal, its owning
//! unit, its parent, and its immediate children. The result is immutable and
//! shared for the graph's lifetime.

use std::collections::HashMap;
use std::ops::Range;

use tracing::debug;

use crate::core::Result;
use crate::data::graph::{DieHandle, Slice};

#[derive(Debug)]
pub(crate) struct DieIndex {
    /// Every DIE of the image, units in file order, DFS within each unit.
    dies: Vec<DieHandle>,
    /// Per-unit slice of `dies`.
    unit_ranges: Vec<Range<usize>>,
    /// Parent ordinal per DIE ordinal; `None` for unit roots.
    parent: Vec<Option<u32>>,
    /// Child ordinals per DIE ordinal, source order.
    children: Vec<Vec<u32>>,
    /// Handle -> ordinal lookup.
    ordinals: HashMap<DieHandle, u32>,
}

impl DieIndex {
    pub(crate) fn build(units: &[gimli::Unit<Slice>]) -> Result<Self> {
        let mut dies: Vec<DieHandle> = Vec::new();
        let mut unit_ranges = Vec::with_capacity(units.len());
        let mut parent: Vec<Option<u32>> = Vec::new();
        let mut children: Vec<Vec<u32>> = Vec::new();
        let mut ordinals = HashMap::new();

        for (unit_index, unit) in units.iter().enumerate() {
            let start = dies.len();

            // `path` holds the ordinals of the ancestors of the entry the
            // cursor is about to yield, innermost last.
            let mut path: Vec<u32> = Vec::new();
            let mut depth = 0isize;

            let mut entries = unit.entries();
            while let Some((delta, entry)) = entries.next_dfs()? {
                depth += delta;
                path.truncate(depth.max(0) as usize);

                let ordinal = dies.len() as u32;
                let handle = DieHandle {
                    unit_index,
                    offset: entry.offset(),
                };

                if let Some(&parent_ordinal) = path.last() {
                    children[parent_ordinal as usize].push(ordinal);
                    parent.push(Some(parent_ordinal));
                } else {
                    parent.push(None);
                }

                dies.push(handle);
                children.push(Vec::new());
                ordinals.insert(handle, ordinal);
                path.push(ordinal);
            }

            unit_ranges.push(start..dies.len());
        }

        let roots = parent.iter().filter(|p| p.is_none()).count();
        debug!(
            "Built die index: {} units, {} dies, {} roots",
            units.len(),
            dies.len(),
            roots
        );

        Ok(Self {
            dies,
            unit_ranges,
            parent,
            children,
            ordinals,
        })
    }

    pub(crate) fn dies(&self) -> &[DieHandle] {
        &self.dies
    }

    pub(crate) fn unit_range(&self, unit_index: usize) -> Range<usize> {
        self.unit_ranges[unit_index].clone()
    }

    pub(crate) fn parent_of(&self, die: DieHandle) -> Result<Option<DieHandle>> {
        match self.ordinals.get(&die) {
            Some(&ordinal) => {
                Ok(self.parent[ordinal as usize].map(|p| self.dies[p as usize]))
            }
            None => Ok(None),
        }
    }

    pub(crate) fn children_of(&self, die: DieHandle) -> Result<Vec<DieHandle>> {
        match self.ordinals.get(&die) {
            Some(&ordinal) => Ok(self.children[ordinal as usize]
                .iter()
                .map(|&c| self.dies[c as usize])
                .collect()),
            None => Ok(Vec::new()),
        }
    }
}
