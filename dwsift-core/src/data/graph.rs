//! DwarfGraph - shared immutable facade over a parsed DWARF image
//!
//! The graph owns the gimli reader state (sections as `Arc` slices, units in
//! file order) and exposes handle-based DIE access so that values can outlive
//! any particular cursor. The die/parent index is built lazily on first use
//! and immutable afterwards.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::core::Result;
use crate::data::die_index::DieIndex;

/// Reader type used throughout the crate: section bytes are `Arc`-shared so
/// handles and values carry no borrowed lifetimes.
pub type Slice = gimli::EndianArcSlice<gimli::LittleEndian>;

/// Stable handle onto one DIE: owning unit (file order) plus unit-relative
/// offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DieHandle {
    pub(crate) unit_index: usize,
    pub(crate) offset: gimli::UnitOffset,
}

impl DieHandle {
    pub fn unit_index(&self) -> usize {
        self.unit_index
    }

    pub fn unit_offset(&self) -> gimli::UnitOffset {
        self.offset
    }
}

pub struct DwarfGraph {
    dwarf: gimli::Dwarf<Slice>,
    units: Vec<gimli::Unit<Slice>>,
    /// Section-global offset of each unit's contribution to .debug_info.
    unit_bases: Vec<u64>,
    index: OnceLock<DieIndex>,
}

impl fmt::Debug for DwarfGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DwarfGraph")
            .field("units", &self.units.len())
            .field("indexed", &self.index.get().is_some())
            .finish()
    }
}

impl DwarfGraph {
    /// Adopt an already-assembled gimli `Dwarf`, materialising the unit list
    /// in file order.
    pub fn from_dwarf(dwarf: gimli::Dwarf<Slice>) -> Result<Arc<Self>> {
        let mut units = Vec::new();
        let mut unit_bases = Vec::new();

        let mut iter = dwarf.units();
        while let Some(header) = iter.next()? {
            let base = match header.offset() {
                gimli::UnitSectionOffset::DebugInfoOffset(offset) => offset.0 as u64,
                // Type units live in .debug_types; not part of the query space.
                _ => continue,
            };
            let unit = dwarf.unit(header)?;
            unit_bases.push(base);
            units.push(unit);
        }

        tracing::debug!("Loaded DWARF image with {} compilation units", units.len());

        Ok(Arc::new(Self {
            dwarf,
            units,
            unit_bases,
            index: OnceLock::new(),
        }))
    }

    pub fn dwarf(&self) -> &gimli::Dwarf<Slice> {
        &self.dwarf
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub(crate) fn unit(&self, unit_index: usize) -> &gimli::Unit<Slice> {
        &self.units[unit_index]
    }

    /// Re-fetch the gimli entry behind a handle.
    pub fn entry(
        &self,
        die: DieHandle,
    ) -> Result<gimli::DebuggingInformationEntry<'_, '_, Slice>> {
        Ok(self.units[die.unit_index].entry(die.offset)?)
    }

    pub fn die_tag(&self, die: DieHandle) -> Result<gimli::DwTag> {
        Ok(self.entry(die)?.tag())
    }

    pub fn die_has_children(&self, die: DieHandle) -> Result<bool> {
        Ok(self.entry(die)?.has_children())
    }

    /// Section-global offset of the DIE, as printed by `offset`.
    pub fn die_global_offset(&self, die: DieHandle) -> u64 {
        self.unit_bases[die.unit_index] + die.offset.0 as u64
    }

    /// All attributes of the DIE in stored order.
    pub fn attributes(&self, die: DieHandle) -> Result<Vec<gimli::Attribute<Slice>>> {
        let entry = self.entry(die)?;
        let mut attrs = entry.attrs();
        let mut out = Vec::new();
        while let Some(attr) = attrs.next()? {
            out.push(attr);
        }
        Ok(out)
    }

    /// The DIE's attribute with the given code, if present.
    pub fn attr(&self, die: DieHandle, at: gimli::DwAt) -> Result<Option<gimli::Attribute<Slice>>> {
        Ok(self.entry(die)?.attr(at)?)
    }

    pub fn die_has_attr(&self, die: DieHandle, at: gimli::DwAt) -> Result<bool> {
        Ok(self.attr(die, at)?.is_some())
    }

    /// Resolve a string-class attribute value.
    pub fn attr_string(
        &self,
        die: DieHandle,
        value: gimli::AttributeValue<Slice>,
    ) -> Result<String> {
        use gimli::Reader;

        let unit = &self.units[die.unit_index];
        let slice = self.dwarf.attr_string(unit, value)?;
        Ok(slice.to_string_lossy()?.into_owned())
    }

    /// Resolve a reference-class attribute value to the DIE it points at.
    pub fn resolve_ref(
        &self,
        die: DieHandle,
        value: &gimli::AttributeValue<Slice>,
    ) -> Result<Option<DieHandle>> {
        match *value {
            gimli::AttributeValue::UnitRef(offset) => Ok(Some(DieHandle {
                unit_index: die.unit_index,
                offset,
            })),
            gimli::AttributeValue::DebugInfoRef(offset) => self.die_at_global_offset(offset.0 as u64),
            _ => Ok(None),
        }
    }

    /// Map a .debug_info offset back to a handle, validating that a DIE
    /// actually starts there.
    pub fn die_at_global_offset(&self, global: u64) -> Result<Option<DieHandle>> {
        let unit_index = match self.unit_bases.partition_point(|&base| base <= global) {
            0 => return Ok(None),
            n => n - 1,
        };
        let handle = DieHandle {
            unit_index,
            offset: gimli::UnitOffset((global - self.unit_bases[unit_index]) as usize),
        };
        match self.units[unit_index].entry(handle.offset) {
            Ok(_) => Ok(Some(handle)),
            Err(_) => Ok(None),
        }
    }

    fn die_index(&self) -> Result<&DieIndex> {
        if let Some(index) = self.index.get() {
            return Ok(index);
        }
        // Single-threaded pipelines never race here; a concurrent duplicate
        // build would produce an identical index anyway.
        let built = DieIndex::build(&self.units)?;
        Ok(self.index.get_or_init(|| built))
    }

    /// All DIEs of the image in file order.
    pub fn all_dies(&self) -> Result<&[DieHandle]> {
        Ok(self.die_index()?.dies())
    }

    /// All DIEs of one unit in file order.
    pub fn unit_dies(&self, unit_index: usize) -> Result<&[DieHandle]> {
        let index = self.die_index()?;
        Ok(&index.dies()[index.unit_range(unit_index)])
    }

    /// Immediate children of the DIE in source order.
    pub fn children(&self, die: DieHandle) -> Result<Vec<DieHandle>> {
        self.die_index()?.children_of(die)
    }

    /// Parent DIE, `None` for unit roots. Stable for the graph's lifetime.
    pub fn find_parent(&self, die: DieHandle) -> Result<Option<DieHandle>> {
        self.die_index()?.parent_of(die)
    }

    pub fn is_root(&self, die: DieHandle) -> Result<bool> {
        Ok(self.find_parent(die)?.is_none())
    }

    pub(crate) fn encoding(&self, die: DieHandle) -> gimli::Encoding {
        self.units[die.unit_index].encoding()
    }
}
