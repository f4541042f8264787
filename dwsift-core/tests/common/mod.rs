//! Synthetic DWARF fixtures built in-memory with gimli's writer.

use std::collections::HashMap;
use std::sync::Arc;

use dwsift_core::{DwarfGraph, Slice};

pub fn encoding() -> gimli::Encoding {
    gimli::Encoding {
        format: gimli::Format::Dwarf32,
        version: 4,
        address_size: 8,
    }
}

/// Round-trip a written unit through the reader into a graph.
pub fn graph_from_unit(mut unit: gimli::write::DwarfUnit) -> Arc<DwarfGraph> {
    let mut sections =
        gimli::write::Sections::new(gimli::write::EndianVec::new(gimli::LittleEndian));
    unit.write(&mut sections).expect("fixture writes cleanly");

    let mut buffers: HashMap<gimli::SectionId, Vec<u8>> = HashMap::new();
    sections
        .for_each(|id, data| {
            buffers.insert(id, data.slice().to_vec());
            Ok::<_, gimli::Error>(())
        })
        .expect("section walk is infallible");

    let dwarf = gimli::Dwarf::load(|id| -> Result<Slice, gimli::Error> {
        let bytes = buffers.get(&id).cloned().unwrap_or_default();
        Ok(Slice::new(Arc::from(bytes), gimli::LittleEndian))
    })
    .expect("fixture sections load");

    DwarfGraph::from_dwarf(dwarf).expect("fixture image parses")
}

/// One CU with three DIEs:
///
/// ```text
/// A  compile_unit   name="scenario.c", language=C99
/// └─ B  subprogram  name="f"
///    └─ C  variable location=exprloc{DW_OP_bregx 5 7}
/// ```
pub fn scenario_graph() -> Arc<DwarfGraph> {
    use gimli::write::AttributeValue;

    let mut dwarf = gimli::write::DwarfUnit::new(encoding());

    let a = dwarf.unit.root();
    dwarf
        .unit
        .get_mut(a)
        .set(gimli::DW_AT_name, AttributeValue::String(b"scenario.c".to_vec()));
    dwarf.unit.get_mut(a).set(
        gimli::DW_AT_language,
        AttributeValue::Language(gimli::DW_LANG_C99),
    );

    let b = dwarf.unit.add(a, gimli::DW_TAG_subprogram);
    dwarf
        .unit
        .get_mut(b)
        .set(gimli::DW_AT_name, AttributeValue::String(b"f".to_vec()));

    let c = dwarf.unit.add(b, gimli::DW_TAG_variable);
    // DW_OP_bregx 5 7: both operand projections are observable.
    dwarf.unit.get_mut(c).set(
        gimli::DW_AT_location,
        AttributeValue::Exprloc(gimli::write::Expression::raw(vec![0x92, 0x05, 0x07])),
    );

    graph_from_unit(dwarf)
}

/// One CU exercising `integrate`: an inlined subroutine referencing its
/// abstract origin.
pub fn integrate_graph() -> Arc<DwarfGraph> {
    use gimli::write::AttributeValue;

    let mut dwarf = gimli::write::DwarfUnit::new(encoding());

    let root = dwarf.unit.root();
    dwarf
        .unit
        .get_mut(root)
        .set(gimli::DW_AT_name, AttributeValue::String(b"inline.c".to_vec()));

    let callee = dwarf.unit.add(root, gimli::DW_TAG_subprogram);
    dwarf
        .unit
        .get_mut(callee)
        .set(gimli::DW_AT_name, AttributeValue::String(b"callee".to_vec()));

    let caller = dwarf.unit.add(root, gimli::DW_TAG_subprogram);
    dwarf
        .unit
        .get_mut(caller)
        .set(gimli::DW_AT_name, AttributeValue::String(b"caller".to_vec()));

    let inlined = dwarf.unit.add(caller, gimli::DW_TAG_inlined_subroutine);
    dwarf
        .unit
        .get_mut(inlined)
        .set(gimli::DW_AT_abstract_origin, AttributeValue::UnitRef(callee));

    graph_from_unit(dwarf)
}
