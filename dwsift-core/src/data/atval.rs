//! Attribute value decoding
//!
//! Maps a DWARF attribute onto the stream of pipeline values it denotes:
//! constants in an attribute-appropriate domain, strings, referenced DIEs, or
//! one value per decoded location-expression opcode. The mapping is
//! deterministic; unsupported shapes decode to an empty stream with a logged
//! warning rather than an error.

use std::sync::Arc;

use tracing::warn;

use crate::core::domain::{
    Constant, BOOL_DOM, DEC_DOM, DW_ACCESS_DOM, DW_ADDR_DOM, DW_ATE_DOM, DW_CC_DOM, DW_DS_DOM,
    DW_END_DOM, DW_ID_DOM, DW_INL_DOM, DW_LANG_DOM, DW_ORD_DOM, DW_VIRTUALITY_DOM, DW_VIS_DOM,
    HEX_DOM,
};
use crate::core::value::{LoclistOpValue, Value, ValueKind};
use crate::core::Result;
use crate::data::graph::{DieHandle, DwarfGraph, Slice};

/// Reconstruct the attribute's form from its parsed value. The reader does
/// not retain the raw form byte, so reference forms collapse onto their
/// canonical representative (`ref4`, `ref_addr`).
pub fn attr_form(attr: &gimli::Attribute<Slice>) -> gimli::DwForm {
    use gimli::AttributeValue as V;
    match attr.raw_value() {
        V::Addr(_) => gimli::DW_FORM_addr,
        V::Block(_) => gimli::DW_FORM_block,
        V::Data1(_) => gimli::DW_FORM_data1,
        V::Data2(_) => gimli::DW_FORM_data2,
        V::Data4(_) => gimli::DW_FORM_data4,
        V::Data8(_) => gimli::DW_FORM_data8,
        V::Sdata(_) => gimli::DW_FORM_sdata,
        V::Udata(_) => gimli::DW_FORM_udata,
        V::Exprloc(_) => gimli::DW_FORM_exprloc,
        V::Flag(_) => gimli::DW_FORM_flag,
        V::SecOffset(_) => gimli::DW_FORM_sec_offset,
        V::UnitRef(_) => gimli::DW_FORM_ref4,
        V::DebugInfoRef(_) => gimli::DW_FORM_ref_addr,
        V::DebugTypesRef(_) => gimli::DW_FORM_ref_sig8,
        V::String(_) => gimli::DW_FORM_string,
        V::DebugStrRef(_) => gimli::DW_FORM_strp,
        V::DebugLineStrRef(_) => gimli::DW_FORM_line_strp,
        V::DebugStrOffsetsIndex(_) => gimli::DW_FORM_strx,
        V::DebugAddrIndex(_) => gimli::DW_FORM_addrx,
        V::DebugLocListsIndex(_) => gimli::DW_FORM_loclistx,
        V::DebugRngListsIndex(_) => gimli::DW_FORM_rnglistx,
        V::LocationListsRef(_) | V::RangeListsRef(_) => gimli::DW_FORM_sec_offset,
        _ => gimli::DW_FORM_udata,
    }
}

/// Constant domain for plain data values of the given attribute.
fn data_dom(at: gimli::DwAt) -> &'static crate::core::domain::ConstantDom {
    match at {
        gimli::DW_AT_low_pc | gimli::DW_AT_high_pc | gimli::DW_AT_entry_pc => &HEX_DOM,
        _ => &DEC_DOM,
    }
}

/// Attributes whose `sec_offset` form denotes a location list.
fn is_location_attr(at: gimli::DwAt) -> bool {
    matches!(
        at,
        gimli::DW_AT_location
            | gimli::DW_AT_frame_base
            | gimli::DW_AT_data_member_location
            | gimli::DW_AT_vtable_elem_location
            | gimli::DW_AT_string_length
            | gimli::DW_AT_use_location
            | gimli::DW_AT_return_addr
            | gimli::DW_AT_static_link
            | gimli::DW_AT_segment
    )
}

/// Lazy stream of values decoded from one attribute.
pub enum ValueProducer {
    Empty,
    Single(Option<Value>),
    /// Streaming decode of an `exprloc` expression.
    Ops(OpsProducer),
    /// Pre-collected values (location lists, blocks).
    List(std::vec::IntoIter<Value>),
}

impl ValueProducer {
    pub fn next(&mut self) -> Result<Option<Value>> {
        match self {
            ValueProducer::Empty => Ok(None),
            ValueProducer::Single(slot) => Ok(slot.take()),
            ValueProducer::Ops(ops) => ops.next(),
            ValueProducer::List(iter) => Ok(iter.next()),
        }
    }
}

/// Streams location-expression opcodes without decoding the whole expression
/// up front.
pub struct OpsProducer {
    graph: Arc<DwarfGraph>,
    die: DieHandle,
    attr: gimli::Attribute<Slice>,
    encoding: gimli::Encoding,
    reader: Slice,
    total_len: usize,
    pos: usize,
}

impl OpsProducer {
    fn new(
        graph: Arc<DwarfGraph>,
        die: DieHandle,
        attr: gimli::Attribute<Slice>,
        expr: gimli::Expression<Slice>,
    ) -> Self {
        let encoding = graph.encoding(die);
        let reader = expr.0;
        let total_len = reader.len();
        Self {
            graph,
            die,
            attr,
            encoding,
            reader,
            total_len,
            pos: 0,
        }
    }

    fn next(&mut self) -> Result<Option<Value>> {
        use gimli::Reader;

        if self.reader.is_empty() {
            return Ok(None);
        }
        let offset = (self.total_len - self.reader.len()) as u64;
        // The opcode atom is the first byte; gimli's parsed Operation
        // normalises opcode families, so remember the raw atom.
        let atom = gimli::DwOp(self.reader.to_slice()?[0]);
        let op = gimli::Operation::parse(&mut self.reader, self.encoding)?;

        let value = Value::new(
            ValueKind::LoclistOp(LoclistOpValue::new(
                Arc::clone(&self.graph),
                self.die,
                self.attr.clone(),
                atom,
                offset,
                op,
            )),
            self.pos,
        );
        self.pos += 1;
        Ok(Some(value))
    }
}

/// Decode every opcode of an expression, positions continuing from `pos`.
fn collect_ops(
    graph: &Arc<DwarfGraph>,
    die: DieHandle,
    attr: &gimli::Attribute<Slice>,
    expr: gimli::Expression<Slice>,
    pos: &mut usize,
    out: &mut Vec<Value>,
) -> Result<()> {
    let mut producer = OpsProducer::new(Arc::clone(graph), die, attr.clone(), expr);
    producer.pos = *pos;
    while let Some(value) = producer.next()? {
        out.push(value);
    }
    *pos = producer.pos;
    Ok(())
}

/// Build the value stream for one attribute of one DIE.
pub fn attr_values(
    graph: &Arc<DwarfGraph>,
    die: DieHandle,
    attr: &gimli::Attribute<Slice>,
) -> Result<ValueProducer> {
    use gimli::AttributeValue as V;

    let single =
        |kind: ValueKind| ValueProducer::Single(Some(Value::new(kind, 0)));
    let constant =
        |value: i128, dom| single(ValueKind::Const(Constant::new(value, dom)));

    let at = attr.name();
    Ok(match attr.value() {
        V::Addr(addr) => constant(addr as i128, &HEX_DOM),
        V::Data1(v) => constant(v as i128, data_dom(at)),
        V::Data2(v) => constant(v as i128, data_dom(at)),
        V::Data4(v) => constant(v as i128, data_dom(at)),
        V::Data8(v) => constant(v as i128, data_dom(at)),
        V::Udata(v) => constant(v as i128, data_dom(at)),
        V::Sdata(v) => constant(v as i128, data_dom(at)),
        V::Flag(flag) => constant(flag as i128, &BOOL_DOM),

        V::Language(lang) => constant(lang.0 as i128, &DW_LANG_DOM),
        V::Encoding(enc) => constant(enc.0 as i128, &DW_ATE_DOM),
        V::Accessibility(access) => constant(access.0 as i128, &DW_ACCESS_DOM),
        V::Visibility(vis) => constant(vis.0 as i128, &DW_VIS_DOM),
        V::Virtuality(virt) => constant(virt.0 as i128, &DW_VIRTUALITY_DOM),
        V::Inline(inl) => constant(inl.0 as i128, &DW_INL_DOM),
        V::IdentifierCase(id) => constant(id.0 as i128, &DW_ID_DOM),
        V::CallingConvention(cc) => constant(cc.0 as i128, &DW_CC_DOM),
        V::Ordering(ord) => constant(ord.0 as i128, &DW_ORD_DOM),
        V::DecimalSign(ds) => constant(ds.0 as i128, &DW_DS_DOM),
        V::Endianity(end) => constant(end.0 as i128, &DW_END_DOM),
        V::AddressClass(class) => constant(class.0 as i128, &DW_ADDR_DOM),
        V::FileIndex(index) => constant(index as i128, &DEC_DOM),

        V::String(_) | V::DebugStrRef(_) | V::DebugLineStrRef(_) | V::DebugStrOffsetsIndex(_) => {
            let text = graph.attr_string(die, attr.value())?;
            single(ValueKind::Str(text))
        }

        V::UnitRef(_) | V::DebugInfoRef(_) => match graph.resolve_ref(die, &attr.value())? {
            Some(target) => single(ValueKind::Die(crate::core::value::DieValue::new(
                Arc::clone(graph),
                target,
            ))),
            None => ValueProducer::Empty,
        },

        V::Exprloc(expr) => ValueProducer::Ops(OpsProducer::new(
            Arc::clone(graph),
            die,
            attr.clone(),
            expr,
        )),

        V::LocationListsRef(offset) => {
            loclist_values(graph, die, attr, offset)?
        }
        V::SecOffset(offset) if is_location_attr(at) => {
            loclist_values(graph, die, attr, gimli::LocationListsOffset(offset))?
        }
        V::SecOffset(offset) => constant(offset as i128, &HEX_DOM),

        V::Block(block) => {
            use gimli::Reader;
            let bytes = block.to_slice()?;
            let seq: Vec<Value> = bytes
                .iter()
                .enumerate()
                .map(|(i, &b)| {
                    Value::new(ValueKind::Const(Constant::new(b, &DEC_DOM)), i)
                })
                .collect();
            single(ValueKind::Seq(seq))
        }

        V::DebugTypesRef(signature) => constant(signature.0 as i128, &HEX_DOM),

        other => {
            warn!(
                "value: unhandled attribute shape {:?} for {}",
                other,
                Constant::new(at.0, &crate::core::domain::DW_ATTR_DOM)
            );
            ValueProducer::Empty
        }
    })
}

/// Concatenate the opcode streams of every entry of a location list.
fn loclist_values(
    graph: &Arc<DwarfGraph>,
    die: DieHandle,
    attr: &gimli::Attribute<Slice>,
    offset: gimli::LocationListsOffset,
) -> Result<ValueProducer> {
    let unit = graph.unit(die.unit_index());
    let mut iter = graph.dwarf().locations(unit, offset)?;
    let mut out = Vec::new();
    let mut pos = 0usize;
    while let Some(entry) = iter.next()? {
        collect_ops(graph, die, attr, entry.data, &mut pos, &mut out)?;
    }
    Ok(ValueProducer::List(out.into_iter()))
}

/// First and second integer operand of a location opcode, as constants.
pub fn operation_operands(
    op: &gimli::Operation<Slice>,
) -> (Option<Constant>, Option<Constant>) {
    use gimli::Operation as O;
    let dec = |v: i128| Constant::new(v, &DEC_DOM);
    let hex = |v: i128| Constant::new(v, &HEX_DOM);
    match op {
        O::Pick { index } => (Some(dec(*index as i128)), None),
        O::PlusConstant { value } => (Some(dec(*value as i128)), None),
        O::Bra { target } => (Some(dec(*target as i128)), None),
        O::Skip { target } => (Some(dec(*target as i128)), None),
        O::UnsignedConstant { value } => (Some(dec(*value as i128)), None),
        O::SignedConstant { value } => (Some(dec(*value as i128)), None),
        O::Register { register } => (Some(dec(register.0 as i128)), None),
        O::RegisterOffset {
            register, offset, ..
        } => (Some(dec(register.0 as i128)), Some(dec(*offset as i128))),
        O::FrameOffset { offset } => (Some(dec(*offset as i128)), None),
        O::Piece {
            size_in_bits,
            bit_offset,
        } => (
            Some(dec(*size_in_bits as i128)),
            bit_offset.map(|b| dec(b as i128)),
        ),
        O::Address { address } => (Some(hex(*address as i128)), None),
        O::ImplicitPointer { value, byte_offset } => {
            (Some(hex(value.0 as i128)), Some(dec(*byte_offset as i128)))
        }
        O::ParameterRef { offset } => (Some(hex(offset.0 as i128)), None),
        O::Call { offset } => match offset {
            gimli::DieReference::UnitRef(o) => (Some(hex(o.0 as i128)), None),
            gimli::DieReference::DebugInfoRef(o) => (Some(hex(o.0 as i128)), None),
        },
        O::Deref { size, .. } => (Some(dec(*size as i128)), None),
        _ => (None, None),
    }
}
