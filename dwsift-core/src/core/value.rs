//! Tagged values flowing through query pipelines
//!
//! Built-in value kinds are a closed enum; user-defined kinds enter the
//! pipeline as boxed trait objects carrying a registry-allocated type tag.
//! Every value knows its position (zero-based ordinal within the producing
//! stream), can be deep-cloned, compared three-way, and rendered.

use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use crate::core::domain::{Brevity, Constant};
use crate::data::{DieHandle, DwarfGraph, Slice};

/// Runtime tag identifying a value kind. Built-in tags are fixed; fresh tags
/// for user-defined kinds come from [`ValueType::alloc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueType(u16);

impl ValueType {
    pub const CONST: ValueType = ValueType(0);
    pub const STR: ValueType = ValueType(1);
    pub const SEQ: ValueType = ValueType(2);
    pub const DIE: ValueType = ValueType(3);
    pub const ATTR: ValueType = ValueType(4);
    pub const LOCLIST_OP: ValueType = ValueType(5);

    /// Allocate a fresh type tag under the given diagnostic name.
    pub fn alloc(name: &'static str) -> ValueType {
        let mut names = registry().lock().expect("value type registry poisoned");
        let tag = names.len() as u16;
        names.push(name);
        ValueType(tag)
    }

    pub fn name(self) -> &'static str {
        registry().lock().expect("value type registry poisoned")[self.0 as usize]
    }
}

fn registry() -> &'static Mutex<Vec<&'static str>> {
    static REGISTRY: OnceLock<Mutex<Vec<&'static str>>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        Mutex::new(vec![
            "T_CONST",
            "T_STR",
            "T_SEQ",
            "T_DIE",
            "T_ATTR",
            "T_LOCLIST_OP",
        ])
    })
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a three-way value comparison. `Fail` marks incomparable operands
/// (different kinds, or constants from incompatible domains).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpResult {
    Less,
    Equal,
    Greater,
    Fail,
}

impl From<Ordering> for CmpResult {
    fn from(ord: Ordering) -> Self {
        match ord {
            Ordering::Less => CmpResult::Less,
            Ordering::Equal => CmpResult::Equal,
            Ordering::Greater => CmpResult::Greater,
        }
    }
}

/// User-defined value payload. Implementations allocate their tag once via
/// [`ValueType::alloc`] and return it from `vtype`.
pub trait CustomValue: fmt::Debug {
    fn vtype(&self) -> ValueType;
    fn clone_box(&self) -> Box<dyn CustomValue>;
    /// Compare against another custom value of the same tag.
    fn cmp_custom(&self, other: &dyn CustomValue) -> CmpResult;
    fn show(&self, brv: Brevity) -> String;
}

impl Clone for Box<dyn CustomValue> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// A DIE handle bound to its owning graph.
#[derive(Debug, Clone)]
pub struct DieValue {
    graph: Arc<DwarfGraph>,
    die: DieHandle,
}

impl DieValue {
    pub fn new(graph: Arc<DwarfGraph>, die: DieHandle) -> Self {
        Self { graph, die }
    }

    pub fn graph(&self) -> &Arc<DwarfGraph> {
        &self.graph
    }

    pub fn die(&self) -> DieHandle {
        self.die
    }

    pub fn global_offset(&self) -> u64 {
        self.graph.die_global_offset(self.die)
    }

    fn show(&self, brv: Brevity) -> String {
        let tag = match self.graph.die_tag(self.die) {
            Ok(tag) => Constant::new(tag.0, &crate::core::domain::DW_TAG_DOM).show(Brevity::Brief),
            Err(_) => "???".to_string(),
        };
        match brv {
            Brevity::Brief => format!("[{:#x}]", self.global_offset()),
            Brevity::Full => format!("[{:#x}] {}", self.global_offset(), tag),
        }
    }
}

/// An attribute bound to its owning DIE and graph.
#[derive(Debug, Clone)]
pub struct AttrValue {
    graph: Arc<DwarfGraph>,
    die: DieHandle,
    attr: gimli::Attribute<Slice>,
}

impl AttrValue {
    pub fn new(graph: Arc<DwarfGraph>, die: DieHandle, attr: gimli::Attribute<Slice>) -> Self {
        Self { graph, die, attr }
    }

    pub fn graph(&self) -> &Arc<DwarfGraph> {
        &self.graph
    }

    pub fn die(&self) -> DieHandle {
        self.die
    }

    pub fn attr(&self) -> &gimli::Attribute<Slice> {
        &self.attr
    }

    pub fn name(&self) -> gimli::DwAt {
        self.attr.name()
    }

    pub fn form(&self) -> gimli::DwForm {
        crate::data::attr_form(&self.attr)
    }

    fn show(&self, brv: Brevity) -> String {
        let name = Constant::new(self.name().0, &crate::core::domain::DW_ATTR_DOM).show(brv);
        match brv {
            Brevity::Brief => name,
            Brevity::Full => {
                let form = Constant::new(self.form().0, &crate::core::domain::DW_FORM_DOM)
                    .show(Brevity::Brief);
                format!("{name} ({form})")
            }
        }
    }
}

/// One decoded location-expression opcode, together with the attribute it was
/// decoded from.
#[derive(Debug, Clone)]
pub struct LoclistOpValue {
    graph: Arc<DwarfGraph>,
    die: DieHandle,
    attr: gimli::Attribute<Slice>,
    /// Raw opcode atom. Kept separately because the parsed operation
    /// normalises opcode families (lit*, breg*, ...).
    atom: gimli::DwOp,
    /// Byte offset of the opcode within its expression.
    offset: u64,
    op: gimli::Operation<Slice>,
}

impl LoclistOpValue {
    pub fn new(
        graph: Arc<DwarfGraph>,
        die: DieHandle,
        attr: gimli::Attribute<Slice>,
        atom: gimli::DwOp,
        offset: u64,
        op: gimli::Operation<Slice>,
    ) -> Self {
        Self {
            graph,
            die,
            attr,
            atom,
            offset,
            op,
        }
    }

    pub fn graph(&self) -> &Arc<DwarfGraph> {
        &self.graph
    }

    pub fn die(&self) -> DieHandle {
        self.die
    }

    pub fn attr(&self) -> &gimli::Attribute<Slice> {
        &self.attr
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn op(&self) -> &gimli::Operation<Slice> {
        &self.op
    }

    /// The opcode atom (`DW_OP_*` code) of this operation.
    pub fn atom(&self) -> gimli::DwOp {
        self.atom
    }

    fn show(&self, _brv: Brevity) -> String {
        let atom = Constant::new(self.atom().0, &crate::core::domain::DW_LOCOP_SHORT_DOM)
            .show(Brevity::Brief);
        format!("{:#x} {atom}", self.offset)
    }
}

/// Kind-specific payload of a [`Value`].
#[derive(Debug, Clone)]
pub enum ValueKind {
    Const(Constant),
    Str(String),
    Seq(Vec<Value>),
    Die(DieValue),
    Attr(AttrValue),
    LoclistOp(LoclistOpValue),
    Custom(Box<dyn CustomValue>),
}

/// A single pipeline value: kind payload plus position index.
#[derive(Debug, Clone)]
pub struct Value {
    pos: usize,
    kind: ValueKind,
}

impl Value {
    pub fn new(kind: ValueKind, pos: usize) -> Self {
        Self { pos, kind }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn into_kind(self) -> ValueKind {
        self.kind
    }

    pub fn type_tag(&self) -> ValueType {
        match &self.kind {
            ValueKind::Const(_) => ValueType::CONST,
            ValueKind::Str(_) => ValueType::STR,
            ValueKind::Seq(_) => ValueType::SEQ,
            ValueKind::Die(_) => ValueType::DIE,
            ValueKind::Attr(_) => ValueType::ATTR,
            ValueKind::LoclistOp(_) => ValueType::LOCLIST_OP,
            ValueKind::Custom(c) => c.vtype(),
        }
    }

    /// Downcast into the payload type, handing the value back on mismatch.
    pub fn downcast<T: TypedValue>(self) -> std::result::Result<T, Value> {
        let pos = self.pos;
        T::from_kind(self.kind).map_err(|kind| Value { pos, kind })
    }

    pub fn downcast_ref<T: TypedValue>(&self) -> Option<&T> {
        T::kind_ref(&self.kind)
    }

    /// Three-way comparison. Values of different kinds are incomparable.
    pub fn cmp_value(&self, other: &Value) -> CmpResult {
        match (&self.kind, &other.kind) {
            (ValueKind::Const(a), ValueKind::Const(b)) => match a.partial_cmp_const(b) {
                Some(ord) => ord.into(),
                None => CmpResult::Fail,
            },
            (ValueKind::Str(a), ValueKind::Str(b)) => a.cmp(b).into(),
            (ValueKind::Seq(a), ValueKind::Seq(b)) => cmp_sequences(a, b),
            (ValueKind::Die(a), ValueKind::Die(b)) => {
                a.global_offset().cmp(&b.global_offset()).into()
            }
            (ValueKind::Attr(a), ValueKind::Attr(b)) => {
                let ka = (a.graph.die_global_offset(a.die), a.name().0);
                let kb = (b.graph.die_global_offset(b.die), b.name().0);
                ka.cmp(&kb).into()
            }
            (ValueKind::LoclistOp(a), ValueKind::LoclistOp(b)) => {
                let ka = (a.graph.die_global_offset(a.die), a.attr.name().0, a.offset);
                let kb = (b.graph.die_global_offset(b.die), b.attr.name().0, b.offset);
                ka.cmp(&kb).into()
            }
            (ValueKind::Custom(a), ValueKind::Custom(b)) if a.vtype() == b.vtype() => {
                a.cmp_custom(b.as_ref())
            }
            _ => CmpResult::Fail,
        }
    }

    pub fn show(&self, brv: Brevity) -> String {
        match &self.kind {
            ValueKind::Const(c) => c.show(brv),
            ValueKind::Str(s) => s.clone(),
            ValueKind::Seq(seq) => {
                let elems: Vec<String> =
                    seq.iter().map(|v| v.show(Brevity::Brief)).collect();
                format!("[{}]", elems.join(", "))
            }
            ValueKind::Die(d) => d.show(brv),
            ValueKind::Attr(a) => a.show(brv),
            ValueKind::LoclistOp(op) => op.show(brv),
            ValueKind::Custom(c) => c.show(brv),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.show(Brevity::Brief))
    }
}

/// Sequences compare by length, then element types, then element values.
fn cmp_sequences(a: &[Value], b: &[Value]) -> CmpResult {
    match a.len().cmp(&b.len()) {
        Ordering::Equal => {}
        ord => return ord.into(),
    }
    for (x, y) in a.iter().zip(b.iter()) {
        let tx = x.type_tag();
        let ty = y.type_tag();
        if tx != ty {
            return CmpResult::Fail;
        }
    }
    for (x, y) in a.iter().zip(b.iter()) {
        match x.cmp_value(y) {
            CmpResult::Equal => {}
            other => return other,
        }
    }
    CmpResult::Equal
}

/// Payload types extractable from a [`Value`] by tag.
pub trait TypedValue: Sized {
    fn vtype() -> ValueType;
    fn from_kind(kind: ValueKind) -> std::result::Result<Self, ValueKind>;
    fn kind_ref(kind: &ValueKind) -> Option<&Self>;
}

macro_rules! impl_typed_value {
    ($ty:ty, $variant:ident, $vtype:expr) => {
        impl TypedValue for $ty {
            fn vtype() -> ValueType {
                $vtype
            }

            fn from_kind(kind: ValueKind) -> std::result::Result<Self, ValueKind> {
                match kind {
                    ValueKind::$variant(v) => Ok(v),
                    other => Err(other),
                }
            }

            fn kind_ref(kind: &ValueKind) -> Option<&Self> {
                match kind {
                    ValueKind::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_typed_value!(Constant, Const, ValueType::CONST);
impl_typed_value!(String, Str, ValueType::STR);
impl_typed_value!(Vec<Value>, Seq, ValueType::SEQ);
impl_typed_value!(DieValue, Die, ValueType::DIE);
impl_typed_value!(AttrValue, Attr, ValueType::ATTR);
impl_typed_value!(LoclistOpValue, LoclistOp, ValueType::LOCLIST_OP);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{DEC_DOM, DW_TAG_DOM, HEX_DOM};

    fn cst(v: u32) -> Value {
        Value::new(ValueKind::Const(Constant::new(v, &DEC_DOM)), 0)
    }

    #[test]
    fn test_clone_compares_equal() {
        let v = cst(42);
        assert_eq!(v.clone().cmp_value(&v), CmpResult::Equal);

        let s = Value::new(ValueKind::Str("abc".into()), 0);
        assert_eq!(s.clone().cmp_value(&s), CmpResult::Equal);

        let seq = Value::new(ValueKind::Seq(vec![cst(1), cst(2)]), 0);
        assert_eq!(seq.clone().cmp_value(&seq), CmpResult::Equal);
    }

    #[test]
    fn test_cross_kind_comparison_fails() {
        let c = cst(1);
        let s = Value::new(ValueKind::Str("1".into()), 0);
        assert_eq!(c.cmp_value(&s), CmpResult::Fail);
    }

    #[test]
    fn test_constant_domain_gates_comparison() {
        let dec = cst(0x11);
        let hex = Value::new(ValueKind::Const(Constant::new(0x11_u32, &HEX_DOM)), 0);
        let tag = Value::new(ValueKind::Const(Constant::new(0x11_u32, &DW_TAG_DOM)), 0);
        assert_eq!(dec.cmp_value(&hex), CmpResult::Equal);
        assert_eq!(dec.cmp_value(&tag), CmpResult::Fail);
    }

    #[test]
    fn test_sequence_ordering() {
        let a = Value::new(ValueKind::Seq(vec![cst(1), cst(2)]), 0);
        let b = Value::new(ValueKind::Seq(vec![cst(1), cst(3)]), 0);
        let shorter = Value::new(ValueKind::Seq(vec![cst(9)]), 0);
        assert_eq!(a.cmp_value(&b), CmpResult::Less);
        assert_eq!(b.cmp_value(&a), CmpResult::Greater);
        assert_eq!(shorter.cmp_value(&a), CmpResult::Less);
    }

    #[test]
    fn test_seq_clone_is_deep() {
        let orig = Value::new(ValueKind::Seq(vec![cst(1)]), 0);
        let mut copy = orig.clone();
        if let ValueKind::Seq(elems) = &mut copy.kind {
            elems.push(cst(2));
        }
        if let ValueKind::Seq(elems) = orig.kind() {
            assert_eq!(elems.len(), 1);
        } else {
            panic!("expected sequence");
        }
    }

    #[test]
    fn test_downcast_round_trip() {
        let v = cst(7);
        let c: Constant = v.downcast().expect("constant expected");
        assert_eq!(c.value(), 7);

        let s = Value::new(ValueKind::Str("x".into()), 3);
        let back = s.downcast::<Constant>().expect_err("mismatch expected");
        assert_eq!(back.pos(), 3);
        assert_eq!(back.type_tag(), ValueType::STR);
    }

    #[test]
    fn test_alloc_registers_fresh_tag() {
        let t = ValueType::alloc("T_TEST_CUSTOM");
        assert_ne!(t, ValueType::CONST);
        assert_eq!(t.name(), "T_TEST_CUSTOM");
    }
}
