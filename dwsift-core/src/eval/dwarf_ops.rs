//! Value-shape operators and predicates over DWARF entities
//!
//! The shape operators pop the top of stack, inspect it, and either push one
//! derived value (emitting the frame) or skip (dropping it). They are
//! polymorphic over Die / Attribute / LoclistOp; a shape that does not handle
//! the popped kind skips quietly, while kinds outside the polymorphic set are
//! reported as type errors.

use std::sync::Arc;

use crate::core::domain::{
    Constant, DW_ATTR_DOM, DW_FORM_DOM, DW_LOCOP_SHORT_DOM, DW_TAG_DOM, HEX_DOM,
};
use crate::core::{
    AttrValue, Brevity, DieValue, LoclistOpValue, QueryError, Result, Stack, Value, ValueKind,
    ValueType,
};
use crate::data::{attr_values, operation_operands, ValueProducer};
use crate::eval::op::{report_expects, Op, OpRef, Pred, PredResult};

/// One polymorphic shape operator. `on_*` returns `true` when it pushed a
/// value and the frame should be emitted; the default skips the frame.
pub(crate) trait Shape {
    fn name(&self) -> String;

    fn on_die(&self, stack: &mut Stack, die: &DieValue) -> Result<bool> {
        let _ = (stack, die);
        Ok(false)
    }

    fn on_attr(&self, stack: &mut Stack, attr: &AttrValue) -> Result<bool> {
        let _ = (stack, attr);
        Ok(false)
    }

    fn on_loclist_op(&self, stack: &mut Stack, op: &LoclistOpValue) -> Result<bool> {
        let _ = (stack, op);
        Ok(false)
    }
}

/// Drives a [`Shape`] over the upstream frames.
pub(crate) struct ShapeExec<S: Shape> {
    upstream: OpRef,
    shape: S,
}

impl<S: Shape> ShapeExec<S> {
    pub(crate) fn new(upstream: OpRef, shape: S) -> Self {
        Self { upstream, shape }
    }
}

impl<S: Shape> Op for ShapeExec<S> {
    fn next(&mut self) -> Result<Option<Stack>> {
        while let Some(mut stack) = self.upstream.next()? {
            let top = stack.pop();
            match top.as_ref().map(Value::kind) {
                Some(ValueKind::Die(d)) => {
                    if self.shape.on_die(&mut stack, d)? {
                        return Ok(Some(stack));
                    }
                }
                Some(ValueKind::Attr(a)) => {
                    if self.shape.on_attr(&mut stack, a)? {
                        return Ok(Some(stack));
                    }
                }
                Some(ValueKind::LoclistOp(o)) => {
                    if self.shape.on_loclist_op(&mut stack, o)? {
                        return Ok(Some(stack));
                    }
                }
                _ => report_expects(
                    &self.shape.name(),
                    &[ValueType::DIE, ValueType::ATTR, ValueType::LOCLIST_OP],
                    top.as_ref(),
                ),
            }
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.upstream.reset();
    }

    fn name(&self) -> String {
        self.shape.name()
    }
}

/// `offset`: section-global DIE offset, or opcode byte offset.
pub(crate) struct OffsetShape;

impl Shape for OffsetShape {
    fn name(&self) -> String {
        "offset".to_string()
    }

    fn on_die(&self, stack: &mut Stack, die: &DieValue) -> Result<bool> {
        let cst = Constant::new(die.global_offset(), &HEX_DOM);
        stack.push(Value::new(ValueKind::Const(cst), 0));
        Ok(true)
    }

    fn on_loclist_op(&self, stack: &mut Stack, op: &LoclistOpValue) -> Result<bool> {
        let cst = Constant::new(op.offset(), &HEX_DOM);
        stack.push(Value::new(ValueKind::Const(cst), 0));
        Ok(true)
    }
}

/// `label`: tag of a DIE, name of an attribute, atom of an opcode.
pub(crate) struct LabelShape;

impl Shape for LabelShape {
    fn name(&self) -> String {
        "label".to_string()
    }

    fn on_die(&self, stack: &mut Stack, die: &DieValue) -> Result<bool> {
        let tag = die.graph().die_tag(die.die())?;
        let cst = Constant::new(tag.0, &DW_TAG_DOM);
        stack.push(Value::new(ValueKind::Const(cst), 0));
        Ok(true)
    }

    fn on_attr(&self, stack: &mut Stack, attr: &AttrValue) -> Result<bool> {
        let cst = Constant::new(attr.name().0, &DW_ATTR_DOM);
        stack.push(Value::new(ValueKind::Const(cst), 0));
        Ok(true)
    }

    fn on_loclist_op(&self, stack: &mut Stack, op: &LoclistOpValue) -> Result<bool> {
        let cst = Constant::new(op.atom().0, &DW_LOCOP_SHORT_DOM);
        stack.push(Value::new(ValueKind::Const(cst), 0));
        Ok(true)
    }
}

/// `form`: encoding form of an attribute.
pub(crate) struct FormShape;

impl Shape for FormShape {
    fn name(&self) -> String {
        "form".to_string()
    }

    fn on_attr(&self, stack: &mut Stack, attr: &AttrValue) -> Result<bool> {
        let cst = Constant::new(attr.form().0, &DW_FORM_DOM);
        stack.push(Value::new(ValueKind::Const(cst), 0));
        Ok(true)
    }
}

/// `parent`: parent DIE of a DIE (skips roots), owning DIE of an attribute.
pub(crate) struct ParentShape;

impl Shape for ParentShape {
    fn name(&self) -> String {
        "parent".to_string()
    }

    fn on_die(&self, stack: &mut Stack, die: &DieValue) -> Result<bool> {
        match die.graph().find_parent(die.die())? {
            Some(parent) => {
                stack.push(Value::new(
                    ValueKind::Die(DieValue::new(Arc::clone(die.graph()), parent)),
                    0,
                ));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn on_attr(&self, stack: &mut Stack, attr: &AttrValue) -> Result<bool> {
        stack.push(Value::new(
            ValueKind::Die(DieValue::new(Arc::clone(attr.graph()), attr.die())),
            0,
        ));
        Ok(true)
    }
}

/// `integrate`: follow `DW_AT_abstract_origin`, else `DW_AT_specification`.
/// Single hop; DIEs with neither attribute drop the frame.
pub(crate) struct IntegrateShape;

impl Shape for IntegrateShape {
    fn name(&self) -> String {
        "integrate".to_string()
    }

    fn on_die(&self, stack: &mut Stack, die: &DieValue) -> Result<bool> {
        let graph = die.graph();
        let attr = match graph.attr(die.die(), gimli::DW_AT_abstract_origin)? {
            Some(attr) => Some(attr),
            None => graph.attr(die.die(), gimli::DW_AT_specification)?,
        };
        let Some(attr) = attr else {
            return Ok(false);
        };

        match graph.resolve_ref(die.die(), &attr.value())? {
            Some(target) => {
                stack.push(Value::new(
                    ValueKind::Die(DieValue::new(Arc::clone(graph), target)),
                    0,
                ));
                Ok(true)
            }
            None => Err(anyhow::anyhow!(
                "integrate: unresolvable reference on DIE at {:#x}",
                die.global_offset()
            )),
        }
    }
}

/// `attr_named(X)`: the DIE's attribute X, skipping DIEs without it. This is
/// the first half of `@AT_X`; the builtin composes it with [`ValueOp`].
pub(crate) struct AttrNamedShape {
    pub(crate) at: gimli::DwAt,
}

impl Shape for AttrNamedShape {
    fn name(&self) -> String {
        format!(
            "@AT_{}",
            Constant::new(self.at.0, &DW_ATTR_DOM).show(Brevity::Brief)
        )
    }

    fn on_die(&self, stack: &mut Stack, die: &DieValue) -> Result<bool> {
        match die.graph().attr(die.die(), self.at)? {
            Some(attr) => {
                stack.push(Value::new(
                    ValueKind::Attr(AttrValue::new(Arc::clone(die.graph()), die.die(), attr)),
                    0,
                ));
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// `value`: fan out the decoded values of an attribute.
pub struct ValueOp {
    upstream: OpRef,
    state: Option<(Stack, ValueProducer)>,
}

impl ValueOp {
    pub fn new(upstream: OpRef) -> Self {
        Self {
            upstream,
            state: None,
        }
    }
}

impl Op for ValueOp {
    fn next(&mut self) -> Result<Option<Stack>> {
        loop {
            if self.state.is_none() {
                let Some(mut stack) = self.upstream.next()? else {
                    return Ok(None);
                };
                let top = stack.pop();
                match top.as_ref().map(Value::kind) {
                    Some(ValueKind::Attr(a)) => {
                        let producer = attr_values(a.graph(), a.die(), a.attr())?;
                        self.state = Some((stack, producer));
                    }
                    _ => {
                        report_expects(&self.name(), &[ValueType::ATTR], top.as_ref());
                        continue;
                    }
                }
            }

            if let Some((stack, producer)) = &mut self.state {
                if let Some(value) = producer.next()? {
                    let mut out = stack.clone();
                    out.push(value);
                    return Ok(Some(out));
                }
            }
            self.state = None;
        }
    }

    fn reset(&mut self) {
        self.state = None;
        self.upstream.reset();
    }

    fn name(&self) -> String {
        "value".to_string()
    }
}

/// Which opcode operand `@number` / `@number2` projects.
#[derive(Debug, Clone, Copy)]
pub(crate) enum OperandSel {
    First,
    Second,
}

/// Projects one integer operand of a location opcode; opcodes without that
/// operand drop the frame.
pub(crate) struct OperandOp {
    upstream: OpRef,
    sel: OperandSel,
}

impl OperandOp {
    pub(crate) fn new(upstream: OpRef, sel: OperandSel) -> Self {
        Self { upstream, sel }
    }
}

impl Op for OperandOp {
    fn next(&mut self) -> Result<Option<Stack>> {
        while let Some(mut stack) = self.upstream.next()? {
            let top = stack.pop();
            match top.as_ref().map(Value::kind) {
                Some(ValueKind::LoclistOp(op)) => {
                    let (first, second) = operation_operands(op.op());
                    let picked = match self.sel {
                        OperandSel::First => first,
                        OperandSel::Second => second,
                    };
                    if let Some(cst) = picked {
                        stack.push(Value::new(ValueKind::Const(cst), 0));
                        return Ok(Some(stack));
                    }
                }
                _ => report_expects(&self.name(), &[ValueType::LOCLIST_OP], top.as_ref()),
            }
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.upstream.reset();
    }

    fn name(&self) -> String {
        match self.sel {
            OperandSel::First => "@number".to_string(),
            OperandSel::Second => "@number2".to_string(),
        }
    }
}

fn check_comparable(op: &str, a: &Constant, b: &Constant) -> Result<()> {
    if a.comparable_with(b) {
        Ok(())
    } else {
        Err(QueryError::IncomparableConstants {
            op: op.to_string(),
            lhs: a.dom().name,
            rhs: b.dom().name,
        }
        .into())
    }
}

/// `?root`: DIEs with no parent. Attributes are never roots.
pub(crate) struct RootPred;

impl Pred for RootPred {
    fn result(&mut self, stack: &Stack) -> Result<PredResult> {
        match stack.top().map(Value::kind) {
            Some(ValueKind::Die(d)) => Ok(d.graph().is_root(d.die())?.into()),
            Some(ValueKind::Attr(_)) => Ok(PredResult::No),
            _ => {
                report_expects(&self.name(), &[ValueType::DIE, ValueType::ATTR], stack.top());
                Ok(PredResult::Fail)
            }
        }
    }

    fn reset(&mut self) {}

    fn name(&self) -> String {
        "?root".to_string()
    }
}

/// `?AT_X`: presence of attribute X on a DIE, name match on an attribute,
/// comparable-equality on a constant.
pub(crate) struct AttrPred {
    at: gimli::DwAt,
    cst: Constant,
}

impl AttrPred {
    pub(crate) fn new(at: gimli::DwAt) -> Self {
        Self {
            at,
            cst: Constant::new(at.0, &DW_ATTR_DOM),
        }
    }
}

impl Pred for AttrPred {
    fn result(&mut self, stack: &Stack) -> Result<PredResult> {
        match stack.top().map(Value::kind) {
            Some(ValueKind::Die(d)) => Ok(d.graph().die_has_attr(d.die(), self.at)?.into()),
            Some(ValueKind::Attr(a)) => Ok((a.name() == self.at).into()),
            Some(ValueKind::Const(c)) => {
                check_comparable(&self.name(), &self.cst, c)?;
                Ok((self.cst == *c).into())
            }
            _ => {
                report_expects(
                    &self.name(),
                    &[ValueType::DIE, ValueType::ATTR, ValueType::CONST],
                    stack.top(),
                );
                Ok(PredResult::Fail)
            }
        }
    }

    fn reset(&mut self) {}

    fn name(&self) -> String {
        format!("?AT_{}", self.cst.show(Brevity::Brief))
    }
}

/// `?TAG_X`: tag match on a DIE, comparable-equality on a constant.
pub(crate) struct TagPred {
    tag: gimli::DwTag,
    cst: Constant,
}

impl TagPred {
    pub(crate) fn new(tag: gimli::DwTag) -> Self {
        Self {
            tag,
            cst: Constant::new(tag.0, &DW_TAG_DOM),
        }
    }
}

impl Pred for TagPred {
    fn result(&mut self, stack: &Stack) -> Result<PredResult> {
        match stack.top().map(Value::kind) {
            Some(ValueKind::Die(d)) => Ok((d.graph().die_tag(d.die())? == self.tag).into()),
            Some(ValueKind::Const(c)) => {
                check_comparable(&self.name(), &self.cst, c)?;
                Ok((self.cst == *c).into())
            }
            _ => {
                report_expects(
                    &self.name(),
                    &[ValueType::DIE, ValueType::CONST],
                    stack.top(),
                );
                Ok(PredResult::Fail)
            }
        }
    }

    fn reset(&mut self) {}

    fn name(&self) -> String {
        format!("?TAG_{}", self.cst.show(Brevity::Brief))
    }
}

/// `?FORM_X`: form match on an attribute, comparable-equality on a constant.
pub(crate) struct FormPred {
    form: gimli::DwForm,
    cst: Constant,
}

impl FormPred {
    pub(crate) fn new(form: gimli::DwForm) -> Self {
        Self {
            form,
            cst: Constant::new(form.0, &DW_FORM_DOM),
        }
    }
}

impl Pred for FormPred {
    fn result(&mut self, stack: &Stack) -> Result<PredResult> {
        match stack.top().map(Value::kind) {
            Some(ValueKind::Attr(a)) => Ok((a.form() == self.form).into()),
            Some(ValueKind::Const(c)) => {
                check_comparable(&self.name(), &self.cst, c)?;
                Ok((self.cst == *c).into())
            }
            _ => {
                report_expects(
                    &self.name(),
                    &[ValueType::ATTR, ValueType::CONST],
                    stack.top(),
                );
                Ok(PredResult::Fail)
            }
        }
    }

    fn reset(&mut self) {}

    fn name(&self) -> String {
        format!("?FORM_{}", self.cst.show(Brevity::Brief))
    }
}
