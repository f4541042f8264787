//! DIE traversal operators: `winfo`, `unit`, `child`, `attribute`
//!
//! All four are fan-out operators: one upstream frame produces zero or more
//! derived frames, each a deep clone of the input with one value pushed.
//! Position indices restart at 0 per input frame.

use std::sync::Arc;

use crate::core::{AttrValue, DieValue, Result, Stack, Value, ValueKind, ValueType};
use crate::data::{DieHandle, DwarfGraph};
use crate::eval::op::{report_expects, Op, OpRef};

/// Root producer: for each upstream frame, emits one frame per DIE of the
/// image, in file order across all units.
pub struct Winfo {
    upstream: OpRef,
    graph: Arc<DwarfGraph>,
    cur: Option<Stack>,
    idx: usize,
    pos: usize,
}

impl Winfo {
    pub fn new(upstream: OpRef, graph: Arc<DwarfGraph>) -> Self {
        Self {
            upstream,
            graph,
            cur: None,
            idx: 0,
            pos: 0,
        }
    }
}

impl Op for Winfo {
    fn next(&mut self) -> Result<Option<Stack>> {
        loop {
            if self.cur.is_none() {
                match self.upstream.next()? {
                    Some(stack) => {
                        self.cur = Some(stack);
                        self.idx = 0;
                        self.pos = 0;
                    }
                    None => return Ok(None),
                }
            }

            let dies = self.graph.all_dies()?;
            if self.idx < dies.len() {
                let die = dies[self.idx];
                self.idx += 1;
                if let Some(cur) = &self.cur {
                    let mut out = cur.clone();
                    out.push(Value::new(
                        ValueKind::Die(DieValue::new(Arc::clone(&self.graph), die)),
                        self.pos,
                    ));
                    self.pos += 1;
                    return Ok(Some(out));
                }
            }

            self.cur = None;
        }
    }

    fn reset(&mut self) {
        self.cur = None;
        self.upstream.reset();
    }

    fn name(&self) -> String {
        "winfo".to_string()
    }
}

/// Pops a Die or Attribute and emits one frame per DIE of the owning unit.
pub struct UnitOp {
    upstream: OpRef,
    graph: Arc<DwarfGraph>,
    cur: Option<Stack>,
    unit_index: usize,
    idx: usize,
    pos: usize,
}

impl UnitOp {
    pub fn new(upstream: OpRef, graph: Arc<DwarfGraph>) -> Self {
        Self {
            upstream,
            graph,
            cur: None,
            unit_index: 0,
            idx: 0,
            pos: 0,
        }
    }
}

impl Op for UnitOp {
    fn next(&mut self) -> Result<Option<Stack>> {
        loop {
            while self.cur.is_none() {
                let Some(mut stack) = self.upstream.next()? else {
                    return Ok(None);
                };
                let top = stack.pop();
                let unit_index = match top.as_ref().map(Value::kind) {
                    Some(ValueKind::Die(d)) => Some(d.die().unit_index()),
                    Some(ValueKind::Attr(a)) => Some(a.die().unit_index()),
                    _ => {
                        report_expects(
                            &self.name(),
                            &[ValueType::DIE, ValueType::ATTR],
                            top.as_ref(),
                        );
                        None
                    }
                };
                if let Some(unit_index) = unit_index {
                    self.unit_index = unit_index;
                    self.idx = 0;
                    self.pos = 0;
                    self.cur = Some(stack);
                }
            }

            let dies = self.graph.unit_dies(self.unit_index)?;
            if self.idx < dies.len() {
                let die = dies[self.idx];
                self.idx += 1;
                if let Some(cur) = &self.cur {
                    let mut out = cur.clone();
                    out.push(Value::new(
                        ValueKind::Die(DieValue::new(Arc::clone(&self.graph), die)),
                        self.pos,
                    ));
                    self.pos += 1;
                    return Ok(Some(out));
                }
            }

            self.cur = None;
        }
    }

    fn reset(&mut self) {
        self.cur = None;
        self.upstream.reset();
    }

    fn name(&self) -> String {
        "unit".to_string()
    }
}

/// Pops a Die and emits one frame per immediate child, in source order.
/// Childless DIEs drop the frame.
pub struct ChildOp {
    upstream: OpRef,
    graph: Arc<DwarfGraph>,
    cur: Option<Stack>,
    children: Vec<DieHandle>,
    idx: usize,
    pos: usize,
}

impl ChildOp {
    pub fn new(upstream: OpRef, graph: Arc<DwarfGraph>) -> Self {
        Self {
            upstream,
            graph,
            cur: None,
            children: Vec::new(),
            idx: 0,
            pos: 0,
        }
    }
}

impl Op for ChildOp {
    fn next(&mut self) -> Result<Option<Stack>> {
        loop {
            while self.cur.is_none() {
                let Some(mut stack) = self.upstream.next()? else {
                    return Ok(None);
                };
                let top = stack.pop();
                match top.as_ref().map(Value::kind) {
                    Some(ValueKind::Die(d)) => {
                        let children = self.graph.children(d.die())?;
                        if !children.is_empty() {
                            self.children = children;
                            self.idx = 0;
                            self.pos = 0;
                            self.cur = Some(stack);
                        }
                    }
                    _ => report_expects(&self.name(), &[ValueType::DIE], top.as_ref()),
                }
            }

            if self.idx < self.children.len() {
                let die = self.children[self.idx];
                self.idx += 1;
                if let Some(cur) = &self.cur {
                    let mut out = cur.clone();
                    out.push(Value::new(
                        ValueKind::Die(DieValue::new(Arc::clone(&self.graph), die)),
                        self.pos,
                    ));
                    self.pos += 1;
                    return Ok(Some(out));
                }
            }

            self.cur = None;
            self.children.clear();
        }
    }

    fn reset(&mut self) {
        self.cur = None;
        self.children.clear();
        self.upstream.reset();
    }

    fn name(&self) -> String {
        "child".to_string()
    }
}

/// Pops a Die and emits one frame per attribute, in stored order.
pub struct AttributeOp {
    upstream: OpRef,
    graph: Arc<DwarfGraph>,
    cur: Option<(Stack, DieHandle)>,
    attrs: Vec<gimli::Attribute<crate::data::Slice>>,
    idx: usize,
    pos: usize,
}

impl AttributeOp {
    pub fn new(upstream: OpRef, graph: Arc<DwarfGraph>) -> Self {
        Self {
            upstream,
            graph,
            cur: None,
            attrs: Vec::new(),
            idx: 0,
            pos: 0,
        }
    }
}

impl Op for AttributeOp {
    fn next(&mut self) -> Result<Option<Stack>> {
        loop {
            while self.cur.is_none() {
                let Some(mut stack) = self.upstream.next()? else {
                    return Ok(None);
                };
                let top = stack.pop();
                match top.as_ref().map(Value::kind) {
                    Some(ValueKind::Die(d)) => {
                        self.attrs = self.graph.attributes(d.die())?;
                        self.idx = 0;
                        self.pos = 0;
                        self.cur = Some((stack, d.die()));
                    }
                    _ => report_expects(&self.name(), &[ValueType::DIE], top.as_ref()),
                }
            }

            if self.idx < self.attrs.len() {
                let attr = self.attrs[self.idx].clone();
                self.idx += 1;
                if let Some((cur, die)) = &self.cur {
                    let mut out = cur.clone();
                    out.push(Value::new(
                        ValueKind::Attr(AttrValue::new(Arc::clone(&self.graph), *die, attr)),
                        self.pos,
                    ));
                    self.pos += 1;
                    return Ok(Some(out));
                }
            }

            self.cur = None;
            self.attrs.clear();
        }
    }

    fn reset(&mut self) {
        self.cur = None;
        self.attrs.clear();
        self.upstream.reset();
    }

    fn name(&self) -> String {
        "attribute".to_string()
    }
}
