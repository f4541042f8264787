//! Overload dispatch
//!
//! An overloaded builtin owns an immutable table mapping selectors (ordered
//! tuples of value-type tags, topmost last) to specialisation builtins. At
//! run time the dispatcher inspects the top of each upstream frame and feeds
//! it to the matching specialisation through a single-frame origin; frames
//! matching no selector are reported and dropped.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use tracing::warn;

use crate::core::{Result, Stack, ValueType};
use crate::data::DwarfGraph;
use crate::eval::builtin::{Builtin, Scope};
use crate::eval::op::{Op, OpRef};

/// Ordered tuple of value-type tags matched against the top of stack,
/// topmost last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector(Vec<ValueType>);

impl Selector {
    pub fn new(types: Vec<ValueType>) -> Self {
        Self(types)
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    pub fn matches(&self, stack: &Stack) -> bool {
        if stack.len() < self.0.len() {
            return false;
        }
        self.0
            .iter()
            .rev()
            .enumerate()
            .all(|(depth, vtype)| match stack.nth(depth) {
                Some(value) => value.type_tag() == *vtype,
                None => false,
            })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|t| t.name()).collect();
        write!(f, "({})", names.join(" "))
    }
}

/// Immutable selector -> specialisation table; shared between dictionaries.
#[derive(Default)]
pub struct OverloadTab {
    entries: Vec<(Selector, Arc<dyn Builtin>)>,
}

impl OverloadTab {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_overload(&mut self, selector: Selector, builtin: Arc<dyn Builtin>) {
        self.entries.push((selector, builtin));
    }

    pub fn entries(&self) -> &[(Selector, Arc<dyn Builtin>)] {
        &self.entries
    }

    /// Union of two tables. Duplicate selectors are a configuration error.
    pub fn merged(a: &OverloadTab, b: &OverloadTab) -> Result<OverloadTab> {
        let mut out = OverloadTab::new();
        for (selector, builtin) in a.entries.iter().chain(b.entries.iter()) {
            if out.entries.iter().any(|(s, _)| s == selector) {
                anyhow::bail!("overload table merge: duplicate selector {selector}");
            }
            out.entries.push((selector.clone(), Arc::clone(builtin)));
        }
        Ok(out)
    }
}

/// A name bound to an overload table.
pub struct OverloadedBuiltin {
    name: String,
    tab: Arc<OverloadTab>,
}

impl OverloadedBuiltin {
    pub fn new(name: impl Into<String>, tab: Arc<OverloadTab>) -> Self {
        Self {
            name: name.into(),
            tab,
        }
    }

    pub fn tab(&self) -> &Arc<OverloadTab> {
        &self.tab
    }
}

impl Builtin for OverloadedBuiltin {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn build_exec(
        &self,
        upstream: OpRef,
        graph: &Arc<DwarfGraph>,
        scope: &Arc<Scope>,
    ) -> Option<OpRef> {
        let mut specs = Vec::new();
        for (selector, builtin) in self.tab.entries() {
            let slot: Rc<RefCell<Option<Stack>>> = Rc::new(RefCell::new(None));
            let origin = Box::new(OriginOp {
                slot: Rc::clone(&slot),
            });
            match builtin.build_exec(origin, graph, scope) {
                Some(op) => specs.push(SpecSlot {
                    selector: selector.clone(),
                    slot,
                    op,
                }),
                None => {
                    warn!(
                        "{}: specialisation for {} does not build an operator",
                        self.name, selector
                    );
                }
            }
        }
        Some(Box::new(OverloadOp {
            upstream,
            name: self.name.clone(),
            specs,
            active: None,
        }))
    }

    fn as_overloaded(&self) -> Option<&OverloadedBuiltin> {
        Some(self)
    }
}

/// Feeds one queued frame into a specialisation pipeline.
struct OriginOp {
    slot: Rc<RefCell<Option<Stack>>>,
}

impl Op for OriginOp {
    fn next(&mut self) -> Result<Option<Stack>> {
        Ok(self.slot.borrow_mut().take())
    }

    fn reset(&mut self) {
        self.slot.borrow_mut().take();
    }

    fn name(&self) -> String {
        "origin".to_string()
    }
}

struct SpecSlot {
    selector: Selector,
    slot: Rc<RefCell<Option<Stack>>>,
    op: OpRef,
}

/// The dispatching operator built by [`OverloadedBuiltin`].
struct OverloadOp {
    upstream: OpRef,
    name: String,
    specs: Vec<SpecSlot>,
    active: Option<usize>,
}

impl Op for OverloadOp {
    fn next(&mut self) -> Result<Option<Stack>> {
        loop {
            if let Some(active) = self.active {
                if let Some(stack) = self.specs[active].op.next()? {
                    return Ok(Some(stack));
                }
                self.active = None;
            }

            let Some(stack) = self.upstream.next()? else {
                return Ok(None);
            };

            match self
                .specs
                .iter()
                .position(|spec| spec.selector.matches(&stack))
            {
                Some(index) => {
                    // Reset the specialisation chain (clearing any stale
                    // origin frame) before queueing the new one.
                    self.specs[index].op.reset();
                    *self.specs[index].slot.borrow_mut() = Some(stack);
                    self.active = Some(index);
                }
                None => {
                    let selectors: Vec<String> = self
                        .specs
                        .iter()
                        .map(|spec| spec.selector.to_string())
                        .collect();
                    warn!(
                        "{}: no overload for {}, expected one of {}",
                        self.name,
                        stack
                            .top()
                            .map(|v| v.type_tag().name())
                            .unwrap_or("an empty stack"),
                        selectors.join(", ")
                    );
                }
            }
        }
    }

    fn reset(&mut self) {
        self.active = None;
        for spec in &mut self.specs {
            spec.op.reset();
        }
        self.upstream.reset();
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}
