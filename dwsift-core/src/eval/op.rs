//! Operator and predicate protocol
//!
//! Operators form a pull-based pipeline: each owns its upstream and produces
//! one result stack per `next` call. `next` is strictly lazy and restartable
//! through `reset`. Predicates observe the top of a stack without touching
//! it.

use tracing::warn;

use crate::core::{Constant, Result, Stack, Value, ValueKind, ValueType};

/// A lazy producer of result stacks.
///
/// After the first `None`, `next` keeps returning `None` until `reset` is
/// called. `reset` recursively resets the upstream chain.
pub trait Op {
    fn next(&mut self) -> Result<Option<Stack>>;
    fn reset(&mut self);
    fn name(&self) -> String;
}

/// Operators own their upstream; the operator tree is a DAG rooted at the
/// evaluator.
pub type OpRef = Box<dyn Op>;

/// Outcome of a predicate: `Fail` marks a type mismatch against the
/// predicate's accepted types and is reported, not silently consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredResult {
    Yes,
    No,
    Fail,
}

impl From<bool> for PredResult {
    fn from(b: bool) -> Self {
        if b {
            PredResult::Yes
        } else {
            PredResult::No
        }
    }
}

pub trait Pred {
    fn result(&mut self, stack: &Stack) -> Result<PredResult>;
    fn reset(&mut self);
    fn name(&self) -> String;
}

/// Report a per-frame type mismatch. The frame is dropped by the caller;
/// evaluation continues.
pub fn report_expects(op: &str, accepted: &[ValueType], got: Option<&Value>) {
    let accepted: Vec<&str> = accepted.iter().map(|t| t.name()).collect();
    match got {
        Some(value) => warn!(
            "{}: expected one of {}, got {}",
            op,
            accepted.join(", "),
            value.type_tag().name()
        ),
        None => warn!(
            "{}: expected one of {}, got an empty stack",
            op,
            accepted.join(", ")
        ),
    }
}

/// Pipeline origin: yields a single empty stack, then `None`.
pub struct OnceOp {
    done: bool,
}

impl OnceOp {
    pub fn new() -> Self {
        Self { done: false }
    }
}

impl Default for OnceOp {
    fn default() -> Self {
        Self::new()
    }
}

impl Op for OnceOp {
    fn next(&mut self) -> Result<Option<Stack>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        Ok(Some(Stack::new()))
    }

    fn reset(&mut self) {
        self.done = false;
    }

    fn name(&self) -> String {
        "once".to_string()
    }
}

/// Emits the frames for which the predicate holds; `no` and `fail` frames are
/// dropped.
pub struct FilterOp {
    upstream: OpRef,
    pred: Box<dyn Pred>,
}

impl FilterOp {
    pub fn new(upstream: OpRef, pred: Box<dyn Pred>) -> Self {
        Self { upstream, pred }
    }
}

impl Op for FilterOp {
    fn next(&mut self) -> Result<Option<Stack>> {
        while let Some(stack) = self.upstream.next()? {
            if self.pred.result(&stack)? == PredResult::Yes {
                return Ok(Some(stack));
            }
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.pred.reset();
        self.upstream.reset();
    }

    fn name(&self) -> String {
        self.pred.name()
    }
}

/// Negation: flips `yes`/`no`, preserves `fail`.
pub struct NotPred {
    inner: Box<dyn Pred>,
}

impl NotPred {
    pub fn new(inner: Box<dyn Pred>) -> Self {
        Self { inner }
    }
}

impl Pred for NotPred {
    fn result(&mut self, stack: &Stack) -> Result<PredResult> {
        Ok(match self.inner.result(stack)? {
            PredResult::Yes => PredResult::No,
            PredResult::No => PredResult::Yes,
            PredResult::Fail => PredResult::Fail,
        })
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn name(&self) -> String {
        let inner = self.inner.name();
        match inner.strip_prefix('?') {
            Some(rest) => format!("!{rest}"),
            None => format!("!{inner}"),
        }
    }
}

/// Wrap a predicate in [`NotPred`] for the negative polarity.
pub fn maybe_invert(positive: bool, pred: Box<dyn Pred>) -> Box<dyn Pred> {
    if positive {
        pred
    } else {
        Box::new(NotPred::new(pred))
    }
}

/// What a constant builtin builds: pushes its constant onto every upstream
/// frame.
pub struct PushConstOp {
    upstream: OpRef,
    cst: Constant,
    name: String,
}

impl PushConstOp {
    pub fn new(upstream: OpRef, cst: Constant, name: String) -> Self {
        Self {
            upstream,
            cst,
            name,
        }
    }
}

impl Op for PushConstOp {
    fn next(&mut self) -> Result<Option<Stack>> {
        match self.upstream.next()? {
            Some(mut stack) => {
                stack.push(Value::new(ValueKind::Const(self.cst), 0));
                Ok(Some(stack))
            }
            None => Ok(None),
        }
    }

    fn reset(&mut self) {
        self.upstream.reset();
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DEC_DOM;

    struct YesOnEmpty;

    impl Pred for YesOnEmpty {
        fn result(&mut self, stack: &Stack) -> Result<PredResult> {
            Ok(PredResult::from(stack.is_empty()))
        }

        fn reset(&mut self) {}

        fn name(&self) -> String {
            "?test_empty".to_string()
        }
    }

    #[test]
    fn test_once_emits_single_empty_stack() {
        let mut op = OnceOp::new();
        assert!(op.next().unwrap().unwrap().is_empty());
        assert!(op.next().unwrap().is_none());
        assert!(op.next().unwrap().is_none());

        op.reset();
        assert!(op.next().unwrap().is_some());
    }

    #[test]
    fn test_push_const_threads_frames() {
        let once = Box::new(OnceOp::new());
        let mut op = PushConstOp::new(once, Constant::new(5u32, &DEC_DOM), "five".into());
        let stack = op.next().unwrap().unwrap();
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.top().unwrap().show(crate::Brevity::Brief), "5");
        assert!(op.next().unwrap().is_none());
    }

    #[test]
    fn test_not_pred_truth_table() {
        let mut not = NotPred::new(Box::new(YesOnEmpty));
        let empty = Stack::new();
        assert_eq!(not.result(&empty).unwrap(), PredResult::No);

        let mut full = Stack::new();
        full.push(Value::new(
            ValueKind::Const(Constant::new(1u32, &DEC_DOM)),
            0,
        ));
        assert_eq!(not.result(&full).unwrap(), PredResult::Yes);
        assert_eq!(not.name(), "!test_empty");
    }
}
