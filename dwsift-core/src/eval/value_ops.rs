//! String and sequence operators: `length`, `elem`, `add`, `?empty`,
//! `?find`, `?match`
//!
//! These are the specialisations behind the overloaded builtins; dispatch
//! guarantees the popped types, but every op still reports (rather than
//! panics) on a stray frame.

use regex::Regex;

use crate::core::domain::{Constant, DEC_DOM};
use crate::core::{CmpResult, QueryError, Result, Stack, Value, ValueKind, ValueType};
use crate::eval::op::{report_expects, Op, OpRef, Pred, PredResult};

/// `length` on a string: number of characters.
pub(crate) struct StrLengthOp {
    upstream: OpRef,
}

impl StrLengthOp {
    pub(crate) fn new(upstream: OpRef) -> Self {
        Self { upstream }
    }
}

impl Op for StrLengthOp {
    fn next(&mut self) -> Result<Option<Stack>> {
        while let Some(mut stack) = self.upstream.next()? {
            match stack.pop_as::<String>() {
                Some(Ok(s)) => {
                    let cst = Constant::new(s.chars().count() as u64, &DEC_DOM);
                    stack.push(Value::new(ValueKind::Const(cst), 0));
                    return Ok(Some(stack));
                }
                Some(Err(value)) => {
                    report_expects(&self.name(), &[ValueType::STR], Some(&value))
                }
                None => report_expects(&self.name(), &[ValueType::STR], None),
            }
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.upstream.reset();
    }

    fn name(&self) -> String {
        "length".to_string()
    }
}

/// `length` on a sequence: element count.
pub(crate) struct SeqLengthOp {
    upstream: OpRef,
}

impl SeqLengthOp {
    pub(crate) fn new(upstream: OpRef) -> Self {
        Self { upstream }
    }
}

impl Op for SeqLengthOp {
    fn next(&mut self) -> Result<Option<Stack>> {
        while let Some(mut stack) = self.upstream.next()? {
            match stack.pop_as::<Vec<Value>>() {
                Some(Ok(seq)) => {
                    let cst = Constant::new(seq.len() as u64, &DEC_DOM);
                    stack.push(Value::new(ValueKind::Const(cst), 0));
                    return Ok(Some(stack));
                }
                Some(Err(value)) => {
                    report_expects(&self.name(), &[ValueType::SEQ], Some(&value))
                }
                None => report_expects(&self.name(), &[ValueType::SEQ], None),
            }
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.upstream.reset();
    }

    fn name(&self) -> String {
        "length".to_string()
    }
}

/// `add` on two strings: concatenation. The second operand is top of stack.
pub(crate) struct StrAddOp {
    upstream: OpRef,
}

impl StrAddOp {
    pub(crate) fn new(upstream: OpRef) -> Self {
        Self { upstream }
    }
}

impl Op for StrAddOp {
    fn next(&mut self) -> Result<Option<Stack>> {
        while let Some(mut stack) = self.upstream.next()? {
            let b = stack.pop_as::<String>();
            let a = stack.pop_as::<String>();
            match (a, b) {
                (Some(Ok(mut a)), Some(Ok(b))) => {
                    a.push_str(&b);
                    stack.push(Value::new(ValueKind::Str(a), 0));
                    return Ok(Some(stack));
                }
                _ => report_expects(&self.name(), &[ValueType::STR], stack.top()),
            }
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.upstream.reset();
    }

    fn name(&self) -> String {
        "add".to_string()
    }
}

/// `add` on two sequences: concatenation. The second operand is top of stack.
pub(crate) struct SeqAddOp {
    upstream: OpRef,
}

impl SeqAddOp {
    pub(crate) fn new(upstream: OpRef) -> Self {
        Self { upstream }
    }
}

impl Op for SeqAddOp {
    fn next(&mut self) -> Result<Option<Stack>> {
        while let Some(mut stack) = self.upstream.next()? {
            let b = stack.pop_as::<Vec<Value>>();
            let a = stack.pop_as::<Vec<Value>>();
            match (a, b) {
                (Some(Ok(mut a)), Some(Ok(b))) => {
                    a.extend(b);
                    stack.push(Value::new(ValueKind::Seq(a), 0));
                    return Ok(Some(stack));
                }
                _ => report_expects(&self.name(), &[ValueType::SEQ], stack.top()),
            }
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.upstream.reset();
    }

    fn name(&self) -> String {
        "add".to_string()
    }
}

/// `elem` fan-out shared by both specialisations: items were derived from the
/// popped value, positions are assigned by index.
struct ElemState {
    stack: Stack,
    items: Vec<Value>,
    idx: usize,
}

impl ElemState {
    fn next(&mut self) -> Option<Stack> {
        let item = self.items.get(self.idx)?;
        let mut value = item.clone();
        value.set_pos(self.idx);
        self.idx += 1;
        let mut out = self.stack.clone();
        out.push(value);
        Some(out)
    }
}

/// `elem` on a string: one single-character string per char.
pub(crate) struct StrElemOp {
    upstream: OpRef,
    state: Option<ElemState>,
}

impl StrElemOp {
    pub(crate) fn new(upstream: OpRef) -> Self {
        Self {
            upstream,
            state: None,
        }
    }
}

impl Op for StrElemOp {
    fn next(&mut self) -> Result<Option<Stack>> {
        loop {
            if self.state.is_none() {
                let Some(mut stack) = self.upstream.next()? else {
                    return Ok(None);
                };
                match stack.pop_as::<String>() {
                    Some(Ok(s)) => {
                        let items = s
                            .chars()
                            .map(|c| Value::new(ValueKind::Str(c.to_string()), 0))
                            .collect();
                        self.state = Some(ElemState {
                            stack,
                            items,
                            idx: 0,
                        });
                    }
                    Some(Err(value)) => {
                        report_expects(&self.name(), &[ValueType::STR], Some(&value));
                        continue;
                    }
                    None => {
                        report_expects(&self.name(), &[ValueType::STR], None);
                        continue;
                    }
                }
            }

            if let Some(state) = &mut self.state {
                if let Some(out) = state.next() {
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
        "elem".to_string()
    }
}

/// `elem` on a sequence: one deep-cloned element per entry.
pub(crate) struct SeqElemOp {
    upstream: OpRef,
    state: Option<ElemState>,
}

impl SeqElemOp {
    pub(crate) fn new(upstream: OpRef) -> Self {
        Self {
            upstream,
            state: None,
        }
    }
}

impl Op for SeqElemOp {
    fn next(&mut self) -> Result<Option<Stack>> {
        loop {
            if self.state.is_none() {
                let Some(mut stack) = self.upstream.next()? else {
                    return Ok(None);
                };
                match stack.pop_as::<Vec<Value>>() {
                    Some(Ok(items)) => {
                        self.state = Some(ElemState {
                            stack,
                            items,
                            idx: 0,
                        });
                    }
                    Some(Err(value)) => {
                        report_expects(&self.name(), &[ValueType::SEQ], Some(&value));
                        continue;
                    }
                    None => {
                        report_expects(&self.name(), &[ValueType::SEQ], None);
                        continue;
                    }
                }
            }

            if let Some(state) = &mut self.state {
                if let Some(out) = state.next() {
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
        "elem".to_string()
    }
}

/// `?empty`: empty string or sequence.
pub(crate) struct EmptyPred;

impl Pred for EmptyPred {
    fn result(&mut self, stack: &Stack) -> Result<PredResult> {
        match stack.top().map(Value::kind) {
            Some(ValueKind::Str(s)) => Ok(s.is_empty().into()),
            Some(ValueKind::Seq(seq)) => Ok(seq.is_empty().into()),
            _ => {
                report_expects(&self.name(), &[ValueType::STR, ValueType::SEQ], stack.top());
                Ok(PredResult::Fail)
            }
        }
    }

    fn reset(&mut self) {}

    fn name(&self) -> String {
        "?empty".to_string()
    }
}

/// `?find`: needle (top) occurs within haystack (below). Substring on
/// strings, contiguous subsequence on sequences.
pub(crate) struct FindPred;

impl Pred for FindPred {
    fn result(&mut self, stack: &Stack) -> Result<PredResult> {
        match (stack.nth(1).map(Value::kind), stack.nth(0).map(Value::kind)) {
            (Some(ValueKind::Str(haystack)), Some(ValueKind::Str(needle))) => {
                Ok(haystack.contains(needle.as_str()).into())
            }
            (Some(ValueKind::Seq(haystack)), Some(ValueKind::Seq(needle))) => {
                if needle.is_empty() {
                    return Ok(PredResult::Yes);
                }
                let found = haystack
                    .windows(needle.len())
                    .any(|window| {
                        window
                            .iter()
                            .zip(needle.iter())
                            .all(|(a, b)| a.cmp_value(b) == CmpResult::Equal)
                    });
                Ok(found.into())
            }
            _ => {
                report_expects(&self.name(), &[ValueType::STR, ValueType::SEQ], stack.top());
                Ok(PredResult::Fail)
            }
        }
    }

    fn reset(&mut self) {}

    fn name(&self) -> String {
        "?find".to_string()
    }
}

/// `?match`: the whole haystack (below top) matches the regex pattern (top).
pub(crate) struct MatchPred;

impl Pred for MatchPred {
    fn result(&mut self, stack: &Stack) -> Result<PredResult> {
        match (stack.nth(1).map(Value::kind), stack.nth(0).map(Value::kind)) {
            (Some(ValueKind::Str(haystack)), Some(ValueKind::Str(pattern))) => {
                let re = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
                    QueryError::BadPattern {
                        op: self.name(),
                        source,
                    }
                })?;
                Ok(re.is_match(haystack).into())
            }
            _ => {
                report_expects(&self.name(), &[ValueType::STR], stack.top());
                Ok(PredResult::Fail)
            }
        }
    }

    fn reset(&mut self) {}

    fn name(&self) -> String {
        "?match".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::op::OnceOp;

    fn str_value(s: &str) -> Value {
        Value::new(ValueKind::Str(s.to_string()), 0)
    }

    /// Upstream stub emitting one prepared stack.
    struct Feed {
        stack: Option<Stack>,
    }

    impl Feed {
        fn new(values: Vec<Value>) -> Box<Self> {
            let mut stack = Stack::new();
            for value in values {
                stack.push(value);
            }
            Box::new(Self { stack: Some(stack) })
        }
    }

    impl Op for Feed {
        fn next(&mut self) -> Result<Option<Stack>> {
            Ok(self.stack.take())
        }

        fn reset(&mut self) {}

        fn name(&self) -> String {
            "feed".to_string()
        }
    }

    #[test]
    fn test_str_length() {
        let mut op = StrLengthOp::new(Feed::new(vec![str_value("hello")]));
        let stack = op.next().unwrap().unwrap();
        assert_eq!(stack.top().unwrap().show(crate::Brevity::Brief), "5");
        assert!(op.next().unwrap().is_none());
    }

    #[test]
    fn test_str_add_order() {
        let mut op = StrAddOp::new(Feed::new(vec![str_value("foo"), str_value("bar")]));
        let stack = op.next().unwrap().unwrap();
        assert_eq!(stack.top().unwrap().show(crate::Brevity::Brief), "foobar");
    }

    #[test]
    fn test_str_elem_positions() {
        let mut op = StrElemOp::new(Feed::new(vec![str_value("ab")]));
        let first = op.next().unwrap().unwrap();
        assert_eq!(first.top().unwrap().show(crate::Brevity::Brief), "a");
        assert_eq!(first.top().unwrap().pos(), 0);
        let second = op.next().unwrap().unwrap();
        assert_eq!(second.top().unwrap().show(crate::Brevity::Brief), "b");
        assert_eq!(second.top().unwrap().pos(), 1);
        assert!(op.next().unwrap().is_none());
    }

    #[test]
    fn test_seq_elem_empty_drops_frame() {
        let mut op = SeqElemOp::new(Feed::new(vec![Value::new(ValueKind::Seq(vec![]), 0)]));
        assert!(op.next().unwrap().is_none());
    }

    #[test]
    fn test_find_pred() {
        let mut pred = FindPred;
        let mut stack = Stack::new();
        stack.push(str_value("haystack"));
        stack.push(str_value("sta"));
        assert_eq!(pred.result(&stack).unwrap(), PredResult::Yes);

        let mut missing = Stack::new();
        missing.push(str_value("haystack"));
        missing.push(str_value("needle"));
        assert_eq!(pred.result(&missing).unwrap(), PredResult::No);
    }

    #[test]
    fn test_match_pred_is_anchored() {
        let mut pred = MatchPred;
        let mut stack = Stack::new();
        stack.push(str_value("subprogram"));
        stack.push(str_value("sub.*"));
        assert_eq!(pred.result(&stack).unwrap(), PredResult::Yes);

        let mut partial = Stack::new();
        partial.push(str_value("subprogram"));
        partial.push(str_value("sub"));
        assert_eq!(partial.len(), 2);
        assert_eq!(pred.result(&partial).unwrap(), PredResult::No);
    }

    #[test]
    fn test_match_pred_bad_pattern_is_fatal() {
        let mut pred = MatchPred;
        let mut stack = Stack::new();
        stack.push(str_value("x"));
        stack.push(str_value("("));
        assert!(pred.result(&stack).is_err());
    }

    #[test]
    fn test_empty_pred_fails_on_constant() {
        let mut pred = EmptyPred;
        let mut stack = Stack::new();
        stack.push(Value::new(
            ValueKind::Const(crate::core::Constant::new(1u32, &crate::core::DEC_DOM)),
            0,
        ));
        assert_eq!(pred.result(&stack).unwrap(), PredResult::Fail);
    }

    #[test]
    fn test_once_keeps_protocol() {
        // `length` on a once-origin (no values) reports and exhausts.
        let mut op = StrLengthOp::new(Box::new(OnceOp::new()));
        assert!(op.next().unwrap().is_none());
    }
}
