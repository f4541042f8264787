//! End-to-end pipeline tests against synthetic DWARF images.

mod common;

use std::sync::Arc;

use dwsift_core::{
    dw_dict, Brevity, CmpResult, DwarfGraph, FilterOp, OnceOp, Op, OpRef, Scope, Stack, ValueKind,
    ValueType,
};

use common::{integrate_graph, scenario_graph};

/// Build `once | names...` from dictionary entries; predicate names become
/// filters.
fn pipeline(graph: &Arc<DwarfGraph>, names: &[&str]) -> OpRef {
    let dict = dw_dict();
    let scope = Arc::new(Scope::default());
    let mut op: OpRef = Box::new(OnceOp::new());
    for name in names {
        let builtin = dict
            .find(name)
            .unwrap_or_else(|| panic!("unknown builtin: {name}"));
        op = match builtin.build_pred(graph, &scope) {
            Some(pred) => Box::new(FilterOp::new(op, pred)),
            None => builtin
                .build_exec(op, graph, &scope)
                .unwrap_or_else(|| panic!("builtin builds nothing: {name}")),
        };
    }
    op
}

fn drain(op: &mut OpRef) -> Vec<Stack> {
    let mut out = Vec::new();
    while let Some(stack) = op.next().expect("pipeline runs cleanly") {
        out.push(stack);
    }
    out
}

fn tops_brief(frames: &[Stack]) -> Vec<String> {
    frames
        .iter()
        .map(|stack| stack.top().expect("non-empty frame").show(Brevity::Brief))
        .collect()
}

#[test]
fn winfo_offset_enumerates_all_dies_in_file_order() {
    let graph = scenario_graph();
    let mut op = pipeline(&graph, &["winfo", "offset"]);
    let frames = drain(&mut op);

    let expected: Vec<String> = graph
        .all_dies()
        .unwrap()
        .iter()
        .map(|&die| format!("{:#x}", graph.die_global_offset(die)))
        .collect();
    assert_eq!(expected.len(), 3);
    assert_eq!(tops_brief(&frames), expected);

    // No duplicates.
    let mut seen = tops_brief(&frames);
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 3);
}

#[test]
fn winfo_positions_count_from_zero() {
    let graph = scenario_graph();
    let mut op = pipeline(&graph, &["winfo"]);
    let frames = drain(&mut op);
    let positions: Vec<usize> = frames
        .iter()
        .map(|stack| stack.top().unwrap().pos())
        .collect();
    assert_eq!(positions, vec![0, 1, 2]);
}

#[test]
fn tag_filter_selects_subprogram() {
    let graph = scenario_graph();
    let mut op = pipeline(&graph, &["winfo", "?TAG_subprogram"]);
    let frames = drain(&mut op);
    assert_eq!(frames.len(), 1);

    let top = frames[0].top().unwrap();
    assert_eq!(top.type_tag(), ValueType::DIE);
    match top.kind() {
        ValueKind::Die(d) => {
            assert_eq!(d.graph().die_tag(d.die()).unwrap(), gimli::DW_TAG_subprogram)
        }
        other => panic!("expected a DIE, got {other:?}"),
    }
}

#[test]
fn at_name_projects_string_value() {
    let graph = scenario_graph();
    let mut op = pipeline(&graph, &["winfo", "?TAG_subprogram", "@AT_name"]);
    let frames = drain(&mut op);
    assert_eq!(tops_brief(&frames), vec!["f".to_string()]);
    assert_eq!(frames[0].top().unwrap().type_tag(), ValueType::STR);
}

#[test]
fn parent_label_names_the_enclosing_tag() {
    let graph = scenario_graph();
    let mut op = pipeline(&graph, &["winfo", "?TAG_variable", "parent", "label"]);
    let frames = drain(&mut op);
    assert_eq!(frames.len(), 1);
    assert_eq!(
        frames[0].top().unwrap().show(Brevity::Full),
        "DW_TAG_subprogram"
    );
}

#[test]
fn root_predicate_polarity() {
    let graph = scenario_graph();

    let mut roots = pipeline(&graph, &["winfo", "?root"]);
    let root_frames = drain(&mut roots);
    assert_eq!(root_frames.len(), 1);
    match root_frames[0].top().unwrap().kind() {
        ValueKind::Die(d) => {
            assert_eq!(
                d.graph().die_tag(d.die()).unwrap(),
                gimli::DW_TAG_compile_unit
            );
        }
        other => panic!("expected a DIE, got {other:?}"),
    }

    let mut non_roots = pipeline(&graph, &["winfo", "!root"]);
    assert_eq!(drain(&mut non_roots).len(), 2);
}

#[test]
fn child_child_reaches_the_grandchild() {
    let graph = scenario_graph();
    let mut op = pipeline(&graph, &["winfo", "child", "child"]);
    let frames = drain(&mut op);
    assert_eq!(frames.len(), 1);
    match frames[0].top().unwrap().kind() {
        ValueKind::Die(d) => {
            assert_eq!(d.graph().die_tag(d.die()).unwrap(), gimli::DW_TAG_variable)
        }
        other => panic!("expected a DIE, got {other:?}"),
    }
}

#[test]
fn unit_from_any_die_yields_the_whole_cu() {
    let graph = scenario_graph();
    let mut op = pipeline(&graph, &["winfo", "?TAG_variable", "unit"]);
    assert_eq!(drain(&mut op).len(), 3);

    // An attribute on top works too: its owning DIE decides the unit.
    let mut via_attr = pipeline(&graph, &["winfo", "?TAG_subprogram", "attribute", "unit"]);
    assert_eq!(drain(&mut via_attr).len(), 3);
}

#[test]
fn attribute_label_and_form() {
    let graph = scenario_graph();
    let mut op = pipeline(&graph, &["winfo", "?TAG_subprogram", "attribute", "label"]);
    assert_eq!(
        tops_brief(&drain(&mut op)),
        vec!["name".to_string()]
    );

    let mut forms = pipeline(&graph, &["winfo", "?TAG_subprogram", "attribute", "form"]);
    let frames = drain(&mut forms);
    assert_eq!(frames[0].top().unwrap().show(Brevity::Full), "DW_FORM_string");

    let mut filtered = pipeline(
        &graph,
        &["winfo", "?TAG_subprogram", "attribute", "?FORM_string"],
    );
    assert_eq!(drain(&mut filtered).len(), 1);
}

#[test]
fn value_dispatches_through_the_overload_table() {
    let graph = scenario_graph();
    let mut op = pipeline(&graph, &["winfo", "?TAG_subprogram", "attribute", "value"]);
    assert_eq!(tops_brief(&drain(&mut op)), vec!["f".to_string()]);
}

#[test]
fn language_attribute_lands_in_the_lang_domain() {
    let graph = scenario_graph();
    let mut op = pipeline(&graph, &["winfo", "?root", "@AT_language"]);
    let frames = drain(&mut op);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].top().unwrap().show(Brevity::Full), "DW_LANG_C99");
}

#[test]
fn location_decodes_to_opcodes() {
    let graph = scenario_graph();

    let mut labels = pipeline(&graph, &["winfo", "?TAG_variable", "@AT_location", "label"]);
    assert_eq!(tops_brief(&drain(&mut labels)), vec!["bregx".to_string()]);

    let mut offsets = pipeline(&graph, &["winfo", "?TAG_variable", "@AT_location", "offset"]);
    assert_eq!(tops_brief(&drain(&mut offsets)), vec!["0x0".to_string()]);

    let mut first = pipeline(&graph, &["winfo", "?TAG_variable", "@AT_location", "@number"]);
    assert_eq!(tops_brief(&drain(&mut first)), vec!["5".to_string()]);

    let mut second = pipeline(
        &graph,
        &["winfo", "?TAG_variable", "@AT_location", "@number2"],
    );
    assert_eq!(tops_brief(&drain(&mut second)), vec!["7".to_string()]);
}

#[test]
fn missing_attribute_drops_the_frame() {
    let graph = scenario_graph();
    let mut op = pipeline(&graph, &["winfo", "?TAG_variable", "@AT_name"]);
    assert!(drain(&mut op).is_empty());
}

#[test]
fn parent_drops_the_root_frame() {
    let graph = scenario_graph();
    let mut op = pipeline(&graph, &["winfo", "?root", "parent"]);
    assert!(drain(&mut op).is_empty());
}

#[test]
fn has_attribute_predicate_on_dies() {
    let graph = scenario_graph();
    let mut op = pipeline(&graph, &["winfo", "?AT_location"]);
    assert_eq!(drain(&mut op).len(), 1);

    let mut negated = pipeline(&graph, &["winfo", "!AT_location"]);
    assert_eq!(drain(&mut negated).len(), 2);
}

#[test]
fn predicates_compare_constants_by_domain() {
    let graph = scenario_graph();

    // label leaves a DW_TAG constant; the tag predicate matches it.
    let mut op = pipeline(&graph, &["winfo", "?TAG_variable", "label", "?TAG_variable"]);
    assert_eq!(drain(&mut op).len(), 1);

    // A DW_AT constant against a tag predicate is a domain clash: fatal.
    let mut clash = pipeline(&graph, &["DW_AT_name", "?TAG_variable"]);
    assert!(clash.next().is_err());
}

#[test]
fn string_builtins_compose_with_attribute_values() {
    let graph = scenario_graph();

    let mut length = pipeline(&graph, &["winfo", "?TAG_subprogram", "@AT_name", "length"]);
    assert_eq!(tops_brief(&drain(&mut length)), vec!["1".to_string()]);

    let mut elems = pipeline(&graph, &["winfo", "?root", "@AT_name", "elem"]);
    let frames = drain(&mut elems);
    assert_eq!(frames.len(), "scenario.c".len());
    assert_eq!(frames[0].top().unwrap().show(Brevity::Brief), "s");
    assert_eq!(frames[0].top().unwrap().pos(), 0);
    assert_eq!(frames[9].top().unwrap().pos(), 9);
}

#[test]
fn integrate_follows_the_abstract_origin() {
    let graph = integrate_graph();
    let mut op = pipeline(
        &graph,
        &["winfo", "?TAG_inlined_subroutine", "integrate", "@AT_name"],
    );
    assert_eq!(tops_brief(&drain(&mut op)), vec!["callee".to_string()]);
}

#[test]
fn replay_after_reset_is_identical() {
    let graph = scenario_graph();
    let mut op = pipeline(&graph, &["winfo", "offset"]);

    let first: Vec<String> = tops_brief(&drain(&mut op));
    assert!(op.next().unwrap().is_none(), "exhausted pipelines stay exhausted");

    op.reset();
    let second: Vec<String> = tops_brief(&drain(&mut op));
    assert_eq!(first, second);
}

#[test]
fn parent_child_round_trip() {
    let graph = scenario_graph();
    for &die in graph.all_dies().unwrap() {
        for child in graph.children(die).unwrap() {
            assert_eq!(graph.find_parent(child).unwrap(), Some(die));
        }
        let is_root = graph.is_root(die).unwrap();
        assert_eq!(is_root, graph.find_parent(die).unwrap().is_none());
    }
}

#[test]
fn values_survive_frame_cloning() {
    let graph = scenario_graph();
    let mut op = pipeline(&graph, &["winfo", "?TAG_subprogram", "@AT_name"]);
    let frames = drain(&mut op);
    let top = frames[0].top().unwrap();
    let copy = top.clone();
    assert_eq!(copy.cmp_value(top), CmpResult::Equal);
    assert_eq!(copy.show(Brevity::Brief), top.show(Brevity::Brief));
}
