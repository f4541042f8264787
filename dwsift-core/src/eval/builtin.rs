//! Builtin registry
//!
//! A dictionary maps names to builtin descriptors; each descriptor can build
//! a producer and/or a predicate given the upstream, the graph, and the
//! front-end's lexical scope handle. `dw_dict` populates the full DWARF
//! vocabulary: traversal and shape operators, per-code attribute/tag/form
//! families, the overloaded function builtins, and every domain constant.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::domain::{
    Constant, DW_ACCESS_DOM, DW_ADDR_DOM, DW_ATE_DOM, DW_ATTR_DOM, DW_CC_DOM, DW_DS_DOM,
    DW_END_DOM, DW_FORM_DOM, DW_ID_DOM, DW_INL_DOM, DW_LANG_DOM, DW_LOCOP_DOM, DW_ORD_DOM,
    DW_TAG_DOM, DW_VIRTUALITY_DOM, DW_VIS_DOM,
};
use crate::core::{QueryError, Result, ValueType};
use crate::data::DwarfGraph;
use crate::eval::dwarf_ops::{
    AttrNamedShape, AttrPred, FormPred, FormShape, IntegrateShape, LabelShape, OffsetShape,
    OperandOp, OperandSel, ParentShape, RootPred, ShapeExec, TagPred, ValueOp,
};
use crate::eval::op::{maybe_invert, Op, OpRef, Pred, PushConstOp};
use crate::eval::overload::{OverloadTab, OverloadedBuiltin, Selector};
use crate::eval::traverse::{AttributeOp, ChildOp, UnitOp, Winfo};
use crate::eval::value_ops::{
    EmptyPred, FindPred, MatchPred, SeqAddOp, SeqElemOp, SeqLengthOp, StrAddOp, StrElemOp,
    StrLengthOp,
};

/// Opaque lexical scope handle owned by the front-end; the core threads it
/// through builds untouched.
#[derive(Debug, Default)]
pub struct Scope {
    _private: (),
}

/// A named builtin descriptor. A builtin builds an executable producer, a
/// predicate, or both; the defaults build neither.
pub trait Builtin {
    fn name(&self) -> String;

    fn build_exec(
        &self,
        _upstream: OpRef,
        _graph: &Arc<DwarfGraph>,
        _scope: &Arc<Scope>,
    ) -> Option<OpRef> {
        None
    }

    fn build_pred(&self, _graph: &Arc<DwarfGraph>, _scope: &Arc<Scope>) -> Option<Box<dyn Pred>> {
        None
    }

    fn as_overloaded(&self) -> Option<&OverloadedBuiltin> {
        None
    }
}

/// Name -> builtin mapping exposed to the front-end.
#[derive(Default)]
pub struct BuiltinDict {
    map: BTreeMap<String, Arc<dyn Builtin>>,
}

impl BuiltinDict {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn add(&mut self, builtin: Arc<dyn Builtin>) {
        let name = builtin.name();
        self.add_named(builtin, name);
    }

    pub fn add_named(&mut self, builtin: Arc<dyn Builtin>, name: impl Into<String>) {
        let name = name.into();
        let prev = self.map.insert(name.clone(), builtin);
        assert!(prev.is_none(), "duplicate builtin name: {name}");
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn Builtin>> {
        self.map.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Merge two dictionaries. Names present in both must be bound to
    /// overload tables on both sides; the merged binding is the union table.
    pub fn merged(a: &BuiltinDict, b: &BuiltinDict) -> Result<BuiltinDict> {
        let mut out = BuiltinDict::empty();
        for (name, builtin) in &a.map {
            match b.map.get(name) {
                None => {
                    out.map.insert(name.clone(), Arc::clone(builtin));
                }
                Some(other) => {
                    let (Some(ta), Some(tb)) = (builtin.as_overloaded(), other.as_overloaded())
                    else {
                        return Err(QueryError::DictMerge { name: name.clone() }.into());
                    };
                    let tab = OverloadTab::merged(ta.tab(), tb.tab())?;
                    out.map.insert(
                        name.clone(),
                        Arc::new(OverloadedBuiltin::new(name.clone(), Arc::new(tab))),
                    );
                }
            }
        }
        for (name, builtin) in &b.map {
            if !a.map.contains_key(name) {
                out.map.insert(name.clone(), Arc::clone(builtin));
            }
        }
        Ok(out)
    }
}

struct WinfoBuiltin;

impl Builtin for WinfoBuiltin {
    fn name(&self) -> String {
        "winfo".to_string()
    }

    fn build_exec(
        &self,
        upstream: OpRef,
        graph: &Arc<DwarfGraph>,
        _scope: &Arc<Scope>,
    ) -> Option<OpRef> {
        Some(Box::new(Winfo::new(upstream, Arc::clone(graph))))
    }
}

struct UnitBuiltin;

impl Builtin for UnitBuiltin {
    fn name(&self) -> String {
        "unit".to_string()
    }

    fn build_exec(
        &self,
        upstream: OpRef,
        graph: &Arc<DwarfGraph>,
        _scope: &Arc<Scope>,
    ) -> Option<OpRef> {
        Some(Box::new(UnitOp::new(upstream, Arc::clone(graph))))
    }
}

struct ChildBuiltin;

impl Builtin for ChildBuiltin {
    fn name(&self) -> String {
        "child".to_string()
    }

    fn build_exec(
        &self,
        upstream: OpRef,
        graph: &Arc<DwarfGraph>,
        _scope: &Arc<Scope>,
    ) -> Option<OpRef> {
        Some(Box::new(ChildOp::new(upstream, Arc::clone(graph))))
    }
}

struct AttributeBuiltin;

impl Builtin for AttributeBuiltin {
    fn name(&self) -> String {
        "attribute".to_string()
    }

    fn build_exec(
        &self,
        upstream: OpRef,
        graph: &Arc<DwarfGraph>,
        _scope: &Arc<Scope>,
    ) -> Option<OpRef> {
        Some(Box::new(AttributeOp::new(upstream, Arc::clone(graph))))
    }
}

/// Builds one of the unit-struct shape operators.
macro_rules! shape_builtin {
    ($builtin:ident, $shape:ident, $name:literal) => {
        struct $builtin;

        impl Builtin for $builtin {
            fn name(&self) -> String {
                $name.to_string()
            }

            fn build_exec(
                &self,
                upstream: OpRef,
                _graph: &Arc<DwarfGraph>,
                _scope: &Arc<Scope>,
            ) -> Option<OpRef> {
                Some(Box::new(ShapeExec::new(upstream, $shape)))
            }
        }
    };
}

shape_builtin!(OffsetBuiltin, OffsetShape, "offset");
shape_builtin!(LabelBuiltin, LabelShape, "label");
shape_builtin!(FormBuiltin, FormShape, "form");
shape_builtin!(ParentBuiltin, ParentShape, "parent");
shape_builtin!(IntegrateBuiltin, IntegrateShape, "integrate");

struct OperandBuiltin {
    sel: OperandSel,
}

impl Builtin for OperandBuiltin {
    fn name(&self) -> String {
        match self.sel {
            OperandSel::First => "@number".to_string(),
            OperandSel::Second => "@number2".to_string(),
        }
    }

    fn build_exec(
        &self,
        upstream: OpRef,
        _graph: &Arc<DwarfGraph>,
        _scope: &Arc<Scope>,
    ) -> Option<OpRef> {
        Some(Box::new(OperandOp::new(upstream, self.sel)))
    }
}

struct RootBuiltin {
    positive: bool,
}

impl Builtin for RootBuiltin {
    fn name(&self) -> String {
        if self.positive { "?root" } else { "!root" }.to_string()
    }

    fn build_pred(&self, _graph: &Arc<DwarfGraph>, _scope: &Arc<Scope>) -> Option<Box<dyn Pred>> {
        Some(maybe_invert(self.positive, Box::new(RootPred)))
    }
}

/// `@AT_X`: attribute lookup composed with value decoding.
struct AttrNamedBuiltin {
    at: gimli::DwAt,
}

impl Builtin for AttrNamedBuiltin {
    fn name(&self) -> String {
        format!(
            "@AT_{}",
            Constant::new(self.at.0, &DW_ATTR_DOM).show(crate::core::Brevity::Brief)
        )
    }

    fn build_exec(
        &self,
        upstream: OpRef,
        _graph: &Arc<DwarfGraph>,
        _scope: &Arc<Scope>,
    ) -> Option<OpRef> {
        let named = Box::new(ShapeExec::new(upstream, AttrNamedShape { at: self.at }));
        Some(Box::new(ValueOp::new(named)))
    }
}

struct AttrPredBuiltin {
    at: gimli::DwAt,
    positive: bool,
}

impl Builtin for AttrPredBuiltin {
    fn name(&self) -> String {
        let mut name = AttrPred::new(self.at).name();
        if !self.positive {
            name.replace_range(0..1, "!");
        }
        name
    }

    fn build_pred(&self, _graph: &Arc<DwarfGraph>, _scope: &Arc<Scope>) -> Option<Box<dyn Pred>> {
        Some(maybe_invert(self.positive, Box::new(AttrPred::new(self.at))))
    }
}

struct TagPredBuiltin {
    tag: gimli::DwTag,
    positive: bool,
}

impl Builtin for TagPredBuiltin {
    fn name(&self) -> String {
        let mut name = TagPred::new(self.tag).name();
        if !self.positive {
            name.replace_range(0..1, "!");
        }
        name
    }

    fn build_pred(&self, _graph: &Arc<DwarfGraph>, _scope: &Arc<Scope>) -> Option<Box<dyn Pred>> {
        Some(maybe_invert(self.positive, Box::new(TagPred::new(self.tag))))
    }
}

struct FormPredBuiltin {
    form: gimli::DwForm,
    positive: bool,
}

impl Builtin for FormPredBuiltin {
    fn name(&self) -> String {
        let mut name = FormPred::new(self.form).name();
        if !self.positive {
            name.replace_range(0..1, "!");
        }
        name
    }

    fn build_pred(&self, _graph: &Arc<DwarfGraph>, _scope: &Arc<Scope>) -> Option<Box<dyn Pred>> {
        Some(maybe_invert(
            self.positive,
            Box::new(FormPred::new(self.form)),
        ))
    }
}

/// A domain constant: executing it pushes the constant.
struct ConstBuiltin {
    name: String,
    cst: Constant,
}

impl Builtin for ConstBuiltin {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn build_exec(
        &self,
        upstream: OpRef,
        _graph: &Arc<DwarfGraph>,
        _scope: &Arc<Scope>,
    ) -> Option<OpRef> {
        Some(Box::new(PushConstOp::new(
            upstream,
            self.cst,
            self.name.clone(),
        )))
    }
}

/// Overload specialisations for `value`, `length`, `elem`, `add`.
macro_rules! spec_builtin {
    ($builtin:ident, $op:ident, $name:literal) => {
        struct $builtin;

        impl Builtin for $builtin {
            fn name(&self) -> String {
                $name.to_string()
            }

            fn build_exec(
                &self,
                upstream: OpRef,
                _graph: &Arc<DwarfGraph>,
                _scope: &Arc<Scope>,
            ) -> Option<OpRef> {
                Some(Box::new($op::new(upstream)))
            }
        }
    };
}

spec_builtin!(ValueBuiltin, ValueOp, "value");
spec_builtin!(StrLengthBuiltin, StrLengthOp, "length");
spec_builtin!(SeqLengthBuiltin, SeqLengthOp, "length");
spec_builtin!(StrElemBuiltin, StrElemOp, "elem");
spec_builtin!(SeqElemBuiltin, SeqElemOp, "elem");
spec_builtin!(StrAddBuiltin, StrAddOp, "add");
spec_builtin!(SeqAddBuiltin, SeqAddOp, "add");

/// Polarity-carrying predicate builtins for the string/sequence predicates.
macro_rules! pred_builtin {
    ($builtin:ident, $pred:ident, $name:literal) => {
        struct $builtin {
            positive: bool,
        }

        impl Builtin for $builtin {
            fn name(&self) -> String {
                let polarity = if self.positive { "?" } else { "!" };
                format!("{polarity}{}", $name)
            }

            fn build_pred(
                &self,
                _graph: &Arc<DwarfGraph>,
                _scope: &Arc<Scope>,
            ) -> Option<Box<dyn Pred>> {
                Some(maybe_invert(self.positive, Box::new($pred)))
            }
        }
    };
}

pred_builtin!(EmptyPredBuiltin, EmptyPred, "empty");
pred_builtin!(FindPredBuiltin, FindPred, "find");
pred_builtin!(MatchPredBuiltin, MatchPred, "match");

fn register_constant(dict: &mut BuiltinDict, name: String, cst: Constant) {
    dict.add_named(Arc::new(ConstBuiltin { name: name.clone(), cst }), name);
}

fn register_attr(dict: &mut BuiltinDict, short: &str, at: gimli::DwAt) {
    let named: Arc<dyn Builtin> = Arc::new(AttrNamedBuiltin { at });
    dict.add_named(Arc::clone(&named), format!("@AT_{short}"));
    dict.add_named(named, format!("@DW_AT_{short}"));

    let positive: Arc<dyn Builtin> = Arc::new(AttrPredBuiltin { at, positive: true });
    let negative: Arc<dyn Builtin> = Arc::new(AttrPredBuiltin {
        at,
        positive: false,
    });
    dict.add_named(Arc::clone(&positive), format!("?AT_{short}"));
    dict.add_named(Arc::clone(&negative), format!("!AT_{short}"));
    dict.add_named(positive, format!("?DW_AT_{short}"));
    dict.add_named(negative, format!("!DW_AT_{short}"));

    register_constant(
        dict,
        format!("DW_AT_{short}"),
        Constant::new(at.0, &DW_ATTR_DOM),
    );
}

fn register_tag(dict: &mut BuiltinDict, short: &str, tag: gimli::DwTag) {
    let positive: Arc<dyn Builtin> = Arc::new(TagPredBuiltin {
        tag,
        positive: true,
    });
    let negative: Arc<dyn Builtin> = Arc::new(TagPredBuiltin {
        tag,
        positive: false,
    });
    dict.add_named(Arc::clone(&positive), format!("?TAG_{short}"));
    dict.add_named(Arc::clone(&negative), format!("!TAG_{short}"));
    dict.add_named(positive, format!("?DW_TAG_{short}"));
    dict.add_named(negative, format!("!DW_TAG_{short}"));

    register_constant(
        dict,
        format!("DW_TAG_{short}"),
        Constant::new(tag.0, &DW_TAG_DOM),
    );
}

fn register_form(dict: &mut BuiltinDict, short: &str, form: gimli::DwForm) {
    let positive: Arc<dyn Builtin> = Arc::new(FormPredBuiltin {
        form,
        positive: true,
    });
    let negative: Arc<dyn Builtin> = Arc::new(FormPredBuiltin {
        form,
        positive: false,
    });
    dict.add_named(Arc::clone(&positive), format!("?FORM_{short}"));
    dict.add_named(Arc::clone(&negative), format!("!FORM_{short}"));
    dict.add_named(positive, format!("?DW_FORM_{short}"));
    dict.add_named(negative, format!("!DW_FORM_{short}"));

    register_constant(
        dict,
        format!("DW_FORM_{short}"),
        Constant::new(form.0, &DW_FORM_DOM),
    );
}

macro_rules! for_each_known_tag {
    ($f:ident) => {
        $f!("array_type", DW_TAG_array_type);
        $f!("class_type", DW_TAG_class_type);
        $f!("entry_point", DW_TAG_entry_point);
        $f!("enumeration_type", DW_TAG_enumeration_type);
        $f!("formal_parameter", DW_TAG_formal_parameter);
        $f!("imported_declaration", DW_TAG_imported_declaration);
        $f!("label", DW_TAG_label);
        $f!("lexical_block", DW_TAG_lexical_block);
        $f!("member", DW_TAG_member);
        $f!("pointer_type", DW_TAG_pointer_type);
        $f!("reference_type", DW_TAG_reference_type);
        $f!("compile_unit", DW_TAG_compile_unit);
        $f!("string_type", DW_TAG_string_type);
        $f!("structure_type", DW_TAG_structure_type);
        $f!("subroutine_type", DW_TAG_subroutine_type);
        $f!("typedef", DW_TAG_typedef);
        $f!("union_type", DW_TAG_union_type);
        $f!("unspecified_parameters", DW_TAG_unspecified_parameters);
        $f!("variant", DW_TAG_variant);
        $f!("common_block", DW_TAG_common_block);
        $f!("common_inclusion", DW_TAG_common_inclusion);
        $f!("inheritance", DW_TAG_inheritance);
        $f!("inlined_subroutine", DW_TAG_inlined_subroutine);
        $f!("module", DW_TAG_module);
        $f!("ptr_to_member_type", DW_TAG_ptr_to_member_type);
        $f!("set_type", DW_TAG_set_type);
        $f!("subrange_type", DW_TAG_subrange_type);
        $f!("with_stmt", DW_TAG_with_stmt);
        $f!("access_declaration", DW_TAG_access_declaration);
        $f!("base_type", DW_TAG_base_type);
        $f!("catch_block", DW_TAG_catch_block);
        $f!("const_type", DW_TAG_const_type);
        $f!("constant", DW_TAG_constant);
        $f!("enumerator", DW_TAG_enumerator);
        $f!("file_type", DW_TAG_file_type);
        $f!("friend", DW_TAG_friend);
        $f!("namelist", DW_TAG_namelist);
        $f!("namelist_item", DW_TAG_namelist_item);
        $f!("packed_type", DW_TAG_packed_type);
        $f!("subprogram", DW_TAG_subprogram);
        $f!("template_type_parameter", DW_TAG_template_type_parameter);
        $f!("template_value_parameter", DW_TAG_template_value_parameter);
        $f!("thrown_type", DW_TAG_thrown_type);
        $f!("try_block", DW_TAG_try_block);
        $f!("variant_part", DW_TAG_variant_part);
        $f!("variable", DW_TAG_variable);
        $f!("volatile_type", DW_TAG_volatile_type);
        $f!("dwarf_procedure", DW_TAG_dwarf_procedure);
        $f!("restrict_type", DW_TAG_restrict_type);
        $f!("interface_type", DW_TAG_interface_type);
        $f!("namespace", DW_TAG_namespace);
        $f!("imported_module", DW_TAG_imported_module);
        $f!("unspecified_type", DW_TAG_unspecified_type);
        $f!("partial_unit", DW_TAG_partial_unit);
        $f!("imported_unit", DW_TAG_imported_unit);
        $f!("condition", DW_TAG_condition);
        $f!("shared_type", DW_TAG_shared_type);
        $f!("type_unit", DW_TAG_type_unit);
        $f!("rvalue_reference_type", DW_TAG_rvalue_reference_type);
        $f!("template_alias", DW_TAG_template_alias);
        $f!("coarray_type", DW_TAG_coarray_type);
        $f!("generic_subrange", DW_TAG_generic_subrange);
        $f!("dynamic_type", DW_TAG_dynamic_type);
        $f!("atomic_type", DW_TAG_atomic_type);
        $f!("call_site", DW_TAG_call_site);
        $f!("call_site_parameter", DW_TAG_call_site_parameter);
        $f!("skeleton_unit", DW_TAG_skeleton_unit);
        $f!("immutable_type", DW_TAG_immutable_type);
    };
}

macro_rules! for_each_known_attr {
    ($f:ident) => {
        $f!("sibling", DW_AT_sibling);
        $f!("location", DW_AT_location);
        $f!("name", DW_AT_name);
        $f!("ordering", DW_AT_ordering);
        $f!("byte_size", DW_AT_byte_size);
        $f!("bit_offset", DW_AT_bit_offset);
        $f!("bit_size", DW_AT_bit_size);
        $f!("stmt_list", DW_AT_stmt_list);
        $f!("low_pc", DW_AT_low_pc);
        $f!("high_pc", DW_AT_high_pc);
        $f!("language", DW_AT_language);
        $f!("discr", DW_AT_discr);
        $f!("discr_value", DW_AT_discr_value);
        $f!("visibility", DW_AT_visibility);
        $f!("import", DW_AT_import);
        $f!("string_length", DW_AT_string_length);
        $f!("common_reference", DW_AT_common_reference);
        $f!("comp_dir", DW_AT_comp_dir);
        $f!("const_value", DW_AT_const_value);
        $f!("containing_type", DW_AT_containing_type);
        $f!("default_value", DW_AT_default_value);
        $f!("inline", DW_AT_inline);
        $f!("is_optional", DW_AT_is_optional);
        $f!("lower_bound", DW_AT_lower_bound);
        $f!("producer", DW_AT_producer);
        $f!("prototyped", DW_AT_prototyped);
        $f!("return_addr", DW_AT_return_addr);
        $f!("start_scope", DW_AT_start_scope);
        $f!("bit_stride", DW_AT_bit_stride);
        $f!("upper_bound", DW_AT_upper_bound);
        $f!("abstract_origin", DW_AT_abstract_origin);
        $f!("accessibility", DW_AT_accessibility);
        $f!("address_class", DW_AT_address_class);
        $f!("artificial", DW_AT_artificial);
        $f!("base_types", DW_AT_base_types);
        $f!("calling_convention", DW_AT_calling_convention);
        $f!("count", DW_AT_count);
        $f!("data_member_location", DW_AT_data_member_location);
        $f!("decl_column", DW_AT_decl_column);
        $f!("decl_file", DW_AT_decl_file);
        $f!("decl_line", DW_AT_decl_line);
        $f!("declaration", DW_AT_declaration);
        $f!("discr_list", DW_AT_discr_list);
        $f!("encoding", DW_AT_encoding);
        $f!("external", DW_AT_external);
        $f!("frame_base", DW_AT_frame_base);
        $f!("friend", DW_AT_friend);
        $f!("identifier_case", DW_AT_identifier_case);
        $f!("macro_info", DW_AT_macro_info);
        $f!("namelist_item", DW_AT_namelist_item);
        $f!("priority", DW_AT_priority);
        $f!("segment", DW_AT_segment);
        $f!("specification", DW_AT_specification);
        $f!("static_link", DW_AT_static_link);
        $f!("type", DW_AT_type);
        $f!("use_location", DW_AT_use_location);
        $f!("variable_parameter", DW_AT_variable_parameter);
        $f!("virtuality", DW_AT_virtuality);
        $f!("vtable_elem_location", DW_AT_vtable_elem_location);
        $f!("allocated", DW_AT_allocated);
        $f!("associated", DW_AT_associated);
        $f!("data_location", DW_AT_data_location);
        $f!("byte_stride", DW_AT_byte_stride);
        $f!("entry_pc", DW_AT_entry_pc);
        $f!("use_UTF8", DW_AT_use_UTF8);
        $f!("extension", DW_AT_extension);
        $f!("ranges", DW_AT_ranges);
        $f!("trampoline", DW_AT_trampoline);
        $f!("call_column", DW_AT_call_column);
        $f!("call_file", DW_AT_call_file);
        $f!("call_line", DW_AT_call_line);
        $f!("description", DW_AT_description);
        $f!("binary_scale", DW_AT_binary_scale);
        $f!("decimal_scale", DW_AT_decimal_scale);
        $f!("small", DW_AT_small);
        $f!("decimal_sign", DW_AT_decimal_sign);
        $f!("digit_count", DW_AT_digit_count);
        $f!("picture_string", DW_AT_picture_string);
        $f!("mutable", DW_AT_mutable);
        $f!("threads_scaled", DW_AT_threads_scaled);
        $f!("explicit", DW_AT_explicit);
        $f!("object_pointer", DW_AT_object_pointer);
        $f!("endianity", DW_AT_endianity);
        $f!("elemental", DW_AT_elemental);
        $f!("pure", DW_AT_pure);
        $f!("recursive", DW_AT_recursive);
        $f!("signature", DW_AT_signature);
        $f!("main_subprogram", DW_AT_main_subprogram);
        $f!("data_bit_offset", DW_AT_data_bit_offset);
        $f!("const_expr", DW_AT_const_expr);
        $f!("enum_class", DW_AT_enum_class);
        $f!("linkage_name", DW_AT_linkage_name);
        $f!("noreturn", DW_AT_noreturn);
        $f!("alignment", DW_AT_alignment);
        $f!("export_symbols", DW_AT_export_symbols);
        $f!("deleted", DW_AT_deleted);
        $f!("defaulted", DW_AT_defaulted);
    };
}

macro_rules! for_each_known_form {
    ($f:ident) => {
        $f!("addr", DW_FORM_addr);
        $f!("block2", DW_FORM_block2);
        $f!("block4", DW_FORM_block4);
        $f!("data2", DW_FORM_data2);
        $f!("data4", DW_FORM_data4);
        $f!("data8", DW_FORM_data8);
        $f!("string", DW_FORM_string);
        $f!("block", DW_FORM_block);
        $f!("block1", DW_FORM_block1);
        $f!("data1", DW_FORM_data1);
        $f!("flag", DW_FORM_flag);
        $f!("sdata", DW_FORM_sdata);
        $f!("strp", DW_FORM_strp);
        $f!("udata", DW_FORM_udata);
        $f!("ref_addr", DW_FORM_ref_addr);
        $f!("ref1", DW_FORM_ref1);
        $f!("ref2", DW_FORM_ref2);
        $f!("ref4", DW_FORM_ref4);
        $f!("ref8", DW_FORM_ref8);
        $f!("ref_udata", DW_FORM_ref_udata);
        $f!("indirect", DW_FORM_indirect);
        $f!("sec_offset", DW_FORM_sec_offset);
        $f!("exprloc", DW_FORM_exprloc);
        $f!("flag_present", DW_FORM_flag_present);
        $f!("strx", DW_FORM_strx);
        $f!("addrx", DW_FORM_addrx);
        $f!("data16", DW_FORM_data16);
        $f!("line_strp", DW_FORM_line_strp);
        $f!("ref_sig8", DW_FORM_ref_sig8);
        $f!("implicit_const", DW_FORM_implicit_const);
        $f!("loclistx", DW_FORM_loclistx);
        $f!("rnglistx", DW_FORM_rnglistx);
    };
}

macro_rules! for_each_known_locop {
    ($f:ident) => {
        $f!("addr", DW_OP_addr);
        $f!("deref", DW_OP_deref);
        $f!("const1u", DW_OP_const1u);
        $f!("const1s", DW_OP_const1s);
        $f!("const2u", DW_OP_const2u);
        $f!("const2s", DW_OP_const2s);
        $f!("const4u", DW_OP_const4u);
        $f!("const4s", DW_OP_const4s);
        $f!("const8u", DW_OP_const8u);
        $f!("const8s", DW_OP_const8s);
        $f!("constu", DW_OP_constu);
        $f!("consts", DW_OP_consts);
        $f!("dup", DW_OP_dup);
        $f!("drop", DW_OP_drop);
        $f!("over", DW_OP_over);
        $f!("pick", DW_OP_pick);
        $f!("swap", DW_OP_swap);
        $f!("rot", DW_OP_rot);
        $f!("xderef", DW_OP_xderef);
        $f!("abs", DW_OP_abs);
        $f!("and", DW_OP_and);
        $f!("div", DW_OP_div);
        $f!("minus", DW_OP_minus);
        $f!("mod", DW_OP_mod);
        $f!("mul", DW_OP_mul);
        $f!("neg", DW_OP_neg);
        $f!("not", DW_OP_not);
        $f!("or", DW_OP_or);
        $f!("plus", DW_OP_plus);
        $f!("plus_uconst", DW_OP_plus_uconst);
        $f!("shl", DW_OP_shl);
        $f!("shr", DW_OP_shr);
        $f!("shra", DW_OP_shra);
        $f!("xor", DW_OP_xor);
        $f!("bra", DW_OP_bra);
        $f!("eq", DW_OP_eq);
        $f!("ge", DW_OP_ge);
        $f!("gt", DW_OP_gt);
        $f!("le", DW_OP_le);
        $f!("lt", DW_OP_lt);
        $f!("ne", DW_OP_ne);
        $f!("skip", DW_OP_skip);
        $f!("lit0", DW_OP_lit0);
        $f!("lit1", DW_OP_lit1);
        $f!("lit2", DW_OP_lit2);
        $f!("lit3", DW_OP_lit3);
        $f!("reg0", DW_OP_reg0);
        $f!("reg1", DW_OP_reg1);
        $f!("reg2", DW_OP_reg2);
        $f!("reg3", DW_OP_reg3);
        $f!("reg4", DW_OP_reg4);
        $f!("reg5", DW_OP_reg5);
        $f!("reg6", DW_OP_reg6);
        $f!("reg7", DW_OP_reg7);
        $f!("breg0", DW_OP_breg0);
        $f!("breg1", DW_OP_breg1);
        $f!("breg2", DW_OP_breg2);
        $f!("breg3", DW_OP_breg3);
        $f!("breg4", DW_OP_breg4);
        $f!("breg5", DW_OP_breg5);
        $f!("breg6", DW_OP_breg6);
        $f!("breg7", DW_OP_breg7);
        $f!("regx", DW_OP_regx);
        $f!("fbreg", DW_OP_fbreg);
        $f!("bregx", DW_OP_bregx);
        $f!("piece", DW_OP_piece);
        $f!("deref_size", DW_OP_deref_size);
        $f!("xderef_size", DW_OP_xderef_size);
        $f!("nop", DW_OP_nop);
        $f!("push_object_address", DW_OP_push_object_address);
        $f!("call2", DW_OP_call2);
        $f!("call4", DW_OP_call4);
        $f!("call_ref", DW_OP_call_ref);
        $f!("form_tls_address", DW_OP_form_tls_address);
        $f!("call_frame_cfa", DW_OP_call_frame_cfa);
        $f!("bit_piece", DW_OP_bit_piece);
        $f!("implicit_value", DW_OP_implicit_value);
        $f!("stack_value", DW_OP_stack_value);
        $f!("implicit_pointer", DW_OP_implicit_pointer);
        $f!("addrx", DW_OP_addrx);
        $f!("constx", DW_OP_constx);
        $f!("entry_value", DW_OP_entry_value);
        $f!("const_type", DW_OP_const_type);
        $f!("regval_type", DW_OP_regval_type);
        $f!("deref_type", DW_OP_deref_type);
        $f!("xderef_type", DW_OP_xderef_type);
        $f!("convert", DW_OP_convert);
        $f!("reinterpret", DW_OP_reinterpret);
    };
}

macro_rules! for_each_known_lang {
    ($f:ident) => {
        $f!(DW_LANG_C89);
        $f!(DW_LANG_C);
        $f!(DW_LANG_Ada83);
        $f!(DW_LANG_C_plus_plus);
        $f!(DW_LANG_Cobol74);
        $f!(DW_LANG_Cobol85);
        $f!(DW_LANG_Fortran77);
        $f!(DW_LANG_Fortran90);
        $f!(DW_LANG_Pascal83);
        $f!(DW_LANG_Modula2);
        $f!(DW_LANG_Java);
        $f!(DW_LANG_C99);
        $f!(DW_LANG_Ada95);
        $f!(DW_LANG_Fortran95);
        $f!(DW_LANG_PLI);
        $f!(DW_LANG_ObjC);
        $f!(DW_LANG_ObjC_plus_plus);
        $f!(DW_LANG_UPC);
        $f!(DW_LANG_D);
        $f!(DW_LANG_Python);
        $f!(DW_LANG_OpenCL);
        $f!(DW_LANG_Go);
        $f!(DW_LANG_Modula3);
        $f!(DW_LANG_Haskell);
        $f!(DW_LANG_C_plus_plus_03);
        $f!(DW_LANG_C_plus_plus_11);
        $f!(DW_LANG_OCaml);
        $f!(DW_LANG_Rust);
        $f!(DW_LANG_C11);
        $f!(DW_LANG_Swift);
        $f!(DW_LANG_Julia);
        $f!(DW_LANG_C_plus_plus_14);
        $f!(DW_LANG_Fortran03);
        $f!(DW_LANG_Fortran08);
        $f!(DW_LANG_RenderScript);
        $f!(DW_LANG_BLISS);
    };
}

macro_rules! for_each_known_ate {
    ($f:ident) => {
        $f!(DW_ATE_address);
        $f!(DW_ATE_boolean);
        $f!(DW_ATE_complex_float);
        $f!(DW_ATE_float);
        $f!(DW_ATE_signed);
        $f!(DW_ATE_signed_char);
        $f!(DW_ATE_unsigned);
        $f!(DW_ATE_unsigned_char);
        $f!(DW_ATE_imaginary_float);
        $f!(DW_ATE_packed_decimal);
        $f!(DW_ATE_numeric_string);
        $f!(DW_ATE_edited);
        $f!(DW_ATE_signed_fixed);
        $f!(DW_ATE_unsigned_fixed);
        $f!(DW_ATE_decimal_float);
        $f!(DW_ATE_UTF);
        $f!(DW_ATE_UCS);
        $f!(DW_ATE_ASCII);
    };
}

/// The complete DWARF builtin vocabulary.
pub fn dw_dict() -> BuiltinDict {
    let mut dict = BuiltinDict::empty();

    dict.add(Arc::new(WinfoBuiltin));
    dict.add(Arc::new(UnitBuiltin));
    dict.add(Arc::new(ChildBuiltin));
    dict.add(Arc::new(AttributeBuiltin));
    dict.add(Arc::new(OffsetBuiltin));
    dict.add(Arc::new(LabelBuiltin));
    dict.add(Arc::new(FormBuiltin));
    dict.add(Arc::new(ParentBuiltin));
    dict.add(Arc::new(IntegrateBuiltin));
    dict.add(Arc::new(OperandBuiltin {
        sel: OperandSel::First,
    }));
    dict.add(Arc::new(OperandBuiltin {
        sel: OperandSel::Second,
    }));

    dict.add(Arc::new(RootBuiltin { positive: true }));
    dict.add(Arc::new(RootBuiltin { positive: false }));

    dict.add(Arc::new(EmptyPredBuiltin { positive: true }));
    dict.add(Arc::new(EmptyPredBuiltin { positive: false }));
    dict.add(Arc::new(FindPredBuiltin { positive: true }));
    dict.add(Arc::new(FindPredBuiltin { positive: false }));
    dict.add(Arc::new(MatchPredBuiltin { positive: true }));
    dict.add(Arc::new(MatchPredBuiltin { positive: false }));

    // Overloaded function builtins.
    {
        let mut tab = OverloadTab::new();
        tab.add_overload(
            Selector::new(vec![ValueType::ATTR]),
            Arc::new(ValueBuiltin),
        );
        dict.add(Arc::new(OverloadedBuiltin::new("value", Arc::new(tab))));
    }
    {
        let mut tab = OverloadTab::new();
        tab.add_overload(
            Selector::new(vec![ValueType::STR]),
            Arc::new(StrLengthBuiltin),
        );
        tab.add_overload(
            Selector::new(vec![ValueType::SEQ]),
            Arc::new(SeqLengthBuiltin),
        );
        dict.add(Arc::new(OverloadedBuiltin::new("length", Arc::new(tab))));
    }
    {
        let mut tab = OverloadTab::new();
        tab.add_overload(
            Selector::new(vec![ValueType::STR]),
            Arc::new(StrElemBuiltin),
        );
        tab.add_overload(
            Selector::new(vec![ValueType::SEQ]),
            Arc::new(SeqElemBuiltin),
        );
        dict.add(Arc::new(OverloadedBuiltin::new("elem", Arc::new(tab))));
    }
    {
        let mut tab = OverloadTab::new();
        tab.add_overload(
            Selector::new(vec![ValueType::STR, ValueType::STR]),
            Arc::new(StrAddBuiltin),
        );
        tab.add_overload(
            Selector::new(vec![ValueType::SEQ, ValueType::SEQ]),
            Arc::new(SeqAddBuiltin),
        );
        dict.add(Arc::new(OverloadedBuiltin::new("add", Arc::new(tab))));
    }

    macro_rules! reg_tag {
        ($short:literal, $code:ident) => {
            register_tag(&mut dict, $short, gimli::$code);
        };
    }
    for_each_known_tag!(reg_tag);

    macro_rules! reg_at {
        ($short:literal, $code:ident) => {
            register_attr(&mut dict, $short, gimli::$code);
        };
    }
    for_each_known_attr!(reg_at);

    macro_rules! reg_form {
        ($short:literal, $code:ident) => {
            register_form(&mut dict, $short, gimli::$code);
        };
    }
    for_each_known_form!(reg_form);

    macro_rules! reg_locop {
        ($short:literal, $code:ident) => {
            register_constant(
                &mut dict,
                stringify!($code).to_string(),
                Constant::new(gimli::$code.0, &DW_LOCOP_DOM),
            );
        };
    }
    for_each_known_locop!(reg_locop);

    macro_rules! reg_lang {
        ($code:ident) => {
            register_constant(
                &mut dict,
                stringify!($code).to_string(),
                Constant::new(gimli::$code.0, &DW_LANG_DOM),
            );
        };
    }
    for_each_known_lang!(reg_lang);

    macro_rules! reg_ate {
        ($code:ident) => {
            register_constant(
                &mut dict,
                stringify!($code).to_string(),
                Constant::new(gimli::$code.0, &DW_ATE_DOM),
            );
        };
    }
    for_each_known_ate!(reg_ate);

    macro_rules! reg_misc {
        ($code:ident, $dom:expr) => {
            register_constant(
                &mut dict,
                stringify!($code).to_string(),
                Constant::new(gimli::$code.0, $dom),
            );
        };
    }
    reg_misc!(DW_ACCESS_public, &DW_ACCESS_DOM);
    reg_misc!(DW_ACCESS_protected, &DW_ACCESS_DOM);
    reg_misc!(DW_ACCESS_private, &DW_ACCESS_DOM);
    reg_misc!(DW_VIS_local, &DW_VIS_DOM);
    reg_misc!(DW_VIS_exported, &DW_VIS_DOM);
    reg_misc!(DW_VIS_qualified, &DW_VIS_DOM);
    reg_misc!(DW_VIRTUALITY_none, &DW_VIRTUALITY_DOM);
    reg_misc!(DW_VIRTUALITY_virtual, &DW_VIRTUALITY_DOM);
    reg_misc!(DW_VIRTUALITY_pure_virtual, &DW_VIRTUALITY_DOM);
    reg_misc!(DW_INL_not_inlined, &DW_INL_DOM);
    reg_misc!(DW_INL_inlined, &DW_INL_DOM);
    reg_misc!(DW_INL_declared_not_inlined, &DW_INL_DOM);
    reg_misc!(DW_INL_declared_inlined, &DW_INL_DOM);
    reg_misc!(DW_ID_case_sensitive, &DW_ID_DOM);
    reg_misc!(DW_ID_up_case, &DW_ID_DOM);
    reg_misc!(DW_ID_down_case, &DW_ID_DOM);
    reg_misc!(DW_ID_case_insensitive, &DW_ID_DOM);
    reg_misc!(DW_CC_normal, &DW_CC_DOM);
    reg_misc!(DW_CC_program, &DW_CC_DOM);
    reg_misc!(DW_CC_nocall, &DW_CC_DOM);
    reg_misc!(DW_CC_pass_by_reference, &DW_CC_DOM);
    reg_misc!(DW_CC_pass_by_value, &DW_CC_DOM);
    reg_misc!(DW_ORD_row_major, &DW_ORD_DOM);
    reg_misc!(DW_ORD_col_major, &DW_ORD_DOM);
    reg_misc!(DW_DS_unsigned, &DW_DS_DOM);
    reg_misc!(DW_DS_leading_overpunch, &DW_DS_DOM);
    reg_misc!(DW_DS_trailing_overpunch, &DW_DS_DOM);
    reg_misc!(DW_DS_leading_separate, &DW_DS_DOM);
    reg_misc!(DW_DS_trailing_separate, &DW_DS_DOM);
    reg_misc!(DW_END_default, &DW_END_DOM);
    reg_misc!(DW_END_big, &DW_END_DOM);
    reg_misc!(DW_END_little, &DW_END_DOM);
    reg_misc!(DW_ADDR_none, &DW_ADDR_DOM);

    tracing::debug!("Built DWARF builtin dictionary: {} names", dict.len());
    dict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::op::OnceOp;

    #[test]
    fn test_dict_has_core_vocabulary() {
        let dict = dw_dict();
        for name in [
            "winfo",
            "unit",
            "child",
            "attribute",
            "offset",
            "label",
            "form",
            "parent",
            "integrate",
            "@number",
            "@number2",
            "?root",
            "!root",
            "value",
            "length",
            "elem",
            "add",
            "@AT_name",
            "@DW_AT_name",
            "?AT_name",
            "!AT_name",
            "?TAG_subprogram",
            "!DW_TAG_subprogram",
            "?FORM_string",
            "DW_TAG_subprogram",
            "DW_AT_name",
            "DW_FORM_string",
            "DW_OP_fbreg",
            "DW_LANG_C99",
            "DW_ATE_signed",
            "DW_ADDR_none",
        ] {
            assert!(dict.find(name).is_some(), "missing builtin: {name}");
        }
    }

    #[test]
    fn test_predicate_polarity_names() {
        let dict = dw_dict();
        let positive = dict.find("?AT_name").unwrap();
        let negative = dict.find("!AT_name").unwrap();
        assert_eq!(positive.name(), "?AT_name");
        assert_eq!(negative.name(), "!AT_name");
    }

    #[test]
    fn test_merge_requires_overloads() {
        let a = dw_dict();
        let mut b = BuiltinDict::empty();
        b.add(Arc::new(WinfoBuiltin));
        // "winfo" is a plain builtin on both sides.
        assert!(BuiltinDict::merged(&a, &b).is_err());
    }

    #[test]
    fn test_merge_unions_overload_tables() {
        let mut a = BuiltinDict::empty();
        {
            let mut tab = OverloadTab::new();
            tab.add_overload(Selector::new(vec![ValueType::STR]), Arc::new(StrLengthBuiltin));
            a.add(Arc::new(OverloadedBuiltin::new("length", Arc::new(tab))));
        }
        let mut b = BuiltinDict::empty();
        {
            let mut tab = OverloadTab::new();
            tab.add_overload(Selector::new(vec![ValueType::SEQ]), Arc::new(SeqLengthBuiltin));
            b.add(Arc::new(OverloadedBuiltin::new("length", Arc::new(tab))));
        }

        let merged = BuiltinDict::merged(&a, &b).unwrap();
        let builtin = merged.find("length").unwrap();
        let tab = builtin.as_overloaded().unwrap().tab();
        assert_eq!(tab.entries().len(), 2);
    }

    #[test]
    fn test_merge_disjoint_names() {
        let mut a = BuiltinDict::empty();
        a.add(Arc::new(WinfoBuiltin));
        let mut b = BuiltinDict::empty();
        b.add(Arc::new(ChildBuiltin));

        let merged = BuiltinDict::merged(&a, &b).unwrap();
        assert!(merged.find("winfo").is_some());
        assert!(merged.find("child").is_some());
    }

    #[test]
    fn test_constant_builtin_without_graph() {
        // Constant builtins never touch the graph; exercise one through a
        // throwaway empty graph.
        let graph = crate::tests_support::empty_graph();
        let scope = Arc::new(Scope::default());
        let dict = dw_dict();
        let builtin = dict.find("DW_TAG_subprogram").unwrap();
        let mut op = builtin
            .build_exec(Box::new(OnceOp::new()), &graph, &scope)
            .unwrap();
        let stack = op.next().unwrap().unwrap();
        assert_eq!(
            stack.top().unwrap().show(crate::Brevity::Full),
            "DW_TAG_subprogram"
        );
    }
}
