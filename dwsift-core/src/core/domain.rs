//! Constant domains
//!
//! Every integer constant flowing through a pipeline carries a domain
//! descriptor that identifies its enumeration space (plain hex/dec, DW_TAG,
//! DW_AT, ...) and controls how it renders. Domains also gate comparison:
//! constants from incompatible domains never compare.

use std::cmp::Ordering;
use std::fmt;

/// How much detail `show` should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Brevity {
    Brief,
    Full,
}

/// Enumeration space of a domain. Two constants are comparable iff their
/// domains share a space; all plain numeric domains (hex, dec, bool) share
/// `Plain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomSpace {
    Plain,
    Tag,
    Attr,
    Form,
    LocOp,
    Lang,
    Encoding,
    Access,
    Visibility,
    Virtuality,
    Inline,
    IdentCase,
    CallingConvention,
    Ordering,
    DecimalSign,
    Endianity,
    AddressClass,
}

/// A constant domain descriptor. All domains are `'static` singletons; domain
/// identity is pointer identity.
pub struct ConstantDom {
    pub name: &'static str,
    pub space: DomSpace,
    show: fn(i128, Brevity) -> String,
}

impl fmt::Debug for ConstantDom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstantDom")
            .field("name", &self.name)
            .finish()
    }
}

pub fn domains_comparable(a: &'static ConstantDom, b: &'static ConstantDom) -> bool {
    std::ptr::eq(a, b) || a.space == b.space
}

fn named(known: Option<&'static str>, prefix: &str, raw: i128, brv: Brevity) -> String {
    match known {
        Some(name) => match brv {
            Brevity::Brief => name.strip_prefix(prefix).unwrap_or(name).to_string(),
            Brevity::Full => name.to_string(),
        },
        None => format!("{raw:#x}"),
    }
}

fn show_hex(v: i128, _brv: Brevity) -> String {
    format!("{v:#x}")
}

fn show_dec(v: i128, _brv: Brevity) -> String {
    format!("{v}")
}

fn show_bool(v: i128, _brv: Brevity) -> String {
    if v != 0 { "true" } else { "false" }.to_string()
}

fn show_tag(v: i128, brv: Brevity) -> String {
    named(gimli::DwTag(v as u16).static_string(), "DW_TAG_", v, brv)
}

fn show_attr(v: i128, brv: Brevity) -> String {
    named(gimli::DwAt(v as u16).static_string(), "DW_AT_", v, brv)
}

fn show_form(v: i128, brv: Brevity) -> String {
    named(gimli::DwForm(v as u16).static_string(), "DW_FORM_", v, brv)
}

fn show_locop(v: i128, brv: Brevity) -> String {
    named(gimli::DwOp(v as u8).static_string(), "DW_OP_", v, brv)
}

fn show_locop_short(v: i128, _brv: Brevity) -> String {
    show_locop(v, Brevity::Brief)
}

fn show_lang(v: i128, brv: Brevity) -> String {
    named(gimli::DwLang(v as u16).static_string(), "DW_LANG_", v, brv)
}

fn show_encoding(v: i128, brv: Brevity) -> String {
    named(gimli::DwAte(v as u8).static_string(), "DW_ATE_", v, brv)
}

fn show_access(v: i128, brv: Brevity) -> String {
    named(gimli::DwAccess(v as u8).static_string(), "DW_ACCESS_", v, brv)
}

fn show_visibility(v: i128, brv: Brevity) -> String {
    named(gimli::DwVis(v as u8).static_string(), "DW_VIS_", v, brv)
}

fn show_virtuality(v: i128, brv: Brevity) -> String {
    named(
        gimli::DwVirtuality(v as u8).static_string(),
        "DW_VIRTUALITY_",
        v,
        brv,
    )
}

fn show_inline(v: i128, brv: Brevity) -> String {
    named(gimli::DwInl(v as u8).static_string(), "DW_INL_", v, brv)
}

fn show_ident_case(v: i128, brv: Brevity) -> String {
    named(gimli::DwId(v as u8).static_string(), "DW_ID_", v, brv)
}

fn show_calling_convention(v: i128, brv: Brevity) -> String {
    named(gimli::DwCc(v as u8).static_string(), "DW_CC_", v, brv)
}

fn show_ordering(v: i128, brv: Brevity) -> String {
    named(gimli::DwOrd(v as u8).static_string(), "DW_ORD_", v, brv)
}

fn show_decimal_sign(v: i128, brv: Brevity) -> String {
    named(gimli::DwDs(v as u8).static_string(), "DW_DS_", v, brv)
}

fn show_endianity(v: i128, brv: Brevity) -> String {
    named(gimli::DwEnd(v as u8).static_string(), "DW_END_", v, brv)
}

fn show_address_class(v: i128, brv: Brevity) -> String {
    named(gimli::DwAddr(v as u64).static_string(), "DW_ADDR_", v, brv)
}

pub static HEX_DOM: ConstantDom = ConstantDom {
    name: "hex",
    space: DomSpace::Plain,
    show: show_hex,
};

pub static DEC_DOM: ConstantDom = ConstantDom {
    name: "dec",
    space: DomSpace::Plain,
    show: show_dec,
};

pub static BOOL_DOM: ConstantDom = ConstantDom {
    name: "bool",
    space: DomSpace::Plain,
    show: show_bool,
};

pub static DW_TAG_DOM: ConstantDom = ConstantDom {
    name: "DW_TAG",
    space: DomSpace::Tag,
    show: show_tag,
};

pub static DW_ATTR_DOM: ConstantDom = ConstantDom {
    name: "DW_AT",
    space: DomSpace::Attr,
    show: show_attr,
};

pub static DW_FORM_DOM: ConstantDom = ConstantDom {
    name: "DW_FORM",
    space: DomSpace::Form,
    show: show_form,
};

pub static DW_LOCOP_DOM: ConstantDom = ConstantDom {
    name: "DW_OP",
    space: DomSpace::LocOp,
    show: show_locop,
};

/// Same space as [`DW_LOCOP_DOM`] but renders without the `DW_OP_` prefix even
/// in full brevity. Used by `label` on location-expression opcodes.
pub static DW_LOCOP_SHORT_DOM: ConstantDom = ConstantDom {
    name: "DW_OP (short)",
    space: DomSpace::LocOp,
    show: show_locop_short,
};

pub static DW_LANG_DOM: ConstantDom = ConstantDom {
    name: "DW_LANG",
    space: DomSpace::Lang,
    show: show_lang,
};

pub static DW_ATE_DOM: ConstantDom = ConstantDom {
    name: "DW_ATE",
    space: DomSpace::Encoding,
    show: show_encoding,
};

pub static DW_ACCESS_DOM: ConstantDom = ConstantDom {
    name: "DW_ACCESS",
    space: DomSpace::Access,
    show: show_access,
};

pub static DW_VIS_DOM: ConstantDom = ConstantDom {
    name: "DW_VIS",
    space: DomSpace::Visibility,
    show: show_visibility,
};

pub static DW_VIRTUALITY_DOM: ConstantDom = ConstantDom {
    name: "DW_VIRTUALITY",
    space: DomSpace::Virtuality,
    show: show_virtuality,
};

pub static DW_INL_DOM: ConstantDom = ConstantDom {
    name: "DW_INL",
    space: DomSpace::Inline,
    show: show_inline,
};

pub static DW_ID_DOM: ConstantDom = ConstantDom {
    name: "DW_ID",
    space: DomSpace::IdentCase,
    show: show_ident_case,
};

pub static DW_CC_DOM: ConstantDom = ConstantDom {
    name: "DW_CC",
    space: DomSpace::CallingConvention,
    show: show_calling_convention,
};

pub static DW_ORD_DOM: ConstantDom = ConstantDom {
    name: "DW_ORD",
    space: DomSpace::Ordering,
    show: show_ordering,
};

pub static DW_DS_DOM: ConstantDom = ConstantDom {
    name: "DW_DS",
    space: DomSpace::DecimalSign,
    show: show_decimal_sign,
};

pub static DW_END_DOM: ConstantDom = ConstantDom {
    name: "DW_END",
    space: DomSpace::Endianity,
    show: show_endianity,
};

pub static DW_ADDR_DOM: ConstantDom = ConstantDom {
    name: "DW_ADDR",
    space: DomSpace::AddressClass,
    show: show_address_class,
};

/// An integer constant tagged with its domain.
#[derive(Debug, Clone, Copy)]
pub struct Constant {
    value: i128,
    dom: &'static ConstantDom,
}

impl Constant {
    pub fn new(value: impl Into<i128>, dom: &'static ConstantDom) -> Self {
        Self {
            value: value.into(),
            dom,
        }
    }

    pub fn value(&self) -> i128 {
        self.value
    }

    pub fn dom(&self) -> &'static ConstantDom {
        self.dom
    }

    pub fn comparable_with(&self, other: &Constant) -> bool {
        domains_comparable(self.dom, other.dom)
    }

    /// Three-way comparison; `None` when the domains are incompatible.
    pub fn partial_cmp_const(&self, other: &Constant) -> Option<Ordering> {
        if self.comparable_with(other) {
            Some(self.value.cmp(&other.value))
        } else {
            None
        }
    }

    pub fn show(&self, brv: Brevity) -> String {
        (self.dom.show)(self.value, brv)
    }
}

impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp_const(other) == Some(Ordering::Equal)
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.show(Brevity::Full))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_domains_comparable() {
        let a = Constant::new(16u32, &HEX_DOM);
        let b = Constant::new(16u32, &DEC_DOM);
        assert!(a.comparable_with(&b));
        assert_eq!(a.partial_cmp_const(&b), Some(Ordering::Equal));
    }

    #[test]
    fn test_named_domains_isolated() {
        let tag = Constant::new(0x2e_u32, &DW_TAG_DOM);
        let attr = Constant::new(0x2e_u32, &DW_ATTR_DOM);
        assert!(!tag.comparable_with(&attr));
        assert_eq!(tag.partial_cmp_const(&attr), None);
    }

    #[test]
    fn test_locop_short_shares_space() {
        let long = Constant::new(0x91_u32, &DW_LOCOP_DOM);
        let short = Constant::new(0x91_u32, &DW_LOCOP_SHORT_DOM);
        assert_eq!(long.partial_cmp_const(&short), Some(Ordering::Equal));
        assert_eq!(long.show(Brevity::Full), "DW_OP_fbreg");
        assert_eq!(short.show(Brevity::Full), "fbreg");
    }

    #[test]
    fn test_show_known_and_unknown() {
        let tag = Constant::new(0x11_u32, &DW_TAG_DOM);
        assert_eq!(tag.show(Brevity::Full), "DW_TAG_compile_unit");
        assert_eq!(tag.show(Brevity::Brief), "compile_unit");

        let unknown = Constant::new(0xff00_u32, &DW_TAG_DOM);
        assert_eq!(unknown.show(Brevity::Full), "0xff00");
    }

    #[test]
    fn test_bool_shows_words() {
        assert_eq!(Constant::new(1u32, &BOOL_DOM).show(Brevity::Brief), "true");
        assert_eq!(Constant::new(0u32, &BOOL_DOM).show(Brevity::Brief), "false");
    }
}
