//! Ordered rewrite pipeline for SQL-like formula strings.
//!
//! Stage order is part of the contract: dictionary calls are rewritten
//! before generic literals so their arguments land in the dictionary and
//! column scopes, and dotted references run before bare parameter words.

use super::{ContextMasker, MaskCategory};
use crate::config::LiteralPolicy;
use regex::{Captures, Regex};
use std::sync::OnceLock;
use tracing::trace;

/// Quoted literals that are engine vocabulary rather than identifiers.
const RESERVED_LITERALS: &[&str] = &[
    // aggregate functions
    "sum", "count", "avg", "min", "max", "uniq", "uniqexact", "any", "anylast",
    "grouparray", "groupuniqarray", "argmax", "argmin", "median", "quantile",
    // primitive types
    "string", "uint8", "uint16", "uint32", "uint64", "int8", "int16", "int32", "int64",
    "float32", "float64", "date", "datetime", "datetime64", "decimal", "uuid", "nullable",
    "lowcardinality", "array", "bool", "boolean",
    // formats
    "jsoneachrow", "csv", "tsv", "tabseparated", "json", "parquet",
    // literals
    "true", "false", "null", "none",
];

/// Pre-compiled formula patterns.
struct FormulaPatterns {
    dict_tuple_key: Regex,
    dict_single_key: Regex,
    tuple_element: Regex,
    quoted: Regex,
    brace_param: Regex,
    dotted: Regex,
    word: Regex,
}

impl FormulaPatterns {
    fn instance() -> &'static Self {
        static PATTERNS: OnceLock<FormulaPatterns> = OnceLock::new();
        PATTERNS.get_or_init(Self::compile)
    }

    fn compile() -> Self {
        Self {
            dict_tuple_key: Regex::new(r"(dictGet\w*\(\s*')([^']+)('\s*,\s*\()([^)]*)(\))")
                .expect("Invalid dictionary tuple pattern"),
            dict_single_key: Regex::new(r"(dictGet\w*\(\s*')([^']+)('\s*,\s*')([^']+)(')")
                .expect("Invalid dictionary pattern"),
            tuple_element: Regex::new(r"(tupleElement\(\s*[^,]+?,\s*')([^']+)(')")
                .expect("Invalid tupleElement pattern"),
            quoted: Regex::new(r"'([^']*)'").expect("Invalid literal pattern"),
            brace_param: Regex::new(r"\{([a-zA-Z0-9_]+)\}").expect("Invalid parameter pattern"),
            dotted: Regex::new(r"\b([a-zA-Z0-9_]+)\.([a-zA-Z0-9_]+)\b")
                .expect("Invalid dotted reference pattern"),
            word: Regex::new(r"\b([a-zA-Z_][a-zA-Z0-9_]*)\b").expect("Invalid word pattern"),
        }
    }
}

type StageFn = fn(&mut ContextMasker, &str) -> String;

/// One named rewrite step.
pub(crate) struct FormulaStage {
    pub(crate) name: &'static str,
    apply: StageFn,
}

/// The formula pipeline, in application order.
pub(crate) const PIPELINE: [FormulaStage; 7] = [
    FormulaStage {
        name: "dictionary_tuple_key",
        apply: mask_dictionary_tuple_calls,
    },
    FormulaStage {
        name: "dictionary_single_key",
        apply: mask_dictionary_calls,
    },
    FormulaStage {
        name: "tuple_element",
        apply: mask_tuple_elements,
    },
    FormulaStage {
        name: "brace_parameter",
        apply: mask_brace_parameters,
    },
    FormulaStage {
        name: "dotted_reference",
        apply: mask_dotted_references,
    },
    FormulaStage {
        name: "bare_parameter",
        apply: mask_bare_parameters,
    },
    FormulaStage {
        name: "quoted_literal",
        apply: mask_quoted_literals,
    },
];

impl ContextMasker {
    /// Masks one SQL-like expression through the ordered stage pipeline.
    ///
    /// Operators, whitespace and anything no stage recognises pass through
    /// unchanged.
    pub fn mask_formula(&mut self, formula: &str) -> String {
        if formula.is_empty() {
            return String::new();
        }
        let mut text = formula.to_string();
        for stage in &PIPELINE {
            let next = (stage.apply)(self, &text);
            if next != text {
                trace!("Formula stage '{}' rewrote expression", stage.name);
            }
            text = next;
        }
        text
    }
}

fn mask_tuple_literals(masker: &mut ContextMasker, tuple: &str) -> String {
    let patterns = FormulaPatterns::instance();
    patterns
        .quoted
        .replace_all(tuple, |caps: &Captures| {
            let literal = &caps[1];
            if literal.is_empty() || masker.is_mask(literal) {
                return caps[0].to_string();
            }
            format!("'{}'", masker.register(literal, MaskCategory::Column))
        })
        .into_owned()
}

fn mask_dictionary_tuple_calls(masker: &mut ContextMasker, text: &str) -> String {
    let patterns = FormulaPatterns::instance();
    patterns
        .dict_tuple_key
        .replace_all(text, |caps: &Captures| {
            let dictionary = if masker.is_mask(&caps[2]) {
                caps[2].to_string()
            } else {
                masker.register(&caps[2], MaskCategory::Dictionary)
            };
            let tuple = mask_tuple_literals(masker, &caps[4]);
            format!("{}{}{}{}{}", &caps[1], dictionary, &caps[3], tuple, &caps[5])
        })
        .into_owned()
}

fn mask_dictionary_calls(masker: &mut ContextMasker, text: &str) -> String {
    let patterns = FormulaPatterns::instance();
    patterns
        .dict_single_key
        .replace_all(text, |caps: &Captures| {
            if masker.is_mask(&caps[2]) {
                return caps[0].to_string();
            }
            let dictionary = masker.register(&caps[2], MaskCategory::Dictionary);
            let column = masker.register(&caps[4], MaskCategory::Column);
            format!("{}{}{}{}{}", &caps[1], dictionary, &caps[3], column, &caps[5])
        })
        .into_owned()
}

fn mask_tuple_elements(masker: &mut ContextMasker, text: &str) -> String {
    let patterns = FormulaPatterns::instance();
    patterns
        .tuple_element
        .replace_all(text, |caps: &Captures| {
            if masker.is_mask(&caps[2]) {
                return caps[0].to_string();
            }
            let column = masker.register(&caps[2], MaskCategory::Column);
            format!("{}{}{}", &caps[1], column, &caps[3])
        })
        .into_owned()
}

fn mask_brace_parameters(masker: &mut ContextMasker, text: &str) -> String {
    let patterns = FormulaPatterns::instance();
    patterns
        .brace_param
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            if masker.is_mask(name) {
                return caps[0].to_string();
            }
            format!("{{{}}}", masker.register(name, MaskCategory::Parameter))
        })
        .into_owned()
}

/// Masks the right-hand side of `Left.Right` relative to a known left side.
fn mask_member(masker: &mut ContextMasker, owner: MaskCategory, member: &str) -> String {
    if masker.is_mask(member) {
        return member.to_string();
    }
    match owner {
        MaskCategory::Entity => masker.register(member, MaskCategory::Property),
        _ => match masker.get_known_mask(member, &[MaskCategory::Property, MaskCategory::Column])
        {
            Some(known) => known.to_string(),
            None => masker.register(member, MaskCategory::Column),
        },
    }
}

fn mask_dotted_references(masker: &mut ContextMasker, text: &str) -> String {
    let patterns = FormulaPatterns::instance();
    patterns
        .dotted
        .replace_all(text, |caps: &Captures| {
            let left = &caps[1];
            let right = &caps[2];

            for owner in [MaskCategory::Entity, MaskCategory::Table] {
                if let Some(left_mask) = masker.get_known_mask(left, &[owner]) {
                    let left_mask = left_mask.to_string();
                    let member = mask_member(masker, owner, right);
                    return format!("{}.{}", left_mask, member);
                }
            }

            match MaskCategory::parse_mask_id(left) {
                Some((owner @ (MaskCategory::Entity | MaskCategory::Table), _))
                    if masker.is_mask(left) =>
                {
                    let member = mask_member(masker, owner, right);
                    format!("{}.{}", left, member)
                }
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn mask_bare_parameters(masker: &mut ContextMasker, text: &str) -> String {
    if masker.known_parameters.is_empty() {
        return text.to_string();
    }
    let patterns = FormulaPatterns::instance();
    patterns
        .word
        .replace_all(text, |caps: &Captures| {
            let word = &caps[1];
            if masker.known_parameters.contains(word) && !masker.is_mask(word) {
                masker.register(word, MaskCategory::Parameter)
            } else {
                word.to_string()
            }
        })
        .into_owned()
}

fn is_reserved_literal(literal: &str) -> bool {
    let lower = literal.to_lowercase();
    RESERVED_LITERALS.contains(&lower.as_str())
}

fn looks_masked(masker: &ContextMasker, literal: &str) -> bool {
    masker.is_mask(literal) || literal.split('.').all(|segment| masker.is_mask(segment))
}

fn mask_literal(masker: &mut ContextMasker, literal: &str) -> Option<String> {
    if literal.is_empty() || is_reserved_literal(literal) || looks_masked(masker, literal) {
        return None;
    }

    let has_whitespace = literal.chars().any(char::is_whitespace);
    if literal.contains('(') || literal.contains(')') {
        return None;
    }
    if literal.contains(',') && !has_whitespace {
        return None;
    }

    if literal.contains('.') && literal.contains('_') && !has_whitespace {
        return Some(masker.register(literal, MaskCategory::Dictionary));
    }

    if let Some(existing) = masker.flat_mask(literal) {
        return Some(existing.to_string());
    }

    match masker.config.literal_policy {
        LiteralPolicy::Preserve => None,
        LiteralPolicy::MaskAsOther => Some(masker.register(literal, MaskCategory::Other)),
    }
}

fn mask_quoted_literals(masker: &mut ContextMasker, text: &str) -> String {
    let patterns = FormulaPatterns::instance();
    patterns
        .quoted
        .replace_all(text, |caps: &Captures| match mask_literal(masker, &caps[1]) {
            Some(mask) => format!("'{}'", mask),
            None => caps[0].to_string(),
        })
        .into_owned()
}
