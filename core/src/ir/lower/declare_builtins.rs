//! file: core/src/ir/lower/declare_builtins.rs
//! description: the table of `@builtin` functions the lowering accepts.
//!
//! Each entry records how many arguments the builtin takes and whether a
//! call to it has an observable effect when its result is discarded.
//!
use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, n: usize) -> bool {
        match self {
            Arity::Exact(k) => n == *k,
            Arity::AtLeast(k) => n >= *k,
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Exact(k) => write!(f, "{}", k),
            Arity::AtLeast(k) => write!(f, "at least {}", k),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinInfo {
    pub arity: Arity,
    pub has_side_effects: bool,
}

lazy_static! {
    static ref BUILTINS: FxHashMap<&'static str, BuiltinInfo> = {
        let effectful: &[(&str, Arity)] = &[
            ("import", Arity::Exact(1)),
            ("compileError", Arity::Exact(1)),
            ("compileLog", Arity::AtLeast(0)),
            ("setEvalBranchQuota", Arity::Exact(1)),
            ("setRuntimeSafety", Arity::Exact(1)),
            ("setCold", Arity::Exact(1)),
            ("panic", Arity::Exact(1)),
            ("breakpoint", Arity::Exact(0)),
            ("memcpy", Arity::Exact(3)),
            ("memset", Arity::Exact(3)),
            ("fence", Arity::Exact(1)),
            ("atomicStore", Arity::Exact(4)),
            ("cImport", Arity::Exact(1)),
        ];
        let pure: &[(&str, Arity)] = &[
            ("This", Arity::Exact(0)),
            ("TypeOf", Arity::AtLeast(1)),
            ("sizeOf", Arity::Exact(1)),
            ("alignOf", Arity::Exact(1)),
            ("as", Arity::Exact(2)),
            ("intCast", Arity::Exact(2)),
            ("truncate", Arity::Exact(2)),
            ("bitCast", Arity::Exact(2)),
            ("ptrCast", Arity::Exact(2)),
            ("floatCast", Arity::Exact(2)),
            ("intToFloat", Arity::Exact(2)),
            ("floatToInt", Arity::Exact(2)),
            ("field", Arity::Exact(2)),
            ("hasField", Arity::Exact(2)),
            ("hasDecl", Arity::Exact(2)),
            ("typeInfo", Arity::Exact(1)),
            ("typeName", Arity::Exact(1)),
            ("errorName", Arity::Exact(1)),
            ("tagName", Arity::Exact(1)),
            ("min", Arity::Exact(2)),
            ("max", Arity::Exact(2)),
            ("frame", Arity::Exact(0)),
            ("returnAddress", Arity::Exact(0)),
        ];
        let mut map = FxHashMap::default();
        for (name, arity) in effectful {
            map.insert(*name, BuiltinInfo { arity: *arity, has_side_effects: true });
        }
        for (name, arity) in pure {
            map.insert(*name, BuiltinInfo { arity: *arity, has_side_effects: false });
        }
        map
    };
}

/// Looks up a builtin by name, with or without the leading `@`.
pub fn builtin_info(name: &str) -> Option<BuiltinInfo> {
    BUILTINS.get(name.trim_start_matches('@')).copied()
}

/// Unknown builtins are treated as effectful; the lowering rejects them
/// before they reach a stream.
pub fn builtin_has_side_effects(name: &str) -> bool {
    builtin_info(name).is_none_or(|b| b.has_side_effects)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_at_sign() {
        assert_eq!(builtin_info("@sizeOf"), builtin_info("sizeOf"));
        assert!(builtin_info("@nope").is_none());
    }

    #[test]
    fn arity_checks() {
        let compile_log = builtin_info("compileLog").unwrap();
        assert!(compile_log.arity.accepts(0));
        assert!(compile_log.arity.accepts(5));
        let size_of = builtin_info("sizeOf").unwrap();
        assert!(!size_of.arity.accepts(2));
    }
}
