mod catalog;
mod display;
pub mod fixture;
mod hierarchy;
mod markers;
mod variance;

#[cfg(feature = "proptest_support")]
pub mod arbitrary;


pub use catalog::{Catalog, DefId, GenericParam, InstantiateError, ParamBound, TypeDef, TypeKind};
pub use display::{base_name, TyDisplay};
pub use markers::Marker;
pub use variance::Variance;

use derive_more::Debug;

/// A type as the host type system sees it.
///
/// Candidates handed to the resolver are always closed. `Param` only shows up
/// inside definitions (bases, interfaces, bounds), where it refers to the
/// enclosing definition's generic parameter by position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    #[debug("Param({_0})")]
    Param(u32),

    #[debug("Named({def:?}, {args:?})")]
    Named { def: DefId, args: Vec<Ty> },

    #[debug("Array({elem:?}, rank {rank})")]
    Array { rank: u32, elem: Box<Ty> },

    #[debug("Pointer({_0:?})")]
    Pointer(Box<Ty>),

    #[debug("ByRef({_0:?})")]
    ByRef(Box<Ty>),
}

impl Ty {
    /// A non-generic nominal type.
    pub fn named(def: DefId) -> Self {
        Ty::Named {
            def,
            args: Vec::new(),
        }
    }

    /// A nominal type applied to arguments. No arity or bound checking happens
    /// here; use [`Catalog::instantiate`] for that.
    pub fn generic(def: DefId, args: impl IntoIterator<Item = Ty>) -> Self {
        Ty::Named {
            def,
            args: args.into_iter().collect(),
        }
    }

    pub fn array(elem: Ty, rank: u32) -> Self {
        Ty::Array {
            rank,
            elem: Box::new(elem),
        }
    }

    pub fn pointer(elem: Ty) -> Self {
        Ty::Pointer(Box::new(elem))
    }

    pub fn by_ref(elem: Ty) -> Self {
        Ty::ByRef(Box::new(elem))
    }

    /// The nominal definition, if this is a `Named` type.
    pub fn def(&self) -> Option<DefId> {
        match self {
            Ty::Named { def, .. } => Some(*def),
            _ => None,
        }
    }

    /// The nominal arguments. Structural forms have none here; see
    /// [`Catalog::instantiation_args`] for their marker view.
    pub fn args(&self) -> &[Ty] {
        match self {
            Ty::Named { args, .. } => args,
            _ => &[],
        }
    }

    pub fn is_closed(&self) -> bool {
        match self {
            Ty::Param(_) => false,
            Ty::Named { args, .. } => args.iter().all(Ty::is_closed),
            Ty::Array { elem, .. } | Ty::Pointer(elem) | Ty::ByRef(elem) => elem.is_closed(),
        }
    }

    /// Replace every `Param(i)` with `args[i]`. Parameters without a matching
    /// argument are left in place.
    pub fn subst(&self, args: &[Ty]) -> Ty {
        match self {
            Ty::Param(index) => args
                .get(*index as usize)
                .cloned()
                .unwrap_or(Ty::Param(*index)),
            Ty::Named { def, args: inner } => Ty::Named {
                def: *def,
                args: inner.iter().map(|arg| arg.subst(args)).collect(),
            },
            Ty::Array { rank, elem } => Ty::array(elem.subst(args), *rank),
            Ty::Pointer(elem) => Ty::pointer(elem.subst(args)),
            Ty::ByRef(elem) => Ty::by_ref(elem.subst(args)),
        }
    }
}
