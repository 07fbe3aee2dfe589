use rustc_hash::FxHashSet;

use crate::catalog::{DefId, TypeKind};
use crate::{Catalog, Ty, Variance};

impl Catalog {
    /// Every type `ty` is assignable to through inheritance, starting with
    /// `ty` itself.
    ///
    /// Order: `ty`, then the interfaces reachable from `ty` and its bases
    /// (each declared interface followed by the interfaces it extends), then
    /// the base chain from the nearest base outwards.
    ///
    /// Each type is listed once, at its first position. The seen set is also
    /// what stops the interface walk on a cyclic catalog, so callers that
    /// collect sites need no second pass for these.
    pub fn ancestors(&self, ty: &Ty) -> Vec<Ty> {
        let chain = self.base_chain(ty);

        let mut out = vec![ty.clone()];
        let mut seen = FxHashSet::default();
        seen.insert(ty.clone());

        for link in &chain {
            for interface in self.direct_interfaces(link) {
                self.push_interface(interface, &mut out, &mut seen);
            }
        }

        for base in chain.into_iter().skip(1) {
            if seen.insert(base.clone()) {
                out.push(base);
            }
        }
        out
    }

    /// Ancestors of a definition's open form; generic parameters appear as
    /// `Ty::Param`.
    pub fn definition_ancestors(&self, def: DefId) -> Vec<Ty> {
        self.ancestors(&self.open_form(def))
    }

    pub fn is_value_type(&self, ty: &Ty) -> bool {
        match ty {
            Ty::Named { def, .. } => self.def(*def).kind == TypeKind::Struct,
            _ => false,
        }
    }

    pub fn is_reference_type(&self, ty: &Ty) -> bool {
        match ty {
            Ty::Named { def, .. } => matches!(
                self.def(*def).kind,
                TypeKind::Class | TypeKind::Interface
            ),
            Ty::Array { .. } => true,
            Ty::Pointer(_) | Ty::ByRef(_) | Ty::Param(_) => false,
        }
    }

    /// Whether a value of type `from` can be used where `to` is expected.
    ///
    /// Covers identity, inheritance, variant generic interfaces (only between
    /// reference type arguments) and array covariance over reference elements.
    pub fn is_assignable(&self, to: &Ty, from: &Ty) -> bool {
        if to == from {
            return true;
        }

        if let (
            Ty::Array {
                rank: to_rank,
                elem: to_elem,
            },
            Ty::Array {
                rank: from_rank,
                elem: from_elem,
            },
        ) = (to, from)
        {
            if to_rank == from_rank
                && self.is_reference_type(from_elem)
                && self.is_assignable(to_elem, from_elem)
            {
                return true;
            }
        }

        self.ancestors(from)
            .iter()
            .any(|ancestor| ancestor == to || self.variant_convertible(to, ancestor))
    }

    fn variant_convertible(&self, to: &Ty, from: &Ty) -> bool {
        let (
            Ty::Named {
                def: to_def,
                args: to_args,
            },
            Ty::Named {
                def: from_def,
                args: from_args,
            },
        ) = (to, from)
        else {
            return false;
        };
        if to_def != from_def || to_args.len() != from_args.len() || to_args.is_empty() {
            return false;
        }

        let params = &self.def(*to_def).params;
        params
            .iter()
            .zip(to_args.iter().zip(from_args))
            .all(|(param, (to_arg, from_arg))| {
                if to_arg == from_arg {
                    return true;
                }
                let references =
                    self.is_reference_type(to_arg) && self.is_reference_type(from_arg);
                match param.variance {
                    Variance::Invariant => false,
                    Variance::Covariant => references && self.is_assignable(to_arg, from_arg),
                    Variance::Contravariant => references && self.is_assignable(from_arg, to_arg),
                    Variance::Ambivariant => {
                        references
                            && (self.is_assignable(to_arg, from_arg)
                                || self.is_assignable(from_arg, to_arg))
                    }
                }
            })
    }

    fn base_of(&self, ty: &Ty) -> Option<Ty> {
        match ty {
            Ty::Named { def, args } => self.def(*def).base.as_ref().map(|base| base.subst(args)),
            Ty::Array { .. } => self.array_base.clone(),
            Ty::Pointer(_) | Ty::ByRef(_) | Ty::Param(_) => None,
        }
    }

    /// `ty` followed by its bases. Stops at the first repeat so a malformed
    /// catalog cannot loop.
    fn base_chain(&self, ty: &Ty) -> Vec<Ty> {
        let mut chain = vec![ty.clone()];
        let mut seen = FxHashSet::default();
        seen.insert(ty.clone());

        let mut current = self.base_of(ty);
        while let Some(base) = current {
            if !seen.insert(base.clone()) {
                log::warn!("cyclic base chain through `{}`", self.display(&base));
                break;
            }
            current = self.base_of(&base);
            chain.push(base);
        }
        chain
    }

    fn direct_interfaces(&self, ty: &Ty) -> Vec<Ty> {
        match ty {
            Ty::Named { def, args } => self
                .def(*def)
                .interfaces
                .iter()
                .map(|interface| interface.subst(args))
                .collect(),
            Ty::Array { rank: 1, elem } => self
                .array_interfaces
                .iter()
                .map(|interface| interface.subst(std::slice::from_ref(&**elem)))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn push_interface(&self, interface: Ty, out: &mut Vec<Ty>, seen: &mut FxHashSet<Ty>) {
        if !seen.insert(interface.clone()) {
            return;
        }
        let inherited = self.direct_interfaces(&interface);
        out.push(interface);
        for inner in inherited {
            self.push_interface(inner, out, seen);
        }
    }
}
