// ==============================================================================
// Marker Definitions
// ==============================================================================
//
// Arrays, pointers and by-ref types are structural in the host type system, so
// there is no generic definition a constraint could name for them. The catalog
// registers a small set of synthetic definitions to stand in:
//
//   ArrayMarker<TRank, T>   T[] / T[,] / ...   (TRank is a unary rank encoding)
//   PointerMarker<T>        T*
//   ByRefMarker<T>          T&
//   ValueTypeMarker         "any value type"
//   ReferenceTypeMarker     "any reference type"
//
// Ranks are encoded as RankZero wrapped in one RankSucc per dimension, so a
// rank is itself a closed type and can be matched like any other argument.

use la_arena::Arena;

use crate::catalog::{DefId, GenericParam, InstantiateError, ParamBound, TypeDef};
use crate::{Catalog, Ty};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Array,
    Pointer,
    ByRef,
    /// Matches a candidate that is a value type.
    ValueType,
    /// Matches a candidate that is a reference type.
    ReferenceType,
}

#[derive(Debug, Clone)]
pub(crate) struct MarkerDefs {
    rank_zero: DefId,
    rank_succ: DefId,
    array: DefId,
    pointer: DefId,
    by_ref: DefId,
    value_type: DefId,
    reference_type: DefId,
}

impl MarkerDefs {
    pub(crate) fn register(defs: &mut Arena<TypeDef>) -> Self {
        let rank = defs.alloc(TypeDef::interface("IRank"));
        let rank_bound = || ParamBound::Implements(Ty::named(rank));

        let rank_zero = defs.alloc(TypeDef::value("RankZero").implements(Ty::named(rank)));
        let rank_succ = defs.alloc(
            TypeDef::value("RankSucc`1")
                .param(GenericParam::new("N").bound(rank_bound()))
                .implements(Ty::named(rank)),
        );
        let array = defs.alloc(
            TypeDef::class("ArrayMarker`2")
                .param(GenericParam::new("TRank").bound(rank_bound()))
                .param(GenericParam::new("T")),
        );
        let pointer = defs.alloc(TypeDef::class("PointerMarker`1").param(GenericParam::new("T")));
        let by_ref = defs.alloc(TypeDef::class("ByRefMarker`1").param(GenericParam::new("T")));
        let value_type = defs.alloc(TypeDef::class("ValueTypeMarker"));
        let reference_type = defs.alloc(TypeDef::class("ReferenceTypeMarker"));

        Self {
            rank_zero,
            rank_succ,
            array,
            pointer,
            by_ref,
            value_type,
            reference_type,
        }
    }
}

impl Catalog {
    /// The synthetic definition standing in for `marker`.
    pub fn marker(&self, marker: Marker) -> DefId {
        match marker {
            Marker::Array => self.markers.array,
            Marker::Pointer => self.markers.pointer,
            Marker::ByRef => self.markers.by_ref,
            Marker::ValueType => self.markers.value_type,
            Marker::ReferenceType => self.markers.reference_type,
        }
    }

    pub fn marker_of(&self, def: DefId) -> Option<Marker> {
        let markers = &self.markers;
        match def {
            _ if def == markers.array => Some(Marker::Array),
            _ if def == markers.pointer => Some(Marker::Pointer),
            _ if def == markers.by_ref => Some(Marker::ByRef),
            _ if def == markers.value_type => Some(Marker::ValueType),
            _ if def == markers.reference_type => Some(Marker::ReferenceType),
            _ => None,
        }
    }

    pub fn encode_rank(&self, rank: u32) -> Ty {
        (0..rank).fold(Ty::named(self.markers.rank_zero), |inner, _| {
            Ty::generic(self.markers.rank_succ, [inner])
        })
    }

    /// Count the `RankSucc` layers around `RankZero`. `None` if `ty` is not a
    /// rank encoding.
    pub fn decode_rank(&self, ty: &Ty) -> Option<u32> {
        let mut rank = 0;
        let mut current = ty;
        loop {
            match current {
                Ty::Named { def, args } if *def == self.markers.rank_zero && args.is_empty() => {
                    return Some(rank);
                }
                Ty::Named { def, args } if *def == self.markers.rank_succ && args.len() == 1 => {
                    rank += 1;
                    current = &args[0];
                }
                _ => return None,
            }
        }
    }

    /// The generic definition a type is an instance of, with structural types
    /// answered by their marker.
    pub fn definition_of(&self, ty: &Ty) -> Option<DefId> {
        match ty {
            Ty::Named { def, .. } => Some(*def),
            Ty::Array { .. } => Some(self.markers.array),
            Ty::Pointer(_) => Some(self.markers.pointer),
            Ty::ByRef(_) => Some(self.markers.by_ref),
            Ty::Param(_) => None,
        }
    }

    /// The arguments of `ty` as an instance of [`Catalog::definition_of`]. An
    /// array contributes its encoded rank followed by the element type.
    pub fn instantiation_args(&self, ty: &Ty) -> Vec<Ty> {
        match ty {
            Ty::Named { args, .. } => args.clone(),
            Ty::Array { rank, elem } => vec![self.encode_rank(*rank), (**elem).clone()],
            Ty::Pointer(elem) | Ty::ByRef(elem) => vec![(**elem).clone()],
            Ty::Param(_) => Vec::new(),
        }
    }

    /// Rewrite a structural type as an instance of its marker definition.
    /// Nominal types are returned unchanged.
    pub fn encode_marker(&self, ty: &Ty) -> Ty {
        match (ty, self.definition_of(ty)) {
            (Ty::Array { .. } | Ty::Pointer(_) | Ty::ByRef(_), Some(def)) => {
                Ty::generic(def, self.instantiation_args(ty))
            }
            _ => ty.clone(),
        }
    }

    /// Inverse of [`Catalog::encode_marker`].
    pub fn decode_marker(&self, ty: &Ty) -> Result<Ty, InstantiateError> {
        match ty {
            Ty::Named { def, args } => match self.marker_of(*def) {
                Some(Marker::Array | Marker::Pointer | Marker::ByRef) => {
                    self.instantiate(*def, args.clone())
                }
                _ => Ok(ty.clone()),
            },
            _ => Ok(ty.clone()),
        }
    }
}
