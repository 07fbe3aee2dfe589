// ==============================================================================
// Type Catalog
// ==============================================================================
//
// The nominal type universe the resolver works against. Definitions live in an
// arena and are referred to by `DefId`; generic definitions record their
// parameters (with declared variance and bounds) so `instantiate` can reject
// argument lists the host type system would refuse.
//
// A fresh catalog always contains the marker definitions (see markers.rs).

use la_arena::{Arena, Idx};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use thiserror::Error;

use crate::markers::{Marker, MarkerDefs};
use crate::{Ty, Variance};

pub type DefId = Idx<TypeDef>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
    /// A value type.
    Struct,
}

/// A requirement a generic argument has to meet for the instantiation to be
/// valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamBound {
    ReferenceType,
    ValueType,
    /// The argument must be assignable to this type. May mention the
    /// definition's parameters through `Ty::Param`.
    Implements(Ty),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericParam {
    pub name: SmolStr,
    pub variance: Variance,
    pub bounds: Vec<ParamBound>,
}

impl GenericParam {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            variance: Variance::Invariant,
            bounds: Vec::new(),
        }
    }

    pub fn covariant(self) -> Self {
        self.with_variance(Variance::Covariant)
    }

    pub fn contravariant(self) -> Self {
        self.with_variance(Variance::Contravariant)
    }

    pub fn with_variance(mut self, variance: Variance) -> Self {
        self.variance = variance;
        self
    }

    pub fn bound(mut self, bound: ParamBound) -> Self {
        self.bounds.push(bound);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub name: SmolStr,
    pub kind: TypeKind,
    pub params: Vec<GenericParam>,
    /// Base type, possibly mentioning `Ty::Param`s of this definition.
    pub base: Option<Ty>,
    /// Declared interfaces, possibly mentioning `Ty::Param`s of this definition.
    pub interfaces: Vec<Ty>,
}

impl TypeDef {
    pub fn new(name: impl Into<SmolStr>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            params: Vec::new(),
            base: None,
            interfaces: Vec::new(),
        }
    }

    pub fn class(name: impl Into<SmolStr>) -> Self {
        Self::new(name, TypeKind::Class)
    }

    pub fn interface(name: impl Into<SmolStr>) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    pub fn value(name: impl Into<SmolStr>) -> Self {
        Self::new(name, TypeKind::Struct)
    }

    pub fn param(mut self, param: GenericParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn base(mut self, base: Ty) -> Self {
        self.base = Some(base);
        self
    }

    pub fn implements(mut self, interface: Ty) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn is_generic(&self) -> bool {
        !self.params.is_empty()
    }

    /// Position of the generic parameter called `name`.
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|param| param.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstantiateError {
    #[error("`{name}` takes {expected} type arguments but {found} were supplied")]
    Arity {
        name: SmolStr,
        expected: usize,
        found: usize,
    },

    #[error("type argument `{arg}` does not satisfy the bounds of `{param}` on `{name}`")]
    Bound {
        name: SmolStr,
        param: SmolStr,
        arg: String,
    },

    #[error("`{0}` is not a rank encoding of at least one dimension")]
    MalformedRank(String),

    #[error("type argument {index} of `{name}` is not closed")]
    Open { name: SmolStr, index: usize },
}

#[derive(Debug, Clone)]
pub struct Catalog {
    defs: Arena<TypeDef>,
    by_name: FxHashMap<SmolStr, DefId>,
    pub(crate) markers: MarkerDefs,

    /// Base type of every array type.
    pub(crate) array_base: Option<Ty>,
    /// Interfaces of single-dimensional arrays; `Ty::Param(0)` is the element.
    pub(crate) array_interfaces: Vec<Ty>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        let mut defs = Arena::default();
        let markers = MarkerDefs::register(&mut defs);

        let mut catalog = Self {
            defs,
            by_name: FxHashMap::default(),
            markers,
            array_base: None,
            array_interfaces: Vec::new(),
        };

        let names: Vec<(SmolStr, DefId)> = catalog
            .defs
            .iter()
            .map(|(id, def)| (def.name.clone(), id))
            .collect();
        catalog.by_name.extend(names);
        catalog
    }

    /// Register a definition. A later definition with the same name shadows
    /// the earlier one in [`Catalog::lookup`].
    pub fn add(&mut self, def: TypeDef) -> DefId {
        let name = def.name.clone();
        let id = self.defs.alloc(def);
        self.by_name.insert(name, id);
        id
    }

    pub fn def(&self, id: DefId) -> &TypeDef {
        &self.defs[id]
    }

    /// Mutable access, for catalogs whose definitions refer to each other and
    /// so have to be registered before their bases are known.
    pub fn def_mut(&mut self, id: DefId) -> &mut TypeDef {
        &mut self.defs[id]
    }

    pub fn lookup(&self, name: &str) -> Option<DefId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: DefId) -> &SmolStr {
        &self.defs[id].name
    }

    pub fn defs(&self) -> impl Iterator<Item = (DefId, &TypeDef)> {
        self.defs.iter()
    }

    /// Declare what every array type derives from. `interfaces` apply to
    /// single-dimensional arrays only and use `Ty::Param(0)` for the element.
    pub fn set_array_ancestry(&mut self, base: Option<Ty>, interfaces: Vec<Ty>) {
        self.array_base = base;
        self.array_interfaces = interfaces;
    }

    /// The open form of a definition: the definition applied to its own
    /// parameters.
    pub fn open_form(&self, def: DefId) -> Ty {
        let arity = self.defs[def].arity() as u32;
        Ty::generic(def, (0..arity).map(Ty::Param))
    }

    /// Build a closed type from a definition and its arguments.
    ///
    /// Marker definitions produce the structural type they stand for: the
    /// array marker decodes its rank argument back into an integer rank.
    /// Pointer and by-ref arguments to ordinary generic definitions are stored
    /// in their marker form.
    pub fn instantiate(&self, def: DefId, args: Vec<Ty>) -> Result<Ty, InstantiateError> {
        let data = &self.defs[def];
        if args.len() != data.arity() {
            return Err(InstantiateError::Arity {
                name: data.name.clone(),
                expected: data.arity(),
                found: args.len(),
            });
        }
        if let Some(index) = args.iter().position(|arg| !arg.is_closed()) {
            return Err(InstantiateError::Open {
                name: data.name.clone(),
                index,
            });
        }

        match (self.marker_of(def), args.as_slice()) {
            (Some(Marker::Array), [rank, elem]) => {
                let decoded = self
                    .decode_rank(rank)
                    .filter(|rank| *rank > 0)
                    .ok_or_else(|| InstantiateError::MalformedRank(self.display(rank).to_string()))?;
                return Ok(Ty::array(elem.clone(), decoded));
            }
            (Some(Marker::Pointer), [elem]) => return Ok(Ty::pointer(elem.clone())),
            (Some(Marker::ByRef), [elem]) => return Ok(Ty::by_ref(elem.clone())),
            _ => {}
        }

        let args: Vec<Ty> = args
            .into_iter()
            .map(|arg| match arg {
                Ty::Pointer(_) | Ty::ByRef(_) => self.encode_marker(&arg),
                arg => arg,
            })
            .collect();

        for (param, arg) in data.params.iter().zip(&args) {
            if !self.satisfies(param, arg, &args) {
                log::trace!(
                    "`{}` rejected for `{}` of `{}`",
                    self.display(arg),
                    param.name,
                    data.name
                );
                return Err(InstantiateError::Bound {
                    name: data.name.clone(),
                    param: param.name.clone(),
                    arg: self.display(arg).to_string(),
                });
            }
        }

        Ok(Ty::Named { def, args })
    }

    fn satisfies(&self, param: &GenericParam, arg: &Ty, args: &[Ty]) -> bool {
        param.bounds.iter().all(|bound| match bound {
            ParamBound::ReferenceType => self.is_reference_type(arg),
            ParamBound::ValueType => self.is_value_type(arg),
            ParamBound::Implements(required) => self.is_assignable(&required.subst(args), arg),
        })
    }
}
