// ==============================================================================
// Constraint Model
// ==============================================================================
//
// A constraint tree describes what a candidate type has to look like for a
// pattern slot (or a nested type argument) to accept it. Trees are built once
// and never mutated; the unifier only reads them.

use std::fmt;

use catalog_ty::{base_name, Catalog, DefId, Marker, Ty, Variance};
use derive_more::Debug;
use smol_str::SmolStr;

use crate::ResolveError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// Matches anything and binds nothing.
    #[debug("_")]
    Wildcard,

    /// Binds `name` on first occurrence; later occurrences re-check the bound
    /// type against the new site with `variance`.
    #[debug("Param({name}, {variance})")]
    Param { name: SmolStr, variance: Variance },

    /// The candidate must relate to an instance of `target` according to
    /// `variance`, with one sub-constraint per generic parameter of `target`.
    #[debug("Type({target:?}, {variance}, {args:?})")]
    Type {
        target: DefId,
        variance: Variance,
        args: Vec<Constraint>,
    },

    /// Succeeds when the wrapped constraints have no solution for the same
    /// candidate. Never binds.
    #[debug("Not({_0:?})")]
    Not(Vec<Constraint>),
}

impl Constraint {
    pub fn param(name: impl Into<SmolStr>) -> Self {
        Self::param_with(name, Variance::Invariant)
    }

    pub fn param_with(name: impl Into<SmolStr>, variance: Variance) -> Self {
        Constraint::Param {
            name: name.into(),
            variance,
        }
    }

    /// A non-generic type, matched invariantly unless a variance is applied.
    pub fn named(target: DefId) -> Self {
        Self::definition(target, [])
    }

    pub fn definition(target: DefId, args: impl IntoIterator<Item = Constraint>) -> Self {
        Constraint::Type {
            target,
            variance: Variance::Invariant,
            args: args.into_iter().collect(),
        }
    }

    pub fn marker(
        catalog: &Catalog,
        marker: Marker,
        args: impl IntoIterator<Item = Constraint>,
    ) -> Self {
        Self::definition(catalog.marker(marker), args)
    }

    /// A single-dimensional array whose element satisfies `elem`.
    pub fn array(catalog: &Catalog, elem: Constraint) -> Self {
        Self::marker(catalog, Marker::Array, [Self::rank(catalog, 1), elem])
    }

    /// Exactly the encoded rank `rank`.
    pub fn rank(catalog: &Catalog, rank: u32) -> Self {
        Self::from_type(catalog, &catalog.encode_rank(rank))
    }

    /// Expand a type into a constraint tree. Generic arguments carry the
    /// declared variance of the parameter they fill; structural types expand
    /// through their marker with invariant arguments. `Ty::Param` becomes a
    /// wildcard.
    pub fn from_type(catalog: &Catalog, ty: &Ty) -> Self {
        match ty {
            Ty::Param(_) => Constraint::Wildcard,
            Ty::Named { def, args } => {
                let params = &catalog.def(*def).params;
                let args = args.iter().enumerate().map(|(i, arg)| {
                    let variance = params
                        .get(i)
                        .map_or(Variance::Invariant, |param| param.variance);
                    Self::from_type(catalog, arg).with_variance(variance)
                });
                Self::definition(*def, args)
            }
            Ty::Array { rank, elem } => Self::marker(
                catalog,
                Marker::Array,
                [Self::rank(catalog, *rank), Self::from_type(catalog, elem)],
            ),
            Ty::Pointer(elem) => {
                Self::marker(catalog, Marker::Pointer, [Self::from_type(catalog, elem)])
            }
            Ty::ByRef(elem) => {
                Self::marker(catalog, Marker::ByRef, [Self::from_type(catalog, elem)])
            }
        }
    }

    pub fn not(inner: impl IntoIterator<Item = Constraint>) -> Self {
        Constraint::Not(inner.into_iter().collect())
    }

    /// Replace the variance of a parameter or type constraint. Wildcards and
    /// negations have none and are returned unchanged.
    pub fn with_variance(self, new: Variance) -> Self {
        match self {
            Constraint::Param { name, .. } => Constraint::Param {
                name,
                variance: new,
            },
            Constraint::Type { target, args, .. } => Constraint::Type {
                target,
                variance: new,
                args,
            },
            other => other,
        }
    }

    pub fn covariant(self) -> Self {
        self.with_variance(Variance::Covariant)
    }

    pub fn contravariant(self) -> Self {
        self.with_variance(Variance::Contravariant)
    }

    pub fn ambivariant(self) -> Self {
        self.with_variance(Variance::Ambivariant)
    }

    pub fn display<'a>(&'a self, catalog: &'a Catalog) -> ConstraintDisplay<'a> {
        ConstraintDisplay {
            catalog,
            constraint: self,
        }
    }

    /// Check the tree for shapes that can never be evaluated in `position`.
    pub(crate) fn validate(&self, catalog: &Catalog, position: Position) -> Result<(), ResolveError> {
        let unsupported = || ResolveError::UnsupportedConstraint {
            constraint: self.display(catalog).to_string(),
            position,
        };

        match self {
            Constraint::Wildcard if position == Position::Directive => Err(unsupported()),
            Constraint::Wildcard | Constraint::Param { .. } => Ok(()),
            Constraint::Not(inner) => {
                if position != Position::Slot {
                    return Err(unsupported());
                }
                inner
                    .iter()
                    .try_for_each(|constraint| constraint.validate(catalog, Position::Slot))
            }
            Constraint::Type { target, args, .. } => {
                if position == Position::Directive
                    && matches!(
                        catalog.marker_of(*target),
                        Some(Marker::ValueType | Marker::ReferenceType)
                    )
                {
                    return Err(unsupported());
                }
                check_arity(catalog, *target, args.len())?;
                let nested = match position {
                    Position::Directive => Position::Directive,
                    Position::Slot | Position::Argument => Position::Argument,
                };
                args.iter()
                    .try_for_each(|arg| arg.validate(catalog, nested))
            }
        }
    }
}

pub(crate) fn check_arity(catalog: &Catalog, target: DefId, found: usize) -> Result<(), ResolveError> {
    let def = catalog.def(target);
    if def.arity() != found {
        return Err(ResolveError::ArityMismatch {
            name: def.name.clone(),
            expected: def.arity(),
            found,
        });
    }
    Ok(())
}

/// The constraints one candidate is matched against, evaluated as a
/// conjunction from left to right.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Slot {
    pub constraints: Vec<Constraint>,
    /// Once a full match went through this slot, skip the slot's remaining
    /// alternatives.
    pub definitive: bool,
}

impl Slot {
    pub fn new(constraints: impl IntoIterator<Item = Constraint>) -> Self {
        Self {
            constraints: constraints.into_iter().collect(),
            definitive: false,
        }
    }

    pub fn definitive(mut self) -> Self {
        self.definitive = true;
        self
    }
}

impl From<Constraint> for Slot {
    fn from(constraint: Constraint) -> Self {
        Slot::new([constraint])
    }
}

/// Where a constraint appears, for validation and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    Slot,
    Argument,
    Directive,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Position::Slot => "slot",
            Position::Argument => "type argument",
            Position::Directive => "re-specialization directive",
        })
    }
}

pub struct ConstraintDisplay<'a> {
    catalog: &'a Catalog,
    constraint: &'a Constraint,
}

fn sigil(variance: Variance) -> &'static str {
    match variance {
        Variance::Invariant => "",
        Variance::Covariant => "+",
        Variance::Contravariant => "-",
        Variance::Ambivariant => "~",
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, catalog: &Catalog, items: &[Constraint]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item.display(catalog))?;
    }
    Ok(())
}

impl fmt::Display for ConstraintDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.constraint {
            Constraint::Wildcard => f.write_str("_"),
            Constraint::Param { name, variance } => write!(f, "{}{name}", sigil(*variance)),
            Constraint::Type {
                target,
                variance,
                args,
            } => {
                write!(
                    f,
                    "{}{}",
                    sigil(*variance),
                    base_name(self.catalog.name(*target))
                )?;
                if args.is_empty() {
                    return Ok(());
                }
                f.write_str("<")?;
                write_list(f, self.catalog, args)?;
                f.write_str(">")
            }
            Constraint::Not(inner) => {
                f.write_str("!(")?;
                write_list(f, self.catalog, inner)?;
                f.write_str(")")
            }
        }
    }
}
