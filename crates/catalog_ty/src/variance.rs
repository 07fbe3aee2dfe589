use std::fmt;

/// Which type relationships a constraint (or a declared generic parameter)
/// accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Variance {
    /// Only the exact type.
    #[default]
    Invariant,
    /// The type and its descendants.
    Covariant,
    /// The type and its ancestors.
    Contravariant,
    /// Ancestors and descendants alike.
    Ambivariant,
}

impl Variance {
    /// Effective variance of a constraint with variance `inner` nested inside
    /// a position whose effective variance is `self`.
    ///
    /// The table is intentionally not symmetric: a contravariant position
    /// turns a covariant inner constraint contravariant, while a covariant
    /// position leaves a contravariant inner constraint as it is.
    pub fn combine(self, inner: Variance) -> Variance {
        match (self, inner) {
            (Variance::Invariant, _) => Variance::Invariant,

            (Variance::Covariant, Variance::Ambivariant) => Variance::Covariant,
            (Variance::Covariant, inner) => inner,

            (Variance::Contravariant, Variance::Invariant) => Variance::Invariant,
            (Variance::Contravariant, Variance::Covariant) => Variance::Contravariant,
            (Variance::Contravariant, Variance::Contravariant) => Variance::Covariant,
            (Variance::Contravariant, Variance::Ambivariant) => Variance::Contravariant,

            (Variance::Ambivariant, inner) => inner,
        }
    }
}

impl fmt::Display for Variance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Variance::Invariant => "invariant",
            Variance::Covariant => "covariant",
            Variance::Contravariant => "contravariant",
            Variance::Ambivariant => "ambivariant",
        };
        f.write_str(name)
    }
}
