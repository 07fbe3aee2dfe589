use std::fmt;

use catalog_ty::{Catalog, DefId, Ty};

use crate::constraint::{Constraint, Position, Slot};
use crate::producer::{Arg, InvokeError, Produced};
use crate::ResolveError;

/// What a pattern instantiates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// A generic definition, or a plain non-generic type.
    Definition(DefId),
    /// A closed instantiation. Its arguments are bound up front.
    Closed(Ty),
}

/// Which part of the enclosing pattern list a nested resolution may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    Any,
    /// Only patterns after the one being built.
    Following,
    /// Only patterns before the one being built.
    Preceding,
}

/// How the parameter receives the nested results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ParamShape {
    /// One value per combination.
    #[default]
    Single,
    /// The whole lazy sequence as one argument.
    Sequence,
}

/// Re-specialize a producer parameter against a window of the same pattern
/// list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Directive {
    /// Candidate types for the nested resolution. Parameter references are
    /// looked up in the bindings of the pattern being built.
    pub types: Vec<Constraint>,
    pub direction: Direction,
    /// The narrowed window also bounds resolutions nested further inside.
    pub global: bool,
    /// Stop trying values for this parameter once one led to a complete
    /// argument list.
    pub definitive: bool,
    pub shape: ParamShape,
}

impl Directive {
    pub fn new(types: impl IntoIterator<Item = Constraint>) -> Self {
        Self {
            types: types.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn following(mut self) -> Self {
        self.direction = Direction::Following;
        self
    }

    pub fn preceding(mut self) -> Self {
        self.direction = Direction::Preceding;
        self
    }

    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }

    pub fn definitive(mut self) -> Self {
        self.definitive = true;
        self
    }

    pub fn sequence(mut self) -> Self {
        self.shape = ParamShape::Sequence;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamDecl {
    /// Nothing can fill it; the producer is never invoked.
    Required,
    /// Filled with [`Arg::Default`].
    Optional,
    Specialize {
        directive: Directive,
        has_default: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProducerKind {
    Factory,
    Constructor,
}

type InvokeFn<V> = dyn Fn(&Ty, &[Arg<'_, V>]) -> Result<Produced<V>, InvokeError>;

fn boxed<V>(
    invoke: impl Fn(&Ty, &[Arg<'_, V>]) -> Result<Produced<V>, InvokeError> + 'static,
) -> Box<InvokeFn<V>> {
    Box::new(invoke)
}

/// A factory operation or constructor of a pattern. `invoke` receives the
/// closed type and one argument per declared parameter.
pub struct Producer<V> {
    pub kind: ProducerKind,
    pub params: Vec<ParamDecl>,
    pub definitive: bool,
    invoke: Box<InvokeFn<V>>,
}

impl<V: 'static> Producer<V> {
    pub fn factory(
        invoke: impl Fn(&Ty, &[Arg<'_, V>]) -> Result<Produced<V>, InvokeError> + 'static,
    ) -> Self {
        Self {
            kind: ProducerKind::Factory,
            params: Vec::new(),
            definitive: false,
            invoke: boxed(invoke),
        }
    }

    pub fn constructor(
        invoke: impl Fn(&Ty, &[Arg<'_, V>]) -> Result<V, InvokeError> + 'static,
    ) -> Self {
        Self {
            kind: ProducerKind::Constructor,
            params: Vec::new(),
            definitive: false,
            invoke: boxed(move |ty, args| invoke(ty, args).map(Produced::One)),
        }
    }
}

impl<V> Producer<V> {
    pub fn param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    pub fn required(self) -> Self {
        self.param(ParamDecl::Required)
    }

    pub fn optional(self) -> Self {
        self.param(ParamDecl::Optional)
    }

    pub fn specialize(self, directive: Directive) -> Self {
        self.param(ParamDecl::Specialize {
            directive,
            has_default: false,
        })
    }

    pub fn specialize_or_default(self, directive: Directive) -> Self {
        self.param(ParamDecl::Specialize {
            directive,
            has_default: true,
        })
    }

    pub fn definitive(mut self) -> Self {
        self.definitive = true;
        self
    }

    pub(crate) fn invoke(&self, ty: &Ty, args: &[Arg<'_, V>]) -> Result<Produced<V>, InvokeError> {
        (self.invoke)(ty, args)
    }
}

impl<V> fmt::Debug for Producer<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("kind", &self.kind)
            .field("params", &self.params)
            .field("definitive", &self.definitive)
            .finish_non_exhaustive()
    }
}

/// A template together with the constraints on its type arguments and the
/// producers that build values of the closed type.
#[derive(Debug)]
pub struct Pattern<V> {
    pub template: TypeRef,
    pub slots: Vec<Slot>,
    pub producers: Vec<Producer<V>>,
    /// Once this pattern produced a value, later patterns are not tried.
    pub definitive: bool,
}

impl<V> Pattern<V> {
    pub fn new(template: TypeRef) -> Self {
        Self {
            template,
            slots: Vec::new(),
            producers: Vec::new(),
            definitive: false,
        }
    }

    pub fn definition(def: DefId) -> Self {
        Self::new(TypeRef::Definition(def))
    }

    pub fn closed(ty: Ty) -> Self {
        Self::new(TypeRef::Closed(ty))
    }

    pub fn slot(mut self, slot: impl Into<Slot>) -> Self {
        self.slots.push(slot.into());
        self
    }

    pub fn producer(mut self, producer: Producer<V>) -> Self {
        self.producers.push(producer);
        self
    }

    pub fn definitive(mut self) -> Self {
        self.definitive = true;
        self
    }

    /// Factories first, then constructors, each in declaration order.
    pub(crate) fn ordered_producers(&self) -> impl Iterator<Item = &Producer<V>> {
        let of = |kind: ProducerKind| self.producers.iter().filter(move |p| p.kind == kind);
        of(ProducerKind::Factory).chain(of(ProducerKind::Constructor))
    }

    pub(crate) fn validate(&self, catalog: &Catalog) -> Result<(), ResolveError> {
        if let TypeRef::Closed(ty) = &self.template {
            if !ty.is_closed() {
                return Err(ResolveError::OpenTemplate(catalog.display(ty).to_string()));
            }
        }

        for slot in &self.slots {
            for constraint in &slot.constraints {
                constraint.validate(catalog, Position::Slot)?;
            }
        }

        let directives = self
            .producers
            .iter()
            .flat_map(|producer| &producer.params)
            .filter_map(|param| match param {
                ParamDecl::Specialize { directive, .. } => Some(directive),
                _ => None,
            });
        for directive in directives {
            for constraint in &directive.types {
                constraint.validate(catalog, Position::Directive)?;
            }
        }
        Ok(())
    }
}
