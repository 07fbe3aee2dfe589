mod bindings;
mod constraint;
mod instances;
mod pattern;
mod producer;
mod resolve;
mod unify;


#[cfg(test)]
mod pbt;

use std::ops::ControlFlow;

use catalog_ty::{Catalog, InstantiateError};
use smol_str::SmolStr;
use thiserror::Error;

pub use bindings::Bindings;
pub use catalog_ty::Ty;
pub use constraint::{Constraint, ConstraintDisplay, Position, Slot};
pub use pattern::{Direction, Directive, ParamDecl, ParamShape, Pattern, Producer, ProducerKind, TypeRef};
pub use producer::{Arg, FailureCategory, InvokeError, Produced, Specialization};

use resolve::Window;

/// Result of one step of the search: `Break` once the consumer has seen
/// enough, `Continue` to ask for more.
pub(crate) type Step = Result<ControlFlow<()>, ResolveError>;

/// Configuration and usage errors. A candidate that simply does not match is
/// not an error; it contributes no results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("constraint `{constraint}` is not allowed in a {position}")]
    UnsupportedConstraint { constraint: String, position: Position },

    #[error("constraint on `{name}` supplies {found} type arguments but the definition takes {expected}")]
    ArityMismatch {
        name: SmolStr,
        expected: usize,
        found: usize,
    },

    #[error("generic parameter `{0}` does not have an assigned type")]
    UnboundParameter(SmolStr),

    #[error(transparent)]
    Instantiate(#[from] InstantiateError),

    #[error("producer for `{ty}` failed")]
    Producer {
        ty: String,
        #[source]
        source: InvokeError,
    },

    #[error("pattern template `{0}` must be a definition or a closed type")]
    OpenTemplate(String),
}

/// Resolves candidate type lists against an ordered pattern list and builds
/// values of the resulting closed types.
///
/// Results are produced on demand: [`Resolver::resolve_each`] stops all work
/// as soon as the consumer breaks, and [`Resolver::resolve_first`] only does
/// the work needed for the first value.
#[derive(Debug)]
pub struct Resolver<V> {
    catalog: Catalog,
    patterns: Vec<Pattern<V>>,
    fallback: Option<Pattern<V>>,
    expected_failures: Option<Vec<FailureCategory>>,
}

impl<V> Resolver<V> {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            patterns: Vec::new(),
            fallback: None,
            expected_failures: Some(vec![FailureCategory::System]),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn patterns(&self) -> &[Pattern<V>] {
        &self.patterns
    }

    /// Append a pattern. Its constraint trees are checked here, so a
    /// malformed pattern never reaches resolution.
    pub fn add_pattern(&mut self, pattern: Pattern<V>) -> Result<(), ResolveError> {
        pattern.validate(&self.catalog)?;
        self.patterns.push(pattern);
        Ok(())
    }

    /// Used when no declared pattern produces anything. Its slots are never
    /// matched.
    pub fn set_fallback(&mut self, fallback: Option<Pattern<V>>) -> Result<(), ResolveError> {
        if let Some(fallback) = &fallback {
            fallback.validate(&self.catalog)?;
        }
        self.fallback = fallback;
        Ok(())
    }

    /// Producer failures in these categories count as "no result". `None`
    /// treats every failure as fatal.
    pub fn set_expected_failures(&mut self, expected: Option<Vec<FailureCategory>>) {
        self.expected_failures = expected;
    }

    /// Feed every resolved value to `consume` in pattern, producer,
    /// combination order until it breaks.
    pub fn resolve_each(
        &self,
        candidates: &[Ty],
        mut consume: impl FnMut(V) -> ControlFlow<()>,
    ) -> Result<ControlFlow<()>, ResolveError> {
        let mut any = false;
        let window = Window::full(self.patterns.len());
        let flow = self.resolve_window(candidates, window, &mut |value| {
            any = true;
            Ok(consume(value))
        })?;
        if any || flow.is_break() {
            return Ok(flow);
        }

        match &self.fallback {
            Some(fallback) => {
                log::debug!("no pattern produced a value, using the fallback");
                self.resolve_fallback(fallback, &mut |value| Ok(consume(value)))
            }
            None => Ok(flow),
        }
    }

    pub fn resolve_all(&self, candidates: &[Ty]) -> Result<Vec<V>, ResolveError> {
        let mut values = Vec::new();
        let _flow = self.resolve_each(candidates, |value| {
            values.push(value);
            ControlFlow::Continue(())
        })?;
        Ok(values)
    }

    pub fn resolve_first(&self, candidates: &[Ty]) -> Result<Option<V>, ResolveError> {
        let mut first = None;
        let _flow = self.resolve_each(candidates, |value| {
            first = Some(value);
            ControlFlow::Break(())
        })?;
        Ok(first)
    }
}
