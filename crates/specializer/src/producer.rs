use std::fmt;
use std::ops::ControlFlow;

use catalog_ty::Ty;
use itertools::Either;
use smol_str::SmolStr;
use thiserror::Error;

use crate::resolve::Window;
use crate::{ResolveError, Resolver};

/// Kind of failure a producer reports. The resolver swallows the categories
/// on its expected-failure list and propagates the rest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    /// Runtime-level failures (bad argument, invalid state and the like).
    System,
    Custom(SmolStr),
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCategory::System => f.write_str("system"),
            FailureCategory::Custom(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{category} failure: {message}")]
pub struct InvokeError {
    pub category: FailureCategory,
    pub message: String,
}

impl InvokeError {
    pub fn system(message: impl Into<String>) -> Self {
        Self {
            category: FailureCategory::System,
            message: message.into(),
        }
    }

    pub fn custom(category: impl Into<SmolStr>, message: impl Into<String>) -> Self {
        Self {
            category: FailureCategory::Custom(category.into()),
            message: message.into(),
        }
    }
}

/// A nested resolution driven from inside a producer failed.
impl From<ResolveError> for InvokeError {
    fn from(err: ResolveError) -> Self {
        InvokeError::custom("resolve", err.to_string())
    }
}

/// What a factory hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Produced<V> {
    Nothing,
    One(V),
    /// Yielded element by element.
    Many(Vec<V>),
}

impl<V> From<Option<V>> for Produced<V> {
    fn from(value: Option<V>) -> Self {
        value.map_or(Produced::Nothing, Produced::One)
    }
}

/// Missing elements are skipped.
impl<V> FromIterator<Option<V>> for Produced<V> {
    fn from_iter<I: IntoIterator<Item = Option<V>>>(iter: I) -> Self {
        Produced::Many(iter.into_iter().flatten().collect())
    }
}

impl<V> IntoIterator for Produced<V> {
    type Item = V;
    type IntoIter = Either<std::option::IntoIter<V>, std::vec::IntoIter<V>>;

    fn into_iter(self) -> Self::IntoIter {
        match self {
            Produced::Nothing => Either::Left(None.into_iter()),
            Produced::One(value) => Either::Left(Some(value).into_iter()),
            Produced::Many(values) => Either::Right(values.into_iter()),
        }
    }
}

/// One filled producer parameter.
pub enum Arg<'r, V> {
    Value(V),
    /// Let the producer use its own default.
    Default,
    /// The un-evaluated results of a nested resolution.
    Sequence(Specialization<'r, V>),
}

impl<V: fmt::Debug> fmt::Debug for Arg<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Arg::Default => f.write_str("Default"),
            Arg::Sequence(seq) => f.debug_tuple("Sequence").field(seq).finish(),
        }
    }
}

/// A nested resolution that has not run yet. Nothing is resolved until the
/// holder drives it, and each drive runs it afresh.
pub struct Specialization<'r, V> {
    resolver: &'r Resolver<V>,
    candidates: Vec<Ty>,
    window: Window,
}

impl<'r, V> Specialization<'r, V> {
    pub(crate) fn new(resolver: &'r Resolver<V>, candidates: Vec<Ty>, window: Window) -> Self {
        Self {
            resolver,
            candidates,
            window,
        }
    }

    pub fn candidates(&self) -> &[Ty] {
        &self.candidates
    }

    pub fn for_each(
        &self,
        mut consume: impl FnMut(V) -> ControlFlow<()>,
    ) -> Result<ControlFlow<()>, ResolveError> {
        self.resolver
            .resolve_window(&self.candidates, self.window, &mut |value| Ok(consume(value)))
    }

    pub fn collect(&self) -> Result<Vec<V>, ResolveError> {
        let mut values = Vec::new();
        let _flow = self.for_each(|value| {
            values.push(value);
            ControlFlow::Continue(())
        })?;
        Ok(values)
    }

    pub fn first(&self) -> Result<Option<V>, ResolveError> {
        let mut first = None;
        let _flow = self.for_each(|value| {
            first = Some(value);
            ControlFlow::Break(())
        })?;
        Ok(first)
    }
}

impl<V> fmt::Debug for Specialization<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specialization")
            .field("candidates", &self.candidates)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}
