// ==============================================================================
// Pattern Resolver
// ==============================================================================
//
// Walks a window of the pattern list in declaration order. For each pattern,
// every consistent set of slot bindings is closed into a concrete type and
// handed to the instance enumerator.

use std::ops::ControlFlow;

use catalog_ty::{DefId, Ty};

use crate::bindings::Bindings;
use crate::pattern::{Direction, Directive, Pattern, TypeRef};
use crate::unify::Unifier;
use crate::{ResolveError, Resolver, Step};

/// The range of patterns a resolution may use. `global_*` is what nested
/// re-specializations are clipped against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Window {
    pub(crate) start: usize,
    pub(crate) stop: usize,
    pub(crate) global_start: usize,
    pub(crate) global_stop: usize,
}

impl Window {
    pub(crate) fn full(len: usize) -> Self {
        Self {
            start: 0,
            stop: len,
            global_start: 0,
            global_stop: len,
        }
    }

    /// The window for a directive on a producer of the pattern at `index`.
    pub(crate) fn narrow(self, index: usize, directive: &Directive) -> Self {
        let start = match directive.direction {
            Direction::Following => self.global_start.max(index + 1),
            Direction::Any | Direction::Preceding => self.global_start,
        };
        let stop = match directive.direction {
            Direction::Preceding => self.global_stop.min(index),
            Direction::Any | Direction::Following => self.global_stop,
        };

        if directive.global {
            Self {
                start,
                stop,
                global_start: start,
                global_stop: stop,
            }
        } else {
            Self {
                start,
                stop,
                ..self
            }
        }
    }
}

/// The pattern being built and the window it was reached through.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scope {
    pub(crate) index: usize,
    pub(crate) window: Window,
}

impl<V> Resolver<V> {
    pub(crate) fn resolve_window(
        &self,
        candidates: &[Ty],
        window: Window,
        emit: &mut dyn FnMut(V) -> Step,
    ) -> Step {
        let stop = window.stop.min(self.patterns.len());
        for index in window.start..stop {
            let pattern = &self.patterns[index];
            log::trace!("trying pattern {index} ({:?})", pattern.template);

            let mut produced = false;
            let scope = Scope { index, window };
            let flow = self.resolve_pattern(pattern, scope, candidates, &mut |value| {
                produced = true;
                emit(value)
            })?;
            if flow.is_break() {
                return Ok(ControlFlow::Break(()));
            }
            if produced && pattern.definitive {
                log::debug!("definitive pattern {index} produced, skipping the rest");
                break;
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    fn resolve_pattern(
        &self,
        pattern: &Pattern<V>,
        scope: Scope,
        candidates: &[Ty],
        emit: &mut dyn FnMut(V) -> Step,
    ) -> Step {
        let mut bindings = Bindings::default();
        let def = self.template(&pattern.template, &mut bindings)?;

        Unifier::new(&self.catalog).match_slots(
            candidates,
            &pattern.slots,
            &mut bindings,
            &mut |b| match self.close(def, b) {
                Some(closed) => self.instances(&closed, pattern, scope, b, emit),
                None => Ok(ControlFlow::Continue(())),
            },
        )
    }

    /// The fallback is closed without looking at any candidate.
    pub(crate) fn resolve_fallback(
        &self,
        fallback: &Pattern<V>,
        emit: &mut dyn FnMut(V) -> Step,
    ) -> Step {
        let mut bindings = Bindings::default();
        let def = self.template(&fallback.template, &mut bindings)?;
        let Some(closed) = self.close(def, &bindings) else {
            return Ok(ControlFlow::Continue(()));
        };

        let len = self.patterns.len();
        let scope = Scope {
            index: len,
            window: Window::full(len),
        };
        self.instances(&closed, fallback, scope, &bindings, emit)
    }

    /// Reduce a template to its definition. A closed template binds the
    /// definition's parameters to its own arguments.
    fn template(&self, template: &TypeRef, bindings: &mut Bindings) -> Result<DefId, ResolveError> {
        match template {
            TypeRef::Definition(def) => Ok(*def),
            TypeRef::Closed(ty) => {
                let def = self
                    .catalog
                    .definition_of(ty)
                    .filter(|_| ty.is_closed())
                    .ok_or_else(|| ResolveError::OpenTemplate(self.catalog.display(ty).to_string()))?;
                let params = &self.catalog.def(def).params;
                for (param, arg) in params.iter().zip(self.catalog.instantiation_args(ty)) {
                    bindings.prebind(param.name.clone(), arg);
                }
                Ok(def)
            }
        }
    }

    /// Instantiate `def` from the bindings. `None` when a parameter was never
    /// bound or the host rejects the arguments.
    fn close(&self, def: DefId, bindings: &Bindings) -> Option<Ty> {
        let data = self.catalog.def(def);
        let mut args = Vec::with_capacity(data.arity());
        for param in &data.params {
            match bindings.get(&param.name) {
                Some(ty) => args.push(ty.clone()),
                None => {
                    log::debug!("`{}` left unbound for `{}`, binding discarded", param.name, data.name);
                    return None;
                }
            }
        }

        match self.catalog.instantiate(def, args) {
            Ok(ty) => Some(ty),
            Err(err) => {
                log::debug!("binding discarded: {err}");
                None
            }
        }
    }
}
