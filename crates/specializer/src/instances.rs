// ==============================================================================
// Instance Enumerator
// ==============================================================================
//
// Given a closed type, run its producers (factories before constructors) over
// every way of filling their parameter lists. Parameters carrying a directive
// are filled by resolving again against a window of the same pattern list.

use std::ops::ControlFlow;

use catalog_ty::Ty;

use crate::bindings::Bindings;
use crate::constraint::{Constraint, Position};
use crate::pattern::{ParamDecl, ParamShape, Pattern};
use crate::producer::{Arg, InvokeError, Specialization};
use crate::resolve::Scope;
use crate::{ResolveError, Resolver, Step};

impl<V> Resolver<V> {
    pub(crate) fn instances(
        &self,
        closed: &Ty,
        pattern: &Pattern<V>,
        scope: Scope,
        bindings: &Bindings,
        emit: &mut dyn FnMut(V) -> Step,
    ) -> Step {
        for producer in pattern.ordered_producers() {
            let mut produced = false;
            let flow = self.combinations(scope, &producer.params, bindings, &mut Vec::new(), &mut |args| {
                let values = match producer.invoke(closed, args) {
                    Ok(values) => values,
                    Err(err) if self.is_expected(&err) => {
                        log::debug!(
                            "producer for `{}` failed, skipping: {err}",
                            self.catalog.display(closed)
                        );
                        return Ok(ControlFlow::Continue(()));
                    }
                    Err(source) => {
                        return Err(ResolveError::Producer {
                            ty: self.catalog.display(closed).to_string(),
                            source,
                        })
                    }
                };

                for value in values {
                    produced = true;
                    if emit(value)?.is_break() {
                        return Ok(ControlFlow::Break(()));
                    }
                }
                Ok(ControlFlow::Continue(()))
            })?;

            if flow.is_break() {
                return Ok(ControlFlow::Break(()));
            }
            if produced && producer.definitive {
                log::debug!(
                    "definitive producer of `{}` produced, skipping the rest",
                    self.catalog.display(closed)
                );
                break;
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    fn is_expected(&self, err: &InvokeError) -> bool {
        self.expected_failures
            .as_ref()
            .is_some_and(|expected| expected.contains(&err.category))
    }

    /// Fill `params` left to right, calling `k` with each complete argument
    /// list.
    fn combinations<'r>(
        &'r self,
        scope: Scope,
        params: &[ParamDecl],
        bindings: &Bindings,
        args: &mut Vec<Arg<'r, V>>,
        k: &mut dyn FnMut(&[Arg<'r, V>]) -> Step,
    ) -> Step {
        let Some(param) = params.get(args.len()) else {
            return k(args.as_slice());
        };

        let (directive, has_default) = match param {
            ParamDecl::Required => return Ok(ControlFlow::Continue(())),
            ParamDecl::Optional => {
                return self.with_arg(Arg::Default, scope, params, bindings, args, k)
            }
            ParamDecl::Specialize {
                directive,
                has_default,
            } => (directive, *has_default),
        };

        let candidates = self.directive_candidates(&directive.types, bindings)?;
        let window = scope.window.narrow(scope.index, directive);

        if directive.shape == ParamShape::Sequence {
            let sequence = Specialization::new(self, candidates, window);
            return self.with_arg(Arg::Sequence(sequence), scope, params, bindings, args, k);
        }

        let mut any = false;
        let mut halted = false;
        let _flow = self.resolve_window(&candidates, window, &mut |value| {
            any = true;
            let mut complete = false;
            let flow = self.with_arg(Arg::Value(value), scope, params, bindings, args, &mut |full| {
                complete = true;
                k(full)
            })?;
            if flow.is_break() {
                halted = true;
                return Ok(ControlFlow::Break(()));
            }
            if complete && directive.definitive {
                log::debug!("definitive parameter filled, skipping its other values");
                return Ok(ControlFlow::Break(()));
            }
            Ok(ControlFlow::Continue(()))
        })?;

        if halted {
            return Ok(ControlFlow::Break(()));
        }
        if any || !has_default {
            return Ok(ControlFlow::Continue(()));
        }
        self.with_arg(Arg::Default, scope, params, bindings, args, k)
    }

    fn with_arg<'r>(
        &'r self,
        arg: Arg<'r, V>,
        scope: Scope,
        params: &[ParamDecl],
        bindings: &Bindings,
        args: &mut Vec<Arg<'r, V>>,
        k: &mut dyn FnMut(&[Arg<'r, V>]) -> Step,
    ) -> Step {
        args.push(arg);
        let flow = self.combinations(scope, params, bindings, args, k);
        args.pop();
        flow
    }

    /// Turn a directive's type list into closed candidates.
    fn directive_candidates(
        &self,
        types: &[Constraint],
        bindings: &Bindings,
    ) -> Result<Vec<Ty>, ResolveError> {
        types
            .iter()
            .map(|constraint| self.extract(constraint, bindings))
            .collect()
    }

    fn extract(&self, constraint: &Constraint, bindings: &Bindings) -> Result<Ty, ResolveError> {
        match constraint {
            Constraint::Param { name, .. } => bindings
                .get(name)
                .cloned()
                .ok_or_else(|| ResolveError::UnboundParameter(name.clone())),
            Constraint::Type { target, args, .. } => {
                let args = args
                    .iter()
                    .map(|arg| self.extract(arg, bindings))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.catalog.instantiate(*target, args)?)
            }
            Constraint::Wildcard | Constraint::Not(_) => Err(ResolveError::UnsupportedConstraint {
                constraint: constraint.display(&self.catalog).to_string(),
                position: Position::Directive,
            }),
        }
    }
}
