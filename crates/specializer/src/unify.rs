// ==============================================================================
// Unification Engine
// ==============================================================================
//
// Matching is written in continuation-passing style. Every alternative is
// handed to a continuation as soon as it is found; the continuation answers
// `Continue` to ask for the next alternative or `Break` to stop. Bindings are
// made with `Bindings::with`, so they are undone when the continuation
// returns, whether it asked for more, stopped, or failed.
//
// Variance decides where instantiation sites come from:
//
//   Covariant       forward sites: the candidate's own ancestors that are
//                   instances of the target (candidate is the target or a
//                   descendant)
//   Contravariant   inverse sites: the target's ancestors that are instances
//                   of the candidate's definition (candidate is the target or
//                   an ancestor)
//   Invariant       sites found in both directions
//   Ambivariant     sites found in either direction
//
// After the sub-constraints have been unified against a site's arguments, the
// rebuilt type is checked against the candidate once more, because argument
// unification may have bound names that change what the site means.

use std::ops::ControlFlow;

use catalog_ty::{Catalog, DefId, Marker, Ty, Variance};
use itertools::Itertools;

use crate::bindings::Bindings;
use crate::constraint::{check_arity, Constraint, Position, Slot};
use crate::{ResolveError, Step};

/// The generic arguments of one instance of the target, as found in the
/// candidate's hierarchy.
type Site = Vec<Ty>;

pub(crate) struct Unifier<'c> {
    catalog: &'c Catalog,
}

impl<'c> Unifier<'c> {
    pub(crate) fn new(catalog: &'c Catalog) -> Self {
        Self { catalog }
    }

    // ==========================================================================
    // Slots
    // ==========================================================================

    /// Match `candidates` against `slots` position by position and call `k`
    /// once per complete, consistent set of bindings. Candidates beyond the
    /// last slot are ignored.
    pub(crate) fn match_slots(
        &self,
        candidates: &[Ty],
        slots: &[Slot],
        bindings: &mut Bindings,
        k: &mut dyn FnMut(&mut Bindings) -> Step,
    ) -> Step {
        let Some((slot, rest)) = slots.split_first() else {
            return k(bindings);
        };
        let Some((candidate, remaining)) = candidates.split_first() else {
            return Ok(ControlFlow::Continue(()));
        };

        if !slot.definitive {
            return self.match_constraints(
                candidate,
                &slot.constraints,
                Variance::Ambivariant,
                bindings,
                &mut |b| self.match_slots(remaining, rest, b, k),
            );
        }

        let mut halted = false;
        let _flow = self.match_constraints(
            candidate,
            &slot.constraints,
            Variance::Ambivariant,
            bindings,
            &mut |b| {
                let mut matched = false;
                let flow = self.match_slots(remaining, rest, b, &mut |b| {
                    matched = true;
                    k(b)
                })?;
                if flow.is_break() {
                    halted = true;
                    return Ok(ControlFlow::Break(()));
                }
                if matched {
                    log::debug!("definitive slot matched, skipping its other alternatives");
                    return Ok(ControlFlow::Break(()));
                }
                Ok(ControlFlow::Continue(()))
            },
        )?;

        Ok(if halted {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        })
    }

    /// Evaluate `constraints` as a conjunction against a single candidate.
    pub(crate) fn match_constraints(
        &self,
        candidate: &Ty,
        constraints: &[Constraint],
        outer: Variance,
        bindings: &mut Bindings,
        k: &mut dyn FnMut(&mut Bindings) -> Step,
    ) -> Step {
        let Some((first, rest)) = constraints.split_first() else {
            return k(bindings);
        };
        let mut next = |b: &mut Bindings| self.match_constraints(candidate, rest, outer, b, k);

        match first {
            Constraint::Wildcard => next(bindings),
            Constraint::Param { name, variance } => match bindings.get(name).cloned() {
                None => bindings.with(name.clone(), candidate.clone(), |b| next(b)),
                Some(bound) => {
                    self.reoccur(candidate, &bound, *variance, outer, bindings, &mut |b, _| next(b))
                }
            },
            Constraint::Type {
                target,
                variance,
                args,
            } => self.unify_constraint(
                candidate,
                *target,
                *variance,
                args,
                outer,
                bindings,
                &mut |b, _| next(b),
            ),
            Constraint::Not(inner) => {
                if self.has_solution(candidate, inner, outer, bindings)? {
                    Ok(ControlFlow::Continue(()))
                } else {
                    next(bindings)
                }
            }
        }
    }

    /// Probe whether `constraints` can match `candidate`. Whatever the probe
    /// binds is discarded.
    pub(crate) fn has_solution(
        &self,
        candidate: &Ty,
        constraints: &[Constraint],
        outer: Variance,
        bindings: &mut Bindings,
    ) -> Result<bool, ResolveError> {
        let mut found = false;
        let _flow = self.match_constraints(candidate, constraints, outer, bindings, &mut |_| {
            found = true;
            Ok(ControlFlow::Break(()))
        })?;
        Ok(found)
    }

    // ==========================================================================
    // Type constraints
    // ==========================================================================

    /// Call `k` with every instance of `target` the candidate can be unified
    /// with under the effective variance.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn unify_constraint(
        &self,
        candidate: &Ty,
        target: DefId,
        variance: Variance,
        args: &[Constraint],
        outer: Variance,
        bindings: &mut Bindings,
        k: &mut dyn FnMut(&mut Bindings, Ty) -> Step,
    ) -> Step {
        let candidate = &self.catalog.decode_marker(candidate)?;
        let effective = outer.combine(variance);

        match self.catalog.marker_of(target) {
            Some(Marker::ValueType) => {
                return self.kind_marker(self.catalog.is_value_type(candidate), candidate, bindings, k)
            }
            Some(Marker::ReferenceType) => {
                return self.kind_marker(
                    self.catalog.is_reference_type(candidate),
                    candidate,
                    bindings,
                    k,
                )
            }
            _ => {}
        }
        check_arity(self.catalog, target, args.len())?;

        for site in self.sites(candidate, target, effective, args, bindings) {
            let flow = self.unify_args(
                &site,
                args,
                effective,
                &mut Vec::with_capacity(site.len()),
                bindings,
                &mut |b, resolved| {
                    let result = match self.catalog.instantiate(target, resolved.to_vec()) {
                        Ok(result) => result,
                        Err(err) => {
                            log::debug!("site rejected: {err}");
                            return Ok(ControlFlow::Continue(()));
                        }
                    };
                    if !self.accepts(effective, &result, candidate) {
                        return Ok(ControlFlow::Continue(()));
                    }
                    k(b, result)
                },
            )?;
            if flow.is_break() {
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Value-type and reference-type markers look at the candidate alone.
    fn kind_marker(
        &self,
        holds: bool,
        candidate: &Ty,
        bindings: &mut Bindings,
        k: &mut dyn FnMut(&mut Bindings, Ty) -> Step,
    ) -> Step {
        if holds {
            k(bindings, candidate.clone())
        } else {
            Ok(ControlFlow::Continue(()))
        }
    }

    /// A later occurrence of an already bound parameter.
    fn reoccur(
        &self,
        candidate: &Ty,
        bound: &Ty,
        variance: Variance,
        outer: Variance,
        bindings: &mut Bindings,
        k: &mut dyn FnMut(&mut Bindings, Ty) -> Step,
    ) -> Step {
        let candidate = self.catalog.decode_marker(candidate)?;
        let bound = self.catalog.decode_marker(bound)?;

        let forward = || self.catalog.ancestors(&candidate).contains(&bound);
        let inverse = || self.catalog.ancestors(&bound).contains(&candidate);
        let related = match outer.combine(variance) {
            Variance::Covariant => forward(),
            Variance::Contravariant => inverse(),
            Variance::Invariant => candidate == bound,
            Variance::Ambivariant => forward() || inverse(),
        };

        if related {
            k(bindings, bound)
        } else {
            Ok(ControlFlow::Continue(()))
        }
    }

    /// Unify each sub-constraint with the site argument at the same position,
    /// collecting the resolved arguments in `resolved`.
    fn unify_args(
        &self,
        site: &[Ty],
        constraints: &[Constraint],
        variance: Variance,
        resolved: &mut Vec<Ty>,
        bindings: &mut Bindings,
        k: &mut dyn FnMut(&mut Bindings, &[Ty]) -> Step,
    ) -> Step {
        let index = resolved.len();
        let (Some(constraint), Some(arg)) = (constraints.get(index), site.get(index)) else {
            return k(bindings, resolved.as_slice());
        };
        let arg = self.catalog.decode_marker(arg)?;

        let mut push = |b: &mut Bindings, ty: Ty| {
            resolved.push(ty);
            let flow = self.unify_args(site, constraints, variance, resolved, b, k);
            resolved.pop();
            flow
        };

        match constraint {
            Constraint::Wildcard => push(bindings, arg),
            Constraint::Param {
                name,
                variance: own,
            } => match bindings.get(name).cloned() {
                None => bindings.with(name.clone(), arg.clone(), |b| push(b, arg)),
                Some(bound) => self.reoccur(&arg, &bound, *own, variance, bindings, &mut push),
            },
            Constraint::Type {
                target,
                variance: own,
                args,
            } => self.unify_constraint(&arg, *target, *own, args, variance, bindings, &mut push),
            Constraint::Not(_) => Err(ResolveError::UnsupportedConstraint {
                constraint: constraint.display(self.catalog).to_string(),
                position: Position::Argument,
            }),
        }
    }

    // ==========================================================================
    // Instantiation sites
    // ==========================================================================

    fn sites(
        &self,
        candidate: &Ty,
        target: DefId,
        variance: Variance,
        args: &[Constraint],
        bindings: &Bindings,
    ) -> Vec<Site> {
        let inverse = || self.inverse_sites(candidate, target, args, bindings);
        let sites: Vec<Site> = match variance {
            Variance::Covariant => self.forward_sites(candidate, target),
            Variance::Contravariant => inverse(),
            Variance::Invariant => {
                let backward = inverse();
                self.forward_sites(candidate, target)
                    .into_iter()
                    .filter(|site| backward.contains(site))
                    .collect()
            }
            Variance::Ambivariant => {
                let mut sites = self.forward_sites(candidate, target);
                sites.extend(inverse());
                sites
            }
        };
        sites.into_iter().unique().collect()
    }

    fn forward_sites(&self, candidate: &Ty, target: DefId) -> Vec<Site> {
        self.catalog
            .ancestors(candidate)
            .iter()
            .filter(|ancestor| self.catalog.definition_of(ancestor) == Some(target))
            .map(|ancestor| self.catalog.instantiation_args(ancestor))
            .collect()
    }

    /// Walk the target's own ancestors looking for the candidate's definition,
    /// and solve the target's parameters from the candidate's arguments. A
    /// parameter the ancestor does not mention is taken from its
    /// sub-constraint when that is already closed; otherwise the ancestor
    /// yields no site.
    fn inverse_sites(
        &self,
        candidate: &Ty,
        target: DefId,
        args: &[Constraint],
        bindings: &Bindings,
    ) -> Vec<Site> {
        let Some(candidate_def) = self.catalog.definition_of(candidate) else {
            return Vec::new();
        };
        let actual = self.catalog.instantiation_args(candidate);
        let mut known: Vec<Option<Ty>> = args
            .iter()
            .map(|arg| self.closed_form(arg, bindings))
            .collect();

        let ancestors = match self.catalog.marker_of(target) {
            // the marker definition has no ancestry of its own; arrays take
            // theirs from the catalog, and only per rank
            Some(Marker::Array) => {
                let Some(rank) = self.array_rank(candidate, known.first()) else {
                    return Vec::new();
                };
                if let Some(slot) = known.first_mut() {
                    *slot = Some(self.catalog.encode_rank(rank));
                }
                self.catalog.ancestors(&Ty::array(Ty::Param(1), rank))
            }
            _ => self.catalog.definition_ancestors(target),
        };

        ancestors
            .iter()
            .filter(|ancestor| self.catalog.definition_of(ancestor) == Some(candidate_def))
            .filter_map(|ancestor| {
                let pattern = self.catalog.instantiation_args(ancestor);
                let mut solved = vec![None; known.len()];
                let consistent = pattern.len() == actual.len()
                    && pattern
                        .iter()
                        .zip(&actual)
                        .all(|(pattern, actual)| solve(pattern, actual, &mut solved));
                if !consistent {
                    return None;
                }
                solved
                    .into_iter()
                    .zip(&known)
                    .map(|(solved, known)| solved.or_else(|| known.clone()))
                    .collect::<Option<Site>>()
            })
            .collect()
    }

    /// The rank an inverse array site is built for: the one the rank
    /// sub-constraint already fixes, else the candidate's own.
    fn array_rank(&self, candidate: &Ty, known: Option<&Option<Ty>>) -> Option<u32> {
        let fixed = known
            .and_then(Option::as_ref)
            .and_then(|rank| self.catalog.decode_rank(rank));
        match candidate {
            Ty::Array { rank, .. } => fixed.or(Some(*rank)),
            _ => fixed,
        }
    }

    /// The single type a constraint stands for, if it stands for exactly one:
    /// a bound parameter or a type tree with nothing open in it.
    fn closed_form(&self, constraint: &Constraint, bindings: &Bindings) -> Option<Ty> {
        match constraint {
            Constraint::Param { name, .. } => bindings.get(name).cloned(),
            Constraint::Type { target, args, .. } => {
                if matches!(
                    self.catalog.marker_of(*target),
                    Some(Marker::ValueType | Marker::ReferenceType)
                ) {
                    return None;
                }
                let args = args
                    .iter()
                    .map(|arg| self.closed_form(arg, bindings))
                    .collect::<Option<Vec<_>>>()?;
                self.catalog.instantiate(*target, args).ok()
            }
            Constraint::Wildcard | Constraint::Not(_) => None,
        }
    }

    /// Whether the rebuilt `result` still relates to `candidate` in the
    /// direction the effective variance asks for.
    fn accepts(&self, variance: Variance, result: &Ty, candidate: &Ty) -> bool {
        match variance {
            Variance::Invariant => result == candidate,
            Variance::Covariant => self.catalog.is_assignable(result, candidate),
            Variance::Contravariant => self.catalog.is_assignable(candidate, result),
            Variance::Ambivariant => {
                self.catalog.is_assignable(result, candidate)
                    || self.catalog.is_assignable(candidate, result)
            }
        }
    }
}

/// Structurally match a type mentioning `Ty::Param`s against a closed type,
/// recording what each parameter stands for.
fn solve(pattern: &Ty, actual: &Ty, solved: &mut [Option<Ty>]) -> bool {
    match (pattern, actual) {
        (Ty::Param(index), _) => match solved.get_mut(*index as usize) {
            Some(Some(known)) => known == actual,
            Some(slot) => {
                *slot = Some(actual.clone());
                true
            }
            None => false,
        },
        (
            Ty::Named { def, args },
            Ty::Named {
                def: actual_def,
                args: actual_args,
            },
        ) => {
            def == actual_def
                && args.len() == actual_args.len()
                && args
                    .iter()
                    .zip(actual_args)
                    .all(|(pattern, actual)| solve(pattern, actual, solved))
        }
        (
            Ty::Array { rank, elem },
            Ty::Array {
                rank: actual_rank,
                elem: actual_elem,
            },
        ) => rank == actual_rank && solve(elem, actual_elem, solved),
        (Ty::Pointer(elem), Ty::Pointer(actual_elem))
        | (Ty::ByRef(elem), Ty::ByRef(actual_elem)) => solve(elem, actual_elem, solved),
        _ => false,
    }
}
