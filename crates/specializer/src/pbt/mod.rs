// ==============================================================================
// Property-Based Tests for Resolution
// ==============================================================================
//
// Candidates are drawn from a handful of fixture types wrapped in arrays,
// pointers and by-refs. Constraints come from a short list of non-generic
// targets plus one variant generic interface, each with an arbitrary variance.

use catalog_ty::arbitrary::{arb_closed_ty, arb_rank, arb_ty_list, RecursiveParams};
use catalog_ty::{Marker, Ty, Variance};
use proptest::prelude::{any, prop_assert, prop_assert_eq, proptest, BoxedStrategy, ProptestConfig};

use crate::tests::{all, build, Made, World};
use crate::{Constraint, Pattern, Resolver};

fn leaves() -> Vec<Ty> {
    let w = World::new();
    let fx = &w.fx;
    vec![
        Ty::named(fx.int),
        Ty::named(fx.long),
        Ty::named(fx.string),
        Ty::named(fx.object),
        Ty::named(fx.value_type),
        fx.generic(fx.list_t, [Ty::named(fx.int)]),
        fx.generic(fx.list_t, [Ty::named(fx.string)]),
        fx.generic(fx.enumerable_t, [Ty::named(fx.object)]),
    ]
}

fn arb_candidate() -> BoxedStrategy<Ty> {
    arb_closed_ty(leaves(), RecursiveParams::default())
}

/// One of the probe constraints, by index.
fn probe_constraint(w: &World, r: &Resolver<Made>, which: usize, variance: Variance) -> Constraint {
    let fx = &w.fx;
    let constraint = match which % 5 {
        0 => Constraint::named(fx.value_type),
        1 => Constraint::named(fx.object),
        2 => Constraint::named(fx.convertible),
        3 => Constraint::named(fx.enumerable),
        _ => {
            let enumerable_object = Ty::generic(fx.enumerable_t, [Ty::named(fx.object)]);
            Constraint::from_type(r.catalog(), &enumerable_object)
        }
    };
    constraint.with_variance(variance)
}

fn matches(w: &mut World, which: usize, variance: Variance, candidate: &Ty) -> bool {
    let mut r = w.resolver();
    let constraint = probe_constraint(w, &r, which, variance);
    r.add_pattern(
        Pattern::definition(w.probe)
            .slot(constraint)
            .producer(build("probe")),
    )
    .unwrap();
    !all(&r, std::slice::from_ref(candidate)).is_empty()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128, .. ProptestConfig::default()
    })]

    #[test]
    fn invariant_absorbs(inner in any::<Variance>()) {
        prop_assert_eq!(Variance::Invariant.combine(inner), Variance::Invariant);
        prop_assert_eq!(Variance::Ambivariant.combine(inner), inner);
    }

    #[test]
    fn contravariance_flips_twice(inner in any::<Variance>()) {
        let twice = Variance::Contravariant.combine(Variance::Contravariant.combine(inner));
        let expected = match inner {
            Variance::Ambivariant => Variance::Covariant,
            other => other,
        };
        prop_assert_eq!(twice, expected);
    }

    #[test]
    fn rank_round_trip(rank in arb_rank()) {
        let w = World::new();
        let catalog = &w.fx.catalog;
        prop_assert_eq!(catalog.decode_rank(&catalog.encode_rank(rank)), Some(rank));
    }

    #[test]
    fn marker_round_trip(ty in arb_candidate()) {
        let w = World::new();
        let catalog = &w.fx.catalog;
        let encoded = catalog.encode_marker(&ty);
        prop_assert_eq!(catalog.decode_marker(&encoded), Ok(ty.clone()));

        if let Ty::Array { rank, elem } = &ty {
            let rebuilt = catalog.instantiate(
                catalog.marker(Marker::Array),
                vec![catalog.encode_rank(*rank), (**elem).clone()],
            );
            prop_assert_eq!(rebuilt, Ok(ty.clone()));
        }
    }

    #[test]
    fn negation_is_complement(
        candidate in arb_candidate(),
        which in 0..5usize,
        variance in any::<Variance>(),
    ) {
        let mut w = World::new();
        let mut r = w.resolver();
        let constraint = probe_constraint(&w, &r, which, variance);
        r.add_pattern(
            Pattern::definition(w.probe)
                .slot(Constraint::not([constraint]))
                .producer(build("probe")),
        )
        .unwrap();
        let negated = !all(&r, std::slice::from_ref(&candidate)).is_empty();

        let mut w = World::new();
        prop_assert!(negated != matches(&mut w, which, variance, &candidate));
    }

    #[test]
    fn negation_never_binds(
        probed in arb_candidate(),
        bound in arb_candidate(),
        which in 0..5usize,
        variance in any::<Variance>(),
    ) {
        let mut w = World::new();
        let mut r = w.resolver();
        let constraint = probe_constraint(&w, &r, which, variance);
        r.add_pattern(
            Pattern::definition(w.holder)
                .slot(Constraint::not([Constraint::param("T"), constraint]))
                .slot(Constraint::param("T"))
                .producer(build("holder")),
        )
        .unwrap();
        let out = all(&r, &[probed.clone(), bound.clone()]);

        let expected = if matches(&mut World::new(), which, variance, &probed) {
            Vec::new()
        } else {
            let holder = r.catalog().instantiate(w.holder, vec![bound]).unwrap();
            vec![format!("holder:{}", r.catalog().display(&holder))]
        };
        prop_assert_eq!(out, expected);
    }

    #[test]
    fn resolution_is_repeatable(
        candidate in arb_candidate(),
        which in 0..5usize,
        variance in any::<Variance>(),
    ) {
        let mut w = World::new();
        let mut r = w.resolver();
        let constraint = probe_constraint(&w, &r, which, variance);
        r.add_pattern(
            Pattern::definition(w.holder)
                .slot(crate::Slot::new([Constraint::param("T"), constraint]))
                .producer(build("holder")),
        )
        .unwrap();

        let candidates = std::slice::from_ref(&candidate);
        let once = all(&r, candidates);
        prop_assert_eq!(&once, &all(&r, candidates));

        let first = r.resolve_first(candidates).unwrap();
        prop_assert_eq!(first.is_some(), !once.is_empty());
    }

    #[test]
    fn trailing_candidates_are_ignored(
        candidate in arb_candidate(),
        extra in arb_ty_list(leaves(), 4),
        which in 0..5usize,
        variance in any::<Variance>(),
    ) {
        let mut w = World::new();
        let mut r = w.resolver();
        let constraint = probe_constraint(&w, &r, which, variance);
        r.add_pattern(
            Pattern::definition(w.holder)
                .slot(crate::Slot::new([Constraint::param("T"), constraint]))
                .producer(build("holder")),
        )
        .unwrap();

        let mut candidates = vec![candidate.clone()];
        candidates.extend(extra);
        prop_assert_eq!(all(&r, &candidates), all(&r, &[candidate]));
    }
}
