use proptest::{
    prelude::{prop, prop_oneof, Arbitrary, BoxedStrategy, Just, Strategy},
    sample::select,
};

use crate::{Ty, Variance};

#[derive(Debug, Clone, Copy)]
pub struct RecursiveParams {
    pub depth: u32,
    pub desired_size: u32,
    pub expected_branch_size: u32,
}

impl Default for RecursiveParams {
    fn default() -> Self {
        Self {
            depth: 3,
            desired_size: 16,
            expected_branch_size: 2,
        }
    }
}

pub fn arb_variance() -> impl Strategy<Value = Variance> {
    prop_oneof![
        Just(Variance::Invariant),
        Just(Variance::Covariant),
        Just(Variance::Contravariant),
        Just(Variance::Ambivariant),
    ]
}

impl Arbitrary for Variance {
    type Parameters = ();
    type Strategy = BoxedStrategy<Variance>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        arb_variance().boxed()
    }
}

pub fn arb_rank() -> impl Strategy<Value = u32> {
    1..=8u32
}

/// Closed types built from `leaves` by wrapping them in arrays, pointers and
/// by-refs.
pub fn arb_closed_ty(leaves: Vec<Ty>, args: RecursiveParams) -> BoxedStrategy<Ty> {
    let leaf = select(leaves);

    leaf.prop_recursive(
        args.depth,
        args.desired_size,
        args.expected_branch_size,
        |inner| {
            prop_oneof![
                (inner.clone(), arb_rank()).prop_map(|(elem, rank)| Ty::array(elem, rank)),
                inner.clone().prop_map(Ty::pointer),
                inner.prop_map(Ty::by_ref),
            ]
        },
    )
    .boxed()
}

pub fn arb_ty_list(leaves: Vec<Ty>, max_len: usize) -> BoxedStrategy<Vec<Ty>> {
    prop::collection::vec(arb_closed_ty(leaves, RecursiveParams::default()), 0..max_len).boxed()
}
