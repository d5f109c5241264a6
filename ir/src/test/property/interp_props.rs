use proptest::prelude::*;

use kiln_dtype::DType;

use crate::interp::{HostBuffer, IndexSpace, Interpreter};
use crate::shape::num_elements;
use crate::test::fixtures::{reduce_function, static_dims};
use crate::types::BinaryOp;

use super::generators::*;

proptest! {
    #[test]
    fn index_space_visits_every_point_once_in_row_major_order(shape in arb_shape(3, 4)) {
        let points: Vec<_> = IndexSpace::of_shape(&shape).collect();
        prop_assert_eq!(points.len(), num_elements(&shape));
        prop_assert!(points.windows(2).all(|w| w[0] < w[1]));
    }

    /// The interpreter's own `buffer.reduce` agrees with a direct accumulation.
    #[test]
    fn buffer_reduce_sum_matches_direct_accumulation(case in arb_reduce_case()) {
        let out_shape = case.out_shape();
        let (func, _) = reduce_function(
            &static_dims(&case.shape), &static_dims(&out_shape), DType::Int64, &case.dims, BinaryOp::Add,
        );

        let mut expected = vec![case.init; num_elements(&out_shape)];
        for (point, value) in IndexSpace::of_shape(&case.shape).zip(&case.values) {
            let kept = point.iter().enumerate().filter(|(axis, _)| !case.dims.contains(axis)).map(|(_, c)| *c as usize);
            let offset = kept.zip(&out_shape).fold(0, |acc, (c, extent)| acc * extent + c);
            expected[offset] += value;
        }

        let args = vec![
            case.input(DType::Int64),
            HostBuffer::filled(&[], DType::Int64, case.init),
            HostBuffer::zeros(&out_shape, DType::Int64),
        ];
        let results = Interpreter::run(&func, args).unwrap();
        let actual: Vec<i64> = results[2].data().iter().map(|v| v.as_index().unwrap()).collect();
        prop_assert_eq!(actual, expected);
    }
}
