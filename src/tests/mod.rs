mod randomized;
mod templating;

use ndarray::{arr1, arr2, Array1, Array2};

use crate::core::{GraphError, Registry, TableId, VarId};

/// Binary equality ("both wires agree") table: rows `(0,0)` and `(1,1)`,
/// weight 1 each.
pub(super) fn equality_table(registry: &mut Registry, graph: usize) -> TableId {
    let rows: Array2<usize> = arr2(&[[0, 0], [1, 1]]);
    let weights: Array1<f64> = arr1(&[1.0, 1.0]);
    registry
        .create_table(graph, rows.view(), weights.view())
        .unwrap()
}

/// Binary even-parity ("a xor b xor c == 0") table over three wires.
pub(super) fn xor3_table(registry: &mut Registry, graph: usize) -> TableId {
    let rows: Array2<usize> = arr2(&[[0, 0, 0], [0, 1, 1], [1, 0, 1], [1, 1, 0]]);
    let weights: Array1<f64> = arr1(&[1.0, 1.0, 1.0, 1.0]);
    registry
        .create_table(graph, rows.view(), weights.view())
        .unwrap()
}

pub(super) fn set_certain(registry: &mut Registry, var: VarId, value: usize, m: usize) {
    let mut row = vec![0.0; m];
    row[value] = 1.0;
    let priors = Array2::from_shape_vec((1, m), row).unwrap();
    registry.set_priors(&[var], priors.view()).unwrap();
}

pub(super) fn assert_close(got: &[f64], want: &[f64], tol: f64) {
    assert_eq!(got.len(), want.len());
    for (g, w) in got.iter().zip(want.iter()) {
        assert!((g - w).abs() < tol, "got {:?}, want {:?}", got, want);
    }
}

pub(super) fn expect_err<T: std::fmt::Debug>(r: Result<T, GraphError>, err: GraphError) {
    match r {
        Ok(v) => panic!("expected {:?}, got Ok({:?})", err, v),
        Err(e) => assert_eq!(e, err),
    }
}
