use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use rand_distr::{Distribution, Uniform};

use super::{assert_close, equality_table};

/// Builds a random tree over `n` binary variables (variable 0 is the root)
/// connected by "equality" factors, then asserts that after belief
/// propagation converges, every variable's belief equals the prior placed
/// on the root — an equality-linked tree forces every node's marginal to
/// coincide with whichever single node carries the evidence, regardless of
/// the tree's shape.
#[test]
fn equality_tree_propagates_root_prior_to_every_node() {
    let mut rng = thread_rng();
    let n = 40;
    let root_prior = {
        let p = Uniform::new(0.05, 0.95).sample(&mut rng);
        [p, 1.0 - p]
    };

    let mut reg = crate::core::Registry::new();
    let vars: Vec<usize> = (0..n).map(|_| reg.new_variable(2)).collect();
    let graph = reg.new_graph(&[]).unwrap();
    let table = equality_table(&mut reg, graph);

    // Attach each non-root node to a uniformly random earlier node, so the
    // result is a random tree rooted at 0.
    let mut edges = Vec::with_capacity(n - 1);
    for i in 1..n {
        let parent = rng.gen_range(0..i);
        edges.push((parent, i));
    }
    edges.shuffle(&mut rng);
    for (p, c) in edges {
        reg.create_factor(graph, table, &[vars[p], vars[c]]).unwrap();
    }

    let priors = ndarray::Array2::from_shape_vec((1, 2), root_prior.to_vec()).unwrap();
    reg.set_priors(&[vars[0]], priors.view()).unwrap();

    // A tree of depth < n converges exactly within n rounds.
    reg.set_num_iterations(n);
    reg.solve(graph).unwrap();

    for &v in &vars {
        let belief = reg.get_beliefs(&[v]).unwrap();
        assert_close(belief.row(0).as_slice().unwrap(), &root_prior, 1e-6);
    }
}
