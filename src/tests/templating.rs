use std::collections::HashSet;

use ndarray::Array2;

use crate::core::GraphError;

use super::{assert_close, expect_err, set_certain, xor3_table};

fn build_xor_gate_template(reg: &mut crate::core::Registry) -> usize {
    let in1 = reg.new_variable(2);
    let in2 = reg.new_variable(2);
    let out = reg.new_variable(2);
    let template = reg.new_graph(&[in1, in2, out]).unwrap();
    let table = xor3_table(reg, template);
    reg.create_factor(template, table, &[in1, in2, out]).unwrap();
    template
}

/// `FourBitXor`: boundary bits `b0..b3` plus one internal bit `c`, built as
/// two XOR factors `xor(b0,b1,c)` and `xor(b2,b3,c)`.
fn build_four_bit_xor_template(reg: &mut crate::core::Registry) -> usize {
    let b0 = reg.new_variable(2);
    let b1 = reg.new_variable(2);
    let b2 = reg.new_variable(2);
    let b3 = reg.new_variable(2);
    let template = reg.new_graph(&[b0, b1, b2, b3]).unwrap();
    let table = xor3_table(reg, template);
    let c = reg.new_variable(2);
    reg.create_factor(template, table, &[b0, b1, c]).unwrap();
    reg.create_factor(template, table, &[b2, b3, c]).unwrap();
    template
}

/// S3: chaining four instances of a single XOR-gate template, via
/// `nest_graph`, computes the running parity of a five-bit sequence.
#[test]
fn four_bit_xor_chain_via_template_nesting() {
    let mut reg = crate::core::Registry::new();
    let template = build_xor_gate_template(&mut reg);

    let bits = [1usize, 1, 0, 1];
    let w0 = reg.new_variable(2);
    let inputs: Vec<usize> = (0..4).map(|_| reg.new_variable(2)).collect();
    let wires: Vec<usize> = (0..4).map(|_| reg.new_variable(2)).collect();

    let master = reg.new_graph(&[]).unwrap();
    let mut prev = w0;
    for i in 0..4 {
        reg.nest_graph(master, template, &[prev, inputs[i], wires[i]])
            .unwrap();
        prev = wires[i];
    }

    set_certain(&mut reg, w0, 0, 2);
    for (i, &b) in bits.iter().enumerate() {
        set_certain(&mut reg, inputs[i], b, 2);
    }
    reg.set_num_iterations(8);
    reg.solve(master).unwrap();

    let parity = bits.iter().fold(0usize, |acc, &b| acc ^ b);
    let mut want = vec![0.0, 0.0];
    want[parity] = 1.0;
    let beliefs = reg.get_beliefs(&[wires[3]]).unwrap();
    assert_close(beliefs.row(0).as_slice().unwrap(), &want, 1e-6);
}

/// Two independent instances of a template with a hidden internal variable
/// do not share that variable's state: solving one has no effect on the
/// other's beliefs.
#[test]
fn instances_do_not_share_hidden_state() {
    let mut reg = crate::core::Registry::new();
    let wire_in = reg.new_variable(2);
    let hidden = reg.new_variable(2);
    let wire_out = reg.new_variable(2);
    let template = reg.new_graph(&[wire_in, wire_out]).unwrap();
    let eq_table = super::equality_table(&mut reg, template);
    reg.create_factor(template, eq_table, &[wire_in, hidden]).unwrap();
    reg.create_factor(template, eq_table, &[hidden, wire_out]).unwrap();

    let a_in = reg.new_variable(2);
    let a_out = reg.new_variable(2);
    let b_in = reg.new_variable(2);
    let b_out = reg.new_variable(2);
    let instance_a = reg.new_instance(template, &[a_in, a_out]).unwrap();
    let instance_b = reg.new_instance(template, &[b_in, b_out]).unwrap();

    set_certain(&mut reg, a_in, 1, 2);
    set_certain(&mut reg, b_in, 0, 2);
    reg.set_num_iterations(4);
    reg.solve(instance_a).unwrap();
    reg.solve(instance_b).unwrap();

    let a = reg.get_beliefs(&[a_out]).unwrap();
    let b = reg.get_beliefs(&[b_out]).unwrap();
    assert_close(a.row(0).as_slice().unwrap(), &[0.0, 1.0], 1e-9);
    assert_close(b.row(0).as_slice().unwrap(), &[1.0, 0.0], 1e-9);
}

#[test]
fn instance_arity_mismatch_is_rejected() {
    let mut reg = crate::core::Registry::new();
    let template = build_xor_gate_template(&mut reg);
    let a = reg.new_variable(2);
    let b = reg.new_variable(2);
    expect_err(
        reg.new_instance(template, &[a, b]),
        GraphError::Arity { expected: 3, got: 2 },
    );
}

#[test]
fn instance_domain_mismatch_is_rejected() {
    let mut reg = crate::core::Registry::new();
    let template = build_xor_gate_template(&mut reg);
    let a = reg.new_variable(2);
    let b = reg.new_variable(2);
    let c = reg.new_variable(3);
    expect_err(
        reg.new_instance(template, &[a, b, c]),
        GraphError::DomainMismatch { expected: 2, got: 3 },
    );
}

/// S3: nesting the *same* template twice into one host graph, with the two
/// nests sharing some of their boundary variables (`c0`, `c1`, `c5` are
/// passed as args to both `nest_graph` calls), correctly clones a fresh
/// internal variable per nest rather than aliasing the two instances'
/// hidden state — the identity-preserving binding spec.md calls out as the
/// architecturally hard part of the system.
#[test]
fn repeated_nesting_shares_boundary_vars_without_aliasing_internal_state() {
    let mut reg = crate::core::Registry::new();
    let template = build_four_bit_xor_template(&mut reg);

    let bits: Vec<usize> = (0..6).map(|_| reg.new_variable(2)).collect();
    let host = reg.new_graph(&[]).unwrap();
    reg.nest_graph(host, template, &[bits[0], bits[1], bits[3], bits[5]])
        .unwrap();
    reg.nest_graph(host, template, &[bits[0], bits[1], bits[4], bits[5]])
        .unwrap();

    // Host adopts the five bits actually referenced (c2 is left untouched),
    // plus one freshly cloned internal variable per nest: the two nests do
    // not collapse onto a single shared hidden variable.
    let all_vars = reg.graph_variables(host).unwrap();
    assert_eq!(all_vars.len(), 7);
    assert_eq!(all_vars.iter().copied().collect::<HashSet<_>>().len(), 7);
    assert!(!all_vars.contains(&bits[2]));
    assert_eq!(reg.graph_factors(host).unwrap().len(), 4);

    let priors = [0.75, 0.6, 0.9, 0.1, 0.2, 0.9];
    for (i, &b) in bits.iter().enumerate() {
        let row = Array2::from_shape_vec((1, 2), vec![priors[i], 1.0 - priors[i]]).unwrap();
        reg.set_priors(&[b], row.view()).unwrap();
    }
    reg.set_num_iterations(20);
    reg.solve(host).unwrap();

    for &b in &bits {
        let belief = reg.get_beliefs(&[b]).unwrap();
        let row = belief.row(0);
        assert!(row.iter().all(|v| v.is_finite()), "NaN/non-finite belief");
        let sum: f64 = row.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "belief does not sum to 1: {}", sum);
    }
}
