use std::rc::Rc;

use super::combination_table::CombinationTable;
use super::node::{NodeRef, Port, VarId};
use super::variable::VariableNode;

/// A factor node: a shared reference to a [`CombinationTable`] plus one port
/// per incident variable, in the same order as the table's columns.
#[derive(Debug, Clone)]
pub struct FactorNode {
    table: Rc<CombinationTable>,
    pub(crate) var_ids: Vec<VarId>,
    pub(crate) ports: Vec<Port>,
}

impl FactorNode {
    pub(crate) fn new(table: Rc<CombinationTable>, var_ids: Vec<VarId>) -> Self {
        FactorNode {
            table,
            var_ids,
            ports: Vec::new(),
        }
    }

    /// The shared combination table this factor scores against.
    #[inline]
    pub fn table(&self) -> &Rc<CombinationTable> {
        &self.table
    }

    /// The incident variables, in port order.
    #[inline]
    pub fn var_ids(&self) -> &[VarId] {
        &self.var_ids
    }

    /// Degree (number of incident variables); equal to the table's arity.
    #[inline]
    pub fn degree(&self) -> usize {
        self.ports.len()
    }

    pub(crate) fn initialize(&mut self) {
        for port in self.ports.iter_mut() {
            port.initialize();
        }
    }

    /// Sum-product update for a single outgoing port, performed in
    /// probability space (table rows are expected to be few enough that
    /// underflow is not the dominant concern here, unlike the variable
    /// update). Rewrites the sibling (variable-side) inbound buffer.
    fn update_port(&self, out: usize, variables: &mut [VariableNode]) {
        let m = variables[self.var_ids[out]].domain_len();
        let mut outbound = vec![0.0; m];

        for r in 0..self.table.num_rows() {
            let assignment = self.table.row(r);
            let w = self.table.weight(r);
            let mut prob = w;
            for (q, port) in self.ports.iter().enumerate() {
                if q != out {
                    prob *= port.inbound[assignment[q]];
                }
            }
            outbound[assignment[out]] += prob;
        }

        let sum: f64 = outbound.iter().sum();
        if sum != 0.0 {
            for v in outbound.iter_mut() {
                *v /= sum;
            }
        }

        let sibling = self.ports[out].sibling;
        let sibling_port = self.ports[out].sibling_port;
        let NodeRef::Variable(vid) = sibling else {
            unreachable!("a factor port's sibling is always a variable");
        };
        variables[vid].ports[sibling_port].inbound.copy_from_slice(&outbound);
    }

    pub(crate) fn update(&self, variables: &mut [VariableNode]) {
        for out in 0..self.ports.len() {
            self.update_port(out, variables);
        }
    }
}
