use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use ndarray::{Array2, ArrayView1, ArrayView2};

use super::combination_table::CombinationTable;
use super::error::{GraphError, GraphResult};
use super::factor::FactorNode;
use super::factor_graph::FactorGraph;
use super::node::{FactorId, GraphId, NodeRef, Port, TableId, VarId};
use super::variable::VariableNode;

/// Process-local arena owning every variable, factor, combination table and
/// factor graph, each addressed by a dense integer id stable for the
/// lifetime of this registry.
///
/// All cross-references — port siblings, a graph's variable/factor lists,
/// nesting — are plain indices into this registry's arenas rather than
/// owning pointers; this is what lets instantiation and nesting be
/// implemented without reference cycles or shared mutable aliasing.
/// Registry operations are not thread-safe; concurrency across registries,
/// or around a single registry, is the caller's responsibility.
#[derive(Debug, Default)]
pub struct Registry {
    variables: Vec<VariableNode>,
    factors: Vec<FactorNode>,
    tables: Vec<Rc<CombinationTable>>,
    graphs: Vec<FactorGraph>,
    free_vars: Vec<VarId>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Registry::default()
    }

    fn check_graph(&self, graph_id: GraphId) -> GraphResult<()> {
        if graph_id < self.graphs.len() {
            Ok(())
        } else {
            Err(GraphError::NotFound)
        }
    }

    fn check_var(&self, var_id: VarId) -> GraphResult<()> {
        if var_id < self.variables.len() {
            Ok(())
        } else {
            Err(GraphError::NotFound)
        }
    }

    // -- construction -----------------------------------------------------

    /// Creates a new free-pool variable with alphabet size `m` and a uniform
    /// prior, returning its id.
    pub fn new_variable(&mut self, m: usize) -> VarId {
        let id = self.variables.len();
        self.variables.push(VariableNode::new(m));
        self.free_vars.push(id);
        id
    }

    /// Creates a new master graph whose boundary/argument variables are
    /// `arg_vars`.
    pub fn new_graph(&mut self, arg_vars: &[VarId]) -> GraphResult<GraphId> {
        for &v in arg_vars {
            self.check_var(v)?;
        }
        let id = self.graphs.len();
        self.graphs.push(FactorGraph::new(arg_vars.to_vec(), true));
        Ok(id)
    }

    /// Mints a combination table from a `[rows x arity]` assignment matrix
    /// and a per-row weight, recording it as owned by `graph_id`.
    pub fn create_table(
        &mut self,
        graph_id: GraphId,
        rows: ArrayView2<usize>,
        weights: ArrayView1<f64>,
    ) -> GraphResult<TableId> {
        self.check_graph(graph_id)?;
        let table = CombinationTable::new(rows, weights)?;
        let table_id = self.tables.len();
        self.tables.push(Rc::new(table));
        self.graphs[graph_id].owned_tables.push(table_id);
        Ok(table_id)
    }

    /// Binds `table_id` to `vars` as a new factor of `graph_id`. Any
    /// variable in `vars` not already known to `graph_id` is adopted as
    /// owned. Fails with [`GraphError::Frozen`] if the graph is already
    /// frozen, [`GraphError::Shape`] if `vars.len()` doesn't match the
    /// table's arity.
    pub fn create_factor(
        &mut self,
        graph_id: GraphId,
        table_id: TableId,
        vars: &[VarId],
    ) -> GraphResult<FactorId> {
        self.check_graph(graph_id)?;
        for &v in vars {
            self.check_var(v)?;
        }
        if self.graphs[graph_id].is_frozen {
            return Err(GraphError::Frozen);
        }
        let table = self.tables.get(table_id).ok_or(GraphError::NotFound)?.clone();
        if vars.len() != table.arity() {
            return Err(GraphError::Shape {
                expected: table.arity(),
                got: vars.len(),
            });
        }
        self.graphs[graph_id].adopt(vars);
        let factor_id = self.create_factor_raw(vars, table);
        self.graphs[graph_id].owned_funcs.push(factor_id);
        Ok(factor_id)
    }

    /// Pushes a fresh, fully-wired factor into the arenas. Assumes
    /// `vars.len() == table.arity()` has already been checked.
    fn create_factor_raw(&mut self, vars: &[VarId], table: Rc<CombinationTable>) -> FactorId {
        let factor_id = self.factors.len();
        self.factors.push(FactorNode::new(table, vars.to_vec()));
        for (i, &vid) in vars.iter().enumerate() {
            let var_port_index = self.variables[vid].connect(factor_id, i);
            let m = self.variables[vid].domain_len();
            self.factors[factor_id]
                .ports
                .push(Port::new(m, NodeRef::Variable(vid), var_port_index));
        }
        factor_id
    }

    /// Nests a fresh instance of `template_id` into `parent_id`, binding the
    /// template's boundary variables to `args`. Any variable in `args` not
    /// already known to `parent_id` is adopted as owned. Fails if
    /// `parent_id` is frozen, or if instantiation fails (arity/domain
    /// mismatch, dangling reference).
    pub fn nest_graph(
        &mut self,
        parent_id: GraphId,
        template_id: GraphId,
        args: &[VarId],
    ) -> GraphResult<()> {
        self.check_graph(parent_id)?;
        self.check_graph(template_id)?;
        if self.graphs[parent_id].is_frozen {
            return Err(GraphError::Frozen);
        }
        self.graphs[parent_id].adopt(args);
        let instance_id = self.instantiate_internal(template_id, args)?;
        let (all_funcs, owned_vars, nested_vars) = {
            let g = &self.graphs[instance_id];
            (g.all_funcs.clone(), g.owned_vars.clone(), g.nested_vars.clone())
        };
        let parent = &mut self.graphs[parent_id];
        parent.nested_funcs.extend(all_funcs);
        parent.nested_vars.extend(owned_vars);
        parent.nested_vars.extend(nested_vars);
        parent.nested_graphs.push(instance_id);
        Ok(())
    }

    /// Instantiates `template_id` as a new, standalone, registered graph,
    /// binding its boundary variables to `args`.
    pub fn new_instance(&mut self, template_id: GraphId, args: &[VarId]) -> GraphResult<GraphId> {
        self.check_graph(template_id)?;
        self.instantiate_internal(template_id, args)
    }

    fn instantiate_internal(&mut self, template_id: GraphId, args: &[VarId]) -> GraphResult<GraphId> {
        for &v in args {
            self.check_var(v)?;
        }
        self.freeze(template_id);

        let template_arg_vars = self.graphs[template_id].arg_vars.clone();
        let template_owned_vars = self.graphs[template_id].owned_vars.clone();
        let template_owned_funcs = self.graphs[template_id].owned_funcs.clone();
        let template_nested_graphs = self.graphs[template_id].nested_graphs.clone();

        if args.len() != template_arg_vars.len() {
            return Err(GraphError::Arity {
                expected: template_arg_vars.len(),
                got: args.len(),
            });
        }
        for (&a, &t) in args.iter().zip(template_arg_vars.iter()) {
            let expected = self.variables[t].domain_len();
            let got = self.variables[a].domain_len();
            if expected != got {
                return Err(GraphError::DomainMismatch { expected, got });
            }
        }

        // Pre-validate that every reference an owned factor or a nested
        // subgraph's arg list makes is reachable through the template's own
        // arg-or-owned variables, before mutating anything: this keeps a
        // failed instantiation from registering a half-built clone.
        let known: HashSet<VarId> = template_arg_vars
            .iter()
            .chain(template_owned_vars.iter())
            .copied()
            .collect();
        for &f in &template_owned_funcs {
            for &v in self.factors[f].var_ids() {
                if !known.contains(&v) {
                    return Err(GraphError::Reference);
                }
            }
        }
        for &g in &template_nested_graphs {
            for &v in &self.graphs[g].arg_vars {
                if !known.contains(&v) {
                    return Err(GraphError::Reference);
                }
            }
        }

        let mut old_to_new: HashMap<VarId, VarId> = HashMap::new();
        for (&old, &new) in template_arg_vars.iter().zip(args.iter()) {
            old_to_new.insert(old, new);
        }

        let clone_id = self.graphs.len();
        self.graphs.push(FactorGraph::new(args.to_vec(), false));

        for &old_v in &template_owned_vars {
            let domain_len = self.variables[old_v].domain_len();
            let prior = self.variables[old_v].prior().to_vec();
            let new_v = self.variables.len();
            self.variables.push(VariableNode::with_prior(domain_len, prior));
            self.graphs[clone_id].owned_vars.push(new_v);
            old_to_new.insert(old_v, new_v);
        }

        for &old_f in &template_owned_funcs {
            let table = self.factors[old_f].table().clone();
            let old_vars = self.factors[old_f].var_ids().to_vec();
            let new_vars: Vec<VarId> = old_vars.iter().map(|v| old_to_new[v]).collect();
            let new_f = self.create_factor_raw(&new_vars, table);
            self.graphs[clone_id].owned_funcs.push(new_f);
        }

        for &old_sub in &template_nested_graphs {
            let sub_arg_vars = self.graphs[old_sub].arg_vars.clone();
            let mapped_args: Vec<VarId> = sub_arg_vars.iter().map(|v| old_to_new[v]).collect();
            self.nest_graph(clone_id, old_sub, &mapped_args)?;
        }

        self.graphs[clone_id].freeze();
        Ok(clone_id)
    }

    // -- priors / beliefs --------------------------------------------------

    /// Replaces the priors of `var_ids` in one atomic step: either every row
    /// validates (correct length, sums to 1 within `1e-15`) and all are
    /// applied, or none are.
    pub fn set_priors(&mut self, var_ids: &[VarId], priors: ArrayView2<f64>) -> GraphResult<()> {
        for &v in var_ids {
            self.check_var(v)?;
        }
        if priors.nrows() != var_ids.len() {
            return Err(GraphError::Shape {
                expected: var_ids.len(),
                got: priors.nrows(),
            });
        }
        for (i, &vid) in var_ids.iter().enumerate() {
            let row = priors.row(i);
            let m = self.variables[vid].domain_len();
            if row.len() != m {
                return Err(GraphError::Shape { expected: m, got: row.len() });
            }
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > 1e-15 {
                return Err(GraphError::Normalization { sum });
            }
        }
        for (i, &vid) in var_ids.iter().enumerate() {
            let row: Vec<f64> = priors.row(i).to_vec();
            self.variables[vid]
                .set_priors(&row)
                .expect("shape and normalization already validated above");
        }
        Ok(())
    }

    /// Returns the `[var_ids.len() x M]` marginal belief of each variable in
    /// `var_ids`. Fails with [`GraphError::Degenerate`] if any variable's
    /// belief normalization sum is zero.
    pub fn get_beliefs(&self, var_ids: &[VarId]) -> GraphResult<Array2<f64>> {
        for &v in var_ids {
            self.check_var(v)?;
        }
        if var_ids.is_empty() {
            return Ok(Array2::zeros((0, 0)));
        }
        let m = self.variables[var_ids[0]].domain_len();
        let mut flat = Vec::with_capacity(var_ids.len() * m);
        for &v in var_ids {
            let b = self.variables[v].beliefs()?;
            if b.len() != m {
                return Err(GraphError::Shape { expected: m, got: b.len() });
            }
            flat.extend(b);
        }
        Array2::from_shape_vec((var_ids.len(), m), flat).map_err(|_| GraphError::Shape {
            expected: m,
            got: 0,
        })
    }

    // -- solve protocol -----------------------------------------------------

    fn freeze(&mut self, graph_id: GraphId) {
        self.graphs[graph_id].freeze();
    }

    /// Sets the iteration count used by `solve` for *every* graph currently
    /// in the registry — this is a registry-wide setting, not a per-graph
    /// one (see the design notes: preserved from the reference
    /// implementation for compatibility, and flagged there as surprising).
    pub fn set_num_iterations(&mut self, n: usize) {
        for g in self.graphs.iter_mut() {
            g.num_iterations = n;
        }
    }

    /// Freezes `graph_id` if needed, then resets every directed message of
    /// every variable and factor in its schedule to uniform. Priors are
    /// untouched.
    pub fn initialize(&mut self, graph_id: GraphId) -> GraphResult<()> {
        self.check_graph(graph_id)?;
        self.freeze(graph_id);
        let (all_vars, all_funcs) = {
            let g = &self.graphs[graph_id];
            (g.all_vars.clone(), g.all_funcs.clone())
        };
        for v in all_vars {
            self.variables[v].initialize();
        }
        for f in all_funcs {
            self.factors[f].initialize();
        }
        Ok(())
    }

    /// Freezes `graph_id` if needed, then performs `k` rounds of
    /// synchronous-by-class sum-product updates: every variable updates (in
    /// schedule order), then every factor updates (in schedule order).
    pub fn iterate(&mut self, graph_id: GraphId, k: usize) -> GraphResult<()> {
        self.check_graph(graph_id)?;
        self.freeze(graph_id);
        let (all_vars, all_funcs) = {
            let g = &self.graphs[graph_id];
            (g.all_vars.clone(), g.all_funcs.clone())
        };
        for _ in 0..k {
            for &v in &all_vars {
                self.variables[v].update(&mut self.factors);
            }
            for &f in &all_funcs {
                self.factors[f].update(&mut self.variables);
            }
        }
        Ok(())
    }

    /// Freezes, initializes, then iterates `graph_id` for its configured
    /// `num_iterations`. Fails with [`GraphError::Config`] if
    /// `num_iterations == 0`.
    pub fn solve(&mut self, graph_id: GraphId) -> GraphResult<()> {
        self.check_graph(graph_id)?;
        self.freeze(graph_id);
        let n = self.graphs[graph_id].num_iterations;
        if n == 0 {
            return Err(GraphError::Config);
        }
        self.initialize(graph_id)?;
        self.iterate(graph_id, n)
    }

    // -- introspection -------------------------------------------------------

    /// Freezes `graph_id` if needed, then returns its full variable
    /// schedule (`arg_vars ⧺ owned_vars ⧺ nested_vars`).
    pub fn graph_variables(&mut self, graph_id: GraphId) -> GraphResult<Vec<VarId>> {
        self.check_graph(graph_id)?;
        self.freeze(graph_id);
        Ok(self.graphs[graph_id].all_vars.clone())
    }

    /// Freezes `graph_id` if needed, then returns its full factor schedule
    /// (`owned_funcs ⧺ nested_funcs`).
    pub fn graph_factors(&mut self, graph_id: GraphId) -> GraphResult<Vec<FactorId>> {
        self.check_graph(graph_id)?;
        self.freeze(graph_id);
        Ok(self.graphs[graph_id].all_funcs.clone())
    }

    /// The variables incident to `factor_id`, in port order.
    pub fn connected_variables(&self, factor_id: FactorId) -> GraphResult<Vec<VarId>> {
        self.factors
            .get(factor_id)
            .map(|f| f.var_ids().to_vec())
            .ok_or(GraphError::NotFound)
    }

    /// Resolves a graph-scoped variable handle: `graph_id = None` addresses
    /// the free pool (by creation order); `Some(id)` addresses that graph's
    /// own `owned_vars`, positionally — matching the reference
    /// implementation's `(graphId, varId)` addressing scheme, where
    /// `graphId == -1` meant the free pool.
    pub fn get_variable(&self, graph_id: Option<GraphId>, local_id: usize) -> GraphResult<VarId> {
        match graph_id {
            None => self.free_vars.get(local_id).copied().ok_or(GraphError::NotFound),
            Some(gid) => {
                let g = self.graphs.get(gid).ok_or(GraphError::NotFound)?;
                g.owned_vars.get(local_id).copied().ok_or(GraphError::NotFound)
            }
        }
    }

    /// The graph record itself, for read-only introspection
    /// (`is_frozen`, `is_master`, `arg_vars`, ...).
    pub fn get_graph(&self, graph_id: GraphId) -> GraphResult<&FactorGraph> {
        self.graphs.get(graph_id).ok_or(GraphError::NotFound)
    }

    /// A variable's alphabet size and current prior.
    pub fn variable_info(&self, var_id: VarId) -> GraphResult<(usize, &[f64])> {
        let v = self.variables.get(var_id).ok_or(GraphError::NotFound)?;
        Ok((v.domain_len(), v.prior()))
    }

    /// Tears down all state: every graph, free variable and table.
    pub fn clear(&mut self) {
        self.graphs.clear();
        self.factors.clear();
        self.variables.clear();
        self.tables.clear();
        self.free_vars.clear();
    }
}
