use super::node::{FactorId, GraphId, TableId, VarId};

/// Bookkeeping record for one graph: which variables/factors are
/// boundary/owned/nested, whether it is frozen, its iteration count, and
/// (if master) which tables it minted.
///
/// This struct owns no message state itself; `VariableNode`/`FactorNode`
/// storage lives in the owning [`super::registry::Registry`]'s arenas, and
/// this record holds only the index lists that say which of those arena
/// slots belong to this graph.
#[derive(Debug, Clone)]
pub struct FactorGraph {
    pub(crate) is_master: bool,
    pub(crate) is_frozen: bool,
    pub(crate) num_iterations: usize,

    pub(crate) arg_vars: Vec<VarId>,
    pub(crate) owned_vars: Vec<VarId>,
    pub(crate) nested_vars: Vec<VarId>,

    pub(crate) owned_funcs: Vec<FactorId>,
    pub(crate) nested_funcs: Vec<FactorId>,

    pub(crate) nested_graphs: Vec<GraphId>,
    pub(crate) owned_tables: Vec<TableId>,

    pub(crate) all_vars: Vec<VarId>,
    pub(crate) all_funcs: Vec<FactorId>,
}

impl FactorGraph {
    pub(crate) fn new(arg_vars: Vec<VarId>, is_master: bool) -> Self {
        FactorGraph {
            is_master,
            is_frozen: false,
            num_iterations: 1,
            arg_vars,
            owned_vars: Vec::new(),
            nested_vars: Vec::new(),
            owned_funcs: Vec::new(),
            nested_funcs: Vec::new(),
            nested_graphs: Vec::new(),
            owned_tables: Vec::new(),
            all_vars: Vec::new(),
            all_funcs: Vec::new(),
        }
    }

    /// Whether this graph owns the combination tables it references
    /// (as opposed to being an instance cloned from a template).
    #[inline]
    pub fn is_master(&self) -> bool {
        self.is_master
    }

    /// Whether the topology of this graph is immutable.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.is_frozen
    }

    /// The boundary/argument variables of this graph.
    #[inline]
    pub fn arg_vars(&self) -> &[VarId] {
        &self.arg_vars
    }

    /// Assembles `all_vars`/`all_funcs` from `arg_vars ⧺ owned_vars ⧺
    /// nested_vars` (respectively `owned_funcs ⧺ nested_funcs`) and marks
    /// the graph frozen. Idempotent.
    pub(crate) fn freeze(&mut self) {
        if self.is_frozen {
            return;
        }
        self.all_vars.clear();
        self.all_vars.extend_from_slice(&self.arg_vars);
        self.all_vars.extend_from_slice(&self.owned_vars);
        self.all_vars.extend_from_slice(&self.nested_vars);

        self.all_funcs.clear();
        self.all_funcs.extend_from_slice(&self.owned_funcs);
        self.all_funcs.extend_from_slice(&self.nested_funcs);

        self.is_frozen = true;
    }

    fn knows_var(&self, v: VarId) -> bool {
        self.arg_vars.contains(&v) || self.owned_vars.contains(&v) || self.nested_vars.contains(&v)
    }

    /// Adopts any variable in `vars` not already known to this graph as
    /// owned.
    pub(crate) fn adopt(&mut self, vars: &[VarId]) {
        for &v in vars {
            if !self.knows_var(v) {
                self.owned_vars.push(v);
            }
        }
    }
}
