/// Dense integer handle for a variable, stable for the lifetime of the
/// registry that issued it.
pub type VarId = usize;

/// Dense integer handle for a factor.
pub type FactorId = usize;

/// Dense integer handle for a combination table.
pub type TableId = usize;

/// Dense integer handle for a factor graph.
pub type GraphId = usize;

/// The node at the far end of a port, tagged by kind.
///
/// This is the arena-friendly replacement for the inheritance-based
/// `INode` the reference implementation uses to let a port's "connected
/// node" be either a variable or a factor: rather than a pointer to a base
/// class, it is a small tagged union carrying the index of the node within
/// its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    Variable(VarId),
    Factor(FactorId),
}

/// One directed edge endpoint.
///
/// `inbound` is the message flowing *into* this port's parent node.
/// `sibling`/`sibling_port` address the port at the opposite end of the
/// edge: writing to `inbound` there is how this node sends its outbound
/// message, modeling the undirected edge as a pair of ports that each own
/// one direction.
#[derive(Debug, Clone)]
pub struct Port {
    pub(crate) inbound: Vec<f64>,
    pub(crate) sibling: NodeRef,
    pub(crate) sibling_port: usize,
}

impl Port {
    pub(crate) fn new(domain_len: usize, sibling: NodeRef, sibling_port: usize) -> Self {
        let val = 1.0 / domain_len as f64;
        Port {
            inbound: vec![val; domain_len],
            sibling,
            sibling_port,
        }
    }

    /// Resets this port's inbound message to the uniform distribution.
    #[inline]
    pub fn initialize(&mut self) {
        let val = 1.0 / self.inbound.len() as f64;
        for m in self.inbound.iter_mut() {
            *m = val;
        }
    }

    /// The message flowing into this port's parent node.
    #[inline]
    pub fn inbound(&self) -> &[f64] {
        &self.inbound
    }

    /// The node at the other end of this port's edge.
    #[inline]
    pub fn connected_node(&self) -> NodeRef {
        self.sibling
    }
}
