use super::error::{GraphError, GraphResult};
use super::factor::FactorNode;
use super::node::{FactorId, NodeRef, Port};

/// Pseudo-zero used in place of `log(0)`.
///
/// The reference implementation floors at `-100` rather than `f64::NEG_INFINITY`
/// so that one impossible assignment degrades a message to "very unlikely"
/// instead of poisoning the whole sum with an infinity. Tests depend on this
/// exact constant.
pub(crate) const LOG_FLOOR: f64 = -100.0;

#[inline]
pub(crate) fn safe_log(x: f64) -> f64 {
    if x > 0.0 {
        x.ln()
    } else {
        LOG_FLOOR
    }
}

/// A discrete random variable: an alphabet size, a prior distribution, and
/// one port per incident factor (insertion order is the factor's port index
/// on its side of the edge).
#[derive(Debug, Clone)]
pub struct VariableNode {
    domain_len: usize,
    prior: Vec<f64>,
    pub(crate) ports: Vec<Port>,
}

impl VariableNode {
    pub(crate) fn new(domain_len: usize) -> Self {
        let val = 1.0 / domain_len as f64;
        VariableNode {
            domain_len,
            prior: vec![val; domain_len],
            ports: Vec::new(),
        }
    }

    pub(crate) fn with_prior(domain_len: usize, prior: Vec<f64>) -> Self {
        VariableNode {
            domain_len,
            prior,
            ports: Vec::new(),
        }
    }

    /// The size of this variable's alphabet.
    #[inline]
    pub fn domain_len(&self) -> usize {
        self.domain_len
    }

    /// The current prior distribution.
    #[inline]
    pub fn prior(&self) -> &[f64] {
        &self.prior
    }

    /// Degree (number of incident factors).
    #[inline]
    pub fn degree(&self) -> usize {
        self.ports.len()
    }

    /// Replaces the prior. Fails with [`GraphError::Shape`] if the length
    /// doesn't match the alphabet, or [`GraphError::Normalization`] if it
    /// doesn't sum to 1 within `1e-15`. Leaves the prior untouched on
    /// failure.
    pub fn set_priors(&mut self, p: &[f64]) -> GraphResult<()> {
        if p.len() != self.domain_len {
            return Err(GraphError::Shape {
                expected: self.domain_len,
                got: p.len(),
            });
        }
        let sum: f64 = p.iter().sum();
        if (sum - 1.0).abs() > 1e-15 {
            return Err(GraphError::Normalization { sum });
        }
        self.prior.copy_from_slice(p);
        Ok(())
    }

    /// Registers a new port on this variable, paired with the given factor
    /// port, and seeds both directed messages to uniform.
    pub(crate) fn connect(&mut self, factor_id: FactorId, factor_port_index: usize) -> usize {
        let port = Port::new(self.domain_len, NodeRef::Factor(factor_id), factor_port_index);
        self.ports.push(port);
        self.ports.len() - 1
    }

    /// Resets every port (both directed messages) to uniform. Priors are
    /// untouched.
    pub(crate) fn initialize(&mut self) {
        for port in self.ports.iter_mut() {
            port.initialize();
        }
    }

    /// Sum-product update, performed in the log domain. Rewrites the
    /// sibling (factor-side) inbound buffer of every port.
    pub(crate) fn update(&self, factors: &mut [FactorNode]) {
        let d = self.ports.len();
        let m = self.domain_len;

        let mut alpha = vec![0.0; m];
        for (val, a) in self.prior.iter().zip(alpha.iter_mut()) {
            *a = safe_log(*val);
        }
        for port in &self.ports {
            for (mu, a) in port.inbound.iter().zip(alpha.iter_mut()) {
                *a += safe_log(*mu);
            }
        }

        for out in 0..d {
            let mut beta = vec![0.0; m];
            let mut max_beta = f64::NEG_INFINITY;
            for k in 0..m {
                beta[k] = alpha[k] - safe_log(self.ports[out].inbound[k]);
                if beta[k] > max_beta {
                    max_beta = beta[k];
                }
            }
            let mut sum = 0.0;
            for b in beta.iter_mut() {
                *b = (*b - max_beta).exp();
                sum += *b;
            }
            for b in beta.iter_mut() {
                *b /= sum;
            }

            let sibling = self.ports[out].sibling;
            let sibling_port = self.ports[out].sibling_port;
            let NodeRef::Factor(fid) = sibling else {
                unreachable!("a variable port's sibling is always a factor");
            };
            factors[fid].ports[sibling_port].inbound.copy_from_slice(&beta);
        }
    }

    /// Normalized marginal belief: `prior * product of all incoming
    /// messages`, computed with the same log-floor and max-subtract scheme
    /// as [`VariableNode::update`].
    ///
    /// Because the max-subtract step always leaves the best-scoring
    /// assignment at `exp(0) == 1`, the renormalization sum can never
    /// literally be zero under this scheme, so a sum-to-zero check would
    /// never fire. Instead this tracks, per assignment, whether any prior
    /// entry or incoming message actually hit the zero floor; if every
    /// assignment did, the belief is degenerate — every possibility has been
    /// declared impossible by some piece of evidence, and there is no
    /// surviving candidate to normalize onto. A high-degree variable with
    /// many merely-unlikely (but nonzero) messages never trips this, however
    /// low its unnormalized log-belief gets.
    pub(crate) fn beliefs(&self) -> GraphResult<Vec<f64>> {
        let m = self.domain_len;
        let mut log_b = vec![0.0; m];
        let mut floored = vec![false; m];
        for (val, (b, fl)) in self.prior.iter().zip(log_b.iter_mut().zip(floored.iter_mut())) {
            *b += safe_log(*val);
            *fl |= *val <= 0.0;
        }
        for port in &self.ports {
            for (mu, (b, fl)) in port.inbound.iter().zip(log_b.iter_mut().zip(floored.iter_mut())) {
                *b += safe_log(*mu);
                *fl |= *mu <= 0.0;
            }
        }
        if floored.iter().all(|&f| f) {
            return Err(GraphError::Degenerate);
        }
        let max_log = log_b.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mut out = vec![0.0; m];
        let mut sum = 0.0;
        for (o, l) in out.iter_mut().zip(log_b.iter()) {
            *o = (l - max_log).exp();
            sum += *o;
        }
        for o in out.iter_mut() {
            *o /= sum;
        }
        Ok(out)
    }
}
