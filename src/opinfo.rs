//! Error aggregates, op sites, and influence sets.

use crate::symbolic::Generalizer;

/// Address of a static operation or observation site in host code.
pub type Addr = u64;

/// Running error statistics for one static operation or mark.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ErrorAggregate {
    /// Largest total error (error propagated from roots) observed.
    pub max_total: f64,
    /// Sum of total errors observed, for averaging.
    pub total_total: f64,
    /// Largest local error (this op's rounding alone) observed.
    pub max_local: f64,
    /// Sum of local errors observed, for averaging.
    pub total_local: f64,
    /// Number of evaluations folded into this aggregate.
    pub num_evals: u64,
}

impl ErrorAggregate {
    /// Fold one more observation into the aggregate.
    pub fn record(&mut self, total_error: f64, local_error: f64) {
        self.max_total = self.max_total.max(total_error);
        self.total_total += total_error;
        self.max_local = self.max_local.max(local_error);
        self.total_local += local_error;
        self.num_evals += 1;
    }

    /// Fold a zero-error sample without incrementing error totals beyond
    /// the floor of zero; used when a mark fires with no shadow present.
    pub fn record_zero(&mut self) {
        self.num_evals += 1;
    }

    /// Average total error across all recorded evaluations.
    pub fn avg_total(&self) -> f64 {
        if self.num_evals == 0 {
            0.0
        } else {
            self.total_total / self.num_evals as f64
        }
    }

    /// Average local error across all recorded evaluations.
    pub fn avg_local(&self) -> f64 {
        if self.num_evals == 0 {
            0.0
        } else {
            self.total_local / self.num_evals as f64
        }
    }
}

/// A static location that performs a float operation.
///
/// Identified by `addr`, the instruction address of the op in host code;
/// one `ShadowOpInfo` exists per such address for the lifetime of the run.
#[derive(Debug, Clone)]
pub struct ShadowOpInfo {
    /// Name of the operation (`"add"`, `"mul"`, ...), for reporting.
    pub op_name: &'static str,
    /// Instruction address of this op.
    pub addr: Addr,
    /// Address of the block containing this op.
    pub block_addr: Addr,
    /// Error statistics accumulated across every dynamic evaluation.
    pub eagg: ErrorAggregate,
    /// Generalisation state for the expression tree observed at this site,
    /// absent in effect if expression tracking is disabled (never folded).
    pub expr: Generalizer,
}

impl ShadowOpInfo {
    /// Create a fresh, never-evaluated op site.
    pub fn new(op_name: &'static str, addr: Addr, block_addr: Addr) -> Self {
        Self {
            op_name,
            addr,
            block_addr,
            eagg: ErrorAggregate::default(),
            expr: Generalizer::new(),
        }
    }
}

/// An ordered, de-duplicated set of op-site references.
///
/// `B` *influences* `A` when `A`'s error at some time included `B` because
/// `B`'s error exceeded the threshold and flowed into one of `A`'s
/// operands. Represented as a flat `Vec` rather than a `HashSet` because
/// influence sets are small in practice and merges are append-then-dedup,
/// which is cheaper than hashing for the common case of one or two
/// members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfluenceSet(Vec<Addr>);

impl InfluenceSet {
    /// An empty influence set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one op-site address, preserving insertion order and
    /// uniqueness.
    pub fn insert(&mut self, addr: Addr) {
        if !self.0.contains(&addr) {
            self.0.push(addr);
        }
    }

    /// Merge `other` into `self`, pointwise and de-duplicated.
    pub fn merge(&mut self, other: &InfluenceSet) {
        for &addr in &other.0 {
            self.insert(addr);
        }
    }

    /// Iterate the member addresses in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Addr> + '_ {
        self.0.iter().copied()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no op site has influenced this one yet.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
