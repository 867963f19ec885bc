//! Runtime routines the emitted IR calls into: the per-operation shadow
//! update.

use crate::config::Config;
use crate::opinfo::{Addr, InfluenceSet, ShadowOpInfo};
use crate::real::Real;
use crate::symbolic::Expr;
use crate::value::{ShadowValue, ShadowValueId, ValueStore};
use std::collections::HashMap;
use std::rc::Rc;

/// Registry of op sites, keyed by their static address. One entry persists
/// for the whole run once an address has executed at least once.
#[derive(Default)]
pub struct OpSiteTable {
    sites: HashMap<Addr, ShadowOpInfo>,
}

impl OpSiteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the op site at `addr`, creating it on first use.
    pub fn resolve(&mut self, op_name: &'static str, addr: Addr, block_addr: Addr) -> &mut ShadowOpInfo {
        self.sites
            .entry(addr)
            .or_insert_with(|| ShadowOpInfo::new(op_name, addr, block_addr))
    }

    /// Iterate every op site seen so far, for the reporter.
    pub fn iter(&self) -> impl Iterator<Item = &ShadowOpInfo> {
        self.sites.values()
    }
}

/// One operand to a shadow operation: its `Real` and, if tracked, its
/// symbolic expression and influence set.
pub struct Operand<'a> {
    pub real: &'a Real,
    /// The host's own concrete double for this operand, as distinct from
    /// `real` (which may already carry inherited shadow imprecision).
    /// Used to isolate this op's own rounding from whatever error its
    /// operands brought in.
    pub host: f64,
    pub expr: Option<Rc<Expr>>,
    pub influences: &'a InfluenceSet,
}

/// Runs the seven-step routine of an instrumented arithmetic operation.
pub struct ShadowOpExecutor<'a> {
    config: &'a Config,
}

impl<'a> ShadowOpExecutor<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Execute one arithmetic op: resolve the site, compute the shadow
    /// result, update error/expression/influence bookkeeping, and allocate
    /// the result value.
    ///
    /// `operands` carries each argument's `Real` plus tracked metadata;
    /// `host_result` is the concrete host float (as an f64, already widened
    /// if the op is single-precision) the shadow result is compared
    /// against; `compute` performs the actual arithmetic over the gathered
    /// `Real`s.
    #[allow(clippy::too_many_arguments)]
    pub fn execute(
        &self,
        sites: &mut OpSiteTable,
        store: &mut ValueStore,
        op_name: &'static str,
        op_addr: Addr,
        block_addr: Addr,
        result_ty: crate::types::FloatType,
        operands: &[Operand],
        host_result: f64,
        compute: impl Fn(&[&Real], u32) -> Real,
    ) -> ShadowValueId {
        let precision = self.config.precision;

        // Step 1: resolve/create the op site.
        let site = sites.resolve(op_name, op_addr, block_addr);

        // Step 2 is the caller's responsibility (it gathered `operands`,
        // synthesising shadows for any operand that had none).

        // Step 3: compute the shadow result.
        let reals: Vec<&Real> = operands.iter().map(|o| o.real).collect();
        let result_real = compute(&reals, precision);

        // Step 4: error bookkeeping. Total error is the full divergence
        // between the propagated shadow result and the host's concrete
        // result, inheriting whatever imprecision the operands already
        // carried. Local error isolates this op's own rounding alone: redo
        // the same computation at full precision but starting from the
        // operands' own concrete host doubles, so any error already baked
        // into `operands[i].real` doesn't leak into this op's score.
        let total_error = result_real.bit_error_vs_f64(host_result);
        let locally_exact_operands: Vec<Real> = operands.iter().map(|o| Real::from_f64(o.host, precision)).collect();
        let locally_exact_refs: Vec<&Real> = locally_exact_operands.iter().collect();
        let locally_exact_result = compute(&locally_exact_refs, precision);
        let local_error = locally_exact_result.bit_error_vs_f64(host_result);
        site.eagg.record(total_error, local_error);

        // Step 5: build/generalise the symbolic expression.
        //
        // Variable identity for this one dynamic call is decided by
        // concrete value: two operand positions holding the same value
        // right now (e.g. `add(x, x)`) are treated as the same variable,
        // per the design's var-map refinement. A fresh operand (no deeper
        // expression attached) contributes its own real's bits as that
        // leaf's identity; an operand that already carries a deeper
        // expression reuses its top real for every leaf under that
        // subtree, since the concrete value at each individual leaf of an
        // already-generalised tree isn't available at this call site.
        let mut result_expr = None;
        if !self.config.no_exprs {
            let mut arg_exprs: Vec<Rc<Expr>> = Vec::with_capacity(operands.len());
            let mut leaf_bits: Vec<u32> = Vec::new();
            for o in operands {
                match &o.expr {
                    Some(expr) => {
                        let n = expr.leaves().len();
                        leaf_bits.extend(std::iter::repeat(o.real.to_f32().to_bits()).take(n));
                        arg_exprs.push(Rc::clone(expr));
                    }
                    None => {
                        leaf_bits.push(o.real.to_f32().to_bits());
                        arg_exprs.push(Expr::variable());
                    }
                }
            }
            let tree = Expr::branch(op_name, arg_exprs);
            site.expr.fold(&tree, &leaf_bits);
            result_expr = Some(tree);
        }

        // Step 6: merge influences if the error crossed the threshold.
        let mut influences = InfluenceSet::new();
        if !self.config.no_influences && total_error >= self.config.error_threshold as f64 {
            influences.insert(op_addr);
            for o in operands {
                influences.merge(o.influences);
            }
        }

        // Step 7: allocate and return the result.
        let id = store.new_value(result_ty, result_real, result_expr);
        store.get_mut(id).set_influences(influences);
        id
    }
}

impl ShadowValue {
    /// Replace this value's influence set, used by the executor once it
    /// has decided whether this evaluation's error crossed the threshold.
    pub(crate) fn set_influences(&mut self, influences: InfluenceSet) {
        *self.influences_mut() = influences;
    }
}
