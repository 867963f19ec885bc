//! User-visible observation points: client requests the instrumented
//! program issues to mark an address as interesting, or to report a
//! mismatch at the boundary where a float escapes shadow tracking.

use crate::config::Config;
use crate::opinfo::{Addr, ErrorAggregate, InfluenceSet};
use crate::real::Real;
use crate::symbolic::{Expr, Generalizer};
use crate::value::ShadowValueId;
use std::collections::HashMap;
use std::rc::Rc;

/// Kind of a float-escape observation: the value left shadow tracking by
/// being converted to an integer, truncated, or otherwise consumed in a
/// way this engine can't follow further.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeKind {
    ToInt,
    Truncate,
    Other,
}

/// One client request recognised at the embedding tool's request hook.
#[derive(Debug, Clone)]
pub enum ClientRequest {
    Begin,
    End,
    MarkImportant(Addr),
    MaybeMarkImportant(Addr),
    Escape {
        kind: EscapeKind,
        mismatch: bool,
        vals: Vec<ShadowValueId>,
    },
}

/// Per-mark bookkeeping for a value-observation site (`MarkImportant`/
/// `MaybeMarkImportant`).
#[derive(Debug, Default)]
pub struct MarkInfo {
    pub eagg: ErrorAggregate,
    pub influences: InfluenceSet,
    pub expr: Generalizer,
}

/// Per-mark bookkeeping for an escape-to-integer site: one slot per
/// argument position, since an escape can observe several values at once
/// (e.g. a comparison's two operands).
#[derive(Debug, Default)]
pub struct IntMarkInfo {
    pub eagg: ErrorAggregate,
    pub influences: InfluenceSet,
    pub per_arg_expr: Vec<Generalizer>,
}

/// Observation-point bookkeeping: `mark_important`/`maybe_mark_important`
/// (value marks, keyed by call-site return address) and `escape_from_float`
/// (keyed the same way but tracking per-argument expressions), gated by an
/// explicit `begin`/`end` pair.
#[derive(Default)]
pub struct MarkEngine {
    active: bool,
    marks: HashMap<Addr, MarkInfo>,
    escapes: HashMap<Addr, IntMarkInfo>,
}

impl MarkEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// True between a `begin()` and the matching `end()`; shadow activity
    /// outside this window is a no-op everywhere in the engine.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn begin(&mut self) {
        self.active = true;
    }

    pub fn end(&mut self) {
        self.active = false;
    }

    /// Unconditionally record one observation of `value` at `addr`.
    pub fn mark_important(&mut self, config: &Config, addr: Addr, value: Option<&(Real, Option<Rc<Expr>>, InfluenceSet)>, host: f64) {
        let info = self.marks.entry(addr).or_default();
        record_value_mark(info, config, value, host);
    }

    /// Record an observation only if `addr` has already been marked once
    /// before (used for lower-traffic auxiliary sites that shouldn't create
    /// a fresh mark on their own).
    pub fn maybe_mark_important(&mut self, config: &Config, addr: Addr, value: Option<&(Real, Option<Rc<Expr>>, InfluenceSet)>, host: f64) {
        if let Some(info) = self.marks.get_mut(&addr) {
            record_value_mark(info, config, value, host);
        }
    }

    /// Record a float value escaping shadow tracking (e.g. conversion to
    /// an integer). `vals` carries each observed argument's shadow
    /// metadata, `None` where no shadow was attached.
    pub fn escape_from_float(
        &mut self,
        config: &Config,
        addr: Addr,
        _kind: EscapeKind,
        mismatch: bool,
        vals: &[Option<(Real, Option<Rc<Expr>>, InfluenceSet)>],
        host_vals: &[f64],
    ) {
        let info = self.escapes.entry(addr).or_insert_with(|| IntMarkInfo {
            eagg: ErrorAggregate::default(),
            influences: InfluenceSet::new(),
            per_arg_expr: (0..vals.len()).map(|_| Generalizer::new()).collect(),
        });

        if info.per_arg_expr.len() < vals.len() {
            info.per_arg_expr.resize_with(vals.len(), Generalizer::new);
        }

        let mut max_error = 0.0_f64;
        for (i, slot) in vals.iter().enumerate() {
            match slot {
                Some((real, expr, influences)) => {
                    let err = real.bit_error_vs_f64(host_vals[i]);
                    max_error = max_error.max(err);
                    if !config.no_influences {
                        info.influences.merge(influences);
                    }
                    if !config.no_exprs {
                        if let Some(tree) = expr {
                            let leaf_bits: Vec<u32> = tree
                                .leaves()
                                .iter()
                                .map(|l| match l.as_ref() {
                                    Expr::Leaf { value: Some(v) } => v.to_f32().to_bits(),
                                    _ => 0,
                                })
                                .collect();
                            info.per_arg_expr[i].fold(tree, &leaf_bits);
                        }
                    }
                }
                None => {
                    info.eagg.record_zero();
                }
            }
        }

        if mismatch || max_error > 0.0 {
            info.eagg.record(max_error, max_error);
        } else {
            info.eagg.record_zero();
        }

        if config.no_influences || max_error < config.error_threshold as f64 {
            // below threshold: this escape's own address does not become
            // an influence on anything downstream (there is nothing
            // downstream of an escape), but we still keep the merged
            // influences collected above for reporting.
        } else {
            info.influences.insert(addr);
        }
    }

    /// Iterate value marks for the reporter.
    pub fn marks(&self) -> impl Iterator<Item = (Addr, &MarkInfo)> {
        self.marks.iter().map(|(&a, m)| (a, m))
    }

    /// Iterate escape marks for the reporter.
    pub fn escapes(&self) -> impl Iterator<Item = (Addr, &IntMarkInfo)> {
        self.escapes.iter().map(|(&a, m)| (a, m))
    }
}

fn record_value_mark(info: &mut MarkInfo, config: &Config, value: Option<&(Real, Option<Rc<Expr>>, InfluenceSet)>, host: f64) {
    match value {
        None => info.eagg.record_zero(),
        Some((real, expr, influences)) => {
            let err = real.bit_error_vs_f64(host);
            info.eagg.record(err, err);
            if !config.no_influences && err >= config.error_threshold as f64 {
                info.influences.merge(influences);
            }
            if !config.no_exprs {
                if let Some(tree) = expr {
                    let leaf_bits: Vec<u32> = tree
                        .leaves()
                        .iter()
                        .map(|l| match l.as_ref() {
                            Expr::Leaf { value: Some(v) } => v.to_f32().to_bits(),
                            _ => 0,
                        })
                        .collect();
                    info.expr.fold(tree, &leaf_bits);
                }
            }
        }
    }
}
