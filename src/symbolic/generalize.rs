//! The per-site generalisation state machine (§4.8).
//!
//! `Empty -> Specific -> Generalised`. The first value observed at a site
//! is adopted verbatim; every subsequent value is merged in by walking both
//! trees in lockstep and collapsing wherever they disagree.

use super::expr::Expr;
use super::var_map::VarMap;
use std::rc::Rc;

/// A site's generalised expression together with its variable-equivalence
/// map.
#[derive(Debug, Clone)]
pub struct GeneralizedExpr {
    /// The most general tree that fits every trace folded in so far.
    pub tree: Rc<Expr>,
    /// Coarsest refinement of every trace's leaf equivalence.
    pub var_map: VarMap,
}

impl GeneralizedExpr {
    /// Render as an S-expression, `(op arg...)`, assigning each distinct
    /// variable group a name (`x`, `y`, `z`, ...) in first-appearance
    /// order; constant leaves print their own value. Matches the report
    /// format's `expr` field.
    pub fn render(&self) -> String {
        let mut leaf_idx = 0usize;
        let mut names: Vec<usize> = Vec::new();
        self.render_node(&self.tree, &mut leaf_idx, &mut names)
    }

    fn render_node(&self, node: &Rc<Expr>, leaf_idx: &mut usize, names: &mut Vec<usize>) -> String {
        match node.as_ref() {
            Expr::Leaf { value: Some(v) } => {
                *leaf_idx += 1;
                // format via the host double rather than `Real`'s own
                // `Display` (which carries the full shadow precision) so
                // the report shows the same short literal the host source
                // would have written.
                v.to_f64().to_string()
            }
            Expr::Leaf { value: None } => {
                let group = self.var_map.group_of(*leaf_idx);
                *leaf_idx += 1;
                let ordinal = names.iter().position(|&g| g == group).unwrap_or_else(|| {
                    names.push(group);
                    names.len() - 1
                });
                var_name(ordinal)
            }
            Expr::Branch { op, args } => {
                let parts: Vec<String> = args.iter().map(|a| self.render_node(a, leaf_idx, names)).collect();
                format!("({} {})", op, parts.join(" "))
            }
        }
    }
}

/// `x`, `y`, `z`, then `v3`, `v4`, ... for variable groups beyond the third.
fn var_name(ordinal: usize) -> String {
    match ordinal {
        0 => "x".to_string(),
        1 => "y".to_string(),
        2 => "z".to_string(),
        n => format!("v{n}"),
    }
}

/// Per-site generalisation slot. `None` is the `Empty` state.
#[derive(Debug, Clone, Default)]
pub struct Generalizer(Option<GeneralizedExpr>);

impl Generalizer {
    /// A fresh, empty slot.
    pub fn new() -> Self {
        Self(None)
    }

    /// Current generalised expression, if any value has been folded in.
    pub fn current(&self) -> Option<&GeneralizedExpr> {
        self.0.as_ref()
    }

    /// Fold one more dynamic value's expression into this site.
    ///
    /// `raw_leaf_bits` are the concrete f32 bit patterns of `value`'s
    /// leaves, in the same pre-order as `value.leaves()`, used to build
    /// that trace's var-map.
    pub fn fold(&mut self, value: &Rc<Expr>, raw_leaf_bits: &[u32]) {
        match self.0.take() {
            None => {
                let trace_map = VarMap::from_trace_values(raw_leaf_bits);
                self.0 = Some(GeneralizedExpr {
                    tree: Rc::clone(value),
                    var_map: trace_map,
                });
            }
            Some(existing) => {
                let trace_map = VarMap::from_trace_values(raw_leaf_bits);
                let merged_tree = merge(&existing.tree, value);
                let mut merged_map = existing.var_map;

                // Only refine the overlapping leaf prefix; a generalisation
                // step that collapses a subtree reduces the leaf count, so
                // the var-map is rebuilt fresh off the merged tree's own
                // leaves instead of trying to patch indices through a
                // collapse.
                if merged_map.num_leaves() == trace_map.num_leaves() {
                    merged_map.refine_against(&trace_map);
                    merged_map.canonicalize();
                } else {
                    merged_map = VarMap::singletons(merged_tree.leaves().len());
                }

                self.0 = Some(GeneralizedExpr {
                    tree: merged_tree,
                    var_map: merged_map,
                });
            }
        }
    }
}

/// Merge two expression trees per the lockstep walk of §4.8.
fn merge(a: &Rc<Expr>, b: &Rc<Expr>) -> Rc<Expr> {
    match (a.as_ref(), b.as_ref()) {
        (Expr::Leaf { value: va }, Expr::Leaf { value: vb }) => match (va, vb) {
            (Some(ka), Some(kb)) if real_eq(ka, kb) => Rc::clone(a),
            _ => Expr::variable(),
        },
        (Expr::Branch { op: oa, args: aa }, Expr::Branch { op: ob, args: ab }) if oa == ob && aa.len() == ab.len() => {
            let merged_args = aa.iter().zip(ab.iter()).map(|(x, y)| merge(x, y)).collect();
            Expr::branch(oa, merged_args)
        }
        _ => Expr::variable(),
    }
}

fn real_eq(a: &crate::real::Real, b: &crate::real::Real) -> bool {
    a == b
}
