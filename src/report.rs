//! Sorting, pruning, and formatting the final report.

use crate::config::Config;
use crate::mark::{IntMarkInfo, MarkInfo};
use crate::opinfo::{Addr, ShadowOpInfo};
use crate::symbolic::GeneralizedExpr;
use std::fmt::Write as _;

/// External collaborator that maps an instruction address to its enclosing
/// `(function, file, line)`, e.g. via DWARF/debug-info lookup. Resolving
/// symbols is explicitly out of scope for this crate; the reporter only
/// consumes the result through this interface, the same way it defers
/// output-sink delivery to [`ReportSink`].
pub trait SymbolResolver {
    fn resolve(&self, addr: Addr) -> Option<(String, String, u32)>;
}

/// One reportable record: an op site or a value mark, flattened to the
/// fields the report format needs.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub expr: Option<GeneralizedExpr>,
    pub plain_name: &'static str,
    pub function: Option<String>,
    pub filename: Option<String>,
    pub line_num: Option<u32>,
    pub instr_addr: Addr,
    pub avg_error: f64,
    pub max_error: f64,
    pub num_calls: u64,
}

impl ReportEntry {
    fn resolve_symbol(addr: Addr, resolver: Option<&dyn SymbolResolver>) -> (Option<String>, Option<String>, Option<u32>) {
        match resolver.and_then(|r| r.resolve(addr)) {
            Some((function, filename, line)) => (Some(function), Some(filename), Some(line)),
            None => (None, None, None),
        }
    }

    fn from_op_site(site: &ShadowOpInfo, resolver: Option<&dyn SymbolResolver>) -> Self {
        let (function, filename, line_num) = Self::resolve_symbol(site.addr, resolver);
        Self {
            expr: site.expr.current().cloned(),
            plain_name: site.op_name,
            function,
            filename,
            line_num,
            instr_addr: site.addr,
            avg_error: site.eagg.avg_total(),
            max_error: site.eagg.max_total,
            num_calls: site.eagg.num_evals,
        }
    }

    fn from_mark(addr: Addr, info: &MarkInfo, resolver: Option<&dyn SymbolResolver>) -> Self {
        let (function, filename, line_num) = Self::resolve_symbol(addr, resolver);
        Self {
            expr: info.expr.current().cloned(),
            plain_name: "mark",
            function,
            filename,
            line_num,
            instr_addr: addr,
            avg_error: info.eagg.avg_total(),
            max_error: info.eagg.max_total,
            num_calls: info.eagg.num_evals,
        }
    }

    /// An escape (integer-coercion) site. Its expression is per-argument
    /// rather than a single tree, so the report carries the first
    /// argument's generalised expression, matching the single-arg common
    /// case (`HERBGRIND_ESCAPE` with one observed value); sites with more
    /// arguments still report correctly, just without a combined tree.
    fn from_escape(addr: Addr, info: &IntMarkInfo, resolver: Option<&dyn SymbolResolver>) -> Self {
        let (function, filename, line_num) = Self::resolve_symbol(addr, resolver);
        Self {
            expr: info.per_arg_expr.first().and_then(|g| g.current()).cloned(),
            plain_name: "escape",
            function,
            filename,
            line_num,
            instr_addr: addr,
            avg_error: info.eagg.avg_total(),
            max_error: info.eagg.max_total,
            num_calls: info.eagg.num_evals,
        }
    }
}

/// A pluggable destination for a finished report, for embedders that want
/// something other than a file on disk (e.g. forwarding entries to their
/// own collector). Mirrors how a profiling receiver is plugged into a VM:
/// the engine holds at most one boxed receiver and hands it the finished
/// entries once per run.
#[cfg(feature = "report-sink")]
pub trait ReportSink: dyn_clone::DynClone {
    fn on_report(&mut self, entries: &[ReportEntry]);
}

#[cfg(feature = "report-sink")]
dyn_clone::clone_trait_object!(ReportSink);

/// Writes entries to stderr, formatted the same way [`Reporter::format`]
/// would render them as text.
#[cfg(feature = "report-sink")]
#[derive(Clone)]
pub struct StderrSink;

#[cfg(feature = "report-sink")]
impl ReportSink for StderrSink {
    fn on_report(&mut self, entries: &[ReportEntry]) {
        for e in entries {
            eprintln!("{} at {:#x}: max error {:.2} bits ({} evaluations)", e.plain_name, e.instr_addr, e.max_error, e.num_calls);
        }
    }
}

/// Sorts, prunes, and formats report entries.
pub struct Reporter<'a> {
    config: &'a Config,
}

impl<'a> Reporter<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Build the final, ordered, pruned list of entries from op sites,
    /// value marks, and escape marks. `resolver`, if given, fills in each
    /// entry's `(function, file, line)` from debug info.
    pub fn build<'s>(
        &self,
        sites: impl Iterator<Item = &'s ShadowOpInfo>,
        marks: impl Iterator<Item = (Addr, &'s MarkInfo)>,
        escapes: impl Iterator<Item = (Addr, &'s IntMarkInfo)>,
        resolver: Option<&dyn SymbolResolver>,
    ) -> Vec<ReportEntry> {
        let mut entries: Vec<ReportEntry> = sites.map(|s| ReportEntry::from_op_site(s, resolver)).collect();
        entries.extend(marks.map(|(addr, m)| ReportEntry::from_mark(addr, m, resolver)));
        entries.extend(escapes.map(|(addr, e)| ReportEntry::from_escape(addr, e, resolver)));

        entries.sort_by(|a, b| b.max_error.partial_cmp(&a.max_error).unwrap_or(std::cmp::Ordering::Equal));

        if self.config.report_exprs {
            self.prune_subexpressions(&mut entries);
        }

        entries
    }

    /// Drop any entry whose tree is a strict, depth-bounded subexpression
    /// of an earlier (larger-error) entry's tree.
    fn prune_subexpressions(&self, entries: &mut Vec<ReportEntry>) {
        let max_depth = self.config.max_expr_block_depth;
        let mut kept: Vec<ReportEntry> = Vec::with_capacity(entries.len());

        'outer: for candidate in entries.drain(..) {
            if let Some(needle) = &candidate.expr {
                for larger in &kept {
                    if let Some(haystack) = &larger.expr {
                        if !std::rc::Rc::ptr_eq(&haystack.tree, &needle.tree) && haystack.tree.contains_within(&needle.tree, max_depth) {
                            continue 'outer;
                        }
                    }
                }
            }
            kept.push(candidate);
        }

        *entries = kept;
    }

    /// Render entries as the configured output format.
    pub fn format(&self, entries: &[ReportEntry]) -> String {
        if self.config.human_readable {
            self.format_text(entries)
        } else {
            self.format_sexpr(entries)
        }
    }

    fn format_text(&self, entries: &[ReportEntry]) -> String {
        let mut out = String::new();
        for e in entries {
            if let Some(expr) = &e.expr {
                let _ = write!(out, "{} in ", expr.render());
            }
            match (&e.function, &e.filename, e.line_num) {
                (Some(func), Some(file), Some(line)) => {
                    let _ = write!(out, "{func} at {file}:{line}");
                }
                _ => {
                    let _ = write!(out, "{}", e.plain_name);
                }
            }
            let _ = writeln!(out, " (address {:#x})", e.instr_addr);
            let _ = writeln!(out, "{:.1} bits average error", e.avg_error);
            let _ = writeln!(out, "{:.1} bits max error", e.max_error);
            let _ = writeln!(out, "Aggregated over {} instances", e.num_calls);
        }
        out
    }

    /// One record per line, matching the external S-expression format:
    /// `((expr ...) (plain-name ...) (function ...) (filename ...)
    /// (line-num ...) (instr-addr ...) (avg-error ...) (max-error ...)
    /// (num-calls ...))`, omitting `expr`/`function`/`filename`/`line-num`
    /// when unavailable.
    fn format_sexpr(&self, entries: &[ReportEntry]) -> String {
        let mut out = String::new();
        for e in entries {
            let _ = write!(out, "(");
            if let Some(expr) = &e.expr {
                let _ = write!(out, "(expr {}) ", expr.render());
            }
            let _ = write!(out, "(plain-name {:?})", e.plain_name);
            if let Some(func) = &e.function {
                let _ = write!(out, " (function {func:?})");
            }
            if let Some(file) = &e.filename {
                let _ = write!(out, " (filename {file:?})");
            }
            if let Some(line) = e.line_num {
                let _ = write!(out, " (line-num {line})");
            }
            let _ = write!(out, " (instr-addr {:x})", e.instr_addr);
            let _ = write!(out, " (avg-error {})", e.avg_error);
            let _ = write!(out, " (max-error {})", e.max_error);
            let _ = writeln!(out, " (num-calls {}))", e.num_calls);
        }
        out
    }
}
