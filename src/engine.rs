//! Top-level engine context: owns every piece of global state for one run
//! and exposes the operations the emitted IR and the client-request
//! handler call into.

use crate::config::Config;
use crate::error::EngineResult;
use crate::executor::{Operand, OpSiteTable, ShadowOpExecutor};
use crate::ledger::OwnershipLedger;
use crate::mark::{ClientRequest, EscapeKind, MarkEngine};
use crate::opinfo::{Addr, InfluenceSet};
use crate::real::Real;
use crate::report::{ReportEntry, Reporter, SymbolResolver};
use crate::state::ShadowState;
use crate::symbolic::Expr;
use crate::tracker::StaticTypeTracker;
use crate::value::{ShadowValueId, ValueStore};
use std::io::Write as _;
use std::path::Path;
use std::rc::Rc;

/// Owns every piece of mutable global state for one shadow-execution run.
///
/// Mirrors the role the teacher's `Interpreter<S>` plays for its VM: a
/// single struct the embedding tool constructs once and threads through
/// every instrumentation call site.
pub struct Engine {
    config: Config,
    store: ValueStore,
    state: ShadowState,
    tracker: StaticTypeTracker,
    ledger: OwnershipLedger,
    sites: OpSiteTable,
    marks: MarkEngine,
    #[cfg(feature = "report-sink")]
    sink: Option<Box<dyn crate::report::ReportSink>>,
    symbol_resolver: Option<Box<dyn SymbolResolver>>,
}

impl Engine {
    /// A fresh engine: inactive (no `Begin` request processed yet), empty
    /// pools and tables sized for a guest-state area of `thread_words`
    /// words.
    pub fn new(config: Config, thread_words: usize) -> Self {
        Self {
            state: ShadowState::new(thread_words, 0),
            config,
            store: ValueStore::new(),
            tracker: StaticTypeTracker::new(),
            ledger: OwnershipLedger::new(),
            sites: OpSiteTable::new(),
            marks: MarkEngine::new(),
            #[cfg(feature = "report-sink")]
            sink: None,
            symbol_resolver: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Install a report sink, replacing any previously set one.
    #[cfg(feature = "report-sink")]
    pub fn set_report_sink(&mut self, sink: Box<dyn crate::report::ReportSink>) {
        self.sink = Some(sink);
    }

    /// Install the symbol resolver the report uses to fill in each entry's
    /// `(function, file, line)`, replacing any previously set one.
    pub fn set_symbol_resolver(&mut self, resolver: Box<dyn SymbolResolver>) {
        self.symbol_resolver = Some(resolver);
    }

    /// True if the engine is between a `Begin` and the matching `End`;
    /// every other entry point below is a no-op outside that window.
    pub fn is_active(&self) -> bool {
        self.marks.is_active()
    }

    /// Handle one client request from the instrumented program.
    pub fn handle_request(&mut self, request: ClientRequest) {
        match request {
            ClientRequest::Begin => self.marks.begin(),
            ClientRequest::End => self.marks.end(),
            ClientRequest::MarkImportant(addr) => {
                if self.is_active() {
                    self.mark_important(addr, None, 0.0);
                }
            }
            ClientRequest::MaybeMarkImportant(addr) => {
                if self.is_active() {
                    self.maybe_mark_important(addr, None, 0.0);
                }
            }
            ClientRequest::Escape { kind, mismatch, vals } => {
                if self.is_active() {
                    self.escape_from_float(0, kind, mismatch, &vals, &[]);
                }
            }
        }
    }

    /// Allocate a fresh shadow value.
    pub fn new_value(&mut self, ty: crate::types::FloatType, real: Real, expr: Option<Rc<Expr>>) -> ShadowValueId {
        let id = self.store.new_value(ty, real, expr);
        if self.config.print_mallocs {
            tracing::debug!(?id, live = self.store.live_count(), "allocated shadow value");
        }
        id
    }

    pub fn own(&mut self, id: ShadowValueId) {
        if self.config.print_value_moves {
            tracing::debug!(?id, "own");
        }
        self.store.own(id);
    }

    pub fn disown(&mut self, id: ShadowValueId) {
        if self.config.print_value_moves {
            tracing::debug!(?id, "disown");
        }
        self.store.disown(id);
    }

    /// Called by the emitter's per-block entry hook.
    pub fn enter_block(&mut self, max_temps: usize) {
        if self.config.print_types {
            tracing::debug!(max_temps, "resetting static types for block entry");
        }
        self.tracker.reset();
        self.ledger.reset();
        self.state.enter_block(max_temps);
    }

    /// Called by the emitter's per-block teardown hook.
    pub fn exit_block(&mut self) {
        if self.config.print_temp_moves {
            tracing::debug!(temps = ?self.ledger.registered(), "tearing down block temps");
        }
        self.ledger.teardown(&mut self.state, &mut self.store);
    }

    /// Direct access to the static tracker, used by
    /// [`crate::emitter::InstrumentationEmitter`].
    pub fn tracker_mut(&mut self) -> &mut StaticTypeTracker {
        &mut self.tracker
    }

    /// Direct access to the ownership ledger, used by
    /// [`crate::emitter::InstrumentationEmitter`].
    pub fn ledger_mut(&mut self) -> &mut OwnershipLedger {
        &mut self.ledger
    }

    /// Direct access to the shadow state stores.
    pub fn state_mut(&mut self) -> &mut ShadowState {
        &mut self.state
    }

    /// Execute one arithmetic operation. See [`ShadowOpExecutor::execute`].
    #[allow(clippy::too_many_arguments)]
    pub fn execute_op(
        &mut self,
        op_name: &'static str,
        op_addr: Addr,
        block_addr: Addr,
        result_ty: crate::types::FloatType,
        operands: &[Operand],
        host_result: f64,
        compute: impl Fn(&[&Real], u32) -> Real,
    ) -> ShadowValueId {
        let executor = ShadowOpExecutor::new(&self.config);
        executor.execute(&mut self.sites, &mut self.store, op_name, op_addr, block_addr, result_ty, operands, host_result, compute)
    }

    /// Record one observation at a value-mark site.
    pub fn mark_important(&mut self, addr: Addr, value: Option<&(Real, Option<Rc<Expr>>, InfluenceSet)>, host: f64) {
        self.marks.mark_important(&self.config, addr, value, host);
    }

    /// Record an observation only if `addr` was already marked once.
    pub fn maybe_mark_important(&mut self, addr: Addr, value: Option<&(Real, Option<Rc<Expr>>, InfluenceSet)>, host: f64) {
        self.marks.maybe_mark_important(&self.config, addr, value, host);
    }

    /// Record a float value escaping shadow tracking.
    pub fn escape_from_float(
        &mut self,
        addr: Addr,
        kind: EscapeKind,
        mismatch: bool,
        vals: &[ShadowValueId],
        host_vals: &[f64],
    ) {
        let resolved: Vec<Option<(Real, Option<Rc<Expr>>, InfluenceSet)>> = vals
            .iter()
            .map(|&id| {
                let v = self.store.get(id);
                Some((v.real().clone(), v.expr().cloned(), v.influences().clone()))
            })
            .collect();
        let zeros;
        let host_vals = if host_vals.len() == vals.len() {
            host_vals
        } else {
            zeros = vec![0.0; vals.len()];
            &zeros[..]
        };
        self.marks.escape_from_float(&self.config, addr, kind, mismatch, &resolved, host_vals);
    }

    /// Flush the run: finalise and format the report. Called by `End`
    /// handling in the embedding tool, or directly at process exit.
    pub fn report(&self) -> String {
        let reporter = Reporter::new(&self.config);
        let entries: Vec<ReportEntry> = reporter.build(
            self.sites.iter(),
            self.marks.marks(),
            self.marks.escapes(),
            self.symbol_resolver.as_deref(),
        );
        reporter.format(&entries)
    }

    /// Like [`Engine::report`], but also forwards the entries to the
    /// installed report sink, if any.
    #[cfg(feature = "report-sink")]
    pub fn report_and_notify_sink(&mut self) -> String {
        let reporter = Reporter::new(&self.config);
        let entries: Vec<ReportEntry> = reporter.build(
            self.sites.iter(),
            self.marks.marks(),
            self.marks.escapes(),
            self.symbol_resolver.as_deref(),
        );
        if let Some(sink) = &mut self.sink {
            sink.on_report(&entries);
        }
        reporter.format(&entries)
    }

    /// Write the formatted report to `path`. A failure to open the file is
    /// logged and the run continues reportless, matching how the rest of
    /// this crate treats reporting as best-effort once the host program has
    /// already run to completion.
    pub fn write_report(&self, path: &Path) -> EngineResult<()> {
        let text = self.report();
        let mut file = std::fs::File::create(path).map_err(|e| {
            tracing::error!(error = %e, path = %path.display(), "failed to open report file");
            e
        })?;
        file.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Tear down all persistent shadow state, disowning every live value.
    /// Called at engine shutdown.
    pub fn teardown(&mut self) {
        self.state.teardown(&mut self.store);
    }
}
