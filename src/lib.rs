pub mod config;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod executor;
pub mod ir;
pub mod ledger;
pub mod mark;
pub mod opinfo;
pub mod real;
pub mod report;
pub mod state;
pub mod symbolic;
pub mod tracker;
pub mod types;
pub mod value;

pub mod prelude {
    pub use crate::config::Config;
    pub use crate::emitter::InstrumentationEmitter;
    pub use crate::engine::Engine;
    pub use crate::error::{EngineError, EngineResult};
    pub use crate::executor::Operand;
    pub use crate::ir::{Effect, IrExpr, IrSink, IrStmt, RecordingSink};
    pub use crate::mark::{ClientRequest, EscapeKind};
    pub use crate::opinfo::{Addr, InfluenceSet, ShadowOpInfo};
    pub use crate::real::Real;
    pub use crate::report::{ReportEntry, SymbolResolver};
    #[cfg(feature = "report-sink")]
    pub use crate::report::{ReportSink, StderrSink};
    pub use crate::state::ShadowState;
    pub use crate::symbolic::{Expr, GeneralizedExpr, Generalizer, VarMap};
    pub use crate::tracker::StaticTypeTracker;
    pub use crate::types::FloatType;
    pub use crate::value::{ShadowTemp, ShadowValue, ShadowValueId, ValueStore};
}
