//! Frozen configuration record.
//!
//! CLI flag parsing is an external collaborator's job (see the design's
//! non-goals); by the time this crate sees a [`Config`] it is a fully
//! resolved, immutable record threaded through the engine as `&Config`.

/// Engine configuration, resolved once by the embedding tool.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// MPFR precision, in bits, for every [`crate::real::Real`].
    pub precision: u32,
    /// Bits of error at/above which influences propagate.
    pub error_threshold: u32,
    /// Include symbolic expressions in reports; prune sub-expressions.
    pub report_exprs: bool,
    /// Emit human-readable text instead of S-expression records.
    pub human_readable: bool,
    /// Disable influence tracking; marks become pure error reports.
    pub no_influences: bool,
    /// Disable symbolic expression tracking entirely.
    pub no_exprs: bool,
    /// Depth bound used when pruning sub-expressions out of a report.
    pub max_expr_block_depth: usize,
    /// Diagnostic trace: static type decisions.
    pub print_types: bool,
    /// Diagnostic trace: shadow value moves.
    pub print_value_moves: bool,
    /// Diagnostic trace: shadow temp moves.
    pub print_temp_moves: bool,
    /// Diagnostic trace: pool allocator misses.
    pub print_mallocs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            precision: 1000,
            error_threshold: 20,
            report_exprs: false,
            human_readable: true,
            no_influences: false,
            no_exprs: false,
            max_expr_block_depth: 32,
            print_types: false,
            print_value_moves: false,
            print_temp_moves: false,
            print_mallocs: false,
        }
    }
}

impl Config {
    /// True if expression tracking is active for this run.
    pub const fn tracks_exprs(&self) -> bool {
        !self.no_exprs
    }

    /// True if influence tracking is active for this run.
    pub const fn tracks_influences(&self) -> bool {
        !self.no_influences
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = Config::default();
        assert_eq!(c.precision, 1000);
        assert_eq!(c.error_threshold, 20);
        assert!(!c.report_exprs);
        assert!(c.human_readable);
        assert!(c.tracks_exprs());
        assert!(c.tracks_influences());
    }
}
