//! Symbolic expression trees and the per-site generalisation machinery.

mod expr;
mod generalize;
mod var_map;

pub use expr::Expr;
pub use generalize::{GeneralizedExpr, Generalizer};
pub use var_map::VarMap;
