//! Structural and dependency analysis

pub mod imports;
pub mod structure;

pub use imports::{ImportAnalyzer, ImportSite};
pub use structure::{FunctionInfo, LoopInfo, LoopKind};
