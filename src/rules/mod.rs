// Rule engine - declarative move legality and trick resolution
//
// The table state machine never encodes game rules directly. It asks a
// RuleSet through the RuleEngine adapter, so a variant with different
// legality or winner rules is a drop-in swap.

// Public API - what other modules can use
pub use engine::{RuleBaseError, RuleEngine, RuleEngineFailure, RuleSet, RulesView};
pub use standard::StandardRules;

// Internal modules
mod engine;
mod standard;
