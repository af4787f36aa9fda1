//! Page classification and routing.
//!
//! ```text
//! page text ──▶ markers ──▶ rules ──▶ classifier ──▶ [labels per page]
//!              (matching)  (table)   (pending state)
//! ```
//!
//! 1. [`markers`]: case- and whitespace-insensitive phrase search
//! 2. [`rules`]: the declarative per-bank rule table and its evaluator
//! 3. [`classifier`]: the sequential pass that threads continuation state
//!    from page to page

pub mod classifier;
pub mod markers;
pub mod rules;

pub use classifier::{classify_page, classify_pages, ClassifierState, Page, PageAssignment, PageLabel};
pub use markers::{contains_any, MarkerSet};
pub use rules::{Branch, CategoryRule, RuleMatch, RuleOutcome};
