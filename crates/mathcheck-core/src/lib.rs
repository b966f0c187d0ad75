//! mathcheck-core — Answer verification for math study apps.
//!
//! Decides whether a learner's typed answers (plain text or LaTeX-flavoured
//! notation) satisfy the accepted answers of a question part, crediting
//! mathematically equivalent forms and letting interchangeable answers be
//! entered in any order.

pub mod batch;
pub mod canonical;
pub mod config;
pub mod equivalence;
pub mod error;
pub mod eval;
pub mod expr;
pub mod lexer;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod question;
pub mod report;
pub mod verify;

pub use equivalence::{equivalent, EquivalenceChecker, Strategy};
pub use model::{AnswerAlternative, AnswerSlot, MatchResult};
pub use verify::{verify, Verifier};
