//! The single `CodeRelation` edge type (§3, §6): one relationship table with
//! a `type` discriminator rather than one table per edge kind.

use crate::types::{CallReason, RelationType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeRelation {
    pub from: String,
    pub to: String,
    pub kind: RelationType,
    /// `0 < confidence <= 1`; reserved at `1.0` for edge kinds other than
    /// CALLS (§3 invariant 5).
    pub confidence: f64,
    pub reason: Option<CallReason>,
    /// Only meaningful for `STEP_IN_PROCESS` edges (§3 invariant 6).
    pub step: Option<u32>,
}

impl CodeRelation {
    pub fn contains(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into(), kind: RelationType::Contains, confidence: 1.0, reason: None, step: None }
    }

    pub fn defines(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into(), kind: RelationType::Defines, confidence: 1.0, reason: None, step: None }
    }

    pub fn imports(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into(), kind: RelationType::Imports, confidence: 1.0, reason: None, step: None }
    }

    pub fn calls(from: impl Into<String>, to: impl Into<String>, confidence: f64, reason: CallReason) -> Self {
        debug_assert!(confidence > 0.0 && confidence <= 1.0, "CALLS confidence must be in (0, 1]");
        Self { from: from.into(), to: to.into(), kind: RelationType::Calls, confidence, reason: Some(reason), step: None }
    }

    pub fn extends(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into(), kind: RelationType::Extends, confidence: 1.0, reason: None, step: None }
    }

    pub fn implements(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into(), kind: RelationType::Implements, confidence: 1.0, reason: None, step: None }
    }

    pub fn member_of(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into(), kind: RelationType::MemberOf, confidence: 1.0, reason: None, step: None }
    }

    pub fn step_in_process(from: impl Into<String>, to: impl Into<String>, step: u32) -> Self {
        Self { from: from.into(), to: to.into(), kind: RelationType::StepInProcess, confidence: 1.0, reason: None, step: Some(step) }
    }

    /// Edge identity for duplicate suppression within a resolver source
    /// (§4.5(b): "derived from `(source, name, target)`"). We key on
    /// `(kind, from, to)` since `name` is implicit in `to` for our id scheme.
    pub fn identity(&self) -> (RelationType, &str, &str) {
        (self.kind, &self.from, &self.to)
    }
}
