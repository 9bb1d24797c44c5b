//! Analyzer pass that validates logical plans before execution.
//!
//! The analyzer holds an explicit, ordered list of named rules. Every rule is
//! applied to the root of the plan; the first failure aborts validation.

mod validation;

pub use validation::{
    default_validation_rules, validate_group_by, validate_is_resolved, validate_order_by,
    validate_project_tuples, validate_schema_source, VALIDATE_GROUP_BY_RULE,
    VALIDATE_ORDER_BY_RULE, VALIDATE_PROJECT_TUPLES_RULE, VALIDATE_RESOLVED_RULE,
    VALIDATE_SCHEMA_SOURCE_RULE,
};

use crate::context::Context;
use crate::error::ValidationError;
use crate::plan::LogicalPlan;

/// Signature shared by every validation rule.
pub type RuleFn = fn(&Context, &LogicalPlan) -> Result<(), ValidationError>;

/// A named validation rule.
#[derive(Clone, Copy)]
pub struct ValidationRule {
    pub name: &'static str,
    pub apply: RuleFn,
}

impl ValidationRule {
    pub const fn new(name: &'static str, apply: RuleFn) -> Self {
        Self { name, apply }
    }
}

impl std::fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationRule")
            .field("name", &self.name)
            .finish()
    }
}

pub struct Analyzer {
    validation_rules: Vec<ValidationRule>,
}

impl Analyzer {
    pub fn new(validation_rules: Vec<ValidationRule>) -> Self {
        Self { validation_rules }
    }

    /// Analyzer with the rules returned by [`default_validation_rules`].
    pub fn with_default_rules() -> Self {
        Self::new(default_validation_rules())
    }

    pub fn validation_rules(&self) -> &[ValidationRule] {
        &self.validation_rules
    }

    /// Runs every rule, in order, against the root of `plan`.
    pub fn validate(&self, ctx: &Context, plan: &LogicalPlan) -> Result<(), ValidationError> {
        for rule in &self.validation_rules {
            if let Err(err) = (rule.apply)(ctx, plan) {
                tracing::debug!(rule = rule.name, error = %err, "plan validation failed");
                return Err(err);
            }
        }
        Ok(())
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::with_default_rules()
    }
}
