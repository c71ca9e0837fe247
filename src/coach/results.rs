//! Tool result bundle.
//!
//! Each tool has a tri-state outcome: absent (not invoked), succeeded, or failed with a
//! reason. On the wire the bundle is flattened into the `data` object, with a failed
//! tool reported under `<key>_error` instead of `<key>`.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::coach::intent::ToolName;
use crate::tools::{Meal, MealReasoning, SubstitutionResult};

/// Outcome of one invoked tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolOutcome<T> {
    /// The tool produced a result.
    Succeeded(T),
    /// The tool failed; the message is kept for diagnostics.
    Failed(String),
}

impl<T> ToolOutcome<T> {
    /// Borrow the result if the tool succeeded.
    #[must_use]
    pub const fn succeeded(&self) -> Option<&T> {
        match self {
            Self::Succeeded(value) => Some(value),
            Self::Failed(_) => None,
        }
    }
}

/// One substitution lookup that failed.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct FailedLookup {
    /// Ingredient whose lookup failed.
    pub ingredient: String,
    /// Failure message.
    pub error: String,
}

/// Outcomes of all substitution lookups for one request, in request order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubstitutionBatch {
    /// Successful lookups.
    pub found: Vec<SubstitutionResult>,
    /// Failed lookups.
    pub failures: Vec<FailedLookup>,
}

/// Everything the dispatcher produced for one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolResults {
    tools_used: Vec<ToolName>,
    /// Recipe generation outcome.
    pub meal: Option<ToolOutcome<Meal>>,
    /// Substitution lookups, present when at least one was attempted.
    pub substitutions: Option<SubstitutionBatch>,
    /// Nutritional reasoning outcome.
    pub reasoning: Option<ToolOutcome<MealReasoning>>,
}

impl ToolResults {
    /// Tools that completed without error, in completion order, each once.
    #[must_use]
    pub fn tools_used(&self) -> &[ToolName] {
        &self.tools_used
    }

    /// Record that `tool` completed successfully.
    pub fn record_success(&mut self, tool: ToolName) {
        if !self.tools_used.contains(&tool) {
            self.tools_used.push(tool);
        }
    }

    /// The generated meal, if recipe generation succeeded.
    #[must_use]
    pub fn meal(&self) -> Option<&Meal> {
        self.meal.as_ref().and_then(ToolOutcome::succeeded)
    }

    /// Successful substitution lookups.
    #[must_use]
    pub fn found_substitutions(&self) -> &[SubstitutionResult] {
        self.substitutions
            .as_ref()
            .map(|batch| batch.found.as_slice())
            .unwrap_or_default()
    }

    /// The reasoning, if it succeeded.
    #[must_use]
    pub fn reasoning(&self) -> Option<&MealReasoning> {
        self.reasoning.as_ref().and_then(ToolOutcome::succeeded)
    }

    /// Short labels for every tool call that failed.
    #[must_use]
    pub fn failure_labels(&self) -> Vec<String> {
        let mut labels = Vec::new();
        if let Some(batch) = &self.substitutions {
            labels.extend(
                batch
                    .failures
                    .iter()
                    .map(|failure| format!("substitutes for {}", failure.ingredient)),
            );
        }
        if matches!(self.meal, Some(ToolOutcome::Failed(_))) {
            labels.push("the meal recipe".to_string());
        }
        if matches!(self.reasoning, Some(ToolOutcome::Failed(_))) {
            labels.push("the nutritional breakdown".to_string());
        }
        labels
    }
}

impl Serialize for ToolResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;

        if let Some(batch) = &self.substitutions {
            if batch.found.is_empty() {
                let reasons: Vec<&str> = batch
                    .failures
                    .iter()
                    .map(|failure| failure.error.as_str())
                    .collect();
                map.serialize_entry("substitutions_error", &reasons.join("; "))?;
            } else {
                map.serialize_entry("substitutions", &batch.found)?;
            }
            if !batch.failures.is_empty() {
                map.serialize_entry("substitution_failures", &batch.failures)?;
            }
        }

        match &self.meal {
            Some(ToolOutcome::Succeeded(meal)) => map.serialize_entry("meal", meal)?,
            Some(ToolOutcome::Failed(error)) => map.serialize_entry("meal_error", error)?,
            None => {}
        }

        match &self.reasoning {
            Some(ToolOutcome::Succeeded(reasoning)) => {
                map.serialize_entry("reasoning", reasoning)?;
            }
            Some(ToolOutcome::Failed(error)) => map.serialize_entry("reasoning_error", error)?,
            None => {}
        }

        map.end()
    }
}
