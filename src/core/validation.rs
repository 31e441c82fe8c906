use crate::core::error::WorkflowError;

/// The declared shape of one stage, as seen by chain validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageShape<'a> {
    pub name: &'a str,
    pub input_count: usize,
    pub output_count: usize,
}

/// Represents an issue found during workflow validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// A hard error: executing the chain would read or write the wrong number of elements.
    Error(String),
    /// A warning: the chain is executable but probably not what was intended.
    Warning(String),
}

/// The result of a workflow validation pass.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.issues.push(ValidationIssue::Error(msg.into()));
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.issues.push(ValidationIssue::Warning(msg.into()));
    }

    pub fn is_safe(&self) -> bool {
        !self.issues.iter().any(|i| matches!(i, ValidationIssue::Error(_)))
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| matches!(i, ValidationIssue::Warning(_)))
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.issues.iter().filter_map(|i| match i {
            ValidationIssue::Error(msg) => Some(msg.as_str()),
            ValidationIssue::Warning(_) => None,
        })
    }

    pub fn log_summary(&self) {
        if self.is_safe() && !self.has_warnings() {
            log::info!("Workflow validation passed: every stage matches its neighbours.");
            return;
        }

        for issue in &self.issues {
            match issue {
                ValidationIssue::Error(msg) => log::error!("Validation error: {}", msg),
                ValidationIssue::Warning(msg) => log::warn!("Validation warning: {}", msg),
            }
        }
    }
}

/// Checks every stage for positive sizes and every adjacent pair for matching sizes.
pub fn validate_chain<'a, I>(stages: I) -> ValidationResult
where
    I: IntoIterator<Item = StageShape<'a>>,
{
    let mut result = ValidationResult::new();
    let mut previous: Option<(usize, StageShape<'a>)> = None;

    for (index, stage) in stages.into_iter().enumerate() {
        if stage.input_count == 0 {
            result.add_error(format!(
                "Unit {} ({}) declares an input size of zero.",
                index, stage.name
            ));
        }
        if stage.output_count == 0 {
            result.add_error(format!(
                "Unit {} ({}) declares an output size of zero.",
                index, stage.name
            ));
        }
        if let Some((prev_index, prev)) = previous {
            if prev.output_count != stage.input_count {
                result.add_error(format!(
                    "Unit {} ({}) produces {} elements but unit {} ({}) consumes {}.",
                    prev_index, prev.name, prev.output_count, index, stage.name, stage.input_count
                ));
            }
        }
        previous = Some((index, stage));
    }

    if previous.is_none() {
        result.add_warning("Workflow contains no units.");
    }

    result
}

/// Returns the first adjacent pair whose sizes disagree.
pub fn first_chain_mismatch<'a, I>(stages: I) -> Option<WorkflowError>
where
    I: IntoIterator<Item = StageShape<'a>>,
{
    let mut iter = stages.into_iter().enumerate();
    let (_, mut prev) = iter.next()?;
    for (index, stage) in iter {
        if prev.output_count != stage.input_count {
            return Some(WorkflowError::ChainMismatch {
                index: index - 1,
                produced: prev.output_count,
                expected: stage.input_count,
            });
        }
        prev = stage;
    }
    None
}

/// Largest vector any single stage needs to hold: the first input or any output.
pub fn max_stage_size<'a, I>(stages: I) -> usize
where
    I: IntoIterator<Item = StageShape<'a>>,
{
    let mut iter = stages.into_iter();
    let Some(first) = iter.next() else {
        return 0;
    };
    iter.fold(first.input_count.max(first.output_count), |curr, stage| {
        curr.max(stage.output_count)
    })
}
