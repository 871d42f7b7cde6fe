use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// What a timeline step asks of the cook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StepKind {
    Instruction,
    Progress,
    End,
}

/// One time-boxed cooking action. Offsets are whole seconds from session start.
///
/// Field names on the wire follow the recipe generator's format
/// (`tStart`, `tEnd`, `type`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    #[serde(rename = "tStart")]
    pub start_offset: u64,
    #[serde(rename = "tEnd", default, skip_serializing_if = "Option::is_none")]
    pub end_offset: Option<u64>,
    #[serde(rename = "type")]
    pub kind: StepKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Step {
    pub fn new(
        id: impl Into<String>,
        start_offset: u64,
        end_offset: Option<u64>,
        kind: StepKind,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            start_offset,
            end_offset,
            kind,
            text: text.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// True when `now` falls inside `[start, end)`; open-ended steps never close.
    pub fn is_in_window(&self, now: u64) -> bool {
        self.start_offset <= now && self.end_offset.map_or(true, |end| end > now)
    }

    pub fn has_started(&self, now: u64) -> bool {
        self.start_offset <= now
    }

    /// Seconds left in this step's window, if it has an end.
    pub fn remaining_at(&self, now: u64) -> Option<u64> {
        self.end_offset.map(|end| end.saturating_sub(now.max(self.start_offset)))
    }

    /// Window length, if the step has an end.
    pub fn duration(&self) -> Option<u64> {
        self.end_offset
            .map(|end| end.saturating_sub(self.start_offset))
    }
}

/// Problems found in a timeline. None of these are rejected; the resolver
/// picks deterministically regardless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineIssue {
    Empty,
    Unsorted { id: String },
    EndBeforeStart { id: String },
    Overlap { first: String, second: String },
    MissingEndStep,
    BeyondTotal { id: String, end: u64, total: u64 },
    DuplicateId { id: String },
}

impl fmt::Display for TimelineIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimelineIssue::Empty => write!(f, "timeline has no steps"),
            TimelineIssue::Unsorted { id } => {
                write!(f, "step {id} starts before the step preceding it")
            }
            TimelineIssue::EndBeforeStart { id } => write!(f, "step {id} ends before it starts"),
            TimelineIssue::Overlap { first, second } => {
                write!(f, "steps {first} and {second} are active at the same time")
            }
            TimelineIssue::MissingEndStep => write!(f, "last step is not of kind end"),
            TimelineIssue::BeyondTotal { id, end, total } => {
                write!(f, "step {id} ends at {end}s, past the {total}s session")
            }
            TimelineIssue::DuplicateId { id } => write!(f, "step id {id} is used more than once"),
        }
    }
}

/// Check a timeline against the well-formedness rules.
pub fn lint_timeline(steps: &[Step], total_seconds: u64) -> Vec<TimelineIssue> {
    let mut issues = Vec::new();
    if steps.is_empty() {
        issues.push(TimelineIssue::Empty);
        return issues;
    }

    let mut seen = HashSet::new();
    for step in steps {
        if !seen.insert(step.id.as_str()) {
            issues.push(TimelineIssue::DuplicateId {
                id: step.id.clone(),
            });
        }
        if let Some(end) = step.end_offset {
            if end < step.start_offset {
                issues.push(TimelineIssue::EndBeforeStart {
                    id: step.id.clone(),
                });
            }
            if end > total_seconds {
                issues.push(TimelineIssue::BeyondTotal {
                    id: step.id.clone(),
                    end,
                    total: total_seconds,
                });
            }
        }
    }

    for pair in steps.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.start_offset < prev.start_offset {
            issues.push(TimelineIssue::Unsorted {
                id: next.id.clone(),
            });
        }
        let prev_open_at_next = prev.end_offset.map_or(true, |end| end > next.start_offset);
        if next.start_offset >= prev.start_offset && prev_open_at_next {
            issues.push(TimelineIssue::Overlap {
                first: prev.id.clone(),
                second: next.id.clone(),
            });
        }
    }

    if steps.last().map(|s| s.kind) != Some(StepKind::End) {
        issues.push(TimelineIssue::MissingEndStep);
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, start: u64, end: Option<u64>, kind: StepKind) -> Step {
        Step::new(id, start, end, kind, id)
    }

    #[test]
    fn deserializes_generator_format() {
        let json = r#"{
            "id": "step-1",
            "tStart": 0,
            "tEnd": 300,
            "type": "instruction",
            "text": "Dice the onions",
            "category": "prep"
        }"#;
        let step: Step = serde_json::from_str(json).unwrap();
        assert_eq!(step.id, "step-1");
        assert_eq!(step.start_offset, 0);
        assert_eq!(step.end_offset, Some(300));
        assert_eq!(step.kind, StepKind::Instruction);
        assert_eq!(step.category.as_deref(), Some("prep"));
    }

    #[test]
    fn missing_end_and_category_are_optional() {
        let json = r#"{"id": "x", "tStart": 10, "type": "end", "text": "serve"}"#;
        let step: Step = serde_json::from_str(json).unwrap();
        assert_eq!(step.end_offset, None);
        assert_eq!(step.category, None);

        let out = serde_json::to_value(&step).unwrap();
        assert!(out.get("tEnd").is_none());
        assert_eq!(out["type"], "end");
    }

    #[test]
    fn rejects_unknown_kind() {
        let json = r#"{"id": "x", "tStart": 0, "type": "garnish", "text": "t"}"#;
        assert!(serde_json::from_str::<Step>(json).is_err());
    }

    #[test]
    fn window_is_half_open() {
        let s = step("a", 100, Some(200), StepKind::Instruction);
        assert!(!s.is_in_window(99));
        assert!(s.is_in_window(100));
        assert!(s.is_in_window(199));
        assert!(!s.is_in_window(200));

        let open = step("b", 100, None, StepKind::End);
        assert!(open.is_in_window(10_000));
    }

    #[test]
    fn remaining_clamps_to_window() {
        let s = step("a", 100, Some(200), StepKind::Progress);
        assert_eq!(s.remaining_at(50), Some(100));
        assert_eq!(s.remaining_at(150), Some(50));
        assert_eq!(s.remaining_at(250), Some(0));
        assert_eq!(s.duration(), Some(100));
        assert_eq!(step("b", 0, None, StepKind::End).remaining_at(5), None);
    }

    #[test]
    fn kind_displays_lowercase() {
        assert_eq!(StepKind::Instruction.to_string(), "instruction");
        assert_eq!(StepKind::End.to_string(), "end");
    }

    #[test]
    fn lint_accepts_well_formed_timeline() {
        let steps = vec![
            step("prep", 0, Some(300), StepKind::Instruction),
            step("cook", 300, Some(600), StepKind::Progress),
            step("plate", 600, Some(900), StepKind::End),
        ];
        assert!(lint_timeline(&steps, 900).is_empty());
    }

    #[test]
    fn lint_reports_problems() {
        let steps = vec![
            step("a", 100, Some(400), StepKind::Instruction),
            step("b", 50, Some(40), StepKind::Instruction),
            step("a", 300, Some(1200), StepKind::Progress),
        ];
        let issues = lint_timeline(&steps, 900);
        assert!(issues.contains(&TimelineIssue::Unsorted { id: "b".into() }));
        assert!(issues.contains(&TimelineIssue::EndBeforeStart { id: "b".into() }));
        assert!(issues.contains(&TimelineIssue::DuplicateId { id: "a".into() }));
        assert!(issues.contains(&TimelineIssue::MissingEndStep));
        assert!(issues.contains(&TimelineIssue::BeyondTotal {
            id: "a".into(),
            end: 1200,
            total: 900
        }));
    }

    #[test]
    fn lint_reports_overlap() {
        let steps = vec![
            step("a", 0, Some(400), StepKind::Instruction),
            step("b", 300, Some(600), StepKind::End),
        ];
        assert_eq!(
            lint_timeline(&steps, 600),
            vec![TimelineIssue::Overlap {
                first: "a".into(),
                second: "b".into()
            }]
        );
    }

    #[test]
    fn lint_empty_timeline() {
        assert_eq!(lint_timeline(&[], 0), vec![TimelineIssue::Empty]);
    }
}
