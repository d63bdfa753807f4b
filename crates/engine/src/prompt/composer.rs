//! Budgeted assembly of prompt sections.
//!
//! # Algorithm
//!
//! 1. Split sections into required and optional; stable-sort each group by
//!    priority, highest first
//! 2. Include every required section, whatever the budget
//! 3. Add optional sections while the running size stays within budget
//! 4. The first optional section that does not fit stops assembly; it and
//!    everything after it are reported as skipped
//!
//! Size is counted in characters of each formatted section. The blank-line
//! separators are not counted. Assembly is deterministic.

use serde::Serialize;
use tracing::warn;

/// One titled block of the system instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptSection {
    pub title: String,
    pub lines: Vec<String>,
    /// 1 (least important) ..= 10
    pub priority: u8,
    pub required: bool,
}

impl PromptSection {
    pub fn required(title: impl Into<String>, priority: u8, lines: Vec<String>) -> Self {
        Self {
            title: title.into(),
            lines,
            priority: priority.clamp(1, 10),
            required: true,
        }
    }

    pub fn optional(title: impl Into<String>, priority: u8, lines: Vec<String>) -> Self {
        Self {
            required: false,
            ..Self::required(title, priority, lines)
        }
    }

    /// `# {title}` followed by one line per entry.
    pub fn render(&self) -> String {
        let mut out = format!("# {}", self.title);
        for line in &self.lines {
            out.push('\n');
            out.push_str(line);
        }
        out
    }
}

/// The assembled instruction plus what made it in.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComposedPrompt {
    pub text: String,
    /// Titles in output order.
    pub included: Vec<String>,
    /// Titles of optional sections left out.
    pub skipped: Vec<String>,
}

/// Stateless; create one and reuse it.
#[derive(Debug, Clone, Copy)]
pub struct PromptComposer {
    budget: usize,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self { budget: 2000 }
    }
}

impl PromptComposer {
    pub fn new(budget: usize) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn compose(&self, sections: Vec<PromptSection>) -> ComposedPrompt {
        compose(sections, self.budget)
    }
}

/// Assemble `sections` within `budget` characters.
pub fn compose(sections: Vec<PromptSection>, budget: usize) -> ComposedPrompt {
    let (mut required, mut optional): (Vec<_>, Vec<_>) = sections.into_iter().partition(|s| s.required);
    required.sort_by(|a, b| b.priority.cmp(&a.priority));
    optional.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut parts = Vec::with_capacity(required.len() + optional.len());
    let mut included = Vec::new();
    let mut skipped = Vec::new();
    let mut running = 0usize;

    for section in &required {
        let text = section.render();
        running += text.chars().count();
        parts.push(text);
        included.push(section.title.clone());
    }

    let mut overflowed = false;
    for section in &optional {
        if overflowed {
            skipped.push(section.title.clone());
            continue;
        }
        let text = section.render();
        let len = text.chars().count();
        if running + len <= budget {
            running += len;
            parts.push(text);
            included.push(section.title.clone());
        } else {
            warn!(
                section = %section.title,
                size = len,
                used = running,
                budget,
                "Prompt budget exhausted, dropping remaining optional sections"
            );
            skipped.push(section.title.clone());
            overflowed = true;
        }
    }

    ComposedPrompt {
        text: parts.join("\n\n"),
        included,
        skipped,
    }
}
