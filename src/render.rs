use chrono::{DateTime, Local};

use crate::records::{GeneratedDoc, RuleRecord, WorkflowRecord};
use crate::validate::RESERVED_FILENAME_CHARS;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Replaces every filename-reserved character with an underscore.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if RESERVED_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

fn filename_part(text: &str) -> String {
    text.replace(' ', "_").replace('/', "_")
}

/// Renders a rule record to Markdown. Inputs are assumed to be validated
/// already; blank rule items are dropped without error.
pub fn render_rule(record: &RuleRecord) -> GeneratedDoc {
    render_rule_at(record, Local::now())
}

pub fn render_rule_at(record: &RuleRecord, now: DateTime<Local>) -> GeneratedDoc {
    let filename = format!(
        "{}_{}.md",
        record.category.to_lowercase(),
        filename_part(&record.title)
    );

    let mut lines = vec![
        format!("# {}", record.title),
        String::new(),
        format!("**Category:** {}", record.category),
        format!("**Activation mode:** {}", record.activation),
    ];

    if !record.glob.trim().is_empty() {
        lines.push(format!("**Glob pattern:** {}", record.glob));
    }

    lines.push(String::new());
    lines.push(format!("**Description:** {}", record.description.trim()));
    lines.push(String::new());
    lines.push("**Rules:**".to_string());

    for rule in &record.rules {
        let rule = rule.trim();
        if !rule.is_empty() {
            lines.push(format!("- {rule}"));
        }
    }

    lines.push(String::new());
    lines.push(format!("_Generated on {}_", now.format(TIMESTAMP_FORMAT)));

    GeneratedDoc {
        filename,
        content: lines.join("\n"),
    }
}

/// Renders a workflow record to Markdown. Step numbering counts emitted
/// steps only, so blanks in the input never leave gaps.
pub fn render_workflow(record: &WorkflowRecord) -> GeneratedDoc {
    render_workflow_at(record, Local::now())
}

pub fn render_workflow_at(record: &WorkflowRecord, now: DateTime<Local>) -> GeneratedDoc {
    let filename = format!("{}_workflow.md", filename_part(&record.title).to_lowercase());

    let mut lines = vec![
        format!("# {}", record.title),
        String::new(),
        format!("**Description:** {}", record.description.trim()),
        String::new(),
        "**Steps:**".to_string(),
    ];

    let mut number = 0;
    for step in &record.steps {
        let step = step.trim();
        if !step.is_empty() {
            number += 1;
            lines.push(format!("{number}. {step}"));
        }
    }

    lines.push(String::new());
    lines.push(format!("_Generated on {}_", now.format(TIMESTAMP_FORMAT)));

    GeneratedDoc {
        filename,
        content: lines.join("\n"),
    }
}
