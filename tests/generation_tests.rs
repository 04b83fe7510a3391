//! End-to-end tests for the validate -> render -> write pipeline and the
//! AI-assisted batch path.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use ruleforge::ai::PromptTransport;
use ruleforge::app::App;
use ruleforge::config::{AiSettings, ConfigStore};
use ruleforge::records::{RuleRecord, WorkflowRecord};
use ruleforge::{AiClient, DocKind, GenerationEvent};

fn app_in(dir: &Path) -> App {
    App::new(ConfigStore::load(dir.join("settings.json")))
}

#[test]
fn rule_generation_end_to_end() {
    let tmp = tempdir().unwrap();
    let mut app = app_in(tmp.path());
    let out_dir = tmp.path().join("rules");

    let record = RuleRecord {
        title: "No Secrets".to_string(),
        category: "Security".to_string(),
        activation: "Always On".to_string(),
        glob: String::new(),
        description: "Avoid hardcoded secrets".to_string(),
        rules: vec![
            "Never commit keys".to_string(),
            String::new(),
            "Use env vars".to_string(),
        ],
    };

    let path = app.generate_rule_file(&record, &out_dir).unwrap();
    assert_eq!(path.file_name().unwrap(), "security_No_Secrets.md");

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content.matches("# No Secrets").count(), 1);
    assert_eq!(content.matches("**Category:** Security").count(), 1);
    assert!(!content.contains("**Glob pattern:**"));

    let bullets: Vec<&str> = content.lines().filter(|l| l.starts_with("- ")).collect();
    assert_eq!(bullets, vec!["- Never commit keys", "- Use env vars"]);
    assert!(content.contains("_Generated on "));
}

#[test]
fn workflow_generation_end_to_end() {
    let tmp = tempdir().unwrap();
    let mut app = app_in(tmp.path());
    let out_dir = tmp.path().join("workflows");

    let record = WorkflowRecord {
        title: "Release Checklist".to_string(),
        description: "How we cut a release".to_string(),
        steps: vec![
            "Tag the commit".to_string(),
            "   ".to_string(),
            "Publish artifacts".to_string(),
        ],
    };

    let path = app.generate_workflow_file(&record, &out_dir).unwrap();
    assert_eq!(path.file_name().unwrap(), "release_checklist_workflow.md");

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("1. Tag the commit"));
    assert!(content.contains("2. Publish artifacts"));
    assert!(!content.contains("3. "));
}

struct FixedTransport(String);

#[async_trait]
impl PromptTransport for FixedTransport {
    async fn send_prompt(&self, _prompt: &str) -> anyhow::Result<String> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn ai_batch_generation_writes_all_records() {
    let tmp = tempdir().unwrap();
    let mut app = app_in(tmp.path());
    let response = r#"{"rules": [
        {"title": "Lint Clean", "category": "Testing", "activation": "Always On",
         "description": "Keep the linter happy", "rules": ["No warnings"]},
        {"title": "Log Context", "category": "Logging", "activation": "Manual",
         "description": "Log with context", "rules": ["Attach request ids"]}
    ]}"#;
    app.ai = AiClient::with_transport(
        Arc::new(FixedTransport(response.to_string())),
        AiSettings::default(),
    );

    let project = tmp.path().join("project");
    fs::create_dir_all(&project).unwrap();
    assert!(app.start_generation(DocKind::Rules, "a sample project idea".to_string(), project));

    let mut saved = None;
    while let Some(event) = app.next_generation_event().await {
        if let GenerationEvent::Rules { records, .. } = event {
            let out_dir = tmp.path().join("rules");
            saved = Some(app.save_all_rules(&records, &out_dir));
        }
    }

    let report = saved.unwrap();
    assert_eq!(report.saved, 2);
    assert_eq!(report.failed, 0);
    assert!(tmp.path().join("rules/testing_Lint_Clean.md").exists());
    assert!(tmp.path().join("rules/logging_Log_Context.md").exists());
    // both writes entered the recent-file list, most recent first
    assert!(app.config.settings.recent_files[0].ends_with("logging_Log_Context.md"));
}
