use anyhow::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::ai::{AiClient, DocKind, GenerationEvent};
use crate::config::ConfigStore;
use crate::files;
use crate::records::{RuleRecord, WorkflowRecord};
use crate::render;
use crate::validate;

/// Counts from a batch save. Items fail independently; one bad record
/// never aborts the rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: usize,
    pub failed: usize,
}

impl SaveReport {
    pub fn message(&self, noun: &str) -> String {
        let mut message = format!("Saved {} {noun} successfully.", self.saved);
        if self.failed > 0 {
            message.push_str(&format!(" {} {noun} failed to save.", self.failed));
        }
        message
    }
}

impl fmt::Display for SaveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} saved, {} failed", self.saved, self.failed)
    }
}

/// Wires the config store, the AI client, and the file pipeline together.
/// One generation may be in flight at a time.
pub struct App {
    pub config: ConfigStore,
    pub ai: AiClient,
    generation_in_flight: bool,
    generation_rx: Option<mpsc::UnboundedReceiver<GenerationEvent>>,
}

impl App {
    pub fn new(config: ConfigStore) -> Self {
        let ai = AiClient::new(config.settings.ai_settings.clone());
        Self {
            config,
            ai,
            generation_in_flight: false,
            generation_rx: None,
        }
    }

    /// Validates, renders, and writes a single rule document, recording it
    /// in the recent-file list. Validation problems come back as an error
    /// carrying the newline-joined reasons.
    pub fn generate_rule_file(&mut self, record: &RuleRecord, out_dir: &Path) -> Result<PathBuf> {
        let validation = validate::validate_rule_input(
            &record.title,
            &record.category,
            &record.description,
            &record.rules,
        );
        if !validation.ok {
            anyhow::bail!(validation.message);
        }

        let doc = render::render_rule(record);
        self.write_with_backup(&doc.filename, &doc.content, out_dir)
    }

    pub fn generate_workflow_file(
        &mut self,
        record: &WorkflowRecord,
        out_dir: &Path,
    ) -> Result<PathBuf> {
        let validation = validate::validate_workflow_input(
            &record.title,
            &record.description,
            &record.steps,
        );
        if !validation.ok {
            anyhow::bail!(validation.message);
        }

        let doc = render::render_workflow(record);
        self.write_with_backup(&doc.filename, &doc.content, out_dir)
    }

    fn write_with_backup(&mut self, filename: &str, content: &str, out_dir: &Path) -> Result<PathBuf> {
        if self.config.settings.file_settings.backup_files {
            if let Some(backup) = files::backup_existing(&out_dir.join(filename))? {
                log::info!("backed up previous file to {}", backup.display());
            }
        }
        let path = files::write_document(filename, content, out_dir)?;
        self.config.add_recent_file(&path.to_string_lossy());
        Ok(path)
    }

    /// Saves a batch of AI-generated rules, reporting per-item outcomes.
    pub fn save_all_rules(&mut self, records: &[RuleRecord], out_dir: &Path) -> SaveReport {
        let mut report = SaveReport::default();
        for record in records {
            match self.generate_rule_file(record, out_dir) {
                Ok(_) => report.saved += 1,
                Err(e) => {
                    log::error!("error saving rule '{}': {e:#}", record.title);
                    report.failed += 1;
                }
            }
        }
        report
    }

    pub fn save_all_workflows(
        &mut self,
        records: &[WorkflowRecord],
        out_dir: &Path,
    ) -> SaveReport {
        let mut report = SaveReport::default();
        for record in records {
            match self.generate_workflow_file(record, out_dir) {
                Ok(_) => report.saved += 1,
                Err(e) => {
                    log::error!("error saving workflow '{}': {e:#}", record.title);
                    report.failed += 1;
                }
            }
        }
        report
    }

    pub fn generation_in_flight(&self) -> bool {
        self.generation_in_flight
    }

    /// Kicks off a background generation. Refused (returning false) while
    /// a previous run has not yet delivered its `Finished` event.
    pub fn start_generation(&mut self, kind: DocKind, idea: String, project_root: PathBuf) -> bool {
        if self.generation_in_flight {
            log::warn!("generation already in flight; ignoring request");
            return false;
        }
        self.generation_rx = Some(self.ai.generate_stream(kind, idea, project_root));
        self.generation_in_flight = true;
        true
    }

    /// Next event from the running generation, or `None` when idle. The
    /// in-flight flag clears once `Finished` arrives.
    pub async fn next_generation_event(&mut self) -> Option<GenerationEvent> {
        let rx = self.generation_rx.as_mut()?;
        let event = rx.recv().await;
        match event {
            Some(GenerationEvent::Finished { .. }) | None => {
                self.generation_in_flight = false;
                self.generation_rx = None;
            }
            _ => {}
        }
        event
    }
}
