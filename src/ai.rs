use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::analyzer;
use crate::config::AiSettings;
use crate::records::{ProjectInfo, RuleRecord, WorkflowRecord};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    Rules,
    Workflows,
}

/// The injected network capability: one prompt in, one raw response out.
#[async_trait]
pub trait PromptTransport: Send + Sync {
    async fn send_prompt(&self, prompt: &str) -> Result<String>;
}

/// Gemini `generateContent` REST transport.
#[derive(Debug, Clone)]
pub struct GeminiTransport {
    client: Client,
    base_url: String,
    settings: AiSettings,
}

impl GeminiTransport {
    pub fn new(settings: AiSettings) -> Self {
        Self::with_base_url(GEMINI_API_BASE, settings)
    }

    pub fn with_base_url(base_url: impl Into<String>, settings: AiSettings) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent("ruleforge/0.1")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            settings,
        }
    }
}

#[async_trait]
impl PromptTransport for GeminiTransport {
    async fn send_prompt(&self, prompt: &str) -> Result<String> {
        let request = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.settings.temperature,
                "maxOutputTokens": self.settings.max_output_tokens,
            }
        });

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.settings.model
        );
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!("Gemini API request failed: {error_text}"));
        }

        let body: Value = response.json().await?;
        body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("No usable content in Gemini response"))
    }
}

pub fn build_rule_prompt(idea: &str, info: &ProjectInfo) -> String {
    let languages = join_or_placeholder(&info.languages);
    let frameworks = join_or_placeholder(&info.frameworks);

    format!(
        "You are an expert software developer who writes development rules for projects.\n\
         \n\
         Project information:\n\
         - Idea: {idea}\n\
         - Languages in use: {languages}\n\
         - Frameworks in use: {frameworks}\n\
         - File count: {count}\n\
         \n\
         Create comprehensive development rules covering:\n\
         1. Code rules\n\
         2. Security rules\n\
         3. Performance rules\n\
         4. Testing rules\n\
         5. Documentation rules\n\
         \n\
         For every rule specify:\n\
         - a title\n\
         - a category (UI/Database/Logic/Security/Performance/Testing/Documentation)\n\
         - an activation mode (Always On/Manual/Glob)\n\
         - a glob pattern for the files it applies to\n\
         - a description\n\
         - the detailed rule items\n\
         \n\
         Respond with JSON in exactly this shape:\n\
         {{\n\
           \"rules\": [\n\
             {{\n\
               \"title\": \"Rule title\",\n\
               \"category\": \"Category\",\n\
               \"activation\": \"Activation mode\",\n\
               \"glob\": \"File pattern\",\n\
               \"description\": \"Rule description\",\n\
               \"rules\": [\"rule 1\", \"rule 2\", \"rule 3\"]\n\
             }}\n\
           ]\n\
         }}",
        count = info.file_count
    )
}

pub fn build_workflow_prompt(idea: &str, info: &ProjectInfo) -> String {
    let languages = join_or_placeholder(&info.languages);
    let frameworks = join_or_placeholder(&info.frameworks);

    format!(
        "You are an expert in software project management and workflows.\n\
         \n\
         Project information:\n\
         - Idea: {idea}\n\
         - Languages in use: {languages}\n\
         - Frameworks in use: {frameworks}\n\
         - File count: {count}\n\
         \n\
         Create workflows covering:\n\
         1. Development workflow\n\
         2. Testing workflow\n\
         3. Deployment workflow\n\
         4. Code review workflow\n\
         5. Bug management workflow\n\
         \n\
         For every workflow specify:\n\
         - a title\n\
         - a description\n\
         - the detailed steps\n\
         \n\
         Respond with JSON in exactly this shape:\n\
         {{\n\
           \"workflows\": [\n\
             {{\n\
               \"title\": \"Workflow title\",\n\
               \"description\": \"Workflow description\",\n\
               \"steps\": [\"step 1\", \"step 2\", \"step 3\"]\n\
             }}\n\
           ]\n\
         }}",
        count = info.file_count
    )
}

fn join_or_placeholder(items: &[String]) -> String {
    if items.is_empty() {
        "not detected".to_string()
    } else {
        items.join(", ")
    }
}

/// Result of parsing an AI response. `Partial` means the line-based
/// fallback ran; its records may be incomplete and the warnings say why.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    Parsed(Vec<T>),
    Partial(Vec<T>, Vec<String>),
}

impl<T> ParseOutcome<T> {
    pub fn into_parts(self) -> (Vec<T>, Vec<String>) {
        match self {
            ParseOutcome::Parsed(records) => (records, Vec::new()),
            ParseOutcome::Partial(records, warnings) => (records, warnings),
        }
    }

    pub fn records(&self) -> &[T] {
        match self {
            ParseOutcome::Parsed(records) => records,
            ParseOutcome::Partial(records, _) => records,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RulesEnvelope {
    #[serde(default)]
    rules: Vec<RuleRecord>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkflowsEnvelope {
    #[serde(default)]
    workflows: Vec<WorkflowRecord>,
}

fn json_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// JSON-first parse of a rules response, with a line-based fallback for
/// responses that wrap or mangle the JSON.
pub fn parse_rules_response(text: &str) -> ParseOutcome<RuleRecord> {
    if let Some(slice) = json_slice(text) {
        if let Ok(envelope) = serde_json::from_str::<RulesEnvelope>(slice) {
            return ParseOutcome::Parsed(envelope.rules);
        }
    }
    fallback_parse_rules(text)
}

pub fn parse_workflows_response(text: &str) -> ParseOutcome<WorkflowRecord> {
    if let Some(slice) = json_slice(text) {
        if let Ok(envelope) = serde_json::from_str::<WorkflowsEnvelope>(slice) {
            return ParseOutcome::Parsed(envelope.workflows);
        }
    }
    fallback_parse_workflows(text)
}

fn fallback_parse_rules(text: &str) -> ParseOutcome<RuleRecord> {
    let mut warnings =
        vec!["response was not valid JSON; line-based fallback parser used".to_string()];
    let mut records = Vec::new();
    let mut current: Option<RuleRecord> = None;

    let mut flush = |record: RuleRecord, warnings: &mut Vec<String>| {
        if record.description.is_empty() {
            warnings.push(format!("record '{}' has no description", record.title));
        }
        if record.rules.is_empty() {
            warnings.push(format!("record '{}' has no rule items", record.title));
        }
        records.push(record);
    };

    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Title:") {
            if let Some(done) = current.take() {
                flush(done, &mut warnings);
            }
            current = Some(RuleRecord {
                title: rest.trim().to_string(),
                ..RuleRecord::default()
            });
        } else if let Some(record) = current.as_mut() {
            if let Some(rest) = line.strip_prefix("Category:") {
                record.category = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("Activation:") {
                record.activation = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("Glob:") {
                record.glob = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("Description:") {
                record.description = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("- ") {
                record.rules.push(rest.trim().to_string());
            }
        }
    }
    if let Some(done) = current.take() {
        flush(done, &mut warnings);
    }

    ParseOutcome::Partial(records, warnings)
}

fn fallback_parse_workflows(text: &str) -> ParseOutcome<WorkflowRecord> {
    let mut warnings =
        vec!["response was not valid JSON; line-based fallback parser used".to_string()];
    let mut records = Vec::new();
    let mut current: Option<WorkflowRecord> = None;

    let mut flush = |record: WorkflowRecord, warnings: &mut Vec<String>| {
        if record.steps.is_empty() {
            warnings.push(format!("workflow '{}' has no steps", record.title));
        }
        records.push(record);
    };

    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Title:") {
            if let Some(done) = current.take() {
                flush(done, &mut warnings);
            }
            current = Some(WorkflowRecord {
                title: rest.trim().to_string(),
                ..WorkflowRecord::default()
            });
        } else if let Some(record) = current.as_mut() {
            if let Some(rest) = line.strip_prefix("Description:") {
                record.description = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("- ") {
                record.steps.push(rest.trim().to_string());
            }
        }
    }
    if let Some(done) = current.take() {
        flush(done, &mut warnings);
    }

    ParseOutcome::Partial(records, warnings)
}

/// Ordered notifications emitted by a background generation run:
/// progress messages, then the parsed records, then exactly one
/// `Finished`.
#[derive(Debug, Clone)]
pub enum GenerationEvent {
    Progress(String),
    Rules {
        records: Vec<RuleRecord>,
        warnings: Vec<String>,
    },
    Workflows {
        records: Vec<WorkflowRecord>,
        warnings: Vec<String>,
    },
    Finished { success: bool, message: String },
}

/// Wraps the transport with prompt building and response parsing. Every
/// operation degrades to an empty result instead of erroring; callers
/// check `is_available` / `status_message` to explain why.
#[derive(Clone)]
pub struct AiClient {
    transport: Option<Arc<dyn PromptTransport>>,
    settings: AiSettings,
}

impl AiClient {
    pub fn new(settings: AiSettings) -> Self {
        let mut settings = settings;
        if settings.api_key.is_empty() {
            settings.api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
        }
        let transport: Option<Arc<dyn PromptTransport>> =
            if settings.enabled && !settings.api_key.is_empty() {
                Some(Arc::new(GeminiTransport::new(settings.clone())))
            } else {
                None
            };
        Self { transport, settings }
    }

    /// Test and embedding seam: supply the network capability directly.
    pub fn with_transport(transport: Arc<dyn PromptTransport>, settings: AiSettings) -> Self {
        Self {
            transport: Some(transport),
            settings,
        }
    }

    pub fn is_available(&self) -> bool {
        self.transport.is_some()
    }

    pub fn status_message(&self) -> String {
        if !self.settings.enabled {
            "AI generation is disabled in settings.".to_string()
        } else if self.settings.api_key.is_empty() {
            "API key not configured. Set it in settings or via the GEMINI_API_KEY environment variable.".to_string()
        } else {
            "AI generator ready!".to_string()
        }
    }

    /// Analyzes the project, prompts the model, and parses the response.
    /// Never errors: failures are logged and yield an empty list.
    pub async fn generate_rules(
        &self,
        idea: &str,
        project_root: &Path,
    ) -> (Vec<RuleRecord>, Vec<String>) {
        let Some(transport) = self.transport.clone() else {
            log::warn!("rules generation requested but AI is not configured");
            return (Vec::new(), Vec::new());
        };
        let info = analyzer::analyze(project_root);
        let prompt = build_rule_prompt(idea, &info);
        match transport.send_prompt(&prompt).await {
            Ok(response) => {
                let (records, warnings) = parse_rules_response(&response).into_parts();
                for warning in &warnings {
                    log::warn!("rules parse: {warning}");
                }
                (records, warnings)
            }
            Err(e) => {
                log::error!("rules generation failed: {e:#}");
                (Vec::new(), Vec::new())
            }
        }
    }

    pub async fn generate_workflows(
        &self,
        idea: &str,
        project_root: &Path,
    ) -> (Vec<WorkflowRecord>, Vec<String>) {
        let Some(transport) = self.transport.clone() else {
            log::warn!("workflow generation requested but AI is not configured");
            return (Vec::new(), Vec::new());
        };
        let info = analyzer::analyze(project_root);
        let prompt = build_workflow_prompt(idea, &info);
        match transport.send_prompt(&prompt).await {
            Ok(response) => {
                let (records, warnings) = parse_workflows_response(&response).into_parts();
                for warning in &warnings {
                    log::warn!("workflows parse: {warning}");
                }
                (records, warnings)
            }
            Err(e) => {
                log::error!("workflow generation failed: {e:#}");
                (Vec::new(), Vec::new())
            }
        }
    }

    /// Runs a generation on a background task and reports over a channel.
    /// Event order is fixed: progress, records, progress, finished.
    /// There is no cancellation; the task runs to completion or failure.
    pub fn generate_stream(
        &self,
        kind: DocKind,
        idea: String,
        project_root: PathBuf,
    ) -> mpsc::UnboundedReceiver<GenerationEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.clone();

        tokio::spawn(async move {
            let (count, event) = match kind {
                DocKind::Rules => {
                    let _ = tx.send(GenerationEvent::Progress(
                        "Analyzing project for rules generation...".to_string(),
                    ));
                    let (records, warnings) = client.generate_rules(&idea, &project_root).await;
                    let count = records.len();
                    (count, GenerationEvent::Rules { records, warnings })
                }
                DocKind::Workflows => {
                    let _ = tx.send(GenerationEvent::Progress(
                        "Analyzing project for workflow generation...".to_string(),
                    ));
                    let (records, warnings) = client.generate_workflows(&idea, &project_root).await;
                    let count = records.len();
                    (count, GenerationEvent::Workflows { records, warnings })
                }
            };

            let noun = match kind {
                DocKind::Rules => "rules",
                DocKind::Workflows => "workflows",
            };
            let _ = tx.send(event);
            let _ = tx.send(GenerationEvent::Progress(format!(
                "Generated {count} {noun}"
            )));

            let success = count > 0;
            let message = if success {
                "Generation completed successfully!".to_string()
            } else {
                format!("Generation produced no usable {noun}.")
            };
            let _ = tx.send(GenerationEvent::Finished { success, message });
        });

        rx
    }
}
