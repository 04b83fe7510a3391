use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_title() -> String {
    "Untitled".to_string()
}

fn default_category() -> String {
    "General".to_string()
}

fn default_activation() -> String {
    "Manual".to_string()
}

/// A single rule document before rendering. AI responses frequently omit
/// fields, so every field deserializes with a usable default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_activation")]
    pub activation: String,
    #[serde(default)]
    pub glob: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rules: Vec<String>,
}

impl Default for RuleRecord {
    fn default() -> Self {
        Self {
            title: default_title(),
            category: default_category(),
            activation: default_activation(),
            glob: String::new(),
            description: String::new(),
            rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<String>,
}

impl Default for WorkflowRecord {
    fn default() -> Self {
        Self {
            title: default_title(),
            description: String::new(),
            steps: Vec::new(),
        }
    }
}

/// A rendered document ready to be written to disk. The content is final:
/// it is written byte-for-byte, never post-processed.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDoc {
    pub filename: String,
    pub content: String,
}

/// Summary of a scanned project directory, fed into AI prompt building.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectInfo {
    pub root: PathBuf,
    pub files: Vec<String>,
    pub file_count: usize,
    pub languages: Vec<String>,
    pub frameworks: Vec<String>,
}
