use std::fs;
use std::path::Path;

/// Characters that are unsafe in filenames on at least one target platform.
pub const RESERVED_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Outcome of an input check. Validation problems are user-correctable,
/// so they are reported as data rather than errors.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub ok: bool,
    pub message: String,
}

impl Validation {
    pub fn pass() -> Self {
        Self {
            ok: true,
            message: String::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }

    fn from_errors(errors: Vec<String>) -> Self {
        if errors.is_empty() {
            Self::pass()
        } else {
            Self::fail(errors.join("\n"))
        }
    }
}

pub fn is_valid_filename_part(text: &str) -> bool {
    !text.chars().any(|c| RESERVED_FILENAME_CHARS.contains(&c))
}

pub fn validate_rule_input(
    title: &str,
    category: &str,
    description: &str,
    items: &[String],
) -> Validation {
    let mut errors = Vec::new();

    if title.trim().is_empty() {
        errors.push("Rule title is required".to_string());
    }
    if category.trim().is_empty() {
        errors.push("Rule category is required".to_string());
    }
    if description.trim().is_empty() {
        errors.push("Rule description is required".to_string());
    }
    if !items.iter().any(|item| !item.trim().is_empty()) {
        errors.push("At least one rule item is required".to_string());
    }
    if !title.is_empty() && !is_valid_filename_part(title) {
        errors.push("Rule title contains invalid characters for filename".to_string());
    }

    Validation::from_errors(errors)
}

pub fn validate_workflow_input(title: &str, description: &str, steps: &[String]) -> Validation {
    let mut errors = Vec::new();

    if title.trim().is_empty() {
        errors.push("Workflow title is required".to_string());
    }
    if description.trim().is_empty() {
        errors.push("Workflow description is required".to_string());
    }
    if !steps.iter().any(|step| !step.trim().is_empty()) {
        errors.push("At least one workflow step is required".to_string());
    }
    if !title.is_empty() && !is_valid_filename_part(title) {
        errors.push("Workflow title contains invalid characters for filename".to_string());
    }

    Validation::from_errors(errors)
}

/// Checks that `path` names a writable directory, creating it (and its
/// parents) if absent. The create-on-probe side effect is intentional and
/// matches the behavior callers depend on.
pub fn validate_directory_path(path: &str) -> Validation {
    if path.is_empty() {
        return Validation::fail("Path is required");
    }

    let dir = Path::new(path);
    if !dir.exists() {
        if let Err(e) = fs::create_dir_all(dir) {
            return Validation::fail(format!("Invalid directory path: {e}"));
        }
    }

    // Writability is probed with a throwaway file; permission bits alone
    // are unreliable across platforms.
    let probe = dir.join(".ruleforge_write_probe");
    match fs::File::create(&probe) {
        Ok(_) => {
            let _ = fs::remove_file(&probe);
            Validation::pass()
        }
        Err(_) => Validation::fail("Directory is not writable"),
    }
}

/// Superficial character check only; the pattern is never evaluated.
pub fn validate_glob_pattern(pattern: &str) -> Validation {
    if pattern.is_empty() {
        return Validation::pass();
    }

    let allowed = |c: char| {
        c.is_ascii_alphanumeric()
            || matches!(c, '_' | '-' | '.' | '*' | '?' | '[' | ']' | '/' | '\\')
    };
    if pattern.chars().all(allowed) {
        Validation::pass()
    } else {
        Validation::fail("Glob pattern contains invalid characters")
    }
}

pub fn validate_api_key(api_key: &str) -> Validation {
    let key = api_key.trim();
    if key.is_empty() {
        return Validation::fail("API key is required");
    }
    if key.chars().count() < 20 {
        return Validation::fail("API key appears to be too short");
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Validation::fail("API key contains invalid characters");
    }
    Validation::pass()
}

pub fn validate_project_idea(idea: &str) -> Validation {
    let idea = idea.trim();
    if idea.is_empty() {
        return Validation::fail("Project idea is required");
    }
    // Length bounds count characters, not UTF-8 bytes; ideas are often
    // written in non-Latin scripts.
    let length = idea.chars().count();
    if length < 10 {
        return Validation::fail("Project idea should be at least 10 characters long");
    }
    if length > 2000 {
        return Validation::fail("Project idea is too long (max 2000 characters)");
    }
    Validation::pass()
}
