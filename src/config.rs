use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const MAX_RECENT_FILES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultPaths {
    pub rules: String,
    pub workflows: String,
}

impl Default for DefaultPaths {
    fn default() -> Self {
        Self {
            rules: ".ruleforge/rules".to_string(),
            workflows: ".ruleforge/workflows".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    pub window_width: u32,
    pub window_height: u32,
    pub theme: String,
    pub font_size: u32,
    pub auto_save_preview: bool,
    pub show_line_numbers: bool,
    pub word_wrap: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            window_width: 1200,
            window_height: 800,
            theme: "light".to_string(),
            font_size: 10,
            auto_save_preview: true,
            show_line_numbers: false,
            word_wrap: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub auto_timestamp: bool,
    pub backup_files: bool,
    pub default_encoding: String,
    pub line_ending: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            auto_timestamp: true,
            backup_files: false,
            default_encoding: "utf-8".to_string(),
            line_ending: "auto".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub enabled: bool,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.0-flash-exp".to_string(),
            temperature: 0.7,
            max_output_tokens: 2048,
            enabled: true,
        }
    }
}

/// Named text fragments with `{placeholder}` tokens. Kept in the document
/// so users can inspect and export them alongside the rest of the settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Templates {
    pub rule_template: BTreeMap<String, String>,
    pub workflow_template: BTreeMap<String, String>,
}

impl Default for Templates {
    fn default() -> Self {
        let fragments = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>()
        };
        Self {
            rule_template: fragments(&[
                (
                    "header",
                    "# {title}\n\n**Category:** {category}\n**Activation mode:** {activation}\n",
                ),
                ("glob_line", "**Glob pattern:** {glob}\n"),
                ("description", "**Description:** {description}\n\n"),
                ("rules_header", "**Rules:**\n"),
                ("rule_item", "- {rule}\n"),
                ("footer", "\n_Generated on {timestamp}_"),
            ]),
            workflow_template: fragments(&[
                ("header", "# {title}\n\n**Description:** {description}\n\n"),
                ("steps_header", "**Steps:**\n"),
                ("step_item", "{number}. {step}\n"),
                ("footer", "\n_Generated on {timestamp}_"),
            ]),
        }
    }
}

fn default_categories() -> Vec<String> {
    [
        "UI",
        "Database",
        "Logic",
        "Security",
        "Performance",
        "Testing",
        "Documentation",
        "API",
        "Configuration",
        "Deployment",
        "Validation",
        "Error Handling",
        "Logging",
        "Authentication",
        "Authorization",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_activation_modes() -> Vec<String> {
    ["Always On", "Manual", "Glob", "Conditional"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_shortcuts() -> BTreeMap<String, String> {
    [
        ("generate_rule", "Ctrl+R"),
        ("generate_workflow", "Ctrl+W"),
        ("copy_preview", "Ctrl+C"),
        ("clear_preview", "Ctrl+L"),
        ("browse_folder", "Ctrl+O"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// The full configuration document. Known sections are typed; anything
/// else a loaded file carries lands in `extra` and survives round trips.
/// Every field has a serde default, so documents missing keys are
/// backfilled on load and import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_paths: DefaultPaths,
    pub categories: Vec<String>,
    pub activation_modes: Vec<String>,
    pub ui_settings: UiSettings,
    pub file_settings: FileSettings,
    pub templates: Templates,
    pub recent_files: Vec<String>,
    pub shortcuts: BTreeMap<String, String>,
    pub ai_settings: AiSettings,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_paths: DefaultPaths::default(),
            categories: default_categories(),
            activation_modes: default_activation_modes(),
            ui_settings: UiSettings::default(),
            file_settings: FileSettings::default(),
            templates: Templates::default(),
            recent_files: Vec::new(),
            shortcuts: default_shortcuts(),
            ai_settings: AiSettings::default(),
            extra: Map::new(),
        }
    }
}

/// Owns the configuration document and its persistence path. Not safe for
/// concurrent mutation; callers serialize access.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    pub settings: Settings,
}

impl ConfigStore {
    /// Loads the document at `path`, falling back to the compiled-in
    /// defaults (and persisting them) when the file is absent or corrupt.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::read_settings(&path) {
            Ok(Some(settings)) => Self { path, settings },
            Ok(None) => {
                let store = Self {
                    path,
                    settings: Settings::default(),
                };
                store.save();
                store
            }
            Err(e) => {
                log::warn!(
                    "could not read config {}: {e:#}; using defaults",
                    path.display()
                );
                let store = Self {
                    path,
                    settings: Settings::default(),
                };
                store.save();
                store
            }
        }
    }

    pub fn load_default_location() -> Self {
        Self::load(Self::default_location())
    }

    pub fn default_location() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ruleforge")
            .join("settings.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_settings(path: &Path) -> Result<Option<Settings>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let settings = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Some(settings))
    }

    fn write_pretty(path: &Path, settings: &Settings) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        // 4-space indentation; serde_json leaves non-ASCII unescaped.
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut buf = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        settings
            .serialize(&mut serializer)
            .context("failed to serialize settings")?;
        fs::write(path, buf).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Persists the current document. Failures are logged, never raised.
    pub fn save(&self) -> bool {
        match Self::write_pretty(&self.path, &self.settings) {
            Ok(()) => true,
            Err(e) => {
                log::error!("error saving config: {e:#}");
                false
            }
        }
    }

    /// Dotted-path read over the serialized document, e.g.
    /// `get("ui_settings.theme", "light".to_string())`. Missing segments
    /// and type mismatches yield the supplied default.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let doc = match serde_json::to_value(&self.settings) {
            Ok(doc) => doc,
            Err(_) => return default,
        };
        let mut current = &doc;
        for segment in key.split('.') {
            match current.get(segment) {
                Some(next) => current = next,
                None => return default,
            }
        }
        serde_json::from_value(current.clone()).unwrap_or(default)
    }

    /// Dotted-path write; intermediate objects are created as needed.
    /// Returns false when the resulting document no longer deserializes
    /// (e.g. a typed field was set to an incompatible value). Does not
    /// persist; call `save` afterwards.
    pub fn set<V: Serialize>(&mut self, key: &str, value: V) -> bool {
        let mut doc = match serde_json::to_value(&self.settings) {
            Ok(doc) => doc,
            Err(e) => {
                log::error!("error setting config key '{key}': {e}");
                return false;
            }
        };

        let segments: Vec<&str> = key.split('.').collect();
        let leaf = match segments.last() {
            Some(leaf) if !leaf.is_empty() => leaf.to_string(),
            _ => return false,
        };

        let mut current = &mut doc;
        for segment in &segments[..segments.len() - 1] {
            let map = match current.as_object_mut() {
                Some(map) => map,
                None => {
                    log::error!("error setting config key '{key}': not an object");
                    return false;
                }
            };
            current = map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }

        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                log::error!("error setting config key '{key}': {e}");
                return false;
            }
        };
        match current.as_object_mut() {
            Some(map) => {
                map.insert(leaf, value);
            }
            None => {
                log::error!("error setting config key '{key}': not an object");
                return false;
            }
        }

        match serde_json::from_value(doc) {
            Ok(settings) => {
                self.settings = settings;
                true
            }
            Err(e) => {
                log::error!("error setting config key '{key}': {e}");
                false
            }
        }
    }

    /// Moves `path` to the front of the recent list, dropping duplicates
    /// and anything beyond the cap. Persists immediately.
    pub fn add_recent_file(&mut self, path: &str) {
        let recent = &mut self.settings.recent_files;
        recent.retain(|p| p != path);
        recent.insert(0, path.to_string());
        recent.truncate(MAX_RECENT_FILES);
        self.save();
    }

    pub fn categories(&self) -> &[String] {
        &self.settings.categories
    }

    /// Appends a category and persists; returns false if it already exists.
    pub fn add_category(&mut self, category: &str) -> bool {
        if self.settings.categories.iter().any(|c| c == category) {
            return false;
        }
        self.settings.categories.push(category.to_string());
        self.save();
        true
    }

    /// Removes a category and persists; returns false if it was absent.
    pub fn remove_category(&mut self, category: &str) -> bool {
        let before = self.settings.categories.len();
        self.settings.categories.retain(|c| c != category);
        if self.settings.categories.len() == before {
            return false;
        }
        self.save();
        true
    }

    pub fn reset_to_defaults(&mut self) {
        self.settings = Settings::default();
        self.save();
    }

    /// Writes the live document verbatim to `path`.
    pub fn export_to(&self, path: &Path) -> bool {
        match Self::write_pretty(path, &self.settings) {
            Ok(()) => true,
            Err(e) => {
                log::error!("error exporting config: {e:#}");
                false
            }
        }
    }

    /// Replaces the live document with the one at `path`; top-level keys
    /// missing from the file are backfilled from defaults during parsing.
    /// The live document is untouched when the file cannot be read.
    pub fn import_from(&mut self, path: &Path) -> bool {
        match Self::read_settings(path) {
            Ok(Some(settings)) => {
                self.settings = settings;
                self.save()
            }
            Ok(None) => {
                log::error!("error importing config: {} does not exist", path.display());
                false
            }
            Err(e) => {
                log::error!("error importing config: {e:#}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> ConfigStore {
        ConfigStore::load(dir.join("settings.json"))
    }

    #[test]
    fn fresh_store_persists_defaults() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        assert!(store.path().exists());
        assert_eq!(store.get("ui_settings.theme", String::new()), "light");
        assert_eq!(store.categories().len(), 15);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        let store = ConfigStore::load(&path);
        assert_eq!(store.settings, Settings::default());
    }

    #[test]
    fn set_save_load_round_trip() {
        let tmp = tempdir().unwrap();
        let mut store = store_in(tmp.path());
        assert!(store.set("ui_settings.theme", "dark"));
        assert!(store.save());

        let reloaded = store_in(tmp.path());
        assert_eq!(
            reloaded.get("ui_settings.theme", "light".to_string()),
            "dark"
        );
    }

    #[test]
    fn set_alone_does_not_persist() {
        let tmp = tempdir().unwrap();
        let mut store = store_in(tmp.path());
        assert!(store.set("ui_settings.theme", "dark"));

        let reloaded = store_in(tmp.path());
        assert_eq!(reloaded.get("ui_settings.theme", String::new()), "light");
    }

    #[test]
    fn get_returns_default_on_missing_or_mismatch() {
        let tmp = tempdir().unwrap();
        let store = store_in(tmp.path());
        assert_eq!(store.get("no.such.key", 7), 7);
        // theme is a string, so asking for a number falls back
        assert_eq!(store.get("ui_settings.theme", 42), 42);
    }

    #[test]
    fn set_creates_intermediate_levels_in_extra() {
        let tmp = tempdir().unwrap();
        let mut store = store_in(tmp.path());
        assert!(store.set("plugin.colors.accent", "teal"));
        assert_eq!(store.get("plugin.colors.accent", String::new()), "teal");
        assert!(store.settings.extra.contains_key("plugin"));
    }

    #[test]
    fn set_rejects_type_mismatch_on_typed_field() {
        let tmp = tempdir().unwrap();
        let mut store = store_in(tmp.path());
        assert!(!store.set("categories", 5));
        assert_eq!(store.categories().len(), 15);
    }

    #[test]
    fn add_category_refuses_duplicates() {
        let tmp = tempdir().unwrap();
        let mut store = store_in(tmp.path());
        assert!(!store.add_category("UI"));
        assert_eq!(store.categories().len(), 15);
        assert!(store.add_category("Caching"));
        assert_eq!(store.categories().last().unwrap(), "Caching");
    }

    #[test]
    fn remove_category_is_symmetric() {
        let tmp = tempdir().unwrap();
        let mut store = store_in(tmp.path());
        assert!(store.remove_category("UI"));
        assert!(!store.remove_category("UI"));
        assert_eq!(store.categories().len(), 14);
    }

    #[test]
    fn recent_files_dedupe_front_insert_and_cap() {
        let tmp = tempdir().unwrap();
        let mut store = store_in(tmp.path());
        for i in 0..12 {
            store.add_recent_file(&format!("/tmp/f{i}.md"));
        }
        store.add_recent_file("/tmp/f5.md");

        let recent = &store.settings.recent_files;
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0], "/tmp/f5.md");
        assert_eq!(recent.iter().filter(|p| *p == "/tmp/f5.md").count(), 1);
    }

    #[test]
    fn import_backfills_missing_keys_and_keeps_unknown_ones() {
        let tmp = tempdir().unwrap();
        let mut store = store_in(tmp.path());
        let import = tmp.path().join("import.json");
        fs::write(
            &import,
            r#"{"ui_settings": {"theme": "dark"}, "custom_section": {"a": 1}}"#,
        )
        .unwrap();

        assert!(store.import_from(&import));
        assert_eq!(store.categories().len(), 15);
        assert_eq!(store.get("ui_settings.theme", String::new()), "dark");
        assert_eq!(store.get("custom_section.a", 0), 1);
    }

    #[test]
    fn failed_import_leaves_live_document_untouched() {
        let tmp = tempdir().unwrap();
        let mut store = store_in(tmp.path());
        store.set("ui_settings.theme", "dark");
        let import = tmp.path().join("import.json");
        fs::write(&import, "{broken").unwrap();

        assert!(!store.import_from(&import));
        assert_eq!(store.get("ui_settings.theme", String::new()), "dark");
        assert!(!store.import_from(&tmp.path().join("missing.json")));
    }

    #[test]
    fn export_then_import_round_trips() {
        let tmp = tempdir().unwrap();
        let mut store = store_in(tmp.path());
        store.set("ui_settings.font_size", 14);
        store.save();
        let export = tmp.path().join("export.json");
        assert!(store.export_to(&export));

        let mut other = ConfigStore::load(tmp.path().join("other.json"));
        assert!(other.import_from(&export));
        assert_eq!(other.get("ui_settings.font_size", 0), 14);
    }

    #[test]
    fn reset_restores_defaults_and_persists() {
        let tmp = tempdir().unwrap();
        let mut store = store_in(tmp.path());
        store.add_category("Extra");
        store.reset_to_defaults();
        assert_eq!(store.settings, Settings::default());

        let reloaded = store_in(tmp.path());
        assert_eq!(reloaded.settings, Settings::default());
    }

    #[test]
    fn saved_file_uses_four_space_indent_and_raw_unicode() {
        let tmp = tempdir().unwrap();
        let mut store = store_in(tmp.path());
        store.add_category("Sécurité");
        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.lines().any(|l| l.starts_with("    \"categories\"")));
        assert!(content.contains("Sécurité"));
    }
}
