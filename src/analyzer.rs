use std::collections::BTreeSet;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

use crate::records::ProjectInfo;

fn language_for(extension: &str) -> Option<&'static str> {
    let language = match extension {
        "py" => "Python",
        "js" => "JavaScript",
        "ts" => "TypeScript",
        "java" => "Java",
        "cpp" => "C++",
        "c" => "C",
        "cs" => "C#",
        "php" => "PHP",
        "rb" => "Ruby",
        "go" => "Go",
        "rs" => "Rust",
        "html" => "HTML",
        "css" => "CSS",
        "scss" => "SCSS",
        "json" => "JSON",
        "xml" => "XML",
        "yaml" | "yml" => "YAML",
        _ => return None,
    };
    Some(language)
}

fn framework_for(filename: &str) -> Option<&'static str> {
    let framework = match filename {
        "package.json" => "Node.js",
        "requirements.txt" => "Python",
        "gemfile" => "Ruby",
        "pom.xml" => "Java/Maven",
        "build.gradle" => "Java/Gradle",
        "cargo.toml" => "Rust",
        "go.mod" => "Go",
        "composer.json" => "PHP",
        _ => return None,
    };
    Some(framework)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

/// Walks a project tree and summarizes it for prompt building. Hidden
/// files and whole dot-directories are skipped at every depth. Traversal
/// errors are logged and skipped; the result is always usable.
pub fn analyze(root: &Path) -> ProjectInfo {
    let mut info = ProjectInfo {
        root: root.to_path_buf(),
        ..ProjectInfo::default()
    };

    if !root.exists() {
        return info;
    }

    let mut languages = BTreeSet::new();
    let mut frameworks = BTreeSet::new();

    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry));
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("skipping unreadable entry under {}: {e}", root.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();
        info.files.push(relative);
        info.file_count += 1;

        if let Some(extension) = entry.path().extension().and_then(|e| e.to_str()) {
            if let Some(language) = language_for(&extension.to_lowercase()) {
                languages.insert(language);
            }
        }
        if let Some(filename) = entry.file_name().to_str() {
            if let Some(framework) = framework_for(&filename.to_lowercase()) {
                frameworks.insert(framework);
            }
        }
    }

    info.languages = languages.into_iter().map(String::from).collect();
    info.frameworks = frameworks.into_iter().map(String::from).collect();
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn missing_root_yields_empty_shell() {
        let info = analyze(Path::new("/no/such/dir"));
        assert_eq!(info.file_count, 0);
        assert!(info.files.is_empty());
        assert!(info.languages.is_empty());
        assert!(info.frameworks.is_empty());
    }

    #[test]
    fn detects_languages_and_frameworks() {
        let tmp = tempdir().unwrap();
        touch(&tmp.path().join("src/main.rs"));
        touch(&tmp.path().join("Cargo.toml"));
        touch(&tmp.path().join("web/app.TS"));
        touch(&tmp.path().join("web/package.json"));

        let info = analyze(tmp.path());
        assert_eq!(info.file_count, 4);
        assert_eq!(info.languages, vec!["JSON", "Rust", "TypeScript"]);
        assert_eq!(info.frameworks, vec!["Node.js", "Rust"]);
    }

    #[test]
    fn skips_hidden_files_and_directories_at_any_depth() {
        let tmp = tempdir().unwrap();
        touch(&tmp.path().join("src/lib.rs"));
        touch(&tmp.path().join(".git/config"));
        touch(&tmp.path().join("src/.cache/data.json"));
        touch(&tmp.path().join("src/.hidden.py"));

        let info = analyze(tmp.path());
        assert_eq!(info.files, vec!["src/lib.rs".to_string()]);
        assert_eq!(info.languages, vec!["Rust"]);
    }

    #[test]
    fn languages_are_deduplicated() {
        let tmp = tempdir().unwrap();
        touch(&tmp.path().join("a.py"));
        touch(&tmp.path().join("b.py"));
        touch(&tmp.path().join("c.yml"));
        touch(&tmp.path().join("d.yaml"));

        let info = analyze(tmp.path());
        assert_eq!(info.languages, vec!["Python", "YAML"]);
    }
}
