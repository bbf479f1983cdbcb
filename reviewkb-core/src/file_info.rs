//! Language and directory derivation from repository file paths
//!
//! Paths come from GitHub and always use `/` separators, so these helpers
//! work on strings rather than `std::path::Path`.

/// Language tag for paths with no recognised extension
pub const UNKNOWN_LANGUAGE: &str = "unknown";

const LANGUAGES: &[(&str, &str)] = &[
    ("go", "go"),
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("py", "python"),
    ("java", "java"),
    ("c", "c"),
    ("h", "c"),
    ("cpp", "cpp"),
    ("hpp", "cpp"),
    ("cc", "cpp"),
    ("cxx", "cpp"),
    ("cs", "csharp"),
    ("php", "php"),
    ("rb", "ruby"),
    ("rs", "rust"),
    ("vue", "vue"),
    ("css", "css"),
    ("scss", "scss"),
    ("sass", "sass"),
    ("less", "less"),
    ("html", "html"),
    ("xml", "xml"),
    ("json", "json"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("toml", "toml"),
    ("md", "markdown"),
    ("sh", "shell"),
    ("sql", "sql"),
];

const TEST_DIRECTORIES: &[&str] = &["test", "tests", "__tests__", "spec"];
const TEST_NAME_MARKERS: &[&str] = &["_test.", ".test.", ".spec.", "_spec."];

const CONFIG_FILE_NAMES: &[&str] = &[
    "dockerfile",
    "makefile",
    "package.json",
    "go.mod",
    "go.sum",
    "cargo.toml",
    "requirements.txt",
    ".gitignore",
    ".dockerignore",
];
const CONFIG_NAME_PREFIXES: &[&str] = &["config.", ".env", "docker-compose."];

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Map a file path to a language tag
pub fn language_for(path: &str) -> &'static str {
    let name = file_name(path);
    match name {
        "Dockerfile" => return "dockerfile",
        "Makefile" => return "makefile",
        _ => {}
    }

    let Some((stem, ext)) = name.rsplit_once('.') else {
        return UNKNOWN_LANGUAGE;
    };
    // Dotfiles such as `.bashrc` have no extension
    if stem.is_empty() {
        return UNKNOWN_LANGUAGE;
    }

    let ext = ext.to_ascii_lowercase();
    LANGUAGES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| *lang)
        .unwrap_or(UNKNOWN_LANGUAGE)
}

/// Directory containing `path`
///
/// A bare filename or empty path yields `"."`, a file at the root yields
/// `"/"`, and a leading `./` is dropped.
pub fn directory_for(path: &str) -> String {
    let dir = match path.rsplit_once('/') {
        None => return ".".to_string(),
        Some(("", _)) => return "/".to_string(),
        Some((dir, _)) => dir,
    };

    let mut dir = dir;
    while let Some(rest) = dir.strip_prefix("./") {
        dir = rest;
    }

    match dir {
        "" | "." => ".".to_string(),
        _ => dir.to_string(),
    }
}

/// Whether `path` looks like a test file or lives in a test directory
pub fn is_test_file(path: &str) -> bool {
    if path.is_empty() {
        return false;
    }

    let lower = path.to_lowercase();
    let mut segments: Vec<&str> = lower.split('/').collect();
    let name = segments.pop().unwrap_or_default();

    if segments.iter().any(|s| TEST_DIRECTORIES.contains(s)) {
        return true;
    }

    name.starts_with("test_") || TEST_NAME_MARKERS.iter().any(|m| name.contains(m))
}

/// Whether `path` names a build, packaging or environment configuration file
pub fn is_config_file(path: &str) -> bool {
    let name = file_name(path).to_lowercase();
    if name.is_empty() {
        return false;
    }

    CONFIG_FILE_NAMES.contains(&name.as_str())
        || CONFIG_NAME_PREFIXES.iter().any(|p| name.starts_with(p))
}
