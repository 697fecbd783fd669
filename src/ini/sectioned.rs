//! Reader for the INI dialect the pipeline engine uses:
//!
//! - `[section]` headers, `key = value` or `key: value` options
//! - option names are case-insensitive (stored lowercased)
//! - whole-line comments start with `#` or `;`
//! - inline comments start with `#` or `;` preceded by whitespace, so tokens
//!   such as `data_vector/2pt_theory#457` survive intact
//! - indented lines continue the previous value, also across blank lines
//! - duplicate sections or options are errors
//! - `[DEFAULT]` options are visible from every section
//!
//! Value interpolation (`%(name)s`) is not performed.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::error::{BridgeError, Result};

/// Options of one section, keyed by lowercased option name.
pub type Section = BTreeMap<String, String>;

const DEFAULT_SECTION: &str = "DEFAULT";
const COMMENT_PREFIXES: [char; 2] = ['#', ';'];

/// Parsed configuration file. Read-only once loaded, apart from the explicit
/// overrides the bridge applies through [`SectionedConfig::set`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionedConfig {
    origin: Option<PathBuf>,
    defaults: Section,
    sections: BTreeMap<String, Section>,
}

impl SectionedConfig {
    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => BridgeError::NotFound(path.to_path_buf()),
            _ => BridgeError::io(path, e),
        })?;
        let mut config = Self::parse(&text, path)?;
        config.origin = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse configuration text. `origin` is only used in error messages.
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        let fail = |line: usize, message: String| BridgeError::ConfigParse {
            path: origin.to_path_buf(),
            line,
            message,
        };

        let mut config = SectionedConfig::default();
        let mut current: Option<String> = None;
        // (section, option) of the value that indented lines continue.
        let mut open_value: Option<(String, String)> = None;
        // Blank lines seen since the last value line; kept if the value goes on.
        let mut blank_run = 0usize;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() {
                blank_run += 1;
                continue;
            }
            if trimmed.starts_with(COMMENT_PREFIXES) {
                continue;
            }

            let content = strip_inline_comment(raw);
            let stripped = content.trim();
            if stripped.is_empty() {
                continue;
            }

            let indented = raw.starts_with([' ', '\t']);
            if indented {
                if let Some((section, key)) = &open_value {
                    let value = config
                        .section_mut(section)
                        .get_mut(key)
                        .ok_or_else(|| fail(line_no, "dangling continuation line".to_string()))?;
                    if !value.is_empty() {
                        value.push('\n');
                        for _ in 0..blank_run {
                            value.push('\n');
                        }
                    }
                    value.push_str(stripped);
                    blank_run = 0;
                    continue;
                }
            }
            blank_run = 0;

            if let Some(rest) = stripped.strip_prefix('[') {
                let name = rest
                    .strip_suffix(']')
                    .ok_or_else(|| fail(line_no, format!("unterminated section header '{stripped}'")))?
                    .trim();
                if name.is_empty() {
                    return Err(fail(line_no, "empty section name".to_string()));
                }
                if name != DEFAULT_SECTION && config.sections.contains_key(name) {
                    return Err(fail(line_no, format!("section '{name}' already exists")));
                }
                if name != DEFAULT_SECTION {
                    config.sections.insert(name.to_string(), Section::new());
                }
                current = Some(name.to_string());
                open_value = None;
                continue;
            }

            let Some(section) = current.clone() else {
                return Err(fail(line_no, format!("option outside of any section: '{stripped}'")));
            };

            let Some(split) = stripped.find(['=', ':']) else {
                return Err(fail(line_no, format!("expected 'key = value', got '{stripped}'")));
            };
            let key = stripped[..split].trim().to_lowercase();
            let value = stripped[split + 1..].trim().to_string();
            if key.is_empty() {
                return Err(fail(line_no, "empty option name".to_string()));
            }

            let target = config.section_mut(&section);
            if target.contains_key(&key) {
                return Err(fail(
                    line_no,
                    format!("option '{key}' in section '{section}' already exists"),
                ));
            }
            target.insert(key.clone(), value);
            open_value = Some((section, key));
        }

        Ok(config)
    }

    /// File this configuration was loaded from, if any.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Look up an option in an existing section, falling back to `[DEFAULT]`.
    /// Sections absent from the file have no options.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let key = key.to_lowercase();
        let own = self.sections.get(section)?;
        own.get(&key)
            .or_else(|| self.defaults.get(&key))
            .map(String::as_str)
    }

    /// Like [`get`](Self::get) but a missing option is an error.
    pub fn require(&self, section: &str, key: &str) -> Result<&str> {
        self.get(section, key).ok_or_else(|| BridgeError::MissingKey {
            section: section.to_string(),
            key: key.to_string(),
        })
    }

    /// Set an option, creating the section if needed.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.section_mut(section).insert(key.to_lowercase(), value.into());
    }

    /// Options of one section merged over `[DEFAULT]`.
    pub fn section(&self, section: &str) -> Option<Section> {
        let own = self.sections.get(section)?;
        let mut merged = self.defaults.clone();
        merged.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
        Some(merged)
    }

    /// Names of all sections except `[DEFAULT]`.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Every `(section, option, value)` triple, `[DEFAULT]` merged in.
    pub fn entries(&self) -> Vec<(String, String, String)> {
        let mut out = Vec::new();
        for name in self.section_names() {
            if let Some(section) = self.section(name) {
                for (key, value) in section {
                    out.push((name.to_string(), key, value));
                }
            }
        }
        out
    }

    /// Render back to INI text.
    pub fn to_ini_string(&self) -> String {
        let mut out = String::new();
        let mut write_section = |name: &str, section: &Section| {
            let _ = writeln!(out, "[{name}]");
            for (key, value) in section {
                let value = value.replace('\n', "\n    ");
                let _ = writeln!(out, "{key} = {value}");
            }
            out.push('\n');
        };
        if !self.defaults.is_empty() {
            write_section(DEFAULT_SECTION, &self.defaults);
        }
        for (name, section) in &self.sections {
            write_section(name, section);
        }
        out
    }

    fn section_mut(&mut self, section: &str) -> &mut Section {
        if section == DEFAULT_SECTION {
            return &mut self.defaults;
        }
        self.sections.entry(section.to_string()).or_default()
    }
}

/// Cut an inline comment: a comment prefix preceded by whitespace.
fn strip_inline_comment(line: &str) -> &str {
    let mut prev_ws = false;
    for (idx, ch) in line.char_indices() {
        if prev_ws && COMMENT_PREFIXES.contains(&ch) {
            return &line[..idx];
        }
        prev_ws = ch.is_whitespace();
    }
    line
}
