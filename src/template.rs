//! Compiled-in project template.
//!
//! The whole `template/` directory and the `scripts/goon_init` bootstrap
//! script are embedded with `rust-embed` (`debug-embed` keeps debug builds
//! embedded too), so the store never touches the filesystem at runtime.

use rust_embed::RustEmbed;
use std::borrow::Cow;
use thiserror::Error;

const TEMPLATE_PREFIX: &str = "template/";
const SCRIPT_PREFIX: &str = "scripts/";
const SCRIPT_FILE: &str = "goon_init";

#[derive(RustEmbed)]
#[folder = "template/"]
struct TemplateAssets;

#[derive(RustEmbed)]
#[folder = "scripts/"]
#[include = "goon_init"]
struct ScriptAssets;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template file not found: {0}")]
    NotFound(String),
}

/// A named, immutable blob from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    pub name: Cow<'static, str>,
    pub contents: Cow<'static, [u8]>,
}

impl TemplateFile {
    pub fn new(name: impl Into<Cow<'static, str>>, contents: impl Into<Cow<'static, [u8]>>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// Final path segment of the name; staging drops any directory prefix.
    pub fn file_name(&self) -> &str {
        flattened_name(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct TemplateStore {
    files: Vec<TemplateFile>,
    script: TemplateFile,
}

impl TemplateStore {
    pub fn new(files: Vec<TemplateFile>, script: TemplateFile) -> Self {
        Self { files, script }
    }

    /// The store compiled into this binary.
    pub fn embedded() -> Result<Self, TemplateError> {
        let files = TemplateAssets::iter()
            .map(|path| {
                let file = TemplateAssets::get(&path)
                    .ok_or_else(|| TemplateError::NotFound(format!("{}{}", TEMPLATE_PREFIX, path)))?;
                Ok(TemplateFile::new(
                    format!("{}{}", TEMPLATE_PREFIX, path),
                    file.data,
                ))
            })
            .collect::<Result<Vec<_>, TemplateError>>()?;

        let script = ScriptAssets::get(SCRIPT_FILE)
            .ok_or_else(|| TemplateError::NotFound(format!("{}{}", SCRIPT_PREFIX, SCRIPT_FILE)))?;
        Ok(Self::new(
            files,
            TemplateFile::new(format!("{}{}", SCRIPT_PREFIX, SCRIPT_FILE), script.data),
        ))
    }

    /// Names of all template files in sorted order, bootstrap script excluded.
    pub fn list_template_files(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .files
            .iter()
            .map(|f| &*f.name)
            .filter(|name| !name.starts_with(SCRIPT_PREFIX) && *name != self.script.name)
            .collect();
        names.sort_unstable();
        names
    }

    pub fn read_file(&self, name: &str) -> Result<&[u8], TemplateError> {
        if name == self.script.name {
            return Ok(&*self.script.contents);
        }
        self.files
            .iter()
            .find(|f| f.name == name)
            .map(|f| &*f.contents)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }

    pub fn bootstrap_script(&self) -> &TemplateFile {
        &self.script
    }
}

pub fn flattened_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
