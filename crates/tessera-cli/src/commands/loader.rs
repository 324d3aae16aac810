//! Reads the JSON inputs every command shares.
//!
//! A project is either one `Project` file, a directory whose `*.json`
//! files each hold one `SourceEntry`, or `-` for a project on stdin.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tessera_compiler::{Settings, ShaderDefinition};
use tessera_core::{Project, SourceEntry};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("no .json files found in '{}'", .0.display())]
    EmptyDirectory(PathBuf),

    #[error("shader definition is required: use --shader or -f/--fragment")]
    MissingShader,

    #[error("shader definition '{0}' lists no fragments")]
    NoFragments(String),
}

/// Where the shader definition comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSource {
    File(PathBuf),
    Inline { name: String, fragments: Vec<String> },
}

pub fn load_project(path: &Path) -> Result<Project, LoadError> {
    if path.as_os_str() == "-" {
        return load_stdin();
    }
    if path.is_dir() {
        return load_directory(path);
    }
    read_json(path)
}

pub fn load_settings(path: Option<&Path>) -> Result<Settings, LoadError> {
    match path {
        Some(path) => read_json(path),
        None => Ok(Settings::default()),
    }
}

pub fn load_shader(source: Option<&ShaderSource>) -> Result<ShaderDefinition, LoadError> {
    let def = match source {
        None => return Err(LoadError::MissingShader),
        Some(ShaderSource::File(path)) => read_json::<ShaderDefinition>(path)?,
        Some(ShaderSource::Inline { name, fragments }) => {
            let mut def = ShaderDefinition::new(name.clone());
            def.fragments = fragments.clone();
            def
        }
    };
    if def.fragments.is_empty() {
        return Err(LoadError::NoFragments(def.name));
    }
    Ok(def)
}

fn load_stdin() -> Result<Project, LoadError> {
    let path = PathBuf::from("<stdin>");
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf).map_err(|source| LoadError::Read {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&buf).map_err(|source| LoadError::Parse { path, source })
}

fn load_directory(dir: &Path) -> Result<Project, LoadError> {
    let read_err = |source| LoadError::Read {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(read_err)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
        .collect();

    if entries.is_empty() {
        return Err(LoadError::EmptyDirectory(dir.to_path_buf()));
    }

    // Sort for deterministic ordering
    entries.sort();

    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());
    let mut project = Project::new(name);
    for path in entries {
        let source: SourceEntry = read_json(&path)?;
        project.sources.push(source);
    }
    log::debug!("loaded {} sources from '{}'", project.sources.len(), dir.display());
    Ok(project)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
