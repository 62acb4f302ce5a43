//! `#include` expansion for built-in shader source
//!
//! WGSL has no include mechanism, so built-in shaders are assembled from
//! fragments before they reach the compiler. A directive has exactly one
//! form:
//!
//! ```text
//! #include "relative/path.wgsl"
//! ```
//!
//! The directive (quotes included) is replaced by the contents of the named
//! file, which are themselves expanded relative to that file's directory.
//! Nothing else is supported: no guards, no macros, no conditionals.
//!
//! Expansion only runs over trusted, shipped source. Caller-supplied
//! postprocess shaders never pass through here.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::ShaderError;

const DIRECTIVE: &str = "#include";
const DIRECTIVE_OPEN: &str = "#include \"";
/// Deepest include nesting accepted before expansion gives up
pub const MAX_INCLUDE_DEPTH: usize = 32;

/// Source of included file contents
pub trait IncludeLoader {
    /// Read the full contents of `path`
    fn load(&self, path: &Path) -> io::Result<String>;
}

/// Reads includes from the filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl IncludeLoader for FsLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Reads includes from an in-memory table of `(relative path, contents)`
///
/// Keys use `/` separators and are matched against the normalized include
/// path, so `"sub/../common.wgsl"` finds `"common.wgsl"`.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedLoader {
    files: HashMap<String, &'static str>,
}

impl EmbeddedLoader {
    pub fn new(files: &[(&str, &'static str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(path, contents)| (normalize(Path::new(path)), *contents))
                .collect(),
        }
    }

    /// Look up a file without expanding it
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&'static str> {
        self.files.get(&normalize(path.as_ref())).copied()
    }
}

impl IncludeLoader for EmbeddedLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        self.get(path).map(str::to_owned).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no embedded shader at {:?}", path),
            )
        })
    }
}

/// Expand includes in `source`, reading files from disk relative to `base_dir`
pub fn expand(source: &str, base_dir: impl AsRef<Path>) -> Result<String, ShaderError> {
    expand_with(source, base_dir.as_ref(), &FsLoader)
}

/// Expand includes in `source` using `loader`
///
/// # Panics
///
/// Panics if a `#include` token is not followed by ` "path"`, or if includes
/// nest deeper than [`MAX_INCLUDE_DEPTH`] (an include cycle). Built-in source
/// is trusted, so either is a defect in the shipped shader, not a runtime
/// condition.
pub fn expand_with<L: IncludeLoader + ?Sized>(
    source: &str,
    base_dir: &Path,
    loader: &L,
) -> Result<String, ShaderError> {
    expand_nested(source, base_dir, loader, 0)
}

fn expand_nested<L: IncludeLoader + ?Sized>(
    source: &str,
    base_dir: &Path,
    loader: &L,
    depth: usize,
) -> Result<String, ShaderError> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    loop {
        let Some(start) = next_directive(rest) else {
            out.push_str(rest);
            return Ok(out);
        };

        let directive = &rest[start..];
        assert!(
            directive.starts_with(DIRECTIVE_OPEN),
            "malformed include directive: {:?}",
            directive.lines().next().unwrap_or_default()
        );

        let path_start = DIRECTIVE_OPEN.len();
        let path_len = directive[path_start..]
            .find('"')
            .unwrap_or_else(|| panic!("unterminated include directive in {:?}", base_dir));
        let relative = &directive[path_start..path_start + path_len];

        let path = base_dir.join(relative);
        assert!(
            depth < MAX_INCLUDE_DEPTH,
            "include depth exceeded {} at {:?}, likely an include cycle",
            MAX_INCLUDE_DEPTH,
            path
        );
        let contents = loader.load(&path).map_err(|source| ShaderError::Include {
            path: path.clone(),
            source,
        })?;
        let include_dir = path.parent().unwrap_or(Path::new(""));
        let expanded = expand_nested(&contents, include_dir, loader, depth + 1)?;

        out.push_str(&rest[..start]);
        out.push_str(&expanded);
        rest = &directive[path_start + path_len + 1..];
    }
}

/// Find the byte offset of the next `#include` token.
///
/// Any other `#`, wherever it sits on a line, sends the scan to the start of
/// the following line, so `x # y #include "z"` is left unexpanded. This is
/// stricter than skipping only lines that begin with `#`, which is fine for
/// the shipped shaders: none of them put a directive after another `#`.
fn next_directive(text: &str) -> Option<usize> {
    let mut offset = 0;
    while let Some(hash) = text[offset..].find('#') {
        let at = offset + hash;
        if text[at..].starts_with(DIRECTIVE) {
            return Some(at);
        }
        offset = at + text[at..].find('\n')? + 1;
    }
    None
}

fn normalize(path: &Path) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str().unwrap_or_default()),
            Component::ParentDir => {
                parts.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    parts.join("/")
}

/// Directory used as the include base for a file path
pub fn base_dir_of(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}
