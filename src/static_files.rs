//! Static directory serving.
//!
//! URL prefixes are mounted onto directories. Request paths are mapped
//! component by component; anything other than a normal component (`..`,
//! a root or a drive prefix) rejects the path, so files outside the mounted
//! directory are never read.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// One directory served from the filesystem.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base_dir: base.into(),
        }
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "html" | "htm" => "text/html; charset=utf-8",
            "css" => "text/css",
            "js" => "application/javascript",
            "json" => "application/json",
            "txt" => "text/plain; charset=utf-8",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "ico" => "image/x-icon",
            "wasm" => "application/wasm",
            _ => "application/octet-stream",
        }
    }

    /// Read the file for `url_path` relative to the base directory.
    ///
    /// # Errors
    ///
    /// `NotFound` when the path escapes the directory, does not exist or
    /// is not a regular file; other I/O errors pass through.
    pub fn load(&self, url_path: &str) -> io::Result<(Vec<u8>, &'static str)> {
        let path = self
            .map_path(url_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        let bytes = fs::read(&path)?;
        Ok((bytes, Self::content_type(&path)))
    }
}

/// URL prefix → directory mounts, longest prefix first.
#[derive(Debug, Clone, Default)]
pub struct StaticDirs {
    mounts: Vec<(String, StaticFiles)>,
}

impl StaticDirs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `dir` under the URL `prefix` (e.g. `/static`).
    pub fn mount<P: Into<PathBuf>>(&mut self, prefix: &str, dir: P) {
        let prefix = format!("/{}", prefix.trim_matches('/'));
        self.mounts.retain(|(p, _)| *p != prefix);
        self.mounts.push((prefix, StaticFiles::new(dir)));
        self.mounts.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    pub fn mounts(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.mounts.iter().map(|(p, sf)| (p.as_str(), sf.base_dir()))
    }

    /// Find the mount owning `path` and the remainder below it.
    fn mount_for<'a>(&self, path: &'a str) -> Option<(&StaticFiles, &'a str)> {
        self.mounts.iter().find_map(|(prefix, files)| {
            let rest = if prefix == "/" {
                path
            } else {
                path.strip_prefix(prefix.as_str())?
            };
            (rest.is_empty() || rest.starts_with('/')).then_some((files, rest))
        })
    }

    /// Whether `path` falls under a mounted prefix.
    #[must_use]
    pub fn covers(&self, path: &str) -> bool {
        self.mount_for(path).is_some()
    }

    /// Load the file served at `path`, if any.
    ///
    /// Returns `None` when no prefix covers the path or no readable file
    /// exists there; routing then proceeds normally.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<(Vec<u8>, &'static str)> {
        let (files, rest) = self.mount_for(path)?;
        if rest.trim_matches('/').is_empty() {
            return None;
        }
        files.load(rest).ok()
    }
}
