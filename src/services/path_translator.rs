//! Mapping between the caller's path namespace and the backend's.
//!
//! The backend keeps every user's files under a fixed mount point (`/home` for
//! Reva). Callers never see that prefix: `/docs/a.txt` on the wire is
//! `/home/docs/a.txt` on the backend.

/// Backend mount point used when none is configured.
pub const DEFAULT_STORAGE_ROOT: &str = "/home";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTranslator {
    root: String,
}

impl Default for PathTranslator {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_ROOT)
    }
}

impl PathTranslator {
    pub fn new(root: &str) -> Self {
        Self {
            root: normalize(root),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Translate a caller path into the backend namespace.
    ///
    /// The path is normalized as an absolute path first, so `..` can never
    /// climb above the storage root. Paths already under the root are kept.
    pub fn to_backend_path(&self, caller_path: &str) -> String {
        let clean = normalize(caller_path);
        if self.is_under_root(&clean) {
            clean
        } else if clean == "/" {
            self.root.clone()
        } else {
            format!("{}{}", self.root, clean)
        }
    }

    /// Translate a backend path into the caller namespace.
    ///
    /// Containers get a trailing `/`; anything else loses it.
    pub fn to_caller_path(&self, backend_path: &str, is_container: bool) -> String {
        let stripped = if self.root != "/" && self.is_under_root(backend_path) {
            &backend_path[self.root.len()..]
        } else {
            backend_path
        };

        let mut path = if stripped.is_empty() {
            "/".to_string()
        } else {
            stripped.to_string()
        };

        if is_container {
            if !path.ends_with('/') {
                path.push('/');
            }
        } else {
            while path.len() > 1 && path.ends_with('/') {
                path.pop();
            }
        }
        path
    }

    fn is_under_root(&self, path: &str) -> bool {
        if self.root == "/" {
            return path.starts_with('/');
        }
        match path.strip_prefix(self.root.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// Lexically clean a path as if it were absolute.
///
/// Empty and `.` segments are dropped, `..` removes the previous segment and
/// stops at `/`. The result always starts with `/` and never ends with one
/// unless it is the root itself.
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}
