use std::ffi::OsString;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A path that can be resolved by the VFS.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VfsPath {
    /// A file on the local OS file system (lexically normalized).
    Local(PathBuf),
    /// A generic URI string that an external implementation can resolve.
    Uri(String),
}

impl VfsPath {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local(normalize_local_path(&path.into()))
    }

    pub fn uri(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        // `file:` URIs and plain paths must map to the same `FileId`.
        match uri.strip_prefix("file://") {
            Some(path) => Self::local(path),
            None => Self::Uri(uri),
        }
    }

    pub fn as_local_path(&self) -> Option<&Path> {
        match self {
            VfsPath::Local(path) => Some(path.as_path()),
            VfsPath::Uri(_) => None,
        }
    }

    /// Final path segment, e.g. `A.java`.
    pub fn file_name(&self) -> Option<String> {
        match self {
            VfsPath::Local(path) => path.file_name().map(|name| name.to_string_lossy().into_owned()),
            VfsPath::Uri(uri) => uri
                .rsplit('/')
                .next()
                .filter(|segment| !segment.is_empty())
                .map(str::to_owned),
        }
    }
}

impl fmt::Display for VfsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VfsPath::Local(path) => write!(f, "{}", path.display()),
            VfsPath::Uri(uri) => f.write_str(uri),
        }
    }
}

impl From<&str> for VfsPath {
    fn from(value: &str) -> Self {
        VfsPath::uri(value)
    }
}

/// Collapses `.` and `..` segments without touching the file system.
pub(crate) fn normalize_local_path(path: &Path) -> PathBuf {
    let mut prefix: Option<OsString> = None;
    let mut has_root = false;
    let mut stack: Vec<OsString> = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(p) => prefix = Some(p.as_os_str().to_owned()),
            Component::RootDir => has_root = true,
            Component::CurDir => {}
            Component::ParentDir => match stack.last() {
                Some(last) if last != ".." => {
                    stack.pop();
                }
                _ if !has_root => stack.push(OsString::from("..")),
                _ => {}
            },
            Component::Normal(segment) => stack.push(segment.to_owned()),
        }
    }

    let mut out = PathBuf::new();
    if let Some(prefix) = prefix {
        out.push(prefix);
    }
    if has_root {
        out.push(std::path::MAIN_SEPARATOR.to_string());
    }
    out.extend(stack);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_paths_are_lexically_normalized() {
        assert_eq!(
            VfsPath::local("/src/./foo/../bar/B.java"),
            VfsPath::Local(PathBuf::from("/src/bar/B.java"))
        );
        assert_eq!(
            VfsPath::local("../x/./A.java"),
            VfsPath::Local(PathBuf::from("../x/A.java"))
        );
    }

    #[test]
    fn file_uris_map_to_local_paths() {
        assert_eq!(
            VfsPath::uri("file:///src/foo/A.java"),
            VfsPath::local("/src/foo/A.java")
        );
        assert_eq!(
            VfsPath::uri("mem:///scratch/Tmp.java").file_name().as_deref(),
            Some("Tmp.java")
        );
    }
}
