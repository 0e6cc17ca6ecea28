use mdview_protocol::FileContent;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Directory names that mark the top of a version-controlled project.
pub const PROJECT_MARKERS: [&str; 3] = [".git", ".hg", ".jj"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAccessKind {
    NotFound,
    NotAFile,
    PermissionDenied,
    Decode,
    Other,
}

impl fmt::Display for FileAccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FileAccessKind::NotFound => "no such file",
            FileAccessKind::NotAFile => "not a regular file",
            FileAccessKind::PermissionDenied => "permission denied",
            FileAccessKind::Decode => "not valid UTF-8 text",
            FileAccessKind::Other => "cannot be read",
        };
        f.write_str(text)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Cannot open '{path}': {kind} ({source})")]
pub struct FileAccessError {
    /// The path exactly as the caller supplied it.
    pub path: String,
    pub kind: FileAccessKind,
    #[source]
    pub source: io::Error,
}

impl FileAccessError {
    fn new(path: &str, source: io::Error) -> Self {
        let kind = match source.kind() {
            io::ErrorKind::NotFound => FileAccessKind::NotFound,
            io::ErrorKind::PermissionDenied => FileAccessKind::PermissionDenied,
            io::ErrorKind::InvalidData => FileAccessKind::Decode,
            io::ErrorKind::IsADirectory => FileAccessKind::NotAFile,
            _ => FileAccessKind::Other,
        };
        Self {
            path: path.to_string(),
            kind,
            source,
        }
    }

    fn with_kind(path: &str, kind: FileAccessKind, source: io::Error) -> Self {
        Self {
            path: path.to_string(),
            kind,
            source,
        }
    }
}

/// Outcome of a best-effort filesystem probe. `NotFound` is a definite
/// answer; `Unknown` means the probe could not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    Found(T),
    NotFound,
    Unknown(String),
}

impl<T> Probe<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Probe::Found(value) => Some(value),
            _ => None,
        }
    }
}

/// Make `path` absolute against `cwd`, canonicalize it, and read it as UTF-8.
pub fn resolve_file(path: &str, cwd: &Path) -> Result<FileContent, FileAccessError> {
    let raw = Path::new(path);
    let absolute = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        cwd.join(raw)
    };

    let canonical = absolute
        .canonicalize()
        .map_err(|e| FileAccessError::new(path, e))?;

    let metadata = canonical
        .metadata()
        .map_err(|e| FileAccessError::new(path, e))?;
    if !metadata.is_file() {
        return Err(FileAccessError::with_kind(
            path,
            FileAccessKind::NotAFile,
            io::Error::other(format!("{} is not a regular file", canonical.display())),
        ));
    }

    let bytes = std::fs::read(&canonical).map_err(|e| FileAccessError::new(path, e))?;
    let content = String::from_utf8(bytes).map_err(|e| {
        FileAccessError::with_kind(
            path,
            FileAccessKind::Decode,
            io::Error::new(io::ErrorKind::InvalidData, e),
        )
    })?;

    let directory = canonical
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| canonical.clone());

    Ok(FileContent {
        content,
        canonical_path: canonical,
        directory,
    })
}

fn has_marker(dir: &Path) -> io::Result<bool> {
    for marker in PROJECT_MARKERS {
        // `.git` is a file inside worktrees and submodules, so any entry counts.
        if dir.join(marker).try_exists()? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Walk up from the file's directory to the nearest project root.
///
/// Terminates at the filesystem root: the loop stops as soon as a directory
/// has no parent.
pub fn find_project_root(file_path: &Path) -> Probe<PathBuf> {
    // Relative paths would stop climbing at the working directory.
    let absolute = match std::path::absolute(file_path) {
        Ok(path) => path.canonicalize().unwrap_or(path),
        Err(e) => {
            return Probe::Unknown(format!("cannot resolve {}: {e}", file_path.display()));
        }
    };
    let start = if absolute.is_dir() {
        absolute
    } else {
        match absolute.parent() {
            Some(parent) => parent.to_path_buf(),
            None => return Probe::NotFound,
        }
    };

    let mut dir = start.as_path();
    loop {
        match has_marker(dir) {
            Ok(true) => return Probe::Found(dir.to_path_buf()),
            Ok(false) => {}
            Err(e) => {
                return Probe::Unknown(format!("cannot inspect {}: {e}", dir.display()));
            }
        }
        match dir.parent() {
            Some(parent) if parent != dir => dir = parent,
            _ => return Probe::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_relative_path_against_cwd() {
        let dir = tempdir().expect("tempdir");
        let docs = dir.path().join("docs");
        fs::create_dir(&docs).expect("mkdir");
        fs::write(docs.join("readme.md"), "# Hello\n\nwörld").expect("write");

        let file = resolve_file("docs/readme.md", dir.path()).expect("resolve");
        assert_eq!(file.content, "# Hello\n\nwörld");
        let canonical_docs = docs.canonicalize().expect("canonicalize");
        assert_eq!(file.canonical_path, canonical_docs.join("readme.md"));
        assert_eq!(file.directory, canonical_docs);
        assert!(file.canonical_path.is_absolute());
    }

    #[test]
    fn test_resolve_absolute_path_ignores_cwd() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("a.md");
        fs::write(&path, "body").expect("write");

        let file = resolve_file(path.to_str().expect("utf8 path"), Path::new("/nowhere"))
            .expect("resolve");
        assert_eq!(file.content, "body");
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_follows_symlinks() {
        let dir = tempdir().expect("tempdir");
        let real_dir = dir.path().join("real");
        fs::create_dir(&real_dir).expect("mkdir");
        fs::write(real_dir.join("notes.md"), "linked").expect("write");
        std::os::unix::fs::symlink(real_dir.join("notes.md"), dir.path().join("link.md"))
            .expect("symlink");

        let file = resolve_file("link.md", dir.path()).expect("resolve");
        assert_eq!(file.content, "linked");
        assert_eq!(
            file.directory,
            real_dir.canonicalize().expect("canonicalize")
        );
    }

    #[test]
    fn test_missing_file_is_file_access_error() {
        let dir = tempdir().expect("tempdir");
        let err = resolve_file("missing.md", dir.path()).expect_err("missing");
        assert_eq!(err.kind, FileAccessKind::NotFound);
        assert_eq!(err.path, "missing.md");
        assert!(err.to_string().contains("missing.md"));
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let dir = tempdir().expect("tempdir");
        let err = resolve_file(".", dir.path()).expect_err("directory");
        assert_eq!(err.kind, FileAccessKind::NotAFile);
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("bin.md"), [0xff, 0xfe, 0x00, 0xc3]).expect("write");
        let err = resolve_file("bin.md", dir.path()).expect_err("decode");
        assert_eq!(err.kind, FileAccessKind::Decode);
    }

    #[test]
    fn test_project_root_found_from_nested_file() {
        let dir = tempdir().expect("tempdir");
        let root = dir.path().canonicalize().expect("canonicalize").join("project");
        let nested = root.join("docs").join("guide");
        fs::create_dir_all(&nested).expect("mkdir");
        fs::create_dir(root.join(".git")).expect("mkdir .git");
        let file = nested.join("intro.md");
        fs::write(&file, "x").expect("write");

        assert_eq!(find_project_root(&file), Probe::Found(root.clone()));
        assert_eq!(find_project_root(&nested), Probe::Found(root));
    }

    #[test]
    fn test_git_file_marker_counts() {
        let dir = tempdir().expect("tempdir");
        let worktree = dir.path().canonicalize().expect("canonicalize").join("wt");
        fs::create_dir(&worktree).expect("mkdir");
        fs::write(worktree.join(".git"), "gitdir: ../main/.git/worktrees/wt").expect("write");
        let file = worktree.join("a.md");
        fs::write(&file, "x").expect("write");

        assert_eq!(find_project_root(&file), Probe::Found(worktree));
    }

    #[test]
    fn test_project_root_search_terminates_at_filesystem_root() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).expect("mkdir");

        assert_eq!(find_project_root(&nested), Probe::NotFound);
        assert_eq!(find_project_root(&nested.join("missing.md")), Probe::NotFound);
    }

    #[test]
    fn test_relative_path_climbs_past_working_directory() {
        let cwd = std::env::current_dir().expect("cwd");
        assert_eq!(
            find_project_root(Path::new("notes.md")),
            find_project_root(&cwd.join("notes.md"))
        );
        assert_eq!(find_project_root(Path::new(".")), find_project_root(&cwd));
    }

    #[test]
    fn test_no_marker_yields_not_found() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("loose.md");
        fs::write(&file, "x").expect("write");

        // The temp dir could sit inside a checkout; anything found must be
        // above it.
        match find_project_root(&file) {
            Probe::NotFound => {}
            Probe::Found(root) => assert!(dir.path().starts_with(root)),
            Probe::Unknown(reason) => panic!("probe failed: {reason}"),
        }
    }
}
