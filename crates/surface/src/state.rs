use mdview_protocol::{DEFAULT_SIZE, FontId, Size};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// `None` for content dropped in without a backing file.
    pub path: Option<PathBuf>,
    pub base_dir: Option<PathBuf>,
    pub project_root: Option<PathBuf>,
    pub title: String,
}

/// The surface's own copy of what it shows. Host state is never touched
/// from here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceState {
    pub font: FontId,
    pub size: Size,
    pub document: Option<Document>,
    latest_open: u64,
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self {
            font: FontId::System,
            size: DEFAULT_SIZE,
            document: None,
            latest_open: 0,
        }
    }
}

impl SurfaceState {
    /// Stamp a new open. Completions carrying an older stamp are stale.
    pub fn begin_open(&mut self) -> u64 {
        self.latest_open += 1;
        self.latest_open
    }

    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.latest_open
    }

    /// Record the project root if `seq` is still the open document.
    pub fn set_project_root(&mut self, seq: u64, root: Option<PathBuf>) -> bool {
        if !self.is_current(seq) {
            return false;
        }
        match self.document.as_mut() {
            Some(document) => {
                document.project_root = root;
                true
            }
            None => false,
        }
    }
}
