use crate::menu::MenuState;
use mdview_prefs::Settings;
use mdview_protocol::{AssociationStatus, FileContent, FontId, Size};
use std::path::{Path, PathBuf};

/// Host-side state for one window.
#[derive(Debug, Clone)]
pub struct Session {
    current_file: Option<PathBuf>,
    base_dir: Option<PathBuf>,
    project_root: Option<PathBuf>,
    font: FontId,
    size: Size,
    file_menu_enabled: bool,
    association: AssociationStatus,
    latest_read: u64,
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        Self {
            current_file: None,
            base_dir: None,
            project_root: None,
            font: settings.font,
            size: settings.size_or_default(),
            file_menu_enabled: false,
            association: AssociationStatus::Unknown,
            latest_read: 0,
        }
    }

    pub fn menu_state(&self) -> MenuState {
        MenuState {
            file_menu_enabled: self.file_menu_enabled,
            checked_font: self.font,
            checked_size: Some(self.size).filter(Size::is_standard),
            md_associated: self.association.is_associated(),
        }
    }

    pub fn current_file(&self) -> Option<&Path> {
        self.current_file.as_deref()
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    pub fn font(&self) -> FontId {
        self.font
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn association(&self) -> AssociationStatus {
        self.association
    }

    /// Stamp a new file read. Only the most recently stamped read may change
    /// the current file.
    pub fn begin_read(&mut self) -> u64 {
        self.latest_read += 1;
        self.latest_read
    }

    pub fn is_latest_read(&self, seq: u64) -> bool {
        seq == self.latest_read
    }

    /// Returns `false` when a newer read has been issued since `seq`.
    pub fn file_opened(&mut self, seq: u64, file: &FileContent) -> bool {
        if !self.is_latest_read(seq) {
            return false;
        }
        if self.current_file.as_deref() != Some(file.canonical_path.as_path()) {
            self.project_root = None;
        }
        self.current_file = Some(file.canonical_path.clone());
        self.base_dir = Some(file.directory.clone());
        true
    }

    pub fn file_failed(&mut self, seq: u64) -> bool {
        if !self.is_latest_read(seq) {
            return false;
        }
        self.current_file = None;
        self.base_dir = None;
        self.project_root = None;
        true
    }

    /// Ignored unless `file` is still the current file.
    pub fn set_project_root(&mut self, file: &Path, root: Option<PathBuf>) -> bool {
        if self.current_file.as_deref() != Some(file) {
            return false;
        }
        self.project_root = root;
        true
    }

    pub fn set_font(&mut self, font: FontId) {
        self.font = font;
    }

    pub fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    pub fn set_file_menu_enabled(&mut self, enabled: bool) {
        self.file_menu_enabled = enabled;
    }

    pub fn set_association(&mut self, status: AssociationStatus) {
        self.association = status;
    }
}
