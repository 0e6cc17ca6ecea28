pub mod files;
pub mod host;
pub mod launch;
pub mod menu;
pub mod session;
pub mod system;

pub use files::{FileAccessError, FileAccessKind, PROJECT_MARKERS, Probe, find_project_root, resolve_file};
pub use host::{Host, HostConfig, HostEvent, Platform, ensure_pdf_extension};
pub use launch::{Cli, LaunchError, LaunchFailure, LaunchPlan, plan_launch};
pub use menu::{MenuCommand, MenuDescription, MenuEntry, MenuState, Predefined, Submenu, render_menu};
pub use session::Session;
pub use system::AssociationError;
