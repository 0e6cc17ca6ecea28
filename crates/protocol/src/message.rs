//! The message catalog exchanged between the host and the render surface.
//!
//! Both sides compile against these enums, so a new request or message
//! cannot be added without every `match` over it being revisited.

use crate::prefs::{FontId, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Which context serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Host,
    Surface,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "payload", rename_all = "camelCase")]
pub enum Request {
    ReadFile {
        path: String,
    },
    GetInitialFile,
    #[serde(rename_all = "camelCase")]
    FindProjectRoot {
        file_path: PathBuf,
    },
    #[serde(rename_all = "camelCase")]
    RevealInFinder {
        file_path: PathBuf,
    },
    CopyToClipboard {
        text: String,
    },
    ShowOpenDialog,
    OpenExternal {
        url: String,
    },
    IsMdAssociated,
    SetMdAssociation {
        enable: bool,
    },
    GetSavedFont,
    SaveFont {
        font: FontId,
    },
    GetSavedSize,
    SaveSize {
        size: Size,
    },
    #[serde(rename = "exportPDF")]
    ExportPdf,
}

/// Payload-free discriminant of [`Request`], used for routing and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestName {
    ReadFile,
    GetInitialFile,
    FindProjectRoot,
    RevealInFinder,
    CopyToClipboard,
    ShowOpenDialog,
    OpenExternal,
    IsMdAssociated,
    SetMdAssociation,
    GetSavedFont,
    SaveFont,
    GetSavedSize,
    SaveSize,
    ExportPdf,
}

impl RequestName {
    pub const ALL: [RequestName; 14] = [
        RequestName::ReadFile,
        RequestName::GetInitialFile,
        RequestName::FindProjectRoot,
        RequestName::RevealInFinder,
        RequestName::CopyToClipboard,
        RequestName::ShowOpenDialog,
        RequestName::OpenExternal,
        RequestName::IsMdAssociated,
        RequestName::SetMdAssociation,
        RequestName::GetSavedFont,
        RequestName::SaveFont,
        RequestName::GetSavedSize,
        RequestName::SaveSize,
        RequestName::ExportPdf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestName::ReadFile => "readFile",
            RequestName::GetInitialFile => "getInitialFile",
            RequestName::FindProjectRoot => "findProjectRoot",
            RequestName::RevealInFinder => "revealInFinder",
            RequestName::CopyToClipboard => "copyToClipboard",
            RequestName::ShowOpenDialog => "showOpenDialog",
            RequestName::OpenExternal => "openExternal",
            RequestName::IsMdAssociated => "isMdAssociated",
            RequestName::SetMdAssociation => "setMdAssociation",
            RequestName::GetSavedFont => "getSavedFont",
            RequestName::SaveFont => "saveFont",
            RequestName::GetSavedSize => "getSavedSize",
            RequestName::SaveSize => "saveSize",
            RequestName::ExportPdf => "exportPDF",
        }
    }

    pub fn parse(name: &str) -> Option<RequestName> {
        RequestName::ALL.into_iter().find(|n| n.as_str() == name)
    }

    pub fn target(&self) -> Side {
        match self {
            RequestName::ExportPdf => Side::Surface,
            RequestName::ReadFile
            | RequestName::GetInitialFile
            | RequestName::FindProjectRoot
            | RequestName::RevealInFinder
            | RequestName::CopyToClipboard
            | RequestName::ShowOpenDialog
            | RequestName::OpenExternal
            | RequestName::IsMdAssociated
            | RequestName::SetMdAssociation
            | RequestName::GetSavedFont
            | RequestName::SaveFont
            | RequestName::GetSavedSize
            | RequestName::SaveSize => Side::Host,
        }
    }
}

impl fmt::Display for RequestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Request {
    pub fn name(&self) -> RequestName {
        match self {
            Request::ReadFile { .. } => RequestName::ReadFile,
            Request::GetInitialFile => RequestName::GetInitialFile,
            Request::FindProjectRoot { .. } => RequestName::FindProjectRoot,
            Request::RevealInFinder { .. } => RequestName::RevealInFinder,
            Request::CopyToClipboard { .. } => RequestName::CopyToClipboard,
            Request::ShowOpenDialog => RequestName::ShowOpenDialog,
            Request::OpenExternal { .. } => RequestName::OpenExternal,
            Request::IsMdAssociated => RequestName::IsMdAssociated,
            Request::SetMdAssociation { .. } => RequestName::SetMdAssociation,
            Request::GetSavedFont => RequestName::GetSavedFont,
            Request::SaveFont { .. } => RequestName::SaveFont,
            Request::GetSavedSize => RequestName::GetSavedSize,
            Request::SaveSize { .. } => RequestName::SaveSize,
            Request::ExportPdf => RequestName::ExportPdf,
        }
    }
}

/// Result of reading a document from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    pub content: String,
    pub canonical_path: PathBuf,
    pub directory: PathBuf,
}

/// Whether this application is the default handler for Markdown files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssociationStatus {
    Associated,
    NotAssociated,
    /// The platform helper could not answer.
    Unknown,
}

impl AssociationStatus {
    pub fn is_associated(&self) -> bool {
        matches!(self, AssociationStatus::Associated)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfData {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Response {
    Unit,
    File(FileContent),
    Path(Option<PathBuf>),
    Association(AssociationStatus),
    Enabled(bool),
    Font(FontId),
    Size(Size),
    Saved(bool),
    Pdf(PdfData),
}

impl Response {
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Unit => "unit",
            Response::File(_) => "file",
            Response::Path(_) => "path",
            Response::Association(_) => "association",
            Response::Enabled(_) => "enabled",
            Response::Font(_) => "font",
            Response::Size(_) => "size",
            Response::Saved(_) => "saved",
            Response::Pdf(_) => "pdf",
        }
    }
}

/// Menu items whose behavior lives in the render surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuAction {
    CopyFilePath,
    CopyDirPath,
    CopyProjectPath,
    RevealFinder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CliInstallOutcome {
    Installed,
    AlreadyInstalled,
    Cancelled,
    Failed(String),
}

impl CliInstallOutcome {
    pub fn describe(&self) -> String {
        match self {
            CliInstallOutcome::Installed => {
                "Installed the `mdview` command. Open a new terminal to use it.".to_string()
            }
            CliInstallOutcome::AlreadyInstalled => {
                "The `mdview` command is already installed.".to_string()
            }
            CliInstallOutcome::Cancelled => "Command line tool installation was cancelled.".to_string(),
            CliInstallOutcome::Failed(reason) => {
                format!("Could not install the command line tool: {reason}")
            }
        }
    }
}

/// Fire-and-forget traffic. Some messages travel in both directions: a
/// `setFont` from the host means "apply this", from the surface it means
/// "the user changed it here, sync the menu".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "payload", rename_all = "camelCase")]
pub enum Message {
    OpenFile {
        path: PathBuf,
    },
    LoadFile {
        name: Option<String>,
        content: String,
    },
    SetFont {
        font: FontId,
    },
    SetSize {
        size: Size,
    },
    SetWindowTitle {
        title: String,
    },
    SetFileMenuEnabled {
        enabled: bool,
    },
    SyncFontMenu {
        font: FontId,
    },
    MenuAction {
        action: MenuAction,
    },
    ShowError {
        message: String,
    },
    CliInstallResult {
        outcome: CliInstallOutcome,
    },
}

impl Message {
    pub fn name(&self) -> &'static str {
        match self {
            Message::OpenFile { .. } => "openFile",
            Message::LoadFile { .. } => "loadFile",
            Message::SetFont { .. } => "setFont",
            Message::SetSize { .. } => "setSize",
            Message::SetWindowTitle { .. } => "setWindowTitle",
            Message::SetFileMenuEnabled { .. } => "setFileMenuEnabled",
            Message::SyncFontMenu { .. } => "syncFontMenu",
            Message::MenuAction { .. } => "menuAction",
            Message::ShowError { .. } => "showError",
            Message::CliInstallResult { .. } => "cliInstallResult",
        }
    }
}
