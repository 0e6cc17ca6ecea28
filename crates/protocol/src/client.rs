//! Typed wrappers over [`Sender::request`], one per catalog entry.

use crate::error::IpcError;
use crate::ipc::Sender;
use crate::message::{AssociationStatus, FileContent, PdfData, Request, Response};
use crate::prefs::{FontId, Size};
use std::path::{Path, PathBuf};

macro_rules! expect_response {
    ($sender:expr, $request:expr, $pattern:pat => $value:expr) => {{
        let request = $request;
        let name = request.name();
        match $sender.request(request).await? {
            $pattern => Ok($value),
            other => Err(IpcError::UnexpectedResponse {
                name,
                got: other.kind(),
            }),
        }
    }};
}

impl Sender {
    pub async fn read_file(&self, path: &str) -> Result<FileContent, IpcError> {
        expect_response!(
            self,
            Request::ReadFile { path: path.to_string() },
            Response::File(file) => file
        )
    }

    pub async fn get_initial_file(&self) -> Result<Option<PathBuf>, IpcError> {
        expect_response!(self, Request::GetInitialFile, Response::Path(path) => path)
    }

    pub async fn find_project_root(&self, file_path: &Path) -> Result<Option<PathBuf>, IpcError> {
        expect_response!(
            self,
            Request::FindProjectRoot { file_path: file_path.to_path_buf() },
            Response::Path(path) => path
        )
    }

    pub async fn reveal_in_finder(&self, file_path: &Path) -> Result<(), IpcError> {
        expect_response!(
            self,
            Request::RevealInFinder { file_path: file_path.to_path_buf() },
            Response::Unit => ()
        )
    }

    pub async fn copy_to_clipboard(&self, text: &str) -> Result<(), IpcError> {
        expect_response!(
            self,
            Request::CopyToClipboard { text: text.to_string() },
            Response::Unit => ()
        )
    }

    pub async fn show_open_dialog(&self) -> Result<Option<PathBuf>, IpcError> {
        expect_response!(self, Request::ShowOpenDialog, Response::Path(path) => path)
    }

    pub async fn open_external(&self, url: &str) -> Result<(), IpcError> {
        expect_response!(
            self,
            Request::OpenExternal { url: url.to_string() },
            Response::Unit => ()
        )
    }

    pub async fn is_md_associated(&self) -> Result<AssociationStatus, IpcError> {
        expect_response!(
            self,
            Request::IsMdAssociated,
            Response::Association(status) => status
        )
    }

    pub async fn set_md_association(&self, enable: bool) -> Result<bool, IpcError> {
        expect_response!(
            self,
            Request::SetMdAssociation { enable },
            Response::Enabled(enabled) => enabled
        )
    }

    pub async fn get_saved_font(&self) -> Result<FontId, IpcError> {
        expect_response!(self, Request::GetSavedFont, Response::Font(font) => font)
    }

    /// `Ok(false)` means the preference applies but was not persisted.
    pub async fn save_font(&self, font: FontId) -> Result<bool, IpcError> {
        expect_response!(self, Request::SaveFont { font }, Response::Saved(saved) => saved)
    }

    pub async fn get_saved_size(&self) -> Result<Size, IpcError> {
        expect_response!(self, Request::GetSavedSize, Response::Size(size) => size)
    }

    pub async fn save_size(&self, size: Size) -> Result<bool, IpcError> {
        expect_response!(self, Request::SaveSize { size }, Response::Saved(saved) => saved)
    }

    pub async fn export_pdf(&self) -> Result<PdfData, IpcError> {
        expect_response!(self, Request::ExportPdf, Response::Pdf(pdf) => pdf)
    }
}
