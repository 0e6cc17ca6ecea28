//! The render surface: shows documents, reacts to host messages and user
//! input, and serves PDF export.

use crate::display::{Display, Rasterizer};
use crate::state::{Document, SurfaceState};
use mdview_protocol::{
    DEFAULT_SIZE, FontId, Handler, HandlerResult, MARKDOWN_EXTENSIONS, MenuAction, Message,
    PdfData, Request, Response, Sender, Side, Size, Step,
};
use mdview_render::{PageGeometry, Renderer, export_pdf, render_error_panel};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;

pub const APP_TITLE: &str = "mdview";

/// Input that originates in the view itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    ZoomIn,
    ZoomOut,
    ZoomReset,
    OpenDialog,
    /// A drop the native layer did not turn into a path.
    Dropped {
        path: Option<PathBuf>,
        name: Option<String>,
        content: Option<String>,
    },
    LinkClicked(String),
}

/// Where a clicked link leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    External(String),
    Document(PathBuf),
    /// In-page anchors and anything else the webview handles itself.
    Ignore,
}

pub fn classify_link(href: &str, base_dir: Option<&Path>) -> LinkTarget {
    let href = href.trim();
    let lower = href.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("mailto:")
    {
        return LinkTarget::External(href.to_string());
    }
    if href.is_empty() || href.starts_with('#') || href.contains("://") {
        return LinkTarget::Ignore;
    }

    let without_fragment = href.split(['#', '?']).next().unwrap_or(href);
    let decoded = urlencoding::decode(without_fragment)
        .map(|text| text.into_owned())
        .unwrap_or_else(|_| without_fragment.to_string());
    let path = Path::new(&decoded);
    let is_markdown = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MARKDOWN_EXTENSIONS.iter().any(|m| ext.eq_ignore_ascii_case(m)));
    if !is_markdown {
        return LinkTarget::Ignore;
    }

    if path.is_absolute() {
        return LinkTarget::Document(path.to_path_buf());
    }
    match base_dir {
        Some(base) => LinkTarget::Document(base.join(path)),
        None => LinkTarget::Ignore,
    }
}

fn file_title(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

struct SurfaceInner<D, R> {
    host: Sender,
    display: D,
    rasterizer: R,
    renderer: Arc<Renderer>,
    state: Mutex<SurfaceState>,
    runtime: Handle,
}

pub struct Surface<D, R> {
    inner: Arc<SurfaceInner<D, R>>,
}

impl<D, R> Clone for Surface<D, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: Display, R: Rasterizer> Surface<D, R> {
    pub fn new(
        host: Sender,
        display: D,
        rasterizer: R,
        renderer: Arc<Renderer>,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(SurfaceInner {
                host,
                display,
                rasterizer,
                renderer,
                state: Mutex::new(SurfaceState::default()),
                runtime,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SurfaceState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SurfaceState {
        self.state().clone()
    }

    pub fn display(&self) -> &D {
        &self.inner.display
    }

    /// Apply saved preferences, report them to the host, then open the
    /// file the window was created for.
    pub async fn start(&self) {
        let host = &self.inner.host;
        let font = host.get_saved_font().await.unwrap_or_else(|e| {
            log::warn!("using default font: {e}");
            FontId::System
        });
        let size = host.get_saved_size().await.unwrap_or_else(|e| {
            log::warn!("using default size: {e}");
            DEFAULT_SIZE
        });
        self.apply_font(font);
        self.apply_size(size);
        host.send(Message::SyncFontMenu { font });
        host.send(Message::SetSize { size });

        match host.get_initial_file().await {
            Ok(Some(path)) => {
                self.open_path(path).await;
            }
            Ok(None) => {}
            Err(e) => log::warn!("no initial file: {e}"),
        }
    }

    fn apply_font(&self, font: FontId) {
        self.state().font = font;
        self.inner.display.apply_font(font);
    }

    fn apply_size(&self, size: Size) {
        self.state().size = size;
        self.inner.display.apply_size(size);
    }

    async fn render(&self, markdown: String, base_dir: Option<PathBuf>) -> HandlerResult<String> {
        let renderer = Arc::clone(&self.inner.renderer);
        self.inner
            .runtime
            .spawn_blocking(move || renderer.render(&markdown, base_dir.as_deref()))
            .await
            .map_err(|e| format!("render task failed: {e}"))
    }

    /// Open a file through the host. Returns `false` when a newer open
    /// superseded this one.
    pub async fn open_path(&self, path: PathBuf) -> bool {
        let seq = self.state().begin_open();
        let requested = path.to_string_lossy().into_owned();
        let result = self.inner.host.read_file(&requested).await;
        if !self.state().is_current(seq) {
            log::debug!("discarding stale open of {requested}");
            return false;
        }

        let file = match result {
            Ok(file) => file,
            Err(e) => {
                self.show_failure(seq, &requested, &e.user_message());
                return true;
            }
        };

        let html = match self
            .render(file.content, Some(file.directory.clone()))
            .await
        {
            Ok(html) => html,
            Err(message) => {
                self.show_failure(seq, &requested, &message);
                return true;
            }
        };

        let canonical = file.canonical_path;
        let title = file_title(&canonical);
        {
            let mut state = self.state();
            if !state.is_current(seq) {
                log::debug!("discarding stale render of {requested}");
                return false;
            }
            state.document = Some(Document {
                path: Some(canonical.clone()),
                base_dir: Some(file.directory),
                project_root: None,
                title: title.clone(),
            });
            self.inner.display.show_document(&html);
        }
        self.inner.host.send(Message::SetWindowTitle { title });
        self.inner
            .host
            .send(Message::SetFileMenuEnabled { enabled: true });

        let surface = self.clone();
        self.inner.runtime.spawn(async move {
            match surface.inner.host.find_project_root(&canonical).await {
                Ok(root) => {
                    surface.state().set_project_root(seq, root);
                }
                Err(e) => log::warn!("project root lookup failed: {e}"),
            }
        });
        true
    }

    fn show_failure(&self, seq: u64, path: &str, message: &str) {
        {
            let mut state = self.state();
            if !state.is_current(seq) {
                return;
            }
            state.document = None;
            self.inner
                .display
                .show_error_panel(&render_error_panel(Some(path), message));
        }
        self.inner.host.send(Message::SetWindowTitle {
            title: APP_TITLE.to_string(),
        });
        self.inner
            .host
            .send(Message::SetFileMenuEnabled { enabled: false });
    }

    /// Show content that has no file behind it. Relative images cannot be
    /// resolved and path actions stay disabled.
    pub async fn load_content(&self, name: Option<String>, content: String) -> bool {
        let seq = self.state().begin_open();
        let html = match self.render(content, None).await {
            Ok(html) => html,
            Err(message) => {
                self.show_failure(seq, name.as_deref().unwrap_or("dropped file"), &message);
                return true;
            }
        };

        let title = name.unwrap_or_else(|| "Untitled".to_string());
        {
            let mut state = self.state();
            if !state.is_current(seq) {
                return false;
            }
            state.document = Some(Document {
                path: None,
                base_dir: None,
                project_root: None,
                title: title.clone(),
            });
            self.inner.display.show_document(&html);
        }
        self.inner.host.send(Message::SetWindowTitle { title });
        self.inner
            .host
            .send(Message::SetFileMenuEnabled { enabled: false });
        true
    }

    async fn persist_font(&self, font: FontId) {
        match self.inner.host.save_font(font).await {
            Ok(true) => {}
            Ok(false) => log::warn!("font {font} applied but not saved"),
            Err(e) => log::warn!("saving font failed: {e}"),
        }
    }

    async fn persist_size(&self, size: Size) {
        match self.inner.host.save_size(size).await {
            Ok(true) => {}
            Ok(false) => log::warn!("size {size} applied but not saved"),
            Err(e) => log::warn!("saving size failed: {e}"),
        }
    }

    /// Keyboard zoom: step, save, and tell the host so the menu follows.
    pub async fn zoom(&self, step: Option<Step>) {
        let current = self.state().size;
        let size = match step {
            Some(step) => current.step(step),
            None => DEFAULT_SIZE,
        };
        self.apply_size(size);
        self.inner.host.send(Message::SetSize { size });
        self.persist_size(size).await;
    }

    pub async fn run_menu_action(&self, action: MenuAction) {
        let Some(document) = self.state().document.clone() else {
            return;
        };
        let Some(path) = document.path else {
            return;
        };

        let host = &self.inner.host;
        let result = match action {
            MenuAction::CopyFilePath => {
                host.copy_to_clipboard(&path.to_string_lossy()).await
            }
            MenuAction::CopyDirPath => match document.base_dir {
                Some(dir) => host.copy_to_clipboard(&dir.to_string_lossy()).await,
                None => return,
            },
            MenuAction::CopyProjectPath => match document.project_root {
                Some(root) => host.copy_to_clipboard(&root.to_string_lossy()).await,
                None => {
                    self.inner
                        .display
                        .alert("No project root found: no .git, .hg or .jj above this file.");
                    return;
                }
            },
            MenuAction::RevealFinder => host.reveal_in_finder(&path).await,
        };
        if let Err(e) = result {
            self.inner.display.alert(&e.user_message());
        }
    }

    pub async fn follow_link(&self, href: &str) {
        let base_dir = self
            .state()
            .document
            .as_ref()
            .and_then(|document| document.base_dir.clone());
        match classify_link(href, base_dir.as_deref()) {
            LinkTarget::External(url) => {
                if let Err(e) = self.inner.host.open_external(&url).await {
                    self.inner.display.alert(&e.user_message());
                }
            }
            LinkTarget::Document(path) => {
                self.open_path(path).await;
            }
            LinkTarget::Ignore => {}
        }
    }

    pub async fn handle_event(&self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::ZoomIn => self.zoom(Some(Step::Larger)).await,
            SurfaceEvent::ZoomOut => self.zoom(Some(Step::Smaller)).await,
            SurfaceEvent::ZoomReset => self.zoom(None).await,
            SurfaceEvent::OpenDialog => match self.inner.host.show_open_dialog().await {
                Ok(Some(path)) => {
                    self.open_path(path).await;
                }
                Ok(None) => {}
                Err(e) => self.inner.display.alert(&e.user_message()),
            },
            SurfaceEvent::Dropped {
                path,
                name,
                content,
            } => match (path, content) {
                (Some(path), _) => {
                    self.open_path(path).await;
                }
                (None, Some(content)) => {
                    self.load_content(name, content).await;
                }
                (None, None) => log::debug!("drop carried nothing to open"),
            },
            SurfaceEvent::LinkClicked(href) => self.follow_link(&href).await,
        }
    }

    /// Fire-and-forget entry point for the view layer.
    pub fn dispatch(&self, event: SurfaceEvent) {
        let surface = self.clone();
        self.inner
            .runtime
            .spawn(async move { surface.handle_event(event).await });
    }

    pub async fn export(&self) -> HandlerResult<PdfData> {
        if self.state().document.is_none() {
            return Err("Nothing to export: no document is open.".to_string());
        }
        let image = self.inner.rasterizer.capture().await?;
        let pdf = self
            .inner
            .runtime
            .spawn_blocking(move || export_pdf(&image, &PageGeometry::LETTER))
            .await
            .map_err(|e| format!("export task failed: {e}"))?
            .map_err(|e| e.to_string())?;
        log::info!("exported {} page(s)", pdf.page_count);
        Ok(PdfData {
            bytes: pdf.bytes,
            page_count: pdf.page_count as usize,
        })
    }

    fn spawn<F>(&self, work: impl FnOnce(Self) -> F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.runtime.spawn(work(self.clone()));
    }
}

impl<D: Display, R: Rasterizer> Handler for Surface<D, R> {
    const SIDE: Side = Side::Surface;

    async fn handle(&self, request: Request) -> HandlerResult<Response> {
        match request {
            Request::ExportPdf => self.export().await.map(Response::Pdf),
            Request::ReadFile { .. }
            | Request::GetInitialFile
            | Request::FindProjectRoot { .. }
            | Request::RevealInFinder { .. }
            | Request::CopyToClipboard { .. }
            | Request::ShowOpenDialog
            | Request::OpenExternal { .. }
            | Request::IsMdAssociated
            | Request::SetMdAssociation { .. }
            | Request::GetSavedFont
            | Request::SaveFont { .. }
            | Request::GetSavedSize
            | Request::SaveSize { .. } => {
                Err(format!("'{}' is served by the host", request.name()))
            }
        }
    }

    fn on_message(&self, message: Message) -> HandlerResult<()> {
        match message {
            Message::OpenFile { path } => {
                self.spawn(|surface| async move {
                    surface.open_path(path).await;
                });
            }
            Message::LoadFile { name, content } => {
                self.spawn(|surface| async move {
                    surface.load_content(name, content).await;
                });
            }
            Message::SetFont { font } => {
                self.apply_font(font);
                self.spawn(|surface| async move { surface.persist_font(font).await });
            }
            Message::SetSize { size } => {
                self.apply_size(size);
                self.spawn(|surface| async move { surface.persist_size(size).await });
            }
            Message::MenuAction { action } => {
                self.spawn(|surface| async move { surface.run_menu_action(action).await });
            }
            Message::ShowError { message } => self.inner.display.alert(&message),
            Message::CliInstallResult { outcome } => {
                self.inner.display.alert(&outcome.describe());
            }
            Message::SetWindowTitle { .. }
            | Message::SetFileMenuEnabled { .. }
            | Message::SyncFontMenu { .. } => {
                return Err(format!("'{}' is addressed to the host", message.name()));
            }
        }
        Ok(())
    }
}
