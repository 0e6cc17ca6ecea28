//! The host side of a window: answers the surface's requests, keeps the
//! session state, and turns menu clicks and OS events into work.

use crate::files::{self, Probe};
use crate::menu::{MenuCommand, MenuDescription, MenuState, render_menu};
use crate::session::Session;
use crate::system;
use mdview_prefs::SettingsStore;
use mdview_protocol::{
    AssociationStatus, CliInstallOutcome, DEFAULT_SIZE, FileContent, FontId, Handler,
    HandlerResult, Message, Request, RequestName, Response, Sender, Side, Size,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;

/// Native services a window needs. Calls may block (dialogs, helper
/// processes); the host runs them off the async workers.
///
/// `apply_menu` is called while the host holds its session lock, and the
/// window calls may come from the UI thread itself. None of them may wait
/// on the UI thread.
pub trait Platform: Send + Sync + 'static {
    /// `None` when the user cancels.
    fn pick_markdown_file(&self) -> Option<PathBuf>;

    fn pick_pdf_destination(&self, suggested_name: &str) -> Option<PathBuf>;

    fn copy_to_clipboard(&self, text: &str) -> Result<(), String>;

    fn open_external(&self, url: &str) -> Result<(), String>;

    fn reveal(&self, path: &Path) -> Result<(), String> {
        system::reveal(path)
    }

    fn association_status(&self) -> AssociationStatus {
        system::association_status()
    }

    fn set_association(&self, enable: bool) -> Result<bool, String> {
        system::set_association(enable).map_err(|e| e.to_string())
    }

    fn install_cli(&self) -> CliInstallOutcome {
        system::install_cli()
    }

    fn apply_menu(&self, menu: &MenuDescription);

    fn set_window_title(&self, title: &str);

    fn close_window(&self);

    fn toggle_fullscreen(&self);
}

/// Things that happen to a window outside the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Menu(String),
    FilesDropped(Vec<PathBuf>),
    OpenedByOs(Vec<PathBuf>),
}

#[derive(Debug, Clone, Default)]
pub struct HostConfig {
    /// Answered once by `getInitialFile`.
    pub initial_file: Option<PathBuf>,
    /// Font chosen on the command line. Takes the place of the saved font
    /// for the first `getSavedFont` and is never written to settings.
    pub font_override: Option<FontId>,
    /// Base for relative `readFile` paths.
    pub cwd: PathBuf,
}

struct HostInner<P> {
    session: Mutex<Session>,
    settings: SettingsStore,
    platform: Arc<P>,
    surface: Sender,
    initial_file: Mutex<Option<PathBuf>>,
    font_override: Mutex<Option<FontId>>,
    cwd: PathBuf,
    runtime: Handle,
}

pub struct Host<P> {
    inner: Arc<HostInner<P>>,
}

impl<P> Clone for Host<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Append `.pdf` unless the name already ends with it in any case.
pub fn ensure_pdf_extension(path: PathBuf) -> PathBuf {
    let has_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if has_pdf {
        return path;
    }
    let mut raw = path.into_os_string();
    raw.push(".pdf");
    PathBuf::from(raw)
}

impl<P: Platform> Host<P> {
    /// `surface` sends to this window's render surface; `runtime` runs the
    /// work started from menu and OS events.
    pub fn new(
        platform: P,
        settings: SettingsStore,
        surface: Sender,
        runtime: Handle,
        config: HostConfig,
    ) -> Self {
        let mut saved = settings.load();
        if let Some(font) = config.font_override {
            saved.font = font;
        }
        Self {
            inner: Arc::new(HostInner {
                session: Mutex::new(Session::new(saved)),
                settings,
                platform: Arc::new(platform),
                surface,
                initial_file: Mutex::new(config.initial_file),
                font_override: Mutex::new(config.font_override),
                cwd: config.cwd,
                runtime,
            }),
        }
    }

    /// Build the first menu and look up the association in the background.
    pub fn start(&self) {
        self.update(|_| {});
        let host = self.clone();
        self.inner.runtime.spawn(async move {
            match host.blocking(|platform| platform.association_status()).await {
                Ok(status) => host.update(|session| session.set_association(status)),
                Err(e) => log::warn!("{e}"),
            }
        });
    }

    pub fn platform(&self) -> &P {
        &self.inner.platform
    }

    pub fn session(&self) -> Session {
        lock(&self.inner.session).clone()
    }

    pub fn menu_state(&self) -> MenuState {
        lock(&self.inner.session).menu_state()
    }

    /// Re-apply this window's menu, e.g. after it gains focus.
    pub fn refresh_menu(&self) {
        self.update(|_| {});
    }

    /// Mutate the session and rebuild the native menu from the result.
    fn update<R>(&self, change: impl FnOnce(&mut Session) -> R) -> R {
        let mut session = lock(&self.inner.session);
        let result = change(&mut session);
        self.inner
            .platform
            .apply_menu(&render_menu(&session.menu_state()));
        result
    }

    async fn blocking<T, F>(&self, call: F) -> HandlerResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&P) -> T + Send + 'static,
    {
        let platform = Arc::clone(&self.inner.platform);
        self.inner
            .runtime
            .spawn_blocking(move || call(&platform))
            .await
            .map_err(|e| format!("platform call failed: {e}"))
    }

    async fn read_file(&self, path: String) -> HandlerResult<FileContent> {
        let seq = lock(&self.inner.session).begin_read();
        let cwd = self.inner.cwd.clone();
        let result = self
            .inner
            .runtime
            .spawn_blocking(move || files::resolve_file(&path, &cwd))
            .await
            .map_err(|e| format!("read task failed: {e}"))?;

        match result {
            Ok(file) => {
                if !self.update(|session| session.file_opened(seq, &file)) {
                    log::debug!("read #{seq} of {} superseded", file.canonical_path.display());
                }
                Ok(file)
            }
            Err(e) => {
                log::warn!("{e}");
                self.update(|session| session.file_failed(seq));
                Err(e.to_string())
            }
        }
    }

    async fn find_project_root(&self, file_path: PathBuf) -> HandlerResult<Option<PathBuf>> {
        let probe_path = file_path.clone();
        let probe = self
            .inner
            .runtime
            .spawn_blocking(move || files::find_project_root(&probe_path))
            .await
            .map_err(|e| format!("project root task failed: {e}"))?;

        let root = match probe {
            Probe::Found(root) => Some(root),
            Probe::NotFound => None,
            Probe::Unknown(reason) => {
                log::warn!("{reason}");
                None
            }
        };
        let mut session = lock(&self.inner.session);
        session.set_project_root(&file_path, root.clone());
        Ok(root)
    }

    async fn set_md_association(&self, enable: bool) -> HandlerResult<bool> {
        match self.blocking(move |platform| platform.set_association(enable)).await? {
            Ok(enabled) => {
                let status = if enabled {
                    AssociationStatus::Associated
                } else {
                    AssociationStatus::NotAssociated
                };
                self.update(|session| session.set_association(status));
                Ok(enabled)
            }
            Err(message) => {
                // Put the check mark back to where it was.
                self.update(|_| {});
                Err(message)
            }
        }
    }

    fn take_initial_file(&self) -> Option<PathBuf> {
        lock(&self.inner.initial_file).take()
    }

    fn saved_font(&self) -> FontId {
        if let Some(font) = lock(&self.inner.font_override).take() {
            return font;
        }
        self.inner.settings.load().font
    }

    pub fn dispatch(&self, event: HostEvent) {
        match event {
            HostEvent::Menu(id) => match MenuCommand::from_id(&id) {
                Some(command) => self.run_menu_command(command),
                None => log::debug!("ignoring unknown menu item '{id}'"),
            },
            HostEvent::FilesDropped(paths) | HostEvent::OpenedByOs(paths) => {
                if let Some(path) = paths.into_iter().next() {
                    self.inner.surface.send(Message::OpenFile { path });
                }
            }
        }
    }

    fn run_menu_command(&self, command: MenuCommand) {
        match command {
            MenuCommand::OpenFile => {
                let host = self.clone();
                self.inner.runtime.spawn(async move {
                    match host.blocking(|platform| platform.pick_markdown_file()).await {
                        Ok(Some(path)) => host.inner.surface.send(Message::OpenFile { path }),
                        Ok(None) => log::debug!("open dialog cancelled"),
                        Err(e) => log::error!("{e}"),
                    }
                });
            }
            MenuCommand::ExportPdf => {
                let host = self.clone();
                self.inner.runtime.spawn(async move {
                    match host.export_pdf().await {
                        Ok(Some(path)) => log::info!("exported {}", path.display()),
                        Ok(None) => log::debug!("export cancelled"),
                        Err(message) => host.inner.surface.send(Message::ShowError { message }),
                    }
                });
            }
            MenuCommand::CloseWindow => self.inner.platform.close_window(),
            MenuCommand::ToggleFullscreen => self.inner.platform.toggle_fullscreen(),
            MenuCommand::InstallCli => {
                let host = self.clone();
                self.inner.runtime.spawn(async move {
                    let outcome = host
                        .blocking(|platform| platform.install_cli())
                        .await
                        .unwrap_or_else(CliInstallOutcome::Failed);
                    host.inner
                        .surface
                        .send(Message::CliInstallResult { outcome });
                });
            }
            MenuCommand::ToggleAssociation => {
                let enable = !self.menu_state().md_associated;
                let host = self.clone();
                self.inner.runtime.spawn(async move {
                    if let Err(message) = host.set_md_association(enable).await {
                        host.inner.surface.send(Message::ShowError { message });
                    }
                });
            }
            MenuCommand::Font(font) => {
                self.update(|session| session.set_font(font));
                self.inner.surface.send(Message::SetFont { font });
            }
            MenuCommand::Size(size) => self.apply_size(size),
            MenuCommand::StepSize(step) => {
                let size = self.session().size().step(step);
                self.apply_size(size);
            }
            MenuCommand::ResetSize => self.apply_size(DEFAULT_SIZE),
            MenuCommand::Forward(action) => {
                self.inner.surface.send(Message::MenuAction { action });
            }
        }
    }

    fn apply_size(&self, size: Size) {
        self.update(|session| session.set_size(size));
        self.inner.surface.send(Message::SetSize { size });
    }

    /// Ask the surface for the document as PDF and write it where the user
    /// chooses. `Ok(None)` when the save dialog is cancelled.
    pub async fn export_pdf(&self) -> HandlerResult<Option<PathBuf>> {
        let pdf = self
            .inner
            .surface
            .export_pdf()
            .await
            .map_err(|e| e.user_message())?;

        let suggested = self
            .session()
            .current_file()
            .and_then(Path::file_stem)
            .map(|stem| format!("{}.pdf", stem.to_string_lossy()))
            .unwrap_or_else(|| "document.pdf".to_string());

        let Some(chosen) = self
            .blocking(move |platform| platform.pick_pdf_destination(&suggested))
            .await?
        else {
            return Ok(None);
        };

        let path = ensure_pdf_extension(chosen);
        let target = path.clone();
        self.inner
            .runtime
            .spawn_blocking(move || std::fs::write(&target, &pdf.bytes))
            .await
            .map_err(|e| format!("write task failed: {e}"))?
            .map_err(|e| format!("Could not write {}: {e}", path.display()))?;
        Ok(Some(path))
    }
}

impl<P: Platform> Handler for Host<P> {
    const SIDE: Side = Side::Host;

    async fn handle(&self, request: Request) -> HandlerResult<Response> {
        match request {
            Request::ReadFile { path } => self.read_file(path).await.map(Response::File),
            Request::GetInitialFile => Ok(Response::Path(self.take_initial_file())),
            Request::FindProjectRoot { file_path } => {
                self.find_project_root(file_path).await.map(Response::Path)
            }
            Request::RevealInFinder { file_path } => {
                self.blocking(move |platform| platform.reveal(&file_path))
                    .await??;
                Ok(Response::Unit)
            }
            Request::CopyToClipboard { text } => {
                self.blocking(move |platform| platform.copy_to_clipboard(&text))
                    .await??;
                Ok(Response::Unit)
            }
            Request::ShowOpenDialog => {
                let picked = self
                    .blocking(|platform| platform.pick_markdown_file())
                    .await?;
                Ok(Response::Path(picked))
            }
            Request::OpenExternal { url } => {
                self.blocking(move |platform| platform.open_external(&url))
                    .await??;
                Ok(Response::Unit)
            }
            Request::IsMdAssociated => {
                let status = self
                    .blocking(|platform| platform.association_status())
                    .await?;
                self.update(|session| session.set_association(status));
                Ok(Response::Association(status))
            }
            Request::SetMdAssociation { enable } => {
                self.set_md_association(enable).await.map(Response::Enabled)
            }
            Request::GetSavedFont => Ok(Response::Font(self.saved_font())),
            Request::SaveFont { font } => {
                let store = self.inner.settings.clone();
                let saved = self
                    .inner
                    .runtime
                    .spawn_blocking(move || store.save_font(font))
                    .await
                    .map_err(|e| format!("settings task failed: {e}"))?;
                Ok(Response::Saved(saved))
            }
            Request::GetSavedSize => Ok(Response::Size(
                self.inner.settings.load().size_or_default(),
            )),
            Request::SaveSize { size } => {
                let store = self.inner.settings.clone();
                let saved = self
                    .inner
                    .runtime
                    .spawn_blocking(move || store.save_size(size))
                    .await
                    .map_err(|e| format!("settings task failed: {e}"))?;
                Ok(Response::Saved(saved))
            }
            Request::ExportPdf => Err(format!(
                "'{}' is served by the render surface",
                RequestName::ExportPdf
            )),
        }
    }

    fn on_message(&self, message: Message) -> HandlerResult<()> {
        match message {
            Message::SetWindowTitle { title } => self.inner.platform.set_window_title(&title),
            Message::SetFileMenuEnabled { enabled } => {
                self.update(|session| session.set_file_menu_enabled(enabled));
            }
            Message::SetFont { font } | Message::SyncFontMenu { font } => {
                self.update(|session| session.set_font(font));
            }
            Message::SetSize { size } => self.update(|session| session.set_size(size)),
            Message::OpenFile { .. }
            | Message::LoadFile { .. }
            | Message::MenuAction { .. }
            | Message::ShowError { .. }
            | Message::CliInstallResult { .. } => {
                return Err(format!(
                    "'{}' is addressed to the render surface",
                    message.name()
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::{self, MenuEntry};
    use mdview_protocol::{MenuAction, PdfData, channel};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::{TempDir, tempdir};
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct FakePlatform {
        open_pick: Mutex<Option<PathBuf>>,
        save_pick: Mutex<Option<PathBuf>>,
        association_error: Mutex<Option<String>>,
        clipboard: Mutex<Vec<String>>,
        menus: Mutex<Vec<MenuDescription>>,
        titles: Mutex<Vec<String>>,
        closes: AtomicUsize,
    }

    impl FakePlatform {
        fn last_menu(&self) -> MenuDescription {
            lock(&self.menus).last().cloned().expect("a menu was applied")
        }

        fn menu_count(&self) -> usize {
            lock(&self.menus).len()
        }
    }

    impl Platform for FakePlatform {
        fn pick_markdown_file(&self) -> Option<PathBuf> {
            lock(&self.open_pick).clone()
        }

        fn pick_pdf_destination(&self, _suggested_name: &str) -> Option<PathBuf> {
            lock(&self.save_pick).clone()
        }

        fn copy_to_clipboard(&self, text: &str) -> Result<(), String> {
            lock(&self.clipboard).push(text.to_string());
            Ok(())
        }

        fn open_external(&self, url: &str) -> Result<(), String> {
            Err(format!("no browser for {url}"))
        }

        fn reveal(&self, _path: &Path) -> Result<(), String> {
            Ok(())
        }

        fn association_status(&self) -> AssociationStatus {
            AssociationStatus::NotAssociated
        }

        fn set_association(&self, enable: bool) -> Result<bool, String> {
            match lock(&self.association_error).clone() {
                Some(message) => Err(message),
                None => Ok(enable),
            }
        }

        fn install_cli(&self) -> CliInstallOutcome {
            CliInstallOutcome::AlreadyInstalled
        }

        fn apply_menu(&self, menu: &MenuDescription) {
            lock(&self.menus).push(menu.clone());
        }

        fn set_window_title(&self, title: &str) {
            lock(&self.titles).push(title.to_string());
        }

        fn close_window(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }

        fn toggle_fullscreen(&self) {}
    }

    /// Stands in for the render surface: records messages and answers
    /// `exportPdf` with a fixed document.
    struct FakeSurface {
        messages: mpsc::UnboundedSender<Message>,
    }

    impl Handler for FakeSurface {
        const SIDE: Side = Side::Surface;

        async fn handle(&self, request: Request) -> HandlerResult<Response> {
            match request {
                Request::ExportPdf => Ok(Response::Pdf(PdfData {
                    bytes: b"%PDF-1.4 fake".to_vec(),
                    page_count: 1,
                })),
                other => Err(format!("unexpected {}", other.name())),
            }
        }

        fn on_message(&self, message: Message) -> HandlerResult<()> {
            let _ = self.messages.send(message);
            Ok(())
        }
    }

    struct Harness {
        host: Host<FakePlatform>,
        /// Issues requests to the host the way the surface would.
        surface: Sender,
        messages: mpsc::UnboundedReceiver<Message>,
        dir: TempDir,
    }

    impl Harness {
        async fn next_message(&mut self) -> Message {
            tokio::time::timeout(Duration::from_secs(5), self.messages.recv())
                .await
                .expect("message in time")
                .expect("channel open")
        }
    }

    fn harness_with(platform: FakePlatform, config: HostConfig) -> Harness {
        let dir = tempdir().expect("tempdir");
        let store = SettingsStore::new(dir.path().join("settings.json"));
        let (host_end, surface_end) = channel();
        let (to_surface, host_inbox) = host_end.split();
        let (to_host, surface_inbox) = surface_end.split();
        let (tx, messages) = mpsc::unbounded_channel();

        let config = HostConfig {
            cwd: dir.path().to_path_buf(),
            ..config
        };
        let host = Host::new(platform, store, to_surface, Handle::current(), config);
        tokio::spawn(host_inbox.serve(Arc::new(host.clone())));
        tokio::spawn(surface_inbox.serve(Arc::new(FakeSurface { messages: tx })));

        Harness {
            host,
            surface: to_host,
            messages,
            dir,
        }
    }

    fn harness() -> Harness {
        harness_with(FakePlatform::default(), HostConfig::default())
    }

    fn is_checked(menu: &MenuDescription, id: &str) -> bool {
        matches!(menu.find(id), Some(MenuEntry::Check { checked: true, .. }))
    }

    #[tokio::test]
    async fn test_read_file_updates_session() {
        let h = harness();
        std::fs::write(h.dir.path().join("a.md"), "# A").expect("write");

        let file = h.surface.read_file("a.md").await.expect("read");
        assert_eq!(file.content, "# A");
        let session = h.host.session();
        assert_eq!(session.current_file(), Some(file.canonical_path.as_path()));
        assert_eq!(session.base_dir(), Some(file.directory.as_path()));
    }

    #[tokio::test]
    async fn test_read_failure_names_path_and_clears_session() {
        let h = harness();
        std::fs::write(h.dir.path().join("a.md"), "# A").expect("write");
        h.surface.read_file("a.md").await.expect("read");

        let err = h.surface.read_file("gone.md").await.expect_err("missing");
        assert!(err.user_message().contains("gone.md"), "{err}");
        assert_eq!(h.host.session().current_file(), None);
    }

    #[tokio::test]
    async fn test_project_root_is_recorded_for_current_file() {
        let h = harness();
        let repo = h.dir.path().join("repo");
        std::fs::create_dir_all(repo.join(".git")).expect("mkdir");
        std::fs::write(repo.join("b.md"), "b").expect("write");

        let file = h.surface.read_file("repo/b.md").await.expect("read");
        let root = h
            .surface
            .find_project_root(&file.canonical_path)
            .await
            .expect("root");
        let canonical_repo = repo.canonicalize().expect("canonicalize");
        assert_eq!(root.as_deref(), Some(canonical_repo.as_path()));
        assert_eq!(
            h.host.session().project_root(),
            Some(canonical_repo.as_path())
        );
    }

    #[tokio::test]
    async fn test_initial_file_is_handed_out_once() {
        let h = harness_with(
            FakePlatform::default(),
            HostConfig {
                initial_file: Some(PathBuf::from("/docs/readme.md")),
                ..HostConfig::default()
            },
        );
        assert_eq!(
            h.surface.get_initial_file().await.expect("first"),
            Some(PathBuf::from("/docs/readme.md"))
        );
        assert_eq!(h.surface.get_initial_file().await.expect("second"), None);
    }

    #[tokio::test]
    async fn test_preferences_persist_across_hosts() {
        let h = harness();
        assert_eq!(h.surface.get_saved_font().await.expect("font"), FontId::System);
        assert_eq!(h.surface.get_saved_size().await.expect("size"), DEFAULT_SIZE);

        assert!(h.surface.save_font(FontId::Serif).await.expect("save font"));
        assert!(h.surface.save_size(Size::new(20)).await.expect("save size"));

        // Read back through a separate store, as the next launch would.
        let store = SettingsStore::new(h.dir.path().join("settings.json"));
        let settings = store.load();
        assert_eq!(settings.font, FontId::Serif);
        assert_eq!(settings.size, Some(Size::new(20)));
    }

    #[tokio::test]
    async fn test_corrupt_settings_fall_back_to_defaults() {
        let h = harness();
        std::fs::write(h.dir.path().join("settings.json"), "{{{").expect("write");
        assert_eq!(h.surface.get_saved_font().await.expect("font"), FontId::System);
        assert_eq!(h.surface.get_saved_size().await.expect("size"), DEFAULT_SIZE);
    }

    #[tokio::test]
    async fn test_font_override_is_used_once_and_not_saved() {
        let h = harness_with(
            FakePlatform::default(),
            HostConfig {
                font_override: Some(FontId::Mono),
                ..HostConfig::default()
            },
        );
        assert_eq!(h.surface.get_saved_font().await.expect("font"), FontId::Mono);
        assert_eq!(h.surface.get_saved_font().await.expect("font"), FontId::System);
        assert!(!h.dir.path().join("settings.json").exists());
    }

    #[tokio::test]
    async fn test_font_menu_checks_font_and_notifies_surface() {
        let mut h = harness();
        h.host.dispatch(HostEvent::Menu(menu::font_item_id(FontId::Readable)));

        assert_eq!(
            h.next_message().await,
            Message::SetFont {
                font: FontId::Readable
            }
        );
        let menu = h.host.platform().last_menu();
        assert!(is_checked(&menu, "font_readable"));
        assert!(!is_checked(&menu, "font_system"));
    }

    #[tokio::test]
    async fn test_size_steps_clamp_at_largest() {
        let mut h = harness();
        h.host.dispatch(HostEvent::Menu("size_24".to_string()));
        assert_eq!(
            h.next_message().await,
            Message::SetSize {
                size: Size::new(24)
            }
        );

        h.host.dispatch(HostEvent::Menu(menu::SIZE_LARGER.to_string()));
        assert_eq!(
            h.next_message().await,
            Message::SetSize {
                size: Size::new(24)
            }
        );

        h.host.dispatch(HostEvent::Menu(menu::SIZE_RESET.to_string()));
        assert_eq!(h.next_message().await, Message::SetSize { size: DEFAULT_SIZE });
        assert!(is_checked(&h.host.platform().last_menu(), "size_16"));
    }

    #[tokio::test]
    async fn test_unknown_menu_item_changes_nothing() {
        let mut h = harness();
        let before = h.host.menu_state();

        h.host.dispatch(HostEvent::Menu("launch_rockets".to_string()));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(h.host.menu_state(), before);
        assert_eq!(h.host.platform().menu_count(), 0);
        assert!(h.messages.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_surface_messages_rebuild_menu() {
        let h = harness();
        h.host
            .on_message(Message::SetFileMenuEnabled { enabled: true })
            .expect("enable");
        assert!(h.host.menu_state().file_menu_enabled);
        assert!(matches!(
            h.host.platform().last_menu().find(menu::EXPORT_PDF),
            Some(MenuEntry::Item { enabled: true, .. })
        ));

        h.host
            .on_message(Message::SyncFontMenu { font: FontId::Inter })
            .expect("sync");
        assert!(is_checked(&h.host.platform().last_menu(), "font_inter"));

        h.host
            .on_message(Message::SetWindowTitle {
                title: "a.md".to_string(),
            })
            .expect("title");
        assert_eq!(*lock(&h.host.platform().titles), vec!["a.md".to_string()]);
    }

    #[tokio::test]
    async fn test_refresh_reapplies_same_menu() {
        let h = harness();
        h.host
            .on_message(Message::SetFileMenuEnabled { enabled: true })
            .expect("enable");
        let before = h.host.platform().last_menu();
        let count = h.host.platform().menu_count();

        h.host.refresh_menu();
        assert_eq!(h.host.platform().menu_count(), count + 1);
        assert_eq!(h.host.platform().last_menu(), before);
    }

    #[tokio::test]
    async fn test_surface_only_message_is_rejected() {
        let h = harness();
        let err = h
            .host
            .on_message(Message::ShowError {
                message: "x".to_string(),
            })
            .expect_err("wrong side");
        assert!(err.contains("showError"));
    }

    #[tokio::test]
    async fn test_failed_association_keeps_previous_state() {
        let platform = FakePlatform::default();
        *lock(&platform.association_error) = Some("helper refused".to_string());
        let mut h = harness_with(platform, HostConfig::default());

        h.host.dispatch(HostEvent::Menu(menu::ASSOCIATE_MD.to_string()));

        match h.next_message().await {
            Message::ShowError { message } => assert_eq!(message, "helper refused"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!h.host.menu_state().md_associated);
        assert!(!is_checked(&h.host.platform().last_menu(), menu::ASSOCIATE_MD));
    }

    #[tokio::test]
    async fn test_association_request_updates_menu() {
        let h = harness();
        assert!(h.surface.set_md_association(true).await.expect("set"));
        assert!(h.host.menu_state().md_associated);

        let status = h.surface.is_md_associated().await.expect("query");
        assert_eq!(status, AssociationStatus::NotAssociated);
        assert!(!h.host.menu_state().md_associated);
    }

    #[tokio::test]
    async fn test_open_dialog_cancel_sends_nothing() {
        let mut h = harness();
        h.host.dispatch(HostEvent::Menu(menu::OPEN_FILE.to_string()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(h.messages.try_recv().is_err());

        *lock(&h.host.platform().open_pick) = Some(PathBuf::from("/docs/picked.md"));
        h.host.dispatch(HostEvent::Menu(menu::OPEN_FILE.to_string()));
        assert_eq!(
            h.next_message().await,
            Message::OpenFile {
                path: PathBuf::from("/docs/picked.md")
            }
        );
    }

    #[tokio::test]
    async fn test_window_commands_reach_platform() {
        let mut h = harness();
        h.host.dispatch(HostEvent::Menu(menu::CLOSE_WINDOW.to_string()));
        assert_eq!(h.host.platform().closes.load(Ordering::SeqCst), 1);

        h.host.dispatch(HostEvent::Menu(menu::INSTALL_CLI.to_string()));
        assert_eq!(
            h.next_message().await,
            Message::CliInstallResult {
                outcome: CliInstallOutcome::AlreadyInstalled
            }
        );
    }

    #[tokio::test]
    async fn test_dropped_files_open_first_path() {
        let mut h = harness();
        h.host.dispatch(HostEvent::FilesDropped(vec![
            PathBuf::from("/a.md"),
            PathBuf::from("/b.md"),
        ]));
        assert_eq!(
            h.next_message().await,
            Message::OpenFile {
                path: PathBuf::from("/a.md")
            }
        );
    }

    #[tokio::test]
    async fn test_menu_actions_are_forwarded() {
        let mut h = harness();
        h.host.dispatch(HostEvent::Menu(menu::COPY_PROJECT_PATH.to_string()));
        assert_eq!(
            h.next_message().await,
            Message::MenuAction {
                action: MenuAction::CopyProjectPath
            }
        );
    }

    #[tokio::test]
    async fn test_export_writes_pdf_with_extension() {
        let h = harness();
        let chosen = h.dir.path().join("report");
        *lock(&h.host.platform().save_pick) = Some(chosen.clone());

        let written = h.host.export_pdf().await.expect("export");
        let expected = h.dir.path().join("report.pdf");
        assert_eq!(written, Some(expected.clone()));
        assert_eq!(
            std::fs::read(expected).expect("pdf"),
            b"%PDF-1.4 fake".to_vec()
        );
    }

    #[tokio::test]
    async fn test_export_cancel_writes_nothing() {
        let h = harness();
        assert_eq!(h.host.export_pdf().await.expect("export"), None);
    }

    #[tokio::test]
    async fn test_export_pdf_request_is_not_served_by_host() {
        let h = harness();
        let err = h.host.handle(Request::ExportPdf).await.expect_err("host");
        assert!(err.contains("exportPDF"));
    }

    #[test]
    fn test_ensure_pdf_extension() {
        assert_eq!(
            ensure_pdf_extension(PathBuf::from("/tmp/out")),
            PathBuf::from("/tmp/out.pdf")
        );
        assert_eq!(
            ensure_pdf_extension(PathBuf::from("/tmp/out.PDF")),
            PathBuf::from("/tmp/out.PDF")
        );
        assert_eq!(
            ensure_pdf_extension(PathBuf::from("/tmp/notes.md")),
            PathBuf::from("/tmp/notes.md.pdf")
        );
    }
}
