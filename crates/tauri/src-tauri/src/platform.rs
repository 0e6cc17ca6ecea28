//! Native services for one window, backed by Tauri and its plugins.

use crate::state::FocusTracker;
use mdview_core::menu::{MenuDescription, MenuEntry, Predefined, Submenu};
use mdview_core::Platform;
use mdview_protocol::MARKDOWN_EXTENSIONS;
use std::path::PathBuf;
use std::sync::Arc;
use tauri::menu::{
    CheckMenuItem, IsMenuItem, Menu, MenuBuilder, MenuItem, PredefinedMenuItem, SubmenuBuilder,
};
use tauri::{AppHandle, Manager, WebviewWindow, Wry};
use tauri_plugin_clipboard_manager::ClipboardExt;
use tauri_plugin_dialog::DialogExt;
use tauri_plugin_opener::OpenerExt;

pub struct TauriPlatform {
    app: AppHandle,
    label: String,
    focus: Arc<FocusTracker>,
}

impl TauriPlatform {
    pub fn new(app: AppHandle, label: String, focus: Arc<FocusTracker>) -> Self {
        Self { app, label, focus }
    }

    fn window(&self) -> Option<WebviewWindow> {
        self.app.get_webview_window(&self.label)
    }
}

fn predefined_item(app: &AppHandle, item: Predefined) -> tauri::Result<PredefinedMenuItem<Wry>> {
    match item {
        Predefined::Undo => PredefinedMenuItem::undo(app, None),
        Predefined::Redo => PredefinedMenuItem::redo(app, None),
        Predefined::Cut => PredefinedMenuItem::cut(app, None),
        Predefined::Copy => PredefinedMenuItem::copy(app, None),
        Predefined::Paste => PredefinedMenuItem::paste(app, None),
        Predefined::SelectAll => PredefinedMenuItem::select_all(app, None),
        Predefined::Quit => PredefinedMenuItem::quit(app, None),
    }
}

fn build_submenu(
    app: &AppHandle,
    submenu: &Submenu,
) -> tauri::Result<tauri::menu::Submenu<Wry>> {
    let mut builder = SubmenuBuilder::new(app, &submenu.title);
    for entry in &submenu.entries {
        builder = match entry {
            MenuEntry::Item {
                id,
                label,
                accelerator,
                enabled,
            } => builder.item(&MenuItem::with_id(
                app,
                id.as_str(),
                label,
                *enabled,
                *accelerator,
            )?),
            MenuEntry::Check {
                id,
                label,
                accelerator,
                enabled,
                checked,
            } => builder.item(&CheckMenuItem::with_id(
                app,
                id.as_str(),
                label,
                *enabled,
                *checked,
                *accelerator,
            )?),
            MenuEntry::Submenu(nested) => builder.item(&build_submenu(app, nested)?),
            MenuEntry::Predefined(item) => builder.item(&predefined_item(app, *item)?),
            MenuEntry::Separator => builder.separator(),
        };
    }
    builder.build()
}

/// Turn a menu description into the native menu bar.
pub fn build_menu(app: &AppHandle, description: &MenuDescription) -> tauri::Result<Menu<Wry>> {
    let mut submenus = Vec::with_capacity(description.submenus.len() + 1);
    // macOS always treats the first submenu as the application menu.
    if cfg!(target_os = "macos") {
        submenus.push(
            SubmenuBuilder::new(app, &app.package_info().name)
                .about(None)
                .separator()
                .hide()
                .hide_others()
                .separator()
                .quit()
                .build()?,
        );
    }
    for submenu in &description.submenus {
        submenus.push(build_submenu(app, submenu)?);
    }
    let items: Vec<&dyn IsMenuItem<Wry>> = submenus
        .iter()
        .map(|submenu| submenu as &dyn IsMenuItem<Wry>)
        .collect();
    MenuBuilder::new(app).items(&items).build()
}

impl Platform for TauriPlatform {
    fn pick_markdown_file(&self) -> Option<PathBuf> {
        let mut dialog = self
            .app
            .dialog()
            .file()
            .set_title("Open Markdown File")
            .add_filter("Markdown", &MARKDOWN_EXTENSIONS);
        if let Some(window) = self.window() {
            dialog = dialog.set_parent(&window);
        }
        dialog.blocking_pick_file()?.into_path().ok()
    }

    fn pick_pdf_destination(&self, suggested_name: &str) -> Option<PathBuf> {
        let mut dialog = self
            .app
            .dialog()
            .file()
            .set_title("Export as PDF")
            .set_file_name(suggested_name)
            .add_filter("PDF", &["pdf"]);
        if let Some(window) = self.window() {
            dialog = dialog.set_parent(&window);
        }
        dialog.blocking_save_file()?.into_path().ok()
    }

    fn copy_to_clipboard(&self, text: &str) -> Result<(), String> {
        self.app
            .clipboard()
            .write_text(text.to_string())
            .map_err(|e| e.to_string())
    }

    fn open_external(&self, url: &str) -> Result<(), String> {
        self.app
            .opener()
            .open_url(url, None::<&str>)
            .map_err(|e| e.to_string())
    }

    /// Only the focused window owns the menu bar. Building happens on the
    /// UI thread; this call returns immediately.
    fn apply_menu(&self, menu: &MenuDescription) {
        if !self.focus.is_focused(&self.label) {
            return;
        }
        let app = self.app.clone();
        let menu = menu.clone();
        let label = self.label.clone();
        let queued = self.app.run_on_main_thread(move || {
            let applied = build_menu(&app, &menu).and_then(|menu| app.set_menu(menu));
            if let Err(e) = applied {
                log::error!("{label}: failed to apply menu: {e}");
            }
        });
        if let Err(e) = queued {
            log::error!("{}: failed to queue menu update: {e}", self.label);
        }
    }

    fn set_window_title(&self, title: &str) {
        if let Some(window) = self.window()
            && let Err(e) = window.set_title(title)
        {
            log::warn!("{}: failed to set title: {e}", self.label);
        }
    }

    fn close_window(&self) {
        if let Some(window) = self.window()
            && let Err(e) = window.close()
        {
            log::warn!("{}: failed to close: {e}", self.label);
        }
    }

    fn toggle_fullscreen(&self) {
        let Some(window) = self.window() else {
            return;
        };
        let toggled = window
            .is_fullscreen()
            .and_then(|fullscreen| window.set_fullscreen(!fullscreen));
        if let Err(e) = toggled {
            log::warn!("{}: failed to toggle full screen: {e}", self.label);
        }
    }
}
