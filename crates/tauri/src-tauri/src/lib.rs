//! Tauri shell for the markdown viewer.
//!
//! Every window pairs an `mdview_core::Host` with an `mdview_surface::Surface`
//! joined by an in-process channel. This crate creates the native windows,
//! routes menu and OS events to the right host, and bridges the page inside
//! each window to its surface.

mod commands;
mod dto;
mod platform;
mod state;
mod webview;

use anyhow::Context;
use mdview_core::{Host, HostConfig, HostEvent, LaunchPlan};
use mdview_prefs::SettingsStore;
use mdview_protocol::{FontId, channel};
use mdview_surface::{APP_TITLE, Surface};
use platform::TauriPlatform;
use state::{AppState, WindowContext, lock};
use std::path::PathBuf;
use std::sync::Arc;
use tauri::{AppHandle, DragDropEvent, Manager, RunEvent, WebviewUrl, WindowEvent};
use tauri_plugin_log::{Target, TargetKind};
use webview::{WebviewDisplay, WebviewRasterizer};

/// Overrides the log level, e.g. `MDVIEW_LOG=trace`.
const LOG_ENV: &str = "MDVIEW_LOG";

fn log_level() -> log::LevelFilter {
    std::env::var(LOG_ENV)
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(if cfg!(debug_assertions) {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
}

/// Create a viewer window with its own host and surface.
///
/// The context is registered before the webview exists so the page's first
/// command always finds it.
fn open_window(
    app: &AppHandle,
    initial_file: Option<PathBuf>,
    font_override: Option<FontId>,
) -> tauri::Result<()> {
    let state = app.state::<AppState>();
    let label = state.next_label();

    let (host_end, surface_end) = channel();
    let (to_surface, host_inbox) = host_end.split();
    let (to_host, surface_inbox) = surface_end.split();

    let host = Host::new(
        TauriPlatform::new(app.clone(), label.clone(), Arc::clone(&state.focus)),
        state.settings.clone(),
        to_surface,
        state.runtime.clone(),
        HostConfig {
            initial_file,
            font_override,
            cwd: std::env::current_dir().unwrap_or_default(),
        },
    );
    let surface = Surface::new(
        to_host.clone(),
        WebviewDisplay::new(app.clone(), label.clone()),
        WebviewRasterizer::new(app.clone(), label.clone(), Arc::clone(&state.captures)),
        Arc::clone(&state.renderer),
        state.runtime.clone(),
    );
    let tasks = vec![
        state.runtime.spawn(host_inbox.serve(Arc::new(host.clone()))),
        state.runtime.spawn(surface_inbox.serve(Arc::new(surface.clone()))),
    ];
    lock(&state.windows).insert(
        label.clone(),
        WindowContext {
            host: host.clone(),
            surface,
            to_host,
            tasks,
        },
    );

    let built = tauri::WebviewWindowBuilder::new(app, &label, WebviewUrl::App("index.html".into()))
        .title(APP_TITLE)
        .inner_size(860.0, 1000.0)
        .min_inner_size(420.0, 320.0)
        .build();
    if let Err(e) = built {
        state.remove(&label);
        return Err(e);
    }

    state.focus.set(&label);
    host.start();
    log::debug!("opened window {label}");
    Ok(())
}

fn handle_window_event(window: &tauri::Window, event: &WindowEvent) {
    let state = window.state::<AppState>();
    let label = window.label();
    match event {
        WindowEvent::Focused(true) => {
            state.focus.set(label);
            if let Some(host) = state.host(label) {
                host.refresh_menu();
            }
        }
        WindowEvent::DragDrop(DragDropEvent::Drop { paths, .. }) => {
            if let Some(host) = state.host(label) {
                host.dispatch(HostEvent::FilesDropped(paths.clone()));
            }
        }
        WindowEvent::Destroyed => {
            if state.remove(label).is_some() {
                log::debug!("closed window {label}");
            }
        }
        _ => {}
    }
}

/// Files handed over by the OS go to the focused window, or to a new one
/// when none is open.
#[cfg(target_os = "macos")]
fn open_from_os(app: &AppHandle, paths: Vec<PathBuf>) {
    let state = app.state::<AppState>();
    if let Some(host) = state.focused_host() {
        host.dispatch(HostEvent::OpenedByOs(paths));
        return;
    }
    let Some(first) = paths.into_iter().next() else {
        return;
    };
    if let Err(e) = open_window(app, Some(first), None) {
        log::error!("failed to open window: {e}");
    }
}

/// Run the viewer until its last window closes, opening the windows `plan`
/// asks for.
pub fn run(plan: LaunchPlan) -> anyhow::Result<()> {
    let runtime = tauri::async_runtime::block_on(async { tokio::runtime::Handle::current() });
    let exit_code = plan.exit_code();

    let app = tauri::Builder::default()
        .plugin(
            tauri_plugin_log::Builder::new()
                .level(log_level())
                .targets([
                    Target::new(TargetKind::Stdout),
                    Target::new(TargetKind::Webview),
                    #[cfg(target_os = "macos")]
                    Target::new(TargetKind::LogDir { file_name: None }),
                ])
                .build(),
        )
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_clipboard_manager::init())
        .manage(AppState::new(
            runtime,
            SettingsStore::open_default(),
            exit_code,
        ))
        .invoke_handler(tauri::generate_handler![
            commands::surface_ready,
            commands::surface_event,
            commands::ipc_request,
            commands::capture_result,
            commands::capture_failed,
        ])
        .setup(move |app| {
            let handle = app.handle();
            if plan.files.is_empty() {
                open_window(handle, None, plan.font)?;
            }
            for file in &plan.files {
                open_window(handle, Some(file.clone()), plan.font)?;
            }
            Ok(())
        })
        .on_window_event(handle_window_event)
        .on_menu_event(|app, event| {
            let event_id = event.id().0.as_str();
            match app.state::<AppState>().focused_host() {
                Some(host) => host.dispatch(HostEvent::Menu(event_id.to_string())),
                None => log::debug!("menu item {event_id} with no window open"),
            }
        })
        .build(tauri::generate_context!())
        .context("failed to start the viewer")?;

    app.run(|app_handle, event| match event {
        #[cfg(target_os = "macos")]
        RunEvent::Opened { urls } => {
            let paths = urls
                .into_iter()
                .filter_map(|url| url.to_file_path().ok())
                .collect();
            open_from_os(app_handle, paths);
        }
        RunEvent::Exit => {
            let code = app_handle.state::<AppState>().exit_code;
            if code != 0 {
                std::process::exit(code);
            }
        }
        _ => {}
    });
    Ok(())
}
