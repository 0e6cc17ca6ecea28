//! Desktop integration that shells out to platform tools: revealing files,
//! the default-handler association for Markdown, and installing the `mdview`
//! command.

use mdview_protocol::{AssociationStatus, CliInstallOutcome};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

pub const CLI_INSTALL_TARGET: &str = "/usr/local/bin/mdview";
pub const FALLBACK_BUNDLE_ID: &str = "com.mdview.viewer";
pub const MARKDOWN_UTI: &str = "net.daringfireball.markdown";
pub const MARKDOWN_MIME: &str = "text/markdown";
pub const DESKTOP_ENTRY: &str = "mdview.desktop";

/// The handler the association is returned to when switched off on macOS.
const MACOS_DEFAULT_EDITOR: &str = "com.apple.TextEdit";

const ASSOCIATION_GUIDANCE: &str = "You can always change this from your file manager: \
open a .md file's properties and pick the application it opens with.";

#[derive(Debug, thiserror::Error)]
pub enum AssociationError {
    #[error(
        "Changing the default Markdown application is not supported here. {guidance}",
        guidance = ASSOCIATION_GUIDANCE
    )]
    Unsupported,
    #[error("Could not run {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: io::Error,
    },
    #[error(
        "Failed to {action} the file association. {detail}\n\n{guidance}",
        guidance = ASSOCIATION_GUIDANCE
    )]
    Helper {
        action: &'static str,
        detail: String,
    },
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

/// Show `path` in the platform file manager.
pub fn reveal(path: &Path) -> Result<(), String> {
    let command = if cfg!(target_os = "macos") {
        let mut command = Command::new("open");
        command.arg("-R").arg(path);
        command
    } else if cfg!(target_os = "windows") {
        let mut arg = std::ffi::OsString::from("/select,");
        arg.push(path);
        let mut command = Command::new("explorer");
        command.arg(arg);
        command
    } else {
        let dir = path.parent().unwrap_or(path);
        let mut command = Command::new("xdg-open");
        command.arg(dir);
        command
    };
    // explorer exits with 1 even when the window opens.
    run_reveal(command, path, !cfg!(target_os = "windows"))
}

/// Wait for the file-manager helper and turn a failed exit into the message
/// the user sees.
fn run_reveal(mut command: Command, path: &Path, check_status: bool) -> Result<(), String> {
    let output = command
        .output()
        .map_err(|e| format!("Could not reveal {}: {e}", path.display()))?;
    if check_status && !output.status.success() {
        let detail = stderr_text(&output);
        return Err(if detail.is_empty() {
            format!("Could not reveal {}: {}", path.display(), output.status)
        } else {
            format!("Could not reveal {}: {detail}", path.display())
        });
    }
    Ok(())
}

/// Bundle identifier of the running app: the environment override first,
/// then the `Info.plist` next to the executable.
fn current_bundle_id() -> String {
    if let Ok(id) = std::env::var("TAURI_BUNDLE_IDENTIFIER") {
        if !id.trim().is_empty() {
            return id;
        }
    }

    let from_plist = std::env::current_exe().ok().and_then(|exe| {
        // <App>.app/Contents/MacOS/<binary>
        let info_plist = exe.parent()?.parent()?.join("Info.plist");
        let output = Command::new("/usr/bin/defaults")
            .arg("read")
            .arg(info_plist)
            .arg("CFBundleIdentifier")
            .output()
            .ok()?;
        let id = stdout_text(&output);
        (output.status.success() && !id.is_empty()).then_some(id)
    });

    from_plist.unwrap_or_else(|| FALLBACK_BUNDLE_ID.to_string())
}

fn run_swift(script: &str) -> Result<Output, AssociationError> {
    Command::new("swift")
        .arg("-e")
        .arg(script)
        .output()
        .map_err(|source| AssociationError::Spawn {
            tool: "swift",
            source,
        })
}

fn run_xdg_mime(args: &[&str]) -> Result<Output, AssociationError> {
    Command::new("xdg-mime")
        .args(args)
        .output()
        .map_err(|source| AssociationError::Spawn {
            tool: "xdg-mime",
            source,
        })
}

/// Compare the handler reported by the platform against ours.
pub fn classify_handler(reported: &str, ours: &str) -> AssociationStatus {
    let reported = reported.trim();
    if reported.is_empty() || reported.eq_ignore_ascii_case("none") {
        AssociationStatus::NotAssociated
    } else if reported.eq_ignore_ascii_case(ours) {
        AssociationStatus::Associated
    } else {
        AssociationStatus::NotAssociated
    }
}

/// Whether mdview is the default application for Markdown files.
pub fn association_status() -> AssociationStatus {
    if cfg!(target_os = "macos") {
        let script = format!(
            r#"import CoreServices; import Foundation; if let h = LSCopyDefaultRoleHandlerForContentType("{MARKDOWN_UTI}" as NSString as CFString, .all) {{ print(h.takeRetainedValue()) }} else {{ print("none") }}"#
        );
        match run_swift(&script) {
            Ok(output) if output.status.success() => {
                classify_handler(&stdout_text(&output), &current_bundle_id())
            }
            Ok(output) => {
                log::warn!("association query failed: {}", stderr_text(&output));
                AssociationStatus::Unknown
            }
            Err(e) => {
                log::warn!("{e}");
                AssociationStatus::Unknown
            }
        }
    } else if cfg!(target_os = "linux") {
        match run_xdg_mime(&["query", "default", MARKDOWN_MIME]) {
            Ok(output) if output.status.success() => {
                classify_handler(&stdout_text(&output), DESKTOP_ENTRY)
            }
            Ok(output) => {
                log::warn!("xdg-mime query failed: {}", stderr_text(&output));
                AssociationStatus::Unknown
            }
            Err(e) => {
                log::warn!("{e}");
                AssociationStatus::Unknown
            }
        }
    } else {
        AssociationStatus::Unknown
    }
}

/// Make mdview the Markdown handler, or hand the role back. Returns the
/// state that is now in effect.
pub fn set_association(enable: bool) -> Result<bool, AssociationError> {
    let action = if enable { "set" } else { "remove" };

    if cfg!(target_os = "macos") {
        let bundle = current_bundle_id();
        let target = if enable {
            bundle.as_str()
        } else {
            MACOS_DEFAULT_EDITOR
        };
        let script = format!(
            r#"import CoreServices; import Foundation; let r = LSSetDefaultRoleHandlerForContentType("{MARKDOWN_UTI}" as NSString as CFString, .all, "{target}" as NSString as CFString); print(r == 0 ? "ok" : "err")"#
        );
        let output = run_swift(&script)?;
        if stdout_text(&output) == "ok" {
            return Ok(enable);
        }
        return Err(AssociationError::Helper {
            action,
            detail: format!(
                "{}\n\nMake sure you are running the installed app bundle.",
                stderr_text(&output)
            ),
        });
    }

    if cfg!(target_os = "linux") {
        if !enable {
            // xdg-mime has no "unset"; the user picks the next handler.
            return Err(AssociationError::Helper {
                action,
                detail: "Choose another default application for Markdown files.".to_string(),
            });
        }
        let output = run_xdg_mime(&["default", DESKTOP_ENTRY, MARKDOWN_MIME])?;
        if output.status.success() {
            return Ok(true);
        }
        return Err(AssociationError::Helper {
            action,
            detail: stderr_text(&output),
        });
    }

    Err(AssociationError::Unsupported)
}

fn symlink(source: &Path, target: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(source, target)
    }
    #[cfg(not(unix))]
    {
        let _ = (source, target);
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "symlinks are not supported on this platform",
        ))
    }
}

/// Link `executable` at `target`, replacing whatever was there.
pub fn install_cli_at(executable: &Path, target: &Path) -> CliInstallOutcome {
    if target.is_symlink() {
        if let Ok(existing) = std::fs::read_link(target) {
            if existing == executable {
                return CliInstallOutcome::AlreadyInstalled;
            }
        }
    }

    if target.exists() || target.is_symlink() {
        if let Err(e) = std::fs::remove_file(target) {
            log::debug!("cannot remove {}: {e}", target.display());
        }
    }

    match symlink(executable, target) {
        Ok(()) => CliInstallOutcome::Installed,
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied && cfg!(target_os = "macos") => {
            install_with_privileges(executable, target)
        }
        Err(e) => CliInstallOutcome::Failed(format!("{}: {e}", target.display())),
    }
}

fn install_with_privileges(executable: &Path, target: &Path) -> CliInstallOutcome {
    let script = format!(
        "do shell script \"ln -sf '{}' '{}'\" with administrator privileges",
        executable.display(),
        target.display()
    );
    match Command::new("osascript").arg("-e").arg(&script).status() {
        Ok(status) if status.success() => CliInstallOutcome::Installed,
        // osascript exits non-zero when the password prompt is dismissed.
        Ok(_) => CliInstallOutcome::Cancelled,
        Err(e) => CliInstallOutcome::Failed(e.to_string()),
    }
}

pub fn install_cli() -> CliInstallOutcome {
    match std::env::current_exe() {
        Ok(executable) => install_cli_at(&executable, &PathBuf::from(CLI_INSTALL_TARGET)),
        Err(e) => CliInstallOutcome::Failed(format!("Failed to locate binary: {e}")),
    }
}
