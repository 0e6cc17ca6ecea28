// Prevents an additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use mdview_core::{LaunchError, plan_launch};

fn main() {
    let cwd = std::env::current_dir().unwrap_or_default();
    let plan = match plan_launch(std::env::args_os(), &cwd) {
        Ok(plan) => plan,
        Err(err) => {
            match &err {
                // Help and usage text keep clap's own formatting.
                LaunchError::Usage(e) => {
                    let _ = e.print();
                }
                LaunchError::MissingFile => {
                    eprintln!("mdview: {err}");
                    eprintln!("usage: mdview [--font NAME] FILE...");
                }
                LaunchError::NothingToOpen { failures } => {
                    for failure in failures {
                        eprintln!("{failure}");
                    }
                }
            }
            std::process::exit(err.exit_code());
        }
    };
    for failure in &plan.failures {
        eprintln!("{failure}");
    }
    if let Err(e) = mdview_tauri_lib::run(plan) {
        eprintln!("mdview: {e:#}");
        std::process::exit(1);
    }
}
