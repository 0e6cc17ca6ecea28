//! Application menu as a pure projection of [`MenuState`].
//!
//! The native menu is rebuilt from [`render_menu`] after every state change;
//! there are no incremental updates to drift out of sync.

use mdview_protocol::{FontId, MenuAction, Size, Step};

pub const OPEN_FILE: &str = "open_file";
pub const COPY_FILE_PATH: &str = "copy_file_path";
pub const COPY_DIR_PATH: &str = "copy_dir_path";
pub const COPY_PROJECT_PATH: &str = "copy_project_path";
pub const REVEAL_FINDER: &str = "reveal_finder";
pub const EXPORT_PDF: &str = "export_pdf";
pub const CLOSE_WINDOW: &str = "close_window";
pub const TOGGLE_FULLSCREEN: &str = "toggle_fullscreen";
pub const INSTALL_CLI: &str = "install_cli";
pub const ASSOCIATE_MD: &str = "associate_md";
pub const SIZE_LARGER: &str = "size_larger";
pub const SIZE_SMALLER: &str = "size_smaller";
pub const SIZE_RESET: &str = "size_reset";

const FULLSCREEN_ACCELERATOR: &str = if cfg!(target_os = "macos") {
    "Ctrl+Cmd+F"
} else {
    "F11"
};

const FONT_PREFIX: &str = "font_";
const SIZE_PREFIX: &str = "size_";

pub fn font_item_id(font: FontId) -> String {
    format!("{FONT_PREFIX}{}", font.as_str())
}

pub fn size_item_id(size: Size) -> String {
    format!("{SIZE_PREFIX}{}", size.px())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuState {
    pub file_menu_enabled: bool,
    pub checked_font: FontId,
    /// `None` when the current size is not one of the menu's sizes.
    pub checked_size: Option<Size>,
    pub md_associated: bool,
}

impl Default for MenuState {
    fn default() -> Self {
        Self {
            file_menu_enabled: false,
            checked_font: FontId::System,
            checked_size: Some(Size::default()),
            md_associated: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predefined {
    Undo,
    Redo,
    Cut,
    Copy,
    Paste,
    SelectAll,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    Item {
        id: String,
        label: String,
        accelerator: Option<&'static str>,
        enabled: bool,
    },
    Check {
        id: String,
        label: String,
        accelerator: Option<&'static str>,
        enabled: bool,
        checked: bool,
    },
    Submenu(Submenu),
    Predefined(Predefined),
    Separator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submenu {
    pub title: String,
    pub entries: Vec<MenuEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuDescription {
    pub submenus: Vec<Submenu>,
}

impl MenuDescription {
    /// Depth-first search by item id.
    pub fn find(&self, id: &str) -> Option<&MenuEntry> {
        fn search<'a>(entries: &'a [MenuEntry], id: &str) -> Option<&'a MenuEntry> {
            entries.iter().find_map(|entry| match entry {
                MenuEntry::Item { id: item_id, .. } | MenuEntry::Check { id: item_id, .. }
                    if item_id == id =>
                {
                    Some(entry)
                }
                MenuEntry::Submenu(submenu) => search(&submenu.entries, id),
                _ => None,
            })
        }
        self.submenus
            .iter()
            .find_map(|submenu| search(&submenu.entries, id))
    }
}

fn item(id: &str, label: &str, accelerator: Option<&'static str>, enabled: bool) -> MenuEntry {
    MenuEntry::Item {
        id: id.to_string(),
        label: label.to_string(),
        accelerator,
        enabled,
    }
}

fn check(id: String, label: String, checked: bool) -> MenuEntry {
    MenuEntry::Check {
        id,
        label,
        accelerator: None,
        enabled: true,
        checked,
    }
}

fn font_entry(state: &MenuState, font: FontId) -> MenuEntry {
    check(
        font_item_id(font),
        font.label().to_string(),
        state.checked_font == font,
    )
}

pub fn render_menu(state: &MenuState) -> MenuDescription {
    let has_file = state.file_menu_enabled;

    let mut file_entries = vec![
        item(OPEN_FILE, "Open…", Some("CmdOrCtrl+O"), true),
        MenuEntry::Separator,
        item(COPY_FILE_PATH, "Copy File Path", Some("CmdOrCtrl+Shift+C"), has_file),
        item(COPY_DIR_PATH, "Copy Containing Folder Path", None, has_file),
        item(COPY_PROJECT_PATH, "Copy Project Path", None, has_file),
        MenuEntry::Separator,
        item(REVEAL_FINDER, "Reveal in Finder", Some("CmdOrCtrl+Shift+R"), has_file),
        MenuEntry::Separator,
        item(EXPORT_PDF, "Export as PDF…", Some("CmdOrCtrl+P"), has_file),
        MenuEntry::Separator,
        item(CLOSE_WINDOW, "Close Window", Some("CmdOrCtrl+W"), true),
    ];
    // macOS puts Quit in the application menu.
    if !cfg!(target_os = "macos") {
        file_entries.push(MenuEntry::Predefined(Predefined::Quit));
    }
    let file = Submenu {
        title: "File".to_string(),
        entries: file_entries,
    };

    let edit = Submenu {
        title: "Edit".to_string(),
        entries: vec![
            MenuEntry::Predefined(Predefined::Undo),
            MenuEntry::Predefined(Predefined::Redo),
            MenuEntry::Separator,
            MenuEntry::Predefined(Predefined::Cut),
            MenuEntry::Predefined(Predefined::Copy),
            MenuEntry::Predefined(Predefined::Paste),
            MenuEntry::Predefined(Predefined::SelectAll),
        ],
    };

    let font = Submenu {
        title: "Font".to_string(),
        entries: vec![
            font_entry(state, FontId::System),
            font_entry(state, FontId::Inter),
            MenuEntry::Separator,
            font_entry(state, FontId::Serif),
            font_entry(state, FontId::Sans),
            font_entry(state, FontId::Mono),
            font_entry(state, FontId::Readable),
        ],
    };

    let mut size_entries = vec![
        item(SIZE_LARGER, "Bigger", Some("CmdOrCtrl+="), true),
        item(SIZE_SMALLER, "Smaller", Some("CmdOrCtrl+-"), true),
        item(SIZE_RESET, "Actual Size", Some("CmdOrCtrl+0"), true),
        MenuEntry::Separator,
    ];
    size_entries.extend(Size::all().map(|size| {
        check(
            size_item_id(size),
            size.to_string(),
            state.checked_size == Some(size),
        )
    }));
    let size = Submenu {
        title: "Size".to_string(),
        entries: size_entries,
    };

    let view = Submenu {
        title: "View".to_string(),
        entries: vec![
            MenuEntry::Submenu(font),
            MenuEntry::Submenu(size),
            MenuEntry::Separator,
            item(TOGGLE_FULLSCREEN, "Toggle Full Screen", Some(FULLSCREEN_ACCELERATOR), true),
        ],
    };

    let tools = Submenu {
        title: "Tools".to_string(),
        entries: vec![
            item(INSTALL_CLI, "Install Command Line Tool…", None, true),
            check(
                ASSOCIATE_MD.to_string(),
                "Associate Markdown Files with mdview".to_string(),
                state.md_associated,
            ),
        ],
    };

    MenuDescription {
        submenus: vec![file, edit, view, tools],
    }
}

/// What a menu item does once clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    OpenFile,
    ExportPdf,
    CloseWindow,
    ToggleFullscreen,
    InstallCli,
    ToggleAssociation,
    Font(FontId),
    Size(Size),
    StepSize(Step),
    ResetSize,
    Forward(MenuAction),
}

impl MenuCommand {
    /// Map a menu item id to its command. Ids this build does not know
    /// yield `None`.
    pub fn from_id(id: &str) -> Option<MenuCommand> {
        let command = match id {
            OPEN_FILE => MenuCommand::OpenFile,
            EXPORT_PDF => MenuCommand::ExportPdf,
            CLOSE_WINDOW => MenuCommand::CloseWindow,
            TOGGLE_FULLSCREEN => MenuCommand::ToggleFullscreen,
            INSTALL_CLI => MenuCommand::InstallCli,
            ASSOCIATE_MD => MenuCommand::ToggleAssociation,
            SIZE_LARGER => MenuCommand::StepSize(Step::Larger),
            SIZE_SMALLER => MenuCommand::StepSize(Step::Smaller),
            SIZE_RESET => MenuCommand::ResetSize,
            COPY_FILE_PATH => MenuCommand::Forward(MenuAction::CopyFilePath),
            COPY_DIR_PATH => MenuCommand::Forward(MenuAction::CopyDirPath),
            COPY_PROJECT_PATH => MenuCommand::Forward(MenuAction::CopyProjectPath),
            REVEAL_FINDER => MenuCommand::Forward(MenuAction::RevealFinder),
            _ => {
                if let Some(name) = id.strip_prefix(FONT_PREFIX) {
                    return name.parse().ok().map(MenuCommand::Font);
                }
                if let Some(px) = id.strip_prefix(SIZE_PREFIX) {
                    return px
                        .parse::<u32>()
                        .ok()
                        .map(Size::new)
                        .filter(Size::is_standard)
                        .map(MenuCommand::Size);
                }
                return None;
            }
        };
        Some(command)
    }
}
