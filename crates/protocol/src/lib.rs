//! Shared schema between the mdview host process and its render surface.
//!
//! Both sides are built from this crate together; there is no wire-version
//! negotiation, so host and surface must always ship in lockstep.

mod client;
mod error;
mod ipc;
mod message;
mod prefs;

pub use error::{HandlerResult, IpcError};
pub use ipc::{DEFAULT_TIMEOUT, Endpoint, Handler, Inbox, Sender, channel, decode_request};
pub use message::{
    AssociationStatus, CliInstallOutcome, FileContent, MenuAction, Message, PdfData, Request,
    RequestName, Response, Side,
};
pub use prefs::{DEFAULT_SIZE, FontId, SIZES, Size, Step, UnknownFont};

/// File extensions opened as Markdown, lowercase and without the dot.
pub const MARKDOWN_EXTENSIONS: [&str; 6] = ["md", "markdown", "mdown", "mkd", "mkdn", "mdx"];
