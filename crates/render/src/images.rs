use regex::{Captures, Regex};
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

/// Prefix under which the webview serves local files.
pub const ASSET_PREFIX: &str = "asset://localhost/";

static RAW_IMG_SRC: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?i)(<img\b[^>]*?\bsrc\s*=\s*)(?:"([^"]*)"|'([^']*)')"#)
        .inspect_err(|e| log::error!("image source pattern rejected: {e}"))
        .ok()
});

fn has_scheme(src: &str) -> bool {
    let Some((scheme, _)) = src.split_once(':') else {
        return false;
    };
    // A single letter is a Windows drive, not a scheme.
    scheme.len() > 1
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Drop `.` and fold `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

pub fn asset_url(path: &Path) -> String {
    format!(
        "{ASSET_PREFIX}{}",
        urlencoding::encode(&path.to_string_lossy())
    )
}

/// Map an image reference from the document to something the webview can
/// load. Remote, data and fragment references pass through; local paths
/// become asset URLs, relative ones resolved against `base_dir`.
pub fn resolve_image_src(src: &str, base_dir: Option<&Path>) -> String {
    let trimmed = src.trim();
    if trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with("//")
        || has_scheme(trimmed)
    {
        return src.to_string();
    }

    let decoded = urlencoding::decode(trimmed)
        .map(|text| text.into_owned())
        .unwrap_or_else(|_| trimmed.to_string());
    let path = Path::new(&decoded);

    if path.is_absolute() {
        return asset_url(&normalize(path));
    }
    match base_dir {
        Some(base) => asset_url(&normalize(&base.join(path))),
        // Nothing to resolve against; the webview will try on its own.
        None => src.to_string(),
    }
}

/// Rewrite every `<img src=...>` in a raw HTML fragment.
pub fn rewrite_raw_html(html: &str, base_dir: Option<&Path>) -> String {
    let Some(pattern) = RAW_IMG_SRC.as_ref() else {
        return html.to_string();
    };
    pattern
        .replace_all(html, |caps: &Captures| {
            let (quote, src) = match (caps.get(2), caps.get(3)) {
                (Some(src), _) => ('"', src.as_str()),
                (None, Some(src)) => ('\'', src.as_str()),
                (None, None) => ('"', ""),
            };
            format!(
                "{}{quote}{}{quote}",
                &caps[1],
                resolve_image_src(src, base_dir)
            )
        })
        .into_owned()
}
