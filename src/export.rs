//! Copy, download, and share for the card on screen.
//!
//! The three operations are independent: each reads the current card, talks
//! to the [`Platform`], posts a notice, and reports one engagement event when
//! it completes.
//!
//! Share is an ordered chain of capability-gated strategies:
//!
//! | Order | Strategy | Needs | Payload |
//! |---|---|---|---|
//! | 1 | [`ShareStrategy::NativeWithFile`] | `can_share_files` | title, text, PNG, url |
//! | 2 | [`ShareStrategy::NativeLink`] | `can_share` | title, quoted text, url |
//! | 3 | [`ShareStrategy::Viewer`] | `can_open_viewer` | PNG as a data URL |
//!
//! A strategy that fails hands over to the next one. Cancelling a share sheet
//! ends the chain silently and records nothing.

use crate::area::Area;
use crate::card::RenderError;
use crate::config::SiteConfig;
use crate::report::{EngagementEvent, EngagementSink};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name used for downloads and shared files.
pub const FILE_NAME: &str = "affirmation.png";

pub const COPIED: &str = "Copied";
pub const COPY_FAILED: &str = "Copy failed";
pub const SHARE_FAILED: &str = "Share failed";
pub const DOWNLOAD_FAILED: &str = "Download failed";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),
    #[error("cannot open viewer: {0}")]
    Viewer(String),
}

/// Why a native share did not complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShareError {
    #[error("share cancelled")]
    Cancelled,
    #[error("share unsupported")]
    Unsupported,
    #[error("share failed: {0}")]
    Failed(String),
}

/// An encoded card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngImage {
    bytes: Vec<u8>,
}

impl PngImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.bytes))
    }
}

/// Payload handed to a native share sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareData<'a> {
    pub title: &'a str,
    pub text: String,
    pub url: &'a str,
    pub file: Option<(&'a str, &'a PngImage)>,
}

/// What the host environment can do with a card.
pub trait Platform {
    fn write_clipboard(&mut self, text: &str) -> Result<(), ExportError>;

    /// Save `bytes` as a user-visible file; returns where it landed.
    fn save_file(&mut self, name: &str, bytes: &[u8]) -> Result<PathBuf, ExportError>;

    /// Show the image somewhere the user can long-press or save it.
    fn open_viewer(&mut self, image: &PngImage) -> Result<(), ExportError>;

    fn can_open_viewer(&self) -> bool {
        true
    }

    fn can_share(&self) -> bool {
        false
    }

    fn can_share_files(&self) -> bool {
        false
    }

    fn share(&mut self, _data: &ShareData<'_>) -> Result<(), ShareError> {
        Err(ShareError::Unsupported)
    }

    /// Touch device without dependable programmatic downloads.
    fn is_touch_mobile(&self) -> bool {
        false
    }

    /// Transient user-visible notice.
    fn notify(&mut self, message: &str);
}

/// iPhone, iPad, iPod, or an iPad reporting itself as a Mac.
pub fn is_ios_like(user_agent: &str, touch: bool) -> bool {
    ["iPad", "iPhone", "iPod"]
        .iter()
        .any(|device| user_agent.contains(device))
        || (user_agent.contains("Macintosh") && touch)
}

/// The card being exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardExport<'a> {
    pub area: Area,
    pub id: &'a str,
    pub text: &'a str,
    pub permalink: &'a str,
}

/// `"{text}" -{attribution} ({permalink})`
pub fn caption(text: &str, attribution: &str, permalink: &str) -> String {
    format!("\"{text}\" -{attribution} ({permalink})")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Copied,
    Saved(PathBuf),
    Viewed,
    Shared(ShareStrategy),
    Cancelled,
    Failed,
}

pub fn copy(
    platform: &mut dyn Platform,
    sink: &dyn EngagementSink,
    card: &CardExport<'_>,
    site: &SiteConfig,
) -> ExportOutcome {
    let text = caption(card.text, &site.attribution, card.permalink);
    match platform.write_clipboard(&text) {
        Ok(()) => {
            sink.report(EngagementEvent::Copy, card.id, card.area);
            platform.notify(COPIED);
            ExportOutcome::Copied
        }
        Err(e) => {
            tracing::warn!(error = %e, "copy failed");
            platform.notify(COPY_FAILED);
            ExportOutcome::Failed
        }
    }
}

/// Render, encode, and hand the PNG over: as a saved file, or through the
/// viewer on touch-mobile platforms.
pub fn download(
    platform: &mut dyn Platform,
    sink: &dyn EngagementSink,
    card: &CardExport<'_>,
    render: impl FnOnce() -> Result<Vec<u8>, RenderError>,
) -> ExportOutcome {
    let png = match render() {
        Ok(bytes) => PngImage::new(bytes),
        Err(e) => {
            tracing::warn!(error = %e, "render for download failed");
            platform.notify(DOWNLOAD_FAILED);
            return ExportOutcome::Failed;
        }
    };

    let delivered = if platform.is_touch_mobile() {
        platform.open_viewer(&png).map(|()| ExportOutcome::Viewed)
    } else {
        platform
            .save_file(FILE_NAME, png.bytes())
            .map(ExportOutcome::Saved)
    };
    match delivered {
        Ok(outcome) => {
            sink.report(EngagementEvent::Download, card.id, card.area);
            if let ExportOutcome::Saved(path) = &outcome {
                platform.notify(&format!("Saved {}", path.display()));
            }
            outcome
        }
        Err(e) => {
            tracing::warn!(error = %e, "download failed");
            platform.notify(DOWNLOAD_FAILED);
            ExportOutcome::Failed
        }
    }
}

/// One way of getting the card off the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareStrategy {
    NativeWithFile,
    NativeLink,
    Viewer,
}

impl ShareStrategy {
    /// Strategies in the order they are tried.
    pub const ORDER: [ShareStrategy; 3] = [
        ShareStrategy::NativeWithFile,
        ShareStrategy::NativeLink,
        ShareStrategy::Viewer,
    ];

    pub fn available(self, platform: &dyn Platform) -> bool {
        match self {
            ShareStrategy::NativeWithFile => platform.can_share_files(),
            ShareStrategy::NativeLink => platform.can_share(),
            ShareStrategy::Viewer => platform.can_open_viewer(),
        }
    }

    fn attempt(
        self,
        platform: &mut dyn Platform,
        card: &CardExport<'_>,
        site: &SiteConfig,
        png: &PngImage,
    ) -> Result<(), ShareError> {
        match self {
            ShareStrategy::NativeWithFile => platform.share(&ShareData {
                title: &site.title,
                text: card.text.to_string(),
                url: card.permalink,
                file: Some((FILE_NAME, png)),
            }),
            ShareStrategy::NativeLink => platform.share(&ShareData {
                title: &site.title,
                text: format!("\"{}\"", card.text),
                url: card.permalink,
                file: None,
            }),
            ShareStrategy::Viewer => platform
                .open_viewer(png)
                .map_err(|e| ShareError::Failed(e.to_string())),
        }
    }
}

pub fn share(
    platform: &mut dyn Platform,
    sink: &dyn EngagementSink,
    card: &CardExport<'_>,
    site: &SiteConfig,
    render: impl FnOnce() -> Result<Vec<u8>, RenderError>,
) -> ExportOutcome {
    let png = match render() {
        Ok(bytes) => PngImage::new(bytes),
        Err(e) => {
            tracing::warn!(error = %e, "render for share failed");
            platform.notify(SHARE_FAILED);
            return ExportOutcome::Failed;
        }
    };

    for strategy in ShareStrategy::ORDER {
        if !strategy.available(platform) {
            continue;
        }
        match strategy.attempt(platform, card, site, &png) {
            Ok(()) => {
                sink.report(EngagementEvent::Share, card.id, card.area);
                return ExportOutcome::Shared(strategy);
            }
            Err(ShareError::Cancelled) => {
                tracing::debug!(?strategy, "share cancelled");
                return ExportOutcome::Cancelled;
            }
            Err(e) => tracing::debug!(?strategy, error = %e, "share strategy failed"),
        }
    }
    platform.notify(SHARE_FAILED);
    ExportOutcome::Failed
}

// =============================================================================
// Terminal platform
// =============================================================================

/// Page opened by the viewer. The card is inlined as a data URL so the page
/// stands alone and the image can be saved straight from the browser.
pub const VIEWER_FILE_NAME: &str = "affirmation-view.html";

/// Platform for an interactive terminal.
///
/// The clipboard is the system clipboard through `arboard`, downloads land in
/// a directory, and the viewer is a standalone HTML page opened with the
/// desktop's default handler. There is no share sheet, so share always falls
/// through to the viewer.
pub struct TerminalPlatform {
    download_dir: PathBuf,
    user_agent: String,
    touch: bool,
    /// Kept open for the session; on X11 the copied text lives only as long
    /// as its owner.
    clipboard: Option<arboard::Clipboard>,
}

impl TerminalPlatform {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            user_agent: String::new(),
            touch: false,
            clipboard: None,
        }
    }

    /// Behave like the device described by `user_agent`.
    pub fn with_device(mut self, user_agent: impl Into<String>, touch: bool) -> Self {
        self.user_agent = user_agent.into();
        self.touch = touch;
        self
    }

    fn write_file(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(&self.download_dir)?;
        let path = self.download_dir.join(name);
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    fn clipboard(&mut self) -> Result<&mut arboard::Clipboard, ExportError> {
        if self.clipboard.is_none() {
            self.clipboard = Some(arboard::Clipboard::new().map_err(clipboard_error)?);
        }
        self.clipboard
            .as_mut()
            .ok_or_else(|| ExportError::Clipboard("not initialized".into()))
    }
}

fn clipboard_error(e: arboard::Error) -> ExportError {
    ExportError::Clipboard(e.to_string())
}

/// Standalone page showing `image`.
pub fn viewer_page(image: &PngImage, title: &str) -> String {
    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body style=\"margin:0;background:#111;display:flex;justify-content:center\">\n\
         <img src=\"{}\" alt=\"{title}\" style=\"max-width:100%;height:auto\">\n\
         </body></html>\n",
        image.data_url()
    )
}

impl Platform for TerminalPlatform {
    fn write_clipboard(&mut self, text: &str) -> Result<(), ExportError> {
        self.clipboard()?
            .set_text(text.to_string())
            .map_err(clipboard_error)
    }

    fn save_file(&mut self, name: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
        self.write_file(name, bytes)
    }

    fn open_viewer(&mut self, image: &PngImage) -> Result<(), ExportError> {
        let page = viewer_page(image, "Marketer Affirmations");
        let path = self.write_file(VIEWER_FILE_NAME, page.as_bytes())?;
        open_path(&path)
    }

    fn is_touch_mobile(&self) -> bool {
        is_ios_like(&self.user_agent, self.touch)
    }

    fn notify(&mut self, message: &str) {
        crate::output::print_notice(message);
    }
}

fn open_path(path: &Path) -> Result<(), ExportError> {
    open::that_detached(path).map_err(|e| ExportError::Viewer(e.to_string()))
}
