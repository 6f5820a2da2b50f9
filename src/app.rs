//! Interactive session: one card on screen, driven by line commands.
//!
//! Each command runs to completion before the next line is read, so a
//! `next` always finishes its selection and location rewrite first. A
//! command that errors prints a one-line apology and the loop keeps going.

use crate::area::Area;
use crate::card::{
    CardAssets, CardStyle, FontFamilies, RasterSurface, RenderError, raster_surface, render_png,
};
use crate::config::{AppConfig, SiteConfig};
use crate::content::load_pool;
use crate::export::{self, CardExport, ExportOutcome, Platform, TerminalPlatform};
use crate::output;
use crate::permalink::Location;
use crate::report::{EngagementSink, HttpReporter, NoopReporter};
use crate::session::{ClickCounter, NOT_FOUND_TEXT, Resolution, Session};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

pub const SOMETHING_BROKE: &str = "Something broke. Try again.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("renderer unavailable: {0}")]
    Render(#[from] RenderError),
    #[error("no affirmation on screen")]
    NoSelection,
}

/// How long queued engagement reports may take to flush on exit.
const REPORT_GRACE: Duration = Duration::from_secs(2);

/// Options for `run` that come from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Starting address; defaults to the site root.
    pub url: Option<String>,
    pub user_agent: String,
    pub touch: bool,
    pub download_dir: PathBuf,
}

/// Load content and assets, then run an interactive session until quit.
pub async fn run_session(
    config: &AppConfig,
    config_dir: &Path,
    options: RunOptions,
) -> Result<(), AppError> {
    let source = config.content.resolved_source(config_dir);
    let loaded = load_pool(&source).await;
    if let Some(notice) = &loaded.notice {
        output::print_notice(notice);
    }

    let assets_config = config.assets.resolved(config_dir);
    let style = CardStyle::from_config(config);
    let families = FontFamilies {
        serif: config.text.serif_family.clone(),
        sans: config.text.sans_family.clone(),
    };
    let surface = raster_surface(&style, families, &assets_config.fonts)?;

    let url = options
        .url
        .unwrap_or_else(|| format!("{}/", config.site.origin));
    let reporter = config
        .tracking
        .enabled
        .then(|| HttpReporter::spawn(config.tracking.endpoint.as_str()));
    let sink: &dyn EngagementSink = match &reporter {
        Some(reporter) => reporter,
        None => &NoopReporter,
    };

    let mut app = App {
        session: Session::new(
            loaded.pool,
            Location::parse(&url),
            config.site.origin.as_str(),
        ),
        clicks: ClickCounter::load(config_dir.join(&config.session.state_file)),
        style,
        assets: CardAssets::load(&assets_config),
        surface,
        platform: TerminalPlatform::new(options.download_dir)
            .with_device(options.user_agent, options.touch),
        sink,
        site: config.site.clone(),
        rng: StdRng::from_entropy(),
        not_found_delay: Duration::from_millis(config.session.not_found_delay_ms),
    };
    app.start().await;
    let result = app.run().await;
    drop(app);

    if let Some(reporter) = reporter {
        reporter.close(REPORT_GRACE).await;
    }
    result
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    /// `area` alone lists areas; `area <key>` switches.
    Area(Option<String>),
    Areas,
    Copy,
    Download,
    Share,
    Link,
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Command::Next;
    };
    match head.to_ascii_lowercase().as_str() {
        "next" | "n" | "affirm" => Command::Next,
        "area" | "a" => Command::Area(words.next().map(str::to_string)),
        "areas" => Command::Areas,
        "copy" | "c" => Command::Copy,
        "download" | "d" | "save" => Command::Download,
        "share" | "s" => Command::Share,
        "link" | "l" | "url" => Command::Link,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        _ => Command::Unknown(line.trim().to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Everything a running session owns.
pub struct App<'a, P: Platform> {
    session: Session,
    clicks: ClickCounter,
    style: CardStyle,
    assets: CardAssets,
    surface: RasterSurface,
    platform: P,
    sink: &'a dyn EngagementSink,
    site: SiteConfig,
    rng: StdRng,
    not_found_delay: Duration,
}

impl<'a, P: Platform> App<'a, P> {
    /// Resolve the first card. An unresolvable permalink shows the
    /// placeholder for the configured delay, then a random pick.
    pub async fn start(&mut self) -> Resolution {
        let resolution = self.session.start(&mut self.rng);
        if resolution == Resolution::NotFound {
            output::print_placeholder(NOT_FOUND_TEXT);
            tokio::time::sleep(self.not_found_delay).await;
            self.session.recover(&mut self.rng);
        }
        self.show();
        resolution
    }

    /// Read commands from stdin until `quit` or end of input.
    pub async fn run(&mut self) -> Result<(), AppError> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            prompt()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            match self.handle(parse_command(&line)) {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => {
                    tracing::warn!(error = %e, command = %line.trim(), "command failed");
                    output::print_notice(SOMETHING_BROKE);
                }
            }
        }
        Ok(())
    }

    pub fn handle(&mut self, command: Command) -> Result<Flow, AppError> {
        match command {
            Command::Next => {
                self.clicks.increment();
                self.session.next_affirmation(&mut self.rng);
                self.show();
            }
            Command::Area(None) | Command::Areas => {
                output::print_areas(self.session.pool(), Some(self.session.area()));
            }
            Command::Area(Some(key)) => match Area::from_key(&key) {
                Some(area) => {
                    self.session.set_area(area);
                    self.show();
                }
                None => output::print_notice(&format!("Unknown area: {key}")),
            },
            Command::Copy => {
                self.copy()?;
            }
            Command::Download => {
                self.download()?;
            }
            Command::Share => {
                self.share()?;
            }
            Command::Link => {
                let url = self.session.permalink().ok_or(AppError::NoSelection)?;
                println!("{url}");
            }
            Command::Help => output::print_help(),
            Command::Quit => return Ok(Flow::Quit),
            Command::Unknown(input) => {
                output::print_notice(&format!("Unknown command: {input}. Type help."));
            }
        }
        Ok(Flow::Continue)
    }

    pub fn copy(&mut self) -> Result<ExportOutcome, AppError> {
        let current = self.session.current().ok_or(AppError::NoSelection)?;
        let permalink = self.session.permalink().ok_or(AppError::NoSelection)?;
        let card = CardExport {
            area: current.area,
            id: &current.id,
            text: &current.text,
            permalink: &permalink,
        };
        Ok(export::copy(&mut self.platform, self.sink, &card, &self.site))
    }

    pub fn download(&mut self) -> Result<ExportOutcome, AppError> {
        let current = self.session.current().ok_or(AppError::NoSelection)?;
        let permalink = self.session.permalink().ok_or(AppError::NoSelection)?;
        let card = CardExport {
            area: current.area,
            id: &current.id,
            text: &current.text,
            permalink: &permalink,
        };
        let (surface, style, assets) = (&mut self.surface, &self.style, &self.assets);
        let label = current.area.filed_under_label();
        Ok(export::download(&mut self.platform, self.sink, &card, || {
            render_png(surface, style, assets, label, &current.text)
        }))
    }

    pub fn share(&mut self) -> Result<ExportOutcome, AppError> {
        let current = self.session.current().ok_or(AppError::NoSelection)?;
        let permalink = self.session.permalink().ok_or(AppError::NoSelection)?;
        let card = CardExport {
            area: current.area,
            id: &current.id,
            text: &current.text,
            permalink: &permalink,
        };
        let (surface, style, assets) = (&mut self.surface, &self.style, &self.assets);
        let label = current.area.filed_under_label();
        Ok(export::share(
            &mut self.platform,
            self.sink,
            &card,
            &self.site,
            || render_png(surface, style, assets, label, &current.text),
        ))
    }

    fn show(&self) {
        if let Some(current) = self.session.current() {
            output::print_card(
                current,
                self.session.permalink().as_deref(),
                self.clicks.label(),
            );
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn clicks(&self) -> &ClickCounter {
        &self.clicks
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }
}

fn prompt() -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    write!(out, "> ")?;
    out.flush()
}
