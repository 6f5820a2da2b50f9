use affirm_card::app::{self, RunOptions};
use affirm_card::area::Area;
use affirm_card::card::{self, CardAssets, CardStyle, FontFamilies};
use affirm_card::config::{self, AppConfig};
use affirm_card::content::{self, Pool};
use affirm_card::ident::derive_id;
use affirm_card::output;
use affirm_card::permalink::{IdIndex, permalink_url};
use affirm_card::selection::pick_from;
use affirm_card::server;
use affirm_card::session::CurrentSelection;
use affirm_card::store::CounterStore;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "affirm-card")]
#[command(about = "Affirmation cards with permalinks, PNG export, and engagement counters")]
#[command(long_about = "\
Affirmation cards with permalinks, PNG export, and engagement counters

Affirmations come from a JSON array of { id?, tags?, text } records. Each one
is filed under its first known tag (general, agency, brand, email, events,
growth, performance, product, seo, social) and gets a stable 8-character id:

  https://marketeraffirmations.com/a/seo/01g5xz8j

Config directory layout:

  .
  ├── config.toml              # optional, see 'affirm-card gen-config'
  ├── affirmations.json        # content source (or an http(s) URL)
  ├── graphics/bg-1920.webp    # card background (optional)
  └── graphics/sticker.png     # card sticker (optional)

Run 'affirm-card serve' for the counter API that copy, download, and share
report to.")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml; relative paths in it resolve here
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Starting address, e.g. a permalink or '/?area=seo'
    #[arg(long)]
    url: Option<String>,

    /// Device to behave like when exporting
    #[arg(long, default_value = "")]
    user_agent: String,

    /// Treat the device as touch-capable
    #[arg(long)]
    touch: bool,

    /// Where downloads are saved
    #[arg(long, default_value = ".")]
    download_dir: PathBuf,
}

#[derive(clap::Args)]
struct CardArgs {
    /// Area to file the card under
    #[arg(long, default_value = "general")]
    area: Area,

    /// Quote text; a random one from the area when omitted
    #[arg(long)]
    text: Option<String>,

    /// Output PNG path
    #[arg(long, short, default_value = "affirmation.png")]
    out: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive session: one card at a time
    Run(RunArgs),
    /// Render a single card to a PNG file
    Card(CardArgs),
    /// Print the id and permalink for an affirmation
    Id {
        /// Area key
        #[arg(long, default_value = "general")]
        area: Area,
        /// Affirmation text
        text: String,
    },
    /// Validate the content source without starting a session
    Check,
    /// Serve the counter API
    Serve {
        /// Override [server].bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print the most shared and downloaded affirmations from the database
    Top {
        #[arg(long, default_value_t = server::DEFAULT_TOP_LIMIT)]
        limit: u32,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run(args) => {
            let config = config::load_config(&cli.config_dir)?;
            let options = RunOptions {
                url: args.url,
                user_agent: args.user_agent,
                touch: args.touch,
                download_dir: args.download_dir,
            };
            app::run_session(&config, &cli.config_dir, options).await?;
        }
        Command::Card(args) => {
            let config = config::load_config(&cli.config_dir)?;
            render_card_file(&config, &cli.config_dir, args).await?;
        }
        Command::Id { area, text } => {
            let config = config::load_config(&cli.config_dir)?;
            let id = derive_id(area.key(), text.trim());
            output::print_id(area, &id, &permalink_url(&config.site.origin, area, &id));
        }
        Command::Check => {
            let config = config::load_config(&cli.config_dir)?;
            let source = config.content.resolved_source(&cli.config_dir);
            output::print_status(&format!("Checking {source}"));
            let records = content::load_records(&source).await?;
            let count = records.len();
            let pool = Pool::from_records(records);
            let index = IdIndex::build(&pool);
            output::print_check_report(&source, count, &pool, &index);
            if pool.is_empty() {
                return Err(content::ContentError::Empty.into());
            }
            output::print_status("Content is valid");
        }
        Command::Serve { bind } => {
            let mut config = config::load_config(&cli.config_dir)?;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            config.server.database = cli.config_dir.join(&config.server.database);
            server::serve(&config.server).await?;
        }
        Command::Top { limit } => {
            let config = config::load_config(&cli.config_dir)?;
            let store = CounterStore::open(&cli.config_dir.join(&config.server.database))?;
            let limit = limit.clamp(1, server::MAX_TOP_LIMIT);
            output::print_top(&store.top(limit)?);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays clean for cards and reports.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Render one card to `args.out`, picking a random quote when none is given.
async fn render_card_file(
    config: &AppConfig,
    config_dir: &Path,
    args: CardArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = match args.text {
        Some(text) => text.trim().to_string(),
        None => {
            let loaded = content::load_pool(&config.content.resolved_source(config_dir)).await;
            if let Some(notice) = &loaded.notice {
                output::print_notice(notice);
            }
            pick_from(loaded.pool.for_area(args.area), None, &mut rand::thread_rng())
                .map(|(text, _)| text.clone())
                .ok_or(content::ContentError::Empty)?
        }
    };
    let selection = CurrentSelection::new(args.area, text);

    let assets_config = config.assets.resolved(config_dir);
    let style = CardStyle::from_config(config);
    let families = FontFamilies {
        serif: config.text.serif_family.clone(),
        sans: config.text.sans_family.clone(),
    };
    let mut surface = card::raster_surface(&style, families, &assets_config.fonts)?;
    let png = card::render_png(
        &mut surface,
        &style,
        &CardAssets::load(&assets_config),
        selection.area.filed_under_label(),
        &selection.text,
    )?;
    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&args.out, png)?;

    let permalink = permalink_url(&config.site.origin, selection.area, &selection.id);
    output::print_id(selection.area, &selection.id, &permalink);
    output::print_status(&format!("Wrote {}", args.out.display()));
    Ok(())
}
