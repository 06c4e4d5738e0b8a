use chrono::Utc;
use clap::Parser;
use lostfound_matching::MatchFinder;
use lostfound_matching::MatchingConfig;
use lostfound_matching::NotificationFeed;
use lostfound_matching::Scorer;
use lostfound_matching::factory;
use lostfound_matching::factory::Backend;
use lostfound_matching::score::SeededJitter;
use lostfound_matching::store::ItemQuery;
use lostfound_matching::store::ItemStore;
use lostfound_matching::store::MatchStore;
use lostfound_matching::store::Store;
use lostfound_matching::types::Category;
use lostfound_matching::types::Item;
use lostfound_matching::types::ItemStatus;
use lostfound_matching::types::Location;
use lostfound_matching::types::Match;
use lostfound_matching::types::Polarity;
use std::path::Path;
use std::path::PathBuf;
use uuid::Uuid;

/// Lost-and-found board: post items, see matches, read notification feeds.
#[derive(Debug, Parser)]
#[command(name = "lostfound", version)]
pub struct LostFoundCli {
    /// Directory holding the board's data files.
    #[arg(long, global = true, env = "LOSTFOUND_DATA_DIR", default_value = ".lostfound")]
    pub data_dir: PathBuf,

    /// Storage backend (jsonl or sqlite). Defaults to `LOSTFOUND_BACKEND`, then jsonl.
    #[arg(long, global = true)]
    pub backend: Option<Backend>,

    /// TOML file with matching parameters.
    #[arg(long, global = true, env = "LOSTFOUND_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: BoardCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum BoardCommand {
    /// Post a lost or found item and record any matches it produces.
    Post {
        #[arg(long)]
        polarity: Polarity,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        category: Category,
        #[arg(long)]
        location: Location,
        /// Owner id of the poster.
        #[arg(long, env = "LOSTFOUND_USER")]
        owner: String,
        /// Image reference (URL or data URI).
        #[arg(long)]
        image: Option<String>,
        /// Seed the score jitter for a reproducible run.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Browse items on the board.
    Items {
        #[arg(long)]
        polarity: Option<Polarity>,
        #[arg(long)]
        category: Option<Category>,
        /// Case-insensitive text to look for in title or description.
        #[arg(long)]
        search: Option<String>,
        /// Include resolved items.
        #[arg(long)]
        all: bool,
    },
    /// Show a user's notification feed.
    Feed {
        #[arg(long, env = "LOSTFOUND_USER")]
        user: String,
        /// Print only the badge count.
        #[arg(long)]
        count: bool,
    },
    /// Pending matches referencing one item.
    ItemMatches { item_id: String },
    /// Mark an item as resolved.
    ResolveItem { id: String },
    /// Mark a match as resolved.
    ResolveMatch { id: String },
    /// Show basic statistics about the board.
    Stats,
    /// Migrate a JSONL data directory to a SQLite database.
    Migrate {
        /// Directory holding items.jsonl and matches.jsonl
        #[arg(long)]
        jsonl: PathBuf,
        /// Path to the destination SQLite database file
        #[arg(long)]
        sqlite: PathBuf,
    },
    /// Compact a JSONL file by removing duplicate entries.
    Compact {
        /// Input JSONL file to compact
        #[arg(long)]
        input: PathBuf,
        /// Output JSONL file to write results
        #[arg(long)]
        output: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<MatchingConfig> {
    let cfg = match path {
        Some(p) => MatchingConfig::load(p)?,
        None => MatchingConfig::default(),
    };
    Ok(cfg.with_env_overrides()?)
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Execute a board command.
pub fn run(cli: LostFoundCli) -> anyhow::Result<()> {
    let open = || factory::open_store(&cli.data_dir, cli.backend);
    match cli.cmd {
        BoardCommand::Post {
            polarity,
            title,
            description,
            category,
            location,
            owner,
            image,
            seed,
        } => {
            let item = Item {
                id: Uuid::new_v4().to_string(),
                polarity,
                title,
                description,
                category,
                location,
                image,
                owner,
                created_at: Utc::now(),
                status: ItemStatus::Active,
            };
            item.validate()?;
            let cfg = load_config(cli.config.as_deref())?;
            post(open()?.as_ref(), item, cfg, seed)?;
        }
        BoardCommand::Items {
            polarity,
            category,
            search,
            all,
        } => {
            let query = ItemQuery {
                polarity,
                category,
                text: search,
                include_resolved: all,
            };
            print_json(&open()?.list_items(&query)?)?;
        }
        BoardCommand::Feed { user, count } => {
            let feed = NotificationFeed::load(open()?.as_ref(), &user)?;
            if count {
                println!("{}", feed.badge_count());
            } else {
                print_json(&feed)?;
            }
        }
        BoardCommand::ItemMatches { item_id } => {
            print_json(&open()?.matches_for_item(&item_id)?)?;
        }
        BoardCommand::ResolveItem { id } => {
            open()?.resolve_item(&id)?;
            println!("Resolved item {id}");
        }
        BoardCommand::ResolveMatch { id } => {
            open()?.resolve_match(&id)?;
            println!("Resolved match {id}");
        }
        BoardCommand::Stats => {
            let stats = open()?.stats()?;
            println!("{stats}");
        }
        BoardCommand::Migrate { jsonl, sqlite } => {
            let (items, matches) =
                lostfound_matching::migrate::migrate_jsonl_to_sqlite(&jsonl, &sqlite)?;
            println!("Migrated {items} items and {matches} matches");
        }
        BoardCommand::Compact { input, output } => {
            let (read, written) = lostfound_matching::migrate::compact_jsonl(&input, &output)?;
            println!("Read {read} entries, wrote {written} entries");
        }
    }
    Ok(())
}

fn post(
    store: &dyn Store,
    item: Item,
    cfg: MatchingConfig,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let matches = match seed {
        Some(seed) => {
            let finder = MatchFinder::with_jitter(cfg, SeededJitter::new(seed));
            post_item(store, &finder, &item)?
        }
        None => post_item(store, &MatchFinder::with_config(cfg), &item)?,
    };
    tracing::info!("posted {} item {} ({} matches)", item.polarity, item.id, matches.len());
    print_json(&serde_json::json!({ "item": item, "matches": matches }))
}

/// Add `item` to the board, then match it against the active inventory seen
/// before the add. Matches are only recorded once the item itself is stored.
pub fn post_item<S: Scorer>(
    store: &dyn Store,
    finder: &MatchFinder<S>,
    item: &Item,
) -> anyhow::Result<Vec<Match>> {
    let inventory = store.list_items(&ItemQuery::active())?;
    store.add_item(item.clone())?;
    finder.find_matches(item, &inventory, store)
}
