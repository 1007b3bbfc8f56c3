use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use glob::Pattern;
use peep_tools::{
    format_catalog_pretty, format_docs_pretty, format_replay_pretty, inspect_catalog,
    inspect_replay, load_catalog, load_registry, message_docs, FilterEntry,
};
use replay::{read_replay, ReplayLimits};
use serde::Serialize;
use session::{ChannelFlags, PacketFilter, PeepConfig, SessionTable};
use tracing::{debug, info};

#[derive(Parser)]
#[command(
    name = "peep-tools",
    version,
    about = "packet-peep replay, catalog and session tools"
)]
struct Cli {
    /// JSON config file; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect replay file headers and keyframes.
    Replay {
        /// Path to a replay file or a directory of replays.
        path: PathBuf,
        /// Optional glob filter when inspecting a directory.
        #[arg(long)]
        glob: Option<String>,
        /// Sort inspected files.
        #[arg(long, value_enum)]
        sort: Option<InspectSort>,
        /// Limit the number of inspected files (after sorting).
        #[arg(long)]
        limit: Option<usize>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },
    /// List builds and the controller namespaces of one build.
    Catalog {
        /// Protocol definition directory; overrides the config.
        #[arg(long)]
        sift: Option<PathBuf>,
        /// Build to expand, e.g. "production 1962.0".
        #[arg(long)]
        build: Option<String>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },
    /// Load a replay as a session and print the messages a filter keeps.
    Filter {
        /// Path to the replay file.
        replay: PathBuf,
        /// Keep only server-sent messages.
        #[arg(long, conflicts_with = "client_only")]
        server_only: bool,
        /// Keep only client-sent messages.
        #[arg(long)]
        client_only: bool,
        /// Channels to keep (repeatable); all when omitted.
        #[arg(long = "channel", value_enum)]
        channels: Vec<ChannelArg>,
        /// Filter entry `<channel>:<server|client>:<view>:<id|*>` (repeatable).
        #[arg(long = "entry")]
        entries: Vec<FilterEntry>,
        /// Parse message bodies with the configured codec definitions.
        #[arg(long)]
        parse: bool,
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InspectSort {
    Size,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ChannelArg {
    Jack,
    Control,
    Matrix,
    Rgss,
    Ugss,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PeepConfig::load(path).context("load config")?,
        None => PeepConfig::default(),
    };

    match cli.command {
        Command::Replay {
            path,
            glob,
            sort,
            limit,
            format,
        } => {
            if path.is_dir() {
                let entries = collect_replay_entries(&path, glob.as_deref())?;
                let mut entries = maybe_sort_entries(entries, sort);
                let limit = limit.or(sort.map(|InspectSort::Size| 10));
                if let Some(limit) = limit {
                    entries.truncate(limit);
                }
                for entry in entries {
                    if matches!(format, OutputFormat::Pretty) {
                        println!("== {} ({} bytes) ==", entry.path.display(), entry.size);
                    }
                    inspect_replay_file(&entry.path, format)?;
                }
            } else {
                inspect_replay_file(&path, format)?;
            }
        }
        Command::Catalog {
            sift,
            build,
            format,
        } => {
            let dir = sift
                .or_else(|| config.sift_dir.clone())
                .context("no protocol definition directory; pass --sift or set sift_dir")?;
            let data = catalog::SiftData::load(&dir)
                .with_context(|| format!("load definitions {}", dir.display()))?;
            let report = inspect_catalog(&data, build.as_deref())?;
            emit(&report, format, || format_catalog_pretty(&report))?;
        }
        Command::Filter {
            replay,
            server_only,
            client_only,
            channels,
            entries,
            parse,
            format,
        } => {
            let names = load_catalog(config.sift_dir.as_deref(), &config.build_version)?;
            let mut table = SessionTable::new(config.clone());
            if parse {
                let path = config
                    .codec_definitions
                    .as_deref()
                    .context("--parse needs codec_definitions in the config")?;
                table = table.with_registry(load_registry(path)?);
            }

            let loaded = table
                .load_replay(&replay, &ReplayLimits::default())
                .with_context(|| format!("load replay {}", replay.display()))?;
            if parse {
                table.parse_all();
            }

            for name in loaded {
                let mut filter = PacketFilter::for_session(&name);
                filter.from_server = !client_only;
                filter.from_client = !server_only;
                if !channels.is_empty() {
                    filter.channels = channel_flags(&channels);
                }
                for entry in &entries {
                    entry.apply(&mut filter);
                }

                let ids = table.apply_filter(&filter)?;
                info!(
                    target: "peep::tools",
                    session = %name,
                    matched = ids.len(),
                    "filtered session"
                );
                let Some(entry) = table.get(&name) else {
                    continue;
                };
                let docs = message_docs(entry, &ids, &names);
                if matches!(format, OutputFormat::Pretty) {
                    println!(
                        "== {name}: {} of {} messages ==",
                        ids.len(),
                        entry.session.len()
                    );
                }
                emit(&docs, format, || format_docs_pretty(&docs))?;
            }
        }
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn emit<T: Serialize + ?Sized>(
    value: &T,
    format: OutputFormat,
    pretty: impl FnOnce() -> String,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value).context("serialize json")?;
            println!("{json}");
        }
        OutputFormat::Pretty => println!("{}", pretty()),
    }
    Ok(())
}

fn inspect_replay_file(path: &Path, format: OutputFormat) -> Result<()> {
    let file = read_replay(path, &ReplayLimits::default())
        .with_context(|| format!("read replay {}", path.display()))?;
    debug!(
        target: "peep::tools",
        path = %path.display(),
        keyframes = file.keyframes.len(),
        frames = file.frame_count(),
        "read replay"
    );
    match format {
        // The full header is exported alongside the summary.
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Export<'a> {
                summary: peep_tools::ReplayReport,
                header: &'a replay::ReplayHeader,
            }
            let export = Export {
                summary: inspect_replay(&file),
                header: &file.header,
            };
            let json = serde_json::to_string_pretty(&export).context("serialize json")?;
            println!("{json}");
        }
        OutputFormat::Pretty => println!("{}", format_replay_pretty(&inspect_replay(&file))),
    }
    Ok(())
}

fn channel_flags(channels: &[ChannelArg]) -> ChannelFlags {
    let mut flags = ChannelFlags::none();
    for channel in channels {
        match channel {
            ChannelArg::Jack => flags.jack = true,
            ChannelArg::Control => flags.control = true,
            ChannelArg::Matrix => flags.matrix = true,
            ChannelArg::Rgss => flags.reliable_gss = true,
            ChannelArg::Ugss => flags.unreliable_gss = true,
        }
    }
    flags
}

struct ReplayEntry {
    path: PathBuf,
    size: u64,
}

fn collect_replay_entries(dir: &Path, glob: Option<&str>) -> Result<Vec<ReplayEntry>> {
    let mut entries = Vec::new();
    let pattern = match glob {
        Some(value) => Some(Pattern::new(value).context("invalid glob pattern")?),
        None => None,
    };

    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(pattern) = &pattern {
            let matches_path = pattern.matches_path(&path);
            let matches_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| pattern.matches(name));
            if !matches_path && !matches_name {
                continue;
            }
        }
        let size = entry.metadata()?.len();
        entries.push(ReplayEntry { path, size });
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

fn maybe_sort_entries(
    mut entries: Vec<ReplayEntry>,
    sort: Option<InspectSort>,
) -> Vec<ReplayEntry> {
    match sort {
        Some(InspectSort::Size) => {
            entries.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
        }
        None => {}
    }
    entries
}
