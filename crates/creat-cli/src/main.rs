//! CREAT command-line editor.
//!
//! ## Usage
//!
//! ```bash
//! creat list                                # documents, most recent first
//! creat new                                 # empty "Untitled" document
//! creat show <doc>                          # numbered blocks
//! creat insert <doc> --type h1 "Title"      # append a block
//! creat insert <doc> --after 2 -t code      # insert after block 2
//! creat set <doc> 3 - < snippet.html        # replace content from stdin
//! creat key <doc> 2 enter                   # split after block 2
//! creat preview <doc> 3 -o preview.html     # sandboxed preview document
//! creat publish <doc> -o post.html          # standalone post
//! creat image <doc> 4 photo.png             # embed an image
//! creat generate <doc> 3 "a bouncing ball"  # generate content
//! ```
//!
//! `<doc>` is a full id, an exact title, or a unique id prefix. Blocks are
//! addressed by their 1-based position or an id prefix.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt};

use creat_kernel::config::config_file_path;
use creat_kernel::publish::format_date;
use creat_kernel::{
    CommandBackend, ContentGenerator, CreatConfig, EditSession, Key, KeyOutcome, LocalStorage,
    MemoryStorage, PostRenderer, PreviewRenderer, SharedDocumentStore, shared_document_store,
};
use creat_types::{BlockId, BlockMetadata, BlockType, Document, DocumentId};

/// Block document editor with live code previews.
#[derive(Parser, Debug)]
#[command(name = "creat", version)]
#[command(about = "Block document editor with live code previews")]
struct Cli {
    /// Directory holding the document collection (overrides config)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: ~/.config/creat/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep documents in memory only; nothing is read or written
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List documents, most recent first
    List,
    /// Create an empty document
    New,
    /// Show a document's blocks
    Show { doc: String },
    /// Delete a document
    Rm { doc: String },
    /// Insert a block (appends unless --after is given)
    Insert {
        doc: String,
        /// Block to insert after
        #[arg(long)]
        after: Option<String>,
        /// Block type: h1, h2, h3, paragraph, image, code
        #[arg(short = 't', long = "type", default_value = "paragraph", value_parser = parse_block_type)]
        block_type: BlockType,
        /// Initial content ("-" reads stdin)
        content: Option<String>,
    },
    /// Change a block's type, keeping its content
    Retype {
        doc: String,
        block: String,
        #[arg(value_parser = parse_block_type)]
        block_type: BlockType,
    },
    /// Replace a block's content ("-" reads stdin)
    Set {
        doc: String,
        block: String,
        content: String,
        /// Preview height in pixels (code blocks)
        #[arg(long)]
        height: Option<u32>,
        /// Caption (image blocks)
        #[arg(long)]
        caption: Option<String>,
        /// Language hint (code blocks)
        #[arg(long)]
        language: Option<String>,
    },
    /// Remove a block
    RemoveBlock { doc: String, block: String },
    /// Press a key in a block: enter splits, backspace removes an empty block
    Key {
        doc: String,
        block: String,
        key: KeyArg,
        #[arg(long)]
        shift: bool,
    },
    /// Write a code block's sandboxed preview document
    Preview {
        doc: String,
        block: String,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Emit the <iframe> element instead of the bare document
        #[arg(long)]
        iframe: bool,
    },
    /// Render a document as a standalone HTML post
    Publish {
        doc: String,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Load an image file into a block
    Image {
        doc: String,
        block: String,
        path: PathBuf,
    },
    /// Generate a block's content from a prompt
    Generate {
        doc: String,
        block: String,
        prompt: String,
        /// Generation program (overrides generation_command in config)
        #[arg(long)]
        command: Option<String>,
    },
    /// Print the effective configuration
    Config,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KeyArg {
    Enter,
    Backspace,
}

impl From<KeyArg> for Key {
    fn from(k: KeyArg) -> Self {
        match k {
            KeyArg::Enter => Key::Enter,
            KeyArg::Backspace => Key::Backspace,
        }
    }
}

fn parse_block_type(s: &str) -> Result<BlockType, String> {
    BlockType::from_str(s).ok_or_else(|| {
        let names: Vec<&str> = BlockType::ALL.iter().map(|t| t.as_str()).collect();
        format!("unknown block type '{s}' (expected one of: {})", names.join(", "))
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<CreatConfig> {
    let mut config = match &cli.config {
        Some(path) => CreatConfig::load_from(path)?,
        None => CreatConfig::load()?,
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

fn open_store(config: &CreatConfig, ephemeral: bool) -> SharedDocumentStore {
    if ephemeral {
        tracing::info!("using in-memory storage");
        shared_document_store(MemoryStorage::new())
    } else {
        tracing::debug!(dir = %config.data_dir.display(), "using local storage");
        shared_document_store(LocalStorage::new(&config.data_dir))
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    if let Command::Config = cli.command {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let store = open_store(&config, cli.ephemeral);
    match cli.command {
        Command::List => cmd_list(&store),
        Command::New => {
            let id = store.create();
            println!("{}", id.to_hex());
            Ok(())
        }
        Command::Show { doc } => cmd_show(&store, &doc),
        Command::Rm { doc } => {
            let id = resolve_document(&store, &doc)?;
            store.remove(&id);
            Ok(())
        }
        Command::Insert {
            doc,
            after,
            block_type,
            content,
        } => cmd_insert(&store, &doc, after.as_deref(), block_type, content),
        Command::Retype {
            doc,
            block,
            block_type,
        } => {
            let (mut session, block) = open_block(&store, &doc, &block)?;
            session.change_type(&block, block_type);
            Ok(())
        }
        Command::Set {
            doc,
            block,
            content,
            height,
            caption,
            language,
        } => {
            let metadata = BlockMetadata {
                height,
                caption,
                language,
                ..Default::default()
            };
            let (mut session, block) = open_block(&store, &doc, &block)?;
            let content = read_content(content)?;
            let patch = (!metadata.is_empty()).then_some(&metadata);
            session.update_content(&block, content, patch);
            Ok(())
        }
        Command::RemoveBlock { doc, block } => {
            let (mut session, block) = open_block(&store, &doc, &block)?;
            if !session.remove_block(&block) {
                bail!("cannot remove the only block of a document");
            }
            Ok(())
        }
        Command::Key {
            doc,
            block,
            key,
            shift,
        } => cmd_key(&store, &doc, &block, key.into(), shift),
        Command::Preview {
            doc,
            block,
            output,
            iframe,
        } => cmd_preview(&store, &config, &doc, &block, output.as_deref(), iframe),
        Command::Publish { doc, output } => {
            let id = resolve_document(&store, &doc)?;
            let document = store.get(&id).context("document disappeared")?;
            let html = PostRenderer::new(PreviewRenderer::new(config.preview_height))
                .render(&document);
            write_output(output.as_deref(), &html)
        }
        Command::Image { doc, block, path } => {
            let (mut session, block) = open_block(&store, &doc, &block)?;
            session
                .attach_image(&block, &path, config.image_max_bytes)
                .await?;
            Ok(())
        }
        Command::Generate {
            doc,
            block,
            prompt,
            command,
        } => cmd_generate(&store, &config, &doc, &block, &prompt, command).await,
        Command::Config => Ok(()),
    }
}

fn resolve_document(store: &SharedDocumentStore, query: &str) -> Result<DocumentId> {
    Ok(store.resolve(query)?)
}

/// Resolve a 1-based position or a block id prefix.
fn resolve_block(doc: &Document, query: &str) -> Result<BlockId> {
    if let Ok(n) = query.parse::<usize>() {
        return doc
            .blocks
            .get(n.wrapping_sub(1))
            .map(|b| b.id)
            .with_context(|| format!("block {n} out of range (1..={})", doc.blocks.len()));
    }
    let matches: Vec<BlockId> = doc
        .blocks
        .iter()
        .filter(|b| b.id.matches_hex_prefix(query))
        .map(|b| b.id)
        .collect();
    match matches.as_slice() {
        [one] => Ok(*one),
        [] => bail!("no block matches '{query}'"),
        _ => bail!("'{query}' matches {} blocks", matches.len()),
    }
}

fn open_document(store: &SharedDocumentStore, doc: &str) -> Result<EditSession> {
    let id = resolve_document(store, doc)?;
    EditSession::open(store.clone(), id).context("document disappeared")
}

fn open_block(store: &SharedDocumentStore, doc: &str, block: &str) -> Result<(EditSession, BlockId)> {
    let session = open_document(store, doc)?;
    let document = session.document().context("document disappeared")?;
    let block = resolve_block(&document, block)?;
    Ok((session, block))
}

fn read_content(content: String) -> Result<String> {
    if content != "-" {
        return Ok(content);
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read stdin")?;
    Ok(buf)
}

fn write_output(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

/// First line of `content`, cut to `max` characters.
fn one_line(content: &str, max: usize) -> String {
    let line = content.lines().next().unwrap_or("");
    let mut out: String = line.chars().take(max).collect();
    if line.chars().count() > max || content.lines().nth(1).is_some() {
        out.push('…');
    }
    out
}

fn cmd_list(store: &SharedDocumentStore) -> Result<()> {
    let summaries = store.summaries();
    if summaries.is_empty() {
        println!("No documents. Create one with `creat new`.");
        return Ok(());
    }
    for s in summaries {
        println!(
            "{}  {}{}  ({}, {} blocks)",
            s.id.to_hex(),
            s.title,
            if s.has_code { "  [code]" } else { "" },
            format_date(s.updated_at),
            s.block_count,
        );
        println!("    {}", one_line(&s.preview, 72));
    }
    Ok(())
}

fn cmd_show(store: &SharedDocumentStore, doc: &str) -> Result<()> {
    let id = resolve_document(store, doc)?;
    let document = store.get(&id).context("document disappeared")?;
    println!("{}", document.title);
    println!(
        "{}  created {}, updated {}",
        document.id.to_hex(),
        format_date(document.created_at),
        format_date(document.updated_at)
    );
    for (i, block) in document.blocks.iter().enumerate() {
        let content = match block.block_type {
            BlockType::Image if !block.content.is_empty() => {
                format!("[image, {} chars]", block.content.len())
            }
            _ => one_line(&block.content, 60),
        };
        let height = block
            .metadata
            .height
            .map(|h| format!("  (height {h})"))
            .unwrap_or_default();
        println!(
            "{:>3}  {}  {:<9}  {content}{height}",
            i + 1,
            &block.id.to_hex()[24..],
            block.block_type.as_str(),
        );
    }
    Ok(())
}

fn cmd_insert(
    store: &SharedDocumentStore,
    doc: &str,
    after: Option<&str>,
    block_type: BlockType,
    content: Option<String>,
) -> Result<()> {
    let mut session = open_document(store, doc)?;
    let id = match after {
        Some(after) => {
            let document = session.document().context("document disappeared")?;
            let after = resolve_block(&document, after)?;
            session.insert_after(&after, block_type)
        }
        None => session.append_block(block_type),
    }
    .context("failed to insert block")?;

    if let Some(content) = content {
        session.update_content(&id, read_content(content)?, None);
    }
    let position = session
        .document()
        .and_then(|d| d.position(&id))
        .map_or(0, |p| p + 1);
    println!("{position}  {}", id.to_hex());
    Ok(())
}

fn cmd_key(
    store: &SharedDocumentStore,
    doc: &str,
    block: &str,
    key: Key,
    shift: bool,
) -> Result<()> {
    let (mut session, block) = open_block(store, doc, block)?;
    match session.handle_key(&block, key, shift) {
        KeyOutcome::Inserted(id) => println!("inserted {}", id.to_hex()),
        KeyOutcome::Removed { focus } => match focus {
            Some(id) => println!("removed, focus {}", id.to_hex()),
            None => println!("removed"),
        },
        KeyOutcome::Unhandled => println!("no change"),
    }
    Ok(())
}

fn cmd_preview(
    store: &SharedDocumentStore,
    config: &CreatConfig,
    doc: &str,
    block: &str,
    output: Option<&Path>,
    iframe: bool,
) -> Result<()> {
    let id = resolve_document(store, doc)?;
    let document = store.get(&id).context("document disappeared")?;
    let block_id = resolve_block(&document, block)?;
    let block = document
        .block(&block_id)
        .context("block disappeared")?;
    if block.block_type != BlockType::Code {
        tracing::warn!(block = %block_id, block_type = %block.block_type, "previewing a non-code block");
    }

    let surface = PreviewRenderer::new(config.preview_height).render_block(block);
    let html = if iframe {
        format!("{}\n", surface.to_iframe_html())
    } else {
        surface.srcdoc
    };
    write_output(output, &html)
}

async fn cmd_generate(
    store: &SharedDocumentStore,
    config: &CreatConfig,
    doc: &str,
    block: &str,
    prompt: &str,
    command: Option<String>,
) -> Result<()> {
    let Some(line) = command.or_else(|| config.generation_command.clone()) else {
        let path = config_file_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "config.toml".into());
        bail!("no generation backend configured: set generation_command in {path} or pass --command");
    };
    let backend = CommandBackend::from_command_line(&line)
        .context("generation command is empty")?
        .with_timeout(Duration::from_secs(config.generation_timeout_secs));
    let generator =
        ContentGenerator::new(Arc::new(backend)).with_model(config.generation_model.clone());

    let (mut session, block) = open_block(store, doc, block)?;
    if session.generate(&generator, &block, prompt).await? {
        let content = session
            .document()
            .and_then(|d| d.block(&block).map(|b| b.content.clone()))
            .unwrap_or_default();
        println!("{content}");
    } else {
        tracing::warn!(block = %block, "generated content was discarded");
    }
    Ok(())
}
