use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use placenoter_editor_core::{Command, Editor};
use placenoter_notes::{JsonFileStore, Note, NoteStore, SyncConfig, telemetry};

#[derive(Parser)]
#[command(version, about = "PlaceNoter - notes from the command line", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the storage file
    #[arg(long, env = "PLACENOTER_STORE", global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List notes, newest first
    List {
        /// List the recycle bin instead
        #[arg(long)]
        bin: bool,

        /// Only pinned notes
        #[arg(long, conflicts_with = "bin")]
        pinned: bool,
    },
    /// Create a note (or reuse the empty one)
    Create {
        #[arg(long, default_value = "")]
        title: String,

        /// Body text; each line becomes a paragraph
        #[arg(long, conflicts_with = "html")]
        text: Option<String>,

        /// Body as editor HTML
        #[arg(long)]
        html: Option<String>,
    },
    /// Print a note's text
    Show { id: String },
    /// Find notes containing a term
    Search { term: String },
    /// Pin or unpin a note
    Pin { id: String },
    /// Move a note to the recycle bin
    Bin { id: String },
    /// Restore a note from the recycle bin
    Restore { id: String },
    /// Write all data as JSON
    Export {
        /// Output file (stdout when omitted)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Replace all data with an export file
    Import { file: PathBuf },
    /// Manage quick links
    #[command(subcommand)]
    Link(LinkCommands),
}

#[derive(Subcommand)]
enum LinkCommands {
    /// List quick links in display order
    List,
    /// Add a quick link
    Add { name: String, url: String },
    /// Remove a quick link
    Remove { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette()?;
    telemetry::init(None);

    let cli = Cli::parse();
    let path = match cli.store {
        Some(path) => path,
        None => default_store_path()?,
    };
    let config = SyncConfig::from_env()?;
    let mut store = NoteStore::load(JsonFileStore::new(&path), config).await?;
    tracing::debug!(path = %path.display(), "store opened");

    match cli.command {
        Commands::List { bin, pinned } => {
            let notes: Vec<&Note> = if bin {
                store.bin_notes().iter().collect()
            } else if pinned {
                store.pinned_notes()
            } else {
                store.notes().iter().collect()
            };
            for note in notes {
                print_note_line(note, store.is_pinned(&note.id));
            }
        }
        Commands::Create { title, text, html } => {
            let id = store.create_note();
            let html = match (html, text) {
                (Some(html), _) => Some(html),
                (None, Some(text)) => Some(html_from_text(&text)),
                (None, None) => None,
            };
            if let Some(html) = html {
                store.update_active_content(&html);
            }
            store.update_active_title(&title);
            println!("{id}");
        }
        Commands::Show { id } => {
            store.set_active_note(&id)?;
            if let Some(note) = store.active_note() {
                println!("# {}", display_title(note));
                println!("{}", note.text_content);
            }
        }
        Commands::Search { term } => {
            for note in store.search_notes(&term) {
                print_note_line(note, store.is_pinned(&note.id));
            }
        }
        Commands::Pin { id } => {
            let pinned = store.toggle_pin(&id);
            println!("{}", if pinned { "pinned" } else { "unpinned" });
        }
        Commands::Bin { id } => store.move_to_bin(&id)?,
        Commands::Restore { id } => store.recycle(&id)?,
        Commands::Export { out } => {
            let json = store.export().to_json().into_diagnostic()?;
            match out {
                Some(out) => tokio::fs::write(&out, json).await.into_diagnostic()?,
                None => println!("{json}"),
            }
        }
        Commands::Import { file } => {
            let text = tokio::fs::read_to_string(&file).await.into_diagnostic()?;
            store.import(&text).await?;
            println!(
                "imported {} notes, {} in bin",
                store.notes().len(),
                store.bin_notes().len()
            );
        }
        Commands::Link(LinkCommands::List) => {
            for link in store.quick_links() {
                println!("{}  {}  {}", link.id, link.name, link.url);
            }
        }
        Commands::Link(LinkCommands::Add { name, url }) => {
            let id = store.add_quick_link(&name, &url)?;
            println!("{id}");
        }
        Commands::Link(LinkCommands::Remove { id }) => store.remove_quick_link(&id)?,
    }

    store.flush_all().await?;
    Ok(())
}

/// Build editor HTML by typing `text` line by line.
fn html_from_text(text: &str) -> String {
    let mut editor = Editor::default();
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            editor.execute(&Command::SplitBlock);
        }
        if !line.is_empty() {
            editor.type_text(line);
        }
    }
    editor.to_html()
}

fn display_title(note: &Note) -> &str {
    if note.title.trim().is_empty() {
        "Untitled"
    } else {
        &note.title
    }
}

fn print_note_line(note: &Note, pinned: bool) {
    let marker = if pinned { "*" } else { " " };
    let preview: String = note.text_content.chars().take(40).collect();
    println!(
        "{marker} {}  {:<24}  {}",
        note.id,
        display_title(note),
        preview.replace('\n', " ")
    );
}

fn default_store_path() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| miette::miette!("could not determine config directory; pass --store"))?;
    Ok(dir.join("placenoter").join("storage.json"))
}

fn init_miette() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    miette::set_panic_hook();
    Ok(())
}
