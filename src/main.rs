//! # LessonLens CLI (`lens`)
//!
//! ## Usage
//!
//! ```bash
//! lens --config ./config/lens.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lens init` | Create the SQLite database and schema |
//! | `lens serve` | Start the HTTP API |
//! | `lens token <user>` | Print a bearer token for a user |
//! | `lens ingest <file.json> --as <user>` | Store a scraped website |
//! | `lens list --as <user>` | List websites in a scope |
//! | `lens search "<query>" --as <user>` | Keyword search within a scope |
//! | `lens delete <id> --as <user>` | Delete a website |
//! | `lens doc <action>` | Add, list, show, and delete documents |
//! | `lens chat <action>` | Post to and read a conversation |
//! | `lens space <action>` | Create, join, and manage shared spaces |
//! | `lens audit --as <user>` | Show the audit trail for a scope |
//!
//! Commands that take `--scope <space-id>` operate on that shared space;
//! without it they operate on the caller's personal collection.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use lessonlens::identity::TokenSigner;
use lessonlens::{
    audit, chat, config, documents, logging, migrate, search, server, spaces, websites,
};

/// LessonLens: scraped-website library with shared spaces and keyword search.
#[derive(Parser)]
#[command(name = "lens", version, about = "LessonLens: scraped-website library with shared spaces and keyword search")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/lens.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Print a bearer token for `user`, signed with `[auth].token_secret`.
    Token {
        user: String,
    },

    /// Ingest a scraped website from a JSON file.
    ///
    /// The file holds `url`, `title`, `content`, `chunks`, `metadata`, and
    /// optionally `scopeId`.
    Ingest {
        /// Path to the website JSON file.
        file: PathBuf,

        /// Acting user.
        #[arg(long = "as")]
        caller: String,

        /// Target space; overrides `scopeId` in the file.
        #[arg(long)]
        scope: Option<String>,
    },

    /// List websites, newest first.
    List {
        #[arg(long = "as")]
        caller: String,

        /// Space id; omit for the personal collection.
        #[arg(long)]
        scope: Option<String>,
    },

    /// Keyword search over a scope.
    Search {
        query: String,

        #[arg(long = "as")]
        caller: String,

        #[arg(long)]
        scope: Option<String>,
    },

    /// Delete a website by id.
    Delete {
        id: String,

        #[arg(long = "as")]
        caller: String,
    },

    /// Manage documents.
    Doc {
        #[command(subcommand)]
        action: DocAction,
    },

    /// Post to and read chat conversations.
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },

    /// Manage shared spaces.
    Space {
        #[command(subcommand)]
        action: SpaceAction,
    },

    /// Show audit entries for a scope, newest first.
    Audit {
        #[arg(long = "as")]
        caller: String,

        #[arg(long)]
        scope: Option<String>,
    },
}

#[derive(Subcommand)]
enum DocAction {
    /// Store a text file as a document.
    Add {
        title: String,
        /// File holding the document body.
        #[arg(long)]
        file: PathBuf,
        #[arg(long = "as")]
        caller: String,
        #[arg(long)]
        scope: Option<String>,
    },
    /// List documents, newest first.
    List {
        #[arg(long = "as")]
        caller: String,
        #[arg(long)]
        scope: Option<String>,
    },
    /// Print one document.
    Show {
        id: String,
        #[arg(long = "as")]
        caller: String,
    },
    /// Delete a document by id.
    Delete {
        id: String,
        #[arg(long = "as")]
        caller: String,
    },
}

#[derive(Subcommand)]
enum ChatAction {
    /// Append a message to a conversation.
    Post {
        conversation_id: String,
        content: String,
        /// `user` or `assistant`.
        #[arg(long, default_value = "user")]
        role: String,
        #[arg(long = "as")]
        caller: String,
        #[arg(long)]
        scope: Option<String>,
    },
    /// Print a conversation, oldest first.
    History {
        conversation_id: String,
        #[arg(long = "as")]
        caller: String,
        #[arg(long)]
        scope: Option<String>,
    },
}

#[derive(Subcommand)]
enum SpaceAction {
    /// Create a space owned by the acting user.
    Create {
        name: String,
        #[arg(long = "as")]
        caller: String,
    },
    /// List spaces the acting user has joined.
    List {
        #[arg(long = "as")]
        caller: String,
    },
    /// Invite a user into a space.
    Invite {
        space_id: String,
        user: String,
        #[arg(long = "as")]
        caller: String,
    },
    /// Accept an invitation.
    Accept {
        space_id: String,
        #[arg(long = "as")]
        caller: String,
    },
    /// Remove a member, or leave when `user` is the acting user.
    Remove {
        space_id: String,
        user: String,
        #[arg(long = "as")]
        caller: String,
    },
    /// List a space's memberships.
    Members {
        space_id: String,
        #[arg(long = "as")]
        caller: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging.filter);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Token { user } => {
            let signer = TokenSigner::new(&cfg.auth.token_secret)?;
            println!("{}", signer.issue(&user));
        }
        Commands::Ingest {
            file,
            caller,
            scope,
        } => {
            websites::run_ingest(&cfg, &caller, &file, scope).await?;
        }
        Commands::List { caller, scope } => {
            websites::run_list(&cfg, &caller, scope).await?;
        }
        Commands::Search {
            query,
            caller,
            scope,
        } => {
            search::run_search(&cfg, &caller, &query, scope).await?;
        }
        Commands::Delete { id, caller } => {
            websites::run_delete(&cfg, &caller, &id).await?;
        }
        Commands::Doc { action } => match action {
            DocAction::Add {
                title,
                file,
                caller,
                scope,
            } => {
                documents::run_add(&cfg, &caller, &title, &file, scope).await?;
            }
            DocAction::List { caller, scope } => {
                documents::run_list(&cfg, &caller, scope).await?;
            }
            DocAction::Show { id, caller } => {
                documents::run_show(&cfg, &caller, &id).await?;
            }
            DocAction::Delete { id, caller } => {
                documents::run_delete(&cfg, &caller, &id).await?;
            }
        },
        Commands::Chat { action } => match action {
            ChatAction::Post {
                conversation_id,
                content,
                role,
                caller,
                scope,
            } => {
                chat::run_post(&cfg, &caller, &conversation_id, &role, &content, scope).await?;
            }
            ChatAction::History {
                conversation_id,
                caller,
                scope,
            } => {
                chat::run_history(&cfg, &caller, &conversation_id, scope).await?;
            }
        },
        Commands::Space { action } => match action {
            SpaceAction::Create { name, caller } => {
                spaces::run_create(&cfg, &caller, &name).await?;
            }
            SpaceAction::List { caller } => {
                spaces::run_list(&cfg, &caller).await?;
            }
            SpaceAction::Invite {
                space_id,
                user,
                caller,
            } => {
                spaces::run_invite(&cfg, &caller, &space_id, &user).await?;
            }
            SpaceAction::Accept { space_id, caller } => {
                spaces::run_accept(&cfg, &caller, &space_id).await?;
            }
            SpaceAction::Remove {
                space_id,
                user,
                caller,
            } => {
                spaces::run_remove(&cfg, &caller, &space_id, &user).await?;
            }
            SpaceAction::Members { space_id, caller } => {
                spaces::run_members(&cfg, &caller, &space_id).await?;
            }
        },
        Commands::Audit { caller, scope } => {
            audit::run_audit(&cfg, &caller, scope).await?;
        }
    }

    Ok(())
}
