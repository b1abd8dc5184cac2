//! CLI commands

use anyhow::{Context, Result};
use campuskart_core::{
    FileUpload, GigUpdate, NewGig, NewItem, NewNote, NewWantedItem, RegisterRequest,
};
use campuskart_http::{CampusClient, ListQuery};
use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the session tokens
    Login {
        #[arg(long)]
        email: String,

        /// Account password
        #[arg(long, env = "CAMPUSKART_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session tokens
    Logout,

    /// Create a new account
    Register {
        #[arg(long)]
        email: String,

        #[arg(long, env = "CAMPUSKART_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        hostel_block: Option<String>,

        /// Image to upload as the profile picture
        #[arg(long)]
        profile_picture: Option<PathBuf>,
    },

    /// Show the logged-in user's profile
    Profile,

    /// Report whether a session is stored
    Status,

    /// Items for sale
    Items {
        #[command(subcommand)]
        command: ItemCommands,
    },

    /// Paid gigs
    Gigs {
        #[command(subcommand)]
        command: GigCommands,
    },

    /// Wanted-item requests
    Wanted {
        #[command(subcommand)]
        command: WantedCommands,
    },

    /// Study notes
    Notes {
        #[command(subcommand)]
        command: NoteCommands,
    },
}

#[derive(Args)]
pub struct ListArgs {
    /// Only records owned by the logged-in user
    #[arg(long)]
    mine: bool,

    /// Extra query parameters as key=value
    #[arg(long = "param", value_parser = parse_key_value)]
    params: Vec<(String, String)>,
}

impl ListArgs {
    fn query(self) -> ListQuery {
        let mut query = ListQuery::new();
        if self.mine {
            query = query.mine();
        }
        self.params
            .into_iter()
            .fold(query, |query, (key, value)| query.param(key, value))
    }
}

#[derive(Subcommand)]
pub enum ItemCommands {
    /// List items
    List(ListArgs),
    /// Show one item
    Get { id: u64 },
    /// Put an item up for sale
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        price: Decimal,
        #[arg(long)]
        category: String,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Remove an item
    Delete { id: u64 },
}

#[derive(Subcommand)]
pub enum GigCommands {
    /// List gigs
    List(ListArgs),
    /// Show one gig
    Get { id: u64 },
    /// Post a gig
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        budget: Decimal,
        #[arg(long)]
        contact_phone: String,
    },
    /// Mark a gig as no longer active
    Close { id: u64 },
    /// Remove a gig
    Delete { id: u64 },
}

#[derive(Subcommand)]
pub enum WantedCommands {
    /// List wanted-item requests
    List(ListArgs),
    /// Show one request
    Get { id: u64 },
    /// Ask for an item
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        min_price: Option<Decimal>,
        #[arg(long)]
        max_price: Option<Decimal>,
    },
    /// Remove a request
    Delete { id: u64 },
}

#[derive(Subcommand)]
pub enum NoteCommands {
    /// List notes
    List(ListArgs),
    /// Show one note
    Get { id: u64 },
    /// Upload notes
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        price: Option<Decimal>,
        #[arg(long)]
        preview_pages: Option<u32>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Remove a note
    Delete { id: u64 },
}

impl Commands {
    pub async fn execute(self, client: &CampusClient) -> Result<()> {
        match self {
            Commands::Login { email, password } => {
                client.login(&email, password).await?;
                println!("Logged in as {email}");
            }
            Commands::Logout => {
                client.logout().await?;
                println!("Logged out");
            }
            Commands::Register {
                email,
                password,
                first_name,
                last_name,
                hostel_block,
                profile_picture,
            } => {
                let request = RegisterRequest {
                    email,
                    password,
                    first_name,
                    last_name,
                    hostel_block,
                    profile_picture: read_upload(profile_picture.as_deref()).await?,
                };
                let user = client.register(&request).await?;
                info!(user_id = user.id, "Account created");
                print_json(&user)?;
            }
            Commands::Profile => print_json(&client.profile().await?)?,
            Commands::Status => {
                if client.is_authenticated().await {
                    println!("Logged in ({})", client.base_url());
                } else {
                    println!("Not logged in");
                }
            }
            Commands::Items { command } => command.execute(client).await?,
            Commands::Gigs { command } => command.execute(client).await?,
            Commands::Wanted { command } => command.execute(client).await?,
            Commands::Notes { command } => command.execute(client).await?,
        }
        Ok(())
    }
}

impl ItemCommands {
    async fn execute(self, client: &CampusClient) -> Result<()> {
        let items = client.items();
        match self {
            ItemCommands::List(args) => print_json(&items.list(&args.query()).await?),
            ItemCommands::Get { id } => print_json(&items.get(id).await?),
            ItemCommands::Create {
                title,
                description,
                price,
                category,
                image,
            } => {
                let record = NewItem {
                    title,
                    description,
                    price,
                    category,
                    image: read_upload(image.as_deref()).await?,
                };
                print_json(&items.create(record).await?)
            }
            ItemCommands::Delete { id } => {
                items.delete(id).await?;
                println!("Deleted item {id}");
                Ok(())
            }
        }
    }
}

impl GigCommands {
    async fn execute(self, client: &CampusClient) -> Result<()> {
        let gigs = client.gigs();
        match self {
            GigCommands::List(args) => print_json(&gigs.list(&args.query()).await?),
            GigCommands::Get { id } => print_json(&gigs.get(id).await?),
            GigCommands::Create {
                title,
                description,
                budget,
                contact_phone,
            } => {
                let record = NewGig {
                    title,
                    description,
                    budget,
                    contact_phone,
                    is_active: None,
                };
                print_json(&gigs.create(record).await?)
            }
            GigCommands::Close { id } => {
                let update = GigUpdate {
                    is_active: Some(false),
                    ..Default::default()
                };
                print_json(&gigs.update(id, update).await?)
            }
            GigCommands::Delete { id } => {
                gigs.delete(id).await?;
                println!("Deleted gig {id}");
                Ok(())
            }
        }
    }
}

impl WantedCommands {
    async fn execute(self, client: &CampusClient) -> Result<()> {
        let wanted = client.wanted_items();
        match self {
            WantedCommands::List(args) => print_json(&wanted.list(&args.query()).await?),
            WantedCommands::Get { id } => print_json(&wanted.get(id).await?),
            WantedCommands::Create {
                title,
                min_price,
                max_price,
            } => {
                let record = NewWantedItem {
                    title,
                    min_price,
                    max_price,
                };
                print_json(&wanted.create(record).await?)
            }
            WantedCommands::Delete { id } => {
                wanted.delete(id).await?;
                println!("Deleted wanted item {id}");
                Ok(())
            }
        }
    }
}

impl NoteCommands {
    async fn execute(self, client: &CampusClient) -> Result<()> {
        let notes = client.notes();
        match self {
            NoteCommands::List(args) => print_json(&notes.list(&args.query()).await?),
            NoteCommands::Get { id } => print_json(&notes.get(id).await?),
            NoteCommands::Create {
                title,
                description,
                price,
                preview_pages,
                file,
            } => {
                let record = NewNote {
                    title,
                    description,
                    price,
                    preview_pages,
                    file: read_upload(file.as_deref()).await?,
                };
                print_json(&notes.create(record).await?)
            }
            NoteCommands::Delete { id } => {
                notes.delete(id).await?;
                println!("Deleted note {id}");
                Ok(())
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))
}

async fn read_upload(path: Option<&Path>) -> Result<Option<FileUpload>> {
    let Some(path) = path else {
        return Ok(None);
    };

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    debug!(file = %path.display(), size = bytes.len(), "Attaching file");

    let upload = FileUpload::new(file_name, bytes);
    Ok(Some(match content_type_for(path) {
        Some(content_type) => upload.with_content_type(content_type),
        None => upload,
    }))
}

fn content_type_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let content_type = match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => return None,
    };
    Some(content_type)
}
