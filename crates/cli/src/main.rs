//! Tienda CLI - catalog lookups and a file-backed cart.
//!
//! # Usage
//!
//! ```bash
//! # List products (reads CMS_URL / CMS_API_TOKEN, .env supported)
//! tienda-cli products --search casco --page 2
//!
//! # Show the suggestions the search box would offer
//! tienda-cli suggest "casco int"
//!
//! # Work with a cart stored in a JSON file
//! tienda-cli cart add --file cart.json --id casco-pro --price 19.99
//! tienda-cli cart show --file cart.json
//! ```
//!
//! # Commands
//!
//! - `products` - List catalog products
//! - `suggest` - Search suggestions for a query
//! - `cart show|add|remove|clear` - File-backed cart

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tienda-cli")]
#[command(author, version, about = "Tienda CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog products
    Products {
        /// Only products whose name or code contains every word
        #[arg(short, long, default_value = "")]
        search: String,

        /// Page number (12 products per page)
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Show search suggestions for a query
    Suggest {
        query: String,

        /// Maximum number of suggestions
        #[arg(short, long, default_value_t = 8)]
        limit: u32,
    },
    /// Manage a cart stored in a JSON file
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart
    Show {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Add units of a product
    Add {
        #[arg(short, long)]
        file: PathBuf,

        /// Product id
        #[arg(long)]
        id: String,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,

        /// Unit price; omit when unknown
        #[arg(long)]
        price: Option<String>,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product line
    Remove {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(long)]
        id: String,
    },
    /// Empty the cart
    Clear {
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tienda_cli=info,tienda_storefront=warn,tienda_client=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Products { search, page } => commands::catalog::products(&search, page).await?,
        Commands::Suggest { query, limit } => commands::catalog::suggest(&query, limit).await?,
        Commands::Cart { action } => match action {
            CartAction::Show { file } => commands::cart::show(&file)?,
            CartAction::Add {
                file,
                id,
                name,
                price,
                quantity,
            } => commands::cart::add(&file, &id, name.as_deref(), price.as_deref(), quantity)?,
            CartAction::Remove { file, id } => commands::cart::remove(&file, &id)?,
            CartAction::Clear { file } => commands::cart::clear(&file)?,
        },
    }
    Ok(())
}
