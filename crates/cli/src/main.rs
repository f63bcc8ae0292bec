//! Yellow Farmhouse Treats CLI - catalog files, carts and shipping quotes.
//!
//! # Usage
//!
//! ```bash
//! # Check a catalog before publishing it
//! yfhs catalog validate data/products-data.json
//!
//! # Strip legacy per-variant fields
//! yfhs catalog cleanup data/products-data.json --dry-run
//!
//! # Work with a cart kept in a directory
//! yfhs cart --store ./cart add "Apple Pie" 25 --size whole
//! yfhs cart --store ./cart totals --shipping 8
//!
//! # Quote shipping
//! yfhs ship --zip 83201 --state ID --weight 2
//!
//! # Pause orders on the live site data
//! yfhs config --store data/site pause
//! ```
//!
//! # Commands
//!
//! - `catalog` - Validate and clean up `products-data.json`
//! - `cart` - List, add, change and total a file-backed cart
//! - `ship` - Shipping quote for a ZIP, state and weight
//! - `config` - Show and change the site configuration

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use farmhouse_core::cart::CartStore;
use farmhouse_core::storage::FileStore;
use rust_decimal::Decimal;

mod commands;

use commands::config::ConfigChange;

#[derive(Parser)]
#[command(name = "yfhs")]
#[command(author, version, about = "Yellow Farmhouse Treats CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate or clean up a catalog file
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Manage a cart stored in a directory
    Cart {
        /// Directory holding the cart files
        #[arg(short, long, default_value = "./cart")]
        store: PathBuf,

        #[command(subcommand)]
        action: CartAction,
    },
    /// Quote shipping for an order
    Ship {
        /// Five-digit ZIP code
        #[arg(short, long)]
        zip: String,

        /// Two-letter state code
        #[arg(short, long)]
        state: String,

        /// Package weight in pounds
        #[arg(short, long, default_value = "1")]
        weight: Decimal,
    },
    /// Show or change the site configuration
    Config {
        /// Site data directory (`SITE_DATA_DIR`)
        #[arg(short, long, default_value = "./data/site")]
        store: PathBuf,

        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Report defaulted data and validation problems
    Validate {
        /// Path to `products-data.json`
        path: PathBuf,
    },
    /// Remove legacy per-variant fields and stamp the version
    Cleanup {
        /// Path to `products-data.json`
        path: PathBuf,

        /// Report without rewriting the file
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// List every line with its position
    List,
    /// Add a line, merging into a matching one
    Add {
        /// Product name
        name: String,

        /// Unit price in dollars
        price: Decimal,

        /// Quantity (whole number, at least 1)
        #[arg(short, long, default_value = "1")]
        quantity: String,

        /// Size label, e.g. "dozen"
        #[arg(long)]
        size: Option<String>,

        #[arg(long)]
        gluten_free: bool,

        #[arg(long)]
        sugar_free: bool,

        /// Catalog product id
        #[arg(long)]
        product_id: Option<String>,
    },
    /// Change a line's quantity by a signed amount
    Qty {
        index: usize,

        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },
    /// Remove a line
    Remove { index: usize },
    /// Remove every line
    Clear,
    /// Print subtotal, total and deposit
    Totals {
        /// Shipping charge in dollars
        #[arg(long, default_value = "0")]
        shipping: Decimal,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Stop taking orders
    Pause,
    /// Start taking orders again
    Resume,
    /// Mark a product sold out
    SoldOut { product_id: String },
    /// Mark a product available
    Available { product_id: String },
    /// Remove the stored configuration
    Reset,
}

fn main() {
    // Logs go to stderr so command output stays clean
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "farmhouse_cli=info,farmhouse_core=warn".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Catalog { action } => match action {
            CatalogAction::Validate { path } => commands::catalog::validate(&path, &mut out)?,
            CatalogAction::Cleanup { path, dry_run } => {
                commands::catalog::cleanup(&path, dry_run, chrono::Utc::now(), &mut out)?;
            }
        },
        Commands::Cart { store, action } => {
            let mut cart = CartStore::new(FileStore::open(store)?);
            match action {
                CartAction::List => commands::cart::list(&mut cart, &mut out)?,
                CartAction::Add {
                    name,
                    price,
                    quantity,
                    size,
                    gluten_free,
                    sugar_free,
                    product_id,
                } => {
                    let item = commands::cart::NewItem {
                        name,
                        price,
                        quantity,
                        size,
                        gluten_free,
                        sugar_free,
                        product_id,
                    };
                    commands::cart::add(&mut cart, item, &mut out)?;
                }
                CartAction::Qty { index, delta } => {
                    commands::cart::quantity(&mut cart, index, delta, &mut out)?;
                }
                CartAction::Remove { index } => commands::cart::remove(&mut cart, index, &mut out)?,
                CartAction::Clear => commands::cart::clear(&mut cart, &mut out)?,
                CartAction::Totals { shipping } => {
                    commands::cart::print_totals(&mut cart, shipping, &mut out)?;
                }
            }
        }
        Commands::Ship { zip, state, weight } => {
            commands::ship::quote(&zip, &state, weight, &mut out)?;
        }
        Commands::Config { store, action } => {
            let mut store = FileStore::open(store)?;
            match action {
                ConfigAction::Show => commands::config::show(&store, &mut out)?,
                ConfigAction::Pause => commands::config::apply(&mut store, ConfigChange::Pause, &mut out)?,
                ConfigAction::Resume => {
                    commands::config::apply(&mut store, ConfigChange::Resume, &mut out)?;
                }
                ConfigAction::SoldOut { product_id } => {
                    commands::config::apply(&mut store, ConfigChange::SoldOut(product_id), &mut out)?;
                }
                ConfigAction::Available { product_id } => {
                    commands::config::apply(
                        &mut store,
                        ConfigChange::Available(product_id),
                        &mut out,
                    )?;
                }
                ConfigAction::Reset => commands::config::reset(&mut store, &mut out)?,
            }
        }
    }

    out.flush()?;
    Ok(())
}
