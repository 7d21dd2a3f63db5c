//! Cartsync CLI - Migrations, development tokens and cart operations.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! cartctl migrate
//!
//! # Issue a development access token
//! cartctl token issue --user u_123
//!
//! # Work with the cart (guest, or remote with CART_ACCESS_TOKEN)
//! cartctl cart add -p p1 -s s1 -q 2
//! cartctl cart update -p p1 -s s1 -q 5
//! cartctl cart remove -p p1 -s s1
//! cartctl cart show
//! cartctl cart clear
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `token issue` - Print a signed access token
//! - `cart` - Run one synchronizer operation and print the cart

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Args, Parser, Subcommand};

use cartsync_core::Role;

use crate::commands::cart::{Operation, Variant};

mod commands;

#[derive(Parser)]
#[command(name = "cartctl")]
#[command(author, version, about = "Cartsync CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage development access tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Read or modify the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Issue a signed access token
    Issue {
        /// User id (subject)
        #[arg(short, long)]
        user: String,

        /// Account role (`user`, `admin`)
        #[arg(short, long, default_value = "user")]
        role: Role,

        /// Lifetime in seconds
        #[arg(long, default_value_t = 3600)]
        ttl_secs: i64,
    },
}

#[derive(Args)]
struct VariantArgs {
    /// Product id
    #[arg(short, long)]
    product: String,

    /// Size id
    #[arg(short, long)]
    size: Option<String>,

    /// Color id
    #[arg(short, long)]
    color: Option<String>,
}

impl From<VariantArgs> for Variant {
    fn from(args: VariantArgs) -> Self {
        Self {
            product: args.product,
            size: args.size,
            color: args.color,
        }
    }
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart
    Show,
    /// Add a quantity of a variant
    Add {
        #[command(flatten)]
        variant: VariantArgs,

        /// Quantity to add (clamped to 20)
        #[arg(short, long, default_value_t = 1)]
        quantity: i64,
    },
    /// Set the quantity of a line
    Update {
        #[command(flatten)]
        variant: VariantArgs,

        /// New quantity (clamped to 20)
        #[arg(short, long)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        #[command(flatten)]
        variant: VariantArgs,
    },
    /// Remove every line
    Clear,
}

impl From<CartAction> for Operation {
    fn from(action: CartAction) -> Self {
        match action {
            CartAction::Show => Self::Show,
            CartAction::Add { variant, quantity } => Self::Add(variant.into(), quantity),
            CartAction::Update { variant, quantity } => Self::Update(variant.into(), quantity),
            CartAction::Remove { variant } => Self::Remove(variant.into()),
            CartAction::Clear => Self::Clear,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cartsync_cli=info,cartsync_client=info".into()),
        )
        .with_writer(std::io::stderr)
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
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Token { action } => match action {
            TokenAction::Issue {
                user,
                role,
                ttl_secs,
            } => {
                let token = commands::token::issue(&user, role, ttl_secs)?;
                #[allow(clippy::print_stdout)]
                {
                    println!("{token}");
                }
            }
        },
        Commands::Cart { action } => {
            let view = commands::cart::run(action.into()).await?;
            #[allow(clippy::print_stdout)]
            {
                println!("{view}");
            }
        }
    }
    Ok(())
}
