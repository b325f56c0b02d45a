use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use log::LevelFilter;

use foodnova::error::ORDER_FAILED_MESSAGE;
use foodnova::prelude::*;
use foodnova::storage::FileStorage;

#[derive(Parser, Debug)]
#[clap(name = "foodnova", version)]
#[clap(about = "Browse the FoodNova catalog, manage a cart and place orders", long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    /// Backend URL. Falls back to FOODNOVA_BACKEND_URL.
    #[clap(long)]
    url: Option<String>,

    /// File holding credentials and the cart between runs
    #[clap(long, default_value = ".foodnova.json")]
    state: PathBuf,

    /// Output debug logs to stderr
    #[clap(long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and keep the credentials in the state file
    Login {
        email: String,
        #[clap(long, env = "FOODNOVA_PASSWORD")]
        password: String,
    },
    /// Forget stored credentials
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List products
    Products {
        #[clap(long)]
        category: Option<i64>,
    },
    /// List packs and their variants
    Packs,
    /// Inspect or change the cart
    #[clap(subcommand)]
    Cart(CartCommand),
    /// Place an order for everything in the cart
    Checkout {
        #[clap(long)]
        address: String,
        #[clap(long)]
        phone: String,
        #[clap(long, default_value = "etransfer")]
        payment_method: String,
    },
}

#[derive(Subcommand, Debug)]
enum CartCommand {
    /// Show cart lines and totals
    List,
    /// Add a product by id
    AddProduct {
        product_id: i64,
        #[clap(long, default_value = "1")]
        qty: u32,
    },
    /// Add a pack variant
    AddVariant {
        pack_id: i64,
        variant_id: i64,
        #[clap(long, default_value = "1")]
        qty: u32,
    },
    /// Set the quantity of a line (numbered from 1). Zero removes it.
    Qty { line: usize, qty: i64 },
    /// Remove a line (numbered from 1)
    Remove { line: usize },
    /// Empty the cart
    Clear,
}

async fn run() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.debug);

    let config = match cli.url.as_deref() {
        Some(url) => ClientConfig::new(url)?,
        None => ClientConfig::from_env()?,
    };
    let client = Foodnova::with_backend(config, Arc::new(FileStorage::new(&cli.state)))?;

    match cli.command {
        Commands::Login { email, password } => {
            let user = client
                .session()
                .sign_in(&email, &password)
                .await
                .map_err(|err| anyhow!(err.display_message().unwrap_or("Login failed").to_string()))?;
            println!("Signed in as {} <{}>", user.full_name, user.email);
        }
        Commands::Logout => {
            client.session().logout();
            println!("Signed out.");
        }
        Commands::Whoami => match client.start().await {
            SessionState::Authenticated(user) => {
                println!("{} <{}> ({})", user.full_name, user.email, user.role);
            }
            _ => println!("Not signed in."),
        },
        Commands::Products { category } => {
            for product in client.store().get_products(category).await? {
                let stock = if product.in_stock() { "" } else { " (out of stock)" };
                println!(
                    "{:>4}  {:<32} {:>12}{}",
                    product.id,
                    product.name,
                    format_price(product.price),
                    stock
                );
            }
        }
        Commands::Packs => {
            for summary in client.store().get_packs().await? {
                let pack = client.store().get_pack(summary.id).await?;
                println!("{:>4}  {}", pack.id, pack.name);
                for variant in &pack.variants {
                    println!(
                        "      {:>4}  {:<26} {:>12}",
                        variant.id,
                        variant.name,
                        format_price(variant.price)
                    );
                }
            }
        }
        Commands::Cart(command) => run_cart(&client, command).await?,
        Commands::Checkout {
            address,
            phone,
            payment_method,
        } => {
            let details = CheckoutDetails::new(&address, &phone).with_payment_method(&payment_method);
            match client.checkout(details).await {
                Ok(order) => println!(
                    "Order #{} placed, total {}.",
                    order.id,
                    format_price(order.total_amount)
                ),
                Err(Error::EmptyCart) => println!("Your cart is empty."),
                Err(err) => return Err(anyhow!(err.message_or(ORDER_FAILED_MESSAGE).to_string())),
            }
        }
    }

    Ok(())
}

async fn run_cart(client: &Foodnova, command: CartCommand) -> anyhow::Result<()> {
    let cart = client.cart();
    match command {
        CartCommand::List => {}
        CartCommand::AddProduct { product_id, qty } => {
            let product = client
                .store()
                .get_products(None)
                .await?
                .into_iter()
                .find(|product| product.id == product_id)
                .ok_or_else(|| anyhow!("No product with id {}", product_id))?;
            cart.add_item(product.to_cart_item(qty));
        }
        CartCommand::AddVariant {
            pack_id,
            variant_id,
            qty,
        } => {
            let pack = client
                .store()
                .get_pack(pack_id)
                .await
                .with_context(|| format!("Failed to load pack {}", pack_id))?;
            let variant = pack
                .variants
                .iter()
                .find(|variant| variant.id == variant_id)
                .ok_or_else(|| anyhow!("Pack {} has no variant {}", pack_id, variant_id))?;
            cart.add_item(variant.to_cart_item(&pack.name, qty));
        }
        CartCommand::Qty { line, qty } => cart.update_qty(line_index(line)?, qty),
        CartCommand::Remove { line } => cart.remove_item(line_index(line)?),
        CartCommand::Clear => cart.clear_cart(),
    }

    let items = cart.items();
    if items.is_empty() {
        println!("Your cart is empty.");
        return Ok(());
    }
    for (i, item) in items.iter().enumerate() {
        println!(
            "{:>3}. {:<32} {:>3} x {:>10} = {:>12}",
            i + 1,
            item.name,
            item.qty,
            format_price(item.price),
            format_price(item.line_total())
        );
    }
    println!(
        "{} items, total {}",
        cart.total_items(),
        format_price(cart.total_amount())
    );
    Ok(())
}

fn line_index(line: usize) -> anyhow::Result<usize> {
    line.checked_sub(1)
        .ok_or_else(|| anyhow!("Cart lines are numbered from 1"))
}

fn init_logging(debug: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    if debug {
        builder.filter_level(LevelFilter::Debug);
    } else if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    } else {
        builder.filter_level(LevelFilter::Warn);
    }
    builder.init();
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
