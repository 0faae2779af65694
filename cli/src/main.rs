mod client;
mod demo;
mod keyfile;

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use cipherscreen_core::api::types::*;
use cipherscreen_core::protocol::TransactionView;
use cipherscreen_engine::seal_u64;
use cipherscreen_identity::{Identity, Keypair};

use client::NodeClient;

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let cmd = &args[1];

    let result = match cmd.as_str() {
        "genkey" => genkey(args.get(2).map(PathBuf::from)),
        "whoami" => whoami(args.get(2).map(PathBuf::from)),
        "admit" => match args.get(2) {
            Some(identity) => admit(identity).await,
            None => {
                println!("Usage: admit <identity>");
                return;
            }
        },
        "set-threshold" => match parse_amount(args.get(2)) {
            Some(amount) => set_threshold(amount).await,
            None => {
                println!("Usage: set-threshold <amount>");
                return;
            }
        },
        "submit" => match parse_amount(args.get(2)) {
            Some(amount) => submit(amount).await,
            None => {
                println!("Usage: submit <amount>");
                return;
            }
        },
        "disclose" => match parse_amount(args.get(2)) {
            Some(id) => disclose(id).await,
            None => {
                println!("Usage: disclose <transaction-id>");
                return;
            }
        },
        "status" => match parse_amount(args.get(2)) {
            Some(id) => status(id).await,
            None => {
                println!("Usage: status <transaction-id>");
                return;
            }
        },
        "demo" => demo::run_demo(),
        "help" | "--help" | "-h" => {
            print_usage();
            return;
        }
        _ => {
            println!("❌ Unknown command: {}", cmd);
            println!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("Cipherscreen CLI - Encrypted Threshold Screening");
    println!();
    println!("USAGE:");
    println!("  cipherscreen <command> [args]");
    println!();
    println!("KEY COMMANDS:");
    println!("  genkey [filename]          Generate a new identity keypair");
    println!("  whoami [filename]          Print the identity of a keypair");
    println!();
    println!("ADMINISTRATOR COMMANDS:");
    println!("  admit <identity>           Admit a bank as participant");
    println!("  set-threshold <amount>     Seal and set the screening threshold");
    println!();
    println!("BANK COMMANDS:");
    println!("  submit <amount>            Seal and submit a transaction amount");
    println!("  disclose <id>              Request disclosure of your transaction");
    println!("  status <id>                Show a transaction's disclosure state");
    println!();
    println!("OTHER COMMANDS:");
    println!("  demo                       Run the protocol in-process");
    println!("  help                       Show this help message");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("  CS_NODE_URL          Node API endpoint (default: http://127.0.0.1:8080)");
    println!("  CS_KEYPAIR           Key file (default: ~/.cipherscreen/id.json)");
    println!("  RUST_LOG             Log level (debug/info/warn/error)");
}

fn parse_amount(arg: Option<&String>) -> Option<u64> {
    arg.and_then(|s| s.parse().ok())
}

fn key_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => keyfile::default_key_path(),
    }
}

fn load_default_key() -> Result<Keypair> {
    keyfile::load(&keyfile::default_key_path()?)
}

fn genkey(path: Option<PathBuf>) -> Result<()> {
    let path = key_path(path)?;

    println!("🔐 Generating new keypair...");
    let key = Keypair::generate();
    keyfile::write_new(&path, &key)?;

    println!("✅ Wrote new keypair to {}", path.display());
    println!("🔑 Identity: {}", key.identity());
    Ok(())
}

fn whoami(path: Option<PathBuf>) -> Result<()> {
    let key = keyfile::load(&key_path(path)?)?;
    println!("{}", key.identity());
    Ok(())
}

async fn admit(identity: &str) -> Result<()> {
    let identity: Identity = identity.parse().context("invalid identity")?;
    let key = load_default_key()?;
    let resp: OperationResponse = NodeClient::from_env()
        .signed(
            "/admin/participants",
            operation::ADMIT,
            &key,
            &IdentityPayload { identity },
        )
        .await?;
    println!("✅ {}", resp.message);
    Ok(())
}

async fn set_threshold(amount: u64) -> Result<()> {
    let key = load_default_key()?;
    let client = NodeClient::from_env();
    let info = client.committee().await?;

    let ciphertext = seal_u64(amount, &info.committee)?;
    let resp: OperationResponse = client
        .signed(
            "/admin/threshold",
            operation::SET_THRESHOLD,
            &key,
            &SetThresholdPayload { ciphertext },
        )
        .await?;
    println!("🔒 {}", resp.message);
    Ok(())
}

async fn submit(amount: u64) -> Result<()> {
    let key = load_default_key()?;
    let client = NodeClient::from_env();
    let info = client.committee().await?;

    let amount_ciphertext = seal_u64(amount, &info.committee)?;
    let resp: SubmitResponse = client
        .signed(
            "/transactions",
            operation::SUBMIT,
            &key,
            &SubmitPayload { amount_ciphertext },
        )
        .await?;
    println!("📨 Submitted transaction #{}", resp.transaction_id);
    Ok(())
}

async fn disclose(transaction_id: u64) -> Result<()> {
    let key = load_default_key()?;
    let resp: DisclosureResponse = NodeClient::from_env()
        .signed(
            &format!("/transactions/{transaction_id}/disclosure"),
            operation::REQUEST_DISCLOSURE,
            &key,
            &DisclosurePayload { transaction_id },
        )
        .await?;
    println!(
        "⏳ Disclosure requested for #{} (request {})",
        resp.transaction_id, resp.request_id
    );
    Ok(())
}

async fn status(transaction_id: u64) -> Result<()> {
    let view: TransactionView = NodeClient::from_env()
        .get(&format!("/transactions/{transaction_id}"))
        .await?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}
