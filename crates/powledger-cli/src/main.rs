use anyhow::Result;
use clap::{Parser, Subcommand};
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "powledger-cli")]
#[command(about = "CLI client for a powledger node")]
struct Cli {
    /// Node base URL
    #[arg(long, global = true, default_value = "http://127.0.0.1:5000")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the node's full chain
    Chain,
    /// Submit a transaction
    Submit {
        /// Sender
        #[arg(long)]
        from: String,
        /// Recipient
        #[arg(long)]
        to: String,
        /// Amount
        #[arg(long)]
        amount: u64,
    },
    /// Mine the pending transactions into a new block
    Mine,
    /// Run consensus against the node's peers
    Resolve,
    /// Register peers with the node
    Register {
        /// Peer addresses, e.g. 127.0.0.1:5001
        #[arg(required = true)]
        nodes: Vec<String>,
    },
}

#[derive(Serialize)]
struct Tx {
    sender: String,
    recipient: String,
    amount: u64,
}

#[derive(Serialize)]
struct Nodes {
    nodes: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/');
    let client = Client::new();

    let res = match cli.cmd {
        Command::Chain => client.get(format!("{node}/chain")).send().await?,
        Command::Submit { from, to, amount } => {
            let tx = Tx {
                sender: from,
                recipient: to,
                amount,
            };
            client
                .post(format!("{node}/transactions/new"))
                .json(&tx)
                .send()
                .await?
        }
        Command::Mine => client.get(format!("{node}/mine")).send().await?,
        Command::Resolve => client.get(format!("{node}/nodes/resolve")).send().await?,
        Command::Register { nodes } => {
            client
                .post(format!("{node}/nodes/register"))
                .json(&Nodes { nodes })
                .send()
                .await?
        }
    };
    print_response(res).await
}

async fn print_response(res: Response) -> Result<()> {
    let status = res.status();
    debug!(%status, url = %res.url(), "node responded");
    let body = res.text().await?;
    println!("status: {status}");
    match serde_json::from_str::<Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    if !status.is_success() {
        anyhow::bail!("node returned {status}");
    }
    Ok(())
}
