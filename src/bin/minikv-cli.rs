//! MiniKV command-line client
//!
//! Sends typed lines to a MiniKV server and prints each response line.

use clap::Parser;
use minikv::{DEFAULT_HOST, DEFAULT_PORT};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;

#[derive(Parser, Debug)]
#[command(name = "minikv-cli", version, about = "MiniKV CLI client")]
struct Args {
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,
    #[arg(long, short, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Command to run once instead of starting a session
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let stream = TcpStream::connect(&addr).await?;
    let (read_half, mut write_half) = stream.into_split();
    let mut responses = BufReader::new(read_half).lines();

    if !args.command.is_empty() {
        let response = send_request(&mut write_half, &mut responses, &args.command.join(" ")).await?;
        println!("{}", response);
        return Ok(());
    }

    println!("connected to minikv server on {}", addr);

    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("minikv >> ");
        std::io::stdout().flush()?;

        let Some(line) = input.next_line().await? else {
            break;
        };

        let line = line.trim();
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        let response = send_request(&mut write_half, &mut responses, line).await?;
        println!("Response: {}", response.trim());
    }

    Ok(())
}

/// Writes one request line and waits for its response line.
async fn send_request(
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    responses: &mut Lines<BufReader<OwnedReadHalf>>,
    line: &str,
) -> anyhow::Result<String> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;

    responses
        .next_line()
        .await?
        .ok_or_else(|| anyhow::anyhow!("server closed the connection"))
}
