use clap::Parser;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[derive(Parser)]
#[command(name = "dispatch-client")]
#[command(about = "Send one request through the greedy dispatcher", long_about = None)]
struct Cli {
    /// Dispatcher address.
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Request text, e.g. "V3", "M5" or "P1".
    request: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut stream = TcpStream::connect(cli.addr).await?;
    stream.write_all(cli.request.as_bytes()).await?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;

    if response.is_empty() {
        eprintln!("Error: dispatcher closed the connection without a response");
        std::process::exit(1);
    }

    println!("{}", String::from_utf8_lossy(&response));
    Ok(())
}
