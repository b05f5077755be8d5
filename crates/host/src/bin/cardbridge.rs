use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use cardbridge_apdu_transport_pcsc::{PcscConfig, PcscDeviceManager};
use cardbridge_host::http;
use cardbridge_host::service::SignerService;
use cardbridge_host::stdio::{self, RunMode};
use cardbridge_openpgp::{OpenPgpSigner, PcscSessionFactory};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about)]
pub struct Args {
    /// Serve the HTTP endpoint instead of the framed stdio pipe
    #[arg(long)]
    pub http: bool,

    /// Answer a single stdio request, then exit
    #[arg(long)]
    pub once: bool,

    /// Print attached readers and their card status, then exit
    #[arg(long)]
    pub list_readers: bool,

    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: Ipv4Addr,

    #[arg(short, long, default_value = "8912")]
    pub port: u16,

    /// User PIN (PW1) used when a request does not carry one;
    /// falls back to the CARDBRIDGE_PIN environment variable
    #[arg(long)]
    pub pin: Option<String>,

    /// Seconds to wait for a card to appear in the reader
    #[arg(long, default_value = "15")]
    pub card_wait: u64,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = Args::parse();

    // stdout carries response frames; logs must go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if args.list_readers {
        let manager = PcscDeviceManager::new()?;
        for reader in manager.list_readers()? {
            match reader.atr() {
                Some(atr) => println!("{} (card present, ATR {})", reader.name(), hex::encode(atr)),
                None => println!("{} (no card)", reader.name()),
            }
        }
        return Ok(());
    }

    let pin = args.pin.or_else(|| std::env::var("CARDBRIDGE_PIN").ok());

    let config = PcscConfig::default().with_wait_timeout(Duration::from_secs(args.card_wait));
    let signer = OpenPgpSigner::new(PcscSessionFactory::new(config));
    let service = SignerService::new(signer, pin);

    if args.http {
        let addr = SocketAddr::from((args.host, args.port));
        http::serve(service, addr).await?;
    } else {
        let mode = if args.once { RunMode::Once } else { RunMode::Loop };
        stdio::serve(&service, mode).await?;
    }

    Ok(())
}
