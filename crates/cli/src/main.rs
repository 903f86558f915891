use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result, anyhow};
use clap::{Arg, ArgAction, ArgMatches, Command};
use shelfscan_api::{LookupConfig, OpenFoodFactsClient, ProductLookup};
use shelfscan_engine::{SessionConfig, SessionControl, SessionEvent, StaleResultPolicy, drive_scan_session};
use shelfscan_types::{DecodedCode, Ean, Product};
use shelfscan_util::{ProductCard, card::PLACEHOLDER_TEXT};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc::{UnboundedSender, unbounded_channel},
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("lookup", sub)) => run_lookup(&matches, sub).await,
        Some(("session", sub)) => run_session(&matches, sub).await,
        // No subcommand => interactive session
        _ => run_session(&matches, &ArgMatches::default()).await,
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_cli() -> Command {
    Command::new("shelfscan")
        .about("Scan grocery barcodes and show product labels")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("api-base")
                .long("api-base")
                .global(true)
                .action(ArgAction::Set)
                .help("Product database base URL (overrides SHELFSCAN_API_BASE)"),
        )
        .arg(
            Arg::new("api-version")
                .long("api-version")
                .global(true)
                .action(ArgAction::Set)
                .help("API version path segment (overrides SHELFSCAN_API_VERSION)"),
        )
        .arg(
            Arg::new("full-payload")
                .long("full-payload")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Request the full product payload instead of the card fields"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print cards as JSON"),
        )
        .subcommand(
            Command::new("lookup")
                .about("Look up a single EAN and print its card")
                .arg(Arg::new("ean").required(true).action(ArgAction::Set).help("EAN-8 or EAN-13 code"))
                .arg(
                    Arg::new("raw")
                        .long("raw")
                        .action(ArgAction::SetTrue)
                        .help("Print the raw product payload"),
                ),
        )
        .subcommand(
            Command::new("session")
                .about("Read decoded frames from stdin and render the current product")
                .arg(
                    Arg::new("stale-results")
                        .long("stale-results")
                        .action(ArgAction::Set)
                        .value_parser(["apply", "discard"])
                        .help("How out-of-order lookup results are treated (overrides SHELFSCAN_STALE_RESULTS)"),
                ),
        )
}

fn lookup_config(matches: &ArgMatches) -> Result<LookupConfig> {
    let mut config = LookupConfig::from_env().context("invalid lookup configuration in environment")?;
    if let Some(base) = matches.get_one::<String>("api-base") {
        config = config.with_base_url(base);
    }
    if let Some(version) = matches.get_one::<String>("api-version") {
        config.api_version = version.clone();
    }
    if matches.get_flag("full-payload") {
        config = config.with_full_payload();
    }
    Ok(config)
}

fn build_client(matches: &ArgMatches) -> Result<OpenFoodFactsClient> {
    let config = lookup_config(matches)?;
    OpenFoodFactsClient::new(config).context("failed to build lookup client")
}

async fn run_lookup(root: &ArgMatches, sub: &ArgMatches) -> Result<()> {
    let input = sub.get_one::<String>("ean").context("missing EAN argument")?;
    let ean = Ean::parse(input).with_context(|| format!("'{input}' is not a valid EAN"))?;
    let client = build_client(root)?;

    if sub.get_flag("raw") {
        let payload = client.fetch_raw(ean.as_str()).await.map_err(|error| describe_lookup_error(&error))?;
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let product = client
        .lookup(ean.as_str())
        .await
        .map_err(|error| describe_lookup_error(&error))?;
    print_card(Some(&product), root.get_flag("json"))
}

fn describe_lookup_error(error: &shelfscan_api::LookupError) -> anyhow::Error {
    match error.hint() {
        Some(hint) => anyhow!("lookup failed: {error} ({hint})"),
        None => anyhow!("lookup failed: {error}"),
    }
}

async fn run_session(root: &ArgMatches, sub: &ArgMatches) -> Result<()> {
    let client = build_client(root)?;
    let mut config = SessionConfig::from_env().context("invalid session configuration in environment")?;
    if let Some(policy) = sub.try_get_one::<String>("stale-results").ok().flatten() {
        config = config.with_stale_results(policy.parse::<StaleResultPolicy>()?);
    }
    let json = root.get_flag("json");

    let lookup: Arc<dyn ProductLookup> = Arc::new(client);
    let (control_tx, control_rx) = unbounded_channel();
    let (event_tx, mut event_rx) = unbounded_channel();
    let session = tokio::spawn(drive_scan_session(lookup, config, control_rx, event_tx));
    let reader = tokio::spawn(read_frames(control_tx.clone()));

    info!(stale_results = ?config.stale_results, "session started; enter codes, :view, :new, :wait <ms> or :quit");
    print_card(None, json)?;

    loop {
        tokio::select! {
            event = event_rx.recv() => match event {
                Some(event) => render_event(event, json)?,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                let _ = control_tx.send(SessionControl::Shutdown);
            }
        }
    }

    reader.abort();
    session.await.context("session task failed")??;
    Ok(())
}

/// Parsed line of session input.
#[derive(Debug, PartialEq)]
enum Input {
    Control(SessionControl),
    Wait(Duration),
    Skip,
}

/// Reads stdin lines until EOF or `:quit`, forwarding controls to the session.
async fn read_frames(control_tx: UnboundedSender<SessionControl>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match parse_input(&line) {
            Input::Control(control) => {
                let shutdown = control == SessionControl::Shutdown;
                if control_tx.send(control).is_err() || shutdown {
                    return Ok(());
                }
            }
            Input::Wait(duration) => tokio::time::sleep(duration).await,
            Input::Skip => {}
        }
    }
    let _ = control_tx.send(SessionControl::Shutdown);
    Ok(())
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Input::Skip;
    }

    if let Some(command) = line.strip_prefix(':') {
        let mut parts = command.split_whitespace();
        return match (parts.next(), parts.next()) {
            (Some("view"), None) => Input::Control(SessionControl::ViewInAr),
            (Some("new"), None) => Input::Control(SessionControl::ScanNew),
            (Some("quit" | "q"), None) => Input::Control(SessionControl::Shutdown),
            (Some("wait"), Some(millis)) => match millis.parse::<u64>() {
                Ok(millis) => Input::Wait(Duration::from_millis(millis)),
                Err(_) => {
                    warn!(value = millis, "':wait' expects milliseconds");
                    Input::Skip
                }
            },
            _ => {
                warn!(command = line, "unknown command");
                Input::Skip
            }
        };
    }

    let mut tokens = line.split(|c: char| c.is_whitespace() || c == ',').filter(|token| !token.is_empty());
    // Only the first code of a frame is ever considered, so an undecodable
    // first value drops the whole frame rather than promoting the next one.
    let first = match tokens.next().map(Ean::parse) {
        Some(Ok(ean)) => ean.to_decoded(),
        Some(Err(error)) => {
            warn!(%error, "skipping frame with undecodable first value");
            return Input::Skip;
        }
        None => return Input::Skip,
    };

    let mut codes: Vec<DecodedCode> = vec![first];
    codes.extend(tokens.filter_map(|token| match Ean::parse(token) {
        Ok(ean) => Some(ean.to_decoded()),
        Err(error) => {
            warn!(%error, "skipping undecodable value");
            None
        }
    }));
    Input::Control(SessionControl::Frame(codes))
}

fn render_event(event: SessionEvent, json: bool) -> Result<()> {
    match event {
        SessionEvent::LookupDispatched { ticket, ean } => info!(%ticket, %ean, "looking up product"),
        SessionEvent::ProductUpdated { ticket, product } => {
            info!(%ticket, ean = %product.ean(), name = %product.full_name(), "product ready")
        }
        SessionEvent::StaleResultDiscarded { ticket, ean } => info!(%ticket, %ean, "stale result discarded"),
        SessionEvent::ModeChanged { mode } => info!(%mode, "mode"),
        SessionEvent::Render { product } => print_card(product.as_ref(), json)?,
    }
    Ok(())
}

fn print_card(product: Option<&Product>, json: bool) -> Result<()> {
    let card = product.map(ProductCard::from_product);
    if json {
        println!("{}", serde_json::to_string(&card)?);
        return Ok(());
    }

    match card {
        Some(card) => {
            println!("----");
            for line in card.lines() {
                println!("{line}");
            }
        }
        None => println!("{PLACEHOLDER_TEXT}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfscan_types::Symbology;

    #[test]
    fn parses_commands() {
        assert_eq!(parse_input(":view"), Input::Control(SessionControl::ViewInAr));
        assert_eq!(parse_input(" :new "), Input::Control(SessionControl::ScanNew));
        assert_eq!(parse_input(":quit"), Input::Control(SessionControl::Shutdown));
        assert_eq!(parse_input(":wait 950"), Input::Wait(Duration::from_millis(950)));
        assert_eq!(parse_input(":wait soon"), Input::Skip);
        assert_eq!(parse_input(":dance"), Input::Skip);
    }

    #[test]
    fn parses_frames_keeping_order_and_dropping_invalid_trailing_codes() {
        let expected = vec![
            DecodedCode::new("96385074", Symbology::Ean8),
            DecodedCode::new("3017620422003", Symbology::Ean13),
        ];
        assert_eq!(
            parse_input("96385074, 12345 3017620422003"),
            Input::Control(SessionControl::Frame(expected))
        );
        assert_eq!(parse_input("12345 96385074"), Input::Skip);
        assert_eq!(parse_input("abc"), Input::Skip);
        assert_eq!(parse_input("# comment"), Input::Skip);
    }

    #[test]
    fn cli_accepts_global_flags_after_subcommand() {
        let matches = build_cli()
            .try_get_matches_from(["shelfscan", "lookup", "3017620422003", "--json", "--full-payload"])
            .unwrap();
        assert!(matches.get_flag("json"));
        let config = lookup_config(&matches).unwrap();
        assert_eq!(config.fields, None);
    }
}
