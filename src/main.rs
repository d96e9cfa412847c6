use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use molliesync::domain::order::{Order, OrderLine, OrderLinePatch};
use molliesync::domain::payment::Payment;
use molliesync::domain::ports::ConfigurationService;
use molliesync::domain::refund::Refund;
use molliesync::domain::shipment::Shipment;
use molliesync::infrastructure::fixture::ReconcileFixture;
use molliesync::infrastructure::in_memory::InMemoryConfiguration;
use molliesync::interfaces::gateway::{to_payload, transformer};
use molliesync::interfaces::support;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the gateway request body for an entity read from a JSON file
    Transform {
        kind: PayloadKind,
        input: PathBuf,
    },
    /// Replay a recorded webhook delivery against in-memory collaborators
    Reconcile { fixture: PathBuf },
    /// Show the debug mode flag, or update it with a JSON body like {"debugStatus": true}
    DebugStatus {
        /// Configuration file with `debugMode` and `channels`
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        set: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PayloadKind {
    Payment,
    Order,
    OrderUpdate,
    Lines,
    LinesUpdate,
    PaymentRefund,
    LinesRefund,
    Shipment,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Transform { kind, input } => {
            init_tracing(false);
            let payload = match kind {
                PayloadKind::Payment => {
                    to_payload(&transformer::transform_payment(&read_json::<Payment>(&input)?))
                }
                PayloadKind::Order => {
                    to_payload(&transformer::transform_order(&read_json::<Order>(&input)?))
                }
                PayloadKind::OrderUpdate => to_payload(&transformer::transform_order_for_update(
                    &read_json::<Order>(&input)?,
                )),
                PayloadKind::Lines => to_payload(&transformer::transform_order_lines(
                    &read_json::<Vec<OrderLine>>(&input)?,
                )),
                PayloadKind::LinesUpdate => {
                    to_payload(&transformer::transform_order_lines_for_update(&read_json::<
                        OrderLinePatch,
                    >(
                        &input
                    )?))
                }
                PayloadKind::PaymentRefund => to_payload(&transformer::transform_payment_refund(
                    &read_json::<Refund>(&input)?,
                )),
                PayloadKind::LinesRefund => to_payload(
                    &transformer::transform_order_lines_refund(&read_json::<Refund>(&input)?),
                ),
                PayloadKind::Shipment => {
                    to_payload(&transformer::transform_shipment(&read_json::<Shipment>(&input)?))
                }
            }
            .into_diagnostic()?;
            print_json(&payload)?;
        }
        Command::Reconcile { fixture } => {
            let raw = std::fs::read_to_string(fixture).into_diagnostic()?;
            let fixture = ReconcileFixture::from_json(&raw).into_diagnostic()?;
            init_tracing(fixture.configuration.debug_mode);

            let mut loaded = fixture.load().await;
            let state = loaded
                .reconciler
                .handle(&mut loaded.event, loaded.request.as_ref())
                .await;

            let order = match loaded.event.transaction.as_ref() {
                Some(transaction) => loaded.entities.order(&transaction.entity()).await,
                None => None,
            };
            print_json(&serde_json::json!({
                "acknowledged": state.is_acknowledged(),
                "outcome": state,
                "eventSuccessful": loaded.event.is_successful(),
                "propagationStopped": loaded.event.is_propagation_stopped(),
                "transaction": loaded.event.transaction,
                "order": order,
                "notifications": loaded.notifications.notifications(),
                "writes": loaded.entities.write_count(),
            }))?;
        }
        Command::DebugStatus { config, set } => {
            let configuration = match config {
                Some(path) => {
                    let raw = std::fs::read_to_string(path).into_diagnostic()?;
                    InMemoryConfiguration::from_json(&raw).into_diagnostic()?
                }
                None => InMemoryConfiguration::new(),
            };
            init_tracing(configuration.is_debug_mode_enabled());

            let response = match set {
                Some(body) => support::update_debug_status(&configuration, &body),
                None => support::get_debug_status(&configuration),
            };
            print_json(&serde_json::json!({
                "status": response.status.as_u16(),
                "body": response.body,
            }))?;
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine readable. `RUST_LOG` wins over the debug flag;
/// `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing(debug_mode: bool) {
    let default_level = if debug_mode { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).into_diagnostic()?;
    serde_json::from_str(&raw).into_diagnostic()
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{}", rendered);
    Ok(())
}
