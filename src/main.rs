use adgate::application::gatekeeper::Gatekeeper;
use adgate::application::orchestrator::Orchestrator;
use adgate::config::{Config, ProviderKind};
use adgate::domain::ports::{JobStoreBox, PaymentProviderRef, TaskExecutorBox};
use adgate::infrastructure::in_memory::InMemoryJobStore;
use adgate::infrastructure::masumi::MasumiPaymentClient;
use adgate::infrastructure::simulated::SimulatedPaymentProvider;
use adgate::interfaces::http;
use adgate::telemetry;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    config.validate().into_diagnostic()?;
    telemetry::init(config.log_format);

    info!(
        provider = ?config.provider,
        network = %config.network,
        payment_service_url = ?config.payment_service_url,
        "starting agent"
    );

    let provider: PaymentProviderRef = match config.provider {
        ProviderKind::Simulated => {
            warn!("using the simulated payment provider: payments settle without funds");
            Arc::new(SimulatedPaymentProvider::new(Some(
                config.simulated_settle_after(),
            )))
        }
        ProviderKind::Masumi => {
            let client = MasumiPaymentClient::new(
                config.payment_service_url.as_deref().unwrap_or_default(),
                config.payment_api_key.as_deref().unwrap_or_default(),
                &config.network,
            )
            .into_diagnostic()?;
            Arc::new(client)
        }
    };
    let store: JobStoreBox = Box::new(InMemoryJobStore::new());
    let executor: TaskExecutorBox = Box::new(Gatekeeper::new(config.preferences()));

    let orchestrator = Orchestrator::spawn(
        store,
        provider,
        executor,
        config.payment_terms(),
        config.poll_interval(),
    );

    let listener = TcpListener::bind(config.bind).await.into_diagnostic()?;
    http::serve(listener, orchestrator, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down");
        }
    })
    .await
    .into_diagnostic()?;

    Ok(())
}
