use anyhow::Context;
use booking_flow_suite::{FlowRunner, RestfulBookerClient, SuiteConfig};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "booking_flow_suite=info,booking_flow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SuiteConfig::load().context("failed to load suite configuration")?;
    info!(base_url = %config.base_url, "running booking flow");

    let client = RestfulBookerClient::new(config.client_config())?;
    let runner = FlowRunner::new(&client, config.credentials());
    let report = runner.run_all().await;

    let stats = runner.stats();
    info!(
        requests = stats.requests_sent,
        failed = stats.requests_failed,
        average_ms = stats.average_response_time_ms,
        max_ms = stats.max_response_time_ms,
        "run finished"
    );

    match report.into_result() {
        Ok(steps) => {
            info!(steps = steps.len(), "all steps passed");
            Ok(())
        }
        Err(failures) => {
            for failure in &failures.failures {
                error!(step = %failure.step, error = %failure.error, "step failed");
            }
            Err(failures.into())
        }
    }
}
