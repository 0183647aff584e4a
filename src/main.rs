use std::io::Write;
use std::process::ExitCode;

use rg_azure::service::AzureService;
use rg_azure::types::AzureResult;
use rg_sample::{logging, run_sample, SampleConfig, SamplePlan};
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_logging();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> AzureResult<()> {
    // Fail on missing settings before touching the network.
    let config = SampleConfig::from_env()?;
    info!("loaded configuration {:?}", config);

    let mut service = AzureService::connect(config.credentials(), &config.arm_endpoint).await?;
    let plan = SamplePlan::new(&config.location, &config.tenant_id);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let report = run_sample(&mut service, &plan, &mut out).await?;
    out.flush()?;

    info!(
        "walkthrough finished: group {} ({} groups, {} resources listed)",
        report.group_name, report.groups_listed, report.resources_listed
    );
    Ok(())
}
