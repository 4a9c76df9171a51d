//! Container health probe: calls `Dashboard/Health` and exits non-zero if
//! the server is unreachable or reports anything but `ok`.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tonic::transport::Endpoint;

use dashwatch::proto::dashboard_client::DashboardClient;
use dashwatch::proto_convert::from_timestamp;

#[derive(Debug, Parser)]
#[command(name = "dashwatch-healthcheck")]
struct Args {
    /// gRPC endpoint of the dashwatch server.
    #[arg(long, default_value = "http://127.0.0.1:50051")]
    addr: String,

    /// Give up after this many seconds.
    #[arg(long, default_value_t = 3)]
    timeout_secs: u64,
}

async fn probe(args: &Args) -> Result<String, Box<dyn std::error::Error>> {
    let timeout = Duration::from_secs(args.timeout_secs);
    let channel = Endpoint::from_shared(args.addr.clone())?
        .connect_timeout(timeout)
        .timeout(timeout)
        .connect()
        .await?;
    let health = DashboardClient::new(channel)
        .health(())
        .await?
        .into_inner();

    if health.status != "ok" {
        return Err(format!("server reported status {:?}", health.status).into());
    }

    let describe = |ts: Option<prost_types::Timestamp>| match ts.as_ref().map(from_timestamp) {
        Some(Ok(at)) => at.to_rfc3339(),
        _ => "never".to_string(),
    };
    Ok(format!(
        "ok issues={} pull_requests={} branch_checks={}",
        describe(health.issues),
        describe(health.pull_requests),
        describe(health.branch_checks)
    ))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    match probe(&args).await {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("healthcheck failed: {err}");
            ExitCode::FAILURE
        }
    }
}
