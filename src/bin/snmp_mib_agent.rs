//! snmp-mib-agent: serve the MY-MIB example module.

use std::process::ExitCode;

use clap::Parser;
use snmp_mib_agent::Agent;
use snmp_mib_agent::cli::args::AgentArgs;
use snmp_mib_agent::demo;

#[tokio::main]
async fn main() -> ExitCode {
    let args = AgentArgs::parse();
    args.init_tracing();

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &AgentArgs) -> snmp_mib_agent::Result<()> {
    let config = args.to_config()?;
    let builder = Agent::builder().config(&config).await?;
    let agent = demo::install(builder, args.initial_count).build().await?;

    let worker = args
        .worker
        .then(|| demo::spawn_worker(&agent, demo::WORKER_PERIOD));

    let shutdown = agent.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!(target: "snmp_mib_agent::agent", "interrupt received, shutting down");
                shutdown.stop();
            }
            Err(e) => {
                tracing::warn!(target: "snmp_mib_agent::agent", { error = %e }, "cannot listen for interrupts");
            }
        }
    });

    let result = agent.run().await;
    if let Some(worker) = worker {
        worker.stop().await;
    }
    result
}
