use distributed_runtime::config::{NodeConfig, USAGE};
use distributed_runtime::dispatcher::handler::RequestHandler;
use distributed_runtime::dispatcher::handlers::router;
use distributed_runtime::host::context::{DistributedContext, HostContext};
use distributed_runtime::host::device::DeviceManager;
use distributed_runtime::host::work_queue::WorkQueue;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let config = match NodeConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            eprintln!("Usage: {} {}", args[0], USAGE);
            eprintln!("Example: {} --bind 127.0.0.1:6000", args[0]);
            eprintln!(
                "Example: {} --bind 127.0.0.1:6001 --context-id 7 --device CPU:0 --work-queue mstd:4",
                args[0]
            );
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(config.log_level())
        .init();

    let runtime = config.work_queue.build_runtime()?;
    runtime.block_on(run(config))
}

async fn run(config: NodeConfig) -> anyhow::Result<()> {
    tracing::info!(
        "Starting node for context {} ({}) on {}",
        config.context_id,
        config.task_name,
        config.bind_addr
    );
    tracing::info!("Work queue: {:?}", config.work_queue);

    // 1. Host:
    let devices = DeviceManager::with_devices(&config.devices);
    tracing::info!("Devices: {:?}", devices.list_devices());
    let host = HostContext::with_defaults(devices, WorkQueue::current()?);

    // 2. Session and request handler:
    let context = DistributedContext::new(config.context_id, &config.task_name, host);
    let handler = RequestHandler::new(context);

    // 3. HTTP Router:
    let app = router(handler.clone(), config.request_timeout);

    // 4. Spawn stats reporter:
    if let Some(period) = config.stats_interval {
        let stats_handler = handler.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);

            loop {
                interval.tick().await;
                let stats = stats_handler.stats();
                tracing::info!(
                    "Context {} stats: {} programs, {} objects ({} pending, {} available, {} failed)",
                    stats.context_id,
                    stats.programs,
                    stats.objects,
                    stats.pending_objects,
                    stats.available_objects,
                    stats.failed_objects
                );
            }
        });
    }

    // 5. Start HTTP server:
    tracing::info!("HTTP server listening on {}", config.bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
