use crate::app::cli::args::Args;
use crate::app::demo::{run_demo, DemoSummary};
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::init_logging;
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::strings::bool_label;
use crate::core::version;
use crate::queue::api::QueueError;
use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;

/// Parse arguments, configure logging and run the demo; returns the exit code
pub fn startup() -> i32 {
    let matches = Args::command()
        .long_version(version::long_version())
        .get_matches();
    let mut args = match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    // Logging settings may come from the config file, so it is read first
    let queue_config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let use_color = args.use_color();
    colored::control::set_override(use_color);
    if let Err(e) = init_logging(
        args.log_level.as_deref(),
        args.log_format.as_deref(),
        args.effective_log_file(),
        use_color,
    ) {
        eprintln!("Error: failed to initialise logging: {}", e);
        return 1;
    }

    log::info!(
        "threaded-queue {} ({}) starting",
        env!("CARGO_PKG_VERSION"),
        version::git_hash()
    );
    log::debug!("Queue configuration: {:?}", queue_config);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("FATAL: cannot start async runtime: {}", e);
            return 1;
        }
    };

    let settings = args.demo_settings();
    let result = runtime.block_on(ShutdownCoordinator::guard_with_coordinator(
        |coordinator, _shutdown_rx| async move {
            let flag = coordinator.flag();
            tokio::task::spawn_blocking(move || run_demo(settings, queue_config, flag, true))
                .await
                .map_err(|e| QueueError::Synchronisation {
                    message: format!("demo task failed: {e}"),
                })?
        },
    ));

    match result {
        Ok(summary) => {
            print_summary(&summary);
            0
        }
        Err(e) => {
            log_error_with_context(&e, "Running the queue demo");
            1
        }
    }
}

fn print_summary(summary: &DemoSummary) {
    println!();
    println!("{}", "Summary".bold());
    println!("  enqueued:    {}", summary.enqueued);
    println!("  delivered:   {}", summary.delivered);
    println!("  faults:      {}", summary.faults);
    println!(
        "  faulted:     {}",
        bool_label(summary.faulted, "yes", "no")
    );
    println!("  undelivered: {}", summary.undelivered);
    if summary.interrupted {
        println!("  {}", "interrupted by shutdown signal".yellow());
    }
}
