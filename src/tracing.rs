//! Tracing (logging)

use crate::cli::CommandLineArgs;

use std::process::exit;

use opentelemetry::global;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initlialise tracing (logging)
///
/// Applies a filter based on the `RUST_LOG` environment variable, falling back to enable debug
/// logging for this crate and tower_http if not set.
///
/// Spans are also exported to Jaeger if enabled on the command line.
pub fn init_tracing(args: &CommandLineArgs) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mapmaker=debug,tower_http=debug".into());
    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer());
    if args.enable_jaeger {
        global::set_text_map_propagator(opentelemetry_jaeger::Propagator::new());
        match opentelemetry_jaeger::new_agent_pipeline()
            .with_service_name("mapmaker")
            .install_simple()
        {
            Ok(tracer) => subscriber
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .init(),
            Err(err) => {
                subscriber.init();
                tracing::error!("failed to install Jaeger tracer: {}", err);
                exit(1)
            }
        }
    } else {
        subscriber.init();
    }
}

/// Flush any spans not yet exported.
pub fn shutdown_tracing() {
    global::shutdown_tracer_provider();
}
