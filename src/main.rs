use clap::Parser;
use pingora_core::server::configuration::Opt;
use pingora_core::server::Server;
use pingora_core::services::listening::Service;
use std::path::PathBuf;
use imgate::config::{Config, StorageConfig};
use imgate::proxy::ImgateProxy;

/// imgate - image gateway with rate limiting and on-the-fly transforms, built on Pingora
#[derive(Parser, Debug)]
#[command(name = "imgate")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file; defaults plus environment variables when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Daemon mode
    #[arg(short = 'd', long)]
    daemon: bool,

    /// Test configuration and exit
    #[arg(long)]
    test: bool,

    /// Upgrade workers gracefully
    #[arg(long)]
    upgrade: bool,
}

fn main() {
    // Parse command-line arguments
    let args = Args::parse();

    // Load configuration from file, or from the environment alone
    let loaded = match &args.config {
        Some(path) => Config::from_file(path),
        None => Config::from_env(),
    };
    let config = loaded
        .and_then(|config| config.validate().map(|_| config))
        .unwrap_or_else(|e| {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        });

    // Initialize logging subsystem
    imgate::logging::init_subscriber(config.server.log_format)
        .expect("Failed to initialize logging subsystem");

    tracing::info!(
        config_file = ?args.config,
        server_address = %config.server.address,
        server_port = config.server.port,
        storage = match config.storage {
            StorageConfig::Memory => "memory",
            StorageConfig::S3(_) => "s3",
        },
        rate_limit = config.rate_limit.threshold,
        require_auth_get = config.gateway.require_auth_get,
        require_auth_put = config.gateway.require_auth_put,
        "Configuration loaded successfully"
    );

    if args.test {
        println!("Configuration OK");
        return;
    }

    // Build Pingora server options
    let opt = Opt {
        daemon: args.daemon,
        upgrade: args.upgrade,
        ..Default::default()
    };

    // Create Pingora server
    let mut server = Server::new(Some(opt)).expect("Failed to create Pingora server");
    server.bootstrap();

    let proxy = ImgateProxy::new(&config).unwrap_or_else(|e| {
        eprintln!("Failed to initialize gateway: {}", e);
        std::process::exit(1);
    });

    // Create HTTP service
    let mut proxy_service = pingora_proxy::http_proxy_service(&server.configuration, proxy);
    proxy_service.threads = Some(config.server.threads);

    // Add TCP listener for HTTP
    let listen_addr = config.server.listen_address();
    proxy_service.add_tcp(&listen_addr);

    tracing::info!(
        address = %listen_addr,
        threads = config.server.threads,
        "Starting imgate"
    );

    // Register service with server
    server.add_service(proxy_service);

    if let Some(metrics_addr) = &config.server.metrics_address {
        let mut prometheus_service = Service::prometheus_http_service();
        prometheus_service.add_tcp(metrics_addr);
        server.add_service(prometheus_service);

        tracing::info!(address = %metrics_addr, "Prometheus metrics enabled");
    }

    // Run server forever (blocks until shutdown)
    server.run_forever();
}
