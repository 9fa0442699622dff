//! Delve Web Server
//!
//! A web interface for Delve - recursive AI deep research.

use clap::Parser;
use delve_web::server::DelveServerBuilder;
use delve_web::{init_logging, WebConfig};

/// Delve Web Server - recursive AI deep research over HTTP and WebSocket
#[derive(Parser)]
#[command(name = "delve-web")]
#[command(about = "A web interface for Delve deep research")]
#[command(version)]
struct Args {
    /// Server host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Enable development mode
    #[arg(long)]
    dev: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging first
    std::env::set_var(
        "RUST_LOG",
        format!("delve_web={},tower_http=debug", args.log_level),
    );
    init_logging();

    println!("🔧 Starting Delve Web Server initialization...");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Create web configuration
    let mut config = WebConfig::from_env();

    // Override with command line arguments
    config.host = args.host;
    config.port = args.port;
    config.dev_mode = args.dev;

    // Print startup information
    println!("🚀 Starting Delve Web Server");
    println!("📍 Server: http://{}:{}", config.host, config.port);
    println!("🔧 Development mode: {}", config.dev_mode);

    // Check for required environment variables
    let mut missing_vars = Vec::new();

    if std::env::var("OPENAI_API_KEY").is_err()
        && std::env::var("ANTHROPIC_API_KEY").is_err()
        && std::env::var("GROQ_API_KEY").is_err()
        && std::env::var("OLLAMA_BASE_URL").is_err()
    {
        missing_vars.push("LLM API key (OPENAI_API_KEY, ANTHROPIC_API_KEY, GROQ_API_KEY, or OLLAMA_BASE_URL)");
    }

    if std::env::var("FIRECRAWL_API_KEY").is_err() {
        missing_vars.push("FIRECRAWL_API_KEY");
    }

    if !missing_vars.is_empty() {
        println!("⚠️  Warning: Missing environment variables:");
        for var in missing_vars {
            println!("   - {}", var);
        }
        println!("   Research requests cannot be served without them.");
        println!("   See README.md for setup instructions.");
    }

    // Build and start the server
    println!("🏗️  Building server...");
    let server = match DelveServerBuilder::new()
        .host(config.host.clone())
        .port(config.port)
        .dev_mode(config.dev_mode)
        .build()
        .await
    {
        Ok(server) => {
            println!("✅ Server built successfully");
            server
        }
        Err(e) => {
            eprintln!("❌ Failed to build server: {}", e);
            std::process::exit(1);
        }
    };

    // Start the server (this will block until shutdown)
    println!("🚀 Starting server...");
    if let Err(e) = server.start().await {
        eprintln!("❌ Server failed to start: {}", e);
        std::process::exit(1);
    }

    println!("✅ Server shut down gracefully");
}
