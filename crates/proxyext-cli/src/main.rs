// proxyext CLI Entry Point

use proxyext_cli::{output, render_error, router::CommandRouter, VerbosityLevel};

#[tokio::main]
async fn main() {
    if let Err(e) = CommandRouter::route().await {
        let style = output::OutputStyle::default();
        output::print_rendered(&render_error(&e, &style));

        if e.shutdown().is_none() && VerbosityLevel::Verbose.should_output() {
            eprintln!("\n{}", e.technical_details());
        }
        std::process::exit(1);
    }
}
