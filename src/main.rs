use clap::Parser;
use miette::Result;
use pumpquote::cli::{Cli, GlobalOpts};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter, e.g. `PQ_LOG=pumpquote=debug`
const LOG_ENV: &str = "PQ_LOG";

fn main() -> Result<()> {
    // Terminate quietly on a closed pipe (`pq deal list | head`)
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    init_logging(&cli.global);
    pumpquote::cli::dispatch(cli)
}

/// Logs go to stderr so structured output on stdout stays clean
fn init_logging(global: &GlobalOpts) {
    let default_level = if global.verbose {
        "debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
