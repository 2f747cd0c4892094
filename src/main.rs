use anyhow::Result;
use term_autolog::app::App;
use term_autolog::cli;

fn main() -> Result<()> {
    // Process CLI arguments first; one-shot subcommands exit here
    let runtime_options = match cli::process_cli() {
        cli::CliResult::Exit(code) => {
            if code == 0 {
                return Ok(());
            }
            std::process::exit(code);
        }
        cli::CliResult::Continue(options) => options,
    };

    // Routes all log::info!() etc. to <temp>/term_autolog_debug.log.
    // CLI --log-level takes precedence, then RUST_LOG, then the config file.
    term_autolog::debug::init_log_bridge(runtime_options.log_level);

    log::info!("Starting term-autolog {}", term_autolog::VERSION);

    let config = runtime_options.load_config()?;
    if runtime_options.log_level.is_none() && std::env::var_os("RUST_LOG").is_none() {
        term_autolog::debug::set_level(config.log_level.to_level_filter());
    }

    let app = App::new(config, &runtime_options)?;
    let result = app.run();

    if let Err(ref e) = result {
        log::error!("term-autolog exited with error: {e:#}");
        eprintln!("term-autolog: error: {e:#}");
    }
    result
}
