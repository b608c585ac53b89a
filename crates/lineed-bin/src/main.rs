//! lineed entrypoint: reads an ed-style command stream from stdin, writes
//! Print output to stdout.

use anyhow::Result;
use lineed_engine::Engine;
use lineed_io::{LineReader, LineWriter};
use std::io::BufReader;
use std::path::Path;
use std::sync::Once;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        AppStartup { log_guard: None }
    }

    /// Logs to a file rather than stdout/stderr: stdout is the program's
    /// real output stream (Print results) and must stay free of log noise.
    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = Path::new(".");
        let log_path = log_dir.join("lineed.log");
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, "lineed.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .try_init()
        {
            Ok(_) => self.log_guard = Some(guard),
            Err(_) => {
                // A subscriber is already installed (e.g. under test); drop
                // the guard so its background writer thread shuts down.
            }
        }
        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

fn main() -> Result<()> {
    let mut startup = AppStartup::new();
    startup.configure_logging()?;
    AppStartup::install_panic_hook();

    info!(target: "runtime", "startup");

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut reader = LineReader::new(BufReader::new(stdin.lock()));
    let mut writer = LineWriter::new(stdout.lock());

    let mut engine = Engine::new();
    let result = engine.run(&mut reader, &mut writer);
    // Flush regardless of outcome: a mid-stream parse error must not
    // swallow Print output already written before it.
    writer.flush()?;

    result?;
    info!(target: "runtime", "shutdown");
    Ok(())
}
