//! Process-wide log setup

use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

/// Map a `--log-level` value to a tracing level, `info` for anything unknown.
pub fn parse_level(name: &str) -> Level {
    match name {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global fmt subscriber writing to stdout.
pub fn init(level: Level) -> anyhow::Result<()> {
    init_with_writer(level, std::io::stdout)
}

/// Install the global fmt subscriber. Records emitted through the `log`
/// facade (actix-web's access log among them) are forwarded to it.
pub fn init_with_writer<W>(level: Level, writer: W) -> anyhow::Result<()>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(writer)
        .try_init()
        .map_err(anyhow::Error::msg)
}
