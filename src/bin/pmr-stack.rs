use pmr_stack::{
    init_logging, Config, EventSink, FixedBlockResource, NullObserver, Shell, TracingObserver,
    WriterObserver,
};
use std::io;
use std::path::PathBuf;
use tracing::{debug, error, info};

#[derive(Debug, Default)]
struct CliArgs {
    config: Option<PathBuf>,
    capacity: Option<usize>,
    events: Option<EventSink>,
}

impl CliArgs {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        let prog = args.first().map(String::as_str).unwrap_or("pmr-stack");
        let mut parsed = Self::default();
        let mut iter = args.iter().skip(1);

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => return Err(Self::usage(prog)),
                "--config" => {
                    let path = iter.next().ok_or("--config needs a path")?;
                    parsed.config = Some(PathBuf::from(path));
                }
                "--capacity" => {
                    let value = iter.next().ok_or("--capacity needs a byte count")?;
                    let bytes = value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid capacity: {}", value))?;
                    parsed.capacity = Some(bytes);
                }
                "--events" => {
                    let value = iter.next().ok_or("--events needs a sink")?;
                    parsed.events = Some(value.parse::<EventSink>().map_err(|e| e.to_string())?);
                }
                opt => return Err(format!("Unknown option: {}\n\n{}", opt, Self::usage(prog))),
            }
        }

        Ok(parsed)
    }

    fn usage(prog: &str) -> String {
        format!(
            "pmr-stack - interactive stack over a fixed-capacity arena\n\n\
            USAGE:\n    {} [OPTIONS]\n\n\
            OPTIONS:\n    \
            -h, --help              Print help information\n    \
            --config <path>         Read settings from a TOML file\n    \
            --capacity <bytes>      Arena size (default 1024)\n    \
            --events <sink>         console | json | trace | off",
            prog
        )
    }
}

fn load_config(args: &CliArgs) -> Result<Config, String> {
    let mut config = match &args.config {
        Some(path) => Config::load(path).map_err(|e| e.to_string())?,
        None => Config::discover(),
    };
    config.apply_env().map_err(|e| e.to_string())?;

    if let Some(capacity) = args.capacity {
        config.arena.capacity = capacity;
    }
    if let Some(events) = args.events {
        config.arena.events = events;
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn build_arena(config: &Config) -> Result<FixedBlockResource, String> {
    let capacity = config.arena.capacity;
    let arena = match config.arena.events {
        EventSink::Console => {
            FixedBlockResource::with_observer(capacity, WriterObserver::console(io::stdout()))
        }
        EventSink::Json => {
            FixedBlockResource::with_observer(capacity, WriterObserver::json(io::stdout()))
        }
        EventSink::Trace => FixedBlockResource::with_observer(capacity, TracingObserver),
        EventSink::Off => FixedBlockResource::with_observer(capacity, NullObserver),
    };
    arena.map_err(|e| e.to_string())
}

fn main() {
    let args = match CliArgs::from_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let log_config = match config.log_config() {
        Ok(log_config) => log_config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let _guard = init_logging(log_config);

    debug!(capacity = config.arena.capacity, events = ?config.arena.events, "configuration loaded");

    let arena = match build_arena(&config) {
        Ok(arena) => arena,
        Err(e) => {
            error!(error = %e, "failed to create arena");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    let result = {
        let mut shell = Shell::new(&arena, io::stdout(), io::stderr());
        shell.run(stdin.lock())
    };

    if let Err(e) = result {
        error!(error = %e, "shell terminated on I/O error");
        eprintln!("Error: {}", e);
        drop(arena);
        std::process::exit(1);
    }

    info!(stats = ?arena.stats(), "shell finished");
}
