use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use std::net::IpAddr;
use std::path::PathBuf;

/// CLI arguments for rapport-server
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    pub config_file: Option<PathBuf>,
    pub memory_storage: bool,
    pub max_request_size: Option<usize>,
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Parse command line arguments
    pub fn parse() -> Self {
        let matches = Self::command().get_matches();

        if matches.get_flag("help_env") {
            Self::print_env_help();
            std::process::exit(0);
        }

        Self::from_matches(&matches)
    }

    /// The clap command describing every argument
    pub fn command() -> Command {
        Command::new("rapport-server")
            .version(rapport::VERSION)
            .about("HTTP API server for the Rapport social-graph backend")
            .long_about(
                r#"Rapport Server exposes friendships, votes, deadlines, threads and
time-boxed allocations over a REST API.

The server can be configured through command line arguments or environment
variables. Command line arguments take precedence over environment variables.

Examples:
  rapport-server --port 8080
  rapport-server --config rapport.toml --log-level debug
  rapport-server --memory"#,
            )
            .arg(
                Arg::new("host")
                    .long("host")
                    .value_name("ADDR")
                    .help("Address to bind")
                    .long_help(
                        "IP address the HTTP server binds to.
Environment variable: RAPPORT_SERVER_HOST",
                    )
                    .value_parser(clap::value_parser!(IpAddr)),
            )
            .arg(
                Arg::new("port")
                    .short('p')
                    .long("port")
                    .value_name("PORT")
                    .help("Port to listen on")
                    .long_help(
                        "Port number for the HTTP server to listen on.
Environment variable: RAPPORT_SERVER_PORT",
                    )
                    .value_hint(ValueHint::Other)
                    .value_parser(clap::value_parser!(u16)),
            )
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Rapport configuration file")
                    .long_help(
                        "Path to a TOML, YAML or JSON Rapport configuration file. When
omitted the default search locations and RAPPORT_* variables are used.
Environment variable: RAPPORT_SERVER_CONFIG_FILE",
                    )
                    .value_hint(ValueHint::FilePath)
                    .value_parser(clap::value_parser!(PathBuf)),
            )
            .arg(
                Arg::new("memory")
                    .long("memory")
                    .help("Keep all state in memory")
                    .long_help("Ignore the configured backend and use in-memory stores.")
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new("max_request_size")
                    .long("max-request-size")
                    .value_name("BYTES")
                    .help("Maximum request body size in bytes")
                    .long_help(
                        "Maximum size allowed for HTTP request bodies.
Larger requests will be rejected.
Environment variable: RAPPORT_SERVER_MAX_REQUEST_SIZE",
                    )
                    .value_parser(clap::value_parser!(usize)),
            )
            .arg(
                Arg::new("log_level")
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Logging level")
                    .long_help(
                        "Set the logging level. Valid values: error, warn, info, debug, trace
Environment variable: RUST_LOG",
                    )
                    .value_parser(["error", "warn", "info", "debug", "trace"]),
            )
            .arg(
                Arg::new("help_env")
                    .long("help-env")
                    .help("Show all environment variables")
                    .action(ArgAction::SetTrue),
            )
    }

    /// Build arguments from parsed matches
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            host: matches.get_one::<IpAddr>("host").copied(),
            port: matches.get_one::<u16>("port").copied(),
            config_file: matches.get_one::<PathBuf>("config").cloned(),
            memory_storage: matches.get_flag("memory"),
            max_request_size: matches.get_one::<usize>("max_request_size").copied(),
            log_level: matches.get_one::<String>("log_level").cloned(),
        }
    }

    fn print_env_help() {
        println!("Rapport Server Environment Variables");
        println!("====================================");
        println!();
        println!("Server:");
        println!("  RAPPORT_SERVER_HOST              - Bind address (default: 0.0.0.0)");
        println!("  RAPPORT_SERVER_PORT              - Server port (default: 3000)");
        println!("  RAPPORT_SERVER_MAX_REQUEST_SIZE  - Max request body size in bytes (default: 1MB)");
        println!("  RAPPORT_SERVER_CONFIG_FILE       - Rapport configuration file");
        println!();
        println!("Rapport (nested keys split on '__'):");
        println!("  RAPPORT_STORAGE__BACKEND         - memory or surrealdb");
        println!("  RAPPORT_STORAGE__DATA_DIR        - Data directory for on-disk storage");
        println!("  RAPPORT_STORAGE__SURREALDB__ENGINE - memory or rocksdb");
        println!("  RAPPORT_FRIENDSHIP__REVERSE_REQUEST_POLICY - reject or auto_accept");
        println!("  RAPPORT_ALLOCATOR__MAX_DURATION  - Longest allocation, e.g. 24h");
        println!("  RAPPORT_ALLOCATOR__DEFAULT_DURATION - Allocation when none is given, e.g. 15m");
        println!();
        println!("Logging:");
        println!("  RUST_LOG                         - Logging level (error, warn, info, debug, trace)");
        println!();
        println!("Note: Command line arguments take precedence over environment variables.");
    }
}
