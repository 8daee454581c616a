use std::ffi::OsString;
use std::io::{self, BufRead, ErrorKind, Write};

use relq::{EngineConfig, MemoryCatalog, PlannerConfig, Scanner, Token};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const PROMPT: &str = "relq> ";
const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CliOptions {
    config_path: Option<String>,
    command: Option<String>,
    log_level: Option<String>,
    show_help: bool,
}

/// Catalog and planner settings shared by every statement of a session.
struct Session {
    catalog: MemoryCatalog,
    planner: PlannerConfig,
}

impl Session {
    fn from_config(config: &EngineConfig) -> Self {
        Self {
            catalog: config.catalog(),
            planner: config.planner,
        }
    }
}

fn main() {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();

    let exit_code = run(std::env::args_os(), &mut input, &mut stdout, &mut stderr);
    drop(input);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run<I, R, W, E>(args: I, input: &mut R, out: &mut W, err: &mut E) -> i32
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
{
    let options = match parse_args(args) {
        Ok(options) => options,
        Err(message) => {
            let _ = writeln!(err, "error: {message}");
            let _ = write_usage(err);
            return 2;
        }
    };

    if options.show_help {
        if write_usage(out).is_err() {
            return 1;
        }
        return 0;
    }

    let filter = match build_env_filter(options.log_level.as_deref()) {
        Ok(filter) => filter,
        Err(message) => {
            let _ = writeln!(err, "error: {message}");
            return 2;
        }
    };
    init_tracing(filter);

    let config = match options.config_path.as_deref() {
        Some(path) => match EngineConfig::from_path(path) {
            Ok(config) => config,
            Err(error) => {
                let _ = writeln!(err, "error: {error}");
                return error.exit_code();
            }
        },
        None => EngineConfig::default(),
    };
    let session = Session::from_config(&config);
    tracing::debug!(
        target: "relq.cli",
        relations = session.catalog.len(),
        scope = ?session.planner.predicate_scope,
        "session ready"
    );

    if let Some(command) = options.command {
        return run_command(&session, &command, out, err);
    }

    run_repl(&session, input, out, err)
}

fn parse_args<I>(args: I) -> Result<CliOptions, String>
where
    I: IntoIterator<Item = OsString>,
{
    let mut iter = args.into_iter();
    let _argv0 = iter.next();

    let mut options = CliOptions::default();

    while let Some(argument) = iter.next() {
        let arg = argument.to_string_lossy();
        let arg_str = arg.as_ref();

        match arg_str {
            "-h" | "--help" => {
                options.show_help = true;
            }
            "-c" | "--command" => {
                let next = iter
                    .next()
                    .ok_or_else(|| String::from("missing SQL argument for `-c/--command`"))?;
                set_once(&mut options.command, next, "-c/--command")?;
            }
            "--config" => {
                let next = iter
                    .next()
                    .ok_or_else(|| String::from("missing file argument for `--config`"))?;
                set_once(&mut options.config_path, next, "--config")?;
            }
            "--log-level" => {
                let next = iter
                    .next()
                    .ok_or_else(|| String::from("missing level argument for `--log-level`"))?;
                set_once(&mut options.log_level, next, "--log-level")?;
            }
            _ => {
                if let Some(value) = arg_str
                    .strip_prefix("--command=")
                    .or_else(|| arg_str.strip_prefix("-c="))
                {
                    set_once(&mut options.command, value.into(), "-c/--command")?;
                } else if let Some(value) = arg_str.strip_prefix("--config=") {
                    set_once(&mut options.config_path, value.into(), "--config")?;
                } else if let Some(value) = arg_str.strip_prefix("--log-level=") {
                    set_once(&mut options.log_level, value.into(), "--log-level")?;
                } else {
                    return Err(format!("unexpected argument `{arg_str}`"));
                }
            }
        }
    }

    Ok(options)
}

fn set_once(slot: &mut Option<String>, value: OsString, flag: &str) -> Result<(), String> {
    if slot.is_some() {
        return Err(format!("`{flag}` may only be provided once"));
    }
    *slot = Some(value.to_string_lossy().into_owned());
    Ok(())
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// `--log-level` wins over `RUST_LOG`; with neither, only warnings are shown.
fn build_env_filter(level: Option<&str>) -> Result<EnvFilter, String> {
    if let Some(level) = level {
        return EnvFilter::try_new(level).map_err(|e| format!("invalid log level `{level}`: {e}"));
    }
    let from_env = EnvFilter::try_from_default_env();
    Ok(from_env.unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)))
}

fn init_tracing(filter: EnvFilter) {
    let console = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .compact();
    // A subscriber may already be installed (tests run many sessions).
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .try_init();
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

fn run_command<W, E>(session: &Session, command: &str, out: &mut W, err: &mut E) -> i32
where
    W: Write,
    E: Write,
{
    let mut ok = true;
    for sql in split_statements(command) {
        ok &= explain(session, sql, out, err);
    }
    i32::from(!ok)
}

fn run_repl<R, W, E>(session: &Session, input: &mut R, out: &mut W, err: &mut E) -> i32
where
    R: BufRead,
    W: Write,
    E: Write,
{
    let mut line_buffer = String::new();

    loop {
        if write!(out, "{PROMPT}").and_then(|()| out.flush()).is_err() {
            return 1;
        }

        line_buffer.clear();
        let bytes_read = match input.read_line(&mut line_buffer) {
            Ok(bytes_read) => bytes_read,
            Err(error) if error.kind() == ErrorKind::Interrupted => {
                let _ = writeln!(out);
                continue;
            }
            Err(error) => {
                let _ = writeln!(err, "error: {error}");
                return 1;
            }
        };

        if bytes_read == 0 {
            let _ = writeln!(out);
            return 0;
        }

        let trimmed = line_buffer.trim();
        match trimmed {
            "" => {}
            ".exit" | ".quit" => return 0,
            ".help" => {
                if write_repl_help(out).is_err() {
                    return 1;
                }
            }
            ".tables" => {
                if write_tables(&session.catalog, out).is_err() {
                    return 1;
                }
            }
            _ => {
                for sql in split_statements(trimmed) {
                    let _ = explain(session, sql, out, err);
                }
            }
        }
    }
}

/// Compile one statement and print its plan. Returns `false` on error.
fn explain<W, E>(session: &Session, sql: &str, out: &mut W, err: &mut E) -> bool
where
    W: Write,
    E: Write,
{
    match relq::compile_with(sql, &session.catalog, &session.planner) {
        Ok(plan) => {
            if writeln!(out, "{plan}").is_err() {
                let _ = writeln!(err, "error: failed writing plan");
                return false;
            }
            true
        }
        Err(error) => {
            tracing::debug!(target: "relq.cli", %error, kind = ?error.kind(), "statement rejected");
            let _ = writeln!(err, "error: {error}");
            if let Some(hint) = error.suggestion() {
                let _ = writeln!(err, "hint: {hint}");
            }
            false
        }
    }
}

/// Split `text` after each `;` lexeme. Semicolons inside string literals
/// stay put; empty statements are dropped.
fn split_statements(text: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut start = 0;
    for lex in Scanner::new(text) {
        if lex.token == Token::Semicolon {
            let end = lex.span.end as usize;
            statements.push(&text[start..end]);
            start = end;
        }
    }
    statements.push(&text[start..]);
    statements
        .into_iter()
        .map(str::trim)
        .filter(|sql| !sql.is_empty() && *sql != ";")
        .collect()
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn write_tables<W>(catalog: &MemoryCatalog, out: &mut W) -> io::Result<()>
where
    W: Write,
{
    for relation in catalog.relations() {
        let columns: Vec<String> = relation
            .columns()
            .map(|c| format!("{} {}", c.name, c.data_type))
            .collect();
        writeln!(out, "{} ({})", relation.name, columns.join(", "))?;
    }
    Ok(())
}

fn write_usage<W>(out: &mut W) -> io::Result<()>
where
    W: Write,
{
    writeln!(
        out,
        "Usage: relq [--config FILE] [-c|--command SQL] [--log-level LEVEL]\n\
         \n\
         Prints the logical plan of each SELECT statement.\n\
         \n\
         Examples:\n\
         \n\
         relq --config catalog.json\n\
         relq --config catalog.json -c \"SELECT name FROM users WHERE id = 1;\"\n\
         RUST_LOG=relq.plan=debug relq --config catalog.json\n",
    )
}

fn write_repl_help<W>(out: &mut W) -> io::Result<()>
where
    W: Write,
{
    writeln!(
        out,
        "Dot commands:\n\
         \n\
         .help      Show this help\n\
         .tables    List relations in the catalog\n\
         .quit      Exit the shell\n\
         .exit      Exit the shell\n\
         \n\
         Each line is one statement; `;` separates several on a line.\n",
    )
}
