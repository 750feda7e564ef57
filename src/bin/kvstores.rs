//! The kvstores executable builds a store and runs command lines against it.
//!
//! `kvstores [OPTIONS] exec <COMMAND>...`
//!
//!     Runs each command line in order and prints `STATUS message` for each one.
//!     A command line is `VERB KEY [VALUE...]`, e.g. `RSET user:1 alice smith`.
//!     The lines `STATS` and `SCAN <array|hash|rbtree>` print the stats or the records of a
//!     structure instead.
//!
//! `kvstores [OPTIONS] replay <FILE> [--threads N] [--pool shared|rayon]`
//!
//!     Runs every non-empty line of FILE that does not start with `#` concurrently on a thread
//!     pool, prints the responses in file order, then the stats.
//!
//! `kvstores [OPTIONS] stats`
//!
//!     Prints the stats of an empty store built with OPTIONS.
//!
//! OPTIONS: `--config FILE`, `--array-capacity N`, `--hash-capacity N`, `--rbtree-capacity N`,
//! `--hash-buckets N`, `--log-level LEVEL`. Flags take precedence over the config file.
//!
//! The exit code is non-zero for invalid options and IO errors only. A malformed command line,
//! including a SCAN of an unknown structure, prints an `ERROR` response and the run goes on.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::exit;
use std::str::FromStr;

use clap::{arg_enum, crate_version, value_t, App, Arg, ArgMatches, SubCommand};
use kvstores::thread_pool::{RayonThreadPool, SharedQueueThreadPool, ThreadPool};
use kvstores::{
    CommandExecutor, KvStore, KvsError, Request, Response, Result, Status, StoreConfig, Target,
};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

arg_enum! {
    #[allow(non_camel_case_types)]
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    enum Pool {
        shared,
        rayon
    }
}

const DEFAULT_THREADS: &str = "4";
const DEFAULT_LOG_LEVEL: &str = "warn";

/// what to do once the store is built
#[derive(Debug)]
enum Action {
    Exec(Vec<String>),
    Replay {
        path: PathBuf,
        threads: u32,
        pool: Pool,
    },
    Stats,
}

/// ['Opt'] holds parsed and validated options from the command line
#[derive(Debug)]
struct Opt {
    config: StoreConfig,
    log_level: Level,
    action: Action,
}

impl Opt {
    /// validates the command line options
    /// # Errors
    /// returns [`KvsError::Parsing`] if one of the parameters is invalid, or the error raised
    /// while loading the config file
    fn build(matches: &ArgMatches) -> Result<Opt> {
        let mut config = match matches.value_of("config") {
            Some(path) => StoreConfig::from_file(Path::new(path))?,
            None => StoreConfig::default(),
        };
        if let Some(n) = usize_arg(matches, "array-capacity")? {
            config.array_capacity = n;
        }
        if let Some(n) = usize_arg(matches, "hash-capacity")? {
            config.hash_capacity = n;
        }
        if let Some(n) = usize_arg(matches, "rbtree-capacity")? {
            config.rbtree_capacity = n;
        }
        if let Some(n) = usize_arg(matches, "hash-buckets")? {
            config.hash_buckets = Some(n);
        }

        let level = matches.value_of("log-level").unwrap_or(DEFAULT_LOG_LEVEL);
        let log_level = Level::from_str(level)
            .map_err(|_| KvsError::Parsing(format!("invalid log level: {}", level)))?;

        let action = match matches.subcommand() {
            ("exec", Some(args)) => Action::Exec(
                args.values_of("COMMAND")
                    .map(|lines| lines.map(String::from).collect())
                    .unwrap_or_default(),
            ),
            ("replay", Some(args)) => {
                let threads =
                    value_t!(args, "threads", u32).map_err(|e| KvsError::Parsing(e.message))?;
                if threads == 0 {
                    return Err(KvsError::Parsing("threads must be positive".to_string()));
                }
                Action::Replay {
                    path: args.value_of("FILE").map(PathBuf::from).unwrap_or_default(),
                    threads,
                    pool: value_t!(args, "pool", Pool).map_err(|e| KvsError::Parsing(e.message))?,
                }
            }
            _ => Action::Stats,
        };

        Ok(Opt {
            config,
            log_level,
            action,
        })
    }
}

fn usize_arg(matches: &ArgMatches, name: &str) -> Result<Option<usize>> {
    match matches.value_of(name) {
        Some(raw) => raw
            .parse::<usize>()
            .map(Some)
            .map_err(|_| KvsError::Parsing(format!("could not parse {} into a {}", raw, name))),
        None => Ok(None),
    }
}

fn main() {
    let capacity_arg = |name: &'static str, help: &'static str| {
        Arg::with_name(name)
            .long(name)
            .value_name("N")
            .takes_value(true)
            .help(help)
    };

    let matches = App::new("kvstores")
        .version(crate_version!())
        .author("strohs <strohs1@gmail.com>")
        .about("fixed-capacity key-value stores: array, hash table and red-black tree")
        .arg(Arg::with_name("config")
            .long("config")
            .value_name("FILE")
            .help("reads store capacities from a JSON file"))
        .arg(capacity_arg("array-capacity", "sets the capacity of the array store"))
        .arg(capacity_arg("hash-capacity", "sets the capacity of the hash store"))
        .arg(capacity_arg("rbtree-capacity", "sets the capacity of the rbtree store"))
        .arg(capacity_arg("hash-buckets", "sets the number of hash table buckets"))
        .arg(Arg::with_name("log-level")
            .long("log-level")
            .value_name("LEVEL")
            .help("sets the max level written to STDERR: trace, debug, info, warn or error")
            .default_value(DEFAULT_LOG_LEVEL))
        .subcommands(vec![
            SubCommand::with_name("exec")
                .about("Runs command lines one after another")
                .arg(Arg::with_name("COMMAND").required(true).multiple(true).index(1)),
            SubCommand::with_name("replay")
                .about("Runs the command lines of a file concurrently")
                .arg(Arg::with_name("FILE").required(true).index(1))
                .arg(Arg::with_name("threads")
                    .long("threads")
                    .value_name("N")
                    .default_value(DEFAULT_THREADS))
                .arg(Arg::with_name("pool")
                    .long("pool")
                    .value_name("POOL")
                    .possible_values(&Pool::variants())
                    .case_insensitive(true)
                    .default_value("shared")),
            SubCommand::with_name("stats").about("Prints the stats of an empty store"),
        ])
        .get_matches();

    let opt = match Opt::build(&matches) {
        Ok(opt) => opt,
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    };

    subscriber_config(opt.log_level);

    if let Err(e) = run(opt) {
        eprintln!("{}", e);
        exit(1);
    }
}

fn run(opt: Opt) -> Result<()> {
    info!("kvstores {}", env!("CARGO_PKG_VERSION"));
    let store = KvStore::new(&opt.config)?;

    match opt.action {
        Action::Exec(lines) => {
            for line in lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
                exec_line(&store, line);
            }
            Ok(())
        }
        Action::Replay {
            path,
            threads,
            pool,
        } => match pool {
            Pool::shared => replay(SharedQueueThreadPool::new(threads)?, store, &path),
            Pool::rayon => replay(RayonThreadPool::new(threads)?, store, &path),
        },
        Action::Stats => {
            print_stats(&store);
            Ok(())
        }
    }
}

/// runs one line of the `exec` subcommand
fn exec_line(store: &KvStore, line: &str) {
    let mut words = line.split_whitespace();
    let keyword = words.next().unwrap_or_default().to_ascii_uppercase();
    match keyword.as_str() {
        "STATS" => print_stats(store),
        "SCAN" => match words.next() {
            Some(name) => match name.parse::<Target>() {
                Ok(target) => {
                    for record in store.snapshot(target) {
                        println!("{} {}", record.key, record.value);
                    }
                }
                // answered like any other malformed command
                Err(_) => println!(
                    "{}",
                    Response::new(Status::Error, format!("Unknown target: {}", name))
                ),
            },
            None => println!("{}", Response::new(Status::Error, "Target required")),
        },
        _ => println!("{}", store.execute(&Request::from_line(line))),
    }
}

fn replay<P: ThreadPool>(pool: P, store: KvStore, path: &Path) -> Result<()> {
    let script = fs::read_to_string(path)?;
    let requests: Vec<Request> = script
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(Request::from_line)
        .collect();
    info!("replaying {} commands from {:?}", requests.len(), path);

    let executor = CommandExecutor::new(store, pool);
    for response in executor.execute_all(requests) {
        println!("{}", response);
    }
    print_stats(executor.store());
    Ok(())
}

fn print_stats(store: &KvStore) {
    let stats = store.stats();
    for target in Target::ALL.iter() {
        let s = stats.get(*target);
        println!(
            "{} count={} remaining={} max={}",
            target, s.count, s.remaining, s.max
        );
    }
}

/// configures a tracing subscriber that will log to STDERR
fn subscriber_config(level: Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        // log to stderr so stdout only carries command results
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("could not install the tracing subscriber: {}", e);
    }
}
