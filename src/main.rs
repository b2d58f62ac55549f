// src/main.rs

//! The `listener` binary: parses CLI options, loads the rule file, and runs the daemon.

use std::path::PathBuf;
use std::process;

use log::error;
use reactord::rule::loader::load_rules_from_file;
use reactord::{daemon, rule};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "listener", about = "Watch filesystem subtrees and react to changes in them.")]
struct Opt {
    /// Path to the rule file.
    #[structopt(short, long, parse(from_os_str), default_value = "/etc/listener.conf")]
    config: PathBuf,

    /// Stay in the foreground and raise the log level to `debug`.
    #[structopt(short, long)]
    debug: bool,
}

fn main() {
    let opt = Opt::from_args();
    init_logging(opt.debug);

    if let Err(err) = run(&opt) {
        error!("{}", err);
        process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    let env = env_logger::Env::default().default_filter_or(default_filter);
    env_logger::Builder::from_env(env).init();
}

fn run(opt: &Opt) -> std::io::Result<()> {
    let rules: Vec<rule::Rule> = load_rules_from_file(&opt.config)?;
    daemon::run(rules)
}
