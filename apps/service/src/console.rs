//! Line-oriented commands accepted on stdin.

use std::str::FromStr;

use anyhow::{Context, Result, bail};
use sitewatch::Cadence;

pub const HELP: &str = "\
Commands:
  add <name> <url> [interval]   monitor a site (interval: minutes, seconds, 30s, 5m, 2 minutes)
  remove <url>                  stop monitoring a site and forget it
  stop <url>                    same as remove
  check <url>                   check a site right now
  list                          show monitored sites as JSON lines
  help                          show this help
  quit                          stop all checks and exit
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add { name: String, url: String, cadence: Cadence },
    Remove(String),
    Stop(String),
    Check(String),
    List,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut tokens = line.split_whitespace();
        let Some(verb) = tokens.next() else {
            bail!("empty command");
        };
        let args: Vec<&str> = tokens.collect();

        match verb.to_ascii_lowercase().as_str() {
            "add" => parse_add(&args),
            "remove" | "rm" => Ok(Command::Remove(single_url(verb, &args)?)),
            "stop" => Ok(Command::Stop(single_url(verb, &args)?)),
            "check" => Ok(Command::Check(single_url(verb, &args)?)),
            "list" | "ls" => Ok(Command::List),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => bail!("unknown command `{other}`, try `help`"),
        }
    }
}

/// `add <name...> <url> [interval...]`: the first token with a scheme is the URL
fn parse_add(args: &[&str]) -> Result<Command> {
    let Some(url_at) = args.iter().position(|arg| arg.contains("://")) else {
        bail!("usage: add <name> <url> [interval]");
    };

    let name = args[..url_at].join(" ");
    if name.is_empty() {
        bail!("usage: add <name> <url> [interval]");
    }

    let interval = args[url_at + 1..].join(" ");
    let cadence = if interval.is_empty() {
        Cadence::default()
    } else {
        interval
            .parse()
            .with_context(|| format!("invalid interval `{interval}`"))?
    };

    Ok(Command::Add { name, url: args[url_at].to_string(), cadence })
}

fn single_url(verb: &str, args: &[&str]) -> Result<String> {
    match args {
        [url] => Ok((*url).to_string()),
        _ => bail!("usage: {verb} <url>"),
    }
}
