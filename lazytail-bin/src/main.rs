use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use lazytail_docker::DockerLogSource;
use lazytail_framework::{Clock, LineTailer, LogSource, TailerDesc};
use regex::Regex;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::env;
use std::io::{self, Write};
use std::process;

fn print_usage() {
    eprintln!("Usage: lazytail [OPTIONS] <CONTAINER>");
    eprintln!();
    eprintln!("Print a container's log lines until it goes quiet.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --timeout, -t <SECS>    Stop if nothing is logged within SECS (default 5, 0 = never)");
    eprintln!("  --since, -s <RFC3339>   Start reading from this instant instead of now");
    eprintln!("  --stop-on, -u <REGEX>   Stop after the first line matching REGEX");
    eprintln!("  --verbose, -v           Print debug diagnostics on stderr");
    eprintln!("  --help, -h              Print this help message");
}

#[derive(Debug)]
struct TailOptions {
    container: String,
    timeout_secs: i64,
    since: Option<DateTime<Utc>>,
    stop_on: Option<Regex>,
    verbose: bool,
}

#[derive(Debug)]
enum UsageOptions {
    Tail(TailOptions),
    Help,
}

impl UsageOptions {
    fn from_args(args: &[String]) -> Result<Self> {
        let mut container = None;
        let mut timeout_secs = lazytail_framework::tailer::DEFAULT_TIMEOUT_SECS;
        let mut since = None;
        let mut stop_on = None;
        let mut verbose = false;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => return Ok(Self::Help),
                "--verbose" | "-v" => verbose = true,
                "--timeout" | "-t" => {
                    let value = Self::value_of(arg, iter.next())?;
                    timeout_secs = value
                        .parse()
                        .with_context(|| format!("Invalid timeout '{}'", value))?;
                }
                "--since" | "-s" => {
                    let value = Self::value_of(arg, iter.next())?;
                    let date = DateTime::parse_from_rfc3339(value)
                        .with_context(|| format!("Invalid RFC 3339 date '{}'", value))?;
                    since = Some(date.with_timezone(&Utc));
                }
                "--stop-on" | "-u" => {
                    let value = Self::value_of(arg, iter.next())?;
                    stop_on = Some(
                        Regex::new(value)
                            .with_context(|| format!("Invalid pattern '{}'", value))?,
                    );
                }
                other if other.starts_with('-') => bail!("Unknown option '{}'", other),
                other => {
                    if container.replace(other.to_string()).is_some() {
                        bail!("Only one container can be tailed at a time");
                    }
                }
            }
        }

        let container = container.ok_or_else(|| anyhow!("Missing <CONTAINER> argument"))?;
        Ok(Self::Tail(TailOptions {
            container,
            timeout_secs,
            since,
            stop_on,
            verbose,
        }))
    }

    fn value_of<'a>(flag: &str, value: Option<&'a String>) -> Result<&'a str> {
        value
            .map(|v| v.as_str())
            .ok_or_else(|| anyhow!("Option '{}' expects a value", flag))
    }
}

#[derive(Debug, PartialEq, Eq)]
enum FollowOutcome {
    /// the container stayed silent for the whole timeout
    TimedOut,
    /// a line matched `--stop-on`
    Matched(String),
}

/// copy lines from `tailer` to `out` until it ends or a line matches `stop_on`
fn follow<S, C, W>(
    tailer: &mut LineTailer<S, C>,
    out: &mut W,
    stop_on: Option<&Regex>,
) -> Result<FollowOutcome>
where
    S: LogSource,
    C: Clock,
    W: Write,
{
    while let Some(line) = tailer.next_line()? {
        writeln!(out, "{}", line).context("Failed to write to stdout")?;

        if let Some(pattern) = stop_on
            && pattern.is_match(&line)
        {
            log::debug!("Line matched '{}', stopping", pattern);
            return Ok(FollowOutcome::Matched(line));
        }
    }

    Ok(FollowOutcome::TimedOut)
}

fn setup_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .build();

    // init only fails when a logger is already installed; keep that one
    if let Err(e) = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto) {
        log::debug!("Keeping existing logger: {}", e);
    }
}

fn run(options: TailOptions) -> Result<()> {
    let source = DockerLogSource::connect(&options.container)?;

    let mut desc = TailerDesc::new();
    desc.timeout_secs = options.timeout_secs;
    desc.start_date = options.since;

    let mut tailer = LineTailer::new(source, desc);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match follow(&mut tailer, &mut out, options.stop_on.as_ref())? {
        FollowOutcome::TimedOut => log::debug!(
            "No output from '{}' within {}s",
            options.container,
            options.timeout_secs
        ),
        FollowOutcome::Matched(_) => {}
    }

    Ok(())
}

fn main() {
    // Collect args excluding the binary name
    let args: Vec<String> = env::args().skip(1).collect();

    let options = match UsageOptions::from_args(&args) {
        Ok(UsageOptions::Help) => {
            print_usage();
            return;
        }
        Ok(UsageOptions::Tail(options)) => options,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    setup_logger(options.verbose);

    if let Err(e) = run(options) {
        log::error!("{:#}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use lazytail_framework::{ManualClock, ScriptedSource};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn tail_options(list: &[&str]) -> TailOptions {
        match UsageOptions::from_args(&args(list)).unwrap() {
            UsageOptions::Tail(options) => options,
            UsageOptions::Help => panic!("expected tail options"),
        }
    }

    fn scripted_tailer(source: ScriptedSource) -> LineTailer<ScriptedSource, ManualClock> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        LineTailer::with_clock(source, TailerDesc::new(), ManualClock::new(start))
    }

    #[test]
    fn test_defaults() {
        let options = tail_options(&["web"]);
        assert_eq!(options.container, "web");
        assert_eq!(options.timeout_secs, 5);
        assert!(options.since.is_none());
        assert!(options.stop_on.is_none());
        assert!(!options.verbose);
    }

    #[test]
    fn test_all_options() {
        let options = tail_options(&[
            "-t",
            "0",
            "--since",
            "2024-05-01T10:00:00+02:00",
            "-u",
            "^ready$",
            "-v",
            "db",
        ]);
        assert_eq!(options.container, "db");
        assert_eq!(options.timeout_secs, 0);
        assert_eq!(
            options.since,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap())
        );
        assert!(options.stop_on.unwrap().is_match("ready"));
        assert!(options.verbose);
    }

    #[test]
    fn test_help_wins() {
        let parsed = UsageOptions::from_args(&args(&["web", "--help"])).unwrap();
        assert!(matches!(parsed, UsageOptions::Help));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(UsageOptions::from_args(&args(&[])).is_err());
        assert!(UsageOptions::from_args(&args(&["a", "b"])).is_err());
        assert!(UsageOptions::from_args(&args(&["--bogus", "a"])).is_err());
        assert!(UsageOptions::from_args(&args(&["a", "-t"])).is_err());
        assert!(UsageOptions::from_args(&args(&["a", "-t", "soon"])).is_err());
        assert!(UsageOptions::from_args(&args(&["a", "-s", "yesterday"])).is_err());
        assert!(UsageOptions::from_args(&args(&["a", "-u", "("])).is_err());
    }

    #[test]
    fn test_follow_until_timeout() {
        let mut tailer = scripted_tailer(ScriptedSource::new());
        let mut out = Vec::new();
        let outcome = follow(&mut tailer, &mut out, None).unwrap();
        assert_eq!(outcome, FollowOutcome::TimedOut);
        assert!(out.is_empty());
    }

    #[test]
    fn test_follow_stops_on_match() {
        let source = ScriptedSource::new()
            .with_chunk("updating\n")
            .with_chunk("  setup done  \nnever printed\n");
        let mut tailer = scripted_tailer(source);
        let pattern = Regex::new("done$").unwrap();
        let mut out = Vec::new();

        let outcome = follow(&mut tailer, &mut out, Some(&pattern)).unwrap();
        assert_eq!(outcome, FollowOutcome::Matched("setup done".to_string()));
        assert_eq!(String::from_utf8(out).unwrap(), "updating\nsetup done\n");
    }

    #[test]
    fn test_follow_propagates_source_failure() {
        let source = ScriptedSource::new().with_chunk("a\n").with_failure("container removed");
        let mut tailer = scripted_tailer(source);
        let mut out = Vec::new();

        let err = follow(&mut tailer, &mut out, None).unwrap_err();
        assert!(format!("{:#}", err).contains("container removed"));
        assert_eq!(out, b"a\n");
    }
}
