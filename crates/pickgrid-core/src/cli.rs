use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "pickgrid",
    version,
    about = "Compute date picker pages: the visible years, months, days, hours or minutes around a date"
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Config file; defaults to $PICKGRID_CONFIG, ./pickgrid.toml, then the user config dir.
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Config override, e.g. --set step=15
    #[arg(
        long = "set",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub overrides: Vec<KeyVal>,

    /// Reference date the page is built around (default: now).
    #[arg(short = 'd', long = "date")]
    pub date: Option<String>,

    /// year, month, date, hours or minutes
    #[arg(long = "view")]
    pub view: Option<String>,

    #[arg(long = "min-view")]
    pub min_view: Option<String>,

    #[arg(long = "max-view")]
    pub max_view: Option<String>,

    /// Earliest selectable date.
    #[arg(long = "min")]
    pub min: Option<String>,

    /// Latest selectable date.
    #[arg(long = "max")]
    pub max: Option<String>,

    /// Currently selected value, marked active on the page.
    #[arg(long = "selected")]
    pub selected: Option<String>,

    /// Treat --date as the start of a range ending here and print both pages.
    #[arg(long = "until")]
    pub until: Option<String>,

    /// Check typed text against the value format and --min/--max
    /// instead of printing a page.
    #[arg(long = "value")]
    pub value: Option<String>,

    /// strftime pattern for --value (default: %Y-%m-%d %H:%M).
    #[arg(long = "format")]
    pub format: Option<String>,

    /// Override the current time.
    #[arg(long = "now")]
    pub now: Option<String>,

    #[arg(short = 'z', long = "timezone")]
    pub timezone: Option<String>,

    /// 0 = Sunday .. 6 = Saturday
    #[arg(long = "first-day")]
    pub first_day: Option<u8>,

    /// Minute step of the minutes view.
    #[arg(long = "step")]
    pub step: Option<u32>,

    #[arg(long = "json")]
    pub json: bool,

    #[arg(long = "no-color")]
    pub no_color: bool,
}

impl GlobalCli {
    /// Flags that map onto config keys, as `(key, value)` pairs.
    pub fn config_overrides(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .overrides
            .iter()
            .map(|kv| (kv.key.clone(), kv.value.clone()))
            .collect();

        let flags = [
            ("timezone", self.timezone.clone()),
            ("first_day", self.first_day.map(|d| d.to_string())),
            ("step", self.step.map(|s| s.to_string())),
            ("view", self.view.clone()),
            ("min_view", self.min_view.clone()),
            ("max_view", self.max_view.clone()),
            ("format", self.format.clone()),
        ];
        for (key, value) in flags {
            if let Some(value) = value {
                pairs.push((key.to_string(), value));
            }
        }
        pairs
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
