use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use serde::Deserialize;
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::granularity::Granularity;
use crate::picker::ViewChain;
use crate::settings::{
  CalendarSettings,
  DEFAULT_FIRST_DAY,
  DEFAULT_STEP,
  LOCALE_ENV_VARS,
  first_day_for_locale,
  weekday_from_index
};
use crate::value::ValueFormat;
use crate::zone::Zone;

const CONFIG_FILE: &str =
  "pickgrid.toml";
const CONFIG_ENV_VAR: &str =
  "PICKGRID_CONFIG";
const TIMEZONE_ENV_VAR: &str =
  "PICKGRID_TIMEZONE";
const FIRST_DAY_ENV_VAR: &str =
  "PICKGRID_FIRST_DAY";
const STEP_ENV_VAR: &str =
  "PICKGRID_STEP";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
  timezone: Option<String>,
  calendar: Option<CalendarSection>
}

/// The `[calendar]` table; every key is optional.
#[derive(
  Debug, Clone, Default, Deserialize,
)]
#[serde(default, deny_unknown_fields)]
pub struct CalendarSection {
  pub timezone:  Option<String>,
  /// 0 = Sunday .. 6 = Saturday.
  pub first_day: Option<u8>,
  pub step:      Option<u32>,
  pub view:      Option<Granularity>,
  pub min_view:  Option<Granularity>,
  pub max_view:  Option<Granularity>,
  /// strftime pattern for typed values.
  pub format:    Option<String>
}

#[derive(Debug, Clone, Default)]
pub struct Config {
  pub calendar:     CalendarSection,
  /// Host locale, from `LC_ALL`, `LC_TIME` or `LANG`.
  pub locale:       Option<String>,
  pub loaded_files: Vec<PathBuf>
}

impl Config {
  /// Loads the config file, then applies `PICKGRID_*` environment
  /// variables on top of it.
  #[tracing::instrument]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    match resolve_config_path(
      config_override
    ) {
      | Some(path) => {
        info!(config = %path.display(), "loading config");
        cfg.load_file(&path)?;
      }
      | None => {
        debug!(
          "no config file found; using \
           defaults"
        );
      }
    }

    cfg.apply_env(std::env::vars());
    Ok(cfg)
  }

  #[tracing::instrument(skip(self))]
  pub fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let text =
      fs::read_to_string(path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    let parsed: ConfigFile =
      toml::from_str(&text)
        .with_context(|| {
          format!(
            "failed to parse {}",
            path.display()
          )
        })?;

    let section =
      parsed.calendar.unwrap_or_default();
    let timezone =
      section.timezone.or(parsed.timezone);

    merge(
      &mut self.calendar.timezone,
      timezone
    );
    merge(
      &mut self.calendar.first_day,
      section.first_day
    );
    merge(
      &mut self.calendar.step,
      section.step
    );
    merge(
      &mut self.calendar.view,
      section.view
    );
    merge(
      &mut self.calendar.min_view,
      section.min_view
    );
    merge(
      &mut self.calendar.max_view,
      section.max_view
    );
    merge(
      &mut self.calendar.format,
      section.format
    );

    self
      .loaded_files
      .push(path.to_path_buf());
    trace!(calendar = ?self.calendar, "merged config file");
    Ok(())
  }

  /// Applies the recognized `PICKGRID_*` variables from `vars` and
  /// records the host locale. Unusable values are logged and skipped.
  pub fn apply_env<I>(
    &mut self,
    vars: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    let mut locales: [Option<String>;
      LOCALE_ENV_VARS.len()] =
      Default::default();

    for (name, value) in vars {
      if let Some(idx) = LOCALE_ENV_VARS
        .iter()
        .position(|var| *var == name)
      {
        if !value.trim().is_empty() {
          locales[idx] =
            Some(value.trim().to_string());
        }
        continue;
      }

      let key = match name.as_str() {
        | TIMEZONE_ENV_VAR => "timezone",
        | FIRST_DAY_ENV_VAR => {
          "first_day"
        }
        | STEP_ENV_VAR => "step",
        | _ => continue
      };
      if let Err(err) =
        self.set(key, &value)
      {
        warn!(
          variable = %name,
          error = %format!("{err:#}"),
          "ignoring environment override"
        );
      }
    }

    if let Some(locale) =
      locales.into_iter().flatten().next()
    {
      debug!(%locale, "host locale");
      self.locale = Some(locale);
    }
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      debug!(key = %k, value = %v, "applying override");
      self.set(&k, &v)?;
    }
    Ok(())
  }

  /// Sets one key, with or without its `calendar.` prefix.
  pub fn set(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<()> {
    let key = key.trim();
    let key = key
      .strip_prefix("calendar.")
      .unwrap_or(key);
    let value = value.trim();

    match key {
      | "timezone" => {
        self.calendar.timezone =
          Some(value.to_string());
      }
      | "first_day" => {
        self.calendar.first_day =
          Some(value.parse().with_context(
            || {
              format!(
                "invalid first_day: \
                 {value}"
              )
            }
          )?);
      }
      | "step" => {
        self.calendar.step = Some(
          value.parse().with_context(
            || {
              format!(
                "invalid step: {value}"
              )
            }
          )?
        );
      }
      | "view" => {
        self.calendar.view =
          Some(value.parse()?);
      }
      | "min_view" => {
        self.calendar.min_view =
          Some(value.parse()?);
      }
      | "max_view" => {
        self.calendar.max_view =
          Some(value.parse()?);
      }
      | "format" => {
        self.calendar.format =
          Some(value.to_string());
      }
      | other => {
        return Err(anyhow!(
          "unknown config key: {other}"
        ));
      }
    }
    Ok(())
  }

  /// Builds the calendar parameters. An unknown timezone is an error.
  /// Without a usable `first_day` the host locale decides, then Sunday.
  pub fn settings(
    &self
  ) -> anyhow::Result<CalendarSettings> {
    let zone = match self
      .calendar
      .timezone
      .as_deref()
    {
      | Some(raw) => raw
        .parse::<Zone>()
        .context("invalid timezone")?,
      | None => Zone::Local
    };

    let fallback = self
      .locale
      .as_deref()
      .and_then(first_day_for_locale)
      .unwrap_or(DEFAULT_FIRST_DAY);
    let first_day = match self
      .calendar
      .first_day
    {
      | Some(idx) => {
        weekday_from_index(idx)
          .unwrap_or_else(|| {
            warn!(
              first_day = idx,
              "first_day must be 0..=6; \
               using default"
            );
            fallback
          })
      }
      | None => fallback
    };

    CalendarSettings::new(zone)
      .with_first_day(first_day)
      .with_step(
        self
          .calendar
          .step
          .unwrap_or(DEFAULT_STEP)
      )
  }

  pub fn view_chain(
    &self
  ) -> anyhow::Result<ViewChain> {
    ViewChain::new(
      self
        .calendar
        .max_view
        .unwrap_or(Granularity::Year),
      self
        .calendar
        .min_view
        .unwrap_or(Granularity::Minutes)
    )
  }

  pub fn value_format(
    &self
  ) -> anyhow::Result<ValueFormat> {
    match self.calendar.format.as_deref()
    {
      | Some(raw) => ValueFormat::new(raw),
      | None => Ok(ValueFormat::default())
    }
  }

  pub fn initial_view(
    &self
  ) -> Granularity {
    self
      .calendar
      .view
      .unwrap_or(Granularity::Date)
  }
}

fn merge<T>(
  slot: &mut Option<T>,
  value: Option<T>
) {
  if value.is_some() {
    *slot = value;
  }
}

fn resolve_config_path(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(path.to_path_buf());
  }

  if let Ok(raw) =
    std::env::var(CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  let local = std::env::current_dir()
    .ok()
    .map(|dir| dir.join(CONFIG_FILE))
    .filter(|path| path.exists());
  if local.is_some() {
    return local;
  }

  dirs::config_dir()
    .map(|dir| {
      dir
        .join("pickgrid")
        .join(CONFIG_FILE)
    })
    .filter(|path| path.exists())
}

#[cfg(test)]
mod tests {
  use std::fs;

  use chrono::Weekday;
  use tempfile::tempdir;

  use super::Config;
  use crate::granularity::Granularity;
  use crate::zone::Zone;

  fn write_config(body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("pickgrid.toml");
    fs::write(&path, body).expect("write config");
    (dir, path)
  }

  #[test]
  fn loads_calendar_section() {
    let (_dir, path) = write_config(
      "[calendar]\n\
       timezone = \"Europe/Berlin\"\n\
       first_day = 1\n\
       step = 15\n\
       view = \"hours\"\n\
       max_view = \"month\"\n\
       format = \"%d.%m.%Y %H:%M\"\n",
    );
    let mut cfg = Config::default();
    cfg.load_file(&path).expect("load config");

    let settings = cfg.settings().expect("settings");
    assert_eq!(settings.zone, "Europe/Berlin".parse::<Zone>().expect("zone"));
    assert_eq!(settings.first_day, Weekday::Mon);
    assert_eq!(settings.step, 15);
    assert_eq!(cfg.initial_view(), Granularity::Hours);
    assert_eq!(
      cfg.view_chain().expect("chain").views().first(),
      Some(&Granularity::Month)
    );
    assert_eq!(
      cfg.value_format().expect("format").pattern(),
      "%d.%m.%Y %H:%M"
    );
    assert_eq!(cfg.loaded_files, vec![path]);
  }

  #[test]
  fn top_level_timezone_is_accepted() {
    let (_dir, path) = write_config("timezone = \"Asia/Tokyo\"\n");
    let mut cfg = Config::default();
    cfg.load_file(&path).expect("load config");
    assert_eq!(cfg.calendar.timezone.as_deref(), Some("Asia/Tokyo"));
  }

  #[test]
  fn unknown_keys_are_rejected() {
    let (_dir, path) = write_config("[calendar]\nweek_start = 1\n");
    let mut cfg = Config::default();
    assert!(cfg.load_file(&path).is_err());
    assert!(cfg.set("calendar.colour", "red").is_err());
  }

  #[test]
  fn overrides_and_env_layer_over_file() {
    let (_dir, path) = write_config("[calendar]\nstep = 10\nfirst_day = 2\n");
    let mut cfg = Config::default();
    cfg.load_file(&path).expect("load config");

    cfg.apply_env(vec![
      ("PICKGRID_STEP".to_string(), "20".to_string()),
      ("PICKGRID_FIRST_DAY".to_string(), "monday".to_string()),
      ("HOME".to_string(), "/tmp".to_string()),
    ]);
    assert_eq!(cfg.calendar.step, Some(20));
    assert_eq!(cfg.calendar.first_day, Some(2));

    cfg.apply_overrides(vec![
      ("calendar.step".to_string(), "30".to_string()),
      ("view".to_string(), "minutes".to_string()),
    ])
    .expect("apply overrides");
    assert_eq!(cfg.settings().expect("settings").step, 30);
    assert_eq!(cfg.initial_view(), Granularity::Minutes);
    assert!(cfg.apply_overrides(vec![("step".to_string(), "x".to_string())]).is_err());
  }

  #[test]
  fn out_of_range_first_day_uses_default() {
    let mut cfg = Config::default();
    cfg.set("first_day", "9").expect("set");
    assert_eq!(cfg.settings().expect("settings").first_day, Weekday::Sun);
  }

  #[test]
  fn first_day_follows_the_host_locale() {
    let mut cfg = Config::default();
    cfg.apply_env(vec![
      ("LANG".to_string(), "en_US.UTF-8".to_string()),
      ("LC_ALL".to_string(), "de_DE.UTF-8".to_string()),
    ]);
    assert_eq!(cfg.locale.as_deref(), Some("de_DE.UTF-8"));
    assert_eq!(cfg.settings().expect("settings").first_day, Weekday::Mon);

    cfg.set("first_day", "0").expect("set");
    assert_eq!(cfg.settings().expect("settings").first_day, Weekday::Sun);

    let mut cfg = Config::default();
    cfg.apply_env(vec![
      ("LC_ALL".to_string(), String::new()),
      ("LANG".to_string(), "C.UTF-8".to_string()),
    ]);
    assert_eq!(cfg.settings().expect("settings").first_day, Weekday::Sun);
  }

  #[test]
  fn invalid_settings_are_errors() {
    let mut cfg = Config::default();
    cfg.set("timezone", "Nowhere/Special").expect("set");
    assert!(cfg.settings().is_err());

    let mut cfg = Config::default();
    cfg.set("step", "0").expect("set");
    assert!(cfg.settings().is_err());

    let mut cfg = Config::default();
    assert_eq!(
      cfg.value_format().expect("default format").pattern(),
      "%Y-%m-%d %H:%M"
    );
    cfg.set("format", "%Y-%J").expect("set");
    assert!(cfg.value_format().is_err());

    let mut cfg = Config::default();
    cfg.set("max_view", "minutes").expect("set");
    cfg.set("min_view", "year").expect("set");
    assert!(cfg.view_chain().is_err());
  }
}
