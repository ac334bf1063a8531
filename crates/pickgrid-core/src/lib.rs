pub mod cli;
pub mod compare;
pub mod config;
pub mod date_range;
pub mod granularity;
pub mod grid;
pub mod parse;
pub mod picker;
pub mod range;
pub mod report;
pub mod settings;
pub mod value;
pub mod zone;

use std::ffi::OsString;
use std::io::{
  self,
  Write
};

use anyhow::{
  Context,
  anyhow
};
use clap::Parser;
use tracing::{
  debug,
  info
};

use crate::date_range::{
  DateRangePicker,
  RangeSide
};
use crate::picker::Picker;
use crate::range::Bounds;
use crate::zone::Instant;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting pickgrid"
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg
    .apply_overrides(
      cli.config_overrides()
    )
    .context(
      "failed to apply command line \
       overrides"
    )?;

  let settings = cfg.settings()?;
  let chain = cfg.view_chain()?;
  let view = cfg.initial_view();
  let zone = settings.zone;
  debug!(?settings, ?chain, %view, "resolved calendar settings");

  let now = match cli.now.as_deref() {
    | Some(raw) => {
      parse::parse_instant(
        raw,
        &zone,
        &zone.now()
      )
      .context("invalid --now")?
    }
    | None => zone.now()
  };
  let parse_opt = |raw: Option<&str>,
                   flag: &str|
   -> anyhow::Result<Option<Instant>> {
    raw
      .map(|raw| {
        parse::parse_instant(
          raw, &zone, &now
        )
        .with_context(|| {
          format!("invalid {flag}")
        })
      })
      .transpose()
  };

  let reference =
    parse::reference_or_now(
      cli.date.as_deref(),
      &zone,
      &now
    );
  let bounds = Bounds::new(
    parse_opt(
      cli.min.as_deref(),
      "--min"
    )?,
    parse_opt(
      cli.max.as_deref(),
      "--max"
    )?
  )?;

  let reporter =
    report::Reporter::new(!cli.no_color);
  let mut out = io::stdout().lock();

  if let Some(text) = cli.value.as_deref()
  {
    let format = cfg.value_format()?;
    let check =
      format.check(text, &zone, &bounds);
    info!(
      format = format.pattern(),
      accepted = check.is_accepted(),
      "checked value"
    );
    if cli.json {
      reporter.write_json(&mut out, &check)?;
    } else {
      reporter.write_check(
        &mut out, &check, &zone
      )?;
    }
    if !check.is_accepted() {
      return Err(anyhow!(
        "value rejected: {text}"
      ));
    }
    return Ok(());
  }

  let pages = match parse_opt(
    cli.until.as_deref(),
    "--until"
  )? {
    | Some(until) => {
      let range = DateRangePicker::new(
        settings,
        chain,
        view,
        Some(reference),
        Some(until),
        bounds,
        &now
      );
      vec![
        range.page(
          RangeSide::Start,
          &now
        ),
        range.page(RangeSide::End, &now),
      ]
    }
    | None => {
      let selected = parse_opt(
        cli.selected.as_deref(),
        "--selected"
      )?;
      let mut picker = Picker::new(
        settings, chain, view, selected,
        bounds, &now
      );
      if cli.date.is_some() {
        picker.set_date(&reference);
      }
      vec![picker.page(&now)]
    }
  };

  if cli.json {
    reporter.write_json(&mut out, &pages)?;
  } else {
    for (idx, page) in
      pages.iter().enumerate()
    {
      if idx > 0 {
        writeln!(out)?;
      }
      reporter.write_page(&mut out, page)?;
    }
  }

  info!(pages = pages.len(), "done");
  Ok(())
}
