use std::io::{self, IsTerminal, Write};

use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::granularity::Granularity;
use crate::picker::{GridItem, Page};
use crate::value::ValueCheck;
use crate::zone::{Instant, Zone};

/// Prints computed pages as aligned text rows or JSON.
#[derive(Debug, Clone)]
pub struct Reporter {
    color: bool,
}

impl Reporter {
    pub fn new(color: bool) -> Self {
        Self {
            color: color && io::stdout().is_terminal(),
        }
    }

    #[tracing::instrument(skip(self, writer, page), fields(view = %page.view))]
    pub fn write_page<W: Write>(&self, mut writer: W, page: &Page) -> anyhow::Result<()> {
        writeln!(writer, "{}", page.title)?;

        let cells: Vec<String> = page.items.iter().map(|item| self.cell(item)).collect();
        let header = page.weekdays.clone();
        let width = cells
            .iter()
            .chain(header.iter())
            .map(|cell| UnicodeWidthStr::width(strip_ansi(cell).as_str()))
            .max()
            .unwrap_or(0);

        if !header.is_empty() {
            write_row(&mut writer, &header, width)?;
        }
        for row in cells.chunks(columns(page.view)) {
            write_row(&mut writer, row, width)?;
        }
        Ok(())
    }

    pub fn write_json<W: Write, T: Serialize + ?Sized>(
        &self,
        mut writer: W,
        value: &T,
    ) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(&mut writer, value)?;
        writeln!(writer)?;
        Ok(())
    }

    /// One line describing a checked value.
    pub fn write_check<W: Write>(
        &self,
        mut writer: W,
        check: &ValueCheck,
        zone: &Zone,
    ) -> anyhow::Result<()> {
        let line = match check {
            ValueCheck::Empty => self.paint("empty", "2"),
            ValueCheck::Valid { value, text } => {
                format!("{} {text} ({value})", self.paint("valid", "32"))
            }
            ValueCheck::Invalid { reason } => format!("{} {reason}", self.paint("invalid", "31")),
            ValueCheck::OutOfRange { value, bounds } => {
                let show = |limit: Option<Instant>| {
                    limit.map_or_else(|| "-".to_string(), |i| zone.to_zone(&i).to_rfc3339())
                };
                format!(
                    "{} {} not within [{}, {}]",
                    self.paint("out of range", "31"),
                    zone.to_zone(value).to_rfc3339(),
                    show(bounds.min),
                    show(bounds.max),
                )
            }
        };
        writeln!(writer, "{line}")?;
        Ok(())
    }

    /// `[x]` active, `x*` now, `(x)` outside the month, `~x` not selectable.
    fn cell(&self, item: &GridItem) -> String {
        let mut text = item.label.clone();
        if item.active {
            text = format!("[{text}]");
        }
        if item.now {
            text.push('*');
        }
        if item.disabled {
            text = format!("({text})");
        }
        if !item.selectable {
            text = format!("~{text}");
        }

        if !item.selectable {
            self.paint(&text, "31")
        } else if item.active {
            self.paint(&text, "7")
        } else if item.now {
            self.paint(&text, "33")
        } else if item.disabled {
            self.paint(&text, "2")
        } else {
            text
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn columns(view: Granularity) -> usize {
    match view {
        Granularity::Date => 7,
        Granularity::Minutes => 6,
        _ => 4,
    }
}

fn write_row<W: Write>(writer: &mut W, row: &[String], width: usize) -> anyhow::Result<()> {
    let mut line = String::new();
    for cell in row {
        let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
        let padding = width.saturating_sub(visible_width);
        line.push_str(&" ".repeat(padding));
        line.push_str(cell);
        line.push(' ');
    }
    writeln!(writer, "{}", line.trim_end())?;
    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
