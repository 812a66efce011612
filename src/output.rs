//! Output formatting for lookup results

use crate::index::reader::SearchTable;
use crate::index::types::{Location, PageKind, SearchRecord};
use crate::query::Hit;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use termcolor::{Color, ColorSpec, WriteColor};

/// Print hits as a listing: the name with the match highlighted, then one
/// indented line per location
pub fn print_hits(out: &mut impl WriteColor, table: &SearchTable, hits: &[Hit]) -> io::Result<()> {
    for hit in hits {
        let Some(record) = table.get(hit.index) else {
            continue;
        };

        print_name(out, record, hit.name_span(record))?;

        if let Some(section) = record.section() {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Blue)))?;
            write!(out, "  [{}]", section)?;
            out.reset()?;
        }
        writeln!(out)?;

        for location in &record.locations {
            print_location(out, location)?;
        }
    }

    Ok(())
}

/// Print the record name with the matched range highlighted
fn print_name(
    out: &mut impl WriteColor,
    record: &SearchRecord,
    span: Option<(usize, usize)>,
) -> io::Result<()> {
    let name = record.name.as_str();
    let Some((start, end)) = span else {
        out.set_color(ColorSpec::new().set_bold(true))?;
        write!(out, "{}", name)?;
        return out.reset();
    };

    // Text before match
    if start > 0 {
        out.set_color(ColorSpec::new().set_bold(true))?;
        write!(out, "{}", &name[..start])?;
        out.reset()?;
    }

    // The match itself (highlighted)
    out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
    write!(out, "{}", &name[start..end])?;
    out.reset()?;

    // Text after match
    if end < name.len() {
        out.set_color(ColorSpec::new().set_bold(true))?;
        write!(out, "{}", &name[end..])?;
        out.reset()?;
    }

    Ok(())
}

fn print_location(out: &mut impl WriteColor, location: &Location) -> io::Result<()> {
    write!(out, "    ")?;
    if !location.scope.is_empty() {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(out, "{}", location.scope)?;
        out.reset()?;
        write!(out, "  ")?;
    }
    out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
    writeln!(out, "{}", location.href())?;
    out.reset()
}

/// Print every location of the given records with resolved local paths (for `show`)
pub fn print_resolved(
    out: &mut impl WriteColor,
    table: &SearchTable,
    records: &[&SearchRecord],
) -> io::Result<()> {
    for record in records {
        out.set_color(ColorSpec::new().set_bold(true))?;
        write!(out, "{}", record.name)?;
        out.reset()?;
        match &record.origin {
            Some(origin) => writeln!(out, "  ({}, key {})", origin, record.key)?,
            None => writeln!(out, "  (key {})", record.key)?,
        }

        for location in &record.locations {
            print_location(out, location)?;
            if let Some(path) = table.resolve(location) {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
                write!(out, "      {}", path.display())?;
                out.reset()?;
                if !path.exists() {
                    write!(out, " (missing)")?;
                }
                writeln!(out)?;
            }
        }
    }

    Ok(())
}

/// Print only names (for -l flag), one per hit
pub fn print_names_only(out: &mut impl WriteColor, table: &SearchTable, hits: &[Hit]) -> io::Result<()> {
    for hit in hits {
        if let Some(record) = table.get(hit.index) {
            writeln!(out, "{}", record.name)?;
        }
    }
    Ok(())
}

/// Print the number of matching records (for -c flag)
pub fn print_count(out: &mut impl Write, hits: &[Hit]) -> io::Result<()> {
    writeln!(out, "{}", hits.len())
}

#[derive(Serialize)]
struct JsonHit<'a> {
    key: &'a str,
    name: &'a str,
    section: Option<&'a str>,
    shard: Option<String>,
    span: Option<(usize, usize)>,
    locations: Vec<JsonLocation<'a>>,
}

#[derive(Serialize)]
struct JsonLocation<'a> {
    href: String,
    page: &'a str,
    anchor: Option<&'a str>,
    scope: &'a str,
    in_frame: bool,
    kind: PageKind,
    path: Option<PathBuf>,
}

/// Print hits as a JSON array
pub fn print_json(out: &mut impl Write, table: &SearchTable, hits: &[Hit]) -> anyhow::Result<()> {
    let items: Vec<JsonHit> = hits
        .iter()
        .filter_map(|hit| {
            let record = table.get(hit.index)?;
            Some(JsonHit {
                key: &record.key,
                name: &record.name,
                section: record.section().map(|s| s.name()),
                shard: record.origin.as_ref().map(|o| o.to_string()),
                span: hit.span,
                locations: record
                    .locations
                    .iter()
                    .map(|l| JsonLocation {
                        href: l.href(),
                        page: &l.page,
                        anchor: l.anchor.as_deref(),
                        scope: &l.scope,
                        in_frame: l.in_frame,
                        kind: l.page_kind(),
                        path: table.resolve(l),
                    })
                    .collect(),
            })
        })
        .collect();

    serde_json::to_writer_pretty(&mut *out, &items)?;
    writeln!(out)?;
    Ok(())
}
