use crate::index::reader::SearchTable;
use crate::index::types::{PageKind, Section};
use ahash::{AHashMap, AHashSet};
use serde::Serialize;
use std::io::{self, Write};

/// Number of owners listed in the summary
const TOP_OWNERS: usize = 10;

/// Summary figures for a loaded table
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableStats {
    pub records: usize,
    pub locations: usize,
    pub distinct_keys: usize,
    /// Keys appearing in more than one record
    pub duplicate_keys: usize,
    /// Records with more than one location
    pub overloaded_records: usize,
    pub shards: Vec<ShardStats>,
    pub skipped_shards: usize,
    pub sections: Vec<(String, usize)>,
    pub page_kinds: Vec<(PageKind, usize)>,
    pub top_owners: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShardStats {
    pub shard: String,
    pub letter: Option<char>,
    pub records: usize,
}

/// Compute statistics over a table
pub fn compute_stats(table: &SearchTable) -> TableStats {
    let mut key_counts: AHashMap<&str, usize> = AHashMap::new();
    let mut section_counts: Vec<(String, usize)> = Vec::new();
    let mut kind_counts: AHashMap<PageKind, usize> = AHashMap::new();
    let mut owner_counts: AHashMap<&str, usize> = AHashMap::new();
    let mut locations = 0;
    let mut overloaded = 0;

    for record in table.records() {
        *key_counts.entry(record.key.as_str()).or_insert(0) += 1;
        locations += record.locations.len();
        if record.is_overloaded() {
            overloaded += 1;
        }

        let section = record
            .section()
            .map(|s| s.name().to_string())
            .unwrap_or_else(|| "-".to_string());
        // Sections arrive grouped in table order
        match section_counts.last_mut() {
            Some((name, count)) if *name == section => *count += 1,
            _ => section_counts.push((section, 1)),
        }

        // Count each owner once per record
        let mut seen_owners = AHashSet::new();
        for location in &record.locations {
            *kind_counts.entry(location.page_kind()).or_insert(0) += 1;
            let owner = location.owner();
            if !owner.is_empty() && seen_owners.insert(owner) {
                *owner_counts.entry(owner).or_insert(0) += 1;
            }
        }
    }

    let mut page_kinds: Vec<(PageKind, usize)> = kind_counts.into_iter().collect();
    page_kinds.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| format!("{:?}", a.0).cmp(&format!("{:?}", b.0))));

    let mut top_owners: Vec<(String, usize)> = owner_counts
        .into_iter()
        .map(|(owner, count)| (owner.to_string(), count))
        .collect();
    top_owners.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_owners.truncate(TOP_OWNERS);

    let shards = table
        .shards()
        .iter()
        .map(|shard| ShardStats {
            shard: shard.id.to_string(),
            letter: table.catalog().and_then(|c| c.letter(&shard.id)),
            records: shard.records,
        })
        .collect();

    TableStats {
        records: table.len(),
        locations,
        distinct_keys: key_counts.len(),
        duplicate_keys: key_counts.values().filter(|&&n| n > 1).count(),
        overloaded_records: overloaded,
        shards,
        skipped_shards: table.skipped().len(),
        sections: section_counts,
        page_kinds,
        top_owners,
    }
}

/// Display table statistics
pub fn show_stats(table: &SearchTable, out: &mut impl Write) -> io::Result<()> {
    let stats = compute_stats(table);

    writeln!(out, "Search Index Statistics")?;
    writeln!(out, "=======================")?;
    writeln!(out)?;
    if let Some(dir) = table.search_dir() {
        writeln!(out, "Search directory: {}", dir.display())?;
    }
    writeln!(out, "Records:          {}", stats.records)?;
    writeln!(out, "Locations:        {}", stats.locations)?;
    writeln!(out, "Distinct keys:    {}", stats.distinct_keys)?;
    writeln!(out, "Duplicate keys:   {}", stats.duplicate_keys)?;
    writeln!(out, "Overloaded:       {}", stats.overloaded_records)?;
    writeln!(out, "Shards:           {}", stats.shards.len())?;
    if stats.skipped_shards > 0 {
        writeln!(out, "Skipped shards:   {}", stats.skipped_shards)?;
    }

    writeln!(out)?;
    writeln!(out, "Records by section:")?;
    for (section, count) in &stats.sections {
        let label = table
            .catalog()
            .and_then(|c| c.label(&Section::from_name(section)))
            .unwrap_or(section.as_str());
        writeln!(out, "  {:15} {}", label, count)?;
    }

    writeln!(out)?;
    writeln!(out, "Records by shard:")?;
    for shard in &stats.shards {
        match shard.letter {
            Some(letter) => writeln!(out, "  {:15} {:>5}  ({})", shard.shard, shard.records, letter)?,
            None => writeln!(out, "  {:15} {:>5}", shard.shard, shard.records)?,
        }
    }

    writeln!(out)?;
    writeln!(out, "Locations by page kind:")?;
    for (kind, count) in &stats.page_kinds {
        writeln!(out, "  {:15} {}", format!("{:?}", kind), count)?;
    }

    if !stats.top_owners.is_empty() {
        writeln!(out)?;
        writeln!(out, "Most documented owners:")?;
        for (owner, count) in &stats.top_owners {
            writeln!(out, "  {:30} {}", owner, count)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::{Location, SearchRecord, ShardId};

    fn table() -> SearchTable {
        let shard = ShardId {
            section: Section::All,
            number: 0x11,
        };
        SearchTable::from_records(vec![
            SearchRecord::new(
                "renderelement",
                "renderElement",
                vec![
                    Location::from_url("../class_button.html#a15", true, "Button::renderElement()"),
                    Location::from_url("../class_label.html#a98", true, "Label::renderElement()"),
                ],
            )
            .with_origin(shard.clone()),
            SearchRecord::new(
                "redo",
                "redo",
                vec![Location::from_url("../class_button.html#a12", true, "Button")],
            )
            .with_origin(shard.clone()),
            SearchRecord::new(
                "redo",
                "redo",
                vec![Location::from_url("../struct_redo.html", true, "")],
            )
            .with_origin(shard),
        ])
    }

    #[test]
    fn test_compute_counts() {
        let stats = compute_stats(&table());
        assert_eq!(stats.records, 3);
        assert_eq!(stats.locations, 4);
        assert_eq!(stats.distinct_keys, 2);
        assert_eq!(stats.duplicate_keys, 1);
        assert_eq!(stats.overloaded_records, 1);
        assert_eq!(stats.sections, vec![("all".to_string(), 3)]);
    }

    #[test]
    fn test_compute_owners_and_kinds() {
        let stats = compute_stats(&table());
        assert_eq!(stats.top_owners[0], ("Button".to_string(), 2));
        assert_eq!(stats.page_kinds[0], (PageKind::Class, 3));
    }

    #[test]
    fn test_show_stats_output() {
        let mut out = Vec::new();
        show_stats(&table(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Records:          3"));
        assert!(text.contains("Button"));
    }
}
