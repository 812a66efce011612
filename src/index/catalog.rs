use crate::index::parser::{parse_declarations, ParseError, Value};
use crate::index::types::{Section, ShardId};
use serde::Serialize;
use std::collections::BTreeMap;

/// One section listed in `searchdata.js`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogSection {
    pub index: usize,
    pub section: Section,
    pub label: String,
    /// Initial letters with content, one per shard, in shard order
    pub letters: Vec<char>,
}

/// Section catalog read from Doxygen's `searchdata.js`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    sections: Vec<CatalogSection>,
}

impl Catalog {
    pub fn sections(&self) -> &[CatalogSection] {
        &self.sections
    }

    pub fn get(&self, section: &Section) -> Option<&CatalogSection> {
        self.sections.iter().find(|s| &s.section == section)
    }

    /// Ordering rank of a section; falls back to Doxygen's default order
    pub fn rank(&self, section: &Section) -> usize {
        match self.get(section) {
            Some(entry) => entry.index,
            None => self.sections.len().saturating_add(section.default_rank()),
        }
    }

    /// Initial letter stored in a shard, if the catalog lists it
    pub fn letter(&self, shard: &ShardId) -> Option<char> {
        self.get(&shard.section)?
            .letters
            .get(shard.number as usize)
            .copied()
    }

    pub fn label(&self, section: &Section) -> Option<&str> {
        self.get(section).map(|s| s.label.as_str())
    }
}

/// Parse `searchdata.js`. Missing tables are treated as empty.
pub fn parse_catalog(src: &str) -> Result<Catalog, ParseError> {
    let mut names = BTreeMap::new();
    let mut labels = BTreeMap::new();
    let mut contents = BTreeMap::new();

    for (name, value) in parse_declarations(src)? {
        let (target, table) = match name.as_str() {
            "indexSectionNames" => (&mut names, "indexSectionNames"),
            "indexSectionLabels" => (&mut labels, "indexSectionLabels"),
            "indexSectionsWithContent" => (&mut contents, "indexSectionsWithContent"),
            _ => continue,
        };
        *target = indexed_strings(table, value)?;
    }

    let sections = names
        .into_iter()
        .map(|(index, name)| {
            let section = Section::from_name(&name);
            let label = labels
                .get(&index)
                .cloned()
                .unwrap_or_else(|| section.name().to_string());
            let letters = contents
                .get(&index)
                .map(|s: &String| s.chars().collect())
                .unwrap_or_default();
            CatalogSection {
                index,
                section,
                label,
                letters,
            }
        })
        .collect();

    Ok(Catalog { sections })
}

/// Read an object literal of the form `{ 0: "text", 1: "text" }`
fn indexed_strings(
    table: &'static str,
    value: Value,
) -> Result<BTreeMap<usize, String>, ParseError> {
    let Value::Object(fields) = value else {
        return Err(ParseError::WrongType(table, "an object"));
    };

    let mut out = BTreeMap::new();
    for (key, value) in fields {
        let Ok(index) = key.parse::<usize>() else {
            continue;
        };
        if let Value::Str(text) = value {
            out.insert(index, text);
        }
    }
    Ok(out)
}
