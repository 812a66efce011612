use crate::index::catalog::{parse_catalog, Catalog};
use crate::index::parser::parse_search_data;
use crate::index::types::*;
use crate::utils::encode_search_id;
use ahash::AHashMap;
use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of Doxygen's section catalog inside the search directory
pub const CATALOG_FILE: &str = "searchdata.js";

/// Files in the search directory that look like shards but are not
const NON_SHARD_FILES: &[&str] = &[CATALOG_FILE, "search.js", "search_index.js"];

const SEARCH_DATA_DECL: &[u8] = b"var searchData";

/// Options controlling how a table is loaded
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Only load these sections (empty = all)
    pub sections: Vec<Section>,
    /// Fail on the first unreadable shard instead of skipping it
    pub strict: bool,
}

/// A shard that was loaded into the table
#[derive(Debug, Clone)]
pub struct ShardInfo {
    pub id: ShardId,
    pub path: PathBuf,
    pub records: usize,
}

/// A shard that could not be loaded (lenient mode only)
#[derive(Debug, Clone)]
pub struct SkippedShard {
    pub path: PathBuf,
    pub reason: String,
}

/// The immutable, ordered search table
#[derive(Debug, Clone, Default)]
pub struct SearchTable {
    records: Vec<SearchRecord>,
    catalog: Option<Catalog>,
    search_dir: Option<PathBuf>,
    shards: Vec<ShardInfo>,
    skipped: Vec<SkippedShard>,
}

impl SearchTable {
    /// Build a table from records already in table order
    pub fn from_records(records: Vec<SearchRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    /// Load a table from a shard file, a search directory, an HTML
    /// directory containing `search/`, or a docs root containing `html/search/`
    pub fn open(path: &Path, options: &LoadOptions) -> Result<Self> {
        if path.is_file() {
            return Self::open_shard_file(path, options);
        }

        let search_dir = find_search_dir(path)?;
        debug!("Loading search index from {}", search_dir.display());

        let catalog = load_catalog(&search_dir, options.strict)?;
        let mut shard_paths = discover_shards(&search_dir, &options.sections)?;

        if shard_paths.is_empty() {
            bail!("No search shards found in {}", search_dir.display());
        }

        shard_paths.sort_by(|(a, pa), (b, pb)| {
            let rank_a = shard_rank(catalog.as_ref(), a);
            let rank_b = shard_rank(catalog.as_ref(), b);
            rank_a
                .cmp(&rank_b)
                .then_with(|| a.section.name().cmp(b.section.name()))
                .then_with(|| a.number.cmp(&b.number))
                .then_with(|| pa.cmp(pb))
        });

        // Parse in parallel; collect keeps shard order
        let parsed: Vec<(ShardId, PathBuf, Result<Vec<SearchRecord>>)> = shard_paths
            .into_par_iter()
            .map(|(id, path)| {
                let result = load_shard(&path);
                (id, path, result)
            })
            .collect();

        let mut table = SearchTable {
            catalog,
            search_dir: Some(search_dir),
            ..Self::default()
        };

        for (id, path, result) in parsed {
            match result {
                Ok(records) => {
                    debug!("Loaded {} records from {}", records.len(), path.display());
                    table.shards.push(ShardInfo {
                        id: id.clone(),
                        path,
                        records: records.len(),
                    });
                    table
                        .records
                        .extend(records.into_iter().map(|r| r.with_origin(id.clone())));
                }
                Err(e) if options.strict => return Err(e),
                Err(e) => {
                    warn!("Skipping {}: {:#}", path.display(), e);
                    table.skipped.push(SkippedShard {
                        path,
                        reason: format!("{:#}", e),
                    });
                }
            }
        }

        if table.shards.is_empty() {
            bail!(
                "None of the {} search shards could be loaded",
                table.skipped.len()
            );
        }

        info!(
            "Loaded {} records from {} shards",
            table.records.len(),
            table.shards.len()
        );

        Ok(table)
    }

    fn open_shard_file(path: &Path, options: &LoadOptions) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let id = ShardId::from_file_name(file_name).unwrap_or(ShardId {
            section: Section::All,
            number: 0,
        });
        if !options.sections.is_empty() && !options.sections.contains(&id.section) {
            bail!(
                "{} belongs to section '{}', which is not among the requested sections",
                path.display(),
                id.section
            );
        }

        let records = load_shard(path)?;

        Ok(SearchTable {
            shards: vec![ShardInfo {
                id: id.clone(),
                path: path.to_path_buf(),
                records: records.len(),
            }],
            records: records.into_iter().map(|r| r.with_origin(id.clone())).collect(),
            catalog: None,
            search_dir: path.parent().map(Path::to_path_buf),
            skipped: Vec::new(),
        })
    }

    pub fn records(&self) -> &[SearchRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&SearchRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    /// Directory holding the shards; page references resolve against it
    pub fn search_dir(&self) -> Option<&Path> {
        self.search_dir.as_deref()
    }

    pub fn shards(&self) -> &[ShardInfo] {
        &self.shards
    }

    pub fn skipped(&self) -> &[SkippedShard] {
        &self.skipped
    }

    /// Local file for a location's page, when the table was loaded from disk
    pub fn resolve(&self, location: &Location) -> Option<PathBuf> {
        self.search_dir.as_deref().map(|dir| location.resolve(dir))
    }

    /// Records whose key equals `key`, given either mangled or as a plain name
    pub fn find_key<'a>(&'a self, key: &str) -> impl Iterator<Item = (usize, &'a SearchRecord)> + 'a {
        let mangled = encode_search_id(key);
        let plain = key.to_lowercase();
        let raw = key.to_string();
        self.records.iter().enumerate().filter(move |(_, r)| {
            r.key == raw || r.key == mangled || r.search_key == plain
        })
    }

    /// Aggregate records sharing a key into their first occurrence.
    /// Table order of first occurrences is kept; repeated locations are dropped.
    pub fn merged(&self) -> SearchTable {
        let mut positions: AHashMap<&str, usize> = AHashMap::with_capacity(self.records.len());
        let mut records: Vec<SearchRecord> = Vec::with_capacity(self.records.len());

        for record in &self.records {
            match positions.get(record.key.as_str()) {
                Some(&pos) => {
                    let target = &mut records[pos];
                    for location in &record.locations {
                        if !target.locations.contains(location) {
                            target.locations.push(location.clone());
                        }
                    }
                }
                None => {
                    positions.insert(record.key.as_str(), records.len());
                    records.push(record.clone());
                }
            }
        }

        SearchTable {
            records,
            catalog: self.catalog.clone(),
            search_dir: self.search_dir.clone(),
            shards: self.shards.clone(),
            skipped: self.skipped.clone(),
        }
    }
}

fn shard_rank(catalog: Option<&Catalog>, id: &ShardId) -> usize {
    match catalog {
        Some(catalog) => catalog.rank(&id.section),
        None => id.section.default_rank(),
    }
}

/// Locate the directory that holds the shard files
pub fn find_search_dir(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        bail!("Path does not exist: {}", path.display());
    }

    // Nested search directories first: an html/ directory also holds
    // navtree scripts named like shards (`class_bed.js`)
    let candidates = [
        path.join("search"),
        path.join("html").join("search"),
        path.join("docs").join("html").join("search"),
        path.to_path_buf(),
    ];

    for candidate in &candidates {
        if candidate.is_dir() && looks_like_search_dir(candidate)? {
            return Ok(candidate.clone());
        }
    }

    bail!(
        "No Doxygen search index found under {} (looked for search/, html/search/, docs/html/search/)",
        path.display()
    )
}

fn looks_like_search_dir(dir: &Path) -> Result<bool> {
    if dir.join(CATALOG_FILE).is_file() {
        return Ok(true);
    }
    let shards = discover_shards(dir, &[])?;
    Ok(shards.iter().any(|(_, path)| declares_search_data(path)))
}

/// Whether a script declares `searchData`, as every Doxygen shard does
fn declares_search_data(path: &Path) -> bool {
    match fs::read(path) {
        Ok(bytes) => memchr::memmem::find(&bytes, SEARCH_DATA_DECL).is_some(),
        Err(_) => false,
    }
}

fn shard_globs(sections: &[Section]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    if sections.is_empty() {
        builder.add(Glob::new("*_*.js")?);
    } else {
        for section in sections {
            builder.add(Glob::new(&format!("{}_*.js", section.name()))?);
        }
    }
    Ok(builder.build()?)
}

/// List shard files in a search directory, unordered
fn discover_shards(dir: &Path, sections: &[Section]) -> Result<Vec<(ShardId, PathBuf)>> {
    let globs = shard_globs(sections)?;
    let mut shards = Vec::new();

    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if NON_SHARD_FILES.contains(&file_name) || !globs.is_match(file_name) {
            continue;
        }

        match ShardId::from_file_name(file_name) {
            Some(id) => shards.push((id, path)),
            None => debug!("Ignoring {}: not a shard file name", path.display()),
        }
    }

    Ok(shards)
}

fn load_shard(path: &Path) -> Result<Vec<SearchRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_search_data(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn load_catalog(search_dir: &Path, strict: bool) -> Result<Option<Catalog>> {
    let path = search_dir.join(CATALOG_FILE);
    if !path.is_file() {
        return Ok(None);
    }

    let parsed = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))
        .and_then(|content| {
            parse_catalog(&content).with_context(|| format!("Failed to parse {}", path.display()))
        });

    match parsed {
        Ok(catalog) => Ok(Some(catalog)),
        Err(e) if strict => Err(e),
        Err(e) => {
            warn!("Ignoring section catalog: {:#}", e);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        let search = temp.path().join("html").join("search");
        fs::create_dir_all(&search).unwrap();

        write(
            &search,
            "all_11.js",
            "var searchData=[['redo',['redo',['../class_level_editor___module.html#a12',1,'LevelEditor_Module']]]];",
        );
        write(
            &search,
            "all_6.js",
            "var searchData=[['gamestate',['GameState',['../class_game_state.html',1,'GameState']]],['generateid',['generateID',['../class_material_manager.html#abc',1,'MaterialManager']]]];",
        );
        write(
            &search,
            "functions_6.js",
            "var searchData=[['generateid',['generateID',['../class_material_manager.html#abc',1,'MaterialManager']]]];",
        );
        write(&search, "search.js", "function SearchBox() {}");
        temp
    }

    #[test]
    fn test_open_docs_root_orders_shards() {
        let temp = fixture();
        let table = SearchTable::open(temp.path(), &LoadOptions::default()).unwrap();

        let keys: Vec<&str> = table.records().iter().map(|r| r.key.as_str()).collect();
        // all_6 before all_11 (hex order), "all" before "functions"
        assert_eq!(keys, vec!["gamestate", "generateid", "redo", "generateid"]);
        assert_eq!(table.shards().len(), 3);
        assert!(table.search_dir().unwrap().ends_with("html/search"));
    }

    #[test]
    fn test_open_section_filter() {
        let temp = fixture();
        let options = LoadOptions {
            sections: vec![Section::Functions],
            strict: false,
        };
        let table = SearchTable::open(temp.path(), &options).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records()[0].section(), Some(&Section::Functions));
    }

    #[test]
    fn test_open_single_shard_file() {
        let temp = fixture();
        let path = temp.path().join("html/search/all_6.js");
        let table = SearchTable::open(&path, &LoadOptions::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].origin.as_ref().unwrap().number, 6);
    }

    #[test]
    fn test_single_shard_file_outside_sections_is_rejected() {
        let temp = fixture();
        let path = temp.path().join("html/search/all_6.js");
        let options = LoadOptions {
            sections: vec![Section::Functions],
            strict: false,
        };
        let err = SearchTable::open(&path, &options).unwrap_err();
        assert!(format!("{:#}", err).contains("'all'"));

        let path = temp.path().join("html/search/functions_6.js");
        assert_eq!(SearchTable::open(&path, &options).unwrap().len(), 1);
    }

    #[test]
    fn test_html_dir_with_navtree_scripts() {
        let temp = fixture();
        let html = temp.path().join("html");
        write(&html, "class_bed.js", "var class_bed = [ [ \"Bed\", \"class_bed.html#a1\", null ] ];");
        write(&html, "namespace_a.js", "var namespace_a = [ ];");

        let table = SearchTable::open(&html, &LoadOptions::default()).unwrap();
        assert_eq!(table.len(), 4);
        assert!(table.skipped().is_empty());
        assert!(table.search_dir().unwrap().ends_with("html/search"));
    }

    #[test]
    fn test_navtree_only_dir_is_not_a_search_dir() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "class_bed.js", "var class_bed = [ ];");
        let err = SearchTable::open(temp.path(), &LoadOptions::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("No Doxygen search index"));
    }

    #[test]
    fn test_lenient_skips_bad_shard() {
        let temp = fixture();
        write(&temp.path().join("html/search"), "all_1.js", "var searchData=[['broken'");
        let table = SearchTable::open(temp.path(), &LoadOptions::default()).unwrap();
        assert_eq!(table.skipped().len(), 1);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_strict_fails_on_bad_shard() {
        let temp = fixture();
        write(&temp.path().join("html/search"), "all_1.js", "var searchData=[['broken'");
        let options = LoadOptions {
            sections: Vec::new(),
            strict: true,
        };
        let err = SearchTable::open(temp.path(), &options).unwrap_err();
        assert!(format!("{:#}", err).contains("all_1.js"));
    }

    #[test]
    fn test_catalog_order_overrides_default() {
        let temp = fixture();
        write(
            &temp.path().join("html/search"),
            CATALOG_FILE,
            "var indexSectionNames = { 0: \"functions\", 1: \"all\" };",
        );
        let table = SearchTable::open(temp.path(), &LoadOptions::default()).unwrap();
        assert_eq!(table.records()[0].section(), Some(&Section::Functions));
        assert!(table.catalog().is_some());
    }

    #[test]
    fn test_missing_index_is_error() {
        let temp = TempDir::new().unwrap();
        assert!(SearchTable::open(temp.path(), &LoadOptions::default()).is_err());
    }

    #[test]
    fn test_merged_aggregates_duplicate_keys() {
        let temp = fixture();
        let table = SearchTable::open(temp.path(), &LoadOptions::default()).unwrap();
        let merged = table.merged();

        let keys: Vec<&str> = merged.records().iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["gamestate", "generateid", "redo"]);
        // Identical location from the functions shard is not duplicated
        assert_eq!(merged.records()[1].locations.len(), 1);
    }

    #[test]
    fn test_find_key_accepts_plain_and_mangled() {
        let records = vec![SearchRecord::new(
            "get_5fversion",
            "Get_Version",
            vec![Location::from_url("../class_image___i_o.html#a7", true, "Image_IO")],
        )];
        let table = SearchTable::from_records(records);
        assert_eq!(table.find_key("get_5fversion").count(), 1);
        assert_eq!(table.find_key("Get_Version").count(), 1);
        assert_eq!(table.find_key("get_vers").count(), 0);
    }

    #[test]
    fn test_resolve_location() {
        let temp = fixture();
        let table = SearchTable::open(temp.path(), &LoadOptions::default()).unwrap();
        let location = &table.records()[0].locations[0];
        let resolved = table.resolve(location).unwrap();
        assert!(resolved.ends_with("html/class_game_state.html"));
    }
}
