use crate::utils::{decode_search_id, unescape_html};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Doxygen search section a shard belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Section {
    All,
    Classes,
    Namespaces,
    Files,
    Functions,
    Variables,
    Typedefs,
    Enums,
    EnumValues,
    Related,
    Defines,
    Groups,
    Pages,
    Concepts,
    Properties,
    Events,
    Other(String),
}

impl Section {
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "all" => Section::All,
            "classes" => Section::Classes,
            "namespaces" => Section::Namespaces,
            "files" => Section::Files,
            "functions" => Section::Functions,
            "variables" => Section::Variables,
            "typedefs" => Section::Typedefs,
            "enums" => Section::Enums,
            "enumvalues" => Section::EnumValues,
            "related" => Section::Related,
            "defines" => Section::Defines,
            "groups" => Section::Groups,
            "pages" => Section::Pages,
            "concepts" => Section::Concepts,
            "properties" => Section::Properties,
            "events" => Section::Events,
            other => Section::Other(other.to_string()),
        }
    }

    /// File-name prefix used by Doxygen for this section's shards
    pub fn name(&self) -> &str {
        match self {
            Section::All => "all",
            Section::Classes => "classes",
            Section::Namespaces => "namespaces",
            Section::Files => "files",
            Section::Functions => "functions",
            Section::Variables => "variables",
            Section::Typedefs => "typedefs",
            Section::Enums => "enums",
            Section::EnumValues => "enumvalues",
            Section::Related => "related",
            Section::Defines => "defines",
            Section::Groups => "groups",
            Section::Pages => "pages",
            Section::Concepts => "concepts",
            Section::Properties => "properties",
            Section::Events => "events",
            Section::Other(name) => name,
        }
    }

    /// Position in Doxygen's default section order, used when no catalog is available
    pub fn default_rank(&self) -> usize {
        match self {
            Section::All => 0,
            Section::Classes => 1,
            Section::Namespaces => 2,
            Section::Files => 3,
            Section::Functions => 4,
            Section::Variables => 5,
            Section::Typedefs => 6,
            Section::Enums => 7,
            Section::EnumValues => 8,
            Section::Related => 9,
            Section::Defines => 10,
            Section::Groups => 11,
            Section::Pages => 12,
            Section::Concepts => 13,
            Section::Properties => 14,
            Section::Events => 15,
            Section::Other(_) => usize::MAX,
        }
    }
}

impl From<String> for Section {
    fn from(name: String) -> Self {
        Section::from_name(&name)
    }
}

impl From<Section> for String {
    fn from(section: Section) -> Self {
        section.name().to_string()
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifies the shard file a record was loaded from (`all_11.js` -> all, 0x11)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShardId {
    pub section: Section,
    pub number: u32,
}

impl ShardId {
    /// Parse a shard file name. Doxygen numbers shards in lowercase hex.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(".js")?;
        let (section, number) = stem.rsplit_once('_')?;
        if section.is_empty() || number.is_empty() {
            return None;
        }
        let number = u32::from_str_radix(number, 16).ok()?;
        Some(Self {
            section: Section::from_name(section),
            number,
        })
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{:x}", self.section, self.number)
    }
}

/// Kind of documentation page, derived from Doxygen's file naming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Class,
    Struct,
    Union,
    Namespace,
    File,
    Group,
    Page,
    Other,
}

impl PageKind {
    pub fn from_page(page: &str) -> Self {
        let file = page.rsplit('/').next().unwrap_or(page);
        let stem = file.strip_suffix(".html").unwrap_or(file);

        if stem.starts_with("class_") {
            PageKind::Class
        } else if stem.starts_with("struct_") {
            PageKind::Struct
        } else if stem.starts_with("union_") {
            PageKind::Union
        } else if stem.starts_with("namespace_") {
            PageKind::Namespace
        } else if stem.starts_with("group__") {
            PageKind::Group
        } else if stem.ends_with("_8h")
            || stem.ends_with("_8cpp")
            || stem.ends_with("_8c")
            || stem.ends_with("_8hpp")
            || stem.ends_with("_source")
        {
            PageKind::File
        } else if !stem.is_empty() && !stem.contains('_') {
            PageKind::Page
        } else {
            PageKind::Other
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "class" | "classes" => Some(PageKind::Class),
            "struct" | "structs" => Some(PageKind::Struct),
            "union" | "unions" => Some(PageKind::Union),
            "namespace" | "namespaces" | "ns" => Some(PageKind::Namespace),
            "file" | "files" => Some(PageKind::File),
            "group" | "groups" | "module" => Some(PageKind::Group),
            "page" | "pages" => Some(PageKind::Page),
            "other" => Some(PageKind::Other),
            _ => None,
        }
    }
}

/// One place a symbol is documented
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Page reference relative to the search directory (`../class_engine.html`)
    pub page: String,
    /// In-page fragment without the leading `#`
    pub anchor: Option<String>,
    /// Link opens inside the documentation frame
    pub in_frame: bool,
    /// Owning entity display name, possibly empty
    pub scope: String,
}

impl Location {
    /// Build a location from a raw Doxygen url (`page#anchor`)
    pub fn from_url(url: &str, in_frame: bool, scope: &str) -> Self {
        let (page, anchor) = match url.split_once('#') {
            Some((page, anchor)) if !anchor.is_empty() => (page, Some(anchor.to_string())),
            Some((page, _)) => (page, None),
            None => (url, None),
        };

        Self {
            page: page.to_string(),
            anchor,
            in_frame,
            scope: unescape_html(scope).into_owned(),
        }
    }

    /// The link as written in the index
    pub fn href(&self) -> String {
        match &self.anchor {
            Some(anchor) => format!("{}#{}", self.page, anchor),
            None => self.page.clone(),
        }
    }

    /// Entity that owns this location (`World_Module` for `World_Module::removeComponent(...)`)
    pub fn owner(&self) -> &str {
        match self.scope.find("::") {
            Some(idx) => &self.scope[..idx],
            None => &self.scope,
        }
    }

    pub fn page_kind(&self) -> PageKind {
        PageKind::from_page(&self.page)
    }

    /// Resolve the page to a local file, given the directory holding the shards.
    /// Page references are relative to the search directory.
    pub fn resolve(&self, search_dir: &Path) -> PathBuf {
        let mut resolved = search_dir.to_path_buf();
        for component in Path::new(&self.page).components() {
            match component {
                Component::ParentDir => {
                    resolved.pop();
                }
                Component::CurDir => {}
                other => resolved.push(other.as_os_str()),
            }
        }
        resolved
    }
}

/// One entry of the search table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
    /// Key exactly as stored in the shard (Doxygen-mangled)
    pub key: String,
    /// Decoded, lowercased key that lookups match against
    pub search_key: String,
    /// Display name as it appears in source
    pub name: String,
    pub locations: Vec<Location>,
    pub origin: Option<ShardId>,
}

impl SearchRecord {
    pub fn new(key: &str, name: &str, locations: Vec<Location>) -> Self {
        Self {
            key: key.to_string(),
            search_key: decode_search_id(key).to_lowercase(),
            name: unescape_html(name).into_owned(),
            locations,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: ShardId) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn section(&self) -> Option<&Section> {
        self.origin.as_ref().map(|o| &o.section)
    }

    /// True if the record has more than one location (overloads, multiple owners)
    pub fn is_overloaded(&self) -> bool {
        self.locations.len() > 1
    }
}
