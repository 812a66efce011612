use crate::index::reader::{LoadOptions, SearchTable};
use crate::index::types::{Location, SearchRecord};
use crate::query::{literal_hits, parse_query, Hit, QueryExecutor};
use crate::utils::open_page;
use anyhow::Result;
use log::{debug, warn};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Instant;

/// Application mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Search,
    /// Focus is on the locations of the selected record
    Detail,
    Help,
}

/// Table loading state for background loading
pub enum LoadState {
    Loading(Receiver<Result<SearchTable, String>>),
    Ready,
    Failed,
}

/// Settings the TUI needs to (re)load and open pages
#[derive(Debug, Clone)]
pub struct Settings {
    pub docs_path: PathBuf,
    pub load: LoadOptions,
    pub merge: bool,
    pub prefix_match: bool,
    /// Start with the query language off
    pub literal: bool,
    pub browser: String,
}

/// LRU cache size for query results
const SEARCH_CACHE_SIZE: NonZeroUsize = NonZeroUsize::new(64).unwrap();

/// Application state
pub struct App {
    settings: Settings,
    table: Option<SearchTable>,
    pub query: String,
    pub results: Vec<Hit>,
    pub selected: usize,
    /// Selected location within the selected record
    pub location: usize,
    pub mode: Mode,
    /// Match the query as typed, bypassing the query language
    pub literal: bool,
    /// Mode to return to when help closes
    pub previous_mode: Mode,
    pub status_message: String,
    /// Pending key for multi-key commands ('g' for 'gg')
    pub pending_key: Option<char>,
    load_state: LoadState,
    search_cache: LruCache<String, Vec<Hit>>,
}

impl App {
    /// Create the app and start loading the table in the background
    pub fn new(settings: Settings) -> Self {
        let mut app = Self::empty(settings);
        app.start_load();
        app
    }

    /// Create the app around an already loaded table
    pub fn with_table(settings: Settings, table: SearchTable) -> Self {
        let mut app = Self::empty(settings);
        app.install_table(table);
        app
    }

    fn empty(settings: Settings) -> Self {
        Self {
            literal: settings.literal,
            settings,
            table: None,
            query: String::new(),
            results: Vec::new(),
            selected: 0,
            location: 0,
            mode: Mode::Search,
            previous_mode: Mode::Search,
            status_message: String::new(),
            pending_key: None,
            load_state: LoadState::Ready,
            search_cache: LruCache::new(SEARCH_CACHE_SIZE),
        }
    }

    fn start_load(&mut self) {
        let (tx, rx) = mpsc::channel();
        let path = self.settings.docs_path.clone();
        let options = self.settings.load.clone();
        let merge = self.settings.merge;

        thread::spawn(move || {
            let result = SearchTable::open(&path, &options)
                .map(|table| if merge { table.merged() } else { table })
                .map_err(|e| format!("{:#}", e));
            let _ = tx.send(result);
        });

        self.status_message = format!("Loading {}...", self.settings.docs_path.display());
        self.load_state = LoadState::Loading(rx);
    }

    fn install_table(&mut self, table: SearchTable) {
        let mut msg = format!("{} records in {} shards", table.len(), table.shards().len());
        if !table.skipped().is_empty() {
            msg.push_str(&format!(" ({} skipped)", table.skipped().len()));
        }
        self.table = Some(table);
        self.search_cache.clear();
        self.load_state = LoadState::Ready;
        self.execute_search();
        self.status_message = msg;
    }

    /// Check for background load completion (call this in event loop)
    pub fn poll_load(&mut self) {
        let current_state = std::mem::replace(&mut self.load_state, LoadState::Ready);

        match current_state {
            LoadState::Loading(rx) => match rx.try_recv() {
                Ok(Ok(table)) => self.install_table(table),
                Ok(Err(e)) => {
                    warn!("Failed to load search index: {}", e);
                    self.status_message = format!("Load failed: {}", e);
                    self.load_state = LoadState::Failed;
                }
                Err(TryRecvError::Empty) => {
                    self.load_state = LoadState::Loading(rx);
                }
                Err(TryRecvError::Disconnected) => {
                    self.status_message = "Load thread terminated unexpectedly".to_string();
                    self.load_state = LoadState::Failed;
                }
            },
            other => self.load_state = other,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.load_state, LoadState::Loading(_))
    }

    pub fn table(&self) -> Option<&SearchTable> {
        self.table.as_ref()
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
    }

    pub fn push_char(&mut self, c: char) {
        self.query.push(c);
        self.execute_search();
    }

    pub fn pop_char(&mut self) {
        if self.query.pop().is_some() {
            self.execute_search();
        }
    }

    pub fn clear_query(&mut self) {
        self.query.clear();
        self.execute_search();
    }

    /// Delete word backward from query
    pub fn delete_word(&mut self) {
        while self.query.ends_with(' ') {
            self.query.pop();
        }
        while !self.query.is_empty() && !self.query.ends_with(' ') {
            self.query.pop();
        }
        self.execute_search();
    }

    /// Re-run the current query against the table
    pub fn execute_search(&mut self) {
        self.selected = 0;
        self.location = 0;

        let Some(ref table) = self.table else {
            return;
        };

        if let Some(cached) = self.search_cache.get(&self.query) {
            self.results = cached.clone();
            self.status_message = format!("{} matches (cached)", self.results.len());
            return;
        }

        let start = Instant::now();
        let result = if self.literal {
            Ok(literal_hits(table, &self.query))
        } else {
            let mut parsed = parse_query(&self.query);
            if self.settings.prefix_match {
                parsed.root = parsed.root.into_prefix();
            }
            QueryExecutor::new(table).execute(&parsed)
        };

        match result {
            Ok(hits) => {
                debug!("query {:?}: {} hits", self.query, hits.len());
                self.status_message = format!(
                    "{} matches{} ({:.1}ms)",
                    hits.len(),
                    if self.literal { ", literal" } else { "" },
                    start.elapsed().as_secs_f64() * 1000.0
                );
                self.search_cache.put(self.query.clone(), hits.clone());
                self.results = hits;
            }
            Err(e) => {
                self.status_message = format!("Error: {:#}", e);
                self.results.clear();
            }
        }
    }

    pub fn selected_record(&self) -> Option<&SearchRecord> {
        let hit = self.results.get(self.selected)?;
        self.table.as_ref()?.get(hit.index)
    }

    pub fn selected_location(&self) -> Option<&Location> {
        self.selected_record()?.locations.get(self.location)
    }

    pub fn select_next(&mut self) {
        if !self.results.is_empty() {
            self.selected = (self.selected + 1).min(self.results.len() - 1);
            self.location = 0;
        }
    }

    pub fn select_prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.location = 0;
        }
    }

    pub fn select_page_down(&mut self) {
        if !self.results.is_empty() {
            self.selected = (self.selected + 10).min(self.results.len() - 1);
            self.location = 0;
        }
    }

    pub fn select_page_up(&mut self) {
        self.selected = self.selected.saturating_sub(10);
        self.location = 0;
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.location = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.results.len().saturating_sub(1);
        self.location = 0;
    }

    pub fn location_next(&mut self) {
        let count = self.selected_record().map(|r| r.locations.len()).unwrap_or(0);
        if count > 0 {
            self.location = (self.location + 1).min(count - 1);
        }
    }

    pub fn location_prev(&mut self) {
        self.location = self.location.saturating_sub(1);
    }

    pub fn toggle_detail(&mut self) {
        self.mode = match self.mode {
            Mode::Search => Mode::Detail,
            Mode::Detail => Mode::Search,
            Mode::Help => Mode::Help,
        };
    }

    pub fn show_help(&mut self) {
        if self.mode != Mode::Help {
            self.previous_mode = self.mode;
            self.mode = Mode::Help;
        }
    }

    pub fn hide_help(&mut self) {
        if self.mode == Mode::Help {
            self.mode = self.previous_mode;
        }
    }

    /// Switch between the query language and plain substring matching
    pub fn toggle_literal(&mut self) {
        self.literal = !self.literal;
        self.search_cache.clear();
        self.execute_search();
    }

    pub fn clear_pending_key(&mut self) {
        self.pending_key = None;
    }

    /// Open the selected location's page in the browser
    pub fn open_selected(&mut self) {
        let Some(location) = self.selected_location() else {
            return;
        };
        let Some(path) = self.table.as_ref().and_then(|t| t.resolve(location)) else {
            self.status_message = "No local page for this record".to_string();
            return;
        };
        let anchor = location.anchor.clone();

        match open_page(&self.settings.browser, &path, anchor.as_deref()) {
            Ok(()) => self.status_message = format!("Opened {}", path.display()),
            Err(e) => self.status_message = format!("Error: {:#}", e),
        }
    }

    /// Reload the table from disk
    pub fn reload(&mut self) {
        if self.is_loading() {
            return;
        }
        self.start_load();
    }
}
