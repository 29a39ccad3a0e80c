use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use crate::analysis::{self, ColumnInsight, GeminiClient, TextGenerator, VariableAnalysis};
use crate::config::Settings;
use crate::data::inference::{infer_column_type, ColumnType};
use crate::data::loader;
use crate::data::model::Dataset;
use crate::data::selection::{FeatureSelection, TrainingInput};
use crate::data::stats::{profile_column, ColumnProfile};
use crate::data::transform::{self, Transform};
use crate::error::DataError;

/// Notices kept for the status bar / log window.
const MAX_NOTICES: usize = 50;

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A user-visible outcome message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Table,
    Features,
}

// ---------------------------------------------------------------------------
// Background jobs
// ---------------------------------------------------------------------------

/// Message a worker thread sends back to the UI thread.
enum JobResult {
    Loaded {
        ticket: u64,
        path: PathBuf,
        result: anyhow::Result<Dataset>,
    },
    Insight {
        ticket: u64,
        column: String,
        result: Result<ColumnInsight, DataError>,
    },
    Variables {
        ticket: u64,
        result: Result<VariableAnalysis, DataError>,
    },
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub settings: Settings,

    /// Current snapshot (None until user loads a file).
    pub dataset: Option<Dataset>,

    /// File the dataset came from.
    pub source: Option<PathBuf>,

    /// Transforms applied since loading, oldest first.
    pub applied: Vec<Transform>,

    /// Snapshots to return to on undo, newest last.
    undo_stack: Vec<Dataset>,

    /// Column inspected in the feature panel, with its cached profile.
    pub selected_column: Option<String>,
    pub profile: Option<ColumnProfile>,

    /// Inferred type per column of the current snapshot.
    pub column_types: BTreeMap<String, ColumnType>,

    /// Hosted-model descriptions per column.
    pub insights: BTreeMap<String, ColumnInsight>,
    pub pending_insights: BTreeSet<String>,

    /// Hosted-model feature/target suggestion.
    pub variables: Option<VariableAnalysis>,
    pub variables_pending: bool,

    /// Feature/target choice for the training hand-off.
    pub selection: FeatureSelection,
    pub show_selection_dialog: bool,

    /// Column being renamed and the edit buffer.
    pub renaming: Option<String>,
    pub rename_buffer: String,

    /// 1-based page of the data table.
    pub page: usize,
    pub active_tab: Tab,

    pub notices: Vec<Notice>,

    /// Whether a file loading operation is in progress.
    pub loading: bool,

    generator: Result<Arc<dyn TextGenerator>, String>,
    load_ticket: u64,
    /// Bumped on every `set_dataset`; insight replies for older datasets are dropped.
    dataset_ticket: u64,
    variables_ticket: u64,
    tx: Sender<JobResult>,
    rx: Receiver<JobResult>,
}

impl AppState {
    /// State with a Gemini client built from the settings (if a key is configured).
    pub fn new(settings: Settings) -> Self {
        let generator = GeminiClient::from_settings(&settings.gemini)
            .map(|c| Arc::new(c) as Arc<dyn TextGenerator>)
            .map_err(|e| {
                log::warn!("hosted analysis unavailable: {e}");
                e.to_string()
            });
        Self::with_generator(settings, generator)
    }

    pub fn with_generator(
        settings: Settings,
        generator: Result<Arc<dyn TextGenerator>, String>,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            settings,
            dataset: None,
            source: None,
            applied: Vec::new(),
            undo_stack: Vec::new(),
            selected_column: None,
            profile: None,
            column_types: BTreeMap::new(),
            insights: BTreeMap::new(),
            pending_insights: BTreeSet::new(),
            variables: None,
            variables_pending: false,
            selection: FeatureSelection::default(),
            show_selection_dialog: false,
            renaming: None,
            rename_buffer: String::new(),
            page: 1,
            active_tab: Tab::default(),
            notices: Vec::new(),
            loading: false,
            generator,
            load_ticket: 0,
            dataset_ticket: 0,
            variables_ticket: 0,
            tx,
            rx,
        }
    }

    // -- Notifications --

    pub fn notify_info(&mut self, text: impl Into<String>) {
        let text = text.into();
        log::info!("{text}");
        self.push_notice(NoticeLevel::Info, text);
    }

    pub fn notify_error(&mut self, text: impl Into<String>) {
        let text = text.into();
        log::error!("{text}");
        self.push_notice(NoticeLevel::Error, text);
    }

    fn push_notice(&mut self, level: NoticeLevel, text: String) {
        self.notices.push(Notice { level, text });
        if self.notices.len() > MAX_NOTICES {
            let excess = self.notices.len() - MAX_NOTICES;
            self.notices.drain(..excess);
        }
    }

    pub fn latest_notice(&self) -> Option<&Notice> {
        self.notices.last()
    }

    // -- Ingestion --

    /// Read a file on a worker thread. A newer request supersedes an older one.
    pub fn start_load(&mut self, path: PathBuf) {
        self.load_ticket += 1;
        let ticket = self.load_ticket;
        self.loading = true;
        log::info!("loading {} (request {ticket})", path.display());

        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let result = loader::load_file(&path);
            let _ = tx.send(JobResult::Loaded {
                ticket,
                path,
                result,
            });
        });
    }

    /// Ingest a newly loaded dataset and reset everything derived from the old one.
    pub fn set_dataset(&mut self, dataset: Dataset, source: Option<PathBuf>) {
        self.selected_column = dataset.columns().first().cloned();
        self.dataset = Some(dataset);
        self.source = source;
        self.applied.clear();
        self.undo_stack.clear();
        self.insights.clear();
        self.pending_insights.clear();
        self.dataset_ticket += 1;
        self.variables = None;
        self.variables_pending = false;
        self.variables_ticket += 1;
        self.selection = FeatureSelection::default();
        self.show_selection_dialog = false;
        self.renaming = None;
        self.page = 1;
        self.loading = false;
        self.refresh_derived();
    }

    // -- Background results --

    /// Drain finished jobs. Returns whether anything changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(msg) = self.rx.try_recv() {
            changed = true;
            match msg {
                JobResult::Loaded {
                    ticket,
                    path,
                    result,
                } => self.finish_load(ticket, path, result),
                JobResult::Insight {
                    ticket,
                    column,
                    result,
                } => self.finish_insight(ticket, column, result),
                JobResult::Variables { ticket, result } => self.finish_variables(ticket, result),
            }
        }
        changed
    }

    pub fn has_pending_jobs(&self) -> bool {
        self.loading || self.variables_pending || !self.pending_insights.is_empty()
    }

    fn finish_load(&mut self, ticket: u64, path: PathBuf, result: anyhow::Result<Dataset>) {
        if ticket != self.load_ticket {
            log::debug!("discarding superseded load of {}", path.display());
            return;
        }
        match result {
            Ok(dataset) => {
                let msg = format!(
                    "Loaded {} rows with {} columns from {}",
                    dataset.len(),
                    dataset.columns().len(),
                    path.display()
                );
                self.set_dataset(dataset, Some(path));
                self.notify_info(msg);
            }
            Err(e) => {
                self.loading = false;
                self.notify_error(format!("Failed to load {}: {e:#}", path.display()));
            }
        }
    }

    fn finish_insight(
        &mut self,
        ticket: u64,
        column: String,
        result: Result<ColumnInsight, DataError>,
    ) {
        if ticket != self.dataset_ticket {
            log::debug!("discarding analysis of \"{column}\" from a previous dataset");
            return;
        }
        self.pending_insights.remove(&column);
        let still_there = self.dataset.as_ref().is_some_and(|d| d.has_column(&column));
        match result {
            Ok(insight) if still_there => {
                self.insights.insert(column, insight);
            }
            Ok(_) => log::debug!("column \"{column}\" is gone; dropping its analysis"),
            // An older insight, if any, stays in place.
            Err(e) => self.notify_error(format!("Analysis of \"{column}\" failed: {e}")),
        }
    }

    fn finish_variables(&mut self, ticket: u64, result: Result<VariableAnalysis, DataError>) {
        if ticket != self.variables_ticket {
            log::debug!("discarding stale variable analysis");
            return;
        }
        self.variables_pending = false;
        match result {
            Ok(analysis) => {
                self.variables = Some(analysis);
                self.notify_info("Variable analysis completed");
            }
            Err(e) => self.notify_error(format!("Failed to analyze variables: {e}")),
        }
    }

    // -- Transforms --

    /// Apply a transform; on success the snapshot is replaced in one assignment.
    pub fn apply_transform(&mut self, t: Transform) {
        let Some(current) = &self.dataset else {
            self.notify_error("No dataset loaded");
            return;
        };

        match transform::apply(current, &t) {
            Ok(applied) => {
                let previous = self.dataset.replace(applied.dataset);
                if let Some(prev) = previous {
                    self.push_undo(prev);
                }
                self.after_transform(&t);
                self.applied.push(t);
                self.notify_info(applied.summary);
            }
            Err(e) => {
                self.notify_error(format!("Failed to {t}: {e}"));
            }
        }
    }

    fn push_undo(&mut self, snapshot: Dataset) {
        let depth = self.settings.history.undo_depth;
        if depth == 0 {
            return;
        }
        self.undo_stack.push(snapshot);
        if self.undo_stack.len() > depth {
            let excess = self.undo_stack.len() - depth;
            self.undo_stack.drain(..excess);
        }
    }

    /// Keep column-keyed UI state in step with the new snapshot.
    fn after_transform(&mut self, t: &Transform) {
        if let Transform::RenameColumn { from, to } = t {
            let to = to.trim().to_string();
            if let Some(insight) = self.insights.remove(from) {
                self.insights.insert(to.clone(), insight);
            }
            if self.selected_column.as_deref() == Some(from.as_str()) {
                self.selected_column = Some(to);
            }
        }
        self.sync_with_columns();
    }

    fn sync_with_columns(&mut self) {
        let Some(ds) = &self.dataset else {
            return;
        };
        self.insights.retain(|col, _| ds.has_column(col));
        self.selection.features.retain(|col| ds.has_column(col));
        if !ds.has_column(&self.selection.target) {
            self.selection.target.clear();
        }
        if let Some(col) = &self.selected_column {
            if !ds.has_column(col) {
                self.selected_column = ds.columns().first().cloned();
            }
        }
        let pages = ds.page_count(self.settings.table.rows_per_page);
        self.page = self.page.clamp(1, pages);
        self.refresh_derived();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Return to the snapshot before the last transform.
    pub fn undo(&mut self) {
        let Some(prev) = self.undo_stack.pop() else {
            self.notify_error("Nothing to undo");
            return;
        };
        self.dataset = Some(prev);
        let label = self
            .applied
            .pop()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "last change".to_string());
        self.sync_with_columns();
        self.notify_info(format!("Undid {label}"));
    }

    // -- Column inspection --

    pub fn select_column(&mut self, column: &str) {
        self.selected_column = Some(column.to_string());
        self.refresh_profile();
    }

    /// Recompute everything derived from the snapshot.
    fn refresh_derived(&mut self) {
        self.column_types = match &self.dataset {
            Some(ds) => ds
                .columns()
                .iter()
                .map(|c| (c.clone(), infer_column_type(ds, c)))
                .collect(),
            None => BTreeMap::new(),
        };
        self.refresh_profile();
    }

    /// Re-run inference and stats for the inspected column on the current snapshot.
    pub fn refresh_profile(&mut self) {
        self.profile = match (&self.dataset, &self.selected_column) {
            (Some(ds), Some(col)) => Some(profile_column(ds, col)),
            _ => None,
        };
    }

    pub fn start_rename(&mut self, column: &str) {
        self.renaming = Some(column.to_string());
        self.rename_buffer = column.to_string();
    }

    pub fn commit_rename(&mut self) {
        if let Some(from) = self.renaming.take() {
            let to = std::mem::take(&mut self.rename_buffer);
            self.apply_transform(Transform::RenameColumn { from, to });
        }
    }

    // -- Hosted analysis --

    fn generator(&mut self) -> Option<Arc<dyn TextGenerator>> {
        match &self.generator {
            Ok(g) => Some(Arc::clone(g)),
            Err(reason) => {
                let reason = reason.clone();
                self.notify_error(format!("AI analysis unavailable: {reason}"));
                None
            }
        }
    }

    /// Ask the hosted model about one column on a worker thread.
    pub fn request_column_insight(&mut self, column: &str) {
        if self.pending_insights.contains(column) {
            return;
        }
        let Some(dataset) = self.dataset.clone() else {
            return;
        };
        let Some(generator) = self.generator() else {
            return;
        };
        self.pending_insights.insert(column.to_string());

        let ticket = self.dataset_ticket;
        let column = column.to_string();
        let sample_rows = self.settings.analysis.column_sample_rows;
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let result = analysis::analyze_column(generator.as_ref(), &dataset, &column, sample_rows);
            let _ = tx.send(JobResult::Insight {
                ticket,
                column,
                result,
            });
        });
    }

    /// Ask the hosted model for a feature/target split on a worker thread.
    pub fn request_variable_analysis(&mut self) {
        if self.variables_pending {
            return;
        }
        let Some(dataset) = self.dataset.clone() else {
            return;
        };
        let Some(generator) = self.generator() else {
            return;
        };
        self.variables_pending = true;
        self.variables_ticket += 1;

        let ticket = self.variables_ticket;
        let sample_rows = self.settings.analysis.variable_sample_rows;
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let result = analysis::analyze_variables(generator.as_ref(), &dataset, sample_rows);
            let _ = tx.send(JobResult::Variables { ticket, result });
        });
    }

    // -- Training hand-off --

    /// Pre-fill the selection dialog from the hosted model's suggestion.
    pub fn use_suggested_selection(&mut self) {
        let Some(analysis) = &self.variables else {
            return;
        };
        match FeatureSelection::from_variables(analysis) {
            Ok(selection) => {
                self.selection = selection;
                self.show_selection_dialog = true;
            }
            Err(e) => self.notify_error(e.to_string()),
        }
    }

    pub fn training_input(&self) -> Result<TrainingInput, DataError> {
        let ds = self
            .dataset
            .as_ref()
            .ok_or_else(|| DataError::precondition("no dataset loaded"))?;
        TrainingInput::new(ds, &self.selection)
    }

    /// Write the hand-off file for the training collaborator.
    pub fn export_training_input(&mut self, path: &Path) {
        let result = self
            .training_input()
            .map_err(anyhow::Error::from)
            .and_then(|input| input.save(path));
        match result {
            Ok(()) => {
                self.show_selection_dialog = false;
                self.notify_info(format!("Training input written to {}", path.display()));
            }
            Err(e) => self.notify_error(format!("Export failed: {e:#}")),
        }
    }

    // -- Pagination --

    pub fn page_count(&self) -> usize {
        self.dataset
            .as_ref()
            .map(|d| d.page_count(self.settings.table.rows_per_page))
            .unwrap_or(1)
    }

    pub fn next_page(&mut self) {
        if self.page < self.page_count() {
            self.page += 1;
        }
    }

    pub fn prev_page(&mut self) {
        if self.page > 1 {
            self.page -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::FakeGenerator;
    use crate::analysis::AnalysisError;
    use crate::data::loader::parse_csv;
    use std::time::Duration;

    fn state_with(generator: FakeGenerator) -> AppState {
        let generator = Arc::new(generator) as Arc<dyn TextGenerator>;
        let mut state = AppState::with_generator(Settings::default(), Ok(generator));
        let ds = parse_csv(b"age,city,price\n31,Oslo,100\n,Bergen,250\n45,Oslo,\n").unwrap();
        state.set_dataset(ds, None);
        state
    }

    fn wait(state: &mut AppState) {
        for _ in 0..500 {
            state.poll();
            if !state.has_pending_jobs() {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("background jobs did not finish");
    }

    #[test]
    fn test_failed_transform_keeps_snapshot() {
        let mut state = state_with(FakeGenerator::replying("{}"));
        let before = state.dataset.clone();
        state.apply_transform(Transform::Normalize {
            column: "city".into(),
        });
        assert_eq!(state.dataset, before);
        assert_eq!(state.latest_notice().unwrap().level, NoticeLevel::Error);
        assert!(!state.can_undo());
    }

    #[test]
    fn test_apply_and_undo() {
        let mut state = state_with(FakeGenerator::replying("{}"));
        let original = state.dataset.clone();
        state.apply_transform(Transform::DropMissing {
            column: "age".into(),
        });
        assert_eq!(state.dataset.as_ref().unwrap().len(), 2);
        assert_eq!(state.applied.len(), 1);

        state.undo();
        assert_eq!(state.dataset, original);
        assert!(state.applied.is_empty());
    }

    #[test]
    fn test_undo_depth_is_bounded() {
        let mut state = state_with(FakeGenerator::replying("{}"));
        state.settings.history.undo_depth = 1;
        state.apply_transform(Transform::DropColumn {
            column: "age".into(),
        });
        state.apply_transform(Transform::DropColumn {
            column: "city".into(),
        });
        state.undo();
        assert!(!state.can_undo());
        assert!(state.dataset.as_ref().unwrap().has_column("city"));
        assert!(!state.dataset.as_ref().unwrap().has_column("age"));
    }

    #[test]
    fn test_rename_follows_selection_and_insights() {
        let mut state = state_with(FakeGenerator::replying(
            r#"{"description": "d", "mlUse": "m", "preprocessing": "p"}"#,
        ));
        state.select_column("city");
        state.request_column_insight("city");
        wait(&mut state);
        assert!(state.insights.contains_key("city"));

        state.start_rename("city");
        state.rename_buffer = "town".into();
        state.commit_rename();
        assert_eq!(state.selected_column.as_deref(), Some("town"));
        assert!(state.insights.contains_key("town"));
        assert_eq!(state.profile.as_ref().unwrap().column, "town");
    }

    #[test]
    fn test_dropping_selected_column_moves_selection() {
        let mut state = state_with(FakeGenerator::replying("{}"));
        state.select_column("price");
        state.apply_transform(Transform::DropColumn {
            column: "price".into(),
        });
        assert_eq!(state.selected_column.as_deref(), Some("age"));
    }

    #[test]
    fn test_failed_insight_keeps_previous() {
        let mut state = state_with(FakeGenerator::replying(
            r#"{"description": "d", "mlUse": "m", "preprocessing": "p"}"#,
        ));
        state.request_column_insight("age");
        wait(&mut state);

        let failing = FakeGenerator::failing(AnalysisError::Network("offline".into()));
        state.generator = Ok(Arc::new(failing) as Arc<dyn TextGenerator>);
        state.request_column_insight("age");
        wait(&mut state);

        assert_eq!(state.insights["age"].description, "d");
        assert_eq!(state.latest_notice().unwrap().level, NoticeLevel::Error);
    }

    #[test]
    fn test_variable_analysis_prefills_selection() {
        let mut state = state_with(FakeGenerator::replying(
            r#"{"dependent": ["price"], "independent": ["age", "city"]}"#,
        ));
        state.request_variable_analysis();
        wait(&mut state);
        state.use_suggested_selection();
        assert!(state.show_selection_dialog);
        assert_eq!(state.selection.target, "price");
        assert!(state.training_input().is_ok());
    }

    #[test]
    fn test_missing_generator_reports_error() {
        let mut state = AppState::with_generator(Settings::default(), Err("no key".into()));
        state.set_dataset(parse_csv(b"a\n1\n").unwrap(), None);
        state.request_variable_analysis();
        assert!(!state.variables_pending);
        assert_eq!(state.latest_notice().unwrap().level, NoticeLevel::Error);
    }

    #[test]
    fn test_insight_from_previous_file_is_dropped() {
        let mut state = state_with(FakeGenerator::replying("{}"));
        let old_ticket = state.dataset_ticket;
        state.set_dataset(parse_csv(b"age,y\n1,2\n").unwrap(), None);

        // A reply for the old file's "age" column arrives after the new load.
        let insight = ColumnInsight {
            description: "old file age".into(),
            ml_use: "feature".into(),
            preprocessing: analysis::Preprocessing::Text("none".into()),
        };
        state
            .tx
            .send(JobResult::Insight {
                ticket: old_ticket,
                column: "age".into(),
                result: Ok(insight),
            })
            .unwrap();
        assert!(state.poll());

        assert!(state.insights.is_empty());
        assert!(state.pending_insights.is_empty());
    }

    #[test]
    fn test_last_load_wins() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        std::fs::write(&first, "a\n1\n").unwrap();
        std::fs::write(&second, "b\n2\n3\n").unwrap();

        let mut state = AppState::with_generator(Settings::default(), Err("off".into()));
        state.start_load(first);
        state.start_load(second.clone());
        wait(&mut state);

        assert_eq!(state.source.as_deref(), Some(second.as_path()));
        assert_eq!(state.dataset.as_ref().unwrap().columns(), ["b".to_string()]);
    }

    #[test]
    fn test_export_training_input() {
        let mut state = state_with(FakeGenerator::replying("{}"));
        state.selection = FeatureSelection {
            features: vec!["age".into()],
            target: "price".into(),
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        state.export_training_input(&path);
        assert!(path.exists());
        assert_eq!(state.latest_notice().unwrap().level, NoticeLevel::Info);
    }

    #[test]
    fn test_pagination_clamped_after_row_drop() {
        let mut state = state_with(FakeGenerator::replying("{}"));
        state.settings.table.rows_per_page = 1;
        state.next_page();
        state.next_page();
        state.next_page();
        assert_eq!(state.page, 3);
        state.apply_transform(Transform::DropMissing {
            column: "price".into(),
        });
        assert_eq!(state.page, 2);
    }
}
