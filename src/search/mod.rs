pub mod analytics;
pub mod engine;
pub mod fuzzy;
pub mod preprocess;
pub mod session;
pub mod suggest;

pub use analytics::{HistoryEntry, PerformanceReport, SearchAnalytics};
pub use engine::{
    SearchEngine, SearchFilters, SearchOptions, SearchOutcome, SearchResult, SearchStats, SortBy,
};
pub use preprocess::Lexicon;
pub use session::SearchSession;
pub use suggest::{generate_suggestions, Suggestion};
