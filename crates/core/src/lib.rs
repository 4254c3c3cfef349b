pub mod config;
pub mod metadata;
pub mod resolver;
pub mod selection;
pub mod testing;
pub mod text;
pub mod tracker;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    SelectionConfig,
};
pub use metadata::{
    CandidateMatcher, CandidateMetadata, DiscogsClient, MatchResult, MetadataError,
    MetadataSource, ReleaseScope, SubItem,
};
pub use resolver::{Resolution, ResolveError, Resolver};
pub use selection::{select_best, SelectionCriteria};
pub use text::{normalize, similarity_ratio, SearchKey};
pub use tracker::{
    create_tracker, format_size, parse_size, Compression, RetrievalClient, RutrackerTracker,
    TorrentRecord, Tracker, TrackerError,
};
