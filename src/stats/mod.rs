// Stats pipeline.
// Aggregation of fetched GitHub data and the facade that caches and serves it.

pub mod aggregate;
pub mod facade;
pub mod record;
pub mod view;

pub use facade::{FacadeConfig, FacadePhase, STATS_CACHE_KEY, StatsFacade};
pub use record::{StatsRecord, TopLanguages};
pub use view::{LoadMode, LoadingState, StatsView};
