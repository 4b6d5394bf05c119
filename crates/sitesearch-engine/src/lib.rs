//! sitesearch-engine
//!
//! Keeps full-text indexes consistent with the content store: full rebuilds
//! from configuration, queued incremental maintenance (linked-alias aware
//! deletes, subtree refreshes), and the hydrating, permission-checked read
//! path.

pub mod delete;
pub mod dispatcher;
pub mod hydrate;
pub mod indexer;
pub mod permissions;
pub mod planner;
pub mod registry;
pub mod relevance;
pub mod search;
pub mod session;

pub use delete::{DeleteResolver, DeleteStrategy};
pub use dispatcher::{DrainReport, TaskDispatcher, TaskFailure, TaskOutcome, DEFAULT_MAX_ATTEMPTS};
pub use hydrate::{HydrationOptions, Hydrator};
pub use indexer::{Indexer, RebuildOutcome};
pub use permissions::ResultPermissionFilter;
pub use planner::{plan_full_rebuild, PathRule, SelectionPlan};
pub use registry::{IndexRegistry, RegisteredIndex};
pub use relevance::is_class_relevant;
pub use search::SiteSearch;
pub use session::with_writer;
