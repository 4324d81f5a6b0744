//! Application layer - use cases and orchestration.
//!
//! This layer contains the main business logic for resolving categories,
//! building acquisition plans and running export jobs.

pub mod app_logs;
pub mod exporter;
pub mod planner;
pub mod resolver;

pub use app_logs::{app_name, AppLogEnumerator, ParseStrategy};
pub use exporter::{ExportEvent, ExportHandle, Exporter, ARCHIVE_WEIGHT};
pub use planner::build_plan;
pub use resolver::{known_tokens, match_rule, CategoryResolver, RuleKind, TokenRule, TOKEN_RULES};
