pub mod reaper;
pub mod resolver;

pub use reaper::{ExpiryReaper, PurgeReport};
pub use resolver::{RedirectResolver, RequestMeta, ResolveOutcome};
