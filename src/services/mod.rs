// Pure pipeline stages
pub mod aggregator;
pub mod classifier;
pub mod timeline;

// Buyer workflows
pub mod negotiation;
pub mod store_selection;

// Refresh loop and guarded mutations
pub mod workspace;

pub use aggregator::{ClassifiedSnapshot, FetchedCollections, PurchaseStats, TabCounts};
pub use classifier::{classify_child, classify_purchase, Bucket, Tab};
pub use negotiation::{NegotiationEditor, NegotiationTotals};
pub use store_selection::{StoreRequestOutcome, StoreSelectionState, StoreSelector};
pub use timeline::{merge_records, merge_timeline};
pub use workspace::{BuyerWorkspace, DashboardView};
