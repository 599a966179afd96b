pub mod anomaly;
pub mod classifier;
pub mod comparator;
pub mod cross_reference;
pub mod legacy;
pub mod matcher;
pub mod normalizer;
pub mod recon_service;
pub mod reconciler;

pub use anomaly::AnomalyDetector;
pub use classifier::classify;
pub use comparator::{compare, FieldComparison};
pub use cross_reference::{build_cross_reference, significant_mismatches};
pub use legacy::LegacyCodeResolver;
pub use matcher::{match_lines, JoinedPair, MatchOutcome};
pub use normalizer::{canonical_key, normalize_item_code, normalize_order_number};
pub use recon_service::{inspect_stock, ReconService, StockReport};
pub use reconciler::{OrderReconciler, ReconciliationRun};
