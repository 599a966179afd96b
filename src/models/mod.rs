pub mod comparison;
pub mod legacy;
pub mod measure;
pub mod order;
pub mod stock;

pub use comparison::{
    AmbiguousKey, CanonicalKey, ComparisonRow, ReconciliationSummary, SyncStatus, NULL_TOKEN,
};
pub use legacy::LegacyCodeMap;
pub use measure::Measure;
pub use order::{extract_default_code, parse_timestamp, ErpRef, OrderLine, Side};
pub use stock::{
    split_item_code, CrossReferenceRow, MismatchCandidate, MismatchKind, QuantityBasis,
    StockRecord,
};
