pub mod category;
pub mod money;
pub mod transaction;

pub use category::{
    normalize_keyword, Categories, Category, CategoryEntries, CategoryError, FALLBACK_CATEGORY,
};
pub use money::Money;
pub use transaction::{
    CategoryTotal, ClassificationResult, Direction, RowId, Transaction,
};
