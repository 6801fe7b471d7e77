//! Value, column and type-mapping types shared by the driver.

pub mod column;
pub mod mapping;
pub mod value;

pub use column::Column;
pub use mapping::{classify, SemanticType, StorageTag};
pub use value::{NumericPrecision, Value};
