//! The five SCD reconcilers.
//!
//! RULE: policies are pure. Each takes the prior table state and the
//! run's snapshot by value/reference and returns the next state. None of
//! them touches the store; the pipeline owns reads and writes.
//!
//! EXECUTION ORDER in the pipeline (fixed, independent of each other):
//!   1. Type 0  append-only           → dim_scd0
//!   2. Type 1  overwrite + promotion → dim_scd1
//!   3. Type 2  row versioning        → dim_scd2
//!   4. Type 3  shadow columns        → dim_scd3
//!   5. Type 4  current + history     → dim_scd4, history_scd4

mod type0;
mod type1;
mod type2;
mod type3;
mod type4;

pub use type0::scd_type0;
pub use type1::{scd_type1, Type1Options};
pub use type2::scd_type2;
pub use type3::scd_type3;
pub use type4::{scd_type4, Type4Output};
