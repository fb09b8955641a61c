//! Stage-5 metric projections
//!
//! Four independent, read-only projections over the filtered activity
//! table (or the raw invocation stream joined to the sustained set). Each
//! takes its own inclusive floor, matching the reporting windows the
//! metrics were introduced with. None of them mutate anything; they can
//! run in any order.

pub mod categories;
pub mod mau;
pub mod new_users;

pub use categories::{category_label, category_mau};
pub use mau::mau_monthly;
pub use new_users::new_users_monthly;
