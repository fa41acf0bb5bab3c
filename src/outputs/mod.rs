//! Output generation for a finished run.
//!
//! # Submodules
//!
//! - [`json`]: writes the full [`ExtractionResult`](crate::models::ExtractionResult) dump
//! - [`markdown`]: renders the category-grouped analysis report
//!
//! # Output Structure
//!
//! ```text
//! wind_intelligence_data/
//! └── task_20240115_083000/
//!     ├── full_data.json
//!     └── Wind_Analysis_Report.md
//! ```

pub mod json;
pub mod markdown;
