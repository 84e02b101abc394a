//! Output formatting module
//!
//! Provides two output formats:
//! - Rich terminal output with colors and tables
//! - JSON export

pub mod json;
pub mod terminal;

pub use json::{print_json, to_json, write_json_file};
pub use terminal::{
    format_assessment, format_certificate_report, format_header, format_subdomain_report,
    print_certificate_report, print_error, print_info, print_success,
};
