pub mod logging;
pub mod sanitize;
pub mod text;

pub use logging::{create_output_dir, RunLog};
pub use sanitize::{sanitize_filename, sanitize_label};
pub use text::{title_case, truncate_text};
