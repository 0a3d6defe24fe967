pub mod contexts;
pub mod files;
pub mod health;
pub mod prompts;
pub mod rag;

pub use contexts::{clear_context, create_context, delete_context, list_contexts};
pub use files::{get_generated_file, list_generated_files, visualize};
pub use health::health_check;
pub use prompts::{get_prompt_variables, update_prompt};
pub use rag::{clear_all, insert, insert_file, query};
