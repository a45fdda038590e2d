//! Report assembly
//!
//! - [`assembler`] - report body and introduction via the language model
//! - [`outline`] - headings, table of contents, references
//! - [`publisher`] - writes the finished Markdown to the output directory

pub mod assembler;
pub mod outline;
pub mod publisher;

pub use assembler::ReportAssembler;
pub use outline::{extract_headings, references, table_of_contents, Heading};
pub use publisher::Publisher;
