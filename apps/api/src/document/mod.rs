// Document assembly (HTML pages) and rendering (HTML → PDF).

pub mod renderer;
pub mod template;

pub use renderer::{ChromeRenderer, DocumentRenderer};
pub use template::{assemble_document, CoverInfo, LayoutOptions};
