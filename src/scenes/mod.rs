//! Boundary Extractor: probability sequence to scene intervals.

mod extractor;


pub use extractor::{extract_scenes, scan_scenes, SceneInterval};
