//! Vision side of the pipeline: capturing the watched region, matching it
//! against the ability templates, and archiving frames nothing matched.

pub mod capture;
pub mod matcher;
pub mod templates;
pub mod unrecognized;

pub use capture::{CaptureRegion, Frame, FrameSource, ScreenFrameSource};
pub use matcher::{MatchResult, TemplateEntry, TemplateMatcher};
pub use templates::TemplateLoader;
pub use unrecognized::{PendingDirSink, UnrecognizedFrameSink};
