//! Publish pipeline for linkpost.
//!
//! Resolves a [`PipelineConfig`] from capability-bearing option values, then
//! runs the [`Publisher`]: fetch a bookmark collection, transform each record
//! into a Markdown document, and report progress along the way.

pub mod capabilities;
pub mod config;
pub mod content;
pub mod pipeline;
pub mod properties;
pub mod report;
pub mod resource;
pub mod store;
pub mod transform;

#[cfg(test)]
mod testing;

pub use capabilities::{
    BasePath, ContentLocator, ContentPath, ErrorBudget, ImagePaths, ImagesLocator, MaxErrors, PublishOption,
    TestLimit, TestLimiter,
};
pub use config::{ExecutionMode, PipelineConfig};
pub use content::{
    ContentDocument, ContentFactory, DefaultPropertiesFactory, Entry, FrontMatter, MarkdownContentFactory,
    PropertiesFactory, Property,
};
pub use pipeline::{ItemErrorPolicy, ItemStatus, PublishReport, Publisher};
pub use properties::{DownloadedResourceProperty, LinkScoresProperty, TagsProperty};
pub use report::{ErrorTally, ProgressReporter, SilentProgress, SummaryProgress};
pub use resource::{DownloadedResource, HttpResourceFactory, ResourceFactory};
pub use store::{ContentStore, FileStore, WriteOutcome, WriterIndexer};
pub use transform::{ItemOutcome, SkipReason, derive_slug, transform_item};
