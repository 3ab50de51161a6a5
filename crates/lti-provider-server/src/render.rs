// crates/lti-provider-server/src/render.rs
// ============================================================================
// Module: File Content Renderer
// Description: Serve pre-rendered HTML content blocks from disk.
// Purpose: Default ContentRenderer backing the run endpoint.
// Dependencies: lti-provider-config, lti-provider-core
// ============================================================================

//! ## Overview
//! Content lives at `<root>/<course_id>/<usage_id>.html`. Identifier
//! validation in the core crate rules out separators and dot segments, so the
//! joined path always stays under `root`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::ErrorKind;
use std::io::Read;
use std::path::PathBuf;

use lti_provider_config::ContentConfig;
use lti_provider_core::ContentRenderer;
use lti_provider_core::CourseId;
use lti_provider_core::RenderError;
use lti_provider_core::RenderedContent;
use lti_provider_core::UsageId;

// ============================================================================
// SECTION: Renderer
// ============================================================================

/// Renders content blocks from HTML files under a root directory.
#[derive(Debug, Clone)]
pub struct FileContentRenderer {
    /// Content root directory.
    root: PathBuf,
    /// Largest file served, in bytes.
    max_bytes: usize,
}

impl FileContentRenderer {
    /// Creates a renderer rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    /// Creates a renderer from `[content]` configuration.
    #[must_use]
    pub fn from_config(config: &ContentConfig) -> Self {
        Self::new(config.root.trim(), config.max_bytes)
    }

    /// Returns the file path for a content block.
    fn content_path(&self, course_id: &CourseId, usage_id: &UsageId) -> PathBuf {
        self.root.join(course_id.as_str()).join(format!("{}.html", usage_id.as_str()))
    }
}

impl ContentRenderer for FileContentRenderer {
    fn render(
        &self,
        course_id: &CourseId,
        usage_id: &UsageId,
    ) -> Result<RenderedContent, RenderError> {
        let path = self.content_path(course_id, usage_id);
        let file = File::open(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => RenderError::NotFound(format!("{course_id}/{usage_id}")),
            _ => RenderError::Failed(format!("content open failed: {err}")),
        })?;
        let metadata = file
            .metadata()
            .map_err(|err| RenderError::Failed(format!("content stat failed: {err}")))?;
        if !metadata.is_file() {
            return Err(RenderError::NotFound(format!("{course_id}/{usage_id}")));
        }
        let limit = u64::try_from(self.max_bytes).unwrap_or(u64::MAX);
        if metadata.len() > limit {
            return Err(RenderError::Failed("content exceeds size limit".to_string()));
        }
        let mut body = Vec::new();
        file.take(limit.saturating_add(1))
            .read_to_end(&mut body)
            .map_err(|err| RenderError::Failed(format!("content read failed: {err}")))?;
        if body.len() > self.max_bytes {
            return Err(RenderError::Failed("content exceeds size limit".to_string()));
        }
        Ok(RenderedContent::html(body))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
