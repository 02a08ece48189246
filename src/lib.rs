//! svgshot
//!
//! Batch SVG-to-PNG rasterization on top of a headless browser engine, plus a
//! thin client for a remote text-to-image service.
//!
//! # Features
//!
//! - **CDP Backend** (default): renders through headless Chrome via the
//!   Chrome DevTools Protocol
//! - **Engine seam**: the batch loop drives any [`Engine`], so the browser can
//!   be swapped for another backend or a test double
//! - **Image generation** (default): blocking HTTP client for the DashScope
//!   text-to-image API
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use svgshot::{BatchOptions, BatchRasterizer, EngineConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = svgshot::new_engine(EngineConfig::default())?;
//! let mut rasterizer = BatchRasterizer::new(engine, BatchOptions { scale: 2.0, ..Default::default() });
//! let summary = rasterizer.convert_batch(Path::new("slides"), None)?;
//! println!("{} ok, {} failed", summary.success_count, summary.fail_count);
//! rasterizer.close()?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

pub mod error;
pub use error::{Error, Result};

#[cfg(feature = "cdp")]
pub mod cdp;

pub mod batch;
pub mod render;
pub mod viewbox;

#[cfg(feature = "imagegen")]
pub mod imagegen;

pub use batch::{
    default_output_dir, enumerate, BatchOptions, BatchProgress, BatchRasterizer, ConversionJob,
    ConversionResult, RunSummary,
};
pub use viewbox::{infer_dimensions, Dimensions};

/// Configuration for the rendering engine
///
/// The defaults match a desktop-sized headless Chrome with the sandbox
/// enabled.
///
/// # Examples
///
/// ```
/// let cfg = svgshot::EngineConfig::default();
/// assert!(cfg.sandbox);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Initial window size; each render overrides it with the element size
    pub viewport: Viewport,
    /// Timeout for navigation and other browser round-trips in milliseconds
    pub timeout_ms: u64,
    /// Explicit browser executable; autodetected when `None`
    pub chrome_path: Option<PathBuf>,
    /// Whether to keep the browser sandbox enabled
    pub sandbox: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            timeout_ms: 30000,
            chrome_path: None,
            sandbox: true,
        }
    }
}

/// Viewport dimensions in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Core trait for rendering engine implementations
///
/// An engine is an expensive resource: callers acquire one per run and push
/// every document through it sequentially. Dropping an engine must release
/// the underlying process, so release happens on every exit path even when
/// [`Engine::close`] is never reached.
pub trait Engine {
    /// Create a new engine instance with the given configuration
    fn new(config: EngineConfig) -> Result<Self>
    where
        Self: Sized;

    /// Load a complete HTML document and wait for navigation to finish
    fn load_html(&mut self, html: &str) -> Result<()>;

    /// Wait until `selector` matches an element, failing after `timeout`
    fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    /// Force the CSS viewport size (device scale factor 1)
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Capture the element matched by `selector` as PNG bytes, scaled by
    /// `scale` in CSS pixels
    fn screenshot_element(&mut self, selector: &str, scale: f64) -> Result<Vec<u8>>;

    /// Close the engine and clean up resources
    fn close(self) -> Result<()>;
}

/// Launch the default engine (headless Chrome over CDP)
#[cfg(feature = "cdp")]
pub fn new_engine(config: EngineConfig) -> Result<impl Engine> {
    cdp::CdpEngine::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.viewport.width, 1280);
        assert_eq!(config.viewport.height, 720);
        assert!(config.sandbox);
        assert!(config.chrome_path.is_none());
    }

    #[test]
    fn test_viewport() {
        let viewport = Viewport {
            width: 1920,
            height: 1080,
        };
        assert_eq!(viewport.width, 1920);
        assert_eq!(viewport.height, 1080);
    }
}
