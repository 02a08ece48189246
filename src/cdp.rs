//! Chrome DevTools Protocol engine implementation

use crate::{Engine, EngineConfig, Error, Result, Viewport};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::{Emulation, Page};
use headless_chrome::{Browser, LaunchOptions};
use log::debug;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Element box as reported by `getBoundingClientRect`
#[derive(Debug, Deserialize)]
struct Rect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// Script replacing the current document with `html`
fn write_document_script(html: &str) -> Result<String> {
    let literal = serde_json::to_string(html)
        .map_err(|e| Error::LoadError(format!("Cannot encode document: {}", e)))?;
    Ok(format!(
        "(function() {{ document.open(); document.write({}); document.close(); }})()",
        literal
    ))
}

/// CDP-based engine implementation (uses the `headless_chrome` crate)
///
/// Launches one headless Chrome process and keeps a single tab for every
/// document it renders. Dropping the engine drops the `Browser`, which
/// terminates the child process.
pub struct CdpEngine {
    browser: Browser,
    tab: Arc<Tab>,
    config: EngineConfig,
}

impl CdpEngine {
    fn element_rect(&self, selector: &str) -> Result<Rect> {
        let quoted = serde_json::to_string(selector)
            .map_err(|e| Error::RenderError(format!("Bad selector: {}", e)))?;
        let script = format!(
            r#"(function() {{
                const el = document.querySelector({});
                if (!el) return null;
                const r = el.getBoundingClientRect();
                return JSON.stringify({{ x: r.x, y: r.y, width: r.width, height: r.height }});
            }})()"#,
            quoted
        );

        let eval = self
            .tab
            .evaluate(&script, false)
            .map_err(|e| Error::RenderError(format!("Measuring element failed: {}", e)))?;

        let raw = eval
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::RenderError(format!("No element matches '{}'", selector)))?;

        serde_json::from_str(raw)
            .map_err(|e| Error::RenderError(format!("Unexpected element box '{}': {}", raw, e)))
    }
}

impl Engine for CdpEngine {
    fn new(config: EngineConfig) -> Result<Self>
    where
        Self: Sized,
    {
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(config.sandbox)
            .path(config.chrome_path.clone())
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(Duration::from_millis(config.timeout_ms));

        debug!("headless chrome ready");
        Ok(Self { browser, tab, config })
    }

    fn load_html(&mut self, html: &str) -> Result<()> {
        // Navigable URLs are capped at 2 MiB, so the document is written into
        // a blank page instead of being packed into a data URL.
        self.tab
            .navigate_to("about:blank")
            .map_err(|e| Error::LoadError(format!("Navigation failed: {}", e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::LoadError(format!("Wait for navigation failed: {}", e)))?;

        self.tab
            .evaluate(&write_document_script(html)?, false)
            .map_err(|e| Error::LoadError(format!("Writing document failed: {}", e)))?;

        Ok(())
    }

    fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map(|_| ())
            .map_err(|e| {
                debug!("waiting for '{}' failed: {}", selector, e);
                Error::Timeout(timeout.as_millis() as u64)
            })
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        if viewport != self.config.viewport {
            debug!("viewport {:?} -> {:?}", self.config.viewport, viewport);
        }
        self.tab
            .call_method(Emulation::SetDeviceMetricsOverride {
                width: viewport.width,
                height: viewport.height,
                device_scale_factor: 1.0,
                mobile: false,
                scale: None,
                screen_width: None,
                screen_height: None,
                position_x: None,
                position_y: None,
                dont_set_visible_size: None,
                screen_orientation: None,
                viewport: None,
                display_feature: None,
                device_posture: None,
            })
            .map_err(|e| Error::RenderError(format!("Failed to set viewport: {}", e)))?;
        self.config.viewport = viewport;
        Ok(())
    }

    fn screenshot_element(&mut self, selector: &str, scale: f64) -> Result<Vec<u8>> {
        let rect = self.element_rect(selector)?;
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return Err(Error::RenderError(format!(
                "'{}' has an empty box ({}x{})",
                selector, rect.width, rect.height
            )));
        }

        let clip = Page::Viewport {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            scale,
        };

        self.tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, Some(clip), true)
            .map_err(|e| Error::RenderError(format!("Screenshot failed: {}", e)))
    }

    fn close(self) -> Result<()> {
        // Drop the tab before the browser so the child process goes last.
        drop(self.tab);
        drop(self.browser);
        Ok(())
    }
}
