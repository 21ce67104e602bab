//! Where a printable document is shown and printed

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A rendering surface that can receive a document and print it
pub trait PrintSurface: Send {
    fn inject(&mut self, html: &str) -> Result<()>;
    fn print(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;
    fn is_closed(&self) -> bool;
}

/// Opens fresh print surfaces
pub trait SurfaceOpener {
    fn open(&mut self) -> Result<Box<dyn PrintSurface>>;
}

/// Open a file with the system default application
pub fn open_in_viewer(path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", &path.display().to_string()])
            .spawn()?;
    }
    Ok(())
}

/// Writes the document to an HTML file; printing hands it to the
/// platform viewer, whose print dialog does the rest
#[derive(Debug)]
pub struct HtmlFileSurface {
    path: PathBuf,
    launch_viewer: bool,
    written: bool,
    printed: bool,
    closed: bool,
}

impl HtmlFileSurface {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn was_printed(&self) -> bool {
        self.printed
    }
}

impl PrintSurface for HtmlFileSurface {
    fn inject(&mut self, html: &str) -> Result<()> {
        if self.closed {
            return Err(Error::SurfaceUnavailable("surface already closed".to_string()));
        }
        std::fs::write(&self.path, html)?;
        self.written = true;
        Ok(())
    }

    fn print(&mut self) -> Result<()> {
        if !self.written {
            return Err(Error::General("Nothing injected to print".to_string()));
        }
        if self.launch_viewer {
            open_in_viewer(&self.path)?;
        }
        self.printed = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Opens [`HtmlFileSurface`]s at a fixed path
#[derive(Debug, Clone)]
pub struct HtmlFileOpener {
    pub path: PathBuf,
    /// Launch the platform viewer on print
    pub launch_viewer: bool,
}

impl SurfaceOpener for HtmlFileOpener {
    fn open(&mut self) -> Result<Box<dyn PrintSurface>> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        if !parent.is_dir() {
            return Err(Error::SurfaceUnavailable(format!(
                "directory {} does not exist",
                parent.display()
            )));
        }

        Ok(Box::new(HtmlFileSurface {
            path: self.path.clone(),
            launch_viewer: self.launch_viewer,
            written: false,
            printed: false,
            closed: false,
        }))
    }
}
