use crate::errors::ScrapeError;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

pub const SCREEN_SIZE: (u32, u32) = (1920, 1080);

/// Off-screen X display for the browser. Torn down on drop.
///
/// Outside production this is a no-op and the browser uses whatever display
/// the developer already has.
pub struct VirtualDisplay {
    number: u32,
    child: Option<Child>,
}

impl VirtualDisplay {
    pub async fn start(production: bool, number: u32) -> Result<Self, ScrapeError> {
        if !production {
            return Ok(Self::passthrough());
        }

        let (width, height) = SCREEN_SIZE;
        let child = Command::new("Xvfb")
            .arg(format!(":{number}"))
            .args(["-screen", "0", &format!("{width}x{height}x24"), "-nolisten", "tcp"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ScrapeError::Launch(format!("Xvfb: {e}")))?;

        info!("Xvfb launched on :{number} with PID: {}", child.id());
        let display = Self {
            number,
            child: Some(child),
        };

        let socket = display.socket_path();
        for _ in 0..50 {
            if socket.exists() {
                return Ok(display);
            }
            sleep(Duration::from_millis(100)).await;
        }

        // dropping `display` kills the server
        Err(ScrapeError::Launch(format!(
            "Xvfb did not create {} in time",
            socket.display()
        )))
    }

    pub fn passthrough() -> Self {
        Self {
            number: 0,
            child: None,
        }
    }

    /// Value for `DISPLAY` when a virtual display is running.
    pub fn display_env(&self) -> Option<String> {
        self.child.as_ref().map(|_| format!(":{}", self.number))
    }

    fn socket_path(&self) -> PathBuf {
        PathBuf::from(format!("/tmp/.X11-unix/X{}", self.number))
    }
}

impl Drop for VirtualDisplay {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            info!("Shutting down Xvfb on :{}...", self.number);
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
