use crate::display::SCREEN_SIZE;
use crate::errors::ScrapeError;
use fantoccini::{Client, ClientBuilder};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Handle to a running chromedriver. Killed on drop.
pub struct ChromeDriver {
    child: Child,
    port: u16,
}

impl ChromeDriver {
    pub async fn launch(
        path: &str,
        port: u16,
        display: Option<&str>,
    ) -> Result<Self, ScrapeError> {
        let mut cmd = Command::new(path);
        cmd.arg(format!("--port={port}"))
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(display) = display {
            cmd.env("DISPLAY", display);
        }

        let child = cmd
            .spawn()
            .map_err(|e| ScrapeError::Launch(format!("chromedriver from {path}: {e}")))?;
        info!("chromedriver launched with PID: {}", child.id());
        let driver = Self { child, port };

        let status_url = format!("{}/status", driver.webdriver_url());
        let client = reqwest::Client::new();
        for attempt in 1..=30 {
            sleep(Duration::from_millis(200)).await;

            match client.get(&status_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!("chromedriver ready after {attempt} attempts");
                    return Ok(driver);
                }
                Ok(_) => warn!("chromedriver responded but not ready yet (attempt {attempt})"),
                Err(_) => {
                    if attempt % 5 == 0 {
                        info!("Waiting for chromedriver... (attempt {attempt})");
                    }
                }
            }
        }

        Err(ScrapeError::Launch(
            "chromedriver did not become ready within timeout".to_string(),
        ))
    }

    pub fn webdriver_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        info!("Shutting down chromedriver...");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn chrome_capabilities() -> serde_json::Map<String, serde_json::Value> {
    let (width, height) = SCREEN_SIZE;
    let mut caps = serde_json::Map::new();
    caps.insert("browserName".into(), "chrome".into());
    caps.insert(
        "goog:chromeOptions".into(),
        serde_json::json!({
            "args": [
                format!("--window-size={width},{height}"),
                "--no-sandbox",
                "--disable-dev-shm-usage",
            ]
        }),
    );
    caps
}

/// A WebDriver session. Must be closed with [`BrowserSession::close`].
pub struct BrowserSession {
    pub client: Client,
}

impl BrowserSession {
    pub async fn connect(url: &str) -> Result<Self, ScrapeError> {
        let client = ClientBuilder::native()
            .capabilities(chrome_capabilities())
            .connect(url)
            .await
            .map_err(|e| ScrapeError::Launch(format!("WebDriver session at {url}: {e}")))?;

        Ok(Self { client })
    }

    pub async fn close(self) {
        if let Err(e) = self.client.close().await {
            warn!("failed to close WebDriver session: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_request_chrome_at_screen_size() {
        let caps = chrome_capabilities();
        assert_eq!(caps["browserName"], "chrome");
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.iter().any(|a| a == "--window-size=1920,1080"));
    }
}
