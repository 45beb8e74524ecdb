pub mod overlay;
pub mod render;
pub mod stream;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::debug;

use livelay::{BackendClient, Config, Notice, NoticeLevel};

pub fn backend(config: &Config) -> Result<Arc<BackendClient>> {
    let client = BackendClient::new(&config.api)
        .with_context(|| format!("invalid API base URL: {}", config.api.base_url))?;
    debug!(base = %client.base(), "backend client ready");
    Ok(Arc::new(client))
}

/// Run `cancel` when the user hits Ctrl-C. Abort the handle once the
/// guarded operation is over.
pub fn on_ctrl_c(cancel: impl FnOnce() + Send + 'static) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n⏹️  Cancelling...");
            cancel();
        }
    })
}

/// Print notices; returns `true` if any was an error.
pub fn print_notices(notices: &[Notice]) -> bool {
    let mut failed = false;
    for notice in notices {
        match notice.level {
            NoticeLevel::Info => eprintln!("ℹ️  {}", notice.message),
            NoticeLevel::Warning => eprintln!("⚠️  {}", notice.message),
            NoticeLevel::Error => {
                failed = true;
                eprintln!("❌ {}", notice.message);
            }
        }
    }
    failed
}
