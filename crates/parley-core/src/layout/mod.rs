//! Layout domain module.

mod model;

pub use model::{MainView, PanelToggle, Theme, TopPanelControls};

use async_trait::async_trait;

use crate::error::Result;

/// Pushes the chosen theme to the native window chrome.
#[async_trait]
pub trait NativeThemeBridge: Send + Sync {
    async fn apply(&self, theme: Theme) -> Result<()>;
}
