//! Layout controller: main view, side panels and theme.

use parley_core::error::Result;
use parley_core::layout::{MainView, NativeThemeBridge, Theme, TopPanelControls};
use std::sync::Arc;

use crate::state::AppStores;

const LOG_TARGET: &str = "parley::layout";

/// Facts about the previous run that affect the first screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartupHints {
    /// The data folder was moved; the settings screen confirms the new location.
    pub data_folder_relocated: bool,
}

pub struct LayoutController {
    stores: Arc<AppStores>,
    bridge: Arc<dyn NativeThemeBridge>,
}

impl LayoutController {
    pub fn new(stores: Arc<AppStores>, bridge: Arc<dyn NativeThemeBridge>) -> Self {
        Self { stores, bridge }
    }

    pub fn set_main_view(&self, view: MainView) {
        if self.stores.main_view.get() == view {
            return;
        }
        self.stores.main_view.set(view);
        tracing::debug!(target: LOG_TARGET, %view, "Main view changed");
    }

    pub fn toggle_left_panel(&self) -> bool {
        self.stores.show_left_panel.update(|visible| {
            *visible = !*visible;
            *visible
        })
    }

    pub fn toggle_right_panel(&self) -> bool {
        self.stores.show_right_panel.update(|visible| {
            *visible = !*visible;
            *visible
        })
    }

    /// Applies `theme` to the native window, then to the theme store.
    ///
    /// # Errors
    ///
    /// Returns the bridge error; the theme store keeps its value and the
    /// failure is recorded.
    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        if let Err(error) = self.bridge.apply(theme).await {
            tracing::error!(target: LOG_TARGET, %theme, error = %error, "Failed to apply native theme");
            self.stores
                .failures
                .record("apply_theme", &theme.to_string(), &error);
            return Err(error);
        }
        self.stores.theme.set(theme);
        tracing::info!(target: LOG_TARGET, %theme, "Theme changed");
        Ok(())
    }

    pub async fn toggle_theme(&self) -> Result<Theme> {
        let next = self.stores.theme.get().toggled();
        self.set_theme(next).await?;
        Ok(next)
    }

    /// The toggles the top bar should draw for the current state.
    pub fn top_panel_controls(&self) -> TopPanelControls {
        let stores = &self.stores;
        TopPanelControls::for_state(
            stores.main_view.get(),
            stores.show_left_panel.get(),
            stores.show_right_panel.get(),
            stores.theme.get(),
        )
    }

    pub fn apply_startup(&self, hints: StartupHints) {
        if hints.data_folder_relocated {
            tracing::info!(target: LOG_TARGET, "Data folder relocated, opening settings");
            self.set_main_view(MainView::Settings);
        }
    }
}
