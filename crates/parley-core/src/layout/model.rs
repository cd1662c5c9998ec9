//! Layout state: main view, side panels and theme.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// The screen shown in the main area.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MainView {
    #[default]
    Thread,
    Hub,
    Settings,
    LocalServer,
    SystemMonitor,
}

impl MainView {
    /// The hub is a full-width screen with no side panels.
    pub fn offers_left_panel_toggle(self) -> bool {
        self != MainView::Hub
    }

    pub fn offers_right_panel_toggle(self) -> bool {
        !matches!(self, MainView::Hub | MainView::Settings)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// A panel toggle as the top bar should draw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelToggle {
    /// The panel is open; the button closes it.
    Close,
    /// The panel is closed; the button opens it.
    Open,
}

impl PanelToggle {
    fn for_visibility(visible: bool) -> Self {
        if visible {
            PanelToggle::Close
        } else {
            PanelToggle::Open
        }
    }
}

/// What the top bar offers for the current layout state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopPanelControls {
    pub left_panel: Option<PanelToggle>,
    pub right_panel: Option<PanelToggle>,
    /// The theme the theme button switches to.
    pub theme_target: Theme,
}

impl TopPanelControls {
    pub fn for_state(view: MainView, show_left: bool, show_right: bool, theme: Theme) -> Self {
        Self {
            left_panel: view
                .offers_left_panel_toggle()
                .then(|| PanelToggle::for_visibility(show_left)),
            right_panel: view
                .offers_right_panel_toggle()
                .then(|| PanelToggle::for_visibility(show_right)),
            theme_target: theme.toggled(),
        }
    }
}
