use serde::Serialize;

use crate::models::ThemeMode;

/// Viewports at or below this width start with the sidebar collapsed.
pub const SIDEBAR_BREAKPOINT: u32 = 768;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    pub sidebar_open: bool,
    pub is_grid_view: bool,
    pub selected_task_id: Option<String>,
    pub search_query: String,
    pub theme: ThemeMode,
}

impl UiState {
    pub fn new(viewport_width: u32, is_grid_view: bool, theme: ThemeMode) -> Self {
        Self {
            sidebar_open: viewport_width > SIDEBAR_BREAKPOINT,
            is_grid_view,
            selected_task_id: None,
            search_query: String::new(),
            theme,
        }
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
    }

    pub fn set_sidebar_open(&mut self, open: bool) {
        self.sidebar_open = open;
    }

    pub fn toggle_grid_view(&mut self) -> bool {
        self.is_grid_view = !self.is_grid_view;
        self.is_grid_view
    }

    pub fn set_selected_task(&mut self, id: Option<String>) {
        self.selected_task_id = id;
    }

    pub fn set_search_query(&mut self, query: String) {
        self.search_query = query;
    }

    pub fn toggle_theme(&mut self) -> ThemeMode {
        self.theme = self.theme.toggled();
        self.theme
    }

    pub fn set_theme(&mut self, theme: ThemeMode) {
        self.theme = theme;
    }
}
