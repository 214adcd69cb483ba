use serde::{Deserialize, Serialize};

use crate::models::{
    deserialize_repeat, AuthUser, Priority, Repeat, Task, TaskDraft, ThemeMode, Timestamp,
};

/// Every state mutation the presentation layer can request. Field names are camelCase
/// like the task records they carry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Action {
    AddTask { draft: TaskDraft },
    UpdateTask { task: Task },
    ToggleTaskComplete { id: String },
    ToggleTaskImportant { id: String },
    UpdateTaskPriority { id: String, priority: Priority },
    UpdateTaskDueDate { id: String, due_date: Option<Timestamp> },
    UpdateTaskReminder { id: String, reminder: Option<Timestamp> },
    UpdateTaskRepeat {
        id: String,
        #[serde(default, deserialize_with = "deserialize_repeat")]
        repeat: Option<Repeat>,
    },
    UpdateTaskNotes { id: String, notes: String },
    UpdateTaskLocation {
        id: String,
        is_outdoor: bool,
        location: String,
    },
    AddTaskStep { task_id: String, text: String },
    ToggleTaskStep { task_id: String, step_id: String },
    DeleteTaskStep { task_id: String, step_id: String },
    DeleteTask { id: String },
    ReorderTasks {
        source_index: usize,
        destination_index: usize,
    },
    SetActiveList { list_id: String },
    AddList {
        name: String,
        #[serde(default)]
        icon: Option<String>,
    },
    Login { user: AuthUser },
    Logout,
    ToggleSidebar,
    SetSidebarOpen { open: bool },
    ToggleGridView,
    SetSelectedTask { id: Option<String> },
    SetSearchQuery { query: String },
    ToggleTheme,
    SetTheme { mode: ThemeMode },
}

/// Which stored key an applied action rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persist {
    Nothing,
    Tasks,
    Lists,
    Auth,
    GridView,
    Theme,
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::AddTask { .. } => "add_task",
            Action::UpdateTask { .. } => "update_task",
            Action::ToggleTaskComplete { .. } => "toggle_task_complete",
            Action::ToggleTaskImportant { .. } => "toggle_task_important",
            Action::UpdateTaskPriority { .. } => "update_task_priority",
            Action::UpdateTaskDueDate { .. } => "update_task_due_date",
            Action::UpdateTaskReminder { .. } => "update_task_reminder",
            Action::UpdateTaskRepeat { .. } => "update_task_repeat",
            Action::UpdateTaskNotes { .. } => "update_task_notes",
            Action::UpdateTaskLocation { .. } => "update_task_location",
            Action::AddTaskStep { .. } => "add_task_step",
            Action::ToggleTaskStep { .. } => "toggle_task_step",
            Action::DeleteTaskStep { .. } => "delete_task_step",
            Action::DeleteTask { .. } => "delete_task",
            Action::ReorderTasks { .. } => "reorder_tasks",
            Action::SetActiveList { .. } => "set_active_list",
            Action::AddList { .. } => "add_list",
            Action::Login { .. } => "login",
            Action::Logout => "logout",
            Action::ToggleSidebar => "toggle_sidebar",
            Action::SetSidebarOpen { .. } => "set_sidebar_open",
            Action::ToggleGridView => "toggle_grid_view",
            Action::SetSelectedTask { .. } => "set_selected_task",
            Action::SetSearchQuery { .. } => "set_search_query",
            Action::ToggleTheme => "toggle_theme",
            Action::SetTheme { .. } => "set_theme",
        }
    }

    pub fn persists(&self) -> Persist {
        match self {
            Action::AddTask { .. }
            | Action::UpdateTask { .. }
            | Action::ToggleTaskComplete { .. }
            | Action::ToggleTaskImportant { .. }
            | Action::UpdateTaskPriority { .. }
            | Action::UpdateTaskDueDate { .. }
            | Action::UpdateTaskReminder { .. }
            | Action::UpdateTaskRepeat { .. }
            | Action::UpdateTaskNotes { .. }
            | Action::UpdateTaskLocation { .. }
            | Action::AddTaskStep { .. }
            | Action::ToggleTaskStep { .. }
            | Action::DeleteTaskStep { .. }
            | Action::DeleteTask { .. }
            | Action::ReorderTasks { .. } => Persist::Tasks,
            Action::AddList { .. } => Persist::Lists,
            Action::Login { .. } | Action::Logout => Persist::Auth,
            Action::ToggleGridView => Persist::GridView,
            Action::ToggleTheme | Action::SetTheme { .. } => Persist::Theme,
            Action::SetActiveList { .. }
            | Action::ToggleSidebar
            | Action::SetSidebarOpen { .. }
            | Action::SetSelectedTask { .. }
            | Action::SetSearchQuery { .. } => Persist::Nothing,
        }
    }

    /// The task id an action addresses, if it addresses one.
    pub fn target_id(&self) -> Option<&str> {
        match self {
            Action::UpdateTask { task } => Some(&task.id),
            Action::ToggleTaskComplete { id }
            | Action::ToggleTaskImportant { id }
            | Action::UpdateTaskPriority { id, .. }
            | Action::UpdateTaskDueDate { id, .. }
            | Action::UpdateTaskReminder { id, .. }
            | Action::UpdateTaskRepeat { id, .. }
            | Action::UpdateTaskNotes { id, .. }
            | Action::UpdateTaskLocation { id, .. }
            | Action::DeleteTask { id } => Some(id),
            Action::AddTaskStep { task_id, .. }
            | Action::ToggleTaskStep { task_id, .. }
            | Action::DeleteTaskStep { task_id, .. } => Some(task_id),
            _ => None,
        }
    }
}
