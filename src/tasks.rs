use uuid::Uuid;

use crate::models::{
    List, Priority, Repeat, Step, Task, TaskDraft, Timestamp, DEFAULT_LIST_ICON, LIST_ALL,
};

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Tasks, lists and the active list pointer. Methods that target an id return
/// whether anything was found; a miss leaves the state untouched.
#[derive(Debug, Clone)]
pub struct TaskState {
    pub tasks: Vec<Task>,
    pub lists: Vec<List>,
    pub active_list: String,
}

impl TaskState {
    pub fn new(tasks: Vec<Task>, lists: Vec<List>) -> Self {
        Self {
            tasks,
            lists,
            active_list: LIST_ALL.to_string(),
        }
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn patch(&mut self, id: &str, apply: impl FnOnce(&mut Task)) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                apply(task);
                true
            }
            None => false,
        }
    }

    pub fn add_task(&mut self, draft: TaskDraft, now: Timestamp) -> Task {
        let task = Task {
            id: new_id(),
            title: draft.title,
            completed: false,
            important: draft.important,
            priority: draft.priority.unwrap_or_default(),
            due_date: draft.due_date,
            reminder: draft.reminder,
            repeat: draft.repeat,
            notes: draft.notes,
            steps: draft.steps,
            is_outdoor: draft.is_outdoor,
            location: draft.location,
            list_id: draft.list_id,
            assigned: false,
            created_at: now,
            position: draft.position.unwrap_or(0),
        };
        self.tasks.push(task.clone());
        task
    }

    pub fn update_task(&mut self, task: Task) -> bool {
        let id = task.id.clone();
        self.patch(&id, |existing| *existing = task)
    }

    pub fn toggle_complete(&mut self, id: &str) -> bool {
        self.patch(id, |task| task.completed = !task.completed)
    }

    pub fn toggle_important(&mut self, id: &str) -> bool {
        self.patch(id, |task| task.important = !task.important)
    }

    pub fn set_priority(&mut self, id: &str, priority: Priority) -> bool {
        self.patch(id, |task| task.priority = priority)
    }

    pub fn set_due_date(&mut self, id: &str, due_date: Option<Timestamp>) -> bool {
        self.patch(id, |task| task.due_date = due_date)
    }

    pub fn set_reminder(&mut self, id: &str, reminder: Option<Timestamp>) -> bool {
        self.patch(id, |task| task.reminder = reminder)
    }

    pub fn set_repeat(&mut self, id: &str, repeat: Option<Repeat>) -> bool {
        self.patch(id, |task| task.repeat = repeat)
    }

    pub fn set_notes(&mut self, id: &str, notes: String) -> bool {
        self.patch(id, |task| task.notes = notes)
    }

    pub fn set_location(&mut self, id: &str, is_outdoor: bool, location: String) -> bool {
        self.patch(id, |task| {
            task.is_outdoor = is_outdoor;
            task.location = location;
        })
    }

    pub fn add_step(&mut self, task_id: &str, text: String) -> Option<Step> {
        let task = self.tasks.iter_mut().find(|t| t.id == task_id)?;
        let step = Step {
            id: new_id(),
            text,
            completed: false,
        };
        task.steps.push(step.clone());
        Some(step)
    }

    pub fn toggle_step(&mut self, task_id: &str, step_id: &str) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) else {
            return false;
        };
        match task.steps.iter_mut().find(|s| s.id == step_id) {
            Some(step) => {
                step.completed = !step.completed;
                true
            }
            None => false,
        }
    }

    pub fn delete_step(&mut self, task_id: &str, step_id: &str) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) else {
            return false;
        };
        let before = task.steps.len();
        task.steps.retain(|s| s.id != step_id);
        task.steps.len() != before
    }

    pub fn delete_task(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }

    /// Moves the task at `source_index` of the full collection to `destination_index`
    /// and renumbers every position to match its index. The indices address the whole
    /// collection, not a filtered view of it.
    pub fn reorder(&mut self, source_index: usize, destination_index: usize) -> bool {
        if source_index >= self.tasks.len() {
            return false;
        }
        let moved = self.tasks.remove(source_index);
        let destination = destination_index.min(self.tasks.len());
        self.tasks.insert(destination, moved);
        for (index, task) in self.tasks.iter_mut().enumerate() {
            task.position = index as i64;
        }
        true
    }

    pub fn set_active_list(&mut self, list_id: String) {
        self.active_list = list_id;
    }

    pub fn add_list(&mut self, name: String, icon: Option<String>) -> List {
        let list = List {
            id: new_id(),
            name,
            icon: icon
                .filter(|icon| !icon.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LIST_ICON.to_string()),
        };
        self.lists.push(list.clone());
        list
    }
}
