//! Derived views over the task collection: list membership, search, progress.

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::models::{
    Task, LIST_ALL, LIST_ASSIGNED, LIST_IMPORTANT, LIST_PLANNED, LIST_TODAY,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFilter<'a> {
    All,
    Today,
    Important,
    Planned,
    Assigned,
    Custom(&'a str),
}

impl<'a> ListFilter<'a> {
    pub fn from_id(list_id: &'a str) -> Self {
        match list_id {
            LIST_ALL => ListFilter::All,
            LIST_TODAY => ListFilter::Today,
            LIST_IMPORTANT => ListFilter::Important,
            LIST_PLANNED => ListFilter::Planned,
            LIST_ASSIGNED => ListFilter::Assigned,
            other => ListFilter::Custom(other),
        }
    }

    /// `now` fixes both "today" and the timezone the due date is read in.
    pub fn matches<Tz: TimeZone>(&self, task: &Task, now: &DateTime<Tz>) -> bool {
        match self {
            ListFilter::All => true,
            ListFilter::Today => is_due_today(task, now),
            ListFilter::Important => task.important,
            ListFilter::Planned => task.due_date.is_some(),
            ListFilter::Assigned => task.assigned,
            ListFilter::Custom(id) => task.list_id.as_deref() == Some(*id),
        }
    }
}

pub fn is_due_today<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> bool {
    match task.due_date {
        Some(due) => due.with_timezone(&now.timezone()).date_naive() == now.date_naive(),
        None => false,
    }
}

pub fn matches_query(task: &Task, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    task.title.to_lowercase().contains(&query.to_lowercase())
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct VisibleTasks {
    pub active: Vec<Task>,
    pub completed: Vec<Task>,
}

impl VisibleTasks {
    pub fn len(&self) -> usize {
        self.active.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn visible_tasks<Tz: TimeZone>(
    tasks: &[Task],
    active_list: &str,
    query: &str,
    now: &DateTime<Tz>,
) -> VisibleTasks {
    let filter = ListFilter::from_id(active_list);
    let (mut completed, mut active): (Vec<Task>, Vec<Task>) = tasks
        .iter()
        .filter(|task| matches_query(task, query) && filter.matches(task, now))
        .cloned()
        .partition(|task| task.completed);
    active.sort_by_key(|task| task.position);
    completed.sort_by_key(|task| task.position);
    VisibleTasks { active, completed }
}

fn percentage(part: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u8
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct StepProgress {
    pub completed: usize,
    pub total: usize,
}

pub fn step_progress(task: &Task) -> StepProgress {
    StepProgress {
        completed: task.steps.iter().filter(|step| step.completed).count(),
        total: task.steps.len(),
    }
}

/// Share of completed steps, 0 for a task without steps.
pub fn completion_percentage(task: &Task) -> u8 {
    let progress = step_progress(task);
    percentage(progress.completed, progress.total)
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ListStats {
    pub total: usize,
    pub completed: usize,
    pub percentage: u8,
}

/// Counts for a list, ignoring the search query.
pub fn list_stats<Tz: TimeZone>(tasks: &[Task], list_id: &str, now: &DateTime<Tz>) -> ListStats {
    let filter = ListFilter::from_id(list_id);
    let members: Vec<&Task> = tasks.iter().filter(|task| filter.matches(task, now)).collect();
    let total = members.len();
    let completed = members.iter().filter(|task| task.completed).count();
    ListStats {
        total,
        completed,
        percentage: percentage(completed, total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, Step};
    use chrono::Utc;
    use chrono_tz::Europe::Paris;

    fn make_task(id: &str, position: i64) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task-{id}"),
            completed: false,
            important: false,
            priority: Priority::Medium,
            due_date: None,
            reminder: None,
            repeat: None,
            notes: String::new(),
            steps: Vec::new(),
            is_outdoor: false,
            location: String::new(),
            list_id: None,
            assigned: false,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
            position,
        }
    }

    fn step(completed: bool) -> Step {
        Step {
            id: format!("s-{completed}"),
            text: "step".into(),
            completed,
        }
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn today_and_important_pick_exactly_their_task() {
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 15, 0, 0).unwrap();
        let mut due_today = make_task("today", 0);
        due_today.due_date = Some(Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap());
        let undated = make_task("undated", 1);
        let mut important = make_task("important", 2);
        important.important = true;
        let tasks = vec![due_today, undated, important];

        let today = visible_tasks(&tasks, "today", "", &now);
        assert_eq!(ids(&today.active), vec!["today"]);
        assert!(today.completed.is_empty());

        let starred = visible_tasks(&tasks, "important", "", &now);
        assert_eq!(ids(&starred.active), vec!["important"]);
    }

    #[test]
    fn today_uses_the_calendar_date_of_the_given_timezone() {
        let mut late = make_task("late", 0);
        late.due_date = Some(Utc.with_ymd_and_hms(2024, 5, 1, 23, 30, 0).unwrap());
        let tasks = vec![late];

        let utc_now = Utc.with_ymd_and_hms(2024, 5, 2, 10, 0, 0).unwrap();
        assert!(visible_tasks(&tasks, "today", "", &utc_now).is_empty());

        let paris_now = Paris.with_ymd_and_hms(2024, 5, 2, 10, 0, 0).unwrap();
        assert_eq!(visible_tasks(&tasks, "today", "", &paris_now).len(), 1);
    }

    #[test]
    fn planned_assigned_and_custom_lists() {
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 15, 0, 0).unwrap();
        let mut past = make_task("past", 0);
        past.due_date = Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        let mut future = make_task("future", 1);
        future.due_date = Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
        let mut grocery = make_task("grocery", 2);
        grocery.list_id = Some("groceries".into());
        let tasks = vec![past, future, grocery];

        assert_eq!(
            ids(&visible_tasks(&tasks, "planned", "", &now).active),
            vec!["past", "future"]
        );
        assert!(visible_tasks(&tasks, "assigned", "", &now).is_empty());
        assert_eq!(
            ids(&visible_tasks(&tasks, "groceries", "", &now).active),
            vec!["grocery"]
        );
        assert_eq!(visible_tasks(&tasks, "all", "", &now).len(), 3);
        // "outdoor" has no computed membership; it only matches tasks filed under it.
        assert!(visible_tasks(&tasks, "outdoor", "", &now).is_empty());
    }

    #[test]
    fn search_is_case_insensitive_and_combines_with_the_list() {
        let now = Utc::now();
        let mut milk = make_task("milk", 0);
        milk.title = "Buy MILK".into();
        milk.important = true;
        let mut bread = make_task("bread", 1);
        bread.title = "buy bread".into();
        let tasks = vec![milk, bread];

        assert_eq!(visible_tasks(&tasks, "all", "buy", &now).len(), 2);
        assert_eq!(ids(&visible_tasks(&tasks, "all", "milk", &now).active), vec!["milk"]);
        assert!(visible_tasks(&tasks, "important", "bread", &now).is_empty());
        assert!(visible_tasks(&tasks, "all", "cheese", &now).is_empty());
    }

    #[test]
    fn groups_are_split_by_completion_and_sorted_by_position() {
        let now = Utc::now();
        let mut done_late = make_task("done-late", 9);
        done_late.completed = true;
        let mut done_early = make_task("done-early", 1);
        done_early.completed = true;
        let tasks = vec![
            make_task("c", 5),
            done_late,
            make_task("a", 0),
            done_early,
            make_task("b", 3),
        ];

        let view = visible_tasks(&tasks, "all", "", &now);
        assert_eq!(ids(&view.active), vec!["a", "b", "c"]);
        assert_eq!(ids(&view.completed), vec!["done-early", "done-late"]);
    }

    #[test]
    fn completion_percentage_stays_in_range() {
        let mut task = make_task("t", 0);
        assert_eq!(completion_percentage(&task), 0);

        task.steps = vec![step(true), step(false), step(false)];
        assert_eq!(completion_percentage(&task), 33);
        assert_eq!(step_progress(&task), StepProgress { completed: 1, total: 3 });

        task.steps = vec![step(true), step(true), step(false)];
        assert_eq!(completion_percentage(&task), 67);

        task.steps = vec![step(true); 4];
        assert_eq!(completion_percentage(&task), 100);

        for total in 1..=12usize {
            for done in 0..=total {
                let mut t = make_task("r", 0);
                t.steps = (0..total).map(|i| step(i < done)).collect();
                assert!(completion_percentage(&t) <= 100);
            }
        }
    }

    #[test]
    fn list_stats_ignore_search_and_count_completion() {
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 15, 0, 0).unwrap();
        let mut a = make_task("a", 0);
        a.important = true;
        a.completed = true;
        let mut b = make_task("b", 1);
        b.important = true;
        let mut c = make_task("c", 2);
        c.important = true;
        let tasks = vec![a, b, c, make_task("d", 3)];

        assert_eq!(
            list_stats(&tasks, "important", &now),
            ListStats {
                total: 3,
                completed: 1,
                percentage: 33
            }
        );
        assert_eq!(
            list_stats(&tasks, "all", &now),
            ListStats {
                total: 4,
                completed: 1,
                percentage: 25
            }
        );
        assert_eq!(
            list_stats(&tasks, "empty-list", &now),
            ListStats {
                total: 0,
                completed: 0,
                percentage: 0
            }
        );
    }
}
