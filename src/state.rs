use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::actions::{Action, Persist};
use crate::auth::AuthState;
use crate::events::StatePayload;
use crate::filter::{self, ListStats, VisibleTasks};
use crate::location::{ambient_source, AmbientSource, Geolocator};
use crate::models::{List, Task, TaskDraft, Timestamp, WeatherRecord};
use crate::settings::Settings;
use crate::storage::{Storage, StorageError, KEY_IS_AUTHENTICATED, KEY_IS_GRID_VIEW};
use crate::tasks::TaskState;
use crate::ui::UiState;
use crate::weather::{WeatherError, WeatherProvider, WeatherQuery, WeatherSlot, WeatherState};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("{action}: '{id}' not found")]
    NotFound { action: &'static str, id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Changed,
    Unchanged,
    Created { id: String },
}

fn changed(found: bool) -> Outcome {
    if found {
        Outcome::Changed
    } else {
        Outcome::Unchanged
    }
}

/// Told when a weather request enters its pending phase, before the provider is called.
pub trait WeatherListener: Sync {
    fn weather_pending(&self, state: &AppState);
}

impl WeatherListener for () {
    fn weather_pending(&self, _state: &AppState) {}
}

#[derive(Debug)]
struct AppData {
    tasks: TaskState,
    ui: UiState,
    auth: AuthState,
    weather: WeatherState,
}

/// The whole application state. Cloning shares it; mutations go through
/// [`AppState::dispatch`] one at a time.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<AppData>>,
    storage: Storage,
    settings: Arc<Settings>,
}

impl AppState {
    pub fn load(storage: Storage, settings: Settings) -> Self {
        let tasks = storage.load_tasks();
        let lists = storage.load_lists();
        let is_authenticated = storage.load_flag(KEY_IS_AUTHENTICATED);
        let user = if is_authenticated {
            storage.load_user()
        } else {
            None
        };
        let ui = UiState::new(
            settings.viewport_width,
            storage.load_flag(KEY_IS_GRID_VIEW),
            storage.load_theme(),
        );
        log::info!(
            "state loaded tasks={} lists={} authenticated={is_authenticated}",
            tasks.len(),
            lists.len()
        );
        Self {
            inner: Arc::new(Mutex::new(AppData {
                tasks: TaskState::new(tasks, lists),
                ui,
                auth: AuthState::new(user, is_authenticated),
                weather: WeatherState::default(),
            })),
            storage,
            settings: Arc::new(settings),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AppData> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn dispatch(&self, action: Action) -> Result<Outcome, StateError> {
        self.dispatch_at(action, Utc::now())
    }

    /// Applies `action` with `now` as the creation time for new tasks, then writes
    /// the affected key. A failed write keeps the in-memory change.
    pub fn dispatch_at(&self, action: Action, now: Timestamp) -> Result<Outcome, StateError> {
        let kind = action.kind();
        let persist = action.persists();
        let target = action.target_id().map(str::to_string);

        let mut guard = self.lock();
        let outcome = reduce(&mut guard, action, now);
        log::debug!("action applied kind={kind} outcome={outcome:?}");

        if outcome == Outcome::Unchanged {
            if let (true, Some(id)) = (self.settings.strict_ids, target) {
                return Err(StateError::NotFound { action: kind, id });
            }
            return Ok(outcome);
        }

        if let Err(err) = self.persist(&guard, persist) {
            log::error!("failed to persist after {kind}: {err}");
            return Err(err.into());
        }
        Ok(outcome)
    }

    fn persist(&self, data: &AppData, persist: Persist) -> Result<(), StorageError> {
        match persist {
            Persist::Nothing => Ok(()),
            Persist::Tasks => self.storage.save_tasks(&data.tasks.tasks),
            Persist::Lists => self.storage.save_lists(&data.tasks.lists),
            Persist::Auth => {
                self.storage.save_user(data.auth.user.as_ref())?;
                self.storage
                    .save_flag(KEY_IS_AUTHENTICATED, data.auth.is_authenticated)
            }
            Persist::GridView => self.storage.save_flag(KEY_IS_GRID_VIEW, data.ui.is_grid_view),
            Persist::Theme => self.storage.save_theme(data.ui.theme),
        }
    }

    pub fn add_task(&self, draft: TaskDraft) -> Result<Task, StateError> {
        let id = match self.dispatch(Action::AddTask { draft })? {
            Outcome::Created { id } => id,
            _ => String::new(),
        };
        self.task(&id)
            .ok_or(StateError::NotFound { action: "add_task", id })
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.tasks.clone()
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.lock().tasks.task(id).cloned()
    }

    pub fn lists(&self) -> Vec<List> {
        self.lock().tasks.lists.clone()
    }

    pub fn active_list(&self) -> String {
        self.lock().tasks.active_list.clone()
    }

    pub fn ui(&self) -> UiState {
        self.lock().ui.clone()
    }

    pub fn auth(&self) -> AuthState {
        self.lock().auth.clone()
    }

    pub fn weather(&self) -> WeatherState {
        self.lock().weather.clone()
    }

    pub fn visible_tasks(&self) -> VisibleTasks {
        self.visible_tasks_at(&Local::now())
    }

    pub fn visible_tasks_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> VisibleTasks {
        let guard = self.lock();
        filter::visible_tasks(
            &guard.tasks.tasks,
            &guard.tasks.active_list,
            &guard.ui.search_query,
            now,
        )
    }

    pub fn list_stats(&self, list_id: &str) -> ListStats {
        self.list_stats_at(list_id, &Local::now())
    }

    pub fn list_stats_at<Tz: TimeZone>(&self, list_id: &str, now: &DateTime<Tz>) -> ListStats {
        filter::list_stats(&self.lock().tasks.tasks, list_id, now)
    }

    /// Weather recorded for an outdoor task's location, if any.
    pub fn weather_for_task(&self, task_id: &str) -> Option<WeatherRecord> {
        let guard = self.lock();
        let task = guard.tasks.task(task_id)?;
        if !task.is_outdoor || task.location.is_empty() {
            return None;
        }
        guard.weather.for_location(&task.location).cloned()
    }

    pub fn snapshot(&self) -> StatePayload {
        let guard = self.lock();
        StatePayload {
            tasks: guard.tasks.tasks.clone(),
            lists: guard.tasks.lists.clone(),
            active_list: guard.tasks.active_list.clone(),
            ui: guard.ui.clone(),
            auth: guard.auth.clone(),
            weather: guard.weather.clone(),
        }
    }

    pub fn clear_weather(&self) {
        self.lock().weather.clear();
    }

    pub async fn fetch_weather_by_location(
        &self,
        provider: &dyn WeatherProvider,
        city: &str,
        listener: &dyn WeatherListener,
    ) -> Result<WeatherRecord, WeatherError> {
        self.request_weather(
            provider,
            WeatherQuery::City(city.to_string()),
            WeatherSlot::Current,
            false,
            listener,
        )
        .await
    }

    /// With a `location_name` the record lands in the per-location map under that
    /// name; without one it replaces the current record.
    pub async fn fetch_weather_by_coordinates(
        &self,
        provider: &dyn WeatherProvider,
        lat: f64,
        lon: f64,
        location_name: Option<&str>,
        listener: &dyn WeatherListener,
    ) -> Result<WeatherRecord, WeatherError> {
        let slot = match location_name {
            Some(name) => WeatherSlot::Location(name.to_string()),
            None => WeatherSlot::Current,
        };
        self.request_weather(
            provider,
            WeatherQuery::Coordinates { lat, lon },
            slot,
            true,
            listener,
        )
        .await
    }

    /// Fetches weather for an outdoor task's location. `Ok(None)` when the task is
    /// missing, not outdoor, or has no location.
    pub async fn refresh_outdoor_weather(
        &self,
        provider: &dyn WeatherProvider,
        task_id: &str,
        listener: &dyn WeatherListener,
    ) -> Result<Option<WeatherRecord>, WeatherError> {
        let location = {
            let guard = self.lock();
            match guard.tasks.task(task_id) {
                Some(task) if task.is_outdoor && !task.location.trim().is_empty() => {
                    task.location.clone()
                }
                _ => return Ok(None),
            }
        };
        self.request_weather(
            provider,
            WeatherQuery::City(location.clone()),
            WeatherSlot::Location(location),
            false,
            listener,
        )
        .await
        .map(Some)
    }

    pub async fn refresh_ambient_weather(
        &self,
        provider: &dyn WeatherProvider,
        geolocator: &dyn Geolocator,
        listener: &dyn WeatherListener,
    ) -> Result<WeatherRecord, WeatherError> {
        match ambient_source(geolocator, &self.settings.default_location) {
            AmbientSource::Coordinates(position) => {
                self.fetch_weather_by_coordinates(
                    provider,
                    position.latitude,
                    position.longitude,
                    None,
                    listener,
                )
                .await
            }
            AmbientSource::DefaultLocation(city) => {
                self.fetch_weather_by_location(provider, &city, listener)
                    .await
            }
        }
    }

    async fn request_weather(
        &self,
        provider: &dyn WeatherProvider,
        query: WeatherQuery,
        slot: WeatherSlot,
        tag_location_name: bool,
        listener: &dyn WeatherListener,
    ) -> Result<WeatherRecord, WeatherError> {
        let token = self.lock().weather.begin();
        log::debug!("weather request started token={token} query={query:?}");
        listener.weather_pending(self);

        let result = provider.current_weather(&query).await.map(|mut record| {
            if tag_location_name {
                record.location_name = Some(match &slot {
                    WeatherSlot::Location(name) => name.clone(),
                    WeatherSlot::Current => record.location.clone(),
                });
            }
            record
        });

        let mut guard = self.lock();
        if self.settings.discard_stale_weather && guard.weather.is_stale(token) {
            log::debug!("dropping stale weather response token={token}");
            return result;
        }
        match &result {
            Ok(record) => guard.weather.fulfill(slot, record.clone()),
            Err(err) => {
                log::warn!("weather request failed token={token}: {err}");
                guard.weather.reject(err.to_string());
            }
        }
        result
    }
}

fn reduce(data: &mut AppData, action: Action, now: Timestamp) -> Outcome {
    let tasks = &mut data.tasks;
    match action {
        Action::AddTask { draft } => Outcome::Created {
            id: tasks.add_task(draft, now).id,
        },
        Action::UpdateTask { task } => changed(tasks.update_task(task)),
        Action::ToggleTaskComplete { id } => changed(tasks.toggle_complete(&id)),
        Action::ToggleTaskImportant { id } => changed(tasks.toggle_important(&id)),
        Action::UpdateTaskPriority { id, priority } => changed(tasks.set_priority(&id, priority)),
        Action::UpdateTaskDueDate { id, due_date } => changed(tasks.set_due_date(&id, due_date)),
        Action::UpdateTaskReminder { id, reminder } => {
            changed(tasks.set_reminder(&id, reminder))
        }
        Action::UpdateTaskRepeat { id, repeat } => changed(tasks.set_repeat(&id, repeat)),
        Action::UpdateTaskNotes { id, notes } => changed(tasks.set_notes(&id, notes)),
        Action::UpdateTaskLocation {
            id,
            is_outdoor,
            location,
        } => changed(tasks.set_location(&id, is_outdoor, location)),
        Action::AddTaskStep { task_id, text } => match tasks.add_step(&task_id, text) {
            Some(step) => Outcome::Created { id: step.id },
            None => Outcome::Unchanged,
        },
        Action::ToggleTaskStep { task_id, step_id } => {
            changed(tasks.toggle_step(&task_id, &step_id))
        }
        Action::DeleteTaskStep { task_id, step_id } => {
            changed(tasks.delete_step(&task_id, &step_id))
        }
        Action::DeleteTask { id } => changed(tasks.delete_task(&id)),
        Action::ReorderTasks {
            source_index,
            destination_index,
        } => changed(tasks.reorder(source_index, destination_index)),
        Action::SetActiveList { list_id } => {
            tasks.set_active_list(list_id);
            Outcome::Changed
        }
        Action::AddList { name, icon } => Outcome::Created {
            id: tasks.add_list(name, icon).id,
        },
        Action::Login { user } => {
            data.auth.login(user);
            Outcome::Changed
        }
        Action::Logout => {
            data.auth.logout();
            Outcome::Changed
        }
        Action::ToggleSidebar => {
            data.ui.toggle_sidebar();
            Outcome::Changed
        }
        Action::SetSidebarOpen { open } => {
            data.ui.set_sidebar_open(open);
            Outcome::Changed
        }
        Action::ToggleGridView => {
            data.ui.toggle_grid_view();
            Outcome::Changed
        }
        Action::SetSelectedTask { id } => {
            data.ui.set_selected_task(id);
            Outcome::Changed
        }
        Action::SetSearchQuery { query } => {
            data.ui.set_search_query(query);
            Outcome::Changed
        }
        Action::ToggleTheme => {
            data.ui.toggle_theme();
            Outcome::Changed
        }
        Action::SetTheme { mode } => {
            data.ui.set_theme(mode);
            Outcome::Changed
        }
    }
}
