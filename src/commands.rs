use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actions::Action;
use crate::events::StatePayload;
use crate::location::Geolocator;
use crate::state::{AppState, Outcome, StateError, WeatherListener};
use crate::weather::{WeatherError, WeatherProvider};

#[derive(Debug, Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

/// Where state changes are announced to the presentation layer.
pub trait CommandCtx {
    fn emit_state_updated(&self, payload: StatePayload);
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Command {
    Snapshot,
    Dispatch {
        action: Action,
    },
    VisibleTasks,
    ListStats {
        list_id: String,
    },
    FetchWeatherByLocation {
        city: String,
    },
    FetchWeatherByCoordinates {
        lat: f64,
        lon: f64,
        #[serde(default)]
        location_name: Option<String>,
    },
    RefreshOutdoorWeather {
        task_id: String,
    },
    RefreshAmbientWeather,
    ClearWeather,
}

impl Command {
    /// Commands that wait on the network.
    pub fn suspends(&self) -> bool {
        matches!(
            self,
            Command::FetchWeatherByLocation { .. }
                | Command::FetchWeatherByCoordinates { .. }
                | Command::RefreshOutdoorWeather { .. }
                | Command::RefreshAmbientWeather
        )
    }
}

/// A command line from the host, optionally carrying an `id` echoed in the response.
#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(flatten)]
    pub command: Command,
}

pub(crate) fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

pub(crate) fn err<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

fn into_value<T: Serialize>(result: CommandResult<T>) -> CommandResult<Value> {
    let CommandResult { ok: success, data, error } = result;
    match data.map(serde_json::to_value).transpose() {
        Ok(data) => CommandResult {
            ok: success,
            data,
            error,
        },
        Err(error) => err(&format!("serialize error: {error}")),
    }
}

fn emit(ctx: &impl CommandCtx, state: &AppState) {
    ctx.emit_state_updated(state.snapshot());
}

fn dispatch_impl(ctx: &impl CommandCtx, state: &AppState, action: Action) -> CommandResult<Outcome> {
    match state.dispatch(action) {
        Ok(Outcome::Unchanged) => ok(Outcome::Unchanged),
        Ok(outcome) => {
            emit(ctx, state);
            ok(outcome)
        }
        Err(error @ StateError::Storage(_)) => {
            // The in-memory change already happened.
            emit(ctx, state);
            err(&error.to_string())
        }
        Err(error) => err(&error.to_string()),
    }
}

/// Publishes the pending phase of a weather request so hosts can show `loading`.
struct PendingNotice<'a, C>(&'a C);

impl<C: CommandCtx + Sync> WeatherListener for PendingNotice<'_, C> {
    fn weather_pending(&self, state: &AppState) {
        emit(self.0, state);
    }
}

fn weather_result<T>(
    ctx: &impl CommandCtx,
    state: &AppState,
    result: Result<T, WeatherError>,
) -> CommandResult<T> {
    emit(ctx, state);
    match result {
        Ok(data) => ok(data),
        Err(error) => err(&error.to_string()),
    }
}

pub async fn handle_command(
    ctx: &(impl CommandCtx + Sync),
    state: &AppState,
    provider: &dyn WeatherProvider,
    geolocator: &dyn Geolocator,
    command: Command,
) -> CommandResult<Value> {
    let pending = PendingNotice(ctx);
    match command {
        Command::Snapshot => into_value(ok(state.snapshot())),
        Command::Dispatch { action } => into_value(dispatch_impl(ctx, state, action)),
        Command::VisibleTasks => into_value(ok(state.visible_tasks())),
        Command::ListStats { list_id } => into_value(ok(state.list_stats(&list_id))),
        Command::FetchWeatherByLocation { city } => {
            let result = state.fetch_weather_by_location(provider, &city, &pending).await;
            into_value(weather_result(ctx, state, result))
        }
        Command::FetchWeatherByCoordinates {
            lat,
            lon,
            location_name,
        } => {
            let result = state
                .fetch_weather_by_coordinates(
                    provider,
                    lat,
                    lon,
                    location_name.as_deref(),
                    &pending,
                )
                .await;
            into_value(weather_result(ctx, state, result))
        }
        Command::RefreshOutdoorWeather { task_id } => {
            match state.refresh_outdoor_weather(provider, &task_id, &pending).await {
                Ok(None) => into_value(ok(Value::Null)),
                result => into_value(weather_result(ctx, state, result)),
            }
        }
        Command::RefreshAmbientWeather => {
            let result = state
                .refresh_ambient_weather(provider, geolocator, &pending)
                .await;
            into_value(weather_result(ctx, state, result))
        }
        Command::ClearWeather => {
            state.clear_weather();
            emit(ctx, state);
            into_value(ok(true))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::NoGeolocation;
    use crate::models::{Coordinates, TaskDraft, WeatherRecord};
    use crate::settings::Settings;
    use crate::storage::Storage;
    use crate::weather::WeatherQuery;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    struct TestCtx {
        emitted: Mutex<Vec<StatePayload>>,
    }

    impl TestCtx {
        fn new() -> Self {
            Self {
                emitted: Mutex::new(Vec::new()),
            }
        }

        fn emitted(&self) -> usize {
            self.emitted.lock().unwrap().len()
        }

        fn loading_flags(&self) -> Vec<bool> {
            self.emitted
                .lock()
                .unwrap()
                .iter()
                .map(|payload| payload.weather.loading)
                .collect()
        }

        fn last(&self) -> StatePayload {
            self.emitted.lock().unwrap().last().cloned().expect("an emitted payload")
        }
    }

    impl CommandCtx for TestCtx {
        fn emit_state_updated(&self, payload: StatePayload) {
            self.emitted.lock().unwrap().push(payload);
        }
    }

    struct FakeProvider(Result<WeatherRecord, WeatherError>);

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn current_weather(
            &self,
            _query: &WeatherQuery,
        ) -> Result<WeatherRecord, WeatherError> {
            self.0.clone()
        }
    }

    fn sunny() -> FakeProvider {
        FakeProvider(Ok(WeatherRecord {
            temperature: 72,
            condition: "Clear".into(),
            description: "clear sky".into(),
            icon: "01d".into(),
            location: "New York".into(),
            humidity: 40.0,
            wind_speed: 3.0,
            coordinates: Coordinates {
                lat: 40.71,
                lon: -74.01,
            },
            timestamp: Utc::now(),
            location_name: None,
        }))
    }

    fn setup() -> (TestCtx, AppState) {
        (
            TestCtx::new(),
            AppState::load(Storage::in_memory(), Settings::default()),
        )
    }

    async fn run(ctx: &TestCtx, state: &AppState, command: Value) -> CommandResult<Value> {
        let command: Command = serde_json::from_value(command).expect("valid command");
        handle_command(ctx, state, &sunny(), &NoGeolocation, command).await
    }

    #[tokio::test]
    async fn dispatch_returns_outcome_and_emits_state() {
        let (ctx, state) = setup();
        let result = run(
            &ctx,
            &state,
            serde_json::json!({
                "command": "dispatch",
                "action": { "type": "add_task", "draft": { "title": "Buy milk" } }
            }),
        )
        .await;
        assert!(result.ok);
        let data = result.data.unwrap();
        assert_eq!(data["outcome"], "created");
        assert!(data["id"].is_string());
        assert_eq!(ctx.emitted(), 1);
        assert_eq!(ctx.last().tasks[0].title, "Buy milk");
    }

    #[tokio::test]
    async fn unchanged_dispatch_does_not_emit() {
        let (ctx, state) = setup();
        let result = run(
            &ctx,
            &state,
            serde_json::json!({
                "command": "dispatch",
                "action": { "type": "delete_task", "id": "missing" }
            }),
        )
        .await;
        assert!(result.ok);
        assert_eq!(result.data.unwrap()["outcome"], "unchanged");
        assert_eq!(ctx.emitted(), 0);
    }

    #[tokio::test]
    async fn strict_not_found_is_an_error_result() {
        let ctx = TestCtx::new();
        let settings = Settings {
            strict_ids: true,
            ..Settings::default()
        };
        let state = AppState::load(Storage::in_memory(), settings);
        let result = handle_command(
            &ctx,
            &state,
            &sunny(),
            &NoGeolocation,
            Command::Dispatch {
                action: Action::ToggleTaskComplete { id: "nope".into() },
            },
        )
        .await;
        assert!(!result.ok);
        assert!(result.error.unwrap().contains("nope"));
        assert_eq!(ctx.emitted(), 0);
    }

    #[tokio::test]
    async fn visible_tasks_and_list_stats_are_queries() {
        let (ctx, state) = setup();
        let mut draft = TaskDraft::new("Call mom");
        draft.important = true;
        state.add_task(draft).unwrap();

        let visible = run(&ctx, &state, serde_json::json!({ "command": "visible_tasks" })).await;
        assert_eq!(visible.data.unwrap()["active"][0]["title"], "Call mom");

        let stats = run(
            &ctx,
            &state,
            serde_json::json!({ "command": "list_stats", "listId": "important" }),
        )
        .await;
        let stats = stats.data.unwrap();
        assert_eq!(stats["total"], 1);
        assert_eq!(stats["percentage"], 0);
        assert_eq!(ctx.emitted(), 0);
    }

    #[tokio::test]
    async fn weather_commands_report_and_emit() {
        let (ctx, state) = setup();
        let result = run(
            &ctx,
            &state,
            serde_json::json!({ "command": "fetch_weather_by_location", "city": "New York" }),
        )
        .await;
        assert!(result.ok);
        assert_eq!(result.data.unwrap()["temperature"], 72);
        assert_eq!(ctx.emitted(), 2);
        assert_eq!(
            ctx.last().weather.data.map(|d| d.location),
            Some("New York".to_string())
        );

        let failing = FakeProvider(Err(WeatherError::Unavailable { status: 401 }));
        let result = handle_command(
            &ctx,
            &state,
            &failing,
            &NoGeolocation,
            Command::RefreshAmbientWeather,
        )
        .await;
        assert!(!result.ok);
        assert_eq!(result.error.as_deref(), Some("Weather data not available"));
        assert_eq!(
            ctx.last().weather.error.as_deref(),
            Some("Weather data not available")
        );

        let cleared = run(&ctx, &state, serde_json::json!({ "command": "clear_weather" })).await;
        assert!(cleared.ok);
        assert_eq!(ctx.last().weather.data, None);
        assert_eq!(ctx.emitted(), 5);
    }

    #[tokio::test]
    async fn weather_fetch_publishes_pending_then_settled_state() {
        let (ctx, state) = setup();
        let failing = FakeProvider(Err(WeatherError::Transport("offline".into())));
        let result = handle_command(
            &ctx,
            &state,
            &failing,
            &NoGeolocation,
            Command::FetchWeatherByLocation {
                city: "Paris".into(),
            },
        )
        .await;
        assert!(!result.ok);
        assert_eq!(ctx.loading_flags(), vec![true, false]);
        assert_eq!(ctx.last().weather.error.as_deref(), Some("weather request failed: offline"));
    }

    #[tokio::test]
    async fn refreshing_an_indoor_task_is_a_quiet_no_op() {
        let (ctx, state) = setup();
        let task = state.add_task(TaskDraft::new("Read")).unwrap();
        let result = run(
            &ctx,
            &state,
            serde_json::json!({ "command": "refresh_outdoor_weather", "taskId": task.id }),
        )
        .await;
        assert!(result.ok);
        assert_eq!(result.data, Some(Value::Null));
        assert_eq!(ctx.emitted(), 0);
    }

    #[test]
    fn only_network_commands_suspend() {
        assert!(Command::RefreshAmbientWeather.suspends());
        assert!(Command::FetchWeatherByLocation {
            city: "Oslo".into()
        }
        .suspends());
        assert!(!Command::ClearWeather.suspends());
        assert!(!Command::Dispatch {
            action: Action::ToggleTheme
        }
        .suspends());
    }

    #[test]
    fn requests_carry_an_optional_id() {
        let request: Request = serde_json::from_str(
            r#"{"id":"r1","command":"fetch_weather_by_coordinates","lat":1.5,"lon":2.5}"#,
        )
        .unwrap();
        assert_eq!(request.id, Some(Value::from("r1")));
        assert_eq!(
            request.command,
            Command::FetchWeatherByCoordinates {
                lat: 1.5,
                lon: 2.5,
                location_name: None
            }
        );

        let request: Request = serde_json::from_str(r#"{"command":"snapshot"}"#).unwrap();
        assert_eq!(request.id, None);
        assert_eq!(request.command, Command::Snapshot);

        assert!(serde_json::from_str::<Request>(r#"{"command":"launch_rockets"}"#).is_err());
    }
}
