pub mod actions;
pub mod auth;
pub mod commands;
pub mod events;
pub mod filter;
pub mod location;
pub mod logging;
pub mod models;
pub mod settings;
pub mod state;
pub mod storage;
pub mod tasks;
pub mod ui;
pub mod weather;

#[cfg(feature = "app")]
mod host {
    use std::sync::Arc;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::sync::mpsc;

    use crate::commands::{err, handle_command, Command, CommandCtx, Request};
    use crate::events::{Outbound, StatePayload};
    use crate::location::{EnvGeolocator, Geolocator};
    use crate::settings::{resolve_data_dir, Settings, DATA_DIR_ENV};
    use crate::state::AppState;
    use crate::storage::{FileStore, Storage};
    use crate::weather::{OpenWeatherClient, WeatherProvider};

    #[derive(Clone)]
    struct ChannelCtx {
        tx: mpsc::UnboundedSender<Outbound>,
    }

    impl ChannelCtx {
        fn send(&self, message: Outbound) {
            if self.tx.send(message).is_err() {
                log::warn!("output closed, dropping message");
            }
        }
    }

    impl CommandCtx for ChannelCtx {
        fn emit_state_updated(&self, payload: StatePayload) {
            self.send(Outbound::state_updated(payload));
        }
    }

    #[derive(Clone)]
    struct Host {
        ctx: ChannelCtx,
        state: AppState,
        provider: Arc<dyn WeatherProvider>,
        geolocator: Arc<dyn Geolocator>,
    }

    impl Host {
        async fn execute(&self, request: Request) {
            let Request { id, command } = request;
            let result = handle_command(
                &self.ctx,
                &self.state,
                self.provider.as_ref(),
                self.geolocator.as_ref(),
                command,
            )
            .await;
            self.ctx.send(Outbound::Response { id, result });
        }
    }

    pub fn run() -> Result<(), Box<dyn std::error::Error>> {
        let data_dir = resolve_data_dir(
            std::env::var_os(DATA_DIR_ENV),
            std::env::var_os("HOME"),
        );
        if let Err(error) = crate::logging::init_logging(&data_dir) {
            eprintln!("failed to initialize logging: {error}");
        }

        let settings = Settings::load(&data_dir);
        let storage = Storage::new(Arc::new(FileStore::open(data_dir.clone())?));
        let provider: Arc<dyn WeatherProvider> =
            Arc::new(OpenWeatherClient::from_settings(&settings)?);
        let state = AppState::load(storage, settings);
        log::info!("doit starting data_dir={}", data_dir.display());

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(serve(state, provider, Arc::new(EnvGeolocator)))?;
        log::info!("doit stopped");
        Ok(())
    }

    async fn serve(
        state: AppState,
        provider: Arc<dyn WeatherProvider>,
        geolocator: Arc<dyn Geolocator>,
    ) -> std::io::Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
        let writer = tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(message) = rx.recv().await {
                let mut line = match serde_json::to_string(&message) {
                    Ok(line) => line,
                    Err(error) => {
                        log::error!("failed to encode output: {error}");
                        continue;
                    }
                };
                line.push('\n');
                if let Err(error) = stdout.write_all(line.as_bytes()).await {
                    log::error!("stdout write failed: {error}");
                    break;
                }
                let _ = stdout.flush().await;
            }
        });

        let host = Host {
            ctx: ChannelCtx { tx },
            state,
            provider,
            geolocator,
        };
        host.ctx
            .emit_state_updated(host.state.snapshot());

        if host.state.auth().is_authenticated {
            let ambient = host.clone();
            tokio::spawn(async move {
                let result = handle_command(
                    &ambient.ctx,
                    &ambient.state,
                    ambient.provider.as_ref(),
                    ambient.geolocator.as_ref(),
                    Command::RefreshAmbientWeather,
                )
                .await;
                if let Some(error) = result.error {
                    log::warn!("startup weather refresh failed: {error}");
                }
            });
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Request>(line) {
                // Network commands run alongside later input; everything else in order.
                Ok(request) if request.command.suspends() => {
                    let host = host.clone();
                    tokio::spawn(async move { host.execute(request).await });
                }
                Ok(request) => host.execute(request).await,
                Err(error) => {
                    log::warn!("rejected input line: {error}");
                    host.ctx.send(Outbound::Response {
                        id: None,
                        result: err(&format!("invalid command: {error}")),
                    });
                }
            }
        }

        drop(host);
        let _ = writer.await;
        Ok(())
    }
}

#[cfg(feature = "app")]
pub use host::run;
