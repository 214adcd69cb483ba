use std::path::Path;

pub const LOG_FILE_BASENAME: &str = "doit";
pub const LOG_FILE_SUFFIX: &str = "log";
pub const LOG_ROTATE_SIZE_BYTES: u64 = 100 * 1024 * 1024;
pub const LOG_ROTATE_KEEP_FILES: usize = 30;
pub const LOG_SPEC_ENV: &str = "DOIT_LOG";

/// Log files live next to storage.json and settings.json.
pub fn log_directory(data_dir: &Path) -> &Path {
    data_dir
}

/// `DOIT_LOG`, then `RUST_LOG`, then the build default.
pub fn log_spec(doit_log: Option<String>, rust_log: Option<String>) -> String {
    let default_spec = if cfg!(debug_assertions) {
        "warn,doit_lib=debug"
    } else {
        "warn,doit_lib=info"
    };
    doit_log
        .filter(|value| !value.trim().is_empty())
        .or_else(|| rust_log.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| default_spec.to_string())
}

#[cfg(feature = "app")]
pub fn init_logging(data_dir: &Path) -> Result<(), flexi_logger::FlexiLoggerError> {
    use flexi_logger::{
        detailed_format, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode,
    };

    std::fs::create_dir_all(data_dir)?;

    let spec = log_spec(
        std::env::var(LOG_SPEC_ENV).ok(),
        std::env::var("RUST_LOG").ok(),
    );

    // stdout carries the JSON protocol, so terminal echo goes to stderr.
    Logger::try_with_str(spec)?
        .log_to_file(
            FileSpec::default()
                .directory(log_directory(data_dir))
                .basename(LOG_FILE_BASENAME)
                .suffix(LOG_FILE_SUFFIX),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(detailed_format)
        .rotate(
            Criterion::Size(LOG_ROTATE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(LOG_ROTATE_KEEP_FILES),
        )
        .duplicate_to_stderr(if cfg!(debug_assertions) {
            Duplicate::Info
        } else {
            Duplicate::None
        })
        .start()?;

    install_panic_hook();

    log::info!(
        "logger initialized dir={} rotate_size_bytes={} keep_files={}",
        log_directory(data_dir).display(),
        LOG_ROTATE_SIZE_BYTES,
        LOG_ROTATE_KEEP_FILES
    );
    Ok(())
}

/// Text of a panic payload: `panic!` yields `&str` or `String`, anything else is opaque.
#[cfg_attr(not(feature = "app"), allow(dead_code))]
fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}

#[cfg_attr(not(feature = "app"), allow(dead_code))]
fn panic_report(thread: Option<&str>, message: &str, location: Option<String>) -> String {
    format!(
        "panic in thread '{}' at {}: {message}",
        thread.unwrap_or("<unnamed>"),
        location.as_deref().unwrap_or("<unknown>")
    )
}

#[cfg(feature = "app")]
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info: &std::panic::PanicHookInfo<'_>| {
        let current = std::thread::current();
        let report = panic_report(
            current.name(),
            panic_message(info.payload()),
            info.location().map(|loc| loc.to_string()),
        );
        let backtrace = std::backtrace::Backtrace::force_capture();
        log::error!("{report}\nbacktrace:\n{backtrace}");
        default_hook(info);
    }));
}
