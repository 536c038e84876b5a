use bollard::container::LogsOptions;
use lazytail_framework::Window;

/// bounded, non-following logs request for `window`
///
/// The engine API takes whole Unix seconds and treats both bounds as
/// inclusive. Truncating both ends keeps consecutive windows adjacent: output
/// stamped inside a second is returned once `until` has moved past it.
pub fn logs_options(window: &Window) -> LogsOptions<String> {
    LogsOptions {
        follow: false,
        stdout: true,
        stderr: true,
        since: window.since.timestamp(),
        until: window.until.timestamp(),
        timestamps: false,
        tail: "all".to_string(),
        ..Default::default()
    }
}
