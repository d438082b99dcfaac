//! Observers the CLI puts on the notification bus.
//!
//! - every event is logged through `tracing`
//! - each `hooks:` entry in the config runs a shell command for its event kind
//!
//! Hook commands run via `sh -c` with the event in their environment:
//!
//! ```text
//! STEAMWATCH_EVENT       price_changed
//! STEAMWATCH_APP_ID      316750
//! STEAMWATCH_APP_NAME    Stardew Valley
//! STEAMWATCH_PACKAGE_ID  53279          (package events only)
//! STEAMWATCH_FIELD       price          (*_changed only)
//! STEAMWATCH_PREVIOUS    19.99          (*_changed, empty when unknown)
//! STEAMWATCH_CURRENT     13.99          (*_changed and threshold)
//! STEAMWATCH_THRESHOLD   15.00          (threshold only)
//! STEAMWATCH_CURRENCY    EUR            (threshold only, when known)
//! ```

use std::collections::BTreeMap;
use std::process::{Command, Stdio};

use steamwatch_core::{format_amount, AppRecord, EventKind};
use steamwatch_sync::{HandlerError, NotificationBus, Payload};

use crate::render::value_text;

/// Register the logging observer and every configured hook command.
pub fn register(bus: &mut NotificationBus, hooks: &BTreeMap<EventKind, Vec<String>>) {
    bus.subscribe_all(log_event);
    for (kind, commands) in hooks {
        for command in commands {
            let command = command.clone();
            bus.subscribe(*kind, move |kind, app, payload| run_hook(&command, kind, app, payload));
            tracing::debug!(%kind, "registered hook");
        }
    }
}

fn log_event(kind: EventKind, app: &AppRecord, payload: &Payload) -> Result<(), HandlerError> {
    let detail: String = hook_env(kind, app, payload)
        .into_iter()
        .skip(3)
        .map(|(key, value)| format!("{}={value}", key.trim_start_matches("STEAMWATCH_").to_lowercase()))
        .collect::<Vec<_>>()
        .join(" ");
    tracing::info!(event = %kind, app = %app.id, name = %app.display_name(), %detail, "event");
    Ok(())
}

/// Environment passed to hook commands. The first three entries are always
/// event, app id and app name.
pub fn hook_env(kind: EventKind, app: &AppRecord, payload: &Payload) -> Vec<(&'static str, String)> {
    let mut env = vec![
        ("STEAMWATCH_EVENT", kind.to_string()),
        ("STEAMWATCH_APP_ID", app.id.to_string()),
        ("STEAMWATCH_APP_NAME", app.display_name()),
    ];
    match payload {
        Payload::App => {}
        Payload::PackageLinked { package } => {
            env.push(("STEAMWATCH_PACKAGE_ID", package.id.to_string()));
            env.push(("STEAMWATCH_PACKAGE_NAME", package.display_name()));
        }
        Payload::FieldChanged {
            package,
            field,
            previous,
            current,
        } => {
            if let Some(id) = package {
                env.push(("STEAMWATCH_PACKAGE_ID", id.to_string()));
            }
            env.push(("STEAMWATCH_FIELD", field.to_string()));
            env.push((
                "STEAMWATCH_PREVIOUS",
                previous.as_ref().map(value_text).unwrap_or_default(),
            ));
            env.push(("STEAMWATCH_CURRENT", value_text(current)));
        }
        Payload::Threshold {
            package,
            threshold,
            price,
            currency,
        } => {
            env.push(("STEAMWATCH_PACKAGE_ID", package.to_string()));
            env.push(("STEAMWATCH_CURRENT", format_amount(*price, None)));
            env.push(("STEAMWATCH_THRESHOLD", format_amount(*threshold, None)));
            if let Some(code) = currency {
                env.push(("STEAMWATCH_CURRENCY", code.clone()));
            }
        }
    }
    env
}

fn run_hook(command: &str, kind: EventKind, app: &AppRecord, payload: &Payload) -> Result<(), HandlerError> {
    tracing::debug!(%kind, command, "running hook");
    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .envs(hook_env(kind, app, payload))
        .stdin(Stdio::null())
        .status()
        .map_err(|source| HandlerError::Spawn {
            command: command.to_string(),
            source,
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(HandlerError::CommandFailed {
            command: command.to_string(),
            status: status.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use steamwatch_core::{AppId, Field, FieldValue, PackageId};

    fn app() -> AppRecord {
        AppRecord {
            id: AppId(316750),
            name: Some("Stardew Valley".into()),
            kind: "game".into(),
            enabled: true,
            threshold: Some(1500),
            release_date: None,
            coming_soon: None,
            supports_linux: None,
            added_at: Utc::now(),
        }
    }

    fn price_drop() -> Payload {
        Payload::FieldChanged {
            package: Some(PackageId(53279)),
            field: Field::Price,
            previous: Some(FieldValue::Amount(1999)),
            current: FieldValue::Amount(1399),
        }
    }

    #[test]
    fn field_change_env() {
        let env = hook_env(EventKind::PriceChanged, &app(), &price_drop());
        let get = |key: &str| env.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str());
        assert_eq!(get("STEAMWATCH_EVENT"), Some("price_changed"));
        assert_eq!(get("STEAMWATCH_APP_NAME"), Some("Stardew Valley"));
        assert_eq!(get("STEAMWATCH_PACKAGE_ID"), Some("53279"));
        assert_eq!(get("STEAMWATCH_PREVIOUS"), Some("19.99"));
        assert_eq!(get("STEAMWATCH_CURRENT"), Some("13.99"));
        assert_eq!(get("STEAMWATCH_THRESHOLD"), None);
    }

    #[test]
    fn threshold_env_carries_limit_and_currency() {
        let payload = Payload::Threshold {
            package: PackageId(1),
            threshold: 1500,
            price: 1399,
            currency: Some("EUR".into()),
        };
        let env = hook_env(EventKind::Threshold, &app(), &payload);
        assert!(env.contains(&("STEAMWATCH_THRESHOLD", "15.00".to_string())));
        assert!(env.contains(&("STEAMWATCH_CURRENCY", "EUR".to_string())));
    }

    #[cfg(unix)]
    #[test]
    fn hook_sees_its_environment_and_nonzero_exit_is_an_error() {
        let ok = run_hook(
            r#"test "$STEAMWATCH_EVENT" = price_changed && test "$STEAMWATCH_CURRENT" = 13.99"#,
            EventKind::PriceChanged,
            &app(),
            &price_drop(),
        );
        assert!(ok.is_ok(), "{ok:?}");

        let err = run_hook("exit 3", EventKind::PriceChanged, &app(), &price_drop()).unwrap_err();
        assert!(matches!(err, HandlerError::CommandFailed { .. }), "{err}");
    }
}
