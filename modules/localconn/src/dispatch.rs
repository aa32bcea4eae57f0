//! Invoke handlers for one delivered event.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

use crate::error::ChannelError;
use crate::registry::Handler;

/// What happened when one event was dispatched.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// Handlers that ran to completion.
    pub invoked: usize,
    /// Handlers that returned an error or panicked.
    pub failures: Vec<ChannelError>,
}

/// Run every handler in order. A failing handler is logged and does not stop
/// the ones after it.
pub fn dispatch(event: &str, args: &[String], handlers: &[Handler]) -> DispatchOutcome {
    let mut outcome = DispatchOutcome::default();

    for (index, handler) in handlers.iter().enumerate() {
        let result = catch_unwind(AssertUnwindSafe(|| {
            handler.callback.call(&handler.scope, args)
        }));

        let message = match result {
            Ok(Ok(())) => {
                outcome.invoked += 1;
                continue;
            }
            Ok(Err(e)) => format!("{e:#}"),
            Err(panic) => panic_message(panic.as_ref()),
        };

        warn!(event, handler = index, error = %message, "Callback failed");
        outcome.failures.push(ChannelError::CallbackFailed {
            event: event.to_string(),
            message,
        });
    }

    outcome
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::registry::{Callback, Scope};

    fn handler<F>(f: F) -> Handler
    where
        F: Fn(&Scope, &[String]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Handler {
            callback: Arc::new(f) as Arc<dyn Callback>,
            scope: Scope::from_value(()),
        }
    }

    #[test]
    fn handlers_run_in_order_with_args() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let a = seen.clone();
        let b = seen.clone();
        let handlers = vec![
            handler(move |_, args| {
                a.lock().unwrap().push(format!("first:{}", args.join("|")));
                Ok(())
            }),
            handler(move |_, args| {
                b.lock().unwrap().push(format!("second:{}", args.join("|")));
                Ok(())
            }),
        ];

        let outcome = dispatch("ping", &["x".into(), "y".into()], &handlers);

        assert_eq!(outcome.invoked, 2);
        assert!(outcome.failures.is_empty());
        assert_eq!(*seen.lock().unwrap(), vec!["first:x|y", "second:x|y"]);
    }

    #[test]
    fn failing_and_panicking_handlers_are_isolated() {
        let ran_last = Arc::new(Mutex::new(false));
        let flag = ran_last.clone();
        let handlers = vec![
            handler(|_, _| anyhow::bail!("boom")),
            handler(|_, _| panic!("kaboom")),
            handler(move |_, _| {
                *flag.lock().unwrap() = true;
                Ok(())
            }),
        ];

        let outcome = dispatch("ping", &[], &handlers);

        assert_eq!(outcome.invoked, 1);
        assert_eq!(outcome.failures.len(), 2);
        assert!(*ran_last.lock().unwrap());
        assert!(outcome.failures[0].to_string().contains("boom"));
        assert!(outcome.failures[1].to_string().contains("kaboom"));
    }
}
