//! ObservationScope for start/complete/failed logging around a pipeline run

use std::time::Instant;

use super::logger::Logger;

/// A scope that logs `{name}_START` on creation and exactly one of
/// `{name}_COMPLETE`, `{name}_FAILED` or `{name}_INCOMPLETE` afterwards.
///
/// ```ignore
/// let scope = ObservationScope::new("BACKUP", &[("store", "mem")]);
/// // ... do work ...
/// scope.complete(&[("records", "42")]);
/// ```
pub struct ObservationScope {
    name: &'static str,
    fields: Vec<(String, String)>,
    timer: Timer,
    finished: bool,
}

impl ObservationScope {
    /// Create a new observation scope and log `{name}_START`.
    pub fn new(name: &'static str, fields: &[(&str, &str)]) -> Self {
        Logger::info(&format!("{}_START", name), fields);

        Self {
            name,
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            timer: Timer::start(),
            finished: false,
        }
    }

    /// Mark the scope as completed; logs the elapsed time and `extra` fields.
    pub fn complete(mut self, extra: &[(&str, &str)]) {
        self.finished = true;
        let duration = self.timer.elapsed_ms().to_string();

        let mut fields = self.borrowed_fields();
        fields.extend(extra.iter().copied());
        fields.push(("duration_ms", duration.as_str()));

        Logger::info(&format!("{}_COMPLETE", self.name), &fields);
    }

    /// Mark the scope as failed with a reason and error code.
    pub fn fail(mut self, code: &str, reason: &str) {
        self.finished = true;
        let mut fields = self.borrowed_fields();
        fields.push(("code", code));
        fields.push(("reason", reason));

        Logger::error(&format!("{}_FAILED", self.name), &fields);
    }

    fn borrowed_fields(&self) -> Vec<(&str, &str)> {
        self.fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.finished {
            Logger::warn(
                &format!("{}_INCOMPLETE", self.name),
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}

/// Wall-clock timer for operation durations
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    started: Instant,
}

impl Timer {
    /// Start a new timer
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Milliseconds since start
    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }
}
