use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("aula.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("aula.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("aula.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("aula.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("aula.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("aula.stream.bytes");

pub(crate) static SESSION_TURNS: Counter = Counter::new("aula.session.turns");
pub(crate) static SESSION_TURNS_FAILED: Counter = Counter::new("aula.session.turns_failed");
pub(crate) static SESSION_TURNS_CANCELLED: Counter =
    Counter::new("aula.session.turns_cancelled");
pub(crate) static SESSION_REJECTED: Counter = Counter::new("aula.session.rejected_submissions");
pub(crate) static SESSION_MALFORMED: Counter = Counter::new("aula.session.malformed_events");
pub(crate) static SESSION_WORKFLOW_DEVIATIONS: Counter =
    Counter::new("aula.session.workflow_deviations");
pub(crate) static SESSION_TURN_DURATION: Moments =
    Moments::new("aula.session.turn_duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_TURNS_FAILED);
    collector.register_counter(&SESSION_TURNS_CANCELLED);
    collector.register_counter(&SESSION_REJECTED);
    collector.register_counter(&SESSION_MALFORMED);
    collector.register_counter(&SESSION_WORKFLOW_DEVIATIONS);
    collector.register_moments(&SESSION_TURN_DURATION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_with_a_collector() {
        register_biometrics(Collector::new());
        SESSION_TURNS.click();
    }
}
