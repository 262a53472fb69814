//! Span helpers for template operations.

use tracing::{info_span, Span};

/// Create a span for one template's operation (plan, validate, build).
pub fn template_span(template: &str, command: &str) -> Span {
    info_span!(
        "template",
        name = %template,
        command = %command,
        error = tracing::field::Empty
    )
}

/// Create a span for an external process invocation.
pub fn process_span(program: &str, workdir: &str) -> Span {
    info_span!("process", program = %program, workdir = %workdir)
}

/// Record an error on the current span.
pub fn record_error(error: &dyn std::error::Error) {
    Span::current().record("error", tracing::field::display(error));
}

/// Timing utility for operations.
pub struct Timer {
    start: std::time::Instant,
    operation: &'static str,
}

impl Timer {
    /// Start a new timer.
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: std::time::Instant::now(),
            operation,
        }
    }

    /// Elapsed time so far.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    /// Complete the timer and record duration.
    pub fn finish(self) {
        let duration = self.start.elapsed();
        tracing::debug!(
            operation = %self.operation,
            duration_ms = %duration.as_millis(),
            "operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Instrument;
    use tracing_subscriber::EnvFilter;

    fn with_subscriber<F>(f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let subscriber = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(EnvFilter::new("trace"))
            .finish();

        tracing::subscriber::with_default(subscriber, f);
    }

    #[test]
    fn test_span_nesting() {
        with_subscriber(|| {
            let template = template_span("base-os", "build");
            let _guard1 = template.enter();

            let process = process_span("packer", "/tmp/kiln-base-os-x1");
            let _guard2 = process.enter();

            tracing::info!("nested operation");
        });
    }

    #[test]
    fn test_error_recording() {
        with_subscriber(|| {
            let span = template_span("app", "validate");
            let _guard = span.enter();

            let error = std::io::Error::new(std::io::ErrorKind::NotFound, "packer not found");
            record_error(&error);
        });
    }

    #[tokio::test]
    async fn test_span_propagates_across_await() {
        let span = template_span("app", "build");
        async {
            tokio::task::yield_now().await;
            tracing::info!("inside template span");
        }
        .instrument(span)
        .await;
    }

    #[test]
    fn test_timer_elapsed() {
        let timer = Timer::start("test_operation");
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(timer.elapsed() >= std::time::Duration::from_millis(10));
        timer.finish();
    }
}
