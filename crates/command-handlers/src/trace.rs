use tracing::{span, Level, Span};

#[derive(Clone, Debug, Default)]
pub struct CommandTracer;

impl CommandTracer {
    pub fn span(&self, command: &str, session: Option<&str>) -> Span {
        span!(
            Level::INFO,
            "uia.command",
            command = command,
            session = session.unwrap_or("-")
        )
    }
}
