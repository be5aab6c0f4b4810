use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Task error: {message}")]
    TaskError {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Handler error: {message}")]
    HandlerError {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Sink error: {message}")]
    SinkError {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, BotError>;

impl BotError {
    pub fn task_error(message: impl Into<String>) -> Self {
        Self::TaskError {
            message: message.into(),
            source: None,
        }
    }

    pub fn task_error_with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::TaskError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn handler_error(message: impl Into<String>) -> Self {
        Self::HandlerError {
            message: message.into(),
            source: None,
        }
    }

    pub fn handler_error_with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::HandlerError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn sink_error(message: impl Into<String>) -> Self {
        Self::SinkError {
            message: message.into(),
            source: None,
        }
    }

    pub fn sink_error_with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SinkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::fmt;

    #[derive(Debug)]
    struct TestError(String);

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl Error for TestError {}

    #[test]
    fn test_task_error() {
        let error = BotError::task_error("test error");
        assert!(matches!(error, BotError::TaskError { message, source }
            if message == "test error" && source.is_none()));

        let source = TestError("source error".to_string());
        let error = BotError::task_error_with_source("test error", source);
        assert!(matches!(error, BotError::TaskError { message, source: Some(_) }
            if message == "test error"));
    }

    #[test]
    fn test_handler_error() {
        let error = BotError::handler_error("test error");
        assert!(matches!(error, BotError::HandlerError { message, source }
            if message == "test error" && source.is_none()));

        let source = TestError("source error".to_string());
        let error = BotError::handler_error_with_source("test error", source);
        assert!(matches!(error, BotError::HandlerError { message, source: Some(_) }
            if message == "test error"));
    }

    #[test]
    fn test_sink_error() {
        let error = BotError::sink_error("test error");
        assert!(matches!(error, BotError::SinkError { message, source }
            if message == "test error" && source.is_none()));

        let source = TestError("source error".to_string());
        let error = BotError::sink_error_with_source("test error", source);
        assert!(matches!(error, BotError::SinkError { message, source: Some(_) }
            if message == "test error"));
    }

    #[test]
    fn test_error_conversion() {
        let anyhow_error = anyhow::anyhow!("test error");
        let error: BotError = anyhow_error.into();
        assert!(matches!(error, BotError::Other(_)));
    }

    #[test]
    fn test_error_display() {
        let error = BotError::task_error("test error");
        assert_eq!(error.to_string(), "Task error: test error");

        let error = BotError::handler_error("test error");
        assert_eq!(error.to_string(), "Handler error: test error");

        let error = BotError::sink_error("test error");
        assert_eq!(error.to_string(), "Sink error: test error");
    }
}
