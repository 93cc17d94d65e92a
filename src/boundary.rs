use crate::error::Failure;
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BoundaryState {
    #[default]
    Ok,
    Failed(String),
}

/// Catches failures from the mounted view and swaps it for the recovery panel.
///
/// The only way back to `Ok` is a fresh boundary, built when the shell does a
/// hard reset to `/`.
#[derive(Debug, Default)]
pub struct ErrorBoundary {
    state: BoundaryState,
}

impl ErrorBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catch<T>(&mut self, result: Result<T, Failure>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(failure) => {
                if self.state == BoundaryState::Ok {
                    error!(message = failure.message(), "Error caught by boundary");
                    self.state = BoundaryState::Failed(failure.message().to_string());
                }
                None
            }
        }
    }

    pub fn state(&self) -> &BoundaryState {
        &self.state
    }

    pub fn failure_message(&self) -> Option<&str> {
        match &self.state {
            BoundaryState::Ok => None,
            BoundaryState::Failed(message) => Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_success() {
        let mut boundary = ErrorBoundary::new();
        assert_eq!(boundary.catch(Ok::<_, Failure>(7)), Some(7));
        assert_eq!(boundary.state(), &BoundaryState::Ok);
    }

    #[test]
    fn fails_once_and_stays_failed() {
        let mut boundary = ErrorBoundary::new();
        assert_eq!(boundary.catch::<()>(Err(Failure::new("first"))), None);
        assert_eq!(boundary.catch::<()>(Err(Failure::new("second"))), None);
        assert_eq!(boundary.catch(Ok::<_, Failure>(1)), Some(1));
        assert_eq!(boundary.failure_message(), Some("first"));
    }
}
