use crate::error::Failure;
use tracing::debug;

/// Per-view record of the first failed operation.
///
/// Signalling stores the failure and hands it straight back as `Err`, so the
/// caller stops with `?`. Every later [`FailureSlot::check`] raises it again,
/// which keeps the owning view from rendering past a failure.
#[derive(Debug, Default, Clone)]
pub struct FailureSlot {
    failure: Option<Failure>,
}

impl FailureSlot {
    pub fn signal<T>(&mut self, err: impl Into<Failure>) -> Result<T, Failure> {
        let failure = self.failure.get_or_insert_with(|| err.into()).clone();
        debug!(message = failure.message(), "failure signalled");
        Err(failure)
    }

    pub fn check(&self) -> Result<(), Failure> {
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_records_and_reraises() {
        let mut slot = FailureSlot::default();
        assert!(slot.check().is_ok());

        let result: Result<(), _> = slot.signal("Failed to fetch tasks");
        assert_eq!(result.unwrap_err().message(), "Failed to fetch tasks");

        // every later check raises the same failure
        for _ in 0..3 {
            assert_eq!(slot.check().unwrap_err().message(), "Failed to fetch tasks");
        }
    }

    #[test]
    fn first_failure_wins() {
        let mut slot = FailureSlot::default();
        let _ = slot.signal::<()>(Failure::new("first"));
        let second = slot.signal::<()>(String::from("second")).unwrap_err();
        assert_eq!(second.message(), "first");
        assert!(slot.is_failed());
    }
}
