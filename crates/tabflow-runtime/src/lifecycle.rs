use tabflow_core::Result;

/// Process-wide runtime lifecycle: `Uninitialized -> Running -> Finalized`,
/// never re-entered. Enforced here so the foreign side effects run exactly
/// once no matter how often the host calls in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Lifecycle {
    #[default]
    Uninitialized,
    Running,
    Finalized,
}

impl Lifecycle {
    /// Run `start` iff the runtime has never been started. A second call is
    /// a no-op; a failed start stays `Uninitialized` and is reported up.
    pub fn start(&mut self, start: impl FnOnce() -> Result<()>) -> Result<()> {
        if *self == Lifecycle::Uninitialized {
            start()?;
            *self = Lifecycle::Running;
        }
        Ok(())
    }

    /// Run `stop` iff the runtime is running. Stopping before starting, or
    /// twice, is a no-op.
    pub fn stop(&mut self, stop: impl FnOnce() -> Result<()>) -> Result<()> {
        if *self == Lifecycle::Running {
            stop()?;
            *self = Lifecycle::Finalized;
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        *self == Lifecycle::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_and_stop_run_exactly_once() {
        let mut starts = 0;
        let mut stops = 0;
        let mut state = Lifecycle::default();

        for _ in 0..3 {
            state
                .start(|| {
                    starts += 1;
                    Ok(())
                })
                .unwrap();
        }
        assert_eq!(starts, 1);
        assert!(state.is_running());

        for _ in 0..3 {
            state
                .stop(|| {
                    stops += 1;
                    Ok(())
                })
                .unwrap();
        }
        assert_eq!(stops, 1);

        // finalized is terminal
        state.start(|| panic!("must not restart")).unwrap();
        assert!(!state.is_running());
    }

    #[test]
    fn stop_before_start_is_a_no_op() {
        let mut state = Lifecycle::default();
        state.stop(|| panic!("nothing to stop")).unwrap();
        assert_eq!(state, Lifecycle::Uninitialized);
    }

    #[test]
    fn failed_start_stays_uninitialized() {
        let mut state = Lifecycle::default();
        let err = state.start(|| Err(tabflow_core::Error::Init("no runtime".into())));
        assert!(err.is_err());
        assert_eq!(state, Lifecycle::Uninitialized);
    }
}
