//! Trait abstraction for the fix source to enable testing

use async_trait::async_trait;

use crate::error::Result;
use crate::journey::fix::FixReport;

/// Produces one [`FixReport`] per polling tick
#[async_trait]
pub trait FixSource: Send {
    /// Collect everything the receiver reported since the previous call
    async fn next_report(&mut self) -> Result<FixReport>;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use crate::error::JourneyLoggerError;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Fix source that replays scripted reports
    ///
    /// Once the script runs out it returns a connection-closed error, which
    /// ends a main loop under test.
    #[derive(Clone, Default)]
    pub struct ScriptedFixSource {
        pub reports: Arc<Mutex<VecDeque<Result<FixReport>>>>,
        pub calls: Arc<Mutex<usize>>,
    }

    impl ScriptedFixSource {
        pub fn new(reports: Vec<Result<FixReport>>) -> Self {
            Self {
                reports: Arc::new(Mutex::new(reports.into())),
                calls: Arc::new(Mutex::new(0)),
            }
        }

        pub fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl FixSource for ScriptedFixSource {
        async fn next_report(&mut self) -> Result<FixReport> {
            *self.calls.lock().unwrap() += 1;
            self.reports
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(JourneyLoggerError::Gpsd("Script exhausted".to_string())))
        }
    }
}
