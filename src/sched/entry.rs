// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Schedule entry state machine and drive loop
//!
//! An entry is a non-blocking, repeatedly polled unit of asynchronous
//! progress: `start` performs the first step, `update` advances one step,
//! `is_completed` reports durable completion from the issuer's perspective.
//! [`drive`] runs the busy-wait loop in the calling thread; it is the only
//! blocking point of the transfer protocol, bounded only by the optional
//! deadline and otherwise by peer cooperation.

use std::time::Instant;

use crate::error::{AcclError, AcclResult};

/// Progress states of a schedule entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    NotStarted,
    Active,
    Completed,
}

/// Non-blocking, repeatedly polled unit of asynchronous progress
pub trait ScheduleEntry {
    /// Perform the entry's first non-blocking step. Must be called exactly
    /// once; calling it twice is undefined.
    fn start(&mut self) -> AcclResult<()>;

    /// Advance internal progress by one non-blocking step. Callable
    /// repeatedly while active; a no-op once completed.
    fn update(&mut self) -> AcclResult<()>;

    /// True once the entry's work is durably finished from the issuer's
    /// perspective (not necessarily from the device's).
    fn is_completed(&self) -> bool;

    /// Short name for log messages
    fn name(&self) -> &'static str;
}

/// Start an entry and poll it to completion in the calling thread.
///
/// Without a deadline a non-responding peer stalls the caller indefinitely;
/// with one, the loop fails with `Code::Timeout` once the deadline passes.
pub fn drive<E: ScheduleEntry + ?Sized>(entry: &mut E, deadline: Option<Instant>) -> AcclResult<()> {
    entry.start()?;
    while !entry.is_completed() {
        entry.update()?;
        if let Some(d) = deadline {
            if !entry.is_completed() && Instant::now() >= d {
                return Err(AcclError::Timeout(format!(
                    "{} did not complete before its deadline",
                    entry.name()
                )));
            }
        }
        std::hint::spin_loop();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct CountdownEntry {
        state: EntryState,
        steps_left: u32,
    }

    impl ScheduleEntry for CountdownEntry {
        fn start(&mut self) -> AcclResult<()> {
            self.state = EntryState::Active;
            Ok(())
        }

        fn update(&mut self) -> AcclResult<()> {
            if self.state != EntryState::Active {
                return Ok(());
            }
            if self.steps_left == 0 {
                self.state = EntryState::Completed;
            } else {
                self.steps_left -= 1;
            }
            Ok(())
        }

        fn is_completed(&self) -> bool {
            self.state == EntryState::Completed
        }

        fn name(&self) -> &'static str {
            "countdown"
        }
    }

    #[test]
    fn test_drive_to_completion() {
        let mut entry = CountdownEntry {
            state: EntryState::NotStarted,
            steps_left: 10,
        };
        drive(&mut entry, None).unwrap();
        assert!(entry.is_completed());
    }

    #[test]
    fn test_drive_deadline() {
        struct NeverEntry;
        impl ScheduleEntry for NeverEntry {
            fn start(&mut self) -> AcclResult<()> {
                Ok(())
            }
            fn update(&mut self) -> AcclResult<()> {
                Ok(())
            }
            fn is_completed(&self) -> bool {
                false
            }
            fn name(&self) -> &'static str {
                "never"
            }
        }

        let mut entry = NeverEntry;
        let deadline = Some(Instant::now() + Duration::from_millis(10));
        let err = drive(&mut entry, deadline).unwrap_err();
        assert_eq!(err.code(), crate::error::Code::Timeout);
    }
}
