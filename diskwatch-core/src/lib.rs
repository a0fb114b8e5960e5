/*!
# DiskWatch Core - Disk health change detection

Turns the free-form output of a disk health probe into a keyed problem set,
compares it with what was seen last time and pushes a Telegram message only
when something actually changed:
- Report parsing (reliability counters → problem records)
- State diff (new/changed vs. resolved)
- Message composition (diff, summary, acquisition alert)
- Delivery engine (inline text or document, bounded exponential retry)
- Orchestrator (timer loop, manual check, retained state)
*/

pub mod compose;
pub mod config;
pub mod delivery;
pub mod diff;
pub mod error;
pub mod host;
pub mod orchestrator;
pub mod report;
pub mod source;
pub mod state;

pub use config::{Credentials, MonitorConfig};
pub use delivery::telegram::TelegramTransport;
pub use delivery::{DeliveryEngine, DeliveryMode, DeliveryOutcome, RetryPolicy, Transport};
pub use diff::{diff, StateDiff};
pub use error::{AcquisitionError, ConfigError, DeliveryError, MonitorError};
pub use host::HostIdentity;
pub use orchestrator::{CycleOutcome, ManualCheckReport, Orchestrator, Schedule};
pub use report::{parse_report, ProblemRecord, ProblemSet};
pub use source::{CommandSource, HealthSource};
pub use state::RetainedState;
