/*!
# DiskWatch DevKit - Stubs and test utilities

Makes it possible to exercise the monitoring core without PowerShell or a
Telegram bot:
- Scripted health source
- Recording transport with scripted failures
- Builders for probe output
- Harness around a ready-wired orchestrator
*/

pub mod fixtures;
pub mod source_stub;
pub mod test_utils;
pub mod transport_stub;

pub use fixtures::{DiskLineBuilder, ReportBuilder};
pub use source_stub::{ScriptStep, ScriptedSource};
pub use test_utils::{TestHarness, TEST_HOST};
pub use transport_stub::{MockTransport, SentMessage};
