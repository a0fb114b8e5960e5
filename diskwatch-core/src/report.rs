//! Health report parsing
//!
//! Turns the free-form text produced by the health source into a
//! [`ProblemSet`]: one [`ProblemRecord`] per device that shows at least one
//! nonzero reliability counter.
//!
//! Expected line shape (other lines are ignored):
//! ```text
//! Disk[0](Samsung SSD 870) - MediaType: SSD - Wear: 2 - ReallocatedSectors: 0 - PendingSectors: 0 - UncorrectedErrors: 0
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Separator between the device identity and the measured fields
pub const KEY_SEPARATOR: &str = " - ";

static COUNTER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(ReallocatedSectors|PendingSectors|UncorrectedErrors|Wear):\s*(\d+)")
        .expect("counter pattern is a valid regex")
});

/// Monitored reliability counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CounterKind {
    Wear,
    ReallocatedSectors,
    PendingSectors,
    UncorrectedErrors,
}

impl CounterKind {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "Wear" => Some(CounterKind::Wear),
            "ReallocatedSectors" => Some(CounterKind::ReallocatedSectors),
            "PendingSectors" => Some(CounterKind::PendingSectors),
            "UncorrectedErrors" => Some(CounterKind::UncorrectedErrors),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CounterKind::Wear => "Wear",
            CounterKind::ReallocatedSectors => "ReallocatedSectors",
            CounterKind::PendingSectors => "PendingSectors",
            CounterKind::UncorrectedErrors => "UncorrectedErrors",
        }
    }
}

impl fmt::Display for CounterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single counter occurrence found on a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterReading {
    pub kind: CounterKind,
    /// Saturates at `u64::MAX` for digit runs that do not fit
    pub value: u64,
    nonzero: bool,
}

impl CounterReading {
    pub fn is_nonzero(&self) -> bool {
        self.nonzero
    }
}

/// One faulty device as seen in the latest report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemRecord {
    /// Portion of the line before the first `" - "`, e.g. `Disk[0](Model)`
    pub device_key: String,
    /// The full report line
    pub description: String,
    /// Readings derived from `description`
    pub counters: Vec<CounterReading>,
}

impl ProblemRecord {
    /// Counters with a value above zero
    pub fn faults(&self) -> impl Iterator<Item = &CounterReading> {
        self.counters.iter().filter(|c| c.is_nonzero())
    }

    /// `ReallocatedSectors=3, Wear=12` for log lines
    pub fn fault_summary(&self) -> String {
        self.faults()
            .map(|c| format!("{}={}", c.kind, c.value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Devices currently exhibiting at least one nonzero counter, keyed by device key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProblemSet {
    records: BTreeMap<String, ProblemRecord>,
}

impl ProblemSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: ProblemRecord) {
        self.records.insert(record.device_key.clone(), record);
    }

    pub fn get(&self, device_key: &str) -> Option<&ProblemRecord> {
        self.records.get(device_key)
    }

    pub fn contains(&self, device_key: &str) -> bool {
        self.records.contains_key(device_key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &ProblemRecord> {
        self.records.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }
}

impl FromIterator<ProblemRecord> for ProblemSet {
    fn from_iter<I: IntoIterator<Item = ProblemRecord>>(iter: I) -> Self {
        let mut set = ProblemSet::new();
        for record in iter {
            set.insert(record);
        }
        set
    }
}

/// Parse a raw health report into the set of faulty devices.
///
/// Never fails: lines without counters (soft per-disk read failures
/// included) are skipped.
pub fn parse_report(raw: &str) -> ProblemSet {
    let mut problems = ProblemSet::new();

    for line in raw.lines() {
        match parse_line(line) {
            Some(record) => {
                debug!("Problem on {}: {}", record.device_key, record.fault_summary());
                problems.insert(record);
            }
            None => {
                if !line.trim().is_empty() && !COUNTER_PATTERN.is_match(line) {
                    debug!("Skipping line without counters: {}", line);
                }
            }
        }
    }

    problems
}

/// Classify one line; `Some` only for problem lines
pub fn parse_line(line: &str) -> Option<ProblemRecord> {
    let counters: Vec<CounterReading> = COUNTER_PATTERN
        .captures_iter(line)
        .filter_map(|caps| {
            let kind = CounterKind::from_label(caps.get(1)?.as_str())?;
            let digits = caps.get(2)?.as_str();
            Some(CounterReading {
                kind,
                value: digits.parse().unwrap_or(u64::MAX),
                nonzero: digits.bytes().any(|b| b != b'0'),
            })
        })
        .collect();

    if !counters.iter().any(CounterReading::is_nonzero) {
        return None;
    }

    let device_key = line.split(KEY_SEPARATOR).next().unwrap_or(line).to_string();

    Some(ProblemRecord {
        device_key,
        description: line.to_string(),
        counters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEALTHY: &str = "Disk[0](Samsung SSD 870 EVO) - MediaType: SSD - Wear: 0 - ReallocatedSectors: 0 - PendingSectors: 0 - UncorrectedErrors: 0";
    const REALLOCATED: &str = "Disk[1](WDC WD40EFRX) - MediaType: HDD - Wear: 0 - ReallocatedSectors: 3 - PendingSectors: 0 - UncorrectedErrors: 0";

    #[test]
    fn test_no_problem_lines_yields_empty_set() {
        let raw = format!("{}\nCould not get counters for a disk. Skipping.\n\n", HEALTHY);
        assert!(parse_report(&raw).is_empty());
        assert!(parse_report("").is_empty());
    }

    #[test]
    fn test_problem_line_keyed_by_prefix() {
        let set = parse_report(&format!("{}\n{}\n", HEALTHY, REALLOCATED));
        assert_eq!(set.len(), 1);

        let record = set.get("Disk[1](WDC WD40EFRX)").unwrap();
        assert_eq!(record.description, REALLOCATED);
        let faults: Vec<_> = record.faults().map(|c| (c.kind, c.value)).collect();
        assert_eq!(faults, vec![(CounterKind::ReallocatedSectors, 3)]);
        assert_eq!(record.fault_summary(), "ReallocatedSectors=3");
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let raw = format!("{}\r\n{}\r\n", REALLOCATED, REALLOCATED.replace("Disk[1]", "Disk[2]"));
        assert_eq!(parse_report(&raw), parse_report(&raw));
        assert_eq!(parse_report(&raw).len(), 2);
    }

    #[test]
    fn test_wear_alone_is_a_problem() {
        let line = HEALTHY.replace("Wear: 0", "Wear: 7");
        let record = parse_line(&line).unwrap();
        assert_eq!(record.device_key, "Disk[0](Samsung SSD 870 EVO)");
    }

    #[test]
    fn test_empty_counter_values_are_not_matched() {
        // PowerShell prints nothing for counters the drive does not report
        let line = "Disk[3](USB Flash) - MediaType: Unspecified - Wear:  - ReallocatedSectors:  - PendingSectors:  - UncorrectedErrors: ";
        assert!(parse_line(line).is_none());
    }

    #[test]
    fn test_huge_values_still_count() {
        let line = "Disk[4](X) - Wear: 0 - PendingSectors: 99999999999999999999999";
        let record = parse_line(line).unwrap();
        assert_eq!(record.faults().next().unwrap().value, u64::MAX);
    }

    #[test]
    fn test_line_without_separator_uses_whole_line() {
        let line = "ReallocatedSectors: 1";
        assert_eq!(parse_line(line).unwrap().device_key, line);
    }
}
