/*!
Builders for probe output

Produce lines in the shape the PowerShell probe writes them, so tests read
like real reports instead of hand-typed strings.
*/

/// One `Disk[id](model) - ...` line
#[derive(Debug, Clone)]
pub struct DiskLineBuilder {
    device_id: String,
    model: String,
    media_type: String,
    wear: String,
    reallocated: String,
    pending: String,
    uncorrected: String,
}

impl DiskLineBuilder {
    /// Healthy disk, every counter zero
    pub fn new(device_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            model: model.into(),
            media_type: "SSD".to_string(),
            wear: "0".to_string(),
            reallocated: "0".to_string(),
            pending: "0".to_string(),
            uncorrected: "0".to_string(),
        }
    }

    pub fn media_type(mut self, media_type: &str) -> Self {
        self.media_type = media_type.to_string();
        self
    }

    pub fn wear(mut self, value: u64) -> Self {
        self.wear = value.to_string();
        self
    }

    pub fn reallocated(mut self, value: u64) -> Self {
        self.reallocated = value.to_string();
        self
    }

    pub fn pending(mut self, value: u64) -> Self {
        self.pending = value.to_string();
        self
    }

    pub fn uncorrected(mut self, value: u64) -> Self {
        self.uncorrected = value.to_string();
        self
    }

    /// Counter the driver did not report (PowerShell prints nothing)
    pub fn unreported_wear(mut self) -> Self {
        self.wear.clear();
        self
    }

    /// Text before the first separator, as the parser keys it
    pub fn device_key(&self) -> String {
        format!("Disk[{}]({})", self.device_id, self.model)
    }

    pub fn build(&self) -> String {
        format!(
            "{} - MediaType: {} - Wear: {} - ReallocatedSectors: {} - PendingSectors: {} - UncorrectedErrors: {}",
            self.device_key(),
            self.media_type,
            self.wear,
            self.reallocated,
            self.pending,
            self.uncorrected
        )
    }
}

/// Whole probe output, CRLF separated like a Windows console
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    lines: Vec<String>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disk(mut self, disk: DiskLineBuilder) -> Self {
        self.lines.push(disk.build());
        self
    }

    /// Free-form line, e.g. a probe warning
    pub fn line(mut self, line: &str) -> Self {
        self.lines.push(line.to_string());
        self
    }

    pub fn build(&self) -> String {
        let mut out = self.lines.join("\r\n");
        out.push_str("\r\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diskwatch_core::parse_report;

    #[test]
    fn test_builders_match_parser() {
        let failing = DiskLineBuilder::new("1", "WDC WD40").media_type("HDD").pending(8);
        let report = ReportBuilder::new()
            .disk(DiskLineBuilder::new("0", "Samsung SSD 870"))
            .disk(failing.clone())
            .line("Could not get counters for a disk. Skipping.")
            .build();

        let problems = parse_report(&report);
        assert_eq!(problems.len(), 1);
        assert!(problems.contains(&failing.device_key()));
    }
}
