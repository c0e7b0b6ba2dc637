pub mod migrate;
pub mod plan;
pub mod status;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

#[cfg(test)]
mod tests {
    use super::CommandReport;

    #[test]
    fn any_issue_marks_report_failed() {
        let mut report = CommandReport::new("status");
        report.detail("borg=/usr/bin/borg");
        assert!(report.ok);
        report.issue("RESTIC_REPOSITORY is not set");
        assert!(!report.ok);
        assert_eq!(report.issues.len(), 1);
    }
}
