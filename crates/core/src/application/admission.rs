// Admission Gate - version / host check ahead of any queue access

use tracing::debug;

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// Worker build does not match the coordinator; served as "no work"
    VersionMismatch,
    /// Restricted-deployment mode and the worker is on another host
    ForeignHost,
}

/// Single admission gate for worker-originating calls
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    expected_version: String,
    local_only: bool,
    host_signature: String,
}

impl AdmissionGate {
    pub fn new(
        expected_version: impl Into<String>,
        local_only: bool,
        host_signature: impl Into<String>,
    ) -> Self {
        Self {
            expected_version: expected_version.into(),
            local_only,
            host_signature: host_signature.into(),
        }
    }

    pub fn check(&self, worker_id: &str, worker_version: Option<&str>) -> Admission {
        if worker_version != Some(self.expected_version.as_str()) {
            debug!(
                worker = %worker_id,
                worker_version = ?worker_version,
                expected = %self.expected_version,
                "Refusing worker with mismatched version"
            );
            return Admission::VersionMismatch;
        }

        if self.local_only && !worker_id.contains(&self.host_signature) {
            debug!(
                worker = %worker_id,
                host = %self.host_signature,
                "Refusing non-local worker"
            );
            return Admission::ForeignHost;
        }

        Admission::Admitted
    }

    pub fn admit(&self, worker_id: &str, worker_version: Option<&str>) -> bool {
        self.check(worker_id, worker_version) == Admission::Admitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_must_match() {
        let gate = AdmissionGate::new("1.2.0", false, "scope-pc");
        assert_eq!(gate.check("w1", Some("1.2.0")), Admission::Admitted);
        assert_eq!(gate.check("w1", Some("1.1.9")), Admission::VersionMismatch);
        assert_eq!(gate.check("w1", None), Admission::VersionMismatch);
    }

    #[test]
    fn test_local_only_filters_by_host_signature() {
        let gate = AdmissionGate::new("1.2.0", true, "scope-pc");
        assert!(gate.admit("scope-pc-worker-3", Some("1.2.0")));
        assert_eq!(
            gate.check("cluster-node-7", Some("1.2.0")),
            Admission::ForeignHost
        );
        // version is checked first
        assert_eq!(
            gate.check("cluster-node-7", Some("0.1.0")),
            Admission::VersionMismatch
        );
    }
}
