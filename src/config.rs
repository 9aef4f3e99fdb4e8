use std::time::Duration;

/// Cluster-wide parameters shared by both roles.
///
/// Member `id` listens on `base_port + id`; all members are colocated on
/// `host` by default, but nothing below this struct assumes localhost.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host every member listens on.
    pub host: String,
    /// Member `id` binds `base_port + id`.
    pub base_port: u16,
    /// Number of council members, ids `1..=members`.
    pub members: u64,
    /// Bound on each transport connect and each transport read.
    pub call_timeout: Duration,
    /// Bound on the coordinator's wait for acceptor readiness.
    pub startup_timeout: Duration,
}

impl Config {
    /// Config for a council of `members` members with default timeouts.
    ///
    /// The call timeout must exceed the largest simulated delay, otherwise
    /// a slow member can never answer in time.
    ///
    /// Panics if the port range `base_port + 1 ..= base_port + members`
    /// does not fit in a `u16`.
    pub fn new(members: u64) -> Self {
        let config = Self {
            host: "127.0.0.1".to_string(),
            base_port: 5000,
            members,
            call_timeout: Duration::from_secs(6),
            startup_timeout: Duration::from_secs(5),
        };
        config.assert_port_range();
        config
    }

    /// Same config rebased onto another port range, for running several
    /// clusters side by side in one process.
    ///
    /// Panics if the rebased range does not fit in a `u16`.
    pub fn with_base_port(mut self, base_port: u16) -> Self {
        self.base_port = base_port;
        self.assert_port_range();
        self
    }

    fn assert_port_range(&self) {
        assert!(
            u64::from(self.base_port) + self.members <= u64::from(u16::MAX),
            "member ports {}..={} do not fit in a u16",
            u64::from(self.base_port) + 1,
            u64::from(self.base_port) + self.members,
        );
    }

    /// Minimum quorum size, `floor(members / 2) + 1`.
    pub fn majority(&self) -> usize {
        (self.members / 2 + 1) as usize
    }

    /// `host:port` address of a member. Ids stay within `1..=members`, so
    /// the widened sum fits the `u16` range checked at construction.
    pub fn member_addr(&self, id: u64) -> String {
        format!("{}:{}", self.host, u64::from(self.base_port) + id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn majority_is_floor_half_plus_one() {
        assert_eq!(Config::new(1).majority(), 1);
        assert_eq!(Config::new(2).majority(), 2);
        assert_eq!(Config::new(4).majority(), 3);
        assert_eq!(Config::new(5).majority(), 3);
        assert_eq!(Config::new(9).majority(), 5);
    }

    #[test]
    fn member_addr_offsets_base_port() {
        let c = Config::new(9).with_base_port(7000);
        assert_eq!(c.member_addr(3), "127.0.0.1:7003");
        let c = Config::new(9).with_base_port(65526);
        assert_eq!(c.member_addr(9), "127.0.0.1:65535");
    }

    #[test]
    #[should_panic(expected = "do not fit in a u16")]
    fn port_range_overflow_is_rejected() {
        Config::new(9).with_base_port(65527);
    }

    #[test]
    #[should_panic(expected = "do not fit in a u16")]
    fn oversized_council_is_rejected() {
        Config::new(70000);
    }
}
