use std::{collections::HashSet, ops::Range, time::Duration};

use rand::Rng;

/// What the simulator tells an acceptor to do with one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Answer normally.
    Respond,
    /// Answer normally after blocking this request for the given duration.
    RespondAfterDelay(Duration),
    /// Close the connection without writing a reply.
    Drop,
    /// Mark self offline in the registry, then answer `offline`.
    GoOffline,
}

/// Fault-injection profile for the whole council.
///
/// [`decide`](BehaviorProfile::decide) is pure: it only draws from the rng
/// passed in. The registry flip implied by [`Outcome::GoOffline`] is applied
/// by the acceptor as a separate explicit step, which keeps the decision
/// testable independent of timing.
#[derive(Debug, Clone)]
pub struct BehaviorProfile {
    /// Members that always answer late.
    pub slow: HashSet<u64>,
    /// Members that drop requests or desert the council outright.
    pub flaky: HashSet<u64>,
    /// Delay range for slow members, in milliseconds.
    pub delay_ms: Range<u64>,
    /// Probability that a flaky member drops a request without replying.
    pub flaky_drop: f64,
    /// Probability that a flaky member marks itself offline instead;
    /// mutually exclusive with the drop draw.
    pub flaky_offline: f64,
    /// Probability that any other member goes offline on a given request.
    pub stray_offline: f64,
}

impl BehaviorProfile {
    /// Every member answers promptly, every time.
    pub fn reliable() -> Self {
        Self {
            slow: HashSet::new(),
            flaky: HashSet::new(),
            delay_ms: 0..1,
            flaky_drop: 0.0,
            flaky_offline: 0.0,
            stray_offline: 0.0,
        }
    }

    /// The default trouble: member 2 answers 1-5s late, member 3 drops or
    /// deserts half the time, everyone else deserts 10% of the time.
    pub fn faulty() -> Self {
        Self {
            slow: [2].iter().copied().collect(),
            flaky: [3].iter().copied().collect(),
            delay_ms: 1000..5000,
            flaky_drop: 0.25,
            flaky_offline: 0.25,
            stray_offline: 0.1,
        }
    }

    /// Decide the outcome for one inbound request to `id`.
    ///
    /// Must be called at most once per request, before any reply is
    /// written, so a member never answers after having just deserted in
    /// the same handling turn.
    pub fn decide<R: Rng>(&self, id: u64, rng: &mut R) -> Outcome {
        if self.slow.contains(&id) {
            let ms = rng.gen_range(self.delay_ms.clone());
            return Outcome::RespondAfterDelay(Duration::from_millis(ms));
        }
        if self.flaky.contains(&id) {
            // One roll split between the two misbehaviors, so the chance
            // of not responding is exactly flaky_drop + flaky_offline.
            let roll: f64 = rng.gen();
            if roll < self.flaky_drop {
                return Outcome::Drop;
            }
            if roll < self.flaky_drop + self.flaky_offline {
                return Outcome::GoOffline;
            }
            return Outcome::Respond;
        }
        if self.stray_offline > 0.0 && rng.gen_bool(self.stray_offline) {
            return Outcome::GoOffline;
        }
        Outcome::Respond
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::thread_rng;

    #[test]
    fn reliable_always_responds() {
        let p = BehaviorProfile::reliable();
        let mut rng = thread_rng();
        for id in 1..=9 {
            for _ in 0..50 {
                assert_eq!(p.decide(id, &mut rng), Outcome::Respond);
            }
        }
    }

    #[test]
    fn slow_member_always_delays_within_range() {
        let p = BehaviorProfile::faulty();
        let mut rng = thread_rng();
        for _ in 0..50 {
            match p.decide(2, &mut rng) {
                Outcome::RespondAfterDelay(d) => {
                    assert!(d >= Duration::from_millis(1000));
                    assert!(d < Duration::from_millis(5000));
                }
                other => panic!("slow member produced {:?}", other),
            }
        }
    }

    #[test]
    fn certain_drop_always_drops() {
        let p = BehaviorProfile {
            flaky: [7].iter().copied().collect(),
            flaky_drop: 1.0,
            ..BehaviorProfile::reliable()
        };
        let mut rng = thread_rng();
        for _ in 0..50 {
            assert_eq!(p.decide(7, &mut rng), Outcome::Drop);
        }
    }

    #[test]
    fn flaky_draws_are_mutually_exclusive() {
        // Drop and offline halves covering the whole roll: a flaky member
        // can never respond, and both misbehaviors occur.
        let p = BehaviorProfile {
            flaky: [3].iter().copied().collect(),
            flaky_drop: 0.5,
            flaky_offline: 0.5,
            ..BehaviorProfile::reliable()
        };
        let mut rng = thread_rng();
        let mut drops = 0;
        let mut offlines = 0;
        for _ in 0..200 {
            match p.decide(3, &mut rng) {
                Outcome::Drop => drops += 1,
                Outcome::GoOffline => offlines += 1,
                other => panic!("flaky member responded with {:?}", other),
            }
        }
        assert!(drops > 0);
        assert!(offlines > 0);
    }

    #[test]
    fn certain_offline_goes_offline() {
        let p = BehaviorProfile {
            flaky: [4].iter().copied().collect(),
            flaky_drop: 0.0,
            flaky_offline: 1.0,
            ..BehaviorProfile::reliable()
        };
        let mut rng = thread_rng();
        assert_eq!(p.decide(4, &mut rng), Outcome::GoOffline);
        // Other members are untouched by the flaky settings.
        assert_eq!(p.decide(5, &mut rng), Outcome::Respond);
    }
}
