use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use lingua_types::models::Plan;

pub const FREE_MAX_SECONDS: i64 = 86_400;
pub const PREMIUM_MAX_SECONDS: i64 = 604_800;

/// Longest message lifetime each plan may request.
#[derive(Debug, Clone)]
pub struct PlanCeilings {
    ceilings: HashMap<Plan, i64>,
}

impl Default for PlanCeilings {
    fn default() -> Self {
        Self::empty()
            .with_ceiling(Plan::Free, FREE_MAX_SECONDS)
            .with_ceiling(Plan::Premium, PREMIUM_MAX_SECONDS)
    }
}

impl PlanCeilings {
    pub fn empty() -> Self {
        Self {
            ceilings: HashMap::new(),
        }
    }

    pub fn with_ceiling(mut self, plan: Plan, max_seconds: i64) -> Self {
        self.ceilings.insert(plan, max_seconds);
        self
    }

    /// Ceiling for `plan`; plans missing from the table get the smallest
    /// configured ceiling.
    pub fn max_seconds(&self, plan: Plan) -> i64 {
        self.ceilings
            .get(&plan)
            .copied()
            .unwrap_or_else(|| self.ceilings.values().copied().min().unwrap_or(FREE_MAX_SECONDS))
    }

    /// Compute a message's expiry.
    ///
    /// A positive `expire_seconds` wins over the sender's default; a
    /// non-positive result means the message never expires. The lifetime is
    /// clamped to the plan ceiling. A ceiling too large to add to `now` falls
    /// back to the plan's built-in ceiling.
    pub fn resolve_expires_at(
        &self,
        now: DateTime<Utc>,
        expire_seconds: Option<i64>,
        default_seconds: Option<i64>,
        plan: Plan,
    ) -> Option<DateTime<Utc>> {
        let base = base_ttl(expire_seconds, default_seconds)?;
        let seconds = base.min(self.max_seconds(plan));
        offset(now, seconds).or_else(|| offset(now, builtin_ceiling(plan)))
    }
}

fn builtin_ceiling(plan: Plan) -> i64 {
    match plan {
        Plan::Free => FREE_MAX_SECONDS,
        Plan::Premium => PREMIUM_MAX_SECONDS,
    }
}

fn offset(now: DateTime<Utc>, seconds: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(seconds).and_then(|d| now.checked_add_signed(d))
}

/// Requested lifetime before clamping, `None` when the message should not expire.
pub fn base_ttl(expire_seconds: Option<i64>, default_seconds: Option<i64>) -> Option<i64> {
    let base = match expire_seconds {
        Some(requested) if requested > 0 => requested,
        _ => default_seconds.unwrap_or(0),
    };
    (base > 0).then_some(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn free_plan_clamps_explicit_request() {
        let at = PlanCeilings::default().resolve_expires_at(now(), Some(999_999), None, Plan::Free);
        assert_eq!(at, Some(now() + Duration::seconds(86_400)));
    }

    #[test]
    fn premium_plan_clamps_stored_default() {
        let at = PlanCeilings::default().resolve_expires_at(now(), None, Some(9_999_999), Plan::Premium);
        assert_eq!(at, Some(now() + Duration::seconds(604_800)));
    }

    #[test]
    fn short_ttl_is_kept() {
        let at = PlanCeilings::default().resolve_expires_at(now(), Some(60), Some(3600), Plan::Free);
        assert_eq!(at, Some(now() + Duration::seconds(60)));
    }

    #[test]
    fn non_positive_request_falls_back_to_default() {
        assert_eq!(base_ttl(Some(0), Some(120)), Some(120));
        assert_eq!(base_ttl(Some(-5), Some(120)), Some(120));
        assert_eq!(base_ttl(None, Some(120)), Some(120));
    }

    #[test]
    fn no_ttl_anywhere_means_no_expiry() {
        let ceilings = PlanCeilings::default();
        assert_eq!(ceilings.resolve_expires_at(now(), None, None, Plan::Premium), None);
        assert_eq!(ceilings.resolve_expires_at(now(), Some(0), Some(0), Plan::Free), None);
        assert_eq!(ceilings.resolve_expires_at(now(), None, Some(-1), Plan::Free), None);
    }

    #[test]
    fn missing_plan_uses_most_conservative_ceiling() {
        let ceilings = PlanCeilings::empty()
            .with_ceiling(Plan::Free, 3_600)
            .with_ceiling(Plan::Free, 7_200);
        assert_eq!(ceilings.max_seconds(Plan::Premium), 7_200);

        let only_premium = PlanCeilings::empty().with_ceiling(Plan::Premium, 100);
        assert_eq!(only_premium.max_seconds(Plan::Free), 100);
        assert_eq!(PlanCeilings::empty().max_seconds(Plan::Premium), FREE_MAX_SECONDS);
    }

    #[test]
    fn oversized_custom_ceiling_falls_back_to_builtin() {
        let ceilings = PlanCeilings::empty()
            .with_ceiling(Plan::Free, i64::MAX)
            .with_ceiling(Plan::Premium, i64::MAX / 1000);

        let free = ceilings.resolve_expires_at(now(), Some(i64::MAX), None, Plan::Free);
        assert_eq!(free, Some(now() + Duration::seconds(FREE_MAX_SECONDS)));

        let premium = ceilings.resolve_expires_at(now(), None, Some(i64::MAX / 1000), Plan::Premium);
        assert_eq!(premium, Some(now() + Duration::seconds(PREMIUM_MAX_SECONDS)));
    }

    proptest! {
        #[test]
        fn expiry_never_exceeds_plan_ceiling(
            expire in proptest::option::of(any::<i32>()),
            default in proptest::option::of(any::<i32>()),
            premium in any::<bool>(),
        ) {
            let plan = if premium { Plan::Premium } else { Plan::Free };
            let ceilings = PlanCeilings::default();
            let at = ceilings.resolve_expires_at(
                now(),
                expire.map(i64::from),
                default.map(i64::from),
                plan,
            );
            if let Some(at) = at {
                prop_assert!(at <= now() + Duration::seconds(ceilings.max_seconds(plan)));
                prop_assert!(at > now());
            }
        }

        #[test]
        fn default_is_base_when_nothing_requested(default in 1i64..10_000_000) {
            prop_assert_eq!(base_ttl(None, Some(default)), Some(default));
        }
    }
}
