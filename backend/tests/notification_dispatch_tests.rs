//! Notification dispatch tests
//!
//! Missing-set computation, per-recipient failure isolation, and the
//! per-organization toggle, modeled over in-memory rosters the way the
//! dispatcher runs them.

use proptest::prelude::*;
use std::collections::HashSet;

// ============================================================================
// Dispatch Model
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RosterDriver {
    pub id: u32,
    pub name: String,
}

/// Roster minus submitters, preserving roster order.
pub fn missing_drivers<'a>(
    roster: &'a [RosterDriver],
    submitted: &HashSet<u32>,
) -> Vec<&'a RosterDriver> {
    roster.iter().filter(|d| !submitted.contains(&d.id)).collect()
}

/// Push one message per recipient; a failed send is skipped and excluded
/// from the returned count, exactly like the dispatcher's fan-out loop.
pub fn fan_out<F>(recipients: &[&RosterDriver], mut send: F) -> u32
where
    F: FnMut(&RosterDriver) -> Result<(), String>,
{
    let mut sent = 0;
    for recipient in recipients {
        match send(recipient) {
            Ok(()) => sent += 1,
            Err(_) => {
                // skip this recipient, continue with the rest
            }
        }
    }
    sent
}

/// One organization's slice of a scheduled run.
pub fn run_org_check<F>(
    toggle_enabled: bool,
    roster: &[RosterDriver],
    submitted: &HashSet<u32>,
    send: F,
) -> u32
where
    F: FnMut(&RosterDriver) -> Result<(), String>,
{
    if !toggle_enabled {
        return 0;
    }
    let missing = missing_drivers(roster, submitted);
    fan_out(&missing, send)
}

fn roster(names: &[&str]) -> Vec<RosterDriver> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| RosterDriver {
            id: i as u32,
            name: name.to_string(),
        })
        .collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn test_missing_set_is_roster_minus_submitted() {
    // D = {A, B, C}, S = {A} → missing = {B, C}
    let drivers = roster(&["A", "B", "C"]);
    let submitted: HashSet<u32> = [0].into_iter().collect();

    let missing = missing_drivers(&drivers, &submitted);
    let names: Vec<&str> = missing.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["B", "C"]);
}

#[test]
fn test_missing_set_empty_roster() {
    let drivers = roster(&[]);
    let submitted = HashSet::new();
    assert!(missing_drivers(&drivers, &submitted).is_empty());
}

#[test]
fn test_fan_out_counts_only_successful_sends() {
    let drivers = roster(&["R1", "R2", "R3"]);
    let recipients: Vec<&RosterDriver> = drivers.iter().collect();

    let mut attempted = Vec::new();
    let sent = fan_out(&recipients, |driver| {
        attempted.push(driver.name.clone());
        if driver.name == "R2" {
            Err("blocked by recipient".to_string())
        } else {
            Ok(())
        }
    });

    // R2's failure affects neither R1 (before) nor R3 (after)
    assert_eq!(attempted, vec!["R1", "R2", "R3"]);
    assert_eq!(sent, 2);
}

#[test]
fn test_fan_out_all_failures() {
    let drivers = roster(&["R1", "R2"]);
    let recipients: Vec<&RosterDriver> = drivers.iter().collect();
    let sent = fan_out(&recipients, |_| Err("revoked channel token".to_string()));
    assert_eq!(sent, 0);
}

#[test]
fn test_disabled_toggle_sends_nothing() {
    let drivers = roster(&["A", "B", "C"]);
    let submitted = HashSet::new();

    let mut attempts = 0;
    let sent = run_org_check(false, &drivers, &submitted, |_| {
        attempts += 1;
        Ok(())
    });

    assert_eq!(sent, 0);
    assert_eq!(attempts, 0, "no push may be attempted when the toggle is off");
}

#[test]
fn test_enabled_toggle_sends_exactly_missing_count() {
    // Toggling the same organization back on with one missing driver
    // sends exactly one message.
    let drivers = roster(&["A", "B"]);
    let submitted: HashSet<u32> = [0].into_iter().collect();

    let sent = run_org_check(true, &drivers, &submitted, |_| Ok(()));
    assert_eq!(sent, 1);
}

#[test]
fn test_org_isolation() {
    // A failing organization contributes zero but later ones still run.
    let org_a = roster(&["A1", "A2"]);
    let org_b = roster(&["B1"]);
    let nobody = HashSet::new();

    let mut total = 0;
    total += run_org_check(true, &org_a, &nobody, |_| Err("org A channel revoked".into()));
    total += run_org_check(true, &org_b, &nobody, |_| Ok(()));

    assert_eq!(total, 1);
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Missing and submitted partition the roster.
    #[test]
    fn prop_missing_partitions_roster(
        roster_size in 0usize..30,
        submitted_bits in proptest::collection::vec(any::<bool>(), 0..30)
    ) {
        let drivers: Vec<RosterDriver> = (0..roster_size)
            .map(|i| RosterDriver { id: i as u32, name: format!("D{}", i) })
            .collect();
        let submitted: HashSet<u32> = drivers
            .iter()
            .zip(submitted_bits.iter().chain(std::iter::repeat(&false)))
            .filter(|(_, &s)| s)
            .map(|(d, _)| d.id)
            .collect();

        let missing = missing_drivers(&drivers, &submitted);

        prop_assert_eq!(missing.len() + submitted.len(), drivers.len());
        for driver in &missing {
            prop_assert!(!submitted.contains(&driver.id));
        }
    }

    /// The sent count equals recipients minus failures, for any failure set.
    #[test]
    fn prop_sent_count_excludes_failures(
        roster_size in 0usize..20,
        failure_bits in proptest::collection::vec(any::<bool>(), 0..20)
    ) {
        let drivers: Vec<RosterDriver> = (0..roster_size)
            .map(|i| RosterDriver { id: i as u32, name: format!("D{}", i) })
            .collect();
        let recipients: Vec<&RosterDriver> = drivers.iter().collect();
        let failures: HashSet<u32> = drivers
            .iter()
            .zip(failure_bits.iter().chain(std::iter::repeat(&false)))
            .filter(|(_, &f)| f)
            .map(|(d, _)| d.id)
            .collect();

        let mut attempted = 0u32;
        let sent = fan_out(&recipients, |driver| {
            attempted += 1;
            if failures.contains(&driver.id) {
                Err("push rejected".to_string())
            } else {
                Ok(())
            }
        });

        // Every recipient is attempted regardless of earlier failures
        prop_assert_eq!(attempted as usize, recipients.len());
        prop_assert_eq!(sent as usize, recipients.len() - failures.len());
    }

    /// A disabled toggle sends zero for every roster and submission state.
    #[test]
    fn prop_disabled_toggle_always_zero(
        roster_size in 0usize..20,
        submitted_count in 0usize..20
    ) {
        let drivers: Vec<RosterDriver> = (0..roster_size)
            .map(|i| RosterDriver { id: i as u32, name: format!("D{}", i) })
            .collect();
        let submitted: HashSet<u32> = (0..submitted_count.min(roster_size))
            .map(|i| i as u32)
            .collect();

        let sent = run_org_check(false, &drivers, &submitted, |_| Ok(()));
        prop_assert_eq!(sent, 0);
    }
}
