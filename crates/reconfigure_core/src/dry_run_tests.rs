use super::*;

#[test]
fn test_from_flag() {
    assert_eq!(DryRunPolicy::from_flag(true), DryRunPolicy::DryRun);
    assert_eq!(DryRunPolicy::from_flag(false), DryRunPolicy::Apply);
}

#[test]
fn test_only_apply_permits_writes() {
    assert!(DryRunPolicy::Apply.permits_writes());
    assert!(!DryRunPolicy::DryRun.permits_writes());
    assert!(DryRunPolicy::DryRun.is_dry_run());
}
