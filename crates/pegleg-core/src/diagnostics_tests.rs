use super::*;

#[test]
fn empty_diagnostics_has_no_errors() {
    let d = Diagnostics::new();
    assert!(!d.has_errors());
    assert_eq!(d.error_count(), 0);
    assert_eq!(d.warning_count(), 0);
    assert!(d.is_empty());
}

#[test]
fn warning_does_not_count_as_error() {
    let mut d = Diagnostics::new();
    d.push_warning(DiagnosticKind::UnusedRule, Some("foo".to_string()));
    assert!(!d.has_errors());
    assert_eq!(d.warning_count(), 1);
}

#[test]
fn error_counts_and_prints() {
    let mut d = Diagnostics::new();
    d.push_error(DiagnosticKind::UndefinedRule, Some("bar".to_string()));
    assert!(d.has_errors());
    assert_eq!(d.error_count(), 1);

    let mut out = String::new();
    d.print(&mut out).unwrap();
    assert!(out.contains("bar"));
    assert!(out.contains("error"));
}

#[test]
fn extend_merges_messages() {
    let mut a = Diagnostics::new();
    a.push_warning(DiagnosticKind::UnusedRule, Some("a".to_string()));
    let mut b = Diagnostics::new();
    b.push_error(DiagnosticKind::UndefinedRule, Some("b".to_string()));
    a.extend(b);
    assert_eq!(a.error_count(), 1);
    assert_eq!(a.warning_count(), 1);
}

#[test]
fn diagnostic_without_rule_displays_plainly() {
    let mut d = Diagnostics::new();
    d.push_error(DiagnosticKind::Internal(7), None);
    let msg = d.iter().next().unwrap();
    assert_eq!(msg.rule, None);
    assert!(format!("{msg}").contains("internal error #7"));
}
