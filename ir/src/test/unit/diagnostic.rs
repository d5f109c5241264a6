use crate::diagnostic::{Diagnostics, Severity};
use crate::function::OpId;

#[test]
fn test_collects_in_order() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.remark(OpId(0), "buffer.reduce_window", "dilations ignored");
    diagnostics.warning(OpId(1), "buffer.reduce_window", "defaulting strides");
    assert!(!diagnostics.has_errors());

    diagnostics.error(OpId(2), "buffer.reduce", "bad dimensions");
    assert!(diagnostics.has_errors());
    assert_eq!(diagnostics.len(), 3);
    let severities: Vec<_> = diagnostics.iter().map(|d| d.severity).collect();
    assert_eq!(severities, [Severity::Remark, Severity::Warning, Severity::Error]);
    assert_eq!(diagnostics.with_severity(Severity::Warning).count(), 1);

    diagnostics.clear();
    assert!(diagnostics.is_empty());
}

#[test]
fn test_display() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.error(OpId(3), "buffer.reduce", "failed to legalize operation");
    let rendered = diagnostics.iter().next().map(ToString::to_string);
    assert_eq!(rendered.as_deref(), Some("error: 'buffer.reduce' (op3): failed to legalize operation"));
}
