//! Assertion macros for permission and event checks

/// Assert that `who` holds `permission_id` on `target` in a DAO or manager
#[macro_export]
macro_rules! assert_granted {
    ($host:expr, $target:expr, $who:expr, $permission_id:expr) => {
        assert!(
            $host.is_granted($target, $who, $permission_id, &[]),
            "expected {} to hold {} on {}",
            $who,
            $permission_id,
            $target
        )
    };
}

/// Assert that `who` does not hold `permission_id` on `target`
#[macro_export]
macro_rules! assert_not_granted {
    ($host:expr, $target:expr, $who:expr, $permission_id:expr) => {
        assert!(
            !$host.is_granted($target, $who, $permission_id, &[]),
            "{} unexpectedly holds {} on {}",
            $who,
            $permission_id,
            $target
        )
    };
}

/// Assert that an event log contains an event matching `pattern`
#[macro_export]
macro_rules! assert_emitted {
    ($log:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            $log.events()
                .iter()
                .any(|event| matches!(event, $pattern $(if $guard)?)),
            "no event matching {} in {:?}",
            stringify!($pattern),
            $log.events()
        )
    };
}

/// Assert that a result failed with an error of the given class
#[macro_export]
macro_rules! assert_error_class {
    ($result:expr, $class:expr) => {
        match $result {
            Ok(value) => panic!("expected a {:?} error, got Ok({:?})", $class, value),
            Err(err) => assert_eq!(err.class(), $class, "unexpected error {err}"),
        }
    };
}
